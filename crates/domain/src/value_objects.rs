//! # 共通値オブジェクト
//!
//! 複数のエンティティで共有される値オブジェクトを定義する。
//!
//! ## 設計方針
//!
//! - **Newtype パターン**: プリミティブ型をラップし、型安全性を確保
//! - **バリデーション**: 生成時に検証し、不正な値の存在を型レベルで排除
//! - **不変性**: 一度作成したら変更不可
//!
//! ## 含まれる型
//!
//! | 型 | ラップ対象 | 用途 |
//! |---|-----------|------|
//! | [`Version`] | `u32` | テンプレートのバージョン番号 |

use serde::{Deserialize, Serialize};

use crate::DomainError;

// =========================================================================
// Version（バージョン番号）
// =========================================================================

/// バージョン番号（値オブジェクト）
///
/// テナント管理者がテンプレートを更新するたびにインクリメントされる。
/// 通知パイプラインは読み取るだけで、ログ出力に使う。
///
/// # 不変条件
///
/// - バージョン番号は 1 以上
///
/// # 使用例
///
/// ```rust
/// use scholamail_domain::value_objects::Version;
///
/// let v = Version::new(3).unwrap();
/// assert_eq!(v.as_u32(), 3);
/// assert!(Version::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u32);

impl Version {
    /// 初期バージョン（1）を作成する
    pub fn initial() -> Self {
        Self(1)
    }

    /// 指定した値からバージョンを作成する
    ///
    /// # エラー
    ///
    /// 0 の場合は `DomainError::Validation` を返す。
    pub fn new(value: u32) -> Result<Self, DomainError> {
        if value == 0 {
            return Err(DomainError::Validation(
                "バージョン番号は 1 以上である必要があります".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// 内部の u32 値を取得する
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl TryFrom<i32> for Version {
    type Error = DomainError;

    /// DB の `INTEGER` カラムから変換する
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        let value = u32::try_from(value).map_err(|_| {
            DomainError::Validation(format!("バージョン番号が負数です: {value}"))
        })?;
        Self::new(value)
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_バージョンの初期値は1() {
        assert_eq!(Version::initial().as_u32(), 1);
    }

    #[test]
    fn test_バージョン0は無効() {
        assert!(Version::new(0).is_err());
    }

    #[rstest]
    #[case(0)]
    #[case(-1)]
    fn test_i32からの変換で0以下は無効(#[case] input: i32) {
        assert!(Version::try_from(input).is_err());
    }

    #[test]
    fn test_i32からの変換() {
        assert_eq!(Version::try_from(42).unwrap().as_u32(), 42);
    }

    #[test]
    fn test_displayはvプレフィックス付き() {
        assert_eq!(Version::new(7).unwrap().to_string(), "v7");
    }
}
