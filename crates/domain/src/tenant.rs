//! # テナント
//!
//! マルチテナント環境におけるテナント（学校・組織）のモデル。
//!
//! 通知パイプラインはテナントを 2 つの形で扱う:
//!
//! - [`TenantProfile`]: テナントディレクトリが返す連絡先・ロゴ情報
//! - [`TenantBranding`]: テーマラッパーがヘッダー・フッターに描画するブランド情報
//!
//! プロファイルはコンテキスト補完（`school.*` の欠損フィールド埋め）に使われ、
//! ブランディングは補完後のコンテキストから組み立てられる。
//!
//! ## 使用例
//!
//! ```rust
//! use scholamail_domain::tenant::{TenantId, TenantName, TenantProfile};
//!
//! let tenant_id = TenantId::new();
//! let profile = TenantProfile::new(TenantName::new("Sakura Elementary").unwrap());
//! assert_eq!(profile.display_name().as_str(), "Sakura Elementary");
//! println!("テナント: {}", tenant_id);
//! ```

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::DomainError;

define_uuid_id! {
    /// テナント（学校・組織）の一意識別子
    ///
    /// テンプレート・通知ログなど、すべての通知データはこの ID で
    /// テナント間のデータ分離を保証する。
    pub struct TenantId;
}

// =========================================================================
// TenantName（テナント名）
// =========================================================================

/// テナント名（値オブジェクト）
///
/// # 不変条件
///
/// - 空文字列ではない
/// - 最大 255 文字（DB: `VARCHAR(255)`）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct TenantName(String);

impl TenantName {
    /// テナント名を作成する
    ///
    /// # バリデーション
    ///
    /// - 空文字列ではない
    /// - 前後の空白はトリミング
    /// - 最大 255 文字
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_string();

        if value.is_empty() {
            return Err(DomainError::Validation("テナント名は必須です".to_string()));
        }

        if value.chars().count() > 255 {
            return Err(DomainError::Validation(
                "テナント名は 255 文字以内である必要があります".to_string(),
            ));
        }

        Ok(Self(value))
    }

    /// 文字列参照を取得する
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 所有権を持つ文字列に変換する
    pub fn into_string(self) -> String {
        self.0
    }
}

// =========================================================================
// TenantProfile（テナントディレクトリのレコード）
// =========================================================================

/// テナントディレクトリから取得するテナントプロファイル
///
/// 表示名以外は任意項目。未登録の項目は `None` のまま扱い、
/// 空文字列は `None` に正規化する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantProfile {
    display_name:  TenantName,
    address:       Option<String>,
    contact_email: Option<String>,
    contact_phone: Option<String>,
    logo_url:      Option<String>,
}

impl TenantProfile {
    /// 表示名のみのプロファイルを作成する
    pub fn new(display_name: TenantName) -> Self {
        Self {
            display_name,
            address: None,
            contact_email: None,
            contact_phone: None,
            logo_url: None,
        }
    }

    /// データベースからプロファイルを復元する
    pub fn from_db(
        display_name: TenantName,
        address: Option<String>,
        contact_email: Option<String>,
        contact_phone: Option<String>,
        logo_url: Option<String>,
    ) -> Self {
        Self {
            display_name,
            address: non_blank(address),
            contact_email: non_blank(contact_email),
            contact_phone: non_blank(contact_phone),
            logo_url: non_blank(logo_url),
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = non_blank(Some(address.into()));
        self
    }

    pub fn with_contact_email(mut self, email: impl Into<String>) -> Self {
        self.contact_email = non_blank(Some(email.into()));
        self
    }

    pub fn with_contact_phone(mut self, phone: impl Into<String>) -> Self {
        self.contact_phone = non_blank(Some(phone.into()));
        self
    }

    pub fn with_logo_url(mut self, logo_url: impl Into<String>) -> Self {
        self.logo_url = non_blank(Some(logo_url.into()));
        self
    }

    pub fn display_name(&self) -> &TenantName {
        &self.display_name
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn contact_email(&self) -> Option<&str> {
        self.contact_email.as_deref()
    }

    pub fn contact_phone(&self) -> Option<&str> {
        self.contact_phone.as_deref()
    }

    pub fn logo_url(&self) -> Option<&str> {
        self.logo_url.as_deref()
    }
}

// =========================================================================
// TenantBranding（テーマ描画用のブランド情報）
// =========================================================================

/// テーマラッパーに渡すブランド情報
///
/// テナント名以外は任意。テナント名が分からない場合は空文字列となり、
/// テーマはヘッダーのテキストを省略する。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenantBranding {
    pub logo_url:    Option<String>,
    pub tenant_name: String,
    pub address:     Option<String>,
    pub phone:       Option<String>,
    pub email:       Option<String>,
}

impl TenantBranding {
    /// テナント名のみのブランディングを作成する
    pub fn named(tenant_name: impl Into<String>) -> Self {
        Self {
            tenant_name: tenant_name.into(),
            ..Self::default()
        }
    }
}

impl From<&TenantProfile> for TenantBranding {
    fn from(profile: &TenantProfile) -> Self {
        Self {
            logo_url:    profile.logo_url.clone(),
            tenant_name: profile.display_name.as_str().to_string(),
            address:     profile.address.clone(),
            phone:       profile.contact_phone.clone(),
            email:       profile.contact_email.clone(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    // TenantName のテスト

    #[test]
    fn test_テナント名は正常な名前を受け入れる() {
        let name = TenantName::new("Sakura Elementary").unwrap();
        assert_eq!(name.as_str(), "Sakura Elementary");
    }

    #[rstest]
    #[case("", "空文字列")]
    #[case("   ", "空白のみ")]
    fn test_テナント名は空を拒否する(#[case] input: &str, #[case] _reason: &str) {
        assert!(TenantName::new(input).is_err());
    }

    #[test]
    fn test_テナント名は前後の空白をトリミングする() {
        let name = TenantName::new("  Test School  ").unwrap();
        assert_eq!(name.as_str(), "Test School");
    }

    #[test]
    fn test_テナント名は255文字を超えると拒否する() {
        assert!(TenantName::new("a".repeat(256)).is_err());
        assert!(TenantName::new("a".repeat(255)).is_ok());
    }

    // TenantProfile のテスト

    #[test]
    fn test_from_dbは空白の任意項目をnoneに正規化する() {
        let profile = TenantProfile::from_db(
            TenantName::new("Sakura Elementary").unwrap(),
            Some("  ".to_string()),
            Some("office@sakura.example.com".to_string()),
            None,
            Some(String::new()),
        );

        assert_eq!(profile.address(), None);
        assert_eq!(profile.contact_email(), Some("office@sakura.example.com"));
        assert_eq!(profile.contact_phone(), None);
        assert_eq!(profile.logo_url(), None);
    }

    // TenantBranding のテスト

    #[test]
    fn test_プロファイルからブランディングを組み立てる() {
        let profile = TenantProfile::new(TenantName::new("Sakura Elementary").unwrap())
            .with_address("1-2-3 Sakura-cho")
            .with_contact_phone("03-0000-0000")
            .with_logo_url("https://cdn.example.com/logo.png");

        let branding = TenantBranding::from(&profile);

        assert_eq!(
            branding,
            TenantBranding {
                logo_url:    Some("https://cdn.example.com/logo.png".to_string()),
                tenant_name: "Sakura Elementary".to_string(),
                address:     Some("1-2-3 Sakura-cho".to_string()),
                phone:       Some("03-0000-0000".to_string()),
                email:       None,
            }
        );
    }
}
