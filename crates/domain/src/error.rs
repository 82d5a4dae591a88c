//! # ドメイン層エラー定義
//!
//! 値オブジェクトの生成時に検出される不正値を表現するエラー型。
//!
//! テンプレート解決そのものはエラーを返さない（欠損データは空文字列に
//! 縮退し、不正な構文はリテラルとして残る）。ここで扱うのは
//! ストアやディレクトリから読み込んだ値が不変条件を満たさない場合のみ。
//!
//! ## 使用例
//!
//! ```rust
//! use scholamail_domain::DomainError;
//!
//! fn validate_name(name: &str) -> Result<(), DomainError> {
//!     if name.is_empty() {
//!         return Err(DomainError::Validation("名前は必須です".to_string()));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// ドメイン層で発生するエラー
#[derive(Debug, Error)]
pub enum DomainError {
    /// バリデーションエラー
    ///
    /// 入力値がビジネスルールに違反している場合に使用する。
    ///
    /// # 例
    ///
    /// - 必須フィールドが空
    /// - 文字数制限の超過
    /// - 未知の列挙値（テンプレート種別など）
    #[error("バリデーションエラー: {0}")]
    Validation(String),
}
