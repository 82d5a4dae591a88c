//! # Scholamail ドメイン層
//!
//! 学校向け通知パイプラインの中核となるドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **純粋なレンダリング**: テンプレート解決は (テンプレート, コンテキスト) の
//!   純粋関数で、I/O も隠れた状態も持たない
//! - **値オブジェクト**: 識別子や名前は Newtype で包み、生成時に検証する
//! - **fail open**: 欠損データや不正な構文はエラーにせず、出力に縮退させる
//!
//! ## 依存関係の方向
//!
//! ```text
//! notifier → infra → domain
//! ```
//!
//! ドメイン層はインフラ層（DB、メール送信）に一切依存しない。
//!
//! ## モジュール構成
//!
//! - [`clock`] - 現在時刻の抽象化
//! - [`error`] - ドメイン層で発生するエラーの定義
//! - [`notification`] - テンプレート、コンテキスト、レンダラー、テーマ
//! - [`tenant`] - テナント識別子とブランド情報
//! - [`value_objects`] - 共通の値オブジェクト
//!
//! ## 使用例
//!
//! ```rust
//! use scholamail_domain::{
//!     notification::{NotificationContext, ThemeId, render_notification},
//!     tenant::TenantId,
//! };
//! use serde_json::json;
//!
//! # fn main() -> Result<(), scholamail_domain::notification::NotificationError> {
//! let _tenant_id = TenantId::new();
//! let context = NotificationContext::from_value(json!({
//!     "school": { "name": "Sakura Elementary" },
//!     "student": { "firstName": "Ana" }
//! }));
//!
//! let rendered = render_notification(
//!     "Absence alert: {{student.first_name}}",
//!     "<p>{{student.firstName}} was absent today.</p>",
//!     ThemeId::Classic,
//!     &context,
//! )?;
//! assert_eq!(rendered.subject, "Absence alert: Ana");
//! # Ok(())
//! # }
//! ```

#[macro_use]
mod macros;

pub mod clock;
pub mod error;
pub mod notification;
pub mod tenant;
pub mod value_objects;

pub use error::DomainError;
