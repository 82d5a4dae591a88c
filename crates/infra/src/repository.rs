//! # リポジトリ実装
//!
//! 通知パイプラインが使う永続化層の抽象と PostgreSQL 実装を提供する。
//!
//! ## 設計方針
//!
//! - **トレイトで抽象化**: ユースケース層はトレイトにのみ依存し、
//!   テストでは [`crate::mock`] のインメモリ実装を注入する
//! - **データベース抽象化**: sqlx を使用し、PostgreSQL 固有の処理をカプセル化

pub mod notification_log_repository;
pub mod notification_template_repository;
pub mod tenant_repository;

pub use notification_log_repository::{
    NotificationLog,
    NotificationLogRepository,
    PostgresNotificationLogRepository,
};
pub use notification_template_repository::{
    NotificationTemplateRepository,
    PostgresNotificationTemplateRepository,
};
pub use tenant_repository::{PostgresTenantRepository, TenantRepository};
