//! # NotificationLogRepository
//!
//! 通知ログの永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **送信結果をすべて記録**: 送信成功・失敗どちらも記録する
//! - **記録失敗は送信結果に影響しない**: 呼び出し側でログ出力のみ行う

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scholamail_domain::{
    notification::{DeliveryStatus, NotificationLogId, NotificationTemplateType, TemplateSource},
    tenant::TenantId,
};
use sqlx::PgPool;

use crate::error::InfraError;

/// 通知ログ（リポジトリ INSERT 用データ型）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationLog {
    pub id:              NotificationLogId,
    pub tenant_id:       TenantId,
    pub template_type:   NotificationTemplateType,
    pub template_source: TemplateSource,
    pub recipient_email: String,
    pub subject:         String,
    pub status:          DeliveryStatus,
    pub error_message:   Option<String>,
    pub message_id:      Option<String>,
    pub sent_at:         DateTime<Utc>,
}

/// 通知ログリポジトリトレイト
#[async_trait]
pub trait NotificationLogRepository: Send + Sync {
    /// 通知ログを挿入する
    async fn insert(&self, log: &NotificationLog) -> Result<(), InfraError>;
}

/// PostgreSQL 実装の NotificationLogRepository
#[derive(Debug, Clone)]
pub struct PostgresNotificationLogRepository {
    pool: PgPool,
}

impl PostgresNotificationLogRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationLogRepository for PostgresNotificationLogRepository {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn insert(&self, log: &NotificationLog) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO notification_logs (
                id, tenant_id, template_type, template_source,
                recipient_email, subject, status,
                error_message, message_id, sent_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(log.id.as_uuid())
        .bind(log.tenant_id.as_uuid())
        .bind(<&'static str>::from(log.template_type))
        .bind(<&'static str>::from(log.template_source))
        .bind(&log.recipient_email)
        .bind(&log.subject)
        .bind(<&'static str>::from(log.status))
        .bind(&log.error_message)
        .bind(&log.message_id)
        .bind(log.sent_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PostgresNotificationLogRepository>();
        assert_send_sync::<Box<dyn NotificationLogRepository>>();
    }
}
