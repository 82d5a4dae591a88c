//! Noop 通知送信実装
//!
//! メールを実際に送信せず、ログ出力のみ行う。
//! テスト環境や通知無効化時に使用する。

use async_trait::async_trait;
use scholamail_domain::notification::{EmailMessage, NotificationError, SentMessage};
use uuid::Uuid;

use super::NotificationSender;

/// Noop 通知送信（ログ出力のみ）
#[derive(Debug, Clone)]
pub struct NoopNotificationSender;

#[async_trait]
impl NotificationSender for NoopNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<SentMessage, NotificationError> {
        let message_id = format!("noop-{}", Uuid::now_v7());
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            message_id = %message_id,
            "Noop: メール送信をスキップ"
        );
        Ok(SentMessage { message_id })
    }
}
