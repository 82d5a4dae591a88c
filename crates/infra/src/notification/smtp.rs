//! SMTP 通知送信実装
//!
//! lettre の `AsyncSmtpTransport` を使用してメールを送信する。
//! 開発環境では Mailpit（ローカル SMTP サーバー）に接続する。

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport,
    AsyncTransport,
    Tokio1Executor,
    message::{Mailbox, Message, SinglePart},
};
use scholamail_domain::notification::{EmailMessage, NotificationError, SentMessage};
use uuid::Uuid;

use super::{NotificationSender, sender_address};

/// SMTP 通知送信
///
/// `lettre::AsyncSmtpTransport<Tokio1Executor>` をラップする。
/// Mailpit（開発）や SMTP リレー（テスト環境）で使用する。
pub struct SmtpNotificationSender {
    transport:    AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpNotificationSender {
    /// 新しい SMTP 送信インスタンスを作成
    ///
    /// # 引数
    ///
    /// - `host`: SMTP サーバーのホスト名（例: "localhost"）
    /// - `port`: SMTP サーバーのポート番号（例: 1025 for Mailpit）
    /// - `from_address`: 既定の送信元メールアドレス
    pub fn new(host: &str, port: u16, from_address: String) -> Self {
        // builder_dangerous: TLS なしで接続（Mailpit 等のローカル SMTP 向け）
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .build();

        Self {
            transport,
            from_address,
        }
    }
}

/// Message-ID ヘッダーの値を生成する（`<uuid@domain>`）
fn generate_message_id(from: &Mailbox) -> String {
    format!("<{}@{}>", Uuid::now_v7(), from.email.domain())
}

#[async_trait]
impl NotificationSender for SmtpNotificationSender {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn send_email(&self, email: &EmailMessage) -> Result<SentMessage, NotificationError> {
        let from: Mailbox = sender_address(email, &self.from_address)
            .parse()
            .map_err(|e| NotificationError::InvalidAddress(format!("送信元アドレス不正: {e}")))?;
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| NotificationError::InvalidAddress(format!("宛先アドレス不正: {e}")))?;
        let message_id = generate_message_id(&from);

        let message = Message::builder()
            .message_id(Some(message_id.clone()))
            .from(from)
            .to(to)
            .subject(&email.subject)
            .singlepart(SinglePart::html(email.html_body.clone()))
            .map_err(|e| NotificationError::SendFailed(format!("メッセージ構築失敗: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotificationError::SendFailed(format!("SMTP 送信失敗: {e}")))?;

        Ok(SentMessage { message_id })
    }
}
