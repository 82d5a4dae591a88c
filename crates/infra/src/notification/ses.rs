//! SES 通知送信実装
//!
//! AWS SES v2 API を使用してメールを送信する。
//! 本番環境で使用する。

use async_trait::async_trait;
use aws_sdk_sesv2::{
    Client,
    types::{Body, Content, Destination, EmailContent, Message},
};
use scholamail_domain::notification::{EmailMessage, NotificationError, SentMessage};

use super::{NotificationSender, sender_address};

/// SES 通知送信
///
/// `aws_sdk_sesv2::Client` をラップする。
/// 本番環境で AWS SES を通じてメールを送信する。
pub struct SesNotificationSender {
    client:       Client,
    from_address: String,
}

impl SesNotificationSender {
    /// 新しい SES 送信インスタンスを作成
    ///
    /// # 引数
    ///
    /// - `client`: AWS SES v2 クライアント
    /// - `from_address`: 既定の送信元メールアドレス（SES で検証済みであること）
    pub fn new(client: Client, from_address: String) -> Self {
        Self {
            client,
            from_address,
        }
    }
}

fn content(data: &str, part: &str) -> Result<Content, NotificationError> {
    Content::builder()
        .data(data)
        .charset("UTF-8")
        .build()
        .map_err(|e| NotificationError::SendFailed(format!("{part}構築失敗: {e}")))
}

#[async_trait]
impl NotificationSender for SesNotificationSender {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn send_email(&self, email: &EmailMessage) -> Result<SentMessage, NotificationError> {
        let destination = Destination::builder().to_addresses(&email.to).build();

        let email_content = EmailContent::builder()
            .simple(
                Message::builder()
                    .subject(content(&email.subject, "件名")?)
                    .body(
                        Body::builder()
                            .html(content(&email.html_body, "HTML 本文")?)
                            .build(),
                    )
                    .build(),
            )
            .build();

        let output = self
            .client
            .send_email()
            .from_email_address(sender_address(email, &self.from_address))
            .destination(destination)
            .content(email_content)
            .send()
            .await
            .map_err(|e| NotificationError::SendFailed(format!("SES 送信失敗: {e}")))?;

        let message_id = output.message_id().map(str::to_string).unwrap_or_default();
        if message_id.is_empty() {
            tracing::warn!(to = %email.to, "SES がメッセージ ID を返さなかった");
        }

        Ok(SentMessage { message_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SesNotificationSender>();
    }

    #[test]
    fn contentはutf8の文字セットを指定する() {
        let built = content("件名", "件名").unwrap();

        assert_eq!(built.data(), "件名");
        assert_eq!(built.charset(), Some("UTF-8"));
    }
}
