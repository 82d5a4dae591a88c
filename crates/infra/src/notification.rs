//! # 通知送信
//!
//! メール通知の送信を担当するインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: `NotificationSender` trait でメール送信を抽象化
//! - **3 つの実装**: SMTP（Mailpit 開発用）、SES（本番用）、Noop（テスト用）
//! - **環境変数切替**: `NOTIFICATION_BACKEND` でランタイム選択
//! - **再試行しない**: 送信エラーは呼び出し側へそのまま返す

mod noop;
mod ses;
mod smtp;

use async_trait::async_trait;
pub use noop::NoopNotificationSender;
use scholamail_domain::notification::{EmailMessage, NotificationError, SentMessage};
pub use ses::SesNotificationSender;
pub use smtp::SmtpNotificationSender;

/// メール送信トレイト
///
/// SMTP / SES / Noop の 3 実装を環境変数で切り替える。
/// `EmailMessage::from` が指定されていれば既定の送信元より優先する。
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// メールを送信し、送信手段が払い出したメッセージ ID を返す
    async fn send_email(&self, email: &EmailMessage) -> Result<SentMessage, NotificationError>;
}

/// 送信元アドレスを決める
fn sender_address<'a>(email: &'a EmailMessage, default: &'a str) -> &'a str {
    email
        .from
        .as_deref()
        .filter(|from| !from.trim().is_empty())
        .unwrap_or(default)
}
