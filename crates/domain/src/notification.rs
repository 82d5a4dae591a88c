//! # 通知
//!
//! 通知テンプレートの解決とレンダリングに関するドメインモデルを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 説明 |
//! |---|------------|------|
//! | [`NotificationTemplate`] | 通知テンプレート | テナントが保存したテンプレート |
//! | [`BuiltinTemplate`] | 組み込みテンプレート | 保存テンプレートがない場合の既定 |
//! | [`NotificationContext`] | 通知コンテキスト | 送信ごとに組み立てる実行時データ |
//! | [`RenderedNotification`] | レンダリング結果 | 件名とテーマ適用済みの HTML |
//! | [`EmailMessage`] | メールメッセージ | 送信手段に渡すメッセージ |
//!
//! ## パイプライン
//!
//! ```text
//! テンプレート + コンテキスト
//!   → ディレクティブ評価（{{#if}}）
//!   → 埋め込み（{{path || 'literal'}}、画像判定）
//!   → テーマ適用
//!   → EmailMessage
//! ```
//!
//! レンダリングは I/O を持たない純粋関数で、欠損データはエラーにならない。

pub mod builtin;
pub mod context;
pub mod media;
pub mod path;
pub mod render;
pub mod syntax;
pub mod template;
pub mod theme;

pub use builtin::{BuiltinTemplate, BuiltinTemplates};
pub use context::NotificationContext;
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
pub use template::{
    NotificationTemplate,
    NotificationTemplateId,
    NotificationTemplateRecord,
    NotificationTemplateType,
};
pub use theme::ThemeId;
use thiserror::Error;

define_uuid_id! {
    /// 通知ログ ID（一意識別子）
    ///
    /// notification_logs テーブルの主キー。UUID v7 を使用。
    pub struct NotificationLogId;
}

/// 通知送信エラー
#[derive(Debug, Error)]
pub enum NotificationError {
    /// メール送信に失敗
    #[error("メール送信に失敗: {0}")]
    SendFailed(String),

    /// 宛先または送信元のアドレスが不正
    #[error("メールアドレスが不正: {0}")]
    InvalidAddress(String),

    /// テーマレイアウトの描画に失敗
    #[error("テンプレートの描画に失敗: {0}")]
    TemplateFailed(String),
}

/// 配信ステータス
///
/// notification_logs テーブルの `status` カラムに格納される値。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

/// 使用したテンプレートの出所
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TemplateSource {
    /// テナントが保存したテンプレート
    Stored,
    /// 組み込みテンプレート
    Builtin,
}

/// メールメッセージ
///
/// レンダリングの出力。NotificationSender に渡される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// 送信先メールアドレス
    pub to:        String,
    /// 件名
    pub subject:   String,
    /// HTML 本文
    pub html_body: String,
    /// 送信元アドレスの上書き（`None` なら送信手段の既定値）
    pub from:      Option<String>,
}

/// 送信結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentMessage {
    /// 送信手段が払い出したメッセージ ID
    pub message_id: String,
}

/// レンダリング結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedNotification {
    pub subject: String,
    pub html:    String,
}

impl RenderedNotification {
    /// 宛先を指定してメールメッセージにする
    pub fn into_email(self, to: impl Into<String>, from: Option<String>) -> EmailMessage {
        EmailMessage {
            to: to.into(),
            subject: self.subject,
            html_body: self.html,
            from,
        }
    }
}

/// 件名と本文をレンダリングし、本文をテーマで包む
///
/// 件名と本文は独立に解決する。テーマのブランド情報はコンテキストの
/// `school.*` から取る。
pub fn render_notification(
    subject_pattern: &str,
    body_pattern: &str,
    theme: ThemeId,
    context: &NotificationContext,
) -> Result<RenderedNotification, NotificationError> {
    let subject = render::render(subject_pattern, context);
    let body = render::render(body_pattern, context);

    Ok(RenderedNotification {
        subject: fold_line_breaks(&subject),
        html:    theme::wrap(&body, theme, &context.branding())?,
    })
}

/// 件名の CR / LF を空白に置き換える（その他の空白はそのまま）
fn fold_line_breaks(subject: &str) -> String {
    subject.replace(['\r', '\n'], " ")
}
