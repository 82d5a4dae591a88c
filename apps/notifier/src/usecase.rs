//! # ユースケース層
//!
//! 通知ワーカーのビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: リポジトリと送信手段を `Arc<dyn Trait>` で外部から注入
//! - **純粋なレンダリング**: I/O はユースケースに集約し、レンダリングはドメイン層に任せる
//!
//! ## モジュール構成
//!
//! - `notification`: テンプレート選択と配信

pub mod notification;

pub use notification::{
    DispatchError,
    DispatchRequest,
    NotificationDispatcher,
    Recipient,
    RecipientOutcome,
    SelectedTemplate,
    TemplateSelector,
};
