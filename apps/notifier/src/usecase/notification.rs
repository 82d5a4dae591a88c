//! # 通知ユースケース
//!
//! テナントごとのテンプレート選択、レンダリング、送信、ログ記録を統合する。
//!
//! ## モジュール構成
//!
//! - [`selector`] - 保存テンプレートと組み込みテンプレートからの選択
//! - [`dispatcher`] - コンテキスト補完 + レンダリング + 送信 + ログ記録の統合

pub mod dispatcher;
pub mod selector;

pub use dispatcher::{
    DispatchError,
    DispatchRequest,
    NotificationDispatcher,
    Recipient,
    RecipientOutcome,
};
pub use selector::{SelectedTemplate, TemplateSelector};
