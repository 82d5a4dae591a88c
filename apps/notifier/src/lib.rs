//! # Notifier ライブラリ
//!
//! 通知ワーカーの設定とユースケースを公開する。
//! 結合テストから内部モジュールにアクセスするためにライブラリとしても提供する。

pub mod config;
pub mod usecase;
