//! # ワーカーのログ出力
//!
//! 通知ワーカーは stdout に配信結果の JSON Lines を書くため、ログはすべて
//! stderr に流す。出力形式は `LOG_FORMAT`（`json` / `pretty`）、
//! レベルは `RUST_LOG` で切り替える。
//!
//! `tracing_error::ErrorLayer` を登録し、`InfraError` が捕捉する `SpanTrace` に
//! 呼び出し経路を残す。

/// 既定のフィルタ（`RUST_LOG` 未設定時）
pub const DEFAULT_FILTER: &str = "info,scholamail=debug";

/// ログ出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 1 行 1 イベントの JSON（ログ収集基盤向け）
    Json,
    /// 端末向けの整形出力
    #[default]
    Pretty,
}

impl LogFormat {
    /// 値を解釈する（大文字小文字と前後の空白は無視、不正な値は `Pretty`）
    ///
    /// subscriber の初期化前に呼ばれるため、警告は stderr に直接書く。
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "" | "pretty" => Self::Pretty,
            other => {
                eprintln!("WARNING: unknown LOG_FORMAT={other:?}, falling back to pretty");
                Self::Pretty
            }
        }
    }
}

/// トレーシング初期化設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// 起動ログに出すサービス名
    pub service_name: String,
    pub log_format:   LogFormat,
    /// `RUST_LOG` 相当のフィルタ指定。`None` なら [`DEFAULT_FILTER`]
    pub filter:       Option<String>,
}

impl TracingConfig {
    /// 環境変数（`LOG_FORMAT`, `RUST_LOG`）から設定を読み取る
    pub fn from_env(service_name: impl Into<String>) -> Self {
        Self::from_lookup(service_name, |name| std::env::var(name).ok())
    }

    /// 任意の参照関数から設定を読み取る
    pub fn from_lookup(service_name: impl Into<String>, lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            service_name: service_name.into(),
            log_format:   lookup("LOG_FORMAT")
                .map(|value| LogFormat::parse(&value))
                .unwrap_or_default(),
            filter:       lookup("RUST_LOG").filter(|value| !value.trim().is_empty()),
        }
    }

    /// 実際に使うフィルタ指定
    pub fn filter_directives(&self) -> &str {
        self.filter.as_deref().unwrap_or(DEFAULT_FILTER)
    }
}

/// stderr 向けの subscriber を登録する
///
/// フィルタ指定が解釈できない場合は [`DEFAULT_FILTER`] で初期化し、警告を出す。
#[cfg(feature = "observability")]
pub fn init_tracing(config: TracingConfig) {
    use std::io::IsTerminal as _;

    use tracing_subscriber::{EnvFilter, Layer as _, layer::SubscriberExt, util::SubscriberInitExt};

    let (env_filter, invalid_filter) = match EnvFilter::try_new(config.filter_directives()) {
        Ok(filter) => (filter, None),
        Err(e) => (EnvFilter::new(DEFAULT_FILTER), Some(e)),
    };

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_ansi(std::io::stderr().is_terminal())
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(tracing_error::ErrorLayer::default())
        .init();

    if let Some(e) = invalid_filter {
        tracing::warn!(filter = config.filter_directives(), error = %e, "RUST_LOG を解釈できないため既定のフィルタを使用");
    }
    tracing::debug!(
        service = %config.service_name,
        log_format = ?config.log_format,
        "トレーシングを初期化"
    );
}
