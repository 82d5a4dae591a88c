//! # Notifier 設定
//!
//! 環境変数から通知ワーカーの設定を読み込む。
//!
//! | 変数名 | 必須 | デフォルト |
//! |--------|------|-----------|
//! | `DATABASE_URL` | **Yes** | - |
//! | `NOTIFICATION_BACKEND` | No | `noop` |
//! | `SMTP_HOST` / `SMTP_PORT` | No | `localhost` / `1025` |
//! | `NOTIFICATION_FROM_ADDRESS` | No | `noreply@scholamail.example.com` |
//! | `NOTIFICATION_DEADLINE_SECS` | No | なし（期限なし） |
//! | `NOTIFICATION_BATCH_CONCURRENCY` | No | `8` |

use std::{env, str::FromStr, time::Duration};

use thiserror::Error;

const DEFAULT_BATCH_CONCURRENCY: usize = 8;

/// 設定読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// 必須の環境変数が未設定
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    /// 値を解釈できない
    #[error("{name} の値が不正です: {value:?}（{reason}）")]
    Invalid {
        name:   &'static str,
        value:  String,
        reason: String,
    },
}

/// 通知ワーカーの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifierConfig {
    /// データベース接続 URL
    pub database_url:      String,
    /// 通知設定
    pub notification:      NotificationConfig,
    /// バッチ全体の期限（超過するとキャンセルする）
    pub deadline:          Option<Duration>,
    /// バッチ内の同時送信数
    pub batch_concurrency: usize,
}

/// 送信バックエンド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationBackend {
    /// Mailpit（開発）/ SMTP サーバー経由で送信
    Smtp,
    /// Amazon SES v2 経由で送信（本番）
    Ses,
    /// 送信しない（ログ出力のみ）
    Noop,
}

impl FromStr for NotificationBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smtp" => Ok(Self::Smtp),
            "ses" => Ok(Self::Ses),
            "noop" => Ok(Self::Noop),
            _ => Err("smtp / ses / noop のいずれかを指定してください".to_string()),
        }
    }
}

/// 通知送信の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    pub backend:      NotificationBackend,
    /// SMTP ホスト（backend=smtp の場合に使用）
    pub smtp_host:    String,
    /// SMTP ポート（backend=smtp の場合に使用）
    pub smtp_port:    u16,
    /// 既定の送信元メールアドレス
    pub from_address: String,
}

impl NotifierConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の参照関数から設定を読み込む
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());

        let deadline = var("NOTIFICATION_DEADLINE_SECS")
            .map(|value| parse::<u64>("NOTIFICATION_DEADLINE_SECS", value))
            .transpose()?
            .map(Duration::from_secs);

        let batch_concurrency = match var("NOTIFICATION_BATCH_CONCURRENCY") {
            Some(value) => parse::<usize>("NOTIFICATION_BATCH_CONCURRENCY", value)?,
            None => DEFAULT_BATCH_CONCURRENCY,
        };
        if batch_concurrency == 0 {
            return Err(ConfigError::Invalid {
                name:   "NOTIFICATION_BATCH_CONCURRENCY",
                value:  "0".to_string(),
                reason: "1 以上を指定してください".to_string(),
            });
        }

        Ok(Self {
            database_url: var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            notification: NotificationConfig {
                backend:      parse("NOTIFICATION_BACKEND", var("NOTIFICATION_BACKEND").unwrap_or_else(|| "noop".to_string()))?,
                smtp_host:    var("SMTP_HOST").unwrap_or_else(|| "localhost".to_string()),
                smtp_port:    parse("SMTP_PORT", var("SMTP_PORT").unwrap_or_else(|| "1025".to_string()))?,
                from_address: var("NOTIFICATION_FROM_ADDRESS")
                    .unwrap_or_else(|| "noreply@scholamail.example.com".to_string()),
            },
            deadline,
            batch_concurrency,
        })
    }
}

fn parse<T>(name: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        reason: e.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<NotifierConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        NotifierConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_未設定の項目はデフォルト値になる() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/scholamail")]).unwrap();

        assert_eq!(
            config,
            NotifierConfig {
                database_url:      "postgres://localhost/scholamail".to_string(),
                notification:      NotificationConfig {
                    backend:      NotificationBackend::Noop,
                    smtp_host:    "localhost".to_string(),
                    smtp_port:    1025,
                    from_address: "noreply@scholamail.example.com".to_string(),
                },
                deadline:          None,
                batch_concurrency: 8,
            }
        );
    }

    #[test]
    fn test_すべての項目を読み込む() {
        let config = load(&[
            ("DATABASE_URL", "postgres://db/scholamail"),
            ("NOTIFICATION_BACKEND", "SMTP"),
            ("SMTP_HOST", "mailpit"),
            ("SMTP_PORT", "2525"),
            ("NOTIFICATION_FROM_ADDRESS", "office@sakura.example.com"),
            ("NOTIFICATION_DEADLINE_SECS", "30"),
            ("NOTIFICATION_BATCH_CONCURRENCY", "2"),
        ])
        .unwrap();

        assert_eq!(config.notification.backend, NotificationBackend::Smtp);
        assert_eq!(config.notification.smtp_host, "mailpit");
        assert_eq!(config.notification.smtp_port, 2525);
        assert_eq!(config.deadline, Some(Duration::from_secs(30)));
        assert_eq!(config.batch_concurrency, 2);
    }

    #[test]
    fn test_database_urlがなければエラー() {
        assert_eq!(load(&[]), Err(ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn test_不正な値はエラー() {
        let base = ("DATABASE_URL", "postgres://localhost/scholamail");

        assert!(matches!(
            load(&[base, ("SMTP_PORT", "mailpit")]),
            Err(ConfigError::Invalid { name: "SMTP_PORT", .. })
        ));
        assert!(matches!(
            load(&[base, ("NOTIFICATION_BACKEND", "sendgrid")]),
            Err(ConfigError::Invalid { name: "NOTIFICATION_BACKEND", .. })
        ));
        assert!(matches!(
            load(&[base, ("NOTIFICATION_BATCH_CONCURRENCY", "0")]),
            Err(ConfigError::Invalid { name: "NOTIFICATION_BATCH_CONCURRENCY", .. })
        ));
    }
}
