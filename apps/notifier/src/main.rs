//! # Scholamail 通知ワーカー
//!
//! 標準入力から 1 件のバッチジョブ（JSON）を読み込み、宛先ごとの配信結果を
//! JSON Lines で標準出力に書き出す。
//!
//! ## ジョブ形式
//!
//! ```json
//! {
//!   "tenant_id": "0190f3c2-...",
//!   "template_type": "absence_alert",
//!   "from": "office@sakura.example.com",
//!   "recipients": [
//!     { "to": "parent@example.com", "context": { "student": { "firstName": "Ana" } } }
//!   ]
//! }
//! ```
//!
//! `from` は任意。省略時は `NOTIFICATION_FROM_ADDRESS` を使う。
//!
//! ## 起動方法
//!
//! ```bash
//! # 配信
//! cargo run -p scholamail-notifier < job.json
//!
//! # 先頭の宛先のレンダリング結果だけを確認する（送信しない）
//! cargo run -p scholamail-notifier -- --preview < job.json
//! ```
//!
//! Ctrl-C または `NOTIFICATION_DEADLINE_SECS` の経過でキャンセルトークンを発火し、
//! 未完了の配信は `cancelled` として出力する。

use std::{sync::Arc, time::Duration};

use anyhow::Context as _;
use scholamail_domain::{
    clock::SystemClock,
    notification::{BuiltinTemplates, NotificationTemplateType},
    tenant::TenantId,
};
use scholamail_infra::{
    db,
    notification::{
        NoopNotificationSender,
        NotificationSender,
        SesNotificationSender,
        SmtpNotificationSender,
    },
    repository::{
        PostgresNotificationLogRepository,
        PostgresNotificationTemplateRepository,
        PostgresTenantRepository,
    },
};
use scholamail_notifier::{
    config::{NotificationBackend, NotificationConfig, NotifierConfig},
    usecase::{DispatchError, NotificationDispatcher, Recipient, RecipientOutcome, TemplateSelector},
};
use scholamail_shared::observability::{TracingConfig, init_tracing};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt as _;
use tokio_util::sync::CancellationToken;

/// 標準入力から読み込むバッチジョブ
#[derive(Debug, Deserialize)]
struct BatchJob {
    tenant_id:     TenantId,
    template_type: NotificationTemplateType,
    #[serde(default)]
    from:          Option<String>,
    recipients:    Vec<Recipient>,
}

/// 標準出力に書き出す宛先ごとの結果
#[derive(Debug, Serialize)]
struct OutcomeLine {
    to:         String,
    status:     &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error:      Option<String>,
}

impl From<RecipientOutcome> for OutcomeLine {
    fn from(outcome: RecipientOutcome) -> Self {
        match outcome.result {
            Ok(sent) => Self {
                to:         outcome.to,
                status:     "sent",
                message_id: Some(sent.message_id),
                error:      None,
            },
            Err(e) => Self {
                to:         outcome.to,
                status:     if matches!(e, DispatchError::Cancelled) { "cancelled" } else { "failed" },
                message_id: None,
                error:      Some(e.to_string()),
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    init_tracing(TracingConfig::from_env("scholamail-notifier"));

    let preview = std::env::args().skip(1).any(|arg| arg == "--preview");
    let config = NotifierConfig::from_env().context("設定の読み込みに失敗しました")?;

    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("標準入力の読み込みに失敗しました")?;
    let job: BatchJob = serde_json::from_str(&input).context("ジョブの JSON が不正です")?;

    let max_connections = u32::try_from(config.batch_concurrency)
        .unwrap_or(u32::MAX)
        .saturating_add(2);
    let pool = db::create_pool(&config.database_url, max_connections)
        .await
        .context("データベース接続に失敗しました")?;
    db::run_migrations(&pool)
        .await
        .context("マイグレーションの実行に失敗しました")?;
    tracing::info!("データベースに接続しました");

    let selector = TemplateSelector::new(
        Arc::new(PostgresNotificationTemplateRepository::new(pool.clone())),
        BuiltinTemplates::standard(),
    );
    let dispatcher = NotificationDispatcher::new(
        selector,
        Arc::new(PostgresTenantRepository::new(pool.clone())),
        build_sender(&config.notification).await,
        Arc::new(PostgresNotificationLogRepository::new(pool)),
        Arc::new(SystemClock),
    )
    .with_from(job.from.clone())
    .with_batch_concurrency(config.batch_concurrency);

    if preview {
        let first = job
            .recipients
            .into_iter()
            .next()
            .context("プレビューには宛先が 1 件以上必要です")?;
        let rendered = dispatcher
            .preview(&job.tenant_id, job.template_type, first.context)
            .await?;
        println!("{}", serde_json::to_string(&rendered)?);
        return Ok(());
    }

    let cancel = CancellationToken::new();
    spawn_cancel_triggers(&cancel, config.deadline);

    tracing::info!(
        tenant_id = %job.tenant_id,
        template_type = %job.template_type,
        recipients = job.recipients.len(),
        "通知バッチを開始します"
    );
    let outcomes = dispatcher
        .dispatch_batch(&job.tenant_id, job.template_type, job.recipients, &cancel)
        .await;

    let mut failed = 0;
    for outcome in outcomes {
        let line = OutcomeLine::from(outcome);
        if line.status != "sent" {
            failed += 1;
        }
        println!("{}", serde_json::to_string(&line)?);
    }

    if failed > 0 {
        anyhow::bail!("{failed} 件の配信が完了しませんでした");
    }
    Ok(())
}

/// 設定に応じた送信手段を作成する
async fn build_sender(config: &NotificationConfig) -> Arc<dyn NotificationSender> {
    match config.backend {
        NotificationBackend::Smtp => {
            tracing::info!(host = %config.smtp_host, port = config.smtp_port, "SMTP で送信します");
            Arc::new(SmtpNotificationSender::new(
                &config.smtp_host,
                config.smtp_port,
                config.from_address.clone(),
            ))
        }
        NotificationBackend::Ses => {
            tracing::info!("Amazon SES で送信します");
            let aws_config = aws_config::load_from_env().await;
            Arc::new(SesNotificationSender::new(
                aws_sdk_sesv2::Client::new(&aws_config),
                config.from_address.clone(),
            ))
        }
        NotificationBackend::Noop => {
            tracing::info!("送信しません（NOTIFICATION_BACKEND=noop）");
            Arc::new(NoopNotificationSender)
        }
    }
}

/// Ctrl-C と期限をキャンセルトークンに接続する
fn spawn_cancel_triggers(cancel: &CancellationToken, deadline: Option<Duration>) {
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Ctrl-C を受信しました。配信をキャンセルします");
            token.cancel();
        }
    });

    if let Some(deadline) = deadline {
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(deadline) => {
                    tracing::warn!(deadline_secs = deadline.as_secs(), "期限を超過しました。配信をキャンセルします");
                    token.cancel();
                }
            }
        });
    }
}
