//! # 通知ディスパッチャ
//!
//! コンテキスト補完 → テンプレート選択 → レンダリング → 送信 → ログ記録を統合する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: テンプレートストア、テナントディレクトリ、送信手段、通知ログは
//!   trait で抽象化し、コンストラクタで受け取る
//! - **再試行しない**: 送信エラーはそのまま呼び出し側へ返す
//! - **ログ記録は結果に影響しない**: 通知ログの書き込み失敗はログ出力のみ
//! - **キャンセル**: 外部 I/O の await はすべて [`CancellationToken`] と競合させる。
//!   キャンセル時は実行中の future をドロップし [`DispatchError::Cancelled`] を返す
//! - **バッチ**: 宛先ごとに独立して並行処理し、結果は入力順で返す

use std::sync::Arc;

use futures::{StreamExt, stream};
use scholamail_domain::{
    clock::Clock,
    notification::{
        DeliveryStatus,
        NotificationContext,
        NotificationError,
        NotificationLogId,
        NotificationTemplateType,
        RenderedNotification,
        SentMessage,
        render_notification,
    },
    tenant::TenantId,
};
use scholamail_infra::{
    InfraError,
    notification::NotificationSender,
    repository::{NotificationLog, NotificationLogRepository, TenantRepository},
};
use scholamail_shared::{
    event_log::{error, event},
    log_business_event,
};
use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::{SelectedTemplate, TemplateSelector};

/// バッチの既定の同時送信数
const DEFAULT_BATCH_CONCURRENCY: usize = 8;

/// 配信エラー
#[derive(Debug, Error)]
pub enum DispatchError {
    /// 保存テンプレートも組み込みテンプレートも存在しない
    #[error("通知テンプレートが見つかりません: tenant={tenant_id}, type={template_type}")]
    TemplateNotFound {
        tenant_id:     TenantId,
        template_type: NotificationTemplateType,
    },

    /// テンプレートストアの読み取りに失敗
    #[error("通知テンプレートの取得に失敗: {0}")]
    TemplateLookup(#[source] InfraError),

    /// テーマレイアウトの描画に失敗
    #[error("通知のレンダリングに失敗: {0}")]
    Render(#[source] NotificationError),

    /// 送信手段のエラー（加工せずに返す）
    #[error(transparent)]
    Transport(NotificationError),

    /// 呼び出し側によるキャンセル
    #[error("配信がキャンセルされました")]
    Cancelled,
}

/// 単一宛先への配信リクエスト
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub tenant_id:     TenantId,
    pub template_type: NotificationTemplateType,
    pub to:            String,
    pub context:       NotificationContext,
}

/// バッチ配信の宛先
#[derive(Debug, Clone, Deserialize)]
pub struct Recipient {
    pub to:      String,
    #[serde(default)]
    pub context: NotificationContext,
}

/// バッチ配信の宛先ごとの結果
#[derive(Debug)]
pub struct RecipientOutcome {
    pub to:     String,
    pub result: Result<SentMessage, DispatchError>,
}

/// 通知ディスパッチャ
pub struct NotificationDispatcher {
    selector:          TemplateSelector,
    tenant_repo:       Arc<dyn TenantRepository>,
    sender:            Arc<dyn NotificationSender>,
    log_repo:          Arc<dyn NotificationLogRepository>,
    clock:             Arc<dyn Clock>,
    from:              Option<String>,
    batch_concurrency: usize,
}

impl NotificationDispatcher {
    pub fn new(
        selector: TemplateSelector,
        tenant_repo: Arc<dyn TenantRepository>,
        sender: Arc<dyn NotificationSender>,
        log_repo: Arc<dyn NotificationLogRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            selector,
            tenant_repo,
            sender,
            log_repo,
            clock,
            from: None,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
        }
    }

    /// 送信元アドレスを上書きする
    pub fn with_from(mut self, from: Option<String>) -> Self {
        self.from = from.filter(|f| !f.trim().is_empty());
        self
    }

    /// バッチの同時送信数を設定する（0 は 1 として扱う）
    pub fn with_batch_concurrency(mut self, concurrency: usize) -> Self {
        self.batch_concurrency = concurrency.max(1);
        self
    }

    /// 1 件の通知を配信する
    ///
    /// 送信エラーは [`DispatchError::Transport`] としてそのまま返す。
    /// 通知ログの書き込み失敗は結果に影響しない。
    #[tracing::instrument(
        skip_all,
        fields(tenant_id = %request.tenant_id, template_type = %request.template_type)
    )]
    pub async fn dispatch(
        &self,
        request: DispatchRequest,
        cancel: &CancellationToken,
    ) -> Result<SentMessage, DispatchError> {
        let DispatchRequest {
            tenant_id,
            template_type,
            to,
            context,
        } = request;
        let template_type_str: &str = template_type.into();

        let (selected, rendered) = self
            .prepare(&tenant_id, template_type, context, cancel)
            .await
            .inspect_err(|e| log_dispatch_error(e, &tenant_id, template_type_str, &to))?;

        let subject = rendered.subject.clone();
        let email = rendered.into_email(to.clone(), self.from.clone());

        let result = until_cancelled(cancel, self.sender.send_email(&email))
            .await
            .inspect_err(|e| log_dispatch_error(e, &tenant_id, template_type_str, &to))?;

        let status = match &result {
            Ok(sent) => {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::NOTIFICATION_SENT,
                    event.tenant_id = %tenant_id,
                    event.entity_type = event::entity_type::NOTIFICATION_LOG,
                    event.result = event::result::SUCCESS,
                    notification.template_type = template_type_str,
                    notification.template_source = %selected.source(),
                    notification.recipient = %to,
                    notification.message_id = %sent.message_id,
                    "通知メール送信成功"
                );
                DeliveryStatus::Sent
            }
            Err(e) => {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::NOTIFICATION_FAILED,
                    event.tenant_id = %tenant_id,
                    event.entity_type = event::entity_type::NOTIFICATION_LOG,
                    event.result = event::result::FAILURE,
                    notification.template_type = template_type_str,
                    notification.template_source = %selected.source(),
                    notification.recipient = %to,
                    error.category = error::category::EXTERNAL_SERVICE,
                    error.kind = error::kind::TRANSPORT,
                    error = %e,
                    "通知メール送信失敗"
                );
                DeliveryStatus::Failed
            }
        };

        let log = NotificationLog {
            id: NotificationLogId::new(),
            tenant_id: tenant_id.clone(),
            template_type,
            template_source: selected.source(),
            recipient_email: to,
            subject,
            status,
            error_message: result.as_ref().err().map(ToString::to_string),
            message_id: result.as_ref().ok().map(|sent| sent.message_id.clone()),
            sent_at: self.clock.now(),
        };
        self.record(&log, cancel).await;

        result.map_err(DispatchError::Transport)
    }

    /// 複数の宛先へ配信する
    ///
    /// 宛先ごとに独立して処理し、1 件の失敗は他の宛先に影響しない。
    /// 結果は入力と同じ順序で返す。
    #[tracing::instrument(skip_all, fields(%tenant_id, template_type = %template_type, recipients = recipients.len()))]
    pub async fn dispatch_batch(
        &self,
        tenant_id: &TenantId,
        template_type: NotificationTemplateType,
        recipients: Vec<Recipient>,
        cancel: &CancellationToken,
    ) -> Vec<RecipientOutcome> {
        let outcomes: Vec<RecipientOutcome> = stream::iter(recipients)
            .map(move |recipient| {
                let request = DispatchRequest {
                    tenant_id: tenant_id.clone(),
                    template_type,
                    to: recipient.to.clone(),
                    context: recipient.context,
                };
                async move {
                    RecipientOutcome {
                        to:     recipient.to,
                        result: self.dispatch(request, cancel).await,
                    }
                }
            })
            .buffered(self.batch_concurrency)
            .collect()
            .await;

        let succeeded = outcomes.iter().filter(|o| o.result.is_ok()).count();
        let failed = outcomes.len() - succeeded;
        let batch_result = match (succeeded, failed) {
            (_, 0) => event::result::SUCCESS,
            (0, _) => event::result::FAILURE,
            _ => event::result::PARTIAL,
        };
        let template_type_str: &str = template_type.into();
        log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::BATCH_COMPLETED,
            event.tenant_id = %tenant_id,
            event.result = batch_result,
            notification.template_type = template_type_str,
            batch.succeeded = succeeded,
            batch.failed = failed,
            "通知バッチ完了"
        );

        outcomes
    }

    /// 送信せずにレンダリング結果を返す
    #[tracing::instrument(skip_all, fields(%tenant_id, template_type = %template_type))]
    pub async fn preview(
        &self,
        tenant_id: &TenantId,
        template_type: NotificationTemplateType,
        context: NotificationContext,
    ) -> Result<RenderedNotification, DispatchError> {
        let (selected, rendered) = self
            .prepare(tenant_id, template_type, context, &CancellationToken::new())
            .await?;

        let template_type_str: &str = template_type.into();
        log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::NOTIFICATION_RENDERED,
            event.tenant_id = %tenant_id,
            event.entity_type = event::entity_type::NOTIFICATION_TEMPLATE,
            event.result = event::result::SUCCESS,
            notification.template_type = template_type_str,
            notification.template_source = %selected.source(),
            "通知プレビューを生成"
        );

        Ok(rendered)
    }

    /// コンテキスト補完、テンプレート選択、レンダリングを行う
    async fn prepare(
        &self,
        tenant_id: &TenantId,
        template_type: NotificationTemplateType,
        context: NotificationContext,
        cancel: &CancellationToken,
    ) -> Result<(SelectedTemplate<'_>, RenderedNotification), DispatchError> {
        let context = self.enrich(tenant_id, context, cancel).await?;
        let selected = until_cancelled(cancel, self.selector.select(tenant_id, template_type)).await??;

        let rendered = render_notification(
            selected.subject_pattern(),
            selected.body_pattern(),
            selected.theme(),
            &context,
        )
        .map_err(DispatchError::Render)?;
        tracing::debug!(
            template_source = %selected.source(),
            theme = %selected.theme(),
            "通知をレンダリング"
        );

        Ok((selected, rendered))
    }

    /// ブランド情報（`school.*`）に欠けがあればテナントディレクトリから補完する
    ///
    /// 取得失敗や未登録テナントは警告ログのみで、渡されたコンテキストのまま続行する。
    async fn enrich(
        &self,
        tenant_id: &TenantId,
        context: NotificationContext,
        cancel: &CancellationToken,
    ) -> Result<NotificationContext, DispatchError> {
        if context.has_complete_branding() {
            return Ok(context);
        }

        match until_cancelled(cancel, self.tenant_repo.find_profile(tenant_id)).await? {
            Ok(Some(profile)) => Ok(context.with_missing_school_fields(&profile)),
            Ok(None) => {
                tracing::warn!(
                    error.category = error::category::INFRASTRUCTURE,
                    error.kind = error::kind::TENANT_LOOKUP,
                    %tenant_id,
                    "テナントが見つからないため補完せずに続行"
                );
                Ok(context)
            }
            Err(e) => {
                tracing::warn!(
                    error.category = error::category::INFRASTRUCTURE,
                    error.kind = error::kind::TENANT_LOOKUP,
                    %tenant_id,
                    error = %e,
                    "テナント情報の取得に失敗したため補完せずに続行"
                );
                Ok(context)
            }
        }
    }

    /// 通知ログを記録する（失敗はログ出力のみ）
    async fn record(&self, log: &NotificationLog, cancel: &CancellationToken) {
        match until_cancelled(cancel, self.log_repo.insert(log)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(
                    error.category = error::category::INFRASTRUCTURE,
                    error.kind = error::kind::NOTIFICATION_LOG,
                    error = %e,
                    "通知ログの記録に失敗"
                );
            }
            Err(_) => {
                tracing::warn!(
                    error.category = error::category::INFRASTRUCTURE,
                    error.kind = error::kind::NOTIFICATION_LOG,
                    "キャンセルにより通知ログを記録できませんでした"
                );
            }
        }
    }
}

/// future をキャンセルトークンと競合させる
///
/// トークンを先に確認するため、キャンセル済みなら future は一度もポーリングされない。
async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    future: F,
) -> Result<F::Output, DispatchError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DispatchError::Cancelled),
        output = future => Ok(output),
    }
}

fn log_dispatch_error(e: &DispatchError, tenant_id: &TenantId, template_type: &str, to: &str) {
    let (category, kind) = match e {
        DispatchError::TemplateNotFound { .. } => {
            (error::category::INFRASTRUCTURE, error::kind::TEMPLATE_NOT_FOUND)
        }
        DispatchError::TemplateLookup(_) => {
            (error::category::INFRASTRUCTURE, error::kind::TEMPLATE_LOOKUP)
        }
        DispatchError::Render(_) => (error::category::INFRASTRUCTURE, error::kind::TEMPLATE_RENDER),
        DispatchError::Transport(_) => (error::category::EXTERNAL_SERVICE, error::kind::TRANSPORT),
        DispatchError::Cancelled => {
            tracing::info!(%tenant_id, template_type, recipient = %to, "配信がキャンセルされました");
            return;
        }
    };
    tracing::error!(
        error.category = category,
        error.kind = kind,
        %tenant_id,
        template_type,
        recipient = %to,
        error = %e,
        "通知の配信に失敗"
    );
}
