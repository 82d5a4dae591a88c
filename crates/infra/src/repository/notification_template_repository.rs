//! # NotificationTemplateRepository
//!
//! テナントが保存した通知テンプレートの読み取りを担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **読み取り専用**: テンプレートの作成・編集は管理画面側の責務
//! - **テナント分離**: [`TenantConnection`] で RLS を有効にした上で tenant_id でも絞り込む
//! - **並び順の保証**: `is_default DESC, updated_at DESC` で返す。
//!   選択ロジックは先頭要素を採用するだけでよい

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scholamail_domain::{
    notification::{
        NotificationTemplate,
        NotificationTemplateId,
        NotificationTemplateRecord,
        NotificationTemplateType,
        ThemeId,
    },
    tenant::TenantId,
    value_objects::Version,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TenantConnection, error::InfraError};

/// 通知テンプレートリポジトリトレイト
#[async_trait]
pub trait NotificationTemplateRepository: Send + Sync {
    /// 有効なテンプレートを検索する
    ///
    /// # 戻り値
    ///
    /// `is_default DESC, updated_at DESC` の順に並んだ有効なテンプレート。
    /// 該当がなければ空の Vec。
    async fn find_active(
        &self,
        tenant_id: &TenantId,
        template_type: NotificationTemplateType,
    ) -> Result<Vec<NotificationTemplate>, InfraError>;
}

/// DB の notification_templates テーブルの行を表す中間構造体
///
/// `TryFrom` で `NotificationTemplate` への変換ロジックを一箇所に集約する。
#[derive(sqlx::FromRow)]
struct NotificationTemplateRow {
    id:              Uuid,
    tenant_id:       Uuid,
    template_type:   String,
    subject_pattern: String,
    body_pattern:    String,
    theme_id:        String,
    is_active:       bool,
    is_default:      bool,
    version:         i32,
    updated_at:      DateTime<Utc>,
}

impl TryFrom<NotificationTemplateRow> for NotificationTemplate {
    type Error = InfraError;

    fn try_from(row: NotificationTemplateRow) -> Result<Self, Self::Error> {
        Ok(NotificationTemplate::from_db(NotificationTemplateRecord {
            id:              NotificationTemplateId::from_uuid(row.id),
            tenant_id:       TenantId::from_uuid(row.tenant_id),
            template_type:   row.template_type.parse::<NotificationTemplateType>().map_err(|e| {
                InfraError::invalid_data(format!("template_type '{}': {e}", row.template_type))
            })?,
            subject_pattern: row.subject_pattern,
            body_pattern:    row.body_pattern,
            theme:           ThemeId::parse_or_default(&row.theme_id),
            is_active:       row.is_active,
            is_default:      row.is_default,
            version:         Version::try_from(row.version)?,
            updated_at:      row.updated_at,
        }))
    }
}

/// PostgreSQL 実装の NotificationTemplateRepository
#[derive(Debug, Clone)]
pub struct PostgresNotificationTemplateRepository {
    pool: PgPool,
}

impl PostgresNotificationTemplateRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationTemplateRepository for PostgresNotificationTemplateRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(%tenant_id, %template_type))]
    async fn find_active(
        &self,
        tenant_id: &TenantId,
        template_type: NotificationTemplateType,
    ) -> Result<Vec<NotificationTemplate>, InfraError> {
        let mut conn = TenantConnection::acquire(&self.pool, tenant_id).await?;

        let rows = sqlx::query_as::<_, NotificationTemplateRow>(
            r#"
            SELECT
                id,
                tenant_id,
                template_type,
                subject_pattern,
                body_pattern,
                theme_id,
                is_active,
                is_default,
                version,
                updated_at
            FROM notification_templates
            WHERE tenant_id = $1 AND template_type = $2 AND is_active
            ORDER BY is_default DESC, updated_at DESC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(<&'static str>::from(template_type))
        .fetch_all(&mut *conn)
        .await?;

        rows.into_iter().map(NotificationTemplate::try_from).collect()
    }
}
