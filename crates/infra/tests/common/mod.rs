//! テスト共通フィクスチャ
//!
//! DB を使用する統合テストで共通利用するシードデータ生成ヘルパー。
//! Rust の統合テスト規約に従い `tests/common/mod.rs` に配置。

// 各テストファイルが独立したクレートとしてコンパイルされるため、
// 使用しない関数に dead_code 警告が出る。モジュール全体で抑制する。
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use scholamail_domain::{notification::NotificationTemplateType, tenant::TenantId};
use sqlx::PgPool;
use uuid::Uuid;

/// テナントを作成する（連絡先なし）
pub async fn insert_tenant(pool: &PgPool, name: &str) -> TenantId {
    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO tenants (id, name) VALUES ($1, $2)")
        .bind(id)
        .bind(name)
        .execute(pool)
        .await
        .expect("テナント作成に失敗");
    TenantId::from_uuid(id)
}

/// 通知テンプレートの挿入パラメータ
pub struct TemplateSeed<'a> {
    pub template_type: NotificationTemplateType,
    pub subject:       &'a str,
    pub theme_id:      &'a str,
    pub is_active:     bool,
    pub is_default:    bool,
    pub updated_at:    DateTime<Utc>,
}

impl<'a> TemplateSeed<'a> {
    pub fn new(template_type: NotificationTemplateType, subject: &'a str, updated_at_secs: i64) -> Self {
        Self {
            template_type,
            subject,
            theme_id: "classic",
            is_active: true,
            is_default: false,
            updated_at: DateTime::from_timestamp(updated_at_secs, 0).unwrap(),
        }
    }
}

/// 通知テンプレートを作成する
pub async fn insert_template(pool: &PgPool, tenant_id: &TenantId, seed: TemplateSeed<'_>) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query(
        r#"
        INSERT INTO notification_templates (
            id, tenant_id, template_type, subject_pattern, body_pattern,
            theme_id, is_active, is_default, updated_at
        )
        VALUES ($1, $2, $3, $4, '<p>{{school.name}}</p>', $5, $6, $7, $8)
        "#,
    )
    .bind(id)
    .bind(tenant_id.as_uuid())
    .bind(<&'static str>::from(seed.template_type))
    .bind(seed.subject)
    .bind(seed.theme_id)
    .bind(seed.is_active)
    .bind(seed.is_default)
    .bind(seed.updated_at)
    .execute(pool)
    .await
    .expect("通知テンプレート作成に失敗");
    id
}
