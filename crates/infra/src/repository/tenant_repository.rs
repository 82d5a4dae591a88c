//! # TenantRepository
//!
//! テナントディレクトリ（学校名・連絡先・ロゴ）の取得を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **読み取り専用**: テナント作成・更新は将来のスコープ
//! - **空文字列の正規化**: 未入力の連絡先は `None` として扱う

use async_trait::async_trait;
use scholamail_domain::tenant::{TenantId, TenantName, TenantProfile};
use sqlx::PgPool;

use crate::error::InfraError;

/// テナントリポジトリトレイト
///
/// テナント情報の読み取り操作を定義する。
#[async_trait]
pub trait TenantRepository: Send + Sync {
    /// ID でテナントプロファイルを検索
    async fn find_profile(&self, id: &TenantId) -> Result<Option<TenantProfile>, InfraError>;
}

#[derive(sqlx::FromRow)]
struct TenantProfileRow {
    name:          String,
    address:       Option<String>,
    contact_email: Option<String>,
    contact_phone: Option<String>,
    logo_url:      Option<String>,
}

impl TryFrom<TenantProfileRow> for TenantProfile {
    type Error = InfraError;

    fn try_from(row: TenantProfileRow) -> Result<Self, Self::Error> {
        Ok(TenantProfile::from_db(
            TenantName::new(row.name)?,
            row.address,
            row.contact_email,
            row.contact_phone,
            row.logo_url,
        ))
    }
}

/// PostgreSQL 実装の TenantRepository
#[derive(Debug, Clone)]
pub struct PostgresTenantRepository {
    pool: PgPool,
}

impl PostgresTenantRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantRepository for PostgresTenantRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(tenant_id = %id))]
    async fn find_profile(&self, id: &TenantId) -> Result<Option<TenantProfile>, InfraError> {
        let row = sqlx::query_as::<_, TenantProfileRow>(
            r#"
            SELECT name, address, contact_email, contact_phone, logo_url
            FROM tenants
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TenantProfile::try_from).transpose()
    }
}
