//! DB コネクション管理の統合テスト
//!
//! PostgreSQL セッション変数（`set_config` / `current_setting`）のみ使用し、
//! テーブルへのアクセスは不要。
//!
//! 実行方法:
//! ```bash
//! DATABASE_URL=postgres://... cargo test -p scholamail-infra --test db_test
//! ```

use scholamail_domain::tenant::TenantId;
use scholamail_infra::db::{self, TenantConnection};

/// テスト用の DATABASE_URL
fn database_url() -> String {
    dotenvy::dotenv().ok();
    std::env::var("DATABASE_URL").expect("DATABASE_URL must be set")
}

async fn current_tenant_setting(conn: &mut sqlx::PgConnection) -> String {
    let row: (String,) = sqlx::query_as("SELECT current_setting('app.tenant_id', true)")
        .fetch_one(conn)
        .await
        .unwrap();
    row.0
}

#[tokio::test]
async fn test_tenant_connectionはtenant_idを設定する() {
    let pool = db::pool_options()
        .max_connections(1)
        .connect(&database_url())
        .await
        .unwrap();
    let tenant_id = TenantId::new();

    let mut conn = TenantConnection::acquire(&pool, &tenant_id).await.unwrap();

    assert_eq!(conn.tenant_id(), &tenant_id);
    assert_eq!(current_tenant_setting(&mut conn).await, tenant_id.to_string());
}

#[tokio::test]
async fn test_after_releaseでtenant_idがリセットされる() {
    // Arrange: max_connections=1 で同一物理接続の再取得を保証
    let sut = db::pool_options()
        .max_connections(1)
        .connect(&database_url())
        .await
        .unwrap();

    {
        let _conn = TenantConnection::acquire(&sut, &TenantId::new()).await.unwrap();
    }
    // ここで conn がドロップ → after_release が実行される

    // Act: 同じ物理接続を再取得
    let mut conn = sut.acquire().await.unwrap();

    // Assert: tenant_id がリセットされている
    assert_eq!(current_tenant_setting(&mut conn).await, "");
}
