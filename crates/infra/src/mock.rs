//! # テスト用モック
//!
//! ユースケーステストで使用するインメモリのリポジトリと送信手段。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! scholamail-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use scholamail_domain::{
    notification::{
        EmailMessage,
        NotificationError,
        NotificationTemplate,
        NotificationTemplateType,
        SentMessage,
    },
    tenant::{TenantId, TenantProfile},
};

use crate::{
    error::InfraError,
    notification::NotificationSender,
    repository::{
        NotificationLog,
        NotificationLogRepository,
        NotificationTemplateRepository,
        TenantRepository,
    },
};

// ===== MockNotificationTemplateRepository =====

#[derive(Clone, Default)]
pub struct MockNotificationTemplateRepository {
    templates: Arc<Mutex<Vec<NotificationTemplate>>>,
    failing:   Arc<AtomicBool>,
}

impl MockNotificationTemplateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_template(&self, template: NotificationTemplate) {
        self.templates.lock().unwrap().push(template);
    }

    /// `true` の間、`find_active` はデータベースエラーを返す
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotificationTemplateRepository for MockNotificationTemplateRepository {
    async fn find_active(
        &self,
        tenant_id: &TenantId,
        template_type: NotificationTemplateType,
    ) -> Result<Vec<NotificationTemplate>, InfraError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut.into());
        }

        let mut found: Vec<NotificationTemplate> = self
            .templates
            .lock()
            .unwrap()
            .iter()
            .filter(|t| {
                t.tenant_id() == tenant_id && t.template_type() == template_type && t.is_active()
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.is_default()
                .cmp(&a.is_default())
                .then_with(|| b.updated_at().cmp(&a.updated_at()))
        });
        Ok(found)
    }
}

// ===== MockTenantRepository =====

#[derive(Clone, Default)]
pub struct MockTenantRepository {
    profiles: Arc<Mutex<HashMap<TenantId, TenantProfile>>>,
    failing:  Arc<AtomicBool>,
    lookups:  Arc<AtomicUsize>,
}

impl MockTenantRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_profile(&self, tenant_id: TenantId, profile: TenantProfile) {
        self.profiles.lock().unwrap().insert(tenant_id, profile);
    }

    /// `true` の間、`find_profile` はデータベースエラーを返す
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// `find_profile` が呼ばれた回数
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TenantRepository for MockTenantRepository {
    async fn find_profile(&self, id: &TenantId) -> Result<Option<TenantProfile>, InfraError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut.into());
        }
        Ok(self.profiles.lock().unwrap().get(id).cloned())
    }
}

// ===== MockNotificationSender =====

/// 送信したメールを記録するモック送信手段
///
/// 宛先ごとの失敗注入と、送信前の遅延を設定できる。
#[derive(Clone, Default)]
pub struct MockNotificationSender {
    sent:       Arc<Mutex<Vec<EmailMessage>>>,
    failing_to: Arc<Mutex<HashSet<String>>>,
    delay:      Arc<Mutex<Option<Duration>>>,
    attempts:   Arc<AtomicUsize>,
}

impl MockNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定した宛先への送信を失敗させる
    pub fn fail_for(&self, to: impl Into<String>) {
        self.failing_to.lock().unwrap().insert(to.into());
    }

    /// 送信のたびに指定時間待機する
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// 送信に成功したメール
    pub fn sent_emails(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// 失敗を含む送信試行の回数
    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationSender for MockNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<SentMessage, NotificationError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing_to.lock().unwrap().contains(&email.to) {
            return Err(NotificationError::SendFailed(format!(
                "mock: {} への送信失敗",
                email.to
            )));
        }

        let mut sent = self.sent.lock().unwrap();
        sent.push(email.clone());
        Ok(SentMessage {
            message_id: format!("mock-{}", sent.len()),
        })
    }
}

// ===== MockNotificationLogRepository =====

#[derive(Clone, Default)]
pub struct MockNotificationLogRepository {
    logs:    Arc<Mutex<Vec<NotificationLog>>>,
    failing: Arc<AtomicBool>,
}

impl MockNotificationLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logs(&self) -> Vec<NotificationLog> {
        self.logs.lock().unwrap().clone()
    }

    /// `true` の間、`insert` はデータベースエラーを返す
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotificationLogRepository for MockNotificationLogRepository {
    async fn insert(&self, log: &NotificationLog) -> Result<(), InfraError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut.into());
        }
        self.logs.lock().unwrap().push(log.clone());
        Ok(())
    }
}
