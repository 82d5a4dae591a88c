//! # テンプレート選択
//!
//! テナントと通知種別から、レンダリングに使うテンプレートを 1 つ決める。
//!
//! ## 選択規則
//!
//! 1. 有効な保存テンプレートのうち、デフォルトフラグ付きのもの（更新日時に関係なく優先）
//! 2. それがなければ、最も新しく更新された保存テンプレート
//! 3. 保存テンプレートがなければ、通知種別の組み込みテンプレート
//! 4. どちらもなければ [`DispatchError::TemplateNotFound`]
//!
//! ストアの読み取り失敗は [`DispatchError::TemplateLookup`] としてそのまま返す。
//! 組み込みテンプレートへは縮退しない。

use std::sync::Arc;

use scholamail_domain::{
    notification::{
        BuiltinTemplate,
        BuiltinTemplates,
        NotificationTemplate,
        NotificationTemplateType,
        TemplateSource,
        ThemeId,
    },
    tenant::TenantId,
};
use scholamail_infra::repository::NotificationTemplateRepository;

use super::DispatchError;

/// 選択されたテンプレート
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectedTemplate<'a> {
    /// テナントが保存したテンプレート
    Stored(NotificationTemplate),
    /// 組み込みテンプレート
    Builtin(&'a BuiltinTemplate),
}

impl SelectedTemplate<'_> {
    pub fn source(&self) -> TemplateSource {
        match self {
            Self::Stored(_) => TemplateSource::Stored,
            Self::Builtin(_) => TemplateSource::Builtin,
        }
    }

    pub fn subject_pattern(&self) -> &str {
        match self {
            Self::Stored(template) => template.subject_pattern(),
            Self::Builtin(template) => &template.subject_pattern,
        }
    }

    pub fn body_pattern(&self) -> &str {
        match self {
            Self::Stored(template) => template.body_pattern(),
            Self::Builtin(template) => &template.body_pattern,
        }
    }

    pub fn theme(&self) -> ThemeId {
        match self {
            Self::Stored(template) => template.theme(),
            Self::Builtin(template) => template.theme,
        }
    }
}

/// テンプレート選択器
pub struct TemplateSelector {
    template_repo: Arc<dyn NotificationTemplateRepository>,
    builtins:      BuiltinTemplates,
}

impl TemplateSelector {
    pub fn new(
        template_repo: Arc<dyn NotificationTemplateRepository>,
        builtins: BuiltinTemplates,
    ) -> Self {
        Self {
            template_repo,
            builtins,
        }
    }

    /// テナントと通知種別に対応するテンプレートを選ぶ
    #[tracing::instrument(skip_all, level = "debug", fields(%tenant_id, template_type = %template_type))]
    pub async fn select(
        &self,
        tenant_id: &TenantId,
        template_type: NotificationTemplateType,
    ) -> Result<SelectedTemplate<'_>, DispatchError> {
        let active = self
            .template_repo
            .find_active(tenant_id, template_type)
            .await
            .map_err(DispatchError::TemplateLookup)?;

        if let Some(template) = pick_stored(active) {
            return Ok(SelectedTemplate::Stored(template));
        }

        self.builtins
            .get(template_type)
            .map(SelectedTemplate::Builtin)
            .ok_or_else(|| DispatchError::TemplateNotFound {
                tenant_id: tenant_id.clone(),
                template_type,
            })
    }
}

/// デフォルトフラグ付きを優先し、なければ最新のものを返す
fn pick_stored(active: Vec<NotificationTemplate>) -> Option<NotificationTemplate> {
    let (defaults, others): (Vec<_>, Vec<_>) =
        active.into_iter().partition(NotificationTemplate::is_default);

    let newest = |templates: Vec<NotificationTemplate>| {
        templates.into_iter().max_by_key(NotificationTemplate::updated_at)
    };
    newest(defaults).or_else(|| newest(others))
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use pretty_assertions::assert_eq;
    use scholamail_domain::{
        notification::{NotificationTemplateId, NotificationTemplateRecord},
        value_objects::Version,
    };
    use scholamail_infra::{InfraErrorKind, mock::MockNotificationTemplateRepository};

    use super::*;

    fn make_template(
        tenant_id: &TenantId,
        template_type: NotificationTemplateType,
        subject: &str,
        is_default: bool,
        updated_at_secs: i64,
    ) -> NotificationTemplate {
        NotificationTemplate::from_db(NotificationTemplateRecord {
            id: NotificationTemplateId::new(),
            tenant_id: tenant_id.clone(),
            template_type,
            subject_pattern: subject.to_string(),
            body_pattern: "<p>{{school.name}}</p>".to_string(),
            theme: ThemeId::Modern,
            is_active: true,
            is_default,
            version: Version::initial(),
            updated_at: DateTime::from_timestamp(updated_at_secs, 0).unwrap(),
        })
    }

    fn make_selector(repo: &MockNotificationTemplateRepository) -> TemplateSelector {
        TemplateSelector::new(Arc::new(repo.clone()), BuiltinTemplates::standard())
    }

    #[tokio::test]
    async fn test_デフォルトフラグ付きのテンプレートを更新日時より優先する() {
        let tenant_id = TenantId::new();
        let repo = MockNotificationTemplateRepository::new();
        repo.add_template(make_template(&tenant_id, NotificationTemplateType::Announcement, "newest", false, 300));
        repo.add_template(make_template(&tenant_id, NotificationTemplateType::Announcement, "default", true, 100));
        let selector = make_selector(&repo);

        let selected = selector
            .select(&tenant_id, NotificationTemplateType::Announcement)
            .await
            .unwrap();

        assert_eq!(selected.source(), TemplateSource::Stored);
        assert_eq!(selected.subject_pattern(), "default");
        assert_eq!(selected.theme(), ThemeId::Modern);
    }

    #[tokio::test]
    async fn test_デフォルトがなければ最新のテンプレートを選ぶ() {
        let tenant_id = TenantId::new();
        let repo = MockNotificationTemplateRepository::new();
        repo.add_template(make_template(&tenant_id, NotificationTemplateType::FeeReminder, "old", false, 100));
        repo.add_template(make_template(&tenant_id, NotificationTemplateType::FeeReminder, "new", false, 200));
        let selector = make_selector(&repo);

        let selected = selector
            .select(&tenant_id, NotificationTemplateType::FeeReminder)
            .await
            .unwrap();

        assert_eq!(selected.subject_pattern(), "new");
    }

    #[tokio::test]
    async fn test_保存テンプレートがなければ組み込みテンプレートを使う() {
        let repo = MockNotificationTemplateRepository::new();
        let selector = make_selector(&repo);

        let selected = selector
            .select(&TenantId::new(), NotificationTemplateType::AbsenceAlert)
            .await
            .unwrap();

        assert_eq!(selected.source(), TemplateSource::Builtin);
        assert_eq!(selected.theme(), ThemeId::Classic);
        assert!(selected.subject_pattern().starts_with("Absence alert"));
    }

    #[tokio::test]
    async fn test_他テナントのテンプレートは選ばない() {
        let repo = MockNotificationTemplateRepository::new();
        repo.add_template(make_template(&TenantId::new(), NotificationTemplateType::Welcome, "other", true, 100));
        let selector = make_selector(&repo);

        let selected = selector
            .select(&TenantId::new(), NotificationTemplateType::Welcome)
            .await
            .unwrap();

        assert_eq!(selected.source(), TemplateSource::Builtin);
    }

    #[tokio::test]
    async fn test_どちらもなければtemplate_not_found() {
        let tenant_id = TenantId::new();
        let repo = MockNotificationTemplateRepository::new();
        let selector = make_selector(&repo);

        let result = selector
            .select(&tenant_id, NotificationTemplateType::ExamResult)
            .await;

        assert!(matches!(
            result,
            Err(DispatchError::TemplateNotFound { tenant_id: id, template_type: NotificationTemplateType::ExamResult })
                if id == tenant_id
        ));
    }

    #[tokio::test]
    async fn test_ストアの読み取り失敗は組み込みに縮退しない() {
        let repo = MockNotificationTemplateRepository::new();
        repo.set_failing(true);
        let selector = make_selector(&repo);

        let result = selector
            .select(&TenantId::new(), NotificationTemplateType::Welcome)
            .await;

        assert!(matches!(
            result,
            Err(DispatchError::TemplateLookup(e)) if matches!(e.kind(), InfraErrorKind::Database(_))
        ));
    }
}
