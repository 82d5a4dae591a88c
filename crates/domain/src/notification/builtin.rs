//! # 組み込みテンプレート
//!
//! テナントが有効なテンプレートを保存していない場合に使う既定のテンプレート。
//! 保存テンプレートと同じミニ言語で書かれており、同じレンダラーを通る。
//!
//! 本文は `include_str!` でバイナリに埋め込む。
//! `fee_reminder` と `exam_result` には組み込みテンプレートがない。

use std::collections::HashMap;

use super::{template::NotificationTemplateType, theme::ThemeId};

/// 組み込みテンプレート
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinTemplate {
    pub subject_pattern: String,
    pub body_pattern:    String,
    pub theme:           ThemeId,
}

impl BuiltinTemplate {
    /// `classic` テーマの組み込みテンプレートを作成する
    pub fn new(subject_pattern: impl Into<String>, body_pattern: impl Into<String>) -> Self {
        Self {
            subject_pattern: subject_pattern.into(),
            body_pattern:    body_pattern.into(),
            theme:           ThemeId::Classic,
        }
    }
}

/// 通知種別ごとの組み込みテンプレートのレジストリ
#[derive(Debug, Clone, Default)]
pub struct BuiltinTemplates {
    templates: HashMap<NotificationTemplateType, BuiltinTemplate>,
}

impl BuiltinTemplates {
    /// 空のレジストリを作成する
    pub fn empty() -> Self {
        Self::default()
    }

    /// 標準の組み込みテンプレートを登録したレジストリを作成する
    pub fn standard() -> Self {
        use NotificationTemplateType::*;

        [
            (
                Welcome,
                "Welcome to {{school.name || 'our school'}}",
                include_str!("../../templates/notifications/welcome.html"),
            ),
            (
                PasswordReset,
                "Reset your {{school.name || 'school'}} password",
                include_str!("../../templates/notifications/password_reset.html"),
            ),
            (
                LeaveRequestSubmitted,
                "Leave request received for {{student.name || student.first_name || 'your child'}}",
                include_str!("../../templates/notifications/leave_request_submitted.html"),
            ),
            (
                LeaveRequestApproved,
                "Leave request approved for {{student.name || student.first_name || 'your child'}}",
                include_str!("../../templates/notifications/leave_request_approved.html"),
            ),
            (
                LeaveRequestRejected,
                "Leave request not approved for {{student.name || student.first_name || 'your child'}}",
                include_str!("../../templates/notifications/leave_request_rejected.html"),
            ),
            (
                Announcement,
                "{{announcement.title || 'Announcement'}} | {{school.name}}",
                include_str!("../../templates/notifications/announcement.html"),
            ),
            (
                AbsenceAlert,
                "Absence alert: {{student.name || student.first_name || 'your child'}}",
                include_str!("../../templates/notifications/absence_alert.html"),
            ),
        ]
        .into_iter()
        .fold(Self::empty(), |registry, (template_type, subject, body)| {
            registry.register(template_type, BuiltinTemplate::new(subject, body))
        })
    }

    /// テンプレートを登録したレジストリを返す（既存の登録は置き換える）
    pub fn register(mut self, template_type: NotificationTemplateType, template: BuiltinTemplate) -> Self {
        self.templates.insert(template_type, template);
        self
    }

    pub fn get(&self, template_type: NotificationTemplateType) -> Option<&BuiltinTemplate> {
        self.templates.get(&template_type)
    }

    pub fn contains(&self, template_type: NotificationTemplateType) -> bool {
        self.templates.contains_key(&template_type)
    }
}
