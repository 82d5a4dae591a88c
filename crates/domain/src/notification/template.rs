//! # 通知テンプレート
//!
//! テナントが管理する通知テンプレートのエンティティ。
//! 作成・編集は管理画面側の責務で、通知パイプラインは読み取るだけ。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 説明 |
//! |---|------------|------|
//! | [`NotificationTemplateType`] | 通知種別 | 固定の 9 種類 |
//! | [`NotificationTemplate`] | 通知テンプレート | 件名・本文パターンとテーマ |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use super::theme::ThemeId;
use crate::{tenant::TenantId, value_objects::Version};

define_uuid_id! {
    /// 通知テンプレート ID
    pub struct NotificationTemplateId;
}

/// 通知種別
///
/// notification_templates テーブルの `template_type` カラムに格納される値。
/// snake_case でシリアライズされる。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationTemplateType {
    /// 新規アカウントの案内
    Welcome,
    /// パスワード再設定
    PasswordReset,
    /// 休暇申請の受付
    LeaveRequestSubmitted,
    /// 休暇申請の承認
    LeaveRequestApproved,
    /// 休暇申請の却下
    LeaveRequestRejected,
    /// お知らせ
    Announcement,
    /// 欠席連絡
    AbsenceAlert,
    /// 学費の督促（組み込みテンプレートなし）
    FeeReminder,
    /// 試験結果（組み込みテンプレートなし）
    ExamResult,
}

/// 通知テンプレートの DB 復元パラメータ
pub struct NotificationTemplateRecord {
    pub id:              NotificationTemplateId,
    pub tenant_id:       TenantId,
    pub template_type:   NotificationTemplateType,
    pub subject_pattern: String,
    pub body_pattern:    String,
    pub theme:           ThemeId,
    pub is_active:       bool,
    pub is_default:      bool,
    pub version:         Version,
    pub updated_at:      DateTime<Utc>,
}

/// 通知テンプレート
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationTemplate {
    id:              NotificationTemplateId,
    tenant_id:       TenantId,
    template_type:   NotificationTemplateType,
    subject_pattern: String,
    body_pattern:    String,
    theme:           ThemeId,
    is_active:       bool,
    is_default:      bool,
    version:         Version,
    updated_at:      DateTime<Utc>,
}

impl NotificationTemplate {
    /// DB からエンティティを復元する
    pub fn from_db(record: NotificationTemplateRecord) -> Self {
        Self {
            id:              record.id,
            tenant_id:       record.tenant_id,
            template_type:   record.template_type,
            subject_pattern: record.subject_pattern,
            body_pattern:    record.body_pattern,
            theme:           record.theme,
            is_active:       record.is_active,
            is_default:      record.is_default,
            version:         record.version,
            updated_at:      record.updated_at,
        }
    }

    pub fn id(&self) -> &NotificationTemplateId {
        &self.id
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn template_type(&self) -> NotificationTemplateType {
        self.template_type
    }

    pub fn subject_pattern(&self) -> &str {
        &self.subject_pattern
    }

    pub fn body_pattern(&self) -> &str {
        &self.body_pattern
    }

    pub fn theme(&self) -> ThemeId {
        self.theme
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
