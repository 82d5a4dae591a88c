//! 通知ディスパッチャの結合テスト
//!
//! インメモリのモック（`scholamail_infra::mock`）を注入し、
//! テンプレート選択から送信・ログ記録までの一連の流れを検証する。

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use rstest::rstest;
use scholamail_domain::{
    clock::FixedClock,
    notification::{
        BuiltinTemplates,
        DeliveryStatus,
        NotificationContext,
        NotificationError,
        NotificationTemplate,
        NotificationTemplateId,
        NotificationTemplateRecord,
        NotificationTemplateType,
        TemplateSource,
        ThemeId,
    },
    tenant::{TenantId, TenantName, TenantProfile},
    value_objects::Version,
};
use scholamail_infra::mock::{
    MockNotificationLogRepository,
    MockNotificationSender,
    MockNotificationTemplateRepository,
    MockTenantRepository,
};
use scholamail_notifier::usecase::{
    DispatchError,
    DispatchRequest,
    NotificationDispatcher,
    Recipient,
    TemplateSelector,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

struct TestContext {
    tenant_id:     TenantId,
    template_repo: MockNotificationTemplateRepository,
    tenant_repo:   MockTenantRepository,
    sender:        MockNotificationSender,
    log_repo:      MockNotificationLogRepository,
}

impl TestContext {
    fn new() -> Self {
        Self {
            tenant_id:     TenantId::new(),
            template_repo: MockNotificationTemplateRepository::new(),
            tenant_repo:   MockTenantRepository::new(),
            sender:        MockNotificationSender::new(),
            log_repo:      MockNotificationLogRepository::new(),
        }
    }

    fn dispatcher(&self) -> NotificationDispatcher {
        NotificationDispatcher::new(
            TemplateSelector::new(
                Arc::new(self.template_repo.clone()),
                BuiltinTemplates::standard(),
            ),
            Arc::new(self.tenant_repo.clone()),
            Arc::new(self.sender.clone()),
            Arc::new(self.log_repo.clone()),
            Arc::new(FixedClock::new(
                Utc.with_ymd_and_hms(2026, 9, 1, 7, 0, 0).unwrap(),
            )),
        )
    }

    fn add_template(
        &self,
        template_type: NotificationTemplateType,
        subject: &str,
        body: &str,
        theme: ThemeId,
        is_default: bool,
        updated_at_secs: i64,
    ) {
        self.template_repo
            .add_template(NotificationTemplate::from_db(NotificationTemplateRecord {
                id: NotificationTemplateId::new(),
                tenant_id: self.tenant_id.clone(),
                template_type,
                subject_pattern: subject.to_string(),
                body_pattern: body.to_string(),
                theme,
                is_active: true,
                is_default,
                version: Version::initial(),
                updated_at: DateTime::from_timestamp(updated_at_secs, 0).unwrap(),
            }));
    }

    fn request(&self, template_type: NotificationTemplateType, to: &str, context: NotificationContext) -> DispatchRequest {
        DispatchRequest {
            tenant_id: self.tenant_id.clone(),
            template_type,
            to: to.to_string(),
            context,
        }
    }
}

fn recipient(to: &str, first_name: &str) -> Recipient {
    Recipient {
        to:      to.to_string(),
        context: NotificationContext::from_value(json!({
            "school": { "name": "Sakura Elementary" },
            "student": { "firstName": first_name }
        })),
    }
}

#[tokio::test]
async fn test_バッチで2件目の送信が失敗しても全員分の結果を入力順で返す() {
    let ctx = TestContext::new();
    ctx.add_template(
        NotificationTemplateType::Announcement,
        "Notice for {{student.firstName}}",
        "<p>Dear family of {{student.first_name}}</p>",
        ThemeId::Vibrant,
        false,
        100,
    );
    ctx.sender.fail_for("b@example.com");
    let dispatcher = ctx.dispatcher().with_batch_concurrency(3);

    let outcomes = dispatcher
        .dispatch_batch(
            &ctx.tenant_id,
            NotificationTemplateType::Announcement,
            vec![
                recipient("a@example.com", "Ana"),
                recipient("b@example.com", "Ben"),
                recipient("c@example.com", "Cleo"),
            ],
            &CancellationToken::new(),
        )
        .await;

    let summary: Vec<(&str, bool)> = outcomes
        .iter()
        .map(|o| (o.to.as_str(), o.result.is_ok()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("a@example.com", true),
            ("b@example.com", false),
            ("c@example.com", true),
        ]
    );
    assert!(matches!(
        outcomes[1].result,
        Err(DispatchError::Transport(NotificationError::SendFailed(_)))
    ));

    let mut subjects: Vec<String> = ctx.sender.sent_emails().into_iter().map(|e| e.subject).collect();
    subjects.sort();
    assert_eq!(subjects, vec!["Notice for Ana", "Notice for Cleo"]);
    assert_eq!(ctx.log_repo.logs().len(), 3);
}

#[tokio::test]
async fn test_バッチの宛先ごとの遅延に関係なく入力順を保つ() {
    let ctx = TestContext::new();
    ctx.sender.set_delay(Duration::from_millis(5));
    let dispatcher = ctx.dispatcher().with_batch_concurrency(2);

    let outcomes = dispatcher
        .dispatch_batch(
            &ctx.tenant_id,
            NotificationTemplateType::AbsenceAlert,
            (1..=5)
                .map(|n| recipient(&format!("p{n}@example.com"), "Ana"))
                .collect(),
            &CancellationToken::new(),
        )
        .await;

    let order: Vec<&str> = outcomes.iter().map(|o| o.to.as_str()).collect();
    assert_eq!(
        order,
        vec![
            "p1@example.com",
            "p2@example.com",
            "p3@example.com",
            "p4@example.com",
            "p5@example.com",
        ]
    );
    assert!(outcomes.iter().all(|o| o.result.is_ok()));
}

#[tokio::test]
async fn test_デフォルトフラグ付きのテンプレートで送信する() {
    let ctx = TestContext::new();
    ctx.add_template(NotificationTemplateType::Welcome, "Newest", "<p>newest</p>", ThemeId::Modern, false, 500);
    ctx.add_template(NotificationTemplateType::Welcome, "Default", "<p>default</p>", ThemeId::Formal, true, 100);

    ctx.dispatcher()
        .dispatch(
            ctx.request(NotificationTemplateType::Welcome, "parent@example.com", NotificationContext::new()),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let sent = ctx.sender.sent_emails();
    assert_eq!(sent[0].subject, "Default");
    assert!(sent[0].html_body.contains("<p>default</p>"));
    assert_eq!(ctx.log_repo.logs()[0].template_source, TemplateSource::Stored);
}

#[rstest]
#[case::fee_reminder(NotificationTemplateType::FeeReminder)]
#[case::exam_result(NotificationTemplateType::ExamResult)]
#[tokio::test]
async fn test_組み込みのない種別はtemplate_not_found(#[case] template_type: NotificationTemplateType) {
    let ctx = TestContext::new();

    let result = ctx
        .dispatcher()
        .dispatch(
            ctx.request(template_type, "parent@example.com", NotificationContext::new()),
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(
        result,
        Err(DispatchError::TemplateNotFound { template_type: t, .. }) if t == template_type
    ));
    assert_eq!(ctx.sender.attempt_count(), 0);
    assert!(ctx.log_repo.logs().is_empty());
}

#[tokio::test]
async fn test_テンプレートストアの失敗はtemplate_lookup() {
    let ctx = TestContext::new();
    ctx.template_repo.set_failing(true);

    let result = ctx
        .dispatcher()
        .dispatch(
            ctx.request(NotificationTemplateType::Welcome, "parent@example.com", NotificationContext::new()),
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(result, Err(DispatchError::TemplateLookup(_))));
    assert_eq!(ctx.sender.attempt_count(), 0);
}

#[tokio::test]
async fn test_キャンセル済みトークンでは送信手段を呼ばない() {
    let ctx = TestContext::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcomes = ctx
        .dispatcher()
        .dispatch_batch(
            &ctx.tenant_id,
            NotificationTemplateType::AbsenceAlert,
            vec![recipient("a@example.com", "Ana"), recipient("b@example.com", "Ben")],
            &cancel,
        )
        .await;

    assert!(outcomes.iter().all(|o| matches!(o.result, Err(DispatchError::Cancelled))));
    assert_eq!(ctx.sender.attempt_count(), 0);
    assert!(ctx.log_repo.logs().is_empty());
}

#[tokio::test]
async fn test_送信中のキャンセルでcancelledを返す() {
    let ctx = TestContext::new();
    ctx.sender.set_delay(Duration::from_secs(30));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let result = ctx
        .dispatcher()
        .dispatch(
            ctx.request(NotificationTemplateType::AbsenceAlert, "parent@example.com", NotificationContext::new()),
            &cancel,
        )
        .await;

    assert!(matches!(result, Err(DispatchError::Cancelled)));
    assert_eq!(ctx.sender.attempt_count(), 1);
    assert!(ctx.sender.sent_emails().is_empty());
}

#[tokio::test]
async fn test_テナント情報の取得に失敗しても送信を続行する() {
    let ctx = TestContext::new();
    ctx.tenant_repo.set_failing(true);

    let result = ctx
        .dispatcher()
        .dispatch(
            ctx.request(
                NotificationTemplateType::AbsenceAlert,
                "parent@example.com",
                NotificationContext::from_value(json!({ "student": { "firstName": "Ana" } })),
            ),
            &CancellationToken::new(),
        )
        .await;

    assert!(result.is_ok());
    assert_eq!(ctx.tenant_repo.lookup_count(), 1);
    assert_eq!(ctx.sender.sent_emails()[0].subject, "Absence alert: Ana");
}

#[tokio::test]
async fn test_組み込みテンプレートはclassicテーマで包む() {
    let ctx = TestContext::new();
    ctx.tenant_repo.add_profile(
        ctx.tenant_id.clone(),
        TenantProfile::new(TenantName::new("Sakura Elementary").unwrap())
            .with_address("1-2-3 Sakura-cho")
            .with_logo_url("https://cdn.example.com/sakura/logo.png"),
    );

    let rendered = ctx
        .dispatcher()
        .preview(
            &ctx.tenant_id,
            NotificationTemplateType::AbsenceAlert,
            NotificationContext::from_value(json!({ "student": { "firstName": "Ana" } })),
        )
        .await
        .unwrap();

    let classic = scholamail_domain::notification::theme::wrap(
        "",
        ThemeId::Classic,
        &NotificationContext::from(
            &TenantProfile::new(TenantName::new("Sakura Elementary").unwrap())
                .with_address("1-2-3 Sakura-cho")
                .with_logo_url("https://cdn.example.com/sakura/logo.png"),
        )
        .branding(),
    )
    .unwrap();
    let marker = r#"line-height:1.6;">"#;
    let classic_header = &classic[..classic.find(marker).unwrap() + marker.len()];
    assert!(rendered.html.starts_with(classic_header));
    assert!(rendered.html.contains("1-2-3 Sakura-cho"));
    assert!(rendered.html.contains(r#"src="https:&#x2F;&#x2F;cdn.example.com&#x2F;sakura&#x2F;logo.png""#));
    assert_eq!(ctx.sender.attempt_count(), 0);
}

#[tokio::test]
async fn test_通知ログの記録失敗は結果を変えない() {
    let ctx = TestContext::new();
    ctx.log_repo.set_failing(true);

    let sent = ctx
        .dispatcher()
        .dispatch(
            ctx.request(NotificationTemplateType::AbsenceAlert, "parent@example.com", NotificationContext::new()),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(sent.message_id, "mock-1");
    assert!(ctx.log_repo.logs().is_empty());
}

#[tokio::test]
async fn test_配信ログに結果を記録する() {
    let ctx = TestContext::new();
    ctx.sender.fail_for("b@example.com");
    let dispatcher = ctx.dispatcher();

    for to in ["a@example.com", "b@example.com"] {
        let _ = dispatcher
            .dispatch(
                ctx.request(NotificationTemplateType::AbsenceAlert, to, NotificationContext::new()),
                &CancellationToken::new(),
            )
            .await;
    }

    let logs = ctx.log_repo.logs();
    let statuses: Vec<(&str, DeliveryStatus)> = logs
        .iter()
        .map(|l| (l.recipient_email.as_str(), l.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("a@example.com", DeliveryStatus::Sent),
            ("b@example.com", DeliveryStatus::Failed),
        ]
    );
    assert!(logs.iter().all(|l| l.tenant_id == ctx.tenant_id));
    assert!(logs.iter().all(|l| l.sent_at == Utc.with_ymd_and_hms(2026, 9, 1, 7, 0, 0).unwrap()));
}
