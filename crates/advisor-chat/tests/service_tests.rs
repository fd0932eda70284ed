mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;

use advisor_chat::llm::MockModel;
use advisor_chat::notify::{EmailMessage, LogNotifier, Notifier};
use advisor_chat::records::{EmailStatus, LeadStatus};
use advisor_chat::service::RECOVERABLE_MESSAGE;
use advisor_chat::{ChatService, InMemoryRecords, NewLead, RecordStore, Role, ServiceError};
use advisor_core::error::{Error, GenerationError};

use common::{advisor, fixture, Fixture, THREE_SENTENCES};

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<EmailMessage>>,
    fail: bool,
}

impl Notifier for RecordingNotifier {
    fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("smtp unreachable");
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

fn lead() -> NewLead {
    NewLead {
        full_name: "Dana Reyes".into(),
        email: "dana@example.com".into(),
        phone: Some("555-0100".into()),
        date_of_birth: NaiveDate::from_ymd_opt(1975, 9, 14).unwrap(),
        zip_code: "94110".into(),
        gender: None,
        address: "1 Main St, San Francisco".into(),
        consent: true,
    }
}

fn service(
    fx: &Fixture,
    model: MockModel,
    llm_timeout: Duration,
    notifier: Arc<dyn Notifier>,
) -> (ChatService<MockModel>, Arc<InMemoryRecords>) {
    let records = Arc::new(InMemoryRecords::new());
    let svc = ChatService::new(advisor(fx, model, llm_timeout), records.clone(), notifier);
    (svc, records)
}

fn log_only() -> Arc<dyn Notifier> {
    Arc::new(LogNotifier::default())
}

fn session_id(records: &InMemoryRecords, token: &str) -> uuid::Uuid {
    records.session_by_token(token).unwrap().unwrap().id
}

#[tokio::test]
async fn chat_stores_both_turns() {
    let fx = fixture(&[("iul.txt", THREE_SENTENCES)]).await;
    let model = MockModel::with_responses(["The floor protects cash value [1]."]);
    let (svc, records) = service(&fx, model, Duration::from_secs(5), log_only());

    let token = svc.start_session(lead()).unwrap();
    let answer = svc.chat(&token, "What protects the cash value?").await.unwrap();
    assert_eq!(answer.text, "The floor protects cash value [1].");

    let turns = records.turns(session_id(&records, &token)).unwrap();
    let got: Vec<(Role, &str)> = turns.iter().map(|t| (t.role, t.text.as_str())).collect();
    assert_eq!(
        got,
        vec![
            (Role::User, "What protects the cash value?"),
            (Role::Assistant, "The floor protects cash value [1]."),
        ]
    );
    let session = records.session_by_token(&token).unwrap().unwrap();
    let lead = records.lead(session.lead_id).unwrap().unwrap();
    assert_eq!(lead.status, LeadStatus::InChat);
}

#[tokio::test]
async fn second_turn_sees_the_first() {
    let fx = fixture(&[("iul.txt", THREE_SENTENCES)]).await;
    let model = MockModel::with_responses(["first answer", "second answer"]);
    let (svc, _records) = service(&fx, model, Duration::from_secs(5), log_only());

    let token = svc.start_session(lead()).unwrap();
    svc.chat(&token, "What is a cap?").await.unwrap();
    svc.chat(&token, "And the floor?").await.unwrap();

    let request = svc.advisor().engine().model().last_request().unwrap();
    let texts: Vec<&str> = request.iter().skip(1).map(|m| m.content.as_str()).collect();
    assert_eq!(texts[0], "What is a cap?");
    assert_eq!(texts[1], "first answer");
    assert!(texts[2].starts_with("Question: And the floor?"));
}

#[tokio::test]
async fn unknown_token_is_invalid_session() {
    let fx = fixture(&[("iul.txt", THREE_SENTENCES)]).await;
    let (svc, _) = service(&fx, MockModel::default(), Duration::from_secs(5), log_only());

    let err = svc.chat("not-a-token", "hello").await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidSession));
    assert!(!err.is_recoverable());
    assert!(matches!(svc.agree("not-a-token"), Err(ServiceError::InvalidSession)));
}

#[tokio::test]
async fn generation_timeout_keeps_the_user_turn() {
    let fx = fixture(&[("iul.txt", THREE_SENTENCES)]).await;
    let slow = MockModel::default().with_delay(Duration::from_millis(500));
    let (svc, records) = service(&fx, slow, Duration::from_millis(20), log_only());

    let token = svc.start_session(lead()).unwrap();
    let err = svc.chat(&token, "How do caps work?").await.unwrap_err();

    assert!(matches!(err, ServiceError::Answer(Error::Generation(GenerationError::Timeout(_)))));
    assert!(err.is_recoverable());
    assert_eq!(err.user_message(), RECOVERABLE_MESSAGE);

    let turns = records.turns(session_id(&records, &token)).unwrap();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[0].text, "How do caps work?");
}

#[tokio::test]
async fn explore_asks_for_an_alternative_with_history() {
    let fx = fixture(&[("iul.txt", THREE_SENTENCES)]).await;
    let model = MockModel::with_responses(["A term policy may suit you better."]);
    let (svc, records) = service(&fx, model, Duration::from_secs(5), log_only());

    let token = svc.start_session(lead()).unwrap();
    let answer = svc.explore(&token, "lower premiums").await.unwrap();
    assert_eq!(answer.text, "A term policy may suit you better.");

    let request = svc.advisor().engine().model().last_request().unwrap();
    assert_eq!(request[1].content, "Explore more: lower premiums");
    let question = &request.last().unwrap().content;
    assert!(question.starts_with(
        "Question: User preferences changed: lower premiums. Suggest an alternative."
    ));

    let turns = records.turns(session_id(&records, &token)).unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].text, "Explore more: lower premiums");
}

#[tokio::test]
async fn agree_records_and_confirms() {
    let fx = fixture(&[("iul.txt", THREE_SENTENCES)]).await;
    let notifier = Arc::new(RecordingNotifier::default());
    let (svc, records) =
        service(&fx, MockModel::default(), Duration::from_secs(5), notifier.clone());

    let token = svc.start_session(lead()).unwrap();
    assert!(svc.agree(&token).unwrap());

    let session = records.session_by_token(&token).unwrap().unwrap();
    let lead = records.lead(session.lead_id).unwrap().unwrap();
    assert_eq!(lead.status, LeadStatus::Agreed);

    let recs = records.recommendations(session.id).unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].plan_name, "Selected Plan");
    assert_eq!(recs[0].reasoning, "User agreed to proceed.");

    let sent = notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "dana@example.com");
    assert_eq!(sent[0].subject, "Thanks for your interest!");
    assert!(sent[0].body.starts_with("Hi Dana Reyes,"));

    let emails = records.emails(lead.id).unwrap();
    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0].template, "confirm");
    assert_eq!(emails[0].status, EmailStatus::Sent);
}

#[tokio::test]
async fn failed_confirmation_is_logged_as_failed() {
    let fx = fixture(&[("iul.txt", THREE_SENTENCES)]).await;
    let notifier = Arc::new(RecordingNotifier { fail: true, ..RecordingNotifier::default() });
    let (svc, records) = service(&fx, MockModel::default(), Duration::from_secs(5), notifier);

    let token = svc.start_session(lead()).unwrap();
    assert!(!svc.agree(&token).unwrap());

    let session = records.session_by_token(&token).unwrap().unwrap();
    let emails = records.emails(session.lead_id).unwrap();
    assert_eq!(emails[0].status, EmailStatus::Failed);
    // the agreement itself still stands
    assert_eq!(records.lead(session.lead_id).unwrap().unwrap().status, LeadStatus::Agreed);
}

#[tokio::test]
async fn invalid_lead_is_rejected() {
    let fx = fixture(&[("iul.txt", THREE_SENTENCES)]).await;
    let (svc, _) = service(&fx, MockModel::default(), Duration::from_secs(5), log_only());

    let bad = NewLead { email: "not-an-email".into(), ..lead() };
    assert!(matches!(svc.start_session(bad), Err(ServiceError::InvalidLead(_))));
}
