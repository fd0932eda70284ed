//! Session-scoped chat operations over the advisor and record store.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use advisor_core::error::Error as AdvisorError;

use crate::advisor::Advisor;
use crate::engine::Answer;
use crate::llm::ChatModel;
use crate::memory::ConversationTurn;
use crate::notify::{EmailMessage, Notifier, CONFIRMATION_TEMPLATE};
use crate::records::{
    EmailLog, EmailStatus, Lead, LeadStatus, NewLead, RecordError, RecordStore, Recommendation,
    Session,
};

pub const RECOVERABLE_MESSAGE: &str = "Sorry, something went wrong. Please try again.";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid session")]
    InvalidSession,

    #[error("lead {0} not found")]
    LeadNotFound(Uuid),

    #[error("invalid lead: {0}")]
    InvalidLead(String),

    #[error(transparent)]
    Records(#[from] RecordError),

    /// Retrieval or generation failed; the user turn is already stored.
    #[error("answering failed: {0}")]
    Answer(#[from] AdvisorError),
}

impl ServiceError {
    /// Text safe to show to the end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidSession => "Invalid session.".to_string(),
            Self::LeadNotFound(_) => "Lead not found.".to_string(),
            Self::InvalidLead(reason) => format!("Invalid details: {reason}"),
            Self::Records(_) | Self::Answer(_) => RECOVERABLE_MESSAGE.to_string(),
        }
    }

    /// The request may be retried as-is.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Answer(_))
    }
}

pub struct ChatService<M> {
    advisor: Advisor<M>,
    records: Arc<dyn RecordStore>,
    notifier: Arc<dyn Notifier>,
}

impl<M: ChatModel> ChatService<M> {
    pub fn new(
        advisor: Advisor<M>,
        records: Arc<dyn RecordStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { advisor, records, notifier }
    }

    pub fn advisor(&self) -> &Advisor<M> {
        &self.advisor
    }

    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    /// Register the lead as `in_chat` and open a session; returns its token.
    pub fn start_session(&self, lead: NewLead) -> Result<String, ServiceError> {
        validate_lead(&lead)?;
        let lead = self.records.create_lead(lead, LeadStatus::InChat)?;
        let token = Uuid::new_v4().to_string();
        let session = self.records.open_session(lead.id, &token)?;
        info!(lead = %lead.id, session = %session.id, "session started");
        Ok(token)
    }

    /// Store the user turn, answer it with the prior history, store the reply.
    pub async fn chat(&self, token: &str, message: &str) -> Result<Answer, ServiceError> {
        let session = self.session(token)?;
        let history = self.records.turns(session.id)?;
        self.records.append_turn(session.id, ConversationTurn::user(message))?;
        self.records.touch_session(session.id, Utc::now())?;

        let answer = self.advisor.ask(message, &history).await.map_err(|e| {
            warn!(session = %session.id, error = %e, "chat turn failed");
            ServiceError::Answer(e)
        })?;
        self.records.append_turn(session.id, ConversationTurn::assistant(answer.text.clone()))?;
        Ok(answer)
    }

    /// Ask for an alternative after the user changed preferences.
    pub async fn explore(&self, token: &str, preferences: &str) -> Result<Answer, ServiceError> {
        let session = self.session(token)?;
        let turn = ConversationTurn::user(format!("Explore more: {preferences}"));
        self.records.append_turn(session.id, turn)?;
        self.records.touch_session(session.id, Utc::now())?;

        let history = self.records.turns(session.id)?;
        let query = format!("User preferences changed: {preferences}. Suggest an alternative.");
        let answer = self.advisor.ask(&query, &history).await.map_err(|e| {
            warn!(session = %session.id, error = %e, "explore failed");
            ServiceError::Answer(e)
        })?;
        self.records.append_turn(session.id, ConversationTurn::assistant(answer.text.clone()))?;
        Ok(answer)
    }

    /// Record the agreement, mark the lead `agreed` and send the confirmation.
    /// Returns whether the confirmation was delivered.
    pub fn agree(&self, token: &str) -> Result<bool, ServiceError> {
        let session = self.session(token)?;
        let lead = self.lead_of(&session)?;

        self.records.add_recommendation(Recommendation {
            session_id: session.id,
            plan_name: "Selected Plan".to_string(),
            reasoning: "User agreed to proceed.".to_string(),
            created_at: Utc::now(),
        })?;
        self.records.set_lead_status(lead.id, LeadStatus::Agreed)?;

        let sent = match self.notifier.send(&EmailMessage::confirmation(&lead)) {
            Ok(()) => true,
            Err(e) => {
                warn!(lead = %lead.id, error = %e, "confirmation email failed");
                false
            }
        };
        self.records.log_email(EmailLog {
            lead_id: lead.id,
            template: CONFIRMATION_TEMPLATE.to_string(),
            status: if sent { EmailStatus::Sent } else { EmailStatus::Failed },
            created_at: Utc::now(),
        })?;
        info!(lead = %lead.id, sent, "lead agreed");
        Ok(sent)
    }

    fn session(&self, token: &str) -> Result<Session, ServiceError> {
        self.records.session_by_token(token)?.ok_or(ServiceError::InvalidSession)
    }

    fn lead_of(&self, session: &Session) -> Result<Lead, ServiceError> {
        self.records
            .lead(session.lead_id)?
            .ok_or(ServiceError::LeadNotFound(session.lead_id))
    }
}

fn validate_lead(lead: &NewLead) -> Result<(), ServiceError> {
    if lead.full_name.trim().is_empty() {
        return Err(ServiceError::InvalidLead("full name is required".to_string()));
    }
    let email = lead.email.trim();
    let valid_email = email
        .split_once('@')
        .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'));
    if !valid_email {
        return Err(ServiceError::InvalidLead(format!("'{email}' is not an email address")));
    }
    if lead.zip_code.trim().is_empty() || lead.address.trim().is_empty() {
        return Err(ServiceError::InvalidLead("address and zip code are required".to_string()));
    }
    Ok(())
}
