//! Lead, session and conversation records.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::memory::ConversationTurn;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("lead {0} not found")]
    LeadNotFound(Uuid),

    #[error("session {0} not found")]
    SessionNotFound(Uuid),

    #[error("a lead with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("session token already in use")]
    DuplicateToken,

    #[error("record storage failed: {0}")]
    Storage(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    InChat,
    Agreed,
    Archived,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLead {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub date_of_birth: NaiveDate,
    pub zip_code: String,
    pub gender: Option<String>,
    pub address: String,
    pub consent: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub date_of_birth: NaiveDate,
    pub zip_code: String,
    pub gender: Option<String>,
    pub address: String,
    pub consent: bool,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub token: String,
    pub started_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub session_id: Uuid,
    pub plan_name: String,
    pub reasoning: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    Pending,
    Sent,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailLog {
    pub lead_id: Uuid,
    pub template: String,
    pub status: EmailStatus,
    pub created_at: DateTime<Utc>,
}

/// Persistence for the chat service. Turns are append-only.
pub trait RecordStore: Send + Sync {
    fn create_lead(&self, lead: NewLead, status: LeadStatus) -> Result<Lead, RecordError>;

    fn lead(&self, id: Uuid) -> Result<Option<Lead>, RecordError>;

    fn set_lead_status(&self, id: Uuid, status: LeadStatus) -> Result<(), RecordError>;

    fn open_session(&self, lead_id: Uuid, token: &str) -> Result<Session, RecordError>;

    fn session_by_token(&self, token: &str) -> Result<Option<Session>, RecordError>;

    fn touch_session(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RecordError>;

    fn append_turn(&self, session_id: Uuid, turn: ConversationTurn) -> Result<(), RecordError>;

    /// Turns of a session in insertion order.
    fn turns(&self, session_id: Uuid) -> Result<Vec<ConversationTurn>, RecordError>;

    fn add_recommendation(&self, recommendation: Recommendation) -> Result<(), RecordError>;

    fn recommendations(&self, session_id: Uuid) -> Result<Vec<Recommendation>, RecordError>;

    fn log_email(&self, log: EmailLog) -> Result<(), RecordError>;

    fn emails(&self, lead_id: Uuid) -> Result<Vec<EmailLog>, RecordError>;
}

#[derive(Default)]
struct Tables {
    leads: HashMap<Uuid, Lead>,
    sessions: HashMap<Uuid, Session>,
    tokens: HashMap<String, Uuid>,
    turns: HashMap<Uuid, Vec<ConversationTurn>>,
    recommendations: Vec<Recommendation>,
    emails: Vec<EmailLog>,
}

/// Process-local record store; one mutex serialises all writes.
#[derive(Default)]
pub struct InMemoryRecords {
    tables: Mutex<Tables>,
}

impl InMemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RecordStore for InMemoryRecords {
    fn create_lead(&self, lead: NewLead, status: LeadStatus) -> Result<Lead, RecordError> {
        let mut t = self.tables();
        if t.leads.values().any(|l| l.email.eq_ignore_ascii_case(&lead.email)) {
            return Err(RecordError::DuplicateEmail(lead.email));
        }
        let record = Lead {
            id: Uuid::new_v4(),
            full_name: lead.full_name,
            email: lead.email,
            phone: lead.phone,
            date_of_birth: lead.date_of_birth,
            zip_code: lead.zip_code,
            gender: lead.gender,
            address: lead.address,
            consent: lead.consent,
            status,
            created_at: Utc::now(),
        };
        t.leads.insert(record.id, record.clone());
        Ok(record)
    }

    fn lead(&self, id: Uuid) -> Result<Option<Lead>, RecordError> {
        Ok(self.tables().leads.get(&id).cloned())
    }

    fn set_lead_status(&self, id: Uuid, status: LeadStatus) -> Result<(), RecordError> {
        let mut t = self.tables();
        let lead = t.leads.get_mut(&id).ok_or(RecordError::LeadNotFound(id))?;
        lead.status = status;
        Ok(())
    }

    fn open_session(&self, lead_id: Uuid, token: &str) -> Result<Session, RecordError> {
        let mut t = self.tables();
        if !t.leads.contains_key(&lead_id) {
            return Err(RecordError::LeadNotFound(lead_id));
        }
        if t.tokens.contains_key(token) {
            return Err(RecordError::DuplicateToken);
        }
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            lead_id,
            token: token.to_string(),
            started_at: now,
            last_active_at: now,
        };
        t.tokens.insert(session.token.clone(), session.id);
        t.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    fn session_by_token(&self, token: &str) -> Result<Option<Session>, RecordError> {
        let t = self.tables();
        Ok(t.tokens.get(token).and_then(|id| t.sessions.get(id)).cloned())
    }

    fn touch_session(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RecordError> {
        let mut t = self.tables();
        let session = t.sessions.get_mut(&id).ok_or(RecordError::SessionNotFound(id))?;
        session.last_active_at = at;
        Ok(())
    }

    fn append_turn(&self, session_id: Uuid, turn: ConversationTurn) -> Result<(), RecordError> {
        let mut t = self.tables();
        if !t.sessions.contains_key(&session_id) {
            return Err(RecordError::SessionNotFound(session_id));
        }
        t.turns.entry(session_id).or_default().push(turn);
        Ok(())
    }

    fn turns(&self, session_id: Uuid) -> Result<Vec<ConversationTurn>, RecordError> {
        Ok(self.tables().turns.get(&session_id).cloned().unwrap_or_default())
    }

    fn add_recommendation(&self, recommendation: Recommendation) -> Result<(), RecordError> {
        let mut t = self.tables();
        if !t.sessions.contains_key(&recommendation.session_id) {
            return Err(RecordError::SessionNotFound(recommendation.session_id));
        }
        t.recommendations.push(recommendation);
        Ok(())
    }

    fn recommendations(&self, session_id: Uuid) -> Result<Vec<Recommendation>, RecordError> {
        Ok(self
            .tables()
            .recommendations
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect())
    }

    fn log_email(&self, log: EmailLog) -> Result<(), RecordError> {
        self.tables().emails.push(log);
        Ok(())
    }

    fn emails(&self, lead_id: Uuid) -> Result<Vec<EmailLog>, RecordError> {
        Ok(self.tables().emails.iter().filter(|e| e.lead_id == lead_id).cloned().collect())
    }
}
