//! advisor-chat
//!
//! Conversation memory, prompt assembly, LLM providers, grounded answering
//! and the session-scoped chat service.

pub mod advisor;
pub mod engine;
pub mod llm;
pub mod memory;
pub mod notify;
pub mod persona;
pub mod prompt;
pub mod records;
pub mod service;

pub use advisor::Advisor;
pub use engine::{Answer, AnswerEngine, Source};
pub use llm::{AnyModel, ChatMessage, ChatModel, ChatRole, GenerationParams};
pub use memory::{rehydrate, ConversationTurn, MemoryPolicy, MemoryState, Role};
pub use persona::Persona;
pub use records::{InMemoryRecords, NewLead, RecordStore};
pub use service::{ChatService, ServiceError};
