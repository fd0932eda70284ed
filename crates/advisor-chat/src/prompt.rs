//! Deterministic prompt assembly.

use advisor_hybrid::RetrievalResult;

use crate::llm::ChatMessage;
use crate::memory::{MemoryState, Role};
use crate::persona::Persona;

pub const SYSTEM_INSTRUCTION: &str = "You are a financial planning assistant specializing in \
    life insurance and retirement plans.\n\
    Use the provided context snippets. If insufficient, say so and ask for clarifications.";

pub const LOW_CONFIDENCE_NOTE: &str = "Note: the retrieved context matches the question poorly. \
    Open your answer by saying the knowledge base does not cover it well, \
    then ask a clarifying question.";

/// Prepended to answers built on low-confidence context.
pub const DISCLAIMER: &str =
    "I could not find enough information in the knowledge base to answer this confidently.";

const ANSWER_STYLE: &str = "Answer in 3–5 concise sentences, include pros/cons when relevant, \
    and clear next steps. Cite the context passages you use as [n].";

const CONDENSE_INSTRUCTION: &str = "Given the conversation so far and a follow-up question, \
    rewrite the follow-up as a standalone question. Reply with the question only.";

/// One numbered passage of the context block.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextEntry {
    pub number: usize,
    pub source: String,
    pub page: Option<u32>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub messages: Vec<ChatMessage>,
    pub context: Vec<ContextEntry>,
    pub low_confidence: bool,
}

impl Prompt {
    /// The full system message, context block included.
    pub fn system(&self) -> &str {
        self.messages.first().map_or("", |m| m.content.as_str())
    }
}

fn context_entries(retrieval: &RetrievalResult) -> Vec<ContextEntry> {
    retrieval
        .hits
        .iter()
        .enumerate()
        .map(|(i, hit)| ContextEntry {
            number: i + 1,
            source: hit.chunk.source.clone(),
            page: hit.chunk.page,
            text: hit.chunk.content.clone(),
        })
        .collect()
}

pub fn render_context(entries: &[ContextEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!("[{}] {}", entry.number, entry.source));
        if let Some(page) = entry.page {
            out.push_str(&format!(", Page {page}"));
        }
        out.push('\n');
        out.push_str(&entry.text);
        out.push_str("\n\n");
    }
    if out.is_empty() {
        out.push_str("(no relevant passages found)\n");
    }
    out
}

/// System instruction, context block, prior turns, then the question.
pub fn build_prompt(
    query: &str,
    memory: &MemoryState,
    retrieval: &RetrievalResult,
    persona: Persona,
) -> Prompt {
    let context = context_entries(retrieval);
    let low_confidence = retrieval.is_low_confidence();

    let mut system = String::from(SYSTEM_INSTRUCTION);
    let extra = persona.instruction();
    if !extra.is_empty() {
        system.push('\n');
        system.push_str(extra);
    }
    if low_confidence {
        system.push('\n');
        system.push_str(LOW_CONFIDENCE_NOTE);
    }
    system.push_str("\n\nContext:\n");
    system.push_str(&render_context(&context));

    let mut messages = Vec::with_capacity(memory.len() + 2);
    messages.push(ChatMessage::system(system));
    for turn in memory.turns() {
        messages.push(match turn.role {
            Role::User => ChatMessage::user(turn.text.clone()),
            Role::Assistant => ChatMessage::assistant(turn.text.clone()),
        });
    }
    messages.push(ChatMessage::user(format!("Question: {}\n\n{ANSWER_STYLE}", query.trim())));

    Prompt { messages, context, low_confidence }
}

/// Prompt asking the model to turn a follow-up into a standalone question.
pub fn condense_prompt(query: &str, memory: &MemoryState) -> Vec<ChatMessage> {
    let mut transcript = String::new();
    for turn in memory.turns() {
        let who = match turn.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        transcript.push_str(&format!("{who}: {}\n", turn.text));
    }
    vec![
        ChatMessage::system(CONDENSE_INSTRUCTION),
        ChatMessage::user(format!("Conversation:\n{transcript}\nFollow-up: {}", query.trim())),
    ]
}
