//! Grounded answering: prompt, model call, answer parsing.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use advisor_core::config::LlmSettings;
use advisor_core::error::GenerationError;
use advisor_hybrid::RetrievalResult;

use crate::llm::{ChatMessage, ChatModel, GenerationParams};
use crate::memory::MemoryState;
use crate::persona::Persona;
use crate::prompt::{build_prompt, condense_prompt, ContextEntry, Prompt, DISCLAIMER};

// `None` only if the literal pattern fails to compile; answers then cite every passage.
static CITATION: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\[(\d+)\]").ok());

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub origin: String,
    pub page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<Source>,
}

pub struct AnswerEngine<M> {
    model: M,
    params: GenerationParams,
    timeout: Duration,
}

impl<M: ChatModel> AnswerEngine<M> {
    pub fn new(model: M, params: GenerationParams, timeout: Duration) -> Self {
        Self { model, params, timeout }
    }

    pub fn from_settings(model: M, settings: &LlmSettings) -> Self {
        Self::new(
            model,
            GenerationParams::from(settings),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Answer `query` from the retrieved context and prior turns.
    pub async fn answer(
        &self,
        query: &str,
        memory: &MemoryState,
        retrieval: &RetrievalResult,
        persona: Persona,
    ) -> Result<Answer, GenerationError> {
        let prompt = build_prompt(query, memory, retrieval, persona);
        let raw = self.complete(&prompt).await?;
        let answer = parse_answer(&raw, &prompt)?;
        debug!(
            provider = self.model.name(),
            persona = %persona,
            sources = answer.sources.len(),
            low_confidence = prompt.low_confidence,
            "answered"
        );
        Ok(answer)
    }

    /// Rewrite a follow-up into a standalone question. Falls back to the
    /// original query when the model returns nothing.
    pub async fn condense(
        &self,
        query: &str,
        memory: &MemoryState,
    ) -> Result<String, GenerationError> {
        if memory.is_empty() {
            return Ok(query.to_string());
        }
        let messages = condense_prompt(query, memory);
        let raw = self.call(&messages).await?;
        let standalone = raw.trim();
        if standalone.is_empty() {
            warn!("condensation returned nothing; using the original question");
            return Ok(query.to_string());
        }
        debug!(standalone, "condensed follow-up");
        Ok(standalone.to_string())
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        self.call(&prompt.messages).await
    }

    async fn call(&self, messages: &[ChatMessage]) -> Result<String, GenerationError> {
        let call = self.model.complete(messages, &self.params);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    provider = self.model.name(),
                    timeout = ?self.timeout,
                    "generation timed out"
                );
                Err(GenerationError::Timeout(self.timeout))
            }
        }
    }
}

/// Trim the output, prepend the disclaimer on low confidence and resolve citations.
pub fn parse_answer(raw: &str, prompt: &Prompt) -> Result<Answer, GenerationError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(GenerationError::MalformedResponse {
            provider: "model",
            reason: "empty answer".to_string(),
        });
    }
    let text = if prompt.low_confidence && !text.starts_with(DISCLAIMER) {
        format!("{DISCLAIMER}\n\n{text}")
    } else {
        text.to_string()
    };
    let sources = cited_sources(&text, &prompt.context);
    Ok(Answer { text, sources })
}

/// Sources cited as `[n]`, in citation order; all context entries when none are cited.
pub fn cited_sources(text: &str, context: &[ContextEntry]) -> Vec<Source> {
    let cited: Vec<&ContextEntry> = CITATION
        .iter()
        .flat_map(|pattern| pattern.captures_iter(text))
        .filter_map(|c| c.get(1)?.as_str().parse::<usize>().ok())
        .filter_map(|n| context.iter().find(|e| e.number == n))
        .collect();
    let entries: Vec<&ContextEntry> =
        if cited.is_empty() { context.iter().collect() } else { cited };

    let mut sources: Vec<Source> = Vec::with_capacity(entries.len());
    for entry in entries {
        let source = Source { origin: entry.source.clone(), page: entry.page };
        if !sources.contains(&source) {
            sources.push(source);
        }
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockModel;

    fn ctx(number: usize, source: &str, page: Option<u32>) -> ContextEntry {
        ContextEntry { number, source: source.into(), page, text: String::new() }
    }

    fn prompt_with(context: Vec<ContextEntry>, low_confidence: bool) -> Prompt {
        Prompt { messages: Vec::new(), context, low_confidence }
    }

    #[test]
    fn citations_in_order_and_deduped() {
        let context =
            vec![ctx(1, "a.pdf", Some(1)), ctx(2, "b.txt", None), ctx(3, "a.pdf", Some(1))];
        let sources = cited_sources("See [2], then [3] and [1]. Again [2]. Bogus [9].", &context);
        assert_eq!(
            sources,
            vec![
                Source { origin: "b.txt".into(), page: None },
                Source { origin: "a.pdf".into(), page: Some(1) },
            ]
        );
    }

    #[test]
    fn multi_digit_citations_resolve() {
        let context: Vec<ContextEntry> =
            (1..=12).map(|n| ctx(n, &format!("doc{n}.txt"), None)).collect();
        let sources = cited_sources("Only the last passage applies [12].", &context);
        assert_eq!(sources, vec![Source { origin: "doc12.txt".into(), page: None }]);
    }

    #[test]
    fn uncited_answer_lists_all_context() {
        let context = vec![ctx(1, "a.pdf", Some(2)), ctx(2, "b.txt", None)];
        let sources = cited_sources("No markers here.", &context);
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].page, Some(2));
    }

    #[test]
    fn empty_output_is_malformed() {
        let err = parse_answer("  \n", &prompt_with(Vec::new(), false)).unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse { .. }));
    }

    #[test]
    fn disclaimer_prepended_once() {
        let low = prompt_with(Vec::new(), true);
        let answer = parse_answer("Could you tell me your age?", &low).unwrap();
        assert!(answer.text.starts_with(DISCLAIMER));

        let already = format!("{DISCLAIMER} Could you tell me your age?");
        let answer = parse_answer(&already, &low).unwrap();
        assert_eq!(answer.text.matches(DISCLAIMER).count(), 1);

        let answer = parse_answer("Fine answer [1].", &prompt_with(Vec::new(), false)).unwrap();
        assert_eq!(answer.text, "Fine answer [1].");
    }

    #[tokio::test]
    async fn timeout_surfaces_as_generation_error() {
        let model = MockModel::default().with_delay(Duration::from_millis(200));
        let engine =
            AnswerEngine::new(model, GenerationParams::default(), Duration::from_millis(20));
        let result = engine
            .answer("q", &MemoryState::default(), &RetrievalResult::empty("q"), Persona::General)
            .await;
        assert!(matches!(result, Err(GenerationError::Timeout(_))));
    }

    #[tokio::test]
    async fn condense_skips_model_without_history() {
        let model = MockModel::with_responses(["should not be used"]);
        let engine = AnswerEngine::new(model, GenerationParams::default(), Duration::from_secs(1));
        let q = engine.condense("what about fees?", &MemoryState::default()).await.unwrap();
        assert_eq!(q, "what about fees?");
        assert!(engine.model().requests().is_empty());
    }
}
