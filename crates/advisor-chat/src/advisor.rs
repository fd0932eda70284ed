use std::sync::Arc;

use tracing::{debug, info_span, Instrument};

use advisor_core::config::Settings;
use advisor_core::error::Error;
use advisor_hybrid::{HybridRetriever, RetrievalParams, RetrievalStore};

use crate::engine::{Answer, AnswerEngine};
use crate::llm::ChatModel;
use crate::memory::{rehydrate, ConversationTurn, MemoryPolicy};
use crate::persona::{route, Persona};

/// Query entry point: memory, retrieval and answering for one question.
pub struct Advisor<M> {
    retriever: HybridRetriever,
    engine: AnswerEngine<M>,
    memory: MemoryPolicy,
    condense_question: bool,
    routing: bool,
}

impl<M: ChatModel> Advisor<M> {
    pub fn new(retriever: HybridRetriever, engine: AnswerEngine<M>, memory: MemoryPolicy) -> Self {
        Self { retriever, engine, memory, condense_question: false, routing: false }
    }

    pub fn from_settings(settings: &Settings, store: Arc<RetrievalStore>, model: M) -> Self {
        let retriever = HybridRetriever::new(store, RetrievalParams::from(&settings.retrieval));
        let engine = AnswerEngine::from_settings(model, &settings.llm);
        Self::new(retriever, engine, MemoryPolicy::from(&settings.memory))
            .with_condensation(settings.memory.condense_question)
            .with_routing(settings.routing.enabled)
    }

    #[must_use]
    pub fn with_condensation(mut self, enabled: bool) -> Self {
        self.condense_question = enabled;
        self
    }

    #[must_use]
    pub fn with_routing(mut self, enabled: bool) -> Self {
        self.routing = enabled;
        self
    }

    pub fn engine(&self) -> &AnswerEngine<M> {
        &self.engine
    }

    pub fn retriever(&self) -> &HybridRetriever {
        &self.retriever
    }

    /// Answer `query` given the prior turns of the conversation.
    pub async fn ask(&self, query: &str, history: &[ConversationTurn]) -> Result<Answer, Error> {
        let memory = rehydrate(history, self.memory);
        let span = info_span!("ask", turns = memory.len());
        async {
            let search_query = if self.condense_question {
                self.engine.condense(query, &memory).await?
            } else {
                query.to_string()
            };
            let retrieval = self.retriever.retrieve(&search_query).await?;
            let persona = if self.routing { route(query) } else { Persona::General };
            debug!(hits = retrieval.hits.len(), persona = %persona, "context retrieved");
            Ok::<_, Error>(self.engine.answer(query, &memory, &retrieval, persona).await?)
        }
        .instrument(span)
        .await
    }
}
