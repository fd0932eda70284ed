use anyhow::Result;
use std::path::Path;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::{Index, IndexReader, ReloadPolicy, TantivyDocument};
use tantivy::schema::Value;
use tracing::debug;

use advisor_core::traits::TextSearch;
use advisor_core::types::{SearchHit, SourceKind};

use crate::tantivy_utils::register_tokenizer;

/// Read-only BM25 searcher over a committed index.
pub struct SparseSearcher {
	index: Index,
	reader: IndexReader,
	id_field: tantivy::schema::Field,
	text_field: tantivy::schema::Field,
}

impl SparseSearcher {
	pub fn open(index_dir: &Path) -> Result<Self> {
		Self::from_index(Index::open_in_dir(index_dir)?)
	}

	pub(crate) fn from_index(index: Index) -> Result<Self> {
		register_tokenizer(&index);
		let reader: IndexReader = index
			.reader_builder()
			.reload_policy(ReloadPolicy::Manual)
			.try_into()?;
		let schema = index.schema();
		let id_field = schema.get_field("id")?;
		let text_field = schema.get_field("text")?;
		Ok(Self { index, reader, id_field, text_field })
	}

	pub fn num_docs(&self) -> u64 {
		self.reader.searcher().num_docs()
	}

	/// Lenient parsing: syntax errors in user text degrade to the terms that
	/// did parse instead of failing the query.
	pub fn search(&self, query_text: &str, limit: usize) -> Result<Vec<SearchHit>> {
		let searcher = self.reader.searcher();
		if limit == 0 || searcher.num_docs() == 0 { return Ok(Vec::new()); }
		let query_parser = QueryParser::for_index(&self.index, vec![self.text_field]);
		let (query, errors) = query_parser.parse_query_lenient(query_text);
		if !errors.is_empty() { debug!(?errors, "lenient query parse dropped terms"); }
		let top_docs = searcher.search(&query, &TopDocs::with_limit(limit))?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, doc_address) in top_docs {
			let doc: TantivyDocument = searcher.doc(doc_address)?;
			let Some(id) = doc.get_first(self.id_field).and_then(|v| v.as_str()) else { continue };
			hits.push(SearchHit { id: id.to_string(), score, source: SourceKind::Sparse });
		}
		Ok(hits)
	}
}

impl TextSearch for SparseSearcher {
	fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
		SparseSearcher::search(self, query, k)
	}
}
