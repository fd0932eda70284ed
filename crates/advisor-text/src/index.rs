use anyhow::Result;
use std::path::Path;
use tantivy::{doc, Index};
use tracing::debug;

use advisor_core::types::DocumentChunk;

use crate::search::SparseSearcher;
use crate::tantivy_utils::{build_schema, register_tokenizer};

const WRITER_HEAP_BYTES: usize = 50_000_000;

pub struct SparseIndexer {
	index: Index,
	id_field: tantivy::schema::Field,
	text_field: tantivy::schema::Field,
}

impl SparseIndexer {
	/// Create a fresh on-disk index, wiping whatever was at `index_dir`.
	pub fn create_in_dir(index_dir: &Path) -> Result<Self> {
		if index_dir.exists() { std::fs::remove_dir_all(index_dir)?; }
		std::fs::create_dir_all(index_dir)?;
		let index = Index::create_in_dir(index_dir, build_schema())?;
		Self::from_index(index)
	}

	pub fn create_in_ram() -> Result<Self> {
		Self::from_index(Index::create_in_ram(build_schema()))
	}

	fn from_index(index: Index) -> Result<Self> {
		register_tokenizer(&index);
		let schema = index.schema();
		let id_field = schema.get_field("id")?;
		let text_field = schema.get_field("text")?;
		Ok(Self { index, id_field, text_field })
	}

	/// Add all chunks in one commit. A single writer thread keeps segment
	/// layout, and therefore tie order, reproducible.
	pub fn index(&self, chunks: &[DocumentChunk]) -> Result<usize> {
		let mut index_writer = self.index.writer_with_num_threads(1, WRITER_HEAP_BYTES)?;
		for c in chunks {
			index_writer.add_document(doc!(
				self.id_field => c.id.clone(),
				self.text_field => c.content.clone(),
			))?;
		}
		index_writer.commit()?;
		debug!(chunks = chunks.len(), "sparse index committed");
		Ok(chunks.len())
	}

	pub fn into_searcher(self) -> Result<SparseSearcher> {
		SparseSearcher::from_index(self.index)
	}
}
