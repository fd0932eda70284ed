use anyhow::{bail, Result};
use std::path::Path;
use tracing::debug;

use advisor_core::traits::VectorSearch;
use advisor_core::types::{SearchHit, SourceKind};

use crate::table::{open_db, read_rows};

/// In-memory exact cosine index. Rows keep insertion order, which is also
/// the tie-break order for equal similarities.
#[derive(Debug, Clone, Default)]
pub struct DenseIndex {
	dim: usize,
	ids: Vec<String>,
	vectors: Vec<Vec<f32>>,
}

impl DenseIndex {
	pub fn from_parts(dim: usize, ids: Vec<String>, vectors: Vec<Vec<f32>>) -> Result<Self> {
		if ids.len() != vectors.len() {
			bail!("{} ids but {} vectors", ids.len(), vectors.len());
		}
		if vectors.iter().any(|v| v.len() != dim) {
			bail!("all vectors must have dimension {dim}");
		}
		Ok(Self { dim, ids, vectors })
	}

	pub async fn load(db_path: &Path, table_name: &str, dim: usize) -> Result<Self> {
		let db = open_db(db_path.to_string_lossy().as_ref()).await?;
		let rows = read_rows(&db, table_name).await?;
		let (ids, vectors) = rows.into_iter().map(|r| (r.id, r.vector)).unzip();
		let index = Self::from_parts(dim, ids, vectors)?;
		debug!(rows = index.len(), dim, "dense index loaded");
		Ok(index)
	}

	pub fn len(&self) -> usize { self.ids.len() }

	pub fn is_empty(&self) -> bool { self.ids.is_empty() }

	pub fn search_vec(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
		if query.len() != self.dim {
			bail!("query dimension {} != index dimension {}", query.len(), self.dim);
		}
		let q_norm = norm(query);
		let mut scored: Vec<(usize, f32)> = self.vectors.iter().enumerate()
			.map(|(i, v)| (i, cosine(query, q_norm, v)))
			.collect();
		// stable: equal scores stay in insertion order
		scored.sort_by(|a, b| b.1.total_cmp(&a.1));
		Ok(scored
			.into_iter()
			.take(k)
			.map(|(i, score)| SearchHit {
				id: self.ids[i].clone(),
				score,
				source: SourceKind::Dense,
			})
			.collect())
	}
}

fn norm(v: &[f32]) -> f32 { v.iter().map(|x| x * x).sum::<f32>().sqrt() }

fn cosine(q: &[f32], q_norm: f32, v: &[f32]) -> f32 {
	let denom = q_norm * norm(v);
	if denom == 0.0 { return 0.0; }
	q.iter().zip(v).map(|(a, b)| a * b).sum::<f32>() / denom
}

impl VectorSearch for DenseIndex {
	fn dim(&self) -> usize { self.dim }
	fn search_vec(&self, query_vec: &[f32], k: usize) -> Result<Vec<SearchHit>> {
		DenseIndex::search_vec(self, query_vec, k)
	}
}
