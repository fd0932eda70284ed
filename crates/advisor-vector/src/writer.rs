use anyhow::{bail, Result};
use arrow_array::types::Float32Type;
use arrow_array::{FixedSizeListArray, Int32Array, RecordBatch, RecordBatchIterator, StringArray};
use lancedb::Connection;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::schema::build_vector_schema;
use crate::table::{ensure_table, open_db, table_exists};

const BATCH_ROWS: usize = 1000;

pub struct VectorWriter { db: Connection, table_name: String }

impl VectorWriter {
	pub async fn new(db_path: &Path, table_name: &str) -> Result<Self> {
		let db = open_db(db_path.to_string_lossy().as_ref()).await?;
		Ok(Self { db, table_name: table_name.to_string() })
	}

	/// Create the table holding `ids[i] -> vectors[i]`. Tables are written
	/// once per generation; every vector must have length `dim`.
	pub async fn write(&self, ids: &[String], vectors: &[Vec<f32>], dim: usize) -> Result<()> {
		if ids.len() != vectors.len() {
			bail!("{} ids but {} vectors", ids.len(), vectors.len());
		}
		if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dim) {
			bail!("vector {} for '{}' has dimension {}, expected {}", i, ids[i], v.len(), dim);
		}
		if table_exists(&self.db, &self.table_name).await? {
			bail!("table '{}' already exists", self.table_name);
		}
		let dim = i32::try_from(dim)?;
		let schema = build_vector_schema(dim);
		if ids.is_empty() {
			return ensure_table(&self.db, &self.table_name, schema).await;
		}

		let mut batches = Vec::new();
		let pairs = ids.chunks(BATCH_ROWS).zip(vectors.chunks(BATCH_ROWS));
		for (start, (id_chunk, vec_chunk)) in pairs.enumerate() {
			let offset = start * BATCH_ROWS;
			let ordinals = (0..id_chunk.len())
				.map(|i| i32::try_from(offset + i))
				.collect::<Result<Vec<_>, _>>()?;
			let batch = RecordBatch::try_new(schema.clone(), vec![
				Arc::new(StringArray::from(id_chunk.to_vec())),
				Arc::new(Int32Array::from(ordinals)),
				Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
					vec_chunk.iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect::<Vec<_>>())),
					dim,
				)),
			])?;
			batches.push(Ok(batch));
		}
		let reader = Box::new(RecordBatchIterator::new(batches.into_iter(), schema));
		self.db.create_table(&self.table_name, reader).execute().await?;
		info!(table = %self.table_name, rows = ids.len(), "vectors written");
		Ok(())
	}
}
