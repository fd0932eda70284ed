//! LanceDB connection and table helpers.
use anyhow::{anyhow, Result};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int32Array, RecordBatchIterator, StringArray,
};
use futures::TryStreamExt;
use lancedb::{connect, Connection};
use lancedb::query::ExecutableQuery;
use std::sync::Arc;

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    Ok(conn.table_names().execute().await?.iter().any(|n| n == name))
}

pub async fn ensure_table(
    conn: &Connection,
    name: &str,
    schema: Arc<arrow_schema::Schema>,
) -> Result<()> {
    if table_exists(conn, name).await? {
        return Ok(());
    }
    // create empty table with 0 rows
    let iter = RecordBatchIterator::new(vec![].into_iter(), schema.clone());
    conn.create_table(name, Box::new(iter)).execute().await?;
    Ok(())
}

/// One stored row: chunk id, insertion ordinal and its vector.
pub struct VectorRow {
    pub id: String,
    pub ordinal: i32,
    pub vector: Vec<f32>,
}

/// Full scan of a vector table, ordered by insertion ordinal.
pub async fn read_rows(conn: &Connection, name: &str) -> Result<Vec<VectorRow>> {
    let table = conn.open_table(name).execute().await?;
    let mut stream = table.query().execute().await?;
    let mut rows = Vec::new();
    while let Some(batch) = stream.try_next().await? {
        let ids = column::<StringArray>(&batch, "id")?;
        let ordinals = column::<Int32Array>(&batch, "ordinal")?;
        let vectors = column::<FixedSizeListArray>(&batch, "vector")?;
        for i in 0..batch.num_rows() {
            if !vectors.is_valid(i) {
                continue;
            }
            let values = vectors.value(i);
            let values = values
                .as_any()
                .downcast_ref::<Float32Array>()
                .ok_or_else(|| anyhow!("vector column is not float32"))?;
            rows.push(VectorRow {
                id: ids.value(i).to_string(),
                ordinal: ordinals.value(i),
                vector: values.values().to_vec(),
            });
        }
    }
    rows.sort_by_key(|r| r.ordinal);
    Ok(rows)
}

fn column<'a, T: 'static>(batch: &'a arrow_array::RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| anyhow!("column '{name}' missing or of unexpected type"))
}
