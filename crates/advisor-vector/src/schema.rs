use arrow_schema::{Schema, Field, DataType};
use std::sync::Arc;

/// `ordinal` records insertion order so a reload reproduces tie-breaking.
pub fn build_vector_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("id", DataType::Utf8, false),
		Field::new("ordinal", DataType::Int32, false),
		Field::new(
			"vector",
			DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim),
			true,
		),
	]))
}
