use tantivy::schema::{Schema, TextFieldIndexing, TextOptions, IndexRecordOption, STRING, STORED};
use tantivy::tokenizer::{
	Language, LowerCaser, SimpleTokenizer, Stemmer, StopWordFilter, TextAnalyzer,
};
use tantivy::Index;

pub const TOKENIZER_NAME: &str = "advisor_en";

/// `id` is stored for hit resolution; `text` is indexed only, the chunk
/// catalogue keeps the payload.
pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_text_field("id", STRING | STORED);
	let text_field_indexing = TextFieldIndexing::default()
		.set_tokenizer(TOKENIZER_NAME)
		.set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing);
	schema_builder.add_text_field("text", text_options);
	schema_builder.build()
}

/// Tokenizers are not persisted with the index; register on every open.
pub fn register_tokenizer(index: &Index) {
	let stop_words = [
		"a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he",
		"in", "is", "it", "its", "of", "on", "that", "the", "to", "was", "will",
		"with", "or", "but", "not", "this", "these", "they", "them", "their", "there",
		"then", "than", "so", "if", "when", "where", "why", "how", "what", "which",
		"who", "whom", "whose", "can", "could", "should", "would", "may", "might",
		"must", "shall", "do", "does", "did", "have", "had", "having", "i", "me", "my",
		"we", "our", "you", "your",
	];
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(stop_words.iter().map(|s| (*s).to_string())))
		.filter(Stemmer::new(Language::English))
		.build();
	index.tokenizers().register(TOKENIZER_NAME, tokenizer);
}
