use std::fs;
use std::io::Write;
use tempfile::TempDir;

use advisor_core::chunking::ChunkingConfig;
use advisor_core::data_processor::DataProcessor;
use advisor_core::error::IngestionError;

#[test]
fn process_directory_single_small_file() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let file_path = dir.join("a.txt");
    let mut f = fs::File::create(&file_path).unwrap();
    writeln!(
        f,
        "Term life covers a fixed period. Whole life never expires. Both pay a death benefit."
    )
    .unwrap();

    let processor = DataProcessor::default();
    let corpus = processor.process_directory(dir).expect("process");

    assert_eq!(corpus.chunks.len(), 1, "a short document becomes one chunk");
    assert_eq!(corpus.chunks[0].id, "a.txt:0");
    assert!(corpus.chunks[0].content.starts_with("Term life covers"));
    assert_eq!(corpus.loaded.len(), 1);
}

#[test]
fn chunks_are_verbatim_substrings() {
    let tmp = TempDir::new().unwrap();
    let text: String = (0..400)
        .map(|i| format!("Sentence {i} about annuities and riders. "))
        .collect();
    fs::write(tmp.path().join("long.txt"), &text).unwrap();

    let cfg = ChunkingConfig::new(200, 40).unwrap();
    let corpus = DataProcessor::new(cfg)
        .process_directory(tmp.path())
        .expect("process");

    let n_chars = text.chars().count();
    assert_eq!(corpus.chunks.len(), cfg.expected_chunks(n_chars));
    for (i, chunk) in corpus.chunks.iter().enumerate() {
        assert_eq!(chunk.chunk_index, i);
        assert_eq!(&text[chunk.start..chunk.end], chunk.content);
    }
}

#[test]
fn unsupported_files_are_skipped_and_reported() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("plans.txt"), "Retirement plan basics").unwrap();
    fs::write(tmp.path().join("deck.pptx"), "binary-ish").unwrap();
    fs::create_dir(tmp.path().join("nested")).unwrap();
    fs::write(tmp.path().join("nested").join("ignored.txt"), "deep").unwrap();

    let corpus = DataProcessor::default()
        .process_directory(tmp.path())
        .expect("process");

    assert_eq!(corpus.loaded.len(), 1);
    assert_eq!(corpus.skipped.len(), 1);
    assert_eq!(corpus.skipped[0].name, "deck.pptx");
    assert!(corpus.chunks.iter().all(|c| c.id.starts_with("plans.txt:")));
}

#[test]
fn missing_directory_names_the_path() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("no_such_kb");
    let err = DataProcessor::default()
        .process_directory(&missing)
        .unwrap_err();
    assert!(matches!(&err, IngestionError::SourceNotFound(p) if p == &missing));
    assert!(err.to_string().contains("no_such_kb"));
}

#[test]
fn folder_without_ingestible_content_fails() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("empty.txt"), "").unwrap();
    fs::write(tmp.path().join("image.png"), [0u8, 1, 2]).unwrap();

    let err = DataProcessor::default()
        .process_directory(tmp.path())
        .unwrap_err();
    assert!(matches!(err, IngestionError::NoDocuments(_)));
}

#[test]
fn files_are_processed_in_name_order() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("b.txt"), "bravo").unwrap();
    fs::write(tmp.path().join("a.txt"), "alpha").unwrap();
    fs::write(tmp.path().join("c.csv"), "k,v\nx,1\ny,2\n").unwrap();

    let corpus = DataProcessor::default()
        .process_directory(tmp.path())
        .expect("process");
    let ids: Vec<&str> = corpus.chunks.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["a.txt:0", "b.txt:0", "c.csv:0", "c.csv:1"]);
}

#[test]
fn corrupt_supported_file_is_skipped_not_fatal() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("broken.pdf"), b"not a pdf").unwrap();
    fs::write(tmp.path().join("guide.txt"), "Annuities turn savings into income.").unwrap();

    let corpus = DataProcessor::default()
        .process_directory(tmp.path())
        .expect("a bad pdf must not fail the run");

    assert_eq!(corpus.skipped.len(), 1);
    assert_eq!(corpus.skipped[0].name, "broken.pdf");
    assert!(corpus.skipped[0].reason.starts_with("failed to load"));
    assert!(corpus.skipped[0].reason.contains("broken.pdf"));

    assert_eq!(corpus.loaded.len(), 1);
    assert_eq!(corpus.loaded[0].name, "guide.txt");
    let ids: Vec<&str> = corpus.chunks.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["guide.txt:0"]);
    assert_eq!(corpus.chunks[0].content, "Annuities turn savings into income.");
}
