use advisor_core::types::{DocumentChunk, SourceKind};
use advisor_text::{SparseIndexer, SparseSearcher};

fn chunk(id: &str, content: &str) -> DocumentChunk {
    DocumentChunk {
        id: id.to_string(),
        source: format!("kb/{id}"),
        page: None,
        start: 0,
        end: content.len(),
        chunk_index: 0,
        content: content.to_string(),
    }
}

fn corpus() -> Vec<DocumentChunk> {
    vec![
        chunk(
            "term.txt:0",
            "Term life insurance pays a death benefit during a fixed term. Premiums stay level.",
        ),
        chunk("whole.txt:0", "Whole life insurance builds cash value and never expires."),
        chunk("ira.txt:0", "A Roth IRA grows tax free; withdrawals in retirement are not taxed."),
        chunk(
            "annuity.txt:0",
            "Fixed annuities convert savings into guaranteed retirement income.",
        ),
    ]
}

#[test]
fn sparse_full_flow_on_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("sparse");
    let indexer = SparseIndexer::create_in_dir(&dir).expect("indexer");
    assert_eq!(indexer.index(&corpus()).expect("index"), 4);
    drop(indexer);

    let searcher = SparseSearcher::open(&dir).expect("open");
    assert_eq!(searcher.num_docs(), 4);

    let hits = searcher.search("roth ira withdrawals", 5).expect("search");
    assert_eq!(hits[0].id, "ira.txt:0");
    assert_eq!(hits[0].source, SourceKind::Sparse);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn stemming_matches_inflections() {
    let searcher = SparseIndexer::create_in_ram()
        .and_then(|i| {
            i.index(&corpus())?;
            i.into_searcher()
        })
        .expect("searcher");
    let hits = searcher.search("premium", 3).expect("search");
    assert_eq!(hits.first().map(|h| h.id.as_str()), Some("term.txt:0"));
}

#[test]
fn punctuation_never_fails_the_query() {
    let indexer = SparseIndexer::create_in_ram().expect("indexer");
    indexer.index(&corpus()).expect("index");
    let searcher = indexer.into_searcher().expect("searcher");
    for q in ["what's (the) cost?!", "annuity: \"fixed", "AND OR", "???"] {
        assert!(searcher.search(q, 5).is_ok(), "query {q:?} failed");
    }
}

#[test]
fn empty_index_returns_nothing() {
    let searcher = SparseIndexer::create_in_ram()
        .and_then(SparseIndexer::into_searcher)
        .expect("searcher");
    assert!(searcher.search("retirement", 5).expect("search").is_empty());
}

#[test]
fn repeated_searches_are_identical() {
    let indexer = SparseIndexer::create_in_ram().expect("indexer");
    indexer.index(&corpus()).expect("index");
    let searcher = indexer.into_searcher().expect("searcher");
    let a = searcher.search("life insurance", 4).expect("search");
    let b = searcher.search("life insurance", 4).expect("search");
    assert_eq!(a, b);
}
