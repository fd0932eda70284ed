//! Format-specific text extraction.
//!
//! PDF yields one document per page, CSV one per data row, DOCX and TXT one
//! per file.

use std::fs;
use std::path::Path;

use crate::error::IngestionError;
use crate::types::RawDocument;

pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["pdf", "docx", "csv", "txt"];

pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

pub fn is_supported(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

pub fn load_file(path: &Path) -> Result<Vec<RawDocument>, IngestionError> {
    let source = path.display().to_string();
    match extension_of(path).as_deref() {
        Some("txt") => load_text(path, source),
        Some("csv") => load_csv(path, &source),
        Some("pdf") => load_pdf(path, &source),
        Some("docx") => load_docx(path, source),
        _ => Err(IngestionError::Unsupported(path.to_path_buf())),
    }
}

fn load_error(path: &Path, reason: impl ToString) -> IngestionError {
    IngestionError::Load {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn load_text(path: &Path, source: String) -> Result<Vec<RawDocument>, IngestionError> {
    let text = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(_) => {
            let bytes = fs::read(path).map_err(|e| load_error(path, e))?;
            String::from_utf8_lossy(&bytes).into_owned()
        }
    };
    Ok(vec![RawDocument {
        source,
        page: None,
        text,
    }])
}

fn load_csv(path: &Path, source: &str) -> Result<Vec<RawDocument>, IngestionError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| load_error(path, e))?;
    let headers = reader.headers().map_err(|e| load_error(path, e))?.clone();

    let mut docs = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| load_error(path, e))?;
        let text = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| format!("{}: {}", h.trim(), v.trim()))
            .collect::<Vec<_>>()
            .join("\n");
        if record.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        docs.push(RawDocument {
            source: source.to_string(),
            page: None,
            text,
        });
    }
    Ok(docs)
}

fn load_pdf(path: &Path, source: &str) -> Result<Vec<RawDocument>, IngestionError> {
    let bytes = fs::read(path).map_err(|e| load_error(path, e))?;
    // pdf-extract panics on some malformed fonts; treat that like any other load failure.
    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(&bytes))
        .map_err(|_| load_error(path, "pdf parser panicked"))?
        .map_err(|e| load_error(path, e))?;
    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(i, text)| RawDocument {
            source: source.to_string(),
            page: u32::try_from(i + 1).ok(),
            text,
        })
        .collect())
}

fn load_docx(path: &Path, source: String) -> Result<Vec<RawDocument>, IngestionError> {
    let bytes = fs::read(path).map_err(|e| load_error(path, e))?;
    let doc = docx_rs::read_docx(&bytes).map_err(|e| load_error(path, e))?;

    let mut text = String::new();
    for child in doc.document.children {
        if let docx_rs::DocumentChild::Paragraph(p) = child {
            for child in p.children {
                if let docx_rs::ParagraphChild::Run(run) = child {
                    for child in run.children {
                        if let docx_rs::RunChild::Text(t) = child {
                            text.push_str(&t.text);
                        }
                    }
                }
            }
            text.push('\n');
        }
    }
    Ok(vec![RawDocument {
        source,
        page: None,
        text,
    }])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn allow_list_is_case_insensitive() {
        assert!(is_supported(Path::new("plans.PDF")));
        assert!(is_supported(Path::new("notes.txt")));
        assert!(!is_supported(Path::new("slides.pptx")));
        assert!(!is_supported(Path::new("README")));
    }

    #[test]
    fn csv_rows_become_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plans.csv");
        fs::write(&path, "plan,premium\nTerm Life,25\nWhole Life,90\n,\n").unwrap();

        let docs = load_file(&path).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].text, "plan: Term Life\npremium: 25");
        assert_eq!(docs[1].text, "plan: Whole Life\npremium: 90");
        assert!(docs.iter().all(|d| d.page.is_none()));
    }

    #[test]
    fn unsupported_extension_is_an_error() {
        let err = load_file(&PathBuf::from("deck.pptx")).unwrap_err();
        assert!(matches!(err, IngestionError::Unsupported(_)));
    }

    #[test]
    fn corrupt_pdf_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"not a pdf").unwrap();
        match load_file(&path) {
            Err(IngestionError::Load { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected load error, got {other:?}"),
        }
    }
}
