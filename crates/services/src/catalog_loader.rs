//! Reads course catalogs authored as JSON.
//!
//! ```json
//! { "lessons": [
//!     { "id": 101, "ordinal": 1, "title": "Ownership",
//!       "content": { "kind": "simple", "steps": 3 } }
//! ] }
//! ```

use std::path::Path;

use course_core::model::{Catalog, Lesson};
use serde::Deserialize;

use crate::error::CatalogLoadError;

#[derive(Debug, Deserialize)]
struct CatalogFile {
    lessons: Vec<Lesson>,
}

/// Parse and validate a catalog from JSON text.
///
/// # Errors
///
/// Returns `CatalogLoadError::Json` for malformed input or
/// `CatalogLoadError::Invalid` if the lessons fail validation.
pub fn parse_catalog(raw: &str) -> Result<Catalog, CatalogLoadError> {
    let file: CatalogFile = serde_json::from_str(raw)?;
    Ok(Catalog::new(file.lessons)?)
}

/// Read, parse and validate a catalog file.
///
/// # Errors
///
/// Returns `CatalogLoadError::Io` if the file cannot be read, otherwise as
/// [`parse_catalog`].
pub fn load_catalog(path: &Path) -> Result<Catalog, CatalogLoadError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CatalogLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_catalog(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::{CatalogError, Ordinal};

    #[test]
    fn parses_mixed_lessons() {
        let catalog = parse_catalog(
            r#"{ "lessons": [
                { "id": 20, "ordinal": 2, "title": "Borrowing",
                  "content": { "kind": "quizGated", "steps": 2, "quiz": { "questions": [
                      { "prompt": "Can you hold two &mut?", "options": ["yes", "no"],
                        "correctIndex": 1, "explanation": "Only one mutable borrow at a time." }
                  ] } } },
                { "id": 10, "ordinal": 1, "title": "Ownership",
                  "content": { "kind": "simple", "steps": 3 } }
            ] }"#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.lessons()[0].title, "Ownership");
        let second = catalog.get(Ordinal::try_new(2).unwrap()).unwrap();
        assert!(second.content.quiz().is_some());
    }

    #[test]
    fn reports_json_and_validation_errors() {
        assert!(matches!(
            parse_catalog("{ \"lessons\": ["),
            Err(CatalogLoadError::Json(_))
        ));
        assert!(matches!(
            parse_catalog(r#"{ "lessons": [] }"#),
            Err(CatalogLoadError::Invalid(CatalogError::Empty))
        ));
        assert!(matches!(
            parse_catalog(
                r#"{ "lessons": [ { "id": 1, "ordinal": 1, "title": "x",
                    "content": { "kind": "branching", "steps": 1 } } ] }"#
            ),
            Err(CatalogLoadError::Json(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_catalog(Path::new("/definitely/not/here/catalog.json")).unwrap_err();
        assert!(matches!(err, CatalogLoadError::Io { .. }));
    }
}
