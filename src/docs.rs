use std::path::Path;

use crate::error::{AppError, Result};

pub const OVERVIEW_PATH: &str = "docs/ARCHITECTURE_QUICK_REFERENCE.md";
pub const DEEPDIVE_PATH: &str = "docs/TECHNICAL_ARCHITECTURE.md";

const FENCE_OPEN: &str = "```mermaid\n";
const FENCE_CLOSE: &str = "\n```";

#[derive(Debug, Clone, PartialEq)]
pub enum DocSegment {
    Prose(String),
    Diagram(String),
}

/// Load an architecture document and split it for rendering. A missing file
/// is a warning condition for the page, not a crash.
pub fn load(path: &str) -> Result<Vec<DocSegment>> {
    if !Path::new(path).exists() {
        return Err(AppError::DocMissing(path.to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(split_segments(&content))
}

/// Split markdown into alternating prose and mermaid-diagram segments,
/// preserving document order. An unterminated fence stays in the prose tail.
pub fn split_segments(content: &str) -> Vec<DocSegment> {
    let mut segments = Vec::new();
    let mut rest = content;

    while let Some(open) = rest.find(FENCE_OPEN) {
        let body_start = open + FENCE_OPEN.len();
        let Some(close) = rest[body_start..].find(FENCE_CLOSE) else {
            break;
        };

        let prose = &rest[..open];
        if !prose.trim().is_empty() {
            segments.push(DocSegment::Prose(prose.trim().to_string()));
        }

        let diagram = &rest[body_start..body_start + close];
        segments.push(DocSegment::Diagram(diagram.trim().to_string()));

        rest = &rest[body_start + close + FENCE_CLOSE.len()..];
    }

    if !rest.trim().is_empty() {
        segments.push(DocSegment::Prose(rest.trim().to_string()));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn prose_and_diagrams_alternate_in_document_order() {
        let content = "# Overview\n\nIntro text.\n\n```mermaid\ngraph TD; A-->B;\n```\n\nMiddle text.\n\n```mermaid\nsequenceDiagram\n```\n\nClosing text.\n";
        let segments = split_segments(content);

        assert_eq!(segments.len(), 5);
        assert_eq!(
            segments[0],
            DocSegment::Prose("# Overview\n\nIntro text.".to_string())
        );
        assert_eq!(
            segments[1],
            DocSegment::Diagram("graph TD; A-->B;".to_string())
        );
        assert_eq!(segments[2], DocSegment::Prose("Middle text.".to_string()));
        assert_eq!(
            segments[3],
            DocSegment::Diagram("sequenceDiagram".to_string())
        );
        assert_eq!(segments[4], DocSegment::Prose("Closing text.".to_string()));
    }

    #[test]
    fn document_without_diagrams_is_one_prose_segment() {
        let segments = split_segments("Just some notes.\n\nMore notes.");
        assert_eq!(segments.len(), 1);
        assert!(matches!(segments[0], DocSegment::Prose(_)));
    }

    #[test]
    fn unterminated_fence_is_kept_as_prose() {
        let content = "Intro.\n\n```mermaid\ngraph TD; A-->B;";
        let segments = split_segments(content);
        assert_eq!(segments.len(), 1);
        assert!(matches!(&segments[0], DocSegment::Prose(p) if p.contains("graph TD")));
    }

    #[test]
    fn non_mermaid_fences_are_prose() {
        let content = "Look:\n\n```rust\nfn main() {}\n```\n";
        let segments = split_segments(content);
        assert_eq!(segments.len(), 1);
        assert!(matches!(&segments[0], DocSegment::Prose(p) if p.contains("fn main")));
    }

    #[test]
    fn missing_file_is_a_doc_missing_error() {
        match load("docs/NO_SUCH_FILE.md") {
            Err(AppError::DocMissing(path)) => assert!(path.contains("NO_SUCH_FILE")),
            other => panic!("expected DocMissing, got {other:?}"),
        }
    }

    #[test]
    fn existing_file_loads_and_splits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "Text.\n\n```mermaid\ngraph LR; X-->Y;\n```\n").unwrap();

        let segments = load(path.to_str().unwrap()).unwrap();
        assert_eq!(segments.len(), 2);
        assert!(matches!(segments[1], DocSegment::Diagram(_)));
    }
}
