//! PDF loading and text layout.
//!
//! Turns PDF bytes into a [`Document`]: pages of blocks of lines of spans,
//! where every span carries its text, font size, font name and fill colour.
//! Parsing goes through [`parser::backend::PdfBackend`], currently backed by
//! `lopdf`.

use thiserror::Error;

use parser::backend::{LopdfBackend, PdfBackend};

pub mod parser;
pub mod types;

pub use parser::layout::{TextBlock, TextLine, TextSpan};
pub use types::*;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse PDF bytes into a laid-out [`Document`].
pub fn load(bytes: &[u8]) -> Result<Document, PdfError> {
    let backend = LopdfBackend::load_bytes(bytes)?;
    load_from_backend(&backend, extract_metadata(&backend))
}

/// Read a PDF file from disk and lay it out.
pub fn load_file(path: &std::path::Path) -> Result<Document, PdfError> {
    let bytes = std::fs::read(path)?;
    load(&bytes)
}

/// Lay out every page exposed by `backend`.
pub fn load_from_backend(
    backend: &dyn PdfBackend,
    metadata: DocumentMetadata,
) -> Result<Document, PdfError> {
    let all_spans = parser::layout::extract_all_pages(backend)?;
    let pages = parser::layout::analyze(all_spans);
    Ok(Document { pages, metadata })
}

fn extract_metadata(backend: &LopdfBackend) -> DocumentMetadata {
    let raw = backend.metadata();
    DocumentMetadata {
        title: raw.get("Title").cloned(),
        author: raw.get("Author").cloned(),
        page_count: backend.page_count(),
        creator: raw.get("Creator").cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    /// A one-page PDF: a red 24pt bold heading over two 10pt body lines.
    fn heading_pdf() -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let body_font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Times-Roman",
        });
        let bold_font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "ABCDEF+Helvetica-Bold",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => body_font, "F2" => bold_font },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("rg", vec![1.into(), 0.into(), 0.into()]),
                Operation::new("Tf", vec!["F2".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 750.into()]),
                Operation::new("Tj", vec![Object::string_literal("INTRODUCTION")]),
                Operation::new("ET", vec![]),
                Operation::new("BT", vec![]),
                Operation::new("g", vec![0.into()]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal("Body text one.")]),
                Operation::new("Td", vec![0.into(), (-12).into()]),
                Operation::new("Tj", vec![Object::string_literal("Body text two.")]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().unwrap_or_default(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_load_lays_out_heading_and_body() {
        let doc = load(&heading_pdf()).unwrap();
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.metadata.page_count, 1);

        let page = &doc.pages[0];
        assert_eq!(page.number, 1);

        let lines: Vec<String> = page.lines().map(|l| l.text()).collect();
        assert_eq!(
            lines,
            vec!["INTRODUCTION", "Body text one.", "Body text two."]
        );

        let heading = &page.lines().next().unwrap().spans[0];
        assert_eq!(heading.font_name, "Helvetica-Bold");
        assert!((heading.font_size - 24.0).abs() < 0.01);
        assert_eq!(heading.color, 0xFF0000);

        // Heading and body are separated by a paragraph-sized gap.
        assert_eq!(page.blocks.len(), 2);
    }

    #[test]
    fn test_load_rejects_empty_bytes() {
        assert!(load(&[]).is_err());
    }

    #[test]
    fn test_load_reads_info_dictionary() {
        assert!(load(&heading_pdf()).unwrap().metadata.title.is_none());

        let mut raw = lopdf::Document::load_mem(&heading_pdf()).unwrap();
        let info_id = raw.add_object(dictionary! {
            "Title" => Object::string_literal("Annual Report"),
            "Author" => Object::string_literal("Jane Doe"),
            "Creator" => Object::string_literal("Writer"),
        });
        raw.trailer.set("Info", info_id);
        let mut buf = Vec::new();
        raw.save_to(&mut buf).unwrap();

        let meta = load(&buf).unwrap().metadata;
        assert_eq!(meta.title.as_deref(), Some("Annual Report"));
        assert_eq!(meta.author.as_deref(), Some("Jane Doe"));
        assert_eq!(meta.creator.as_deref(), Some("Writer"));
        assert_eq!(meta.page_count, 1);
    }

    #[test]
    fn test_load_file_missing_is_io_error() {
        let err = load_file(std::path::Path::new("/nonexistent/file.pdf")).unwrap_err();
        assert!(matches!(err, PdfError::Io(_)));
    }
}
