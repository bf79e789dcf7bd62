use super::*;
use lopdf::content::{Content, Operation};
use lopdf::{Object, Stream, dictionary};
use std::fs;
use tempfile::TempDir;

/// Write a minimal PDF with one page per entry of `pages`
pub(crate) fn write_test_pdf(path: &Path, pages: &[&str]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for text in pages {
        let operations = if text.is_empty() {
            Vec::new()
        } else {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("content should encode"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("test PDF should save");
}

#[test]
fn load_pages_in_order() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("two_pages.pdf");
    write_test_pdf(
        &path,
        &[
            "The sky is blue. The grass is green.",
            "Water boils at 100 degrees.",
        ],
    );

    let pages = load_pdf(&path).expect("PDF should load");

    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].page_number, 0);
    assert_eq!(pages[1].page_number, 1);
    assert!(pages[0].text.contains("The sky is blue."));
    assert!(pages[1].text.contains("Water boils"));
    assert!(
        pages
            .iter()
            .all(|p| p.source_path == path.to_string_lossy())
    );
}

#[test]
fn blank_page_yields_empty_record() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("blank.pdf");
    write_test_pdf(&path, &["First page", ""]);

    let pages = load_pdf(&path).expect("PDF should load");

    assert_eq!(pages.len(), 2);
    assert!(pages[1].text.trim().is_empty());
}

#[test]
fn missing_file_is_not_found() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("nonexistent.pdf");

    let err = load_pdf(&path).expect_err("missing file must fail");

    assert!(matches!(err, RagError::FileNotFound { .. }));
    assert!(err.to_string().contains("nonexistent.pdf"));
}

#[test]
fn garbage_file_is_parse_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("not_a.pdf");
    fs::write(&path, "this is plain text, not a PDF").expect("should write file");

    let err = PdfLoader.load(&path).expect_err("non-PDF must fail");

    assert!(matches!(err, RagError::Parse { .. }));
}
