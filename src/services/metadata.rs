//! Best-effort metadata extraction from accepted payloads.
//!
//! Digests are always computed from the exact bytes written. Format-specific
//! parsing (image dimensions, EXIF tags, PDF document info) is enrichment
//! only: it runs on already-accepted, size-bounded bytes and a parse failure
//! degrades to "no extra fields" rather than failing the upload.

use std::collections::BTreeMap;
use std::io::Cursor;

use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::{
    models::metadata::FileMetadataDetail,
    services::content_type::extension_of,
    storage::humanize_bytes,
};

/// Optional fields a format parser may contribute.
#[derive(Debug, Default)]
struct ExtraFields {
    image_width: Option<u32>,
    image_height: Option<u32>,
    exif: Option<BTreeMap<String, String>>,
    pdf_pages: Option<usize>,
    pdf_author: Option<String>,
    pdf_title: Option<String>,
}

type FormatParser = fn(&[u8]) -> Option<ExtraFields>;

/// Pick the parser for a declared content type. No parser and a failed
/// parser are the same thing to the caller: no extra fields.
fn parser_for(content_type: &str) -> Option<FormatParser> {
    if content_type.starts_with("image/") {
        Some(parse_image)
    } else if content_type == "application/pdf" {
        Some(parse_pdf)
    } else {
        None
    }
}

/// Compute metadata for an accepted payload. Total: never fails, whatever
/// the bytes look like. Format parsers run behind a panic boundary since
/// they chew on hostile input.
pub fn extract_metadata(data: &[u8], filename: &str, content_type: &str) -> FileMetadataDetail {
    let extra = parser_for(content_type)
        .and_then(|parse| {
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| parse(data)))
                .ok()
                .flatten()
        })
        .unwrap_or_default();

    detail_with_extra(data, filename, content_type, extra)
}

/// Digests-only variant, used when the extraction task itself could not
/// run. Skips all format parsers.
pub fn extract_metadata_basic(
    data: &[u8],
    filename: &str,
    content_type: &str,
) -> FileMetadataDetail {
    detail_with_extra(data, filename, content_type, ExtraFields::default())
}

fn detail_with_extra(
    data: &[u8],
    filename: &str,
    content_type: &str,
    extra: ExtraFields,
) -> FileMetadataDetail {
    FileMetadataDetail {
        filename: filename.to_string(),
        size_bytes: data.len() as i64,
        size_human: humanize_bytes(data.len() as i64),
        mime_type: content_type.to_string(),
        extension: extension_of(filename),
        md5: format!("{:x}", md5::compute(data)),
        sha256: hex::encode(Sha256::digest(data)),
        uploaded_at: Utc::now(),
        image_width: extra.image_width,
        image_height: extra.image_height,
        exif: extra.exif,
        pdf_pages: extra.pdf_pages,
        pdf_author: extra.pdf_author,
        pdf_title: extra.pdf_title,
    }
}

/// Decode image dimensions and any EXIF tags. EXIF absence is normal and
/// does not discard the dimensions.
fn parse_image(data: &[u8]) -> Option<ExtraFields> {
    let reader = image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?;
    let (width, height) = reader.into_dimensions().ok()?;

    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(data))
        .ok()
        .map(|exif| {
            exif.fields()
                .map(|field| {
                    (
                        field.tag.to_string(),
                        field.display_value().with_unit(&exif).to_string(),
                    )
                })
                .collect::<BTreeMap<_, _>>()
        })
        .filter(|tags| !tags.is_empty());

    Some(ExtraFields {
        image_width: Some(width),
        image_height: Some(height),
        exif,
        ..ExtraFields::default()
    })
}

/// Parse page count and document info from a PDF.
fn parse_pdf(data: &[u8]) -> Option<ExtraFields> {
    let doc = lopdf::Document::load_mem(data).ok()?;
    let pages = doc.get_pages().len();

    let info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| obj.as_reference().ok())
        .and_then(|id| doc.get_object(id).ok())
        .and_then(|obj| obj.as_dict().ok());

    let text_entry = |name: &[u8]| -> Option<String> {
        let lopdf::Object::String(bytes, _) = info?.get(name).ok()? else {
            return None;
        };
        let text = String::from_utf8_lossy(bytes).trim().to_string();
        (!text.is_empty()).then_some(text)
    };

    Some(ExtraFields {
        pdf_pages: Some(pages),
        pdf_author: text_entry(b"Author"),
        pdf_title: text_entry(b"Title"),
        ..ExtraFields::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;
    use lopdf::{Document, Object, Stream, dictionary};

    #[test]
    fn digests_match_known_values() {
        let detail = extract_metadata(b"hello", "report.txt", "text/plain");
        assert_eq!(detail.md5, "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(
            detail.sha256,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(detail.size_bytes, 5);
        assert_eq!(detail.extension, "txt");
        assert_eq!(detail.mime_type, "text/plain");
    }

    #[test]
    fn plain_types_carry_no_extra_fields() {
        let detail = extract_metadata(b"a,b,c", "data.csv", "text/csv");
        assert!(detail.image_width.is_none());
        assert!(detail.pdf_pages.is_none());
    }

    #[test]
    fn image_dimensions_are_extracted() {
        let mut buf = Cursor::new(Vec::new());
        image::RgbaImage::new(3, 2)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        let detail = extract_metadata(buf.get_ref(), "pixel.png", "image/png");
        assert_eq!(detail.image_width, Some(3));
        assert_eq!(detail.image_height, Some(2));
    }

    #[test]
    fn corrupted_image_degrades_silently() {
        let detail = extract_metadata(b"\x89PNG\r\n\x1a\nGARBAGE", "bad.png", "image/png");
        assert!(detail.image_width.is_none());
        assert!(detail.image_height.is_none());
        assert!(detail.exif.is_none());
        // Digests are still present.
        assert_eq!(detail.sha256.len(), 64);
    }

    #[test]
    fn pdf_pages_and_info_are_extracted() {
        let data = sample_pdf();
        let detail = extract_metadata(&data, "report.pdf", "application/pdf");
        assert_eq!(detail.pdf_pages, Some(1));
        assert_eq!(detail.pdf_title.as_deref(), Some("Quarterly Report"));
        assert_eq!(detail.pdf_author.as_deref(), Some("Ada"));
    }

    #[test]
    fn truncated_pdf_degrades_silently() {
        let detail = extract_metadata(b"%PDF-1.4\ngarbage", "bad.pdf", "application/pdf");
        assert!(detail.pdf_pages.is_none());
        assert!(detail.pdf_author.is_none());
    }

    fn sample_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
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
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal("Quarterly Report"),
            "Author" => Object::string_literal("Ada"),
        });
        doc.trailer.set("Info", info_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }
}
