//! Content-type resolution for Restore uploads.
//!
//! Precedence is a hard contract, not a suggestion: saved metadata beats a
//! magic-number sniff of the file's leading bytes, which beats a filename
//! extension lookup, which falls back to `application/octet-stream`.

use std::path::Path;

const FALLBACK: &str = "application/octet-stream";

/// A handful of common magic numbers, checked before falling back to the
/// filename extension. Deliberately small: this only needs to catch the
/// common binary formats that extension-based guessing gets wrong or that
/// might arrive with a misleading/missing extension.
const MAGIC_NUMBERS: &[(&[u8], &str)] = &[
    (b"%PDF-", "application/pdf"),
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b", "application/gzip"),
    (b"BEGIN:VCALENDAR", "text/calendar"),
    (b"BEGIN:VCARD", "text/vcard"),
    (b"<?xml", "application/xml"),
];

/// Resolves the content type to send with a Restore PUT.
///
/// `metadata_content_type` is the saved `Content-Type` from the folder
/// description, if any. `leading_bytes` is a prefix of the file (the sniff
/// table above needs at most 16 bytes). `filename` is used for the
/// extension fallback.
pub fn resolve(
    metadata_content_type: Option<&str>,
    leading_bytes: &[u8],
    filename: &Path,
) -> String {
    if let Some(content_type) = metadata_content_type {
        if !content_type.is_empty() {
            return content_type.to_string();
        }
    }

    if let Some(sniffed) = sniff(leading_bytes) {
        return sniffed.to_string();
    }

    mime_guess::from_path(filename)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| FALLBACK.to_string())
}

fn sniff(leading_bytes: &[u8]) -> Option<&'static str> {
    MAGIC_NUMBERS
        .iter()
        .find(|(signature, _)| leading_bytes.starts_with(signature))
        .map(|(_, mime)| *mime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_content_type_wins_over_everything() {
        let resolved = resolve(Some("application/x-custom"), b"%PDF-1.4", Path::new("a.pdf"));
        assert_eq!(resolved, "application/x-custom");
    }

    #[test]
    fn empty_metadata_content_type_is_treated_as_absent() {
        let resolved = resolve(Some(""), b"%PDF-1.4", Path::new("a.pdf"));
        assert_eq!(resolved, "application/pdf");
    }

    #[test]
    fn magic_number_wins_over_extension() {
        // .txt extension but PNG magic bytes: sniff should win.
        let resolved = resolve(None, b"\x89PNG\r\n\x1a\n...", Path::new("a.txt"));
        assert_eq!(resolved, "image/png");
    }

    #[test]
    fn extension_used_when_no_metadata_or_sniff_match() {
        let resolved = resolve(None, b"plain text content", Path::new("sample.ics"));
        assert_eq!(resolved, "text/calendar");
    }

    #[test]
    fn falls_back_to_octet_stream() {
        let resolved = resolve(None, b"\x00\x01\x02", Path::new("noextension"));
        assert_eq!(resolved, FALLBACK);
    }
}
