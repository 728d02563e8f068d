//! Content-signature sniffing.
//!
//! Wraps the `infer` magic-byte matcher into a verdict type the rest of the
//! crate can reason about. A verdict is plausible unless the sniffer saw
//! nothing but unstructured bytes or the MIME string sits on a denylist.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use infer::MatcherType;

/// MIME strings that mean "unrecognized binary data". A decrypt attempt or a
/// scanned file landing on one of these is not treated as a known format.
pub const REJECT_MIMES: &[&str] = &["application/octet-stream", "data", "application/zlib"];

/// Bytes the sniffer gets to look at. Magic numbers live near the start of a
/// file; 8 KiB covers every matcher `infer` ships.
pub const SNIFF_LEN: usize = 8192;

/// Outcome of sniffing a byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Recognized { mime: &'static str, description: String },
    Unrecognized,
}

impl Verdict {
    /// The MIME type string, with unrecognized data reported as the generic
    /// octet-stream type.
    pub fn mime(&self) -> &str {
        match self {
            Verdict::Recognized { mime, .. } => mime,
            Verdict::Unrecognized => "application/octet-stream",
        }
    }

    /// Whether this verdict counts as a real file format. `reject` is the
    /// denylist of MIME strings standing for unstructured data.
    pub fn is_plausible(&self, reject: &[impl AsRef<str>]) -> bool {
        match self {
            Verdict::Recognized { mime, .. } => !reject.iter().any(|r| r.as_ref() == *mime),
            Verdict::Unrecognized => false,
        }
    }

    /// Human-readable `mime (description)` label for tree annotations.
    pub fn label(&self) -> String {
        match self {
            Verdict::Recognized { mime, description } => format!("{mime} ({description})"),
            Verdict::Unrecognized => "application/octet-stream (no signature match)".to_string(),
        }
    }
}

/// Sniff a byte buffer against the signature table.
pub fn sniff(buf: &[u8]) -> Verdict {
    match infer::get(buf) {
        Some(kind) => Verdict::Recognized {
            mime: kind.mime_type(),
            description: format!("{} data, {}", kind_name(kind.matcher_type()), kind.extension()),
        },
        None => Verdict::Unrecognized,
    }
}

/// Sniff a file on disk and return its display label.
///
/// Read failures degrade to an `Unknown (...)` sentinel string rather than an
/// error: classification is an annotation, never a reason to stop a scan.
pub fn describe_file(path: &Path) -> String {
    match read_prefix(path) {
        Ok(buf) => sniff(&buf).label(),
        Err(e) => format!("Unknown ({e})"),
    }
}

fn read_prefix(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut buf = vec![0u8; SNIFF_LEN];
    let mut filled = 0;
    loop {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
        if filled == buf.len() {
            break;
        }
    }
    buf.truncate(filled);
    Ok(buf)
}

fn kind_name(matcher: MatcherType) -> &'static str {
    match matcher {
        MatcherType::App => "application",
        MatcherType::Archive => "archive",
        MatcherType::Audio => "audio",
        MatcherType::Book => "book",
        MatcherType::Doc => "document",
        MatcherType::Font => "font",
        MatcherType::Image => "image",
        MatcherType::Text => "text",
        MatcherType::Video => "video",
        MatcherType::Custom => "custom",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpeg_magic_is_recognized() {
        let verdict = sniff(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]);
        assert_eq!(verdict.mime(), "image/jpeg");
        assert!(verdict.is_plausible(REJECT_MIMES));
    }

    #[test]
    fn png_magic_is_recognized() {
        let verdict = sniff(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00]);
        assert_eq!(verdict.mime(), "image/png");
    }

    #[test]
    fn junk_is_rejected() {
        let verdict = sniff(&[0x00, 0x01, 0x02, 0x03]);
        assert_eq!(verdict, Verdict::Unrecognized);
        assert!(!verdict.is_plausible(REJECT_MIMES));
        assert_eq!(verdict.mime(), "application/octet-stream");
    }

    #[test]
    fn denylisted_mime_is_not_plausible() {
        let verdict = Verdict::Recognized {
            mime: "application/zlib",
            description: "archive data, zz".to_string(),
        };
        assert!(!verdict.is_plausible(REJECT_MIMES));
        assert!(verdict.is_plausible(&["application/octet-stream"]));
    }

    #[test]
    fn label_includes_mime_and_description() {
        let verdict = sniff(&[0xFF, 0xD8, 0xFF, 0xDB]);
        let label = verdict.label();
        assert!(label.starts_with("image/jpeg ("), "got: {label}");
    }
}
