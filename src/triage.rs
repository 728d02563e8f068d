//! Single-file diagnostic passes used before a key search: image metadata,
//! embedded printable strings, and trailing data hidden after a BMP payload.
//!
//! The passes are independent and stateless. Each returns a `Result` so the
//! caller decides whether a failure is worth more than a log line.

use std::io;
use std::path::Path;

use image::{ColorType, ImageFormat, ImageReader};
use thiserror::Error;

/// Default minimum length for a printable run to count as a string.
pub const DEFAULT_MIN_RUN: usize = 5;

/// Bytes of trailing data shown in the hex preview.
pub const TRAILING_PREVIEW_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("not a BMP file (missing BM magic)")]
    NotBmp,

    #[error("file too short for a BMP header: {0} bytes")]
    Truncated(usize),
}

/// What the image decoder could tell us about a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSummary {
    pub format: Option<ImageFormat>,
    pub width: u32,
    pub height: u32,
    pub color: ColorType,
}

/// Decode an image far enough to report its container format, dimensions and
/// pixel layout. Undecodable input is an error the caller logs and skips.
pub fn inspect_image(path: &Path) -> Result<ImageSummary, TriageError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = reader.format();
    let img = reader.decode()?;
    Ok(ImageSummary {
        format,
        width: img.width(),
        height: img.height(),
        color: img.color(),
    })
}

/// One maximal run of printable ASCII found in a byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiRun {
    pub offset: usize,
    pub text: String,
}

/// Extract maximal runs of printable ASCII (bytes 32..=126) of at least
/// `min_len` bytes, in file order.
pub fn ascii_runs(data: &[u8], min_len: usize) -> Vec<AsciiRun> {
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;

    for (i, &b) in data.iter().enumerate() {
        let printable = (32..=126).contains(&b);
        match (printable, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                push_run(data, s, i, min_len, &mut runs);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        push_run(data, s, data.len(), min_len, &mut runs);
    }
    runs
}

fn push_run(data: &[u8], start: usize, end: usize, min_len: usize, runs: &mut Vec<AsciiRun>) {
    if end - start >= min_len {
        runs.push(AsciiRun {
            offset: start,
            text: String::from_utf8_lossy(&data[start..end]).into_owned(),
        });
    }
}

/// Bytes found past the end a BMP header declares for its file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailingData {
    pub declared: u32,
    pub actual: usize,
    pub preview: Vec<u8>,
}

impl TrailingData {
    pub fn extra(&self) -> usize {
        self.actual - self.declared as usize
    }
}

/// Compare a BMP's declared file size (little-endian u32 at offset 2) against
/// the real length. `Ok(None)` means nothing is appended.
pub fn bmp_trailing(data: &[u8]) -> Result<Option<TrailingData>, TriageError> {
    if data.len() < 6 {
        return Err(TriageError::Truncated(data.len()));
    }
    if &data[..2] != b"BM" {
        return Err(TriageError::NotBmp);
    }

    let declared = u32::from_le_bytes([data[2], data[3], data[4], data[5]]);
    let actual = data.len();
    if actual <= declared as usize {
        return Ok(None);
    }

    let start = declared as usize;
    let end = (start + TRAILING_PREVIEW_LEN).min(actual);
    Ok(Some(TrailingData {
        declared,
        actual,
        preview: data[start..end].to_vec(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_below_threshold_are_dropped() {
        let data = b"ab\x00hello\x00hi\x00worlds";
        let runs = ascii_runs(data, 5);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].text, "hello");
        assert_eq!(runs[0].offset, 3);
        assert_eq!(runs[1].text, "worlds");
    }

    #[test]
    fn run_at_end_of_buffer_is_flushed() {
        let runs = ascii_runs(b"\x01\x02trailing", 5);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].offset, 2);
        assert_eq!(runs[0].text, "trailing");
    }

    #[test]
    fn all_printable_buffer_is_one_run() {
        let runs = ascii_runs(b"just text here", 5);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].offset, 0);
    }

    fn bmp_with_declared(declared: u32, total: usize) -> Vec<u8> {
        let mut data = vec![0u8; total];
        data[0] = b'B';
        data[1] = b'M';
        data[2..6].copy_from_slice(&declared.to_le_bytes());
        for (i, b) in data.iter_mut().enumerate().skip(6) {
            *b = (i % 251) as u8;
        }
        data
    }

    #[test]
    fn trailing_bytes_are_detected() {
        let data = bmp_with_declared(64, 160);
        let trailing = bmp_trailing(&data).unwrap().expect("should find extra");
        assert_eq!(trailing.extra(), 96);
        assert_eq!(trailing.preview.len(), TRAILING_PREVIEW_LEN);
        assert_eq!(trailing.preview[0], data[64]);
    }

    #[test]
    fn exact_size_has_no_trailing() {
        let data = bmp_with_declared(96, 96);
        assert_eq!(bmp_trailing(&data).unwrap(), None);
    }

    #[test]
    fn short_preview_is_clamped() {
        let data = bmp_with_declared(90, 100);
        let trailing = bmp_trailing(&data).unwrap().unwrap();
        assert_eq!(trailing.extra(), 10);
        assert_eq!(trailing.preview.len(), 10);
    }

    #[test]
    fn non_bmp_is_an_error() {
        assert!(matches!(
            bmp_trailing(b"GIF89a trailer"),
            Err(TriageError::NotBmp)
        ));
        assert!(matches!(
            bmp_trailing(b"BM"),
            Err(TriageError::Truncated(2))
        ));
    }
}
