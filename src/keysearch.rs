//! Two-byte XOR key recovery.
//!
//! Sweeps the full 256x256 key space against an encrypted blob, keeps every
//! key whose decryption sniffs as a known file format, and writes the
//! plaintext candidates out under key-derived names.

use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::classify::{self, REJECT_MIMES, SNIFF_LEN};

/// Size of the full two-byte key space.
pub const KEY_SPACE: usize = 256 * 256;

/// Decrypt `data` against a repeating two-byte key.
pub fn xor_decrypt(data: &[u8], key: (u8, u8)) -> Vec<u8> {
    data.iter()
        .enumerate()
        .map(|(i, &b)| b ^ if i % 2 == 0 { key.0 } else { key.1 })
        .collect()
}

/// Digit-containment constraint on candidate keys: at least one key byte must
/// be an ASCII decimal digit. Models keys derived from numeric input such as
/// a PIN.
pub fn contains_digit_byte(key: (u8, u8)) -> bool {
    key.0.is_ascii_digit() || key.1.is_ascii_digit()
}

/// A key that produced a plausible plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredKey {
    pub key: (u8, u8),
    pub mime: String,
    pub path: PathBuf,
}

/// Configuration for one brute-force run.
#[derive(Debug, Clone)]
pub struct KeySearch {
    blob_path: PathBuf,
    output_dir: PathBuf,
    require_digit: bool,
    reject_mimes: Vec<String>,
}

impl KeySearch {
    pub fn new(blob_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            blob_path: blob_path.into(),
            output_dir: output_dir.into(),
            require_digit: true,
            reject_mimes: REJECT_MIMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Toggle the digit-containment filter. Off means the sweep covers the
    /// entire key space.
    pub fn with_digit_filter(mut self, require_digit: bool) -> Self {
        self.require_digit = require_digit;
        self
    }

    /// Replace the MIME denylist used to reject decrypt attempts.
    pub fn with_reject_mimes(mut self, mimes: Vec<String>) -> Self {
        self.reject_mimes = mimes;
        self
    }

    /// Number of candidate keys this configuration will try.
    pub fn candidate_count(&self) -> usize {
        if self.require_digit {
            // 246 non-digit values per byte; pairs with neither byte a digit
            // are skipped
            KEY_SPACE - 246 * 246
        } else {
            KEY_SPACE
        }
    }

    /// Run the sweep.
    ///
    /// Blob read and output-directory creation failures are fatal; everything
    /// already written stays on disk. Existing candidate files are silently
    /// overwritten, so re-runs are safe. `progress` is called once per
    /// completed first-byte stripe with `(done, 256)`.
    ///
    /// Results come back sorted by `(k1, k2)` regardless of which worker
    /// found them.
    pub fn run(
        &self,
        progress: Option<&(dyn Fn(usize, usize) + Sync)>,
    ) -> io::Result<Vec<RecoveredKey>> {
        let data = fs::read(&self.blob_path)?;
        fs::create_dir_all(&self.output_dir)?;

        let done = AtomicUsize::new(0);
        let stripes: Vec<Vec<RecoveredKey>> = (0u16..256)
            .into_par_iter()
            .map(|k1| {
                let found = self.sweep_stripe(k1 as u8, &data);
                if let Some(cb) = progress {
                    cb(done.fetch_add(1, Ordering::Relaxed) + 1, 256);
                }
                found
            })
            .collect::<io::Result<Vec<_>>>()?;

        let mut found: Vec<RecoveredKey> = stripes.into_iter().flatten().collect();
        found.sort_by_key(|r| r.key);
        Ok(found)
    }

    /// Try all 256 keys sharing the first byte `k1`.
    fn sweep_stripe(&self, k1: u8, data: &[u8]) -> io::Result<Vec<RecoveredKey>> {
        let mut found = Vec::new();
        let probe_len = data.len().min(SNIFF_LEN);

        for k2 in 0..=255u8 {
            let key = (k1, k2);
            if self.require_digit && !contains_digit_byte(key) {
                continue;
            }

            // Magic numbers sit at the front, so only a prefix is decrypted
            // until the verdict says the key is worth keeping.
            let probe = xor_decrypt(&data[..probe_len], key);
            let verdict = classify::sniff(&probe);
            if !verdict.is_plausible(&self.reject_mimes) {
                continue;
            }

            let plaintext = xor_decrypt(data, key);
            let path = self.output_path(key);
            fs::write(&path, &plaintext)?;
            tracing::debug!(
                "key ({:#04x},{:#04x}) decrypts to {}",
                key.0,
                key.1,
                verdict.mime()
            );
            found.push(RecoveredKey {
                key,
                mime: verdict.mime().to_string(),
                path,
            });
        }
        Ok(found)
    }

    fn output_path(&self, key: (u8, u8)) -> PathBuf {
        self.output_dir
            .join(format!("recovered_{:02x}_{:02x}.bin", key.0, key.1))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}
