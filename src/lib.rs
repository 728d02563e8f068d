pub mod classify;
pub mod keysearch;
pub mod treescan;
pub mod triage;

pub use classify::Verdict;
pub use keysearch::{KeySearch, RecoveredKey, xor_decrypt};
pub use treescan::{DepthLimit, ScanOptions};
pub use triage::{AsciiRun, ImageSummary, TrailingData, TriageError};
