//! Archive-aware directory tree scanner.
//!
//! Walks a subtree in lexicographic order, annotates every file with its
//! sniffed content type, and renders the result as prefix-drawn tree lines.
//! ZIP archives can be expanded into an ephemeral workspace so their members
//! show up as children of the archive's own line.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use zip::ZipArchive;

use crate::classify;

/// ZIP-based office containers are labelled but never expanded.
pub const OFFICE_EXTENSIONS: &[&str] = &["docx", "pptx", "xlsx"];

const BRANCH_MID: &str = "├─";
const BRANCH_LAST: &str = "└─";
const CONTINUE_BAR: &str = "│  ";
const CONTINUE_GAP: &str = "   ";

/// How far below the root the scan may descend. `Levels(0)` lists the root's
/// entries without entering any subdirectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthLimit {
    Unbounded,
    Levels(usize),
}

impl DepthLimit {
    fn exceeded(&self, depth: usize) -> bool {
        match self {
            DepthLimit::Unbounded => false,
            DepthLimit::Levels(max) => depth > *max,
        }
    }
}

impl FromStr for DepthLimit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "max" {
            return Ok(DepthLimit::Unbounded);
        }
        s.parse::<usize>()
            .map(DepthLimit::Levels)
            .map_err(|_| format!("expected 'max' or a non-negative integer, got '{s}'"))
    }
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub max_depth: DepthLimit,
    pub expand_archives: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_depth: DepthLimit::Levels(1),
            expand_archives: false,
        }
    }
}

/// Scan `root` and return the rendered tree lines in pre-order.
///
/// Permission failures on a directory listing degrade to a placeholder line;
/// other I/O failures propagate.
pub fn scan_tree(root: &Path, opts: &ScanOptions) -> io::Result<Vec<String>> {
    scan_dir(root, opts, 0, "", true)
}

fn scan_dir(
    path: &Path,
    opts: &ScanOptions,
    depth: usize,
    prefix: &str,
    is_last: bool,
) -> io::Result<Vec<String>> {
    if opts.max_depth.exceeded(depth) {
        return Ok(Vec::new());
    }

    let mut entries: Vec<PathBuf> = match fs::read_dir(path) {
        Ok(read) => read
            .collect::<io::Result<Vec<_>>>()?
            .into_iter()
            .map(|e| e.path())
            .collect(),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            let connector = if is_last { BRANCH_LAST } else { BRANCH_MID };
            return Ok(vec![tree_line(prefix, connector, "[Permission Denied]")]);
        }
        Err(e) => return Err(e),
    };
    entries.sort_by_key(|p| p.file_name().map(|n| n.to_owned()));

    let mut lines = Vec::new();
    let last_index = entries.len().saturating_sub(1);

    for (index, full_path) in entries.iter().enumerate() {
        let last_entry = index == last_index;
        let connector = if last_entry { BRANCH_LAST } else { BRANCH_MID };
        let child_prefix = format!(
            "{prefix}{}",
            if last_entry { CONTINUE_GAP } else { CONTINUE_BAR }
        );
        let name = full_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if full_path.is_dir() {
            lines.push(tree_line(prefix, connector, &format!("📁 {name}/")));
            lines.extend(scan_dir(full_path, opts, depth + 1, &child_prefix, last_entry)?);
        } else if full_path.is_file() {
            if opts.expand_archives && is_zip(full_path) {
                if has_office_extension(full_path) {
                    lines.push(tree_line(
                        prefix,
                        connector,
                        &format!("📦 {name} — Office ZIP archive"),
                    ));
                } else {
                    lines.push(tree_line(prefix, connector, &format!("📦 {name} — ZIP archive")));
                    match expand_archive(full_path, &child_prefix) {
                        Ok(children) => lines.extend(children),
                        Err(e) => {
                            tracing::warn!("could not expand {}: {e}", full_path.display());
                        }
                    }
                }
            } else {
                let label = classify::describe_file(full_path);
                lines.push(tree_line(prefix, connector, &format!("📄 {name} — {label}")));
            }
        } else {
            lines.push(tree_line(prefix, connector, &format!("❓ {name}")));
        }
    }

    Ok(lines)
}

/// Unpack a ZIP into a temporary workspace and render one child line per
/// extracted regular file, in member-name order. The workspace is removed
/// when this returns, error paths included.
fn expand_archive(path: &Path, prefix: &str) -> io::Result<Vec<String>> {
    let workspace = tempfile::tempdir()?;
    let mut archive = ZipArchive::new(File::open(path)?).map_err(io::Error::other)?;

    let mut names: Vec<String> = archive.file_names().map(str::to_owned).collect();
    names.sort();
    archive.extract(workspace.path()).map_err(io::Error::other)?;

    // Directory entries and anything the extractor refused to place are
    // skipped; connectors are computed over what is left.
    let members: Vec<(String, PathBuf)> = names
        .into_iter()
        .filter_map(|name| {
            let extracted = workspace.path().join(&name);
            extracted.is_file().then_some((name, extracted))
        })
        .collect();

    let mut lines = Vec::with_capacity(members.len());
    let last_index = members.len().saturating_sub(1);
    for (index, (name, extracted)) in members.iter().enumerate() {
        let connector = if index == last_index { BRANCH_LAST } else { BRANCH_MID };
        let label = classify::describe_file(extracted);
        lines.push(tree_line(prefix, connector, &format!("📄 {name} — {label}")));
    }
    Ok(lines)
}

/// Write the report to `path`, newline-joined. Returns `Ok(false)` without
/// touching the filesystem when the path does not end in `.txt`.
pub fn write_report(lines: &[String], path: &Path) -> io::Result<bool> {
    if path.extension().and_then(|e| e.to_str()) != Some("txt") {
        return Ok(false);
    }
    fs::write(path, lines.join("\n"))?;
    Ok(true)
}

fn tree_line(prefix: &str, connector: &str, label: &str) -> String {
    format!("{prefix}{connector} {label}")
}

/// Cheap ZIP container check: local-file-header or empty-archive EOCD magic.
fn is_zip(path: &Path) -> bool {
    let mut magic = [0u8; 4];
    match File::open(path).and_then(|mut f| f.read_exact(&mut magic)) {
        Ok(()) => matches!(&magic, b"PK\x03\x04" | b"PK\x05\x06"),
        Err(_) => false,
    }
}

fn has_office_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            OFFICE_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_limit_parses_max_and_integers() {
        assert_eq!("max".parse::<DepthLimit>().unwrap(), DepthLimit::Unbounded);
        assert_eq!("0".parse::<DepthLimit>().unwrap(), DepthLimit::Levels(0));
        assert_eq!("7".parse::<DepthLimit>().unwrap(), DepthLimit::Levels(7));
        assert!("deep".parse::<DepthLimit>().is_err());
        assert!("-1".parse::<DepthLimit>().is_err());
    }

    #[test]
    fn depth_limit_enforcement() {
        assert!(!DepthLimit::Unbounded.exceeded(1_000_000));
        assert!(!DepthLimit::Levels(1).exceeded(1));
        assert!(DepthLimit::Levels(1).exceeded(2));
        assert!(DepthLimit::Levels(0).exceeded(1));
    }

    #[test]
    fn office_extension_is_case_insensitive() {
        assert!(has_office_extension(Path::new("report.DOCX")));
        assert!(has_office_extension(Path::new("deck.pptx")));
        assert!(!has_office_extension(Path::new("bundle.zip")));
        assert!(!has_office_extension(Path::new("noext")));
    }
}
