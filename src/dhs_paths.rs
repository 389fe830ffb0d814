//! DHS import path fixer
//!
//! DHS distributes Stata `.DO` and `.DCT` files whose first line embeds an
//! absolute path from the publisher's machine:
//!
//! - `.DO`:  `infix using "C:\...\FILE.DCT"`
//! - `.DCT`: `infix dictionary using "C:\...\FILE.DAT" {`
//!
//! [`fix_paths`] rewrites that token to the absolute path of the same-named
//! companion file next to it on the local filesystem.

use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use walkdir::WalkDir;

/// Path fixer error types
#[derive(Debug, Error)]
pub enum DhsPathError {
    #[error("Directory not found: {0}")]
    RootNotFound(PathBuf),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: first line has {found} space-separated tokens, need at least {needed}")]
    TooFewTokens {
        path: PathBuf,
        needed: usize,
        found: usize,
    },
}

/// Kind of DHS import file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFileKind {
    /// Stata do-file referencing a dictionary
    Do,
    /// Stata dictionary referencing a data file
    Dictionary,
}

impl ImportFileKind {
    /// Classify by file name (extensions are upper case in DHS bundles)
    pub fn from_file_name(name: &str) -> Option<Self> {
        if name.ends_with(".DO") {
            Some(ImportFileKind::Do)
        } else if name.ends_with(".DCT") {
            Some(ImportFileKind::Dictionary)
        } else {
            None
        }
    }

    /// Extension of the referenced companion file
    pub fn companion_extension(&self) -> &'static str {
        match self {
            ImportFileKind::Do => "DCT",
            ImportFileKind::Dictionary => "DAT",
        }
    }

    /// 0-based index of the path token in the first line
    pub fn path_token_index(&self) -> usize {
        match self {
            ImportFileKind::Do => 2,
            ImportFileKind::Dictionary => 3,
        }
    }
}

/// Files rewritten by [`fix_paths`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct FixReport {
    pub do_files: Vec<PathBuf>,
    pub dictionary_files: Vec<PathBuf>,
}

impl FixReport {
    /// Total number of rewritten files
    pub fn total(&self) -> usize {
        self.do_files.len() + self.dictionary_files.len()
    }
}

/// A planned rewrite of one import file
struct PendingRewrite {
    path: PathBuf,
    kind: ImportFileKind,
    content: String,
}

/// Rewrite the embedded companion path of every `.DO`/`.DCT` file under `root`
///
/// Every file is read and checked before any is written, so a malformed
/// first line anywhere leaves the whole tree untouched. Each file is then
/// replaced through a temporary file in its own directory.
pub fn fix_paths(root: &Path) -> Result<FixReport, DhsPathError> {
    if !root.is_dir() {
        return Err(DhsPathError::RootNotFound(root.to_path_buf()));
    }

    let mut entries: Vec<_> = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .collect::<Result<Vec<_>, walkdir::Error>>()?;
    entries.retain(|e| e.file_type().is_file());

    let mut pending = Vec::new();
    for entry in entries {
        let name = entry.file_name().to_string_lossy();
        let Some(kind) = ImportFileKind::from_file_name(&name) else {
            continue;
        };

        let full_path = std::path::absolute(entry.path()).map_err(|source| DhsPathError::Io {
            path: entry.path().to_path_buf(),
            source,
        })?;
        pending.push(plan_rewrite(full_path, kind)?);
    }

    let mut report = FixReport::default();
    for rewrite in pending {
        replace_file(&rewrite.path, &rewrite.content)?;
        tracing::debug!(file = %rewrite.path.display(), "fixed path");

        match rewrite.kind {
            ImportFileKind::Do => report.do_files.push(rewrite.path),
            ImportFileKind::Dictionary => report.dictionary_files.push(rewrite.path),
        }
    }

    Ok(report)
}

fn plan_rewrite(path: PathBuf, kind: ImportFileKind) -> Result<PendingRewrite, DhsPathError> {
    let content = std::fs::read_to_string(&path).map_err(|source| DhsPathError::Io {
        path: path.clone(),
        source,
    })?;
    let companion = path.with_extension(kind.companion_extension());
    let Some(rewritten) = rewrite_first_line(&content, kind.path_token_index(), &companion) else {
        return Err(DhsPathError::TooFewTokens {
            needed: kind.path_token_index() + 1,
            found: first_line(&content).0.split(' ').count(),
            path,
        });
    };
    Ok(PendingRewrite {
        path,
        kind,
        content: rewritten,
    })
}

fn replace_file(path: &Path, content: &str) -> Result<(), DhsPathError> {
    let io_err = |source| DhsPathError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(content.as_bytes()).map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// Split off the first line and its terminator (`\n` or `\r\n`)
fn first_line(content: &str) -> (&str, &str) {
    let end = content.find('\n').unwrap_or(content.len());
    let line_end = if content[..end].ends_with('\r') {
        end - 1
    } else {
        end
    };
    (&content[..line_end], &content[line_end..])
}

/// Replace token `index` of the first line with the quoted `companion` path
///
/// Tokens are separated by single spaces; all other bytes are preserved.
/// Returns `None` when the first line has too few tokens.
pub fn rewrite_first_line(content: &str, index: usize, companion: &Path) -> Option<String> {
    let (line, rest) = first_line(content);
    let mut tokens: Vec<String> = line.split(' ').map(str::to_string).collect();
    let slot = tokens.get_mut(index)?;
    *slot = format!("\"{}\"", companion.display());
    Some(format!("{}{}", tokens.join(" "), rest))
}
