//! Append-only record of links that have already been announced.
//!
//! The store is a single-column CSV file: one link per row, no header. Rows
//! are never rewritten or pruned. Every check re-reads the whole file so the
//! file on disk stays the only source of truth across restarts.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, WatchError};

/// File-backed set of announced post links.
#[derive(Debug, Clone)]
pub struct DedupStore {
    path: PathBuf,
}

impl DedupStore {
    /// Open an existing store file.
    ///
    /// The file must already exist; a missing store usually means a
    /// misconfigured volume, and silently starting empty would re-announce
    /// every post on the homepage.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let metadata = std::fs::metadata(&path).map_err(|e| WatchError::storage(&path, e))?;
        if !metadata.is_file() {
            return Err(WatchError::storage(
                &path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }
        Ok(Self { path })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check whether a link has been recorded.
    pub fn contains(&self, link: &str) -> Result<bool> {
        let content = self.read()?;
        Ok(parse_rows(&content)
            .iter()
            .any(|row| row.iter().any(|cell| cell == link)))
    }

    /// Append a link as a new row.
    pub fn record(&self, link: &str) -> Result<()> {
        let needs_newline = {
            let content = self.read()?;
            !content.is_empty() && !content.ends_with('\n')
        };

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| WatchError::storage(&self.path, e))?;

        let mut row = String::new();
        if needs_newline {
            row.push_str("\r\n");
        }
        row.push_str(&encode_field(link));
        row.push_str("\r\n");

        file.write_all(row.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| WatchError::storage(&self.path, e))?;

        tracing::debug!(link, path = %self.path.display(), "Recorded link");
        Ok(())
    }

    /// Return `true` if the link was already recorded; otherwise record it
    /// and return `false`.
    pub fn check_and_record(&self, link: &str) -> Result<bool> {
        if self.contains(link)? {
            return Ok(true);
        }
        self.record(link)?;
        Ok(false)
    }

    /// Number of recorded rows.
    pub fn len(&self) -> Result<usize> {
        Ok(parse_rows(&self.read()?).len())
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> Result<String> {
        std::fs::read_to_string(&self.path).map_err(|e| WatchError::storage(&self.path, e))
    }
}

/// Quote a field if it is empty or contains a delimiter, quote or line break.
///
/// An empty value is written as `""` so its row is not read back as a blank
/// line.
fn encode_field(value: &str) -> String {
    if value.is_empty() || value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Split CSV content into rows of unquoted cells. Blank lines are skipped,
/// a row holding a single quoted empty field (`""`) is kept.
fn parse_rows(content: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => {
                in_quotes = true;
                quoted = true;
            }
            ',' => {
                row.push(std::mem::take(&mut field));
                quoted = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\r' | '\n' => {
                row.push(std::mem::take(&mut field));
                finish_row(&mut rows, &mut row, quoted);
                quoted = false;
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !row.is_empty() || quoted {
        row.push(field);
        finish_row(&mut rows, &mut row, quoted);
    }

    rows
}

fn finish_row(rows: &mut Vec<Vec<String>>, row: &mut Vec<String>, quoted: bool) {
    let row = std::mem::take(row);
    if quoted || !(row.len() == 1 && row[0].is_empty()) {
        rows.push(row);
    }
}
