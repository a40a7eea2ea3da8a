use super::StoreError;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Every link ever accepted, held in memory and mirrored to an append-only
/// text file (one link per line).
///
/// This is the only place "seen" state lives. Nothing is ever removed from
/// either the set or the file.
#[derive(Debug)]
pub struct LinkStore {
    path: PathBuf,
    seen: HashSet<String>,
}

impl LinkStore {
    /// Loads the store at `path`.
    ///
    /// - Missing or empty file → empty store
    /// - Blank lines are ignored, surrounding whitespace trimmed
    /// - A line that is not valid UTF-8 is skipped with a warning
    ///
    /// # Errors
    ///
    /// [`StoreError::Read`] when the file exists but cannot be read at all.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No link store yet, starting empty");
                Vec::new()
            }
            Err(source) => return Err(StoreError::Read { path, source }),
        };

        let mut seen = HashSet::new();
        let mut skipped = 0usize;
        for (index, raw) in bytes.split(|b| *b == b'\n').enumerate() {
            match std::str::from_utf8(raw) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        seen.insert(line.to_string());
                    }
                }
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(
                        path = %path.display(),
                        line = index + 1,
                        error = %e,
                        "Skipping unreadable link store line"
                    );
                }
            }
        }

        tracing::info!(
            path = %path.display(),
            links = seen.len(),
            skipped,
            "Loaded link store"
        );
        Ok(Self { path, seen })
    }

    /// True if `link` has never been recorded.
    pub fn is_new(&self, link: &str) -> bool {
        !self.seen.contains(link)
    }

    /// Appends every link not yet recorded and makes it visible to
    /// [`is_new`](Self::is_new) immediately.
    ///
    /// Returns how many links were actually appended. Links already in the
    /// store (or repeated within `links`) are not written again.
    ///
    /// # Errors
    ///
    /// [`StoreError::Write`] if the file cannot be opened, written or
    /// flushed. On error the in-memory set is left unchanged.
    pub fn record_all<I, S>(&mut self, links: I) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut batch: Vec<String> = Vec::new();
        let mut batch_seen: HashSet<String> = HashSet::new();
        for link in links {
            let link = link.as_ref().trim();
            if link.is_empty() || !self.is_new(link) {
                continue;
            }
            if batch_seen.insert(link.to_string()) {
                batch.push(link.to_string());
            }
        }

        if batch.is_empty() {
            return Ok(0);
        }

        self.append_lines(&batch)
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;

        let count = batch.len();
        self.seen.extend(batch);
        tracing::debug!(path = %self.path.display(), appended = count, "Recorded links");
        Ok(count)
    }

    fn append_lines(&self, lines: &[String]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);
        for line in lines {
            writeln!(writer, "{line}")?;
        }
        writer.flush()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
