use super::StoreError;
use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Snapshot file name: month, day, hour, minute (e.g. `09030110.txt`).
const SNAPSHOT_NAME_FORMAT: &str = "%m%d%H%M.txt";
const HEADER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Path of the snapshot file for a cycle saved at `at`.
pub fn snapshot_path(dir: &Path, at: &DateTime<Local>) -> PathBuf {
    dir.join(at.format(SNAPSHOT_NAME_FORMAT).to_string())
}

/// Writes this cycle's new links to a timestamp-named file in `dir`.
///
/// Two cycles saved within the same minute share a file name; the second
/// section is appended after the first instead of replacing it.
pub fn write_snapshot<S: AsRef<str>>(
    dir: &Path,
    at: &DateTime<Local>,
    links: &[S],
) -> Result<PathBuf, StoreError> {
    let path = snapshot_path(dir, at);

    let write = || -> std::io::Result<()> {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut w = BufWriter::new(file);
        writeln!(w, "===== Crawl time: {} =====", at.format(HEADER_TIME_FORMAT))?;
        writeln!(w, "===== New links: {} =====", links.len())?;
        writeln!(w)?;
        for link in links {
            writeln!(w, "{}", link.as_ref())?;
        }
        w.flush()
    };

    write().map_err(|source| StoreError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Appends one timestamped section listing the failed sources to the
/// persistent failure log. The log is never truncated.
pub fn append_failure_log<S: AsRef<str>>(
    path: &Path,
    at: &DateTime<Local>,
    sources: &[S],
) -> Result<(), StoreError> {
    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut w = BufWriter::new(file);
        writeln!(w)?;
        writeln!(
            w,
            "========== Crawl time: {} ==========",
            at.format(HEADER_TIME_FORMAT)
        )?;
        writeln!(w, "Failed feeds this cycle: {}", sources.len())?;
        for source in sources {
            writeln!(w, "{}", source.as_ref())?;
        }
        w.flush()
    };

    write().map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}
