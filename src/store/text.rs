//! Text file primitives and the configured store

use crate::config::PathsConfig;
use crate::error::Result;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Read a whole file, or an empty string if it does not exist.
pub async fn load_text(path: &Path) -> Result<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

/// Append `content` and a newline, creating the file if absent.
pub async fn append_line(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;

    let mut line = String::with_capacity(content.len() + 1);
    line.push_str(content);
    line.push('\n');
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

/// Create or overwrite `directory/filename` with exactly `body`.
pub async fn write_note(directory: &Path, filename: &str, body: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(directory).await?;
    let path = directory.join(filename);
    tokio::fs::write(&path, body).await?;
    Ok(path)
}

/// Feed URLs in file order; blank lines skipped, missing file is empty.
pub async fn load_feed_sources(path: &Path) -> Result<Vec<String>> {
    let content = load_text(path).await?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// The configured set of text files FeedClaw reads and writes
#[derive(Debug, Clone)]
pub struct TextStore {
    paths: PathsConfig,
}

impl TextStore {
    /// Create a store over the configured paths
    pub fn new(paths: PathsConfig) -> Self {
        Self { paths }
    }

    /// Create a store with every file under `base_dir`, using default names
    pub fn rooted_at(base_dir: &Path) -> Self {
        let defaults = PathsConfig::default();
        Self::new(PathsConfig {
            interest_file: base_dir.join(defaults.interest_file),
            profile_file: base_dir.join(defaults.profile_file),
            feed_sources_file: base_dir.join(defaults.feed_sources_file),
            notes_dir: base_dir.join(defaults.notes_dir),
        })
    }

    pub fn paths(&self) -> &PathsConfig {
        &self.paths
    }

    pub fn notes_dir(&self) -> &Path {
        &self.paths.notes_dir
    }

    pub async fn interest_text(&self) -> Result<String> {
        load_text(&self.paths.interest_file).await
    }

    pub async fn profile_text(&self) -> Result<String> {
        load_text(&self.paths.profile_file).await
    }

    pub async fn feed_sources(&self) -> Result<Vec<String>> {
        load_feed_sources(&self.paths.feed_sources_file).await
    }

    /// Append one line to the profile log
    pub async fn append_profile(&self, line: &str) -> Result<()> {
        append_line(&self.paths.profile_file, line).await?;
        tracing::debug!(line = %line, "Profile updated");
        Ok(())
    }
}
