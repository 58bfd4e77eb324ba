//! Feed processing pipeline
//!
//! ```text
//! feed URL ─► fetch/parse ─► for each entry:
//!                              summarize ─► write note ─► relevant? ─► deliver
//! ```
//!
//! Failures are contained at the level they happen: a bad feed is skipped,
//! a failed summary or delivery skips one entry, and only local I/O errors
//! abort the run.

use super::{FeedEntry, FeedFetcher};
use crate::config::{NoteLayout, NotesConfig};
use crate::delivery::{Digest, FeedbackTracker};
use crate::error::Result;
use crate::relevance::is_relevant;
use crate::store::{sanitize_filename, write_note, TextStore};
use crate::summarizer::{Summaries, Summarizer};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Outcome of processing one feed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedReport {
    pub url: String,
    pub feed_title: Option<String>,
    pub entries: usize,
    pub notes_written: usize,
    pub delivered: usize,
    pub skipped_entries: usize,
    pub failed_deliveries: usize,
    /// Why the whole feed was skipped
    pub error: Option<String>,
}

impl FeedReport {
    fn skipped(url: &str, error: String) -> Self {
        Self {
            url: url.to_string(),
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.error.is_some()
    }
}

/// Outcome of processing every configured feed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub feeds: Vec<FeedReport>,
}

impl RunReport {
    pub fn notes_written(&self) -> usize {
        self.feeds.iter().map(|f| f.notes_written).sum()
    }

    pub fn delivered(&self) -> usize {
        self.feeds.iter().map(|f| f.delivered).sum()
    }

    pub fn skipped_feeds(&self) -> usize {
        self.feeds.iter().filter(|f| f.is_skipped()).count()
    }

    pub fn skipped_entries(&self) -> usize {
        self.feeds.iter().map(|f| f.skipped_entries).sum()
    }

    pub fn failed_deliveries(&self) -> usize {
        self.feeds.iter().map(|f| f.failed_deliveries).sum()
    }

    /// One-line summary for the user
    pub fn summary_line(&self) -> String {
        if self.feeds.is_empty() {
            return "No feeds configured.".to_string();
        }
        let mut line = format!(
            "{} feed(s) processed, {} note(s) written, {} delivered",
            self.feeds.len(),
            self.notes_written(),
            self.delivered()
        );
        let skipped_feeds = self.skipped_feeds();
        if skipped_feeds > 0 {
            line.push_str(&format!(", {} feed(s) skipped", skipped_feeds));
        }
        let skipped_entries = self.skipped_entries();
        if skipped_entries > 0 {
            line.push_str(&format!(", {} entr(ies) skipped", skipped_entries));
        }
        let failed_deliveries = self.failed_deliveries();
        if failed_deliveries > 0 {
            line.push_str(&format!(", {} delivery(ies) failed", failed_deliveries));
        }
        line
    }
}

/// Human-readable note body
pub fn format_note(
    entry: &FeedEntry,
    feed_title: &str,
    summaries: &Summaries,
    generated_at: DateTime<Utc>,
) -> String {
    format!(
        "Title: {}\nURL: {}\nFeed: {}\nGenerated: {}\n\nAI Summary:\n{}\n\nDetailed Summary:\n{}\n",
        entry.title,
        entry.link,
        feed_title,
        generated_at.to_rfc3339(),
        summaries.short,
        summaries.long
    )
}

/// Turns feed URLs into notes and deliveries
pub struct FeedProcessor {
    fetcher: Arc<dyn FeedFetcher>,
    summarizer: Arc<dyn Summarizer>,
    tracker: Arc<FeedbackTracker>,
    store: TextStore,
    notes: NotesConfig,
    /// Numbers feed folders within a run
    feed_counter: AtomicUsize,
}

impl FeedProcessor {
    pub fn new(
        fetcher: Arc<dyn FeedFetcher>,
        summarizer: Arc<dyn Summarizer>,
        tracker: Arc<FeedbackTracker>,
        store: TextStore,
        notes: NotesConfig,
    ) -> Self {
        Self {
            fetcher,
            summarizer,
            tracker,
            store,
            notes,
            feed_counter: AtomicUsize::new(0),
        }
    }

    pub fn tracker(&self) -> &Arc<FeedbackTracker> {
        &self.tracker
    }

    fn note_target(&self, feed_no: usize, feed_title: &str, index: usize, title: &str) -> (PathBuf, String) {
        let title = sanitize_filename(title, self.notes.max_name_len);
        match self.notes.layout {
            NoteLayout::PerFeed => {
                let folder = format!(
                    "{:03}_{}",
                    feed_no,
                    sanitize_filename(feed_title, self.notes.max_name_len)
                );
                (
                    self.store.notes_dir().join(folder),
                    format!("{:03}_{}.txt", index, title),
                )
            }
            NoteLayout::Flat => (
                self.store.notes_dir().to_path_buf(),
                format!("{:03}_{:03}_{}.txt", feed_no, index, title),
            ),
        }
    }

    /// Process every entry of one feed for `recipient`
    pub async fn process_feed(&self, feed_url: &str, recipient: &str) -> Result<FeedReport> {
        let feed = match self.fetcher.fetch(feed_url).await {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!(feed = %feed_url, error = %e, "Could not fetch or parse feed, skipping");
                return Ok(FeedReport::skipped(feed_url, e.to_string()));
            }
        };

        let feed_no = self.feed_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let feed_title = feed.display_title().to_string();

        // Re-read per feed so feedback from earlier in the run is picked up
        let interest = self.store.interest_text().await?;
        let profile = self.store.profile_text().await?;

        let mut report = FeedReport {
            url: feed_url.to_string(),
            feed_title: Some(feed_title.clone()),
            entries: feed.entries.len(),
            ..FeedReport::default()
        };

        tracing::info!(feed = %feed_url, title = %feed_title, entries = report.entries, "Processing feed");

        for (index, entry) in feed.entries.iter().enumerate().map(|(i, e)| (i + 1, e)) {
            let summaries = match self.summarizer.summarize(&entry.title, &entry.body).await {
                Ok(summaries) => summaries,
                Err(e) => {
                    tracing::warn!(
                        feed = %feed_url,
                        index,
                        title = %entry.title,
                        error = %e,
                        "Summarization failed, skipping entry"
                    );
                    report.skipped_entries += 1;
                    continue;
                }
            };

            let (dir, filename) = self.note_target(feed_no, &feed_title, index, &entry.title);
            let body = format_note(entry, &feed_title, &summaries, Utc::now());
            let path = write_note(&dir, &filename, &body).await?;
            report.notes_written += 1;
            tracing::debug!(path = %path.display(), "Note written");

            if !is_relevant(&entry.title, &summaries.short, &interest, &profile) {
                continue;
            }

            let digest = Digest {
                title: entry.title.clone(),
                link: entry.link.clone(),
                feed_title: feed_title.clone(),
                summaries,
            };
            match self.tracker.deliver(recipient, &digest).await {
                Ok(_) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        feed = %feed_url,
                        title = %entry.title,
                        error = %e,
                        "Delivery failed"
                    );
                    report.failed_deliveries += 1;
                }
            }
        }

        tracing::info!(
            feed = %feed_url,
            notes = report.notes_written,
            delivered = report.delivered,
            skipped = report.skipped_entries,
            "Feed processed"
        );
        Ok(report)
    }

    /// Process every feed in the source list, in file order
    pub async fn process_all_feeds(&self, recipient: &str) -> Result<RunReport> {
        let sources = self.store.feed_sources().await?;
        if sources.is_empty() {
            tracing::warn!(
                path = %self.store.paths().feed_sources_file.display(),
                "No feed sources configured"
            );
            return Ok(RunReport::default());
        }

        self.feed_counter.store(0, Ordering::SeqCst);
        let run_id = uuid::Uuid::new_v4();
        tracing::info!(run = %run_id, feeds = sources.len(), recipient = %recipient, "Run started");

        let mut report = RunReport::default();
        for url in &sources {
            report.feeds.push(self.process_feed(url, recipient).await?);
        }

        tracing::info!(run = %run_id, summary = %report.summary_line(), "Run finished");
        Ok(report)
    }
}
