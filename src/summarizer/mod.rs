//! Article summarization through a language model
//!
//! Every entry gets two summaries: a short one that goes into the direct
//! message and decides relevance, and a long one sent back when the user
//! asks for more. Each length is a separate model request.

mod client;

pub use client::{ChatMessage, CompletionClient, CompletionRequest};

use crate::config::ModelConfig;
use crate::error::Result;
use async_trait::async_trait;

/// System instruction shared by every summarization request
pub const SYSTEM_PROMPT: &str = "You are an RSS summarizer AI. You read articles from the user's \
feeds and summarize them for the user. Be accurate, neutral and stick to what the article says.";

/// Short and long summaries of one article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summaries {
    pub short: String,
    pub long: String,
}

/// Produces summaries for an article
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, title: &str, content: &str) -> Result<Summaries>;
}

/// Requested summary granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryLength {
    Short,
    Long,
}

/// User instruction for one summary length
pub fn user_prompt(title: &str, content: &str, length: SummaryLength) -> String {
    let instruction = match length {
        SummaryLength::Short => "Make it concise.",
        SummaryLength::Long => "Cover the key points in detail, in a few paragraphs.",
    };
    format!(
        "Summarize the following blog post:\nTitle: {}\nContent: {}\n{}",
        title, content, instruction
    )
}

/// [`Summarizer`] backed by a chat completions endpoint
pub struct ModelSummarizer {
    client: CompletionClient,
    config: ModelConfig,
}

impl ModelSummarizer {
    pub fn new(client: CompletionClient, config: ModelConfig) -> Self {
        Self { client, config }
    }

    fn request(&self, title: &str, content: &str, length: SummaryLength) -> CompletionRequest {
        let max_tokens = match length {
            SummaryLength::Short => self.config.short_max_tokens,
            SummaryLength::Long => self.config.long_max_tokens,
        };
        CompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(user_prompt(title, content, length)),
            ],
            max_tokens,
            temperature: self.config.temperature,
        }
    }
}

#[async_trait]
impl Summarizer for ModelSummarizer {
    async fn summarize(&self, title: &str, content: &str) -> Result<Summaries> {
        let short = self
            .client
            .complete(&self.request(title, content, SummaryLength::Short))
            .await?;
        let long = self
            .client
            .complete(&self.request(title, content, SummaryLength::Long))
            .await?;

        tracing::debug!(
            title = %title,
            short_len = short.len(),
            long_len = long.len(),
            "Article summarized"
        );
        Ok(Summaries { short, long })
    }
}
