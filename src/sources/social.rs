use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{HttpConfig, SocialConfig};
use crate::models::RedditPost;
use super::{HttpFetcher, SocialSource, SourceError};

/// Social listening: the locally cached X feed, Reddit hot posts and the ops report.
pub struct SocialListening {
    http: HttpFetcher,
    x_cache: PathBuf,
    subreddits: Vec<String>,
    keywords: Vec<String>,
    limit: u32,
    report_paths: Vec<String>,
    delay: Duration,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RedditListing {
    data: RedditListingData,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RedditListingData {
    children: Vec<RedditChild>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RedditChild {
    data: RawRedditPost,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawRedditPost {
    title: String,
    selftext: String,
    author: String,
    score: i64,
    upvote_ratio: f64,
    num_comments: i64,
    permalink: String,
    created_utc: f64,
    link_flair_text: Option<String>,
}

/// A post is relevant when any keyword appears in its title or body (case-insensitive).
fn is_relevant(post: &RawRedditPost, keywords: &[String]) -> bool {
    let title = post.title.to_lowercase();
    let body = post.selftext.to_lowercase();
    keywords.iter()
        .map(|k| k.to_lowercase())
        .any(|k| title.contains(&k) || body.contains(&k))
}

fn posts_from(subreddit: &str, listing: RedditListing, keywords: &[String]) -> Vec<RedditPost> {
    listing.data.children.into_iter()
        .map(|child| {
            let p = child.data;
            RedditPost {
                subreddit: subreddit.to_string(),
                is_relevant: is_relevant(&p, keywords),
                url: format!("https://reddit.com{}", p.permalink),
                title: p.title,
                author: p.author,
                score: p.score,
                upvote_ratio: p.upvote_ratio,
                num_comments: p.num_comments,
                created: p.created_utc,
                flair: p.link_flair_text.unwrap_or_default(),
            }
        })
        .collect()
}

impl SocialListening {
    pub fn new(social: &SocialConfig, http: &HttpConfig) -> Result<Self, SourceError> {
        Ok(Self {
            http: HttpFetcher::new(http, http.timeout_secs)?,
            x_cache: PathBuf::from(&social.x_cache_path),
            subreddits: social.subreddits.clone(),
            keywords: social.relevance_keywords.clone(),
            limit: social.posts_per_subreddit,
            report_paths: social.daily_report_paths.clone(),
            delay: Duration::from_millis(http.politeness_delay_ms),
        })
    }
}

#[async_trait]
impl SocialSource for SocialListening {
    async fn x_posts(&self) -> Result<Vec<serde_json::Value>, SourceError> {
        if !self.x_cache.exists() {
            tracing::info!("  ✗ No X cache at {}", self.x_cache.display());
            return Ok(Vec::new());
        }

        let content = tokio::fs::read_to_string(&self.x_cache)
            .await
            .map_err(|e| SourceError::Cache(format!("{}: {}", self.x_cache.display(), e)))?;
        let posts: Vec<serde_json::Value> = serde_json::from_str(&content)
            .map_err(|e| SourceError::Cache(format!("{}: {}", self.x_cache.display(), e)))?;

        tracing::info!("  ✓ {} X posts from cache", posts.len());
        Ok(posts)
    }

    async fn reddit_posts(&self) -> Result<Vec<RedditPost>, SourceError> {
        let mut posts = Vec::new();

        for sub in &self.subreddits {
            let url = format!("https://www.reddit.com/r/{}/hot.json?limit={}", sub, self.limit);
            match self.http.get_json::<RedditListing>(&url).await {
                Ok(listing) => posts.extend(posts_from(sub, listing, &self.keywords)),
                Err(e) => tracing::warn!("  ✗ Reddit r/{} unavailable: {}", sub, e),
            }
            tokio::time::sleep(self.delay).await;
        }

        posts.sort_by(|a, b| b.score.cmp(&a.score));

        let relevant = posts.iter().filter(|p| p.is_relevant).count();
        tracing::info!("  ✓ {} Reddit posts ({} relevant)", posts.len(), relevant);
        Ok(posts)
    }

    fn daily_report(&self, date: &str) -> String {
        for template in &self.report_paths {
            let path = PathBuf::from(template.replace("{date}", date));
            if !path.exists() {
                continue;
            }
            match std::fs::read_to_string(&path) {
                Ok(text) => {
                    tracing::info!("  ✓ Daily report: {}", path.display());
                    return text;
                }
                Err(e) => tracing::warn!("  ✗ Daily report {} unreadable: {}", path.display(), e),
            }
        }
        tracing::info!("  ✗ No daily report for {}", date);
        String::new()
    }
}
