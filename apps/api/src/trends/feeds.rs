use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::trends::NewTrend;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
const ITEMS_PER_SOURCE: usize = 10;
const REDDIT_TRENDING_UPS: i64 = 100;
const RSS_FEED_TITLE: &str = "Daily Search Trends";

static RSS_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<title>\s*(?:<!\[CDATA\[(.*?)\]\]>|([^<]*))\s*</title>").expect("valid regex")
});

#[derive(Debug, Error, PartialEq)]
pub enum FeedError {
    #[error("fetch failed: {0}")]
    Http(String),

    #[error("unreadable feed: {0}")]
    Parse(String),
}

/// One polled trend source.
#[async_trait]
pub trait TrendFeed: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<NewTrend>, FeedError>;
}

pub fn http_client() -> Client {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(20))
        .build()
        .expect("Failed to build HTTP client")
}

async fn get_text(client: &Client, url: &str) -> Result<String, FeedError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FeedError::Http(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(FeedError::Http(format!("{url} returned {}", status.as_u16())));
    }
    response.text().await.map_err(|e| FeedError::Http(e.to_string()))
}

// ── Reddit hot listing ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Deserialize)]
struct Child {
    data: Post,
}

#[derive(Deserialize)]
struct Post {
    #[serde(default)]
    title: String,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    ups: i64,
}

pub fn parse_reddit(body: &str, category: &str) -> Result<Vec<NewTrend>, FeedError> {
    let listing: Listing =
        serde_json::from_str(body).map_err(|e| FeedError::Parse(e.to_string()))?;
    Ok(listing
        .data
        .children
        .into_iter()
        .map(|c| c.data)
        .filter(|p| !p.title.trim().is_empty())
        .take(ITEMS_PER_SOURCE)
        .map(|p| NewTrend {
            headline: p.title.trim().to_string(),
            url: format!("https://reddit.com{}", p.permalink),
            category: category.to_string(),
            platform: "reddit".into(),
            trending: p.ups > REDDIT_TRENDING_UPS,
        })
        .collect())
}

pub struct RedditFeed {
    client: Client,
    url: String,
    category: String,
}

impl RedditFeed {
    pub fn new(client: Client, url: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            category: category.into(),
        }
    }
}

#[async_trait]
impl TrendFeed for RedditFeed {
    fn name(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<Vec<NewTrend>, FeedError> {
        let body = get_text(&self.client, &self.url).await?;
        parse_reddit(&body, &self.category)
    }
}

// ── Google Trends daily RSS ─────────────────────────────────────────────────

pub fn parse_trends_rss(xml: &str, source_url: &str, category: &str) -> Vec<NewTrend> {
    RSS_TITLE
        .captures_iter(xml)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().trim())
        .filter(|t| !t.is_empty() && *t != RSS_FEED_TITLE)
        .take(ITEMS_PER_SOURCE)
        .map(|headline| NewTrend {
            headline: headline.to_string(),
            url: source_url.to_string(),
            category: category.to_string(),
            platform: "google_trends".into(),
            trending: true,
        })
        .collect()
}

pub struct GoogleTrendsRssFeed {
    client: Client,
    url: String,
    category: String,
}

impl GoogleTrendsRssFeed {
    pub fn new(client: Client, url: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            category: category.into(),
        }
    }
}

#[async_trait]
impl TrendFeed for GoogleTrendsRssFeed {
    fn name(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<Vec<NewTrend>, FeedError> {
        let xml = get_text(&self.client, &self.url).await?;
        if !xml.contains("<rss") && !xml.contains("<channel") {
            return Err(FeedError::Parse("not an RSS document".into()));
        }
        Ok(parse_trends_rss(&xml, &self.url, &self.category))
    }
}

/// Sources polled by the daily scan.
pub fn default_feeds() -> Vec<std::sync::Arc<dyn TrendFeed>> {
    let client = http_client();
    vec![
        std::sync::Arc::new(RedditFeed::new(
            client.clone(),
            "https://www.reddit.com/r/Parenting/hot.json",
            "Parent Community",
        )),
        std::sync::Arc::new(RedditFeed::new(
            client.clone(),
            "https://www.reddit.com/r/Mindfulness/hot.json",
            "Mindfulness Community",
        )),
        std::sync::Arc::new(GoogleTrendsRssFeed::new(
            client,
            "https://trends.google.com/trending/rss?geo=NL",
            "Search Trends",
        )),
    ]
}
