//! Daily trend intake from community and search feeds.

pub mod feeds;
pub mod handlers;
pub mod scanner;
pub mod store;

use serde::Serialize;

/// A trend as read from a feed, before it is stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTrend {
    pub headline: String,
    pub url: String,
    pub category: String,
    pub platform: String,
    pub trending: bool,
}
