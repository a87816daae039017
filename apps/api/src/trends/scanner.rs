use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::trends::feeds::TrendFeed;
use crate::trends::store::TrendStore;

#[derive(Debug, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub fetched: usize,
    pub stored: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub stored: usize,
    pub sources: Vec<SourceReport>,
}

/// Polls every feed and stores what is new. A failing source is reported and skipped.
#[derive(Clone)]
pub struct TrendScanner {
    feeds: Vec<Arc<dyn TrendFeed>>,
    store: Arc<dyn TrendStore>,
}

impl TrendScanner {
    pub fn new(feeds: Vec<Arc<dyn TrendFeed>>, store: Arc<dyn TrendStore>) -> Self {
        Self { feeds, store }
    }

    /// Never fails as a whole: fetch and storage errors land in that source's report.
    pub async fn scan(&self) -> ScanReport {
        let mut sources = Vec::with_capacity(self.feeds.len());
        for feed in &self.feeds {
            let mut report = SourceReport {
                source: feed.name().to_string(),
                fetched: 0,
                stored: 0,
                error: None,
            };
            match feed.fetch().await {
                Ok(trends) => {
                    report.fetched = trends.len();
                    match self.store.insert_many(&trends).await {
                        Ok(stored) => {
                            report.stored = stored;
                            info!(source = feed.name(), fetched = trends.len(), stored, "Trend source scanned");
                        }
                        Err(e) => {
                            warn!(source = feed.name(), error = %e, "Storing trends failed");
                            report.error = Some(e.to_string());
                        }
                    }
                }
                Err(e) => {
                    warn!(source = feed.name(), error = %e, "Trend source failed");
                    report.error = Some(e.to_string());
                }
            }
            sources.push(report);
        }

        ScanReport {
            stored: sources.iter().map(|s| s.stored).sum(),
            sources,
        }
    }
}

/// Next `hour_utc:00` strictly after `now`.
pub fn next_run_after(now: DateTime<Utc>, hour_utc: u32) -> DateTime<Utc> {
    let at = NaiveTime::from_hms_opt(hour_utc.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

pub fn spawn_daily_scan(scanner: TrendScanner, hour_utc: u32) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let next = next_run_after(now, hour_utc);
            let wait = (next - now).to_std().unwrap_or_default();
            info!(next_run = %next, "Trend scan scheduled");
            tokio::time::sleep(wait).await;

            let report = scanner.scan().await;
            let failed = report.sources.iter().filter(|s| s.error.is_some()).count();
            info!(stored = report.stored, failed, "Daily trend scan finished");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trends::feeds::FeedError;
    use crate::trends::store::MemoryTrendStore;
    use crate::errors::AppError;
    use crate::models::trend::TrendRow;
    use crate::trends::NewTrend;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct StaticFeed(Result<Vec<NewTrend>, FeedError>);

    #[async_trait]
    impl TrendFeed for StaticFeed {
        fn name(&self) -> &str {
            "static"
        }

        async fn fetch(&self) -> Result<Vec<NewTrend>, FeedError> {
            match &self.0 {
                Ok(t) => Ok(t.clone()),
                Err(e) => Err(FeedError::Http(e.to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_scan_survives_failing_source() {
        let good = StaticFeed(Ok(vec![NewTrend {
            headline: "Gentle parenting".into(),
            url: "https://reddit.com/r/Parenting/1".into(),
            category: "Parent Community".into(),
            platform: "reddit".into(),
            trending: true,
        }]));
        let bad = StaticFeed(Err(FeedError::Http("timeout".into())));
        let store = Arc::new(MemoryTrendStore::new());
        let scanner = TrendScanner::new(vec![Arc::new(bad), Arc::new(good)], store.clone());

        let report = scanner.scan().await;
        assert_eq!(report.stored, 1);
        assert!(report.sources[0].error.is_some());
        assert_eq!(store.recent(None, 20).await.unwrap().len(), 1);

        // second run stores nothing new
        assert_eq!(scanner.scan().await.stored, 0);
    }

    struct UnavailableStore;

    #[async_trait]
    impl TrendStore for UnavailableStore {
        async fn insert_many(&self, _trends: &[NewTrend]) -> Result<usize, AppError> {
            Err(AppError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn recent(&self, _category: Option<&str>, _limit: i64) -> Result<Vec<TrendRow>, AppError> {
            Ok(Vec::new())
        }
    }

    struct CountingFeed {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl TrendFeed for CountingFeed {
        fn name(&self) -> &str {
            "counting"
        }

        async fn fetch(&self) -> Result<Vec<NewTrend>, FeedError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_store_failure_does_not_stop_later_sources() {
        let first = StaticFeed(Ok(vec![NewTrend {
            headline: "Screen-free weekends".into(),
            url: "https://reddit.com/r/Parenting/2".into(),
            category: "Parent Community".into(),
            platform: "reddit".into(),
            trending: false,
        }]));
        let second = Arc::new(CountingFeed {
            calls: Default::default(),
        });
        let scanner = TrendScanner::new(
            vec![Arc::new(first), second.clone()],
            Arc::new(UnavailableStore),
        );

        let report = scanner.scan().await;
        assert_eq!(report.sources.len(), 2);
        assert_eq!(report.sources[0].fetched, 1);
        assert!(report.sources[0].error.as_deref().unwrap().contains("Database"));
        assert_eq!(second.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(report.sources[1].error.is_none());
    }

    #[test]
    fn test_next_run_rolls_to_tomorrow_after_hour() {
        let morning = Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap();
        assert_eq!(
            next_run_after(morning, 12),
            Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
        );
        let noon = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        assert_eq!(
            next_run_after(noon, 12),
            Utc.with_ymd_and_hms(2026, 3, 3, 12, 0, 0).unwrap()
        );
    }
}
