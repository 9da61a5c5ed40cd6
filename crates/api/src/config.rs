//! Process configuration, read once from the environment at startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use stockpulse_ai::{InsightsAggregator, TrendClassifier, TrendExtractor};
use stockpulse_infra::{InsightsSettings, SearchSettings};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Remote embedding endpoint; absent means the local hashing embedder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingEndpoint {
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
}

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Where nightly reports are mailed; absent means they are only logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportMail {
    pub smtp_url: String,
    pub from: String,
    pub to: String,
}

/// Longest accepted trend window (about a century).
pub const MAX_TREND_WINDOW_DAYS: i64 = 36_500;
/// Longest accepted insights cache TTL (one year).
pub const MAX_INSIGHTS_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub insights: InsightsSettings,
    pub search: SearchSettings,
    pub embedding: Option<EmbeddingEndpoint>,
    pub report_mail: Option<ReportMail>,
    pub nightly_csv: Option<PathBuf>,
    pub nightly_interval: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_url: None,
            redis_url: None,
            insights: InsightsSettings::default(),
            search: SearchSettings::default(),
            embedding: None,
            report_mail: None,
            nightly_csv: None,
            nightly_interval: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();
        let aggregator = InsightsAggregator::default();

        let window_days: i64 = parse_or(&get, "TREND_WINDOW_DAYS", stockpulse_ai::trend::DEFAULT_WINDOW_DAYS)?;
        if !(1..=MAX_TREND_WINDOW_DAYS).contains(&window_days) {
            return Err(invalid(
                "TREND_WINDOW_DAYS",
                window_days,
                format!("must be between 1 and {MAX_TREND_WINDOW_DAYS}"),
            ));
        }

        let classifier = TrendClassifier {
            decline_threshold: parse_or(&get, "DEPLETION_THRESHOLD", aggregator.classifier.decline_threshold)?,
            limit: parse_or(&get, "TRENDING_LIMIT", aggregator.classifier.limit)?,
            ..aggregator.classifier
        };
        classifier
            .validate()
            .map_err(|e| invalid("DEPLETION_THRESHOLD", classifier.decline_threshold, e))?;

        let ttl_secs: u64 = parse_or(&get, "INSIGHTS_CACHE_TTL_SECS", defaults.insights.ttl.as_secs())?;
        if ttl_secs > MAX_INSIGHTS_CACHE_TTL_SECS {
            return Err(invalid(
                "INSIGHTS_CACHE_TTL_SECS",
                ttl_secs,
                format!("must be at most {MAX_INSIGHTS_CACHE_TTL_SECS}"),
            ));
        }

        let insights = InsightsSettings {
            aggregator: InsightsAggregator {
                extractor: TrendExtractor::new(chrono::Duration::days(window_days)),
                classifier,
                low_stock_threshold: parse_or(&get, "LOW_STOCK_THRESHOLD", aggregator.low_stock_threshold)?,
            },
            ttl: Duration::from_secs(ttl_secs),
        };

        let min_score: f64 = parse_or(&get, "SEARCH_MIN_SCORE", defaults.search.min_score)?;
        if !min_score.is_finite() {
            return Err(invalid("SEARCH_MIN_SCORE", min_score, "must be finite"));
        }

        let nightly_secs: u64 = parse_or(&get, "NIGHTLY_INTERVAL_SECS", defaults.nightly_interval.as_secs())?;
        if nightly_secs == 0 {
            return Err(invalid("NIGHTLY_INTERVAL_SECS", nightly_secs, "must be positive"));
        }

        let report_mail = match get("SMTP_URL") {
            None => None,
            Some(smtp_url) => {
                let from = get("REPORT_FROM")
                    .ok_or_else(|| invalid("REPORT_FROM", "", "required when SMTP_URL is set"))?;
                let to = get("REPORT_TO")
                    .ok_or_else(|| invalid("REPORT_TO", "", "required when SMTP_URL is set"))?;
                Some(ReportMail { smtp_url, from, to })
            }
        };

        Ok(Self {
            bind_addr: parse_or(&get, "BIND_ADDR", defaults.bind_addr)?,
            database_url: get("DATABASE_URL"),
            redis_url: get("REDIS_URL"),
            insights,
            search: SearchSettings { min_score },
            embedding: get("EMBEDDING_URL").map(|url| EmbeddingEndpoint {
                url,
                model: get("EMBEDDING_MODEL").unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
                api_key: get("EMBEDDING_API_KEY"),
            }),
            report_mail,
            nightly_csv: get("NIGHTLY_IMPORT_CSV").map(PathBuf::from),
            nightly_interval: Duration::from_secs(nightly_secs),
        })
    }
}

fn parse_or<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: raw,
            reason: e.to_string(),
        }),
    }
}

fn invalid(var: &'static str, value: impl ToString, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
