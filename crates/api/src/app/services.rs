//! Infrastructure wiring: pick store, cache and embedder backends from config
//! and build the application services on top of them.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use stockpulse_ai::{Embedder, HashingEmbedder};
use stockpulse_infra::{
    CacheStore, CatalogService, HttpEmbedder, HttpEmbedderConfig, InMemoryCacheStore,
    InMemoryInventoryStore, InsightsService, InventoryStore, InventorySync, LogReportSink,
    NightlyImportRunner, PostgresInventoryStore, ReportSink, SearchService, SmtpReportSink,
};

use crate::config::AppConfig;

/// Everything the HTTP handlers and CLI commands call into.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub insights: Arc<InsightsService>,
    pub search: Arc<SearchService>,
    pub sync: Arc<InventorySync>,
    /// Present only when a nightly CSV path is configured.
    pub nightly: Option<NightlyImportRunner>,
}

impl AppServices {
    /// Wire services over already-constructed backends.
    pub fn from_parts(
        config: &AppConfig,
        store: Arc<dyn InventoryStore>,
        cache: Arc<dyn CacheStore>,
        embedder: Arc<dyn Embedder>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        let nightly = config
            .nightly_csv
            .as_ref()
            .map(|path| NightlyImportRunner::new(path).with_interval(config.nightly_interval));

        Self {
            catalog: Arc::new(CatalogService::new(store.clone(), cache.clone())),
            insights: Arc::new(InsightsService::new(store.clone(), cache.clone(), config.insights)),
            search: Arc::new(SearchService::new(store.clone(), cache, embedder, config.search)),
            sync: Arc::new(InventorySync::new(store, sink)),
            nightly,
        }
    }

    /// Fully in-process wiring (tests and local development).
    pub fn in_memory(config: &AppConfig) -> Self {
        Self::from_parts(
            config,
            Arc::new(InMemoryInventoryStore::new()),
            Arc::new(InMemoryCacheStore::new()),
            Arc::new(HashingEmbedder::default()),
            Arc::new(LogReportSink),
        )
    }
}

/// Build services from configuration, connecting to external backends as needed.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let store = build_store(config).await?;
    let cache = build_cache(config).await?;
    let embedder = build_embedder(config)?;
    let sink = build_report_sink(config)?;
    Ok(AppServices::from_parts(config, store, cache, embedder, sink))
}

async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn InventoryStore>> {
    match config.database_url.as_deref() {
        Some(url) => {
            let store = PostgresInventoryStore::connect(url)
                .await
                .context("failed to connect to postgres")?;
            store
                .ensure_schema()
                .await
                .context("failed to prepare database schema")?;
            info!("using postgres inventory store");
            Ok(Arc::new(store))
        }
        None => {
            info!("DATABASE_URL not set; using in-memory inventory store");
            Ok(Arc::new(InMemoryInventoryStore::new()))
        }
    }
}

#[cfg(feature = "redis")]
async fn build_cache(config: &AppConfig) -> anyhow::Result<Arc<dyn CacheStore>> {
    match config.redis_url.as_deref() {
        Some(url) => {
            let cache = stockpulse_infra::RedisCacheStore::connect(url)
                .await
                .context("failed to connect to redis")?;
            info!("using redis cache");
            Ok(Arc::new(cache))
        }
        None => Ok(Arc::new(InMemoryCacheStore::new())),
    }
}

#[cfg(not(feature = "redis"))]
async fn build_cache(config: &AppConfig) -> anyhow::Result<Arc<dyn CacheStore>> {
    if config.redis_url.is_some() {
        tracing::warn!("REDIS_URL is set but the redis feature is disabled; using in-memory cache");
    }
    Ok(Arc::new(InMemoryCacheStore::new()))
}

fn build_report_sink(config: &AppConfig) -> anyhow::Result<Arc<dyn ReportSink>> {
    let Some(mail) = &config.report_mail else {
        info!("SMTP_URL not set; nightly reports go to the log");
        return Ok(Arc::new(LogReportSink));
    };
    let sink = SmtpReportSink::from_url(&mail.smtp_url, &mail.from, &mail.to)
        .context("failed to configure report mail")?;
    info!(to = %mail.to, "nightly reports will be mailed");
    Ok(Arc::new(sink))
}

fn build_embedder(config: &AppConfig) -> anyhow::Result<Arc<dyn Embedder>> {
    let Some(endpoint) = &config.embedding else {
        return Ok(Arc::new(HashingEmbedder::default()));
    };

    let mut http = HttpEmbedderConfig::new(&endpoint.url, &endpoint.model);
    http.api_key = endpoint.api_key.clone();
    let embedder = HttpEmbedder::new(http).context("failed to build embedding client")?;
    info!(model = %endpoint.model, "using remote embedding service");
    Ok(Arc::new(embedder))
}
