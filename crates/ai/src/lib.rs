//! `stockpulse-ai`
//!
//! **Responsibility:** the analytics side of the inventory: trend extraction
//! from the stock ledger, cluster-based detection of depleting products,
//! inventory statistics, and similarity ranking for semantic search.
//!
//! Everything here is read-only over its inputs:
//! - It must not mutate products or the ledger.
//! - It produces insights, never writes.
//! - Inputs are handed in by callers (infra services); no storage access.

pub mod cluster;
pub mod embedding;
pub mod error;
pub mod insights;
pub mod similarity;
pub mod trend;
pub mod trending;

pub use cluster::{standardize, Clustering, KMeans};
pub use embedding::{Embedder, HashingEmbedder};
pub use error::AiError;
pub use insights::{round2, InsightSnapshot, InsightsAggregator, InventoryStatistics, TrendingProduct};
pub use similarity::{cosine_similarity, rank_by_similarity, ScoredMatch};
pub use trend::{TrendExtractor, TrendRecord};
pub use trending::TrendClassifier;
