//! Cluster-based detection of products whose stock is running down.
//!
//! Records are clustered on standardized `(percentage_change, quantity_change)`.
//! The cluster with the largest summed decline is the "trending" cluster;
//! members of it past the decline threshold are reported.

use tracing::debug;

use crate::cluster::{standardize, KMeans};
use crate::error::AiError;
use crate::trend::TrendRecord;

pub const DEFAULT_DECLINE_THRESHOLD: f64 = -20.0;
pub const DEFAULT_TRENDING_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendClassifier {
    pub kmeans: KMeans,
    /// Members are reported only when `percentage_change` is strictly below this.
    pub decline_threshold: f64,
    pub limit: usize,
}

impl Default for TrendClassifier {
    fn default() -> Self {
        Self {
            kmeans: KMeans::default(),
            decline_threshold: DEFAULT_DECLINE_THRESHOLD,
            limit: DEFAULT_TRENDING_LIMIT,
        }
    }
}

impl TrendClassifier {
    pub fn validate(&self) -> Result<(), AiError> {
        if self.kmeans.k == 0 {
            return Err(AiError::InvalidInput("cluster count must be > 0".to_string()));
        }
        if !self.decline_threshold.is_finite() {
            return Err(AiError::InvalidInput(
                "decline threshold must be finite".to_string(),
            ));
        }
        Ok(())
    }

    /// Trending records in input order, at most `limit` of them.
    pub fn select(&self, records: &[TrendRecord]) -> Vec<TrendRecord> {
        if records.is_empty() || self.limit == 0 {
            return Vec::new();
        }

        let features: Vec<[f64; 2]> = records.iter().map(TrendRecord::features).collect();
        let fit = self.kmeans.fit(&standardize(&features));

        // Empty clusters score 0; the first cluster wins ties.
        let mut sums = vec![0.0; fit.cluster_count()];
        for (record, &label) in records.iter().zip(&fit.labels) {
            sums[label] += record.percentage_change;
        }
        let mut trending = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (cluster, sum) in sums.iter().enumerate() {
            let score = -sum;
            if score > best_score {
                trending = cluster;
                best_score = score;
            }
        }
        debug!(
            records = records.len(),
            trending_cluster = trending,
            score = best_score,
            iterations = fit.iterations,
            "trend clusters fitted"
        );

        records
            .iter()
            .zip(&fit.labels)
            .filter(|(record, label)| {
                **label == trending && record.percentage_change < self.decline_threshold
            })
            .map(|(record, _)| record.clone())
            .take(self.limit)
            .collect()
    }
}
