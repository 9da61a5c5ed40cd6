//! Feature standardization and a deterministic k-means.
//!
//! Determinism rules:
//! - Initial centers: row 0, then repeatedly the row farthest from every
//!   chosen center (lowest row index on ties).
//! - Assignment ties go to the lowest cluster index.
//! - A cluster that loses all its members keeps its previous center.
//! - Iteration stops once assignments stop changing or after `max_iterations`.

pub const DEFAULT_CLUSTERS: usize = 3;
pub const DEFAULT_MAX_ITERATIONS: usize = 300;

/// Scale every column to zero mean and unit (population) variance.
///
/// A column with zero variance maps to all zeros.
pub fn standardize<const D: usize>(rows: &[[f64; D]]) -> Vec<[f64; D]> {
    if rows.is_empty() {
        return Vec::new();
    }
    let n = rows.len() as f64;

    let mut mean = [0.0; D];
    for row in rows {
        for (m, x) in mean.iter_mut().zip(row) {
            *m += x;
        }
    }
    mean.iter_mut().for_each(|m| *m /= n);

    let mut std = [0.0; D];
    for row in rows {
        for d in 0..D {
            std[d] += (row[d] - mean[d]).powi(2);
        }
    }
    for d in 0..D {
        std[d] = (std[d] / n).sqrt();
        // Rounding in the mean leaves constant columns a few ulps of spread.
        if !std[d].is_finite() || std[d] <= mean[d].abs() * f64::EPSILON * n {
            std[d] = 0.0;
        }
    }

    rows.iter()
        .map(|row| {
            let mut out = [0.0; D];
            for d in 0..D {
                out[d] = if std[d] == 0.0 {
                    0.0
                } else {
                    (row[d] - mean[d]) / std[d]
                };
            }
            out
        })
        .collect()
}

fn squared_distance<const D: usize>(a: &[f64; D], b: &[f64; D]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Output of a k-means fit.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering<const D: usize> {
    /// Cluster index per input row.
    pub labels: Vec<usize>,
    /// One center per cluster (always `k` entries for non-empty input).
    pub centers: Vec<[f64; D]>,
    pub iterations: usize,
    pub converged: bool,
}

impl<const D: usize> Clustering<D> {
    pub fn cluster_count(&self) -> usize {
        self.centers.len()
    }

    /// Row indices belonging to `cluster`, ascending.
    pub fn members(&self, cluster: usize) -> impl Iterator<Item = usize> + '_ {
        self.labels
            .iter()
            .enumerate()
            .filter(move |(_, label)| **label == cluster)
            .map(|(i, _)| i)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KMeans {
    pub k: usize,
    pub max_iterations: usize,
}

impl Default for KMeans {
    fn default() -> Self {
        Self {
            k: DEFAULT_CLUSTERS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl KMeans {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }

    pub fn fit<const D: usize>(&self, rows: &[[f64; D]]) -> Clustering<D> {
        if rows.is_empty() || self.k == 0 {
            return Clustering {
                labels: vec![0; rows.len()],
                centers: Vec::new(),
                iterations: 0,
                converged: true,
            };
        }

        let mut centers = self.initial_centers(rows);
        let mut labels = assign(rows, &centers);
        let mut iterations = 1;
        let mut converged = false;

        while iterations < self.max_iterations.max(1) {
            update_centers(rows, &labels, &mut centers);
            let next = assign(rows, &centers);
            iterations += 1;
            if next == labels {
                converged = true;
                break;
            }
            labels = next;
        }

        Clustering {
            labels,
            centers,
            iterations,
            converged,
        }
    }

    fn initial_centers<const D: usize>(&self, rows: &[[f64; D]]) -> Vec<[f64; D]> {
        let mut centers = Vec::with_capacity(self.k);
        centers.push(rows[0]);
        while centers.len() < self.k {
            let mut best = 0;
            let mut best_distance = f64::NEG_INFINITY;
            for (i, row) in rows.iter().enumerate() {
                let nearest = centers
                    .iter()
                    .map(|c| squared_distance(row, c))
                    .fold(f64::INFINITY, f64::min);
                if nearest > best_distance {
                    best = i;
                    best_distance = nearest;
                }
            }
            centers.push(rows[best]);
        }
        centers
    }
}

fn assign<const D: usize>(rows: &[[f64; D]], centers: &[[f64; D]]) -> Vec<usize> {
    rows.iter()
        .map(|row| {
            let mut best = 0;
            let mut best_distance = f64::INFINITY;
            for (c, center) in centers.iter().enumerate() {
                let d = squared_distance(row, center);
                if d < best_distance {
                    best = c;
                    best_distance = d;
                }
            }
            best
        })
        .collect()
}

fn update_centers<const D: usize>(rows: &[[f64; D]], labels: &[usize], centers: &mut [[f64; D]]) {
    let mut sums = vec![[0.0; D]; centers.len()];
    let mut counts = vec![0usize; centers.len()];
    for (row, &label) in rows.iter().zip(labels) {
        counts[label] += 1;
        for d in 0..D {
            sums[label][d] += row[d];
        }
    }
    for (c, center) in centers.iter_mut().enumerate() {
        if counts[c] == 0 {
            continue;
        }
        for d in 0..D {
            center[d] = sums[c][d] / counts[c] as f64;
        }
    }
}
