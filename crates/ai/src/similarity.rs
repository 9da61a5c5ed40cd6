//! Vector similarity ranking for semantic search.

pub const DEFAULT_MIN_SCORE: f64 = 0.1;

/// Cosine similarity of two vectors.
///
/// `None` when the lengths differ, either side is empty, or either side has
/// zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        return None;
    }
    Some(dot / denom)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMatch<T> {
    pub item: T,
    pub score: f64,
}

/// Keep candidates scoring strictly above `min_score`, best first.
///
/// Candidates whose similarity is undefined are dropped. Equal scores keep
/// their input order.
pub fn rank_by_similarity<T, V>(
    query: &[f32],
    candidates: impl IntoIterator<Item = (T, V)>,
    min_score: f64,
) -> Vec<ScoredMatch<T>>
where
    V: AsRef<[f32]>,
{
    let mut matches: Vec<ScoredMatch<T>> = candidates
        .into_iter()
        .filter_map(|(item, vector)| {
            let score = cosine_similarity(query, vector.as_ref())?;
            (score > min_score).then_some(ScoredMatch { item, score })
        })
        .collect();
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_score_one() {
        let v = [0.3f32, 0.4, 0.5];
        let score = cosine_similarity(&v, &v).unwrap();
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        assert_eq!(cosine_similarity(&[1.0f32, 0.0], &[0.0f32, 2.0]), Some(0.0));
    }

    #[test]
    fn mismatched_or_zero_vectors_are_undefined() {
        assert_eq!(cosine_similarity(&[1.0f32], &[1.0f32, 2.0]), None);
        assert_eq!(cosine_similarity(&[], &[]), None);
        assert_eq!(cosine_similarity(&[0.0f32, 0.0], &[1.0f32, 1.0]), None);
    }

    #[test]
    fn ranking_filters_low_scores_and_sorts_descending() {
        let query = [1.0f32, 0.0];
        let candidates: Vec<(&str, Vec<f32>)> = vec![
            ("weak", vec![0.05, 1.0]),
            ("close", vec![0.9, 0.1]),
            ("exact", vec![2.0, 0.0]),
            ("opposite", vec![-1.0, 0.0]),
            ("broken", vec![1.0]),
        ];

        let ranked = rank_by_similarity(&query, candidates, DEFAULT_MIN_SCORE);
        let names: Vec<&str> = ranked.iter().map(|m| m.item).collect();
        assert_eq!(names, vec!["exact", "close"]);
        assert!(ranked[0].score >= ranked[1].score);
    }

    #[test]
    fn threshold_is_exclusive() {
        let ranked = rank_by_similarity(&[1.0f32, 0.0], [("same", [1.0f32, 0.0])], 1.0);
        assert!(ranked.is_empty());
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let ranked = rank_by_similarity(&[1.0f32, 0.0], [("first", [1.0f32, 0.0]), ("second", [3.0, 0.0])], 0.1);
        let names: Vec<&str> = ranked.iter().map(|m| m.item).collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
