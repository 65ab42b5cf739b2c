use std::cmp::Ordering;

/// Cosine similarity of two vectors after L2 normalisation.
///
/// Returns `0.0` when either vector has zero norm or the dimensions differ,
/// so callers never see `NaN` from a degenerate embedding.
pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> f32 {
    if query.is_empty() || query.len() != candidate.len() {
        return 0.0;
    }

    let query_norm = l2_norm(query);
    let candidate_norm = l2_norm(candidate);
    if query_norm <= f32::EPSILON || candidate_norm <= f32::EPSILON {
        return 0.0;
    }

    let dot: f32 = query
        .iter()
        .zip(candidate.iter())
        .map(|(q, c)| (q / query_norm) * (c / candidate_norm))
        .sum();

    if dot.is_nan() {
        0.0
    } else {
        dot.clamp(-1.0, 1.0)
    }
}

/// Scores every candidate against `query` and orders them best-first.
///
/// The sort is stable: candidates with equal scores keep their input order.
pub fn rank_descending_by_cosine<V: AsRef<[f32]>>(
    query: &[f32],
    candidates: &[V],
) -> Vec<(usize, f32)> {
    let mut scores: Vec<(usize, f32)> = candidates
        .iter()
        .enumerate()
        .map(|(idx, candidate)| (idx, cosine_similarity(query, candidate.as_ref())))
        .collect();

    scores.sort_by(|left, right| descending(left.1, right.1));
    scores
}

/// Comparator for best-first ordering of scores.
pub fn descending(left: f32, right: f32) -> Ordering {
    right.partial_cmp(&left).unwrap_or(Ordering::Equal)
}

pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|v| v * v).sum::<f32>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(left: f32, right: f32) -> bool {
        (left - right).abs() < 1e-5
    }

    #[test]
    fn cosine_is_one_for_identical_vectors() {
        let vec = vec![1.0, 2.0, 3.0, 4.0];
        assert!(approx_eq(cosine_similarity(&vec, &vec), 1.0));
    }

    #[test]
    fn cosine_ignores_magnitude() {
        assert!(approx_eq(cosine_similarity(&[1.0, 1.0], &[10.0, 10.0]), 1.0));
    }

    #[test]
    fn cosine_is_zero_for_orthogonal_vectors() {
        assert!(approx_eq(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0));
    }

    #[test]
    fn zero_norm_yields_zero_not_nan() {
        let score = cosine_similarity(&[0.0, 0.0, 0.0], &[1.0, 2.0, 3.0]);
        assert_eq!(score, 0.0);
        let score = cosine_similarity(&[1.0, 2.0, 3.0], &[0.0, 0.0, 0.0]);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn mismatched_dimensions_score_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn ranking_returns_highest_similarity_first() {
        let query = vec![1.0, 0.0];
        let candidates = vec![vec![0.8, 0.2], vec![0.1, 0.9], vec![0.9, 0.0]];
        let ranked = rank_descending_by_cosine(&query, &candidates);

        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].0, 2);
        assert_eq!(ranked[2].0, 1);
    }

    #[test]
    fn ranking_is_stable_for_ties() {
        let query = vec![1.0, 0.0];
        let candidates = vec![vec![0.0, 1.0], vec![2.0, 0.0], vec![0.0, 3.0], vec![5.0, 0.0]];
        let ranked = rank_descending_by_cosine(&query, &candidates);
        let order: Vec<usize> = ranked.iter().map(|(idx, _)| *idx).collect();

        assert_eq!(order, vec![1, 3, 0, 2]);
    }
}
