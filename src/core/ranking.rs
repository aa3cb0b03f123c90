use crate::models::{MatchingPolicy, SharedInterest};

/// Best (lowest) rank the mentee gave any of the shared interests.
///
/// Pairs without a shared interest get the policy's worst ranking.
#[inline]
pub fn best_mentee_rank(shared: &[SharedInterest], worst_ranking: u32) -> u32 {
    shared
        .iter()
        .map(|interest| interest.mentee_rank)
        .fold(worst_ranking, u32::min)
}

/// Score for a mentee/mentor pair. Lower is better.
///
/// score = best_rank - (shared + (max_mentees - mentor_load)) / (max_interests + max_mentees)
///
/// The fractional part only orders pairs inside the same rank bucket: more
/// shared interests and a less loaded mentor both pull the score down.
#[inline]
pub fn rank_formula(best_rank: u32, shared_count: usize, mentor_load: u32, policy: &MatchingPolicy) -> f64 {
    let spare_capacity = f64::from(policy.max_mentees) - f64::from(mentor_load);
    let denominator = f64::from(policy.max_interests) + f64::from(policy.max_mentees);

    f64::from(best_rank) - (shared_count as f64 + spare_capacity) / denominator
}

/// Score a pair from its shared interests and the mentor's current load
pub fn score_pair(shared: &[SharedInterest], mentor_load: u32, policy: &MatchingPolicy) -> f64 {
    let best_rank = best_mentee_rank(shared, policy.worst_ranking());
    rank_formula(best_rank, shared.len(), mentor_load, policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared(name: &str, mentee_rank: u32, mentor_rank: u32) -> SharedInterest {
        SharedInterest {
            name: name.to_string(),
            mentee_rank,
            mentor_rank,
        }
    }

    #[test]
    fn test_best_mentee_rank() {
        let interests = vec![shared("security", 2, 1), shared("ai", 1, 3)];
        assert_eq!(best_mentee_rank(&interests, 5), 1);
    }

    #[test]
    fn test_best_rank_defaults_to_worst() {
        assert_eq!(best_mentee_rank(&[], 5), 5);
    }

    #[test]
    fn test_rank_formula_values() {
        let policy = MatchingPolicy::default();

        // 1 - (1 + 5) / 10
        assert!((rank_formula(1, 1, 0, &policy) - 0.4).abs() < 1e-9);
        // 2 - (1 + 1) / 10
        assert!((rank_formula(2, 1, 4, &policy) - 1.8).abs() < 1e-9);
    }

    #[test]
    fn test_more_shared_interests_score_lower() {
        let policy = MatchingPolicy::default();
        let one = score_pair(&[shared("ai", 1, 1)], 2, &policy);
        let two = score_pair(&[shared("ai", 1, 1), shared("rust", 3, 2)], 2, &policy);
        assert!(two < one);
    }

    #[test]
    fn test_spare_capacity_scores_lower() {
        let policy = MatchingPolicy::default();
        let interests = vec![shared("ai", 2, 1)];
        assert!(score_pair(&interests, 0, &policy) < score_pair(&interests, 4, &policy));
    }

    #[test]
    fn test_adjustment_stays_within_bucket() {
        let policy = MatchingPolicy::default();
        for shared_count in 0..=policy.max_interests as usize {
            for load in 0..policy.max_mentees {
                let score = rank_formula(3, shared_count, load, &policy);
                assert!(score <= 3.0 && score >= 2.0, "score {} left bucket 3", score);
            }
        }
    }

    #[test]
    fn test_score_is_deterministic() {
        let policy = MatchingPolicy::default();
        let interests = vec![shared("ai", 1, 2), shared("security", 2, 1)];
        let first = score_pair(&interests, 3, &policy);
        let second = score_pair(&interests, 3, &policy);
        assert_eq!(first.to_bits(), second.to_bits());
    }
}
