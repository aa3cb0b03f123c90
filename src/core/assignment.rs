use crate::core::ranking::{best_mentee_rank, score_pair};
use crate::models::{CommonInterestIndex, ExistingPairingIndex, MatchingPolicy, Mentee, Mentor, UserId};
use std::collections::HashSet;

/// Everything one assignment run reads. Built once per batch.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub mentees: Vec<Mentee>,
    pub mentors: Vec<Mentor>,
    pub common_interests: CommonInterestIndex,
    pub existing_pairings: ExistingPairingIndex,
}

impl Batch {
    /// Number of (mentee, mentor) pairs the run has to consider
    pub fn pair_count(&self) -> usize {
        self.mentees.len() * self.mentors.len()
    }
}

/// A mentor held for a mentee together with the pair's score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMentor {
    pub mentor_id: UserId,
    pub score: f64,
}

/// Final result for one mentee, best mentor first
#[derive(Debug, Clone)]
pub struct MenteeAssignment {
    pub mentee_id: UserId,
    pub mentors: Vec<ScoredMentor>,
}

impl MenteeAssignment {
    pub fn mentor_ids(&self) -> Vec<UserId> {
        self.mentors.iter().map(|m| m.mentor_id.clone()).collect()
    }
}

/// Result of one assignment run
#[derive(Debug, Clone)]
pub struct AssignmentOutcome {
    /// One entry per batch mentee, in batch order
    pub assignments: Vec<MenteeAssignment>,
    pub considered_pairs: usize,
    pub rounds: usize,
}

/// Mentor ids already evaluated for one mentee in the current run
#[derive(Debug, Clone, Default)]
pub struct ConsideredSet {
    mentors: HashSet<UserId>,
}

impl ConsideredSet {
    pub fn contains(&self, mentor_id: &str) -> bool {
        self.mentors.contains(mentor_id)
    }

    /// Returns `true` if the mentor was not yet considered
    pub fn insert(&mut self, mentor_id: &str) -> bool {
        self.mentors.insert(mentor_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.mentors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mentors.is_empty()
    }
}

struct MenteeState<'a> {
    mentee: &'a Mentee,
    held: Vec<ScoredMentor>,
    considered: ConsideredSet,
}

impl<'a> MenteeState<'a> {
    fn new(mentee: &'a Mentee) -> Self {
        Self {
            mentee,
            held: Vec::new(),
            considered: ConsideredSet::default(),
        }
    }

    /// Hold the candidate if there is room or it beats the worst held mentor
    fn offer(&mut self, candidate: ScoredMentor, capacity: usize) -> bool {
        if self.held.len() < capacity {
            self.held.push(candidate);
            return true;
        }

        let Some((worst_idx, worst)) = self
            .held
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.score.total_cmp(&b.1.score))
        else {
            return false;
        };

        if candidate.score < worst.score {
            self.held[worst_idx] = candidate;
            true
        } else {
            false
        }
    }
}

/// Round-based greedy assignment of mentors to a batch of mentees.
///
/// Each round every mentor proposes to the unconsidered mentee that ranks
/// their shared interests highest. Mentees keep at most `max_matches`
/// mentors, evicting the worst score when a better proposal arrives. The run
/// ends once every (mentee, mentor) pair has been considered exactly once.
#[derive(Debug, Clone)]
pub struct AssignmentEngine {
    policy: MatchingPolicy,
}

impl AssignmentEngine {
    pub fn new(policy: MatchingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &MatchingPolicy {
        &self.policy
    }

    pub fn run(&self, batch: &Batch) -> AssignmentOutcome {
        let total = batch.pair_count();
        let mut states: Vec<MenteeState<'_>> = batch.mentees.iter().map(MenteeState::new).collect();
        let mut considered = 0;
        let mut rounds = 0;

        while considered < total {
            rounds += 1;
            let before = considered;

            for mentor in &batch.mentors {
                considered += self.propose(mentor, &mut states, batch);
            }

            if considered == before {
                tracing::warn!(
                    considered,
                    total,
                    "Assignment made no progress in round {}, stopping",
                    rounds
                );
                break;
            }
        }

        tracing::debug!(
            mentees = batch.mentees.len(),
            mentors = batch.mentors.len(),
            considered,
            rounds,
            "Assignment converged"
        );

        let assignments = states
            .into_iter()
            .map(|state| {
                let mut mentors = state.held;
                // Stable: equal scores keep the order they were accepted in
                mentors.sort_by(|a, b| a.score.total_cmp(&b.score));
                MenteeAssignment {
                    mentee_id: state.mentee.user_id().to_string(),
                    mentors,
                }
            })
            .collect();

        AssignmentOutcome {
            assignments,
            considered_pairs: considered,
            rounds,
        }
    }

    /// Pairs that may never be matched regardless of interests
    fn is_excluded(mentee: &Mentee, mentor: &Mentor, pairings: &ExistingPairingIndex) -> bool {
        mentee.person.department() == mentor.person.department()
            || mentee.user_id() == mentor.user_id()
            || pairings.contains(mentee.user_id(), mentor.user_id())
    }

    /// One mentor's turn in a round. Returns the number of pairs newly
    /// marked as considered.
    fn propose(&self, mentor: &Mentor, states: &mut [MenteeState<'_>], batch: &Batch) -> usize {
        let mentor_id = mentor.user_id();
        let worst = self.policy.worst_ranking();
        let mut newly_considered = 0;
        // (mentee-side rank, index into states)
        let mut best: Option<(u32, usize)> = None;

        for (idx, state) in states.iter_mut().enumerate() {
            if state.considered.contains(mentor_id) {
                continue;
            }

            if Self::is_excluded(state.mentee, mentor, &batch.existing_pairings) {
                if state.considered.insert(mentor_id) {
                    newly_considered += 1;
                }
                continue;
            }

            let shared = batch.common_interests.get(state.mentee.user_id(), mentor_id);
            if shared.is_empty() {
                if state.considered.insert(mentor_id) {
                    newly_considered += 1;
                }
                continue;
            }

            let rank = best_mentee_rank(shared, worst);
            if best.map_or(true, |(best_rank, _)| rank < best_rank) {
                best = Some((rank, idx));
            }
        }

        if let Some((_, idx)) = best {
            let state = &mut states[idx];
            if state.considered.insert(mentor_id) {
                newly_considered += 1;
            }

            let shared = batch.common_interests.get(state.mentee.user_id(), mentor_id);
            let score = score_pair(shared, mentor.mentee_count, &self.policy);
            let accepted = state.offer(
                ScoredMentor {
                    mentor_id: mentor_id.to_string(),
                    score,
                },
                self.policy.max_matches,
            );

            tracing::trace!(
                mentor = mentor_id,
                mentee = state.mentee.user_id(),
                score,
                accepted,
                "Mentor proposed"
            );
        }

        newly_considered
    }
}

impl Default for AssignmentEngine {
    fn default() -> Self {
        Self::new(MatchingPolicy::default())
    }
}
