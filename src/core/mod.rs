// Core algorithm exports
pub mod assignment;
pub mod engine;
pub mod queue;
pub mod ranking;

pub use assignment::{AssignmentEngine, AssignmentOutcome, Batch, ConsideredSet, MenteeAssignment, ScoredMentor};
pub use engine::MatchingEngine;
pub use queue::{BatchTrigger, QueuedRequest, RequestQueue};
pub use ranking::{best_mentee_rank, rank_formula, score_pair};
