//! Mentor Match - batched mentor/mentee matching engine
//!
//! Mentees are queued and matched in batches against every mentor with spare
//! capacity. Each mentee receives up to five mentors ranked by shared
//! interests and mentor load.

pub mod config;
pub mod core;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use crate::core::{AssignmentEngine, Batch, MatchingEngine};
pub use models::{MatchStatus, MatchStatusResponse, MatchingPolicy, RequestHandle};
pub use services::{CandidateRepository, InMemoryRepository, PostgresRepository, RepositoryError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let engine = AssignmentEngine::new(MatchingPolicy::default());
        assert_eq!(engine.policy().max_matches, 5);
    }
}
