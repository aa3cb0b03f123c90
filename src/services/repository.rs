use crate::models::{CommonInterestIndex, ExistingPairingIndex, Interest, Profile, Role, UserId};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur while gathering the data for a batch
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Could not find interests for {role} {user_id}")]
    InterestsNotFound { user_id: UserId, role: Role },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("SQLx error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Repository unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    /// The only error a batch recovers from: it fails one mentee, not the batch
    pub fn is_interests_not_found(&self) -> bool {
        matches!(self, RepositoryError::InterestsNotFound { .. })
    }
}

/// A mentor eligible for this batch, before interests are attached
#[derive(Debug, Clone)]
pub struct AvailableMentor {
    pub profile: Profile,
    pub mentee_count: u32,
}

/// Source of mentor/mentee records for the matching engine.
///
/// The engine calls these once per batch, sequentially.
#[async_trait]
pub trait CandidateRepository: Send + Sync {
    /// Interests of a user in priority order.
    ///
    /// Fails with `InterestsNotFound` when the user has none recorded.
    async fn fetch_interests(&self, user_id: &str, role: Role) -> Result<Vec<Interest>, RepositoryError>;

    async fn fetch_mentee_profile(&self, mentee_id: &str) -> Result<Profile, RepositoryError>;

    /// Mentors currently tutoring fewer than `max_mentees` mentees
    async fn fetch_available_mentors(&self, max_mentees: u32) -> Result<Vec<AvailableMentor>, RepositoryError>;

    /// Shared interests for every mentee/mentor pair that has any
    async fn fetch_common_interest_index(&self) -> Result<CommonInterestIndex, RepositoryError>;

    async fn fetch_existing_pairings(&self) -> Result<ExistingPairingIndex, RepositoryError>;

    /// Interests for many users at once. Users without interests are absent
    /// from the returned map.
    async fn fetch_interests_bulk(
        &self,
        user_ids: &[UserId],
        role: Role,
    ) -> Result<HashMap<UserId, Vec<Interest>>, RepositoryError> {
        let mut out = HashMap::with_capacity(user_ids.len());
        for user_id in user_ids {
            match self.fetch_interests(user_id, role).await {
                Ok(interests) => {
                    out.insert(user_id.clone(), interests);
                }
                Err(e) if e.is_interests_not_found() => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }
}
