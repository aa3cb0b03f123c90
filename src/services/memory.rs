//! In-memory candidate repository for tests, benches and demos. No database.

use crate::models::{CommonInterestIndex, ExistingPairingIndex, Interest, Person, Profile, Role, UserId};
use crate::services::repository::{AvailableMentor, CandidateRepository, RepositoryError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Repository operation that can be made to fail on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    MenteeProfile,
    AvailableMentors,
    CommonInterests,
    ExistingPairings,
}

#[derive(Debug, Clone)]
struct StoredMentor {
    profile: Profile,
    mentee_count: u32,
}

/// Candidate repository backed by plain collections.
///
/// Mentors are returned in insertion order so batches are reproducible.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    mentees: Vec<Profile>,
    mentors: Vec<StoredMentor>,
    interests: HashMap<(UserId, Role), Vec<Interest>>,
    pairings: Vec<(UserId, UserId)>,
    failure: Mutex<Option<FailurePoint>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mentee with interests given as `(rank, name)` pairs
    pub fn with_mentee(mut self, profile: Profile, interests: &[(u32, &str)]) -> Self {
        self.store_interests(&profile.user_id, Role::Mentee, interests);
        self.mentees.push(profile);
        self
    }

    /// Add a mentor already tutoring `mentee_count` mentees
    pub fn with_mentor(mut self, profile: Profile, interests: &[(u32, &str)], mentee_count: u32) -> Self {
        self.store_interests(&profile.user_id, Role::Mentor, interests);
        self.mentors.push(StoredMentor {
            profile,
            mentee_count,
        });
        self
    }

    pub fn with_pairing(mut self, mentee_id: &str, mentor_id: &str) -> Self {
        self.pairings.push((mentee_id.to_string(), mentor_id.to_string()));
        self
    }

    pub fn with_failure(self, point: FailurePoint) -> Self {
        Self {
            failure: Mutex::new(Some(point)),
            ..self
        }
    }

    /// Change the injected failure while the repository is in use
    pub async fn set_failure(&self, point: Option<FailurePoint>) {
        *self.failure.lock().await = point;
    }

    fn store_interests(&mut self, user_id: &str, role: Role, interests: &[(u32, &str)]) {
        if interests.is_empty() {
            return;
        }
        let interests = interests
            .iter()
            .map(|(rank, name)| Interest::new(*rank, *name))
            .collect();
        self.interests.insert((user_id.to_string(), role), interests);
    }

    async fn check(&self, point: FailurePoint) -> Result<(), RepositoryError> {
        if *self.failure.lock().await == Some(point) {
            return Err(RepositoryError::Unavailable(format!("injected failure at {:?}", point)));
        }
        Ok(())
    }

    fn people(&self, role: Role) -> Vec<Person> {
        let profiles: Vec<&Profile> = match role {
            Role::Mentee => self.mentees.iter().collect(),
            Role::Mentor => self.mentors.iter().map(|m| &m.profile).collect(),
        };
        profiles
            .into_iter()
            .filter_map(|profile| {
                self.interests
                    .get(&(profile.user_id.clone(), role))
                    .map(|interests| Person::new(profile.clone(), interests.clone()))
            })
            .collect()
    }
}

#[async_trait]
impl CandidateRepository for InMemoryRepository {
    async fn fetch_interests(&self, user_id: &str, role: Role) -> Result<Vec<Interest>, RepositoryError> {
        let mut interests = self
            .interests
            .get(&(user_id.to_string(), role))
            .cloned()
            .ok_or_else(|| RepositoryError::InterestsNotFound {
                user_id: user_id.to_string(),
                role,
            })?;
        interests.sort_by_key(|i| i.rank);
        Ok(interests)
    }

    async fn fetch_mentee_profile(&self, mentee_id: &str) -> Result<Profile, RepositoryError> {
        self.check(FailurePoint::MenteeProfile).await?;
        self.mentees
            .iter()
            .find(|p| p.user_id == mentee_id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("mentee {}", mentee_id)))
    }

    async fn fetch_available_mentors(&self, max_mentees: u32) -> Result<Vec<AvailableMentor>, RepositoryError> {
        self.check(FailurePoint::AvailableMentors).await?;
        Ok(self
            .mentors
            .iter()
            .filter(|m| m.mentee_count < max_mentees)
            .map(|m| AvailableMentor {
                profile: m.profile.clone(),
                mentee_count: m.mentee_count,
            })
            .collect())
    }

    async fn fetch_common_interest_index(&self) -> Result<CommonInterestIndex, RepositoryError> {
        self.check(FailurePoint::CommonInterests).await?;
        let mentees = self.people(Role::Mentee);
        let mentors = self.people(Role::Mentor);
        Ok(CommonInterestIndex::from_people(&mentees, &mentors))
    }

    async fn fetch_existing_pairings(&self) -> Result<ExistingPairingIndex, RepositoryError> {
        self.check(FailurePoint::ExistingPairings).await?;
        Ok(self.pairings.iter().cloned().collect())
    }
}
