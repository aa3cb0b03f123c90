//! Batching engine: queues match requests, flushes them into batches on a
//! periodic tick, gathers candidates from the repository once per batch, runs
//! the assignment and publishes every flag in the batch at once.
//!
//! Only one batch runs at a time. Requests submitted while a batch is running
//! wait in the queue for the next flush.

use crate::core::assignment::{AssignmentEngine, Batch};
use crate::core::queue::{BatchTrigger, QueuedRequest, RequestQueue};
use crate::models::{
    BatchReport, MatchFlag, MatchStatus, MatchingPolicy, Mentee, Mentor, Person, RequestHandle, Role, UserId,
};
use crate::services::{CandidateRepository, RepositoryError};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Per-batch result before it is published to the flags
struct RosterOutcome {
    statuses: Vec<(Uuid, MatchStatus)>,
    mentors: usize,
    rounds: usize,
    considered_pairs: usize,
}

pub struct MatchingEngine {
    repository: Arc<dyn CandidateRepository>,
    assigner: AssignmentEngine,
    policy: MatchingPolicy,
    queue: Mutex<RequestQueue>,
    flags: RwLock<HashMap<Uuid, MatchFlag>>,
    /// Held for the whole of a batch run
    in_flight: Mutex<()>,
}

impl MatchingEngine {
    pub fn new(repository: Arc<dyn CandidateRepository>, policy: MatchingPolicy) -> Self {
        Self {
            repository,
            assigner: AssignmentEngine::new(policy),
            policy,
            queue: Mutex::new(RequestQueue::new(BatchTrigger::from_policy(&policy))),
            flags: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> &MatchingPolicy {
        &self.policy
    }

    /// Queue a mentee for matching
    pub async fn submit(&self, mentee_id: impl Into<String>) -> RequestHandle {
        let flag = MatchFlag::new(mentee_id);
        let handle = flag.handle();

        // The flag exists before the request can be drained into a batch
        self.flags.write().await.insert(flag.request_id, flag);
        let queued = {
            let mut queue = self.queue.lock().await;
            queue.enqueue(handle.clone());
            queue.len()
        };

        debug!(
            request_id = %handle.request_id(),
            mentee = handle.mentee_id(),
            queued,
            "Match request queued"
        );

        handle
    }

    /// Current status of a request; `None` if the handle is unknown
    pub async fn poll_status(&self, handle: &RequestHandle) -> Option<MatchStatus> {
        self.flags
            .read()
            .await
            .get(&handle.request_id())
            .map(|flag| flag.status().clone())
    }

    /// Poll at the tick interval until the request leaves `Pending`.
    ///
    /// There is no timeout: if batches stop running this waits forever.
    pub async fn wait_for(&self, handle: &RequestHandle) -> Option<MatchStatus> {
        loop {
            match self.poll_status(handle).await {
                Some(MatchStatus::Pending) => tokio::time::sleep(self.tick_period()).await,
                other => return other,
            }
        }
    }

    /// Drop a finished request's flag. Pending flags are kept.
    pub async fn forget(&self, handle: &RequestHandle) -> bool {
        let mut flags = self.flags.write().await;
        match flags.get(&handle.request_id()) {
            Some(flag) if flag.is_set() => flags.remove(&handle.request_id()).is_some(),
            _ => false,
        }
    }

    /// Number of requests waiting for the next batch
    pub async fn queued(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// One trigger tick. Runs a batch if the trigger fires.
    ///
    /// A tick that arrives while a batch is still running is skipped and does
    /// not advance the poll counter.
    pub async fn tick(&self) -> Option<BatchReport> {
        let Ok(_running) = self.in_flight.try_lock() else {
            debug!("Batch still running, skipping tick");
            return None;
        };

        let roster = self.queue.lock().await.poll()?;
        Some(self.run_batch(roster).await)
    }

    /// Run a batch with whatever is queued, without waiting for the trigger
    pub async fn flush_now(&self) -> Option<BatchReport> {
        let _running = self.in_flight.lock().await;

        let roster = self.queue.lock().await.drain();
        if roster.is_empty() {
            return None;
        }
        Some(self.run_batch(roster).await)
    }

    /// Start ticking on the policy's interval in a background task
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.tick_period());
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            interval.tick().await;

            info!(
                tick_ms = self.policy.tick_interval_ms,
                pool_limit = self.policy.pool_limit,
                poll_limit = self.policy.poll_limit,
                "Matching engine started"
            );

            loop {
                interval.tick().await;
                self.tick().await;
            }
        })
    }

    fn tick_period(&self) -> Duration {
        self.policy.tick_interval().max(Duration::from_millis(1))
    }

    async fn run_batch(&self, roster: Vec<QueuedRequest>) -> BatchReport {
        let batch_id = Uuid::new_v4();
        info!(batch_id = %batch_id, size = roster.len(), "Starting batch");

        let mut report = BatchReport {
            batch_id: batch_id.to_string(),
            size: roster.len(),
            matched: 0,
            failed: 0,
            mentors: 0,
            rounds: 0,
            considered_pairs: 0,
            error: None,
        };

        let statuses = match self.match_roster(&roster).await {
            Ok(outcome) => {
                report.mentors = outcome.mentors;
                report.rounds = outcome.rounds;
                report.considered_pairs = outcome.considered_pairs;
                outcome.statuses
            }
            Err(e) => {
                error!(batch_id = %batch_id, error = %e, "Batch failed, failing all {} requests", roster.len());
                report.error = Some(e.to_string());
                let error = Arc::new(e);
                roster
                    .iter()
                    .map(|request| {
                        (
                            request.handle.request_id(),
                            MatchStatus::Failed {
                                error: Arc::clone(&error),
                            },
                        )
                    })
                    .collect()
            }
        };

        report.matched = statuses
            .iter()
            .filter(|(_, s)| matches!(s, MatchStatus::Matched { .. }))
            .count();
        report.failed = statuses.len() - report.matched;

        self.publish(statuses).await;

        info!(
            batch_id = %batch_id,
            size = report.size,
            matched = report.matched,
            failed = report.failed,
            mentors = report.mentors,
            rounds = report.rounds,
            considered_pairs = report.considered_pairs,
            "Batch complete"
        );

        report
    }

    /// Resolve every flag of a batch under one write lock
    async fn publish(&self, statuses: Vec<(Uuid, MatchStatus)>) {
        let mut flags = self.flags.write().await;
        for (request_id, status) in statuses {
            match flags.get_mut(&request_id) {
                Some(flag) => {
                    if !flag.resolve(status) {
                        warn!(request_id = %request_id, "Flag already resolved, keeping first result");
                    }
                }
                None => warn!(request_id = %request_id, "No flag for request"),
            }
        }
    }

    /// Gather the batch from the repository and run the assignment.
    ///
    /// Any error other than a mentee without interests aborts the batch.
    async fn match_roster(&self, roster: &[QueuedRequest]) -> Result<RosterOutcome, RepositoryError> {
        let max_interests = self.policy.max_interests;

        // Mentees
        let mentee_ids: Vec<UserId> = roster.iter().map(|r| r.mentee_id().to_string()).collect();
        let mut profiles = Vec::with_capacity(roster.len());
        for mentee_id in &mentee_ids {
            profiles.push(self.repository.fetch_mentee_profile(mentee_id).await?);
        }
        let mentee_interests = self
            .repository
            .fetch_interests_bulk(&mentee_ids, Role::Mentee)
            .await?;

        let mut statuses = Vec::with_capacity(roster.len());
        let mut members = Vec::with_capacity(roster.len());
        let mut mentees = Vec::with_capacity(roster.len());
        for (request, profile) in roster.iter().zip(profiles) {
            let request_id = request.handle.request_id();
            match mentee_interests.get(request.mentee_id()) {
                Some(interests) if !interests.is_empty() => {
                    let person = Person::new(profile, interests.clone());
                    person
                        .check_interests(max_interests)
                        .map_err(RepositoryError::InvalidData)?;
                    members.push(request_id);
                    mentees.push(Mentee::new(person));
                }
                _ => {
                    warn!(mentee = request.mentee_id(), "Mentee has no interests, failing request");
                    let error = RepositoryError::InterestsNotFound {
                        user_id: request.mentee_id().to_string(),
                        role: Role::Mentee,
                    };
                    statuses.push((
                        request_id,
                        MatchStatus::Failed {
                            error: Arc::new(error),
                        },
                    ));
                }
            }
        }

        // Mentors with spare capacity
        let available = self
            .repository
            .fetch_available_mentors(self.policy.max_mentees)
            .await?;
        let mentor_ids: Vec<UserId> = available.iter().map(|m| m.profile.user_id.clone()).collect();
        let mut mentor_interests = self
            .repository
            .fetch_interests_bulk(&mentor_ids, Role::Mentor)
            .await?;

        let mut mentors = Vec::with_capacity(available.len());
        for candidate in available {
            match mentor_interests.remove(&candidate.profile.user_id) {
                Some(interests) if !interests.is_empty() => {
                    let person = Person::new(candidate.profile, interests);
                    person
                        .check_interests(max_interests)
                        .map_err(RepositoryError::InvalidData)?;
                    mentors.push(Mentor::new(person, candidate.mentee_count));
                }
                _ => debug!(mentor = %candidate.profile.user_id, "Skipping mentor without interests"),
            }
        }

        // Indexes, restricted to this batch
        let common_interests = {
            let index = self.repository.fetch_common_interest_index().await?;
            let mentee_set: HashSet<&str> = mentees.iter().map(Mentee::user_id).collect();
            let mentor_set: HashSet<&str> = mentors.iter().map(Mentor::user_id).collect();
            index.restrict_to(&mentee_set, &mentor_set)
        };
        let existing_pairings = self.repository.fetch_existing_pairings().await?;

        let batch = Batch {
            mentees,
            mentors,
            common_interests,
            existing_pairings,
        };
        let outcome = self.assigner.run(&batch);

        for (request_id, assignment) in members.into_iter().zip(outcome.assignments) {
            statuses.push((
                request_id,
                MatchStatus::Matched {
                    mentor_ids: assignment.mentor_ids(),
                },
            ));
        }

        Ok(RosterOutcome {
            statuses,
            mentors: batch.mentors.len(),
            rounds: outcome.rounds,
            considered_pairs: outcome.considered_pairs,
        })
    }
}
