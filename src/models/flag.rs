use crate::models::domain::UserId;
use crate::services::RepositoryError;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Lifecycle of a single match request
#[derive(Debug, Clone)]
pub enum MatchStatus {
    /// Waiting in the queue or inside a running batch
    Pending,
    /// Batch finished; mentors ordered best first (possibly empty)
    Matched { mentor_ids: Vec<UserId> },
    /// Batch could not produce a result for this mentee
    Failed { error: Arc<RepositoryError> },
}

impl MatchStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, MatchStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Matched { .. } => "matched",
            MatchStatus::Failed { .. } => "failed",
        }
    }

    pub fn mentor_ids(&self) -> Option<&[UserId]> {
        match self {
            MatchStatus::Matched { mentor_ids } => Some(mentor_ids),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Arc<RepositoryError>> {
        match self {
            MatchStatus::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// Caller-side reference to a submitted request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestHandle {
    request_id: Uuid,
    mentee_id: UserId,
}

impl RequestHandle {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn mentee_id(&self) -> &str {
        &self.mentee_id
    }
}

/// Tracked state of one mentee's request.
///
/// The status moves out of `Pending` exactly once.
#[derive(Debug, Clone)]
pub struct MatchFlag {
    pub request_id: Uuid,
    pub mentee_id: UserId,
    pub created_at: DateTime<Utc>,
    status: MatchStatus,
    completed_at: Option<DateTime<Utc>>,
}

impl MatchFlag {
    pub fn new(mentee_id: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            mentee_id: mentee_id.into(),
            created_at: Utc::now(),
            status: MatchStatus::Pending,
            completed_at: None,
        }
    }

    pub fn handle(&self) -> RequestHandle {
        RequestHandle {
            request_id: self.request_id,
            mentee_id: self.mentee_id.clone(),
        }
    }

    pub fn status(&self) -> &MatchStatus {
        &self.status
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn is_set(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move the flag to a terminal status.
    ///
    /// Returns `false` without touching the flag if it is already terminal or
    /// if `status` is `Pending`.
    pub fn resolve(&mut self, status: MatchStatus) -> bool {
        if self.is_set() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        self.completed_at = Some(Utc::now());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_flag_is_pending() {
        let flag = MatchFlag::new("m1");
        assert!(!flag.is_set());
        assert!(flag.completed_at().is_none());
        assert_eq!(flag.status().as_str(), "pending");
        assert_eq!(flag.handle().mentee_id(), "m1");
        assert_eq!(flag.handle().request_id(), flag.request_id);
    }

    #[test]
    fn test_resolve_is_one_shot() {
        let mut flag = MatchFlag::new("m1");

        assert!(flag.resolve(MatchStatus::Matched {
            mentor_ids: vec!["a".to_string()],
        }));
        assert!(flag.completed_at().is_some());

        let second = flag.resolve(MatchStatus::Failed {
            error: Arc::new(RepositoryError::Unavailable("late".to_string())),
        });
        assert!(!second);
        assert_eq!(flag.status().mentor_ids(), Some(&["a".to_string()][..]));
    }

    #[test]
    fn test_resolve_rejects_pending() {
        let mut flag = MatchFlag::new("m1");
        assert!(!flag.resolve(MatchStatus::Pending));
        assert!(!flag.is_set());
    }
}
