use serde::{Deserialize, Serialize};
use crate::models::flag::{MatchFlag, MatchStatus, RequestHandle};

/// Status of a match request as reported to external callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchStatusResponse {
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(rename = "menteeId")]
    pub mentee_id: String,
    pub status: String,
    #[serde(rename = "mentorIds", skip_serializing_if = "Option::is_none")]
    pub mentor_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MatchStatusResponse {
    pub fn new(handle: &RequestHandle, status: &MatchStatus) -> Self {
        Self {
            request_id: handle.request_id().to_string(),
            mentee_id: handle.mentee_id().to_string(),
            status: status.as_str().to_string(),
            mentor_ids: status.mentor_ids().map(<[String]>::to_vec),
            error: status.error().map(|e| e.to_string()),
        }
    }
}

impl From<&MatchFlag> for MatchStatusResponse {
    fn from(flag: &MatchFlag) -> Self {
        Self::new(&flag.handle(), flag.status())
    }
}

/// Summary of one processed batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    #[serde(rename = "batchId")]
    pub batch_id: String,
    pub size: usize,
    pub matched: usize,
    pub failed: usize,
    pub mentors: usize,
    pub rounds: usize,
    #[serde(rename = "consideredPairs")]
    pub considered_pairs: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::RepositoryError;
    use std::sync::Arc;

    #[test]
    fn test_matched_response_json() {
        let mut flag = MatchFlag::new("m1");
        flag.resolve(MatchStatus::Matched {
            mentor_ids: vec!["a".to_string(), "c".to_string()],
        });

        let json = serde_json::to_value(MatchStatusResponse::from(&flag)).unwrap();
        assert_eq!(json["menteeId"], "m1");
        assert_eq!(json["status"], "matched");
        assert_eq!(json["mentorIds"], serde_json::json!(["a", "c"]));
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_failed_response_json() {
        let mut flag = MatchFlag::new("m1");
        flag.resolve(MatchStatus::Failed {
            error: Arc::new(RepositoryError::Unavailable("db down".to_string())),
        });

        let json = serde_json::to_value(MatchStatusResponse::from(&flag)).unwrap();
        assert_eq!(json["status"], "failed");
        assert!(json["error"].as_str().unwrap().contains("db down"));
        assert!(json.get("mentorIds").is_none());
    }
}
