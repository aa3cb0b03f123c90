use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use validator::Validate;

/// Stable identifier of a user (mentor or mentee)
pub type UserId = String;

/// Which side of a pairing a user record is fetched for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Mentee,
    Mentor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Mentee => "mentee",
            Role::Mentor => "mentor",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ranked interest. Rank 1 is the highest priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Interest {
    #[validate(range(min = 1))]
    pub rank: u32,
    #[validate(length(min = 1))]
    pub name: String,
}

impl Interest {
    pub fn new(rank: u32, name: impl Into<String>) -> Self {
        Self {
            rank,
            name: name.into(),
        }
    }
}

/// Contact and placement data shared by mentors and mentees
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Profile {
    #[validate(length(min = 1))]
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub name: String,
    /// Business area; mentors are never matched inside their own department
    pub department: String,
    pub email: String,
    #[serde(default)]
    pub bio: Option<String>,
}

impl Profile {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, department: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            department: department.into(),
            email: String::new(),
            bio: None,
        }
    }
}

/// A profile together with its interests in priority order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub profile: Profile,
    pub interests: Vec<Interest>,
}

impl Person {
    /// Builds a person, ordering the interests by rank
    pub fn new(profile: Profile, mut interests: Vec<Interest>) -> Self {
        interests.sort_by_key(|interest| interest.rank);
        Self { profile, interests }
    }

    pub fn user_id(&self) -> &str {
        &self.profile.user_id
    }

    pub fn department(&self) -> &str {
        &self.profile.department
    }

    /// Check the interest list against the configured maximum.
    ///
    /// Every rank must fall in `[1, max_interests]` and there may be at most
    /// `max_interests` entries.
    pub fn check_interests(&self, max_interests: u32) -> Result<(), String> {
        if self.interests.len() > max_interests as usize {
            return Err(format!(
                "user {} has {} interests (max {})",
                self.user_id(),
                self.interests.len(),
                max_interests
            ));
        }

        for interest in &self.interests {
            interest
                .validate()
                .map_err(|e| format!("user {}: {}", self.user_id(), e))?;
            if interest.rank > max_interests {
                return Err(format!(
                    "user {}: interest '{}' has rank {} (max {})",
                    self.user_id(),
                    interest.name,
                    interest.rank,
                    max_interests
                ));
            }
        }

        Ok(())
    }
}

/// A user waiting to be matched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mentee {
    pub person: Person,
}

impl Mentee {
    pub fn new(person: Person) -> Self {
        Self { person }
    }

    pub fn user_id(&self) -> &str {
        self.person.user_id()
    }
}

/// A user offering mentorship, with the number of mentees already assigned
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mentor {
    pub person: Person,
    #[serde(rename = "menteeCount")]
    pub mentee_count: u32,
}

impl Mentor {
    pub fn new(person: Person, mentee_count: u32) -> Self {
        Self {
            person,
            mentee_count,
        }
    }

    pub fn user_id(&self) -> &str {
        self.person.user_id()
    }
}

/// An interest held by both sides of a pair, with each side's rank for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedInterest {
    pub name: String,
    #[serde(rename = "menteeRank")]
    pub mentee_rank: u32,
    #[serde(rename = "mentorRank")]
    pub mentor_rank: u32,
}

/// Shared interests keyed by mentee id, then mentor id.
///
/// Only pairs with at least one shared interest have an entry.
#[derive(Debug, Clone, Default)]
pub struct CommonInterestIndex {
    pairs: HashMap<UserId, HashMap<UserId, Vec<SharedInterest>>>,
}

impl CommonInterestIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the index from interest lists by matching interest names
    pub fn from_people<'a>(
        mentees: impl IntoIterator<Item = &'a Person>,
        mentors: impl IntoIterator<Item = &'a Person> + Clone,
    ) -> Self {
        let mut index = Self::new();
        for mentee in mentees {
            for mentor in mentors.clone() {
                for wanted in &mentee.interests {
                    if let Some(offered) = mentor.interests.iter().find(|i| i.name == wanted.name) {
                        index.insert(
                            mentee.user_id(),
                            mentor.user_id(),
                            SharedInterest {
                                name: wanted.name.clone(),
                                mentee_rank: wanted.rank,
                                mentor_rank: offered.rank,
                            },
                        );
                    }
                }
            }
        }
        index
    }

    pub fn insert(&mut self, mentee_id: &str, mentor_id: &str, shared: SharedInterest) {
        self.pairs
            .entry(mentee_id.to_string())
            .or_default()
            .entry(mentor_id.to_string())
            .or_default()
            .push(shared);
    }

    /// Shared interests for a pair; empty when the pair shares nothing
    pub fn get(&self, mentee_id: &str, mentor_id: &str) -> &[SharedInterest] {
        self.pairs
            .get(mentee_id)
            .and_then(|mentors| mentors.get(mentor_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of (mentee, mentor) pairs with at least one shared interest
    pub fn pair_count(&self) -> usize {
        self.pairs.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pair_count() == 0
    }

    /// Keep only the pairs whose mentee and mentor are both in the given sets
    pub fn restrict_to(mut self, mentee_ids: &HashSet<&str>, mentor_ids: &HashSet<&str>) -> Self {
        self.pairs.retain(|mentee, _| mentee_ids.contains(mentee.as_str()));
        for mentors in self.pairs.values_mut() {
            mentors.retain(|mentor, _| mentor_ids.contains(mentor.as_str()));
        }
        self.pairs.retain(|_, mentors| !mentors.is_empty());
        self
    }
}

/// Mentor/mentee pairs that already exist outside the current batch
#[derive(Debug, Clone, Default)]
pub struct ExistingPairingIndex {
    pairs: HashMap<UserId, HashSet<UserId>>,
}

impl ExistingPairingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mentee_id: impl Into<String>, mentor_id: impl Into<String>) {
        self.pairs
            .entry(mentee_id.into())
            .or_default()
            .insert(mentor_id.into());
    }

    pub fn contains(&self, mentee_id: &str, mentor_id: &str) -> bool {
        self.pairs
            .get(mentee_id)
            .is_some_and(|mentors| mentors.contains(mentor_id))
    }

    pub fn len(&self) -> usize {
        self.pairs.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<(UserId, UserId)> for ExistingPairingIndex {
    fn from_iter<T: IntoIterator<Item = (UserId, UserId)>>(iter: T) -> Self {
        let mut index = Self::new();
        for (mentee_id, mentor_id) in iter {
            index.insert(mentee_id, mentor_id);
        }
        index
    }
}

/// Batching and capacity policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingPolicy {
    /// Queue length that forces a flush on the next tick
    pub pool_limit: usize,
    /// Ticks after which a non-empty queue is flushed
    pub poll_limit: u32,
    pub tick_interval_ms: u64,
    /// Mentees a mentor may tutor at once
    pub max_mentees: u32,
    /// Interests a person may list
    pub max_interests: u32,
    /// Mentors returned per mentee
    pub max_matches: usize,
}

impl MatchingPolicy {
    /// Rank used when a pair has no shared interest
    pub fn worst_ranking(&self) -> u32 {
        self.max_interests
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for MatchingPolicy {
    fn default() -> Self {
        Self {
            pool_limit: 10,
            poll_limit: 3,
            tick_interval_ms: 500,
            max_mentees: 5,
            max_interests: 5,
            max_matches: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(id: &str, department: &str, interests: &[(u32, &str)]) -> Person {
        Person::new(
            Profile::new(id, format!("User {}", id), department),
            interests.iter().map(|(rank, name)| Interest::new(*rank, *name)).collect(),
        )
    }

    #[test]
    fn test_person_orders_interests_by_rank() {
        let p = person("1", "eng", &[(3, "rust"), (1, "ai"), (2, "security")]);
        let names: Vec<&str> = p.interests.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["ai", "security", "rust"]);
    }

    #[test]
    fn test_check_interests_rejects_out_of_range_rank() {
        let p = person("1", "eng", &[(6, "ai")]);
        assert!(p.check_interests(5).is_err());

        let p = person("1", "eng", &[(0, "ai")]);
        assert!(p.check_interests(5).is_err());

        let p = person("1", "eng", &[(1, "ai"), (5, "rust")]);
        assert!(p.check_interests(5).is_ok());
    }

    #[test]
    fn test_check_interests_rejects_too_many() {
        let p = person("1", "eng", &[(1, "a"), (2, "b"), (3, "c")]);
        assert!(p.check_interests(2).is_err());
    }

    #[test]
    fn test_common_interest_index_from_people() {
        let mentee = person("m", "eng", &[(1, "ai"), (2, "security")]);
        let a = person("a", "ops", &[(1, "ai")]);
        let b = person("b", "ops", &[(1, "gardening")]);

        let index = CommonInterestIndex::from_people([&mentee], [&a, &b]);

        assert_eq!(index.pair_count(), 1);
        assert_eq!(
            index.get("m", "a"),
            &[SharedInterest {
                name: "ai".to_string(),
                mentee_rank: 1,
                mentor_rank: 1,
            }]
        );
        assert!(index.get("m", "b").is_empty());
        assert!(index.get("nobody", "a").is_empty());
    }

    #[test]
    fn test_restrict_to_drops_foreign_pairs() {
        let mut index = CommonInterestIndex::new();
        let shared = SharedInterest {
            name: "ai".to_string(),
            mentee_rank: 1,
            mentor_rank: 1,
        };
        index.insert("m1", "a", shared.clone());
        index.insert("m1", "b", shared.clone());
        index.insert("m2", "a", shared);

        let mentees: HashSet<&str> = ["m1"].into_iter().collect();
        let mentors: HashSet<&str> = ["a"].into_iter().collect();
        let index = index.restrict_to(&mentees, &mentors);

        assert_eq!(index.pair_count(), 1);
        assert!(!index.get("m1", "a").is_empty());
    }

    #[test]
    fn test_default_policy() {
        let policy = MatchingPolicy::default();
        assert_eq!(policy.pool_limit, 10);
        assert_eq!(policy.poll_limit, 3);
        assert_eq!(policy.worst_ranking(), 5);
        assert_eq!(policy.tick_interval(), std::time::Duration::from_millis(500));
    }

    #[test]
    fn test_existing_pairings() {
        let index: ExistingPairingIndex = vec![
            ("m1".to_string(), "a".to_string()),
            ("m1".to_string(), "b".to_string()),
        ]
        .into_iter()
        .collect();

        assert_eq!(index.len(), 2);
        assert!(index.contains("m1", "a"));
        assert!(!index.contains("a", "m1"));
        assert!(!index.contains("m2", "a"));
    }
}
