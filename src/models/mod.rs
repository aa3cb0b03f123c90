// Model exports
pub mod domain;
pub mod flag;
pub mod responses;

pub use domain::{
    CommonInterestIndex, ExistingPairingIndex, Interest, MatchingPolicy, Mentee, Mentor, Person, Profile, Role,
    SharedInterest, UserId,
};
pub use flag::{MatchFlag, MatchStatus, RequestHandle};
pub use responses::{BatchReport, MatchStatusResponse};
