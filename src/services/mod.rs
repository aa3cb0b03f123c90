// Service exports
pub mod memory;
pub mod postgres;
pub mod repository;

pub use memory::{FailurePoint, InMemoryRepository};
pub use postgres::PostgresRepository;
pub use repository::{AvailableMentor, CandidateRepository, RepositoryError};
