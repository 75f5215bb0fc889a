//! Core business logic abstractions

pub mod config;
pub mod deal;
pub mod error;
pub mod log;
pub mod repository;
pub mod stats;
pub mod store;

// Re-export main types for cleaner imports
pub use deal::{Deal, DealDraft, DealPatch, Stage};
pub use error::{AuthError, DealError};
pub use repository::{DealRepository, LoadStatus};
pub use stats::{StatisticsEngine, StatisticsSnapshot};
pub use store::{DealStore, Session, SessionProvider, User};
