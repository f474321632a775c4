//! Domain layer: entities and business rules
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod auth;
pub mod entities;
pub mod error;
pub mod report;
pub mod wipe;

pub use auth::AuthorizationGate;
pub use entities::*;
pub use error::DomainError;
pub use report::{JobReport, TestCase};
pub use wipe::{Transcript, WipeOutcome, WipeStage, WipeState, WipeStep};
