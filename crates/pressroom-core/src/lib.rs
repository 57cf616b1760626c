//! # Pressroom Core
//!
//! The domain layer of the publishing backend: the post publication state
//! machine, the scheduled publication runner, and the ports infrastructure
//! must implement. No infrastructure dependencies live here.

pub mod authoring;
pub mod domain;
pub mod error;
pub mod ports;
pub mod publication;
pub mod runner;

pub use error::{PublicationError, RepoError, RunnerError};
pub use publication::{Intent, ScheduleTime, transition};
pub use runner::{Outcome, PostOutcome, RunReport, ScheduledPublicationRunner};
