//! AEGIS Core — domain models, repository contracts, and the injectable
//! collaborator traits (clock, notification sink) shared by all crates.

pub mod clock;
pub mod error;
pub mod models;
pub mod notify;
pub mod repository;

pub use clock::{Clock, SystemClock};
pub use error::{AegisError, AegisResult};
pub use notify::{Notification, NotificationSink};
