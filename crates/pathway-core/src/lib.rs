pub mod api;
pub mod config;
pub mod error;
pub mod event;
pub mod traits;
pub mod types;

pub use config::PathwayConfig;
pub use error::{PathwayError, Result};
pub use event::{EventBus, JourneySubscription};
pub use types::*;
