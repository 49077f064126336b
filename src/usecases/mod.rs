//! Application use cases. Orchestrate domain logic via ports.

pub mod auth_service;
pub mod dispatcher;
pub mod engine;
pub mod forward_service;
pub mod poll_service;
pub mod seen_store;

pub use auth_service::AuthService;
pub use dispatcher::{DispatchTally, Dispatcher, NotificationResult};
pub use engine::{Batch, BaselinePolicy, CycleReport, EngineStatus, NotificationEngine};
pub use forward_service::ForwardService;
pub use poll_service::PollService;
pub use seen_store::SeenStore;
