pub mod accumulator;
pub mod coordinator;

pub use accumulator::{is_final_event, Ingested, LogAccumulator, SessionState};
pub use coordinator::{LifecycleCoordinator, SessionUpdate, ViewerStatus};
