pub mod capture;
pub mod client;
pub mod queue;
pub mod sync;

pub use client::ApiClient;
pub use queue::{OfflineQueue, QueueEntry};
pub use sync::{ItemSubmitter, Submission, SyncAgent, SyncOutcome, SyncResult};
