//! Discourse thread ingestion.
//!
//! Resolves a thread URL, pulls the post stream in sequential batches,
//! normalizes every post and looks up who liked it.

pub mod api;
mod error;
pub mod fetcher;
pub mod normalize;
pub mod progress;
pub mod session;
pub mod url;

pub use error::IngestError;
pub use fetcher::{FetchSettings, FetchedThread, LikeFetchFailure, ThreadFetcher};
pub use normalize::normalize_post;
pub use progress::ProgressLog;
pub use session::{RunSlot, RunTicket};
pub use self::url::{resolve_thread_url, ThreadLocator};
