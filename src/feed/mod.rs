//! Paginated feed loading.
//!
//! - [`filter`] - `FilterState` and the search/category query derivation
//! - [`controller`] - the generation-guarded pagination state machine
//! - [`loader`] - runs fetch tickets on tokio tasks and reports back over a channel
//!
//! # Example
//!
//! ```ignore
//! let mut controller = FeedController::default();
//! if let Some(ticket) = controller.reset(FilterState::new("rust", None), None) {
//!     spawn_fetch(api.clone(), ticket, tx.clone());
//! }
//! // later, on the owning task:
//! let FeedEvent::PageLoaded { ticket, result } = rx.recv().await.unwrap();
//! controller.complete(&ticket, result);
//! ```

mod controller;
mod filter;
mod loader;

pub use controller::{
    FeedController, FeedError, FeedState, FetchKind, FetchOutcome, FetchTicket, Generation,
    PAGE_SIZE,
};
pub use filter::{apply_post_filter, FilterState};
pub use loader::{spawn_fetch, FeedEvent};
