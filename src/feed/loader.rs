use std::sync::Arc;
use tokio::sync::mpsc;

use super::controller::FetchTicket;
use crate::api::{ApiError, ArticlesApi, Page};

/// Completion events from background fetch tasks.
pub enum FeedEvent {
    /// A page request resolved.
    ///
    /// The ticket is handed back untouched so the owner can compare its
    /// generation against the controller's current one before applying.
    PageLoaded {
        ticket: FetchTicket,
        result: Result<Page, ApiError>,
    },
}

/// Run `ticket` against `api` on a background task.
///
/// Sends `FeedEvent::PageLoaded` on completion, success or failure. The
/// request is never aborted; superseded results are filtered by generation
/// when they are applied.
pub fn spawn_fetch(
    api: Arc<dyn ArticlesApi>,
    ticket: FetchTicket,
    tx: mpsc::Sender<FeedEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tracing::debug!(
            generation = ticket.generation,
            kind = ?ticket.kind,
            cursor = ?ticket.request.cursor,
            q = ?ticket.request.q,
            "Fetching articles"
        );
        let result = api.fetch_articles(&ticket.request).await;
        if let Err(e) = tx.send(FeedEvent::PageLoaded { ticket, result }).await {
            tracing::warn!(error = %e, event = "PageLoaded", "Channel send failed (receiver dropped)");
        }
    })
}
