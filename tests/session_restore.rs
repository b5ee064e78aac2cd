//! Session persistence across reader instances sharing one database.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feedline::api::{Category, HttpArticlesApi};
use feedline::feed::FeedEvent;
use feedline::reader::{
    HeadlessViewport, MemoryLocation, ObservedIds, ReaderDeps, ReaderOptions, ReaderSession,
};
use feedline::session::{RestoreState, SessionStore, DEFAULT_SESSION_KEY};
use feedline::storage::{Database, SessionStorage};

fn first_page() -> serde_json::Value {
    let items: Vec<serde_json::Value> = (0..10)
        .map(|i| {
            json!({
                "id": format!("s{}", i),
                "title": format!("Science item {}", i),
                "publishedAt": "2024-06-01T08:30:00Z"
            })
        })
        .collect();
    json!({ "items": items, "nextCursor": "c1", "hasMore": true })
}

fn open_reader(
    server: &MockServer,
    db: &Database,
    viewport: &HeadlessViewport,
) -> (ReaderSession<usize>, mpsc::Receiver<FeedEvent>) {
    let api = HttpArticlesApi::new(reqwest::Client::new(), &server.uri(), None).unwrap();
    ReaderSession::<usize>::new(
        ReaderDeps {
            api: Arc::new(api),
            storage: Arc::new(db.clone()),
            source: Box::new(ObservedIds::new()),
            viewport: Box::new(viewport.clone()),
            location: Box::new(MemoryLocation::new()),
        },
        ReaderOptions::default(),
    )
}

#[tokio::test]
async fn test_restore_resumes_without_refetching() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/articles"))
        .and(query_param("q", "Science"))
        .respond_with(ResponseTemplate::new(200).set_body_json(first_page()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/articles"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "items": [], "nextCursor": null, "hasMore": false })),
        )
        .mount(&server)
        .await;

    let db = Database::open(":memory:").await.unwrap();

    {
        let viewport = HeadlessViewport::new();
        let (mut session, mut events) = open_reader(&server, &db, &viewport);
        session.mount().await;
        session.set_category(Some(Category::Science)).await;
        // The unfiltered first page is superseded by the category fetch.
        for _ in 0..2 {
            let event = events.recv().await.unwrap();
            session.handle_event(event).await;
        }
        assert_eq!(session.items().len(), 10);
        viewport.set(1_250.0);
        session.persist().await;
    }

    let viewport = HeadlessViewport::new();
    let (mut session, _events) = open_reader(&server, &db, &viewport);
    session.mount().await;

    assert_eq!(session.category(), Some(Category::Science));
    assert_eq!(session.search_input(), "");
    assert_eq!(session.items().len(), 10);
    assert_eq!(session.controller().next_cursor(), Some("c1"));
    assert!(!session.controller().is_loading());

    assert!(session.on_frame());
    assert_eq!(viewport.offset(), 1_250.0);

    // Only the first instance's two requests reached the server.
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_store_loads_once_per_instance() {
    let db = Database::open(":memory:").await.unwrap();
    let storage: Arc<dyn SessionStorage> = Arc::new(db);
    let raw = json!({
        "articles": [],
        "nextCursor": null,
        "hasMore": false,
        "searchQuery": "rust",
        "activeCategory": null,
        "scrollY": 0
    });
    storage
        .set(DEFAULT_SESSION_KEY, &raw.to_string())
        .await
        .unwrap();

    let mut store = SessionStore::new(Arc::clone(&storage), DEFAULT_SESSION_KEY);
    let snapshot = store.load().await.unwrap();
    assert_eq!(snapshot.search_query, "rust");
    assert_eq!(store.restore_state(), RestoreState::Restored);
    assert!(store.load().await.is_none());

    let mut fresh = SessionStore::new(storage, DEFAULT_SESSION_KEY);
    assert!(fresh.load().await.is_some());
}

#[tokio::test]
async fn test_reset_session_starts_fresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(first_page()))
        .mount(&server)
        .await;

    let db = Database::open(":memory:").await.unwrap();
    let viewport = HeadlessViewport::new();
    {
        let (mut session, mut events) = open_reader(&server, &db, &viewport);
        session.mount().await;
        let event = events.recv().await.unwrap();
        session.handle_event(event).await;
    }

    let (mut session, mut events) = open_reader(&server, &db, &viewport);
    session.clear_saved().await;
    session.mount().await;
    assert!(session.controller().is_loading());
    let event = events.recv().await.unwrap();
    session.handle_event(event).await;
    assert_eq!(session.items().len(), 10);
}
