//! End-to-end browsing scenarios: real coordinators, registry and fetchers
//! over a scripted transport.

use std::sync::Arc;
use std::time::Duration;

use cv_core::{
    ActionRejected, BrowserState, DatasetId, DatasetView, DateRange, FetchOutcome,
    FilterSnapshot, PageAction, PaginationCoordinator,
};
use cv_data::{CursorFetcher, ScriptedTransport, SessionFetcher, TalkdeskConfig, TransportError, VpiConfig};
use serde_json::{json, Value};

fn range() -> DateRange {
    DateRange::parse("2025-03-01 00:00:00", "2025-03-02 00:00:00").unwrap()
}

fn session_page(session: &str, ids: &[&str], total_pages: u32) -> Value {
    let data: Vec<_> = ids
        .iter()
        .map(|id| json!({"FileName": format!("{id}.wav"), "objectID": id, "startTime": "3/1/2025 9:15:00 AM"}))
        .collect();
    json!({
        "data": data,
        "session_id": session,
        "total_pages": total_pages,
        "total_records": 6 * total_pages
    })
}

fn cursor_page(ids: &[&str], token: Option<&str>) -> Value {
    let data: Vec<_> = ids
        .iter()
        .map(|id| json!({"Interaction_ID": id, "Call_Type": "inbound"}))
        .collect();
    json!({"data": data, "continuation_token": token})
}

fn mount_vpi(browser: &BrowserState) -> (Arc<ScriptedTransport>, Arc<PaginationCoordinator>) {
    let transport = Arc::new(ScriptedTransport::new());
    let fetcher = Arc::new(SessionFetcher::new(transport.clone(), &VpiConfig::default()));
    (transport, browser.mount(fetcher))
}

fn mount_talkdesk(browser: &BrowserState) -> (Arc<ScriptedTransport>, Arc<PaginationCoordinator>) {
    let transport = Arc::new(ScriptedTransport::new());
    let fetcher = Arc::new(CursorFetcher::new(transport.clone(), &TalkdeskConfig::default()));
    (transport, browser.mount(fetcher))
}

#[tokio::test]
async fn test_session_search_then_filter() {
    let browser = BrowserState::new(DatasetId::Vpi);
    let (transport, vpi) = mount_vpi(&browser);
    transport.push_json(session_page("base", &["1", "2", "3"], 4));
    transport.push_json(session_page("filtered", &["123"], 1));

    assert_eq!(vpi.search(range()).await, Ok(FetchOutcome::Applied));
    let state = vpi.state();
    assert_eq!(state.current_page, 1);
    assert!(!state.has_filters);
    assert!(browser.registry.is_mounted(DatasetId::Vpi));
    assert_eq!(browser.registry.total_pages(DatasetId::Vpi), 4);
    assert!(!browser.registry.has_filters(DatasetId::Vpi));

    let filters = FilterSnapshot::from_pairs([("ObjectId", vec!["123"])]);
    assert_eq!(vpi.apply_filters(filters).await, Ok(FetchOutcome::Applied));

    let request = transport.last_request().unwrap();
    assert_eq!(request.path, "/cmp/filter");
    assert_eq!(request.param("page_number"), Some("1"));
    assert_eq!(request.param("objectID"), Some("123"));
    assert_eq!(request.param("session_id"), Some("base"));
    assert!(vpi.state().has_filters);
    assert!(browser.registry.has_filters(DatasetId::Vpi));
    assert_eq!(browser.registry.total_pages(DatasetId::Vpi), 1);
}

#[tokio::test]
async fn test_goto_past_last_page_is_refused() {
    let browser = BrowserState::new(DatasetId::Vpi);
    let (transport, vpi) = mount_vpi(&browser);
    transport.push_json(session_page("s1", &["1"], 2));

    vpi.search(range()).await.unwrap();
    let before = vpi.state();

    assert_eq!(
        vpi.dispatch(PageAction::Goto(3)).await,
        Err(ActionRejected::OutOfRange {
            page: 3,
            total_pages: 2
        })
    );
    assert_eq!(
        browser.registry.trigger(DatasetId::Vpi, PageAction::Goto(3)),
        Err(ActionRejected::OutOfRange {
            page: 3,
            total_pages: 2
        })
    );
    assert_eq!(transport.request_count(), 1);
    assert_eq!(vpi.state(), before);
}

#[tokio::test]
async fn test_failed_search_drops_filters_and_refuses_jumps() {
    let browser = BrowserState::new(DatasetId::Vpi);
    let (transport, vpi) = mount_vpi(&browser);
    transport.push_json(session_page("base", &["1", "2"], 4));
    transport.push_json(session_page("filtered", &["123"], 3));
    transport.push_error(TransportError::Status {
        status: 500,
        detail: None,
    });

    vpi.search(range()).await.unwrap();
    let filters = FilterSnapshot::from_pairs([("ObjectId", vec!["123"])]);
    vpi.apply_filters(filters).await.unwrap();
    assert!(browser.registry.has_filters(DatasetId::Vpi));

    let later = DateRange::parse("2025-03-05 00:00:00", "2025-03-06 00:00:00").unwrap();
    assert_eq!(vpi.search(later).await, Ok(FetchOutcome::Failed));

    let state = vpi.state();
    assert!(matches!(state.view(), DatasetView::Error(_)));
    assert!(!state.has_filters);
    assert_eq!(state.active_filters, None);
    assert_eq!(state.total_pages, 0);
    assert!(!browser.registry.has_filters(DatasetId::Vpi));
    assert_eq!(browser.registry.total_pages(DatasetId::Vpi), 0);

    assert_eq!(
        vpi.dispatch(PageAction::Goto(2)).await,
        Err(ActionRejected::OutOfRange {
            page: 2,
            total_pages: 0
        })
    );
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test]
async fn test_failed_reset_clears_filter_flag() {
    let browser = BrowserState::new(DatasetId::Vpi);
    let (transport, vpi) = mount_vpi(&browser);
    transport.push_json(session_page("base", &["1", "2"], 4));
    transport.push_json(session_page("filtered", &["123"], 2));
    transport.push_error(TransportError::Status {
        status: 422,
        detail: Some("Invalid session".into()),
    });

    vpi.search(range()).await.unwrap();
    let filters = FilterSnapshot::from_pairs([("ObjectId", vec!["123"])]);
    vpi.apply_filters(filters).await.unwrap();

    assert_eq!(vpi.dispatch(PageAction::Reset).await, Ok(FetchOutcome::Failed));
    let state = vpi.state();
    assert_eq!(state.error.as_ref().unwrap().message, "Invalid session");
    assert!(!state.has_filters);
    assert!(!browser.registry.has_filters(DatasetId::Vpi));
    assert!(!browser.registry.has_next_page(DatasetId::Vpi));
}

#[tokio::test]
async fn test_reset_returns_to_first_page() {
    let browser = BrowserState::new(DatasetId::Vpi);
    let (transport, vpi) = mount_vpi(&browser);
    transport.push_json(session_page("s1", &["1"], 3));
    transport.push_json(session_page("s1", &["2"], 3));
    transport.push_json(session_page("s2", &["1"], 3));

    vpi.search(range()).await.unwrap();
    vpi.dispatch(PageAction::Goto(2)).await.unwrap();
    assert!(vpi.state().has_previous);

    assert_eq!(vpi.dispatch(PageAction::Reset).await, Ok(FetchOutcome::Applied));
    let state = vpi.state();
    assert_eq!(state.current_page, 1);
    assert!(!state.has_previous);
    assert!(!browser.registry.has_prev_page(DatasetId::Vpi));
}

#[tokio::test]
async fn test_latest_cursor_search_wins() {
    let browser = BrowserState::new(DatasetId::Talkdesk);
    let (transport, talkdesk) = mount_talkdesk(&browser);
    let release = transport.push_gated_json(cursor_page(&["old"], Some("t-old")));
    transport.push_json(cursor_page(&["new"], None));

    let later = DateRange::parse("2025-03-05 00:00:00", "2025-03-06 00:00:00").unwrap();
    let (first, second) = tokio::join!(talkdesk.search(range()), async {
        let outcome = talkdesk.search(later).await;
        let _ = release.send(());
        outcome
    });

    assert_eq!(first, Ok(FetchOutcome::Superseded));
    assert_eq!(second, Ok(FetchOutcome::Applied));
    let state = talkdesk.state();
    assert_eq!(state.rows.len(), 1);
    assert_eq!(state.rows[0]["Interaction_ID"], "new");
    assert_eq!(state.cursor, None);
    assert!(!state.loading);
}

#[tokio::test]
async fn test_empty_cursor_page_ends_results() {
    let browser = BrowserState::new(DatasetId::Talkdesk);
    let (transport, talkdesk) = mount_talkdesk(&browser);
    transport.push_json(cursor_page(&[], Some("tok")));

    talkdesk.search(range()).await.unwrap();
    assert!(!talkdesk.state().has_next);
    assert_eq!(talkdesk.state().view(), DatasetView::NoRecords);
    assert_eq!(
        talkdesk.dispatch(PageAction::Next).await,
        Err(ActionRejected::NoNextPage)
    );
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_failure_messages() {
    let browser = BrowserState::new(DatasetId::Talkdesk);
    let (transport, talkdesk) = mount_talkdesk(&browser);
    transport.push_error(TransportError::Status {
        status: 400,
        detail: Some("Invalid date format".into()),
    });
    transport.push_error(TransportError::Status {
        status: 503,
        detail: Some("upstream unavailable".into()),
    });

    assert_eq!(talkdesk.search(range()).await, Ok(FetchOutcome::Failed));
    assert_eq!(
        talkdesk.state().error.unwrap().message,
        "Invalid date format"
    );

    assert_eq!(talkdesk.search(range()).await, Ok(FetchOutcome::Failed));
    let state = talkdesk.state();
    assert_eq!(
        state.error.as_ref().unwrap().message,
        "Something went wrong fetching data."
    );
    assert!(state.rows.is_empty());
    assert!(!state.has_next);
}

#[tokio::test]
async fn test_rotated_session_is_used_for_next_page() {
    let browser = BrowserState::new(DatasetId::Vpi);
    let (transport, vpi) = mount_vpi(&browser);
    transport.push_json(session_page("s1", &["1"], 3));
    transport.push_json(session_page("s1-rotated", &["2"], 3));
    transport.push_json(session_page("s1-rotated", &["3"], 3));

    vpi.search(range()).await.unwrap();
    vpi.dispatch(PageAction::Next).await.unwrap();
    vpi.dispatch(PageAction::Next).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests[1].param("session_id"), Some("s1"));
    assert_eq!(requests[2].param("session_id"), Some("s1-rotated"));
    assert_eq!(vpi.state().session_token.as_deref(), Some("s1-rotated"));
}

#[tokio::test]
async fn test_registry_trigger_drives_coordinator() {
    let browser = BrowserState::new(DatasetId::Vpi);
    let (transport, vpi) = mount_vpi(&browser);
    transport.push_json(session_page("s1", &["1"], 3));
    transport.push_json(session_page("s1", &["2"], 3));

    vpi.search(range()).await.unwrap();
    let mut updates = browser.registry.subscribe(DatasetId::Vpi);
    browser
        .registry
        .trigger(DatasetId::Vpi, PageAction::Next)
        .unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let snapshot = updates.borrow_and_update();
                if snapshot.current_page == 2 && !snapshot.is_loading {
                    break;
                }
            }
            updates.changed().await.unwrap();
        }
    })
    .await
    .unwrap();

    assert_eq!(browser.registry.current_page(DatasetId::Vpi), 2);
    assert!(browser.registry.has_prev_page(DatasetId::Vpi));
}

#[tokio::test]
async fn test_switching_dataset_clears_selection() {
    let browser = BrowserState::new(DatasetId::Vpi);
    let (vpi_transport, vpi) = mount_vpi(&browser);
    let (talkdesk_transport, talkdesk) = mount_talkdesk(&browser);
    vpi_transport.push_json(session_page("s1", &["1", "2"], 1));
    talkdesk_transport.push_json(cursor_page(&["a"], None));

    vpi.search(range()).await.unwrap();
    talkdesk.search(range()).await.unwrap();

    assert!(browser.select(1));
    assert_eq!(browser.selected().unwrap().row_index, 1);

    browser.switch_to(DatasetId::Talkdesk);
    assert_eq!(browser.selected(), None);
    assert_eq!(browser.selection.selected(), None);

    browser.unmount(DatasetId::Vpi);
    assert!(!browser.registry.is_mounted(DatasetId::Vpi));
    assert_eq!(browser.registry.total_pages(DatasetId::Vpi), 0);
}
