//! Forward-only dataset paged by continuation tokens

use std::sync::Arc;

use async_trait::async_trait;
use cv_core::{
    Capabilities, DatasetFetcher, DatasetId, DatasetState, FetchOutcome, PageQuery,
    RequestGeneration,
};
use parking_lot::RwLock;
use tracing::{debug, warn};

use super::{push, push_filters, push_range, CursorPage, DatasetDefinition};
use crate::config::TalkdeskConfig;
use crate::transport::{decode, MetadataTransport, QueryParams};

/// Fetcher for the continuation-token dataset.
///
/// There is no way back except a reset, which always starts from an empty
/// token on page 1.
pub struct CursorFetcher {
    transport: Arc<dyn MetadataTransport>,
    definition: DatasetDefinition,
    metadata_path: String,
    page_size: u32,
    state: RwLock<DatasetState>,
    generation: RequestGeneration,
}

impl CursorFetcher {
    pub fn new(transport: Arc<dyn MetadataTransport>, config: &TalkdeskConfig) -> Self {
        Self {
            transport,
            definition: DatasetDefinition::talkdesk(),
            metadata_path: config.metadata_path.clone(),
            page_size: config.page_size,
            state: RwLock::new(DatasetState::default()),
            generation: RequestGeneration::new(),
        }
    }

    pub fn definition(&self) -> &DatasetDefinition {
        &self.definition
    }

    fn params(&self, query: &PageQuery, cursor: Option<&str>) -> QueryParams {
        let mut params = QueryParams::new();
        push_range(&mut params, "start_date", "end_date", &query.range);
        if let Some(cursor) = cursor {
            push(&mut params, "continuation_token", cursor);
        }
        push(&mut params, "page_size", self.page_size);
        push_filters(&mut params, &self.definition.fields, &query.filters);
        params
    }

    /// Fetch the first page (`reset`) or the page after the stored token
    pub async fn fetch(&self, reset: bool, query: &PageQuery) -> FetchOutcome {
        let generation = self.generation.advance();
        let cursor = {
            let mut state = self.state.write();
            if reset {
                state.current_page = 1;
                state.cursor = None;
            }
            state.begin_request();
            state.cursor.clone()
        };

        let params = self.params(query, cursor.as_deref());
        debug!(
            "Talkdesk request #{} (reset: {}, filters: {})",
            generation,
            reset,
            query.filters.len()
        );
        let result = match self.transport.get_json(&self.metadata_path, &params).await {
            Ok(body) => decode::<CursorPage>(body),
            Err(e) => Err(e),
        };

        if !self.generation.is_current(generation) {
            debug!("Dropping stale Talkdesk response #{}", generation);
            return FetchOutcome::Superseded;
        }

        let mut state = self.state.write();
        match result {
            Ok(page) => {
                if !reset && cursor.is_some() {
                    state.current_page += 1;
                }
                state.cursor = page.next_token();
                state.has_next = state.cursor.is_some();
                state.has_previous = false;
                state.has_filters = !query.filters.is_empty();
                state.replace_rows(page.data);
                FetchOutcome::Applied
            }
            Err(e) => {
                warn!("Talkdesk request failed: {}", e);
                state.has_filters = false;
                state.fail(e.to_error_info());
                FetchOutcome::Failed
            }
        }
    }
}

#[async_trait]
impl DatasetFetcher for CursorFetcher {
    fn dataset(&self) -> DatasetId {
        DatasetId::Talkdesk
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::CURSOR
    }

    fn page_size(&self) -> u32 {
        self.page_size
    }

    fn state(&self) -> DatasetState {
        self.state.read().clone()
    }

    async fn reset(&self, query: &PageQuery) -> FetchOutcome {
        self.fetch(true, query).await
    }

    async fn next(&self, query: &PageQuery) -> FetchOutcome {
        self.fetch(false, query).await
    }

    async fn apply_filters(&self, query: &PageQuery) -> FetchOutcome {
        self.fetch(true, query).await
    }

    async fn clear_filters(&self, query: &PageQuery) -> FetchOutcome {
        self.fetch(true, &query.without_filters()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ScriptedTransport, TransportError};
    use cv_core::{DateRange, DatasetView, FilterSnapshot};
    use serde_json::json;

    fn setup() -> (Arc<ScriptedTransport>, CursorFetcher) {
        let transport = Arc::new(ScriptedTransport::new());
        let fetcher = CursorFetcher::new(transport.clone(), &TalkdeskConfig::default());
        (transport, fetcher)
    }

    fn query() -> PageQuery {
        PageQuery::new(DateRange::parse("2025-01-01 00:00:00", "2025-01-02 00:00:00").unwrap())
    }

    fn page(ids: &[&str], token: Option<&str>) -> serde_json::Value {
        let data: Vec<_> = ids
            .iter()
            .map(|id| json!({"Interaction_ID": id, "Call_Type": "inbound"}))
            .collect();
        json!({"data": data, "continuation_token": token})
    }

    #[tokio::test]
    async fn test_first_page_and_next() {
        let (transport, fetcher) = setup();
        transport.push_json(page(&["a", "b"], Some("t1")));
        transport.push_json(page(&["c"], None));

        assert_eq!(fetcher.reset(&query()).await, FetchOutcome::Applied);
        let state = fetcher.state();
        assert_eq!(state.current_page, 1);
        assert!(state.has_next);
        assert_eq!(state.cursor.as_deref(), Some("t1"));
        assert_eq!(state.columns, vec!["Interaction_ID", "Call_Type"]);

        let first = transport.last_request().unwrap();
        assert_eq!(first.path, "/talkdesk/metadata");
        assert_eq!(first.param("start_date"), Some("2025-01-01 00:00:00"));
        assert_eq!(first.param("end_date"), Some("2025-01-02 00:00:00"));
        assert_eq!(first.param("page_size"), Some("10"));
        assert_eq!(first.param("continuation_token"), None);

        assert_eq!(fetcher.next(&query()).await, FetchOutcome::Applied);
        let state = fetcher.state();
        assert_eq!(state.current_page, 2);
        assert!(!state.has_next);
        assert!(!state.has_previous);
        assert_eq!(
            transport.last_request().unwrap().param("continuation_token"),
            Some("t1")
        );
    }

    #[tokio::test]
    async fn test_empty_page_with_token_ends_sequence() {
        let (transport, fetcher) = setup();
        transport.push_json(page(&[], Some("dangling")));

        assert_eq!(fetcher.reset(&query()).await, FetchOutcome::Applied);
        let state = fetcher.state();
        assert!(!state.has_next);
        assert_eq!(state.cursor, None);
        assert_eq!(state.view(), DatasetView::NoRecords);
    }

    #[tokio::test]
    async fn test_reset_zeroes_page_even_on_failure() {
        let (transport, fetcher) = setup();
        transport.push_json(page(&["a"], Some("t1")));
        transport.push_json(page(&["b"], Some("t2")));
        transport.push_error(TransportError::Status {
            status: 500,
            detail: Some("Failed to fetch blob metadata".into()),
        });

        fetcher.reset(&query()).await;
        fetcher.next(&query()).await;
        assert_eq!(fetcher.state().current_page, 2);

        assert_eq!(fetcher.reset(&query()).await, FetchOutcome::Failed);
        let state = fetcher.state();
        assert_eq!(state.current_page, 1);
        assert!(!state.has_previous);
        assert!(!state.has_next);
        assert!(state.rows.is_empty());
        assert_eq!(
            state.error.unwrap().message,
            "Something went wrong fetching data."
        );
        assert_eq!(
            transport.last_request().unwrap().param("continuation_token"),
            None
        );
    }

    #[tokio::test]
    async fn test_client_error_message_is_shown() {
        let (transport, fetcher) = setup();
        transport.push_error(TransportError::Status {
            status: 400,
            detail: Some("`end_date` must be after `start_date`".into()),
        });

        assert_eq!(fetcher.reset(&query()).await, FetchOutcome::Failed);
        assert_eq!(
            fetcher.state().error.unwrap().message,
            "`end_date` must be after `start_date`"
        );
    }

    #[tokio::test]
    async fn test_filters_are_sent_as_params() {
        let (transport, fetcher) = setup();
        transport.push_json(page(&["a"], None));

        let filters = FilterSnapshot::from_pairs([
            ("CallType", vec!["", "outbound", "inbound"]),
            ("InteractionID", vec!["x1"]),
        ]);
        let query = query().with_filters(filters);
        fetcher.apply_filters(&query).await;

        let request = transport.last_request().unwrap();
        assert_eq!(request.param("Call_Type"), Some("outbound"));
        assert_eq!(request.param("Interaction_ID"), Some("x1"));
        assert_eq!(request.param("Customer_Phone_Number"), None);
        assert!(fetcher.state().has_filters);
    }

    #[tokio::test]
    async fn test_failed_filtered_request_is_not_marked_filtered() {
        let (transport, fetcher) = setup();
        transport.push_json(page(&["a"], Some("t1")));
        transport.push_error(TransportError::Status {
            status: 400,
            detail: Some("Invalid Call_Type".into()),
        });

        fetcher.reset(&query()).await;
        let filtered =
            query().with_filters(FilterSnapshot::from_pairs([("CallType", vec!["inbound"])]));
        assert!(!fetcher.state().has_filters);

        assert_eq!(fetcher.apply_filters(&filtered).await, FetchOutcome::Failed);
        let state = fetcher.state();
        assert!(!state.has_filters);
        assert_eq!(state.error.unwrap().message, "Invalid Call_Type");
    }

    #[tokio::test]
    async fn test_undecodable_body_is_generic_failure() {
        let (transport, fetcher) = setup();
        transport.push_json(json!({"data": 42}));

        assert_eq!(fetcher.reset(&query()).await, FetchOutcome::Failed);
        assert_eq!(
            fetcher.state().error.unwrap(),
            cv_core::ErrorInfo::generic()
        );
    }
}
