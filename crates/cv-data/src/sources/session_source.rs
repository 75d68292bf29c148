//! Page-numbered dataset scoped by server-side sessions
//!
//! An unfiltered search opens a base session. Applying filters narrows the
//! base session into a filter session; paging then follows whichever session
//! the current view belongs to. The server may rotate the session id on any
//! response, and the returned id replaces the stored one.

use std::sync::Arc;

use async_trait::async_trait;
use cv_core::{
    Capabilities, DateRange, DatasetFetcher, DatasetId, DatasetState, FetchOutcome,
    FilterSnapshot, PageQuery, RequestGeneration,
};
use parking_lot::RwLock;
use tracing::{debug, warn};

use super::{push, push_filters, push_range, DatasetDefinition, SessionPage};
use crate::config::VpiConfig;
use crate::transport::{decode, MetadataTransport, QueryParams, TransportError};

/// What a base session was opened for
#[derive(Debug, Clone, PartialEq)]
struct SessionScope {
    range: DateRange,
    opco: String,
}

#[derive(Debug, Default)]
struct Inner {
    state: DatasetState,
    base_session: Option<String>,
    filter_session: Option<String>,
    scope: Option<SessionScope>,
}

/// Which session a page request goes through
enum Route {
    Base(String),
    Filtered(String, FilterSnapshot),
}

/// Fetcher for the session-scoped dataset
pub struct SessionFetcher {
    transport: Arc<dyn MetadataTransport>,
    definition: DatasetDefinition,
    metadata_path: String,
    filter_path: String,
    page_size: u32,
    default_opco: String,
    inner: RwLock<Inner>,
    generation: RequestGeneration,
}

impl SessionFetcher {
    pub fn new(transport: Arc<dyn MetadataTransport>, config: &VpiConfig) -> Self {
        Self {
            transport,
            definition: DatasetDefinition::vpi(),
            metadata_path: config.metadata_path.clone(),
            filter_path: config.filter_path.clone(),
            page_size: config.page_size,
            default_opco: config.opco.to_string(),
            inner: RwLock::new(Inner::default()),
            generation: RequestGeneration::new(),
        }
    }

    pub fn definition(&self) -> &DatasetDefinition {
        &self.definition
    }

    /// Session id of the unfiltered result set
    pub fn base_session(&self) -> Option<String> {
        self.inner.read().base_session.clone()
    }

    /// Session id of the filtered result set, when filters are applied
    pub fn filter_session(&self) -> Option<String> {
        self.inner.read().filter_session.clone()
    }

    fn scope_of(&self, query: &PageQuery) -> SessionScope {
        SessionScope {
            range: query.range,
            opco: query
                .scope
                .clone()
                .unwrap_or_else(|| self.default_opco.clone()),
        }
    }

    async fn request(&self, path: &str, params: QueryParams) -> Result<SessionPage, TransportError> {
        let body = self.transport.get_json(path, &params).await?;
        decode(body)
    }

    /// Open a new base session and load its first page. The previous
    /// sessions and active filters are discarded before the request goes
    /// out, so a failed search leaves nothing to page through.
    pub async fn fetch_initial(&self, query: &PageQuery) -> FetchOutcome {
        let generation = self.generation.advance();
        let scope = self.scope_of(query);
        {
            let mut inner = self.inner.write();
            inner.base_session = None;
            inner.filter_session = None;
            inner.scope = Some(scope.clone());
            inner.state.session_token = None;
            inner.state.active_filters = None;
            inner.state.has_filters = false;
            inner.state.current_page = 1;
            inner.state.begin_request();
        }

        let mut params = QueryParams::new();
        push_range(&mut params, "from_date", "to_date", &scope.range);
        push(&mut params, "opco", &scope.opco);
        push(&mut params, "page_number", 1);
        push(&mut params, "page_size", self.page_size);
        debug!("VPI request #{}: new session for {}", generation, scope.range);

        let result = self.request(&self.metadata_path, params).await;
        if !self.generation.is_current(generation) {
            debug!("Dropping stale VPI response #{}", generation);
            return FetchOutcome::Superseded;
        }

        let mut inner = self.inner.write();
        match result {
            Ok(page) => {
                inner.base_session = page.session_id.clone();
                inner.state.session_token = inner.base_session.clone();
                apply_page(&mut inner.state, 1, page);
                FetchOutcome::Applied
            }
            Err(e) => {
                warn!("VPI session request failed: {}", e);
                inner.state.fail(e.to_error_info());
                FetchOutcome::Failed
            }
        }
    }

    /// Load page `page` of the current session. Without a usable session
    /// this opens a new one instead; otherwise pages outside
    /// `1..=total_pages` are ignored without a request.
    pub async fn fetch_page(&self, page: u32, using_filters: bool, query: &PageQuery) -> FetchOutcome {
        let dispatched = {
            let mut inner = self.inner.write();
            let fresh = inner.scope.as_ref() == Some(&self.scope_of(query));
            let route = match (using_filters, &inner.filter_session, &inner.base_session) {
                _ if !fresh => None,
                (true, Some(session), _) => Some(Route::Filtered(
                    session.clone(),
                    inner.state.active_filters.clone().unwrap_or_default(),
                )),
                (false, _, Some(session)) => Some(Route::Base(session.clone())),
                _ => None,
            };
            if route.is_some() && (page < 1 || page > inner.state.total_pages) {
                debug!(
                    "Ignoring VPI page {} outside 1..={}",
                    page, inner.state.total_pages
                );
                return FetchOutcome::Skipped;
            }
            route.map(|route| {
                inner.state.begin_request();
                (route, self.generation.advance())
            })
        };

        let Some((route, generation)) = dispatched else {
            debug!("No usable VPI session, starting a new one");
            return self.fetch_initial(query).await;
        };

        let mut params = QueryParams::new();
        let path = match &route {
            Route::Filtered(session, filters) => {
                push(&mut params, "session_id", session);
                push(&mut params, "page_number", page);
                push(&mut params, "page_size", self.page_size);
                push_filters(&mut params, &self.definition.fields, filters);
                &self.filter_path
            }
            Route::Base(session) => {
                let scope = self.scope_of(query);
                push(&mut params, "session_id", session);
                push_range(&mut params, "from_date", "to_date", &scope.range);
                push(&mut params, "opco", &scope.opco);
                push(&mut params, "page_number", page);
                push(&mut params, "page_size", self.page_size);
                &self.metadata_path
            }
        };
        debug!("VPI request #{}: page {}", generation, page);

        let result = self.request(path, params).await;
        if !self.generation.is_current(generation) {
            debug!("Dropping stale VPI response #{}", generation);
            return FetchOutcome::Superseded;
        }

        let mut inner = self.inner.write();
        match result {
            Ok(body) => {
                if let Some(session) = body.session_id.clone() {
                    match route {
                        Route::Filtered(..) => inner.filter_session = Some(session.clone()),
                        Route::Base(_) => inner.base_session = Some(session.clone()),
                    }
                    inner.state.session_token = Some(session);
                }
                apply_page(&mut inner.state, page, body);
                FetchOutcome::Applied
            }
            Err(e) => {
                warn!("VPI page {} failed: {}", page, e);
                inner.state.fail(e.to_error_info());
                FetchOutcome::Failed
            }
        }
    }

    /// Narrow the base session by `query.filters` and load page 1 of the
    /// result. Empty filters return to the unfiltered view.
    pub async fn filter(&self, query: &PageQuery) -> FetchOutcome {
        if query.filters.is_empty() {
            return self.fetch_initial(query).await;
        }

        let usable = {
            let inner = self.inner.read();
            inner.base_session.is_some() && inner.scope.as_ref() == Some(&self.scope_of(query))
        };
        if !usable {
            let outcome = self.fetch_initial(&query.without_filters()).await;
            if outcome != FetchOutcome::Applied {
                return outcome;
            }
        }

        let generation = self.generation.advance();
        let base = {
            let mut inner = self.inner.write();
            inner.state.begin_request();
            inner.base_session.clone()
        };
        let Some(base) = base else {
            // The base search succeeded without handing out a session
            let mut inner = self.inner.write();
            inner.state.fail(cv_core::ErrorInfo::generic());
            return FetchOutcome::Failed;
        };

        let mut params = QueryParams::new();
        push(&mut params, "session_id", &base);
        push(&mut params, "page_number", 1);
        push(&mut params, "page_size", self.page_size);
        push_filters(&mut params, &self.definition.fields, &query.filters);
        debug!(
            "VPI request #{}: filter session from {} ({} fields)",
            generation,
            base,
            query.filters.len()
        );

        let result = self.request(&self.filter_path, params).await;
        if !self.generation.is_current(generation) {
            debug!("Dropping stale VPI response #{}", generation);
            return FetchOutcome::Superseded;
        }

        let mut inner = self.inner.write();
        match result {
            Ok(page) => {
                inner.filter_session = page.session_id.clone();
                inner.state.active_filters = Some(query.filters.clone());
                inner.state.has_filters = true;
                inner.state.session_token = inner.filter_session.clone();
                apply_page(&mut inner.state, 1, page);
                FetchOutcome::Applied
            }
            Err(e) => {
                warn!("VPI filter request failed: {}", e);
                inner.state.fail(e.to_error_info());
                FetchOutcome::Failed
            }
        }
    }
}

fn apply_page(state: &mut DatasetState, page: u32, body: SessionPage) {
    state.current_page = page;
    state.total_pages = body.total_pages;
    state.total_records = body.total_records;
    state.has_next = !body.data.is_empty() && page < body.total_pages;
    state.has_previous = page > 1;
    state.replace_rows(body.data);
}

#[async_trait]
impl DatasetFetcher for SessionFetcher {
    fn dataset(&self) -> DatasetId {
        DatasetId::Vpi
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SESSION_OFFSET
    }

    fn page_size(&self) -> u32 {
        self.page_size
    }

    fn state(&self) -> DatasetState {
        self.inner.read().state.clone()
    }

    async fn reset(&self, query: &PageQuery) -> FetchOutcome {
        self.fetch_initial(query).await
    }

    async fn next(&self, query: &PageQuery) -> FetchOutcome {
        let (page, filtered) = self.position();
        self.fetch_page(page.saturating_add(1), filtered, query).await
    }

    async fn previous(&self, query: &PageQuery) -> FetchOutcome {
        let (page, filtered) = self.position();
        self.fetch_page(page.saturating_sub(1), filtered, query).await
    }

    async fn goto(&self, page: u32, query: &PageQuery) -> FetchOutcome {
        let (_, filtered) = self.position();
        self.fetch_page(page, filtered, query).await
    }

    async fn apply_filters(&self, query: &PageQuery) -> FetchOutcome {
        self.filter(query).await
    }

    async fn clear_filters(&self, query: &PageQuery) -> FetchOutcome {
        self.fetch_initial(&query.without_filters()).await
    }
}

impl SessionFetcher {
    fn position(&self) -> (u32, bool) {
        let inner = self.inner.read();
        (inner.state.current_page, inner.state.has_filters)
    }
}
