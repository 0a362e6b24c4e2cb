//! Turns selection changes into fetch-and-filter cycles.
//!
//! Each non-empty selection change dispatches one fetch of "need" posts,
//! tagged with the selection revision and a snapshot of the categories at
//! dispatch time. In-flight fetches are never cancelled by later changes;
//! instead a completion whose revision is no longer the latest is discarded,
//! so an older response can never overwrite a newer selection's results.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::backend::{FetchError, FetchResult, RequestFetcher};
use crate::matching::filter_requests;
use crate::selection::SelectionChange;
use crate::types::{CategoryId, HelpRequest, PostKind};

/// What happens to the visible results when the latest fetch fails.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Keep the last successful results on screen.
    #[default]
    Keep,
    /// Replace the results with an empty list.
    Clear,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct MatcherConfig {
    pub failure_policy: FailurePolicy,
    pub discard_stale: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Keep,
            discard_stale: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchState {
    pub results: Vec<HelpRequest>,
    pub loading: bool,
    pub last_error: Option<String>,
    /// Revision of the most recent selection change observed.
    pub revision: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchEvent {
    Cleared { revision: u64 },
    Dispatched { revision: u64 },
    Applied { revision: u64, matched: usize },
    Failed { revision: u64, error: String },
    Discarded { revision: u64, latest: u64 },
}

struct FetchOutcome {
    revision: u64,
    selection: Vec<CategoryId>,
    result: FetchResult<Vec<HelpRequest>>,
}

pub struct RequestMatcher<F: RequestFetcher> {
    fetcher: Arc<F>,
    config: MatcherConfig,
    state: MatchState,
    selection_empty: bool,
    in_flight: JoinSet<FetchOutcome>,
    fetches_issued: u64,
}

impl<F: RequestFetcher> RequestMatcher<F> {
    pub fn new(fetcher: Arc<F>, config: MatcherConfig) -> Self {
        Self {
            fetcher,
            config,
            state: MatchState::default(),
            selection_empty: true,
            in_flight: JoinSet::new(),
            fetches_issued: 0,
        }
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn results(&self) -> &[HelpRequest] {
        &self.state.results
    }

    pub fn is_loading(&self) -> bool {
        self.state.loading
    }

    pub fn fetches_issued(&self) -> u64 {
        self.fetches_issued
    }

    pub fn has_pending(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Reacts to a selection change. Must be called from within a tokio
    /// runtime; the fetch itself runs as a spawned task.
    pub fn on_selection_change(&mut self, change: &SelectionChange) -> MatchEvent {
        self.state.revision = change.revision;
        self.selection_empty = change.is_empty();

        if change.is_empty() {
            self.state.results.clear();
            self.state.loading = false;
            self.state.last_error = None;
            debug!(revision = change.revision, "selection empty; cleared results");
            return MatchEvent::Cleared {
                revision: change.revision,
            };
        }

        self.state.loading = true;
        let fetcher = Arc::clone(&self.fetcher);
        let revision = change.revision;
        let selection = change.categories.clone();
        self.in_flight.spawn(async move {
            // The fetch runs in its own task so a panic still reports back
            // under the revision it was dispatched for.
            let fetch = tokio::spawn(async move { fetcher.fetch_requests(PostKind::Need).await });
            let result = match fetch.await {
                Ok(result) => result,
                Err(err) => Err(FetchError::Interrupted(err.to_string())),
            };
            FetchOutcome {
                revision,
                selection,
                result,
            }
        });
        self.fetches_issued += 1;
        debug!(
            revision,
            categories = ?change.categories,
            in_flight = self.in_flight.len(),
            "dispatched help request fetch"
        );

        MatchEvent::Dispatched { revision }
    }

    /// Waits for the next in-flight fetch to finish and applies it. Returns
    /// `None` when nothing is in flight.
    pub async fn next_event(&mut self) -> Option<MatchEvent> {
        let joined = self.in_flight.join_next().await?;
        let event = match joined {
            Ok(outcome) => self.apply(outcome),
            // Only reachable when the outer task is aborted, which leaves no
            // revision to attribute; treat it as a failure of the latest one.
            Err(err) => {
                if self.in_flight.is_empty() {
                    self.state.loading = false;
                }
                let revision = self.state.revision;
                self.record_failure(revision, FetchError::Interrupted(err.to_string()))
            }
        };
        Some(event)
    }

    /// Applies every outstanding fetch, in completion order.
    pub async fn settle(&mut self) -> Vec<MatchEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }

    fn apply(&mut self, outcome: FetchOutcome) -> MatchEvent {
        let latest = self.state.revision;
        let is_latest = outcome.revision == latest;

        if !is_latest && (self.config.discard_stale || self.selection_empty) {
            debug!(
                revision = outcome.revision,
                latest, "discarding superseded help request fetch"
            );
            if self.in_flight.is_empty() {
                self.state.loading = false;
            }
            return MatchEvent::Discarded {
                revision: outcome.revision,
                latest,
            };
        }

        if is_latest || self.in_flight.is_empty() {
            self.state.loading = false;
        }

        match outcome.result {
            Ok(batch) => {
                let fetched = batch.len();
                self.state.results = filter_requests(batch, &outcome.selection);
                self.state.last_error = None;
                debug!(
                    revision = outcome.revision,
                    fetched,
                    matched = self.state.results.len(),
                    "applied help request batch"
                );
                MatchEvent::Applied {
                    revision: outcome.revision,
                    matched: self.state.results.len(),
                }
            }
            Err(err) => self.record_failure(outcome.revision, err),
        }
    }

    fn record_failure(&mut self, revision: u64, err: FetchError) -> MatchEvent {
        if err.is_status() {
            debug!(revision, error = %err, "posts API returned non-success status");
        } else {
            warn!(revision, error = %err, "failed to fetch help requests");
        }
        if self.config.failure_policy == FailurePolicy::Clear {
            self.state.results.clear();
        }
        let error = err.to_string();
        self.state.last_error = Some(error.clone());
        MatchEvent::Failed { revision, error }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::Notify;

    use super::*;
    use crate::selection::SelectionState;

    pub(crate) enum Scripted {
        Batch(Vec<HelpRequest>),
        Status(u16),
        Decode,
        Panic,
    }

    struct ScriptedResponse {
        gate: Option<Arc<Notify>>,
        response: Scripted,
    }

    /// Fetcher that replays scripted responses in call order. A response may
    /// be gated so the test decides when it resolves.
    #[derive(Default)]
    pub(crate) struct FakeFetcher {
        responses: Mutex<VecDeque<ScriptedResponse>>,
        calls: AtomicUsize,
    }

    impl FakeFetcher {
        pub(crate) fn push(&self, response: Scripted) {
            self.responses
                .lock()
                .expect("responses mutex should not be poisoned")
                .push_back(ScriptedResponse {
                    gate: None,
                    response,
                });
        }

        pub(crate) fn push_gated(&self, response: Scripted) -> Arc<Notify> {
            let gate = Arc::new(Notify::new());
            self.responses
                .lock()
                .expect("responses mutex should not be poisoned")
                .push_back(ScriptedResponse {
                    gate: Some(Arc::clone(&gate)),
                    response,
                });
            gate
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl RequestFetcher for FakeFetcher {
        async fn fetch_requests(&self, kind: PostKind) -> FetchResult<Vec<HelpRequest>> {
            assert_eq!(kind, PostKind::Need);
            self.calls.fetch_add(1, Ordering::SeqCst);
            let scripted = self
                .responses
                .lock()
                .expect("responses mutex should not be poisoned")
                .pop_front();
            let Some(scripted) = scripted else {
                return Ok(Vec::new());
            };
            if let Some(gate) = scripted.gate {
                gate.notified().await;
            }
            match scripted.response {
                Scripted::Batch(batch) => Ok(batch),
                Scripted::Status(code) => Err(FetchError::Status(code)),
                Scripted::Decode => Err(FetchError::from(
                    serde_json::from_str::<Vec<HelpRequest>>("{").expect_err("invalid json"),
                )),
                Scripted::Panic => panic!("fetcher blew up"),
            }
        }
    }

    pub(crate) fn post(id: &str, category: &str, categories: Option<&[&str]>) -> HelpRequest {
        HelpRequest {
            id: id.to_string(),
            user_id: format!("user-{id}"),
            title: format!("request {id}"),
            description: String::new(),
            category: category.to_string(),
            categories: categories.map(|list| list.iter().map(|c| c.to_string()).collect()),
            user: None,
        }
    }

    fn ids(results: &[HelpRequest]) -> Vec<&str> {
        results.iter().map(|r| r.id.as_str()).collect()
    }

    fn matcher(fetcher: &Arc<FakeFetcher>, config: MatcherConfig) -> RequestMatcher<FakeFetcher> {
        RequestMatcher::new(Arc::clone(fetcher), config)
    }

    #[tokio::test]
    async fn empty_selection_clears_without_fetching() {
        let fetcher = Arc::new(FakeFetcher::default());
        let mut matcher = matcher(&fetcher, MatcherConfig::default());
        let mut selection = SelectionState::new();

        selection.clear();
        let event = matcher.on_selection_change(&selection.snapshot());

        assert_eq!(event, MatchEvent::Cleared { revision: 1 });
        assert!(matcher.results().is_empty());
        assert!(!matcher.is_loading());
        assert!(!matcher.has_pending());
        assert_eq!(matcher.fetches_issued(), 0);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn mixed_batch_matches_in_fetch_order() {
        let fetcher = Arc::new(FakeFetcher::default());
        fetcher.push(Scripted::Batch(vec![
            post("0", "clothes", None),
            post("1", "food", None),
            post("2", "", Some(&["social", "clothes"])),
        ]));
        let mut matcher = matcher(&fetcher, MatcherConfig::default());
        let mut selection = SelectionState::new();

        selection.toggle("clothes");
        let dispatched = matcher.on_selection_change(&selection.snapshot());
        assert_eq!(dispatched, MatchEvent::Dispatched { revision: 1 });
        assert!(matcher.is_loading());

        let events = matcher.settle().await;

        assert_eq!(
            events,
            vec![MatchEvent::Applied {
                revision: 1,
                matched: 2
            }]
        );
        assert_eq!(ids(matcher.results()), vec!["0", "2"]);
        assert!(!matcher.is_loading());
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn toggling_twice_returns_to_empty_without_second_fetch() {
        let fetcher = Arc::new(FakeFetcher::default());
        fetcher.push(Scripted::Batch(vec![post("0", "clothes", None)]));
        let mut matcher = matcher(&fetcher, MatcherConfig::default());
        let mut selection = SelectionState::new();
        let mut feed = selection.subscribe();

        selection.toggle("clothes");
        selection.toggle("clothes");
        assert!(selection.is_empty());

        while let Ok(change) = feed.try_recv() {
            matcher.on_selection_change(&change);
        }
        assert_eq!(matcher.fetches_issued(), 1);
        assert!(!matcher.is_loading());

        let events = matcher.settle().await;

        assert_eq!(
            events,
            vec![MatchEvent::Discarded {
                revision: 1,
                latest: 2
            }]
        );
        assert!(matcher.results().is_empty());
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn every_non_empty_change_refetches() {
        let fetcher = Arc::new(FakeFetcher::default());
        fetcher.push(Scripted::Batch(vec![post("0", "clothes", None)]));
        fetcher.push(Scripted::Batch(vec![
            post("0", "clothes", None),
            post("1", "food", None),
        ]));
        let mut matcher = matcher(&fetcher, MatcherConfig::default());
        let mut selection = SelectionState::new();

        selection.toggle("clothes");
        matcher.on_selection_change(&selection.snapshot());
        matcher.settle().await;
        selection.toggle("food");
        matcher.on_selection_change(&selection.snapshot());
        matcher.settle().await;

        assert_eq!(fetcher.calls(), 2);
        assert_eq!(ids(matcher.results()), vec!["0", "1"]);
    }

    #[tokio::test]
    async fn late_stale_response_is_discarded() {
        let fetcher = Arc::new(FakeFetcher::default());
        let slow = fetcher.push_gated(Scripted::Batch(vec![
            post("old-clothes", "clothes", None),
            post("old-food", "food", None),
        ]));
        fetcher.push(Scripted::Batch(vec![
            post("new-clothes", "clothes", None),
            post("new-food", "food", None),
        ]));
        let mut matcher = matcher(&fetcher, MatcherConfig::default());
        let mut selection = SelectionState::new();

        selection.toggle("clothes");
        matcher.on_selection_change(&selection.snapshot());
        selection.toggle("food");
        matcher.on_selection_change(&selection.snapshot());

        let first = matcher.next_event().await.expect("fast fetch completes");
        assert_eq!(
            first,
            MatchEvent::Applied {
                revision: 2,
                matched: 2
            }
        );
        assert!(!matcher.is_loading());

        slow.notify_one();
        let second = matcher.next_event().await.expect("slow fetch completes");

        assert_eq!(
            second,
            MatchEvent::Discarded {
                revision: 1,
                latest: 2
            }
        );
        assert_eq!(ids(matcher.results()), vec!["new-clothes", "new-food"]);
        assert!(matcher.next_event().await.is_none());
    }

    #[tokio::test]
    async fn stale_response_applies_when_discarding_disabled() {
        let fetcher = Arc::new(FakeFetcher::default());
        let slow = fetcher.push_gated(Scripted::Batch(vec![
            post("old-clothes", "clothes", None),
            post("old-food", "food", None),
        ]));
        fetcher.push(Scripted::Batch(vec![post("new-food", "food", None)]));
        let config = MatcherConfig {
            discard_stale: false,
            ..MatcherConfig::default()
        };
        let mut matcher = matcher(&fetcher, config);
        let mut selection = SelectionState::new();

        selection.toggle("clothes");
        matcher.on_selection_change(&selection.snapshot());
        selection.toggle("food");
        matcher.on_selection_change(&selection.snapshot());

        matcher.next_event().await.expect("fast fetch completes");
        slow.notify_one();
        let late = matcher.next_event().await.expect("slow fetch completes");

        assert_eq!(
            late,
            MatchEvent::Applied {
                revision: 1,
                matched: 1
            }
        );
        // Filtered against the selection at dispatch time, not the current one.
        assert_eq!(ids(matcher.results()), vec!["old-clothes"]);
    }

    #[tokio::test]
    async fn stale_response_never_fills_an_empty_selection() {
        let fetcher = Arc::new(FakeFetcher::default());
        let slow = fetcher.push_gated(Scripted::Batch(vec![post("0", "clothes", None)]));
        let config = MatcherConfig {
            discard_stale: false,
            ..MatcherConfig::default()
        };
        let mut matcher = matcher(&fetcher, config);
        let mut selection = SelectionState::new();

        selection.toggle("clothes");
        matcher.on_selection_change(&selection.snapshot());
        selection.toggle("clothes");
        matcher.on_selection_change(&selection.snapshot());

        slow.notify_one();
        let event = matcher.next_event().await.expect("slow fetch completes");

        assert!(matches!(event, MatchEvent::Discarded { .. }));
        assert!(matcher.results().is_empty());
    }

    #[tokio::test]
    async fn failure_keeps_previous_results_by_default() {
        let fetcher = Arc::new(FakeFetcher::default());
        fetcher.push(Scripted::Batch(vec![post("0", "clothes", None)]));
        fetcher.push(Scripted::Decode);
        let mut matcher = matcher(&fetcher, MatcherConfig::default());
        let mut selection = SelectionState::new();

        selection.toggle("clothes");
        matcher.on_selection_change(&selection.snapshot());
        matcher.settle().await;
        selection.toggle("social");
        matcher.on_selection_change(&selection.snapshot());
        let events = matcher.settle().await;

        assert!(matches!(events.as_slice(), [MatchEvent::Failed { revision: 2, .. }]));
        assert_eq!(ids(matcher.results()), vec!["0"]);
        assert!(!matcher.is_loading());
        assert!(matcher.state().last_error.is_some());
    }

    #[tokio::test]
    async fn failure_clears_results_under_clear_policy() {
        let fetcher = Arc::new(FakeFetcher::default());
        fetcher.push(Scripted::Batch(vec![post("0", "clothes", None)]));
        fetcher.push(Scripted::Status(503));
        let config = MatcherConfig {
            failure_policy: FailurePolicy::Clear,
            ..MatcherConfig::default()
        };
        let mut matcher = matcher(&fetcher, config);
        let mut selection = SelectionState::new();

        selection.toggle("clothes");
        matcher.on_selection_change(&selection.snapshot());
        matcher.settle().await;
        selection.toggle("social");
        matcher.on_selection_change(&selection.snapshot());
        matcher.settle().await;

        assert!(matcher.results().is_empty());
        assert!(!matcher.is_loading());
        assert_eq!(
            matcher.state().last_error.as_deref(),
            Some("posts API returned HTTP 503")
        );
    }

    #[tokio::test]
    async fn success_after_failure_clears_error() {
        let fetcher = Arc::new(FakeFetcher::default());
        fetcher.push(Scripted::Status(502));
        fetcher.push(Scripted::Batch(vec![post("0", "social", None)]));
        let mut matcher = matcher(&fetcher, MatcherConfig::default());
        let mut selection = SelectionState::new();

        selection.toggle("social");
        matcher.on_selection_change(&selection.snapshot());
        matcher.settle().await;
        assert!(matcher.state().last_error.is_some());

        selection.toggle("food");
        matcher.on_selection_change(&selection.snapshot());
        matcher.settle().await;

        assert_eq!(matcher.state().last_error, None);
        assert_eq!(ids(matcher.results()), vec!["0"]);
    }

    #[tokio::test]
    async fn early_stale_response_keeps_loading_for_latest() {
        let fetcher = Arc::new(FakeFetcher::default());
        fetcher.push(Scripted::Batch(vec![post("old", "clothes", None)]));
        let slow = fetcher.push_gated(Scripted::Batch(vec![
            post("new-clothes", "clothes", None),
            post("new-food", "food", None),
        ]));
        let mut matcher = matcher(&fetcher, MatcherConfig::default());
        let mut selection = SelectionState::new();

        selection.toggle("clothes");
        matcher.on_selection_change(&selection.snapshot());
        selection.toggle("food");
        matcher.on_selection_change(&selection.snapshot());

        let first = matcher.next_event().await.expect("stale fetch completes");
        assert_eq!(
            first,
            MatchEvent::Discarded {
                revision: 1,
                latest: 2
            }
        );
        assert!(matcher.is_loading());
        assert!(matcher.results().is_empty());

        slow.notify_one();
        let second = matcher.next_event().await.expect("latest fetch completes");

        assert_eq!(
            second,
            MatchEvent::Applied {
                revision: 2,
                matched: 2
            }
        );
        assert!(!matcher.is_loading());
        assert_eq!(ids(matcher.results()), vec!["new-clothes", "new-food"]);
    }

    #[tokio::test]
    async fn panicking_fetch_is_recorded_as_failure() {
        let fetcher = Arc::new(FakeFetcher::default());
        fetcher.push(Scripted::Batch(vec![post("0", "clothes", None)]));
        fetcher.push(Scripted::Panic);
        let config = MatcherConfig {
            failure_policy: FailurePolicy::Clear,
            ..MatcherConfig::default()
        };
        let mut matcher = matcher(&fetcher, config);
        let mut selection = SelectionState::new();

        selection.toggle("clothes");
        matcher.on_selection_change(&selection.snapshot());
        matcher.settle().await;
        selection.toggle("food");
        matcher.on_selection_change(&selection.snapshot());
        let events = matcher.settle().await;

        assert!(matches!(events.as_slice(), [MatchEvent::Failed { revision: 2, .. }]));
        assert!(matcher.results().is_empty());
        assert!(!matcher.is_loading());
        let error = matcher.state().last_error.as_deref().unwrap_or_default();
        assert!(error.starts_with("fetch task did not complete"), "{error}");
    }

    #[tokio::test]
    async fn stale_panicking_fetch_is_discarded() {
        let fetcher = Arc::new(FakeFetcher::default());
        let slow = fetcher.push_gated(Scripted::Panic);
        fetcher.push(Scripted::Batch(vec![post("0", "food", None)]));
        let mut matcher = matcher(&fetcher, MatcherConfig::default());
        let mut selection = SelectionState::new();

        selection.toggle("clothes");
        matcher.on_selection_change(&selection.snapshot());
        selection.toggle("food");
        matcher.on_selection_change(&selection.snapshot());

        matcher.next_event().await.expect("latest fetch completes");
        slow.notify_one();
        let late = matcher.next_event().await.expect("stale fetch completes");

        assert_eq!(
            late,
            MatchEvent::Discarded {
                revision: 1,
                latest: 2
            }
        );
        assert_eq!(matcher.state().last_error, None);
        assert_eq!(ids(matcher.results()), vec!["0"]);
    }
}
