use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::service_client::VisualizationSource;
use crate::visualization::handle::{HandleLedger, ResourceHandle};

/// Shown to the user for any fetch failure; remote detail goes to the log.
pub const LOAD_FAILURE_MESSAGE: &str = "Failed to load visualization.";

/// What the presentation layer renders for a visualization view.
#[derive(Debug)]
pub enum VisualizationViewState {
    /// No identifier requested yet, or the loader was torn down.
    Idle,
    Loading,
    Ready { handle: ResourceHandle },
    Error { message: String },
}

impl VisualizationViewState {
    pub fn is_loading(&self) -> bool {
        matches!(self, VisualizationViewState::Loading)
    }

    /// Ready or Error: the latest request has an outcome.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            VisualizationViewState::Ready { .. } | VisualizationViewState::Error { .. }
        )
    }

    pub fn handle(&self) -> Option<&ResourceHandle> {
        match self {
            VisualizationViewState::Ready { handle } => Some(handle),
            _ => None,
        }
    }
}

/// State shared with in-flight fetch tasks.
struct Shared {
    /// Bumped for every new request and on teardown. A fetch may only apply
    /// its result while its stamp is still current.
    generation: AtomicU64,
    state: watch::Sender<VisualizationViewState>,
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Installs `next` if `generation` is still the latest request.
    /// The check runs under the channel's write lock, so a concurrent
    /// supersede either sees the new state and releases it, or wins first
    /// and this result is discarded.
    fn apply(&self, generation: u64, next: VisualizationViewState) -> bool {
        let mut stale = None;
        let applied = self.state.send_if_modified(|state| {
            if self.is_current(generation) {
                *state = next;
                true
            } else {
                stale = Some(next);
                false
            }
        });
        drop(stale);
        applied
    }

    /// Moves to `state`, returning whatever was displayed before so the
    /// caller releases it after the new state is visible.
    fn supersede(&self, state: VisualizationViewState) -> (u64, VisualizationViewState) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let previous = self.state.send_replace(state);
        (generation, previous)
    }
}

/// Fetches the visualization for one entity at a time and owns the
/// resulting resource handle.
///
/// Last request wins: a response for a superseded identifier is dropped
/// without touching the view state.
pub struct VisualizationLoader {
    source: Arc<dyn VisualizationSource>,
    ledger: Arc<HandleLedger>,
    shared: Arc<Shared>,
    requested: Option<String>,
    tasks: Vec<JoinHandle<()>>,
}

impl VisualizationLoader {
    pub fn new(source: Arc<dyn VisualizationSource>) -> Self {
        Self::with_ledger(source, HandleLedger::new())
    }

    pub fn with_ledger(source: Arc<dyn VisualizationSource>, ledger: Arc<HandleLedger>) -> Self {
        let (state, _) = watch::channel(VisualizationViewState::Idle);
        Self {
            source,
            ledger,
            shared: Arc::new(Shared {
                generation: AtomicU64::new(0),
                state,
            }),
            requested: None,
            tasks: Vec::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<VisualizationViewState> {
        self.shared.state.subscribe()
    }

    /// Runs `f` against the current view state.
    pub fn with_state<R>(&self, f: impl FnOnce(&VisualizationViewState) -> R) -> R {
        f(&self.shared.state.borrow())
    }

    pub fn ledger(&self) -> &Arc<HandleLedger> {
        &self.ledger
    }

    pub fn requested(&self) -> Option<&str> {
        self.requested.as_deref()
    }

    /// Requests the visualization for `entity_id`.
    ///
    /// Blank identifiers and the identifier already requested are ignored.
    /// Otherwise the view moves to `Loading`, any held handle is released,
    /// and a fetch is started in the background. Must be called from within
    /// a Tokio runtime.
    pub fn load(&mut self, entity_id: &str) {
        let entity_id = entity_id.trim();
        if entity_id.is_empty() {
            debug!("Ignoring visualization request with empty entity id");
            return;
        }
        if self.requested.as_deref() == Some(entity_id) {
            return;
        }
        self.start(entity_id.to_string());
    }

    /// Fetches the current identifier again, e.g. after an error.
    pub fn reload(&mut self) {
        if let Some(entity_id) = self.requested.clone() {
            self.start(entity_id);
        }
    }

    /// Returns the view to `Idle`, discarding any outstanding fetch and
    /// releasing the held handle.
    pub fn reset(&mut self) {
        self.requested = None;
        for task in self.tasks.drain(..) {
            task.abort();
        }
        let (_, previous) = self.shared.supersede(VisualizationViewState::Idle);
        drop(previous);
    }

    fn start(&mut self, entity_id: String) {
        info!("Loading visualization for {entity_id}");
        self.requested = Some(entity_id.clone());

        let (generation, previous) = self.shared.supersede(VisualizationViewState::Loading);
        drop(previous);

        self.tasks.retain(|task| !task.is_finished());

        let source = self.source.clone();
        let ledger = self.ledger.clone();
        let shared = self.shared.clone();
        self.tasks.push(tokio::spawn(async move {
            let result = source.fetch_visualization(&entity_id).await;

            if !shared.is_current(generation) {
                debug!("Discarding stale visualization response for {entity_id}");
                return;
            }

            let next = match result {
                Ok(bytes) => materialize(entity_id.clone(), bytes, ledger).await,
                Err(e) => {
                    warn!("Visualization fetch for {entity_id} failed: {e}");
                    load_failure()
                }
            };

            if !shared.apply(generation, next) {
                debug!("Visualization for {entity_id} superseded before it was applied");
            }
        }));
    }
}

/// Writes the fetched image to its temp file on the blocking pool.
async fn materialize(
    entity_id: String,
    bytes: Bytes,
    ledger: Arc<HandleLedger>,
) -> VisualizationViewState {
    let id = entity_id.clone();
    let created =
        tokio::task::spawn_blocking(move || ResourceHandle::create(&id, bytes, ledger)).await;

    match created {
        Ok(Ok(handle)) => VisualizationViewState::Ready { handle },
        Ok(Err(e)) => {
            error!("Could not store visualization for {entity_id}: {e}");
            load_failure()
        }
        Err(e) => {
            error!("spawn_blocking failed storing visualization for {entity_id}: {e}");
            load_failure()
        }
    }
}

fn load_failure() -> VisualizationViewState {
    VisualizationViewState::Error {
        message: LOAD_FAILURE_MESSAGE.to_string(),
    }
}

impl Drop for VisualizationLoader {
    fn drop(&mut self) {
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bytes::Bytes;
    use tokio::sync::oneshot;

    use crate::errors::ClientError;

    type Reply = Result<Bytes, ClientError>;

    /// Each fetch parks until the test sends a reply for that identifier.
    #[derive(Default)]
    struct ScriptedSource {
        pending: Mutex<HashMap<String, oneshot::Receiver<Reply>>>,
        fetches: AtomicUsize,
        resolved: AtomicUsize,
    }

    impl ScriptedSource {
        fn expect(&self, entity_id: &str) -> oneshot::Sender<Reply> {
            let (tx, rx) = oneshot::channel();
            self.pending
                .lock()
                .unwrap()
                .insert(entity_id.to_string(), rx);
            tx
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        fn resolved(&self) -> usize {
            self.resolved.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VisualizationSource for ScriptedSource {
        async fn fetch_visualization(&self, entity_id: &str) -> Result<Bytes, ClientError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let rx = self
                .pending
                .lock()
                .unwrap()
                .remove(entity_id)
                .expect("unexpected fetch");
            let reply = rx.await.unwrap_or_else(|_| {
                Err(ClientError::MalformedResponse("reply dropped".to_string()))
            });
            self.resolved.fetch_add(1, Ordering::SeqCst);
            reply
        }
    }

    fn png(tag: &str) -> Bytes {
        let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
        bytes.extend_from_slice(tag.as_bytes());
        Bytes::from(bytes)
    }

    async fn settled(rx: &mut watch::Receiver<VisualizationViewState>) {
        rx.wait_for(VisualizationViewState::is_settled).await.unwrap();
    }

    async fn until(mut condition: impl FnMut() -> bool) {
        while !condition() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_loading_then_ready() {
        let source = Arc::new(ScriptedSource::default());
        let reply = source.expect("A");
        let mut loader = VisualizationLoader::new(source.clone());
        let mut rx = loader.subscribe();

        assert!(matches!(*rx.borrow(), VisualizationViewState::Idle));
        loader.load("A");
        assert!(rx.borrow_and_update().is_loading());

        reply.send(Ok(png("A"))).unwrap();
        settled(&mut rx).await;

        loader.with_state(|state| {
            let handle = state.handle().expect("ready");
            assert_eq!(handle.entity_id(), "A");
            assert_eq!(handle.bytes(), &png("A"));
        });
        assert_eq!(loader.ledger().live(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_shows_fixed_message() {
        let source = Arc::new(ScriptedSource::default());
        let reply = source.expect("A");
        let mut loader = VisualizationLoader::new(source.clone());
        let mut rx = loader.subscribe();

        loader.load("A");
        reply
            .send(Err(ClientError::Status {
                status: 500,
                body: "matplotlib exploded".to_string(),
            }))
            .unwrap();
        settled(&mut rx).await;

        loader.with_state(|state| match state {
            VisualizationViewState::Error { message } => {
                assert_eq!(message, LOAD_FAILURE_MESSAGE)
            }
            other => panic!("expected error state, got {other:?}"),
        });
        assert_eq!(loader.ledger().created(), 0);
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded() {
        let source = Arc::new(ScriptedSource::default());
        let reply_a = source.expect("A");
        let reply_b = source.expect("B");
        let mut loader = VisualizationLoader::new(source.clone());
        let mut rx = loader.subscribe();

        loader.load("A");
        loader.load("B");
        until(|| source.fetches() == 2).await;

        reply_b.send(Ok(png("B"))).unwrap();
        settled(&mut rx).await;

        reply_a.send(Ok(png("A"))).unwrap();
        until(|| source.resolved() == 2).await;
        tokio::task::yield_now().await;

        loader.with_state(|state| {
            let handle = state.handle().expect("ready");
            assert_eq!(handle.entity_id(), "B");
            assert_eq!(handle.bytes(), &png("B"));
        });
        assert_eq!(loader.ledger().created(), 1);
        assert_eq!(loader.ledger().live(), 1);
    }

    #[tokio::test]
    async fn test_stale_error_does_not_override_newer_request() {
        let source = Arc::new(ScriptedSource::default());
        let reply_a = source.expect("A");
        let reply_b = source.expect("B");
        let mut loader = VisualizationLoader::new(source.clone());

        loader.load("A");
        loader.load("B");
        until(|| source.fetches() == 2).await;

        reply_a
            .send(Err(ClientError::MalformedResponse("late".to_string())))
            .unwrap();
        until(|| source.resolved() == 1).await;
        tokio::task::yield_now().await;

        assert!(loader.with_state(VisualizationViewState::is_loading));
        drop(reply_b);
    }

    #[tokio::test]
    async fn test_new_identifier_releases_previous_handle() {
        let source = Arc::new(ScriptedSource::default());
        let reply_a = source.expect("A");
        let _reply_b = source.expect("B");
        let mut loader = VisualizationLoader::new(source.clone());
        let mut rx = loader.subscribe();

        loader.load("A");
        reply_a.send(Ok(png("A"))).unwrap();
        settled(&mut rx).await;
        let path_a = loader.with_state(|s| s.handle().unwrap().path().to_path_buf());

        loader.load("B");

        assert!(loader.with_state(VisualizationViewState::is_loading));
        assert_eq!(loader.ledger().released(), 1);
        assert_eq!(loader.ledger().live(), 0);
        assert!(!path_a.exists());
    }

    #[tokio::test]
    async fn test_teardown_releases_handle_exactly_once() {
        let source = Arc::new(ScriptedSource::default());
        let reply = source.expect("A");
        let ledger = HandleLedger::new();
        let mut loader = VisualizationLoader::with_ledger(source.clone(), ledger.clone());
        let mut rx = loader.subscribe();

        loader.load("A");
        reply.send(Ok(png("A"))).unwrap();
        settled(&mut rx).await;
        let path = loader.with_state(|s| s.handle().unwrap().path().to_path_buf());

        drop(loader);

        assert_eq!(ledger.created(), 1);
        assert_eq!(ledger.released(), 1);
        assert!(!path.exists());
        // A subscriber that outlives the view sees it closed, not a dangling handle.
        assert!(matches!(*rx.borrow(), VisualizationViewState::Idle));
    }

    #[tokio::test]
    async fn test_teardown_while_loading_ignores_late_response() {
        let source = Arc::new(ScriptedSource::default());
        let reply = source.expect("A");
        let ledger = HandleLedger::new();
        let mut loader = VisualizationLoader::with_ledger(source.clone(), ledger.clone());
        let rx = loader.subscribe();

        loader.load("A");
        until(|| source.fetches() == 1).await;
        drop(loader);

        // Fetch task was aborted, so nobody is listening any more.
        until(|| reply.is_closed()).await;
        assert!(reply.send(Ok(png("A"))).is_err());
        assert!(matches!(*rx.borrow(), VisualizationViewState::Idle));
        assert_eq!(ledger.created(), 0);
    }

    #[tokio::test]
    async fn test_blank_and_repeated_identifiers_do_not_refetch() {
        let source = Arc::new(ScriptedSource::default());
        let reply = source.expect("A");
        let mut loader = VisualizationLoader::new(source.clone());
        let mut rx = loader.subscribe();

        loader.load("   ");
        assert!(matches!(*rx.borrow(), VisualizationViewState::Idle));

        loader.load("A");
        reply.send(Ok(png("A"))).unwrap();
        settled(&mut rx).await;

        loader.load(" A ");
        tokio::task::yield_now().await;
        assert_eq!(source.fetches(), 1);
        assert!(loader.with_state(VisualizationViewState::is_settled));
    }

    #[tokio::test]
    async fn test_reload_fetches_current_identifier_again() {
        let source = Arc::new(ScriptedSource::default());
        let first = source.expect("A");
        let mut loader = VisualizationLoader::new(source.clone());
        let mut rx = loader.subscribe();

        loader.load("A");
        first
            .send(Err(ClientError::MalformedResponse("boom".to_string())))
            .unwrap();
        settled(&mut rx).await;

        let second = source.expect("A");
        loader.reload();
        assert!(rx.borrow_and_update().is_loading());
        second.send(Ok(png("A"))).unwrap();
        settled(&mut rx).await;

        assert_eq!(source.fetches(), 2);
        assert!(loader.with_state(|s| s.handle().is_some()));
    }

    #[tokio::test]
    async fn test_materialize_stores_image_in_handle() {
        let ledger = HandleLedger::new();

        let state = materialize("A".to_string(), png("A"), ledger.clone()).await;

        let handle = state.handle().expect("ready");
        assert_eq!(handle.entity_id(), "A");
        assert_eq!(std::fs::read(handle.path()).unwrap(), png("A"));
        assert_eq!(ledger.live(), 1);
    }

    #[tokio::test]
    async fn test_result_superseded_while_storing_is_released() {
        let (state, _rx) = watch::channel(VisualizationViewState::Idle);
        let shared = Shared {
            generation: AtomicU64::new(0),
            state,
        };
        let ledger = HandleLedger::new();

        let (first, _) = shared.supersede(VisualizationViewState::Loading);
        let next = materialize("A".to_string(), png("A"), ledger.clone()).await;
        shared.supersede(VisualizationViewState::Loading);

        assert!(!shared.apply(first, next));
        assert!(shared.state.borrow().is_loading());
        assert_eq!(ledger.created(), 1);
        assert_eq!(ledger.released(), 1);
    }
}
