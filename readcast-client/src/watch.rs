//! Job status synchronizer
//!
//! Follows one conversion job from creation to its terminal state. A
//! subscription opens the backend's Server-Sent Events endpoint and, if
//! streaming is unavailable or drops before a terminal update, downgrades
//! once to fixed-interval polling. It never upgrades back.
//!
//! Subscription states: streaming, polling, terminated. Terminated is
//! absorbing; it is reached on a terminal (`DONE`/`ERROR`) update, on a
//! poll failure, or on [`WatchHandle::cancel`]. Each subscription owns
//! its transport and timer; concurrent subscriptions are independent.
//!
//! Failure handling follows the backend's quirks: malformed event
//! payloads are dropped (logged at debug, never fatal), while a single
//! polling failure ends the subscription through the transport-error
//! callback. The caller decides whether to resubscribe.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, stream};
use reqwest::Method;
use reqwest::header::ACCEPT;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::ReadcastClient;
use crate::sse::SseDecoder;
use readcast_core::domain::job::JobUpdate;
use readcast_core::dto::job::RawJobUpdate;

/// Polling cadence the deployed backend is tuned for. Kept at 3 s for
/// compatibility; override through [`WatchOptions`] only in tests.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// Tunable parameters for a job subscription.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Delay between consecutive status fetches once polling.
    pub poll_interval: Duration,
    /// Attempt the event stream first. When false the subscription polls
    /// from the start, as if streaming were unavailable.
    pub streaming: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            streaming: true,
        }
    }
}

/// Failure of the update channel itself, as opposed to a job that failed
/// server-side (which arrives as a normal `ERROR` update).
#[derive(Debug, Clone, thiserror::Error)]
#[error("transport failure: {message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<crate::ClientError> for TransportError {
    fn from(err: crate::ClientError) -> Self {
        Self::new(err.to_string())
    }
}

/// Raw event payloads as produced by the streaming transport.
pub type EventStream = BoxStream<'static, std::result::Result<String, TransportError>>;

/// Update channel to the backend for one job.
///
/// The seam exists so the synchronizer logic can be exercised against a
/// scripted transport; production code uses [`HttpTransport`].
#[async_trait]
pub trait JobTransport: Send + Sync + 'static {
    /// Open the live event stream for a job.
    ///
    /// An error here means streaming is unavailable, which is not fatal:
    /// the subscription downgrades to polling.
    async fn open_events(&self, job_id: &str) -> std::result::Result<EventStream, TransportError>;

    /// Fetch the job's current status once.
    async fn fetch_status(&self, job_id: &str) -> std::result::Result<JobUpdate, TransportError>;
}

/// Production transport: SSE and status fetches over the backend API.
pub struct HttpTransport {
    client: ReadcastClient,
}

impl HttpTransport {
    pub fn new(client: ReadcastClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JobTransport for HttpTransport {
    async fn open_events(&self, job_id: &str) -> std::result::Result<EventStream, TransportError> {
        let url = format!("{}/api/jobs/{}/events", self.client.base_url(), job_id);
        let response = self
            .client
            .request(Method::GET, &url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::new(format!(
                "event stream request returned status {status}"
            )));
        }

        // Named events (the backend's bare "progress"/"end" notifications)
        // carry no job record, so only unnamed message events pass through.
        // The poll fallback picks up the final state if the server closes
        // the stream after an "end" event.
        let mut decoder = SseDecoder::new();
        let events = response
            .bytes_stream()
            .flat_map(move |chunk| {
                let items: Vec<std::result::Result<String, TransportError>> = match chunk {
                    Ok(bytes) => decoder
                        .feed(&bytes)
                        .into_iter()
                        .filter(|event| event.is_message())
                        .map(|event| Ok(event.data))
                        .collect(),
                    Err(err) => vec![Err(TransportError::from(err))],
                };
                stream::iter(items)
            })
            .boxed();

        Ok(events)
    }

    async fn fetch_status(&self, job_id: &str) -> std::result::Result<JobUpdate, TransportError> {
        Ok(self.client.get_job(job_id).await?)
    }
}

fn lock(gate: &Mutex<()>) -> MutexGuard<'_, ()> {
    gate.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Serializes callback delivery against cancellation.
struct Dispatcher {
    token: CancellationToken,
    gate: Arc<Mutex<()>>,
    on_update: Box<dyn FnMut(JobUpdate) + Send>,
    on_transport_error: Box<dyn FnMut(TransportError) + Send>,
}

impl Dispatcher {
    /// Returns false when the subscription was cancelled; the caller must
    /// stop without delivering anything further.
    fn deliver_update(&mut self, update: JobUpdate) -> bool {
        let _gate = lock(&self.gate);
        if self.token.is_cancelled() {
            return false;
        }
        (self.on_update)(update);
        true
    }

    fn deliver_transport_error(&mut self, err: TransportError) {
        let _gate = lock(&self.gate);
        if self.token.is_cancelled() {
            return;
        }
        (self.on_transport_error)(err);
    }
}

/// Handle to a running subscription.
///
/// Dropping the handle cancels the subscription; [`WatchHandle::wait`]
/// drives it to natural termination instead.
pub struct WatchHandle {
    token: CancellationToken,
    gate: Arc<Mutex<()>>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Unsubscribe immediately.
    ///
    /// Idempotent, and no callback fires after this returns: a delivery
    /// already in flight holds the gate, so taking it here waits that
    /// delivery out, and every later delivery observes the cancelled
    /// token and is discarded.
    pub fn cancel(&self) {
        self.token.cancel();
        drop(lock(&self.gate));
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait until the subscription terminates on its own (terminal
    /// status, poll failure, or an earlier cancel).
    pub async fn wait(mut self) {
        let _ = (&mut self.task).await;
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Subscribe to live status updates for one job.
///
/// `on_update` receives every normalized update in arrival order;
/// `on_transport_error` fires at most once, when the transport itself
/// fails fatally (not when the job reports `ERROR`). The subscription
/// ends after a terminal update, a transport failure while polling, or
/// [`WatchHandle::cancel`].
pub fn subscribe<T, U, E>(
    transport: T,
    job_id: impl Into<String>,
    opts: WatchOptions,
    on_update: U,
    on_transport_error: E,
) -> WatchHandle
where
    T: JobTransport,
    U: FnMut(JobUpdate) + Send + 'static,
    E: FnMut(TransportError) + Send + 'static,
{
    let token = CancellationToken::new();
    let gate = Arc::new(Mutex::new(()));
    let mut dispatcher = Dispatcher {
        token: token.clone(),
        gate: gate.clone(),
        on_update: Box::new(on_update),
        on_transport_error: Box::new(on_transport_error),
    };
    let job_id = job_id.into();
    let cancelled = token.clone();

    let task = tokio::spawn(async move {
        tokio::select! {
            _ = cancelled.cancelled() => {}
            _ = run(transport, &job_id, opts, &mut dispatcher) => {}
        }
    });

    WatchHandle { token, gate, task }
}

async fn run<T: JobTransport>(
    transport: T,
    job_id: &str,
    opts: WatchOptions,
    dispatcher: &mut Dispatcher,
) {
    if opts.streaming {
        match transport.open_events(job_id).await {
            Ok(mut events) => {
                tracing::debug!(job_id, "Watching job over event stream");
                loop {
                    match events.next().await {
                        Some(Ok(payload)) => {
                            let update = match serde_json::from_str::<RawJobUpdate>(&payload) {
                                Ok(raw) => raw.normalize(),
                                Err(err) => {
                                    // Malformed payloads are dropped, never fatal.
                                    tracing::debug!(
                                        job_id,
                                        %err,
                                        "Dropping malformed event payload"
                                    );
                                    continue;
                                }
                            };
                            let terminal = update.is_terminal();
                            if !dispatcher.deliver_update(update) {
                                return;
                            }
                            if terminal {
                                tracing::debug!(job_id, "Terminal status received over stream");
                                return;
                            }
                        }
                        Some(Err(err)) => {
                            tracing::debug!(job_id, %err, "Event stream failed, downgrading to polling");
                            break;
                        }
                        None => {
                            tracing::debug!(
                                job_id,
                                "Event stream closed before terminal status, downgrading to polling"
                            );
                            break;
                        }
                    }
                }
            }
            Err(err) => {
                tracing::debug!(job_id, %err, "Event stream unavailable, falling back to polling");
            }
        }
    }

    // Polling fallback. Reached at most once per subscription: nothing
    // below ever returns to streaming. The first fetch waits a full
    // interval rather than firing immediately after the downgrade.
    loop {
        tokio::time::sleep(opts.poll_interval).await;
        match transport.fetch_status(job_id).await {
            Ok(update) => {
                let terminal = update.is_terminal();
                if !dispatcher.deliver_update(update) {
                    return;
                }
                if terminal {
                    tracing::debug!(job_id, "Terminal status received while polling");
                    return;
                }
            }
            Err(err) => {
                // A single poll failure ends the subscription.
                tracing::debug!(job_id, %err, "Status poll failed, terminating subscription");
                dispatcher.deliver_transport_error(err);
                return;
            }
        }
    }
}

/// One item of the channel returned by [`ReadcastClient::watch_job`].
#[derive(Debug)]
pub enum WatchEvent {
    Update(JobUpdate),
    TransportError(TransportError),
}

impl ReadcastClient {
    /// Subscribe to a job and receive updates through a channel instead
    /// of callbacks.
    pub fn watch_job(
        &self,
        job_id: impl Into<String>,
        opts: WatchOptions,
    ) -> (WatchHandle, mpsc::UnboundedReceiver<WatchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let err_tx = tx.clone();
        let handle = subscribe(
            HttpTransport::new(self.clone()),
            job_id,
            opts,
            move |update| {
                let _ = tx.send(WatchEvent::Update(update));
            },
            move |err| {
                let _ = err_tx.send(WatchEvent::TransportError(err));
            },
        );
        (handle, rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    use readcast_core::domain::job::JobStatus;

    const TICK: Duration = Duration::from_millis(20);

    fn opts(streaming: bool) -> WatchOptions {
        WatchOptions {
            poll_interval: TICK,
            streaming,
        }
    }

    fn payload(status: &str) -> String {
        format!(r#"{{"id":"abc123","status":"{status}"}}"#)
    }

    fn update(status: JobStatus) -> JobUpdate {
        JobUpdate {
            id: "abc123".to_string(),
            status,
            progress: None,
            error: None,
            preview_text: None,
            output_mp3_url: None,
            output_m4b_url: None,
            download_mp3_url: None,
            download_m4b_url: None,
        }
    }

    enum StreamScript {
        /// open_events fails.
        Unavailable,
        /// Stream yields these items, then ends.
        Items(Vec<std::result::Result<String, TransportError>>),
        /// Stream opens but never yields.
        Hang,
    }

    #[derive(Default)]
    struct MockInner {
        stream: Mutex<Option<StreamScript>>,
        polls: Mutex<VecDeque<std::result::Result<JobUpdate, TransportError>>>,
        open_calls: AtomicUsize,
        fetch_calls: AtomicUsize,
    }

    #[derive(Clone, Default)]
    struct MockTransport(Arc<MockInner>);

    impl MockTransport {
        fn streaming(script: StreamScript) -> Self {
            let mock = Self::default();
            *mock.0.stream.lock().unwrap() = Some(script);
            mock
        }

        fn with_polls(
            self,
            polls: Vec<std::result::Result<JobUpdate, TransportError>>,
        ) -> Self {
            *self.0.polls.lock().unwrap() = polls.into();
            self
        }

        fn open_calls(&self) -> usize {
            self.0.open_calls.load(Ordering::SeqCst)
        }

        fn fetch_calls(&self) -> usize {
            self.0.fetch_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JobTransport for MockTransport {
        async fn open_events(
            &self,
            _job_id: &str,
        ) -> std::result::Result<EventStream, TransportError> {
            self.0.open_calls.fetch_add(1, Ordering::SeqCst);
            let script = self.0.stream.lock().unwrap().take();
            match script {
                Some(StreamScript::Items(items)) => Ok(stream::iter(items).boxed()),
                Some(StreamScript::Hang) => Ok(stream::pending().boxed()),
                Some(StreamScript::Unavailable) | None => {
                    Err(TransportError::new("streaming unavailable"))
                }
            }
        }

        async fn fetch_status(
            &self,
            _job_id: &str,
        ) -> std::result::Result<JobUpdate, TransportError> {
            self.0.fetch_calls.fetch_add(1, Ordering::SeqCst);
            self.0
                .polls
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::new("no scripted poll response")))
        }
    }

    struct Recorder {
        updates: Arc<Mutex<Vec<JobUpdate>>>,
        errors: Arc<AtomicUsize>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                updates: Arc::new(Mutex::new(Vec::new())),
                errors: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn callbacks(
            &self,
        ) -> (
            impl FnMut(JobUpdate) + Send + 'static,
            impl FnMut(TransportError) + Send + 'static,
        ) {
            let updates = self.updates.clone();
            let errors = self.errors.clone();
            (
                move |update| updates.lock().unwrap().push(update),
                move |_err| {
                    errors.fetch_add(1, Ordering::SeqCst);
                },
            )
        }

        fn updates(&self) -> Vec<JobUpdate> {
            self.updates.lock().unwrap().clone()
        }

        fn errors(&self) -> usize {
            self.errors.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn test_stream_stops_at_terminal_status() {
        let mock = MockTransport::streaming(StreamScript::Items(vec![
            Ok(payload("pending")),
            Ok(payload("done")),
            // Must never be delivered: terminal states are sticky.
            Ok(payload("processing")),
        ]));
        let recorder = Recorder::new();
        let (on_update, on_error) = recorder.callbacks();

        let handle = subscribe(mock.clone(), "abc123", opts(true), on_update, on_error);
        handle.wait().await;

        let updates = recorder.updates();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].status, JobStatus::Pending);
        assert_eq!(updates[1].status, JobStatus::Done);
        assert_eq!(recorder.errors(), 0);
        // Terminal over the stream means polling never starts.
        assert_eq!(mock.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent_and_silences_callbacks() {
        let mock = MockTransport::streaming(StreamScript::Hang);
        let recorder = Recorder::new();
        let (on_update, on_error) = recorder.callbacks();

        let handle = subscribe(mock, "abc123", opts(true), on_update, on_error);
        tokio::time::sleep(TICK).await;

        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
        handle.wait().await;

        tokio::time::sleep(TICK).await;
        assert!(recorder.updates().is_empty());
        assert_eq!(recorder.errors(), 0);
    }

    #[tokio::test]
    async fn test_stream_error_downgrades_to_polling_exactly_once() {
        let mock = MockTransport::streaming(StreamScript::Items(vec![
            Ok(payload("processing")),
            Err(TransportError::new("connection reset")),
        ]))
        .with_polls(vec![
            Ok(update(JobStatus::Processing)),
            Ok(update(JobStatus::Done)),
        ]);
        let recorder = Recorder::new();
        let (on_update, on_error) = recorder.callbacks();

        let started = Instant::now();
        let handle = subscribe(mock.clone(), "abc123", opts(true), on_update, on_error);
        handle.wait().await;

        let updates = recorder.updates();
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[2].status, JobStatus::Done);
        assert_eq!(recorder.errors(), 0);
        // One stream, never reopened; polling does the rest.
        assert_eq!(mock.open_calls(), 1);
        assert_eq!(mock.fetch_calls(), 2);
        // The first poll waits a full interval after the downgrade.
        assert!(started.elapsed() >= TICK * 2);
    }

    #[tokio::test]
    async fn test_progress_sentinel_reaches_consumer_as_progress() {
        let mock = MockTransport::streaming(StreamScript::Items(vec![
            Ok(r#"{"id":"abc123","status":"processing","error":"PROGRESS::55"}"#.to_string()),
            Ok(payload("done")),
        ]));
        let recorder = Recorder::new();
        let (on_update, on_error) = recorder.callbacks();

        subscribe(mock, "abc123", opts(true), on_update, on_error)
            .wait()
            .await;

        let updates = recorder.updates();
        assert_eq!(updates[0].progress, Some(55));
        assert_eq!(updates[0].error, None);
        assert_eq!(recorder.errors(), 0);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_dropped_not_fatal() {
        let mock = MockTransport::streaming(StreamScript::Items(vec![
            Ok("this is not json".to_string()),
            Ok(payload("QUEUED")), // unknown status, also dropped
            Ok(payload("done")),
        ]));
        let recorder = Recorder::new();
        let (on_update, on_error) = recorder.callbacks();

        subscribe(mock.clone(), "abc123", opts(true), on_update, on_error)
            .wait()
            .await;

        let updates = recorder.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].status, JobStatus::Done);
        assert_eq!(recorder.errors(), 0);
        // Dropped messages did not trigger the polling fallback.
        assert_eq!(mock.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_polling_scenario_stops_after_terminal() {
        let done = JobUpdate {
            output_mp3_url: Some("http://x/a.mp3".to_string()),
            ..update(JobStatus::Done)
        };
        let mock = MockTransport::streaming(StreamScript::Unavailable)
            .with_polls(vec![Ok(update(JobStatus::Pending)), Ok(done)]);
        let recorder = Recorder::new();
        let (on_update, on_error) = recorder.callbacks();

        subscribe(mock.clone(), "abc123", opts(true), on_update, on_error)
            .wait()
            .await;

        let updates = recorder.updates();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].status, JobStatus::Pending);
        assert_eq!(updates[1].status, JobStatus::Done);
        assert_eq!(updates[1].output_mp3_url.as_deref(), Some("http://x/a.mp3"));
        // No third request after the terminal response.
        assert_eq!(mock.fetch_calls(), 2);
        assert_eq!(recorder.errors(), 0);
    }

    #[tokio::test]
    async fn test_poll_failure_is_fatal_and_surfaced_once() {
        let mock = MockTransport::streaming(StreamScript::Unavailable).with_polls(vec![
            Ok(update(JobStatus::Pending)),
            Err(TransportError::new("connection refused")),
        ]);
        let recorder = Recorder::new();
        let (on_update, on_error) = recorder.callbacks();

        subscribe(mock.clone(), "abc123", opts(true), on_update, on_error)
            .wait()
            .await;

        assert_eq!(recorder.updates().len(), 1);
        assert_eq!(recorder.errors(), 1);
        // No retry after the failed fetch.
        assert_eq!(mock.fetch_calls(), 2);
    }

    #[tokio::test]
    async fn test_streaming_disabled_skips_the_stream() {
        let mock =
            MockTransport::streaming(StreamScript::Hang).with_polls(vec![Ok(update(JobStatus::Done))]);
        let recorder = Recorder::new();
        let (on_update, on_error) = recorder.callbacks();

        subscribe(mock.clone(), "abc123", opts(false), on_update, on_error)
            .wait()
            .await;

        assert_eq!(mock.open_calls(), 0);
        assert_eq!(mock.fetch_calls(), 1);
        assert_eq!(recorder.updates().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_after_natural_termination_is_a_noop() {
        let mock = MockTransport::streaming(StreamScript::Items(vec![Ok(payload("done"))]));
        let recorder = Recorder::new();
        let (on_update, on_error) = recorder.callbacks();

        let handle = subscribe(mock, "abc123", opts(true), on_update, on_error);
        tokio::time::sleep(TICK).await;

        handle.cancel();
        handle.wait().await;
        assert_eq!(recorder.updates().len(), 1);
        assert_eq!(recorder.errors(), 0);
    }

    #[tokio::test]
    async fn test_default_poll_interval_is_three_seconds() {
        // Wire-compat constant; the deployed backend expects this cadence.
        assert_eq!(DEFAULT_POLL_INTERVAL, Duration::from_millis(3000));
        assert_eq!(WatchOptions::default().poll_interval, DEFAULT_POLL_INTERVAL);
        assert!(WatchOptions::default().streaming);
    }
}
