//! Shared test doubles for lifecycle tests.
#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use service_foundation::lifecycle::{BoxError, FatalError, FatalHandler, Processor, StopHandle};
use service_foundation::net::{ListenerError, RequestListener, RpcListener, ServeError, ShutdownError};

/// Ordered record of lifecycle events across processors and listeners.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }
}

/// Processor that records calls and can be told to fail or stop slowly.
pub struct RecordingProcessor {
    name: String,
    events: EventLog,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    fail_start: bool,
    fail_stop: bool,
    stop_delay: Duration,
}

impl RecordingProcessor {
    pub fn new(name: &str, events: &EventLog) -> Self {
        Self {
            name: name.to_string(),
            events: events.clone(),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            fail_start: false,
            fail_stop: false,
            stop_delay: Duration::ZERO,
        }
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn stop_delay(mut self, delay: Duration) -> Self {
        self.stop_delay = delay;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Processor for RecordingProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, ctx: CancellationToken) -> Result<(), BoxError> {
        assert!(!ctx.is_cancelled(), "start token must be fresh");
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.events.push(format!("{}:start", self.name));
        if self.fail_start {
            return Err(format!("{} failed to start", self.name).into());
        }
        Ok(())
    }

    async fn stop(&self, done: StopHandle) -> Result<(), BoxError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.events.push(format!("{}:stop", self.name));

        let events = self.events.clone();
        let name = self.name.clone();
        let delay = self.stop_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            events.push(format!("{}:stopped", name));
            done.done();
        });

        if self.fail_stop {
            return Err(format!("{} failed to stop", self.name).into());
        }
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum StubBehavior {
    /// Serve until shut down, drain instantly.
    Healthy,
    /// Never drain; shutdown waits for the deadline and reports it.
    HangOnShutdown,
    /// The serve loop fails on its own after the delay.
    FailServeAfter(Duration),
    /// The endpoint cannot be acquired.
    FailBind,
}

/// Request listener double with scripted behavior.
pub struct StubRequestListener {
    events: EventLog,
    behavior: StubBehavior,
    stop: CancellationToken,
    pub serves: AtomicUsize,
    pub stopped: AtomicBool,
}

impl StubRequestListener {
    pub fn new(events: &EventLog, behavior: StubBehavior) -> Arc<Self> {
        Arc::new(Self {
            events: events.clone(),
            behavior,
            stop: CancellationToken::new(),
            serves: AtomicUsize::new(0),
            stopped: AtomicBool::new(false),
        })
    }

    pub fn serves(&self) -> usize {
        self.serves.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RequestListener for StubRequestListener {
    fn address(&self) -> String {
        "stub-http".to_string()
    }

    async fn listen_and_serve(&self) -> Result<(), ServeError> {
        self.serves.fetch_add(1, Ordering::SeqCst);
        self.events.push("http:serve");
        match self.behavior {
            StubBehavior::FailBind => Err(ServeError::Bind(ListenerError::Bind(io::Error::new(
                io::ErrorKind::AddrInUse,
                "address in use",
            )))),
            StubBehavior::FailServeAfter(delay) => {
                tokio::time::sleep(delay).await;
                Err(ServeError::Serve("serve loop crashed".into()))
            }
            _ => {
                self.stop.cancelled().await;
                Ok(())
            }
        }
    }

    async fn shutdown(&self, deadline: Instant) -> Result<(), ShutdownError> {
        self.events.push("http:shutdown");
        let result = if self.behavior == StubBehavior::HangOnShutdown {
            tokio::time::sleep_until(deadline).await;
            Err(ShutdownError::DeadlineExceeded)
        } else {
            Ok(())
        };
        self.stop.cancel();
        self.stopped.store(true, Ordering::SeqCst);
        result
    }
}

/// RPC listener double that serves until gracefully stopped.
pub struct StubRpcListener {
    address: String,
    events: EventLog,
    stop: CancellationToken,
    pub serves: AtomicUsize,
}

impl StubRpcListener {
    pub fn new(events: &EventLog) -> Arc<Self> {
        Arc::new(Self {
            address: free_address(),
            events: events.clone(),
            stop: CancellationToken::new(),
            serves: AtomicUsize::new(0),
        })
    }

    pub fn serves(&self) -> usize {
        self.serves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RpcListener for StubRpcListener {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn serve(&self, _listener: TcpListener) -> Result<(), BoxError> {
        self.serves.fetch_add(1, Ordering::SeqCst);
        self.events.push("rpc:serve");
        self.stop.cancelled().await;
        Ok(())
    }

    async fn graceful_stop(&self) {
        self.events.push("rpc:stop");
        self.stop.cancel();
    }
}

/// Fatal handler that records the error and cancels the run token instead of exiting.
pub struct RecordingFatal {
    pub errors: Mutex<Vec<String>>,
    token: CancellationToken,
}

impl RecordingFatal {
    pub fn new(token: &CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            errors: Mutex::new(Vec::new()),
            token: token.clone(),
        })
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl FatalHandler for RecordingFatal {
    fn fatal(&self, error: FatalError) {
        self.errors.lock().unwrap().push(error.to_string());
        self.token.cancel();
    }
}

/// A loopback address whose port was free a moment ago.
pub fn free_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().to_string()
}

/// HTTP client that ignores proxy settings and connection pooling, and
/// hands redirects back to the test.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Poll until something accepts connections on `address`.
pub async fn wait_for_listener(address: &str) {
    for _ in 0..100 {
        if TcpStream::connect(address).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("nothing listening on {}", address);
}
