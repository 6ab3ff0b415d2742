//! In-memory connector and property server for tests.
//!
//! [`MockConnector`] stands in for a real handshake: it counts handshakes,
//! can be told to fail or to take a while, and can sever the links it
//! created. [`MockServer`] answers property requests from a fixed table of
//! resources and records every request it receives.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::dav::{Depth, PropertyBundle, PropertyFetcher, PropertyName};
use crate::error::{AccessError, ConnectError, ProtocolError, Result};
use crate::pool::{ConnectionTarget, Connector, HostConfig, Transport};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct ConnectorState {
    handshakes: AtomicUsize,
    closed: AtomicUsize,
    failures: AtomicUsize,
    next_channel: AtomicU64,
    links: Mutex<Vec<Arc<AtomicBool>>>,
}

/// A connector whose handshakes succeed instantly unless told otherwise.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<ConnectorState>,
    delay: Option<Duration>,
    channel_delay: Option<Duration>,
}

impl MockConnector {
    /// Create a connector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` handshakes with a connection error.
    #[must_use]
    pub fn fail_next(self, count: usize) -> Self {
        self.state.failures.store(count, Ordering::SeqCst);
        self
    }

    /// Make every handshake take `delay`.
    #[must_use]
    pub const fn handshake_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make every channel request take `delay` after the link accepted it.
    #[must_use]
    pub const fn channel_delay(mut self, delay: Duration) -> Self {
        self.channel_delay = Some(delay);
        self
    }

    /// Handshakes attempted so far, failed ones included.
    #[must_use]
    pub fn handshakes(&self) -> usize {
        self.state.handshakes.load(Ordering::SeqCst)
    }

    /// Links closed through [`Transport::close`].
    #[must_use]
    pub fn closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    /// Sever every link created so far, as if the peer went away.
    pub fn drop_links(&self) {
        for link in lock(&self.state.links).iter() {
            link.store(true, Ordering::SeqCst);
        }
    }
}

impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(
        &self,
        target: &ConnectionTarget,
        _config: &HostConfig,
        _timeout: Duration,
    ) -> Result<MockTransport> {
        self.state.handshakes.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let fail = self
            .state
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Err(ConnectError::connection(&target.host, target.port, "scripted failure").into());
        }

        let link = Arc::new(AtomicBool::new(false));
        lock(&self.state.links).push(Arc::clone(&link));
        Ok(MockTransport {
            state: Arc::clone(&self.state),
            link,
            channel_delay: self.channel_delay,
        })
    }
}

/// A link produced by [`MockConnector`].
#[derive(Debug)]
pub struct MockTransport {
    state: Arc<ConnectorState>,
    link: Arc<AtomicBool>,
    channel_delay: Option<Duration>,
}

/// A logical channel over a [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockChannel {
    id: u64,
}

impl MockChannel {
    /// Unique channel id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }
}

impl Transport for MockTransport {
    type Channel = MockChannel;

    async fn open_channel(&self) -> Result<MockChannel> {
        if self.is_closed() {
            return Err(ConnectError::channel("link closed").into());
        }
        let id = self.state.next_channel.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.channel_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(MockChannel { id })
    }

    fn is_closed(&self) -> bool {
        self.link.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        if !self.link.swap(true, Ordering::SeqCst) {
            self.state.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// One request received by [`MockServer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Requested path.
    pub path: String,
    /// Requested depth.
    pub depth: Depth,
    /// Requested label.
    pub label: Option<String>,
    /// Requested properties.
    pub properties: Vec<PropertyName>,
}

#[derive(Debug, Clone)]
enum Response {
    Resource(PropertyBundle),
    Empty,
    Error(ProtocolError),
}

/// A property server backed by a table of known resources.
///
/// Unknown paths answer "not found". Resources answer with the subset of
/// requested properties they carry.
#[derive(Debug, Default)]
pub struct MockServer {
    responses: HashMap<String, Response>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockServer {
    /// Create a server that knows no resources.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bundle` at its path.
    #[must_use]
    pub fn with_resource(mut self, bundle: PropertyBundle) -> Self {
        self.responses
            .insert(bundle.path().to_string(), Response::Resource(bundle));
        self
    }

    /// Answer requests for `path` with no resources.
    #[must_use]
    pub fn with_empty(mut self, path: impl Into<String>) -> Self {
        self.responses.insert(path.into(), Response::Empty);
        self
    }

    /// Answer requests for `path` with `error`.
    #[must_use]
    pub fn with_error(mut self, path: impl Into<String>, error: ProtocolError) -> Self {
        self.responses.insert(path.into(), Response::Error(error));
        self
    }

    /// Number of requests received.
    #[must_use]
    pub fn requests(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Paths of all requests, in order.
    #[must_use]
    pub fn requested_paths(&self) -> Vec<String> {
        lock(&self.requests).iter().map(|r| r.path.clone()).collect()
    }

    /// The most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<RecordedRequest> {
        lock(&self.requests).last().cloned()
    }

    fn respond(&self, path: &str, properties: &[PropertyName]) -> Result<Vec<PropertyBundle>> {
        match self.responses.get(path) {
            None => Err(AccessError::Protocol(ProtocolError::not_found(path))),
            Some(Response::Error(err)) => Err(AccessError::Protocol(err.clone())),
            Some(Response::Empty) => Ok(Vec::new()),
            Some(Response::Resource(bundle)) => {
                let mut answer = PropertyBundle::new(bundle.path());
                for name in properties {
                    if let Some(value) = bundle.get(name) {
                        answer.set(name.clone(), value);
                    }
                }
                Ok(vec![answer])
            }
        }
    }
}

impl PropertyFetcher for MockServer {
    fn fetch_properties(
        &self,
        path: &str,
        depth: Depth,
        label: Option<&str>,
        properties: &[PropertyName],
    ) -> impl std::future::Future<Output = Result<Vec<PropertyBundle>>> + Send {
        lock(&self.requests).push(RecordedRequest {
            path: path.to_string(),
            depth,
            label: label.map(str::to_owned),
            properties: properties.to_vec(),
        });
        tracing::trace!(path = %path, depth = %depth, "Mock property request");
        std::future::ready(self.respond(path, properties))
    }
}
