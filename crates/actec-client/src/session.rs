//! TCP session to the gateway
//!
//! A [`Session`] owns one connection at a time. Two background loops share
//! it: the receive loop pulls frames through [`Session::responses`] (or
//! [`Session::next_response`]) and the ping loop writes keepalives. Either
//! may notice the connection is gone and call [`Session::reconnect`], which
//! coalesces so only one reconnect runs at once.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use actec_protocol::commands::{self, namespaces};
use actec_protocol::{FrameCodec, Message};
use futures::{FutureExt, SinkExt, Stream, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::state::{backoff_delay, ConnectionState};

/// Greeting the gateway sends on accept
pub const LOGIN_PROMPT: &[u8; 6] = b"login:";

/// Callback invoked on every state change
pub type StateListener = Arc<dyn Fn(ConnectionState) + Send + Sync>;

type Reader = FramedRead<OwnedReadHalf, FrameCodec>;
type Writer = FramedWrite<OwnedWriteHalf, FrameCodec>;

/// A self-healing connection to one gateway
pub struct Session {
    config: ClientConfig,
    state: watch::Sender<ConnectionState>,
    listener: Option<StateListener>,
    reader: tokio::sync::Mutex<Option<Reader>>,
    writer: tokio::sync::Mutex<Option<Writer>>,
    /// Cancelled when the current connection is torn down
    link: Mutex<CancellationToken>,
    /// Cancelled once, when the session closes for good
    shutdown: CancellationToken,
    reconnecting: tokio::sync::Mutex<()>,
    retry_count: AtomicU32,
    epoch: Instant,
    last_received_ms: AtomicU64,
}

impl Session {
    pub fn new(config: ClientConfig) -> Self {
        Self::build(config, None)
    }

    /// Create a session that reports state changes to `listener`
    ///
    /// The listener runs on whichever task caused the change and must not
    /// block.
    pub fn with_state_listener<F>(config: ClientConfig, listener: F) -> Self
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        Self::build(config, Some(Arc::new(listener)))
    }

    fn build(config: ClientConfig, listener: Option<StateListener>) -> Self {
        let link = CancellationToken::new();
        link.cancel();
        Self {
            config,
            state: watch::channel(ConnectionState::Disconnected).0,
            listener,
            reader: tokio::sync::Mutex::new(None),
            writer: tokio::sync::Mutex::new(None),
            link: Mutex::new(link),
            shutdown: CancellationToken::new(),
            reconnecting: tokio::sync::Mutex::new(()),
            retry_count: AtomicU32::new(0),
            epoch: Instant::now(),
            last_received_ms: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Whether frames can currently be exchanged
    pub fn available(&self) -> bool {
        self.state().is_available()
    }

    pub fn is_closed(&self) -> bool {
        self.state() == ConnectionState::Closed
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Failed reconnect attempts in the current streak
    pub fn retry_count(&self) -> u32 {
        self.retry_count.load(Ordering::SeqCst)
    }

    /// Time since the last frame arrived
    pub fn since_last_received(&self) -> Duration {
        let last = Duration::from_millis(self.last_received_ms.load(Ordering::SeqCst));
        self.epoch.elapsed().saturating_sub(last)
    }

    fn touch(&self) {
        let now = u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.last_received_ms.store(now, Ordering::SeqCst);
    }

    fn current_link(&self) -> CancellationToken {
        self.link
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Move to `to`, notifying the listener if the state actually changed
    fn transition(&self, to: ConnectionState) -> bool {
        let mut changed = false;
        self.state.send_if_modified(|current| match current.try_transition(to) {
            Ok(next) if next != *current => {
                *current = next;
                changed = true;
                true
            }
            Ok(_) => false,
            Err(err) => {
                debug!(%err, "ignoring state change");
                false
            }
        });

        if changed {
            debug!(host = %self.config.host, state = %to, "session state changed");
            if let Some(listener) = &self.listener {
                listener(to);
            }
        }
        changed
    }

    /// Open the connection and log in
    ///
    /// Fails with [`ClientError::UnsupportedGateway`] when the peer does not
    /// greet with `login:` and with [`ClientError::CredentialRejected`] when
    /// it hangs up inside the grace window after the credential is sent.
    pub async fn connect(&self) -> ClientResult<()> {
        match self.state() {
            ConnectionState::Closed => return Err(ClientError::Closed),
            ConnectionState::Connected => {
                warn!(host = %self.config.host, "connect called while already connected");
                return Ok(());
            }
            _ => {}
        }

        debug!(address = %self.config.address(), "connecting to gateway");
        let mut stream = TcpStream::connect((self.config.host.as_str(), self.config.port)).await?;

        let mut prompt = [0u8; LOGIN_PROMPT.len()];
        stream.read_exact(&mut prompt).await?;
        if &prompt != LOGIN_PROMPT {
            return Err(ClientError::UnsupportedGateway(
                String::from_utf8_lossy(&prompt).into_owned(),
            ));
        }

        let mut credential = Vec::with_capacity(self.config.credential.len() + 2);
        credential.extend_from_slice(self.config.credential.as_bytes());
        credential.extend_from_slice(b"\r\n");
        stream.write_all(&credential).await?;
        stream.flush().await?;

        // The gateway never acknowledges the credential; it just hangs up
        // on a bad one.
        tokio::time::sleep(self.config.liveness_grace).await;
        let mut probe = [0u8; 1];
        if !still_open(stream.peek(&mut probe).now_or_never()) {
            return Err(ClientError::CredentialRejected);
        }

        let (read_half, write_half) = stream.into_split();
        {
            let mut reader = self.reader.lock().await;
            let mut writer = self.writer.lock().await;
            *self.link.lock().unwrap_or_else(PoisonError::into_inner) = CancellationToken::new();
            *reader = Some(FramedRead::new(
                read_half,
                FrameCodec::new(self.config.token.clone()),
            ));
            *writer = Some(FramedWrite::new(
                write_half,
                FrameCodec::new(self.config.token.clone()),
            ));
        }
        self.touch();
        self.retry_count.store(0, Ordering::SeqCst);

        if !self.transition(ConnectionState::Connected) {
            // Closed while the handshake was running
            self.teardown().await;
            return Err(ClientError::Closed);
        }
        info!(address = %self.config.address(), "connected to gateway");
        Ok(())
    }

    /// Wait out the grace window, then reconnect if the gateway hung up
    pub async fn ensure_alive(&self) -> ClientResult<()> {
        tokio::time::sleep(self.config.liveness_grace).await;
        if self.is_closed() {
            return Err(ClientError::Closed);
        }
        if self.is_alive().await {
            return Ok(());
        }
        warn!(host = %self.config.host, "gateway closed the connection");
        self.reconnect().await
    }

    async fn is_alive(&self) -> bool {
        if self.current_link().is_cancelled() || self.writer.lock().await.is_none() {
            return false;
        }
        // A busy reader means the receive loop is on it and will see EOF itself
        match self.reader.try_lock() {
            Ok(mut guard) => match guard.as_mut() {
                Some(framed) => {
                    let mut probe = [0u8; 1];
                    still_open(framed.get_mut().peek(&mut probe).now_or_never())
                }
                None => false,
            },
            Err(_) => true,
        }
    }

    /// Tear down the connection
    ///
    /// With `reconnect` the session moves to `Reconnecting`, otherwise it is
    /// closed for good. Teardown errors are logged and swallowed.
    pub async fn close(&self, reconnect: bool) {
        let target = if reconnect {
            ConnectionState::Reconnecting
        } else {
            ConnectionState::Closed
        };
        self.transition(target);
        if !reconnect {
            self.shutdown.cancel();
        }
        self.teardown().await;
    }

    async fn teardown(&self) {
        self.current_link().cancel();
        self.reader.lock().await.take();
        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            if let Err(err) = writer.get_mut().shutdown().await {
                debug!(%err, "error shutting down gateway stream");
            }
        }
    }

    /// Drop the connection and dial until connected again
    ///
    /// Returns at once if another task is already reconnecting. Gives up
    /// only when the session is closed.
    pub async fn reconnect(&self) -> ClientResult<()> {
        let Ok(_guard) = self.reconnecting.try_lock() else {
            debug!("reconnect already in progress");
            return Ok(());
        };
        if self.is_closed() {
            return Err(ClientError::Closed);
        }

        self.close(true).await;
        self.sleep_unless_closed(self.config.reconnect_cooldown)
            .await?;

        loop {
            match self.connect().await {
                Ok(()) => {
                    info!(host = %self.config.host, "reconnected to gateway");
                    return Ok(());
                }
                Err(ClientError::Closed) => return Err(ClientError::Closed),
                Err(err) => {
                    let failures = self.retry_count.fetch_add(1, Ordering::SeqCst) + 1;
                    let delay = self.retry_delay(failures);
                    error!(
                        host = %self.config.host,
                        %err,
                        failures,
                        delay_secs = delay.as_secs_f64(),
                        "reconnect failed"
                    );
                    self.sleep_unless_closed(delay).await?;
                }
            }
        }
    }

    /// Wait after the `failures`-th consecutive failed reconnect
    fn retry_delay(&self, failures: u32) -> Duration {
        backoff_delay(self.config.backoff_base, self.config.max_backoff, failures)
    }

    async fn sleep_unless_closed(&self, duration: Duration) -> ClientResult<()> {
        tokio::select! {
            _ = self.shutdown.cancelled() => Err(ClientError::Closed),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    /// Read exactly one frame from the current connection
    pub async fn read_frame(&self) -> ClientResult<Message> {
        let mut guard = self.reader.lock().await;
        let framed = guard.as_mut().ok_or(ClientError::NotConnected)?;
        let link = self.current_link();

        let result = tokio::select! {
            _ = link.cancelled() => Err(ClientError::ConnectionClosed),
            frame = framed.next() => match frame {
                Some(Ok(message)) => Ok(message),
                Some(Err(err)) => Err(ClientError::from(err)),
                None => Err(ClientError::ConnectionClosed),
            },
        };
        drop(guard);

        if let Ok(message) = &result {
            self.touch();
            if message.header.namespace == namespaces::SYSTEM {
                trace!("<= {}", message);
            } else {
                debug!("<= {}", message);
            }
        }
        result
    }

    /// Next frame from the gateway, riding out reconnects
    ///
    /// Returns `Ok(None)` once the session is closed. Connection errors are
    /// absorbed by reconnecting; any other error closes the session and is
    /// returned.
    pub async fn next_response(&self) -> ClientResult<Option<Message>> {
        loop {
            if self.is_closed() {
                return Ok(None);
            }
            let err = match self.read_frame().await {
                Ok(message) => return Ok(Some(message)),
                Err(err) => err,
            };

            if !err.is_connection_error() {
                error!(%err, "unrecoverable session error");
                self.close(false).await;
                return Err(err);
            }

            match self.state() {
                ConnectionState::Closed => return Ok(None),
                ConnectionState::Reconnecting => {
                    trace!(%err, "read failed while reconnecting");
                    if self
                        .sleep_unless_closed(self.config.reconnect_poll)
                        .await
                        .is_err()
                    {
                        return Ok(None);
                    }
                }
                _ => {
                    error!(host = %self.config.host, %err, "lost connection to gateway");
                    if let Err(ClientError::Closed) = self.reconnect().await {
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// Every frame the gateway sends, for as long as the session lives
    ///
    /// The stream ends when the session closes, or right after yielding a
    /// fatal error. Only one consumer should read it.
    pub fn responses(self: &Arc<Self>) -> impl Stream<Item = ClientResult<Message>> + Send + 'static {
        futures::stream::unfold(Some(Arc::clone(self)), |session| async move {
            let session = session?;
            match session.next_response().await {
                Ok(Some(message)) => Some((Ok(message), Some(session))),
                Ok(None) => None,
                Err(err) => Some((Err(err), None)),
            }
        })
    }

    /// Write one command frame
    pub async fn send_command(&self, message: &Message) -> ClientResult<()> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(ClientError::NotConnected)?;
        if message.header.namespace == namespaces::SYSTEM {
            trace!("=> {}", message);
        } else {
            debug!("=> {}", message);
        }
        writer.send(message).await.map_err(ClientError::from)
    }

    /// Send a command and read its reply straight off the stream
    ///
    /// Only valid before the receive loop starts.
    pub async fn request(&self, message: &Message) -> ClientResult<Message> {
        self.send_command(message).await?;
        self.read_frame().await
    }

    /// Keepalive; reconnects instead if the gateway has gone quiet
    pub async fn send_ping(&self) -> ClientResult<()> {
        let silent = self.since_last_received();
        if silent > self.config.stale_after {
            warn!(
                host = %self.config.host,
                silent_secs = silent.as_secs_f64(),
                "gateway went quiet, reconnecting"
            );
            return self.reconnect().await;
        }
        self.send_command(&commands::ping()).await
    }

    /// Ping on a fixed interval until the session closes
    pub async fn run_ping_loop(&self) {
        let mut failing = false;
        loop {
            if self
                .sleep_unless_closed(self.config.ping_interval)
                .await
                .is_err()
            {
                break;
            }
            if self.state() == ConnectionState::Reconnecting {
                continue;
            }
            match self.send_ping().await {
                Ok(()) => {
                    if failing {
                        debug!("keepalive recovered");
                    }
                    failing = false;
                }
                Err(ClientError::Closed) => break,
                Err(err) if failing => debug!(%err, "keepalive still failing"),
                Err(err) => {
                    error!(host = %self.config.host, %err, "keepalive failed");
                    failing = true;
                }
            }
        }
        debug!("ping loop stopped");
    }

    /// Resolves once the session is closed
    pub async fn closed(&self) {
        self.shutdown.cancelled().await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.config.address())
            .field("state", &self.state())
            .field("retry_count", &self.retry_count())
            .finish()
    }
}

/// Interpret one non-blocking peek: pending or data means open
fn still_open(peek: Option<std::io::Result<usize>>) -> bool {
    !matches!(peek, Some(Ok(0)) | Some(Err(_)))
}
