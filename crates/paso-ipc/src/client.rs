use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::debug;

use paso_core::error::classify_io_error;
use paso_core::retry::Backoff;

use crate::protocol::{EventEnvelope, Message, MessageBody};

type EventCallback = Arc<dyn Fn(EventEnvelope) + Send + Sync>;

/// Client library for the daemon's event fabric. Connects over the Unix
/// socket, reconnects with capped exponential backoff on disconnection,
/// and replays the last `subscribe` after reconnecting.
pub struct EventClient {
    socket_path: PathBuf,
    outbound: flume::Sender<Message>,
    connected: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    state: Arc<ClientState>,
    task: Option<tokio::task::JoinHandle<()>>,
}

struct ClientState {
    subscription: Mutex<Option<i64>>,
    callback: Mutex<Option<EventCallback>>,
}

impl EventClient {
    /// Connects to the daemon socket and starts the background
    /// reconnect-and-forward task. The connection itself is best-effort:
    /// construction never fails even if the daemon is not yet up, since the
    /// background task will keep retrying.
    pub fn connect(socket_path: impl AsRef<Path>) -> Self {
        let socket_path = socket_path.as_ref().to_path_buf();
        let (outbound_tx, outbound_rx) = flume::unbounded::<Message>();
        let connected = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));
        let state = Arc::new(ClientState { subscription: Mutex::new(None), callback: Mutex::new(None) });

        let task = tokio::spawn(run_client(
            socket_path.clone(),
            outbound_rx,
            connected.clone(),
            shutdown.clone(),
            state.clone(),
        ));

        EventClient { socket_path, outbound: outbound_tx, connected, shutdown, state, task: Some(task) }
    }

    pub fn subscribe(&self, project_id: i64) {
        let _ = self.outbound.send(Message::subscribe(project_id));
    }

    pub fn publish(&self, envelope: EventEnvelope) {
        let _ = self.outbound.send(Message::event(envelope));
    }

    /// Registers a callback invoked on the background task for every
    /// `Event` message received. Replaces any previously registered
    /// callback.
    pub fn on_event<F>(&self, callback: F)
    where
        F: Fn(EventEnvelope) + Send + Sync + 'static,
    {
        *self.state.callback.lock().unwrap() = Some(Arc::new(callback));
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub async fn close(mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

async fn run_client(
    socket_path: PathBuf,
    outbound_rx: flume::Receiver<Message>,
    connected: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    state: Arc<ClientState>,
) {
    let backoff = Backoff::default();
    let mut attempt: u32 = 0;

    while !shutdown.load(Ordering::Relaxed) {
        match UnixStream::connect(&socket_path).await {
            Ok(stream) => {
                attempt = 0;
                connected.store(true, Ordering::SeqCst);
                let resubscribe = *state.subscription.lock().unwrap();
                let (mut read_half, mut write_half) = stream.into_split();

                if let Some(project_id) = resubscribe {
                    let _ = write_framed(&mut write_half, &Message::subscribe(project_id)).await;
                }

                let outbound_rx = outbound_rx.clone();
                let reason = drive_connection(&mut read_half, &mut write_half, &outbound_rx, &state, &shutdown).await;
                connected.store(false, Ordering::SeqCst);
                debug!(?reason, "event client disconnected");
            }
            Err(err) => {
                let classified = classify_io_error(&err);
                debug!(error = %classified, "event client connect failed, retrying");
            }
        }

        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        let delay = backoff.base.saturating_mul(backoff.factor.saturating_pow(attempt)).min(backoff.cap);
        attempt = (attempt + 1).min(backoff.attempts);
        tokio::time::sleep(delay).await;
    }
}

enum DisconnectReason {
    Closed,
    Shutdown,
}

async fn drive_connection(
    read_half: &mut tokio::net::unix::OwnedReadHalf,
    write_half: &mut tokio::net::unix::OwnedWriteHalf,
    outbound_rx: &flume::Receiver<Message>,
    state: &Arc<ClientState>,
    shutdown: &Arc<AtomicBool>,
) -> DisconnectReason {
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return DisconnectReason::Shutdown;
        }
        tokio::select! {
            sent = outbound_rx.recv_async() => {
                match sent {
                    Ok(msg) => {
                        if let MessageBody::Subscribe { project_id } = &msg.body {
                            *state.subscription.lock().unwrap() = Some(*project_id);
                        }
                        if write_framed(write_half, &msg).await.is_err() {
                            return DisconnectReason::Closed;
                        }
                    }
                    Err(_) => return DisconnectReason::Shutdown,
                }
            }
            frame = read_framed(read_half) => {
                match frame {
                    Ok(Some(bytes)) => {
                        if let Ok(msg) = Message::decode(&bytes) {
                            match msg.body {
                                MessageBody::Ping => { let _ = write_framed(write_half, &Message::pong()).await; }
                                MessageBody::Event(envelope) => {
                                    if let Some(cb) = state.callback.lock().unwrap().as_ref() {
                                        cb(envelope);
                                    }
                                }
                                _ => {}
                            }
                        }
                    }
                    Ok(None) => return DisconnectReason::Closed,
                    Err(_) => return DisconnectReason::Closed,
                }
            }
        }
    }
}

async fn read_framed(stream: &mut tokio::net::unix::OwnedReadHalf) -> std::io::Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

async fn write_framed(stream: &mut tokio::net::unix::OwnedWriteHalf, msg: &Message) -> std::io::Result<()> {
    let bytes = msg.encode().map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let len = (bytes.len() as u32).to_be_bytes();
    stream.write_all(&len).await?;
    stream.write_all(&bytes).await?;
    Ok(())
}

impl std::fmt::Debug for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisconnectReason::Closed => write!(f, "closed"),
            DisconnectReason::Shutdown => write!(f, "shutdown"),
        }
    }
}

