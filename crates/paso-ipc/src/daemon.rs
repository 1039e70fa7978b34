use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use paso_core::shutdown::ShutdownSignal;
use paso_core::PasoError;

use crate::event_bus::{ClientId, EventBus};
use crate::metrics::Metrics;
use crate::protocol::{Message, MessageBody};

const PING_INTERVAL: Duration = Duration::from_secs(30);
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(60);
const PONG_TIMEOUT: Duration = Duration::from_secs(90);
const CLIENT_BUFFER_DEFAULT: usize = 10;

struct ClientHandle {
    outbound: flume::Sender<Message>,
    subscription: Mutex<Option<i64>>,
    last_pong: Mutex<Instant>,
}

/// The Unix-socket daemon: one acceptor task, one broadcaster relay per
/// connection pair (reader/writer), and one health-monitor task, all
/// cooperating through a shared `ShutdownSignal`.
pub struct Daemon {
    bus: Arc<EventBus>,
    metrics: Arc<Metrics>,
    clients: Arc<RwLock<HashMap<ClientId, Arc<ClientHandle>>>>,
    client_buffer: usize,
}

impl Daemon {
    pub fn new(bus: Arc<EventBus>, metrics: Arc<Metrics>) -> Self {
        let client_buffer = std::env::var("PASO_DAEMON_CLIENT_BUFFER")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(CLIENT_BUFFER_DEFAULT);
        Daemon { bus, metrics, clients: Arc::new(RwLock::new(HashMap::new())), client_buffer }
    }

    pub async fn run(&self, socket_path: &Path, shutdown: ShutdownSignal) -> Result<(), PasoError> {
        reclaim_stale_socket(socket_path)?;
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PasoError::fatal(e.to_string()))?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Ok(meta) = std::fs::metadata(parent) {
                    let mut perms = meta.permissions();
                    perms.set_mode(0o700);
                    let _ = std::fs::set_permissions(parent, perms);
                }
            }
        }

        let listener = UnixListener::bind(socket_path).map_err(|e| PasoError::fatal(e.to_string()))?;
        info!(path = %socket_path.display(), "daemon listening");

        let health_shutdown = shutdown.subscribe();
        let health_task = tokio::spawn(health_monitor(self.clients.clone(), health_shutdown));

        let mut shutdown_rx = shutdown.subscribe();
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let client_id = Uuid::new_v4();
                            self.spawn_connection(client_id, stream, shutdown.clone()).await;
                        }
                        Err(err) => warn!(error = %err, "accept failed"),
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("daemon shutting down, closing listener");
                    break;
                }
            }
        }

        health_task.abort();
        let _ = std::fs::remove_file(socket_path);
        Ok(())
    }

    async fn spawn_connection(&self, client_id: ClientId, stream: UnixStream, shutdown: ShutdownSignal) {
        let (bus_client_id, mut bus_rx) = self.bus.subscribe(self.client_buffer).await;
        let (outbound_tx, outbound_rx) = flume::bounded::<Message>(self.client_buffer);
        let handle = Arc::new(ClientHandle {
            outbound: outbound_tx,
            subscription: Mutex::new(None),
            last_pong: Mutex::new(Instant::now()),
        });
        self.clients.write().await.insert(client_id, handle.clone());

        let (read_half, write_half) = stream.into_split();
        let metrics = self.metrics.clone();
        let clients = self.clients.clone();
        let bus = self.bus.clone();
        let mut reader_shutdown = shutdown.subscribe();
        let handle_for_reader = handle.clone();

        tokio::spawn(async move {
            let mut read_half = read_half;
            loop {
                tokio::select! {
                    frame = read_framed(&mut read_half) => {
                        match frame {
                            Ok(Some(bytes)) => {
                                metrics.received.fetch_add(1, Ordering::Relaxed);
                                if let Ok(msg) = Message::decode(&bytes) {
                                    match msg.body {
                                        MessageBody::Subscribe { project_id } => {
                                            *handle_for_reader.subscription.lock().await = Some(project_id);
                                        }
                                        MessageBody::Pong => {
                                            *handle_for_reader.last_pong.lock().await = Instant::now();
                                        }
                                        MessageBody::Event(envelope) => {
                                            if let Some(change) = envelope.change {
                                                bus.publish(change).await;
                                            }
                                        }
                                        _ => {}
                                    }
                                } else {
                                    debug!("dropped undecodable frame");
                                }
                            }
                            Ok(None) => break,
                            Err(err) => {
                                debug!(error = %err, "connection closed");
                                break;
                            }
                        }
                    }
                    _ = reader_shutdown.recv() => break,
                }
            }
            bus.unsubscribe(bus_client_id).await;
            clients.write().await.remove(&client_id);
        });

        let mut writer_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            let mut write_half = write_half;
            loop {
                tokio::select! {
                    sent = outbound_rx.recv_async() => {
                        match sent {
                            Ok(msg) => {
                                if write_framed(&mut write_half, &msg).await.is_err() {
                                    break;
                                }
                            }
                            Err(_) => break,
                        }
                    }
                    event = bus_rx.recv_async() => {
                        match event {
                            Ok(envelope) => {
                                let subscribed = *handle.subscription.lock().await;
                                let deliver = subscribed
                                    .map_or(false, |s| envelope.project_id == 0 || s == 0 || s == envelope.project_id);
                                if deliver {
                                    if write_framed(&mut write_half, &Message::event(envelope)).await.is_err() {
                                        break;
                                    }
                                }
                            }
                            Err(_) => break,
                        }
                    }
                    _ = writer_shutdown.recv() => break,
                }
            }
        });
    }
}

async fn health_monitor(
    clients: Arc<RwLock<HashMap<ClientId, Arc<ClientHandle>>>>,
    mut shutdown_rx: tokio::sync::broadcast::Receiver<()>,
) {
    let mut ping_tick = tokio::time::interval(PING_INTERVAL);
    let mut health_tick = tokio::time::interval(HEALTH_CHECK_INTERVAL);
    loop {
        tokio::select! {
            _ = ping_tick.tick() => {
                let targets: Vec<Arc<ClientHandle>> = clients.read().await.values().cloned().collect();
                for handle in targets {
                    let _ = handle.outbound.try_send(Message::ping());
                }
            }
            _ = health_tick.tick() => {
                let mut stale = Vec::new();
                for (id, handle) in clients.read().await.iter() {
                    if handle.last_pong.lock().await.elapsed() > PONG_TIMEOUT {
                        stale.push(*id);
                    }
                }
                if !stale.is_empty() {
                    let mut guard = clients.write().await;
                    for id in stale {
                        warn!(client = %id, "evicting client with stale pong");
                        guard.remove(&id);
                    }
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }
}

/// Removes a stale socket file left behind by a daemon that did not shut
/// down cleanly. A bound, listening socket cannot coexist with a second
/// bind on the same path, so the bind call itself is the real race-safe
/// step; this unlink only clears debris from a prior unclean exit.
fn reclaim_stale_socket(path: &Path) -> Result<(), PasoError> {
    if path.exists() {
        std::fs::remove_file(path).map_err(|e| PasoError::fatal(e.to_string()))?;
    }
    Ok(())
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

pub fn default_socket_path() -> PathBuf {
    paso_core::logging::socket_path()
}
