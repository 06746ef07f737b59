//! Socket server: one reader and one writer task per bridge connection

use haruki_api::{Command, ErrorCode, ErrorInfo, Event, Request, Response};
use haruki_util::ClientId;
use serde::Serialize;
use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::{IpcError, IpcResult};

const EVENT_BUFFER: usize = 100;

/// What connection tasks report to the daemon
#[derive(Debug)]
pub enum ServerMessage {
    Request {
        client_id: ClientId,
        request: Request,
    },
    ClientConnected {
        client_id: ClientId,
        peer_uid: Option<u32>,
    },
    ClientDisconnected {
        client_id: ClientId,
    },
}

struct Peer {
    outbox: mpsc::UnboundedSender<String>,
    subscribed: bool,
}

/// Connected bridges, shared between the server and its connection tasks
#[derive(Clone, Default)]
struct Peers(Arc<RwLock<HashMap<ClientId, Peer>>>);

impl Peers {
    async fn insert(&self, id: ClientId, outbox: mpsc::UnboundedSender<String>) {
        self.0.write().await.insert(
            id,
            Peer {
                outbox,
                subscribed: false,
            },
        );
    }

    async fn remove(&self, id: &ClientId) {
        self.0.write().await.remove(id);
    }

    async fn set_subscribed(&self, id: &ClientId, subscribed: bool) {
        if let Some(peer) = self.0.write().await.get_mut(id) {
            peer.subscribed = subscribed;
        }
    }

    async fn is_subscribed(&self, id: &ClientId) -> bool {
        self.0.read().await.get(id).is_some_and(|p| p.subscribed)
    }

    /// `false` if the peer is unknown
    async fn queue(&self, id: &ClientId, line: String) -> IpcResult<bool> {
        match self.0.read().await.get(id) {
            Some(peer) => peer
                .outbox
                .send(line)
                .map(|_| true)
                .map_err(|_| IpcError::ConnectionClosed),
            None => Ok(false),
        }
    }

    async fn len(&self) -> usize {
        self.0.read().await.len()
    }
}

fn encode_line<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    Ok(line)
}

/// NDJSON server on a Unix socket
pub struct IpcServer {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    peers: Peers,
    events: broadcast::Sender<Event>,
    messages: mpsc::UnboundedSender<ServerMessage>,
    messages_rx: Mutex<Option<mpsc::UnboundedReceiver<ServerMessage>>>,
}

impl IpcServer {
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (messages, messages_rx) = mpsc::unbounded_channel();

        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
            listener: None,
            peers: Peers::default(),
            events,
            messages,
            messages_rx: Mutex::new(Some(messages_rx)),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Bind the socket, replacing a stale one
    pub async fn start(&mut self) -> IpcResult<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }
        if let Some(dir) = self.socket_path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;
        std::fs::set_permissions(&self.socket_path, std::fs::Permissions::from_mode(0o660))?;

        info!(path = %self.socket_path.display(), "IPC server listening");
        self.listener = Some(listener);
        Ok(())
    }

    /// Receiver for requests and connection changes. Can be taken once.
    pub async fn take_message_receiver(&self) -> Option<mpsc::UnboundedReceiver<ServerMessage>> {
        self.messages_rx.lock().await.take()
    }

    /// Accept bridges until the task is dropped
    pub async fn run(&self) -> IpcResult<()> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| IpcError::ServerError("Server not started".into()))?;

        loop {
            match listener.accept().await {
                Ok((stream, _)) => self.attach(stream).await,
                Err(e) => error!(error = %e, "Failed to accept connection"),
            }
        }
    }

    async fn attach(&self, stream: UnixStream) {
        let client_id = ClientId::new();
        let peer_uid = stream.peer_cred().ok().map(|cred| cred.uid());
        info!(client_id = %client_id, uid = ?peer_uid, "Client connected");

        let (read_half, write_half) = stream.into_split();
        let (outbox, inbox) = mpsc::unbounded_channel();
        self.peers.insert(client_id.clone(), outbox.clone()).await;

        let _ = self.messages.send(ServerMessage::ClientConnected {
            client_id: client_id.clone(),
            peer_uid,
        });

        tokio::spawn(read_requests(
            read_half,
            client_id.clone(),
            self.peers.clone(),
            self.messages.clone(),
            outbox,
        ));
        tokio::spawn(write_outgoing(
            write_half,
            client_id,
            self.peers.clone(),
            self.messages.clone(),
            inbox,
            self.events.subscribe(),
        ));
    }

    /// Queue a response for one client. Unknown clients are ignored.
    pub async fn send_response(&self, client_id: &ClientId, response: Response) -> IpcResult<()> {
        let line = encode_line(&response)?;
        if !self.peers.queue(client_id, line).await? {
            debug!(client_id = %client_id, "Response for a departed client dropped");
        }
        Ok(())
    }

    /// Send to every subscribed client
    pub fn broadcast_event(&self, event: Event) {
        let _ = self.events.send(event);
    }

    /// A handle on the event fan-out for publishers that outlive a borrow
    pub fn event_sender(&self) -> broadcast::Sender<Event> {
        self.events.clone()
    }

    pub async fn client_count(&self) -> usize {
        self.peers.len().await
    }

    /// Remove the socket file
    pub fn shutdown(&self) {
        if self.socket_path.exists() {
            let _ = std::fs::remove_file(&self.socket_path);
        }
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn read_requests(
    read_half: OwnedReadHalf,
    client_id: ClientId,
    peers: Peers,
    messages: mpsc::UnboundedSender<ServerMessage>,
    outbox: mpsc::UnboundedSender<String>,
) {
    let mut lines = BufReader::new(read_half).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!(client_id = %client_id, "Client closed the connection");
                break;
            }
            Err(e) => {
                debug!(client_id = %client_id, error = %e, "Read error");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request = match serde_json::from_str::<Request>(line) {
            Ok(request) => request,
            Err(e) => {
                warn!(client_id = %client_id, error = %e, "Malformed request line");
                let reply = Response::error(
                    0,
                    ErrorInfo::new(ErrorCode::InvalidRequest, format!("Invalid request: {}", e)),
                );
                if let Ok(line) = encode_line(&reply) {
                    let _ = outbox.send(line);
                }
                continue;
            }
        };

        // flip before forwarding so the subscribe response never beats the flag
        match request.command {
            Command::SubscribeEvents => peers.set_subscribed(&client_id, true).await,
            Command::UnsubscribeEvents => peers.set_subscribed(&client_id, false).await,
            _ => {}
        }

        let _ = messages.send(ServerMessage::Request {
            client_id: client_id.clone(),
            request,
        });
    }

    // dropping the registry's sender ends the writer once our clone is gone too
    peers.remove(&client_id).await;
}

async fn write_outgoing(
    mut write_half: OwnedWriteHalf,
    client_id: ClientId,
    peers: Peers,
    messages: mpsc::UnboundedSender<ServerMessage>,
    mut inbox: mpsc::UnboundedReceiver<String>,
    mut events: broadcast::Receiver<Event>,
) {
    loop {
        let line = tokio::select! {
            queued = inbox.recv() => match queued {
                Some(line) => line,
                None => break,
            },
            event = events.recv() => match event {
                Ok(event) => {
                    if !peers.is_subscribed(&client_id).await {
                        continue;
                    }
                    match encode_line(&event) {
                        Ok(line) => line,
                        Err(e) => {
                            warn!(error = %e, "Event not serializable");
                            continue;
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(client_id = %client_id, skipped, "Client lagging, events dropped");
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
        };

        if let Err(e) = write_half.write_all(line.as_bytes()).await {
            debug!(client_id = %client_id, error = %e, "Write error");
            break;
        }
    }

    let _ = messages.send(ServerMessage::ClientDisconnected {
        client_id: client_id.clone(),
    });
    peers.remove(&client_id).await;
}
