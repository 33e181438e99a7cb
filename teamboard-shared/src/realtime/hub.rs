//! Socket registry and room membership

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use super::events::{self, ClientEvent, FrameError, Room, ServerFrame};

/// Process-unique socket handle
pub type SocketId = u64;

#[derive(Debug, Default)]
struct HubState {
    sockets: HashMap<SocketId, mpsc::UnboundedSender<String>>,
    rooms: HashMap<String, HashSet<SocketId>>,
}

impl HubState {
    fn send_to(&self, targets: impl IntoIterator<Item = SocketId>, text: &str) -> usize {
        targets
            .into_iter()
            .filter_map(|id| self.sockets.get(&id))
            .filter(|tx| tx.send(text.to_string()).is_ok())
            .count()
    }
}

/// The single pub/sub hub of the process
///
/// Each connected socket owns the receiving half of an unbounded channel of
/// serialized frames; the hub keeps the sending half and the room index.
#[derive(Debug, Default)]
pub struct RealtimeHub {
    state: RwLock<HubState>,
    next_id: AtomicU64,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a socket; frames for it arrive on the returned receiver
    pub async fn connect(&self) -> (SocketId, mpsc::UnboundedReceiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::unbounded_channel();

        self.state.write().await.sockets.insert(id, tx);
        debug!(socket = id, "[Realtime] Socket connected");

        (id, rx)
    }

    /// Drops a socket and its room memberships
    pub async fn disconnect(&self, socket: SocketId) {
        let mut state = self.state.write().await;
        state.sockets.remove(&socket);
        state.rooms.retain(|_, members| {
            members.remove(&socket);
            !members.is_empty()
        });
        debug!(socket, "[Realtime] Socket disconnected");
    }

    /// Adds a socket to a room; returns false for unknown sockets
    pub async fn subscribe(&self, socket: SocketId, room: &Room) -> bool {
        let mut state = self.state.write().await;
        if !state.sockets.contains_key(&socket) {
            return false;
        }

        state.rooms.entry(room.to_string()).or_default().insert(socket);
        debug!(socket, room = %room, "[Realtime] Joined room");
        true
    }

    /// Sends an event to the sockets in `room`; returns how many got it
    pub async fn publish<T: Serialize>(&self, room: &Room, event: &str, payload: T) -> usize {
        let Some(text) = encode(event, payload) else {
            return 0;
        };

        let state = self.state.read().await;
        let targets = state
            .rooms
            .get(&room.to_string())
            .map(|members| members.iter().copied().collect::<Vec<_>>())
            .unwrap_or_default();

        let delivered = state.send_to(targets, &text);
        log_delivery(event, delivered);
        delivered
    }

    /// Sends an event to every connected socket
    pub async fn broadcast<T: Serialize>(&self, event: &str, payload: T) -> usize {
        let Some(text) = encode(event, payload) else {
            return 0;
        };

        let state = self.state.read().await;
        let delivered = state.send_to(state.sockets.keys().copied(), &text);
        log_delivery(event, delivered);
        delivered
    }

    /// Interprets one text frame received from `socket`
    pub async fn handle_client_message(&self, socket: SocketId, raw: &str) -> Result<(), FrameError> {
        match ClientEvent::parse(raw)? {
            ClientEvent::Register(user_id) => {
                self.subscribe(socket, &Room::user(user_id)).await;
            }
            ClientEvent::JoinTeamBoard(team_id) => {
                self.subscribe(socket, &Room::team_board(team_id)).await;
            }
            ClientEvent::Activity(activity) => {
                self.broadcast(events::ACTIVITY_NEW, activity).await;
            }
            ClientEvent::Unknown(event) => {
                debug!(socket, event = %event, "[Realtime] Ignoring unknown client event");
            }
        }
        Ok(())
    }

    pub async fn connected(&self) -> usize {
        self.state.read().await.sockets.len()
    }

    pub async fn room_size(&self, room: &Room) -> usize {
        self.state
            .read()
            .await
            .rooms
            .get(&room.to_string())
            .map(HashSet::len)
            .unwrap_or(0)
    }
}

fn encode<T: Serialize>(event: &str, payload: T) -> Option<String> {
    let data = match serde_json::to_value(payload) {
        Ok(data) => data,
        Err(e) => {
            warn!(event, error = %e, "[Realtime] Failed to serialize payload");
            return None;
        }
    };

    serde_json::to_string(&ServerFrame::new(event, data)).ok()
}

fn log_delivery(event: &str, delivered: usize) {
    if delivered > 0 {
        info!("[Realtime] Event {} broadcast to {} subscribers", event, delivered);
    } else {
        debug!("[Realtime] No subscribers to receive {}", event);
    }
}
