//! Room-based realtime fan-out
//!
//! Sockets join named rooms; handlers publish events into a room after a
//! successful write and only the sockets in that room receive them. Delivery
//! is best-effort to currently connected sockets: no acknowledgement, retry or
//! replay.
//!
//! # Module Structure
//!
//! ```text
//! realtime/
//! ├── mod.rs     - Module exports
//! ├── events.rs  - Wire frames, room names and event names
//! └── hub.rs     - Socket registry and room membership
//! ```
//!
//! # Wire Format
//!
//! Every WebSocket text frame, in either direction, is
//! `{"event": <name>, "data": <payload>}`.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use teamboard_shared::realtime::{events, RealtimeHub, Room};
//!
//! # async fn example() {
//! let hub = RealtimeHub::new();
//! let (socket, mut rx) = hub.connect().await;
//!
//! hub.subscribe(socket, &Room::team_board("team_1")).await;
//! let delivered = hub
//!     .publish(&Room::team_board("team_1"), events::TEAM_BOARD_UPDATE, json!({"deletedTaskId": "t1"}))
//!     .await;
//!
//! assert_eq!(delivered, 1);
//! assert!(rx.recv().await.unwrap().contains("deletedTaskId"));
//! # }
//! ```

pub mod events;
pub mod hub;

pub use events::{ClientEvent, FrameError, Room, ServerFrame};
pub use hub::{RealtimeHub, SocketId};
