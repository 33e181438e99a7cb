/// Domain models
///
/// These are plain data types shared by both storage backings. Construction
/// (`new`) and patch application (`apply`) live on the types so that the
/// in-memory and Postgres repositories produce identical documents.
///
/// # Models
///
/// - `user`: accounts, roles and admin statistics
/// - `board`: owner-scoped boards with an opaque payload
/// - `task`: team tasks with comments and attachments
/// - `team`: teams, settings and membership
/// - `message`: direct messages between two users

pub mod board;
pub mod message;
pub mod task;
pub mod team;
pub mod user;

/// Generates a fresh entity ID
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
