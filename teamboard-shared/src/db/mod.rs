/// PostgreSQL plumbing behind the persistent backing
///
/// # Modules
///
/// - `pool`: lazy connection pool and health probe
/// - `migrations`: embedded schema migrations
///
/// The pool is created without touching the network, so the server can start
/// while the database is down; [`crate::store::PgStore::probe`] decides when
/// it is usable.

pub mod migrations;
pub mod pool;
