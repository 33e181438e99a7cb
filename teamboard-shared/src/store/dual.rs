//! Per-request backing selection

use std::{fmt, sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{memory::MemoryStore, postgres::PgStore, Repository};

/// Which implementation served (or would serve) a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backing {
    Persistent,
    Volatile,
}

impl Backing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backing::Persistent => "persistent",
            Backing::Volatile => "volatile",
        }
    }
}

impl fmt::Display for Backing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owns both backings and routes each call to one of them
///
/// The choice is re-evaluated on every [`Storage::repo`] call from the
/// database reachability flag; nothing is cached at startup. The volatile
/// store is always present and never migrated into the database.
///
/// # Example
///
/// ```
/// use teamboard_shared::store::{Backing, Storage};
///
/// let storage = Storage::volatile();
/// assert_eq!(storage.backing(), Backing::Volatile);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Storage {
    persistent: Option<PgStore>,
    volatile: MemoryStore,
}

impl Storage {
    /// Volatile-only storage
    pub fn volatile() -> Self {
        Self::default()
    }

    /// Storage that prefers `pg` whenever it is reachable
    pub fn with_persistent(pg: PgStore) -> Self {
        Self {
            persistent: Some(pg),
            volatile: MemoryStore::new(),
        }
    }

    pub fn persistent(&self) -> Option<&PgStore> {
        self.persistent.as_ref()
    }

    /// Whether the database is serving requests right now
    pub fn persistent_serving(&self) -> bool {
        self.persistent
            .as_ref()
            .map(PgStore::is_reachable)
            .unwrap_or(false)
    }

    pub fn backing(&self) -> Backing {
        if self.persistent_serving() {
            Backing::Persistent
        } else {
            Backing::Volatile
        }
    }

    /// The repository that serves the current call
    pub fn repo(&self) -> &dyn Repository {
        match &self.persistent {
            Some(pg) if pg.is_reachable() => pg as &dyn Repository,
            _ => &self.volatile,
        }
    }

    /// Probes the database once; a no-op in volatile-only mode
    pub async fn probe(&self) -> Backing {
        if let Some(pg) = &self.persistent {
            pg.probe().await;
        }
        self.backing()
    }

    /// Spawns the background task that keeps the reachability flag current
    pub fn spawn_health_monitor(self: Arc<Self>, interval: Duration) -> Option<JoinHandle<()>> {
        self.persistent.as_ref()?;

        info!(
            interval_secs = interval.as_secs(),
            "Starting persistent storage health monitor"
        );

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let backing = self.probe().await;
                debug!(backing = %backing, "Storage health probe");
            }
        }))
    }
}
