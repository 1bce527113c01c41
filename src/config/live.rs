use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{network, presence};
use crate::error::{LibraryError, LibraryResult};

/// Shortest reconciliation interval accepted from the live feed
const MIN_RECONCILE_INTERVAL_MS: u64 = 50;

/// Settings that can change while the server runs. Always replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub admins: HashSet<Uuid>,
    /// Banned identities with an optional reason
    pub bans: HashMap<Uuid, Option<String>>,
    /// Muted identities with an optional reason
    pub mutes: HashMap<Uuid, Option<String>>,
    pub reconcile_interval_ms: u64,
    pub default_chat_enabled: bool,
    pub default_presence_enabled: bool,
    pub motd: String,
    pub max_players: usize,
    pub server_full_message: String,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            admins: HashSet::new(),
            bans: HashMap::new(),
            mutes: HashMap::new(),
            reconcile_interval_ms: presence::DEFAULT_RECONCILE_INTERVAL_MS,
            default_chat_enabled: true,
            default_presence_enabled: true,
            motd: "A library containing every possible page".to_string(),
            max_players: network::DEFAULT_MAX_PLAYERS,
            server_full_message: "Server is full!".to_string(),
        }
    }
}

impl LiveConfig {
    pub fn load(path: impl AsRef<Path>) -> LibraryResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| LibraryError::Config {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> LibraryResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn is_admin(&self, uuid: &Uuid) -> bool {
        self.admins.contains(uuid)
    }

    pub fn is_banned(&self, uuid: &Uuid) -> bool {
        self.bans.contains_key(uuid)
    }

    /// Text shown to a banned user
    pub fn ban_message(&self, uuid: &Uuid) -> Option<String> {
        self.bans.get(uuid).map(|reason| match reason {
            Some(reason) => format!("You have been banned. Reason: {}.", reason),
            None => "You have been banned.".to_string(),
        })
    }

    /// `Some(reason)` when muted; the reason itself may be absent
    pub fn mute_reason(&self, uuid: &Uuid) -> Option<Option<&str>> {
        self.mutes.get(uuid).map(|reason| reason.as_deref())
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.reconcile_interval_ms.max(MIN_RECONCILE_INTERVAL_MS))
    }
}

/// Shared, atomically replaceable [`LiveConfig`]
///
/// Readers take a snapshot with [`snapshot`](Self::snapshot) and never block the writer.
#[derive(Debug)]
pub struct LiveConfigHandle {
    current: ArcSwap<LiveConfig>,
}

impl LiveConfigHandle {
    pub fn new(config: LiveConfig) -> Self {
        Self {
            current: ArcSwap::from_pointee(config),
        }
    }

    pub fn snapshot(&self) -> Arc<LiveConfig> {
        self.current.load_full()
    }

    /// Install a new snapshot and return the one it replaced
    pub fn replace(&self, config: LiveConfig) -> Arc<LiveConfig> {
        self.current.swap(Arc::new(config))
    }
}

impl Default for LiveConfigHandle {
    fn default() -> Self {
        Self::new(LiveConfig::default())
    }
}
