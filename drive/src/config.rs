//! Caller-supplied configuration (SPEC_FULL §3), in the shape of the
//! teacher's `S5NodeConfig` (`s5_node/src/config.rs`): a plain serde struct
//! with no environment-variable magic, loaded by the caller and handed to
//! [`crate::Drive::open`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DriveConfig {
    /// Relay URLs used for the engine's own subscription and for
    /// `access_shared_file`'s scratch client when a share link carries none.
    #[serde(default)]
    pub relays: Vec<String>,
    /// Blob network endpoints. The first reachable one is used; this crate
    /// does not implement the fan-out itself, only the `BlobClient` seam.
    #[serde(default)]
    pub blob_servers: Vec<String>,
    /// Path to the local `sled` index, or `None` for an in-memory index.
    #[serde(default)]
    pub index_path: Option<String>,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            relays: Vec::new(),
            blob_servers: Vec::new(),
            index_path: None,
        }
    }
}
