//! Wire types, path/TLV codecs, content crypto, and the error taxonomy for the
//! encrypted, event-sourced drive. Owns no I/O: every external
//! collaborator (relay transport, blob network, signer, NIP-44 encryptor) is a
//! trait defined here and implemented elsewhere — `drive_relay_memory` and
//! `drive_blob_memory` provide test doubles; `drive_index`/`drive_index_memory`
//! provide the local index.

pub mod blob;
pub mod crypto;
pub mod error;
pub mod event;
pub mod hash;
pub mod nip44;
pub mod path;
pub mod relay;
pub mod share;
pub mod signer;

pub use error::{DriveError, DriveResult};
pub use event::{DriveContent, Event, Tag, KIND_DELETE, KIND_DRIVE};
pub use hash::Hash;
