//! Share protocol: TLV-encoded event pointers and password-optional key
//! envelopes.

pub mod link;
pub mod tlv;

pub use link::{build_share_link, decode_share_key, parse_share_link, SharedFileAccess};
pub use tlv::SharePointer;
