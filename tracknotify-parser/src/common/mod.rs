//! Common utilities shared across UPnP services
//!
//! - [`xml_decode`]: streaming, well-formedness-checked XML traversal
//! - [`didl`]: DIDL-Lite metadata extraction

pub(crate) mod xml_decode;
pub mod didl;

pub use didl::{parse_track_metadata, NOT_IMPLEMENTED};
