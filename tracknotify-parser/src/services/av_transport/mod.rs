//! AVTransport service event extraction
//!
//! The AVTransport service reports the renderer's transport state and the
//! metadata of the current track through its `LastChange` state variable.
//!
//! ## Usage
//!
//! ```rust
//! use tracknotify_parser::services::av_transport::extract_track;
//!
//! let track = extract_track(r#"<Event><InstanceID val="0"/></Event>"#).unwrap();
//! assert!(track.is_empty());
//! ```

pub mod parser;

pub use parser::{extract_track, find_track_metadata, LAST_CHANGE_ELEMENT, METADATA_ELEMENT};
