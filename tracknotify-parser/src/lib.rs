//! # tracknotify-parser
//!
//! Extraction of now-playing metadata from UPnP AVTransport `LastChange`
//! events.
//!
//! A LastChange event nests a DIDL-Lite document, XML-escaped, inside the
//! `val` attribute of its `CurrentTrackMetaData` element. Extraction runs as
//! two independent parse phases with an unescape step in between, and reads
//! `upnp:class`, `dc:title` and `upnp:artist` into a [`Track`].
//!
//! ## Usage
//!
//! ```rust
//! use tracknotify_parser::extract_track;
//!
//! let event = r#"<Event><InstanceID val="0"><CurrentTrackMetaData val="&lt;item&gt;&lt;dc:title&gt;Help!&lt;/dc:title&gt;&lt;upnp:artist&gt;The Beatles&lt;/upnp:artist&gt;&lt;/item&gt;"/></InstanceID></Event>"#;
//!
//! let track = extract_track(event)?;
//! assert_eq!(track.now_playing().as_deref(), Some("Playing Help! by The Beatles"));
//! # Ok::<(), tracknotify_parser::ParseError>(())
//! ```

pub mod common;
pub mod error;
pub mod services;
pub mod track;

pub use common::parse_track_metadata;
pub use error::{ParseError, ParseResult, ParseStage};
pub use services::av_transport::{extract_track, find_track_metadata};
pub use track::{Track, TrackField, AUDIO_BROADCAST_CLASS};
