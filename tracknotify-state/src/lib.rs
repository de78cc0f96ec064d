//! # tracknotify-state
//!
//! Now-playing state for tracknotify.
//!
//! - [`TrackTracker`] keeps the last announced track of one renderer and
//!   decides whether a freshly extracted track is a change worth announcing.
//! - [`logging`] installs the process-wide `tracing` subscriber.
//!
//! # Architecture
//!
//! ```text
//! raw event → extract_track → TrackTracker::observe → (changed) → sinks
//! ```

pub mod logging;
pub mod tracker;

pub use tracker::{Observation, TrackTracker};
pub use tracknotify_parser::Track;
