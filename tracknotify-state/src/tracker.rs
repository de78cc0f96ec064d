//! Now-playing change detection
//!
//! Renderers rebroadcast their full AVTransport state on every change, so the
//! same track usually arrives many times in a row. [`TrackTracker`] owns the
//! last announced track of one renderer and turns a stream of candidate
//! tracks into "this is new, announce it" decisions.
//!
//! ```rust
//! use tracknotify_state::{Track, TrackTracker};
//!
//! let tracker = TrackTracker::new();
//! let help = Track::empty().with_title("Help!").with_artist("The Beatles");
//!
//! assert!(tracker.observe(help.clone()).should_notify);
//! assert!(!tracker.observe(help).should_notify);
//! assert!(!tracker.observe(Track::empty()).should_notify);
//! ```

use parking_lot::Mutex;

use tracknotify_parser::Track;

/// Result of offering a candidate track to a [`TrackTracker`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// True when the candidate replaced the stored track and must be announced
    pub should_notify: bool,
    /// The stored track after the observation
    pub effective: Track,
}

#[derive(Debug, Default)]
struct Cell {
    track: Track,
    transitions: u64,
}

/// Last-known track of one renderer session.
///
/// Every read-compare-replace of the stored track happens under a single
/// lock, so concurrent observers never both accept the same change and
/// never lose one.
#[derive(Debug, Default)]
pub struct TrackTracker {
    cell: Mutex<Cell>,
}

impl TrackTracker {
    /// Create a tracker holding the empty track
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a candidate track.
    ///
    /// Candidates without title and artist never change the stored track.
    /// Otherwise the candidate is compared with the stored track on class,
    /// title and artist; a difference replaces the stored track and asks
    /// for a notification.
    pub fn observe(&self, candidate: Track) -> Observation {
        self.observe_with(candidate, |_| {})
    }

    /// Like [`observe`](Self::observe), running `on_change` with the newly
    /// accepted track before the lock is released.
    ///
    /// Work done in `on_change` is ordered exactly like the stored values,
    /// which makes it the place to enqueue announcements. It must not block.
    pub fn observe_with<F>(&self, candidate: Track, on_change: F) -> Observation
    where
        F: FnOnce(&Track),
    {
        let mut cell = self.cell.lock();

        if !candidate.is_actionable() {
            return Observation {
                should_notify: false,
                effective: cell.track.clone(),
            };
        }

        if cell.track == candidate {
            tracing::trace!("Suppressing repeated track {:?}", candidate.title());
            return Observation {
                should_notify: false,
                effective: candidate,
            };
        }

        on_change(&candidate);
        cell.track = candidate.clone();
        cell.transitions += 1;

        Observation {
            should_notify: true,
            effective: candidate,
        }
    }

    /// The stored track; the empty track until a change was accepted
    pub fn current(&self) -> Track {
        self.cell.lock().track.clone()
    }

    /// Number of accepted changes so far
    pub fn transitions(&self) -> u64 {
        self.cell.lock().transitions
    }
}
