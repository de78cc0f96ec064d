//! Scrobble sinks

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tracknotify_parser::Track;

use super::{process, ScrobbleSink};
use crate::config::ScrobbleCommand;
use crate::error::SinkError;

/// Kind of listen reported to the scrobbler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScrobbleKind {
    /// Internet radio or another live broadcast
    Radio,
    /// A regular track
    Played,
}

impl ScrobbleKind {
    /// Broadcast class means radio, anything else (including no class) a
    /// regular track
    pub fn for_track(track: &Track) -> Self {
        if track.is_broadcast() {
            ScrobbleKind::Radio
        } else {
            ScrobbleKind::Played
        }
    }

    /// Single letter type code: `"R"` or `"P"`
    pub fn as_code(&self) -> &'static str {
        match self {
            ScrobbleKind::Radio => "R",
            ScrobbleKind::Played => "P",
        }
    }
}

/// One accepted track change, stamped when it was accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrobbleSubmission {
    pub track: Track,
    pub kind: ScrobbleKind,
    pub timestamp: DateTime<Utc>,
}

impl ScrobbleSubmission {
    pub fn new(track: Track, timestamp: DateTime<Utc>) -> Self {
        let kind = ScrobbleKind::for_track(&track);
        Self {
            track,
            kind,
            timestamp,
        }
    }
}

/// Runs an external program once per submission.
///
/// The program gets its configured arguments followed by
/// `--type <R|P> --timestamp <unix-secs>` and, when present,
/// `--title <title>` and `--artist <artist>`.
#[derive(Debug, Clone)]
pub struct CommandScrobbler {
    command: ScrobbleCommand,
}

impl CommandScrobbler {
    pub fn new(command: ScrobbleCommand) -> Self {
        Self { command }
    }

    /// Full argument list for `submission`
    pub fn arguments(&self, submission: &ScrobbleSubmission) -> Vec<String> {
        let mut args = self.command.args.clone();
        args.push("--type".to_string());
        args.push(submission.kind.as_code().to_string());
        args.push("--timestamp".to_string());
        args.push(submission.timestamp.timestamp().to_string());

        if let Some(title) = submission.track.title() {
            args.push("--title".to_string());
            args.push(title.to_string());
        }
        if let Some(artist) = submission.track.artist() {
            args.push("--artist".to_string());
            args.push(artist.to_string());
        }

        args
    }
}

#[async_trait]
impl ScrobbleSink for CommandScrobbler {
    fn name(&self) -> &'static str {
        "scrobble-command"
    }

    async fn submit(&self, submission: &ScrobbleSubmission) -> Result<(), SinkError> {
        process::run(&self.command.program, &self.arguments(submission)).await
    }
}
