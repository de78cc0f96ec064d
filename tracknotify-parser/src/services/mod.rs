//! Service-specific extraction organized by UPnP service type
//!
//! - [`av_transport`]: now-playing metadata from AVTransport LastChange events

pub mod av_transport;
