//! Session lifecycle events
//!
//! A session task reports what happens to the link on an event channel,
//! separate from the per-request response channels. Subscribers that only
//! care about connectivity can filter with [`SessionEvent::is_lifecycle`].

/// Notifications a session task emits as it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    // Link lifecycle
    /// TCP connection established
    Connected,
    /// TCP connection lost; every pending request was rejected
    Disconnected,
    /// Waiting out the delay before the next dial attempt
    Reconnecting,

    // Stream hygiene
    /// An incomplete reply frame was superseded and discarded
    FrameDropped,
    /// Raw bytes outside any recognizable frame were discarded
    TrailingBytesDropped {
        /// Number of bytes dropped
        count: u64,
    },
}

impl SessionEvent {
    /// Whether this event marks a link state change.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            SessionEvent::Connected | SessionEvent::Disconnected | SessionEvent::Reconnecting
        )
    }
}
