use chrono::{DateTime, Duration, Utc};

/// Running correction between the local clock and the server clock.
///
/// Camera timestamps arrive as server-epoch values and the two clocks may
/// drift, so the dashboard keeps a single millisecond offset derived from the
/// periodic `time` events. The offset is applied to every subsequently
/// computed "now", never retroactively to timestamps already stored.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClockCorrector {
    offset_millis: i64,
}

impl ClockCorrector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the offset from a server timestamp (epoch milliseconds).
    ///
    /// Each call overwrites the previous offset, so the last `time` event
    /// received always wins.
    pub fn correct(&mut self, server_millis: i64) {
        self.offset_millis = server_millis - Utc::now().timestamp_millis();
        tracing::debug!("Clock offset updated to {}ms", self.offset_millis);
    }

    /// Current time as the server would report it.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        Utc::now() + Duration::milliseconds(self.offset_millis)
    }

    /// The stored offset in milliseconds.
    #[must_use]
    pub fn offset_millis(&self) -> i64 {
        self.offset_millis
    }
}
