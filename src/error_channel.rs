use std::time::Duration;
use tokio::time::Instant;
use tracing::error;

pub const ERROR_TTL: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransientError {
    pub message: String,
    pub expires_at: Instant,
}

/// Single error slot shown to the user. A new report replaces the old one and
/// restarts the expiry window.
#[derive(Debug)]
pub struct ErrorChannel {
    slot: Option<TransientError>,
    ttl: Duration,
}

impl Default for ErrorChannel {
    fn default() -> Self {
        Self::new(ERROR_TTL)
    }
}

impl ErrorChannel {
    pub fn new(ttl: Duration) -> Self {
        Self { slot: None, ttl }
    }

    pub fn report(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!(%message, "session error");
        self.slot = Some(TransientError {
            message,
            expires_at: Instant::now() + self.ttl,
        });
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }

    /// The live message, if any. An expired slot reads as empty even before
    /// [`ErrorChannel::expire`] runs.
    pub fn current(&self) -> Option<&str> {
        self.slot
            .as_ref()
            .filter(|e| Instant::now() < e.expires_at)
            .map(|e| e.message.as_str())
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.slot.as_ref().map(|e| e.expires_at)
    }

    /// Drops the slot once its window has passed. Returns whether anything
    /// was cleared.
    pub fn expire(&mut self) -> bool {
        match &self.slot {
            Some(e) if Instant::now() >= e.expires_at => {
                self.slot = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use tokio::time;

    #[tokio::test(start_paused = true)]
    async fn report__expires_after_five_seconds() {
        // given
        let mut channel = ErrorChannel::default();
        channel.report("boom");

        // when
        time::advance(Duration::from_millis(4_999)).await;
        let before = channel.current().map(str::to_string);
        time::advance(Duration::from_millis(1)).await;

        // then
        assert_eq!(before.as_deref(), Some("boom"));
        assert_eq!(channel.current(), None);
        assert!(channel.expire());
        assert_eq!(channel.deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn report__overwrites_and_restarts_window() {
        // given
        let mut channel = ErrorChannel::default();
        channel.report("first");
        time::advance(Duration::from_secs(4)).await;

        // when
        channel.report("second");
        time::advance(Duration::from_secs(4)).await;

        // then
        assert_eq!(channel.current(), Some("second"));
        assert!(!channel.expire());
    }

    #[tokio::test(start_paused = true)]
    async fn clear__empties_slot_early() {
        let mut channel = ErrorChannel::default();
        channel.report("boom");
        channel.clear();
        assert_eq!(channel.current(), None);
        assert!(!channel.expire());
    }
}
