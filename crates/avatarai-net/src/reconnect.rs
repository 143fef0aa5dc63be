use std::time::Duration;

use avatarai_shared::constants::{CLOSE_NORMAL, RECONNECT_DELAY_MS};

/// Decides whether a closed stream gets another connection attempt.
///
/// A normal closure never reconnects. Any other close code schedules a
/// single attempt after a fixed delay, but only while the session is still
/// active. There is no backoff and no attempt limit; the stream task re-asks
/// the policy on every close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    delay: Duration,
}

impl ReconnectPolicy {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn on_close(&self, close_code: u16, session_active: bool) -> Option<Duration> {
        if close_code == CLOSE_NORMAL || !session_active {
            None
        } else {
            Some(self.delay)
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(RECONNECT_DELAY_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avatarai_shared::constants::CLOSE_ABNORMAL;

    #[test]
    fn abnormal_close_schedules_fixed_delay() {
        let policy = ReconnectPolicy::default();
        assert_eq!(
            policy.on_close(CLOSE_ABNORMAL, true),
            Some(Duration::from_secs(3))
        );
    }

    #[test]
    fn normal_close_schedules_nothing() {
        assert_eq!(ReconnectPolicy::default().on_close(CLOSE_NORMAL, true), None);
    }

    #[test]
    fn inactive_session_schedules_nothing() {
        assert_eq!(ReconnectPolicy::default().on_close(CLOSE_ABNORMAL, false), None);
    }

    #[test]
    fn delay_does_not_grow() {
        let policy = ReconnectPolicy::new(Duration::from_millis(50));
        for _ in 0..5 {
            assert_eq!(policy.on_close(1011, true), Some(Duration::from_millis(50)));
        }
    }
}
