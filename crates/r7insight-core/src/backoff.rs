// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Reconnection with exponential backoff and jitter.

use crate::constants::{MAX_RECONNECT_DELAY, MIN_RECONNECT_DELAY};
use crate::diagnostics::diag;
use crate::transport::Transport;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Delay sequence for consecutive failed connection attempts.
///
/// The Nth call to [`Backoff::next_delay`] yields `d + jitter` where
/// `d = min(min_delay * 2^(N-1), max_delay)` and jitter is uniform in `[0, d)`.
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    max_delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(MIN_RECONNECT_DELAY, MAX_RECONNECT_DELAY)
    }
}

impl Backoff {
    #[must_use]
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            current: min_delay,
            max_delay: max_delay.max(min_delay),
        }
    }

    /// The base delay the next wait will use, before jitter.
    #[must_use]
    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn next_delay<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Duration {
        let base = self.current;
        let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        let jitter_ms = if base_ms == 0 {
            0
        } else {
            rng.gen_range(0..base_ms)
        };
        self.current = base.saturating_mul(2).min(self.max_delay);
        base + Duration::from_millis(jitter_ms)
    }
}

/// Closes `transport` and reconnects it, retrying with [`Backoff`] until a
/// connection succeeds or `cancel` is triggered.
///
/// Returns `true` once connected, `false` if cancelled.
pub async fn reconnect(
    transport: &mut dyn Transport,
    cancel: &CancellationToken,
    debug: bool,
) -> bool {
    diag!(debug, "Reopening connection to {}", transport.endpoint());
    transport.close().await;

    let mut backoff = Backoff::default();
    let mut rng = StdRng::from_entropy();

    while !cancel.is_cancelled() {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return false,
            result = transport.connect() => result,
        };

        match result {
            Ok(()) => {
                diag!(debug, "Connected to {}", transport.endpoint());
                return true;
            }
            Err(e) => {
                diag!(
                    debug,
                    "Unable to connect to Rapid7 Insight API at {}: {e}",
                    transport.endpoint()
                );
            }
        }

        let wait = backoff.next_delay(&mut rng);
        diag!(debug, "Waiting {} ms for retry", wait.as_millis());

        tokio::select! {
            _ = sleep(wait) => {}
            _ = cancel.cancelled() => return false,
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io;
    use tokio::time::Instant;

    struct FlakyTransport {
        failures_left: usize,
        connects: usize,
        closes: usize,
    }

    #[async_trait]
    impl Transport for FlakyTransport {
        async fn connect(&mut self) -> io::Result<()> {
            self.connects += 1;
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
            }
            Ok(())
        }

        async fn write(&mut self, _bytes: &[u8]) -> io::Result<()> {
            Ok(())
        }

        async fn close(&mut self) {
            self.closes += 1;
        }

        fn endpoint(&self) -> String {
            "flaky:0".to_string()
        }
    }

    #[test]
    fn test_delay_bounds_per_attempt() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut backoff = Backoff::default();
        for attempt in 1..=12u32 {
            let floor = (100u64 << (attempt - 1)).min(10_000);
            let delay = u64::try_from(backoff.next_delay(&mut rng).as_millis()).unwrap();
            assert!(
                delay >= floor && delay < floor * 2,
                "attempt {attempt}: {delay}ms outside [{floor}, {})",
                floor * 2
            );
        }
    }

    #[test]
    fn test_delay_caps_at_max() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut backoff = Backoff::default();
        for _ in 0..20 {
            backoff.next_delay(&mut rng);
        }
        assert_eq!(backoff.current(), MAX_RECONNECT_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_retries_until_success() {
        let mut transport = FlakyTransport {
            failures_left: 3,
            connects: 0,
            closes: 0,
        };
        let cancel = CancellationToken::new();

        let start = Instant::now();
        assert!(reconnect(&mut transport, &cancel, false).await);
        let elapsed = start.elapsed();

        assert_eq!(transport.connects, 4);
        assert_eq!(transport.closes, 1);
        // 100 + 200 + 400 ms floors, each at most doubled by jitter
        assert!(elapsed >= Duration::from_millis(700));
        assert!(elapsed < Duration::from_millis(1_400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_stops_when_cancelled() {
        let mut transport = FlakyTransport {
            failures_left: usize::MAX,
            connects: 0,
            closes: 0,
        };
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(30)).await;
            trigger.cancel();
        });

        assert!(!reconnect(&mut transport, &cancel, false).await);
        assert!(transport.connects > 1);
    }

    #[tokio::test]
    async fn test_reconnect_skips_when_already_cancelled() {
        let mut transport = FlakyTransport {
            failures_left: 0,
            connects: 0,
            closes: 0,
        };
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(!reconnect(&mut transport, &cancel, false).await);
        assert_eq!(transport.connects, 0);
        assert_eq!(transport.closes, 1);
    }
}
