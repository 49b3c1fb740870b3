use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Idle timer of a single connection.
///
/// Arming spawns a timer task; when it elapses the `fired` flag is set and the
/// token is cancelled, which wakes whatever the connection worker is waiting
/// on. The flag lets the worker tell a timeout-induced close apart from a
/// genuine transport failure. Dropping the watchdog aborts the timer.
#[derive(Debug)]
pub struct IdleWatchdog {
    token: CancellationToken,
    fired: Arc<AtomicBool>,
    timer: JoinHandle<()>,
}

impl IdleWatchdog {
    pub fn arm(timeout: Duration) -> Self {
        let token = CancellationToken::new();
        let fired = Arc::new(AtomicBool::new(false));
        let timer = {
            let token = token.clone();
            let fired = fired.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                if !fired.swap(true, Ordering::AcqRel) {
                    token.cancel();
                }
            })
        };
        IdleWatchdog {
            token,
            fired,
            timer,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Resolves once the timeout elapsed.
    pub async fn fired(&self) {
        self.token.cancelled().await
    }
}

impl Drop for IdleWatchdog {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_timeout() {
        let watchdog = IdleWatchdog::arm(Duration::from_secs(30));
        assert!(!watchdog.has_fired());

        tokio::time::timeout(Duration::from_secs(31), watchdog.fired())
            .await
            .expect("watchdog should fire");
        assert!(watchdog.has_fired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_does_not_fire_early() {
        let watchdog = IdleWatchdog::arm(Duration::from_secs(30));
        let early = tokio::time::timeout(Duration::from_secs(10), watchdog.fired()).await;
        assert!(early.is_err());
        assert!(!watchdog.has_fired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_timer() {
        let watchdog = IdleWatchdog::arm(Duration::from_secs(1));
        let fired = watchdog.fired.clone();
        drop(watchdog);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!fired.load(Ordering::Acquire));
    }
}
