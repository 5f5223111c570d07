//! Resend countdown for one-time codes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Seconds a user waits before another code can be sent.
pub const RESEND_SECONDS: u32 = 60;

/// A one-second countdown published through a watch channel.
///
/// Nothing ticks until [`Countdown::start`] is called from inside a Tokio runtime.
/// Dropping the countdown stops its ticker.
pub struct Countdown {
    seconds: u32,
    remaining: Arc<watch::Sender<u32>>,
    cancel: CancellationToken,
    ticker: Option<JoinHandle<()>>,
}

impl Countdown {
    /// A countdown of `seconds`, not yet running.
    pub fn new(seconds: u32) -> Self {
        let (remaining, _) = watch::channel(seconds);
        Self {
            seconds,
            remaining: Arc::new(remaining),
            cancel: CancellationToken::new(),
            ticker: None,
        }
    }

    /// Seconds left.
    pub fn remaining(&self) -> u32 {
        *self.remaining.borrow()
    }

    /// Receive every tick.
    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.remaining.subscribe()
    }

    /// Whether the countdown reached zero.
    pub fn can_resend(&self) -> bool {
        self.remaining() == 0
    }

    /// Remaining time as `MM:SS`.
    ///
    /// ```
    /// use servicearea::countdown::Countdown;
    ///
    /// assert_eq!(Countdown::new(60).display(), "01:00");
    /// assert_eq!(Countdown::new(9).display(), "00:09");
    /// ```
    pub fn display(&self) -> String {
        let remaining = self.remaining();
        format!("{:02}:{:02}", remaining / 60, remaining % 60)
    }

    /// Start ticking. Calling it while a ticker runs does nothing.
    pub fn start(&mut self) {
        if self
            .ticker
            .as_ref()
            .is_some_and(|ticker| !ticker.is_finished())
        {
            return;
        }

        let remaining = Arc::clone(&self.remaining);
        let cancel = self.cancel.clone();

        self.ticker = Some(tokio::spawn(async move {
            let period = Duration::from_secs(1);
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);

            while *remaining.borrow() > 0 {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return,
                    _ = interval.tick() => {
                        remaining.send_modify(|left| *left = left.saturating_sub(1));
                    }
                }
            }
            tracing::debug!("resend countdown finished");
        }));
    }

    /// Reset to the full duration and start again.
    ///
    /// Only allowed once the previous countdown reached zero; returns whether it restarted.
    pub fn restart(&mut self) -> bool {
        if !self.can_resend() {
            return false;
        }
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        self.remaining.send_replace(self.seconds);
        self.start();
        true
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new(RESEND_SECONDS)
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
