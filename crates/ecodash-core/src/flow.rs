//! Playback of delayed message sequences.
//!
//! Every step is scheduled relative to the start of the flow, not to the
//! completion of the previous send. Sends start in step order and may
//! overlap, so a slow send never holds back a later step. Each outcome is
//! still collected, and a failed send does not stop the ones after it.

use crate::reply::{Sequence, Step};
use crate::transport::{deliver, ChatId, ChatTransport, TransportError};
use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Outcome of playing one sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackReport {
    /// Messages accepted by the transport
    pub sent: usize,
    /// Messages the transport rejected
    pub failed: usize,
    /// Whether playback stopped early on cancellation
    pub cancelled: bool,
}

impl PlaybackReport {
    /// True if every step was attempted and delivered
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        !self.cancelled && self.failed == 0
    }

    fn record(&mut self, chat: ChatId, index: usize, result: Result<(), TransportError>) {
        match result {
            Ok(()) => self.sent += 1,
            Err(e) => {
                warn!(chat, index, "Flow step failed: {e}");
                self.failed += 1;
            }
        }
    }
}

/// Plays [`Sequence`]s against a transport.
#[derive(Debug, Clone, Default)]
pub struct FlowController {
    cancel: CancellationToken,
}

impl FlowController {
    /// Controller with its own cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Controller stopped by `cancel`.
    #[must_use]
    pub const fn with_cancellation(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Token that stops pending steps when cancelled
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Start each step's send at `flow_start + delay`.
    ///
    /// Steps with equal offsets start in the order they were added. Once the
    /// token is cancelled no further step starts; sends already in flight
    /// are allowed to finish and are counted.
    pub async fn play(
        &self,
        transport: &dyn ChatTransport,
        chat: ChatId,
        sequence: Sequence,
    ) -> PlaybackReport {
        let started = Instant::now();
        let mut report = PlaybackReport::default();

        let mut steps: Vec<(usize, Step)> = sequence.into_iter().enumerate().collect();
        steps.sort_by_key(|(_, step)| step.delay);
        let mut pending = steps.into_iter().peekable();
        let mut in_flight = FuturesUnordered::new();

        loop {
            let next_due = pending.peek().map(|(_, step)| started + step.delay);
            if next_due.is_none() && in_flight.is_empty() {
                break;
            }

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    if next_due.is_some() {
                        debug!(chat, "Flow cancelled with steps pending");
                        report.cancelled = true;
                    }
                    break;
                }
                Some((index, result)) = in_flight.next(), if !in_flight.is_empty() => {
                    report.record(chat, index, result);
                }
                () = sleep_until(next_due.unwrap_or(started)), if next_due.is_some() => {
                    if let Some((index, step)) = pending.next() {
                        in_flight.push(async move {
                            (index, deliver(transport, chat, step.message).await)
                        });
                    }
                }
            }
        }

        while let Some((index, result)) = in_flight.next().await {
            report.record(chat, index, result);
        }

        report
    }
}
