//! Single-producer single-consumer integer channels with an explicit end-of-data signal.
//!
//! A channel is created as a pair of non-cloneable halves: one [`ChannelTx`] owned by the unit
//! that writes, one [`ChannelRx`] owned by the unit that reads. The end signal is a message of its
//! own, so a writer that disappears without sending it is reported to the reader as an error
//! rather than being mistaken for a regular end of the stream.

use tokio::sync::mpsc;

use crate::bail;
use crate::error::{ErrorKind, SieveResult};

/// Number of values that can be in flight on a channel hop.
///
/// With a single slot, a send completes once the previous value has been taken by the reader.
const CHANNEL_CAPACITY: usize = 1;

/// Element travelling on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Message {
    Value(u64),
    End,
}

/// Write half of a channel.
#[derive(Debug)]
pub struct ChannelTx {
    tx: mpsc::Sender<Message>,
}

impl ChannelTx {
    /// Sends `value` to the reader, suspending while the previous value is still in flight.
    ///
    /// Fails with [`ErrorKind::ChannelClosed`] when the reader has been dropped.
    pub async fn send(&mut self, value: u64) -> SieveResult<()> {
        if self.tx.send(Message::Value(value)).await.is_err() {
            bail!(
                ErrorKind::ChannelClosed,
                "Downstream channel closed",
                format!("The reader went away before receiving value {value}")
            );
        }

        Ok(())
    }

    /// Signals that no further values will be sent.
    ///
    /// Consumes the writer, so the end signal is always the last operation on the channel and
    /// can be sent only once.
    pub async fn send_end(self) -> SieveResult<()> {
        if self.tx.send(Message::End).await.is_err() {
            bail!(
                ErrorKind::ChannelClosed,
                "Downstream channel closed",
                "The reader went away before receiving the end of data"
            );
        }

        Ok(())
    }
}

/// Read half of a channel.
#[derive(Debug)]
pub struct ChannelRx {
    rx: mpsc::Receiver<Message>,
    ended: bool,
}

impl ChannelRx {
    /// Receives the next value, or [`None`] once the end of data has been reached.
    ///
    /// After the end of data has been observed every further call returns [`None`] without
    /// touching the underlying channel. Fails with [`ErrorKind::ChannelClosed`] when the writer
    /// was dropped without signaling the end of data.
    pub async fn receive(&mut self) -> SieveResult<Option<u64>> {
        if self.ended {
            return Ok(None);
        }

        match self.rx.recv().await {
            Some(Message::Value(value)) => Ok(Some(value)),
            Some(Message::End) => {
                self.ended = true;
                // Nothing can follow the end signal.
                self.rx.close();

                Ok(None)
            }
            None => {
                bail!(
                    ErrorKind::ChannelClosed,
                    "Upstream channel closed",
                    "The writer went away without signaling the end of data"
                );
            }
        }
    }

    /// Returns whether the end of data has been received.
    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

/// Creates a new channel, returning its write and read halves.
pub fn create_channel() -> (ChannelTx, ChannelRx) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

    (ChannelTx { tx }, ChannelRx { rx, ended: false })
}
