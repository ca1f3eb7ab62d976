// ABOUTME: Per-session frame channel over tokio's mpsc and broadcast channels.
// ABOUTME: The overflow policy picks the channel; the terminal frame rides a oneshot.

use super::frame::Frame;
use crate::config::OverflowPolicy;
use futures::stream::{self, BoxStream};
use futures::{StreamExt, future};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, ReceiverStream};

/// The receiving half is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("frame receiver closed")]
pub struct ReceiverClosed;

/// Frames as the HTTP body sees them: data frames, then the terminal frame.
pub type FrameStream = BoxStream<'static, Frame>;

enum DataSender {
    /// `send` waits for room.
    Block(mpsc::Sender<Frame>),
    /// `send` overwrites the oldest frame; the reader sees the gap as `Lagged`.
    DropOldest(broadcast::Sender<Frame>),
}

pub(super) struct FrameSender {
    data: DataSender,
    terminal: oneshot::Sender<Frame>,
}

impl FrameSender {
    pub async fn send(&self, frame: Frame) -> Result<(), ReceiverClosed> {
        match &self.data {
            DataSender::Block(tx) => tx.send(frame).await.map_err(|_| ReceiverClosed),
            DataSender::DropOldest(tx) => tx.send(frame).map(drop).map_err(|_| ReceiverClosed),
        }
    }

    /// Deliver the final frame after everything already queued.
    ///
    /// Never waits on the buffer bound.
    pub fn finish(self, frame: Frame) -> Result<(), ReceiverClosed> {
        let FrameSender { data, terminal } = self;
        // Closing the data half lets the reader drain it and move on
        drop(data);
        terminal.send(frame).map_err(|_| ReceiverClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.terminal.is_closed()
    }
}

/// Channel holding at most `capacity` data frames.
///
/// Broadcast capacity rounds up to a power of two, so `drop-oldest` may keep
/// slightly more than `capacity` frames.
pub(super) fn channel(capacity: usize, policy: OverflowPolicy) -> (FrameSender, FrameStream) {
    let capacity = capacity.max(1);
    let (terminal_tx, terminal_rx) = oneshot::channel();

    let (data, frames) = match policy {
        OverflowPolicy::Block => {
            let (tx, rx) = mpsc::channel(capacity);
            (DataSender::Block(tx), ReceiverStream::new(rx).boxed())
        }
        OverflowPolicy::DropOldest => {
            let (tx, rx) = broadcast::channel(capacity);
            let frames = BroadcastStream::new(rx).map(|item| match item {
                Ok(frame) => frame,
                Err(BroadcastStreamRecvError::Lagged(dropped)) => Frame::Lagged { dropped },
            });
            (DataSender::DropOldest(tx), frames.boxed())
        }
    };

    let terminal = stream::once(terminal_rx).filter_map(|sent| future::ready(sent.ok()));
    let sender = FrameSender {
        data,
        terminal: terminal_tx,
    };
    (sender, frames.chain(terminal).boxed())
}
