//! Single-slot, latest-wins frame mailbox.
//!
//! The capture side posts frames as fast as it gets them; the processing
//! side takes whatever is newest when it is ready. An unconsumed frame is
//! overwritten and counted as dropped, so a slow tracker never builds up a
//! backlog.

use crate::frame::Frame;
use crate::metrics;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Slot {
    frame: Option<Frame>,
    closed: bool,
}

/// Latest-wins handoff between capture and processing.
#[derive(Debug, Default)]
pub struct FrameMailbox {
    slot: Mutex<Slot>,
    notify: Notify,
    posted: AtomicU64,
    dropped: AtomicU64,
}

impl FrameMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post a frame, replacing any frame not yet taken.
    ///
    /// Returns the sequence number of the displaced frame, if any. Posting
    /// to a closed mailbox drops the frame.
    pub fn post(&self, frame: Frame) -> Option<u64> {
        let displaced = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.closed {
                return Some(frame.sequence());
            }
            self.posted.fetch_add(1, Ordering::Relaxed);
            slot.frame.replace(frame).map(|old| old.sequence())
        };

        if displaced.is_some() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            metrics::record_frame_dropped("mailbox");
        }
        self.notify.notify_one();
        displaced
    }

    /// Take the newest frame without waiting.
    pub fn try_recv(&self) -> Option<Frame> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .frame
            .take()
    }

    /// Wait for the newest frame. Returns `None` once the mailbox is closed
    /// and drained.
    pub async fn recv(&self) -> Option<Frame> {
        loop {
            let notified = self.notify.notified();
            {
                let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some(frame) = slot.frame.take() {
                    return Some(frame);
                }
                if slot.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// End the stream. A frame already in the slot can still be received.
    pub fn close(&self) {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closed = true;
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closed
    }

    /// Frames accepted by `post`.
    pub fn posted(&self) -> u64 {
        self.posted.load(Ordering::Relaxed)
    }

    /// Frames overwritten before anyone took them.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
