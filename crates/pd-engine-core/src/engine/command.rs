//! Lock-free control message queue
//!
//! Control messages travel from the control thread to the graph through an
//! `rtrb` single-producer single-consumer ring buffer:
//!
//! - **Control thread**: pushes in O(1), never blocks, never waits for audio
//! - **Audio thread**: drains pending messages at the start of each render
//!
//! The consumer lives next to the graph inside the graph slot, so the control
//! thread can also drain it (under the slot lock) before a patch change.
//! Messages therefore reach the graph in the order they were sent, relative
//! to patch opens and closes.
//!
//! Delivered messages go back to the control thread over a second ring and
//! are dropped there, so their strings are never freed on
//! the audio thread.

use crate::graph::{ControlMessage, SynthesisGraph};

/// Create a message queue with room for `capacity` pending messages
pub fn message_channel(capacity: usize) -> (MessageSender, MessageReceiver) {
    let (producer, consumer) = rtrb::RingBuffer::new(capacity);
    // One extra slot: a push can land right after a reclaim while the audio
    // thread is still draining
    let (spent_producer, spent_consumer) = rtrb::RingBuffer::new(capacity + 1);
    (
        MessageSender {
            producer,
            spent: spent_consumer,
        },
        MessageReceiver {
            consumer,
            spent: spent_producer,
        },
    )
}

/// Control-thread end of the queue
pub struct MessageSender {
    producer: rtrb::Producer<ControlMessage>,
    spent: rtrb::Consumer<ControlMessage>,
}

impl MessageSender {
    /// Queue a message (non-blocking)
    ///
    /// Messages already delivered are freed first. Returns `Err(message)` if
    /// the queue is full.
    pub fn send(&mut self, message: ControlMessage) -> Result<(), ControlMessage> {
        self.reclaim();
        self.producer.push(message).map_err(|e| match e {
            rtrb::PushError::Full(value) => value,
        })
    }

    /// Free delivered messages handed back by the graph side
    ///
    /// Returns how many were freed.
    pub fn reclaim(&mut self) -> usize {
        let mut freed = 0;
        while self.spent.pop().is_ok() {
            freed += 1;
        }
        freed
    }

    /// Free slots left in the queue
    pub fn slots(&self) -> usize {
        self.producer.slots()
    }
}

/// Graph-side end of the queue
pub struct MessageReceiver {
    consumer: rtrb::Consumer<ControlMessage>,
    spent: rtrb::Producer<ControlMessage>,
}

impl MessageReceiver {
    /// Deliver every pending message to `graph`
    ///
    /// Returns (delivered, failed). Failures are only counted; this runs on
    /// the audio thread where logging is not allowed.
    pub fn drain_into(&mut self, graph: &mut dyn SynthesisGraph) -> (usize, usize) {
        let mut delivered = 0;
        let mut failed = 0;
        while let Ok(message) = self.consumer.pop() {
            match graph.send(&message) {
                Ok(()) => delivered += 1,
                Err(_) => failed += 1,
            }
            // Never full: the sender reclaims before every push
            let _ = self.spent.push(message);
        }
        (delivered, failed)
    }

    /// Number of messages waiting
    pub fn pending(&self) -> usize {
        self.consumer.slots()
    }
}
