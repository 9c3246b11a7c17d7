// Typed status events emitted by the executor.
//
// Replaces ad-hoc status callbacks with an ordered event stream: observers
// receive a TxStarted before every transport send, then TxDone or TxFailed,
// and the mirrored Rx trio around every read.

use serde::{Deserialize, Serialize};

/// One observable step of the executor's interaction with the transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum StatusEvent {
    /// A frame is about to be sent.
    TxStarted { bytes: Vec<u8> },
    /// The frame went out.
    TxDone { len: usize },
    /// The send failed; the drain halts after this event.
    TxFailed { reason: String },
    /// A register read is about to be issued.
    RxStarted { register: u8, expected: usize },
    /// The read completed with the expected byte count.
    RxDone { bytes: Vec<u8> },
    /// The read failed or came back short.
    RxFailed { reason: String },
    /// One queued command finished, including its timed wait.
    CommandDone { description: String },
    /// The queue emptied and the drain ended.
    DrainComplete { commands_run: usize },
}
