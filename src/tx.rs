// Transaction construction and submission. The wire format lives in
// `tx/extrinsic.rs`, signing and nonce tracking in `tx/pipeline.rs`.

pub mod extrinsic;
pub mod pipeline;

pub use extrinsic::*;
pub use pipeline::{Broadcast, Pipeline};

use crate::error::Result;
use crate::reactive::Signal;

/// Accepts submissions and reports their status as an observable value.
///
/// An `Err` means the submission was refused before reaching the network
/// (e.g. the sender has no key here).
pub trait Submitter {
    fn submit(&self, submission: Submission) -> Result<Signal<TxStatus>>;
}
