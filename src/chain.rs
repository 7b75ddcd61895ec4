//! Chain client layer: data model, calls and reactive queries

pub mod call;
pub mod query;
pub mod state;
pub mod types;

pub use call::{calls, Call, EncodedCall};
pub use query::{Chain, KittyCard};
pub use state::{ChainSnapshot, ChainView, KittyStorage, RuntimeState};
pub use types::*;
