// In-process development chain: block format in `devnet/block.rs`, call
// dispatch in `devnet/runtime.rs` and `devnet/kitties.rs`, the transaction
// pool in `devnet/pool.rs` and the authoring node in `devnet/node.rs`.

pub mod block;
pub mod kitties;
pub mod node;
pub mod pool;
pub mod runtime;

pub use block::{Block, BlockHeader};
pub use node::DevNode;
pub use runtime::{apply_call, build_genesis, on_finalize, BlockEnv, Origin};
