//! Production collaborators.
//!
//! Each service is in its own submodule with its config and the trait
//! implementation the orchestrator drives:
//! - `node` - signs and broadcasts deployments over JSON-RPC
//! - `etherscan` - submits source verification to an explorer

pub mod etherscan;
pub mod node;

// Re-export commonly used types
pub use etherscan::{EtherscanConfig, EtherscanVerifier};
pub use node::{LocalSigner, NodeBroadcaster, NodeConfig};
