//! Utility and helper functions needed for:
//! - Transaction building, signing, submission and confirmation
//! - Talking JSON-RPC to the ledger
//! - Error handling
//! - Type casting

pub mod common;
pub mod error;
pub mod evm_rpc;
pub mod executor;
pub mod gas;
pub mod signer;
pub mod transaction_builder;
