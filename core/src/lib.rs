//! Transaction-execution and state-transition core of a UTXO-based
//! distributed ledger: input validation and claim verification, a
//! copy-on-write Patch/UTXO overlay, and a sandboxed contract lifecycle.
//!
//! Networking, consensus, block-DAG storage, RPC, and wallet concerns are
//! out of scope. This crate is the deterministic core a node wraps.

pub mod application;
pub mod coins;
pub mod contract;
pub mod error;
pub mod patch;
pub mod storage;
pub mod transaction;
pub mod utxo;

pub use application::Application;
pub use coins::Coins;
pub use contract::{
    is_valid_method_name, Contract, CONTRACT_METHOD_SEPARATOR, MIN_CONTRACT_FEE, TIMEOUT_CODE,
    TX_STATUS_FAILED, TX_STATUS_OK,
};
pub use error::CoreError;
pub use patch::Patch;
pub use storage::{InMemoryStorage, UtxoSnapshotProvider};
pub use transaction::{Receipt, Transaction, TxInput, TxOutput, TxStatus};
pub use utxo::{Utxo, UtxoAccessError};
