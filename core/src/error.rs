use thiserror::Error;

/// Every error kind named in the ledger core's contract. Message text is
/// load-bearing: callers and tests match against the rendered `Display`
/// string, not the variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("UTXO not found for {tx_hash}")]
    UtxoNotFound { tx_hash: String },

    #[error("Output #{index} of Tx {tx_hash} already spent!")]
    AlreadySpentOutput { tx_hash: String, index: u32 },

    #[error("Tx {tx_hash} index {index} already deleted!")]
    AlreadyDeleted { tx_hash: String, index: u32 },

    #[error("Claim failed!")]
    ClaimFailed,

    #[error("transaction input amount overflow")]
    AmountOverflow,

    #[error("output #{index} of Tx {tx_hash} already live in this patch")]
    DuplicateOutput { tx_hash: String, index: u32 },

    #[error("receipt already recorded for Tx {tx_hash}")]
    DuplicateReceipt { tx_hash: String },

    #[error("contract state conflict at address {address} merging patches at equal level")]
    ContractMergeConflict { address: String },

    #[error("receipt conflict for Tx {tx_hash} merging patches")]
    ReceiptMergeConflict { tx_hash: String },

    #[error("claim verification failed: {0}")]
    Crypto(#[from] concilium_crypto::CryptoError),
}
