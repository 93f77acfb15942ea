use std::fmt;

use concilium_crypto::Address;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::coins::Coins;

/// A reference to a previous output plus the proof that the spender
/// controls it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub referenced_tx_hash: [u8; 32],
    pub output_index: u32,
    /// Recoverable ECDSA signature over the input's signed digest.
    pub claim_proof: Vec<u8>,
}

impl TxInput {
    pub fn new(referenced_tx_hash: [u8; 32], output_index: u32, claim_proof: Vec<u8>) -> Self {
        Self {
            referenced_tx_hash,
            output_index,
            claim_proof,
        }
    }
}

/// A new output to be minted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub coins: Coins,
}

impl TxOutput {
    pub fn new(coins: Coins) -> Self {
        Self { coins }
    }
}

/// The outcome of processing one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    Ok,
    Failed,
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TxStatus::Ok => crate::contract::TX_STATUS_OK,
            TxStatus::Failed => crate::contract::TX_STATUS_FAILED,
        };
        write!(f, "{text}")
    }
}

/// Records the outcome of executing one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub status: TxStatus,
    pub coins_used: u64,
    pub contract_address: Option<Address>,
    pub internal_txns: Vec<[u8; 32]>,
}

impl Receipt {
    pub fn ok(coins_used: u64, contract_address: Option<Address>) -> Self {
        Self {
            status: TxStatus::Ok,
            coins_used,
            contract_address,
            internal_txns: Vec::new(),
        }
    }

    pub fn failed(coins_used: u64, contract_address: Option<Address>) -> Self {
        Self {
            status: TxStatus::Failed,
            coins_used,
            contract_address,
            internal_txns: Vec::new(),
        }
    }
}

/// A transaction drawn from a block. A transaction with no inputs is a
/// coinbase/issue transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub contract_code: Option<String>,
    pub contract_invocation: Option<String>,
    pub witness_group_id: u64,
}

/// The fields that feed a transaction's content-addressed hash. Claim
/// proofs are deliberately excluded: a spender signs over the hash, so the
/// hash can't depend on the very signature it's used to authenticate.
#[derive(Serialize)]
struct InputPreimage {
    referenced_tx_hash: [u8; 32],
    output_index: u32,
}

#[derive(Serialize)]
struct TxPreimage<'a> {
    inputs: Vec<InputPreimage>,
    outputs: &'a [TxOutput],
    contract_code: &'a Option<String>,
    contract_invocation: &'a Option<String>,
    witness_group_id: u64,
}

impl Transaction {
    pub fn new(
        inputs: Vec<TxInput>,
        outputs: Vec<TxOutput>,
        contract_code: Option<String>,
        contract_invocation: Option<String>,
        witness_group_id: u64,
    ) -> Self {
        Self {
            inputs,
            outputs,
            contract_code,
            contract_invocation,
            witness_group_id,
        }
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Content-addressed hash of this transaction.
    pub fn hash(&self) -> [u8; 32] {
        let preimage = TxPreimage {
            inputs: self
                .inputs
                .iter()
                .map(|i| InputPreimage {
                    referenced_tx_hash: i.referenced_tx_hash,
                    output_index: i.output_index,
                })
                .collect(),
            outputs: &self.outputs,
            contract_code: &self.contract_code,
            contract_invocation: &self.contract_invocation,
            witness_group_id: self.witness_group_id,
        };
        let bytes = bincode::serialize(&preimage).expect("transaction preimage always encodes");
        let mut hasher = Sha3_256::new();
        hasher.update(&bytes);
        hasher.finalize().into()
    }

    /// The bytes the claimant of input `index` must have signed. Currently
    /// equal to [`Transaction::hash`] regardless of `index`, a placeholder
    /// for a future SIGHASH-style partial commitment scheme.
    pub fn hash_input(&self, _index: u32) -> [u8; 32] {
        self.hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concilium_crypto::Address;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    #[test]
    fn hash_is_stable_and_ignores_claim_proof() {
        let tx_a = Transaction::new(
            vec![TxInput::new([1u8; 32], 0, vec![1, 2, 3])],
            vec![TxOutput::new(Coins::new(10, addr(1)))],
            None,
            None,
            7,
        );
        let tx_b = Transaction::new(
            vec![TxInput::new([1u8; 32], 0, vec![9, 9, 9])],
            vec![TxOutput::new(Coins::new(10, addr(1)))],
            None,
            None,
            7,
        );
        assert_eq!(tx_a.hash(), tx_b.hash());
    }

    #[test]
    fn hash_input_is_constant_across_indices() {
        let tx = Transaction::new(
            vec![
                TxInput::new([1u8; 32], 0, vec![]),
                TxInput::new([1u8; 32], 1, vec![]),
            ],
            vec![],
            None,
            None,
            0,
        );
        assert_eq!(tx.hash_input(0), tx.hash());
        assert_eq!(tx.hash_input(1), tx.hash());
    }

    #[test]
    fn coinbase_has_no_inputs() {
        let tx = Transaction::new(vec![], vec![TxOutput::new(Coins::new(1, addr(1)))], None, None, 0);
        assert!(tx.is_coinbase());
    }

    #[test]
    fn status_display_matches_exposed_constants() {
        assert_eq!(TxStatus::Ok.to_string(), crate::contract::TX_STATUS_OK);
        assert_eq!(TxStatus::Failed.to_string(), crate::contract::TX_STATUS_FAILED);
    }
}
