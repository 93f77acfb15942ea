use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::coins::Coins;

/// Internal result of a UTXO-local lookup/mutation, before the caller
/// renders it into one of the ledger's literal error strings (which need
/// the referencing transaction hash that `UTXO` itself doesn't know about).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtxoAccessError {
    /// The position existed and was spent.
    AlreadySpent,
    /// The position never held an output.
    NotFound,
}

/// The set of as-yet-unspent outputs of one transaction, indexed by output
/// position, plus a tombstone set recording which positions have been
/// spent. For any index `i`: either `outputs[i]` is present or `i` is in
/// `spent`, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub tx_hash: [u8; 32],
    outputs: HashMap<u32, Coins>,
    spent: HashSet<u32>,
}

impl Utxo {
    pub fn new(tx_hash: [u8; 32]) -> Self {
        Self {
            tx_hash,
            outputs: HashMap::new(),
            spent: HashSet::new(),
        }
    }

    pub fn from_outputs(tx_hash: [u8; 32], outputs: HashMap<u32, Coins>) -> Self {
        Self {
            tx_hash,
            outputs,
            spent: HashSet::new(),
        }
    }

    /// `true` iff `index` currently holds a live (unspent) output.
    pub fn has_live(&self, index: u32) -> bool {
        self.outputs.contains_key(&index)
    }

    pub fn insert_output(&mut self, index: u32, coins: Coins) {
        self.spent.remove(&index);
        self.outputs.insert(index, coins);
    }

    /// Returns the coins at `index`, or the reason they can't be returned:
    /// tombstoned (`AlreadySpent`) or never present (`NotFound`).
    pub fn coins_at_index(&self, index: u32) -> Result<Coins, UtxoAccessError> {
        if let Some(coins) = self.outputs.get(&index) {
            return Ok(*coins);
        }
        if self.spent.contains(&index) {
            Err(UtxoAccessError::AlreadySpent)
        } else {
            Err(UtxoAccessError::NotFound)
        }
    }

    /// Marks `index` spent. Fails with `AlreadySpent` if already tombstoned.
    pub fn spend_coins(&mut self, index: u32) -> Result<(), UtxoAccessError> {
        if self.spent.contains(&index) {
            return Err(UtxoAccessError::AlreadySpent);
        }
        self.outputs.remove(&index);
        self.spent.insert(index);
        Ok(())
    }

    /// `true` iff no live outputs remain.
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn spent_indices(&self) -> &HashSet<u32> {
        &self.spent
    }

    /// Merge two overlay copies of the same underlying UTXO: the result's
    /// spent-set is the union of both, and the live outputs are the
    /// intersection (an output spent in either input is spent in the
    /// result).
    pub fn merge(a: &Utxo, b: &Utxo) -> Utxo {
        let outputs = a
            .outputs
            .iter()
            .filter(|(index, _)| b.outputs.contains_key(index))
            .map(|(index, coins)| (*index, *coins))
            .collect();
        let spent = a.spent.union(&b.spent).copied().collect();
        Utxo {
            tx_hash: a.tx_hash,
            outputs,
            spent,
        }
    }
}
