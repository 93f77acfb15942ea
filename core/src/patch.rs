use std::collections::HashMap;

use concilium_crypto::Address;

use crate::coins::Coins;
use crate::contract::Contract;
use crate::error::CoreError;
use crate::transaction::Receipt;
use crate::utxo::{Utxo, UtxoAccessError};

/// Single-writer, copy-on-write overlay carrying one block's worth of
/// mutations: UTXO spends/creations, contract deploys/updates, and
/// receipts. Patches may chain via [`Patch::merge`]; every merge produces a
/// fresh, owned patch rather than a back-reference to its inputs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Patch {
    level: u64,
    utxo_map: HashMap<[u8; 32], Utxo>,
    contract_map: HashMap<Address, Contract>,
    receipts: Vec<([u8; 32], Receipt)>,
    /// Reverse index: which transaction spent a given (tx_hash, index).
    spent_by: HashMap<([u8; 32], u32), [u8; 32]>,
}

impl Patch {
    pub fn new(level: u64) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    pub fn level(&self) -> u64 {
        self.level
    }

    pub fn get_utxo(&self, tx_hash: &[u8; 32]) -> Option<&Utxo> {
        self.utxo_map.get(tx_hash)
    }

    /// Insert a new output. Fails if `(tx_hash, index)` already exists as a
    /// live output in this patch.
    pub fn create_coins(
        &mut self,
        tx_hash: [u8; 32],
        index: u32,
        coins: Coins,
    ) -> Result<(), CoreError> {
        let utxo = self
            .utxo_map
            .entry(tx_hash)
            .or_insert_with(|| Utxo::new(tx_hash));
        if utxo.has_live(index) {
            return Err(CoreError::DuplicateOutput {
                tx_hash: hex::encode(tx_hash),
                index,
            });
        }
        utxo.insert_output(index, coins);
        Ok(())
    }

    /// Lazily clone `source` into the patch on first write to its tx_hash,
    /// then mark `index` spent. `spending_tx_hash` is retained for reverse
    /// indexing. Assumes the caller has already verified `index` is live
    /// (e.g. via [`Utxo::coins_at_index`] on the same view the caller read).
    pub fn spend_coins(
        &mut self,
        source: &Utxo,
        index: u32,
        spending_tx_hash: [u8; 32],
    ) -> Result<(), CoreError> {
        let tx_hash = source.tx_hash;
        let entry = self
            .utxo_map
            .entry(tx_hash)
            .or_insert_with(|| source.clone());
        entry.spend_coins(index).map_err(|e| match e {
            UtxoAccessError::AlreadySpent => CoreError::AlreadyDeleted {
                tx_hash: hex::encode(tx_hash),
                index,
            },
            UtxoAccessError::NotFound => CoreError::AlreadySpentOutput {
                tx_hash: hex::encode(tx_hash),
                index,
            },
        })?;
        self.spent_by.insert((tx_hash, index), spending_tx_hash);
        Ok(())
    }

    pub fn set_contract(&mut self, contract: Contract) {
        self.contract_map.insert(contract.address, contract);
    }

    pub fn get_contract(&self, address: &Address) -> Option<&Contract> {
        self.contract_map.get(address)
    }

    pub fn add_receipt(&mut self, tx_hash: [u8; 32], receipt: Receipt) -> Result<(), CoreError> {
        if self.receipts.iter().any(|(h, _)| *h == tx_hash) {
            return Err(CoreError::DuplicateReceipt {
                tx_hash: hex::encode(tx_hash),
            });
        }
        self.receipts.push((tx_hash, receipt));
        Ok(())
    }

    /// Receipts in insertion order.
    pub fn receipts(&self) -> &[([u8; 32], Receipt)] {
        &self.receipts
    }

    pub fn get_receipt(&self, tx_hash: &[u8; 32]) -> Option<&Receipt> {
        self.receipts.iter().find(|(h, _)| h == tx_hash).map(|(_, r)| r)
    }

    /// Union the mutations of `self` and `other` into a fresh patch.
    ///
    /// UTXOs present in both: spent-set is the union, live outputs are the
    /// intersection. Contract state: the higher-`level` side wins; at equal
    /// levels, a genuine divergence (not just both sides independently
    /// writing the same value) is a conflict. Receipts: a tx_hash present
    /// in both with differing receipts is a conflict.
    pub fn merge(&self, other: &Patch) -> Result<Patch, CoreError> {
        let mut result = Patch::new(self.level.max(other.level));

        let mut tx_hashes: Vec<[u8; 32]> = self.utxo_map.keys().copied().collect();
        for h in other.utxo_map.keys() {
            if !self.utxo_map.contains_key(h) {
                tx_hashes.push(*h);
            }
        }
        for tx_hash in tx_hashes {
            let merged = match (self.utxo_map.get(&tx_hash), other.utxo_map.get(&tx_hash)) {
                (Some(a), Some(b)) => Utxo::merge(a, b),
                (Some(a), None) => a.clone(),
                (None, Some(b)) => b.clone(),
                (None, None) => unreachable!("tx_hash collected from one of the two maps"),
            };
            result.utxo_map.insert(tx_hash, merged);
        }

        result.contract_map = self.contract_map.clone();
        for (address, contract) in &other.contract_map {
            match result.contract_map.get(address) {
                None => {
                    result.contract_map.insert(*address, contract.clone());
                }
                Some(existing) if existing == contract => {}
                Some(_) if other.level > self.level => {
                    result.contract_map.insert(*address, contract.clone());
                }
                Some(_) if other.level < self.level => {}
                Some(_) => {
                    return Err(CoreError::ContractMergeConflict {
                        address: address.to_hex(),
                    })
                }
            }
        }

        result.receipts = self.receipts.clone();
        for (tx_hash, receipt) in &other.receipts {
            match result.receipts.iter().find(|(h, _)| h == tx_hash) {
                None => result.receipts.push((*tx_hash, receipt.clone())),
                Some((_, existing)) if existing == receipt => {}
                Some(_) => {
                    return Err(CoreError::ReceiptMergeConflict {
                        tx_hash: hex::encode(tx_hash),
                    })
                }
            }
        }

        result.spent_by = self.spent_by.clone();
        for (key, spender) in &other.spent_by {
            result.spent_by.entry(*key).or_insert(*spender);
        }

        Ok(result)
    }
}
