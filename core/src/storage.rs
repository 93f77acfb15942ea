use std::collections::HashMap;

use crate::utxo::Utxo;

/// Models the Storage facade's batch-read surface. The core never reads
/// from Storage directly during processing. Callers build a read-only
/// snapshot through this trait and pass it to
/// [`crate::application::Application::process_tx_inputs`].
pub trait UtxoSnapshotProvider {
    fn get_utxos_snapshot(&self, tx_hashes: &[[u8; 32]]) -> HashMap<[u8; 32], Utxo>;
}

/// A trivial in-memory Storage stand-in, for tests and for callers that
/// don't yet have a real storage engine wired up.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    utxos: HashMap<[u8; 32], Utxo>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, utxo: Utxo) {
        self.utxos.insert(utxo.tx_hash, utxo);
    }
}

impl UtxoSnapshotProvider for InMemoryStorage {
    fn get_utxos_snapshot(&self, tx_hashes: &[[u8; 32]]) -> HashMap<[u8; 32], Utxo> {
        tx_hashes
            .iter()
            .filter_map(|h| self.utxos.get(h).map(|u| (*h, u.clone())))
            .collect()
    }
}
