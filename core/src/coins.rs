use concilium_crypto::Address;
use serde::{Deserialize, Serialize};

/// A value object: an amount and the address entitled to spend it. Immutable
/// once created. Every mutation of the ledger replaces a `Coins`, never
/// edits one in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coins {
    pub amount: u64,
    pub receiver: Address,
}

impl Coins {
    pub fn new(amount: u64, receiver: Address) -> Self {
        Self { amount, receiver }
    }
}
