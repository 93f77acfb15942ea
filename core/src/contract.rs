use std::time::Duration;

use concilium_crypto::Address;
use concilium_sandbox::Value;
use serde::{Deserialize, Serialize};

/// Floor fee charged for any transaction that enters the sandbox, whether
/// the execution succeeds or fails.
pub const MIN_CONTRACT_FEE: u64 = 1_000;

/// Hard wall-clock budget for one sandbox execution (deployment or
/// invocation).
pub const TIMEOUT_CODE: Duration = Duration::from_millis(500);

/// Joins a contract's exported method sources into the single `code` string
/// persisted on a [`Contract`].
pub const CONTRACT_METHOD_SEPARATOR: &str = "\u{1e}";

pub const TX_STATUS_OK: &str = "OK";
pub const TX_STATUS_FAILED: &str = "FAILED";

/// A deployed contract, persisted across blocks through Storage. A `Patch`
/// accumulates updates to it until commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    /// Derived from the deploying transaction's hash; stable for the life
    /// of the contract.
    pub address: Address,
    /// Deep, opaque snapshot of the instance's own data properties.
    pub data: Value,
    /// Source text of every exported method, joined by
    /// [`CONTRACT_METHOD_SEPARATOR`].
    pub code: String,
    /// The witness group that deployed (and may invoke) this contract.
    pub group_id: u64,
}

impl Contract {
    pub fn new(address: Address, data: Value, code: String, group_id: u64) -> Self {
        Self {
            address,
            data,
            code,
            group_id,
        }
    }

}

/// An ASCII-identifier check: `[A-Za-z_][A-Za-z0-9_]*`. Method names
/// recovered from a contract must pass this before their source is spliced
/// back into a synthesized class body at invocation time.
pub fn is_valid_method_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_name_validation() {
        assert!(is_valid_method_name("getData"));
        assert!(is_valid_method_name("_default"));
        assert!(is_valid_method_name("add_10"));
        assert!(!is_valid_method_name(""));
        assert!(!is_valid_method_name("10add"));
        assert!(!is_valid_method_name("get data"));
        assert!(!is_valid_method_name("get();this.x=1;//"));
    }
}
