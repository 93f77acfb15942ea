use std::fmt;

/// Prefixed onto the hex form of an [`Address`]; mirrors how this ledger's
/// other string-rendered identifiers (tx hashes, contract addresses) are
/// distinguished at a glance in logs and RPC payloads.
pub const ADDRESS_PREFIX: &str = "cnc";

pub const ADDRESS_LEN: usize = 20;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("{}{}", ADDRESS_PREFIX, hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// The representation requested from [`crate::get_address`]: either the raw
/// 20 bytes or its prefixed hex encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressRepr {
    Bytes(Address),
    Hex(String),
}

impl AddressRepr {
    pub fn into_address(self) -> Option<Address> {
        match self {
            AddressRepr::Bytes(addr) => Some(addr),
            AddressRepr::Hex(_) => None,
        }
    }
}
