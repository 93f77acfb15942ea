//! Recoverable-ECDSA crypto facade: sign, recover, derive addresses.
//!
//! Treated as an external, trusted collaborator by the rest of this
//! workspace. The ledger core never constructs keys or signatures itself,
//! only calls through this facade.

pub mod address;
pub mod error;
pub mod keys;

pub use address::{Address, AddressRepr, ADDRESS_LEN, ADDRESS_PREFIX};
pub use error::CryptoError;
pub use keys::{
    address_from_hash, address_from_public_key, create_key_pair, get_address,
    key_pair_from_private, recover_public_key, sign, verify, KeyPair, PrivateKey, PublicKey,
    SIGNATURE_LEN,
};
