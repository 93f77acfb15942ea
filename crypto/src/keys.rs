use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::Generate;
use k256::sha2::{Digest, Sha256};

use crate::address::{Address, AddressRepr, ADDRESS_LEN};
use crate::error::CryptoError;

/// Length in bytes of a recoverable signature: 64-byte (r, s) pair plus a
/// one-byte recovery id.
pub const SIGNATURE_LEN: usize = 65;

#[derive(Clone)]
pub struct PrivateKey(SigningKey);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

pub struct KeyPair {
    pub private_key: PrivateKey,
    pub public_key: PublicKey,
}

impl PrivateKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_slice(bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(PrivateKey(signing_key))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(*self.0.verifying_key())
    }
}

impl PublicKey {
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let verifying_key =
            VerifyingKey::from_sec1_bytes(bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(PublicKey(verifying_key))
    }

    pub fn to_sec1_bytes(&self) -> Vec<u8> {
        self.0.to_sec1_point(true).as_bytes().to_vec()
    }
}

fn digest(message: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(message);
    hasher.finalize().into()
}

/// Sign `message` with `private_key`, returning a 65-byte recoverable
/// signature (64-byte r||s followed by a one-byte recovery id).
pub fn sign(message: &[u8], private_key: &PrivateKey) -> Result<Vec<u8>, CryptoError> {
    let prehash = digest(message);
    let (signature, recovery_id): (Signature, RecoveryId) =
        private_key.0.sign_prehash_recoverable(&prehash);

    let mut bytes = Vec::with_capacity(SIGNATURE_LEN);
    bytes.extend_from_slice(&signature.to_bytes());
    bytes.push(recovery_id.to_byte());
    Ok(bytes)
}

fn split_signature(signature: &[u8]) -> Result<(Signature, RecoveryId), CryptoError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(CryptoError::InvalidSignature);
    }
    let sig = Signature::from_slice(&signature[..64]).map_err(|_| CryptoError::InvalidSignature)?;
    let recovery_id =
        RecoveryId::from_byte(signature[64]).ok_or(CryptoError::InvalidSignature)?;
    Ok((sig, recovery_id))
}

/// Recover the public key that produced `signature` over `message`.
pub fn recover_public_key(message: &[u8], signature: &[u8]) -> Result<PublicKey, CryptoError> {
    let prehash = digest(message);
    let (sig, recovery_id) = split_signature(signature)?;
    let verifying_key = VerifyingKey::recover_from_prehash(&prehash, &sig, recovery_id)
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))?;
    Ok(PublicKey(verifying_key))
}

/// Verify that `signature` over `message` was produced by `public_key`,
/// ignoring the embedded recovery id.
pub fn verify(message: &[u8], signature: &[u8], public_key: &PublicKey) -> bool {
    let prehash = digest(message);
    let (sig, _recovery_id) = match split_signature(signature) {
        Ok(parts) => parts,
        Err(_) => return false,
    };
    public_key.0.verify_prehash(&prehash, &sig).is_ok()
}

/// Derive a 20-byte address from a public key: SHA3-256 of the compressed
/// SEC1 encoding, truncated to the low 20 bytes.
pub fn address_from_public_key(public_key: &PublicKey) -> Address {
    use sha3::{Digest as Sha3Digest, Sha3_256};
    let encoded = public_key.to_sec1_bytes();
    let hashed = Sha3_256::digest(&encoded);
    let mut bytes = [0u8; ADDRESS_LEN];
    bytes.copy_from_slice(&hashed[hashed.len() - ADDRESS_LEN..]);
    Address(bytes)
}

/// Derive a 20-byte address from an arbitrary 32-byte hash (a deploying
/// transaction's content-addressed hash, for contract addresses) using the
/// same truncation rule as [`address_from_public_key`], so every address in
/// this ledger is produced by one policy regardless of what it is derived
/// from.
pub fn address_from_hash(hash: &[u8; 32]) -> Address {
    use sha3::{Digest as Sha3Digest, Sha3_256};
    let hashed = Sha3_256::digest(hash);
    let mut bytes = [0u8; ADDRESS_LEN];
    bytes.copy_from_slice(&hashed[hashed.len() - ADDRESS_LEN..]);
    Address(bytes)
}

/// `get_address(public_key, as_bytes)` from the external crypto facade:
/// returns either the raw address or its prefixed hex form.
pub fn get_address(public_key: &PublicKey, as_bytes: bool) -> AddressRepr {
    let address = address_from_public_key(public_key);
    if as_bytes {
        AddressRepr::Bytes(address)
    } else {
        AddressRepr::Hex(address.to_hex())
    }
}

pub fn key_pair_from_private(bytes: &[u8]) -> Result<KeyPair, CryptoError> {
    let private_key = PrivateKey::from_bytes(bytes)?;
    let public_key = private_key.public_key();
    Ok(KeyPair {
        private_key,
        public_key,
    })
}

pub fn create_key_pair() -> KeyPair {
    let signing_key = SigningKey::generate();
    let private_key = PrivateKey(signing_key);
    let public_key = private_key.public_key();
    KeyPair {
        private_key,
        public_key,
    }
}
