//! Contract-call transactions
//!
//! Builds, signs and (de)serializes single-signature Stacks transactions
//! carrying a contract-call payload. This is the devnet signing path: the
//! simulated account's key signs locally and the raw bytes are broadcast to
//! the node.
//!
//! Signing follows the standard single-sig scheme:
//! 1. `initial = txid(tx with nonce, fee and signature cleared)`
//! 2. `presign = sha512/256(initial || auth_type || fee || nonce)`
//! 3. sign `presign` with a recoverable secp256k1 signature, stored as
//!    `recovery_id || r || s`

use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha512_256};
use thiserror::Error;

use crate::address::{hash160_of, StacksAddress};
use crate::clarity::{ClarityError, ClarityValue};
use crate::network::NetworkType;

const AUTH_STANDARD: u8 = 0x04;
const HASH_MODE_P2PKH: u8 = 0x00;
const KEY_ENCODING_COMPRESSED: u8 = 0x00;
const ANCHOR_MODE_ANY: u8 = 0x03;
const PAYLOAD_CONTRACT_CALL: u8 = 0x02;

const MAX_NAME_LEN: usize = 128;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("unexpected end of transaction bytes")]
    UnexpectedEof,

    #[error("unsupported {field}: 0x{value:02x}")]
    Unsupported { field: &'static str, value: u8 },

    #[error("post conditions are not supported (found {0})")]
    PostConditions(u32),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] ClarityError),

    #[error("{0} trailing bytes after transaction")]
    TrailingBytes(usize),

    #[error("signature error: {0}")]
    Signature(String),

    #[error("signer mismatch: transaction claims {claimed}, signature recovers {recovered}")]
    SignerMismatch { claimed: String, recovered: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostConditionMode {
    Allow = 0x01,
    Deny = 0x02,
}

impl PostConditionMode {
    fn from_byte(b: u8) -> Result<Self, TransactionError> {
        match b {
            0x01 => Ok(Self::Allow),
            0x02 => Ok(Self::Deny),
            other => Err(TransactionError::Unsupported {
                field: "post condition mode",
                value: other,
            }),
        }
    }
}

/// What a write wants to call, independent of who signs it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCallRequest {
    pub contract_address: String,
    pub contract_name: String,
    pub function_name: String,
    pub function_args: Vec<ClarityValue>,
    pub post_condition_mode: PostConditionMode,
    pub network: NetworkType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub contract_address: StacksAddress,
    pub contract_name: String,
    pub function_name: String,
    pub function_args: Vec<ClarityValue>,
}

/// Single-sig P2PKH spending condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendingCondition {
    pub signer: [u8; 20],
    pub nonce: u64,
    pub fee: u64,
    pub signature: [u8; 65],
}

impl SpendingCondition {
    fn cleared(&self) -> Self {
        Self {
            signer: self.signer,
            nonce: 0,
            fee: 0,
            signature: [0u8; 65],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StacksTransaction {
    pub version: u8,
    pub chain_id: u32,
    pub auth: SpendingCondition,
    pub post_condition_mode: PostConditionMode,
    pub payload: ContractCall,
}

impl StacksTransaction {
    /// Unsigned contract call from `request`, spent by the holder of `public_key`
    pub fn contract_call(
        request: &ContractCallRequest,
        public_key: &PublicKey,
        nonce: u64,
        fee: u64,
    ) -> Result<Self, crate::error::CounterError> {
        validate_name(&request.contract_name)?;
        validate_name(&request.function_name)?;
        let contract_address: StacksAddress = request.contract_address.parse()?;

        Ok(Self {
            version: request.network.transaction_version(),
            chain_id: request.network.chain_id(),
            auth: SpendingCondition {
                signer: hash160_of(&public_key.serialize()),
                nonce,
                fee,
                signature: [0u8; 65],
            },
            post_condition_mode: request.post_condition_mode,
            payload: ContractCall {
                contract_address,
                contract_name: request.contract_name.clone(),
                function_name: request.function_name.clone(),
                function_args: request.function_args.clone(),
            },
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(180);
        out.push(self.version);
        out.extend_from_slice(&self.chain_id.to_be_bytes());

        out.push(AUTH_STANDARD);
        out.push(HASH_MODE_P2PKH);
        out.extend_from_slice(&self.auth.signer);
        out.extend_from_slice(&self.auth.nonce.to_be_bytes());
        out.extend_from_slice(&self.auth.fee.to_be_bytes());
        out.push(KEY_ENCODING_COMPRESSED);
        out.extend_from_slice(&self.auth.signature);

        out.push(ANCHOR_MODE_ANY);
        out.push(self.post_condition_mode as u8);
        out.extend_from_slice(&0u32.to_be_bytes());

        out.push(PAYLOAD_CONTRACT_CALL);
        out.push(self.payload.contract_address.version);
        out.extend_from_slice(&self.payload.contract_address.hash160);
        out.push(self.payload.contract_name.len() as u8);
        out.extend_from_slice(self.payload.contract_name.as_bytes());
        out.push(self.payload.function_name.len() as u8);
        out.extend_from_slice(self.payload.function_name.as_bytes());
        out.extend_from_slice(&(self.payload.function_args.len() as u32).to_be_bytes());
        for arg in &self.payload.function_args {
            out.extend_from_slice(&arg.serialize());
        }
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut r = TxReader { bytes, pos: 0 };

        let version = r.u8()?;
        let chain_id = r.u32()?;

        let auth_type = r.u8()?;
        if auth_type != AUTH_STANDARD {
            return Err(TransactionError::Unsupported {
                field: "auth type",
                value: auth_type,
            });
        }
        let hash_mode = r.u8()?;
        if hash_mode != HASH_MODE_P2PKH {
            return Err(TransactionError::Unsupported {
                field: "hash mode",
                value: hash_mode,
            });
        }
        let signer = r.array::<20>()?;
        let nonce = r.u64()?;
        let fee = r.u64()?;
        let key_encoding = r.u8()?;
        if key_encoding != KEY_ENCODING_COMPRESSED {
            return Err(TransactionError::Unsupported {
                field: "key encoding",
                value: key_encoding,
            });
        }
        let signature = r.array::<65>()?;

        let anchor_mode = r.u8()?;
        if anchor_mode != ANCHOR_MODE_ANY && anchor_mode != 0x01 && anchor_mode != 0x02 {
            return Err(TransactionError::Unsupported {
                field: "anchor mode",
                value: anchor_mode,
            });
        }
        let post_condition_mode = PostConditionMode::from_byte(r.u8()?)?;
        let post_condition_count = r.u32()?;
        if post_condition_count != 0 {
            return Err(TransactionError::PostConditions(post_condition_count));
        }

        let payload_type = r.u8()?;
        if payload_type != PAYLOAD_CONTRACT_CALL {
            return Err(TransactionError::Unsupported {
                field: "payload type",
                value: payload_type,
            });
        }
        let address_version = r.u8()?;
        let address_hash = r.array::<20>()?;
        let contract_name = r.name()?;
        let function_name = r.name()?;
        let arg_count = r.u32()? as usize;
        let mut function_args = Vec::new();
        for _ in 0..arg_count {
            function_args.push(r.clarity_value()?);
        }
        if r.remaining() > 0 {
            return Err(TransactionError::TrailingBytes(r.remaining()));
        }

        Ok(Self {
            version,
            chain_id,
            auth: SpendingCondition {
                signer,
                nonce,
                fee,
                signature,
            },
            post_condition_mode,
            payload: ContractCall {
                contract_address: StacksAddress::new(address_version, address_hash),
                contract_name,
                function_name,
                function_args,
            },
        })
    }

    /// Transaction id: SHA-512/256 of the serialized transaction
    pub fn txid(&self) -> [u8; 32] {
        sha512_256(&self.serialize())
    }

    /// `0x`-prefixed txid as reported by the API
    pub fn txid_hex(&self) -> String {
        format!("0x{}", hex::encode(self.txid()))
    }

    fn presign_sighash(&self) -> [u8; 32] {
        let mut cleared = self.clone();
        cleared.auth = self.auth.cleared();
        let initial = cleared.txid();

        let mut buf = Vec::with_capacity(32 + 1 + 8 + 8);
        buf.extend_from_slice(&initial);
        buf.push(AUTH_STANDARD);
        buf.extend_from_slice(&self.auth.fee.to_be_bytes());
        buf.extend_from_slice(&self.auth.nonce.to_be_bytes());
        sha512_256(&buf)
    }

    pub fn sign(&mut self, secret_key: &SecretKey) -> Result<(), TransactionError> {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, secret_key);
        if hash160_of(&public_key.serialize()) != self.auth.signer {
            return Err(TransactionError::Signature(
                "key does not match the transaction signer".to_string(),
            ));
        }

        let message = Message::from_digest(self.presign_sighash());
        let (recovery_id, compact) = secp
            .sign_ecdsa_recoverable(&message, secret_key)
            .serialize_compact();

        let mut signature = [0u8; 65];
        signature[0] = recovery_id.to_i32() as u8;
        signature[1..].copy_from_slice(&compact);
        self.auth.signature = signature;
        Ok(())
    }

    /// Recover the signing key and check it hashes to the claimed signer
    pub fn verify_origin(&self) -> Result<PublicKey, TransactionError> {
        let recovery_id = RecoveryId::from_i32(self.auth.signature[0] as i32)
            .map_err(|e| TransactionError::Signature(e.to_string()))?;
        let signature = RecoverableSignature::from_compact(&self.auth.signature[1..], recovery_id)
            .map_err(|e| TransactionError::Signature(e.to_string()))?;
        let message = Message::from_digest(self.presign_sighash());
        let public_key = Secp256k1::new()
            .recover_ecdsa(&message, &signature)
            .map_err(|e| TransactionError::Signature(e.to_string()))?;

        let recovered = hash160_of(&public_key.serialize());
        if recovered != self.auth.signer {
            return Err(TransactionError::SignerMismatch {
                claimed: hex::encode(self.auth.signer),
                recovered: hex::encode(recovered),
            });
        }
        Ok(public_key)
    }

    /// Origin address under the given address version
    pub fn origin_address(&self, address_version: u8) -> StacksAddress {
        StacksAddress::new(address_version, self.auth.signer)
    }
}

fn sha512_256(data: &[u8]) -> [u8; 32] {
    let digest = Sha512_256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

fn validate_name(name: &str) -> Result<(), TransactionError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .chars()
            .next()
            .map(|c| c.is_ascii_alphabetic())
            .unwrap_or(false)
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '!' | '?'));
    if valid {
        Ok(())
    } else {
        Err(TransactionError::InvalidName(name.to_string()))
    }
}

struct TxReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> TxReader<'a> {
    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], TransactionError> {
        if self.remaining() < n {
            return Err(TransactionError::UnexpectedEof);
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, TransactionError> {
        Ok(self.take(1)?[0])
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], TransactionError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32, TransactionError> {
        Ok(u32::from_be_bytes(self.array::<4>()?))
    }

    fn u64(&mut self) -> Result<u64, TransactionError> {
        Ok(u64::from_be_bytes(self.array::<8>()?))
    }

    fn name(&mut self) -> Result<String, TransactionError> {
        let len = self.u8()? as usize;
        let raw = self.take(len)?;
        let name = String::from_utf8(raw.to_vec())
            .map_err(|e| TransactionError::InvalidName(e.to_string()))?;
        validate_name(&name)?;
        Ok(name)
    }

    /// Arguments carry no outer length: measure the value, then decode that slice
    fn clarity_value(&mut self) -> Result<ClarityValue, TransactionError> {
        let len = clarity_value_len(&self.bytes[self.pos..], 0)?;
        let raw = self.take(len)?;
        Ok(ClarityValue::deserialize(raw)?)
    }
}

/// Byte length of the Clarity value at the start of `bytes`
fn clarity_value_len(bytes: &[u8], depth: usize) -> Result<usize, TransactionError> {
    if depth > 32 {
        return Err(TransactionError::InvalidArgument(ClarityError::TooDeep));
    }
    let eof = || TransactionError::InvalidArgument(ClarityError::UnexpectedEof);
    let prefix = *bytes.first().ok_or_else(eof)?;
    let read_u32 = |at: usize| -> Result<usize, TransactionError> {
        let raw = bytes.get(at..at + 4).ok_or_else(eof)?;
        Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize)
    };
    let len = match prefix {
        0x00 | 0x01 => 17,
        0x03 | 0x04 | 0x09 => 1,
        0x02 | 0x0d | 0x0e => 5 + read_u32(1)?,
        0x05 => 22,
        0x06 => {
            let name_len = *bytes.get(22).ok_or_else(eof)? as usize;
            23 + name_len
        }
        0x07 | 0x08 | 0x0a => 1 + clarity_value_len(&bytes[1..], depth + 1)?,
        0x0b => {
            let count = read_u32(1)?;
            let mut offset = 5;
            for _ in 0..count {
                let rest = bytes.get(offset..).ok_or_else(eof)?;
                offset += clarity_value_len(rest, depth + 1)?;
            }
            offset
        }
        0x0c => {
            let count = read_u32(1)?;
            let mut offset = 5;
            for _ in 0..count {
                let name_len = *bytes.get(offset).ok_or_else(eof)? as usize;
                offset += 1 + name_len;
                let rest = bytes.get(offset..).ok_or_else(eof)?;
                offset += clarity_value_len(rest, depth + 1)?;
            }
            offset
        }
        other => return Err(TransactionError::InvalidArgument(ClarityError::UnknownType(other))),
    };
    if len > bytes.len() {
        return Err(eof());
    }
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devnet;

    fn request(function_name: &str) -> ContractCallRequest {
        ContractCallRequest {
            contract_address: devnet::deployer().unwrap().stx_address,
            contract_name: "counter".to_string(),
            function_name: function_name.to_string(),
            function_args: vec![],
            post_condition_mode: PostConditionMode::Allow,
            network: NetworkType::Devnet,
        }
    }

    fn signed(function_name: &str, nonce: u64) -> StacksTransaction {
        let account = devnet::find_account("wallet_1").unwrap();
        let public_key = PublicKey::from_secret_key(&Secp256k1::new(), account.secret_key());
        let mut tx =
            StacksTransaction::contract_call(&request(function_name), &public_key, nonce, 3000)
                .unwrap();
        tx.sign(account.secret_key()).unwrap();
        tx
    }

    #[test]
    fn test_unsigned_increment_matches_known_bytes() {
        let account = devnet::find_account("wallet_1").unwrap();
        let public_key = PublicKey::from_secret_key(&Secp256k1::new(), account.secret_key());
        let tx = StacksTransaction::contract_call(&request("increment"), &public_key, 5, 3000)
            .unwrap();

        let expected = concat!(
            "80",                                       // testnet version
            "80000000",                                 // chain id
            "0400",                                     // standard auth, p2pkh
            "7321b74e2b6a7e949e6c4ad313035b1665095017", // wallet_1 hash160
            "0000000000000005",                         // nonce
            "0000000000000bb8",                         // fee
            "00",                                       // compressed key
            "0000000000000000000000000000000000000000000000000000000000000000",
            "0000000000000000000000000000000000000000000000000000000000000000",
            "00",
            "03",       // anchor mode any
            "01",       // allow
            "00000000", // no post conditions
            "02",       // contract call
            "1a6d78de7b0625dfbfc16c3a8a5735f6dc3dc3f2ce",
            "07636f756e746572",
            "09696e6372656d656e74",
            "00000000",
        );
        assert_eq!(hex::encode(tx.serialize()), expected);
        assert_eq!(
            hex::encode(tx.txid()),
            "49321163509cfa53ac893392945654dc7e5e80987d661279eedb4ee27757d9ea"
        );
    }

    #[test]
    fn test_signed_transaction_decodes_and_verifies() {
        let tx = signed("increment", 7);
        let decoded = StacksTransaction::deserialize(&tx.serialize()).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.payload.function_name, "increment");
        assert_eq!(decoded.auth.nonce, 7);
        assert!(decoded.verify_origin().is_ok());
        assert_eq!(decoded.txid(), tx.txid());
    }

    #[test]
    fn test_origin_address_matches_account() {
        let tx = signed("increment", 0);
        let account = devnet::find_account("wallet_1").unwrap();
        assert_eq!(tx.origin_address(26).to_string(), account.stx_address);
    }

    #[test]
    fn test_tampered_nonce_breaks_signature() {
        let mut tx = signed("decrement", 1);
        tx.auth.nonce = 2;
        assert!(tx.verify_origin().is_err());
    }

    #[test]
    fn test_signing_with_wrong_key_is_rejected() {
        let mut tx = signed("increment", 0);
        let other = devnet::find_account("wallet_2").unwrap();
        assert!(matches!(
            tx.sign(other.secret_key()),
            Err(TransactionError::Signature(_))
        ));
    }

    #[test]
    fn test_txid_changes_with_function() {
        assert_ne!(signed("increment", 0).txid(), signed("decrement", 0).txid());
        assert!(signed("increment", 0).txid_hex().starts_with("0x"));
    }

    #[test]
    fn test_rejects_invalid_function_name() {
        let account = devnet::deployer().unwrap();
        let public_key = PublicKey::from_secret_key(&Secp256k1::new(), account.secret_key());
        let result = StacksTransaction::contract_call(&request("1nvalid"), &public_key, 0, 0);
        assert!(result.is_err());
    }

    #[test]
    fn test_arguments_survive_encoding() {
        let account = devnet::deployer().unwrap();
        let public_key = PublicKey::from_secret_key(&Secp256k1::new(), account.secret_key());
        let mut req = request("set-values");
        req.function_args = vec![
            ClarityValue::UInt(9),
            ClarityValue::List(vec![ClarityValue::Bool(true), ClarityValue::OptionalNone]),
            ClarityValue::StringAscii("hi".to_string()),
        ];
        let tx = StacksTransaction::contract_call(&req, &public_key, 0, 0).unwrap();
        let decoded = StacksTransaction::deserialize(&tx.serialize()).unwrap();
        assert_eq!(decoded.payload.function_args, req.function_args);
    }

    #[test]
    fn test_truncated_bytes_are_rejected() {
        let bytes = signed("increment", 0).serialize();
        assert_eq!(
            StacksTransaction::deserialize(&bytes[..bytes.len() - 3]),
            Err(TransactionError::UnexpectedEof)
        );
    }
}
