//! Clarity value codec
//!
//! Consensus serialization of Clarity values as used by the node API
//! (`0x`-prefixed hex of a type-prefixed byte encoding), plus the textual
//! `repr` form the API reports for transaction results.

use std::fmt;
use thiserror::Error;

use crate::address::StacksAddress;

const TYPE_INT: u8 = 0x00;
const TYPE_UINT: u8 = 0x01;
const TYPE_BUFFER: u8 = 0x02;
const TYPE_TRUE: u8 = 0x03;
const TYPE_FALSE: u8 = 0x04;
const TYPE_PRINCIPAL_STANDARD: u8 = 0x05;
const TYPE_PRINCIPAL_CONTRACT: u8 = 0x06;
const TYPE_RESPONSE_OK: u8 = 0x07;
const TYPE_RESPONSE_ERR: u8 = 0x08;
const TYPE_OPTIONAL_NONE: u8 = 0x09;
const TYPE_OPTIONAL_SOME: u8 = 0x0a;
const TYPE_LIST: u8 = 0x0b;
const TYPE_TUPLE: u8 = 0x0c;
const TYPE_STRING_ASCII: u8 = 0x0d;
const TYPE_STRING_UTF8: u8 = 0x0e;

/// Nesting limit for decoding untrusted input
const MAX_DEPTH: usize = 32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClarityError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("unknown type prefix 0x{0:02x}")]
    UnknownType(u8),

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid string: {0}")]
    InvalidString(String),

    #[error("value nested deeper than {} levels", MAX_DEPTH)]
    TooDeep,

    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    #[error("expected {expected}, found {found}")]
    UnexpectedValue { expected: &'static str, found: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClarityValue {
    Int(i128),
    UInt(u128),
    Bool(bool),
    Buffer(Vec<u8>),
    StandardPrincipal(StacksAddress),
    ContractPrincipal(StacksAddress, String),
    ResponseOk(Box<ClarityValue>),
    ResponseErr(Box<ClarityValue>),
    OptionalNone,
    OptionalSome(Box<ClarityValue>),
    List(Vec<ClarityValue>),
    Tuple(Vec<(String, ClarityValue)>),
    StringAscii(String),
    StringUtf8(String),
}

impl ClarityValue {
    pub fn ok(value: ClarityValue) -> Self {
        Self::ResponseOk(Box::new(value))
    }

    pub fn err(value: ClarityValue) -> Self {
        Self::ResponseErr(Box::new(value))
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Self::Int(v) => {
                out.push(TYPE_INT);
                out.extend_from_slice(&v.to_be_bytes());
            }
            Self::UInt(v) => {
                out.push(TYPE_UINT);
                out.extend_from_slice(&v.to_be_bytes());
            }
            Self::Bool(true) => out.push(TYPE_TRUE),
            Self::Bool(false) => out.push(TYPE_FALSE),
            Self::Buffer(bytes) => {
                out.push(TYPE_BUFFER);
                out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
                out.extend_from_slice(bytes);
            }
            Self::StandardPrincipal(address) => {
                out.push(TYPE_PRINCIPAL_STANDARD);
                out.push(address.version);
                out.extend_from_slice(&address.hash160);
            }
            Self::ContractPrincipal(address, name) => {
                out.push(TYPE_PRINCIPAL_CONTRACT);
                out.push(address.version);
                out.extend_from_slice(&address.hash160);
                out.push(name.len() as u8);
                out.extend_from_slice(name.as_bytes());
            }
            Self::ResponseOk(inner) => {
                out.push(TYPE_RESPONSE_OK);
                inner.write_to(out);
            }
            Self::ResponseErr(inner) => {
                out.push(TYPE_RESPONSE_ERR);
                inner.write_to(out);
            }
            Self::OptionalNone => out.push(TYPE_OPTIONAL_NONE),
            Self::OptionalSome(inner) => {
                out.push(TYPE_OPTIONAL_SOME);
                inner.write_to(out);
            }
            Self::List(items) => {
                out.push(TYPE_LIST);
                out.extend_from_slice(&(items.len() as u32).to_be_bytes());
                for item in items {
                    item.write_to(out);
                }
            }
            Self::Tuple(fields) => {
                out.push(TYPE_TUPLE);
                out.extend_from_slice(&(fields.len() as u32).to_be_bytes());
                for (name, value) in fields {
                    out.push(name.len() as u8);
                    out.extend_from_slice(name.as_bytes());
                    value.write_to(out);
                }
            }
            Self::StringAscii(s) => {
                out.push(TYPE_STRING_ASCII);
                out.extend_from_slice(&(s.len() as u32).to_be_bytes());
                out.extend_from_slice(s.as_bytes());
            }
            Self::StringUtf8(s) => {
                out.push(TYPE_STRING_UTF8);
                out.extend_from_slice(&(s.len() as u32).to_be_bytes());
                out.extend_from_slice(s.as_bytes());
            }
        }
    }

    /// `0x`-prefixed hex, the form used in API request and response bodies
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.serialize()))
    }

    /// Decode exactly one value; trailing bytes are an error
    pub fn deserialize(bytes: &[u8]) -> Result<Self, ClarityError> {
        let mut reader = Reader::new(bytes);
        let value = reader.read_value(0)?;
        if reader.remaining() > 0 {
            return Err(ClarityError::TrailingBytes(reader.remaining()));
        }
        Ok(value)
    }

    pub fn from_hex(s: &str) -> Result<Self, ClarityError> {
        let trimmed = s.trim();
        let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(stripped).map_err(|e| ClarityError::InvalidHex(e.to_string()))?;
        Self::deserialize(&bytes)
    }

    pub fn as_uint(&self) -> Option<u128> {
        match self {
            Self::UInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Split a response into its ok or err payload
    pub fn into_response(self) -> Result<Result<ClarityValue, ClarityValue>, ClarityError> {
        match self {
            Self::ResponseOk(inner) => Ok(Ok(*inner)),
            Self::ResponseErr(inner) => Ok(Err(*inner)),
            other => Err(ClarityError::UnexpectedValue {
                expected: "response",
                found: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ClarityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::UInt(v) => write!(f, "u{}", v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Buffer(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            Self::StandardPrincipal(address) => write!(f, "'{}", address),
            Self::ContractPrincipal(address, name) => write!(f, "'{}.{}", address, name),
            Self::ResponseOk(inner) => write!(f, "(ok {})", inner),
            Self::ResponseErr(inner) => write!(f, "(err {})", inner),
            Self::OptionalNone => f.write_str("none"),
            Self::OptionalSome(inner) => write!(f, "(some {})", inner),
            Self::List(items) => {
                f.write_str("(list")?;
                for item in items {
                    write!(f, " {}", item)?;
                }
                f.write_str(")")
            }
            Self::Tuple(fields) => {
                f.write_str("(tuple")?;
                for (name, value) in fields {
                    write!(f, " ({} {})", name, value)?;
                }
                f.write_str(")")
            }
            Self::StringAscii(s) => write!(f, "{:?}", s),
            Self::StringUtf8(s) => write!(f, "u{:?}", s),
        }
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ClarityError> {
        if self.remaining() < n {
            return Err(ClarityError::UnexpectedEof);
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, ClarityError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, ClarityError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(buf))
    }

    fn bytes16(&mut self) -> Result<[u8; 16], ClarityError> {
        let mut buf = [0u8; 16];
        buf.copy_from_slice(self.take(16)?);
        Ok(buf)
    }

    fn address(&mut self) -> Result<StacksAddress, ClarityError> {
        let version = self.u8()?;
        let mut hash = [0u8; 20];
        hash.copy_from_slice(self.take(20)?);
        Ok(StacksAddress::new(version, hash))
    }

    fn short_string(&mut self) -> Result<String, ClarityError> {
        let len = self.u8()? as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|e| ClarityError::InvalidString(e.to_string()))
    }

    fn read_value(&mut self, depth: usize) -> Result<ClarityValue, ClarityError> {
        if depth > MAX_DEPTH {
            return Err(ClarityError::TooDeep);
        }
        let prefix = self.u8()?;
        let value = match prefix {
            TYPE_INT => ClarityValue::Int(i128::from_be_bytes(self.bytes16()?)),
            TYPE_UINT => ClarityValue::UInt(u128::from_be_bytes(self.bytes16()?)),
            TYPE_BUFFER => {
                let len = self.u32()? as usize;
                ClarityValue::Buffer(self.take(len)?.to_vec())
            }
            TYPE_TRUE => ClarityValue::Bool(true),
            TYPE_FALSE => ClarityValue::Bool(false),
            TYPE_PRINCIPAL_STANDARD => ClarityValue::StandardPrincipal(self.address()?),
            TYPE_PRINCIPAL_CONTRACT => {
                let address = self.address()?;
                let name = self.short_string()?;
                ClarityValue::ContractPrincipal(address, name)
            }
            TYPE_RESPONSE_OK => ClarityValue::ok(self.read_value(depth + 1)?),
            TYPE_RESPONSE_ERR => ClarityValue::err(self.read_value(depth + 1)?),
            TYPE_OPTIONAL_NONE => ClarityValue::OptionalNone,
            TYPE_OPTIONAL_SOME => {
                ClarityValue::OptionalSome(Box::new(self.read_value(depth + 1)?))
            }
            TYPE_LIST => {
                let len = self.u32()? as usize;
                // every element is at least one byte
                if len > self.remaining() {
                    return Err(ClarityError::UnexpectedEof);
                }
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(self.read_value(depth + 1)?);
                }
                ClarityValue::List(items)
            }
            TYPE_TUPLE => {
                let len = self.u32()? as usize;
                if len > self.remaining() {
                    return Err(ClarityError::UnexpectedEof);
                }
                let mut fields = Vec::with_capacity(len);
                for _ in 0..len {
                    let name = self.short_string()?;
                    let value = self.read_value(depth + 1)?;
                    fields.push((name, value));
                }
                ClarityValue::Tuple(fields)
            }
            TYPE_STRING_ASCII => {
                let len = self.u32()? as usize;
                let raw = self.take(len)?;
                if !raw.is_ascii() {
                    return Err(ClarityError::InvalidString("non-ascii byte".to_string()));
                }
                ClarityValue::StringAscii(String::from_utf8_lossy(raw).into_owned())
            }
            TYPE_STRING_UTF8 => {
                let len = self.u32()? as usize;
                let raw = self.take(len)?;
                let s = String::from_utf8(raw.to_vec())
                    .map_err(|e| ClarityError::InvalidString(e.to_string()))?;
                ClarityValue::StringUtf8(s)
            }
            other => return Err(ClarityError::UnknownType(other)),
        };
        Ok(value)
    }
}
