//! Wallet session
//!
//! On devnet, connecting means picking one of the simulated accounts; writes
//! are signed locally with that account's key. Elsewhere an external wallet
//! behind [`WalletExtension`] runs the handshake and signs.

pub mod extension;
pub mod session;

pub use extension::{StxAddressEntry, WalletExtension};
pub use session::{SessionSnapshot, Signer, WalletMode, WalletSession};
