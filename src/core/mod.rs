//! Shared primitives: addresses, chains, name constants

pub mod address;
pub mod chain;
pub mod names;

pub use address::{Address, AddressError};
pub use chain::{default_chains, Chain, ChainId, ChainStatus};
