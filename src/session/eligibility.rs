//! Eligibility - allowlist membership, directly or through a delegation

use crate::core::Address;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Addresses allowed to perform the gated action.
pub type Allowlist = BTreeSet<Address>;

/// Delegate address → the identity it acts for.
pub type Delegations = BTreeMap<Address, Address>;

/// The allowlisted identity `address` acts as: itself when allowlisted,
/// otherwise the identity that delegated to it if that one is allowlisted.
pub fn eligible(allowlist: &Allowlist, delegations: &Delegations, address: Option<&Address>) -> Option<Address> {
    let address = address?;
    if allowlist.contains(address) {
        return Some(*address);
    }
    delegations.get(address).filter(|from| allowlist.contains(*from)).copied()
}

pub fn is_eligible(allowlist: &Allowlist, delegations: &Delegations, address: Option<&Address>) -> bool {
    eligible(allowlist, delegations, address).is_some()
}

/// What the avatar/menu layer reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityView {
    pub address: Option<Address>,
    pub eligible: bool,
    /// A local identity is in use
    pub local: bool,
    /// Show the "eligible" marker (only when no local identity is in use)
    pub badge: bool,
}

impl IdentityView {
    pub fn new(address: Option<Address>, local: bool, allowlist: &Allowlist, delegations: &Delegations) -> Self {
        let eligible = is_eligible(allowlist, delegations, address.as_ref());
        Self { address, eligible, local, badge: eligible && !local }
    }
}
