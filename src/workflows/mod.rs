//! Mutating workflows. Every function here takes an explicit connection and
//! runs as one transaction: commit-or-rollback as a unit, never an order
//! without its delivery record.

pub mod delivery;
pub mod orders;
