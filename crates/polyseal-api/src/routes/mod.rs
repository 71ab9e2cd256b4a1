//! # API Route Modules
//!
//! - `policy`: preparing a circuit-ready config for a proposed transaction,
//!   validating documents, storing a user's documents, and the rule catalog.
//! - `proof`: generating and verifying proofs against the loaded circuit.

pub mod policy;
pub mod proof;
