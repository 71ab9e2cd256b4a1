//! # polyseal-policy: Policy Compilation
//!
//! Turns user-authored policy documents into one deterministic,
//! circuit-ready [`PolicyConfig`]:
//!
//! ```text
//! PolicyDocument ──► DocumentValidator ──► PolicyCompiler ──► CompiledPolicy
//!                                                                  │
//!        PolicyStore ─┐                                            ▼
//!       SignalSource ─┴────────────────────────────────────►  PolicyEngine ──► PolicyConfig
//! ```
//!
//! - [`DocumentValidator`]: envelope and per-rule JSON Schema validation;
//!   every issue in one [`SchemaError`].
//! - [`PolicyCompiler`]: fixed priority order, last occurrence of a kind wins.
//! - [`RuleRegistry`]: static dispatch over [`RuleKind`] to the four rules.
//! - [`PolicyEngine`]: loads documents, gathers signals concurrently, runs
//!   rules in order, short-circuits on the first denial.
//!
//! ## Crate Policy
//!
//! - Denials ([`EngineError::Denied`]) and infrastructure failures
//!   ([`EngineError::Infrastructure`]) never share a variant.
//! - No global state. Registry, validator and engine are constructed
//!   explicitly and shared through `Arc`.

pub mod compiler;
pub mod config;
pub mod context;
pub mod document;
pub mod engine;
pub mod error;
pub mod registry;
pub mod rules;
pub mod signal;
pub mod store;
pub mod validate;

pub use compiler::{CompiledPolicy, PolicyCompiler, ValidatedDocument};
pub use config::{
    ConfigFragment, NamespaceCollision, PolicyConfig, RecipientWhitelistFragment,
    SpendLimitFragment, TimeWindowFragment, VelocityFragment,
};
pub use context::PolicyContext;
pub use document::{PolicyDocument, RuleConfig};
pub use engine::{gather_signals, PolicyEngine, PrepareOptions};
pub use error::{
    EngineError, RegistryError, RuleError, SchemaError, SchemaIssue, SignalError, StoreError,
};
pub use registry::{RuleDescriptor, RuleRegistry};
pub use rules::{FieldIssue, Rule, RuleParams};
pub use signal::{SignalData, SignalSnapshot, SignalSource, StaticSignalSource};
pub use store::{InMemoryPolicyStore, PolicyStore};
pub use validate::DocumentValidator;

pub use polyseal_core::RuleKind;
