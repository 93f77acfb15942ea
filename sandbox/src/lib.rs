//! Deterministic, resource-capped execution host for contract code.
//!
//! Embeds a pure-Rust ECMAScript engine ([`boa_engine`]) rather than a
//! hand-rolled interpreter, because the contract examples this workspace
//! targets are literal JavaScript-class syntax with inheritance and
//! reflection. Contract code never touches the host directly: no file
//! system, no network, no ambient clock beyond what the caller's
//! environment record explicitly injects.

pub mod config;
pub mod engine;
pub mod error;

pub use config::SandboxConfig;
pub use engine::{DeployOutcome, InvokeOutcome, MethodSource, Sandbox, Value};
pub use error::SandboxError;
