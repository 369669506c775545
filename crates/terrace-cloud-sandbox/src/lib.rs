//! Sandbox provider for Terrace
//!
//! A simulated cloud that stores every resource as a JSON file under a root
//! directory. It accepts any kind, which makes it useful for trying out
//! declarations and for end-to-end tests of the engine.
//!
//! # Features
//!
//! - Create / read / update / delete of arbitrary kinds
//! - Scripted transient and permanent faults (`<root>/faults.json`)
//! - Optional per-call latency
//!
//! # Example
//!
//! ```ignore
//! use terrace_cloud::ProviderRegistry;
//! use terrace_cloud_sandbox::SandboxProvider;
//!
//! let provider = Arc::new(SandboxProvider::new(".terrace/sandbox"));
//! let registry = ProviderRegistry::new().with_fallback(provider);
//! ```

pub mod client;
pub mod error;
pub mod provider;

pub use client::{Fault, FaultPlan, SandboxClient, SandboxObject};
pub use error::{Result, SandboxError};
pub use provider::SandboxProvider;
