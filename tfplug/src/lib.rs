//! tfplug - Terraform Plugin Framework for Rust
//!
//! A small framework for building Terraform providers in Rust on top of
//! Terraform Plugin Protocol v6.

// Core modules
pub mod error;
pub mod schema;
pub mod types;

// Provider API modules
pub mod plan_modifier;
pub mod provider;
pub mod request;

// Framework implementation modules
pub mod grpc;
pub mod proto;
pub mod server;

// Re-exports for convenience
pub use error::{Result, TfplugError};
pub use plan_modifier::{PlanModifier, RequiresReplaceIfChanged, UseStateForUnknown};
pub use provider::{ProviderV2, ResourceV2};
pub use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use server::{serve, ServerConfig};
pub use types::{AttributePath, Config, Diagnostics, Dynamic, State};
