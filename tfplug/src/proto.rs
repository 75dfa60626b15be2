//! Protocol buffer types for Terraform Plugin Protocol v6
//!
//! Generated at build time by tonic_build from `proto/tfplugin6.proto`.
//! Request/response pairs live in snake_case modules
//! (`read_resource::Request`, `plan_resource_change::Response`). Several
//! names clash with framework types, so always refer to these through the
//! `proto::` prefix.

include!(concat!(env!("OUT_DIR"), "/tfplugin6.rs"));

pub use provider_server::{Provider as ProtoProvider, ProviderServer};
