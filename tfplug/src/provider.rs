//! Provider and resource traits
//!
//! The gRPC service owns one `ProviderV2`. Every resource RPC asks the
//! provider for a fresh `ResourceV2` through `create_resource`, so resources
//! only hold what the provider hands them (usually a cloned API client).

use crate::request::{
    ConfigureRequest, ConfigureResponse, CreateRequest, CreateResponse, DeleteRequest,
    DeleteResponse, ImportRequest, ImportResponse, ReadRequest, ReadResponse, UpdateRequest,
    UpdateResponse,
};
use crate::schema::Schema;
use crate::types::State;
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait ProviderV2: Send + Sync {
    /// Provider type name, the prefix of every resource type name
    fn type_name(&self) -> &str;

    /// Schema of the `provider` block
    fn schema(&self) -> Schema;

    async fn configure(&mut self, request: ConfigureRequest) -> ConfigureResponse;

    /// Factory for resource instances; fails for unknown type names or when
    /// the provider has not been configured
    async fn create_resource(&self, name: &str) -> Result<Box<dyn ResourceV2>>;

    async fn resource_schemas(&self) -> HashMap<String, Schema>;
}

#[async_trait]
pub trait ResourceV2: Send + Sync {
    fn type_name(&self) -> &str;

    fn schema(&self) -> Schema;

    /// Response state MUST carry every attribute, including computed ones
    async fn create(&self, request: CreateRequest) -> CreateResponse;

    async fn read(&self, request: ReadRequest) -> ReadResponse;

    async fn update(&self, request: UpdateRequest) -> UpdateResponse;

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse;

    /// Imports by id: seeds a state holding only `id` and reads it back
    async fn import_state(&self, request: ImportRequest) -> ImportResponse {
        let mut current_state = State::new();
        current_state.insert("id", request.id);

        let response = self.read(ReadRequest { current_state }).await;
        ImportResponse {
            state: response.state,
            diagnostics: response.diagnostics,
        }
    }
}
