//! Vapi REST API client
//!
//! `Client` performs one HTTP exchange per call. Each resource collection
//! implements `VapiApiResource`, and `ResourceApi` provides the CRUD calls for
//! it, e.g. `client.assistants().get(id)`.

pub mod assistant;
pub mod client;
pub mod error;
pub mod phone_number;

pub use assistant::{Assistant, AssistantModel, AssistantRequest, AssistantVoice};
pub use client::Client;
pub use error::ApiError;
pub use phone_number::{CreatePhoneNumberRequest, PhoneNumber, UpdatePhoneNumberRequest};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// A Vapi collection such as `/assistant`
pub trait VapiApiResource: DeserializeOwned {
    type CreateRequest: Serialize + Sync;
    type UpdateRequest: Serialize + Sync;

    /// Human readable kind, used in not-found errors
    const KIND: &'static str;

    fn api_path() -> &'static str;

    fn resource_path(id: &str) -> String {
        format!("{}/{}", Self::api_path(), urlencoding::encode(id))
    }
}

/// CRUD operations on one collection
pub struct ResourceApi<'a, R> {
    client: &'a Client,
    _resource: PhantomData<fn() -> R>,
}

impl<'a, R: VapiApiResource> ResourceApi<'a, R> {
    pub fn new(client: &'a Client) -> Self {
        Self {
            client,
            _resource: PhantomData,
        }
    }

    /// POST /{collection}
    pub async fn create(&self, request: &R::CreateRequest) -> Result<R, ApiError> {
        self.client.post(R::api_path(), request).await
    }

    /// GET /{collection}/{id}
    pub async fn get(&self, id: &str) -> Result<R, ApiError> {
        self.client
            .get(&R::resource_path(id))
            .await
            .map_err(|e| not_found::<R>(e, id))
    }

    /// PATCH /{collection}/{id}
    pub async fn update(&self, id: &str, request: &R::UpdateRequest) -> Result<R, ApiError> {
        self.client
            .patch(&R::resource_path(id), request)
            .await
            .map_err(|e| not_found::<R>(e, id))
    }

    /// DELETE /{collection}/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&R::resource_path(id))
            .await
            .map_err(|e| not_found::<R>(e, id))
    }

    /// GET /{collection}
    pub async fn list(&self) -> Result<Vec<R>, ApiError> {
        self.client.get(R::api_path()).await
    }
}

fn not_found<R: VapiApiResource>(err: ApiError, id: &str) -> ApiError {
    match err {
        ApiError::Status { status: 404, .. } => ApiError::NotFound {
            resource: R::KIND,
            id: id.to_string(),
        },
        other => other,
    }
}
