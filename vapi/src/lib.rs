pub mod api;
pub mod config;
pub mod resources;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::OnceLock;
use tfplug::request::{ConfigureRequest, ConfigureResponse};
use tfplug::{
    AttributeBuilder, AttributeType, Diagnostics, ProviderV2, ResourceV2, Schema, SchemaBuilder,
    TfplugError,
};

use crate::config::ProviderConfig;

pub const PROVIDER_TYPE_NAME: &str = "vapi";

/// Vapi provider. The API client is built once by `configure` and shared by
/// every resource instance.
#[derive(Default)]
pub struct VapiProvider {
    client: OnceLock<api::Client>,
}

impl VapiProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .description("Interact with the Vapi voice AI platform")
            .attribute(
                AttributeBuilder::new("url", AttributeType::String)
                    .description("Vapi API base URL. Defaults to VAPI_URL or https://api.vapi.ai")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("token", AttributeType::String)
                    .description("Vapi API token. Defaults to VAPI_API_KEY")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("api_key", AttributeType::String)
                    .description("Alias of `token`")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .build()
    }

    fn configure_with(
        &mut self,
        resolved: Result<ProviderConfig, config::ConfigError>,
    ) -> Diagnostics {
        let mut diags = Diagnostics::new();

        let settings = match resolved {
            Ok(settings) => settings,
            Err(e) => {
                diags.add_error(e.to_string(), Some(e.detail()));
                return diags;
            }
        };

        if self.client.get().is_some() {
            tracing::warn!("provider configured more than once; keeping the first client");
            diags.add_warning(
                "Provider already configured",
                Some("The existing API client is kept"),
            );
            return diags;
        }

        match api::Client::new(&settings.base_url, &settings.token) {
            Ok(client) => {
                let base_url = client.base_url().to_string();
                if self.client.set(client).is_err() {
                    diags.add_warning(
                        "Provider already configured",
                        Some("The existing API client is kept"),
                    );
                } else {
                    tracing::info!(base_url = %base_url, "configured Vapi client");
                }
            }
            Err(e) => {
                diags.add_error("Unable to create API client", Some(e.to_string()));
            }
        }

        diags
    }
}

#[async_trait]
impl ProviderV2 for VapiProvider {
    fn type_name(&self) -> &str {
        PROVIDER_TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn configure(&mut self, request: ConfigureRequest) -> ConfigureResponse {
        tracing::debug!(terraform_version = %request.terraform_version, "configuring provider");
        let resolved = ProviderConfig::from_env(&request.config);
        ConfigureResponse {
            diagnostics: self.configure_with(resolved),
        }
    }

    async fn create_resource(&self, name: &str) -> tfplug::Result<Box<dyn ResourceV2>> {
        let client = self
            .client
            .get()
            .ok_or(TfplugError::ProviderNotConfigured)?
            .clone();

        match name {
            resources::assistant::TYPE_NAME => {
                Ok(Box::new(resources::AssistantResource::new(client)))
            }
            resources::phone_number::TYPE_NAME => {
                Ok(Box::new(resources::PhoneNumberResource::new(client)))
            }
            _ => Err(TfplugError::ResourceNotFound(name.to_string())),
        }
    }

    async fn resource_schemas(&self) -> HashMap<String, Schema> {
        static SCHEMAS: OnceLock<HashMap<String, Schema>> = OnceLock::new();

        SCHEMAS
            .get_or_init(|| {
                HashMap::from([
                    (
                        resources::assistant::TYPE_NAME.to_string(),
                        resources::AssistantResource::schema_static(),
                    ),
                    (
                        resources::phone_number::TYPE_NAME.to_string(),
                        resources::PhoneNumberResource::schema_static(),
                    ),
                ])
            })
            .clone()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tfplug::Config;

    fn request(config: Config) -> ConfigureRequest {
        ConfigureRequest {
            terraform_version: "1.9.0".to_string(),
            config,
        }
    }

    #[tokio::test]
    #[serial]
    async fn provider_configures_successfully_with_env_vars() {
        std::env::set_var(config::ENV_API_KEY, "env-token");
        std::env::set_var(config::ENV_URL, "https://vapi.example.test");

        let mut provider = VapiProvider::new();
        let response = provider.configure(request(Config::new())).await;

        assert!(response.diagnostics.errors.is_empty());
        assert_eq!(
            provider.client.get().map(|c| c.base_url()),
            Some("https://vapi.example.test")
        );

        std::env::remove_var(config::ENV_API_KEY);
        std::env::remove_var(config::ENV_URL);
    }

    #[tokio::test]
    #[serial]
    async fn provider_configure_requires_token() {
        std::env::remove_var(config::ENV_API_KEY);

        let mut provider = VapiProvider::new();
        let response = provider.configure(request(Config::new())).await;

        assert_eq!(response.diagnostics.errors.len(), 1);
        assert_eq!(response.diagnostics.errors[0].summary, "Unable to find token");
        assert!(provider.client.get().is_none());

        let err = provider
            .create_resource(resources::assistant::TYPE_NAME)
            .await
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Provider not configured");
    }

    #[tokio::test]
    #[serial]
    async fn second_configure_keeps_first_client() {
        std::env::remove_var(config::ENV_URL);

        let mut provider = VapiProvider::new();
        let mut first = Config::new();
        first.insert("token", "first");
        first.insert("url", "https://first.vapi.test");
        provider.configure(request(first)).await;

        let mut second = Config::new();
        second.insert("token", "second");
        second.insert("url", "https://second.vapi.test");
        let response = provider.configure(request(second)).await;

        assert!(response.diagnostics.errors.is_empty());
        assert_eq!(response.diagnostics.warnings.len(), 1);
        assert_eq!(
            provider.client.get().map(|c| c.base_url()),
            Some("https://first.vapi.test")
        );
    }

    #[tokio::test]
    #[serial]
    async fn provider_creates_resources_after_configuration() {
        let mut provider = VapiProvider::new();
        let mut config = Config::new();
        config.insert("token", "t");
        provider.configure(request(config)).await;

        let assistant = provider
            .create_resource(resources::assistant::TYPE_NAME)
            .await
            .unwrap();
        assert_eq!(assistant.type_name(), "vapi_assistant");

        let phone_number = provider
            .create_resource(resources::phone_number::TYPE_NAME)
            .await
            .unwrap();
        assert_eq!(phone_number.type_name(), "vapi_phone_number");

        let unknown = provider.create_resource("vapi_squad").await;
        assert!(matches!(unknown, Err(TfplugError::ResourceNotFound(_))));
    }

    #[tokio::test]
    async fn provider_schemas_contain_expected_resources() {
        let provider = VapiProvider::new();
        let schemas = provider.resource_schemas().await;

        assert_eq!(schemas.len(), 2);
        assert!(schemas.contains_key("vapi_assistant"));
        assert!(schemas.contains_key("vapi_phone_number"));
    }

    #[test]
    fn provider_schema_marks_credentials_sensitive() {
        let schema = VapiProvider::schema_static();
        let mut sensitive: Vec<_> = schema.sensitive_attributes().collect();
        sensitive.sort();

        assert_eq!(sensitive, vec!["api_key", "token"]);
        assert!(schema.attribute("url").unwrap().optional);
    }
}
