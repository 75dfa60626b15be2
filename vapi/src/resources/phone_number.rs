use crate::api::{
    ApiError, Client, CreatePhoneNumberRequest, PhoneNumber, UpdatePhoneNumberRequest,
};
use crate::resources::fields::{preserve_sensitive, Fields, MappingError};
use async_trait::async_trait;
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest, ReadResponse,
    UpdateRequest, UpdateResponse,
};
use tfplug::{
    AttributeBuilder, AttributeType, Config, Diagnostics, Dynamic, RequiresReplaceIfChanged,
    ResourceV2, Schema, SchemaBuilder, State, UseStateForUnknown,
};

pub const TYPE_NAME: &str = "vapi_phone_number";

pub struct PhoneNumberResource {
    client: Client,
}

impl PhoneNumberResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> Schema {
        let string = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .optional()
        };

        SchemaBuilder::new()
            .description("Manages a phone number attached to Vapi")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Phone number identifier")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("number", AttributeType::String)
                    .description("Phone number in E.164 format; changing it forces a new resource")
                    .required()
                    .plan_modifier(RequiresReplaceIfChanged)
                    .build(),
            )
            .attribute(string("name", "Display name").build())
            .attribute(string("assistant_id", "Assistant answering inbound calls").build())
            .attribute(string("squad_id", "Squad answering inbound calls").build())
            .attribute(string("server_url", "Server URL receiving call events").build())
            .attribute(
                string("server_url_secret", "Secret sent with server URL requests")
                    .sensitive()
                    .build(),
            )
            .attribute(
                string("provider_type", "Telephony provider (e.g., 'twilio', 'vonage')").build(),
            )
            .attribute(
                string("twilio_account_sid", "Twilio account SID")
                    .sensitive()
                    .build(),
            )
            .attribute(
                string("twilio_auth_token", "Twilio auth token")
                    .sensitive()
                    .build(),
            )
            .attribute(string("vonage_api_key", "Vonage API key").sensitive().build())
            .attribute(
                string("vonage_api_secret", "Vonage API secret")
                    .sensitive()
                    .build(),
            )
            .attribute(string("vonage_application_id", "Vonage application ID").build())
            .attribute(string("created_at", "Creation timestamp").computed().build())
            .attribute(string("updated_at", "Last update timestamp").computed().build())
            .build()
    }

    pub fn create_request_from_config(
        config: &Config,
    ) -> Result<CreatePhoneNumberRequest, MappingError> {
        let fields = Fields::new(&config.values);

        Ok(CreatePhoneNumberRequest {
            number: fields.required_string("number")?,
            name: fields.optional_string("name")?,
            assistant_id: fields.optional_string("assistant_id")?,
            squad_id: fields.optional_string("squad_id")?,
            server_url: fields.optional_string("server_url")?,
            server_url_secret: fields.optional_string("server_url_secret")?,
            provider: fields.optional_string("provider_type")?,
            twilio_account_sid: fields.optional_string("twilio_account_sid")?,
            twilio_auth_token: fields.optional_string("twilio_auth_token")?,
            vonage_api_key: fields.optional_string("vonage_api_key")?,
            vonage_api_secret: fields.optional_string("vonage_api_secret")?,
            vonage_application_id: fields.optional_string("vonage_application_id")?,
        })
    }

    /// Same fields as create, minus `number` which only changes by replacement
    pub fn update_request_from_config(
        config: &Config,
    ) -> Result<UpdatePhoneNumberRequest, MappingError> {
        let create = Self::create_request_from_config(config)?;

        Ok(UpdatePhoneNumberRequest {
            name: create.name,
            assistant_id: create.assistant_id,
            squad_id: create.squad_id,
            server_url: create.server_url,
            server_url_secret: create.server_url_secret,
            provider: create.provider,
            twilio_account_sid: create.twilio_account_sid,
            twilio_auth_token: create.twilio_auth_token,
            vonage_api_key: create.vonage_api_key,
            vonage_api_secret: create.vonage_api_secret,
            vonage_application_id: create.vonage_application_id,
        })
    }

    pub fn state_from_remote(phone_number: PhoneNumber) -> State {
        let mut state = State::new();
        state.insert("id", phone_number.id);
        state.insert("number", phone_number.number);
        state.insert("name", phone_number.name);
        state.insert("assistant_id", phone_number.assistant_id);
        state.insert("squad_id", phone_number.squad_id);
        state.insert("server_url", phone_number.server_url);
        state.insert("server_url_secret", phone_number.server_url_secret);
        state.insert("provider_type", phone_number.provider);
        state.insert("twilio_account_sid", phone_number.twilio_account_sid);
        state.insert("twilio_auth_token", phone_number.twilio_auth_token);
        state.insert("vonage_api_key", phone_number.vonage_api_key);
        state.insert("vonage_api_secret", phone_number.vonage_api_secret);
        state.insert("vonage_application_id", phone_number.vonage_application_id);
        state.insert("created_at", Dynamic::Null);
        state.insert("updated_at", Dynamic::Null);
        state
    }
}

#[async_trait]
impl ResourceV2 for PhoneNumberResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut diagnostics = Diagnostics::new();
        let mut state = request.planned_state;

        let body = match Self::create_request_from_config(&request.config) {
            Ok(body) => body,
            Err(e) => {
                diagnostics.add_error("Unable to create phone number", Some(e.to_string()));
                return CreateResponse { state, diagnostics };
            }
        };

        match self.client.phone_numbers().create(&body).await {
            Ok(created) => {
                tracing::info!(id = %created.id, "created phone number");
                state.insert("id", created.id);
                state.insert("created_at", Dynamic::Null);
                state.insert("updated_at", Dynamic::Null);
            }
            Err(e) => {
                diagnostics.add_error("Unable to create phone number", Some(e.to_string()));
            }
        }

        CreateResponse { state, diagnostics }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let mut diagnostics = Diagnostics::new();
        let prior = request.current_state;

        let Some(id) = prior.get_string("id").map(str::to_string) else {
            diagnostics.add_error("Unable to read phone number", Some("State has no id"));
            return ReadResponse {
                state: Some(prior),
                diagnostics,
            };
        };

        match self.client.phone_numbers().get(&id).await {
            Ok(phone_number) => {
                let mut state = Self::state_from_remote(phone_number);
                preserve_sensitive(&Self::schema_static(), &prior, &mut state);
                ReadResponse {
                    state: Some(state),
                    diagnostics,
                }
            }
            Err(e @ ApiError::NotFound { .. }) => {
                tracing::warn!(%id, "phone number no longer exists");
                diagnostics.add_warning(
                    "Phone number not found",
                    Some(format!("{}; removing it from state", e)),
                );
                ReadResponse {
                    state: None,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.add_error("Unable to read phone number", Some(e.to_string()));
                ReadResponse {
                    state: Some(prior),
                    diagnostics,
                }
            }
        }
    }

    async fn update(&self, request: UpdateRequest) -> UpdateResponse {
        let mut diagnostics = Diagnostics::new();
        let mut state = request.planned_state;

        let Some(id) = request.current_state.get_string("id").map(str::to_string) else {
            diagnostics.add_error("Unable to update phone number", Some("State has no id"));
            return UpdateResponse { state, diagnostics };
        };

        let body = match Self::update_request_from_config(&request.config) {
            Ok(body) => body,
            Err(e) => {
                diagnostics.add_error("Unable to update phone number", Some(e.to_string()));
                return UpdateResponse { state, diagnostics };
            }
        };

        match self.client.phone_numbers().update(&id, &body).await {
            Ok(_) => {
                tracing::info!(%id, "updated phone number");
                state.insert("id", id);
                state.insert("created_at", Dynamic::Null);
                state.insert("updated_at", Dynamic::Null);
            }
            Err(e) => {
                diagnostics.add_error("Unable to update phone number", Some(e.to_string()));
            }
        }

        UpdateResponse { state, diagnostics }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let mut diagnostics = Diagnostics::new();

        let Some(id) = request.current_state.get_string("id") else {
            diagnostics.add_error("Unable to delete phone number", Some("State has no id"));
            return DeleteResponse { diagnostics };
        };

        match self.client.phone_numbers().delete(id).await {
            Ok(()) => tracing::info!(%id, "deleted phone number"),
            Err(ApiError::NotFound { .. }) => {
                tracing::warn!(%id, "phone number already deleted");
            }
            Err(e) => {
                diagnostics.add_error("Unable to delete phone number", Some(e.to_string()));
            }
        }

        DeleteResponse { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use tfplug::PlanModifier;

    fn create_test_client(server_url: &str) -> Client {
        Client::new(server_url, "test-token").unwrap()
    }

    fn twilio_config() -> Config {
        let mut config = Config::new();
        config.insert("number", "+15551234567");
        config.insert("name", "Front desk");
        config.insert("provider_type", "twilio");
        config.insert("twilio_account_sid", "AC123");
        config.insert("twilio_auth_token", "tw-secret");
        config.insert("squad_id", Dynamic::Null);
        config
    }

    #[test]
    fn resource_has_correct_schema() {
        let schema = PhoneNumberResource::schema_static();

        let number = schema.attribute("number").unwrap();
        assert!(number.required);
        assert_eq!(number.plan_modifiers.len(), 1);
        assert_eq!(
            number.plan_modifiers[0].description(),
            RequiresReplaceIfChanged.description()
        );

        let mut sensitive: Vec<_> = schema.sensitive_attributes().collect();
        sensitive.sort();
        assert_eq!(
            sensitive,
            vec![
                "server_url_secret",
                "twilio_account_sid",
                "twilio_auth_token",
                "vonage_api_key",
                "vonage_api_secret",
            ]
        );
    }

    #[test]
    fn update_request_omits_number() {
        let request = PhoneNumberResource::update_request_from_config(&twilio_config()).unwrap();
        let json = serde_json::to_value(&request).unwrap();

        assert!(json.get("number").is_none());
        assert!(json.get("squadId").is_none());
        assert_eq!(json["provider"], "twilio");
    }

    #[tokio::test]
    async fn resource_creates_phone_number() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/phone-number")
            .match_body(Matcher::Json(serde_json::json!({
                "number": "+15551234567",
                "name": "Front desk",
                "provider": "twilio",
                "twilioAccountSid": "AC123",
                "twilioAuthToken": "tw-secret"
            })))
            .with_status(201)
            .with_body(r#"{"id":"pn-1","number":"+15551234567"}"#)
            .create_async()
            .await;

        let resource = PhoneNumberResource::new(create_test_client(&server.url()));
        let config = twilio_config();
        let mut planned_state = config.clone();
        planned_state.insert("id", Dynamic::Unknown);

        let response = resource
            .create(CreateRequest {
                config,
                planned_state,
            })
            .await;

        assert!(!response.diagnostics.has_errors());
        assert_eq!(response.state.get_string("id"), Some("pn-1"));
        assert_eq!(response.state.get_string("twilio_auth_token"), Some("tw-secret"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn resource_read_keeps_sensitive_values() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/phone-number/pn-1")
            .with_body(
                r#"{
                "id": "pn-1",
                "number": "+15551234567",
                "name": "Reception",
                "provider": "twilio",
                "twilioAccountSid": "AC123",
                "twilioAuthToken": "****"
            }"#,
            )
            .create_async()
            .await;

        let resource = PhoneNumberResource::new(create_test_client(&server.url()));
        let mut current_state = twilio_config();
        current_state.insert("id", "pn-1");

        let response = resource.read(ReadRequest { current_state }).await;
        let state = response.state.unwrap();

        assert_eq!(state.get_string("name"), Some("Reception"));
        assert_eq!(state.get_string("twilio_auth_token"), Some("tw-secret"));
        assert_eq!(state.get("vonage_api_key"), Some(&Dynamic::Null));
    }

    #[tokio::test]
    async fn resource_updates_without_number() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PATCH", "/phone-number/pn-1")
            .match_body(Matcher::Json(serde_json::json!({
                "name": "Front desk",
                "provider": "twilio",
                "twilioAccountSid": "AC123",
                "twilioAuthToken": "tw-secret"
            })))
            .with_status(200)
            .with_body(r#"{"id":"pn-1","number":"+15551234567","name":"Front desk"}"#)
            .create_async()
            .await;

        let resource = PhoneNumberResource::new(create_test_client(&server.url()));
        let config = twilio_config();
        let mut current_state = config.clone();
        current_state.insert("id", "pn-1");
        current_state.insert("name", "Old name");

        let response = resource
            .update(UpdateRequest {
                config: config.clone(),
                planned_state: config,
                current_state,
            })
            .await;

        assert!(!response.diagnostics.has_errors());
        assert_eq!(response.state.get_string("id"), Some("pn-1"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn resource_delete_reports_server_errors() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/phone-number/pn-1")
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;

        let resource = PhoneNumberResource::new(create_test_client(&server.url()));
        let mut current_state = State::new();
        current_state.insert("id", "pn-1");

        let response = resource.delete(DeleteRequest { current_state }).await;

        assert_eq!(
            response.diagnostics.errors[0].summary,
            "Unable to delete phone number"
        );
    }
}
