use crate::api::{ApiError, Assistant, AssistantModel, AssistantRequest, AssistantVoice, Client};
use crate::resources::fields::{preserve_sensitive, string_list, Fields, MappingError};
use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest, ReadResponse,
    UpdateRequest, UpdateResponse,
};
use tfplug::{
    AttributeBuilder, AttributeType, Config, Diagnostics, Dynamic, ResourceV2, Schema,
    SchemaBuilder, State, UseStateForUnknown,
};

pub const TYPE_NAME: &str = "vapi_assistant";

/// Model injected when `system_message` is set without a `model` block
pub const DEFAULT_MODEL_PROVIDER: &str = "openai";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub struct AssistantResource {
    client: Client,
}

impl AssistantResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .description("Manages a Vapi voice assistant")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Assistant identifier")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Name of the assistant")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("first_message", AttributeType::String)
                    .description("First message the assistant says when a call starts")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("system_message", AttributeType::String)
                    .description("System prompt given to the model")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::nested("model", model_attributes())
                    .description("Language model configuration")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::nested("voice", voice_attributes())
                    .description("Voice configuration")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "client_messages",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("Message types sent to the client SDK")
                .optional()
                .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "server_messages",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("Message types sent to the server URL")
                .optional()
                .build(),
            )
            .attribute(
                AttributeBuilder::new("silence_timeout_seconds", AttributeType::Number)
                    .description("Seconds of silence before the call ends")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("max_duration_seconds", AttributeType::Number)
                    .description("Maximum call duration in seconds")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("background_sound", AttributeType::String)
                    .description("Background sound played during the call (e.g., 'office', 'off')")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("background_denoising_enabled", AttributeType::Bool)
                    .description("Filter background noise from the caller")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("model_output_in_messages_enabled", AttributeType::Bool)
                    .description("Use model output instead of transcription in messages")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("created_at", AttributeType::String)
                    .description("Creation timestamp")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("updated_at", AttributeType::String)
                    .description("Last update timestamp")
                    .optional()
                    .computed()
                    .build(),
            )
            .build()
    }

    /// Builds the create/update body. Unset attributes are left out.
    pub fn request_from_config(config: &Config) -> Result<AssistantRequest, MappingError> {
        let fields = Fields::new(&config.values);

        let mut model = fields
            .nested("model")?
            .map(|model| -> Result<AssistantModel, MappingError> {
                Ok(AssistantModel {
                    provider: model.required_string("provider_type")?,
                    model: model.required_string("model")?,
                    system_prompt: None,
                    temperature: model.optional_f64("temperature")?,
                    max_tokens: model.optional_i64("max_tokens")?,
                    emotion_recognition_enabled: model
                        .optional_bool("emotion_recognition_enabled")?,
                    num_fast_turns: model.optional_i64("num_fast_turns")?,
                    tool_ids: model.optional_string_list("tool_ids")?,
                    function_ids: model.optional_string_list("function_ids")?,
                })
            })
            .transpose()?;

        if let Some(system_message) = fields.optional_string("system_message")? {
            let model = model.get_or_insert_with(|| AssistantModel {
                provider: DEFAULT_MODEL_PROVIDER.to_string(),
                model: DEFAULT_MODEL.to_string(),
                ..Default::default()
            });
            model.system_prompt = Some(system_message);
        }

        let voice = fields
            .nested("voice")?
            .map(|voice| -> Result<AssistantVoice, MappingError> {
                Ok(AssistantVoice {
                    provider: voice.required_string("provider_type")?,
                    voice_id: voice.required_string("voice_id")?,
                    speed: voice.optional_f64("speed")?,
                    stability: voice.optional_f64("stability")?,
                    similarity_boost: voice.optional_f64("similarity_boost")?,
                    style: voice.optional_f64("style")?,
                    use_speaker_boost: voice.optional_bool("use_speaker_boost")?,
                })
            })
            .transpose()?;

        Ok(AssistantRequest {
            name: fields.required_string("name")?,
            first_message: fields.optional_string("first_message")?,
            model: model.map(Some),
            voice: voice.map(Some),
            client_messages: fields.optional_string_list("client_messages")?,
            server_messages: fields.optional_string_list("server_messages")?,
            silence_timeout_seconds: fields.optional_i64("silence_timeout_seconds")?,
            max_duration_seconds: fields.optional_i64("max_duration_seconds")?,
            background_sound: fields.optional_string("background_sound")?,
            background_denoising_enabled: fields.optional_bool("background_denoising_enabled")?,
            model_output_in_messages_enabled: fields
                .optional_bool("model_output_in_messages_enabled")?,
        })
    }

    /// Projects a remote assistant into state. The injected default model is
    /// hidden when the prior state had no `model` block.
    pub fn state_from_remote(assistant: Assistant, prior: &State) -> State {
        let prior_has_model = prior.get_set("model").is_some();

        let system_message = assistant
            .model
            .as_ref()
            .and_then(|m| m.system_prompt.clone())
            .flatten();

        let model = match assistant.model {
            Some(model) if prior_has_model || !is_default_model(&model) => {
                Dynamic::Map(model_to_state(model))
            }
            _ => Dynamic::Null,
        };

        let voice = match assistant.voice {
            Some(voice) => Dynamic::Map(voice_to_state(voice)),
            None => Dynamic::Null,
        };

        let mut state = State::new();
        state.insert("id", assistant.id);
        state.insert("name", assistant.name);
        state.insert("first_message", assistant.first_message);
        state.insert("system_message", system_message);
        state.insert("model", model);
        state.insert("voice", voice);
        state.insert("client_messages", string_list(assistant.client_messages));
        state.insert("server_messages", string_list(assistant.server_messages));
        state.insert("silence_timeout_seconds", assistant.silence_timeout_seconds);
        state.insert("max_duration_seconds", assistant.max_duration_seconds);
        state.insert("background_sound", assistant.background_sound);
        state.insert(
            "background_denoising_enabled",
            assistant.background_denoising_enabled,
        );
        state.insert(
            "model_output_in_messages_enabled",
            assistant.model_output_in_messages_enabled,
        );
        state.insert("created_at", Dynamic::Null);
        state.insert("updated_at", Dynamic::Null);
        state
    }
}

fn model_attributes() -> Vec<tfplug::schema::Attribute> {
    vec![
        AttributeBuilder::new("provider_type", AttributeType::String)
            .description("Model provider (e.g., 'openai', 'anthropic')")
            .required()
            .build(),
        AttributeBuilder::new("model", AttributeType::String)
            .description("Model name")
            .required()
            .build(),
        AttributeBuilder::new("temperature", AttributeType::Number)
            .description("Sampling temperature")
            .optional()
            .build(),
        AttributeBuilder::new("max_tokens", AttributeType::Number)
            .description("Maximum tokens per response")
            .optional()
            .build(),
        AttributeBuilder::new("emotion_recognition_enabled", AttributeType::Bool)
            .description("Detect caller emotion and pass it to the model")
            .optional()
            .build(),
        AttributeBuilder::new("num_fast_turns", AttributeType::Number)
            .description("Number of initial turns answered by a faster model")
            .optional()
            .build(),
        AttributeBuilder::new("tool_ids", AttributeType::List(Box::new(AttributeType::String)))
            .description("Tools available to the model")
            .optional()
            .build(),
        AttributeBuilder::new(
            "function_ids",
            AttributeType::List(Box::new(AttributeType::String)),
        )
        .description("Functions available to the model")
        .optional()
        .build(),
    ]
}

fn voice_attributes() -> Vec<tfplug::schema::Attribute> {
    vec![
        AttributeBuilder::new("provider_type", AttributeType::String)
            .description("Voice provider (e.g., '11labs', 'playht')")
            .required()
            .build(),
        AttributeBuilder::new("voice_id", AttributeType::String)
            .description("Provider specific voice identifier")
            .required()
            .build(),
        AttributeBuilder::new("speed", AttributeType::Number)
            .optional()
            .build(),
        AttributeBuilder::new("stability", AttributeType::Number)
            .optional()
            .build(),
        AttributeBuilder::new("similarity_boost", AttributeType::Number)
            .optional()
            .build(),
        AttributeBuilder::new("style", AttributeType::Number)
            .optional()
            .build(),
        AttributeBuilder::new("use_speaker_boost", AttributeType::Bool)
            .optional()
            .build(),
    ]
}

fn is_default_model(model: &AssistantModel) -> bool {
    model.provider == DEFAULT_MODEL_PROVIDER && model.model == DEFAULT_MODEL
}

fn model_to_state(model: AssistantModel) -> HashMap<String, Dynamic> {
    HashMap::from([
        ("provider_type".to_string(), Dynamic::from(model.provider)),
        ("model".to_string(), Dynamic::from(model.model)),
        ("temperature".to_string(), model.temperature.flatten().into()),
        ("max_tokens".to_string(), model.max_tokens.flatten().into()),
        (
            "emotion_recognition_enabled".to_string(),
            model.emotion_recognition_enabled.flatten().into(),
        ),
        (
            "num_fast_turns".to_string(),
            model.num_fast_turns.flatten().into(),
        ),
        ("tool_ids".to_string(), string_list(model.tool_ids.flatten())),
        (
            "function_ids".to_string(),
            string_list(model.function_ids.flatten()),
        ),
    ])
}

fn voice_to_state(voice: AssistantVoice) -> HashMap<String, Dynamic> {
    HashMap::from([
        ("provider_type".to_string(), Dynamic::from(voice.provider)),
        ("voice_id".to_string(), Dynamic::from(voice.voice_id)),
        ("speed".to_string(), voice.speed.flatten().into()),
        ("stability".to_string(), voice.stability.flatten().into()),
        (
            "similarity_boost".to_string(),
            voice.similarity_boost.flatten().into(),
        ),
        ("style".to_string(), voice.style.flatten().into()),
        (
            "use_speaker_boost".to_string(),
            voice.use_speaker_boost.flatten().into(),
        ),
    ])
}

#[async_trait]
impl ResourceV2 for AssistantResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut diagnostics = Diagnostics::new();
        let mut state = request.planned_state;

        let body = match Self::request_from_config(&request.config) {
            Ok(body) => body,
            Err(e) => {
                diagnostics.add_error("Unable to create assistant", Some(e.to_string()));
                return CreateResponse { state, diagnostics };
            }
        };

        match self.client.assistants().create(&body).await {
            Ok(created) => {
                tracing::info!(id = %created.id, "created assistant");
                state.insert("id", created.id);
                state.insert("created_at", Dynamic::Null);
                state.insert("updated_at", Dynamic::Null);
            }
            Err(e) => {
                diagnostics.add_error("Unable to create assistant", Some(e.to_string()));
            }
        }

        CreateResponse { state, diagnostics }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let mut diagnostics = Diagnostics::new();
        let prior = request.current_state;

        let Some(id) = prior.get_string("id").map(str::to_string) else {
            diagnostics.add_error("Unable to read assistant", Some("State has no id"));
            return ReadResponse {
                state: Some(prior),
                diagnostics,
            };
        };

        match self.client.assistants().get(&id).await {
            Ok(assistant) => {
                let mut state = Self::state_from_remote(assistant, &prior);
                preserve_sensitive(&Self::schema_static(), &prior, &mut state);
                ReadResponse {
                    state: Some(state),
                    diagnostics,
                }
            }
            Err(e @ ApiError::NotFound { .. }) => {
                tracing::warn!(%id, "assistant no longer exists");
                diagnostics.add_warning(
                    "Assistant not found",
                    Some(format!("{}; removing it from state", e)),
                );
                ReadResponse {
                    state: None,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.add_error("Unable to read assistant", Some(e.to_string()));
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
            diagnostics.add_error("Unable to update assistant", Some("State has no id"));
            return UpdateResponse { state, diagnostics };
        };

        let body = match Self::request_from_config(&request.config) {
            Ok(body) => body,
            Err(e) => {
                diagnostics.add_error("Unable to update assistant", Some(e.to_string()));
                return UpdateResponse { state, diagnostics };
            }
        };

        match self.client.assistants().update(&id, &body).await {
            Ok(_) => {
                tracing::info!(%id, "updated assistant");
                state.insert("id", id);
                state.insert("created_at", Dynamic::Null);
                state.insert("updated_at", Dynamic::Null);
            }
            Err(e) => {
                diagnostics.add_error("Unable to update assistant", Some(e.to_string()));
            }
        }

        UpdateResponse { state, diagnostics }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let mut diagnostics = Diagnostics::new();

        let Some(id) = request.current_state.get_string("id") else {
            diagnostics.add_error("Unable to delete assistant", Some("State has no id"));
            return DeleteResponse { diagnostics };
        };

        match self.client.assistants().delete(id).await {
            Ok(()) => tracing::info!(%id, "deleted assistant"),
            Err(ApiError::NotFound { .. }) => {
                tracing::warn!(%id, "assistant already deleted");
            }
            Err(e) => {
                diagnostics.add_error("Unable to delete assistant", Some(e.to_string()));
            }
        }

        DeleteResponse { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use tfplug::request::ImportRequest;

    fn create_test_client(server_url: &str) -> Client {
        Client::new(server_url, "test-token").unwrap()
    }

    fn config(pairs: &[(&str, Dynamic)]) -> Config {
        let mut config = Config::new();
        for (k, v) in pairs {
            config.insert(*k, v.clone());
        }
        config
    }

    fn object(pairs: &[(&str, Dynamic)]) -> Dynamic {
        Dynamic::Map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn resource_has_correct_schema() {
        let schema = AssistantResource::schema_static();

        assert!(schema.attribute("name").unwrap().required);
        assert!(schema.attribute("id").unwrap().computed);
        assert_eq!(schema.attribute("id").unwrap().plan_modifiers.len(), 1);

        let created_at = schema.attribute("created_at").unwrap();
        assert!(created_at.optional && created_at.computed);

        let model = schema.attribute("model").unwrap();
        let nested = model.nested_type.as_ref().unwrap();
        assert!(nested
            .attributes
            .iter()
            .any(|a| a.name == "provider_type" && a.required));
        assert!(schema.attribute("voice").unwrap().nested_type.is_some());
        assert_eq!(schema.sensitive_attributes().count(), 0);
    }

    #[test]
    fn minimal_config_maps_to_name_only() {
        let config = config(&[
            ("name", Dynamic::from("Support Bot")),
            ("first_message", Dynamic::Null),
            ("model", Dynamic::Null),
            ("id", Dynamic::Unknown),
        ]);
        let request = AssistantResource::request_from_config(&config).unwrap();

        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"name":"Support Bot"}"#
        );
    }

    #[test]
    fn system_message_without_model_injects_default_model() {
        let config = config(&[
            ("name", Dynamic::from("Bot")),
            ("system_message", Dynamic::from("Be brief")),
        ]);
        let request = AssistantResource::request_from_config(&config).unwrap();

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "name": "Bot",
                "model": {
                    "provider": "openai",
                    "model": "gpt-4o-mini",
                    "systemPrompt": "Be brief"
                }
            })
        );
    }

    #[test]
    fn system_message_attaches_to_configured_model() {
        let config = config(&[
            ("name", Dynamic::from("Bot")),
            ("system_message", Dynamic::from("Be kind")),
            (
                "model",
                object(&[
                    ("provider_type", Dynamic::from("anthropic")),
                    ("model", Dynamic::from("claude-3-haiku")),
                    ("temperature", Dynamic::Number(0.3)),
                    ("max_tokens", Dynamic::Null),
                ]),
            ),
        ]);
        let request = AssistantResource::request_from_config(&config).unwrap();

        assert_eq!(
            serde_json::to_value(&request).unwrap()["model"],
            serde_json::json!({
                "provider": "anthropic",
                "model": "claude-3-haiku",
                "systemPrompt": "Be kind",
                "temperature": 0.3
            })
        );
    }

    #[test]
    fn voice_block_maps_to_camel_case_fields() {
        let config = config(&[
            ("name", Dynamic::from("Bot")),
            (
                "voice",
                object(&[
                    ("provider_type", Dynamic::from("11labs")),
                    ("voice_id", Dynamic::from("rachel")),
                    ("use_speaker_boost", Dynamic::Bool(true)),
                    ("similarity_boost", Dynamic::Number(0.75)),
                ]),
            ),
        ]);
        let request = AssistantResource::request_from_config(&config).unwrap();

        assert_eq!(
            serde_json::to_value(&request).unwrap()["voice"],
            serde_json::json!({
                "provider": "11labs",
                "voiceId": "rachel",
                "similarityBoost": 0.75,
                "useSpeakerBoost": true
            })
        );
    }

    #[test]
    fn nested_block_missing_required_field_is_an_error() {
        let config = config(&[
            ("name", Dynamic::from("Bot")),
            ("voice", object(&[("provider_type", Dynamic::from("11labs"))])),
        ]);
        let err = AssistantResource::request_from_config(&config).unwrap_err();

        assert_eq!(err.to_string(), "Attribute 'voice.voice_id' is required");
    }

    #[test]
    fn remote_default_model_is_hidden_without_prior_model() {
        let assistant: Assistant = serde_json::from_value(serde_json::json!({
            "id": "a1",
            "name": "Bot",
            "model": {"provider": "openai", "model": "gpt-4o-mini", "systemPrompt": "Hi"}
        }))
        .unwrap();

        let state = AssistantResource::state_from_remote(assistant.clone(), &State::new());
        assert_eq!(state.get("model"), Some(&Dynamic::Null));
        assert_eq!(state.get_string("system_message"), Some("Hi"));

        let mut prior = State::new();
        prior.insert("model", object(&[("model", Dynamic::from("gpt-4o-mini"))]));
        let state = AssistantResource::state_from_remote(assistant, &prior);
        let model = state.get("model").and_then(|m| m.as_map()).unwrap();
        assert_eq!(model.get("provider_type"), Some(&Dynamic::from("openai")));
    }

    #[tokio::test]
    async fn resource_creates_assistant() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/assistant")
            .match_body(Matcher::JsonString(r#"{"name":"Support Bot"}"#.to_string()))
            .with_status(201)
            .with_body(r#"{"id":"abc123","name":"Support Bot","createdAt":"2024-01-01T00:00:00Z"}"#)
            .create_async()
            .await;

        let resource = AssistantResource::new(create_test_client(&server.url()));
        let config = config(&[("name", Dynamic::from("Support Bot"))]);
        let mut planned_state = config.clone();
        planned_state.insert("id", Dynamic::Unknown);
        planned_state.insert("created_at", Dynamic::Unknown);

        let response = resource
            .create(CreateRequest {
                config,
                planned_state,
            })
            .await;

        assert!(!response.diagnostics.has_errors());
        assert_eq!(response.state.get_string("id"), Some("abc123"));
        assert_eq!(response.state.get_string("name"), Some("Support Bot"));
        assert_eq!(response.state.get("created_at"), Some(&Dynamic::Null));
        assert_eq!(response.state.get("updated_at"), Some(&Dynamic::Null));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn resource_handles_creation_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/assistant")
            .with_status(400)
            .with_body(r#"{"message":["name must be shorter than or equal to 40 characters"]}"#)
            .create_async()
            .await;

        let resource = AssistantResource::new(create_test_client(&server.url()));
        let config = config(&[("name", Dynamic::from("x".repeat(41)))]);

        let response = resource
            .create(CreateRequest {
                config: config.clone(),
                planned_state: config,
            })
            .await;

        let error = &response.diagnostics.errors[0];
        assert_eq!(error.summary, "Unable to create assistant");
        assert!(error.detail.as_deref().unwrap().contains("400"));
    }

    #[tokio::test]
    async fn resource_reads_existing_assistant() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/assistant/abc123")
            .with_body(
                r#"{
                "id": "abc123",
                "name": "Renamed remotely",
                "voice": {"provider": "playht", "voiceId": "jennifer", "speed": 1.1},
                "clientMessages": ["transcript"],
                "silenceTimeoutSeconds": 30,
                "updatedAt": "2024-02-02T00:00:00Z"
            }"#,
            )
            .create_async()
            .await;

        let resource = AssistantResource::new(create_test_client(&server.url()));
        let mut current_state = State::new();
        current_state.insert("id", "abc123");
        current_state.insert("name", "Support Bot");

        let response = resource.read(ReadRequest { current_state }).await;
        let state = response.state.unwrap();

        assert_eq!(state.get_string("name"), Some("Renamed remotely"));
        assert_eq!(state.get("silence_timeout_seconds"), Some(&Dynamic::Number(30.0)));
        assert_eq!(
            state.get("client_messages"),
            Some(&Dynamic::List(vec![Dynamic::from("transcript")]))
        );
        let voice = state.get("voice").and_then(|v| v.as_map()).unwrap();
        assert_eq!(voice.get("voice_id"), Some(&Dynamic::from("jennifer")));
        assert_eq!(voice.get("stability"), Some(&Dynamic::Null));
        assert_eq!(state.get("updated_at"), Some(&Dynamic::Null));
    }

    #[tokio::test]
    async fn resource_handles_read_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/assistant/gone")
            .with_status(404)
            .create_async()
            .await;

        let resource = AssistantResource::new(create_test_client(&server.url()));
        let mut current_state = State::new();
        current_state.insert("id", "gone");

        let response = resource.read(ReadRequest { current_state }).await;

        assert!(response.state.is_none());
        assert!(!response.diagnostics.has_errors());
        assert_eq!(response.diagnostics.warnings.len(), 1);
    }

    #[tokio::test]
    async fn resource_read_server_error_keeps_prior_state() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/assistant/abc123")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let resource = AssistantResource::new(create_test_client(&server.url()));
        let mut current_state = State::new();
        current_state.insert("id", "abc123");
        current_state.insert("name", "Support Bot");

        let response = resource
            .read(ReadRequest {
                current_state: current_state.clone(),
            })
            .await;

        assert_eq!(response.state, Some(current_state));
        assert_eq!(
            response.diagnostics.errors[0].detail.as_deref(),
            Some("API returned status 500: boom")
        );
    }

    #[tokio::test]
    async fn resource_updates_assistant() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PATCH", "/assistant/abc123")
            .match_body(Matcher::JsonString(
                r#"{"name":"Support Bot","maxDurationSeconds":600}"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"id":"abc123","name":"Support Bot","maxDurationSeconds":600}"#)
            .create_async()
            .await;

        let resource = AssistantResource::new(create_test_client(&server.url()));
        let config = config(&[
            ("name", Dynamic::from("Support Bot")),
            ("max_duration_seconds", Dynamic::from(600i64)),
        ]);
        let mut current_state = State::new();
        current_state.insert("id", "abc123");
        let mut planned_state = config.clone();
        planned_state.insert("id", "abc123");
        planned_state.insert("updated_at", Dynamic::Unknown);

        let response = resource
            .update(UpdateRequest {
                config,
                planned_state,
                current_state,
            })
            .await;

        assert!(!response.diagnostics.has_errors());
        assert_eq!(response.state.get_string("id"), Some("abc123"));
        assert_eq!(response.state.get("updated_at"), Some(&Dynamic::Null));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn resource_update_sends_model_and_system_message() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PATCH", "/assistant/abc123")
            .match_body(Matcher::JsonString(
                r#"{"name":"Support Bot","model":{"provider":"anthropic","model":"claude-3-haiku","systemPrompt":"Be brief","temperature":0.3}}"#
                    .to_string(),
            ))
            .with_status(200)
            .with_body(
                r#"{"id":"abc123","name":"Support Bot","model":{"provider":"anthropic","model":"claude-3-haiku","systemPrompt":"Be brief","temperature":0.3}}"#,
            )
            .create_async()
            .await;

        let resource = AssistantResource::new(create_test_client(&server.url()));
        let config = config(&[
            ("name", Dynamic::from("Support Bot")),
            ("system_message", Dynamic::from("Be brief")),
            (
                "model",
                object(&[
                    ("provider_type", Dynamic::from("anthropic")),
                    ("model", Dynamic::from("claude-3-haiku")),
                    ("temperature", Dynamic::Number(0.3)),
                ]),
            ),
        ]);
        let mut current_state = State::new();
        current_state.insert("id", "abc123");
        current_state.insert("name", "Support Bot");
        let mut planned_state = config.clone();
        planned_state.insert("id", "abc123");

        let response = resource
            .update(UpdateRequest {
                config,
                planned_state,
                current_state,
            })
            .await;

        assert!(!response.diagnostics.has_errors());
        assert_eq!(response.state.get_string("system_message"), Some("Be brief"));
        let model = response.state.get("model").and_then(Dynamic::as_map).unwrap();
        assert_eq!(model.get("provider_type"), Some(&Dynamic::from("anthropic")));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn resource_update_omits_removed_attributes() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PATCH", "/assistant/abc123")
            .match_body(Matcher::Exact(r#"{"name":"Bot"}"#.to_string()))
            .with_status(200)
            .with_body(r#"{"id":"abc123","name":"Bot","firstMessage":"Hi"}"#)
            .create_async()
            .await;

        let resource = AssistantResource::new(create_test_client(&server.url()));
        let config = config(&[
            ("name", Dynamic::from("Bot")),
            ("first_message", Dynamic::Null),
        ]);
        let mut current_state = State::new();
        current_state.insert("id", "abc123");
        current_state.insert("name", "Bot");
        current_state.insert("first_message", "Hi");
        let mut planned_state = config.clone();
        planned_state.insert("id", "abc123");

        let response = resource
            .update(UpdateRequest {
                config,
                planned_state,
                current_state,
            })
            .await;

        assert!(!response.diagnostics.has_errors());
        // remote keeps the old value; the next refresh surfaces it
        assert_eq!(response.state.get_string("first_message"), Some("Hi"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn resource_delete_tolerates_not_found() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/assistant/abc123")
            .with_status(404)
            .create_async()
            .await;

        let resource = AssistantResource::new(create_test_client(&server.url()));
        let mut current_state = State::new();
        current_state.insert("id", "abc123");

        let response = resource.delete(DeleteRequest { current_state }).await;

        assert!(!response.diagnostics.has_errors());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn resource_imports_by_id() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/assistant/abc123")
            .with_body(r#"{"id":"abc123","name":"Imported","firstMessage":"Hello"}"#)
            .create_async()
            .await;

        let resource = AssistantResource::new(create_test_client(&server.url()));
        let response = resource
            .import_state(ImportRequest {
                id: "abc123".to_string(),
            })
            .await;

        let state = response.state.unwrap();
        assert_eq!(state.get_string("id"), Some("abc123"));
        assert_eq!(state.get_string("name"), Some("Imported"));
        assert_eq!(state.get_string("first_message"), Some("Hello"));
    }
}
