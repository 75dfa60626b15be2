//! Assistant API implementation

use super::VapiApiResource;
use serde::{Deserialize, Serialize};

/// Assistant as returned by the API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assistant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub first_message: Option<String>,
    #[serde(default)]
    pub model: Option<AssistantModel>,
    #[serde(default)]
    pub voice: Option<AssistantVoice>,
    #[serde(default)]
    pub client_messages: Option<Vec<String>>,
    #[serde(default)]
    pub server_messages: Option<Vec<String>>,
    #[serde(default)]
    pub silence_timeout_seconds: Option<i64>,
    #[serde(default)]
    pub max_duration_seconds: Option<i64>,
    #[serde(default)]
    pub background_sound: Option<String>,
    #[serde(default)]
    pub background_denoising_enabled: Option<bool>,
    #[serde(default)]
    pub model_output_in_messages_enabled: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Language model settings. Shared by requests and responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantModel {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion_recognition_enabled: Option<Option<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_fast_turns: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_ids: Option<Option<Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_ids: Option<Option<Vec<String>>>,
}

/// Text-to-speech settings. Shared by requests and responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantVoice {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub voice_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stability: Option<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_boost: Option<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_speaker_boost: Option<Option<bool>>,
}

/// Body for POST /assistant and PATCH /assistant/{id}
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_message: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<Option<AssistantModel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<Option<AssistantVoice>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_messages: Option<Option<Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_messages: Option<Option<Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silence_timeout_seconds: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration_seconds: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_sound: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_denoising_enabled: Option<Option<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_output_in_messages_enabled: Option<Option<bool>>,
}

impl VapiApiResource for Assistant {
    type CreateRequest = AssistantRequest;
    type UpdateRequest = AssistantRequest;

    const KIND: &'static str = "assistant";

    fn api_path() -> &'static str {
        "/assistant"
    }
}
