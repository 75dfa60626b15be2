//! Phone number API implementation

use super::VapiApiResource;
use serde::{Deserialize, Serialize};

/// Phone number as returned by the API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumber {
    pub id: String,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub assistant_id: Option<String>,
    #[serde(default)]
    pub squad_id: Option<String>,
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default)]
    pub server_url_secret: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub twilio_account_sid: Option<String>,
    #[serde(default)]
    pub twilio_auth_token: Option<String>,
    #[serde(default)]
    pub vonage_api_key: Option<String>,
    #[serde(default)]
    pub vonage_api_secret: Option<String>,
    #[serde(default)]
    pub vonage_application_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Body for POST /phone-number
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePhoneNumberRequest {
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub squad_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url_secret: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twilio_account_sid: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twilio_auth_token: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vonage_api_key: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vonage_api_secret: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vonage_application_id: Option<Option<String>>,
}

/// Body for PATCH /phone-number/{id}. The number itself cannot change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePhoneNumberRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub squad_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url_secret: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twilio_account_sid: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twilio_auth_token: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vonage_api_key: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vonage_api_secret: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vonage_application_id: Option<Option<String>>,
}

impl VapiApiResource for PhoneNumber {
    type CreateRequest = CreatePhoneNumberRequest;
    type UpdateRequest = UpdatePhoneNumberRequest;

    const KIND: &'static str = "phone number";

    fn api_path() -> &'static str {
        "/phone-number"
    }
}
