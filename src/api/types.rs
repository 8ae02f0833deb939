use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::api::error::{ApiError, business_error, protocol_error};

pub const DEFAULT_USER_BASE_URL: &str = "https://sunquan.api.ddxq.mobi";
pub const DEFAULT_MALL_BASE_URL: &str = "https://maicai.api.ddxq.mobi";

fn default_user_base_url() -> String {
    DEFAULT_USER_BASE_URL.to_string()
}

fn default_mall_base_url() -> String {
    DEFAULT_MALL_BASE_URL.to_string()
}

fn default_city_number() -> String {
    "0101".to_string()
}

fn default_request_timeout() -> String {
    "10s".to_string()
}

fn default_sign_command_program() -> String {
    "node".to_string()
}

fn default_sign_command_args() -> Vec<String> {
    vec!["./sign.js".to_string()]
}

fn default_sign_timeout() -> String {
    "3s".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub cookie: String,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub device_token: String,
    #[serde(default)]
    pub open_id: String,
    /// Mini-program session id, sent as `s_id`.
    #[serde(default)]
    pub session_token: String,
    #[serde(default = "default_city_number")]
    pub city_number: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
    /// Fixed unix-seconds timestamp used instead of the system clock.
    #[serde(default)]
    pub debug_time: Option<String>,
    #[serde(default)]
    pub base_urls: BaseUrls,
    #[serde(default)]
    pub signer: SignerConfig,
}

impl ApiConfig {
    pub fn with_cookie(cookie: impl Into<String>) -> Self {
        Self {
            cookie: cookie.into(),
            device_id: String::new(),
            device_token: String::new(),
            open_id: String::new(),
            session_token: String::new(),
            city_number: default_city_number(),
            request_timeout: default_request_timeout(),
            debug_time: None,
            base_urls: BaseUrls::default(),
            signer: SignerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BaseUrls {
    #[serde(default = "default_user_base_url")]
    pub user: String,
    #[serde(default = "default_mall_base_url")]
    pub mall: String,
}

impl BaseUrls {
    pub fn uniform(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            user: base.clone(),
            mall: base,
        }
    }
}

impl Default for BaseUrls {
    fn default() -> Self {
        Self {
            user: default_user_base_url(),
            mall: default_mall_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignerConfig {
    Md5 {
        #[serde(default)]
        salt: String,
    },
    Command {
        #[serde(default = "default_sign_command_program")]
        program: String,
        #[serde(default = "default_sign_command_args")]
        args: Vec<String>,
        #[serde(default = "default_sign_timeout")]
        timeout: String,
    },
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self::Command {
            program: default_sign_command_program(),
            args: default_sign_command_args(),
            timeout: default_sign_timeout(),
        }
    }
}

/// Uniform wrapper around every backend response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub success: bool,
    #[serde(default)]
    pub code: i64,
    #[serde(default, alias = "msg")]
    pub message: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn decode(body: &str) -> Result<Self, ApiError> {
        serde_json::from_str(body)
            .map_err(|err| protocol_error(format!("failed to decode response envelope: {}", err)))
    }

    /// Business failure when `success` is false, otherwise the payload
    /// decoded into `T`.
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        if !self.success {
            return Err(business_error(self.code, self.message));
        }

        serde_json::from_value(self.data)
            .map_err(|err| protocol_error(format!("failed to decode response payload: {}", err)))
    }
}
