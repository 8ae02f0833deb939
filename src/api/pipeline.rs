use std::{collections::BTreeMap, sync::Arc, time::Duration};

use serde::de::DeserializeOwned;
use url::{Url, form_urlencoded};

use crate::api::{
    error::{ApiError, identity_not_resolved, map_http_error},
    session::Session,
    signer::Signer,
    transport::{HttpMethod, HttpRequest, Transport},
    types::{ApiConfig, Envelope},
};

pub const API_VERSION: &str = "9.50.0";
pub const APP_VERSION: &str = "2.83.0";
pub const APP_CLIENT_ID: &str = "4";
pub const CHANNEL: &str = "applet";

const USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 11_3 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E217 MicroMessenger/6.8.0(0x16080000) NetType/WIFI Language/en Branch/Br_trunk MiniProgramEnv/Mac";
const REFERER: &str = "https://servicewechat.com/wx1e113254eda17715/425/page-frame.html";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Device and account fields sent with every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientProfile {
    pub device_id: String,
    pub device_token: String,
    pub open_id: String,
    pub session_token: String,
    pub city_number: String,
}

impl From<&ApiConfig> for ClientProfile {
    fn from(config: &ApiConfig) -> Self {
        Self {
            device_id: config.device_id.clone(),
            device_token: config.device_token.clone(),
            open_id: config.open_id.clone(),
            session_token: config.session_token.clone(),
            city_number: config.city_number.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderSet {
    Base,
    Authenticated,
}

/// What an endpoint contributes to a request: everything else is supplied
/// by [`RequestPipeline`].
#[derive(Debug, Clone)]
pub struct Call {
    pub operation: &'static str,
    pub method: HttpMethod,
    pub url: Url,
    pub headers: HeaderSet,
    pub fields: Vec<(String, String)>,
}

impl Call {
    pub fn get(operation: &'static str, url: Url) -> Self {
        Self {
            operation,
            method: HttpMethod::Get,
            url,
            headers: HeaderSet::Base,
            fields: Vec::new(),
        }
    }

    pub fn post(operation: &'static str, url: Url) -> Self {
        Self {
            operation,
            method: HttpMethod::Post,
            url,
            headers: HeaderSet::Base,
            fields: Vec::new(),
        }
    }

    pub fn authenticated(mut self) -> Self {
        self.headers = HeaderSet::Authenticated;
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }
}

/// Shared build, sign, send, decode and classify sequence.
pub struct RequestPipeline {
    profile: ClientProfile,
    signer: Arc<dyn Signer>,
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl RequestPipeline {
    pub fn new(
        profile: ClientProfile,
        signer: Arc<dyn Signer>,
        transport: Arc<dyn Transport>,
        timeout: Duration,
    ) -> Self {
        Self {
            profile,
            signer,
            transport,
            timeout,
        }
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn client_params(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("api_version".to_string(), API_VERSION.to_string()),
            ("app_version".to_string(), APP_VERSION.to_string()),
            ("applet_source".to_string(), String::new()),
            ("channel".to_string(), CHANNEL.to_string()),
            ("app_client_id".to_string(), APP_CLIENT_ID.to_string()),
        ])
    }

    /// Session-wide body fields; station and coordinates only when an
    /// address is bound.
    pub fn form_params(&self, session: &Session, timestamp: &str) -> BTreeMap<String, String> {
        let mut params = self.client_params();
        params.insert("uid".to_string(), session.uid().unwrap_or_default().to_string());
        params.insert("city_number".to_string(), self.profile.city_number.clone());
        params.insert("device_token".to_string(), self.profile.device_token.clone());
        params.insert("sharer_uid".to_string(), String::new());
        params.insert("s_id".to_string(), self.profile.session_token.clone());
        params.insert("openid".to_string(), self.profile.open_id.clone());
        params.insert("h5_source".to_string(), String::new());
        params.insert("time".to_string(), timestamp.to_string());

        if let Some(address) = session.address() {
            let (longitude, latitude) = address.coordinates();
            params.insert("station_id".to_string(), address.station_info.id.clone());
            params.insert(
                "city_number".to_string(),
                address.station_info.city_number.clone(),
            );
            params.insert("longitude".to_string(), longitude);
            params.insert("latitude".to_string(), latitude);
        }

        params
    }

    pub fn base_headers(&self, session: &Session, timestamp: &str) -> Vec<(String, String)> {
        vec![
            ("User-Agent".to_string(), USER_AGENT.to_string()),
            ("content-type".to_string(), FORM_CONTENT_TYPE.to_string()),
            ("Referer".to_string(), REFERER.to_string()),
            ("ddmc-api-version".to_string(), API_VERSION.to_string()),
            ("ddmc-app-client-id".to_string(), APP_CLIENT_ID.to_string()),
            ("ddmc-build-version".to_string(), APP_VERSION.to_string()),
            ("ddmc-channel".to_string(), CHANNEL.to_string()),
            ("ddmc-os-version".to_string(), "[object Undefined]".to_string()),
            ("ddmc-ip".to_string(), String::new()),
            ("ddmc-time".to_string(), timestamp.to_string()),
            ("ddmc-device-id".to_string(), self.profile.device_id.clone()),
            ("Cookie".to_string(), session.cookie().to_string()),
        ]
    }

    /// Fails fast when identity has not been resolved.
    pub fn authenticated_headers(
        &self,
        session: &Session,
        timestamp: &str,
    ) -> Result<Vec<(String, String)>, ApiError> {
        let uid = session.uid().ok_or_else(identity_not_resolved)?;

        let mut headers = self.base_headers(session, timestamp);
        headers.push(("ddmc-uid".to_string(), uid.to_string()));

        if let Some(address) = session.address() {
            let (longitude, latitude) = address.coordinates();
            headers.push((
                "ddmc-station-id".to_string(),
                address.station_info.id.clone(),
            ));
            headers.push((
                "ddmc-city-number".to_string(),
                address.station_info.city_number.clone(),
            ));
            headers.push(("ddmc-longitude".to_string(), longitude));
            headers.push(("ddmc-latitude".to_string(), latitude));
        }

        Ok(headers)
    }

    /// Appends `nars` and `sesi` computed over the complete parameter set.
    pub async fn sign(
        &self,
        mut params: BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>, ApiError> {
        let tokens = self.signer.sign(&params).await?;
        params.insert("nars".to_string(), tokens.nars);
        params.insert("sesi".to_string(), tokens.sesi);
        Ok(params)
    }

    pub fn encode_form(params: &BTreeMap<String, String>) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params.iter())
            .finish()
    }

    pub async fn build(&self, session: &Session, call: Call) -> Result<HttpRequest, ApiError> {
        // One clock reading per request: the signed `time` and `ddmc-time` agree.
        let timestamp = session.timestamp();
        let headers = match call.headers {
            HeaderSet::Base => self.base_headers(session, &timestamp),
            HeaderSet::Authenticated => self.authenticated_headers(session, &timestamp)?,
        };

        let mut url = call.url;
        let body = match call.method {
            HttpMethod::Get => {
                let mut params = self.client_params();
                params.extend(call.fields);
                url.query_pairs_mut().extend_pairs(params.iter());
                None
            }
            HttpMethod::Post => {
                let mut params = self.form_params(session, &timestamp);
                params.extend(call.fields);
                let signed = self.sign(params).await?;
                Some(Self::encode_form(&signed))
            }
        };

        Ok(HttpRequest {
            method: call.method,
            url: url.to_string(),
            headers,
            body,
            timeout: self.timeout,
        })
    }

    #[tracing::instrument(
        name = "api_execute",
        target = "api",
        skip_all,
        fields(operation = call.operation, method = call.method.as_str())
    )]
    pub async fn execute<T: DeserializeOwned>(
        &self,
        session: &Session,
        call: Call,
    ) -> Result<T, ApiError> {
        let operation = call.operation;
        let request = self
            .build(session, call)
            .await
            .map_err(|err| err.with_operation(operation))?;

        tracing::debug!(target: "api", url = %request.url, "request_started");

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|err| err.with_operation(operation))?;

        if !(200..300).contains(&response.status) {
            let err = map_http_error(response.status, &response.body).with_operation(operation);
            tracing::warn!(
                target: "api",
                status = response.status,
                retryable = err.retryable,
                "request_http_failure"
            );
            return Err(err);
        }

        let result: Result<T, ApiError> =
            Envelope::decode(&response.body).and_then(Envelope::into_result);
        match &result {
            Ok(_) => tracing::debug!(target: "api", "request_completed"),
            Err(err) => tracing::warn!(
                target: "api",
                kind = ?err.kind,
                code = ?err.code,
                message = %err.message,
                "request_rejected"
            ),
        }

        result.map_err(|err| err.with_operation(operation))
    }
}
