//! Blocking client for the Consul legacy ACL and agent HTTP APIs.

use std::time::Duration;

use reqwest::{Method, Url};
use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::agent::TokenSlot;
use crate::error::{ClusterError, ConnectError};
use crate::traits::{AclBackend, AgentApi, ParameterStore};
use crate::types::{AclSpec, LiveEntry};

pub const DEFAULT_ADDRESS: &str = "127.0.0.1:8500";
pub const TOKEN_HEADER: &str = "X-Consul-Token";

/// Where and how to reach the Consul agent.
#[derive(Clone)]
pub struct ConsulConfig {
    /// `host:port` or a full URL.
    pub address: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl std::fmt::Debug for ConsulConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsulConfig")
            .field("address", &self.address)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ConsulConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into()).filter(|t: &String| !t.is_empty());
        self
    }

    /// Address with a scheme and without a trailing slash.
    pub fn base_url(&self) -> String {
        let address = self.address.trim().trim_end_matches('/');
        if address.contains("://") {
            address.to_string()
        } else {
            format!("http://{address}")
        }
    }
}

#[derive(Serialize)]
struct AclBody<'a> {
    #[serde(rename = "ID", skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Type")]
    kind: &'a str,
    #[serde(rename = "Rules")]
    rules: &'a str,
}

impl<'a> AclBody<'a> {
    fn new(spec: &'a AclSpec, id: Option<&'a str>) -> Self {
        Self {
            id,
            name: &spec.name,
            kind: &spec.kind,
            rules: &spec.rules,
        }
    }
}

#[derive(Deserialize)]
struct IdResponse {
    #[serde(rename = "ID")]
    id: String,
}

#[derive(Deserialize)]
struct InfoEntry {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Type", default)]
    kind: String,
    #[serde(rename = "Rules", default)]
    rules: String,
}

impl From<InfoEntry> for LiveEntry {
    fn from(e: InfoEntry) -> Self {
        LiveEntry {
            id: e.id,
            name: e.name,
            kind: e.kind,
            rules: e.rules,
        }
    }
}

#[derive(Serialize)]
struct TokenBody<'a> {
    #[serde(rename = "Token")]
    token: &'a str,
}

/// Decode a `/v1/acl/info/<id>` body. `null` and `[]` mean no such entry.
pub fn decode_info(body: &str) -> Result<Option<LiveEntry>, ClusterError> {
    let entries: Option<Vec<InfoEntry>> = serde_json::from_str(body)?;
    Ok(entries
        .and_then(|e| e.into_iter().next())
        .map(LiveEntry::from))
}

/// Read `Stats.consul.leader` from a `/v1/agent/self` body.
pub fn decode_leader(body: &Value) -> Result<bool, ClusterError> {
    body.pointer("/Stats/consul/leader")
        .and_then(Value::as_str)
        .map(|leader| leader == "true")
        .ok_or_else(|| {
            ClusterError::UnexpectedResponse("failed to parse /agent/self stats".to_string())
        })
}

fn decode_id(body: &str) -> Result<String, ClusterError> {
    let response: IdResponse = serde_json::from_str(body)?;
    Ok(response.id)
}

#[derive(Clone)]
pub struct ConsulClient {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl std::fmt::Debug for ConsulClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsulClient")
            .field("base_url", &self.base_url())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ConsulClient {
    pub fn new(config: &ConsulConfig) -> Result<Self, ClusterError> {
        let http = Client::builder()
            .connect_timeout(config.timeout.min(Duration::from_secs(15)))
            .timeout(config.timeout)
            .build()?;
        let address = config.base_url();
        let base_url = Url::parse(&address)
            .map_err(|e| ClusterError::InvalidUrl(format!("{address}: {e}")))?;
        Ok(Self {
            http,
            base_url,
            token: config.token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// `<base>/v1/<segments>`, each segment percent-encoded on its own.
    ///
    /// `.` and `..` are refused since they cannot be carried as a segment.
    fn url(&self, segments: &[&str]) -> Result<Url, ClusterError> {
        if let Some(segment) = segments.iter().find(|s| matches!(**s, "." | "..")) {
            return Err(ClusterError::InvalidUrl(format!(
                "path segment {segment:?} is not allowed"
            )));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClusterError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("v1")
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.header(TOKEN_HEADER, token),
            None => builder,
        }
    }

    /// Send and return the body of a 2xx response.
    fn send(&self, builder: RequestBuilder, url: &Url) -> Result<String, ClusterError> {
        let response = builder.send()?;
        let status = response.status();
        let body = response.text()?;
        debug!(event = "Consul", path = url.path(), status = status.as_u16());
        if !status.is_success() {
            return Err(ClusterError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        Ok(body)
    }

    fn get(&self, segments: &[&str]) -> Result<String, ClusterError> {
        let url = self.url(segments)?;
        self.send(self.request(Method::GET, url.clone()), &url)
    }

    fn put<T: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: Option<&T>,
    ) -> Result<String, ClusterError> {
        let url = self.url(segments)?;
        let builder = self.request(Method::PUT, url.clone());
        let builder = match body {
            Some(body) => builder.json(body),
            None => builder,
        };
        self.send(builder, &url)
    }
}

/// Build a client, reading the management token from `token_param` first.
///
/// Without a token parameter the client sends no token.
pub fn connect<S: ParameterStore + ?Sized>(
    config: &ConsulConfig,
    store: &S,
    token_param: Option<&str>,
) -> Result<ConsulClient, ConnectError> {
    let mut config = config.clone();
    if let Some(param) = token_param {
        let token = store
            .get(param, true)
            .map_err(|source| ConnectError::ManagementToken {
                param: param.to_string(),
                source,
            })?;
        config = config.with_token(token);
    }
    ConsulClient::new(&config).map_err(ConnectError::Client)
}

impl AclBackend for ConsulClient {
    fn lookup(&self, id: &str) -> Result<Option<LiveEntry>, ClusterError> {
        decode_info(&self.get(&["acl", "info", id])?)
    }

    fn create(&self, spec: &AclSpec) -> Result<String, ClusterError> {
        let body = AclBody::new(spec, spec.id.as_deref());
        decode_id(&self.put(&["acl", "create"], Some(&body))?)
    }

    fn update(&self, id: &str, spec: &AclSpec) -> Result<(), ClusterError> {
        let body = AclBody::new(spec, Some(id));
        self.put(&["acl", "update"], Some(&body)).map(drop)
    }

    fn destroy(&self, id: &str) -> Result<(), ClusterError> {
        self.put::<Value>(&["acl", "destroy", id], None).map(drop)
    }

    fn is_leader(&self) -> Result<bool, ClusterError> {
        let body: Value = serde_json::from_str(&self.get(&["agent", "self"])?)?;
        decode_leader(&body)
    }
}

impl AgentApi for ConsulClient {
    fn bootstrap(&self) -> Result<String, ClusterError> {
        decode_id(&self.put::<Value>(&["acl", "bootstrap"], None)?)
    }

    fn update_agent_token(&self, slot: TokenSlot, token: &str) -> Result<(), ClusterError> {
        let body = TokenBody { token };
        self.put(&["agent", "token", slot.endpoint()], Some(&body))
            .map(drop)
    }
}
