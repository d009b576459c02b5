use crate::config::AppConfig;
use crate::error::{ClientError, LOGIN_FAILED, REQUEST_FAILED};
use crate::utils::find_char_boundary;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

// ── Login types ─────────────────────────────────────────────────────────

/// How credentials reach the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LoginRoute {
    /// `POST {api}` with `mode: "login"` in the body.
    Shared(String),
    /// `POST {auth}` with the bare credentials.
    Dedicated(String),
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<&'a str>,
    username: &'a str,
    password: &'a str,
    campus: &'a str,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct LoginResponse {
    ok: Option<bool>,
    token: Option<String>,
    error: Option<String>,
    user: Option<LoginUser>,
    username: Option<String>,
    campus: Option<String>,
    role: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct LoginUser {
    username: Option<String>,
    campus: Option<String>,
    role: Option<String>,
}

/// What the worker granted on a successful login. Fields the worker left out
/// are `None`; the controller fills them from the submitted form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginGrant {
    pub token: String,
    pub username: Option<String>,
    pub campus: Option<String>,
    pub role: Option<String>,
}

// ── Query types ─────────────────────────────────────────────────────────

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    campus: Option<&'a str>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct QueryResponse {
    ok: Option<bool>,
    answer: Option<String>,
    error: Option<String>,
    policy: Option<RawSource>,
    source: Option<RawSource>,
}

/// Both source shapes the worker has used: `policy: {title, source|source_type, link, campus}`
/// and `source: {type, title, link}`.
#[derive(Deserialize, Default)]
#[serde(default)]
struct RawSource {
    title: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    source: Option<String>,
    source_type: Option<String>,
    link: Option<String>,
    campus: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Policy,
    Protocol,
    Handbook,
}

impl SourceKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "policy" | "policies" => Some(Self::Policy),
            "protocol" | "protocols" => Some(Self::Protocol),
            "handbook" | "parent_handbook" | "parent-handbook" | "parent handbook" => {
                Some(Self::Handbook)
            }
            _ => None,
        }
    }

    pub fn link_label(self) -> &'static str {
        match self {
            Self::Policy => "Open full policy",
            Self::Protocol => "Open full protocol",
            Self::Handbook => "Open Parent Handbook",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnswerSource {
    pub kind: Option<SourceKind>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub campus: Option<String>,
}

/// Canonical answer, independent of which response shape the worker sent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryAnswer {
    pub answer: String,
    pub source: Option<AnswerSource>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<RawSource> for AnswerSource {
    fn from(raw: RawSource) -> Self {
        let kind = [raw.kind, raw.source_type, raw.source]
            .into_iter()
            .flatten()
            .find_map(|k| SourceKind::parse(&k));
        Self {
            kind,
            title: non_empty(raw.title),
            link: non_empty(raw.link),
            campus: non_empty(raw.campus),
        }
    }
}

impl QueryResponse {
    fn into_answer(self) -> QueryAnswer {
        QueryAnswer {
            answer: self.answer.unwrap_or_default(),
            source: self.policy.or(self.source).map(AnswerSource::from),
        }
    }
}

// ── Client ──────────────────────────────────────────────────────────────

/// HTTP client for the policy worker. Cheap to clone; clones share a pool.
#[derive(Debug, Clone)]
pub struct WorkerClient {
    http: reqwest::Client,
    api_url: String,
    login_route: LoginRoute,
}

impl WorkerClient {
    pub fn new(api_url: impl Into<String>, auth_url: Option<String>) -> Self {
        let api_url = api_url.into();
        let login_route = match auth_url.filter(|u| !u.trim().is_empty()) {
            Some(url) => LoginRoute::Dedicated(url),
            None => LoginRoute::Shared(api_url.clone()),
        };
        Self {
            http: reqwest::Client::new(),
            api_url,
            login_route,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.api_url.clone(), config.auth_url.clone())
    }

    /// Exchange credentials for a token. Inputs are assumed validated.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        campus: &str,
    ) -> Result<LoginGrant, ClientError> {
        let (url, mode) = match &self.login_route {
            LoginRoute::Shared(url) => (url, Some("login")),
            LoginRoute::Dedicated(url) => (url, None),
        };
        let body = LoginRequest {
            mode,
            username,
            password,
            campus,
        };

        let resp = self.http.post(url).json(&body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        let parsed = serde_json::from_str::<LoginResponse>(&text);
        if !status.is_success() {
            let message = parsed.ok().and_then(|r| non_empty(r.error));
            return Err(ClientError::Auth(message.unwrap_or_else(|| LOGIN_FAILED.to_string())));
        }

        let data = parsed.map_err(|e| ClientError::Parse(describe_parse_error(e, &text)))?;
        if data.ok == Some(false) {
            return Err(ClientError::Auth(
                non_empty(data.error).unwrap_or_else(|| LOGIN_FAILED.to_string()),
            ));
        }
        let token = non_empty(data.token).ok_or_else(|| ClientError::Auth(LOGIN_FAILED.to_string()))?;

        let user = data.user.unwrap_or_default();
        Ok(LoginGrant {
            token,
            username: non_empty(user.username.or(data.username)),
            campus: non_empty(user.campus.or(data.campus)),
            role: non_empty(user.role.or(data.role)),
        })
    }

    /// Ask one question. A single POST, no retry and no client-side timeout.
    pub async fn query(
        &self,
        question: &str,
        campus: Option<&str>,
        token: Option<&str>,
    ) -> Result<QueryAnswer, ClientError> {
        let mut request = self.http.post(&self.api_url).json(&QueryRequest {
            query: question,
            campus,
        });
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        parse_query_response(status, &text)
    }
}

fn parse_query_response(status: StatusCode, text: &str) -> Result<QueryAnswer, ClientError> {
    let parsed = serde_json::from_str::<QueryResponse>(text);
    if !status.is_success() {
        let message = parsed.ok().and_then(|r| non_empty(r.error));
        return Err(ClientError::Api(message.unwrap_or_else(|| REQUEST_FAILED.to_string())));
    }

    let data = parsed.map_err(|e| ClientError::Parse(describe_parse_error(e, text)))?;
    if let Some(error) = non_empty(data.error.clone()) {
        return Err(ClientError::Api(error));
    }
    if data.ok == Some(false) {
        return Err(ClientError::Api(REQUEST_FAILED.to_string()));
    }
    Ok(data.into_answer())
}

fn describe_parse_error(err: serde_json::Error, raw: &str) -> String {
    format!("{} (body: {})", err, &raw[..find_char_boundary(raw, 200)])
}
