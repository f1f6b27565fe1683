//! Calls to the recommendation service and classification of its responses

use reqwest::{header::AUTHORIZATION, Client, Method};
use serde_json::{json, Value};
use std::future::Future;
use tracing::debug;

use crate::credentials::Credentials;
use crate::error::Result;

pub const SIGNUP_PATH: &str = "/api/users/signup";
pub const SIGNIN_PATH: &str = "/api/users/signin";
pub const BALANCE_PATH: &str = "/api/users/balance";
pub const BALANCE_ADJUST_PATH: &str = "/api/users/balance/adjust";
pub const PREDICTION_PATH: &str = "/api/events/prediction/new";
pub const TRANSACTION_HISTORY_PATH: &str = "/api/users/transaction/history-auth";
pub const PREDICTION_HISTORY_PATH: &str = "/api/events/prediction/history";
pub const HEALTH_PATH: &str = "/health";

const INSUFFICIENT_FUNDS: &str = "Insufficient funds";
const INSUFFICIENT_FUNDS_FOR_PREDICTION: &str = "Insufficient funds for prediction";
// Markers the backend puts in its 402 detail ("Balance: .., required: ..")
const BALANCE_MARKER: &str = "Баланс:";
const REQUIRED_MARKER: &str = "требуется:";

/// One request to the service. `auth` is the full Authorization header value,
/// computed from the credential store when the call is created.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Signup(Credentials),
    Signin(Credentials),
    /// Same endpoint as `Signin`, issued from the re-authentication dialog
    ModalSignin(Credentials),
    Balance { auth: Option<String> },
    TopUp { auth: Option<String>, email: String, amount: f64 },
    Predict { auth: Option<String>, message: String, top: u32 },
    TransactionHistory { auth: Option<String> },
    PredictionHistory { auth: Option<String> },
    Health,
}

impl Call {
    pub fn method(&self) -> Method {
        match self {
            Call::Balance { .. }
            | Call::TransactionHistory { .. }
            | Call::PredictionHistory { .. }
            | Call::Health => Method::GET,
            _ => Method::POST,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Call::Signup(_) => SIGNUP_PATH,
            Call::Signin(_) | Call::ModalSignin(_) => SIGNIN_PATH,
            Call::Balance { .. } => BALANCE_PATH,
            Call::TopUp { .. } => BALANCE_ADJUST_PATH,
            Call::Predict { .. } => PREDICTION_PATH,
            Call::TransactionHistory { .. } => TRANSACTION_HISTORY_PATH,
            Call::PredictionHistory { .. } => PREDICTION_HISTORY_PATH,
            Call::Health => HEALTH_PATH,
        }
    }

    /// Query string pairs; values are percent-encoded by the transport
    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Call::Predict { message, top, .. } => {
                vec![("message", message.clone()), ("top", top.to_string())]
            }
            _ => Vec::new(),
        }
    }

    /// JSON body, if the endpoint takes one
    pub fn body(&self) -> Option<Value> {
        match self {
            Call::Signup(c) | Call::Signin(c) | Call::ModalSignin(c) => {
                Some(json!({ "email": c.email, "password": c.password }))
            }
            Call::TopUp { email, amount, .. } => Some(json!({ "email": email, "amount": amount })),
            _ => None,
        }
    }

    pub fn auth(&self) -> Option<&str> {
        match self {
            Call::Balance { auth }
            | Call::TopUp { auth, .. }
            | Call::Predict { auth, .. }
            | Call::TransactionHistory { auth }
            | Call::PredictionHistory { auth } => auth.as_deref(),
            _ => None,
        }
    }
}

/// Status and body text of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a [`Call`]. Non-2xx statuses are a successful send.
pub trait Transport {
    fn send(&self, call: &Call) -> impl Future<Output = Result<RawResponse>> + Send;
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Transport for HttpTransport {
    fn send(&self, call: &Call) -> impl Future<Output = Result<RawResponse>> + Send {
        let url = format!("{}{}", self.base_url, call.path());
        let mut request = self.client.request(call.method(), &url);

        let query = call.query();
        if !query.is_empty() {
            request = request.query(&query);
        }
        if let Some(auth) = call.auth() {
            request = request.header(AUTHORIZATION, auth);
        }
        if let Some(body) = call.body() {
            request = request.json(&body);
        }

        let method = call.method();
        async move {
            debug!(%method, %url, "sending request");
            let response = request.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            debug!(%method, %url, status, "response received");
            Ok(RawResponse { status, body })
        }
    }
}

/// What a response means to the caller
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome<T> {
    Ok(T),
    /// 401: credentials no longer accepted
    AuthExpired,
    /// 402: carries the text to show the user
    InsufficientFunds(String),
    /// Any other non-2xx: carries the server's message
    RequestFailed(String),
}

pub fn classify(response: &RawResponse) -> ApiOutcome<&str> {
    if response.is_success() {
        return ApiOutcome::Ok(&response.body);
    }

    match response.status {
        401 => ApiOutcome::AuthExpired,
        402 => ApiOutcome::InsufficientFunds(insufficient_funds_message(&error_message(
            &response.body,
        ))),
        _ => ApiOutcome::RequestFailed(error_message(&response.body)),
    }
}

/// `detail`, then `message`, then the whole JSON document; raw text if it isn't JSON
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => message_field(&value, "detail")
            .or_else(|| message_field(&value, "message"))
            .unwrap_or_else(|| value.to_string()),
        Err(_) => body.to_string(),
    }
}

fn message_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn insufficient_funds_message(detail: &str) -> String {
    if detail.contains(BALANCE_MARKER) && detail.contains(REQUIRED_MARKER) {
        INSUFFICIENT_FUNDS_FOR_PREDICTION.to_string()
    } else if detail.is_empty() {
        INSUFFICIENT_FUNDS.to_string()
    } else {
        detail.to_string()
    }
}

/// Text form of a JSON scalar for display: strings unquoted, whole floats
/// without a trailing `.0`. Null gives None.
pub fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            (_, _, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{:.0}", f),
            (_, _, Some(f)) => f.to_string(),
            _ => n.to_string(),
        }),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_success_passes_body_through() {
        let response = RawResponse::new(200, "[]");
        assert_eq!(classify(&response), ApiOutcome::Ok("[]"));
        assert_eq!(classify(&RawResponse::new(201, "{}")), ApiOutcome::Ok("{}"));
    }

    #[test]
    fn test_classify_401_is_auth_expired() {
        let response = RawResponse::new(401, r#"{"detail":"Not authenticated"}"#);
        assert_eq!(classify(&response), ApiOutcome::AuthExpired);
    }

    #[test]
    fn test_classify_402_uses_detail() {
        let response = RawResponse::new(402, r#"{"detail":"insufficient funds"}"#);
        assert_eq!(
            classify(&response),
            ApiOutcome::InsufficientFunds("insufficient funds".to_string())
        );
    }

    #[test]
    fn test_classify_402_backend_balance_detail_is_replaced() {
        let response = RawResponse::new(
            402,
            r#"{"detail":"Недостаточно средств. Баланс: 5.0, требуется: 10.0"}"#,
        );
        assert_eq!(
            classify(&response),
            ApiOutcome::InsufficientFunds("Insufficient funds for prediction".to_string())
        );
    }

    #[test]
    fn test_classify_402_plain_text_and_empty_body() {
        assert_eq!(
            classify(&RawResponse::new(402, "pay up")),
            ApiOutcome::InsufficientFunds("pay up".to_string())
        );
        assert_eq!(
            classify(&RawResponse::new(402, "")),
            ApiOutcome::InsufficientFunds("Insufficient funds".to_string())
        );
    }

    #[test]
    fn test_error_message_fallback_chain() {
        assert_eq!(error_message(r#"{"detail":"d","message":"m"}"#), "d");
        assert_eq!(error_message(r#"{"message":"m"}"#), "m");
        assert_eq!(error_message(r#"{"detail":"","message":"m"}"#), "m");
        assert_eq!(error_message(r#"{"code":7}"#), r#"{"code":7}"#);
        assert_eq!(error_message("Internal Server Error"), "Internal Server Error");
    }

    #[test]
    fn test_error_message_structured_detail_is_serialized() {
        let body = r#"{"detail":[{"loc":["query","message"],"msg":"field required"}]}"#;
        assert_eq!(
            error_message(body),
            r#"[{"loc":["query","message"],"msg":"field required"}]"#
        );
    }

    #[test]
    fn test_classify_other_failure() {
        let response = RawResponse::new(500, r#"{"detail":"Error creating user"}"#);
        assert_eq!(
            classify(&response),
            ApiOutcome::RequestFailed("Error creating user".to_string())
        );
    }

    #[test]
    fn test_prediction_call_shape() {
        let call = Call::Predict {
            auth: Some("Basic abc".to_string()),
            message: "space & time".to_string(),
            top: 10,
        };
        assert_eq!(call.method(), Method::POST);
        assert_eq!(call.path(), "/api/events/prediction/new");
        assert_eq!(
            call.query(),
            vec![("message", "space & time".to_string()), ("top", "10".to_string())]
        );
        assert_eq!(call.body(), None);
        assert_eq!(call.auth(), Some("Basic abc"));
    }

    #[test]
    fn test_auth_calls_never_carry_header() {
        let call = Call::Signin(Credentials::new("a@b.c", "pw"));
        assert_eq!(call.auth(), None);
        assert_eq!(call.body(), Some(json!({"email": "a@b.c", "password": "pw"})));
        assert_eq!(Call::ModalSignin(Credentials::default()).path(), SIGNIN_PATH);
    }

    #[test]
    fn test_top_up_body() {
        let call = Call::TopUp {
            auth: None,
            email: "a@b.c".to_string(),
            amount: 12.5,
        };
        assert_eq!(call.path(), BALANCE_ADJUST_PATH);
        assert_eq!(call.body(), Some(json!({"email": "a@b.c", "amount": 12.5})));
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!(42.5)).as_deref(), Some("42.5"));
        assert_eq!(display_value(&json!(100.0)).as_deref(), Some("100"));
        assert_eq!(display_value(&json!(2020)).as_deref(), Some("2020"));
        assert_eq!(display_value(&json!("1999")).as_deref(), Some("1999"));
        assert_eq!(display_value(&json!(true)).as_deref(), Some("true"));
        assert_eq!(display_value(&Value::Null), None);
    }

    #[test]
    fn test_http_transport_trims_trailing_slash() {
        assert_eq!(HttpTransport::new("http://localhost:8080/").base_url(), "http://localhost:8080");
    }
}
