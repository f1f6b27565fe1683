//! The view controller
//!
//! Each user action is split in two: a synchronous step that validates input,
//! updates the view and hands back the [`Call`] to make, and [`Controller::apply`],
//! which takes the finished [`Reply`] and returns any follow-up calls (usually a
//! balance refresh). [`Controller::run`] drives a call and its follow-ups in
//! order; a front end that wants overlapping requests can send the calls itself
//! and feed the replies back in whatever order they complete.

use regex::Regex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::api::{classify, display_value, ApiOutcome, Call, RawResponse, Transport};
use crate::credentials::{self, resolve_credentials, CredentialStore, Credentials};
use crate::error::Result;
use crate::history::{parse_history, HistoryKind};
use crate::movie::{render_movies, MovieList};
use crate::view::{HistoryView, Severity, StatusLine, ViewState, BALANCE_PLACEHOLDER};

pub const BALANCE_KEY: &str = "Current balance";

pub const ENTER_CREDENTIALS: &str = "Enter email & password";
pub const SIGNUP_FAILED: &str = "Signup failed";
pub const SIGNIN_FAILED: &str = "Signin failed";
pub const LOGGED_OUT: &str = "Logged out";
pub const UNABLE_TO_FETCH_BALANCE: &str = "Unable to fetch balance";
pub const ERROR_PARSING_RESPONSE: &str = "Error parsing response";
pub const ENTER_AMOUNT: &str = "Enter amount & be logged in";
pub const TOP_UP_FAILED: &str = "Top up failed";
pub const ENTER_REQUEST: &str = "Enter your request";
pub const PROCESSING: &str = "Processing...";
pub const SESSION_EXPIRED: &str = "Session expired. Please sign in again";
pub const NO_RECOMMENDATIONS_FOUND: &str = "No recommendations found";
pub const RECOMMENDATIONS_READY: &str = "Recommendations ready!";
pub const UNABLE_TO_FETCH_HISTORY: &str = "Unable to fetch history";

/// A finished call: what was asked and what came back
#[derive(Debug)]
pub struct Reply {
    pub call: Call,
    pub response: Result<RawResponse>,
}

impl Reply {
    pub fn new(call: Call, response: Result<RawResponse>) -> Self {
        Self { call, response }
    }
}

#[derive(Debug, Clone, Copy)]
enum AuthAction {
    Signup,
    Signin,
}

impl AuthAction {
    fn name(self) -> &'static str {
        match self {
            AuthAction::Signup => "signup",
            AuthAction::Signin => "signin",
        }
    }

    fn failure_message(self) -> &'static str {
        match self {
            AuthAction::Signup => SIGNUP_FAILED,
            AuthAction::Signin => SIGNIN_FAILED,
        }
    }
}

pub struct Controller<S> {
    store: S,
    view: ViewState,
    top: u32,
}

impl<S: CredentialStore> Controller<S> {
    pub fn new(store: S, top: u32) -> Self {
        Self {
            store,
            view: ViewState::new(),
            top,
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// Input fields are edited directly by the front end
    pub fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Stored credentials, falling back to the login form
    pub fn credentials(&self) -> Credentials {
        resolve_credentials(&self.store, &self.view.email, &self.view.password)
    }

    fn current_auth(&self) -> Option<String> {
        credentials::auth_header(&self.credentials())
    }

    fn remember(&mut self, creds: &Credentials) {
        if let Err(e) = self.store.set(creds) {
            warn!(error = %e, "could not persist credentials");
        }
    }

    /// Page-load: resume a saved session if both values are stored
    pub fn init(&mut self) -> Option<Call> {
        let stored = self.store.load().unwrap_or_else(|e| {
            warn!(error = %e, "credential store unavailable at start-up");
            Credentials::default()
        });

        if stored.is_complete() {
            info!(email = %stored.email, "resuming saved session");
            self.view.show_auth_status(&stored.email);
            Some(self.refresh_balance())
        } else {
            self.view.clear_messages();
            self.view.movies = MovieList::Empty;
            self.view.balance = BALANCE_PLACEHOLDER.to_string();
            None
        }
    }

    pub fn check_health(&self) -> Call {
        Call::Health
    }

    pub fn signup(&mut self) -> Option<Call> {
        self.form_credentials().map(Call::Signup)
    }

    pub fn signin(&mut self) -> Option<Call> {
        self.form_credentials().map(Call::Signin)
    }

    fn form_credentials(&mut self) -> Option<Credentials> {
        let creds = Credentials::new(self.view.email.clone(), self.view.password.clone());
        if !creds.is_complete() {
            self.view.auth_msg = ENTER_CREDENTIALS.to_string();
            return None;
        }
        Some(creds)
    }

    pub fn refresh_balance(&mut self) -> Call {
        self.view.balance_error.clear();
        Call::Balance {
            auth: self.current_auth(),
        }
    }

    pub fn top_up(&mut self) -> Option<Call> {
        self.view.balance_error.clear();

        // A blank field counts as 0, and 0 is rejected along with "not logged in"
        let amount = parse_amount(&self.view.topup).unwrap_or(0.0);
        let creds = self.credentials();
        if creds.email.is_empty() || amount == 0.0 {
            self.view.balance_error = ENTER_AMOUNT.to_string();
            return None;
        }

        Some(Call::TopUp {
            auth: credentials::auth_header(&creds),
            email: creds.email,
            amount,
        })
    }

    pub fn request_prediction(&mut self) -> Option<Call> {
        self.view.set_pred_status("", Severity::Error);

        let message = self.view.prompt.trim().to_string();
        if message.is_empty() {
            self.view.set_pred_status(ENTER_REQUEST, Severity::Error);
            return None;
        }

        self.view.set_pred_status(PROCESSING, Severity::Info);
        Some(Call::Predict {
            auth: self.current_auth(),
            message,
            top: self.top,
        })
    }

    pub fn logout(&mut self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "could not clear stored credentials");
        }
        self.view.show_auth_inputs();
        self.view.auth_msg = LOGGED_OUT.to_string();
        info!("logged out");
    }

    pub fn open_auth_modal(&mut self, message: &str) {
        self.view.open_auth_modal(message);
    }

    pub fn cancel_auth_modal(&mut self) {
        self.view.close_auth_modal();
    }

    /// Sign in from the dialog. No-op when the dialog isn't open.
    pub fn modal_signin(&mut self) -> Option<Call> {
        let modal = self.view.modal.as_mut()?;
        let creds = Credentials::new(modal.email.clone(), modal.password.clone());
        if !creds.is_complete() {
            modal.error = ENTER_CREDENTIALS.to_string();
            return None;
        }
        Some(Call::ModalSignin(creds))
    }

    /// Load a history listing; only available while logged in
    pub fn open_history(&mut self, kind: HistoryKind) -> Option<Call> {
        if !self.view.history_links_visible() {
            return None;
        }

        self.view.history = HistoryView {
            kind,
            loading: true,
            ..HistoryView::default()
        };
        let auth = self.current_auth();
        Some(match kind {
            HistoryKind::Transactions => Call::TransactionHistory { auth },
            HistoryKind::Predictions => Call::PredictionHistory { auth },
        })
    }

    /// Fold a finished call into the view. Returns the calls it triggers.
    pub fn apply(&mut self, reply: Reply) -> Vec<Call> {
        let Reply { call, response } = reply;
        debug!(path = call.path(), "applying reply");

        match call {
            Call::Signup(creds) => self.apply_auth(AuthAction::Signup, creds, response),
            Call::Signin(creds) => self.apply_auth(AuthAction::Signin, creds, response),
            Call::ModalSignin(creds) => self.apply_modal_signin(creds, response),
            Call::Balance { .. } => {
                self.apply_balance(response);
                Vec::new()
            }
            Call::TopUp { .. } => self.apply_top_up(response),
            Call::Predict { .. } => self.apply_prediction(response),
            Call::TransactionHistory { .. } => self.apply_history(HistoryKind::Transactions, response),
            Call::PredictionHistory { .. } => self.apply_history(HistoryKind::Predictions, response),
            Call::Health => {
                self.view.server_online = Some(matches!(&response, Ok(r) if r.is_success()));
                Vec::new()
            }
        }
    }

    /// Send `call`, apply the reply, then do the same for every follow-up
    pub async fn run<T: Transport>(&mut self, transport: &T, call: Call) {
        let mut pending = VecDeque::from([call]);
        while let Some(call) = pending.pop_front() {
            let response = transport.send(&call).await;
            pending.extend(self.apply(Reply::new(call, response)));
        }
    }

    /// [`run`](Self::run) for the `Option<Call>` the action methods return
    pub async fn dispatch<T: Transport>(&mut self, transport: &T, call: Option<Call>) {
        if let Some(call) = call {
            self.run(transport, call).await;
        }
    }

    fn apply_auth(
        &mut self,
        action: AuthAction,
        creds: Credentials,
        response: Result<RawResponse>,
    ) -> Vec<Call> {
        let Some(response) = delivered(action.name(), response) else {
            return Vec::new();
        };

        match classify(&response) {
            ApiOutcome::Ok(_) => {
                info!(email = %creds.email, action = action.name(), "authenticated");
                self.remember(&creds);
                self.view.show_auth_status(&creds.email);
                vec![self.refresh_balance()]
            }
            _ => {
                warn!(status = response.status, action = action.name(), "authentication rejected");
                self.view.auth_msg = action.failure_message().to_string();
                self.view.pred_status = StatusLine::default();
                self.view.balance_error.clear();
                Vec::new()
            }
        }
    }

    fn apply_modal_signin(&mut self, creds: Credentials, response: Result<RawResponse>) -> Vec<Call> {
        let Some(response) = delivered("modal signin", response) else {
            return Vec::new();
        };

        match classify(&response) {
            ApiOutcome::Ok(_) => {
                info!(email = %creds.email, "re-authenticated");
                self.remember(&creds);
                self.view.show_auth_status(&creds.email);
                let refresh = self.refresh_balance();
                self.view.close_auth_modal();
                self.view.pred_status = StatusLine::default();
                self.view.balance_error.clear();
                vec![refresh]
            }
            _ => {
                if let Some(modal) = self.view.modal.as_mut() {
                    modal.error = SIGNIN_FAILED.to_string();
                }
                Vec::new()
            }
        }
    }

    fn apply_balance(&mut self, response: Result<RawResponse>) {
        let Some(response) = delivered("balance", response) else {
            return;
        };

        let ApiOutcome::Ok(body) = classify(&response) else {
            self.view.balance_error = UNABLE_TO_FETCH_BALANCE.to_string();
            return;
        };

        match balance_from_body(body) {
            Ok(balance) => {
                self.view.balance = balance;
                self.view.balance_error.clear();
            }
            Err(e) => {
                warn!(error = %e, "balance response is not JSON");
                self.view.balance_error = ERROR_PARSING_RESPONSE.to_string();
            }
        }
    }

    fn apply_top_up(&mut self, response: Result<RawResponse>) -> Vec<Call> {
        let Some(response) = delivered("top up", response) else {
            return Vec::new();
        };

        if !response.is_success() {
            self.view.balance_error = TOP_UP_FAILED.to_string();
            return Vec::new();
        }

        self.view.topup.clear();
        self.view.balance_error.clear();
        vec![self.refresh_balance()]
    }

    fn apply_prediction(&mut self, response: Result<RawResponse>) -> Vec<Call> {
        // The one flow that reports transport failures to the user
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                self.view.set_pred_status(format!("Error: {}", e), Severity::Error);
                return Vec::new();
            }
        };

        match classify(&response) {
            ApiOutcome::AuthExpired => {
                self.view.pred_status = StatusLine::default();
                self.view.open_auth_modal(SESSION_EXPIRED);
                Vec::new()
            }
            ApiOutcome::InsufficientFunds(message) => {
                self.view.set_pred_status(message, Severity::Error);
                vec![self.refresh_balance()]
            }
            ApiOutcome::RequestFailed(message) => {
                self.view.set_pred_status(format!("Error: {}", message), Severity::Error);
                Vec::new()
            }
            ApiOutcome::Ok(body) => self.show_recommendations(body),
        }
    }

    fn show_recommendations(&mut self, body: &str) -> Vec<Call> {
        let data: Value = match serde_json::from_str(body) {
            Ok(data) => data,
            Err(e) => {
                self.view.set_pred_status(format!("Error: {}", e), Severity::Error);
                return Vec::new();
            }
        };

        // An empty result is reported with error styling
        if matches!(&data, Value::Array(items) if items.is_empty()) {
            self.view.set_pred_status(NO_RECOMMENDATIONS_FOUND, Severity::Error);
            return Vec::new();
        }

        self.view.movies = render_movies(&data);
        self.view.set_pred_status(RECOMMENDATIONS_READY, Severity::Success);
        self.view.prompt.clear();
        vec![self.refresh_balance()]
    }

    fn apply_history(&mut self, kind: HistoryKind, response: Result<RawResponse>) -> Vec<Call> {
        // A late reply for the other tab is dropped
        if self.view.history.kind != kind {
            return Vec::new();
        }
        self.view.history.loading = false;

        let Some(response) = delivered("history", response) else {
            return Vec::new();
        };

        match classify(&response) {
            ApiOutcome::Ok(body) => match parse_history(kind, body) {
                Ok(rows) => {
                    self.view.history.rows = rows;
                    self.view.history.error.clear();
                }
                Err(e) => {
                    warn!(error = %e, "history response is not JSON");
                    self.view.history.error = ERROR_PARSING_RESPONSE.to_string();
                }
            },
            ApiOutcome::AuthExpired => self.view.open_auth_modal(SESSION_EXPIRED),
            _ => self.view.history.error = UNABLE_TO_FETCH_HISTORY.to_string(),
        }
        Vec::new()
    }
}

/// Unwrap a response for the flows that don't report transport failures.
/// Those are only logged and leave the view as it was.
fn delivered(flow: &str, response: Result<RawResponse>) -> Option<RawResponse> {
    match response {
        Ok(response) => Some(response),
        Err(e) => {
            warn!(flow, error = %e, "request failed without a response");
            None
        }
    }
}

/// The balance field of a balance response, or the placeholder when absent
pub fn balance_from_body(body: &str) -> Result<String> {
    let value: Value = serde_json::from_str(body)?;
    Ok(value
        .get(BALANCE_KEY)
        .and_then(display_value)
        .unwrap_or_else(|| BALANCE_PLACEHOLDER.to_string()))
}

static AMOUNT_RE: OnceLock<Regex> = OnceLock::new();

fn amount_regex() -> &'static Regex {
    AMOUNT_RE.get_or_init(|| {
        // Leading decimal number; anything after it is ignored
        let pattern = r"^\s*[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?";
        Regex::new(pattern).unwrap_or_else(|error| panic!("amount regex failed to compile: {error}"))
    })
}

/// Parse the leading number of a top-up field. None when there isn't one.
pub fn parse_amount(input: &str) -> Option<f64> {
    let matched = amount_regex().find(input)?;
    matched.as_str().trim().parse().ok()
}
