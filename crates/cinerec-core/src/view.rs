//! UI-agnostic view state
//!
//! Every field the controller reads or writes lives here, so the controller
//! never touches a terminal (or any other front end) directly. A renderer
//! only has to draw this struct.

use crate::history::{HistoryKind, HistoryRow};
use crate::movie::MovieList;

pub const BALANCE_PLACEHOLDER: &str = "—";
pub const AUTH_TITLE_LOGGED_OUT: &str = "Authorisation";
pub const AUTH_TITLE_LOGGED_IN: &str = "Profile";

/// Which auth panel is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiMode {
    #[default]
    LoggedOut,
    LoggedIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    Info,
    Success,
    #[default]
    Error,
}

/// A message slot with its presentation class
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub severity: Severity,
}

impl StatusLine {
    pub fn new(text: impl Into<String>, severity: Severity) -> Self {
        Self {
            text: text.into(),
            severity,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Re-authentication dialog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthModal {
    pub message: String,
    pub email: String,
    pub password: String,
    pub error: String,
}

impl AuthModal {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryView {
    pub kind: HistoryKind,
    pub rows: Vec<HistoryRow>,
    pub error: String,
    pub loading: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    // Inputs
    pub email: String,
    pub password: String,
    pub prompt: String,
    pub topup: String,

    pub mode: UiMode,
    /// Email shown in the profile panel
    pub me_email: String,

    pub balance: String,
    pub movies: MovieList,

    // Message slots, each overwritten wholesale
    pub auth_msg: String,
    pub balance_error: String,
    pub pred_status: StatusLine,

    /// At most one dialog exists
    pub modal: Option<AuthModal>,
    pub history: HistoryView,
    /// None until the health check answers
    pub server_online: Option<bool>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            prompt: String::new(),
            topup: String::new(),
            mode: UiMode::LoggedOut,
            me_email: String::new(),
            balance: BALANCE_PLACEHOLDER.to_string(),
            movies: MovieList::Empty,
            auth_msg: String::new(),
            balance_error: String::new(),
            pred_status: StatusLine::default(),
            modal: None,
            history: HistoryView::default(),
            server_online: None,
        }
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_logged_in(&self) -> bool {
        self.mode == UiMode::LoggedIn
    }

    pub fn auth_inputs_visible(&self) -> bool {
        self.mode == UiMode::LoggedOut
    }

    pub fn auth_status_visible(&self) -> bool {
        self.mode == UiMode::LoggedIn
    }

    pub fn history_links_visible(&self) -> bool {
        self.is_logged_in()
    }

    pub fn request_enabled(&self) -> bool {
        self.is_logged_in()
    }

    pub fn balance_card_visible(&self) -> bool {
        self.is_logged_in()
    }

    pub fn auth_title(&self) -> &'static str {
        match self.mode {
            UiMode::LoggedOut => AUTH_TITLE_LOGGED_OUT,
            UiMode::LoggedIn => AUTH_TITLE_LOGGED_IN,
        }
    }

    /// Enter LoggedIn. The typed email and password are wiped from the inputs.
    pub fn show_auth_status(&mut self, email: &str) {
        self.mode = UiMode::LoggedIn;
        self.me_email = email.to_string();
        self.email.clear();
        self.password.clear();
        self.clear_messages();
    }

    /// Enter LoggedOut and reset everything the session produced.
    pub fn show_auth_inputs(&mut self) {
        self.mode = UiMode::LoggedOut;
        self.me_email.clear();
        self.clear_messages();
        self.movies = MovieList::Empty;
        self.balance = BALANCE_PLACEHOLDER.to_string();
        self.prompt.clear();
        self.topup.clear();
        self.history = HistoryView::default();
    }

    pub fn clear_messages(&mut self) {
        self.pred_status = StatusLine::default();
        self.balance_error.clear();
        self.auth_msg.clear();
    }

    pub fn set_pred_status(&mut self, text: impl Into<String>, severity: Severity) {
        self.pred_status = StatusLine::new(text, severity);
    }

    /// Open the dialog, replacing one that is already open
    pub fn open_auth_modal(&mut self, message: &str) {
        self.modal = Some(AuthModal::new(message));
    }

    pub fn close_auth_modal(&mut self) {
        self.modal = None;
    }
}
