use ratatui::widgets::ListState;
use tokio::sync::mpsc;
use tracing::debug;
use cinerec_core::{
    Call, Config, Controller, CredentialStore, FileCredentialStore, HistoryKind,
    HttpTransport, MemoryCredentialStore, Reply, Transport, ViewState,
};

pub type Store = Box<dyn CredentialStore + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Main,
    History,
}

/// Editable fields, in Tab order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Email,
    Password,
    TopUp,
    Prompt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModalField {
    #[default]
    Email,
    Password,
}

pub struct App {
    pub should_quit: bool,
    pub screen: Screen,
    pub focus: Field,
    pub modal_focus: ModalField,

    pub controller: Controller<Store>,
    pub transport: HttpTransport,
    replies: mpsc::UnboundedSender<Reply>,
    /// Calls sent and not yet applied
    pub in_flight: usize,

    // Animation state
    pub animation_frame: u8,

    pub history_state: ListState,

    // Recommendation cards scrolling (sizes are filled in by the renderer)
    pub movies_scroll: u16,
    pub movies_lines: u16,
    pub movies_height: u16,
}

impl App {
    pub fn new(config: &Config, replies: mpsc::UnboundedSender<Reply>) -> anyhow::Result<Self> {
        let store: Store = if config.remember_credentials {
            Box::new(FileCredentialStore::in_config_dir()?)
        } else {
            Box::new(MemoryCredentialStore::new())
        };

        Ok(Self::with_store(store, HttpTransport::new(&config.api_url()), config.top, replies))
    }

    pub fn with_store(
        store: Store,
        transport: HttpTransport,
        top: u32,
        replies: mpsc::UnboundedSender<Reply>,
    ) -> Self {
        Self {
            should_quit: false,
            screen: Screen::Main,
            focus: Field::Email,
            modal_focus: ModalField::default(),
            controller: Controller::new(store, top),
            transport,
            replies,
            in_flight: 0,
            animation_frame: 0,
            history_state: ListState::default(),
            movies_scroll: 0,
            movies_lines: 0,
            movies_height: 0,
        }
    }

    pub fn view(&self) -> &ViewState {
        self.controller.view()
    }

    /// Health check plus session restore
    pub fn start(&mut self) {
        let health = self.controller.check_health();
        self.send(Some(health));
        let restore = self.controller.init();
        self.send(restore);
        self.ensure_focus();
    }

    /// Send a call in the background; the reply comes back through the channel.
    /// Nothing stops two calls of the same kind from overlapping.
    pub fn send(&mut self, call: Option<Call>) {
        let Some(call) = call else {
            return;
        };

        debug!(path = call.path(), "spawning call");
        self.in_flight += 1;
        let transport = self.transport.clone();
        let replies = self.replies.clone();
        tokio::spawn(async move {
            let response = transport.send(&call).await;
            // Receiver gone means we're shutting down
            let _ = replies.send(Reply::new(call, response));
        });
    }

    pub fn handle_reply(&mut self, reply: Reply) {
        self.in_flight = self.in_flight.saturating_sub(1);
        // New results start at the top
        if matches!(reply.call, Call::Predict { .. }) {
            self.movies_scroll = 0;
        }
        for call in self.controller.apply(reply) {
            self.send(Some(call));
        }

        if !self.view().is_logged_in() {
            self.screen = Screen::Main;
        }
        if self.view().modal.is_none() {
            self.modal_focus = ModalField::default();
        }
        self.ensure_focus();
    }

    /// Fields that can take focus in the current mode
    pub fn visible_fields(&self) -> &'static [Field] {
        if self.view().is_logged_in() {
            &[Field::Prompt, Field::TopUp]
        } else {
            &[Field::Email, Field::Password]
        }
    }

    pub fn ensure_focus(&mut self) {
        let fields = self.visible_fields();
        if !fields.contains(&self.focus) {
            self.focus = fields[0];
        }
    }

    pub fn focus_next(&mut self) {
        let fields = self.visible_fields();
        let i = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(i + 1) % fields.len()];
    }

    pub fn focus_prev(&mut self) {
        let fields = self.visible_fields();
        let i = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(i + fields.len() - 1) % fields.len()];
    }

    /// The text of the focused main-screen field
    pub fn focused_input(&mut self) -> &mut String {
        let view = self.controller.view_mut();
        match self.focus {
            Field::Email => &mut view.email,
            Field::Password => &mut view.password,
            Field::TopUp => &mut view.topup,
            Field::Prompt => &mut view.prompt,
        }
    }

    /// The text of the focused dialog field, if the dialog is open
    pub fn focused_modal_input(&mut self) -> Option<&mut String> {
        let focus = self.modal_focus;
        let modal = self.controller.view_mut().modal.as_mut()?;
        Some(match focus {
            ModalField::Email => &mut modal.email,
            ModalField::Password => &mut modal.password,
        })
    }

    pub fn toggle_modal_focus(&mut self) {
        self.modal_focus = match self.modal_focus {
            ModalField::Email => ModalField::Password,
            ModalField::Password => ModalField::Email,
        };
    }

    /// Action bound to Enter on the focused field
    pub fn submit(&mut self) {
        let call = match self.focus {
            Field::Email | Field::Password => self.controller.signin(),
            Field::TopUp => self.controller.top_up(),
            Field::Prompt if self.view().request_enabled() => self.controller.request_prediction(),
            Field::Prompt => None,
        };
        self.send(call);
    }

    pub fn signup(&mut self) {
        if !self.view().is_logged_in() {
            let call = self.controller.signup();
            self.send(call);
        }
    }

    pub fn logout(&mut self) {
        if self.view().is_logged_in() {
            self.controller.logout();
            self.screen = Screen::Main;
            self.movies_scroll = 0;
            self.ensure_focus();
        }
    }

    pub fn refresh_balance(&mut self) {
        if self.view().balance_card_visible() {
            let call = self.controller.refresh_balance();
            self.send(Some(call));
        }
    }

    pub fn modal_signin(&mut self) {
        let call = self.controller.modal_signin();
        self.send(call);
    }

    pub fn cancel_modal(&mut self) {
        self.controller.cancel_auth_modal();
        self.modal_focus = ModalField::default();
    }

    pub fn open_history(&mut self, kind: HistoryKind) {
        let call = self.controller.open_history(kind);
        if call.is_some() {
            self.screen = Screen::History;
            self.history_state = ListState::default();
        }
        self.send(call);
    }

    pub fn history_nav_down(&mut self) {
        let len = self.view().history.rows.len();
        if len > 0 {
            let i = self.history_state.selected().unwrap_or(0);
            self.history_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn history_nav_up(&mut self) {
        let i = self.history_state.selected().unwrap_or(0);
        self.history_state.select(Some(i.saturating_sub(1)));
    }

    fn max_movies_scroll(&self) -> u16 {
        self.movies_lines.saturating_sub(self.movies_height)
    }

    pub fn scroll_movies_down(&mut self) {
        let step = (self.movies_height / 2).max(1);
        self.movies_scroll = self.movies_scroll.saturating_add(step).min(self.max_movies_scroll());
    }

    pub fn scroll_movies_up(&mut self) {
        let step = (self.movies_height / 2).max(1);
        self.movies_scroll = self.movies_scroll.saturating_sub(step);
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.in_flight > 0 {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinerec_core::{Credentials, RawResponse};

    fn app() -> (App, mpsc::UnboundedReceiver<Reply>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::with_store(
            Box::new(MemoryCredentialStore::new()),
            HttpTransport::new("http://127.0.0.1:9"),
            10,
            tx,
        );
        (app, rx)
    }

    fn logged_in_app() -> (App, mpsc::UnboundedReceiver<Reply>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let store = MemoryCredentialStore::with(Credentials::new("ann@example.com", "pw"));
        let mut app = App::with_store(Box::new(store), HttpTransport::new("http://127.0.0.1:9"), 10, tx);
        app.controller.view_mut().show_auth_status("ann@example.com");
        app.ensure_focus();
        (app, rx)
    }

    #[test]
    fn test_focus_cycles_through_visible_fields() {
        let (mut app, _rx) = app();
        assert_eq!(app.focus, Field::Email);
        app.focus_next();
        assert_eq!(app.focus, Field::Password);
        app.focus_next();
        assert_eq!(app.focus, Field::Email);
        app.focus_prev();
        assert_eq!(app.focus, Field::Password);
    }

    #[test]
    fn test_focus_moves_to_logged_in_fields() {
        let (app, _rx) = logged_in_app();
        assert_eq!(app.focus, Field::Prompt);
        assert_eq!(app.visible_fields(), &[Field::Prompt, Field::TopUp]);
    }

    #[test]
    fn test_submit_with_empty_form_sends_nothing() {
        let (mut app, _rx) = app();
        app.submit();
        assert_eq!(app.in_flight, 0);
        assert_eq!(app.view().auth_msg, "Enter email & password");
    }

    #[test]
    fn test_open_history_needs_login() {
        let (mut app, _rx) = app();
        app.open_history(HistoryKind::Transactions);
        assert_eq!(app.screen, Screen::Main);
        assert_eq!(app.in_flight, 0);
    }

    #[tokio::test]
    async fn test_reply_applies_and_spawns_follow_up() {
        let (mut app, _rx) = logged_in_app();
        app.controller.view_mut().prompt = "space operas".to_string();
        let call = app.controller.request_prediction().unwrap();
        app.in_flight = 1;
        app.movies_scroll = 12;

        app.handle_reply(Reply::new(call, Ok(RawResponse::new(200, r#"[{"title": "Dune"}]"#))));

        assert_eq!(app.view().movies.cards()[0].title, "Dune");
        assert_eq!(app.movies_scroll, 0);
        // the balance refresh is now in flight
        assert_eq!(app.in_flight, 1);
    }

    #[test]
    fn test_movies_scroll_stops_at_last_line() {
        let (mut app, _rx) = logged_in_app();
        app.movies_lines = 30;
        app.movies_height = 20;

        app.scroll_movies_down();
        assert_eq!(app.movies_scroll, 10);
        app.scroll_movies_down();
        assert_eq!(app.movies_scroll, 10);
        app.scroll_movies_up();
        assert_eq!(app.movies_scroll, 0);
    }

    #[test]
    fn test_logout_returns_to_main_screen() {
        let (mut app, _rx) = logged_in_app();
        app.screen = Screen::History;
        app.logout();

        assert_eq!(app.screen, Screen::Main);
        assert_eq!(app.focus, Field::Email);
        assert_eq!(app.view().auth_msg, "Logged out");
    }

    #[test]
    fn test_modal_fields() {
        let (mut app, _rx) = logged_in_app();
        assert!(app.focused_modal_input().is_none());

        app.controller.open_auth_modal("Session expired. Please sign in again");
        app.focused_modal_input().unwrap().push_str("ann@example.com");
        app.toggle_modal_focus();
        app.focused_modal_input().unwrap().push_str("pw");

        let modal = app.view().modal.clone().unwrap();
        assert_eq!(modal.email, "ann@example.com");
        assert_eq!(modal.password, "pw");

        app.cancel_modal();
        assert!(app.view().modal.is_none());
        assert_eq!(app.modal_focus, ModalField::Email);
    }
}
