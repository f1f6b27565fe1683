use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use cinerec_core::HistoryKind;
use crate::app::{App, Screen};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // The dialog captures every key while it is open
    if app.view().modal.is_some() {
        handle_modal(app, key);
        return;
    }

    match app.screen {
        Screen::Main => handle_main(app, key),
        Screen::History => handle_history(app, key),
    }
}

fn handle_modal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_modal(),
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => app.toggle_modal_focus(),
        KeyCode::Enter => app.modal_signin(),
        KeyCode::Backspace => {
            if let Some(input) = app.focused_modal_input() {
                input.pop();
            }
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            if let Some(input) = app.focused_modal_input() {
                input.push(c);
            }
        }
        _ => {}
    }
}

fn handle_history(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.screen = Screen::Main,

        // Switch listing
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Left | KeyCode::Right | KeyCode::Char('h') | KeyCode::Char('l') => {
            let kind = app.view().history.kind.toggle();
            app.open_history(kind);
        }
        KeyCode::Char('r') => {
            let kind = app.view().history.kind;
            app.open_history(kind);
        }

        // Navigation
        KeyCode::Char('j') | KeyCode::Down => app.history_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.history_nav_up(),
        _ => {}
    }
}

fn handle_main(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Esc => app.should_quit = true,

        // Field focus
        KeyCode::Tab | KeyCode::Down => app.focus_next(),
        KeyCode::BackTab | KeyCode::Up => app.focus_prev(),

        KeyCode::Enter => app.submit(),

        // Recommendation cards
        KeyCode::PageDown => app.scroll_movies_down(),
        KeyCode::PageUp => app.scroll_movies_up(),

        // Actions
        KeyCode::Char('u') if ctrl => app.signup(),
        KeyCode::Char('l') if ctrl => app.logout(),
        KeyCode::Char('r') if ctrl => app.refresh_balance(),
        KeyCode::F(2) => app.open_history(HistoryKind::Transactions),

        // Editing
        KeyCode::Backspace => {
            app.focused_input().pop();
        }
        KeyCode::Char(c) if !ctrl => {
            app.focused_input().push(c);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{Field, ModalField};
    use cinerec_core::{HttpTransport, MemoryCredentialStore};
    use tokio::sync::mpsc;

    fn app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        App::with_store(
            Box::new(MemoryCredentialStore::new()),
            HttpTransport::new("http://127.0.0.1:9"),
            10,
            tx,
        )
    }

    fn press(app: &mut App, code: KeyCode) {
        handle_event(app, AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_typing_fills_focused_field() {
        let mut app = app();
        type_str(&mut app, "ann@example.com");
        press(&mut app, KeyCode::Tab);
        type_str(&mut app, "pw!");
        press(&mut app, KeyCode::Backspace);

        assert_eq!(app.view().email, "ann@example.com");
        assert_eq!(app.view().password, "pw");
        assert_eq!(app.focus, Field::Password);
    }

    #[test]
    fn test_ctrl_c_quits_even_with_dialog_open() {
        let mut app = app();
        app.controller.open_auth_modal("Session expired. Please sign in again");
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        );
        assert!(app.should_quit);
    }

    #[test]
    fn test_dialog_captures_keys() {
        let mut app = app();
        app.controller.open_auth_modal("Session expired. Please sign in again");

        type_str(&mut app, "bob@example.com");
        press(&mut app, KeyCode::Tab);
        type_str(&mut app, "x");

        let modal = app.view().modal.clone().unwrap();
        assert_eq!(modal.email, "bob@example.com");
        assert_eq!(modal.password, "x");
        assert_eq!(app.modal_focus, ModalField::Password);
        // main form untouched
        assert!(app.view().email.is_empty());

        press(&mut app, KeyCode::Esc);
        assert!(app.view().modal.is_none());
        assert!(!app.should_quit);
    }

    #[test]
    fn test_dialog_enter_with_blank_fields_shows_error() {
        let mut app = app();
        app.controller.open_auth_modal("Session expired. Please sign in again");
        press(&mut app, KeyCode::Enter);

        let modal = app.view().modal.clone().unwrap();
        assert_eq!(modal.error, "Enter email & password");
        assert_eq!(app.in_flight, 0);
    }

    #[test]
    fn test_history_key_ignored_when_logged_out() {
        let mut app = app();
        press(&mut app, KeyCode::F(2));
        assert_eq!(app.screen, Screen::Main);
    }

    #[test]
    fn test_history_screen_back() {
        let mut app = app();
        app.screen = Screen::History;
        press(&mut app, KeyCode::Char('q'));
        assert_eq!(app.screen, Screen::Main);
    }

    #[test]
    fn test_page_keys_scroll_cards() {
        let mut app = app();
        app.movies_lines = 50;
        app.movies_height = 10;

        press(&mut app, KeyCode::PageDown);
        assert_eq!(app.movies_scroll, 5);
        press(&mut app, KeyCode::PageUp);
        assert_eq!(app.movies_scroll, 0);
    }

    #[test]
    fn test_esc_quits_from_main() {
        let mut app = app();
        press(&mut app, KeyCode::Esc);
        assert!(app.should_quit);
    }
}
