use ratatui::{
    layout::{Constraint, Layout, Margin, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{
        Block, Borders, Clear, List, ListItem, Paragraph, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Wrap,
    },
    Frame,
};
use cinerec_core::{movie::NO_RECOMMENDATIONS_YET, MovieList, Severity};
use crate::app::{App, Field, ModalField, Screen};

const SPINNER: [&str; 3] = [".", "..", "..."];

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Main => render_main_screen(app, frame, body_area),
        Screen::History => render_history_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    if app.view().modal.is_some() {
        render_auth_modal(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let (status, status_color) = match app.view().server_online {
        Some(true) => ("● online", Color::Green),
        Some(false) => ("● offline", Color::Red),
        None => ("● ...", Color::Gray),
    };

    let title = Line::from(vec![
        Span::styled(" Cinerec ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(status, Style::default().fg(status_color)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
        Span::raw("  "),
        Span::styled(app.transport.base_url().to_string(), Style::default().fg(Color::Gray)),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = if app.view().is_logged_in() {
        Style::default().bg(Color::Blue).fg(Color::White)
    } else {
        Style::default().bg(Color::Yellow).fg(Color::Black)
    };

    let mode_text = match app.screen {
        Screen::Main if app.view().is_logged_in() => " PROFILE ",
        Screen::Main => " SIGN IN ",
        Screen::History => " HISTORY ",
    };

    let hints = if app.view().modal.is_some() {
        " Tab: switch field | Enter: sign in | Esc: cancel"
    } else {
        match app.screen {
            Screen::History => " Tab: switch list | r: reload | j/k: scroll | Esc: back",
            Screen::Main if app.view().is_logged_in() => {
                " Tab: field | Enter: send | PgUp/PgDn: scroll | Ctrl+R: balance | F2: history | Ctrl+L: logout | Esc: quit"
            }
            Screen::Main => " Tab: field | Enter: sign in | Ctrl+U: sign up | Esc: quit",
        }
    };

    let footer = Line::from(vec![
        Span::styled(mode_text, mode_style),
        Span::styled(hints, Style::default().fg(Color::Gray)),
    ]);
    frame.render_widget(Paragraph::new(footer), area);
}

fn render_main_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [left, right] = Layout::horizontal([Constraint::Length(40), Constraint::Min(0)]).areas(area);

    let [auth_area, balance_area] = Layout::vertical([Constraint::Length(8), Constraint::Min(0)]).areas(left);

    render_auth_panel(app, frame, auth_area);
    if app.view().balance_card_visible() {
        render_balance_card(app, frame, balance_area);
    }
    render_prediction_panel(app, frame, right);
}

fn input_style(app: &App, field: Field) -> Style {
    if app.focus == field && app.view().modal.is_none() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Gray)
    }
}

/// The tail of `text` that fits in `width` columns with the cursor at the end,
/// and the cursor column within it
fn visible_tail(text: &str, width: usize) -> (String, u16) {
    let cursor_pos = text.chars().count();

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if width == 0 {
        0
    } else if cursor_pos >= width {
        cursor_pos - width + 1
    } else {
        0
    };

    let visible: String = text.chars().skip(scroll_offset).take(width).collect();
    let cursor_x = u16::try_from(cursor_pos - scroll_offset).unwrap_or(u16::MAX);
    (visible, cursor_x)
}

/// A one-line bordered input. Sets the cursor when focused.
fn render_input(app: &App, frame: &mut Frame, area: Rect, field: Field, title: &str, text: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(input_style(app, field))
        .title(format!(" {} ", title));

    let (visible, cursor_x) = visible_tail(text, area.width.saturating_sub(2) as usize);
    frame.render_widget(Paragraph::new(visible).block(block), area);

    if app.focus == field && app.view().modal.is_none() {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn mask(text: &str) -> String {
    "*".repeat(text.chars().count())
}

fn render_auth_panel(app: &App, frame: &mut Frame, area: Rect) {
    let view = app.view();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", view.auth_title()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if view.auth_inputs_visible() {
        let [email_area, password_area, msg_area] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .areas(inner);

        render_input(app, frame, email_area, Field::Email, "Email", &view.email);
        render_input(app, frame, password_area, Field::Password, "Password", &mask(&view.password));
        frame.render_widget(
            Paragraph::new(view.auth_msg.as_str()).style(Style::default().fg(Color::Red)),
            msg_area,
        );
    } else {
        let lines = vec![
            Line::from(vec![
                Span::styled("Signed in as ", Style::default().fg(Color::Gray)),
                Span::styled(view.me_email.as_str(), Style::default().bold()),
            ]),
            Line::raw(""),
            Line::styled("F2: transaction & prediction history", Style::default().fg(Color::Gray)),
        ];
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
    }
}

fn render_balance_card(app: &App, frame: &mut Frame, area: Rect) {
    let view = app.view();
    let block = Block::default().borders(Borders::ALL).title(" Balance ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [amount_area, topup_area, error_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(inner);

    let amount = Paragraph::new(Line::from(vec![
        Span::raw("Current: "),
        Span::styled(view.balance.as_str(), Style::default().fg(Color::Green).bold()),
    ]));
    frame.render_widget(amount, amount_area);

    render_input(app, frame, topup_area, Field::TopUp, "Top up (Enter)", &view.topup);
    frame.render_widget(
        Paragraph::new(view.balance_error.as_str())
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true }),
        error_area,
    );
}

fn severity_style(severity: Severity) -> Style {
    match severity {
        Severity::Info => Style::default().fg(Color::Gray),
        Severity::Success => Style::default().fg(Color::Green),
        Severity::Error => Style::default().fg(Color::Red),
    }
}

fn render_prediction_panel(app: &mut App, frame: &mut Frame, area: Rect) {
    let [prompt_area, status_area, movies_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .areas(area);

    let view = app.view();
    if view.request_enabled() {
        render_input(app, frame, prompt_area, Field::Prompt, "What do you feel like watching?", &view.prompt);
    } else {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Sign in to get recommendations ");
        frame.render_widget(block, prompt_area);
    }

    let mut status = view.pred_status.text.clone();
    if app.in_flight > 0 && !status.is_empty() && view.pred_status.severity == Severity::Info {
        status.push_str(SPINNER[app.animation_frame as usize % SPINNER.len()]);
    }
    frame.render_widget(
        Paragraph::new(format!(" {}", status)).style(severity_style(view.pred_status.severity)),
        status_area,
    );

    let block = Block::default().borders(Borders::ALL).title(" Recommendations ");
    let cards = match &view.movies {
        MovieList::Empty => {
            frame.render_widget(block, movies_area);
            return;
        }
        MovieList::Placeholder => {
            let note = Paragraph::new(NO_RECOMMENDATIONS_YET)
                .style(Style::default().fg(Color::Gray))
                .block(block);
            frame.render_widget(note, movies_area);
            return;
        }
        MovieList::Cards(cards) => cards,
    };

    // Wrapped here rather than by the Paragraph so the line count is exact
    let width = movies_area.width.saturating_sub(2) as usize;
    let mut lines = Vec::new();
    for card in cards {
        for row in wrap_text(&card.heading(), width) {
            lines.push(Line::styled(row, Style::default().fg(Color::Cyan).bold()));
        }
        for row in wrap_text(&card.description, width) {
            lines.push(Line::raw(row));
        }
        if !card.genres.is_empty() {
            let tags: Vec<String> = card.genres.iter().map(|g| format!("[{}]", g)).collect();
            for row in wrap_text(&tags.join(" "), width) {
                lines.push(Line::styled(row, Style::default().fg(Color::Magenta)));
            }
        }
        lines.push(Line::default());
    }

    app.movies_lines = u16::try_from(lines.len()).unwrap_or(u16::MAX);
    app.movies_height = movies_area.height.saturating_sub(2);
    // A resize can leave the offset past the end
    app.movies_scroll = app.movies_scroll.min(app.movies_lines.saturating_sub(app.movies_height));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .scroll((app.movies_scroll, 0));
    frame.render_widget(paragraph, movies_area);

    if app.movies_lines > app.movies_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("^"))
            .end_symbol(Some("v"));

        let mut scrollbar_state = ScrollbarState::new(app.movies_lines.saturating_sub(app.movies_height) as usize)
            .position(app.movies_scroll as usize);

        frame.render_stateful_widget(
            scrollbar,
            movies_area.inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}

/// Greedy word wrap; words longer than `width` are split
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut rows = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if current_len > 0 {
                rows.push(std::mem::take(&mut current));
                current_len = 0;
            }
            rows.push(word.drain(..width).collect());
        }
        if word.is_empty() {
            continue;
        }

        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > width {
            rows.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }

    if current_len > 0 {
        rows.push(current);
    }
    rows
}

fn render_history_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let history = app.view().history.clone();

    let title = format!(" {} ", history.kind.title());
    let block = Block::default().borders(Borders::ALL).title(title);

    if history.loading {
        let frame_str = SPINNER[app.animation_frame as usize % SPINNER.len()];
        let loading = Paragraph::new(format!("Loading{}", frame_str))
            .style(Style::default().fg(Color::Gray))
            .block(block);
        frame.render_widget(loading, area);
        return;
    }

    if !history.error.is_empty() {
        let error = Paragraph::new(history.error.as_str())
            .style(Style::default().fg(Color::Red))
            .block(block);
        frame.render_widget(error, area);
        return;
    }

    if history.rows.is_empty() {
        let empty = Paragraph::new("Nothing here yet")
            .style(Style::default().fg(Color::Gray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = history
        .rows
        .iter()
        .map(|row| {
            let amount_color = if row.amount.starts_with('-') {
                Color::Red
            } else {
                Color::Green
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<20} ", row.timestamp), Style::default().fg(Color::Gray)),
                Span::styled(format!("{:>10} ", row.amount), Style::default().fg(amount_color)),
                Span::raw(row.label.clone()),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    frame.render_stateful_widget(list, area, &mut app.history_state);
}

fn render_auth_modal(app: &App, frame: &mut Frame, area: Rect) {
    let Some(modal) = app.view().modal.as_ref() else {
        return;
    };

    // Calculate popup size and position (centered)
    let popup_width = 50.min(area.width.saturating_sub(4));
    let popup_height = 11;

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height.min(area.height));

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Sign in ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let [message_area, email_area, password_area, error_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(inner);

    frame.render_widget(
        Paragraph::new(modal.message.as_str()).style(Style::default().fg(Color::Gray)),
        message_area,
    );

    let fields = [
        (ModalField::Email, "Email", email_area, modal.email.clone()),
        (ModalField::Password, "Password", password_area, mask(&modal.password)),
    ];
    for (field, title, field_area, text) in fields {
        let focused = app.modal_focus == field;
        let style = if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::Gray)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(style)
            .title(format!(" {} ", title));
        let (visible, cursor_x) = visible_tail(&text, field_area.width.saturating_sub(2) as usize);
        frame.render_widget(Paragraph::new(visible).block(block), field_area);
        if focused {
            frame.set_cursor_position((field_area.x + cursor_x + 1, field_area.y + 1));
        }
    }

    frame.render_widget(
        Paragraph::new(modal.error.as_str()).style(Style::default().fg(Color::Red)),
        error_area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinerec_core::{HttpTransport, MemoryCredentialStore, MovieCard};
    use ratatui::{backend::TestBackend, Terminal};
    use tokio::sync::mpsc;

    fn logged_in_app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::with_store(
            Box::new(MemoryCredentialStore::new()),
            HttpTransport::new("http://127.0.0.1:9"),
            10,
            tx,
        );
        app.controller.view_mut().show_auth_status("ann@example.com");
        app.ensure_focus();
        app
    }

    fn ten_cards() -> MovieList {
        let description = "A slow burning story about memory and loss. ".repeat(7);
        MovieList::Cards(
            (1..=10)
                .map(|i| MovieCard {
                    title: format!("Film {:02}", i),
                    year: "2001".to_string(),
                    description: description.trim().to_string(),
                    genres: vec!["Drama".to_string()],
                })
                .collect(),
        )
    }

    fn draw(terminal: &mut Terminal<TestBackend>, app: &mut App) -> String {
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_mask_counts_chars() {
        assert_eq!(mask(""), "");
        assert_eq!(mask("пароль"), "******");
    }

    #[test]
    fn test_wrap_text_fits_width() {
        let rows = wrap_text("the quick brown fox jumps", 10);
        assert_eq!(rows, vec!["the quick", "brown fox", "jumps"]);

        let rows = wrap_text("abcdefghijkl xy", 5);
        assert_eq!(rows, vec!["abcde", "fghij", "kl xy"]);

        assert!(wrap_text("", 10).is_empty());
    }

    #[test]
    fn test_visible_tail_keeps_cursor_inside() {
        assert_eq!(visible_tail("short", 10), ("short".to_string(), 5));

        let long = "a".repeat(30) + "END";
        let (visible, cursor_x) = visible_tail(&long, 10);
        assert_eq!(visible.chars().count(), 9);
        assert!(visible.ends_with("END"));
        assert_eq!(cursor_x, 9);
    }

    #[test]
    fn test_last_card_reachable_by_scrolling() {
        let mut app = logged_in_app();
        app.controller.view_mut().movies = ten_cards();
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();

        let screen = draw(&mut terminal, &mut app);
        assert!(screen.contains("Film 01 (2001)"));
        assert!(!screen.contains("Film 10 (2001)"));
        assert!(app.movies_lines > app.movies_height);

        // every card is on screen at some scroll position
        let mut seen: Vec<String> = Vec::new();
        for _ in 0..50 {
            let screen = draw(&mut terminal, &mut app);
            for i in 1..=10 {
                let heading = format!("Film {:02} (2001)", i);
                if screen.contains(&heading) && !seen.contains(&heading) {
                    seen.push(heading);
                }
            }
            app.scroll_movies_down();
        }
        assert_eq!(seen.len(), 10);
        assert_eq!(app.movies_scroll, app.movies_lines - app.movies_height);
    }

    #[test]
    fn test_long_prompt_stays_inside_input() {
        let mut app = logged_in_app();
        app.controller.view_mut().prompt = "x".repeat(300) + "TAIL";
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();

        let screen = draw(&mut terminal, &mut app);
        let prompt_row = screen.lines().find(|row| row.contains("TAIL")).unwrap();
        // right border of the prompt box is still drawn after the text
        assert!(prompt_row.trim_end().ends_with("TAIL │"));
    }
}
