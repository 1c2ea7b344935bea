use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table,
        TableState, Wrap,
    },
    Frame,
};

use crate::core::app::{App, ContextBrowserState};
use crate::core::constants::INDICATOR_SPACE;
use crate::core::navigator::{Screen, NO_MODELS_MESSAGE};
use crate::ui::title::chat_title;
use crate::ui::transcript::{build_transcript_lines, wrapped_height, TRANSCRIPT_WRAP};

const MAX_INPUT_ROWS: u16 = 6;

pub fn ui(f: &mut Frame, app: &mut App) {
    match app.current_screen().clone() {
        Screen::Models => render_models(f, app),
        Screen::Chat { model } => render_chat(f, app, &model),
        Screen::Error { message } => render_error(f, app, &message),
    }
}

fn hint_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn status_line(app: &App) -> Line<'static> {
    match app.ui.status.as_deref() {
        Some(status) => Line::from(Span::styled(
            status.to_string(),
            Style::default().fg(Color::Yellow),
        )),
        None => Line::from(""),
    }
}

fn render_models(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    let header = Line::from(vec![
        Span::styled(
            "Connected to: ",
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(app.server.base_url.clone()),
    ]);
    f.render_widget(Paragraph::new(header), chunks[0]);

    let catalog = app.navigator.catalog();
    let block = Block::default().borders(Borders::ALL).title("Models");
    if catalog.is_empty() {
        let empty = Paragraph::new(NO_MODELS_MESSAGE)
            .block(block)
            .wrap(Wrap { trim: true });
        f.render_widget(empty, chunks[1]);
    } else {
        let rows = catalog.iter().map(|model| {
            Row::new(vec![
                Cell::from(model.name.clone()),
                Cell::from(model.size_gb()),
                Cell::from(model.family.clone()),
                Cell::from(model.format.clone()),
            ])
        });
        let header = Row::new(vec!["Name", "Size (GB)", "Family", "Format"])
            .style(Style::default().add_modifier(Modifier::BOLD));
        let table = Table::new(
            rows,
            [
                Constraint::Percentage(50),
                Constraint::Length(10),
                Constraint::Length(12),
                Constraint::Length(8),
            ],
        )
        .header(header)
        .block(block)
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
        let mut state = TableState::default().with_selected(Some(app.ui.model_picker.selected));
        f.render_stateful_widget(table, chunks[1], &mut state);
    }

    f.render_widget(Paragraph::new(status_line(app)), chunks[2]);
    let hints = "↑/↓ select • Enter chat • r refresh • q quit";
    f.render_widget(
        Paragraph::new(Span::styled(hints, hint_style())),
        chunks[3],
    );
}

fn pulse_symbol(app: &App) -> &'static str {
    let elapsed = app.ui.pulse_start.elapsed().as_millis() as f32 / 1000.0;
    let pulse_phase = (elapsed * 2.0) % 2.0;
    let pulse_intensity = if pulse_phase < 1.0 {
        pulse_phase
    } else {
        2.0 - pulse_phase
    };
    if pulse_intensity < 0.33 {
        "○"
    } else if pulse_intensity < 0.66 {
        "◐"
    } else {
        "●"
    }
}

fn context_line(app: &App) -> Line<'static> {
    let pending = app
        .navigator
        .session()
        .and_then(|session| session.pending_context());
    match pending {
        Some(bundle) => Line::from(vec![
            Span::styled("Context: ", Style::default().fg(Color::Magenta)),
            Span::raw(bundle.label.clone()),
            Span::styled(" (Ctrl+X to discard)", hint_style()),
        ]),
        None => Line::from(Span::styled("No context attached (Ctrl+O to attach)", hint_style())),
    }
}

fn render_chat(f: &mut Frame, app: &mut App, model: &str) {
    let input_rows = (app.ui.get_textarea_line_count() as u16).clamp(1, MAX_INPUT_ROWS);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(input_rows + 2),
        ])
        .split(f.area());

    let title = chat_title(model, &app.server.base_url, chunks[0].width as usize);
    let lines = match app.navigator.session() {
        Some(session) => build_transcript_lines(session.messages(), model),
        None => Vec::new(),
    };

    let transcript_block = Block::default().borders(Borders::TOP).title(title);
    let inner = transcript_block.inner(chunks[0]);
    let transcript = Paragraph::new(lines).wrap(TRANSCRIPT_WRAP);
    let total = wrapped_height(&transcript, inner.width);
    let max_scroll = total.saturating_sub(inner.height);
    app.ui.clamp_scroll(max_scroll);
    let top = max_scroll - app.ui.scroll_from_bottom;

    let transcript = transcript.block(transcript_block).scroll((top, 0));
    f.render_widget(transcript, chunks[0]);

    f.render_widget(Paragraph::new(context_line(app)), chunks[1]);
    f.render_widget(Paragraph::new(status_line(app)), chunks[2]);

    let streaming = app.is_streaming();
    let input_title = if streaming {
        "Waiting for response (Esc to interrupt, Ctrl+C to quit)"
    } else {
        "Message (Enter to send, Alt+Enter for new line, Ctrl+L models, Ctrl+C to quit)"
    };
    let border_style = if streaming {
        hint_style()
    } else {
        Style::default().fg(Color::Cyan)
    };
    app.ui.textarea_mut().set_block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(input_title),
    );
    f.render_widget(app.ui.textarea(), chunks[3]);

    if app.ui.activity_indicator.is_some() {
        let area = chunks[3];
        if area.width > INDICATOR_SPACE + 2 {
            let indicator = Rect {
                x: area.x + area.width - INDICATOR_SPACE,
                y: area.y + 1,
                width: 2,
                height: 1,
            };
            let symbol = pulse_symbol(app);
            f.render_widget(
                Paragraph::new(Span::styled(symbol, Style::default().fg(Color::Green))),
                indicator,
            );
        }
    }

    if let Some(browser) = app.ui.context_browser.as_ref() {
        render_browser(f, browser);
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn render_browser(f: &mut Frame, browser: &ContextBrowserState) {
    let area = centered_rect(70, 70, f.area());
    f.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(
            "{}: {}",
            browser.picker.title,
            browser.display_path()
        ))
        .title_bottom(Line::from(Span::styled(
            " Enter open/attach • Tab attach this directory • Backspace up • Esc close ",
            hint_style(),
        )));

    if browser.picker.items.is_empty() {
        f.render_widget(Paragraph::new("(empty directory)").block(block), area);
        return;
    }

    let items: Vec<ListItem> = browser
        .picker
        .items
        .iter()
        .zip(browser.entries())
        .map(|(item, entry)| {
            let style = if entry.is_dir {
                Style::default().fg(Color::Blue)
            } else {
                Style::default()
            };
            ListItem::new(Span::styled(item.label.clone(), style))
        })
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(browser.picker.selected));
    f.render_stateful_widget(list, area, &mut state);
}

fn render_error(f: &mut Frame, app: &App, message: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(f.area());

    let text = vec![Line::from(vec![
        Span::styled(
            "Error: ",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Span::raw(message.to_string()),
    ])];
    let body = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("ollama-tui"))
        .wrap(Wrap { trim: true });
    f.render_widget(body, chunks[0]);

    let hints = if app.navigator.can_go_back() {
        "b back • q quit"
    } else {
        "q quit"
    };
    f.render_widget(
        Paragraph::new(Span::styled(hints, hint_style())),
        chunks[1],
    );
}
