// UI rendering - draws every frame from a fresh read-only snapshot
//
// The presentation layer consumes SessionStore's snapshot and the catalog;
// it never reaches into session internals. Pane layout:
//
//   ┌ Models    ┐ ┌ Transcript          ┐
//   │ Params    │ │                     │
//   │ Templates │ │ Prompt editor       │
//   └───────────┘ └─────────────────────┘
//   status bar

use super::app::{App, CatalogState, Focus};
use crate::config::VERSION;
use crate::logging::LogLevel;
use crate::session::{Param, RequestStatus, Role, SessionSnapshot};
use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

/// Spinner frames for the in-flight indicator
const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Height of the prompt editor pane, borders included
const EDITOR_HEIGHT: u16 = 8;

/// Draw the whole UI
pub fn draw(f: &mut Frame, app: &App) {
    let snapshot = app.store.snapshot();

    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(f.area());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(34), Constraint::Min(20)])
        .split(outer[0]);

    let sidebar = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),
            Constraint::Length(5),
            Constraint::Min(5),
        ])
        .split(columns[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(EDITOR_HEIGHT)])
        .split(columns[1]);

    draw_models(f, app, &snapshot, sidebar[0]);
    draw_params(f, app, &snapshot, sidebar[1]);
    draw_templates(f, app, sidebar[2]);
    draw_transcript(f, app, &snapshot, right[0]);
    draw_editor(f, app, &snapshot, right[1]);
    draw_status_bar(f, app, &snapshot, outer[1]);

    if app.show_logs {
        draw_logs(f, app, outer[0]);
    }

    for (slot, toast) in app.toasts.iter().rev().enumerate() {
        toast.render(f, f.area(), slot as u16);
    }
}

fn pane_block(title: &str, focused: bool) -> Block<'_> {
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style)
}

fn draw_models(f: &mut Frame, app: &App, snapshot: &SessionSnapshot, area: Rect) {
    let block = pane_block("Models", app.focus == Focus::Models);
    let catalog = app.store.catalog();

    if catalog.models.is_empty() {
        let text = match app.catalog_state {
            CatalogState::Loading => "Loading...",
            CatalogState::Failed => "Catalog unavailable",
            CatalogState::Ready => "No models",
        };
        f.render_widget(
            Paragraph::new(text)
                .style(Style::default().fg(Color::DarkGray))
                .block(block),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = catalog
        .models
        .iter()
        .map(|m| {
            let marker = if m.id == snapshot.selected_model_id {
                "● "
            } else {
                "  "
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(Color::Green)),
                Span::raw(m.name.clone()),
                Span::styled(
                    format!(" ({}, {} ctx)", m.provider, m.max_tokens),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(app.model_cursor.min(catalog.models.len() - 1)));

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_params(f: &mut Frame, app: &App, snapshot: &SessionSnapshot, area: Rect) {
    let block = pane_block("Parameters", app.focus == Focus::Params);
    let params = snapshot.params;

    let lines: Vec<Line> = Param::ALL
        .iter()
        .enumerate()
        .map(|(i, param)| {
            let value = match param {
                Param::Temperature => format!("{:.2}", params.temperature),
                Param::MaxTokens => format!("{}", params.max_tokens),
                Param::TopP => format!("{:.2}", params.top_p),
            };
            let marker = if app.focus == Focus::Params && i == app.param_cursor {
                "▸ "
            } else {
                "  "
            };
            Line::from(vec![
                Span::styled(marker, Style::default().fg(Color::Cyan)),
                Span::raw(format!("{:<12}", param.name())),
                Span::styled(value, Style::default().fg(Color::Yellow)),
            ])
        })
        .collect();

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_templates(f: &mut Frame, app: &App, area: Rect) {
    let block = pane_block("Templates", app.focus == Focus::Templates);
    let catalog = app.store.catalog();

    if catalog.templates.is_empty() {
        let text = match app.catalog_state {
            CatalogState::Loading => "Loading...",
            CatalogState::Failed => "Catalog unavailable",
            CatalogState::Ready => "No templates",
        };
        f.render_widget(
            Paragraph::new(text)
                .style(Style::default().fg(Color::DarkGray))
                .block(block),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = catalog
        .templates
        .iter()
        .map(|t| {
            ListItem::new(Line::from(vec![
                Span::raw(t.name.clone()),
                Span::styled(
                    format!(" · {}", t.category),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(app.template_cursor.min(catalog.templates.len() - 1)));

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_transcript(f: &mut Frame, app: &App, snapshot: &SessionSnapshot, area: Rect) {
    let block = pane_block("Output", false);
    let inner_height = area.height.saturating_sub(2);

    let mut lines: Vec<Line> = Vec::new();
    for turn in &snapshot.transcript {
        let (label, style) = match turn.role {
            Role::User => (
                "YOU",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
            Role::Assistant => (
                "ASSISTANT",
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ),
        };
        lines.push(Line::from(Span::styled(label, style)));
        for content_line in turn.content.lines() {
            lines.push(Line::raw(content_line.to_string()));
        }
        lines.push(Line::raw(""));
    }

    if snapshot.status == RequestStatus::InFlight {
        let frame = SPINNER[app.spinner_frame % SPINNER.len()];
        lines.push(Line::from(Span::styled(
            format!("{} Generating response...", frame),
            Style::default().fg(Color::DarkGray),
        )));
    }

    if lines.is_empty() {
        lines.push(Line::styled(
            "No messages yet. Enter a prompt and press Ctrl+G to generate.",
            Style::default().fg(Color::DarkGray),
        ));
    }

    // Pin to the bottom unless the user scrolled up (pre-wrap approximation)
    let total = lines.len() as u16;
    let scroll = total
        .saturating_sub(inner_height)
        .saturating_sub(app.transcript_scroll);

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    f.render_widget(paragraph, area);
}

fn draw_editor(f: &mut Frame, app: &App, snapshot: &SessionSnapshot, area: Rect) {
    let focused = app.focus == Focus::Editor;
    let block = pane_block("Prompt", focused);
    let inner = block.inner(area);

    let (cursor_line, cursor_col) = app.cursor_line_col();
    // Scroll so the caret's line stays visible
    let scroll = (cursor_line as u16).saturating_sub(inner.height.saturating_sub(1));

    let paragraph = Paragraph::new(snapshot.draft_prompt.as_str())
        .block(block)
        .scroll((scroll, 0));
    f.render_widget(paragraph, area);

    if focused {
        let x = inner.x + (cursor_col as u16).min(inner.width.saturating_sub(1));
        let y = inner.y + (cursor_line as u16).saturating_sub(scroll);
        f.set_cursor_position(Position::new(x, y));
    }
}

fn draw_status_bar(f: &mut Frame, app: &App, snapshot: &SessionSnapshot, area: Rect) {
    let status = match snapshot.status {
        RequestStatus::Idle => "idle".to_string(),
        RequestStatus::InFlight => {
            format!("{} generating", SPINNER[app.spinner_frame % SPINNER.len()])
        }
    };

    let latency = match app.last_latency {
        Some(d) => format!(" │ last: {}ms", d.as_millis()),
        None => String::new(),
    };

    // Prefer the catalog's display name; the id still works degraded
    let model = app
        .store
        .catalog()
        .model(&snapshot.selected_model_id)
        .map(|m| m.name.clone())
        .unwrap_or_else(|| snapshot.selected_model_id.clone());

    let uptime = app.start_time.elapsed().as_secs();
    let left = format!(
        " promptdeck v{} │ {} │ {}{} │ up {}:{:02}",
        VERSION,
        model,
        status,
        latency,
        uptime / 60,
        uptime % 60
    );
    let hints = "Tab panes │ ^G generate │ ^E export │ ^Y copy │ ^L logs │ ^Q quit ";

    let line = if left.width() + hints.width() < area.width as usize {
        let pad = area.width as usize - left.width() - hints.width();
        format!("{}{}{}", left, " ".repeat(pad), hints)
    } else {
        truncate_to_width(&left, area.width as usize)
    };

    f.render_widget(
        Paragraph::new(line).style(Style::default().fg(Color::Black).bg(Color::Cyan)),
        area,
    );
}

fn draw_logs(f: &mut Frame, app: &App, area: Rect) {
    let height = area.height.min(12);
    let log_area = Rect::new(
        area.x,
        area.bottom().saturating_sub(height),
        area.width,
        height,
    );

    let entries = app.log_buffer.get_all();
    let visible = height.saturating_sub(2) as usize;
    let lines: Vec<Line> = entries
        .iter()
        .rev()
        .take(visible)
        .rev()
        .map(|e| {
            let color = match e.level {
                LogLevel::Error => Color::Red,
                LogLevel::Warn => Color::Yellow,
                LogLevel::Info => Color::Green,
                LogLevel::Debug => Color::Blue,
                LogLevel::Trace => Color::DarkGray,
            };
            Line::from(vec![
                Span::styled(
                    format!("{} ", e.timestamp.format("%H:%M:%S")),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(format!("{:<5} ", e.level.as_str()), Style::default().fg(color)),
                Span::raw(e.message.clone()),
            ])
        })
        .collect();

    let block = Block::default()
        .title("Logs (^L to close)")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    f.render_widget(Clear, log_area);
    f.render_widget(Paragraph::new(lines).block(block), log_area);
}

/// Truncate a string to a display width, respecting wide characters
fn truncate_to_width(s: &str, max_width: usize) -> String {
    let mut out = String::new();
    let mut width = 0;
    for c in s.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if width + w > max_width {
            break;
        }
        width += w;
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_display_width() {
        assert_eq!(truncate_to_width("hello", 10), "hello");
        assert_eq!(truncate_to_width("hello", 3), "hel");
        // CJK characters are two cells wide
        assert_eq!(truncate_to_width("日本語", 4), "日本");
        assert_eq!(truncate_to_width("日本語", 5), "日本");
    }
}
