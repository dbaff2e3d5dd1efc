// Input handling - translates key events into App actions
//
// Global chords work from any pane; everything else is routed to the focused
// pane. The editor owns plain character input, so quit and the other global
// actions are all Ctrl chords.

use super::app::{App, Focus};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Handle a keyboard event
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    // Ignore key release events (some terminals send them)
    if key.kind != KeyEventKind::Press {
        return;
    }

    // Global chords, regardless of focus
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') => {
                app.should_quit = true;
                return;
            }
            KeyCode::Char('g') => {
                app.submit();
                return;
            }
            KeyCode::Char('e') => {
                app.export_transcript();
                return;
            }
            KeyCode::Char('y') => {
                app.copy_last_response();
                return;
            }
            KeyCode::Char('l') => {
                app.show_logs = !app.show_logs;
                return;
            }
            _ => {}
        }
    }

    match key.code {
        KeyCode::Tab => {
            app.focus = app.focus.next();
            return;
        }
        KeyCode::BackTab => {
            app.focus = app.focus.prev();
            return;
        }
        // Transcript scrolling works from any pane
        KeyCode::PageUp => {
            app.transcript_scroll = app.transcript_scroll.saturating_add(5);
            return;
        }
        KeyCode::PageDown => {
            app.transcript_scroll = app.transcript_scroll.saturating_sub(5);
            return;
        }
        _ => {}
    }

    match app.focus {
        Focus::Editor => handle_editor_key(app, key),
        Focus::Models => handle_models_key(app, key),
        Focus::Templates => handle_templates_key(app, key),
        Focus::Params => handle_params_key(app, key),
    }
}

fn handle_editor_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char(c) => app.insert_char(c),
        KeyCode::Enter => app.insert_char('\n'),
        KeyCode::Backspace => app.backspace(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Up => app.cursor_up(),
        KeyCode::Down => app.cursor_down(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        _ => {}
    }
}

fn handle_models_key(app: &mut App, key: KeyEvent) {
    let count = app.store.catalog().models.len();
    match key.code {
        KeyCode::Up => app.model_cursor = app.model_cursor.saturating_sub(1),
        KeyCode::Down => {
            if count > 0 && app.model_cursor + 1 < count {
                app.model_cursor += 1;
            }
        }
        KeyCode::Enter => app.select_model_under_cursor(),
        _ => {}
    }
}

fn handle_templates_key(app: &mut App, key: KeyEvent) {
    let count = app.store.catalog().templates.len();
    match key.code {
        KeyCode::Up => app.template_cursor = app.template_cursor.saturating_sub(1),
        KeyCode::Down => {
            if count > 0 && app.template_cursor + 1 < count {
                app.template_cursor += 1;
            }
        }
        KeyCode::Enter => app.apply_template_under_cursor(),
        _ => {}
    }
}

fn handle_params_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Up => app.param_cursor = app.param_cursor.saturating_sub(1),
        KeyCode::Down => {
            if app.param_cursor < 2 {
                app.param_cursor += 1;
            }
        }
        KeyCode::Left => app.adjust_param(-1),
        KeyCode::Right => app.adjust_param(1),
        _ => {}
    }
}
