// TUI application state
//
// App wraps the SessionStore with everything that is purely presentational:
// pane focus, list cursors, the editor caret, toasts, and the log pane
// toggle. All session mutations go through store commands; App never touches
// session internals.

use super::clipboard;
use super::toast::Toast;
use crate::events::AppEvent;
use crate::logging::LogBuffer;
use crate::session::{Param, Role, SessionStore};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Which pane receives keyboard input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Editor,
    Models,
    Templates,
    Params,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::Editor => Focus::Models,
            Focus::Models => Focus::Templates,
            Focus::Templates => Focus::Params,
            Focus::Params => Focus::Editor,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Focus::Editor => Focus::Params,
            Focus::Models => Focus::Editor,
            Focus::Templates => Focus::Models,
            Focus::Params => Focus::Templates,
        }
    }
}

/// Startup catalog fetch status, for the sidebar placeholder text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogState {
    Loading,
    Ready,
    Failed,
}

/// Main application state for the TUI
pub struct App {
    /// The session state machine; the TUI is its only owner
    pub store: SessionStore,

    pub focus: Focus,
    pub should_quit: bool,

    /// Log buffer for the toggleable log pane
    pub log_buffer: LogBuffer,
    pub show_logs: bool,

    /// Active toast notifications
    pub toasts: Vec<Toast>,

    /// List cursors
    pub model_cursor: usize,
    pub template_cursor: usize,
    pub param_cursor: usize,

    /// Transcript scroll offset in lines
    pub transcript_scroll: u16,

    /// Caret position in the draft, counted in chars
    pub editor_cursor: usize,

    /// Animation frame for the in-flight spinner
    pub spinner_frame: usize,

    pub start_time: Instant,
    pub catalog_state: CatalogState,

    /// Duration of the most recent generation call, for the status bar
    pub last_latency: Option<Duration>,

    export_dir: PathBuf,
}

impl App {
    pub fn new(store: SessionStore, log_buffer: LogBuffer, export_dir: PathBuf) -> Self {
        Self {
            store,
            focus: Focus::default(),
            should_quit: false,
            log_buffer,
            show_logs: false,
            toasts: Vec::new(),
            model_cursor: 0,
            template_cursor: 0,
            param_cursor: 0,
            transcript_scroll: 0,
            editor_cursor: 0,
            spinner_frame: 0,
            start_time: Instant::now(),
            catalog_state: CatalogState::Loading,
            last_latency: None,
            export_dir,
        }
    }

    /// Show a toast notification
    pub fn toast(&mut self, message: impl Into<String>) {
        self.toasts.push(Toast::new(message));
    }

    /// Periodic tick: advance the spinner, expire toasts
    pub fn tick(&mut self) {
        self.spinner_frame = self.spinner_frame.wrapping_add(1);
        self.toasts.retain(|t| !t.is_expired());
    }

    /// Apply an event from a background task
    pub fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::CatalogLoaded { timestamp, catalog } => {
                tracing::debug!("Catalog arrived at {}", timestamp);
                let models = catalog.models.len();
                let templates = catalog.templates.len();
                self.store.set_catalog(catalog);
                self.catalog_state = CatalogState::Ready;
                // Put the cursor on the configured default model
                let selected = self.store.snapshot().selected_model_id;
                if let Some(idx) = self
                    .store
                    .catalog()
                    .models
                    .iter()
                    .position(|m| m.id == selected)
                {
                    self.model_cursor = idx;
                }
                tracing::info!("Catalog loaded: {} models, {} templates", models, templates);
            }
            AppEvent::CatalogFailed { timestamp, error } => {
                tracing::debug!("Catalog failure arrived at {}", timestamp);
                self.catalog_state = CatalogState::Failed;
                tracing::error!("Catalog load failed: {}", error);
                self.toast("Failed to load data");
            }
            AppEvent::GenerationFinished {
                request_id,
                timestamp,
                duration,
                outcome,
            } => {
                tracing::debug!(
                    "Request {} finished at {} after {}ms",
                    request_id,
                    timestamp,
                    duration.as_millis()
                );
                self.last_latency = Some(duration);
                if let Err(e) = self.store.resolve(request_id, outcome) {
                    self.toast(format!("Failed to generate response: {}", e));
                }
            }
        }
    }

    // ── Actions ──────────────────────────────────────────────────────────

    pub fn submit(&mut self) {
        match self.store.submit() {
            Ok(_) => self.transcript_scroll = 0,
            Err(e) => self.toast(e.to_string()),
        }
    }

    pub fn export_transcript(&mut self) {
        if self.store.transcript().is_empty() {
            self.toast("Nothing to export yet");
            return;
        }
        match crate::export::write_transcript(&self.export_dir, self.store.transcript()) {
            Ok(path) => self.toast(format!("Chat saved to {}", path.display())),
            Err(e) => self.toast(format!("Export failed: {:#}", e)),
        }
    }

    /// Copy the most recent assistant response to the clipboard
    pub fn copy_last_response(&mut self) {
        let Some(turn) = self
            .store
            .transcript()
            .iter()
            .rev()
            .find(|t| t.role == Role::Assistant)
        else {
            self.toast("No response to copy");
            return;
        };
        match clipboard::copy_to_clipboard(&turn.content) {
            Ok(()) => self.toast("Copied to clipboard"),
            Err(e) => self.toast(format!("Copy failed: {:#}", e)),
        }
    }

    pub fn select_model_under_cursor(&mut self) {
        let Some(model) = self.store.catalog().models.get(self.model_cursor).cloned() else {
            return;
        };
        self.store.select_model(&model.id);
        self.toast(format!("Model: {}", model.name));
    }

    pub fn apply_template_under_cursor(&mut self) {
        let Some(id) = self
            .store
            .catalog()
            .templates
            .get(self.template_cursor)
            .map(|t| t.id.clone())
        else {
            return;
        };
        match self.store.load_template(&id) {
            Ok(name) => {
                // Caret past the end would panic the renderer
                self.editor_cursor = self.store.draft_prompt().chars().count();
                self.toast(format!("Template \"{}\" loaded", name));
            }
            Err(e) => self.toast(e.to_string()),
        }
    }

    /// Step the selected parameter up or down, clamped to its range
    pub fn adjust_param(&mut self, direction: i8) {
        let param = Param::ALL[self.param_cursor];
        let params = self.store.params();
        let current = match param {
            Param::Temperature => params.temperature,
            Param::MaxTokens => params.max_tokens as f64,
            Param::TopP => params.top_p,
        };
        let (min, max) = param.range();
        let stepped = current + f64::from(direction) * param.step();
        // Snap to the step grid to avoid float drift like 0.7000000000000001
        let snapped = (stepped / param.step()).round() * param.step();
        let value = snapped.clamp(min, max);
        if (value - current).abs() < f64::EPSILON {
            return;
        }
        if let Err(e) = self.store.set_parameter(param, value) {
            self.toast(e.to_string());
        }
    }

    // ── Editor ───────────────────────────────────────────────────────────

    fn byte_index(&self, char_index: usize) -> usize {
        self.store
            .draft_prompt()
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or_else(|| self.store.draft_prompt().len())
    }

    pub fn insert_char(&mut self, c: char) {
        let mut draft = self.store.draft_prompt().to_string();
        draft.insert(self.byte_index(self.editor_cursor), c);
        self.store.set_prompt(draft);
        self.editor_cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.editor_cursor == 0 {
            return;
        }
        let idx = self.byte_index(self.editor_cursor - 1);
        let mut draft = self.store.draft_prompt().to_string();
        draft.remove(idx);
        self.store.set_prompt(draft);
        self.editor_cursor -= 1;
    }

    pub fn cursor_left(&mut self) {
        self.editor_cursor = self.editor_cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let len = self.store.draft_prompt().chars().count();
        if self.editor_cursor < len {
            self.editor_cursor += 1;
        }
    }

    pub fn cursor_home(&mut self) {
        let (_, col) = self.cursor_line_col();
        self.editor_cursor -= col;
    }

    pub fn cursor_end(&mut self) {
        let (line, col) = self.cursor_line_col();
        let line_len = self.line_lengths().get(line).copied().unwrap_or(0);
        self.editor_cursor += line_len - col;
    }

    pub fn cursor_up(&mut self) {
        let (line, col) = self.cursor_line_col();
        if line == 0 {
            return;
        }
        let prev_len = self.line_lengths()[line - 1];
        // -1 for the newline between the lines
        self.editor_cursor -= col + 1 + (prev_len - col.min(prev_len));
    }

    pub fn cursor_down(&mut self) {
        let lengths = self.line_lengths();
        let (line, col) = self.cursor_line_col();
        if line + 1 >= lengths.len() {
            return;
        }
        let rest_of_line = lengths[line] - col;
        let next_col = col.min(lengths[line + 1]);
        self.editor_cursor += rest_of_line + 1 + next_col;
    }

    /// Caret position as (line, column) in chars, for rendering
    pub fn cursor_line_col(&self) -> (usize, usize) {
        let mut line = 0;
        let mut col = 0;
        for c in self.store.draft_prompt().chars().take(self.editor_cursor) {
            if c == '\n' {
                line += 1;
                col = 0;
            } else {
                col += 1;
            }
        }
        (line, col)
    }

    fn line_lengths(&self) -> Vec<usize> {
        self.store
            .draft_prompt()
            .split('\n')
            .map(|l| l.chars().count())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::MockGeneration;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn app() -> App {
        let (events_tx, _rx) = mpsc::channel(4);
        let store = SessionStore::new(
            Arc::new(MockGeneration::default()),
            events_tx,
            "gpt-4".to_string(),
        );
        App::new(store, LogBuffer::new(), PathBuf::from("."))
    }

    #[tokio::test]
    async fn editor_insert_and_backspace_respect_utf8() {
        let mut a = app();
        for c in "héllo".chars() {
            a.insert_char(c);
        }
        assert_eq!(a.store.draft_prompt(), "héllo");
        a.backspace();
        a.backspace();
        assert_eq!(a.store.draft_prompt(), "hél");
        a.cursor_left();
        a.insert_char('x');
        assert_eq!(a.store.draft_prompt(), "héxl");
    }

    #[tokio::test]
    async fn cursor_moves_between_lines() {
        let mut a = app();
        for c in "ab\ncdef".chars() {
            a.insert_char(c);
        }
        assert_eq!(a.cursor_line_col(), (1, 4));
        a.cursor_up();
        assert_eq!(a.cursor_line_col(), (0, 2));
        a.cursor_down();
        assert_eq!(a.cursor_line_col(), (1, 2));
        a.cursor_home();
        assert_eq!(a.cursor_line_col(), (1, 0));
        a.cursor_end();
        assert_eq!(a.cursor_line_col(), (1, 4));
    }

    #[tokio::test]
    async fn adjust_param_clamps_at_range_edges() {
        let mut a = app();
        a.param_cursor = 2; // top_p, default 0.9
        a.adjust_param(1);
        a.adjust_param(1);
        a.adjust_param(1);
        assert_eq!(a.store.params().top_p, 1.0);
        for _ in 0..30 {
            a.adjust_param(-1);
        }
        assert_eq!(a.store.params().top_p, 0.0);
        // Clamping never produced an out-of-range toast
        assert!(a.toasts.is_empty());
    }

    #[tokio::test]
    async fn focus_cycles_through_all_panes() {
        let mut focus = Focus::Editor;
        for _ in 0..4 {
            focus = focus.next();
        }
        assert_eq!(focus, Focus::Editor);
        assert_eq!(Focus::Editor.prev(), Focus::Params);
    }
}
