use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use log::info;
use ratatui::style::{Color, Style};
use tui_textarea::TextArea;

use crate::config::Config;
use crate::filter::{ColumnFilters, matching_indices};
use crate::flatten::{FlatRecord, flatten_record, value_text};
use crate::ingest::Record;
use crate::sync::{RefreshKind, SyncCommand, SyncEvent, format_time_remaining};
use crate::theme::Theme;

/// Input mode for the application
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMode {
    /// Normal navigation mode
    Normal,
    /// Editing the filter for the selected column
    FilterEdit,
    /// Entering a new automatic sync interval in minutes
    IntervalEdit,
    /// Entering a path for a new file tab
    PathEdit,
}

/// Everything tracked for one open file: the cached records, their flattened
/// and filtered projections, per-column filters, color overrides, and sync
/// timestamps. Created when the file is opened, discarded on exit.
pub struct FileTab {
    pub path: PathBuf,
    pub title: String,
    /// Raw records, positionally identical to the ingest cache. The detail
    /// view indexes into this by line index.
    pub records: Vec<Record>,
    /// Flattened records, parallel to `records`.
    pub rows: Vec<FlatRecord>,
    /// Indices into `rows` that pass the current filters, in record order.
    pub visible: Vec<usize>,
    pub filters: ColumnFilters,
    /// Group value → row background override. Wins over severity coloring.
    pub group_colors: HashMap<String, Color>,
    pub last_manual_sync: Option<DateTime<Local>>,
    pub last_auto_sync: Option<DateTime<Local>>,
    /// Total line count of the file as of the last load.
    pub total_lines: usize,
    /// Selected row, as an index into `visible`.
    pub selected: usize,
    /// Table scroll offset, persisted across draws.
    pub scroll_offset: usize,
    /// Transient per-tab status text, error-styled when `status_is_error`.
    pub status: Option<String>,
    pub status_is_error: bool,
    /// Load progress fraction while a refresh is running.
    pub loading: Option<f64>,
}

impl FileTab {
    pub fn new(path: PathBuf) -> Self {
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            title,
            records: Vec::new(),
            rows: Vec::new(),
            visible: Vec::new(),
            filters: ColumnFilters::new(),
            group_colors: HashMap::new(),
            last_manual_sync: None,
            last_auto_sync: None,
            total_lines: 0,
            selected: 0,
            scroll_offset: 0,
            status: None,
            status_is_error: false,
            loading: None,
        }
    }

    /// Full refresh result: replace everything and re-filter.
    pub fn replace_records(
        &mut self,
        records: Vec<Record>,
        total_lines: usize,
        at: DateTime<Local>,
        separator: &str,
        follow: bool,
    ) {
        self.rows = records
            .iter()
            .map(|rec| flatten_record(rec, separator))
            .collect();
        self.records = records;
        self.total_lines = total_lines;
        self.last_manual_sync = Some(at);
        self.loading = None;
        self.status = None;
        self.status_is_error = false;
        self.recompute_visible();
        if follow {
            self.select_last();
        }
    }

    /// Incremental refresh result: append only, never disturbing rows that
    /// are already displayed.
    pub fn append_records(
        &mut self,
        records: Vec<Record>,
        total_lines: usize,
        at: DateTime<Local>,
        separator: &str,
        follow: bool,
    ) {
        for rec in records {
            let row = flatten_record(&rec, separator);
            let idx = self.rows.len();
            if self.filters.matches(&row) {
                self.visible.push(idx);
            }
            self.rows.push(row);
            self.records.push(rec);
        }
        self.total_lines = total_lines;
        self.last_auto_sync = Some(at);
        self.loading = None;
        self.status = None;
        self.status_is_error = false;
        if follow {
            self.select_last();
        }
    }

    /// Re-filter every row from scratch. Used after filter edits and full
    /// refreshes, never after an incremental append.
    pub fn recompute_visible(&mut self) {
        self.visible = matching_indices(&self.rows, &self.filters);
        if self.visible.is_empty() {
            self.selected = 0;
        } else {
            self.selected = self.selected.min(self.visible.len() - 1);
        }
    }

    pub fn set_filter(&mut self, column: &str, text: String) {
        self.filters.set(column, text);
        self.recompute_visible();
    }

    /// Shown and total record counts for the status line.
    pub fn counts(&self) -> (usize, usize) {
        (self.visible.len(), self.total_lines)
    }

    /// The raw record behind the selected table row.
    pub fn selected_record(&self) -> Option<&Record> {
        let row_idx = *self.visible.get(self.selected)?;
        self.records.get(row_idx)
    }

    pub fn selected_row(&self) -> Option<&FlatRecord> {
        let row_idx = *self.visible.get(self.selected)?;
        self.rows.get(row_idx)
    }

    /// Row background: group override first, then severity palette.
    pub fn row_style(&self, row: &FlatRecord, theme: &Theme, severity_colors: bool) -> Style {
        let group = value_text(row.get("group"));
        if let Some(&color) = self.group_colors.get(&group) {
            return Style::default().bg(color);
        }
        if severity_colors {
            let severity = value_text(row.get("severity"));
            if let Some(color) = theme.severity_color(&severity) {
                return Style::default().bg(color);
            }
        }
        Style::default()
    }

    pub fn select_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_down(&mut self) {
        if !self.visible.is_empty() && self.selected < self.visible.len() - 1 {
            self.selected += 1;
        }
    }

    pub fn select_page_up(&mut self, page_size: usize) {
        self.selected = self.selected.saturating_sub(page_size);
    }

    pub fn select_page_down(&mut self, page_size: usize) {
        if !self.visible.is_empty() {
            self.selected = (self.selected + page_size).min(self.visible.len() - 1);
        }
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.visible.len().saturating_sub(1);
    }
}

/// Main application state
pub struct AppState<'a> {
    pub tabs: Vec<FileTab>,
    pub active_tab: usize,
    /// Columns shown in the table, from config.
    pub columns: Vec<String>,
    pub separator: String,
    pub mode: InputMode,
    /// Shared input widget for filter, interval, and path entry.
    pub input: TextArea<'a>,
    /// Column the filter cursor is on, as an index into `columns`.
    pub filter_column_idx: usize,
    pub severity_colors_enabled: bool,
    /// Follow mode: keep the newest row selected as records arrive.
    pub auto_scroll: bool,
    pub show_detail: bool,
    pub show_help: bool,
    pub should_quit: bool,
    pub theme: Theme,
    /// When the next automatic cycle fires, from the scheduler.
    pub next_sync_at: Option<Instant>,
    /// Countdown text, recomputed on each one-second tick.
    pub countdown: String,
    /// Modal-style alert for manual refresh failures, dismissed by any key.
    pub alert: Option<String>,
    /// Commands for the scheduler, drained by the event loop after each key.
    pub pending_commands: Vec<SyncCommand>,
}

impl<'a> AppState<'a> {
    pub fn new(config: &Config, files: &[PathBuf]) -> Self {
        let mut input = TextArea::default();
        input.set_cursor_line_style(Style::default());

        let mut tabs: Vec<FileTab> = Vec::new();
        for path in files {
            tabs.push(FileTab::new(path.clone()));
        }

        Self {
            tabs,
            active_tab: 0,
            columns: config.columns.clone(),
            separator: config.separator.clone(),
            mode: InputMode::Normal,
            input,
            filter_column_idx: 0,
            severity_colors_enabled: config.severity_colors_enabled,
            auto_scroll: config.auto_scroll,
            show_detail: true,
            show_help: false,
            should_quit: false,
            theme: Theme::from_config(config),
            next_sync_at: None,
            countdown: String::new(),
            alert: None,
            pending_commands: Vec::new(),
        }
    }

    pub fn active(&self) -> Option<&FileTab> {
        self.tabs.get(self.active_tab)
    }

    pub fn active_mut(&mut self) -> Option<&mut FileTab> {
        self.tabs.get_mut(self.active_tab)
    }

    fn tab_mut(&mut self, path: &Path) -> &mut FileTab {
        if let Some(idx) = self.tabs.iter().position(|t| t.path == path) {
            return &mut self.tabs[idx];
        }
        self.tabs.push(FileTab::new(path.to_path_buf()));
        self.tabs.last_mut().unwrap()
    }

    /// Fold a scheduler event into the state.
    pub fn handle_sync_event(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::Loaded {
                path,
                kind,
                records,
                total_lines,
                at,
            } => {
                let separator = self.separator.clone();
                let follow = self.auto_scroll;
                let tab = self.tab_mut(&path);
                match kind {
                    RefreshKind::Manual => {
                        tab.replace_records(records, total_lines, at, &separator, follow)
                    }
                    RefreshKind::Automatic => {
                        tab.append_records(records, total_lines, at, &separator, follow)
                    }
                }
            }
            SyncEvent::Failed {
                path,
                kind,
                message,
            } => {
                if kind == RefreshKind::Manual {
                    self.alert = Some(format!("Failed to load {}: {message}", path.display()));
                }
                let tab = self.tab_mut(&path);
                tab.loading = None;
                tab.status = Some(format!("Error: {message}"));
                tab.status_is_error = true;
            }
            SyncEvent::Progress { path, fraction } => {
                self.tab_mut(&path).loading = Some(fraction);
            }
            SyncEvent::Scheduled { next_sync } => {
                self.next_sync_at = Some(next_sync);
                self.refresh_countdown();
            }
            SyncEvent::Tick => self.refresh_countdown(),
        }
    }

    fn refresh_countdown(&mut self) {
        self.countdown = match self.next_sync_at {
            Some(at) => {
                let remaining = at.saturating_duration_since(Instant::now());
                format_time_remaining(remaining.as_secs())
            }
            None => String::new(),
        };
    }

    pub fn next_tab(&mut self) {
        if !self.tabs.is_empty() {
            self.active_tab = (self.active_tab + 1) % self.tabs.len();
        }
    }

    pub fn prev_tab(&mut self) {
        if !self.tabs.is_empty() {
            self.active_tab = (self.active_tab + self.tabs.len() - 1) % self.tabs.len();
        }
    }

    pub fn next_filter_column(&mut self) {
        if !self.columns.is_empty() {
            self.filter_column_idx = (self.filter_column_idx + 1) % self.columns.len();
        }
    }

    pub fn prev_filter_column(&mut self) {
        if !self.columns.is_empty() {
            self.filter_column_idx =
                (self.filter_column_idx + self.columns.len() - 1) % self.columns.len();
        }
    }

    pub fn filter_column(&self) -> Option<&str> {
        self.columns.get(self.filter_column_idx).map(String::as_str)
    }

    /// Open the input bar prefilled with the selected column's filter.
    pub fn begin_filter_edit(&mut self) {
        let Some(column) = self.filter_column() else {
            return;
        };
        let current = self
            .active()
            .map(|t| t.filters.get(column).to_string())
            .unwrap_or_default();
        self.input = TextArea::new(vec![current]);
        self.input.set_cursor_line_style(Style::default());
        self.mode = InputMode::FilterEdit;
    }

    pub fn apply_filter_edit(&mut self) {
        let text = self.input_text();
        if let Some(column) = self.filter_column().map(str::to_string) {
            if let Some(tab) = self.active_mut() {
                tab.set_filter(&column, text.clone());
                tab.status = Some(if text.is_empty() {
                    format!("Filter cleared for {column}")
                } else {
                    format!("Filter {column}={text}")
                });
                tab.status_is_error = false;
            }
        }
        self.mode = InputMode::Normal;
    }

    pub fn begin_interval_edit(&mut self) {
        self.input = TextArea::default();
        self.input.set_cursor_line_style(Style::default());
        self.input
            .set_placeholder_text("automatic sync interval in minutes");
        self.mode = InputMode::IntervalEdit;
    }

    pub fn apply_interval_edit(&mut self) {
        let text = self.input_text();
        match text.trim().parse::<u64>() {
            Ok(minutes) if minutes >= 1 => {
                let interval = Duration::from_secs(minutes.saturating_mul(60));
                info!("requested automatic sync interval of {minutes} minutes");
                self.pending_commands.push(SyncCommand::SetInterval(interval));
                self.set_status(format!("Automatic sync every {minutes} minutes"), false);
            }
            _ => self.set_status(format!("Invalid interval: {text}"), true),
        }
        self.mode = InputMode::Normal;
    }

    pub fn begin_path_edit(&mut self) {
        self.input = TextArea::default();
        self.input.set_cursor_line_style(Style::default());
        self.input.set_placeholder_text("path to a log file");
        self.mode = InputMode::PathEdit;
    }

    pub fn apply_path_edit(&mut self) {
        let text = self.input_text();
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            let path = PathBuf::from(trimmed);
            if !self.tabs.iter().any(|t| t.path == path) {
                self.tabs.push(FileTab::new(path.clone()));
                self.active_tab = self.tabs.len() - 1;
            }
            self.pending_commands.push(SyncCommand::AddFile(path));
        }
        self.mode = InputMode::Normal;
    }

    pub fn cancel_input(&mut self) {
        self.mode = InputMode::Normal;
    }

    pub fn input_text(&self) -> String {
        self.input.lines().join("")
    }

    /// Full reparse of every file, driven by the scheduler.
    pub fn request_manual_refresh(&mut self) {
        self.pending_commands.push(SyncCommand::ManualRefresh);
        for tab in &mut self.tabs {
            tab.status = Some("Syncing...".to_string());
            tab.status_is_error = false;
        }
    }

    pub fn toggle_severity_colors(&mut self) {
        self.severity_colors_enabled = !self.severity_colors_enabled;
        let status = format!(
            "Severity colors: {}",
            if self.severity_colors_enabled { "on" } else { "off" }
        );
        self.set_status(status, false);
    }

    pub fn toggle_auto_scroll(&mut self) {
        self.auto_scroll = !self.auto_scroll;
        if self.auto_scroll {
            for tab in &mut self.tabs {
                tab.select_last();
            }
        }
        let status = format!(
            "Auto-scroll: {}",
            if self.auto_scroll { "on" } else { "off" }
        );
        self.set_status(status, false);
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    /// Cycle the group-color override for the selected row's group value.
    pub fn cycle_group_color(&mut self) {
        let theme = self.theme.clone();
        let Some(tab) = self.active_mut() else { return };
        let group = match tab.selected_row() {
            Some(row) => value_text(row.get("group")),
            None => return,
        };
        if group.is_empty() {
            tab.status = Some("Selected row has no group value".to_string());
            tab.status_is_error = false;
            return;
        }
        let current = tab.group_colors.get(&group).copied();
        match theme.next_group_color(current) {
            Some(color) => {
                tab.group_colors.insert(group.clone(), color);
                tab.status = Some(format!("Color set for group {group}"));
            }
            None => {
                tab.group_colors.remove(&group);
                tab.status = Some(format!("Color cleared for group {group}"));
            }
        }
        tab.status_is_error = false;
    }

    /// Copy the selected row's raw JSON to the clipboard.
    pub fn copy_selected_record(&mut self) {
        let Some(tab) = self.active() else { return };
        let Some(record) = tab.selected_record() else {
            return;
        };
        let json = serde_json::to_string_pretty(record)
            .unwrap_or_else(|_| "<unserializable record>".to_string());
        let result = arboard::Clipboard::new().and_then(|mut cb| cb.set_text(json));
        let (status, is_error) = match result {
            Ok(()) => ("Record copied to clipboard".to_string(), false),
            Err(e) => (format!("Clipboard error: {e}"), true),
        };
        self.set_status(status, is_error);
    }

    fn set_status(&mut self, status: String, is_error: bool) {
        if let Some(tab) = self.active_mut() {
            tab.status = Some(status);
            tab.status_is_error = is_error;
        }
    }
}
