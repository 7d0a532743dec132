use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Tabs, Wrap},
};

use crate::app::{AppState, InputMode};
use crate::flatten::value_text;
use crate::sync::format_time_remaining;

const LINE_COLUMN_WIDTH: u16 = 6;
const DETAIL_HEIGHT: u16 = 12;

/// Draw the entire UI
pub fn draw(frame: &mut Frame, state: &mut AppState) {
    let detail_visible = state.show_detail && !state.tabs.is_empty();
    let constraints = if detail_visible {
        vec![
            Constraint::Length(1),             // Tab bar
            Constraint::Min(3),                // Table
            Constraint::Length(DETAIL_HEIGHT), // Raw record pane
            Constraint::Length(1),             // Status bar
            Constraint::Length(1),             // Input / message bar
        ]
    } else {
        vec![
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ]
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(frame.area());

    draw_tab_bar(frame, state, chunks[0]);
    draw_table(frame, state, chunks[1]);
    if detail_visible {
        draw_detail(frame, state, chunks[2]);
    }
    let status_idx = if detail_visible { 3 } else { 2 };
    draw_status_bar(frame, state, chunks[status_idx]);
    draw_input_bar(frame, state, chunks[status_idx + 1]);

    if let Some(alert) = state.alert.clone() {
        draw_alert(frame, state, &alert);
    }
    if state.show_help {
        draw_help_overlay(frame);
    }
}

fn draw_tab_bar(frame: &mut Frame, state: &AppState, area: Rect) {
    let titles: Vec<Line> = state
        .tabs
        .iter()
        .map(|tab| Line::from(tab.title.as_str()))
        .collect();
    let tabs = Tabs::new(titles)
        .select(state.active_tab)
        .style(Style::default().fg(state.theme.tab_inactive))
        .highlight_style(
            Style::default()
                .fg(state.theme.tab_active)
                .add_modifier(Modifier::BOLD),
        )
        .divider("│");
    frame.render_widget(tabs, area);
}

/// The main table: a line-number column plus the configured columns, showing
/// the flattened and filtered records of the active tab.
fn draw_table(frame: &mut Frame, state: &mut AppState, area: Rect) {
    let theme = state.theme.clone();
    let columns = state.columns.clone();
    let severity_colors = state.severity_colors_enabled;
    let filter_column_idx = state.filter_column_idx;
    let Some(tab) = state.active_mut() else {
        let msg = Paragraph::new("No files open. Press 'a' to add one.")
            .style(Style::default().fg(theme.empty_state));
        frame.render_widget(msg, area);
        return;
    };

    let mut header_cells = vec![Cell::from("Line")];
    for (i, column) in columns.iter().enumerate() {
        let has_filter = !tab.filters.get(column).is_empty();
        let label = if has_filter {
            format!("{column}*")
        } else {
            column.clone()
        };
        let mut style = Style::default().add_modifier(Modifier::BOLD);
        if i == filter_column_idx {
            style = style.fg(theme.filtered_column);
        }
        header_cells.push(Cell::from(label).style(style));
    }
    let header = Row::new(header_cells).style(Style::default().bg(theme.header_bg));

    let rows: Vec<Row> = tab
        .visible
        .iter()
        .map(|&row_idx| {
            let record = &tab.rows[row_idx];
            let mut cells = vec![
                Cell::from(format!("{}", row_idx + 1))
                    .style(Style::default().fg(theme.line_number)),
            ];
            for column in &columns {
                cells.push(Cell::from(value_text(record.get(column))));
            }
            Row::new(cells).style(tab.row_style(record, &theme, severity_colors))
        })
        .collect();

    let mut widths = vec![Constraint::Length(LINE_COLUMN_WIDTH)];
    widths.extend(columns.iter().map(|_| Constraint::Min(10)));

    let table = Table::new(rows, widths)
        .header(header)
        .row_highlight_style(
            Style::default()
                .bg(theme.selected_row_bg)
                .add_modifier(Modifier::BOLD),
        )
        .column_spacing(1);

    let mut table_state = TableState::default()
        .with_offset(tab.scroll_offset)
        .with_selected(if tab.visible.is_empty() {
            None
        } else {
            Some(tab.selected)
        });
    frame.render_stateful_widget(table, area, &mut table_state);
    tab.scroll_offset = table_state.offset();

    if tab.records.is_empty() {
        let message = match tab.loading {
            Some(fraction) => format!("Loading... {:.0}%", fraction * 100.0),
            None => "Waiting for records...".to_string(),
        };
        let msg = Paragraph::new(message).style(Style::default().fg(theme.empty_state));
        let inner = Rect {
            y: area.y + 1,
            height: area.height.saturating_sub(1),
            ..area
        };
        frame.render_widget(msg, inner);
    } else if tab.visible.is_empty() {
        let msg = Paragraph::new("No records match the current filters")
            .style(Style::default().fg(theme.warning_message));
        let inner = Rect {
            y: area.y + 1,
            height: area.height.saturating_sub(1),
            ..area
        };
        frame.render_widget(msg, inner);
    }
}

/// Pretty-printed raw JSON of the selected row.
fn draw_detail(frame: &mut Frame, state: &AppState, area: Rect) {
    let theme = &state.theme;
    let Some(tab) = state.active() else { return };

    let (title, body) = match tab.selected_record() {
        Some(record) => {
            let line = tab.visible.get(tab.selected).map(|i| i + 1).unwrap_or(0);
            let json = serde_json::to_string_pretty(record)
                .unwrap_or_else(|_| "<unserializable record>".to_string());
            (format!(" Record {line} "), json)
        }
        None => (" Record ".to_string(), "No record selected.".to_string()),
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::TOP)
        .border_style(Style::default().fg(theme.border));
    let paragraph = Paragraph::new(Text::raw(body))
        .style(Style::default().fg(theme.json))
        .wrap(Wrap { trim: false })
        .block(block);
    frame.render_widget(paragraph, area);
}

/// Status bar matching the original viewer's status label: record counts,
/// sync timestamps, and the countdown to the next automatic sync.
fn draw_status_bar(frame: &mut Frame, state: &AppState, area: Rect) {
    let theme = &state.theme;

    let mode_str = match state.mode {
        InputMode::Normal => "NORMAL",
        InputMode::FilterEdit => "FILTER",
        InputMode::IntervalEdit => "INTERVAL",
        InputMode::PathEdit => "ADD FILE",
    };

    let mut text = String::new();
    if let Some(tab) = state.active() {
        let (shown, total) = tab.counts();
        text.push_str(&format!(" {shown} of {total} records displayed."));
        if let Some(at) = tab.last_manual_sync {
            text.push_str(&format!("  Last Manual Sync: {}", at.format("%Y-%m-%d %H:%M:%S")));
        }
        if let Some(at) = tab.last_auto_sync {
            text.push_str(&format!(
                "  Last Automatic Sync: {}",
                at.format("%Y-%m-%d %H:%M:%S")
            ));
        }
    }
    let countdown = if state.countdown.is_empty() {
        format_time_remaining(0)
    } else {
        state.countdown.clone()
    };
    text.push_str(&format!("  Next Automatic Sync: {countdown}"));

    let follow = if state.auto_scroll { " [F]" } else { "" };
    let colors = if state.severity_colors_enabled { " [C]" } else { "" };

    let status = Line::from(vec![
        Span::styled(
            format!(" {mode_str} "),
            Style::default()
                .bg(theme.status_mode_bg)
                .fg(theme.status_mode_fg),
        ),
        Span::raw(text),
        Span::raw(format!("{follow}{colors} ")),
        Span::styled(
            " ?:help  /:filter  R:sync ",
            Style::default().fg(theme.status_help),
        ),
    ]);
    frame.render_widget(Paragraph::new(status), area);
}

/// Bottom bar: the shared input widget while editing, otherwise the active
/// tab's transient status and filter summary.
fn draw_input_bar(frame: &mut Frame, state: &mut AppState, area: Rect) {
    match state.mode {
        InputMode::FilterEdit => {
            let column = state.filter_column().unwrap_or("?").to_string();
            draw_input_prompt(frame, state, area, format!("{column}/"));
        }
        InputMode::IntervalEdit => draw_input_prompt(frame, state, area, "minutes:".to_string()),
        InputMode::PathEdit => draw_input_prompt(frame, state, area, "open:".to_string()),
        InputMode::Normal => {
            let theme = &state.theme;
            let Some(tab) = state.active() else { return };
            let mut spans = Vec::new();
            if let Some(status) = &tab.status {
                let style = if tab.status_is_error {
                    Style::default().fg(theme.error_message)
                } else {
                    Style::default().fg(theme.warning_message)
                };
                spans.push(Span::styled(status.clone(), style));
            }
            if tab.filters.active_count() > 0 {
                if !spans.is_empty() {
                    spans.push(Span::raw("  "));
                }
                spans.push(Span::styled(
                    format!("filters: {}", tab.filters.summary()),
                    Style::default().fg(theme.filtered_column),
                ));
            }
            frame.render_widget(Paragraph::new(Line::from(spans)), area);
        }
    }
}

fn draw_input_prompt(frame: &mut Frame, state: &mut AppState, area: Rect, prompt: String) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(prompt.len() as u16 + 1),
            Constraint::Min(1),
        ])
        .split(area);

    let prefix =
        Paragraph::new(prompt).style(Style::default().fg(state.theme.filtered_column));
    frame.render_widget(prefix, chunks[0]);
    frame.render_widget(&state.input, chunks[1]);
}

/// Modal-style alert for manual refresh failures.
fn draw_alert(frame: &mut Frame, state: &AppState, message: &str) {
    let area = frame.area();
    let width = 60.min(area.width.saturating_sub(4));
    let height = 7.min(area.height.saturating_sub(4));
    let x = (area.width - width) / 2;
    let y = (area.height - height) / 2;
    let alert_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, alert_area);

    let block = Block::default()
        .title(" Error ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(state.theme.error_message));
    let text = vec![
        Line::from(message.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "press any key to dismiss",
            Style::default().fg(state.theme.status_help),
        )),
    ];
    let paragraph = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(block);
    frame.render_widget(paragraph, alert_area);
}

/// Draw the help overlay
fn draw_help_overlay(frame: &mut Frame) {
    let area = frame.area();

    let width = 52.min(area.width.saturating_sub(4));
    let height = 22.min(area.height.saturating_sub(4));
    let x = (area.width - width) / 2;
    let y = (area.height - height) / 2;
    let help_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, help_area);

    let help_text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Navigation:"),
        Line::from("  j/k, ↑/↓     Select row"),
        Line::from("  g/G          First/last row"),
        Line::from("  PgUp/PgDn    Page up/down"),
        Line::from("  Tab, [/]     Switch file tab"),
        Line::from("  h/l, ←/→     Select filter column"),
        Line::from(""),
        Line::from("Filtering & refresh:"),
        Line::from("  /            Edit filter for selected column"),
        Line::from("  x / X        Clear column filter / all filters"),
        Line::from("  R            Manual sync (full reload)"),
        Line::from("  i            Set automatic sync interval"),
        Line::from(""),
        Line::from("Display:"),
        Line::from("  d            Toggle raw record pane"),
        Line::from("  c            Toggle severity colors"),
        Line::from("  f            Toggle auto-scroll"),
        Line::from("  o            Cycle color for selected group"),
        Line::from("  y            Copy raw record"),
        Line::from("  a            Add file   q: quit   ?: help"),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ratatui::style::Color::Cyan))
        .style(Style::default().bg(ratatui::style::Color::Black));

    let paragraph = Paragraph::new(help_text).block(block);
    frame.render_widget(paragraph, help_area);
}
