use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use tui_textarea::Input;

use crate::app::{AppState, InputMode};

/// Handle a mouse event
pub fn handle_mouse(state: &mut AppState, mouse: MouseEvent, _page_size: usize) {
    let Some(tab) = state.active_mut() else { return };
    match mouse.kind {
        MouseEventKind::ScrollUp => {
            for _ in 0..3 {
                tab.select_up();
            }
        }
        MouseEventKind::ScrollDown => {
            for _ in 0..3 {
                tab.select_down();
            }
        }
        _ => {}
    }
}

/// Handle a key event and update app state accordingly
pub fn handle_key(state: &mut AppState, key: KeyEvent, page_size: usize) {
    // A pending alert swallows the next key press.
    if state.alert.is_some() {
        state.alert = None;
        return;
    }

    // Help overlay takes priority
    if state.show_help {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?')) {
            state.show_help = false;
        }
        return;
    }

    match state.mode {
        InputMode::Normal => handle_normal_mode(state, key, page_size),
        InputMode::FilterEdit | InputMode::IntervalEdit | InputMode::PathEdit => {
            handle_edit_mode(state, key)
        }
    }
}

fn handle_normal_mode(state: &mut AppState, key: KeyEvent, page_size: usize) {
    match key.code {
        // Quit
        KeyCode::Char('q') => {
            state.should_quit = true;
        }
        // Ctrl+C also quits
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            state.should_quit = true;
        }

        // Help
        KeyCode::Char('?') => {
            state.show_help = true;
        }

        // Tab switching
        KeyCode::Tab | KeyCode::Char(']') => {
            state.next_tab();
        }
        KeyCode::BackTab | KeyCode::Char('[') => {
            state.prev_tab();
        }

        // Row selection
        KeyCode::Char('j') | KeyCode::Down => {
            if let Some(tab) = state.active_mut() {
                tab.select_down();
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            if let Some(tab) = state.active_mut() {
                tab.select_up();
            }
        }
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            if let Some(tab) = state.active_mut() {
                tab.select_page_down(page_size);
            }
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            if let Some(tab) = state.active_mut() {
                tab.select_page_up(page_size);
            }
        }
        KeyCode::PageDown => {
            if let Some(tab) = state.active_mut() {
                tab.select_page_down(page_size);
            }
        }
        KeyCode::PageUp => {
            if let Some(tab) = state.active_mut() {
                tab.select_page_up(page_size);
            }
        }
        KeyCode::Char('g') => {
            if let Some(tab) = state.active_mut() {
                tab.select_first();
            }
        }
        KeyCode::Char('G') => {
            if let Some(tab) = state.active_mut() {
                tab.select_last();
            }
        }

        // Filter column selection
        KeyCode::Char('l') | KeyCode::Right => {
            state.next_filter_column();
        }
        KeyCode::Char('h') | KeyCode::Left => {
            state.prev_filter_column();
        }

        // Edit the selected column's filter
        KeyCode::Char('/') => {
            state.begin_filter_edit();
        }

        // Clear column filter / all filters
        KeyCode::Char('x') => {
            if let Some(column) = state.filter_column().map(str::to_string) {
                if let Some(tab) = state.active_mut() {
                    tab.filters.clear(&column);
                    tab.recompute_visible();
                }
            }
        }
        KeyCode::Char('X') => {
            if let Some(tab) = state.active_mut() {
                tab.filters.clear_all();
                tab.recompute_visible();
            }
        }

        // Manual sync
        KeyCode::Char('R') => {
            state.request_manual_refresh();
        }

        // Set automatic sync interval
        KeyCode::Char('i') => {
            state.begin_interval_edit();
        }

        // Add a file tab
        KeyCode::Char('a') => {
            state.begin_path_edit();
        }

        // Display toggles
        KeyCode::Char('d') | KeyCode::Enter => {
            state.toggle_detail();
        }
        KeyCode::Char('c') => {
            state.toggle_severity_colors();
        }
        KeyCode::Char('f') => {
            state.toggle_auto_scroll();
        }
        KeyCode::Char('o') => {
            state.cycle_group_color();
        }
        KeyCode::Char('y') => {
            state.copy_selected_record();
        }

        _ => {}
    }
}

fn handle_edit_mode(state: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => match state.mode {
            InputMode::FilterEdit => state.apply_filter_edit(),
            InputMode::IntervalEdit => state.apply_interval_edit(),
            InputMode::PathEdit => state.apply_path_edit(),
            InputMode::Normal => {}
        },
        KeyCode::Esc => {
            state.cancel_input();
        }
        _ => {
            // Forward all other keys to the input widget
            let input = Input::from(key);
            state.input.input(input);
        }
    }
}
