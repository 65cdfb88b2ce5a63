//! Keyboard event handling.

use crate::app::{App, Focus, InputMode};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Handle a key event. Returns true if the app should quit.
pub fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    match app.input_mode {
        InputMode::Normal => handle_normal_key(app, key),
        InputMode::Filter => handle_filter_key(app, key),
        InputMode::Palette => handle_palette_key(app, key),
        InputMode::Form => handle_form_key(app, key),
        InputMode::ConfirmDelete => handle_confirm_delete_key(app, key),
        InputMode::ImportPath => handle_import_path_key(app, key),
        InputMode::CopyField => handle_copy_field_key(app, key),
    }
    app.should_quit
}

fn ctrl(key: &KeyEvent, c: char) -> bool {
    key.code == KeyCode::Char(c) && key.modifiers.contains(KeyModifiers::CONTROL)
}

fn handle_normal_key(app: &mut App, key: KeyEvent) {
    if ctrl(&key, 'c') {
        app.should_quit = true;
        return;
    }

    // Ctrl+P to jump
    if ctrl(&key, 'p') {
        app.start_palette();
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('j') | KeyCode::Down => app.move_down(),
        KeyCode::Char('k') | KeyCode::Up => app.move_up(),
        KeyCode::Char('/') => app.start_filter(),
        KeyCode::Char('a') => app.start_add(),
        KeyCode::Char('e') => app.start_edit(),
        KeyCode::Char('d') | KeyCode::Delete => app.request_delete(),
        KeyCode::Char('v') => app.toggle_reveal(),
        KeyCode::Char('c') => app.start_copy(),
        KeyCode::Char('C') => app.copy_all(),
        KeyCode::Char('x') => app.export(),
        KeyCode::Char('i') => app.start_import(),
        KeyCode::Char('t') => app.toggle_theme(),
        KeyCode::Enter => app.focus = Focus::Detail,
        KeyCode::Tab => {
            app.focus = match app.focus {
                Focus::List => Focus::Detail,
                Focus::Detail => Focus::List,
            };
        }
        KeyCode::Esc => {
            if app.focus == Focus::Detail {
                app.focus = Focus::List;
                app.reveal_password = false;
            } else if !app.filter_query.is_empty() {
                app.exit_filter(true);
            }
        }
        _ => {}
    }
}

fn handle_filter_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.exit_filter(true),
        KeyCode::Enter => app.exit_filter(false),
        KeyCode::Backspace => app.filter_pop(),
        KeyCode::Char(c) => app.filter_push(c),
        _ => {}
    }
}

fn handle_palette_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.exit_palette(),
        KeyCode::Enter => app.select_palette_result(),
        KeyCode::Up => {
            if app.palette_selected > 0 {
                app.palette_selected -= 1;
            }
        }
        KeyCode::Down => {
            if app.palette_selected + 1 < app.palette_results.len() {
                app.palette_selected += 1;
            }
        }
        KeyCode::Char(c) => {
            app.palette_query.push(c);
            app.perform_palette_search();
        }
        KeyCode::Backspace => {
            app.palette_query.pop();
            app.perform_palette_search();
        }
        _ => {}
    }
}

fn handle_form_key(app: &mut App, key: KeyEvent) {
    if ctrl(&key, 'g') {
        app.regenerate_password();
        return;
    }
    if ctrl(&key, 'n') {
        app.complete_field();
        return;
    }

    let Some(form) = app.form.as_mut() else {
        app.input_mode = InputMode::Normal;
        return;
    };

    if ctrl(&key, 'o') {
        form.toggle_optional();
        return;
    }
    if ctrl(&key, 't') {
        form.switch_type();
        return;
    }
    if ctrl(&key, 'r') {
        form.reveal_password = !form.reveal_password;
        return;
    }

    match key.code {
        KeyCode::Esc => app.cancel_form(),
        KeyCode::Enter => app.submit_form(),
        KeyCode::Tab | KeyCode::Down => form.focus_next(),
        KeyCode::BackTab | KeyCode::Up => form.focus_prev(),
        KeyCode::Backspace => form.pop_char(),
        KeyCode::Char(c) => form.push_char(c),
        _ => {}
    }
}

fn handle_confirm_delete_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => app.confirm_delete(true),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.confirm_delete(false),
        _ => {}
    }
}

fn handle_import_path_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => app.submit_import_path(),
        KeyCode::Backspace => {
            app.path_input.pop();
        }
        KeyCode::Char(c) => app.path_input.push(c),
        _ => {}
    }
}

fn handle_copy_field_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char(c) if c.is_ascii_digit() => {
            app.copy_field(c.to_digit(10).unwrap_or_default() as usize)
        }
        _ => app.input_mode = InputMode::Normal,
    }
}
