//! UI rendering with Ratatui.

use crate::app::{App, Focus, InputMode, StatusKind};
use crate::config::Theme;
use crate::form::EntryForm;
use acctkeep_core::{Record, RecordType};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    prelude::*,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

const MASK: &str = "••••••••••••";

/// Colors for one theme.
struct Palette {
    text: Color,
    dim: Color,
    accent: Color,
    selection: Color,
    error: Color,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                text: Color::White,
                dim: Color::DarkGray,
                accent: Color::Cyan,
                selection: Color::Rgb(60, 60, 80),
                error: Color::Red,
            },
            Theme::Light => Self {
                text: Color::Black,
                dim: Color::Gray,
                accent: Color::Blue,
                selection: Color::Rgb(200, 210, 235),
                error: Color::Red,
            },
        }
    }

    fn border(&self, focused: bool) -> Style {
        Style::default().fg(if focused { self.accent } else { self.dim })
    }

    fn selected(&self) -> Style {
        Style::default()
            .bg(self.selection)
            .fg(self.text)
            .add_modifier(Modifier::BOLD)
    }
}

/// Main render function.
pub fn render(frame: &mut Frame, app: &App) {
    let palette = Palette::for_theme(app.config.theme);
    let area = frame.area();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    // Split into list (35%) and detail (65%)
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[0]);

    render_list(frame, app, &palette, chunks[0]);
    render_detail(frame, app, &palette, chunks[1]);
    render_status(frame, app, &palette, rows[1]);

    match app.input_mode {
        InputMode::Palette => render_palette(frame, app, &palette, area),
        InputMode::Form => {
            if let Some(form) = &app.form {
                render_form(frame, form, &palette, area);
            }
        }
        InputMode::ConfirmDelete => {
            if let Some(record) = app.selected_record() {
                let message = format!("Delete \"{}\"?", record.display_name());
                render_confirm(frame, &palette, area, " Delete Entry ", &message);
            }
        }
        InputMode::ImportPath => render_import_path(frame, app, &palette, area),
        _ => {}
    }
}

/// Draw the main view with a replace/skip dialog on top.
pub fn render_conflict(frame: &mut Frame, app: &App, message: &str) {
    render(frame, app);
    let palette = Palette::for_theme(app.config.theme);
    render_confirm(frame, &palette, frame.area(), " Duplicate Entry ", message);
}

/// Render the filterable record list.
fn render_list(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let is_focused = app.focus == Focus::List && app.input_mode == InputMode::Normal;

    let title = format!(" Accounts ({}/{}) ", app.visible.len(), app.records.len());
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(palette.border(is_focused));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let show_filter = app.input_mode == InputMode::Filter || !app.filter_query.is_empty();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(if show_filter { 1 } else { 0 }),
            Constraint::Min(1),
        ])
        .split(inner);

    if show_filter {
        let cursor = if app.input_mode == InputMode::Filter { "_" } else { "" };
        let line = Line::from(vec![
            Span::styled("/ ", Style::default().fg(palette.accent)),
            Span::styled(format!("{}{}", app.filter_query, cursor), Style::default().fg(palette.text)),
        ]);
        frame.render_widget(Paragraph::new(line), chunks[0]);
    }

    if app.visible.is_empty() {
        let message = if app.records.is_empty() {
            "No entries yet. Press a to add one."
        } else {
            "No entries match the filter"
        };
        let empty = Paragraph::new(message)
            .style(Style::default().fg(palette.dim))
            .wrap(Wrap { trim: true });
        frame.render_widget(empty, chunks[1]);
        return;
    }

    let items: Vec<ListItem> = app
        .visible
        .iter()
        .enumerate()
        .map(|(i, &index)| {
            let record = &app.records[index];
            let tag = match record.record_type() {
                RecordType::Email => "@",
                RecordType::Website => "#",
            };
            let style = if i == app.selected {
                palette.selected()
            } else {
                Style::default().fg(palette.text)
            };
            let line = Line::from(vec![
                Span::styled(format!("{tag} "), Style::default().fg(palette.accent)),
                Span::styled(record.display_name().to_string(), style),
                Span::styled(
                    format!("  {}", record.kind.username()),
                    Style::default().fg(palette.dim),
                ),
            ]);
            ListItem::new(line).style(style)
        })
        .collect();

    frame.render_widget(List::new(items), chunks[1]);
}

/// Render the detail view of the selected record.
fn render_detail(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let is_focused = app.focus == Focus::Detail && app.input_mode == InputMode::Normal;

    let block = Block::default()
        .title(" Entry Details ")
        .borders(Borders::ALL)
        .border_style(palette.border(is_focused));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(record) = app.selected_record() else {
        let message = Paragraph::new("Select an entry from the list")
            .style(Style::default().fg(palette.dim))
            .alignment(Alignment::Center);
        frame.render_widget(message, centered_rect(40, 1, inner));
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(inner);

    let lines = detail_lines(record, app.reveal_password, palette);
    let body = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(body, chunks[0]);

    let help = if app.input_mode == InputMode::CopyField {
        "Press the number of the field to copy"
    } else {
        "e: edit | d: delete | c<n>: copy | C: copy all | v: reveal"
    };
    let help = Paragraph::new(help).style(Style::default().fg(palette.dim));
    frame.render_widget(help, chunks[1]);
}

fn detail_lines(record: &Record, reveal: bool, palette: &Palette) -> Vec<Line<'static>> {
    let schema = record.record_type().schema();
    let mut copy_number = 0;

    let mut lines = vec![
        Line::from(Span::styled(
            record.display_name().to_string(),
            Style::default().fg(palette.text).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("{} entry #{}", record.record_type(), record.id),
            Style::default().fg(palette.dim),
        )),
        Line::default(),
    ];

    for (label, value) in record.detail_lines() {
        let spec = schema.iter().find(|s| s.label == label);
        let marker = match spec {
            Some(s) if s.copyable => {
                copy_number += 1;
                format!("[{copy_number}] ")
            }
            _ => "    ".to_string(),
        };
        let secret = spec.is_some_and(|s| s.secret);
        let shown = if secret && !reveal { MASK.to_string() } else { value };
        let color = if secret { Color::Yellow } else { palette.text };

        lines.push(Line::from(vec![
            Span::styled(marker, Style::default().fg(palette.accent)),
            Span::styled(format!("{label}: "), Style::default().fg(palette.dim)),
            Span::styled(shown, Style::default().fg(color)),
        ]));
    }
    lines
}

fn render_status(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let line = match &app.status {
        Some(status) => {
            let color = match status.kind {
                StatusKind::Info => palette.accent,
                StatusKind::Error => palette.error,
            };
            Line::from(Span::styled(status.message.clone(), Style::default().fg(color)))
        }
        None => Line::from(Span::styled(
            "a: add | /: filter | ^P: jump | x: export | i: import | t: theme | q: quit",
            Style::default().fg(palette.dim),
        )),
    };
    frame.render_widget(Paragraph::new(line), area);
}

/// Render the jump palette overlay.
fn render_palette(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let dialog_width = 60.min(area.width.saturating_sub(4));
    let dialog_height = 15.min(area.height.saturating_sub(4));
    let dialog_area = centered_rect(dialog_width, dialog_height, area);

    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .title(" Jump to Entry ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    let inner = block.inner(dialog_area);
    frame.render_widget(block, dialog_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(inner);

    let input_line = Line::from(vec![
        Span::styled("▸ ", Style::default().fg(Color::Magenta)),
        Span::styled(app.palette_query.as_str(), Style::default().fg(palette.text)),
        Span::styled("_", Style::default().fg(palette.text).add_modifier(Modifier::SLOW_BLINK)),
    ]);
    frame.render_widget(Paragraph::new(input_line), chunks[0]);

    if !app.palette_results.is_empty() {
        let items: Vec<ListItem> = app
            .palette_results
            .iter()
            .enumerate()
            .map(|(i, hit)| {
                let record = &app.records[hit.index];
                let style = if i == app.palette_selected {
                    palette.selected()
                } else {
                    Style::default().fg(palette.text)
                };
                let line = Line::from(vec![
                    Span::styled(record.display_name().to_string(), style),
                    Span::raw(" "),
                    Span::styled(record.record_type().to_string(), Style::default().fg(palette.dim)),
                ]);
                ListItem::new(line).style(style)
            })
            .collect();
        frame.render_widget(List::new(items), chunks[1]);
    } else if !app.palette_query.is_empty() {
        let no_results = Paragraph::new("No results found")
            .style(Style::default().fg(palette.dim))
            .alignment(Alignment::Center);
        frame.render_widget(no_results, chunks[1]);
    }
}

/// Render the add/edit dialog.
fn render_form(frame: &mut Frame, form: &EntryForm, palette: &Palette, area: Rect) {
    let visible = form.visible();
    let dialog_width = 64.min(area.width.saturating_sub(4));
    let dialog_height = (visible.len() as u16 + 6).min(area.height.saturating_sub(2));
    let dialog_area = centered_rect(dialog_width, dialog_height, area);

    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .title(format!(" {} ({}) ", form.title(), form.record_type))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent));

    let inner = block.inner(dialog_area);
    frame.render_widget(block, dialog_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(2)])
        .split(inner);

    let lines: Vec<Line> = visible
        .iter()
        .map(|&i| {
            let field = &form.fields[i];
            let focused = i == form.focused;
            let value = if field.spec.secret && !form.reveal_password {
                "*".repeat(field.value.chars().count())
            } else {
                field.value.clone()
            };
            let label = if field.spec.required {
                format!("{}*: ", field.spec.label)
            } else {
                format!("{}: ", field.spec.label)
            };
            let value_style = if focused {
                palette.selected()
            } else {
                Style::default().fg(palette.text)
            };
            Line::from(vec![
                Span::styled(if focused { "▸ " } else { "  " }, Style::default().fg(palette.accent)),
                Span::styled(label, Style::default().fg(palette.dim)),
                Span::styled(format!("{}{}", value, if focused { "_" } else { "" }), value_style),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), chunks[0]);

    let mut help = String::from("Enter: save | Esc: cancel | ^G: generate | ^O: optional | ^N: complete");
    if !form.is_edit() {
        help.push_str(" | ^T: type");
    }
    let help = Paragraph::new(help)
        .style(Style::default().fg(palette.dim))
        .wrap(Wrap { trim: true });
    frame.render_widget(help, chunks[1]);
}

fn render_import_path(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let dialog_area = centered_rect(60.min(area.width.saturating_sub(4)), 4, area);
    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .title(" Import JSON File ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent));
    let inner = block.inner(dialog_area);
    frame.render_widget(block, dialog_area);

    let lines = vec![
        Line::from(vec![
            Span::styled("▸ ", Style::default().fg(palette.accent)),
            Span::styled(format!("{}_", app.path_input), Style::default().fg(palette.text)),
        ]),
        Line::from(Span::styled(
            "Enter: import | Esc: cancel",
            Style::default().fg(palette.dim),
        )),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_confirm(frame: &mut Frame, palette: &Palette, area: Rect, title: &str, message: &str) {
    let dialog_width = 60.min(area.width.saturating_sub(4));
    let dialog_area = centered_rect(dialog_width, 6, area);
    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(dialog_area);
    frame.render_widget(block, dialog_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    let body = Paragraph::new(message.to_string())
        .style(Style::default().fg(palette.text))
        .wrap(Wrap { trim: true });
    frame.render_widget(body, chunks[0]);

    let help = Paragraph::new("y: yes | n: no").style(Style::default().fg(palette.dim));
    frame.render_widget(help, chunks[1]);
}

/// Helper to create a centered rectangle.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use acctkeep_core::{RecordId, RecordKind, WebsiteAccount};
    use chrono::{TimeZone, Utc};

    fn website() -> Record {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        Record {
            id: RecordId(7),
            kind: RecordKind::Website(WebsiteAccount {
                website_name: "GitHub".into(),
                username: "octo".into(),
                password: "hunter2".into(),
                ..Default::default()
            }),
            created_at: at,
            updated_at: at,
        }
    }

    fn text(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn detail_masks_password_and_numbers_copyable_fields() {
        let palette = Palette::for_theme(Theme::Dark);
        let lines = text(&detail_lines(&website(), false, &palette));

        assert!(lines.contains(&format!("[2] Password: {MASK}")));
        assert!(lines.contains(&"[1] Username/Email: octo".to_string()));
        assert!(lines.contains(&"    Category/Tags: N/A".to_string()));
        assert!(!lines.iter().any(|l| l.contains("hunter2")));
    }

    #[test]
    fn detail_reveals_password_on_request() {
        let palette = Palette::for_theme(Theme::Light);
        let lines = text(&detail_lines(&website(), true, &palette));
        assert!(lines.contains(&"[2] Password: hunter2".to_string()));
    }

    #[test]
    fn centered_rect_clamps_to_area() {
        let area = Rect::new(0, 0, 20, 10);
        assert_eq!(centered_rect(40, 4, area), Rect::new(0, 3, 20, 4));
    }
}
