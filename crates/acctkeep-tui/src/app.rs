//! Application state management.

use crate::clipboard;
use crate::config::Config;
use crate::form::EntryForm;
use acctkeep_core::{
    export, query, EntryService, Error, FieldSpec, ImportSummary, Record, RecordId, RecordStore,
    Suggestions,
};
use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;

/// How long a status notification stays on screen.
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// Maximum number of fuzzy palette results.
const PALETTE_LIMIT: usize = 10;

/// Input mode for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// List navigation.
    Normal,
    /// Typing into the filter bar.
    Filter,
    /// Fuzzy jump palette.
    Palette,
    /// Add/edit form.
    Form,
    /// Waiting for delete confirmation.
    ConfirmDelete,
    /// Typing the path of a file to import.
    ImportPath,
    /// Waiting for the number of the field to copy.
    CopyField,
}

/// Focus area within the main view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    List,
    Detail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

/// A transient notification.
#[derive(Debug, Clone)]
pub struct Status {
    pub message: String,
    pub kind: StatusKind,
    pub shown_at: Instant,
}

/// A fuzzy palette result.
#[derive(Debug, Clone)]
pub struct PaletteHit {
    /// Index into `App::records`.
    pub index: usize,
    pub score: i64,
}

/// Main application model.
pub struct App {
    runtime: Runtime,
    pub store: RecordStore,
    pub entries: EntryService,
    pub config: Config,

    /// All records, in store order.
    pub records: Vec<Record>,
    /// Indices into `records` that pass the filter.
    pub visible: Vec<usize>,
    /// Index into `visible`.
    pub selected: usize,
    pub suggestions: Suggestions,

    pub input_mode: InputMode,
    pub focus: Focus,
    pub filter_query: String,

    // Palette state
    pub palette_query: String,
    pub palette_results: Vec<PaletteHit>,
    pub palette_selected: usize,

    pub form: Option<EntryForm>,
    pub reveal_password: bool,
    pub path_input: String,
    pending_import: Option<PathBuf>,

    pub status: Option<Status>,
    pub should_quit: bool,
}

impl App {
    /// Create a new application instance around an opened store.
    pub fn new(runtime: Runtime, store: RecordStore, entries: EntryService, config: Config) -> Self {
        let mut app = Self {
            runtime,
            store,
            entries,
            config,
            records: Vec::new(),
            visible: Vec::new(),
            selected: 0,
            suggestions: Suggestions::default(),
            input_mode: InputMode::Normal,
            focus: Focus::List,
            filter_query: String::new(),
            palette_query: String::new(),
            palette_results: Vec::new(),
            palette_selected: 0,
            form: None,
            reveal_password: false,
            path_input: String::new(),
            pending_import: None,
            status: None,
            should_quit: false,
        };
        app.reload(None);
        app
    }

    /// Drive a store future to completion on the app's runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Close the store. Called once after the UI loop ends.
    pub fn shutdown(self) -> anyhow::Result<()> {
        self.runtime.block_on(self.store.close())?;
        Ok(())
    }

    /// Re-read all records and re-apply the filter, selecting `focus_id` if given.
    pub fn reload(&mut self, focus_id: Option<RecordId>) {
        let keep = focus_id.or_else(|| self.selected_record().map(|r| r.id));
        self.records = self.block_on(self.store.get_all());
        self.suggestions = Suggestions::from_records(&self.records);
        self.apply_filter();
        if let Some(id) = keep {
            if let Some(pos) = self.visible.iter().position(|&i| self.records[i].id == id) {
                self.selected = pos;
            }
        }
    }

    pub fn apply_filter(&mut self) {
        self.visible = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| query::matches(r, &self.filter_query))
            .map(|(i, _)| i)
            .collect();
        if self.selected >= self.visible.len() {
            self.selected = self.visible.len().saturating_sub(1);
        }
    }

    pub fn selected_record(&self) -> Option<&Record> {
        self.visible
            .get(self.selected)
            .and_then(|&i| self.records.get(i))
    }

    pub fn move_up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.reveal_password = false;
        }
    }

    pub fn move_down(&mut self) {
        if self.selected + 1 < self.visible.len() {
            self.selected += 1;
            self.reveal_password = false;
        }
    }

    // Notifications

    pub fn notify(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{}", message);
        self.status = Some(Status {
            message,
            kind: StatusKind::Info,
            shown_at: Instant::now(),
        });
    }

    pub fn notify_error(&mut self, message: impl Into<String>, error: &dyn std::fmt::Display) {
        let message = message.into();
        tracing::warn!("{}: {}", message, error);
        self.status = Some(Status {
            message: format!("{message}: {error}"),
            kind: StatusKind::Error,
            shown_at: Instant::now(),
        });
    }

    /// Drop the status line once it has been shown long enough.
    pub fn tick(&mut self) {
        if self
            .status
            .as_ref()
            .is_some_and(|s| s.shown_at.elapsed() >= STATUS_TIMEOUT)
        {
            self.status = None;
        }
    }

    // Filter

    pub fn start_filter(&mut self) {
        self.input_mode = InputMode::Filter;
    }

    /// Leave the filter bar, optionally clearing the query.
    pub fn exit_filter(&mut self, clear: bool) {
        self.input_mode = InputMode::Normal;
        if clear {
            self.filter_query.clear();
            self.apply_filter();
        }
    }

    pub fn filter_push(&mut self, c: char) {
        self.filter_query.push(c);
        self.selected = 0;
        self.apply_filter();
    }

    pub fn filter_pop(&mut self) {
        self.filter_query.pop();
        self.apply_filter();
    }

    // Palette

    pub fn start_palette(&mut self) {
        self.input_mode = InputMode::Palette;
        self.palette_query.clear();
        self.palette_results.clear();
        self.palette_selected = 0;
    }

    pub fn exit_palette(&mut self) {
        self.input_mode = InputMode::Normal;
        self.palette_query.clear();
        self.palette_results.clear();
    }

    /// Perform fuzzy search over the records.
    pub fn perform_palette_search(&mut self) {
        use fuzzy_matcher::skim::SkimMatcherV2;
        use fuzzy_matcher::FuzzyMatcher;

        self.palette_results.clear();
        self.palette_selected = 0;

        if self.palette_query.trim().is_empty() {
            return;
        }

        let matcher = SkimMatcherV2::default();

        let mut scored: Vec<PaletteHit> = self
            .records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                let search_text = format!(
                    "{} {} {}",
                    record.display_name(),
                    record.kind.username(),
                    record.kind.field("category").unwrap_or_default()
                );
                matcher
                    .fuzzy_match(&search_text, &self.palette_query)
                    .map(|score| PaletteHit { index, score })
            })
            .collect();

        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored.truncate(PALETTE_LIMIT);
        self.palette_results = scored;
    }

    /// Jump to the chosen palette result, clearing the filter if it hides it.
    pub fn select_palette_result(&mut self) {
        let Some(hit) = self.palette_results.get(self.palette_selected).cloned() else {
            return;
        };
        let id = self.records[hit.index].id;
        if !self.visible.contains(&hit.index) {
            self.filter_query.clear();
            self.apply_filter();
        }
        if let Some(pos) = self.visible.iter().position(|&i| i == hit.index) {
            self.selected = pos;
        }
        tracing::debug!("Palette jump to record {}", id);
        self.exit_palette();
        self.focus = Focus::Detail;
    }

    // Add / edit

    pub fn start_add(&mut self) {
        let password = self.entries.generate_password();
        self.form = Some(EntryForm::new(acctkeep_core::RecordType::Email, password));
        self.input_mode = InputMode::Form;
    }

    pub fn start_edit(&mut self) {
        let Some(record) = self.selected_record() else {
            return;
        };
        self.form = Some(EntryForm::edit(record));
        self.input_mode = InputMode::Form;
    }

    pub fn cancel_form(&mut self) {
        self.form = None;
        self.input_mode = InputMode::Normal;
    }

    pub fn regenerate_password(&mut self) {
        let password = self.entries.generate_password();
        if let Some(form) = self.form.as_mut() {
            form.set_password(password);
        }
    }

    pub fn complete_field(&mut self) {
        if let Some(form) = self.form.as_mut() {
            form.complete(&self.suggestions);
        }
    }

    /// Save the form. Validation errors keep the form open.
    pub fn submit_form(&mut self) {
        let Some(form) = self.form.as_ref() else {
            return;
        };
        let raw = form.to_raw();
        let result = match form.editing {
            Some(id) => self
                .block_on(self.entries.edit(&self.store, id, &raw))
                .map(|record| (record.id, "Entry updated")),
            None => self
                .block_on(self.entries.add(&self.store, form.record_type, &raw))
                .map(|id| (id, "Entry added")),
        };

        match result {
            Ok((id, message)) => {
                self.form = None;
                self.input_mode = InputMode::Normal;
                self.filter_query.clear();
                self.reload(Some(id));
                self.notify(message);
            }
            Err(Error::Validation(e)) => self.notify_error("Cannot save entry", &e),
            Err(e) => {
                self.notify_error("Error saving entry", &e);
                self.cancel_form();
            }
        }
    }

    // Delete

    pub fn request_delete(&mut self) {
        if self.selected_record().is_some() {
            self.input_mode = InputMode::ConfirmDelete;
        }
    }

    pub fn confirm_delete(&mut self, confirmed: bool) {
        self.input_mode = InputMode::Normal;
        if !confirmed {
            return;
        }
        let Some(id) = self.selected_record().map(|r| r.id) else {
            return;
        };
        match self.block_on(self.store.delete(id)) {
            Ok(record) => {
                self.reload(None);
                self.notify(format!("Entry {} deleted", record.display_name()));
            }
            Err(e) => self.notify_error("Error deleting entry", &e),
        }
    }

    // Detail view

    /// Fields of the selected record that can be copied one by one.
    pub fn copyable_fields(&self) -> Vec<&'static FieldSpec> {
        self.selected_record()
            .map(|r| r.record_type().schema().iter().filter(|s| s.copyable).collect())
            .unwrap_or_default()
    }

    pub fn start_copy(&mut self) {
        if self.selected_record().is_some() {
            self.input_mode = InputMode::CopyField;
        }
    }

    /// Copy the `number`-th (1-based) copyable field of the selected record.
    pub fn copy_field(&mut self, number: usize) {
        self.input_mode = InputMode::Normal;
        let Some(spec) = number
            .checked_sub(1)
            .and_then(|i| self.copyable_fields().get(i).copied())
        else {
            return;
        };
        let Some(value) = self
            .selected_record()
            .and_then(|r| r.kind.field(spec.key))
            .map(str::to_owned)
        else {
            return;
        };
        match clipboard::copy(&value) {
            Ok(()) => self.notify(format!("{} copied", spec.label)),
            Err(e) => self.notify_error("Copy failed", &e),
        }
    }

    pub fn copy_all(&mut self) {
        let Some(text) = self.selected_record().map(Record::copy_all_text) else {
            return;
        };
        match clipboard::copy(&text) {
            Ok(()) => self.notify("All fields copied"),
            Err(e) => self.notify_error("Copy failed", &e),
        }
    }

    pub fn toggle_reveal(&mut self) {
        self.reveal_password = !self.reveal_password;
    }

    // Export / import

    pub fn export(&mut self) {
        let result = self.block_on(export::export_to_path(&self.store, &self.config.export_dir));
        match result {
            Ok((path, count)) => {
                self.notify(format!("Data exported: {} entries to {}", count, path.display()))
            }
            Err(e) => self.notify_error("Export failed", &e),
        }
    }

    pub fn start_import(&mut self) {
        self.path_input.clear();
        self.input_mode = InputMode::ImportPath;
    }

    /// Queue the typed path; the UI loop runs the import because conflicts
    /// need to draw their own dialog.
    pub fn submit_import_path(&mut self) {
        self.input_mode = InputMode::Normal;
        let path = self.path_input.trim();
        if path.is_empty() {
            return;
        }
        self.pending_import = Some(PathBuf::from(path));
    }

    pub fn take_pending_import(&mut self) -> Option<PathBuf> {
        self.pending_import.take()
    }

    pub fn finish_import(&mut self, result: anyhow::Result<ImportSummary>) {
        match result {
            Ok(summary) => {
                for failure in &summary.failures {
                    tracing::warn!("Import {}", failure);
                }
                self.filter_query.clear();
                self.reload(None);
                self.notify(summary.to_string());
            }
            Err(e) => {
                self.reload(None);
                self.notify_error("Import failed", &format!("{e:#}"));
            }
        }
    }

    // Theme

    pub fn toggle_theme(&mut self) {
        self.config.theme = self.config.theme.toggled();
        if let Err(e) = self.config.save() {
            self.notify_error("Could not save theme", &format!("{e:#}"));
        }
    }
}
