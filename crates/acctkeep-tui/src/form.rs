//! Add/edit form state.

use acctkeep_core::{FieldSpec, RawFields, Record, RecordId, RecordType, Suggestions};

/// One input of the form.
#[derive(Debug, Clone)]
pub struct FormField {
    pub spec: &'static FieldSpec,
    pub value: String,
}

/// State of the add/edit dialog.
#[derive(Debug, Clone)]
pub struct EntryForm {
    pub record_type: RecordType,
    /// Set when editing an existing record.
    pub editing: Option<RecordId>,
    pub fields: Vec<FormField>,
    /// Index into `fields`.
    pub focused: usize,
    pub show_optional: bool,
    pub reveal_password: bool,
}

fn blank_fields(record_type: RecordType) -> Vec<FormField> {
    record_type
        .schema()
        .iter()
        .map(|spec| FormField {
            spec,
            value: String::new(),
        })
        .collect()
}

impl EntryForm {
    /// An empty form with a generated password already filled in.
    pub fn new(record_type: RecordType, generated_password: String) -> Self {
        let mut form = Self {
            record_type,
            editing: None,
            fields: blank_fields(record_type),
            focused: 0,
            show_optional: false,
            reveal_password: false,
        };
        form.set_password(generated_password);
        form
    }

    /// A form prefilled from a stored record. Optional fields start expanded
    /// if any of them holds a value.
    pub fn edit(record: &Record) -> Self {
        let mut fields = blank_fields(record.record_type());
        for field in &mut fields {
            field.value = record.kind.field(field.spec.key).unwrap_or_default().to_string();
        }
        let show_optional = fields
            .iter()
            .any(|f| !f.spec.required && !f.value.is_empty());

        Self {
            record_type: record.record_type(),
            editing: Some(record.id),
            fields,
            focused: 0,
            show_optional,
            reveal_password: false,
        }
    }

    pub fn is_edit(&self) -> bool {
        self.editing.is_some()
    }

    pub fn title(&self) -> &'static str {
        if self.is_edit() {
            "Edit Entry"
        } else {
            "Add New Entry"
        }
    }

    /// Switch a new entry to the other type, keeping shared values.
    pub fn switch_type(&mut self) {
        if self.is_edit() {
            return;
        }
        let next = match self.record_type {
            RecordType::Email => RecordType::Website,
            RecordType::Website => RecordType::Email,
        };
        let mut fields = blank_fields(next);
        for field in &mut fields {
            if let Some(old) = self.fields.iter().find(|f| f.spec.key == field.spec.key) {
                field.value.clone_from(&old.value);
            }
        }
        self.record_type = next;
        self.fields = fields;
        self.focused = 0;
    }

    /// Indices of the fields currently shown.
    pub fn visible(&self) -> Vec<usize> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.spec.required || self.show_optional)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn focus_next(&mut self) {
        let visible = self.visible();
        if let Some(pos) = visible.iter().position(|&i| i == self.focused) {
            self.focused = visible[(pos + 1) % visible.len()];
        }
    }

    pub fn focus_prev(&mut self) {
        let visible = self.visible();
        if let Some(pos) = visible.iter().position(|&i| i == self.focused) {
            self.focused = visible[(pos + visible.len() - 1) % visible.len()];
        }
    }

    pub fn toggle_optional(&mut self) {
        self.show_optional = !self.show_optional;
        if !self.visible().contains(&self.focused) {
            self.focused = 0;
        }
    }

    pub fn push_char(&mut self, c: char) {
        if let Some(field) = self.fields.get_mut(self.focused) {
            field.value.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        if let Some(field) = self.fields.get_mut(self.focused) {
            field.value.pop();
        }
    }

    pub fn set_password(&mut self, password: String) {
        if let Some(field) = self.fields.iter_mut().find(|f| f.spec.key == "password") {
            field.value = password;
        }
    }

    /// Complete the focused field from previously used values.
    pub fn complete(&mut self, suggestions: &Suggestions) -> bool {
        let Some(field) = self.fields.get_mut(self.focused) else {
            return false;
        };
        match suggestions.complete(field.spec.key, &field.value) {
            Some(value) => {
                field.value = value.to_string();
                true
            }
            None => false,
        }
    }

    /// Values to submit. Hidden optional fields are left out so an edit keeps
    /// whatever they currently hold.
    pub fn to_raw(&self) -> RawFields {
        self.visible()
            .into_iter()
            .map(|i| {
                let field = &self.fields[i];
                (field.spec.key.to_string(), field.value.clone())
            })
            .collect()
    }
}
