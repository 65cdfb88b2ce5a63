//! Record filtering and form completions.

use crate::models::{Record, RecordKind};

/// True if `record` has any value containing `query`, ignoring case.
///
/// Every value counts, including the id, the type tag and both timestamps.
pub fn matches(record: &Record, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    record
        .field_values()
        .iter()
        .any(|value| !value.is_empty() && value.to_lowercase().contains(&needle))
}

/// Records matching `query`, in input order.
pub fn filter<'a>(records: &'a [Record], query: &str) -> Vec<&'a Record> {
    records.iter().filter(|r| matches(r, query)).collect()
}

/// Previously used values offered as completions in the entry form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Suggestions {
    /// Usernames of email accounts.
    pub emails: Vec<String>,
    pub website_names: Vec<String>,
    pub categories: Vec<String>,
}

impl Suggestions {
    /// Distinct non-empty values, in first-seen order.
    pub fn from_records(records: &[Record]) -> Self {
        let mut out = Suggestions::default();
        for record in records {
            match &record.kind {
                RecordKind::Email(e) => push_unique(&mut out.emails, &e.username),
                RecordKind::Website(w) => {
                    push_unique(&mut out.website_names, &w.website_name);
                    push_unique(&mut out.categories, &w.category);
                }
            }
        }
        out
    }

    /// Known values for a form field, if the field has completions.
    pub fn for_field(&self, key: &str) -> &[String] {
        match key {
            "username" | "recoveryEmail" => &self.emails,
            "websiteName" => &self.website_names,
            "category" => &self.categories,
            _ => &[],
        }
    }

    /// First known value for `key` that starts with `prefix` and is longer than it.
    pub fn complete(&self, key: &str, prefix: &str) -> Option<&str> {
        if prefix.is_empty() {
            return None;
        }
        self.for_field(key)
            .iter()
            .find(|v| v.len() > prefix.len() && v.starts_with(prefix))
            .map(String::as_str)
    }
}

fn push_unique(into: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !into.iter().any(|v| v == value) {
        into.push(value.to_string());
    }
}
