//! Shared data types for the application.
//!
//! A [`Record`] is a store-assigned id, two timestamps and a [`RecordKind`]
//! carrying the type-specific fields. The JSON shape is the one used by the
//! store file and by export/import:
//!
//! ```json
//! { "id": 1, "type": "email", "fullName": "Jo", "username": "jo@x.com",
//!   "password": "p", "createdAt": "2024-05-01T10:00:00.000Z",
//!   "updatedAt": "2024-05-01T10:00:00.000Z" }
//! ```

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Raw field values keyed by their JSON field name (`fullName`, `username`, ...).
pub type RawFields = BTreeMap<String, String>;

/// Store-assigned record identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The two record shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Email,
    Website,
}

impl RecordType {
    pub const ALL: [RecordType; 2] = [RecordType::Email, RecordType::Website];

    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::Email => "email",
            RecordType::Website => "website",
        }
    }

    /// Field schema for this type, in form order.
    pub fn schema(self) -> &'static [FieldSpec] {
        match self {
            RecordType::Email => EMAIL_FIELDS,
            RecordType::Website => WEBSITE_FIELDS,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(RecordType::Email),
            "website" => Ok(RecordType::Website),
            other => Err(ValidationError::UnsupportedType(other.to_string())),
        }
    }
}

/// Gender of an email account holder. Empty when not given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
    #[default]
    #[serde(rename = "")]
    Unspecified,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
            Gender::Unspecified => "",
        }
    }

    pub fn is_unspecified(&self) -> bool {
        matches!(self, Gender::Unspecified)
    }
}

impl FromStr for Gender {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            "" => Ok(Gender::Unspecified),
            other => Err(ValidationError::InvalidValue {
                field: "gender".to_string(),
                reason: format!("\"{other}\" is not one of male, female, other"),
            }),
        }
    }
}

/// An email / login account.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailAccount {
    pub full_name: String,
    /// Doubles as the email address.
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dob: String,
    #[serde(default, skip_serializing_if = "Gender::is_unspecified")]
    pub gender: Gender,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub recovery_email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub phone: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub custom_field: String,
}

/// A website or app account.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteAccount {
    pub website_name: String,
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub custom_field: String,
}

/// Type-specific payload of a record. Equality on this type is the
/// "field-equal" relation used by the importer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RecordKind {
    Email(EmailAccount),
    Website(WebsiteAccount),
}

/// Key used to detect that an imported record already exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DuplicateKey {
    Email { username: String },
    Website { website_name: String, username: String },
}

impl RecordKind {
    pub fn record_type(&self) -> RecordType {
        match self {
            RecordKind::Email(_) => RecordType::Email,
            RecordKind::Website(_) => RecordType::Website,
        }
    }

    pub fn username(&self) -> &str {
        match self {
            RecordKind::Email(e) => &e.username,
            RecordKind::Website(w) => &w.username,
        }
    }

    pub fn password(&self) -> &str {
        match self {
            RecordKind::Email(e) => &e.password,
            RecordKind::Website(w) => &w.password,
        }
    }

    pub fn set_password(&mut self, password: String) {
        match self {
            RecordKind::Email(e) => e.password = password,
            RecordKind::Website(w) => w.password = password,
        }
    }

    /// Name shown in lists: the address for email accounts, the site for websites.
    pub fn display_name(&self) -> &str {
        match self {
            RecordKind::Email(e) => &e.username,
            RecordKind::Website(w) => &w.website_name,
        }
    }

    pub fn duplicate_key(&self) -> DuplicateKey {
        match self {
            RecordKind::Email(e) => DuplicateKey::Email {
                username: e.username.clone(),
            },
            RecordKind::Website(w) => DuplicateKey::Website {
                website_name: w.website_name.clone(),
                username: w.username.clone(),
            },
        }
    }

    /// Value of a schema field, `None` for keys outside this type's schema.
    pub fn field(&self, key: &str) -> Option<&str> {
        let value = match (self, key) {
            (RecordKind::Email(e), "fullName") => &e.full_name,
            (RecordKind::Email(e), "username") => &e.username,
            (RecordKind::Email(e), "password") => &e.password,
            (RecordKind::Email(e), "dob") => &e.dob,
            (RecordKind::Email(e), "gender") => return Some(e.gender.as_str()),
            (RecordKind::Email(e), "recoveryEmail") => &e.recovery_email,
            (RecordKind::Email(e), "phone") => &e.phone,
            (RecordKind::Email(e), "notes") => &e.notes,
            (RecordKind::Email(e), "customField") => &e.custom_field,
            (RecordKind::Website(w), "websiteName") => &w.website_name,
            (RecordKind::Website(w), "username") => &w.username,
            (RecordKind::Website(w), "password") => &w.password,
            (RecordKind::Website(w), "category") => &w.category,
            (RecordKind::Website(w), "notes") => &w.notes,
            (RecordKind::Website(w), "customField") => &w.custom_field,
            _ => return None,
        };
        Some(value.as_str())
    }

    /// All schema fields as raw strings, empty ones included.
    pub fn to_fields(&self) -> RawFields {
        self.record_type()
            .schema()
            .iter()
            .map(|spec| {
                let value = self.field(spec.key).unwrap_or_default();
                (spec.key.to_string(), value.to_string())
            })
            .collect()
    }
}

/// A record that has not been given an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDraft {
    pub kind: RecordKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored credential entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: RecordId,
    #[serde(flatten)]
    pub kind: RecordKind,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Record {
    pub fn from_draft(id: RecordId, draft: RecordDraft) -> Self {
        Self {
            id,
            kind: draft.kind,
            created_at: draft.created_at,
            updated_at: draft.updated_at,
        }
    }

    pub fn record_type(&self) -> RecordType {
        self.kind.record_type()
    }

    pub fn display_name(&self) -> &str {
        self.kind.display_name()
    }

    /// String form of every value in the record, in export order: id, type,
    /// the schema fields, then the two timestamps.
    pub fn field_values(&self) -> Vec<String> {
        let mut values = Vec::with_capacity(self.record_type().schema().len() + 4);
        values.push(self.id.to_string());
        values.push(self.record_type().to_string());
        for spec in self.record_type().schema() {
            values.push(self.kind.field(spec.key).unwrap_or_default().to_string());
        }
        values.push(timestamp::format(&self.created_at));
        values.push(timestamp::format(&self.updated_at));
        values
    }

    /// Labelled values for a detail view, `N/A` standing in for empty fields.
    pub fn detail_lines(&self) -> Vec<(&'static str, String)> {
        let mut lines: Vec<(&'static str, String)> = self
            .record_type()
            .schema()
            .iter()
            .map(|spec| {
                let value = self.kind.field(spec.key).unwrap_or_default();
                let shown = if value.is_empty() { "N/A" } else { value };
                (spec.label, shown.to_string())
            })
            .collect();
        lines.push(("Created At", timestamp::format(&self.created_at)));
        lines.push(("Updated At", timestamp::format(&self.updated_at)));
        lines
    }

    /// `Label: value` lines of the copy-all fields that are not empty.
    pub fn copy_all_text(&self) -> String {
        self.record_type()
            .schema()
            .iter()
            .filter(|spec| spec.copy_all)
            .filter_map(|spec| {
                let value = self.kind.field(spec.key).unwrap_or_default();
                (!value.is_empty()).then(|| format!("{}: {}", spec.label, value))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Static description of one field of a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// JSON key.
    pub key: &'static str,
    /// Human label.
    pub label: &'static str,
    pub required: bool,
    /// Has its own copy action in the detail view.
    pub copyable: bool,
    /// Included in the copy-all text.
    pub copy_all: bool,
    /// Masked unless revealed.
    pub secret: bool,
}

impl FieldSpec {
    const fn new(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            required: false,
            copyable: false,
            copy_all: false,
            secret: false,
        }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn copyable(mut self) -> Self {
        self.copyable = true;
        self.copy_all = true;
        self
    }

    const fn in_copy_all(mut self) -> Self {
        self.copy_all = true;
        self
    }

    const fn secret(mut self) -> Self {
        self.secret = true;
        self
    }
}

pub const EMAIL_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("fullName", "Full Name").required().copyable(),
    FieldSpec::new("username", "Username/Email").required().copyable(),
    FieldSpec::new("password", "Password").required().copyable().secret(),
    FieldSpec::new("dob", "DOB"),
    FieldSpec::new("gender", "Gender"),
    FieldSpec::new("recoveryEmail", "Recovery Email").copyable(),
    FieldSpec::new("phone", "Recovery Phone"),
    FieldSpec::new("notes", "Notes"),
    FieldSpec::new("customField", "Custom Field").copyable(),
];

pub const WEBSITE_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("websiteName", "Website/App Name").required().in_copy_all(),
    FieldSpec::new("username", "Username/Email").required().copyable(),
    FieldSpec::new("password", "Password").required().copyable().secret(),
    FieldSpec::new("category", "Category/Tags"),
    FieldSpec::new("notes", "Notes"),
    FieldSpec::new("customField", "Custom Field").copyable(),
];

/// ISO-8601 timestamps with millisecond precision and a `Z` suffix.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn sample_email() -> Record {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        Record {
            id: RecordId(7),
            kind: RecordKind::Email(EmailAccount {
                full_name: "Jo".into(),
                username: "jo@x.com".into(),
                password: "p".into(),
                gender: Gender::Female,
                ..Default::default()
            }),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn serializes_to_flat_camel_case_object() {
        let json = serde_json::to_value(sample_email()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 7,
                "type": "email",
                "fullName": "Jo",
                "username": "jo@x.com",
                "password": "p",
                "gender": "female",
                "createdAt": "2024-05-01T10:00:00.000Z",
                "updatedAt": "2024-05-01T10:00:00.000Z",
            })
        );
    }

    #[test]
    fn deserializes_with_missing_optional_fields() {
        let record: Record = serde_json::from_value(serde_json::json!({
            "id": 3,
            "type": "website",
            "websiteName": "GitHub",
            "username": "octo",
            "password": "pw",
            "createdAt": "2024-05-01T10:00:00.000Z",
            "updatedAt": "2024-05-02T10:00:00Z",
        }))
        .unwrap();

        assert_eq!(record.record_type(), RecordType::Website);
        assert_eq!(record.display_name(), "GitHub");
        assert_eq!(record.kind.field("category"), Some(""));
    }

    #[test]
    fn empty_gender_round_trips_as_unspecified() {
        let kind: RecordKind = serde_json::from_value(serde_json::json!({
            "type": "email",
            "fullName": "A",
            "username": "a@b.c",
            "password": "x",
            "gender": "",
        }))
        .unwrap();
        let RecordKind::Email(email) = &kind else {
            panic!("expected email");
        };
        assert_eq!(email.gender, Gender::Unspecified);
        assert!(serde_json::to_value(&kind).unwrap().get("gender").is_none());
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert_eq!(
            "social".parse::<RecordType>(),
            Err(ValidationError::UnsupportedType("social".into()))
        );
    }

    #[test]
    fn field_values_include_id_type_and_timestamps() {
        let values = sample_email().field_values();
        assert_eq!(values[0], "7");
        assert_eq!(values[1], "email");
        assert!(values.contains(&"jo@x.com".to_string()));
        assert_eq!(values.last().unwrap(), "2024-05-01T10:00:00.000Z");
    }

    #[test]
    fn copy_all_skips_empty_fields() {
        assert_eq!(
            sample_email().copy_all_text(),
            "Full Name: Jo\nUsername/Email: jo@x.com\nPassword: p"
        );
    }

    #[test]
    fn duplicate_key_depends_on_type() {
        let website = RecordKind::Website(WebsiteAccount {
            website_name: "GitHub".into(),
            username: "octo".into(),
            password: "pw".into(),
            ..Default::default()
        });
        assert_eq!(
            website.duplicate_key(),
            DuplicateKey::Website {
                website_name: "GitHub".into(),
                username: "octo".into(),
            }
        );
        assert_eq!(
            sample_email().kind.duplicate_key(),
            DuplicateKey::Email {
                username: "jo@x.com".into()
            }
        );
    }
}
