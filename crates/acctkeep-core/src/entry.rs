//! Construction and validation of records from raw form or import input.

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, ValidationError};
use crate::models::{
    EmailAccount, RawFields, Record, RecordDraft, RecordId, RecordKind, RecordType,
    WebsiteAccount,
};
use crate::password::{PasswordGenerator, RandomPasswordGenerator};
use crate::store::RecordStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Fail unless every required field of the record's type is non-blank.
pub fn check_required(kind: &RecordKind) -> std::result::Result<(), ValidationError> {
    let record_type = kind.record_type();
    let missing: Vec<&'static str> = record_type
        .schema()
        .iter()
        .filter(|spec| spec.required)
        .filter(|spec| kind.field(spec.key).unwrap_or_default().trim().is_empty())
        .map(|spec| spec.key)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingFields {
            record_type,
            fields: missing,
        })
    }
}

/// Builds well-formed records and stamps their timestamps.
#[derive(Clone)]
pub struct EntryService {
    clock: Arc<dyn Clock>,
    passwords: Arc<dyn PasswordGenerator>,
}

impl Default for EntryService {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(RandomPasswordGenerator))
    }
}

impl std::fmt::Debug for EntryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryService").finish_non_exhaustive()
    }
}

impl EntryService {
    pub fn new(clock: Arc<dyn Clock>, passwords: Arc<dyn PasswordGenerator>) -> Self {
        Self { clock, passwords }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn generate_password(&self) -> String {
        self.passwords.generate()
    }

    /// Turn raw field values into a record payload of the given type.
    ///
    /// Keys outside the type's schema are ignored. An empty password is
    /// replaced by a generated one unless `is_edit` is set, in which case it
    /// is reported as missing like any other required field.
    pub fn build_from_input(
        &self,
        record_type: RecordType,
        raw: &RawFields,
        is_edit: bool,
    ) -> std::result::Result<RecordKind, ValidationError> {
        let value = |key: &str| raw.get(key).cloned().unwrap_or_default();

        let mut password = value("password");
        if password.trim().is_empty() && !is_edit {
            password = self.passwords.generate();
        }

        let kind = match record_type {
            RecordType::Email => RecordKind::Email(EmailAccount {
                full_name: value("fullName"),
                username: value("username"),
                password,
                dob: value("dob"),
                gender: value("gender").trim().parse()?,
                recovery_email: value("recoveryEmail"),
                phone: value("phone"),
                notes: value("notes"),
                custom_field: value("customField"),
            }),
            RecordType::Website => RecordKind::Website(WebsiteAccount {
                website_name: value("websiteName"),
                username: value("username"),
                password,
                category: value("category"),
                notes: value("notes"),
                custom_field: value("customField"),
            }),
        };

        check_required(&kind)?;
        Ok(kind)
    }

    /// Stamp a new record with `createdAt == updatedAt == now`.
    pub fn new_draft(&self, kind: RecordKind) -> RecordDraft {
        let now = self.clock.now();
        RecordDraft {
            kind,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply submitted fields over an existing record.
    ///
    /// Keys present in `raw` replace the stored values (an empty string
    /// clears an optional field); keys not present keep their value. The id,
    /// type and `createdAt` are preserved and `updatedAt` is refreshed.
    pub fn apply_edit(
        &self,
        existing: &Record,
        raw: &RawFields,
    ) -> std::result::Result<Record, ValidationError> {
        let mut fields = existing.kind.to_fields();
        for (key, value) in raw {
            if let Some(slot) = fields.get_mut(key) {
                slot.clone_from(value);
            }
        }

        let kind = self.build_from_input(existing.record_type(), &fields, true)?;
        Ok(Record {
            id: existing.id,
            kind,
            created_at: existing.created_at,
            updated_at: self.clock.now(),
        })
    }

    /// Validate and persist a new record.
    pub async fn add(
        &self,
        store: &RecordStore,
        record_type: RecordType,
        raw: &RawFields,
    ) -> Result<RecordId> {
        let kind = self.build_from_input(record_type, raw, false)?;
        let id = store.create(self.new_draft(kind)).await?;
        tracing::info!("Added {} entry {}", record_type, id);
        Ok(id)
    }

    /// Validate and persist an edit of the record stored under `id`.
    pub async fn edit(&self, store: &RecordStore, id: RecordId, raw: &RawFields) -> Result<Record> {
        let existing = store.get(id).await?;
        let record = self.apply_edit(&existing, raw)?;
        store.update(record.clone()).await?;
        tracing::info!("Updated {} entry {}", record.record_type(), id);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::Error;
    use crate::models::Gender;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    struct FixedPassword;

    impl PasswordGenerator for FixedPassword {
        fn generate(&self) -> String {
            "generated-secret".to_string()
        }
    }

    fn service() -> (EntryService, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        ));
        (EntryService::new(clock.clone(), Arc::new(FixedPassword)), clock)
    }

    fn raw(pairs: &[(&str, &str)]) -> RawFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn reports_all_missing_required_fields() {
        let (svc, _) = service();
        let err = svc
            .build_from_input(RecordType::Website, &raw(&[("notes", "x")]), false)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingFields {
                record_type: RecordType::Website,
                fields: vec!["websiteName", "username"],
            }
        );
    }

    #[test]
    fn blank_required_field_counts_as_missing() {
        let (svc, _) = service();
        let err = svc
            .build_from_input(
                RecordType::Email,
                &raw(&[("fullName", "   "), ("username", "jo@x.com")]),
                false,
            )
            .unwrap_err();
        assert!(matches!(err, ValidationError::MissingFields { fields, .. } if fields == ["fullName"]));
    }

    #[test]
    fn generates_password_on_create_only() {
        let (svc, _) = service();
        let input = raw(&[("fullName", "Jo"), ("username", "jo@x.com")]);

        let kind = svc.build_from_input(RecordType::Email, &input, false).unwrap();
        assert_eq!(kind.password(), "generated-secret");

        let err = svc.build_from_input(RecordType::Email, &input, true).unwrap_err();
        assert!(matches!(err, ValidationError::MissingFields { fields, .. } if fields == ["password"]));
    }

    #[test]
    fn parses_gender_and_rejects_unknown_values() {
        let (svc, _) = service();
        let mut input = raw(&[("fullName", "Jo"), ("username", "jo@x.com"), ("gender", "other")]);
        let RecordKind::Email(email) = svc.build_from_input(RecordType::Email, &input, false).unwrap() else {
            panic!("expected email");
        };
        assert_eq!(email.gender, Gender::Other);

        input.insert("gender".into(), "robot".into());
        let err = svc.build_from_input(RecordType::Email, &input, false).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { field, .. } if field == "gender"));
    }

    #[test]
    fn ignores_fields_of_the_other_type() {
        let (svc, _) = service();
        let input = raw(&[
            ("websiteName", "GitHub"),
            ("username", "octo"),
            ("password", "pw"),
            ("fullName", "Octo Cat"),
        ]);
        let kind = svc.build_from_input(RecordType::Website, &input, false).unwrap();
        assert_eq!(kind.field("fullName"), None);
    }

    #[tokio::test]
    async fn add_stamps_equal_timestamps() {
        let (svc, clock) = service();
        let store = RecordStore::in_memory();
        let id = svc
            .add(&store, RecordType::Email, &raw(&[("fullName", "Jo"), ("username", "jo@x.com"), ("password", "p")]))
            .await
            .unwrap();

        let record = store.get(id).await.unwrap();
        assert_eq!(record.created_at, clock.now());
        assert_eq!(record.created_at, record.updated_at);
    }

    #[tokio::test]
    async fn edit_changes_only_submitted_fields() {
        let (svc, clock) = service();
        let store = RecordStore::in_memory();
        let id = svc
            .add(
                &store,
                RecordType::Website,
                &raw(&[("websiteName", "GitHub"), ("username", "octo"), ("password", "pw"), ("category", "Work")]),
            )
            .await
            .unwrap();
        let before = store.get(id).await.unwrap();

        clock.advance(Duration::minutes(5));
        let after = svc
            .edit(&store, id, &raw(&[("password", "new-pw"), ("notes", "rotated")]))
            .await
            .unwrap();

        assert_eq!(after.id, before.id);
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.updated_at, before.updated_at + Duration::minutes(5));
        assert_eq!(after.kind.password(), "new-pw");
        assert_eq!(after.kind.field("notes"), Some("rotated"));
        assert_eq!(after.kind.field("category"), Some("Work"));
        assert_eq!(store.get(id).await.unwrap(), after);
    }

    #[tokio::test]
    async fn edit_of_missing_record_is_not_found() {
        let (svc, _) = service();
        let store = RecordStore::in_memory();
        let err = svc.edit(&store, RecordId(9), &RawFields::new()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(RecordId(9))));
    }

    #[tokio::test]
    async fn edit_cannot_blank_a_required_field() {
        let (svc, _) = service();
        let store = RecordStore::in_memory();
        let id = svc
            .add(&store, RecordType::Email, &raw(&[("fullName", "Jo"), ("username", "jo@x.com"), ("password", "p")]))
            .await
            .unwrap();

        let err = svc.edit(&store, id, &raw(&[("fullName", "")])).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::MissingFields { .. })));
        assert_eq!(store.get(id).await.unwrap().kind.field("fullName"), Some("Jo"));
    }
}
