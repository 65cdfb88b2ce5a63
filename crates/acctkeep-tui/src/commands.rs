//! Non-interactive subcommands.

use crate::config::{Config, ConflictMode};
use crate::prompt::{LinePrompt, Resolver};
use acctkeep_core::{export, query, DuplicateVisibility, EntryService, FaultPolicy, Importer, RecordStore};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Print the records matching `query`, one per line.
pub async fn list(store: &RecordStore, query: &str, out: &mut impl Write) -> Result<()> {
    let records = store.get_all().await;
    for record in query::filter(&records, query) {
        writeln!(
            out,
            "{:>4}  {:<8} {}  {}",
            record.id,
            record.record_type().as_str(),
            record.display_name(),
            record.kind.username()
        )?;
    }
    Ok(())
}

/// Export everything to `output`, or to the configured export directory.
pub async fn export(store: &RecordStore, config: &Config, output: Option<PathBuf>) -> Result<()> {
    let target = output.unwrap_or_else(|| config.export_dir.clone());
    let (path, count) = export::export_to_path(store, &target).await?;
    println!("Data exported: {} entries to {}", count, path.display());
    Ok(())
}

/// Flags of the import subcommand that override the config.
#[derive(Debug, Clone, Default)]
pub struct ImportFlags {
    pub on_conflict: Option<ConflictMode>,
    pub snapshot: bool,
    pub abort_on_error: bool,
}

/// Import a JSON file, asking on stdin about duplicates unless a fixed policy is set.
pub async fn import(
    store: &RecordStore,
    entries: &EntryService,
    config: &Config,
    file: &Path,
    flags: ImportFlags,
) -> Result<()> {
    let payload = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read import file: {}", file.display()))?;

    let mut options = config.import_options();
    if flags.snapshot {
        options.visibility = DuplicateVisibility::Snapshot;
    }
    if flags.abort_on_error {
        options.faults = FaultPolicy::Abort;
    }
    let mode = flags.on_conflict.unwrap_or(config.conflict_policy);

    let stdin = std::io::stdin();
    let mut resolver = Resolver::from_mode(mode, || LinePrompt::new(stdin.lock(), std::io::stderr()));

    let summary = Importer::new(store, entries)
        .with_options(options)
        .import_json(&payload, &mut resolver)
        .await
        .with_context(|| format!("Import of {} failed", file.display()))?;

    for failure in &summary.failures {
        eprintln!("Skipped {failure}");
    }
    println!("{summary}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use acctkeep_core::{RawFields, RecordType};
    use pretty_assertions::assert_eq;

    fn raw(pairs: &[(&str, &str)]) -> RawFields {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn list_prints_matching_records() {
        let store = RecordStore::in_memory();
        let entries = EntryService::default();
        entries
            .add(&store, RecordType::Website, &raw(&[("websiteName", "GitHub"), ("username", "octo"), ("password", "p")]))
            .await
            .unwrap();
        entries
            .add(&store, RecordType::Email, &raw(&[("fullName", "Jo"), ("username", "jo@x.com"), ("password", "p")]))
            .await
            .unwrap();

        let mut out = Vec::new();
        list(&store, "octo", &mut out).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "   1  website  GitHub  octo\n");
    }

    #[tokio::test]
    async fn import_with_fixed_policy_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("in.json");
        std::fs::write(
            &file,
            r#"[{"type": "website", "websiteName": "GitHub", "username": "octo", "password": "a"},
                {"type": "website", "websiteName": "GitHub", "username": "octo", "password": "b"}]"#,
        )
        .unwrap();

        let store = RecordStore::in_memory();
        let entries = EntryService::default();
        let flags = ImportFlags {
            on_conflict: Some(ConflictMode::Skip),
            ..Default::default()
        };
        import(&store, &entries, &Config::default(), &file, flags).await.unwrap();

        let records = store.get_all().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind.password(), "a");
    }

    #[tokio::test]
    async fn import_of_missing_file_fails() {
        let store = RecordStore::in_memory();
        let entries = EntryService::default();
        let result = import(
            &store,
            &entries,
            &Config::default(),
            Path::new("/nonexistent/in.json"),
            ImportFlags::default(),
        )
        .await;
        assert!(result.is_err());
    }
}
