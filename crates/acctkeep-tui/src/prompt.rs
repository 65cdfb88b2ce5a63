//! Conflict resolvers used by the frontends.

use crate::config::ConflictMode;
use acctkeep_core::{Conflict, ConflictDecision, ConflictPolicy, ConflictResolver};
use std::io::{BufRead, Write};

/// Either asks through `P` or applies a fixed policy, as configured.
pub enum Resolver<P> {
    Ask(P),
    Fixed(ConflictPolicy),
}

impl<P> Resolver<P> {
    /// Build from the configured mode, calling `ask` only when prompting is wanted.
    pub fn from_mode(mode: ConflictMode, ask: impl FnOnce() -> P) -> Self {
        match mode {
            ConflictMode::Ask => Resolver::Ask(ask()),
            ConflictMode::Replace => Resolver::Fixed(ConflictPolicy::AlwaysReplace),
            ConflictMode::Skip => Resolver::Fixed(ConflictPolicy::AlwaysSkip),
        }
    }
}

impl<P: ConflictResolver> ConflictResolver for Resolver<P> {
    async fn resolve(&mut self, conflict: &Conflict<'_>) -> ConflictDecision {
        match self {
            Resolver::Ask(prompt) => prompt.resolve(conflict).await,
            Resolver::Fixed(policy) => policy.resolve(conflict).await,
        }
    }
}

/// Reads a yes/no answer per conflict from a line-based reader.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, message: &str) -> std::io::Result<ConflictDecision> {
        loop {
            write!(self.output, "{message} [y/N] ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(ConflictDecision::Skip);
            }
            match line.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => return Ok(ConflictDecision::Replace),
                "" | "n" | "no" => return Ok(ConflictDecision::Skip),
                _ => writeln!(self.output, "Please answer y or n.")?,
            }
        }
    }
}

impl<R: BufRead, W: Write> ConflictResolver for LinePrompt<R, W> {
    async fn resolve(&mut self, conflict: &Conflict<'_>) -> ConflictDecision {
        match self.ask(&conflict.message()) {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!("Conflict prompt failed, keeping stored record: {}", e);
                ConflictDecision::Skip
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acctkeep_core::{EntryService, Importer, RecordStore};
    use std::io::Cursor;

    const PAYLOAD: &str = r#"[
        {"type": "email", "fullName": "Jo", "username": "jo@x.com", "password": "one"},
        {"type": "email", "fullName": "Jo", "username": "jo@x.com", "password": "two"},
        {"type": "email", "fullName": "Jo", "username": "jo@x.com", "password": "three"}
    ]"#;

    #[tokio::test]
    async fn line_prompt_reprompts_on_unknown_answer() {
        let store = RecordStore::in_memory();
        let entries = EntryService::default();
        let mut output = Vec::new();
        let mut prompt = LinePrompt::new(Cursor::new("maybe\ny\n\n"), &mut output);

        let summary = Importer::new(&store, &entries)
            .import_json(PAYLOAD, &mut prompt)
            .await
            .unwrap();

        assert_eq!((summary.added, summary.replaced, summary.skipped), (1, 1, 1));
        assert_eq!(store.get_all().await[0].kind.password(), "two");
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("Please answer y or n."));
        assert!(shown.contains("Email entry with username \"jo@x.com\" already exists. Replace? [y/N]"));
    }

    #[tokio::test]
    async fn fixed_mode_never_prompts() {
        let store = RecordStore::in_memory();
        let entries = EntryService::default();
        let mut resolver = Resolver::from_mode(ConflictMode::Replace, || -> LinePrompt<Cursor<&str>, Vec<u8>> {
            panic!("should not prompt")
        });

        let summary = Importer::new(&store, &entries)
            .import_json(PAYLOAD, &mut resolver)
            .await
            .unwrap();

        assert_eq!(summary.replaced, 2);
        assert_eq!(store.get_all().await[0].kind.password(), "three");
    }
}
