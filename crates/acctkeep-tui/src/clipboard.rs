//! System clipboard access.

use anyhow::{Context, Result};

/// Put `text` on the system clipboard.
pub fn copy(text: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new().context("Clipboard unavailable")?;
    clipboard
        .set_text(text.to_owned())
        .context("Failed to write to clipboard")
}
