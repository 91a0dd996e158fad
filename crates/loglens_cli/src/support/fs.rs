use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Value of `key` in a dotenv-style file, if the file and key exist.
pub fn env_file_value(path: &Path, key: &str) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(content.lines().find_map(|line| {
        let (k, v) = line.split_once('=')?;
        (k.trim() == key).then(|| v.trim().to_owned())
    }))
}

/// Sets each `key=value` in a dotenv-style file, keeping unrelated lines.
/// Entries with a `None` value are removed.
pub fn upsert_env_file(path: &Path, entries: &[(&str, Option<&str>)]) -> Result<()> {
    let existing = if path.exists() {
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?
    } else {
        String::new()
    };

    let mut lines: Vec<String> = existing
        .lines()
        .filter(|line| {
            let key = line.split_once('=').map(|(k, _)| k.trim());
            !entries.iter().any(|(k, _)| Some(*k) == key)
        })
        .map(str::to_owned)
        .collect();

    for (key, value) in entries {
        if let Some(value) = value {
            lines.push(format!("{key}={value}"));
        }
    }

    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// Makes sure `entry` is listed in the given `.gitignore`.
pub fn ensure_gitignored(gitignore: &Path, entry: &str) -> Result<()> {
    if gitignore.exists() {
        let mut content = fs::read_to_string(gitignore).context("Failed to read .gitignore")?;
        if !content.lines().any(|line| line.trim() == entry) {
            if !content.is_empty() && !content.ends_with('\n') {
                content.push('\n');
            }
            content.push_str(entry);
            content.push('\n');
            fs::write(gitignore, content).context("Failed to update .gitignore")?;
        }
    } else {
        fs::write(gitignore, format!("{entry}\n")).context("Failed to create .gitignore")?;
    }
    Ok(())
}
