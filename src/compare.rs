//! Offline comparison of two local files, for `churn diff`.
//!
//! Runs the same detect → extract → normalize → diff pipeline an update cycle
//! uses, without touching the database.

use anyhow::{Context, Result};
use std::path::Path;

use crate::detect::{detect, ContentKind};
use crate::diff::{diff, DiffOptions, WordStats};
use crate::extract::extract_text;
use crate::normalize::normalize;

/// A local file read once: its detected kind and normalized text.
#[derive(Debug)]
pub struct LoadedFile {
    pub kind: ContentKind,
    pub text: String,
}

pub fn load(path: &Path) -> Result<LoadedFile> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let kind = detect(&bytes);
    let text = extract_text(&bytes)
        .with_context(|| format!("Failed to extract text from {}", path.display()))?;
    Ok(LoadedFile {
        kind,
        text: normalize(&text),
    })
}

fn compare_loaded(new: &LoadedFile, old: Option<&Path>, options: &DiffOptions) -> Result<WordStats> {
    let old_text = old.map(load).transpose()?.map(|file| file.text);
    Ok(diff(&new.text, old_text.as_deref(), options))
}

pub fn compare_files(new: &Path, old: Option<&Path>, options: &DiffOptions) -> Result<WordStats> {
    compare_loaded(&load(new)?, old, options)
}

/// Entry point for `churn diff`.
pub fn run_compare(new: &Path, old: Option<&Path>, options: &DiffOptions) -> Result<()> {
    let file = load(new)?;
    let stats = compare_loaded(&file, old, options)?;

    println!("diff {}", new.display());
    println!("  kind: {}", file.kind);
    if let Some(old) = old {
        println!("  against: {}", old.display());
    }
    println!("  abs words: {}", stats.abs_word_count);
    println!("  changed words: {}", stats.changed_word_count);
    Ok(())
}
