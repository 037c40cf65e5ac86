//! Word-level change quantification.
//!
//! Two normalized texts are turned into an edit script at word granularity
//! (Myers diff via `similar`, then a pairing pass inside each replaced block
//! that lines up near-identical words). Every inserted or deleted word is a
//! candidate change; [`ChangeCounter`] walks the candidates in script order
//! and collapses a candidate into the one flagged just before it when the two
//! are close textual matches, so a retyped word counts once instead of twice.
//!
//! ```text
//! old:  abc definitely ghioolies      foo bar
//! new:  abc dyfinitely ghjoolies jkl3 foo bar
//!
//! script: = abc
//!         + dyfinitely   counted (1)
//!         - definitely   close to "dyfinitely", absorbed
//!         + ghjoolies    counted (2)
//!         - ghioolies    close to "ghjoolies", absorbed
//!         + jkl3         counted (3)
//!         = foo
//!         = bar
//! ```

use serde::{Deserialize, Serialize};
use similar::{capture_diff_slices, Algorithm, DiffTag, TextDiff};

use crate::normalize::{word_count, words};

/// Default similarity at or above which a candidate is folded into the
/// previously flagged word.
pub const DEFAULT_CLOSE_MATCH_CUTOFF: f32 = 0.6;

/// Default similarity needed to pair a deleted word with an inserted word
/// inside a replaced block.
pub const DEFAULT_PAIR_CUTOFF: f32 = 0.75;

/// Above this many old x new comparisons a replaced block is not searched for
/// pairs; its deletions and insertions are emitted as two runs instead.
const MAX_PAIRING_COMPARISONS: usize = 250_000;

/// Tunables for [`diff`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DiffOptions {
    #[serde(default = "default_close_match_cutoff")]
    pub close_match_cutoff: f32,
    #[serde(default = "default_pair_cutoff")]
    pub pair_cutoff: f32,
}

fn default_close_match_cutoff() -> f32 {
    DEFAULT_CLOSE_MATCH_CUTOFF
}

fn default_pair_cutoff() -> f32 {
    DEFAULT_PAIR_CUTOFF
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            close_match_cutoff: DEFAULT_CLOSE_MATCH_CUTOFF,
            pair_cutoff: DEFAULT_PAIR_CUTOFF,
        }
    }
}

/// Result of comparing a new text against its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WordStats {
    pub abs_word_count: usize,
    pub changed_word_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Equal,
    Insert,
    Delete,
}

/// One entry of a word-level edit script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edit<'a> {
    pub kind: EditKind,
    pub word: &'a str,
}

impl<'a> Edit<'a> {
    fn equal(word: &'a str) -> Self {
        Self {
            kind: EditKind::Equal,
            word,
        }
    }

    fn insert(word: &'a str) -> Self {
        Self {
            kind: EditKind::Insert,
            word,
        }
    }

    fn delete(word: &'a str) -> Self {
        Self {
            kind: EditKind::Delete,
            word,
        }
    }

    pub fn is_candidate(&self) -> bool {
        self.kind != EditKind::Equal
    }
}

/// Compare `new_text` against `old_text` (both normalized).
///
/// Without a predecessor nothing can have changed, so only the absolute count
/// is reported.
pub fn diff(new_text: &str, old_text: Option<&str>, options: &DiffOptions) -> WordStats {
    let abs_word_count = word_count(new_text);
    let changed_word_count = match old_text {
        None => 0,
        Some(old_text) => {
            let new_words = words(new_text);
            let old_words = words(old_text);
            let script = edit_script(&new_words, &old_words, options.pair_cutoff);
            count_changes(&script, options.close_match_cutoff)
        }
    };
    WordStats {
        abs_word_count,
        changed_word_count,
    }
}

/// Build the word-level edit script turning `old` into `new`.
pub fn edit_script<'a>(new: &[&'a str], old: &[&'a str], pair_cutoff: f32) -> Vec<Edit<'a>> {
    let ops = capture_diff_slices(Algorithm::Myers, old, new);
    let mut script = Vec::with_capacity(new.len().max(old.len()));
    // Pending replaced region as (old_start, old_end, new_start, new_end).
    let mut block: Option<(usize, usize, usize, usize)> = None;

    for op in &ops {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        if tag == DiffTag::Equal {
            if let Some((os, oe, ns, ne)) = block.take() {
                align_block(&old[os..oe], &new[ns..ne], pair_cutoff, &mut script);
            }
            script.extend(new[new_range].iter().map(|&w| Edit::equal(w)));
            continue;
        }
        block = Some(match block {
            None => (old_range.start, old_range.end, new_range.start, new_range.end),
            Some((os, _, ns, _)) => (os, old_range.end, ns, new_range.end),
        });
    }
    if let Some((os, oe, ns, ne)) = block {
        align_block(&old[os..oe], &new[ns..ne], pair_cutoff, &mut script);
    }
    script
}

/// Order the words of one replaced block so that the most similar
/// deleted/inserted pair sits adjacent in the script, recursing on the words
/// before and after that pair.
fn align_block<'a>(old: &[&'a str], new: &[&'a str], pair_cutoff: f32, out: &mut Vec<Edit<'a>>) {
    if old.is_empty() {
        out.extend(new.iter().map(|&w| Edit::insert(w)));
        return;
    }
    if new.is_empty() {
        out.extend(old.iter().map(|&w| Edit::delete(w)));
        return;
    }
    if old.len().saturating_mul(new.len()) > MAX_PAIRING_COMPARISONS {
        emit_runs(old, new, out);
        return;
    }

    let mut best: Option<(usize, usize, f32)> = None;
    let mut first_equal: Option<(usize, usize)> = None;
    for (i, old_word) in old.iter().enumerate() {
        for (j, new_word) in new.iter().enumerate() {
            if old_word == new_word {
                first_equal.get_or_insert((i, j));
                continue;
            }
            let floor = best.map_or(pair_cutoff, |(_, _, r)| r);
            if ratio_upper_bound(old_word, new_word) < floor {
                continue;
            }
            let r = similarity(old_word, new_word);
            let improves = match best {
                None => r >= pair_cutoff,
                Some((_, _, current)) => r > current,
            };
            if improves {
                best = Some((i, j, r));
            }
        }
    }

    match (best, first_equal) {
        (Some((i, j, _)), _) => {
            align_block(&old[..i], &new[..j], pair_cutoff, out);
            out.push(Edit::insert(new[j]));
            out.push(Edit::delete(old[i]));
            align_block(&old[i + 1..], &new[j + 1..], pair_cutoff, out);
        }
        (None, Some((i, j))) => {
            align_block(&old[..i], &new[..j], pair_cutoff, out);
            out.push(Edit::equal(new[j]));
            align_block(&old[i + 1..], &new[j + 1..], pair_cutoff, out);
        }
        (None, None) => emit_runs(old, new, out),
    }
}

/// Emit an unpaired block as two runs, shorter side first.
fn emit_runs<'a>(old: &[&'a str], new: &[&'a str], out: &mut Vec<Edit<'a>>) {
    let inserts = new.iter().map(|&w| Edit::insert(w));
    let deletes = old.iter().map(|&w| Edit::delete(w));
    if old.len() < new.len() {
        out.extend(deletes);
        out.extend(inserts);
    } else {
        out.extend(inserts);
        out.extend(deletes);
    }
}

/// Character-level similarity in `[0, 1]`: twice the matched characters over
/// the combined length.
pub fn similarity(a: &str, b: &str) -> f32 {
    TextDiff::from_chars(a, b).ratio()
}

fn ratio_upper_bound(a: &str, b: &str) -> f32 {
    let la = a.chars().count();
    let lb = b.chars().count();
    if la + lb == 0 {
        return 1.0;
    }
    2.0 * la.min(lb) as f32 / (la + lb) as f32
}

/// Single-slot de-duplication over the candidates of an edit script.
///
/// The slot holds the last word that was counted. A candidate that closely
/// matches the slot is absorbed and empties the slot, so a third similar word
/// is judged afresh. Only immediately adjacent candidates are ever merged.
#[derive(Debug)]
pub struct ChangeCounter<'a> {
    cutoff: f32,
    last_flagged: Option<&'a str>,
    changed: usize,
}

impl<'a> ChangeCounter<'a> {
    pub fn new(cutoff: f32) -> Self {
        Self {
            cutoff,
            last_flagged: None,
            changed: 0,
        }
    }

    /// Feed the next script entry; equal words leave the state untouched.
    pub fn observe(&mut self, edit: &Edit<'a>) {
        if !edit.is_candidate() {
            return;
        }
        match self.last_flagged {
            Some(flagged) if similarity(edit.word, flagged) >= self.cutoff => {
                self.last_flagged = None;
            }
            _ => {
                self.changed += 1;
                self.last_flagged = Some(edit.word);
            }
        }
    }

    pub fn last_flagged(&self) -> Option<&'a str> {
        self.last_flagged
    }

    pub fn changed(&self) -> usize {
        self.changed
    }
}

/// Count changed words in an edit script.
pub fn count_changes(script: &[Edit<'_>], cutoff: f32) -> usize {
    let mut counter = ChangeCounter::new(cutoff);
    for edit in script {
        counter.observe(edit);
    }
    counter.changed()
}
