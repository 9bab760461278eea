//! Attribute projection
//!
//! Turns the custom data fields attached to a submit control, plus an
//! optional free-text note, into the ordered attribute list sent with a line.

use crate::types::KeyValue;
use indexmap::IndexMap;

/// Label used for the note when none is configured
pub const DEFAULT_NOTE_LABEL: &str = "Monogram";

/// Builds line attributes from control data
#[derive(Debug, Clone)]
pub struct AttributeProjector {
    note_label: String,
}

impl AttributeProjector {
    /// Projector that files notes under `note_label`
    #[inline]
    #[must_use]
    pub fn new(note_label: impl Into<String>) -> Self {
        Self {
            note_label: note_label.into(),
        }
    }

    /// Label personalization notes are filed under
    #[inline]
    #[must_use]
    pub fn note_label(&self) -> &str {
        &self.note_label
    }

    /// Project fields and note into attributes
    ///
    /// Field order is preserved and each key becomes a display label. The
    /// note is appended last, trimmed, and only when something remains.
    #[must_use]
    pub fn project(&self, fields: &IndexMap<String, String>, note: Option<&str>) -> Vec<KeyValue> {
        let mut attributes: Vec<KeyValue> = fields
            .iter()
            .map(|(key, value)| KeyValue::new(humanize_key(key), value.clone()))
            .collect();

        if let Some(note) = note.map(str::trim).filter(|n| !n.is_empty()) {
            attributes.push(KeyValue::new(self.note_label.clone(), note));
        }

        attributes
    }
}

impl Default for AttributeProjector {
    fn default() -> Self {
        Self::new(DEFAULT_NOTE_LABEL)
    }
}

/// Convert a camelCase field name into a title-cased label
///
/// `promoCode` becomes `Promo Code`, `giftWrap` becomes `Gift Wrap`.
#[must_use]
pub fn humanize_key(key: &str) -> String {
    let mut spaced = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_uppercase() {
            spaced.push(' ');
        }
        spaced.push(ch);
    }

    spaced
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
