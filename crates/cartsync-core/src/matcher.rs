//! Line matching and overlay derivation
//!
//! Rendered line nodes carry identifiers like
//! `gid://shopify/CartLine/1?cart=abc` while the API reports
//! `gid://shopify/CartLine/1`. A record matches a node when its remote id is a
//! substring of the node's id; the first such record in fetch order wins.
//! This leans on the widget's undocumented id format and may need revisiting
//! if that format changes.

use crate::types::{CartLineRecord, KeyValue, Overlay};
use std::collections::HashMap;

/// Pair visual line ids with fetched records
///
/// Unmatched ids get no entry. Records with an empty id never match.
#[must_use]
pub fn match_lines<S: AsRef<str>>(
    visual_ids: &[S],
    records: &[CartLineRecord],
) -> HashMap<String, CartLineRecord> {
    let mut matched = HashMap::with_capacity(visual_ids.len());
    for visual_id in visual_ids {
        let visual_id = visual_id.as_ref();
        if let Some(record) = find_record(visual_id, records) {
            matched.insert(visual_id.to_string(), record.clone());
        }
    }
    matched
}

/// First record whose remote id is contained in `visual_id`
#[must_use]
pub fn find_record<'a>(visual_id: &str, records: &'a [CartLineRecord]) -> Option<&'a CartLineRecord> {
    records
        .iter()
        .find(|r| !r.remote_id.is_empty() && visual_id.contains(r.remote_id.as_str()))
}

/// Visible overlay for a record, hiding keys under `reserved_prefix`
#[must_use]
pub fn overlay_for(record: &CartLineRecord, reserved_prefix: &str) -> Overlay {
    let entries: Vec<KeyValue> = record
        .attributes
        .iter()
        .filter(|kv| reserved_prefix.is_empty() || !kv.key.starts_with(reserved_prefix))
        .cloned()
        .collect();
    Overlay { entries }
}
