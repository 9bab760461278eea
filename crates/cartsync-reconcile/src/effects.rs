//! UI effects of a reconciliation pass
//!
//! Overlay injection and badge recomputation. Both read the widget fresh each
//! time; the overlay marker on a node is the only record of past injections.

use cartsync_core::{
    badge_total, match_lines, overlay_for, Badge, CartLineRecord, CartWidget, HostRef,
    WidgetError,
};

/// Counts from one overlay step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayOutcome {
    /// Overlays added this pass
    pub injected: usize,
    /// Nodes skipped because they carry a marker
    pub already_marked: usize,
    /// Nodes with no remote record
    pub unmatched: usize,
    /// Matched, but every attribute was reserved
    pub nothing_to_show: usize,
}

/// Decorate every unmarked line node with its record's visible attributes
///
/// # Errors
/// - `WidgetError::Detached` if the host went away mid-step
pub fn apply_overlays<W>(
    widget: &W,
    host: HostRef,
    records: &[CartLineRecord],
    reserved_prefix: &str,
) -> Result<OverlayOutcome, WidgetError>
where
    W: CartWidget + ?Sized,
{
    let nodes = widget.line_nodes(host)?;
    let ids: Vec<&str> = nodes.iter().map(|n| n.line_id.as_str()).collect();
    let matched = match_lines(&ids, records);

    let mut outcome = OverlayOutcome::default();
    for node in &nodes {
        if node.has_overlay {
            outcome.already_marked += 1;
            continue;
        }
        let Some(record) = matched.get(&node.line_id) else {
            outcome.unmatched += 1;
            continue;
        };
        let overlay = overlay_for(record, reserved_prefix);
        if overlay.is_empty() {
            outcome.nothing_to_show += 1;
            continue;
        }
        match widget.inject_overlay(host, &node.line_id, &overlay) {
            Ok(()) => outcome.injected += 1,
            Err(WidgetError::Detached) => return Err(WidgetError::Detached),
            Err(e) => tracing::warn!(line_id = %node.line_id, error = %e, "overlay injection skipped"),
        }
    }
    Ok(outcome)
}

/// Recompute the badge from rendered quantity labels and publish it
pub fn refresh_badge<W>(widget: &W, host: HostRef) -> Result<Badge, WidgetError>
where
    W: CartWidget + ?Sized,
{
    let labels = widget.quantity_labels(host)?;
    let badge = Badge::from_total(badge_total(&labels));
    widget.set_badge(badge);
    Ok(badge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartsync_core::{KeyValue, Overlay};
    use cartsync_test_utils::{line_record, FakeWidget};

    const LINE_1: &str = "gid://shopify/CartLine/1?cart=abc";
    const LINE_2: &str = "gid://shopify/CartLine/2?cart=abc";

    fn records() -> Vec<CartLineRecord> {
        vec![
            line_record("gid://shopify/CartLine/1", &[("Monogram", "AB"), ("_source", "btn")]),
            line_record("gid://shopify/CartLine/2", &[("_source", "btn")]),
        ]
    }

    #[test]
    fn injects_visible_attributes_once() {
        let widget = FakeWidget::mounted(&[(LINE_1, "1"), (LINE_2, "2")]);
        let host = widget.host().unwrap();

        let first = apply_overlays(&widget, host, &records(), "_").unwrap();
        assert_eq!(first.injected, 1);
        assert_eq!(first.nothing_to_show, 1);
        assert_eq!(
            widget.overlays_for(LINE_1),
            vec![Overlay {
                entries: vec![KeyValue::new("Monogram", "AB")]
            }]
        );

        let second = apply_overlays(&widget, host, &records(), "_").unwrap();
        assert_eq!(second.injected, 0);
        assert_eq!(second.already_marked, 1);
        assert_eq!(widget.total_overlays(), 1);
    }

    #[test]
    fn unmatched_nodes_are_left_alone() {
        let widget = FakeWidget::mounted(&[("gid://shopify/CartLine/9?cart=abc", "1")]);
        let host = widget.host().unwrap();

        let outcome = apply_overlays(&widget, host, &records(), "_").unwrap();
        assert_eq!(outcome.unmatched, 1);
        assert_eq!(widget.total_overlays(), 0);
    }

    #[test]
    fn detached_host_aborts() {
        let widget = FakeWidget::mounted(&[(LINE_1, "1")]);
        let host = widget.host().unwrap();
        widget.detach();

        assert_eq!(
            apply_overlays(&widget, host, &records(), "_"),
            Err(WidgetError::Detached)
        );
    }

    #[test]
    fn badge_sums_quantities_and_ignores_garbage() {
        let widget = FakeWidget::mounted(&[("a", "2"), ("b", "3"), ("c", "x")]);
        let host = widget.host().unwrap();

        let badge = refresh_badge(&widget, host).unwrap();
        assert_eq!(badge, Badge { count: 5, visible: true });
        assert_eq!(widget.badge(), Some(badge));
    }

    #[test]
    fn empty_cart_hides_badge() {
        let widget = FakeWidget::mounted(&[]);
        let host = widget.host().unwrap();

        let badge = refresh_badge(&widget, host).unwrap();
        assert!(!badge.visible);
    }
}
