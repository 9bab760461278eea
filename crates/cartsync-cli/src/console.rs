//! Terminal stand-in for the storefront cart drawer
//!
//! Renders remote lines the way the hosted drawer does, with line ids
//! suffixed by the cart token, and prints overlays and badge changes.

use cartsync_core::{
    Badge, CartId, CartLineRecord, CartWidget, HostRef, Overlay, VisualLine, WidgetError,
};
use parking_lot::Mutex;

#[derive(Debug, Clone)]
struct Row {
    line_id: String,
    overlay: Option<Overlay>,
}

#[derive(Debug, Default)]
struct DrawerState {
    host: Option<HostRef>,
    generation: u64,
    rows: Vec<Row>,
    badge: Badge,
    open: bool,
}

/// Cart drawer printed to stdout
#[derive(Debug, Default)]
pub(crate) struct ConsoleWidget {
    state: Mutex<DrawerState>,
}

impl ConsoleWidget {
    /// Drawer mounted once, with no rows yet
    pub(crate) fn mounted() -> Self {
        let widget = Self::default();
        widget.replace_host();
        widget
    }

    /// Redraw `host` from freshly read lines
    ///
    /// Rows that keep their id keep their overlay, like the hosted drawer's
    /// keyed re-render.
    pub(crate) fn render(
        &self,
        host: HostRef,
        cart_id: &CartId,
        records: &[CartLineRecord],
    ) -> Result<(), WidgetError> {
        let mut state = self.state.lock();
        if state.host != Some(host) {
            return Err(WidgetError::Detached);
        }
        let token = cart_token(cart_id);
        let previous = std::mem::take(&mut state.rows);
        state.rows = records
            .iter()
            .map(|record| {
                let line_id = format!("{}?cart={token}", record.remote_id);
                let overlay = previous
                    .iter()
                    .find(|row| row.line_id == line_id)
                    .and_then(|row| row.overlay.clone());
                Row { line_id, overlay }
            })
            .collect();
        Ok(())
    }

    pub(crate) fn is_open(&self) -> bool {
        self.state.lock().open
    }

    pub(crate) fn close(&self) {
        self.state.lock().open = false;
    }

    fn check(state: &DrawerState, host: HostRef) -> Result<(), WidgetError> {
        if state.host == Some(host) {
            Ok(())
        } else {
            Err(WidgetError::Detached)
        }
    }
}

impl CartWidget for ConsoleWidget {
    fn host(&self) -> Option<HostRef> {
        self.state.lock().host
    }

    fn line_nodes(&self, host: HostRef) -> Result<Vec<VisualLine>, WidgetError> {
        let state = self.state.lock();
        Self::check(&state, host)?;
        Ok(state
            .rows
            .iter()
            .map(|row| VisualLine {
                line_id: row.line_id.clone(),
                has_overlay: row.overlay.is_some(),
            })
            .collect())
    }

    fn inject_overlay(
        &self,
        host: HostRef,
        line_id: &str,
        overlay: &Overlay,
    ) -> Result<(), WidgetError> {
        let mut state = self.state.lock();
        Self::check(&state, host)?;
        let row = state
            .rows
            .iter_mut()
            .find(|row| row.line_id == line_id)
            .ok_or_else(|| WidgetError::NodeMissing(line_id.to_string()))?;
        println!("  {line_id}");
        for entry in &overlay.entries {
            println!("    {}: {}", entry.key, entry.value);
        }
        row.overlay = Some(overlay.clone());
        Ok(())
    }

    fn quantity_labels(&self, host: HostRef) -> Result<Vec<String>, WidgetError> {
        let state = self.state.lock();
        Self::check(&state, host)?;
        // Every line is added one unit at a time
        Ok(state.rows.iter().map(|_| "1".to_string()).collect())
    }

    fn set_badge(&self, badge: Badge) {
        let mut state = self.state.lock();
        if state.badge != badge {
            if badge.visible {
                println!("cart badge: {}", badge.count);
            } else {
                println!("cart badge hidden");
            }
        }
        state.badge = badge;
    }

    fn replace_host(&self) -> HostRef {
        let mut state = self.state.lock();
        state.generation += 1;
        let host = HostRef::new(state.generation);
        state.host = Some(host);
        state.rows.clear();
        host
    }

    fn open_drawer(&self, host: HostRef) -> Result<(), WidgetError> {
        let mut state = self.state.lock();
        Self::check(&state, host)?;
        state.open = true;
        println!("cart drawer opened");
        Ok(())
    }
}

/// Opaque token the drawer appends to line ids
pub(crate) fn cart_token(cart_id: &CartId) -> &str {
    let id = cart_id.as_str();
    let id = id.split('?').next().unwrap_or(id);
    id.rsplit('/').next().unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartsync_core::{match_lines, KeyValue};
    use pretty_assertions::assert_eq;

    fn cart() -> CartId {
        CartId::new("gid://shopify/Cart/c1-abc123?key=secret")
    }

    fn records() -> Vec<CartLineRecord> {
        vec![CartLineRecord::new(
            "gid://shopify/CartLine/9",
            vec![KeyValue::new("Monogram", "JD")],
        )]
    }

    #[test]
    fn token_strips_prefix_and_query() {
        assert_eq!(cart_token(&cart()), "c1-abc123");
        assert_eq!(cart_token(&CartId::new("plain")), "plain");
    }

    #[test]
    fn rendered_ids_match_remote_records() {
        let widget = ConsoleWidget::mounted();
        let host = widget.host().unwrap();
        widget.render(host, &cart(), &records()).unwrap();

        let nodes = widget.line_nodes(host).unwrap();
        assert_eq!(nodes[0].line_id, "gid://shopify/CartLine/9?cart=c1-abc123");
        let ids: Vec<&str> = nodes.iter().map(|n| n.line_id.as_str()).collect();
        assert_eq!(match_lines(&ids, &records()).len(), 1);
    }

    #[test]
    fn rerender_keeps_markers_until_replaced() {
        let widget = ConsoleWidget::mounted();
        let host = widget.host().unwrap();
        widget.render(host, &cart(), &records()).unwrap();
        let line_id = widget.line_nodes(host).unwrap()[0].line_id.clone();
        widget
            .inject_overlay(host, &line_id, &Overlay::default())
            .unwrap();

        widget.render(host, &cart(), &records()).unwrap();
        assert!(widget.line_nodes(host).unwrap()[0].has_overlay);

        let next = widget.replace_host();
        assert!(widget.line_nodes(host).is_err());
        assert!(widget.line_nodes(next).unwrap().is_empty());
    }
}
