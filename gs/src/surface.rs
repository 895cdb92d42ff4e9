//! Display surface the controller writes to
//!
//! The panel's element plumbing lives outside this crate. The controller only
//! needs three operations on it, all keyed by stable element ids.

use std::collections::HashMap;

use tracing::debug;

/// Element registry exposed by the panel
pub trait Surface {
    /// Set the value held by a control's input element
    fn set_input(&mut self, container: &str, value: &str);

    /// Set the read-only text of a monitor or metric label
    fn set_text(&mut self, container: &str, text: &str);

    /// Show or hide an element
    fn set_visible(&mut self, element: &str, visible: bool);
}

/// In-memory surface that records what was written to it
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    inputs: HashMap<String, String>,
    texts: HashMap<String, String>,
    visibility: HashMap<String, bool>,
    transitions: Vec<(String, bool)>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self, container: &str) -> Option<&str> {
        self.inputs.get(container).map(String::as_str)
    }

    pub fn text(&self, container: &str) -> Option<&str> {
        self.texts.get(container).map(String::as_str)
    }

    pub fn is_visible(&self, element: &str) -> Option<bool> {
        self.visibility.get(element).copied()
    }

    /// Visibility changes in the order they happened
    ///
    /// Writes that leave an element's visibility unchanged are not recorded.
    pub fn transitions(&self) -> &[(String, bool)] {
        &self.transitions
    }

    /// Number of times `element` went from hidden (or unset) to visible
    pub fn times_shown(&self, element: &str) -> usize {
        self.transitions
            .iter()
            .filter(|(id, visible)| id == element && *visible)
            .count()
    }
}

impl Surface for MemorySurface {
    fn set_input(&mut self, container: &str, value: &str) {
        self.inputs.insert(container.to_string(), value.to_string());
    }

    fn set_text(&mut self, container: &str, text: &str) {
        self.texts.insert(container.to_string(), text.to_string());
    }

    fn set_visible(&mut self, element: &str, visible: bool) {
        let previous = self.visibility.insert(element.to_string(), visible);
        if previous != Some(visible) {
            debug!(%element, visible, "MemorySurface: visibility changed");
            self.transitions.push((element.to_string(), visible));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_values() {
        let mut surface = MemorySurface::new();
        surface.set_input("bleed", "0.5");
        surface.set_text("bleed", "0.5");

        assert_eq!(surface.input("bleed"), Some("0.5"));
        assert_eq!(surface.text("bleed"), Some("0.5"));
        assert_eq!(surface.text("radius"), None);
    }

    #[test]
    fn test_only_real_changes_are_transitions() {
        let mut surface = MemorySurface::new();
        surface.set_visible("controls", false);
        surface.set_visible("controls", true);
        surface.set_visible("controls", true);

        assert_eq!(surface.transitions().len(), 2);
        assert_eq!(surface.times_shown("controls"), 1);
        assert_eq!(surface.is_visible("controls"), Some(true));
    }
}
