//! Context: the ordered collection of named layers handed to the
//! renderer.
//!
//! Layers live in a name-keyed map while the compositing order is an
//! explicit list of names — rendering always iterates the order list,
//! never the map. The two are kept consistent: every ordered name has a
//! map entry and vice versa, and duplicate names are rejected at insert
//! time.
//!
//! A context is a value type. Cloning copies every layer record (pixel
//! buffers stay shared copy-on-write), so search threads can mutate
//! independent clones without locking.

use crate::layer::Layer;
use std::collections::BTreeMap;

/// Ordered, name-keyed layer collection.
#[derive(Debug, Clone, Default)]
pub struct Context {
    layers: BTreeMap<String, Layer>,
    order: Vec<String>,
}

impl Context {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// `true` when no layers are present.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// `true` if a layer with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.layers.contains_key(name)
    }

    /// Appends a layer at the top of the stack. Returns `false` (and
    /// leaves the context unchanged) if the name is already taken.
    pub fn insert(&mut self, layer: Layer) -> bool {
        let name = layer.name().to_string();
        if self.layers.contains_key(&name) {
            tracing::warn!(layer = %name, "failed to add layer: name already exists");
            return false;
        }
        self.layers.insert(name.clone(), layer);
        self.order.push(name);
        true
    }

    /// Removes a layer by name. Returns `false` if it does not exist.
    pub fn remove(&mut self, name: &str) -> bool {
        if self.layers.remove(name).is_none() {
            tracing::warn!(layer = %name, "failed to delete layer: does not exist");
            return false;
        }
        self.order.retain(|n| n != name);
        true
    }

    /// Borrows a layer by name.
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.get(name)
    }

    /// Mutably borrows a layer by name.
    pub fn layer_mut(&mut self, name: &str) -> Option<&mut Layer> {
        self.layers.get_mut(name)
    }

    /// The compositing order, bottom layer first.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Replaces the order list after validating that every name exists.
    /// Returns `false` (state unchanged) otherwise.
    pub fn set_order(&mut self, order: Vec<String>) -> bool {
        for name in &order {
            if !self.layers.contains_key(name) {
                tracing::warn!(layer = %name, "unable to set layer order: missing layer");
                return false;
            }
        }
        self.order = order;
        true
    }

    /// Moves the layer at order index `from` to index `to`. Out-of-bounds
    /// indices or `from == to` are no-ops returning `false`.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        if from >= self.order.len() || to >= self.order.len() {
            tracing::warn!(from, to, "failed to move layer: index out of bounds");
            return false;
        }
        if from == to {
            tracing::warn!(from, "failed to move layer: destination same as source");
            return false;
        }
        let name = self.order.remove(from);
        self.order.insert(to, name);
        true
    }

    /// Iterates layers bottom-to-top in compositing order.
    pub fn layers_in_order(&self) -> impl Iterator<Item = &Layer> {
        self.order.iter().filter_map(|n| self.layers.get(n))
    }

    /// Iterates layers in name order (the map's natural order). The
    /// renderer never uses this; it exists for stable enumeration in
    /// bindings and diagnostics.
    pub fn layers_by_name(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retouch_core::Image;

    fn layer(name: &str) -> Layer {
        Layer::new(name, Image::new(2, 2))
    }

    #[test]
    fn test_insert_and_order() {
        let mut c = Context::new();
        assert!(c.insert(layer("bg")));
        assert!(c.insert(layer("fg")));
        assert_eq!(c.order(), ["bg", "fg"]);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut c = Context::new();
        assert!(c.insert(layer("a")));
        assert!(!c.insert(layer("a")));
        assert_eq!(c.len(), 1);
        assert_eq!(c.order().len(), 1);
    }

    #[test]
    fn test_remove_keeps_order_consistent() {
        let mut c = Context::new();
        c.insert(layer("a"));
        c.insert(layer("b"));
        c.insert(layer("c"));
        assert!(c.remove("b"));
        assert_eq!(c.order(), ["a", "c"]);
        assert!(!c.remove("b"));
    }

    #[test]
    fn test_set_order_validates() {
        let mut c = Context::new();
        c.insert(layer("a"));
        c.insert(layer("b"));
        assert!(!c.set_order(vec!["a".into(), "missing".into()]));
        assert_eq!(c.order(), ["a", "b"]);
        assert!(c.set_order(vec!["b".into(), "a".into()]));
        assert_eq!(c.order(), ["b", "a"]);
    }

    #[test]
    fn test_reorder() {
        let mut c = Context::new();
        for n in ["a", "b", "c"] {
            c.insert(layer(n));
        }
        assert!(c.reorder(0, 2));
        assert_eq!(c.order(), ["b", "c", "a"]);
        assert!(c.reorder(2, 0));
        assert_eq!(c.order(), ["a", "b", "c"]);
        assert!(!c.reorder(0, 5));
        assert!(!c.reorder(1, 1));
        assert_eq!(c.order(), ["a", "b", "c"]);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut c = Context::new();
        c.insert(layer("a"));
        let mut copy = c.clone();
        copy.layer_mut("a").unwrap().set_opacity(0.25);
        assert_eq!(c.layer("a").unwrap().opacity(), 1.0);
        assert_eq!(copy.layer("a").unwrap().opacity(), 0.25);
    }
}
