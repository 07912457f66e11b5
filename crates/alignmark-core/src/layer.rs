use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a layer inside a [`LayerStack`].
pub type LayerId = u32;

/// A drawing layer, addressed in GDS by (layer, datatype).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub gds_layer: u16,
    pub gds_datatype: u16,
}

impl Layer {
    pub fn gds_pair(&self) -> (u16, u16) {
        (self.gds_layer, self.gds_datatype)
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}/{})", self.name, self.gds_layer, self.gds_datatype)
    }
}

/// The layers known to a layout, in insertion order.
///
/// At most one layer exists per GDS (layer, datatype) pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayerStack {
    layers: Vec<Layer>,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the layer mapped to (gds_layer, gds_datatype), added under `name` if new.
    pub fn insert(&mut self, name: &str, gds_layer: u16, gds_datatype: u16) -> LayerId {
        if let Some(layer) = self.by_gds(gds_layer, gds_datatype) {
            return layer.id;
        }
        let id = self.layers.len() as LayerId;
        self.layers.push(Layer {
            id,
            name: name.to_string(),
            gds_layer,
            gds_datatype,
        });
        id
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(id as usize)
    }

    pub fn by_gds(&self, gds_layer: u16, gds_datatype: u16) -> Option<&Layer> {
        self.layers
            .iter()
            .find(|l| l.gds_pair() == (gds_layer, gds_datatype))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_idempotent_per_gds_pair() {
        let mut stack = LayerStack::new();
        let cross = stack.insert("cross", 1, 0);
        let text = stack.insert("text", 2, 0);
        assert_ne!(cross, text);
        assert_eq!(stack.insert("again", 1, 0), cross);
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.get(text).unwrap().gds_pair(), (2, 0));
        assert_eq!(stack.get(cross).unwrap().name, "cross");
        assert!(stack.get(7).is_none());
    }

    #[test]
    fn test_datatype_distinguishes_layers() {
        let mut stack = LayerStack::new();
        let a = stack.insert("a", 1, 0);
        let b = stack.insert("b", 1, 5);
        assert_ne!(a, b);
        assert_eq!(stack.by_gds(1, 5).unwrap().id, b);
        assert_eq!(stack.get(b).unwrap().to_string(), "b (1/5)");
    }
}
