// component.rs - Component registry
//
// Components are plain-data types registered by name with an element
// size. Ids are handed out densely and never reused; the id's index is
// also the component's bit position in every schema.

use crate::hash_index::HashIndex;

use super::{ComponentId, EcsError};

pub(crate) struct ComponentRegistry {
    by_name: HashIndex<Box<str>, ComponentId>,
    /// Dense id-index → element size.
    sizes: Vec<usize>,
    max_components: usize,
}

impl ComponentRegistry {
    pub fn new(max_components: usize) -> Self {
        Self {
            by_name: HashIndex::new(max_components),
            sizes: Vec::new(),
            max_components,
        }
    }

    /// Register a component, idempotently by name.
    ///
    /// Re-registering an existing name returns the original id; the
    /// size recorded at first registration stays authoritative.
    pub fn register(&mut self, name: &str, size: usize) -> Result<ComponentId, EcsError> {
        if size == 0 {
            return Err(EcsError::ZeroSizeComponent);
        }
        if let Some(&id) = self.by_name.get(name) {
            return Ok(id);
        }
        if self.sizes.len() >= self.max_components {
            return Err(EcsError::CapacityExceeded {
                what: "components",
                max: self.max_components,
            });
        }

        let id = ComponentId::new(self.sizes.len() as u32);
        self.by_name.insert(name.into(), id)?;
        self.sizes.push(size);
        Ok(id)
    }

    pub fn id_of(&self, name: &str) -> Option<ComponentId> {
        self.by_name.get(name).copied()
    }

    /// Element size for a registered id.
    pub fn size_of(&self, id: ComponentId) -> Result<usize, EcsError> {
        self.sizes
            .get(id.index())
            .copied()
            .ok_or(EcsError::InvalidHandle { bits: id.to_bits() })
    }

    pub fn is_registered(&self, id: ComponentId) -> bool {
        id.index() < self.sizes.len()
    }
}
