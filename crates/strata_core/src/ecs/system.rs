// system.rs - System registry and views
//
// A system pairs a required schema with a callback. Its match list
// holds every archetype whose schema is a superset of the requirement:
// seeded from the archetypes that already exist at registration time,
// then appended to whenever a matching archetype is created. The list
// is never pruned (archetypes are never destroyed).

use bytemuck::Pod;

use crate::hash_index::HashIndex;

use super::archetype::ArchetypeStore;
use super::{ComponentId, EcsError, EntityId, Schema, SystemId};

/// Callback invoked by `World::update_system`, once, synchronously.
pub type SystemFn = Box<dyn FnMut(&mut View<'_>)>;

pub(crate) struct System {
    required: Schema,
    /// Taken out for the duration of the callback.
    func: Option<SystemFn>,
    /// Positions of matching archetypes, append-only.
    matched: Vec<usize>,
}

impl System {
    pub fn matched(&self) -> &[usize] {
        &self.matched
    }

    pub fn take_func(&mut self) -> Option<SystemFn> {
        self.func.take()
    }

    pub fn put_func(&mut self, func: SystemFn) {
        self.func = Some(func);
    }
}

pub(crate) struct SystemRegistry {
    by_name: HashIndex<Box<str>, SystemId>,
    systems: Vec<System>,
    max_systems: usize,
}

impl SystemRegistry {
    pub fn new(max_systems: usize) -> Self {
        Self {
            by_name: HashIndex::new(max_systems),
            systems: Vec::new(),
            max_systems,
        }
    }

    /// Register a system, idempotently by name. The match list is
    /// seeded with every archetype that already exists, so systems
    /// registered late still observe pre-existing data.
    pub fn register(
        &mut self,
        name: &str,
        func: SystemFn,
        required: Schema,
        store: &ArchetypeStore,
    ) -> Result<SystemId, EcsError> {
        if required.is_empty() {
            return Err(EcsError::EmptyAccess {
                name: name.to_string(),
            });
        }
        if let Some(&id) = self.by_name.get(name) {
            return Ok(id);
        }
        if self.systems.len() >= self.max_systems {
            return Err(EcsError::CapacityExceeded {
                what: "systems",
                max: self.max_systems,
            });
        }

        let matched = store
            .iter()
            .filter(|(_, archetype)| required.is_subset_of(archetype.schema()))
            .map(|(position, _)| position)
            .collect();

        let id = SystemId::new(self.systems.len() as u32);
        self.by_name.insert(name.into(), id)?;
        self.systems.push(System {
            required,
            func: Some(func),
            matched,
        });
        tracing::debug!(system = name, "registered system");
        Ok(id)
    }

    pub fn id_of(&self, name: &str) -> Option<SystemId> {
        self.by_name.get(name).copied()
    }

    pub fn get_mut(&mut self, id: SystemId) -> Result<&mut System, EcsError> {
        self.systems
            .get_mut(id.index())
            .ok_or(EcsError::InvalidHandle { bits: id.to_bits() })
    }

    /// Append a newly created archetype to every system it satisfies.
    pub fn on_archetype_created(&mut self, position: usize, schema: &Schema) {
        for system in &mut self.systems {
            if system.required.is_subset_of(schema) {
                system.matched.push(position);
            }
        }
    }
}

/// Read/write window over a system's matched archetypes, valid only for
/// the duration of the callback.
///
/// Archetypes are addressed by their position in the match list
/// (`0..archetype_count()`); the callback loops rows itself.
pub struct View<'w> {
    store: &'w mut ArchetypeStore,
    matched: &'w [usize],
}

impl<'w> View<'w> {
    pub(crate) fn new(store: &'w mut ArchetypeStore, matched: &'w [usize]) -> Self {
        Self { store, matched }
    }

    /// Number of matched archetypes.
    pub fn archetype_count(&self) -> usize {
        self.matched.len()
    }

    /// Rows stored in the `at`-th matched archetype.
    pub fn row_count(&self, at: usize) -> usize {
        self.store.get(self.matched[at]).rows()
    }

    /// Entity ids parallel to the component columns.
    pub fn entities(&self, at: usize) -> &[EntityId] {
        self.store.get(self.matched[at]).entity_ids()
    }

    /// Dense component array for one matched archetype, typed.
    pub fn column<T: Pod>(&self, at: usize, component: ComponentId) -> Option<&[T]> {
        let archetype = self.store.get(self.matched[at]);
        let position = archetype.column_position(component)?;
        archetype.column(position).as_slice().ok()
    }

    /// Mutable dense component array for one matched archetype.
    pub fn column_mut<T: Pod>(&mut self, at: usize, component: ComponentId) -> Option<&mut [T]> {
        let archetype = self.store.get_mut(self.matched[at]);
        let position = archetype.column_position(component)?;
        archetype.column_mut(position).as_mut_slice().ok()
    }

    /// Raw bytes of a dense component array.
    pub fn column_bytes(&self, at: usize, component: ComponentId) -> Option<&[u8]> {
        let archetype = self.store.get(self.matched[at]);
        let position = archetype.column_position(component)?;
        Some(archetype.column(position).bytes())
    }
}
