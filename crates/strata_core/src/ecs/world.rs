// world.rs - ECS World: entity lifecycle, structural transitions, system update

use bytemuck::Pod;
use tracing::debug;

use super::archetype::ArchetypeStore;
use super::component::ComponentRegistry;
use super::entity::{EntityTable, Location};
use super::id::MAX_INDEX_SPACE;
use super::system::{SystemFn, SystemRegistry, View};
use super::{ComponentId, EcsError, EntityId, Schema, SystemId};

/// Configured maxima for a world. Each must be nonzero and fit the
/// 24-bit handle index space.
#[derive(Debug, Copy, Clone)]
pub struct WorldLimits {
    pub max_entities: usize,
    pub max_components: usize,
    pub max_systems: usize,
}

/// The main ECS world containing all entities, components, archetypes
/// and systems. Single-threaded; every call runs to completion.
pub struct World {
    limits: WorldLimits,
    mask_words: usize,
    entities: EntityTable,
    components: ComponentRegistry,
    store: ArchetypeStore,
    systems: SystemRegistry,
}

impl World {
    /// Create a world with the given limits.
    pub fn new(limits: WorldLimits) -> Result<Self, EcsError> {
        for (what, value) in [
            ("entities", limits.max_entities),
            ("components", limits.max_components),
            ("systems", limits.max_systems),
        ] {
            if value == 0 || value > MAX_INDEX_SPACE {
                return Err(EcsError::CapacityExceeded {
                    what,
                    max: MAX_INDEX_SPACE,
                });
            }
        }

        debug!(
            max_entities = limits.max_entities,
            max_components = limits.max_components,
            max_systems = limits.max_systems,
            "initializing world"
        );
        Ok(Self {
            limits,
            mask_words: Schema::words_for(limits.max_components),
            entities: EntityTable::new(limits.max_entities),
            components: ComponentRegistry::new(limits.max_components),
            store: ArchetypeStore::new(),
            systems: SystemRegistry::new(limits.max_systems),
        })
    }

    #[inline]
    pub fn limits(&self) -> WorldLimits {
        self.limits
    }

    /// Live entities.
    pub fn entity_count(&self) -> usize {
        self.entities.alive_count()
    }

    /// Archetypes created so far (never shrinks).
    pub fn archetype_count(&self) -> usize {
        self.store.len()
    }

    // -- registration -----------------------------------------------------

    /// Register a component by name and element size. Idempotent by
    /// name: an already-registered name returns its original id.
    pub fn register_component(&mut self, name: &str, size: usize) -> Result<ComponentId, EcsError> {
        self.components.register(name, size)
    }

    /// Id of a previously registered component.
    pub fn component_id(&self, name: &str) -> Option<ComponentId> {
        self.components.id_of(name)
    }

    /// Register a system by name with its required components.
    /// Idempotent by name. The match list is seeded with every existing
    /// archetype whose schema contains the requirement and grows as new
    /// matching archetypes appear.
    pub fn register_system(
        &mut self,
        name: &str,
        func: SystemFn,
        components: &[ComponentId],
    ) -> Result<SystemId, EcsError> {
        let mut required = Schema::empty(self.mask_words);
        for &component in components {
            if !self.components.is_registered(component) {
                return Err(EcsError::InvalidHandle {
                    bits: component.to_bits(),
                });
            }
            required.set(component.index());
        }
        self.systems.register(name, func, required, &self.store)
    }

    /// Id of a previously registered system.
    pub fn system_id(&self, name: &str) -> Option<SystemId> {
        self.systems.id_of(name)
    }

    // -- entity lifecycle -------------------------------------------------

    /// Create an entity. It starts unarchived: alive, but carrying no
    /// components until the first add.
    pub fn create_entity(&mut self) -> Result<EntityId, EcsError> {
        self.entities.create()
    }

    /// Destroy a live entity: its row is removed from wherever it
    /// lives, its generation is bumped and its index queued for reuse.
    pub fn destroy_entity(&mut self, id: EntityId) -> Result<(), EcsError> {
        if !self.entities.is_alive(id) {
            return Err(EcsError::InvalidHandle { bits: id.to_bits() });
        }
        if self.entities.queue_full() {
            return Err(EcsError::CapacityExceeded {
                what: "destroyed-entity queue",
                max: self.limits.max_entities,
            });
        }

        if let Location::Archetype { .. } = self.entities.record(id)?.location {
            self.migrate_to_unarchived(id)?;
        }
        self.entities.take_from_unarchived(id)?;
        self.entities.retire(id)
    }

    /// True while `id` refers to a live entity (index and generation
    /// both current).
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.is_alive(id)
    }

    // -- component access -------------------------------------------------

    /// True iff the entity is alive and every listed component is
    /// present.
    pub fn has_components(&self, id: EntityId, components: &[ComponentId]) -> bool {
        let Ok(record) = self.entities.record(id) else {
            return false;
        };
        let Location::Archetype { archetype, .. } = record.location else {
            return false;
        };
        let schema = self.store.get(archetype).schema();
        components
            .iter()
            .all(|component| self.components.is_registered(*component) && schema.contains(component.index()))
    }

    /// Add components to an entity, migrating its row to the archetype
    /// for the enlarged schema. Already-present components are no-ops.
    pub fn add_components(
        &mut self,
        id: EntityId,
        components: &[ComponentId],
    ) -> Result<(), EcsError> {
        let location = self.entities.record(id)?.location;
        let mut next = self.schema_at(location);
        for &component in components {
            if !self.components.is_registered(component) {
                return Err(EcsError::InvalidHandle {
                    bits: component.to_bits(),
                });
            }
            next.set(component.index());
        }
        self.transition(id, location, next)
    }

    /// Remove components from an entity. Absent components are no-ops;
    /// removing the last component returns the entity to the
    /// unarchived bucket.
    pub fn remove_components(
        &mut self,
        id: EntityId,
        components: &[ComponentId],
    ) -> Result<(), EcsError> {
        let location = self.entities.record(id)?.location;
        if let Location::Unarchived { .. } = location {
            // Nothing to remove.
            return Ok(());
        }
        let mut next = self.schema_at(location);
        for &component in components {
            if !self.components.is_registered(component) {
                return Err(EcsError::InvalidHandle {
                    bits: component.to_bits(),
                });
            }
            next.clear(component.index());
        }
        self.transition(id, location, next)
    }

    /// Write a component's bytes, implicitly adding the component if
    /// absent. The payload must match the registered size exactly.
    pub fn set_component(
        &mut self,
        id: EntityId,
        component: ComponentId,
        bytes: &[u8],
    ) -> Result<(), EcsError> {
        let expected = self.components.size_of(component)?;
        if bytes.len() != expected {
            return Err(EcsError::SizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }

        if !self.has_components(id, &[component]) {
            self.add_components(id, &[component])?;
        }

        let record = self.entities.record(id)?;
        let Location::Archetype { archetype, row } = record.location else {
            return Err(EcsError::InvalidHandle { bits: id.to_bits() });
        };
        let table = self.store.get_mut(archetype);
        let position = table
            .column_position(component)
            .ok_or(EcsError::InvalidHandle {
                bits: component.to_bits(),
            })?;
        table.column_mut(position).get_mut(row)?.copy_from_slice(bytes);
        Ok(())
    }

    /// Typed `set_component`.
    pub fn set<T: Pod>(
        &mut self,
        id: EntityId,
        component: ComponentId,
        value: T,
    ) -> Result<(), EcsError> {
        self.set_component(id, component, bytemuck::bytes_of(&value))
    }

    /// A component's bytes, or `None` when the entity is dead or does
    /// not carry the component.
    pub fn component(&self, id: EntityId, component: ComponentId) -> Option<&[u8]> {
        let record = self.entities.record(id).ok()?;
        let Location::Archetype { archetype, row } = record.location else {
            return None;
        };
        let table = self.store.get(archetype);
        let position = table.column_position(component)?;
        table.column(position).get(row).ok()
    }

    /// Typed read of a component value.
    pub fn get<T: Pod>(&self, id: EntityId, component: ComponentId) -> Option<T> {
        let bytes = self.component(id, component)?;
        if bytes.len() != std::mem::size_of::<T>() {
            return None;
        }
        Some(bytemuck::pod_read_unaligned(bytes))
    }

    // -- systems ----------------------------------------------------------

    /// Run a system's callback once, synchronously, over a view of its
    /// matched archetypes.
    pub fn update_system(&mut self, id: SystemId) -> Result<(), EcsError> {
        let system = self.systems.get_mut(id)?;
        let mut func = system
            .take_func()
            .ok_or(EcsError::InvalidHandle { bits: id.to_bits() })?;
        let matched = system.matched().to_vec();

        let mut view = View::new(&mut self.store, &matched);
        func(&mut view);

        self.systems.get_mut(id)?.put_func(func);
        Ok(())
    }

    // -- transitions ------------------------------------------------------

    fn schema_at(&self, location: Location) -> Schema {
        match location {
            Location::Unarchived { .. } => Schema::empty(self.mask_words),
            Location::Archetype { archetype, .. } => self.store.get(archetype).schema().clone(),
        }
    }

    /// Move an entity to the archetype for `next`, creating it lazily.
    /// Resolving to the current archetype (or to "still unarchived") is
    /// a no-op.
    fn transition(&mut self, id: EntityId, location: Location, next: Schema) -> Result<(), EcsError> {
        match location {
            Location::Unarchived { .. } if next.is_empty() => Ok(()),
            Location::Unarchived { .. } => {
                let to = self.resolve_archetype(next)?;
                self.migrate_from_unarchived(id, to)
            }
            Location::Archetype { archetype, .. } if next.is_empty() => {
                debug_assert!(!self.store.get(archetype).schema().is_empty());
                self.migrate_to_unarchived(id)
            }
            Location::Archetype { archetype, row } => {
                if next == *self.store.get(archetype).schema() {
                    return Ok(());
                }
                let to = self.resolve_archetype(next)?;
                self.migrate(id, archetype, row, to)
            }
        }
    }

    fn resolve_archetype(&mut self, schema: Schema) -> Result<usize, EcsError> {
        let hash = schema.content_hash();
        let (position, created) = self.store.find_or_create(hash, &schema, &self.components)?;
        if created {
            self.systems.on_archetype_created(position, &schema);
        }
        Ok(position)
    }

    /// First components for an unarchived entity: every destination
    /// column gains a zeroed row.
    fn migrate_from_unarchived(&mut self, id: EntityId, to: usize) -> Result<(), EcsError> {
        self.entities.take_from_unarchived(id)?;

        let table = self.store.get_mut(to);
        let to_row = table.rows();
        for position in 0..table.column_count() {
            table.column_mut(position).push_zeroed()?;
        }
        table.push_entity(id)?;

        self.entities.set_archetype_row(id, to, to_row)
    }

    /// Last components removed: drop every column row and return the
    /// entity to the unarchived bucket.
    fn migrate_to_unarchived(&mut self, id: EntityId) -> Result<(), EcsError> {
        let Location::Archetype { archetype, row } = self.entities.record(id)?.location else {
            return Err(EcsError::InvalidHandle { bits: id.to_bits() });
        };

        let table = self.store.get_mut(archetype);
        for position in 0..table.column_count() {
            table.column_mut(position).swap_remove(row)?;
        }
        let moved = table.swap_remove_entity(row)?;
        if let Some(moved_id) = moved {
            self.entities.set_archetype_row(moved_id, archetype, row)?;
        }

        self.entities.place_unarchived(id)
    }

    /// The general archetype-to-archetype move. Affected components
    /// partition into carried (copied across), added (zeroed slot) and
    /// removed (discarded); every source-side removal is a swap-remove,
    /// and the entity displaced into the vacated row gets its record
    /// patched.
    fn migrate(
        &mut self,
        id: EntityId,
        from: usize,
        from_row: usize,
        to: usize,
    ) -> Result<(), EcsError> {
        debug_assert_ne!(from, to);
        let (src, dst) = self.store.pair_mut(from, to);
        let to_row = dst.rows();

        for word in 0..src.schema().words().len() {
            let f = src.schema().words()[word];
            let t = dst.schema().words()[word];

            let mut carried = f & t;
            while carried != 0 {
                let bit = word * 64 + carried.trailing_zeros() as usize;
                carried &= carried - 1;
                let component = ComponentId::new(bit as u32);
                let src_pos = src.column_position(component).expect("bit set in schema");
                let dst_pos = dst.column_position(component).expect("bit set in schema");
                let value = src.column(src_pos).get(from_row)?;
                dst.column_mut(dst_pos).push(value)?;
                src.column_mut(src_pos).swap_remove(from_row)?;
            }

            let mut added = t & !f;
            while added != 0 {
                let bit = word * 64 + added.trailing_zeros() as usize;
                added &= added - 1;
                let component = ComponentId::new(bit as u32);
                let dst_pos = dst.column_position(component).expect("bit set in schema");
                dst.column_mut(dst_pos).push_zeroed()?;
            }

            let mut removed = f & !t;
            while removed != 0 {
                let bit = word * 64 + removed.trailing_zeros() as usize;
                removed &= removed - 1;
                let component = ComponentId::new(bit as u32);
                let src_pos = src.column_position(component).expect("bit set in schema");
                src.column_mut(src_pos).swap_remove(from_row)?;
            }
        }

        dst.push_entity(id)?;
        let moved = src.swap_remove_entity(from_row)?;
        if let Some(moved_id) = moved {
            self.entities.set_archetype_row(moved_id, from, from_row)?;
        }

        self.entities.set_archetype_row(id, to, to_row)
    }
}
