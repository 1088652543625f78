// archetype.rs - Archetype tables and the archetype store
//
// An archetype stores every entity sharing one schema: one dense column
// per set component plus a parallel column of entity ids. Row r of
// every column belongs to the same entity, and row r of the entity
// column is authoritative for which entity that is.

use tracing::debug;

use crate::column::ByteColumn;
use crate::hash_index::HashIndex;

use super::component::ComponentRegistry;
use super::{ComponentId, EcsError, EntityId, Schema};

pub(crate) struct Archetype {
    schema: Schema,
    /// One column per set component, ascending component order.
    columns: Vec<ByteColumn>,
    /// Component id → position in `columns`.
    column_of: HashIndex<ComponentId, usize>,
    /// Parallel entity-id column.
    entities: ByteColumn,
}

impl Archetype {
    fn new(schema: Schema, registry: &ComponentRegistry) -> Result<Self, EcsError> {
        let count = schema.count_ones();
        let mut columns = Vec::with_capacity(count);
        let mut column_of = HashIndex::new(count);
        for (position, component) in schema.iter_components().enumerate() {
            let size = registry.size_of(component)?;
            columns.push(ByteColumn::new(size));
            column_of.insert(component, position)?;
        }
        Ok(Self {
            schema,
            columns,
            column_of,
            entities: ByteColumn::new(std::mem::size_of::<EntityId>()),
        })
    }

    #[inline]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Rows currently stored (same for every column).
    #[inline]
    pub fn rows(&self) -> usize {
        self.entities.len()
    }

    /// Number of component columns (set bits in the schema).
    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_position(&self, component: ComponentId) -> Option<usize> {
        self.column_of.get(&component).copied()
    }

    pub fn column(&self, position: usize) -> &ByteColumn {
        &self.columns[position]
    }

    pub fn column_mut(&mut self, position: usize) -> &mut ByteColumn {
        &mut self.columns[position]
    }

    pub fn entity_ids(&self) -> &[EntityId] {
        self.entities
            .as_slice::<EntityId>()
            .expect("entity column stores EntityId")
    }

    pub fn push_entity(&mut self, id: EntityId) -> Result<(), EcsError> {
        self.entities.push(bytemuck::bytes_of(&id))?;
        Ok(())
    }

    /// Swap-remove the entity at `row`. Returns the id that was
    /// relocated into `row`, if any, so the caller can patch its record.
    pub fn swap_remove_entity(&mut self, row: usize) -> Result<Option<EntityId>, EcsError> {
        self.entities.swap_remove(row)?;
        if row < self.entities.len() {
            Ok(Some(self.entity_ids()[row]))
        } else {
            Ok(None)
        }
    }
}

/// Lazily created archetypes, addressed by schema.
///
/// Archetypes, once created, live for the world's lifetime, so their
/// positions in `archetypes` are stable and double as handles.
pub(crate) struct ArchetypeStore {
    archetypes: Vec<Archetype>,
    /// Schema → archetype position. Lookups go through the cached
    /// schema hash but always verify the mask words: two schemas
    /// colliding on hash must not alias one archetype.
    by_schema: HashIndex<Schema, usize>,
}

impl ArchetypeStore {
    pub fn new() -> Self {
        Self {
            archetypes: Vec::new(),
            by_schema: HashIndex::new(16),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn get(&self, position: usize) -> &Archetype {
        &self.archetypes[position]
    }

    pub fn get_mut(&mut self, position: usize) -> &mut Archetype {
        &mut self.archetypes[position]
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Archetype)> {
        self.archetypes.iter().enumerate()
    }

    pub fn find(&self, hash: u64, schema: &Schema) -> Option<usize> {
        self.by_schema.get_hashed(hash, schema).copied()
    }

    /// Find or create the archetype for `schema`. Returns its position
    /// and whether it was created by this call.
    pub fn find_or_create(
        &mut self,
        hash: u64,
        schema: &Schema,
        registry: &ComponentRegistry,
    ) -> Result<(usize, bool), EcsError> {
        if let Some(position) = self.find(hash, schema) {
            return Ok((position, false));
        }

        let position = self.archetypes.len();
        self.archetypes.push(Archetype::new(schema.clone(), registry)?);
        self.by_schema.insert_hashed(hash, schema.clone(), position)?;
        debug!(archetype = position, schema = ?schema, "created archetype");
        Ok((position, true))
    }

    /// Mutable access to two distinct archetypes at once, for row
    /// migration between them.
    pub fn pair_mut(&mut self, a: usize, b: usize) -> (&mut Archetype, &mut Archetype) {
        assert_ne!(a, b);
        if a < b {
            let (left, right) = self.archetypes.split_at_mut(b);
            (&mut left[a], &mut right[0])
        } else {
            let (left, right) = self.archetypes.split_at_mut(a);
            (&mut right[0], &mut left[b])
        }
    }
}
