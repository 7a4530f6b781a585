// Copyright 2025 the Armature Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The entity-component manager facade and its change ledger.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use armature_core::{
    Component, ComponentKey, ComponentRegistry, ComponentState, ComponentTypeId, Entity,
    EntityGraph,
};

use crate::ecm::storage::{AdditionOutcome, ComponentStorage};
use crate::ecm::view::{view_key, View, ViewKey};

/// Entities requested for removal, pending the next processing pass.
#[derive(Debug, Default)]
pub(crate) struct RemoveRequests {
    /// The entities to remove.
    pub(crate) entities: HashSet<Entity>,
    /// When set, every entity is removed and the request set is ignored.
    pub(crate) remove_all: bool,
}

/// The central container for the simulation's entity and component state.
///
/// The manager owns every entity, every component payload, and the
/// parent/child graph over entities. Mutations are recorded in a change
/// ledger (newly created entities, pending removals, one-time and periodic
/// component changes, removed components) that drives both the cached query
/// views and the incremental state messages used for network replication.
///
/// A single orchestrating thread performs mutations. Individual ledger sets
/// are guarded by their own mutexes so that readers, and the worker threads
/// spawned by the keyed state build, can run while the orchestrator is
/// between mutations. The locks protect specific structures, not the manager
/// as a whole.
pub struct EntityComponentManager {
    /// Owns every component payload, keyed by entity and type id.
    pub(crate) storage: ComponentStorage,

    /// Every component type id that has ever been instantiated. The set is
    /// monotone within one manager: removing the last instance of a type
    /// does not un-record it.
    pub(crate) created_comp_types: HashSet<ComponentTypeId>,

    /// The parent/child graph holding all entities.
    pub(crate) entities: EntityGraph,

    /// Components changed through a periodic-rate change, keyed by type.
    pub(crate) periodic_changed_components: HashMap<ComponentTypeId, HashSet<Entity>>,

    /// Components changed through a one-time change, keyed by type.
    pub(crate) one_time_changed_components: HashMap<ComponentTypeId, HashSet<Entity>>,

    /// Entities created since the last clear.
    pub(crate) newly_created_entities: Mutex<HashSet<Entity>>,

    /// Entities requested for removal, plus the remove-all shortcut flag.
    pub(crate) remove_requests: Mutex<RemoveRequests>,

    /// Entities whose components changed but which are neither newly created
    /// nor pending removal. Keeps incremental state from double-reporting.
    pub(crate) modified_components: HashSet<Entity>,

    /// The set of component types present on each entity. Any structural
    /// modification must also set `entity_components_dirty`.
    pub(crate) entity_components: HashMap<Entity, BTreeSet<ComponentTypeId>>,

    /// True when `entity_components` changed structurally since the state
    /// build shards were last computed.
    pub(crate) entity_components_dirty: bool,

    /// Entity batches handed to the worker threads of the keyed state
    /// build. Recomputed only while `entity_components_dirty` is set.
    pub(crate) state_batches: Vec<Vec<Entity>>,

    /// The registry of cached query views, keyed by their canonical type
    /// lists.
    pub(crate) views: Mutex<HashMap<ViewKey, View>>,

    /// Components removed since the last clear, keyed by owning entity.
    pub(crate) removed_components: Mutex<HashMap<Entity, HashSet<ComponentTypeId>>>,

    /// Cache of previously queried descendant sets, keyed by the queried
    /// entity. Flushed on every structural graph change.
    pub(crate) descendant_cache: HashMap<Entity, HashSet<Entity>>,

    /// The last entity id handed out; ids are allocated by incrementing.
    pub(crate) entity_count: u64,

    /// The component factory injected at construction.
    pub(crate) registry: Arc<ComponentRegistry>,

    /// Type ids already reported as unknown while applying state, so each
    /// unknown type warns once per manager.
    pub(crate) printed_comp_types: HashSet<ComponentTypeId>,
}

impl EntityComponentManager {
    /// Creates an empty manager using the given component factory.
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self {
            storage: ComponentStorage::default(),
            created_comp_types: HashSet::new(),
            entities: EntityGraph::new(),
            periodic_changed_components: HashMap::new(),
            one_time_changed_components: HashMap::new(),
            newly_created_entities: Mutex::new(HashSet::new()),
            remove_requests: Mutex::new(RemoveRequests::default()),
            modified_components: HashSet::new(),
            entity_components: HashMap::new(),
            entity_components_dirty: true,
            state_batches: Vec::new(),
            views: Mutex::new(HashMap::new()),
            removed_components: Mutex::new(HashMap::new()),
            descendant_cache: HashMap::new(),
            entity_count: 0,
            registry,
            printed_comp_types: HashSet::new(),
        }
    }

    /// Returns the component factory this manager was built with.
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    // ---------------------------------------------------------------------
    // Entity lifecycle
    // ---------------------------------------------------------------------

    /// Creates a new entity under a freshly allocated id.
    ///
    /// When the id counter would reach the maximum value, allocation is
    /// refused: the maximum id is returned with a warning and no entity is
    /// created.
    pub fn create_entity(&mut self) -> Entity {
        let id = self.entity_count + 1;
        if id == u64::MAX {
            log::warn!("Reached maximum number of entities [{id}]");
            return Entity::new(id);
        }
        self.entity_count = id;

        self.create_entity_with_id(Entity::new(id))
    }

    /// Creates an entity under a caller-chosen id.
    ///
    /// This is the replay path used when applying serialized state, where
    /// the id comes from the wire. Callers are responsible for bumping the
    /// id counter afterwards via
    /// [`set_entity_create_offset`](Self::set_entity_create_offset) so
    /// locally created entities cannot collide.
    pub fn create_entity_with_id(&mut self, entity: Entity) -> Entity {
        self.entities.add_vertex(entity);

        {
            let mut newly_created = self.newly_created_entities.lock().unwrap();
            newly_created.insert(entity);
        }

        self.descendant_cache.clear();

        if !self.storage.add_entity(entity) {
            log::warn!(
                "Attempted to add entity [{entity}] to component storage, but this entity is \
                 already in component storage"
            );
        }

        entity
    }

    /// Checks whether an entity currently exists.
    pub fn has_entity(&self, entity: Entity) -> bool {
        self.entities.contains(entity)
    }

    /// Returns the number of entities.
    pub fn entity_count(&self) -> usize {
        self.entities.vertex_count()
    }

    /// Returns the parent/child graph over all entities.
    pub fn entities(&self) -> &EntityGraph {
        &self.entities
    }

    /// Requests the removal of an entity, and optionally of all its
    /// descendants, at the next processing pass.
    pub fn request_remove_entity(&mut self, entity: Entity, recursive: bool) {
        // Collect the target set first so every view can be told about each
        // of them.
        let mut to_remove = HashSet::new();
        if !recursive {
            to_remove.insert(entity);
        } else {
            insert_entity_recursive(&self.entities, entity, &mut to_remove);
        }

        {
            let mut requests = self.remove_requests.lock().unwrap();
            requests.entities.extend(to_remove.iter().copied());
        }

        let mut views = self.views.lock().unwrap();
        for view in views.values_mut() {
            for &removed in &to_remove {
                view.mark_entity_to_remove(removed);
            }
        }
    }

    /// Requests the removal of every entity at the next processing pass.
    pub fn request_remove_all_entities(&mut self) {
        {
            let mut requests = self.remove_requests.lock().unwrap();
            requests.remove_all = true;
        }
        self.rebuild_views();
    }

    /// Executes the pending removal requests.
    ///
    /// When the remove-all flag is set, the graph, the component index, the
    /// storage, and the view registry are all replaced with fresh empties.
    /// Otherwise each requested entity is removed from the graph, the
    /// storage, the index, and every view.
    pub fn process_remove_entity_requests(&mut self) {
        let mut requests = self.remove_requests.lock().unwrap();
        // Short-cut if erasing all entities.
        if requests.remove_all {
            requests.remove_all = false;
            requests.entities.clear();

            self.entities = EntityGraph::new();
            self.entity_components.clear();
            self.entity_components_dirty = true;
            self.storage = ComponentStorage::default();

            // All views are now invalid.
            self.views.lock().unwrap().clear();
        } else {
            let pending: Vec<Entity> = requests.entities.drain().collect();
            for entity in pending {
                // The entity may have been removed by an earlier request.
                if !self.entities.contains(entity) {
                    continue;
                }

                self.entities.remove_vertex(entity);

                if self.entity_components.remove(&entity).is_some() {
                    self.storage.remove_entity(entity);
                    self.entity_components_dirty = true;
                }

                let mut views = self.views.lock().unwrap();
                for view in views.values_mut() {
                    view.remove_entity(entity);
                }
            }
        }
        drop(requests);

        self.descendant_cache.clear();
    }

    /// Checks whether an entity was created since the last
    /// [`clear_newly_created_entities`](Self::clear_newly_created_entities).
    pub fn is_new_entity(&self, entity: Entity) -> bool {
        let newly_created = self.newly_created_entities.lock().unwrap();
        newly_created.contains(&entity)
    }

    /// Checks whether an entity is pending removal.
    pub fn is_marked_for_removal(&self, entity: Entity) -> bool {
        let requests = self.remove_requests.lock().unwrap();
        requests.remove_all || requests.entities.contains(&entity)
    }

    /// Checks whether any entity was created since the last clear.
    pub fn has_new_entities(&self) -> bool {
        let newly_created = self.newly_created_entities.lock().unwrap();
        !newly_created.is_empty()
    }

    /// Checks whether any entity is pending removal.
    pub fn has_entities_marked_for_removal(&self) -> bool {
        let requests = self.remove_requests.lock().unwrap();
        requests.remove_all || !requests.entities.is_empty()
    }

    /// Forgets which entities are newly created, here and in every view.
    pub fn clear_newly_created_entities(&mut self) {
        {
            let mut newly_created = self.newly_created_entities.lock().unwrap();
            newly_created.clear();
        }

        let mut views = self.views.lock().unwrap();
        for view in views.values_mut() {
            view.reset_new_entity_state();
        }
    }

    /// Sets the entity id counter.
    ///
    /// Used after applying serialized state so that locally created entities
    /// continue above the applied ids. An offset below the current counter
    /// is accepted with a warning, since future allocations may then collide
    /// with existing ids.
    pub fn set_entity_create_offset(&mut self, offset: u64) {
        if offset < self.entity_count {
            log::warn!(
                "Setting an entity offset of [{offset}] is less than the current entity count \
                 of [{}]. Incorrect behavior should be expected",
                self.entity_count
            );
        }
        self.entity_count = offset;
    }

    // ---------------------------------------------------------------------
    // Parent/child graph
    // ---------------------------------------------------------------------

    /// Returns the parent of an entity, or [`Entity::NULL`] for a root.
    pub fn parent_entity(&self, entity: Entity) -> Entity {
        self.entities
            .adjacents_to(entity)
            .next()
            .unwrap_or(Entity::NULL)
    }

    /// Makes `parent` the sole parent of `child`.
    ///
    /// All existing incoming edges of `child` are removed first, keeping the
    /// single-parent invariant. Passing [`Entity::NULL`] as the parent
    /// leaves the child parent-less and succeeds. Otherwise returns whether
    /// the new edge could be created.
    pub fn set_parent_entity(&mut self, child: Entity, parent: Entity) -> bool {
        let parents: Vec<Entity> = self.entities.adjacents_to(child).collect();
        for previous in parents {
            self.entities.remove_edge(previous, child);
        }

        self.descendant_cache.clear();

        if parent.is_null() {
            return true;
        }

        self.entities.add_edge(parent, child)
    }

    /// Returns an entity and all its descendants.
    ///
    /// The result is the breadth-first closure of the parent/child graph
    /// from `entity`, including `entity` itself, and is cached until the
    /// next structural graph change. An unknown entity yields an empty set.
    pub fn descendants(&mut self, entity: Entity) -> HashSet<Entity> {
        if let Some(cached) = self.descendant_cache.get(&entity) {
            return cached.clone();
        }

        let mut descendants = HashSet::new();
        if !self.has_entity(entity) {
            return descendants;
        }

        descendants.extend(self.entities.breadth_first_sort(entity));
        self.descendant_cache.insert(entity, descendants.clone());
        descendants
    }

    // ---------------------------------------------------------------------
    // Components
    // ---------------------------------------------------------------------

    /// Creates a component on an entity, taking the type id from the seed
    /// payload. See [`create_component_by_type`](Self::create_component_by_type).
    pub fn create_component(&mut self, entity: Entity, component: &dyn Component) -> bool {
        self.create_component_by_type(entity, component.type_id(), component)
    }

    /// Creates a component of `type_id` on an entity, initialized from a
    /// seed payload.
    ///
    /// The request is refused when the entity does not exist, or when the
    /// type id is known neither to this manager nor to the factory. The
    /// returned flag reports whether the caller should update the stored
    /// payload externally; it is `false` for a brand-new addition, whose
    /// freshly installed payload must not be overwritten.
    pub fn create_component_by_type(
        &mut self,
        entity: Entity,
        type_id: ComponentTypeId,
        seed: &dyn Component,
    ) -> bool {
        if !self.has_entity(entity) {
            log::error!(
                "Trying to create a component of type [{type_id}] attached to entity \
                 [{entity}], but this entity does not exist. This create component request \
                 will be ignored"
            );
            return false;
        }

        // If this is the first time this component type is being created,
        // the factory must know it.
        if !self.has_component_type(type_id) && !self.registry.has_type(type_id) {
            log::error!(
                "Failed to create component of type [{type_id}] for entity [{entity}]. Type \
                 has not been properly registered"
            );
            return false;
        }

        // Assume the payload needs to be updated externally unless this is a
        // brand new addition.
        let mut update_data = true;

        self.add_modified_component(entity);
        self.entity_components
            .entry(entity)
            .or_default()
            .insert(type_id);
        self.one_time_changed_components
            .entry(type_id)
            .or_default()
            .insert(entity);
        self.entity_components_dirty = true;

        let new_component = self.registry.new_from_seed(seed);

        match self.storage.add_component(entity, new_component) {
            AdditionOutcome::FailedAddition => {
                log::error!(
                    "Attempt to create a component of type [{type_id}] attached to entity \
                     [{entity}] failed"
                );
                return false;
            }
            AdditionOutcome::NewAddition => {
                update_data = false;
                let is_new = self.is_new_entity(entity);
                let mut views = self.views.lock().unwrap();
                for view in views.values_mut() {
                    if self.entity_matches(entity, view.component_types()) {
                        view.mark_entity_to_add(entity, is_new);
                    }
                }
            }
            AdditionOutcome::ReAddition => {
                let is_new = self.is_new_entity(entity);
                let mut views = self.views.lock().unwrap();
                for view in views.values_mut() {
                    view.notify_component_addition(entity, is_new, type_id);
                }
            }
            AdditionOutcome::Modification => {}
        }

        self.created_comp_types.insert(type_id);

        update_data
    }

    /// Removes a component from an entity.
    ///
    /// Returns `false` without further effect when the entity lacks the
    /// component. Otherwise the component leaves the index, the change maps,
    /// the storage, and every view, and its removal is recorded for
    /// incremental state.
    pub fn remove_component(&mut self, entity: Entity, type_id: ComponentTypeId) -> bool {
        if !self.entity_has_component_type(entity, type_id) {
            return false;
        }

        if let Some(types) = self.entity_components.get_mut(&entity) {
            types.remove(&type_id);
        }
        self.entity_components_dirty = true;

        if let Some(entities) = self.one_time_changed_components.get_mut(&type_id) {
            entities.remove(&entity);
            if entities.is_empty() {
                self.one_time_changed_components.remove(&type_id);
            }
        }

        if let Some(entities) = self.periodic_changed_components.get_mut(&type_id) {
            entities.remove(&entity);
            if entities.is_empty() {
                self.periodic_changed_components.remove(&type_id);
            }
        }

        if self.storage.remove_component(entity, type_id).is_some() {
            let mut views = self.views.lock().unwrap();
            for view in views.values_mut() {
                view.notify_component_removal(entity, type_id);
            }
        }

        self.add_modified_component(entity);

        {
            let mut removed = self.removed_components.lock().unwrap();
            removed.entry(entity).or_default().insert(type_id);
        }

        true
    }

    /// Removes the component identified by a key. See
    /// [`remove_component`](Self::remove_component).
    pub fn remove_component_key(&mut self, entity: Entity, key: ComponentKey) -> bool {
        self.remove_component(entity, key.0)
    }

    /// Checks whether an entity carries the component identified by a key.
    pub fn entity_has_component(&self, entity: Entity, key: ComponentKey) -> bool {
        self.entity_has_component_type(entity, key.0)
    }

    /// Checks whether an entity carries a component of the given type.
    pub fn entity_has_component_type(&self, entity: Entity, type_id: ComponentTypeId) -> bool {
        if !self.has_entity(entity) {
            return false;
        }

        self.entity_components
            .get(&entity)
            .is_some_and(|types| types.contains(&type_id))
    }

    /// Checks whether a component type has ever been created on this
    /// manager. The answer stays `true` even after the last instance of the
    /// type is removed.
    pub fn has_component_type(&self, type_id: ComponentTypeId) -> bool {
        self.created_comp_types.contains(&type_id)
    }

    /// Borrows the payload of a component, if present.
    ///
    /// The borrow ends at the next mutating call on the manager.
    pub fn component(&self, entity: Entity, type_id: ComponentTypeId) -> Option<&dyn Component> {
        self.storage.valid_component(entity, type_id)
    }

    /// Mutable variant of [`component`](Self::component).
    pub fn component_mut(
        &mut self,
        entity: Entity,
        type_id: ComponentTypeId,
    ) -> Option<&mut dyn Component> {
        self.storage.valid_component_mut(entity, type_id)
    }

    /// Borrows the payload of a component downcast to its concrete type.
    pub fn component_data<C: Component>(
        &self,
        entity: Entity,
        type_id: ComponentTypeId,
    ) -> Option<&C> {
        self.component(entity, type_id)?.as_any().downcast_ref()
    }

    /// Mutable variant of [`component_data`](Self::component_data).
    pub fn component_data_mut<C: Component>(
        &mut self,
        entity: Entity,
        type_id: ComponentTypeId,
    ) -> Option<&mut C> {
        self.component_mut(entity, type_id)?
            .as_any_mut()
            .downcast_mut()
    }

    /// Returns the component types currently present on an entity.
    pub fn component_types(&self, entity: Entity) -> BTreeSet<ComponentTypeId> {
        self.entity_components
            .get(&entity)
            .cloned()
            .unwrap_or_default()
    }

    // ---------------------------------------------------------------------
    // Change tracking
    // ---------------------------------------------------------------------

    /// Returns the change level recorded for a component.
    ///
    /// A one-time change dominates: when both sets somehow disagree, the
    /// one-time answer wins.
    pub fn component_state(&self, entity: Entity, type_id: ComponentTypeId) -> ComponentState {
        let Some(types) = self.entity_components.get(&entity) else {
            return ComponentState::NoChange;
        };
        if !types.contains(&type_id) {
            return ComponentState::NoChange;
        }

        if self
            .one_time_changed_components
            .get(&type_id)
            .is_some_and(|entities| entities.contains(&entity))
        {
            return ComponentState::OneTimeChange;
        }

        if self
            .periodic_changed_components
            .get(&type_id)
            .is_some_and(|entities| entities.contains(&entity))
        {
            return ComponentState::PeriodicChange;
        }

        ComponentState::NoChange
    }

    /// Records a change level for a component the entity actually carries;
    /// otherwise does nothing.
    ///
    /// Recording a periodic change erases a pending one-time change for the
    /// same component and vice versa; recording
    /// [`ComponentState::NoChange`] erases both.
    pub fn set_changed(&mut self, entity: Entity, type_id: ComponentTypeId, state: ComponentState) {
        let Some(types) = self.entity_components.get(&entity) else {
            return;
        };
        if !types.contains(&type_id) {
            return;
        }

        match state {
            ComponentState::PeriodicChange => {
                self.periodic_changed_components
                    .entry(type_id)
                    .or_default()
                    .insert(entity);
                if let Some(entities) = self.one_time_changed_components.get_mut(&type_id) {
                    entities.remove(&entity);
                }
            }
            ComponentState::OneTimeChange => {
                if let Some(entities) = self.periodic_changed_components.get_mut(&type_id) {
                    entities.remove(&entity);
                }
                self.one_time_changed_components
                    .entry(type_id)
                    .or_default()
                    .insert(entity);
            }
            ComponentState::NoChange => {
                if let Some(entities) = self.periodic_changed_components.get_mut(&type_id) {
                    entities.remove(&entity);
                }
                if let Some(entities) = self.one_time_changed_components.get_mut(&type_id) {
                    entities.remove(&entity);
                }
            }
        }

        self.add_modified_component(entity);
    }

    /// Checks whether any component carries a pending one-time change.
    pub fn has_one_time_component_changes(&self) -> bool {
        !self.one_time_changed_components.is_empty()
    }

    /// Returns the component types with at least one pending periodic
    /// change.
    pub fn component_types_with_periodic_changes(&self) -> HashSet<ComponentTypeId> {
        self.periodic_changed_components.keys().copied().collect()
    }

    /// Clears the periodic, one-time, and modified change records.
    pub fn set_all_components_unchanged(&mut self) {
        self.periodic_changed_components.clear();
        self.one_time_changed_components.clear();
        self.modified_components.clear();
    }

    /// Forgets which components were removed since the last clear.
    pub fn clear_removed_components(&mut self) {
        let mut removed = self.removed_components.lock().unwrap();
        removed.clear();
    }

    /// Records `entity` as having modified components, unless it is newly
    /// created, pending removal, or already recorded.
    pub(crate) fn add_modified_component(&mut self, entity: Entity) {
        {
            let newly_created = self.newly_created_entities.lock().unwrap();
            if newly_created.contains(&entity) {
                return;
            }
        }
        {
            let requests = self.remove_requests.lock().unwrap();
            if requests.entities.contains(&entity) {
                return;
            }
        }
        self.modified_components.insert(entity);
    }

    // ---------------------------------------------------------------------
    // Views
    // ---------------------------------------------------------------------

    /// Checks whether an entity carries every component type in `types`.
    pub fn entity_matches(&self, entity: Entity, types: &BTreeSet<ComponentTypeId>) -> bool {
        let Some(present) = self.entity_components.get(&entity) else {
            return false;
        };

        // The entity cannot match when it has fewer types than requested.
        if types.len() > present.len() {
            return false;
        }

        types.iter().all(|type_id| present.contains(type_id))
    }

    /// Looks up the view registered for the given component types.
    ///
    /// Returns a snapshot clone; the registered view keeps receiving
    /// bookkeeping from subsequent mutations.
    pub fn find_view(&self, types: &[ComponentTypeId]) -> Option<View> {
        let key = view_key(types);
        let views = self.views.lock().unwrap();
        views.get(&key).cloned()
    }

    /// Registers a view for the given component types.
    ///
    /// When a view is already registered under the same canonical key, the
    /// existing view is kept.
    pub fn add_view(&self, types: &[ComponentTypeId], view: View) {
        let key = view_key(types);
        let mut views = self.views.lock().unwrap();
        views.entry(key).or_insert(view);
    }

    /// Returns the entities matching the given component types, maintaining
    /// the backing view.
    ///
    /// The view is created and populated on first use; afterwards only its
    /// pending bookkeeping is folded in, making repeated queries cheap.
    pub fn view_entities(&self, types: &[ComponentTypeId]) -> Vec<Entity> {
        let key = view_key(types);
        let type_set: BTreeSet<ComponentTypeId> = key.iter().copied().collect();

        let mut views = self.views.lock().unwrap();
        let view = views.entry(key.clone()).or_insert_with(|| {
            let mut view = View::new(&key);
            for entity in self.entities.vertices() {
                if self.entity_matches(entity, view.component_types()) {
                    view.mark_entity_to_add(entity, self.is_new_entity(entity));
                    if self.is_marked_for_removal(entity) {
                        view.mark_entity_to_remove(entity);
                    }
                }
            }
            view
        });

        view.update(|entity| self.entity_matches(entity, &type_set));
        view.entities().iter().copied().collect()
    }

    /// Rebuilds every registered view from scratch.
    ///
    /// Each view is reset, then every entity matching its component types is
    /// queued to join with the correct newly-created tag, and entities
    /// pending removal are queued to leave again.
    pub fn rebuild_views(&mut self) {
        let mut views = self.views.lock().unwrap();
        for view in views.values_mut() {
            view.reset();

            for entity in self.entities.vertices() {
                if self.entity_matches(entity, view.component_types()) {
                    view.mark_entity_to_add(entity, self.is_new_entity(entity));

                    if self.is_marked_for_removal(entity) {
                        view.mark_entity_to_remove(entity);
                    }
                }
            }
        }
    }
}

/// Recursively inserts an entity and all its descendants into `set`.
fn insert_entity_recursive(graph: &EntityGraph, entity: Entity, set: &mut HashSet<Entity>) {
    for child in graph.adjacents_from(entity) {
        insert_entity_recursive(graph, child, set);
    }
    set.insert(entity);
}
