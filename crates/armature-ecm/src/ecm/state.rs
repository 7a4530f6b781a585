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

//! State snapshot serialization and application.
//!
//! This is the replication half of the manager: building full or incremental
//! state messages from the change ledger, and applying received messages
//! back onto the population. The keyed full-state build is sharded across
//! worker threads; everything else runs on the calling thread.

use std::collections::{BTreeSet, HashSet};
use std::sync::Mutex;

use armature_core::msgs::{
    SerializedComponent, SerializedEntity, SerializedEntityMap, SerializedState,
    SerializedStateMap,
};
use armature_core::{ComponentState, ComponentTypeId, Entity};

use crate::ecm::manager::EntityComponentManager;

impl EntityComponentManager {
    /// Appends removal entries to a list-form entity message for every
    /// component removed from `entity`, subject to the type filter.
    fn set_removed_component_msgs(
        &self,
        entity: Entity,
        entity_msg: &mut SerializedEntity,
        types: &HashSet<ComponentTypeId>,
    ) {
        let removed = self.removed_components.lock().unwrap();
        let Some(removed_types) = removed.get(&entity) else {
            return;
        };

        let mut removed_types: Vec<ComponentTypeId> = removed_types.iter().copied().collect();
        removed_types.sort_unstable();

        for comp_type in removed_types {
            if !types.is_empty() && !types.contains(&comp_type) {
                continue;
            }

            // Empty payload bytes: a removal entry carries no data.
            entity_msg.components.push(SerializedComponent {
                type_id: comp_type,
                component: Vec::new(),
                remove: true,
            });
        }
    }

    /// Keyed-form variant of
    /// [`set_removed_component_msgs`](Self::set_removed_component_msgs).
    ///
    /// The message need not contain the entity yet: an entity may have
    /// removed components but no changed ones, in which case its entry is
    /// created here.
    fn set_removed_component_msgs_map(
        &self,
        entity: Entity,
        msg: &mut SerializedStateMap,
        types: &HashSet<ComponentTypeId>,
    ) {
        let removed = self.removed_components.lock().unwrap();
        let Some(removed_types) = removed.get(&entity) else {
            return;
        };
        if removed_types.is_empty() {
            return;
        }

        let entity_msg = msg.entities.entry(entity).or_insert_with(|| SerializedEntityMap {
            id: entity,
            ..Default::default()
        });

        for &comp_type in removed_types.iter() {
            if !types.is_empty() && !types.contains(&comp_type) {
                continue;
            }

            entity_msg.components.insert(
                comp_type,
                SerializedComponent {
                    type_id: comp_type,
                    component: Vec::new(),
                    remove: true,
                },
            );
        }
    }

    /// Appends one entity to a list-form state message.
    ///
    /// The entity is marked for removal when a removal request is pending.
    /// With an empty `types` filter every present component is serialized;
    /// otherwise only the listed ones. Removal entries for removed
    /// components are appended last.
    pub fn add_entity_to_message(
        &self,
        msg: &mut SerializedState,
        entity: Entity,
        types: &HashSet<ComponentTypeId>,
    ) {
        let mut entity_msg = SerializedEntity {
            id: entity,
            ..Default::default()
        };

        let Some(present_types) = self.entity_components.get(&entity) else {
            msg.entities.push(entity_msg);
            return;
        };

        {
            let requests = self.remove_requests.lock().unwrap();
            if requests.entities.contains(&entity) {
                entity_msg.remove = true;
            }
        }

        // An empty filter means every component the entity has.
        let types_to_send: BTreeSet<ComponentTypeId> = if types.is_empty() {
            present_types.clone()
        } else {
            types.iter().copied().collect()
        };

        for comp_type in types_to_send {
            if !present_types.contains(&comp_type) {
                continue;
            }
            let Some(component) = self.storage.valid_component(entity, comp_type) else {
                continue;
            };

            let mut comp_msg = SerializedComponent {
                type_id: component.type_id(),
                ..Default::default()
            };
            match component.serialize(&mut comp_msg.component) {
                Ok(()) => entity_msg.components.push(comp_msg),
                Err(err) => log::error!(
                    "Failed to serialize component of type [{comp_type}] on entity \
                     [{entity}]: {err}"
                ),
            }
        }

        self.set_removed_component_msgs(entity, &mut entity_msg, types);

        msg.entities.push(entity_msg);
    }

    /// Upserts one entity into a keyed-form state message.
    ///
    /// With `full` unset, components without a pending one-time or periodic
    /// change are skipped, which is what turns the keyed form into an
    /// incremental update.
    pub fn add_entity_to_message_map(
        &self,
        msg: &mut SerializedStateMap,
        entity: Entity,
        types: &HashSet<ComponentTypeId>,
        full: bool,
    ) {
        let Some(present_types) = self.entity_components.get(&entity) else {
            return;
        };

        {
            let requests = self.remove_requests.lock().unwrap();
            if requests.entities.contains(&entity) {
                let entity_msg = msg.entities.entry(entity).or_insert_with(|| {
                    SerializedEntityMap {
                        id: entity,
                        ..Default::default()
                    }
                });
                entity_msg.remove = true;
            }
        }

        // An empty filter means every component the entity has.
        let types_to_send: BTreeSet<ComponentTypeId> = if types.is_empty() {
            present_types.clone()
        } else {
            types.iter().copied().collect()
        };

        for comp_type in types_to_send {
            if !present_types.contains(&comp_type) {
                continue;
            }
            let Some(component) = self.storage.valid_component(entity, comp_type) else {
                continue;
            };

            // If not sending full state, skip unchanged components.
            if !full {
                let one_time = self
                    .one_time_changed_components
                    .get(&comp_type)
                    .is_some_and(|entities| entities.contains(&entity));
                let periodic = self
                    .periodic_changed_components
                    .get(&comp_type)
                    .is_some_and(|entities| entities.contains(&entity));
                if !one_time && !periodic {
                    continue;
                }
            }

            let entity_msg = msg.entities.entry(entity).or_insert_with(|| {
                SerializedEntityMap {
                    id: entity,
                    ..Default::default()
                }
            });
            let comp_msg = entity_msg
                .components
                .entry(comp_type)
                .or_insert_with(|| SerializedComponent {
                    type_id: component.type_id(),
                    ..Default::default()
                });

            comp_msg.component.clear();
            if let Err(err) = component.serialize(&mut comp_msg.component) {
                log::error!(
                    "Failed to serialize component of type [{comp_type}] on entity \
                     [{entity}]: {err}"
                );
            }
        }

        self.set_removed_component_msgs_map(entity, msg, types);
    }

    /// Builds a list-form message carrying everything that changed since
    /// the ledgers were last cleared: newly created entities, entities
    /// pending removal, and entities with modified components.
    pub fn changed_state(&self) -> SerializedState {
        let mut state = SerializedState::default();
        let no_filter = HashSet::new();

        // New entities.
        let newly_created: Vec<Entity> = {
            let newly_created = self.newly_created_entities.lock().unwrap();
            newly_created.iter().copied().collect()
        };
        for entity in newly_created {
            self.add_entity_to_message(&mut state, entity, &no_filter);
        }

        // Entities being removed.
        let pending_removal: Vec<Entity> = {
            let requests = self.remove_requests.lock().unwrap();
            requests.entities.iter().copied().collect()
        };
        for entity in pending_removal {
            self.add_entity_to_message(&mut state, entity, &no_filter);
        }

        // New, removed, and changed components.
        for &entity in &self.modified_components {
            self.add_entity_to_message(&mut state, entity, &no_filter);
        }

        state
    }

    /// Keyed-form variant of [`changed_state`](Self::changed_state).
    pub fn changed_state_map(&self, state: &mut SerializedStateMap) {
        let no_filter = HashSet::new();

        let newly_created: Vec<Entity> = {
            let newly_created = self.newly_created_entities.lock().unwrap();
            newly_created.iter().copied().collect()
        };
        for entity in newly_created {
            self.add_entity_to_message_map(state, entity, &no_filter, false);
        }

        let pending_removal: Vec<Entity> = {
            let requests = self.remove_requests.lock().unwrap();
            requests.entities.iter().copied().collect()
        };
        for entity in pending_removal {
            self.add_entity_to_message_map(state, entity, &no_filter, false);
        }

        for &entity in &self.modified_components {
            self.add_entity_to_message_map(state, entity, &no_filter, false);
        }
    }

    /// Recomputes the worker batches for the keyed state build.
    ///
    /// The batches are derived from the entity/component index and stay
    /// valid until the index changes structurally, so this only does work
    /// while the dirty flag is set.
    fn calculate_state_thread_load(&mut self) {
        if !self.entity_components_dirty {
            return;
        }

        self.entity_components_dirty = false;
        self.state_batches.clear();

        let num_entities = self.entity_components.len();
        if num_entities == 0 {
            return;
        }

        let max_threads = std::thread::available_parallelism()
            .map(|threads| threads.get())
            .unwrap_or(1);
        let num_threads = num_entities.min(max_threads);
        let per_thread = num_entities.div_ceil(num_threads);

        log::debug!(
            "Updated state thread batches: {num_threads} threads processing around \
             {per_thread} entities each"
        );

        let mut batch = Vec::with_capacity(per_thread);
        for &entity in self.entity_components.keys() {
            batch.push(entity);
            if batch.len() == per_thread {
                self.state_batches.push(std::mem::take(&mut batch));
            }
        }
        if !batch.is_empty() {
            self.state_batches.push(batch);
        }
    }

    /// Builds a list-form snapshot of every entity in the index, subject to
    /// the entity and type filters. Empty filters mean "everything".
    pub fn state(
        &self,
        entities: &HashSet<Entity>,
        types: &HashSet<ComponentTypeId>,
    ) -> SerializedState {
        let mut state = SerializedState::default();
        for &entity in self.entity_components.keys() {
            if !entities.is_empty() && !entities.contains(&entity) {
                continue;
            }
            self.add_entity_to_message(&mut state, entity, types);
        }
        state
    }

    /// Builds a keyed-form snapshot into `state`, subject to the entity and
    /// type filters; `full` selects between a full snapshot and a
    /// changed-components-only one.
    ///
    /// The index is sharded across worker threads. Every worker serializes
    /// its batch into a private message, then merges it entity-by-entity
    /// into `state` under a shared mutex. Entry ordering in the final
    /// message carries no meaning.
    pub fn state_map(
        &mut self,
        state: &mut SerializedStateMap,
        entities: &HashSet<Entity>,
        types: &HashSet<ComponentTypeId>,
        full: bool,
    ) {
        self.calculate_state_thread_load();

        let manager: &EntityComponentManager = self;
        let state_mutex = Mutex::new(state);

        std::thread::scope(|scope| {
            for batch in &manager.state_batches {
                let state_mutex = &state_mutex;
                scope.spawn(move || {
                    let mut thread_map = SerializedStateMap::default();
                    for &entity in batch {
                        if entities.is_empty() || entities.contains(&entity) {
                            manager.add_entity_to_message_map(&mut thread_map, entity, types, full);
                        }
                    }

                    let mut merged = state_mutex.lock().unwrap();
                    for (id, entity_msg) in thread_map.entities {
                        merged.entities.insert(id, entity_msg);
                    }
                });
            }
        });
    }

    /// Applies a list-form state message.
    ///
    /// Entities flagged for removal are requested removed recursively;
    /// missing entities are created under their wire id. Components of
    /// unknown types are skipped with one warning per type. Applied
    /// components are always removed first and re-created from the decoded
    /// payload.
    pub fn set_state(&mut self, state: &SerializedState) {
        for entity_msg in &state.entities {
            let entity = entity_msg.id;

            if entity_msg.remove {
                self.request_remove_entity(entity, true);
                continue;
            }

            if !self.has_entity(entity) {
                self.create_entity_with_id(entity);
            }

            for comp_msg in &entity_msg.components {
                let comp_type = comp_msg.type_id;

                // Types registered in another process, such as third-party
                // components streamed to a viewer, cannot be deserialized
                // here.
                if !self.registry.has_type(comp_type) {
                    if self.printed_comp_types.insert(comp_type) {
                        log::warn!(
                            "Component type [{comp_type}] has not been registered in this \
                             process, so it can't be deserialized"
                        );
                    }
                    continue;
                }

                if comp_msg.remove {
                    self.remove_component(entity, comp_type);
                    continue;
                }

                // No data present.
                if comp_msg.component.is_empty() {
                    continue;
                }

                let Some(mut new_component) = self.registry.new_component(comp_type) else {
                    log::error!("Failed to deserialize component of type [{comp_type}]");
                    continue;
                };
                if let Err(err) = new_component.deserialize(&comp_msg.component) {
                    log::error!(
                        "Failed to deserialize component of type [{comp_type}]: {err}"
                    );
                    continue;
                }

                let type_id = new_component.type_id();

                // TODO(state-apply): update in place instead of the
                // remove-then-create below once the non-updating assignment
                // path is understood.
                self.remove_component(entity, type_id);

                if self.component(entity, type_id).is_none() {
                    self.create_component_by_type(entity, type_id, new_component.as_ref());
                } else {
                    log::error!(
                        "Internal error: component of type [{type_id}] on entity [{entity}] \
                         survived removal while applying state"
                    );
                }
            }
        }
    }

    /// Applies a keyed-form state message.
    ///
    /// Unlike the list form, existing components are decoded in place and
    /// their change level is recorded according to the message's
    /// one-time-changes flag.
    pub fn set_state_map(&mut self, state: &SerializedStateMap) {
        for entity_msg in state.entities.values() {
            let entity = entity_msg.id;

            if entity_msg.remove {
                self.request_remove_entity(entity, true);
                continue;
            }

            if !self.has_entity(entity) {
                self.create_entity_with_id(entity);
            }

            for (&comp_type, comp_msg) in &entity_msg.components {
                if !self.registry.has_type(comp_msg.type_id) {
                    if self.printed_comp_types.insert(comp_msg.type_id) {
                        log::warn!(
                            "Component type [{}] has not been registered in this process, so \
                             it can't be deserialized",
                            comp_msg.type_id
                        );
                    }
                    continue;
                }

                if comp_msg.remove {
                    self.remove_component(entity, comp_type);
                    continue;
                }

                // No data present.
                if comp_msg.component.is_empty() {
                    continue;
                }

                if self.component(entity, comp_type).is_none() {
                    // Create if new.
                    let Some(mut new_component) =
                        self.registry.new_component(comp_msg.type_id)
                    else {
                        log::error!(
                            "Failed to create component of type [{}]",
                            comp_msg.type_id
                        );
                        continue;
                    };
                    if let Err(err) = new_component.deserialize(&comp_msg.component) {
                        log::error!(
                            "Failed to deserialize component of type [{}]: {err}",
                            comp_msg.type_id
                        );
                        continue;
                    }

                    let type_id = new_component.type_id();
                    self.create_component_by_type(entity, type_id, new_component.as_ref());
                } else {
                    // Update the existing payload in place.
                    let changed = if state.has_one_time_component_changes {
                        ComponentState::OneTimeChange
                    } else {
                        ComponentState::PeriodicChange
                    };

                    if let Some(component) = self.component_mut(entity, comp_type) {
                        if let Err(err) = component.deserialize(&comp_msg.component) {
                            log::error!(
                                "Failed to deserialize component of type [{comp_type}]: {err}"
                            );
                            continue;
                        }
                    }

                    self.set_changed(entity, comp_type, changed);
                }
            }
        }
    }
}
