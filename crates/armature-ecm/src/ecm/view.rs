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

//! Cached query views over the entity population.

use std::collections::{BTreeMap, BTreeSet};

use armature_core::{ComponentTypeId, Entity};

/// Canonical registry key for a view: the sorted, deduplicated type ids.
pub type ViewKey = Vec<ComponentTypeId>;

/// Builds the canonical key for a set of component types.
///
/// Sorting and deduplicating makes lookups insensitive to the order the
/// caller lists the types in.
pub fn view_key(types: &[ComponentTypeId]) -> ViewKey {
    let mut key: ViewKey = types.to_vec();
    key.sort_unstable();
    key.dedup();
    key
}

/// A cached query over a fixed set of component types.
///
/// A view materializes the list of entities carrying every one of its
/// component types. Membership is maintained incrementally: mutations on the
/// manager record pending additions and removals here, and
/// [`update`](Self::update) folds them into the membership. Views hold
/// entity ids only, never payload borrows, so they stay valid across storage
/// mutations.
#[derive(Debug, Clone, Default)]
pub struct View {
    /// The component types an entity must carry to match this view.
    component_types: BTreeSet<ComponentTypeId>,
    /// Entities currently matching the view.
    entities: BTreeSet<Entity>,
    /// The subset of matching entities created since the last new-entity
    /// reset.
    new_entities: BTreeSet<Entity>,
    /// Entities waiting to join the view, tagged with whether they are newly
    /// created.
    to_add: BTreeMap<Entity, bool>,
    /// Entities waiting to leave the view.
    to_remove: BTreeSet<Entity>,
}

impl View {
    /// Creates an empty view over the given component types.
    pub fn new(types: &[ComponentTypeId]) -> Self {
        Self {
            component_types: types.iter().copied().collect(),
            ..Default::default()
        }
    }

    /// Returns the component types this view matches on.
    pub fn component_types(&self) -> &BTreeSet<ComponentTypeId> {
        &self.component_types
    }

    /// Returns the entities currently matching the view.
    pub fn entities(&self) -> &BTreeSet<Entity> {
        &self.entities
    }

    /// Returns the matching entities tagged as newly created.
    pub fn new_entities(&self) -> &BTreeSet<Entity> {
        &self.new_entities
    }

    /// Checks whether an entity is currently a member of the view.
    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains(&entity)
    }

    /// Clears all membership and bookkeeping; the component types stay.
    pub fn reset(&mut self) {
        self.entities.clear();
        self.new_entities.clear();
        self.to_add.clear();
        self.to_remove.clear();
    }

    /// Queues an entity to join the view.
    pub fn mark_entity_to_add(&mut self, entity: Entity, is_new: bool) {
        self.to_add.insert(entity, is_new);
    }

    /// Queues an entity to leave the view.
    pub fn mark_entity_to_remove(&mut self, entity: Entity) {
        self.to_remove.insert(entity);
    }

    /// Erases an entity from the view and from all pending bookkeeping.
    pub fn remove_entity(&mut self, entity: Entity) {
        self.entities.remove(&entity);
        self.new_entities.remove(&entity);
        self.to_add.remove(&entity);
        self.to_remove.remove(&entity);
    }

    /// Reports that a component of `type_id` reappeared on `entity`.
    ///
    /// When the type is one of the view's, the entity is queued to rejoin.
    pub fn notify_component_addition(
        &mut self,
        entity: Entity,
        is_new: bool,
        type_id: ComponentTypeId,
    ) {
        if self.component_types.contains(&type_id) {
            self.mark_entity_to_add(entity, is_new);
        }
    }

    /// Reports that a component of `type_id` was removed from `entity`.
    ///
    /// When the type is one of the view's, the entity no longer matches and
    /// leaves the membership immediately.
    pub fn notify_component_removal(&mut self, entity: Entity, type_id: ComponentTypeId) {
        if self.component_types.contains(&type_id) {
            self.entities.remove(&entity);
            self.new_entities.remove(&entity);
            self.to_add.remove(&entity);
        }
    }

    /// Forgets which members are newly created.
    pub fn reset_new_entity_state(&mut self) {
        self.new_entities.clear();
    }

    /// Folds the pending additions and removals into the membership.
    ///
    /// `matches` reports whether an entity currently satisfies the view's
    /// component set; entities that stopped matching while queued are
    /// dropped instead of joining.
    pub fn update(&mut self, mut matches: impl FnMut(Entity) -> bool) {
        let to_add = std::mem::take(&mut self.to_add);
        for (entity, is_new) in to_add {
            if matches(entity) {
                self.entities.insert(entity);
                if is_new {
                    self.new_entities.insert(entity);
                }
            }
        }

        let to_remove = std::mem::take(&mut self.to_remove);
        for entity in to_remove {
            self.entities.remove(&entity);
            self.new_entities.remove(&entity);
        }
    }
}
