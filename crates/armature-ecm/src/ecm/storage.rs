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

//! Internal component payload storage.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use armature_core::{Component, ComponentTypeId, Entity};

/// Result of attempting to add a component to an entity.
///
/// The distinction between a new addition, a re-addition, and a modification
/// drives view bookkeeping: only the first two can change which entities a
/// view matches, and they notify views through different paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdditionOutcome {
    /// The component type was not previously on the entity.
    NewAddition,
    /// The component type existed on the entity before, was removed, and is
    /// now present again.
    ReAddition,
    /// The payload replaced an existing one; view membership is unchanged.
    Modification,
    /// The storage refused the addition because the entity is unknown.
    FailedAddition,
}

/// Owns every component payload in the manager, keyed by entity and type id.
///
/// Removing a component leaves an empty slot behind rather than erasing the
/// key, so that a later add of the same type reports
/// [`AdditionOutcome::ReAddition`] instead of a first-time addition. Slots
/// are erased for good only when their owning entity is removed.
#[derive(Default)]
pub(crate) struct ComponentStorage {
    /// Payload slots per entity. A `None` slot is a removed component whose
    /// type was present earlier.
    components: HashMap<Entity, HashMap<ComponentTypeId, Option<Box<dyn Component>>>>,
}

impl ComponentStorage {
    /// Registers an entity. Returns `false` if it was already registered.
    pub fn add_entity(&mut self, entity: Entity) -> bool {
        match self.components.entry(entity) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(HashMap::new());
                true
            }
        }
    }

    /// Files a payload under `(entity, payload type)`.
    pub fn add_component(
        &mut self,
        entity: Entity,
        component: Box<dyn Component>,
    ) -> AdditionOutcome {
        let Some(slots) = self.components.get_mut(&entity) else {
            return AdditionOutcome::FailedAddition;
        };

        match slots.entry(component.type_id()) {
            Entry::Vacant(vacant) => {
                vacant.insert(Some(component));
                AdditionOutcome::NewAddition
            }
            Entry::Occupied(mut occupied) => {
                let outcome = if occupied.get().is_none() {
                    AdditionOutcome::ReAddition
                } else {
                    AdditionOutcome::Modification
                };
                occupied.insert(Some(component));
                outcome
            }
        }
    }

    /// Takes the payload out of `(entity, type_id)`, leaving the slot empty.
    ///
    /// Returns the removed payload, or `None` when no payload was present.
    pub fn remove_component(
        &mut self,
        entity: Entity,
        type_id: ComponentTypeId,
    ) -> Option<Box<dyn Component>> {
        self.components.get_mut(&entity)?.get_mut(&type_id)?.take()
    }

    /// Borrows the payload at `(entity, type_id)`, if one is present.
    ///
    /// The borrow is only valid until the next mutating call on the storage.
    pub fn valid_component(
        &self,
        entity: Entity,
        type_id: ComponentTypeId,
    ) -> Option<&dyn Component> {
        self.components.get(&entity)?.get(&type_id)?.as_deref()
    }

    /// Mutable variant of [`Self::valid_component`].
    pub fn valid_component_mut(
        &mut self,
        entity: Entity,
        type_id: ComponentTypeId,
    ) -> Option<&mut dyn Component> {
        self.components
            .get_mut(&entity)?
            .get_mut(&type_id)?
            .as_deref_mut()
    }

    /// Drops every payload slot belonging to `entity`.
    pub fn remove_entity(&mut self, entity: Entity) {
        self.components.remove(&entity);
    }
}
