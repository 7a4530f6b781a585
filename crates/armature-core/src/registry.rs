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

//! Defines the `ComponentRegistry`, the factory for component payloads.

use std::collections::HashMap;

use crate::component::{Component, ComponentTypeId};

/// Type alias for the payload constructor function pointer.
type CreateFn = fn() -> Box<dyn Component>;

/// Stores the set of type-erased operations for a registered component type.
struct ComponentVTable {
    /// Human-readable name, used in diagnostics.
    name: &'static str,
    /// Creates a new, default-initialized payload of this type.
    create: CreateFn,
}

/// A registry mapping component type ids to constructors and names.
///
/// This is the component factory of the runtime. A registry is built once at
/// startup, populated with every payload type the process knows about, and
/// injected into each entity-component manager at construction. Keeping the
/// registry explicit rather than process-global means a fresh manager starts
/// from a fresh registry state, and test registries stay isolated from each
/// other.
#[derive(Default)]
pub struct ComponentRegistry {
    /// Maps a component's type id to its vtable of operations.
    mapping: HashMap<ComponentTypeId, ComponentVTable>,
}

impl ComponentRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a component type with its name and constructor.
    ///
    /// Re-registering a type id replaces the previous entry with a warning.
    pub fn register(&mut self, type_id: ComponentTypeId, name: &'static str, create: CreateFn) {
        let previous = self.mapping.insert(type_id, ComponentVTable { name, create });
        if let Some(previous) = previous {
            log::warn!(
                "Component type [{type_id}] was already registered as [{}]; replacing with [{name}]",
                previous.name
            );
        }
    }

    /// Checks whether a type id is known to this registry.
    pub fn has_type(&self, type_id: ComponentTypeId) -> bool {
        self.mapping.contains_key(&type_id)
    }

    /// Looks up the registered name for a type id.
    pub fn name(&self, type_id: ComponentTypeId) -> Option<&'static str> {
        self.mapping.get(&type_id).map(|vtable| vtable.name)
    }

    /// Creates a new, default-initialized payload of the given type.
    ///
    /// Returns `None` when the type id has not been registered.
    pub fn new_component(&self, type_id: ComponentTypeId) -> Option<Box<dyn Component>> {
        self.mapping.get(&type_id).map(|vtable| (vtable.create)())
    }

    /// Creates a new payload initialized from a seed value.
    pub fn new_from_seed(&self, seed: &dyn Component) -> Box<dyn Component> {
        seed.clone_component()
    }

    /// Returns an iterator over every registered type id.
    pub fn type_ids(&self) -> impl Iterator<Item = ComponentTypeId> + '_ {
        self.mapping.keys().copied()
    }
}
