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

//! Wire message schema for state snapshots and incremental state updates.
//!
//! Two shapes carry the same information. The list form appends entries and
//! is cheapest to build for incremental updates. The keyed form indexes
//! entities and components by id so that receivers can merge repeated
//! updates in constant time per entry.

use std::collections::BTreeMap;

use bincode::{Decode, Encode};

use crate::component::ComponentTypeId;
use crate::entity::Entity;

/// One serialized component attached to an entity.
#[derive(Debug, Clone, Default, PartialEq, Encode, Decode)]
pub struct SerializedComponent {
    /// Stable type id of the payload.
    pub type_id: ComponentTypeId,
    /// Encoded payload value. Empty bytes mean "no data present"; receivers
    /// skip such entries unless `remove` is set.
    pub component: Vec<u8>,
    /// When set, the receiver removes this component instead of updating it.
    pub remove: bool,
}

/// One entity and its serialized components, list form.
#[derive(Debug, Clone, Default, PartialEq, Encode, Decode)]
pub struct SerializedEntity {
    /// The entity id.
    pub id: Entity,
    /// When set, the receiver removes this entity and ignores `components`.
    pub remove: bool,
    /// Serialized components attached to the entity.
    pub components: Vec<SerializedComponent>,
}

/// A full or incremental state snapshot, list form.
#[derive(Debug, Clone, Default, PartialEq, Encode, Decode)]
pub struct SerializedState {
    /// The serialized entities.
    pub entities: Vec<SerializedEntity>,
}

/// One entity and its serialized components, keyed form.
#[derive(Debug, Clone, Default, PartialEq, Encode, Decode)]
pub struct SerializedEntityMap {
    /// The entity id.
    pub id: Entity,
    /// When set, the receiver removes this entity.
    pub remove: bool,
    /// Serialized components, keyed by type id.
    pub components: BTreeMap<ComponentTypeId, SerializedComponent>,
}

/// A full or incremental state snapshot, keyed form.
#[derive(Debug, Clone, Default, PartialEq, Encode, Decode)]
pub struct SerializedStateMap {
    /// The serialized entities, keyed by entity id.
    pub entities: BTreeMap<Entity, SerializedEntityMap>,
    /// When set, component updates applied from this message are recorded as
    /// one-time changes on the receiver; otherwise they are recorded as
    /// periodic changes. Only the apply direction reads this flag.
    pub has_one_time_component_changes: bool,
}
