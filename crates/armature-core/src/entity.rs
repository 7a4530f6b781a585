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

//! Defines the core identifier type for entities in the simulation world.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// A unique identifier for an entity in the simulation world.
///
/// Entity ids are strictly positive 64-bit integers handed out by the
/// entity-component manager's monotonic counter. Ids are never reused during
/// the lifetime of one manager, so a stale handle can never alias an entity
/// created later.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Encode,
    Decode,
)]
#[repr(transparent)]
pub struct Entity(u64);

impl Entity {
    /// The null entity, used wherever "no entity" must be representable,
    /// such as the parent of a root entity.
    pub const NULL: Self = Self(0);

    /// Creates an entity handle from a raw id.
    #[inline]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw numeric id.
    #[inline]
    pub const fn id(self) -> u64 {
        self.0
    }

    /// Checks whether this handle is the null entity.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::NULL
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
