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

//! Generic directed graph structure and traversals.

mod directed;

pub use directed::DirectedGraph;

use crate::entity::Entity;

/// The parent/child graph over entities: vertices are entity ids and every
/// edge points from a parent to one of its children.
pub type EntityGraph = DirectedGraph<Entity>;
