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

//! # Armature Core
//!
//! Foundational crate containing the identifier types, the serializable
//! component contract, the entity graph structure, and the wire message
//! schema shared across the Armature simulation runtime.

#![warn(missing_docs)]

pub mod component;
pub mod entity;
pub mod graph;
pub mod msgs;
pub mod registry;

pub use component::{Component, ComponentKey, ComponentState, ComponentTypeId};
pub use entity::Entity;
pub use graph::EntityGraph;
pub use registry::ComponentRegistry;
