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

//! Implements the Armature **Entity-Component Manager (ECM)**.
//!
//! The ECM maintains a dynamically evolving population of entities, each
//! tagged with zero or more typed component payloads, and a parent/child
//! graph over them. Simulation systems query it through cached views, and a
//! change ledger records what happened between ticks so that incremental
//! state can be replicated over the network.
//!
//! The primary entry point is the [`EntityComponentManager`] struct. Its
//! serialization surface lives in the `state` module and produces the wire
//! messages defined in `armature_core::msgs`.

mod manager;
mod state;
mod storage;
mod view;

pub use manager::EntityComponentManager;
pub use storage::AdditionOutcome;
pub use view::{view_key, View, ViewKey};

#[cfg(test)]
mod tests;
