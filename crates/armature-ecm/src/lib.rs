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

//! # Armature ECM
//!
//! The in-memory state core of the Armature simulation runtime: entity
//! lifecycle, component storage, the parent/child graph, cached query views,
//! change tracking, and state snapshot serialization for network
//! replication.

#![warn(missing_docs)]

pub mod ecm;

pub use ecm::{view_key, AdditionOutcome, EntityComponentManager, View, ViewKey};
