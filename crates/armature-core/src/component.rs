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

//! Defines the serializable component contract and its identifier types.

use std::any::Any;

use bincode::error::{DecodeError, EncodeError};
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;

/// A stable identifier for a component's static type across the process.
///
/// Type ids are assigned at registration time and must stay stable across
/// processes that exchange serialized state, since wire messages carry them
/// verbatim.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
pub struct ComponentTypeId(u64);

impl ComponentTypeId {
    /// Creates a type id from a raw numeric value.
    #[inline]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw numeric id.
    #[inline]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one component instance: its type and the entity it is
/// attached to.
pub type ComponentKey = (ComponentTypeId, Entity);

/// Change level recorded for a component since the last reset.
///
/// One-time and periodic changes are mutually exclusive per component
/// instance; recording one erases the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentState {
    /// No change has been recorded.
    NoChange,
    /// A change expected to recur at a fixed rate, such as sensor output
    /// refreshed every tick.
    PeriodicChange,
    /// A change that should be reported exactly once until cleared.
    OneTimeChange,
}

/// The contract every component payload must satisfy.
///
/// The entity-component manager owns payloads exclusively and only ever
/// manipulates them through this object-safe interface: it asks for the type
/// id when filing them, clones them when instantiating from a seed value,
/// and runs the byte codec when building or applying state messages.
/// Concrete payload types live outside the state core and are usually
/// declared with [`component_payload!`](crate::component_payload).
pub trait Component: Send + Sync + 'static {
    /// Returns the stable type id of this component.
    fn type_id(&self) -> ComponentTypeId;

    /// Clones the payload behind the trait object.
    fn clone_component(&self) -> Box<dyn Component>;

    /// Appends the encoded payload value to `out`.
    fn serialize(&self, out: &mut Vec<u8>) -> Result<(), EncodeError>;

    /// Replaces the payload value with the one decoded from `bytes`.
    fn deserialize(&mut self, bytes: &[u8]) -> Result<(), DecodeError>;

    /// Upcasts to [`Any`] for downcasting to the concrete payload type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable variant of [`Component::as_any`].
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Compares payload values across trait objects.
    ///
    /// Equality is an optional capability; the default implementation
    /// reports every pair as unequal.
    fn value_eq(&self, _other: &dyn Component) -> bool {
        false
    }
}

/// Declares a concrete component payload type.
///
/// Expands to a newtype over the carried data with a stable `TYPE_ID`
/// inherent constant, a `create` constructor suitable for registration with
/// a [`ComponentRegistry`](crate::registry::ComponentRegistry), and a
/// [`Component`] implementation whose codec encodes the inner value with
/// bincode's standard configuration.
///
/// ```
/// armature_core::component_payload! {
///     /// World pose of an entity, as an xyz translation.
///     pub struct Pose([f64; 3]), id = 11;
/// }
/// ```
#[macro_export]
macro_rules! component_payload {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($data:ty), id = $id:expr;) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name(pub $data);

        impl $name {
            /// Stable type id carried by every instance of this component.
            $vis const TYPE_ID: $crate::component::ComponentTypeId =
                $crate::component::ComponentTypeId::new($id);

            /// Registry constructor producing a default-initialized payload.
            $vis fn create() -> ::std::boxed::Box<dyn $crate::component::Component> {
                ::std::boxed::Box::new(Self(<$data as ::std::default::Default>::default()))
            }
        }

        impl $crate::component::Component for $name {
            fn type_id(&self) -> $crate::component::ComponentTypeId {
                Self::TYPE_ID
            }

            fn clone_component(&self) -> ::std::boxed::Box<dyn $crate::component::Component> {
                ::std::boxed::Box::new(::std::clone::Clone::clone(self))
            }

            fn serialize(
                &self,
                out: &mut ::std::vec::Vec<u8>,
            ) -> ::std::result::Result<(), ::bincode::error::EncodeError> {
                let bytes = ::bincode::encode_to_vec(&self.0, ::bincode::config::standard())?;
                out.extend_from_slice(&bytes);
                ::std::result::Result::Ok(())
            }

            fn deserialize(
                &mut self,
                bytes: &[u8],
            ) -> ::std::result::Result<(), ::bincode::error::DecodeError> {
                let (value, _) =
                    ::bincode::decode_from_slice(bytes, ::bincode::config::standard())?;
                self.0 = value;
                ::std::result::Result::Ok(())
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }

            fn value_eq(&self, other: &dyn $crate::component::Component) -> bool {
                other
                    .as_any()
                    .downcast_ref::<Self>()
                    .map_or(false, |other| other == self)
            }
        }
    };
}
