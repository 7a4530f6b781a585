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

use std::collections::HashSet;
use std::sync::Arc;

use armature_core::{ComponentRegistry, ComponentState, ComponentTypeId, Entity};

use super::manager::EntityComponentManager;

// --- DUMMY COMPONENTS FOR TESTING ---

armature_core::component_payload! {
    /// World pose of an entity, as an xyz translation.
    struct Pose([f64; 3]), id = 1;
}

armature_core::component_payload! {
    struct LinearVelocity([f64; 3]), id = 2;
}

armature_core::component_payload! {
    struct Label(String), id = 3;
}

fn test_registry() -> Arc<ComponentRegistry> {
    let mut registry = ComponentRegistry::new();
    registry.register(Pose::TYPE_ID, "pose", Pose::create);
    registry.register(LinearVelocity::TYPE_ID, "linear_velocity", LinearVelocity::create);
    registry.register(Label::TYPE_ID, "label", Label::create);
    Arc::new(registry)
}

fn manager() -> EntityComponentManager {
    EntityComponentManager::new(test_registry())
}

// --- TESTS ---

#[test]
fn test_create_and_remove_cycle() {
    // --- 1. SETUP ---
    let mut ecm = manager();

    // --- 2. ACTION ---
    let e1 = ecm.create_entity();
    let e2 = ecm.create_entity();
    let e3 = ecm.create_entity();

    // --- 3. ASSERTIONS ---
    assert_eq!(e1, Entity::new(1), "ids start at 1");
    assert_eq!(e2, Entity::new(2));
    assert_eq!(e3, Entity::new(3));
    assert_eq!(ecm.entity_count(), 3);
    assert!(ecm.has_new_entities());
    assert!(ecm.is_new_entity(e1) && ecm.is_new_entity(e2) && ecm.is_new_entity(e3));

    ecm.clear_newly_created_entities();
    assert!(!ecm.has_new_entities());
    assert!(!ecm.is_new_entity(e2));

    // Requesting a removal does not remove anything yet.
    ecm.request_remove_entity(e2, false);
    assert!(ecm.is_marked_for_removal(e2));
    assert!(ecm.has_entities_marked_for_removal());
    assert!(ecm.has_entity(e2));

    ecm.process_remove_entity_requests();
    assert!(!ecm.has_entity(e2));
    assert_eq!(ecm.entity_count(), 2);
    assert!(!ecm.has_entities_marked_for_removal());
    assert!(!ecm.is_marked_for_removal(e2));
}

#[test]
fn test_parent_graph_and_recursive_removal() {
    // --- 1. SETUP ---
    // e1 is the root, e2 and e4 its children, e3 a child of e2.
    let mut ecm = manager();
    let e1 = ecm.create_entity();
    let e2 = ecm.create_entity();
    let e3 = ecm.create_entity();
    let e4 = ecm.create_entity();

    assert!(ecm.set_parent_entity(e2, e1));
    assert!(ecm.set_parent_entity(e3, e2));
    assert!(ecm.set_parent_entity(e4, e1));

    // --- 2. ASSERTIONS ON THE GRAPH ---
    assert_eq!(ecm.parent_entity(e2), e1);
    assert_eq!(ecm.parent_entity(e3), e2);
    assert_eq!(ecm.parent_entity(e1), Entity::NULL, "roots have no parent");

    let descendants: HashSet<Entity> = ecm.descendants(e1);
    assert_eq!(descendants, HashSet::from([e1, e2, e3, e4]));
    assert_eq!(ecm.descendants(e2), HashSet::from([e2, e3]));

    // Reparenting replaces the previous parent.
    assert!(ecm.set_parent_entity(e3, e1));
    assert_eq!(ecm.parent_entity(e3), e1);
    assert_eq!(ecm.descendants(e2), HashSet::from([e2]));
    assert!(ecm.set_parent_entity(e3, e2));

    // Un-parenting always succeeds.
    assert!(ecm.set_parent_entity(e3, Entity::NULL));
    assert_eq!(ecm.parent_entity(e3), Entity::NULL);
    assert!(ecm.set_parent_entity(e3, e2));

    // --- 3. RECURSIVE REMOVAL ---
    let view_types = [Pose::TYPE_ID];
    ecm.create_component(e2, &Pose([1.0, 0.0, 0.0]));
    assert_eq!(ecm.view_entities(&view_types), vec![e2]);

    ecm.request_remove_entity(e1, true);
    for entity in [e1, e2, e3, e4] {
        assert!(ecm.is_marked_for_removal(entity));
    }

    ecm.process_remove_entity_requests();
    assert_eq!(ecm.entity_count(), 0);

    // The view still exists but holds no entities.
    let view = ecm.find_view(&view_types).expect("view must survive entity removal");
    assert!(view.entities().is_empty());
    assert!(ecm.view_entities(&view_types).is_empty());
}

#[test]
fn test_component_creation_and_update_flag() {
    // --- 1. SETUP ---
    let mut ecm = manager();
    let entity = ecm.create_entity();

    // --- 2. ACTION & ASSERTIONS ---
    // A brand new addition installs the payload; the caller must not
    // overwrite it.
    let update_data = ecm.create_component(entity, &Pose([1.0, 2.0, 3.0]));
    assert!(!update_data);
    assert!(ecm.entity_has_component_type(entity, Pose::TYPE_ID));
    assert!(ecm.has_component_type(Pose::TYPE_ID));
    assert_eq!(
        ecm.component_data::<Pose>(entity, Pose::TYPE_ID),
        Some(&Pose([1.0, 2.0, 3.0]))
    );

    // Creating the same type again is a modification.
    let update_data = ecm.create_component(entity, &Pose([4.0, 5.0, 6.0]));
    assert!(update_data);
    assert_eq!(
        ecm.component_data::<Pose>(entity, Pose::TYPE_ID),
        Some(&Pose([4.0, 5.0, 6.0]))
    );

    // Unknown entities and unregistered types are refused.
    assert!(!ecm.create_component(Entity::new(99), &Pose::default()));
    let bogus = BogusComponent(7);
    assert!(!ecm.create_component(entity, &bogus));
    assert!(!ecm.entity_has_component_type(entity, BogusComponent::TYPE_ID));

    // The index and the storage agree.
    for type_id in [Pose::TYPE_ID, LinearVelocity::TYPE_ID, Label::TYPE_ID] {
        assert_eq!(
            ecm.entity_has_component_type(entity, type_id),
            ecm.component(entity, type_id).is_some()
        );
    }
}

armature_core::component_payload! {
    struct BogusComponent(u32), id = 77;
}

#[test]
fn test_component_change_flags() {
    // --- 1. SETUP ---
    let mut ecm = manager();
    let entity = ecm.create_entity();
    ecm.create_component(entity, &Pose([0.0; 3]));

    // --- 2. ACTION & ASSERTIONS ---
    // Creation records a one-time change.
    assert_eq!(
        ecm.component_state(entity, Pose::TYPE_ID),
        ComponentState::OneTimeChange
    );
    assert!(ecm.has_one_time_component_changes());
    assert!(ecm.component_types_with_periodic_changes().is_empty());

    // Recording a periodic change erases the one-time one.
    ecm.set_changed(entity, Pose::TYPE_ID, ComponentState::PeriodicChange);
    assert_eq!(
        ecm.component_state(entity, Pose::TYPE_ID),
        ComponentState::PeriodicChange
    );
    assert_eq!(
        ecm.component_types_with_periodic_changes(),
        HashSet::from([Pose::TYPE_ID])
    );

    // Flagging a component the entity lacks is a no-op.
    ecm.set_changed(entity, LinearVelocity::TYPE_ID, ComponentState::OneTimeChange);
    assert_eq!(
        ecm.component_state(entity, LinearVelocity::TYPE_ID),
        ComponentState::NoChange
    );

    ecm.set_all_components_unchanged();
    assert_eq!(
        ecm.component_state(entity, Pose::TYPE_ID),
        ComponentState::NoChange
    );
    assert!(!ecm.has_one_time_component_changes());
}

#[test]
fn test_removed_component_ledger() {
    // --- 1. SETUP ---
    let mut ecm = manager();
    let entity = ecm.create_entity();
    ecm.create_component(entity, &Pose([1.0, 1.0, 1.0]));
    ecm.clear_newly_created_entities();
    ecm.set_all_components_unchanged();

    // --- 2. ACTION ---
    assert!(ecm.remove_component(entity, Pose::TYPE_ID));

    // --- 3. ASSERTIONS ---
    assert!(!ecm.entity_has_component_type(entity, Pose::TYPE_ID));
    assert!(ecm.component(entity, Pose::TYPE_ID).is_none());
    // Removing again reports the absence.
    assert!(!ecm.remove_component(entity, Pose::TYPE_ID));

    // The incremental state carries the removal entry: empty payload,
    // remove flag set.
    let changed = ecm.changed_state();
    let entity_msg = changed
        .entities
        .iter()
        .find(|msg| msg.id == entity)
        .expect("the entity must appear in the changed state");
    let comp_msg = entity_msg
        .components
        .iter()
        .find(|msg| msg.type_id == Pose::TYPE_ID)
        .expect("the removed component must appear");
    assert!(comp_msg.remove);
    assert!(comp_msg.component.is_empty());

    ecm.clear_removed_components();
    let changed = ecm.changed_state();
    let entity_msg = changed.entities.iter().find(|msg| msg.id == entity).unwrap();
    assert!(
        entity_msg.components.is_empty(),
        "cleared removals must not be re-reported"
    );
}

#[test]
fn test_component_removal_key_variants() {
    let mut ecm = manager();
    let entity = ecm.create_entity();
    ecm.create_component(entity, &Label("lidar".to_string()));

    let key = (Label::TYPE_ID, entity);
    assert!(ecm.entity_has_component(entity, key));
    assert!(ecm.remove_component_key(entity, key));
    assert!(!ecm.entity_has_component(entity, key));
}

#[test]
fn test_views_follow_component_lifecycle() {
    // --- 1. SETUP ---
    let mut ecm = manager();
    let moving = ecm.create_entity();
    let stationary = ecm.create_entity();
    ecm.create_component(moving, &Pose([0.0; 3]));
    ecm.create_component(moving, &LinearVelocity([1.0, 0.0, 0.0]));
    ecm.create_component(stationary, &Pose([0.0; 3]));

    let moving_types = [Pose::TYPE_ID, LinearVelocity::TYPE_ID];

    // --- 2. ACTION & ASSERTIONS ---
    assert_eq!(ecm.view_entities(&moving_types), vec![moving]);
    // Key order must not matter.
    assert_eq!(
        ecm.view_entities(&[LinearVelocity::TYPE_ID, Pose::TYPE_ID]),
        vec![moving]
    );

    // New members are tagged until the newly-created state is reset.
    let view = ecm.find_view(&moving_types).unwrap();
    assert!(view.new_entities().contains(&moving));
    ecm.clear_newly_created_entities();
    let view = ecm.find_view(&moving_types).unwrap();
    assert!(view.new_entities().is_empty());

    // Removing a matched component evicts the entity.
    ecm.remove_component(moving, LinearVelocity::TYPE_ID);
    assert!(ecm.view_entities(&moving_types).is_empty());

    // Re-adding it brings the entity back.
    ecm.create_component(moving, &LinearVelocity([2.0, 0.0, 0.0]));
    assert_eq!(ecm.view_entities(&moving_types), vec![moving]);

    // A newly matching entity joins on creation of the missing component.
    ecm.create_component(stationary, &LinearVelocity([0.0, 1.0, 0.0]));
    assert_eq!(ecm.view_entities(&moving_types), vec![moving, stationary]);
}

#[test]
fn test_remove_all_entities_resets_everything() {
    // --- 1. SETUP ---
    let mut ecm = manager();
    let entity = ecm.create_entity();
    ecm.create_component(entity, &Pose([0.0; 3]));
    let _ = ecm.view_entities(&[Pose::TYPE_ID]);

    // --- 2. ACTION ---
    ecm.request_remove_all_entities();
    assert!(ecm.is_marked_for_removal(entity), "remove-all marks everyone");
    ecm.process_remove_entity_requests();

    // --- 3. ASSERTIONS ---
    assert_eq!(ecm.entity_count(), 0);
    assert!(!ecm.has_entity(entity));
    assert!(
        ecm.find_view(&[Pose::TYPE_ID]).is_none(),
        "all views are invalid after a full wipe"
    );

    // The type history and the id counter survive the wipe.
    assert!(ecm.has_component_type(Pose::TYPE_ID));
    let next = ecm.create_entity();
    assert_eq!(next, Entity::new(2));
}

#[test]
fn test_modified_components_skip_new_and_removed_entities() {
    // --- 1. SETUP ---
    let mut ecm = manager();
    let tracked = ecm.create_entity();
    let fresh = ecm.create_entity();
    ecm.create_component(tracked, &Pose([0.0; 3]));
    ecm.create_component(fresh, &Pose([0.0; 3]));
    ecm.clear_newly_created_entities();
    ecm.set_all_components_unchanged();
    ecm.clear_removed_components();

    // fresh now plays the role of a just-created entity again.
    let newcomer = ecm.create_entity();
    ecm.create_component(newcomer, &Pose([0.0; 3]));

    ecm.set_changed(tracked, Pose::TYPE_ID, ComponentState::PeriodicChange);

    // --- 2. ASSERTIONS ---
    // The changed state reports the newcomer once (as a new entity) and the
    // tracked entity once (as modified).
    let changed = ecm.changed_state();
    let reported: Vec<Entity> = changed.entities.iter().map(|msg| msg.id).collect();
    assert_eq!(
        reported.iter().filter(|id| **id == newcomer).count(),
        1,
        "a newly created entity must not be double-reported as modified"
    );
    assert!(reported.contains(&tracked));
    assert!(!reported.contains(&fresh), "unchanged entities stay out");
}

#[test]
fn test_entity_id_counter_offset_and_overflow() {
    // --- 1. SETUP ---
    let mut ecm = manager();
    let e1 = ecm.create_entity();
    assert_eq!(e1, Entity::new(1));

    // --- 2. OFFSET ---
    ecm.set_entity_create_offset(100);
    assert_eq!(ecm.create_entity(), Entity::new(101));

    // An offset below the counter is accepted (with a warning) and takes
    // effect regardless.
    ecm.set_entity_create_offset(10);
    assert_eq!(ecm.create_entity(), Entity::new(11));

    // --- 3. OVERFLOW ---
    ecm.set_entity_create_offset(u64::MAX - 1);
    let refused = ecm.create_entity();
    assert_eq!(refused, Entity::new(u64::MAX));
    assert!(!ecm.has_entity(refused), "the sentinel id is never created");
    let refused_again = ecm.create_entity();
    assert_eq!(refused_again, Entity::new(u64::MAX));
}

#[test]
fn test_entity_matches() {
    let mut ecm = manager();
    let entity = ecm.create_entity();
    ecm.create_component(entity, &Pose([0.0; 3]));
    ecm.create_component(entity, &Label("imu".to_string()));

    let pose_only = [Pose::TYPE_ID].into_iter().collect();
    let pose_and_label = [Pose::TYPE_ID, Label::TYPE_ID].into_iter().collect();
    let with_velocity = [Pose::TYPE_ID, LinearVelocity::TYPE_ID].into_iter().collect();

    assert!(ecm.entity_matches(entity, &pose_only));
    assert!(ecm.entity_matches(entity, &pose_and_label));
    assert!(!ecm.entity_matches(entity, &with_velocity));
    assert!(!ecm.entity_matches(Entity::new(42), &pose_only));

    assert_eq!(
        ecm.component_types(entity),
        [Pose::TYPE_ID, Label::TYPE_ID].into_iter().collect()
    );
}

#[test]
fn test_state_batches_follow_the_dirty_flag() {
    // --- 1. SETUP ---
    let mut ecm = manager();
    for _ in 0..8 {
        let entity = ecm.create_entity();
        ecm.create_component(entity, &Pose([0.0; 3]));
    }

    // --- 2. ACTION ---
    let mut first = Default::default();
    ecm.state_map(&mut first, &HashSet::new(), &HashSet::new(), true);
    assert!(!ecm.entity_components_dirty, "the build consumes the dirty flag");
    let batches_before: Vec<Vec<Entity>> = ecm.state_batches.clone();

    // A structural change re-arms the flag; an unchanged index does not.
    let mut second = Default::default();
    ecm.state_map(&mut second, &HashSet::new(), &HashSet::new(), true);
    assert_eq!(ecm.state_batches, batches_before);

    let entity = ecm.create_entity();
    ecm.create_component(entity, &Pose([0.0; 3]));
    assert!(ecm.entity_components_dirty);

    // --- 3. ASSERTIONS ---
    let mut third = Default::default();
    ecm.state_map(&mut third, &HashSet::new(), &HashSet::new(), true);
    assert_eq!(third.entities.len(), 9);
    let batch_total: usize = ecm.state_batches.iter().map(Vec::len).sum();
    assert_eq!(batch_total, 9, "every indexed entity lands in exactly one batch");
}

#[test]
fn test_component_type_id_stability_in_messages() {
    let mut ecm = manager();
    let entity = ecm.create_entity();
    ecm.create_component(entity, &Label("arm".to_string()));

    let state = ecm.state(&HashSet::new(), &HashSet::new());
    let entity_msg = state.entities.iter().find(|msg| msg.id == entity).unwrap();
    assert_eq!(entity_msg.components.len(), 1);
    assert_eq!(entity_msg.components[0].type_id, ComponentTypeId::new(3));
    assert!(!entity_msg.components[0].component.is_empty());
}
