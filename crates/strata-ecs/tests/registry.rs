//! End-to-end behavior of the registry: migration, reindexing and views.

use strata_ecs::{ArchetypeId, Entity, Registry};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct P(u32);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Q(u32);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct R(u32);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct S(u32);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct A;

fn assert_consistent(registry: &Registry) {
    for archetype in registry.archetypes().iter() {
        assert!(archetype.is_consistent(), "{archetype:?} has ragged columns");
    }
}

fn sorted(mut entities: Vec<Entity>) -> Vec<Entity> {
    entities.sort_by_key(|e| e.id());
    entities
}

#[test]
fn length_invariant_holds_through_churn() {
    let mut registry = Registry::new();
    let mut live = Vec::new();

    for i in 0..64_u32 {
        let e = registry.create_entity::<()>();
        registry.attach(e, P(i));
        if i % 2 == 0 {
            registry.attach(e, Q(i));
        }
        if i % 3 == 0 {
            registry.attach(e, R(i));
        }
        live.push(e);
        assert_consistent(&registry);
    }

    for (i, &e) in live.iter().enumerate() {
        match i % 4 {
            0 => {
                registry.detach::<(P,)>(e);
            }
            1 => {
                registry.destroy(e);
            }
            2 => {
                registry.attach(e, S(1));
            }
            _ => {
                registry.detach::<(Q, R)>(e);
            }
        }
        assert_consistent(&registry);
    }

    assert_eq!(registry.len(), 48);
}

#[test]
fn attach_detach_round_trips() {
    let mut registry = Registry::new();
    let e = registry.create_entity::<()>();

    registry.attach(e, P(1));
    assert!(registry.detach::<(P,)>(e));
    assert_eq!(registry.archetype_of(e), None);
    assert!(!registry.attached::<P>(e));

    registry.attach(e, P(1));
    registry.attach(e, Q(2));
    assert!(registry.detach::<(P,)>(e));
    assert!(!registry.attached::<P>(e));
    assert_eq!(registry.get::<Q>(e), &Q(2));
}

#[test]
fn migration_preserves_values() {
    let mut registry = Registry::new();
    let e = registry.create_entity::<()>();

    registry.attach(e, 5_i32);
    registry.attach(e, 1.5_f32);
    assert_eq!(registry.get::<i32>(e), &5);
    assert_eq!(registry.get::<f32>(e), &1.5);

    registry.attach(e, String::from("carried"));
    registry.detach::<(i32,)>(e);

    assert_eq!(registry.get::<f32>(e), &1.5);
    assert_eq!(registry.get::<String>(e), "carried");
}

#[test]
fn swap_remove_reindexes_displaced_entity() {
    let mut registry = Registry::new();
    let e1 = registry.spawn((A, P(1)));
    let e2 = registry.spawn((A, P(2)));
    let e3 = registry.spawn((A, P(3)));

    assert!(registry.detach::<(A,)>(e1));

    assert_eq!(registry.get::<P>(e1), &P(1));
    assert_eq!(registry.get::<P>(e2), &P(2));
    assert_eq!(registry.get::<P>(e3), &P(3));
    assert!(registry.attached::<A>(e3));
    assert!(!registry.attached::<A>(e1));
    assert_consistent(&registry);
}

#[test]
fn destroy_from_middle_keeps_others_addressable() {
    let mut registry = Registry::new();
    let entities: Vec<Entity> = (0..5).map(|i| registry.spawn((P(i), Q(i * 10)))).collect();

    assert!(registry.destroy(entities[1]));
    let gone = entities[1];

    for (i, &e) in entities.iter().enumerate() {
        if e == gone {
            assert!(!registry.contains(e));
            assert!(registry.find::<P>(e).is_none());
            assert!(!registry.attached::<P>(e));
        } else {
            assert_eq!(registry.get::<P>(e), &P(i as u32));
            assert_eq!(registry.get::<Q>(e), &Q(i as u32 * 10));
        }
    }
    assert_eq!(registry.len(), 4);

    assert!(!registry.view::<(P,)>().entities().contains(&gone));
    assert!(!registry.view::<(P, Q)>().entities().contains(&gone));
    assert_eq!(registry.view::<(P,)>().count(), 4);

    let mut touched = Vec::new();
    for row in registry.view_mut::<(P,)>().collect() {
        let (entity, (p,)) = row.into_parts();
        p.0 += 100;
        touched.push(entity);
    }
    assert_eq!(touched.len(), 4);
    assert!(!touched.contains(&gone));
    assert_consistent(&registry);
}

#[test]
fn destroying_twice_changes_nothing() {
    let mut registry = Registry::new();
    let entities: Vec<Entity> = (0..6)
        .map(|i| {
            if i % 2 == 0 {
                registry.spawn((P(i), Q(i)))
            } else {
                registry.spawn((P(i),))
            }
        })
        .collect();

    assert!(registry.destroy(entities[2]));
    let snapshot = |registry: &Registry| -> Vec<(Vec<Entity>, Vec<u32>)> {
        registry
            .archetypes()
            .iter()
            .map(|arch| {
                let values = (0..arch.len())
                    .map(|row| arch.get::<P>(row).map_or(u32::MAX, |p| p.0))
                    .collect();
                (arch.entities().to_vec(), values)
            })
            .collect()
    };
    let before = snapshot(&registry);

    assert!(!registry.destroy(entities[2]));

    assert_eq!(snapshot(&registry), before);
    assert_eq!(registry.len(), 5);
}

#[test]
fn views_match_inclusion_and_exclusion() {
    let mut registry = Registry::new();
    let pq = registry.spawn((P(1), Q(1)));
    let ps = registry.spawn((P(2), S(2)));
    let pqr = registry.spawn((P(3), Q(3), R(3)));

    assert_eq!(sorted(registry.view::<(P,)>().entities()), vec![pq, ps, pqr]);
    assert_eq!(sorted(registry.view::<(P, Q)>().entities()), vec![pq, pqr]);
    assert_eq!(registry.view::<(P, Q)>().exclude::<(R,)>().entities(), vec![pq]);
    assert_eq!(registry.view::<(P,)>().exclude::<(Q,)>().entities(), vec![ps]);
    assert_eq!(registry.view::<(Q, S)>().count(), 0);
    assert_eq!(registry.view::<(P,)>().exclude::<(Q, S)>().count(), 0);

    let rows = registry.view::<(R, P)>().collect();
    assert_eq!(rows.len(), 1);
    let (entity, (r, p)) = rows[0].into_parts();
    assert_eq!(entity, pqr);
    assert_eq!((*r, *p), (R(3), P(3)));
}

#[test]
fn empty_archetypes_persist_without_duplicates() {
    let mut registry = Registry::new();
    let e = registry.spawn((P(0),));
    let first: Option<ArchetypeId> = registry.archetype_of(e);

    for i in 0..10 {
        registry.attach(e, Q(i));
        registry.detach::<(Q,)>(e);
    }

    assert_eq!(registry.archetypes().len(), 2);
    assert_eq!(registry.archetype_of(e), first);

    registry.destroy(e);
    assert_eq!(registry.archetypes().len(), 2);
    assert!(registry.archetypes().iter().all(|arch| arch.is_empty()));

    let again = registry.spawn((P(1), Q(1)));
    assert_eq!(registry.archetypes().len(), 2);
    assert_eq!(registry.get::<Q>(again), &Q(1));
}

#[test]
fn handles_are_scoped_to_their_registry() {
    let mut a = Registry::new();
    let mut b = Registry::new();

    let ea = a.create_entity::<(P,)>();
    let eb = b.create_entity::<(P,)>();

    assert_eq!(ea.id(), eb.id());
    assert_ne!(ea, eb);
    assert!(!a.contains(eb));
    assert!(!a.destroy(eb));
    assert!(a.try_attach(eb, Q(0)).is_err());
}

#[test]
fn registry_moves_across_threads() {
    let mut registry = Registry::new();
    let e = registry.spawn((P(7), String::from("sent")));

    let registry = std::thread::spawn(move || {
        registry.attach(e, Q(8));
        registry
    })
    .join()
    .unwrap();

    assert_eq!(registry.get::<P>(e), &P(7));
    assert_eq!(registry.get::<Q>(e), &Q(8));
}
