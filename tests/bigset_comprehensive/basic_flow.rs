//! Add, discard and set algebra end to end

use bigset::{CancelToken, SetStore};
use serde::{Deserialize, Serialize};

use super::{int_store, sorted};

#[test]
fn test_basic_flow() {
    let (store, cancel) = int_store();

    // empty add still creates the set
    assert_eq!(store.add(&cancel, "foo", Vec::<i64>::new()).unwrap(), 0);
    assert!(store.contains(&cancel, "foo").unwrap());

    assert_eq!(store.add(&cancel, "foo", [10]).unwrap(), 1);
    assert_eq!(store.add(&cancel, "foo", [10]).unwrap(), 0);
    assert_eq!(store.add(&cancel, "bar", [10]).unwrap(), 1);
    assert_eq!(store.add(&cancel, "bar", [9, 10, 11, 12, 13]).unwrap(), 4);

    assert_eq!(store.intersection(&cancel, "i", ["foo", "bar"]).unwrap(), 1);
    assert_eq!(store.get(&cancel, "i").unwrap(), vec![10]);

    assert_eq!(store.union(&cancel, "u", ["foo", "bar"]).unwrap(), 5);
    let u = sorted(&store, &cancel, "u");
    assert!(u.contains(&10));
    assert!(u.contains(&13));
    assert!(!u.contains(&23));

    assert_eq!(store.discard(&cancel, "u", [10, 13]).unwrap(), 2);
    assert_eq!(store.discard(&cancel, "u", [10]).unwrap(), 0);

    assert_eq!(store.subtract(&cancel, "u", ["foo", "bar"]).unwrap(), 3);
    assert!(store.get(&cancel, "u").unwrap().is_empty());

    store.close().unwrap();
}

#[test]
fn test_union_merges_into_existing_target() {
    let (store, cancel) = int_store();
    store.add(&cancel, "target", [1, 2]).unwrap();
    store.add(&cancel, "a", [2, 3]).unwrap();
    store.add(&cancel, "b", [3, 4]).unwrap();

    assert_eq!(store.union(&cancel, "target", ["a", "b"]).unwrap(), 2);
    assert_eq!(sorted(&store, &cancel, "target"), vec![1, 2, 3, 4]);
}

#[test]
fn test_intersection_keeps_existing_target_rows() {
    let (store, cancel) = int_store();
    store.add(&cancel, "target", [100]).unwrap();
    store.add(&cancel, "a", [1, 2, 3]).unwrap();
    store.add(&cancel, "b", [2, 3, 4]).unwrap();

    assert_eq!(store.intersection(&cancel, "target", ["a", "b"]).unwrap(), 2);
    assert_eq!(sorted(&store, &cancel, "target"), vec![2, 3, 100]);
}

#[test]
fn test_sources_may_include_target() {
    let (store, cancel) = int_store();
    store.add(&cancel, "a", [1, 2, 3]).unwrap();
    store.add(&cancel, "b", [3, 4]).unwrap();

    assert_eq!(store.union(&cancel, "a", ["a", "b"]).unwrap(), 1);
    assert_eq!(store.intersection(&cancel, "a", ["a", "b"]).unwrap(), 0);
    assert_eq!(store.subtract(&cancel, "a", ["b"]).unwrap(), 2);
    assert_eq!(sorted(&store, &cancel, "a"), vec![1, 2]);
}

#[test]
fn test_lazy_input_ranges() {
    let (store, cancel) = int_store();
    let fives = (0..100).map(|i| i * 5);
    let sevens = (0..100).map(|i| i * 7);
    assert_eq!(store.add(&cancel, "fives", fives).unwrap(), 100);
    assert_eq!(store.add(&cancel, "sevens", sevens).unwrap(), 100);

    // multiples of 35 below 495
    assert_eq!(store.intersection(&cancel, "both", ["fives", "sevens"]).unwrap(), 15);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Person {
    name: String,
    age: u32,
}

fn person(name: &str, age: u32) -> Person {
    Person {
        name: name.to_string(),
        age,
    }
}

#[test]
fn test_people_scenario() {
    let _guard = super::init_test_subscriber();
    let store = SetStore::<Person>::builder()
        .key_fn(|p: &Person| p.name.as_bytes().to_vec())
        .build()
        .unwrap();
    let cancel = CancelToken::new();

    let males = [person("Bob", 40), person("Charlie", 58), person("Charlie", 56)];
    let females = [person("Alice", 33), person("Eve", 29)];
    assert_eq!(store.add(&cancel, "males", &males).unwrap(), 2);
    assert_eq!(store.add(&cancel, "females", &females).unwrap(), 2);

    assert_eq!(store.intersection(&cancel, "both", ["males", "females"]).unwrap(), 0);
    assert_eq!(store.union(&cancel, "everyone", ["males", "females"]).unwrap(), 4);

    // the first Charlie was kept
    let charlie = store
        .retrieve_if_exists(&cancel, "everyone", &person("Charlie", 0))
        .unwrap();
    assert_eq!(charlie, Some(person("Charlie", 58)));

    let leaving = [person("Bob", 0), person("Eve", 0)];
    assert_eq!(store.discard(&cancel, "everyone", &leaving).unwrap(), 2);
    assert_eq!(store.discard(&cancel, "everyone", &leaving).unwrap(), 0);

    let removed = store
        .subtract(&cancel, "everyone", ["males", "androgynous"])
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(store.get(&cancel, "everyone").unwrap(), vec![person("Alice", 33)]);
    assert!(!store.contains(&cancel, "androgynous").unwrap());

    store.close().unwrap();
}
