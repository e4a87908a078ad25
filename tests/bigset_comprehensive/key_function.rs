//! Custom identities: dedup, refresh and supersede by key

use bigset::{CancelToken, SetStore};

use super::{book, by_name, Book};

fn book_store() -> SetStore<Book> {
    SetStore::builder().key_fn(by_name).build().unwrap()
}

fn pages(store: &SetStore<Book>, cancel: &CancelToken, name: &str) -> Option<u32> {
    store
        .retrieve_if_exists(cancel, "foo", &book(name, 0))
        .unwrap()
        .map(|b| b.pages)
}

fn shelf() -> Vec<Book> {
    vec![
        book("y", 5),
        book("x", 10),
        book("x", 20),
        book("x", 30),
        book("y", 8),
    ]
}

#[test]
fn test_add_keeps_first_of_each_key() {
    let store = book_store();
    let cancel = CancelToken::new();
    assert_eq!(store.add(&cancel, "foo", shelf()).unwrap(), 2);
    assert_eq!(pages(&store, &cancel, "x"), Some(10));
    assert_eq!(pages(&store, &cancel, "y"), Some(5));
}

#[test]
fn test_refresh_updates_only_present_keys() {
    let store = book_store();
    let cancel = CancelToken::new();
    store.add(&cancel, "foo", shelf()).unwrap();

    let updates = [book("x", 99), book("y", 44), book("z", 20), book("a", 8)];
    assert_eq!(store.refresh(&cancel, "foo", updates).unwrap(), 2);

    assert_eq!(pages(&store, &cancel, "x"), Some(99));
    assert_eq!(pages(&store, &cancel, "y"), Some(44));
    assert_eq!(pages(&store, &cancel, "z"), None);
    assert_eq!(store.cardinality(&cancel, "foo").unwrap(), 2);
}

#[test]
fn test_refresh_on_missing_set_creates_empty_set() {
    let store = book_store();
    let cancel = CancelToken::new();
    assert_eq!(store.refresh(&cancel, "foo", [book("x", 1)]).unwrap(), 0);
    assert!(store.contains(&cancel, "foo").unwrap());
    assert_eq!(store.cardinality(&cancel, "foo").unwrap(), 0);
}

#[test]
fn test_supersede_overwrites_and_inserts() {
    let store = book_store();
    let cancel = CancelToken::new();
    store.add(&cancel, "foo", shelf()).unwrap();
    assert_eq!(pages(&store, &cancel, "x"), Some(10));

    let updates = [book("x", 40), book("y", 12), book("z", 100)];
    assert_eq!(store.supersede(&cancel, "foo", updates).unwrap(), 3);
    assert_eq!(pages(&store, &cancel, "x"), Some(40));
    assert_eq!(pages(&store, &cancel, "z"), Some(100));
    assert_eq!(store.cardinality(&cancel, "foo").unwrap(), 3);
}

#[test]
fn test_supersede_counts_unchanged_writes() {
    let store = book_store();
    let cancel = CancelToken::new();
    store.add(&cancel, "foo", [book("x", 1)]).unwrap();
    assert_eq!(store.supersede(&cancel, "foo", [book("x", 1)]).unwrap(), 1);
    assert_eq!(store.cardinality(&cancel, "foo").unwrap(), 1);
}

#[test]
fn test_last_write_wins_within_one_supersede() {
    let store = book_store();
    let cancel = CancelToken::new();
    assert_eq!(store.supersede(&cancel, "foo", shelf()).unwrap(), 5);
    assert_eq!(pages(&store, &cancel, "x"), Some(30));
    assert_eq!(pages(&store, &cancel, "y"), Some(8));
}

#[test]
fn test_modulo_key_dedups_integers() {
    let store = SetStore::<i64>::builder()
        .key_fn(|i: &i64| (i % 10).to_string().into_bytes())
        .build()
        .unwrap();
    let cancel = CancelToken::new();

    let foo = [703, 2, 3, 11, 12, 13, 21, 22, 23, 31, 32, 33];
    assert_eq!(store.add(&cancel, "foo", foo).unwrap(), 3);
    assert_eq!(store.add(&cancel, "bar", [101, 102, 104]).unwrap(), 3);
    assert_eq!(store.add(&cancel, "baz", [204, 208, 209]).unwrap(), 3);

    assert_eq!(store.union(&cancel, "all", ["foo", "bar", "baz"]).unwrap(), 6);
    assert_eq!(store.intersection(&cancel, "none", ["foo", "bar", "baz"]).unwrap(), 0);
}

#[test]
fn test_union_first_source_wins_by_key() {
    let store = book_store();
    let cancel = CancelToken::new();
    store.add(&cancel, "a", [book("x", 1)]).unwrap();
    store.add(&cancel, "b", [book("x", 2)]).unwrap();

    store.union(&cancel, "ab", ["a", "b"]).unwrap();
    store.union(&cancel, "ba", ["b", "a"]).unwrap();

    let first = |set: &str| {
        store
            .retrieve_if_exists(&cancel, set, &book("x", 0))
            .unwrap()
            .map(|b| b.pages)
    };
    assert_eq!(first("ab"), Some(1));
    assert_eq!(first("ba"), Some(2));
}

#[test]
fn test_discard_by_key() {
    let store = book_store();
    let cancel = CancelToken::new();
    store.add(&cancel, "foo", shelf()).unwrap();
    assert_eq!(store.discard(&cancel, "foo", [book("x", 12345)]).unwrap(), 1);
    assert_eq!(store.cardinality(&cancel, "foo").unwrap(), 1);
}
