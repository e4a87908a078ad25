//! Shared stores across threads

use std::sync::Arc;
use std::thread;

use bigset::{CancelToken, SetStore};

#[test]
fn test_concurrent_writers_to_one_set() {
    let store = Arc::new(SetStore::<i64>::ephemeral().unwrap());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let cancel = CancelToken::new();
                let mut inserted = 0;
                for i in 0..100 {
                    // every thread also adds the shared multiples of ten
                    let value = if i % 10 == 0 { i } else { t * 1000 + i };
                    inserted += store.add(&cancel, "shared", [value]).unwrap();
                }
                inserted
            })
        })
        .collect();

    let total: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    let cancel = CancelToken::new();
    let cardinality = store.cardinality(&cancel, "shared").unwrap();
    assert_eq!(total, cardinality);
    assert_eq!(cardinality, 4 * 90 + 10);
}

#[test]
fn test_readers_alongside_algebra() {
    let store = Arc::new(SetStore::<i64>::ephemeral().unwrap());
    let cancel = CancelToken::new();
    store.add(&cancel, "base", 0..500).unwrap();

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            let cancel = CancelToken::new();
            for round in 0..20 {
                let name = format!("copy {round}");
                assert_eq!(store.union(&cancel, &name, ["base"]).unwrap(), 500);
            }
        })
    };
    let reader = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            let cancel = CancelToken::new();
            for _ in 0..20 {
                assert_eq!(store.get(&cancel, "base").unwrap().len(), 500);
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
    assert_eq!(store.cardinality(&cancel, "copy 19").unwrap(), 500);
}
