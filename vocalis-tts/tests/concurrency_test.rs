//! Concurrency tests for the config store
//! Readers must never observe a half-applied write

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use vocalis_tts::{ConfigPatch, ConfigStore, EngineConfig, ErrorKind};

fn store_with(ids: &[String]) -> Arc<ConfigStore> {
    let store = ConfigStore::new();
    for id in ids {
        store
            .add(id, EngineConfig::new("edge_tts").with_enabled(true))
            .unwrap();
    }
    Arc::new(store)
}

fn ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("cfg-{}", i)).collect()
}

#[test]
fn test_concurrent_patches_on_different_ids() {
    let ids = ids(8);
    let store = store_with(&ids);
    let mut handles = vec![];

    for (i, id) in ids.iter().cloned().enumerate() {
        let store = store.clone();
        handles.push(thread::spawn(move || {
            for step in 1..=25 {
                let ratio = 1.0 + (i as f64) / 10.0 + (step as f64) / 1000.0;
                store
                    .patch(&id, ConfigPatch::new().speed_ratio(ratio).description(format!("step {}", step)))
                    .unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = store.list();
    assert_eq!(snapshot.revision(), 8 + 8 * 25);
    for (i, id) in ids.iter().enumerate() {
        let config = snapshot.get(id).unwrap();
        assert_eq!(config.description.as_deref(), Some("step 25"));
        assert!((config.speed_ratio - (1.0 + (i as f64) / 10.0 + 0.025)).abs() < 1e-9);
    }
}

#[test]
fn test_concurrent_activations_leave_one_active() {
    let ids = ids(10);
    let store = store_with(&ids);
    let mut handles = vec![];

    for id in ids.iter().cloned() {
        let store = store.clone();
        handles.push(thread::spawn(move || store.activate(&id).unwrap()));
    }

    let previous: Vec<Option<String>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let snapshot = store.list();
    let active = snapshot.active_config_id().unwrap().to_string();
    assert!(snapshot.check_invariants().is_ok());

    // each activation saw the one serialized before it, so the final active
    // id is the only one nobody reported as previous
    assert_eq!(previous.iter().filter(|p| p.is_none()).count(), 1);
    let superseded: HashSet<String> = previous.into_iter().flatten().collect();
    assert_eq!(superseded.len(), ids.len() - 1);
    assert!(!superseded.contains(&active));
}

#[test]
fn test_readers_never_see_invalid_state() {
    let ids = ids(6);
    let store = store_with(&ids);
    let done = Arc::new(AtomicBool::new(false));
    let mut readers = vec![];

    for _ in 0..4 {
        let store = store.clone();
        let done = done.clone();
        readers.push(thread::spawn(move || {
            let mut observed = 0usize;
            let mut last_revision = 0u64;
            while !done.load(Ordering::Relaxed) {
                let snapshot = store.list();
                snapshot.check_invariants().unwrap();
                assert!(snapshot.revision() >= last_revision);
                last_revision = snapshot.revision();
                observed += 1;
            }
            observed
        }));
    }

    let writer = {
        let store = store.clone();
        let ids = ids.clone();
        thread::spawn(move || {
            for round in 0..50 {
                let id = &ids[round % ids.len()];
                let _ = store.activate(id);
                let _ = store.patch(id, ConfigPatch::new().enabled(round % 3 != 0));
                if round % 7 == 0 {
                    let _ = store.remove(id);
                    let _ = store.add(id, EngineConfig::new("edge_tts").with_enabled(true));
                }
            }
        })
    };

    writer.join().unwrap();
    done.store(true, Ordering::Relaxed);
    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
}

#[test]
fn test_patch_racing_remove_is_deterministic() {
    for _ in 0..20 {
        let store = store_with(&["target".to_string()]);

        let patcher = {
            let store = store.clone();
            thread::spawn(move || store.patch("target", ConfigPatch::new().description("patched")))
        };
        let remover = {
            let store = store.clone();
            thread::spawn(move || store.remove("target"))
        };

        let patched = patcher.join().unwrap();
        let removed = remover.join().unwrap();

        // remove always succeeds; the patch either ran first or saw NotFound
        let removed = removed.unwrap();
        match patched {
            Ok(_) => assert_eq!(removed.description.as_deref(), Some("patched")),
            Err(e) => {
                assert_eq!(e.kind(), ErrorKind::NotFound);
                assert_eq!(removed.description, None);
            }
        }
        assert!(store.list().is_empty());
    }
}

#[test]
fn test_concurrent_adds_same_id() {
    let store = Arc::new(ConfigStore::new());
    let mut handles = vec![];

    for i in 0..8 {
        let store = store.clone();
        handles.push(thread::spawn(move || {
            store.add(
                "shared",
                EngineConfig::new("edge_tts").with_description(format!("writer {}", i)),
            )
        }));
    }

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| e.kind() == ErrorKind::AlreadyExists));
}
