//! CredentialStore properties against the TEST_BACKEND backend.

use std::collections::BTreeSet;

use castgate::user::generate_stream_key;

use crate::helpers::{test_hasher, test_store, test_store_with_alice};

#[tokio::test]
async fn test_hash_round_trip() {
    let hasher = test_hasher();
    for secret in ["", "lol123", "correct horse battery staple", "ünïcødé"] {
        let digest = hasher.hash(secret).unwrap();
        assert!(hasher.verify(secret, &digest).unwrap());
        assert!(!hasher.verify(&format!("{secret}x"), &digest).unwrap());
    }
}

#[tokio::test]
async fn test_uniqueness() {
    let store = test_store_with_alice().await;

    let err = store.create("alice", "other", "other").await.unwrap_err();
    assert!(err.is_duplicate_username());
    assert_eq!(store.len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_secret_independence() {
    let store = test_store_with_alice().await;
    let hasher = store.hasher().clone();

    store
        .change_password("alice", "password123", "new-password")
        .await
        .unwrap();
    let alice = store.get("alice").await.unwrap();
    assert!(alice.verify_stream_key(&hasher, "lol123").await.unwrap());

    store.change_stream_key("alice", "new-key").await.unwrap();
    let alice = store.get("alice").await.unwrap();
    assert!(alice.verify_password(&hasher, "new-password").await.unwrap());
}

#[tokio::test]
async fn test_rotation_guard() {
    let store = test_store_with_alice().await;
    let hasher = store.hasher().clone();

    let err = store
        .change_password("alice", "wrong", "new")
        .await
        .unwrap_err();
    assert!(err.is_authentication_error());
    let alice = store.get("alice").await.unwrap();
    assert!(alice.verify_password(&hasher, "password123").await.unwrap());

    store
        .change_password("alice", "password123", "new")
        .await
        .unwrap();
    let alice = store.get("alice").await.unwrap();
    assert!(!alice.verify_password(&hasher, "password123").await.unwrap());
    assert!(alice.verify_password(&hasher, "new").await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_with_distinct_names() {
    let store = test_store().await;
    let n = 20;

    let tasks: Vec<_> = (0..n)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .create(&format!("user-{i}"), "pw", &generate_stream_key())
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let names: BTreeSet<String> = store
        .list()
        .await
        .unwrap()
        .iter()
        .map(|u| u.username().to_string())
        .collect();
    assert_eq!(names.len(), n);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_with_same_name() {
    let store = test_store().await;
    let n = 20;

    let tasks: Vec<_> = (0..n)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.create("alice", "pw", &generate_stream_key()).await })
        })
        .collect();

    let mut ok = 0;
    let mut duplicate = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => ok += 1,
            Err(e) if e.is_duplicate_username() => duplicate += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(duplicate, n - 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reads_run_alongside_writes() {
    let store = test_store_with_alice().await;

    let writer = {
        let store = store.clone();
        tokio::spawn(async move {
            for i in 0..10 {
                store
                    .create(&format!("user-{i}"), "pw", &format!("key-{i}"))
                    .await
                    .unwrap();
            }
        })
    };

    // Every snapshot still holds the committed user
    for _ in 0..10 {
        let users = store.list().await.unwrap();
        assert!(users.iter().any(|u| u.username() == "alice"));
    }
    writer.await.unwrap();
    assert_eq!(store.len().await.unwrap(), 11);
}

#[tokio::test]
async fn test_reverse_lookup_hides_existence() {
    let store = test_store_with_alice().await;

    assert_eq!(
        store.verify_stream_key_owner("lol123").await.unwrap(),
        Some("alice".to_string())
    );
    // Unknown key, wrong case and the password all look the same
    for key in ["never-issued", "LOL123", "password123"] {
        assert_eq!(store.verify_stream_key_owner(key).await.unwrap(), None);
    }
}

#[tokio::test]
async fn test_remove_is_immediate() {
    let store = test_store_with_alice().await;
    store.remove("alice").await.unwrap();

    assert!(store.get("alice").await.unwrap_err().is_not_found());
    assert_eq!(store.verify_stream_key_owner("lol123").await.unwrap(), None);
    // The name is free again
    store.create("alice", "pw", "key").await.unwrap();
}
