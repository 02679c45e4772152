//! End-to-end ledger flow: mine a candidate, admit it, persist it, read it
//! back through every access pattern, then age it out of retention.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use tokio::sync::broadcast;

use stela_core::{
    AdmissionError, AdmissionPipeline, ClientIdentity, CommitStore, IdentityScheme,
    RetentionField, RetentionPolicy, RetentionSweeper, StoreError,
};

const DIFFICULTY: u32 = 2;

#[test]
fn mined_commit_flows_from_admission_to_queries() {
    let store = CommitStore::open(":memory:").unwrap();
    let pipeline = AdmissionPipeline::new(DIFFICULTY);
    let author = ClientIdentity::generate();

    let candidate = author
        .create_commit(
            Some(json!({"message": "first entry"})),
            "post",
            None,
            DIFFICULTY,
        )
        .unwrap();
    let root = pipeline.admit(candidate).expect("valid candidate admits");
    store.insert(&root).unwrap();

    // replay of the exact same record is a duplicate, not a re-acceptance
    let replay = store.insert(&root).expect_err("second insert must fail");
    assert!(matches!(replay, StoreError::DuplicateKey(_)));
    assert_eq!(store.count().unwrap(), 1);

    // a reply from a second identity threads under the root
    let replier = ClientIdentity::generate();
    let reply = replier
        .create_commit(
            Some(json!({"message": "welcome", "signature": root.signature.clone()})),
            "post",
            None,
            DIFFICULTY,
        )
        .unwrap();
    let reply = pipeline.admit(reply).unwrap();
    store.insert(&reply).unwrap();

    let children = store.list_by_parent(&root.signature).unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].signature, reply.signature);

    // identity queries resolve the derived address
    let by_author = store
        .list_by_identity(&root.address, 1, 10, IdentityScheme::AddressOnly)
        .unwrap();
    assert_eq!(by_author.len(), 1);
    assert_eq!(by_author[0].public_key, author.public_key_hex);

    let identities = store.distinct_identities().unwrap();
    assert_eq!(identities.len(), 2);
    assert!(identities.contains(&root.address));
    assert!(identities.contains(&reply.address));

    // recency listing sees both, newest first
    let recent = store.list_recent(1, 10).unwrap();
    assert_eq!(recent.len(), 2);
    assert!(recent[0].created_at >= recent[1].created_at);

    let stats = store.stats().unwrap();
    assert_eq!(stats.total_entries, 2);
    assert_eq!(stats.total_identities, 2);
    assert!(stats.oldest_created_at.is_some());
}

#[test]
fn tampering_after_signing_is_rejected() {
    let pipeline = AdmissionPipeline::new(DIFFICULTY);
    let author = ClientIdentity::generate();
    let candidate = author
        .create_commit(Some(json!({"message": "signed"})), "post", None, DIFFICULTY)
        .unwrap();

    let mut tampered = candidate;
    tampered.data = Some(json!({"message": "rewritten"}));
    assert_eq!(
        pipeline.admit(tampered),
        Err(AdmissionError::InvalidSignature)
    );
}

#[tokio::test]
async fn sweeper_prunes_aged_commits_without_touching_fresh_ones() {
    let store = Arc::new(CommitStore::open(":memory:").unwrap());
    let pipeline = AdmissionPipeline::new(DIFFICULTY);
    let author = ClientIdentity::generate();

    let candidate = author
        .create_commit(Some(json!({"message": "stays"})), "post", None, DIFFICULTY)
        .unwrap();
    let fresh = pipeline.admit(candidate).unwrap();
    store.insert(&fresh).unwrap();

    // an admitted commit whose timestamps predate the retention window
    let candidate = author
        .create_commit(Some(json!({"message": "expires"})), "post", None, DIFFICULTY)
        .unwrap();
    let mut stale = pipeline.admit(candidate).unwrap();
    stale.created_at = Utc::now() - Duration::days(400);
    stale.updated_at = stale.created_at;
    store.insert(&stale).unwrap();

    let (shutdown_tx, _) = broadcast::channel(1);
    let sweeper = RetentionSweeper::new(
        store.clone(),
        RetentionPolicy::days(365).on(RetentionField::CreatedAt),
        shutdown_tx.subscribe(),
    );

    assert_eq!(sweeper.sweep_once().unwrap(), 1);
    assert!(store.get_by_signature(&stale.signature).unwrap().is_none());
    assert!(store.get_by_signature(&fresh.signature).unwrap().is_some());
}
