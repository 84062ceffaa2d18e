//! Integration tests for the KifuDb facade
//!
//! These tests verify the public contract end to end over MemoryStore:
//! - Post/get version agreement and optimistic locking
//! - Step ordering and range reads
//! - Replacement and delete cleanup, including position rows
//! - Batch get, listing, recency and duplicate lookup

mod common;

use std::ops::ControlFlow;

use kifudb_core::key::{
    kifu_key, position_key, position_partition, signature_partition, step_key, step_partition,
};
use kifudb_core::{Error, Kifu, Version};
use kifudb_engine::{KifuDb, KifuDbConfig, CONFIG_FILE_NAME};
use kifudb_storage::{KvStore, MemoryStore, MemoryStoreConfig};
use tokio_util::sync::CancellationToken;

use common::*;

fn cancel() -> CancellationToken {
    CancellationToken::new()
}

// ============================================================================
// Post and Get
// ============================================================================

mod post_and_get {
    use super::*;

    #[tokio::test]
    async fn test_post_then_get_returns_same_version() {
        let (db, _) = setup();
        let (kifu, steps) = linear_record("alice", "k1", 4);

        let version = db.post(kifu.clone(), steps, None, &cancel()).await.unwrap();
        assert_eq!(version, Version::INITIAL);

        let header = db.get("alice", "k1", &cancel()).await.unwrap();
        assert_eq!(header.version, version);
        assert_eq!(header.value, kifu);

        let (header, steps) = db.get_kifu_and_steps("alice", "k1", &cancel()).await.unwrap();
        assert_eq!(header.version, version);
        assert_eq!(steps.len(), 4);
        assert!(steps.iter().all(|s| s.version == version));
    }

    #[tokio::test]
    async fn test_create_twice_is_lock_error() {
        let (db, _) = setup();
        let (kifu, steps) = linear_record("alice", "k1", 2);
        db.post(kifu.clone(), steps.clone(), None, &cancel()).await.unwrap();

        let err = db.post(kifu, steps, None, &cancel()).await.unwrap_err();
        assert_eq!(
            err,
            Error::Lock {
                expected: None,
                actual: Some(1)
            }
        );
    }

    #[tokio::test]
    async fn test_stale_post_is_lock_error_and_row_unchanged() {
        let (db, store) = setup();
        let (kifu, steps) = linear_record("alice", "k1", 3);
        let v1 = db.post(kifu.clone(), steps.clone(), None, &cancel()).await.unwrap();

        let updated = Kifu {
            note: "second".to_string(),
            ..kifu.clone()
        };
        let v2 = db
            .post(updated.clone(), steps.clone(), Some(v1), &cancel())
            .await
            .unwrap();
        assert_eq!(v2, Version::new(2));

        let stale = Kifu {
            note: "stale".to_string(),
            ..kifu
        };
        let rows_before = store.len();
        let err = db.post(stale, steps, Some(v1), &cancel()).await.unwrap_err();
        assert!(matches!(err, Error::Lock { .. }));
        assert!(err.is_caller_error());
        assert_eq!(store.len(), rows_before);

        let header = db.get("alice", "k1", &cancel()).await.unwrap();
        assert_eq!(header.version, v2);
        assert_eq!(header.value.note, "second");
    }

    #[tokio::test]
    async fn test_update_of_missing_record_is_lock_error() {
        let (db, store) = setup();
        let (kifu, steps) = linear_record("alice", "k1", 2);
        let err = db
            .post(kifu, steps, Some(Version::INITIAL), &cancel())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            Error::Lock {
                expected: Some(1),
                actual: None
            }
        );
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_steps_come_back_in_seq_order() {
        let (db, _) = setup();
        let (kifu, mut steps) = linear_record("alice", "k1", 12);
        steps.reverse();
        db.post(kifu, steps, None, &cancel()).await.unwrap();

        let steps = db.get_steps("alice", "k1", None, &cancel()).await.unwrap();
        let seqs: Vec<u32> = steps.iter().map(|s| s.value.seq).collect();
        assert_eq!(seqs, (0..12).collect::<Vec<_>>());
        assert_eq!(steps[5].value.sfen_move, "m5");

        let window = db.get_steps("alice", "k1", Some(10..=20), &cancel()).await.unwrap();
        assert_eq!(window.iter().map(|s| s.value.seq).collect::<Vec<_>>(), vec![10, 11]);
    }

    #[tokio::test]
    async fn test_record_without_steps() {
        let (db, store) = setup();
        let kifu = Kifu::new("alice", "empty");
        db.post(kifu, Vec::new(), None, &cancel()).await.unwrap();

        // Header only: no signature without sfen
        assert_eq!(store.len(), 1);
        let (_, steps) = db.get_kifu_and_steps("alice", "empty", &cancel()).await.unwrap();
        assert!(steps.is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (db, _) = setup();
        let err = db.get("alice", "nope", &cancel()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = db.get_kifu_and_steps("alice", "nope", &cancel()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_invalid_ids_are_rejected() {
        let (db, store) = setup();
        assert!(matches!(
            db.get("", "k1", &cancel()).await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            db.get("alice", "a:b", &cancel()).await,
            Err(Error::Validation(_))
        ));

        let (kifu, steps) = linear_record("", "k1", 1);
        assert!(matches!(
            db.post(kifu, steps, None, &cancel()).await,
            Err(Error::Validation(_))
        ));
        assert!(store.is_empty());
    }
}

// ============================================================================
// Replacement and Delete
// ============================================================================

mod replace_and_delete {
    use super::*;

    #[tokio::test]
    async fn test_replacement_removes_orphaned_rows() {
        let (db, store) = setup();
        let (kifu, steps) = record("alice", "k1", "sig-old", &["a", "b", "c", "d", "e"]);
        let v1 = db.post(kifu, steps, None, &cancel()).await.unwrap();

        let (kifu, steps) = record("alice", "k1", "sig-new", &["a", "x"]);
        let v2 = db.post(kifu, steps, Some(v1), &cancel()).await.unwrap();

        assert_eq!(store.partition_len(&step_partition("alice", "k1")), 2);
        assert_eq!(store.partition_len(&position_partition("alice", "c")), 0);
        assert_eq!(store.partition_len(&position_partition("alice", "x")), 1);
        assert_eq!(store.partition_len(&signature_partition("sig-old")), 0);

        let dups = db.duplicate_kifu("sig-new", &cancel()).await.unwrap();
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].version, v2);

        // header + 2 steps + 2 positions + signature
        assert_eq!(store.len(), 6);
    }

    #[tokio::test]
    async fn test_replacement_keeps_stored_position_rows() {
        let (db, store) = setup();
        let (kifu, steps) = record("alice", "k1", "sig", &["a", "b", "c"]);
        let v1 = db.post(kifu, steps, None, &cancel()).await.unwrap();

        let (kifu, steps) = record("alice", "k1", "sig", &["a", "b", "z"]);
        let v2 = db.post(kifu, steps, Some(v1), &cancel()).await.unwrap();

        let unchanged = store
            .get(&position_key("alice", "b", "k1", 1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.version, v1);
        let added = store
            .get(&position_key("alice", "z", "k1", 2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(added.version, v2);
        let step = store.get(&step_key("alice", "k1", 1)).await.unwrap().unwrap();
        assert_eq!(step.version, v2);
    }

    #[tokio::test]
    async fn test_replacement_restores_missing_position_rows() {
        let (db, store) = setup();
        let (kifu, steps) = record("alice", "k1", "sig", &["a", "b", "c"]);
        let v1 = db.post(kifu.clone(), steps.clone(), None, &cancel()).await.unwrap();

        // A row lost to an earlier partial write
        store.delete(&position_key("alice", "b", "k1", 1), None).await.unwrap();

        let v2 = db.post(kifu, steps, Some(v1), &cancel()).await.unwrap();
        let restored = store
            .get(&position_key("alice", "b", "k1", 1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(restored.version, v2);

        let matches = db
            .search("b", &["alice".to_string()], 1, &[], &cancel())
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let (db, store) = setup();
        let (kifu, steps) = linear_record("alice", "k1", 30);
        let v = db.post(kifu, steps, None, &cancel()).await.unwrap();

        db.delete_kifu("alice", "k1", v, &cancel()).await.unwrap();

        let err = db.get("alice", "k1", &cancel()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(db.get_steps("alice", "k1", None, &cancel()).await.unwrap().is_empty());
        // Steps, positions and signature are all gone
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_delete_with_stale_version_removes_nothing() {
        let (db, store) = setup();
        let (kifu, steps) = linear_record("alice", "k1", 3);
        let v1 = db.post(kifu.clone(), steps.clone(), None, &cancel()).await.unwrap();
        db.post(kifu, steps, Some(v1), &cancel()).await.unwrap();
        let rows = store.len();

        let err = db.delete_kifu("alice", "k1", v1, &cancel()).await.unwrap_err();
        assert_eq!(
            err,
            Error::Lock {
                expected: Some(1),
                actual: Some(2)
            }
        );
        assert_eq!(store.len(), rows);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let (db, _) = setup();
        let err = db
            .delete_kifu("alice", "ghost", Version::INITIAL, &cancel())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_leaves_other_records_intact() {
        let (db, store) = setup();
        let shared = ["start", "mid", "end"];
        let (k1, s1) = record("alice", "k1", "same", &shared);
        let (k2, s2) = record("alice", "k2", "same", &shared);
        let (k3, s3) = record("bob", "k1", "same", &shared);
        let v1 = db.post(k1, s1, None, &cancel()).await.unwrap();
        db.post(k2, s2, None, &cancel()).await.unwrap();
        db.post(k3, s3, None, &cancel()).await.unwrap();

        db.delete_kifu("alice", "k1", v1, &cancel()).await.unwrap();

        assert!(db.get("alice", "k2", &cancel()).await.is_ok());
        assert!(db.get("bob", "k1", &cancel()).await.is_ok());
        assert_eq!(db.get_steps("bob", "k1", None, &cancel()).await.unwrap().len(), 3);
        assert_eq!(store.partition_len(&position_partition("alice", "mid")), 1);
        assert_eq!(store.partition_len(&position_partition("bob", "mid")), 1);
        assert_eq!(db.duplicate_kifu("same", &cancel()).await.unwrap().len(), 2);
        assert!(store.get(&kifu_key("alice", "k1")).await.unwrap().is_none());
    }
}

// ============================================================================
// Batch Get, List, Recent, Duplicates
// ============================================================================

mod multi_record_reads {
    use super::*;

    #[tokio::test]
    async fn test_batch_get_keeps_request_order() {
        let config = KifuDbConfig::new().with_batch_get_unit(2);
        let (db, _) = setup_with(config, MemoryStoreConfig::default());
        for id in ["k1", "k2", "k3", "k4", "k5"] {
            let (kifu, steps) = linear_record("alice", id, 1);
            db.post(kifu, steps, None, &cancel()).await.unwrap();
        }

        let ids = [
            ("alice", "k4"),
            ("alice", "missing"),
            ("alice", "k1"),
            ("bob", "k2"),
            ("alice", "k5"),
            ("alice", "k3"),
        ];
        let found = db.batch_get(&ids, &cancel()).await.unwrap();
        let got: Vec<&str> = found.iter().map(|k| k.value.kifu_id.as_str()).collect();
        assert_eq!(got, vec!["k4", "k1", "k5", "k3"]);

        let repeated = db
            .batch_get(&[("alice", "k2"), ("alice", "k1"), ("alice", "k2")], &cancel())
            .await
            .unwrap();
        let got: Vec<&str> = repeated.iter().map(|k| k.value.kifu_id.as_str()).collect();
        assert_eq!(got, vec!["k2", "k1", "k2"]);

        assert!(db.batch_get(&[], &cancel()).await.unwrap().is_empty());
        assert!(db.batch_get(&[("alice", "")], &cancel()).await.is_err());
    }

    #[tokio::test]
    async fn test_list_kifu_visits_in_id_order_and_stops() {
        let config = KifuDbConfig::new().with_query_page_size(2);
        let (db, _) = setup_with(config, MemoryStoreConfig::default());
        for id in ["c", "a", "e", "b", "d"] {
            let (kifu, steps) = linear_record("alice", id, 1);
            db.post(kifu, steps, None, &cancel()).await.unwrap();
        }
        let (kifu, steps) = linear_record("bob", "z", 1);
        db.post(kifu, steps, None, &cancel()).await.unwrap();

        let mut all = Vec::new();
        db.list_kifu(
            "alice",
            |k| {
                all.push(k.value.kifu_id);
                ControlFlow::Continue(())
            },
            &cancel(),
        )
        .await
        .unwrap();
        assert_eq!(all, vec!["a", "b", "c", "d", "e"]);

        let mut first_three = Vec::new();
        db.list_kifu(
            "alice",
            |k| {
                first_three.push(k.value.kifu_id);
                if first_three.len() == 3 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            },
            &cancel(),
        )
        .await
        .unwrap();
        assert_eq!(first_three, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_recent_kifu_most_recent_first() {
        let (db, _) = setup();
        let mut versions = Vec::new();
        for id in ["k1", "k2", "k3", "k4", "k5"] {
            let (kifu, steps) = linear_record("alice", id, 2);
            versions.push(db.post(kifu, steps, None, &cancel()).await.unwrap());
        }

        let recent = db.recent_kifu("alice", 3, &cancel()).await.unwrap();
        let ids: Vec<&str> = recent.iter().map(|k| k.value.kifu_id.as_str()).collect();
        assert_eq!(ids, vec!["k5", "k4", "k3"]);

        // Rewriting k1 makes it the most recent
        let (kifu, steps) = linear_record("alice", "k1", 2);
        db.post(kifu, steps, Some(versions[0]), &cancel()).await.unwrap();
        let recent = db.recent_kifu("alice", 2, &cancel()).await.unwrap();
        let ids: Vec<&str> = recent.iter().map(|k| k.value.kifu_id.as_str()).collect();
        assert_eq!(ids, vec!["k1", "k5"]);

        assert!(db.recent_kifu("alice", 0, &cancel()).await.unwrap().is_empty());
        assert_eq!(db.recent_kifu("alice", 50, &cancel()).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_recent_kifu_unknown_index_is_store_error() {
        let config = KifuDbConfig::new().with_updated_index("no_such_index");
        let (db, _) = setup_with(config, MemoryStoreConfig::default());
        let (kifu, steps) = linear_record("alice", "k1", 1);
        db.post(kifu, steps, None, &cancel()).await.unwrap();

        let err = db.recent_kifu("alice", 3, &cancel()).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_duplicate_kifu_across_owners() {
        let (db, _) = setup();
        let (k1, s1) = record("alice", "k1", "dup", &["a", "b"]);
        let (k2, s2) = record("bob", "k9", "dup", &["a", "b"]);
        let (k3, s3) = record("bob", "k10", "unique", &["a"]);
        db.post(k1, s1, None, &cancel()).await.unwrap();
        db.post(k2, s2, None, &cancel()).await.unwrap();
        db.post(k3, s3, None, &cancel()).await.unwrap();

        let dups = db.duplicate_kifu("dup", &cancel()).await.unwrap();
        let owners: Vec<(&str, &str)> = dups
            .iter()
            .map(|s| (s.value.user_id.as_str(), s.value.kifu_id.as_str()))
            .collect();
        assert_eq!(owners, vec![("alice", "k1"), ("bob", "k9")]);
        assert_eq!(dups[0].value.created_ts, 1_700_000_000);

        assert!(db.duplicate_kifu("", &cancel()).await.unwrap().is_empty());
        assert!(db.duplicate_kifu("nothing", &cancel()).await.unwrap().is_empty());
    }
}

// ============================================================================
// Configuration
// ============================================================================

mod configuration {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_open_writes_default_config() {
        let dir = TempDir::new().unwrap();
        let db = KifuDb::open(Arc::new(MemoryStore::new()), dir.path(), tracing::Span::none()).unwrap();
        assert!(dir.path().join(CONFIG_FILE_NAME).exists());
        assert_eq!(db.config(), &KifuDbConfig::default());
    }

    #[test]
    fn test_open_reads_existing_config() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "parallelism = 6\nupdated_index = \"by_time\"\n",
        )
        .unwrap();
        let db = KifuDb::open(Arc::new(MemoryStore::new()), dir.path(), tracing::Span::none()).unwrap();
        assert_eq!(db.config().parallelism, 6);
        assert_eq!(db.config().updated_index, "by_time");
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let err = KifuDb::new(
            Arc::new(MemoryStore::new()),
            KifuDbConfig::new().with_batch_write_unit(0),
            tracing::Span::none(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
