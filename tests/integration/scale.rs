//! Larger records and owners

use std::sync::Arc;

use kifudb::{
    CancellationToken, Error, Kifu, KifuDb, KifuDbConfig, MemoryStore, Step, MAX_STEPS,
};

fn long_record(kifu_id: &str, n: usize) -> (Kifu, Vec<Step>) {
    let kifu = Kifu {
        sfen: format!("sig-{}", kifu_id),
        ..Kifu::new("owner", kifu_id)
    };
    let steps = (0..n)
        .map(|i| Step::new("owner", kifu_id, i as u32, format!("pos-{}", i % 50)))
        .collect();
    (kifu, steps)
}

fn db() -> (KifuDb, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let config = KifuDbConfig::new().with_parallelism(4);
    let db = KifuDb::new(store.clone(), config, tracing::Span::none()).unwrap();
    (db, store)
}

#[tokio::test]
async fn test_record_at_step_limit() {
    let (db, store) = db();
    let cancel = CancellationToken::new();

    let (kifu, steps) = long_record("max", MAX_STEPS);
    let v = db.post(kifu, steps, None, &cancel).await.unwrap();

    let steps = db.get_steps("owner", "max", None, &cancel).await.unwrap();
    assert_eq!(steps.len(), MAX_STEPS);
    assert!(steps.windows(2).all(|w| w[0].value.seq + 1 == w[1].value.seq));

    let tail = db
        .get_steps("owner", "max", Some(9_990..=20_000), &cancel)
        .await
        .unwrap();
    assert_eq!(tail.len(), 10);

    db.delete_kifu("owner", "max", v, &cancel).await.unwrap();
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_record_over_step_limit_is_rejected() {
    let (db, store) = db();
    let (kifu, steps) = long_record("too-long", MAX_STEPS + 1);
    let err = db
        .post(kifu, steps, None, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_search_over_many_records() {
    let (db, _) = db();
    let cancel = CancellationToken::new();
    for r in 0..40 {
        let (kifu, steps) = long_record(&format!("r{:02}", r), 120);
        db.post(kifu, steps, None, &cancel).await.unwrap();
    }

    // pos-7 is reached at seq 7, 57 and 107 of every record
    let matches = db
        .search("pos-7", &["owner".to_string()], 3, &[], &cancel)
        .await
        .unwrap();
    assert_eq!(matches.len(), 40 * 3);
    assert!(matches.iter().all(|m| m.steps.len() == 3));
    assert!(matches
        .iter()
        .all(|m| m.steps[0].value.seq == m.seq + 1));
}
