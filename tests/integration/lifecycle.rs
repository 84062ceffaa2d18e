//! Full record lifecycle through the public API

use std::sync::Arc;

use kifudb::{
    CancellationToken, Error, FinishedStatus, Handicap, Kifu, KifuDb, KifuDbConfig, MemoryStore,
    Piece, Player, PlayerOrder, Pos, Step, Version,
};

fn game() -> (Kifu, Vec<Step>) {
    let kifu = Kifu {
        handicap: Handicap::DropB,
        game_name: "Ryuo-sen".to_string(),
        players: vec![
            Player {
                order: PlayerOrder::Black,
                name: "sente".to_string(),
                note: String::new(),
            },
            Player {
                order: PlayerOrder::White,
                name: "gote".to_string(),
                note: String::new(),
            },
        ],
        other_fields: [("場所".to_string(), "東京".to_string())].into_iter().collect(),
        sfen: "final-position".to_string(),
        ..Kifu::new("owner", "game-1")
    };
    let steps = vec![
        Step::new("owner", "game-1", 0, "start"),
        Step {
            sfen_move: "7g7f".to_string(),
            src: Some(Pos { x: 7, y: 7 }),
            dst: Some(Pos { x: 7, y: 6 }),
            piece: Piece::Fu,
            thinking_sec: 3,
            notes: vec!["opening".to_string()],
            ..Step::new("owner", "game-1", 1, "after-7f")
        },
        Step {
            finished_status: FinishedStatus::Surrender,
            ..Step::new("owner", "game-1", 2, "after-7f")
        },
    ];
    (kifu, steps)
}

#[tokio::test]
async fn test_record_lifecycle() {
    let db = KifuDb::new(
        Arc::new(MemoryStore::new()),
        KifuDbConfig::default(),
        tracing::info_span!("lifecycle"),
    )
    .unwrap();
    let cancel = CancellationToken::new();

    let (kifu, steps) = game();
    let v1 = db.post(kifu.clone(), steps.clone(), None, &cancel).await.unwrap();

    let (header, stored) = db.get_kifu_and_steps("owner", "game-1", &cancel).await.unwrap();
    assert_eq!(header.value, kifu);
    assert_eq!(stored.iter().map(|s| s.value.clone()).collect::<Vec<_>>(), steps);

    let matches = db
        .search("after-7f", &["owner".to_string()], 5, &[], &cancel)
        .await
        .unwrap();
    assert_eq!(matches.len(), 2);

    let dups = db.duplicate_kifu("final-position", &cancel).await.unwrap();
    assert_eq!(dups.len(), 1);

    let renamed = Kifu {
        game_name: "Meijin-sen".to_string(),
        ..kifu
    };
    let v2 = db.post(renamed, steps, Some(v1), &cancel).await.unwrap();
    assert_eq!(v2, Version::new(2));

    let err = db.delete_kifu("owner", "game-1", v1, &cancel).await.unwrap_err();
    assert!(matches!(err, Error::Lock { .. }));

    db.delete_kifu("owner", "game-1", v2, &cancel).await.unwrap();
    assert!(matches!(
        db.get("owner", "game-1", &cancel).await,
        Err(Error::NotFound(_))
    ));
    assert!(db
        .search("after-7f", &["owner".to_string()], 0, &[], &cancel)
        .await
        .unwrap()
        .is_empty());
}
