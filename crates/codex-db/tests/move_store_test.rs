//! Integration tests for the PostgreSQL move store.
//!
//! These tests require a running PostgreSQL database:
//! ```
//! DATABASE_URL=postgres://... cargo test -p codex-db -- --ignored
//! ```

use chrono::Utc;
use codex_db::test_fixtures::{unique_prefix, TestDatabase};
use codex_db::{
    BlockRepository, MoveJobPayload, MoveJobRepository, MoveOperation, StrandRepository,
};
use sqlx::Row;

fn load_env() {
    dotenvy::dotenv().ok();
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_prefix_lookup_is_segment_aware() {
    load_env();
    let test_db = TestDatabase::new().await;
    let root = unique_prefix("prefix");

    test_db.insert_strand(&format!("{root}/a/one.md"), "").await;
    test_db.insert_strand(&format!("{root}/a/deep/two.md"), "").await;
    test_db.insert_strand(&format!("{root}/ab/three.md"), "").await;

    let found = test_db
        .db
        .strands
        .find_by_path_prefix(&format!("{root}/a"))
        .await
        .unwrap();
    let paths: Vec<_> = found.iter().map(|s| s.path.as_str()).collect();

    assert_eq!(found.len(), 2);
    assert!(paths.iter().all(|p| !p.contains("/ab/")));

    test_db.cleanup(&root).await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_prefix_lookup_treats_like_wildcards_literally() {
    load_env();
    let test_db = TestDatabase::new().await;
    let root = unique_prefix("wild");

    test_db.insert_strand(&format!("{root}/my_dir/a.md"), "").await;
    test_db.insert_strand(&format!("{root}/myXdir/b.md"), "").await;

    let found = test_db
        .db
        .strands
        .find_by_path_prefix(&format!("{root}/my_dir"))
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert!(found[0].path.ends_with("my_dir/a.md"));

    test_db.cleanup(&root).await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_exact_lookup_and_content_update() {
    load_env();
    let test_db = TestDatabase::new().await;
    let root = unique_prefix("exact");
    let path = format!("{root}/file[1].md");
    let id = test_db.insert_strand(&path, "see [[old]]").await;

    let strand = test_db
        .db
        .strands
        .find_by_exact_path(&path)
        .await
        .unwrap()
        .expect("strand should exist");
    assert_eq!(strand.id, id);

    let modified_at = Utc::now();
    let rows = test_db
        .db
        .strands
        .update_content(id, "see [[new]]", modified_at)
        .await
        .unwrap();
    assert_eq!(rows, 1);

    let fresh = test_db.db.strands.fetch_content(id).await.unwrap().unwrap();
    assert_eq!(fresh.content, "see [[new]]");

    test_db.cleanup(&root).await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_block_prefix_rewrite_keeps_suffix() {
    load_env();
    let test_db = TestDatabase::new().await;
    let root = unique_prefix("blocks");
    let old_dir = format!("{root}/old");
    let new_dir = format!("{root}/new");

    let inside = test_db.insert_strand(&format!("{old_dir}/x/note.md"), "").await;
    let sibling = test_db.insert_strand(&format!("{root}/older/note.md"), "").await;
    test_db.insert_block(inside, &format!("{old_dir}/x/note.md")).await;
    test_db.insert_block(inside, &format!("{old_dir}/x/note.md")).await;
    test_db.insert_block(sibling, &format!("{root}/older/note.md")).await;

    let updated = test_db
        .db
        .blocks
        .update_owner_path_prefix(&old_dir, &new_dir)
        .await
        .unwrap();

    assert_eq!(updated, 2);
    assert_eq!(
        test_db.block_paths(inside).await,
        vec![format!("{new_dir}/x/note.md"); 2]
    );
    assert_eq!(
        test_db.block_paths(sibling).await,
        vec![format!("{root}/older/note.md")]
    );

    test_db.cleanup(&root).await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_block_exact_rewrite() {
    load_env();
    let test_db = TestDatabase::new().await;
    let root = unique_prefix("exactblocks");
    let old = format!("{root}/a.md");
    let new = format!("{root}/b.md");

    let id = test_db.insert_strand(&old, "").await;
    test_db.insert_block(id, &old).await;

    let updated = test_db.db.blocks.update_owner_path(&new, &old).await.unwrap();

    assert_eq!(updated, 1);
    assert_eq!(test_db.block_paths(id).await, vec![new]);

    test_db.cleanup(&root).await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_clear_indexed_at_only_touches_given_ids() {
    load_env();
    let test_db = TestDatabase::new().await;
    let root = unique_prefix("reindex");

    let a = test_db.insert_strand(&format!("{root}/a.md"), "").await;
    let b = test_db.insert_strand(&format!("{root}/b.md"), "").await;

    test_db.db.strands.clear_indexed_at(&[a]).await.unwrap();

    let a = test_db
        .db
        .strands
        .find_by_exact_path(&format!("{root}/a.md"))
        .await
        .unwrap()
        .unwrap();
    let b_row = test_db
        .db
        .strands
        .find_by_exact_path(&format!("{root}/b.md"))
        .await
        .unwrap()
        .unwrap();
    assert!(a.last_indexed_at.is_none());
    assert_eq!(b_row.id, b);
    assert!(b_row.last_indexed_at.is_some());

    test_db.cleanup(&root).await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_find_referencing_is_literal() {
    load_env();
    let test_db = TestDatabase::new().await;
    let root = unique_prefix("refs");

    test_db
        .insert_strand(&format!("{root}/linker.md"), &format!("[[{root}/100%.md]]"))
        .await;
    test_db
        .insert_strand(&format!("{root}/other.md"), &format!("{root}/1000.md"))
        .await;

    let found = test_db
        .db
        .strands
        .find_referencing(&format!("{root}/100%.md"))
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert!(found[0].path.ends_with("linker.md"));

    test_db.cleanup(&root).await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_insert_job_persists_payload() {
    load_env();
    let test_db = TestDatabase::new().await;
    let root = unique_prefix("jobs");
    let job_id = format!("move-{}-{}", Utc::now().timestamp_millis(), "abc123xyz");

    let payload = MoveJobPayload {
        operations: vec![MoveOperation::file(
            format!("{root}/a.md"),
            format!("{root}/b.md"),
        )],
    };
    test_db
        .db
        .jobs
        .insert_job(&job_id, payload.to_json().unwrap(), Utc::now())
        .await
        .unwrap();

    let row = sqlx::query("SELECT payload FROM move_job WHERE id = $1")
        .bind(&job_id)
        .fetch_one(&test_db.pool)
        .await
        .unwrap();
    let stored = MoveJobPayload::from_json(row.get("payload")).unwrap();
    assert_eq!(stored, payload);

    test_db.cleanup(&root).await;
}
