use ragstore_core::types::{Record, SparseVector};
use ragstore_core::Error;
use ragstore_vector::{CollectionState, CollectionStore, LoadState};

async fn temp_store() -> anyhow::Result<(tempfile::TempDir, CollectionStore)> {
    let tmp = tempfile::tempdir()?;
    let uri = tmp.path().join("db").to_string_lossy().to_string();
    let store = CollectionStore::open(&uri, true).await?;
    Ok((tmp, store))
}

fn record(i: usize, dim: usize) -> Record {
    let mut dense = vec![0.0f32; dim];
    dense[i % dim] = 1.0;
    let sparse = SparseVector::from_pairs([(i as u32, 1.0), (1000, 0.5)]).unwrap();
    Record { dense, sparse, text: format!("record {i}") }
}

#[tokio::test]
async fn open_without_create_rejects_missing_path() {
    let tmp = tempfile::tempdir().unwrap();
    let uri = tmp.path().join("absent").to_string_lossy().to_string();
    let err = CollectionStore::open(&uri, false).await.err().expect("must fail");
    assert!(matches!(err, Error::Connection { .. }), "{err:?}");
}

#[tokio::test]
async fn ensure_is_created_then_loaded_with_identical_schema() -> anyhow::Result<()> {
    let (_tmp, store) = temp_store().await?;
    assert_eq!(store.ensure_collection("docs", 8).await?, CollectionState::Created);
    let first = store.schema("docs").await?;
    assert_eq!(store.ensure_collection("docs", 8).await?, CollectionState::Loaded);
    assert_eq!(store.schema("docs").await?, first);

    // A fresh handle rebuilds the schema from storage.
    let reopened = CollectionStore::open(store.uri(), false).await?;
    assert_eq!(reopened.ensure_collection("docs", 8).await?, CollectionState::Loaded);
    assert_eq!(reopened.schema("docs").await?, first);
    assert_eq!(first.embed_dim, 8);
    Ok(())
}

#[tokio::test]
async fn concurrent_first_creation_yields_one_created() -> anyhow::Result<()> {
    let (_tmp, store) = temp_store().await?;
    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.ensure_collection("race", 4).await })
        })
        .collect();
    let mut created = 0;
    for task in tasks {
        if task.await?? == CollectionState::Created { created += 1; }
    }
    assert_eq!(created, 1);
    assert_eq!(store.list_collections().await?, vec!["race".to_string()]);
    Ok(())
}

#[tokio::test]
async fn loading_with_other_dim_is_a_mismatch() -> anyhow::Result<()> {
    let (_tmp, store) = temp_store().await?;
    store.ensure_collection("docs", 8).await?;
    let err = store.ensure_collection("docs", 16).await.unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 8, actual: 16, .. }), "{err:?}");
    Ok(())
}

#[tokio::test]
async fn dimension_mismatch_writes_zero_rows() -> anyhow::Result<()> {
    let (_tmp, store) = temp_store().await?;
    store.ensure_collection("docs", 4).await?;
    let mut records: Vec<Record> = (0..3).map(|i| record(i, 4)).collect();
    records.push(record(3, 5));
    let err = store.insert("docs", &records, 2).await.unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 4, actual: 5, record: Some(3), .. }), "{err:?}");
    assert_eq!(err.rows_written(), 0);
    assert_eq!(store.collection_stats("docs").await?.row_count, 0);
    Ok(())
}

#[tokio::test]
async fn oversized_text_is_rejected_before_writing() -> anyhow::Result<()> {
    let (_tmp, store) = temp_store().await?;
    store.ensure_collection("docs", 4).await?;
    let mut big = record(0, 4);
    big.text = "x".repeat(ragstore_vector::MAX_TEXT_BYTES + 1);
    let err = store.insert("docs", &[record(1, 4), big], 10).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)), "{err:?}");
    assert_eq!(store.collection_stats("docs").await?.row_count, 0);
    Ok(())
}

#[tokio::test]
async fn text_of_exactly_64_kib_is_stored() -> anyhow::Result<()> {
    let (_tmp, store) = temp_store().await?;
    store.ensure_collection("docs", 4).await?;
    let mut full = record(0, 4);
    full.text = "x".repeat(64 * 1024);
    assert_eq!(ragstore_vector::MAX_TEXT_BYTES, 64 * 1024);
    let report = store.insert("docs", &[full], 10).await?;
    assert_eq!(report.rows_written, 1);
    assert_eq!(store.collection_stats("docs").await?.row_count, 1);
    Ok(())
}

#[tokio::test]
async fn insert_writes_in_batches_and_continues_ids() -> anyhow::Result<()> {
    let (_tmp, store) = temp_store().await?;
    store.ensure_collection("docs", 4).await?;
    let records: Vec<Record> = (0..12).map(|i| record(i, 4)).collect();
    let report = store.insert("docs", &records, 5).await?;
    assert_eq!(report.batches, vec![5, 5, 2]);
    assert_eq!(report.rows_written, 12);

    let more: Vec<Record> = (12..14).map(|i| record(i, 4)).collect();
    store.insert("docs", &more, 5).await?;
    let stats = store.collection_stats("docs").await?;
    assert_eq!(stats.row_count, 14);

    // record 13 carries the unique sparse term 13 and was given id 13
    let hits = store.search_sparse("docs", &SparseVector::from_pairs([(13, 1.0)])?, 3).await?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, 13);
    assert_eq!(hits[0].text, "record 13");
    Ok(())
}

#[tokio::test]
async fn searches_return_at_most_k_real_records() -> anyhow::Result<()> {
    let (_tmp, store) = temp_store().await?;
    store.ensure_collection("docs", 4).await?;
    let records: Vec<Record> = (0..6).map(|i| record(i, 4)).collect();
    store.insert("docs", &records, 4).await?;

    let dense = store.search_dense("docs", &[1.0, 0.0, 0.0, 0.0], 3).await?;
    assert_eq!(dense.len(), 3);
    assert!(dense.iter().all(|h| (0..6).contains(&h.id)));
    // records 0 and 4 point along the query
    assert!((dense[0].score - 1.0).abs() < 1e-4);
    assert_eq!((dense[0].id, dense[1].id), (0, 4));
    assert!(dense.windows(2).all(|w| w[0].score >= w[1].score));

    let sparse = store.search_sparse("docs", &SparseVector::from_pairs([(1000, 1.0)])?, 10).await?;
    assert_eq!(sparse.len(), 6);
    assert_eq!(sparse.iter().map(|h| h.id).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4, 5]);

    let none = store.search_sparse("docs", &SparseVector::from_pairs([(5000, 1.0)])?, 10).await?;
    assert!(none.is_empty());

    let err = store.search_dense("docs", &[1.0, 0.0], 3).await.unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 4, actual: 2, .. }));
    Ok(())
}

#[tokio::test]
async fn dense_search_on_empty_collection_is_empty() -> anyhow::Result<()> {
    let (_tmp, store) = temp_store().await?;
    store.ensure_collection("empty", 4).await?;
    assert!(store.search_dense("empty", &[0.5, 0.5, 0.5, 0.5], 3).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn drop_removes_collection_and_missing_drop_is_not_found() -> anyhow::Result<()> {
    let (_tmp, store) = temp_store().await?;
    let err = store.drop_collection("x").await.unwrap_err();
    assert!(err.is_not_found(), "{err:?}");

    store.ensure_collection("x", 4).await?;
    assert!(store.list_collections().await?.contains(&"x".to_string()));
    store.drop_collection("x").await?;
    assert!(!store.list_collections().await?.contains(&"x".to_string()));
    assert!(store.schema("x").await.unwrap_err().is_not_found());
    Ok(())
}

#[tokio::test]
async fn load_state_follows_load_and_release() -> anyhow::Result<()> {
    let (_tmp, store) = temp_store().await?;
    store.ensure_collection("docs", 4).await?;
    assert_eq!(store.collection_stats("docs").await?.load_state, LoadState::Loaded);
    store.release_collection("docs").await?;
    assert_eq!(store.collection_stats("docs").await?.load_state, LoadState::NotLoad);
    store.load_collection("docs").await?;
    assert_eq!(store.collection_stats("docs").await?.load_state, LoadState::Loaded);
    assert!(store.release_collection("missing").await.unwrap_err().is_not_found());
    Ok(())
}

#[tokio::test]
async fn invalid_names_are_rejected() -> anyhow::Result<()> {
    let (_tmp, store) = temp_store().await?;
    assert!(matches!(store.ensure_collection("bad name", 4).await, Err(Error::InvalidInput(_))));
    Ok(())
}
