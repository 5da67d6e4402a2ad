//! 동기화 엔진 통합 테스트 (메모리 저장소).

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use listing_core::{
    BatchSummary, DeleteOutcome, StoredSymbol, SymbolData, SymbolKey, SymbolRecord,
    UpsertOutcome, ValidationError,
};
use listing_data::{
    MemorySymbolStore, StoreError, SymbolStore, SyncEngine, SyncError, NOT_ATTEMPTED,
};

fn engine() -> SyncEngine<MemorySymbolStore> {
    SyncEngine::new(MemorySymbolStore::new())
}

fn record(symbol: &str, name: &str) -> SymbolRecord {
    SymbolRecord::new(symbol, name, "NASDAQ", "EQUITY").unwrap()
}

fn key(symbol: &str) -> SymbolKey {
    SymbolKey::new(symbol, "NASDAQ").unwrap()
}

/// 지정한 횟수만큼 삽입에 성공한 뒤 연결 장애를 내는 저장소.
struct FlakyStore {
    inner: MemorySymbolStore,
    healthy_inserts: usize,
    calls: AtomicUsize,
}

impl FlakyStore {
    fn new(healthy_inserts: usize) -> Self {
        Self {
            inner: MemorySymbolStore::new(),
            healthy_inserts,
            calls: AtomicUsize::new(0),
        }
    }

    fn is_down(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst) >= self.healthy_inserts
    }
}

#[async_trait]
impl SymbolStore for FlakyStore {
    async fn insert(&self, record: &SymbolRecord) -> listing_data::Result<StoredSymbol> {
        if self.is_down() {
            return Err(StoreError::Connection("connection reset by peer".to_string()));
        }
        self.inner.insert(record).await
    }

    async fn find_one(&self, key: &SymbolKey) -> listing_data::Result<Option<StoredSymbol>> {
        self.inner.find_one(key).await
    }

    async fn find_one_and_replace(
        &self,
        key: &SymbolKey,
        record: &SymbolRecord,
    ) -> listing_data::Result<UpsertOutcome> {
        if self.is_down() {
            return Err(StoreError::Timeout("find_one_and_replace exceeded 45s".to_string()));
        }
        self.inner.find_one_and_replace(key, record).await
    }

    async fn find_one_and_delete(
        &self,
        key: &SymbolKey,
    ) -> listing_data::Result<Option<StoredSymbol>> {
        self.inner.find_one_and_delete(key).await
    }

    async fn count(&self) -> listing_data::Result<i64> {
        self.inner.count().await
    }

    async fn count_by_market(&self) -> listing_data::Result<Vec<(String, i64)>> {
        self.inner.count_by_market().await
    }
}

/// 특정 티커를 데이터 예외(22021)로 거부하는 저장소.
struct RejectingStore {
    inner: MemorySymbolStore,
    rejected_symbol: &'static str,
}

impl RejectingStore {
    fn new(rejected_symbol: &'static str) -> Self {
        Self {
            inner: MemorySymbolStore::new(),
            rejected_symbol,
        }
    }

    fn check(&self, record: &SymbolRecord) -> listing_data::Result<()> {
        if record.symbol() == self.rejected_symbol {
            return Err(StoreError::Rejected(
                "invalid byte sequence for encoding \"UTF8\": 0x00".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl SymbolStore for RejectingStore {
    async fn insert(&self, record: &SymbolRecord) -> listing_data::Result<StoredSymbol> {
        self.check(record)?;
        self.inner.insert(record).await
    }

    async fn find_one(&self, key: &SymbolKey) -> listing_data::Result<Option<StoredSymbol>> {
        self.inner.find_one(key).await
    }

    async fn find_one_and_replace(
        &self,
        key: &SymbolKey,
        record: &SymbolRecord,
    ) -> listing_data::Result<UpsertOutcome> {
        self.check(record)?;
        self.inner.find_one_and_replace(key, record).await
    }

    async fn find_one_and_delete(
        &self,
        key: &SymbolKey,
    ) -> listing_data::Result<Option<StoredSymbol>> {
        self.inner.find_one_and_delete(key).await
    }

    async fn count(&self) -> listing_data::Result<i64> {
        self.inner.count().await
    }

    async fn count_by_market(&self) -> listing_data::Result<Vec<(String, i64)>> {
        self.inner.count_by_market().await
    }
}

#[tokio::test]
async fn test_write_one_round_trip() {
    let engine = engine();
    let r = record("AAPL", "Apple Inc.");

    let stored = engine.write_one(r.clone()).await.unwrap();
    let found = engine.find_one(&r.key()).await.unwrap().unwrap();

    assert_eq!(found, stored);
    assert!(found.matches(&r));
}

#[tokio::test]
async fn test_write_one_duplicate_keeps_original() {
    let engine = engine();
    engine.write_one(record("AAPL", "Apple Inc.")).await.unwrap();

    let err = engine
        .write_one(record("AAPL", "Apple Renamed"))
        .await
        .unwrap_err();

    assert!(err.is_duplicate());
    assert!(matches!(
        err,
        SyncError::DuplicateKey { ref symbol, ref market } if symbol == "AAPL" && market == "NASDAQ"
    ));

    let found = engine.find_one(&key("AAPL")).await.unwrap().unwrap();
    assert_eq!(found.name, "Apple Inc.");
    assert_eq!(engine.store().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_write_one_normalizes_raw_input() {
    let engine = engine();

    let stored = engine
        .write_one(SymbolData::new("aapl", "Apple Inc.", "nasdaq", "Stock"))
        .await
        .unwrap();

    assert_eq!(stored.symbol, "AAPL");
    assert_eq!(stored.market, "NASDAQ");
    assert_eq!(stored.instrument, "Stock");
    assert!(engine.find_one(&key("AAPL")).await.unwrap().is_some());
}

#[tokio::test]
async fn test_write_one_rejects_invalid_without_store_call() {
    let engine = engine();

    let err = engine
        .write_one(SymbolData::new("  ", "Nameless", "NASDAQ", "EQUITY"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SyncError::Validation(ValidationError::EmptyField { field: "symbol" })
    ));
    assert_eq!(engine.store().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_upsert_is_idempotent() {
    let engine = engine();
    let r = record("AAPL", "Apple Inc.");

    engine.upsert(&r.key(), r.clone()).await.unwrap();
    engine.upsert(&r.key(), r.clone()).await.unwrap();

    assert_eq!(engine.store().count().await.unwrap(), 1);
    let found = engine.find_one(&r.key()).await.unwrap().unwrap();
    assert!(found.matches(&r));
}

#[tokio::test]
async fn test_upsert_replaces_name_and_keeps_identity() {
    let engine = engine();
    let first = engine.write_one(record("AAPL", "Apple Inc.")).await.unwrap();

    let updated = engine
        .upsert(&key("AAPL"), record("AAPL", "Apple Incorporated"))
        .await
        .unwrap();

    assert_eq!(updated.name, "Apple Incorporated");
    assert_eq!(updated.key(), first.key());
    assert_eq!(updated.id, first.id);
    assert_eq!(updated.created_at, first.created_at);
    assert!(updated.updated_at >= first.updated_at);
    assert_eq!(engine.store().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_upsert_key_mismatch() {
    let engine = engine();

    let err = engine
        .upsert(&key("AAPL"), record("MSFT", "Microsoft"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SyncError::Validation(ValidationError::KeyMismatch { .. })
    ));
    assert_eq!(engine.store().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_one() {
    let engine = engine();

    let outcome = engine.delete_one(&key("NOPE")).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::NotFound);

    let stored = engine.write_one(record("AAPL", "Apple Inc.")).await.unwrap();
    let outcome = engine.delete_one(&key("AAPL")).await.unwrap();
    assert_eq!(outcome.into_deleted(), Some(stored));
    assert!(engine.find_one(&key("AAPL")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_write_batch_skips_duplicate_in_batch() {
    let engine = engine();
    let r1 = record("AAPL", "Apple Inc.");

    let outcome = engine.write_batch(vec![r1.clone(), r1.clone()]).await.unwrap();

    assert_eq!(outcome.inserted_count(), 1);
    assert_eq!(outcome.duplicates, vec![r1.key()]);
    assert_eq!(outcome.failed_count(), 0);
}

#[tokio::test]
async fn test_write_batch_summary() {
    let engine = engine();

    let outcome = engine
        .write_batch(vec![
            record("AAPL", "Apple Inc."),
            record("GOOGL", "Alphabet Inc."),
            record("AAPL", "Apple Inc."),
        ])
        .await
        .unwrap();

    assert_eq!(
        outcome.summary(),
        BatchSummary {
            inserted: 2,
            updated: 0,
            duplicate_skipped: 1,
            failed: 0,
        }
    );
    let symbols: Vec<&str> = outcome.inserted.iter().map(|s| s.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["AAPL", "GOOGL"]);
}

#[tokio::test]
async fn test_write_batch_against_existing_records() {
    let engine = engine();
    engine.write_one(record("AAPL", "Apple Inc.")).await.unwrap();

    // 이미 저장된 키만으로 이루어진 배치는 오류가 아니다.
    let outcome = engine
        .write_batch(vec![record("AAPL", "Apple Inc.")])
        .await
        .unwrap();
    assert_eq!(outcome.duplicate_count(), 1);
    assert_eq!(outcome.inserted_count(), 0);
}

#[tokio::test]
async fn test_write_batch_mixed_invalid_records() {
    let engine = engine();

    let outcome = engine
        .write_batch(vec![
            SymbolData::new("aapl", "Apple Inc.", "nasdaq", "EQUITY"),
            SymbolData::new("BAD", "", "NASDAQ", "EQUITY"),
            SymbolData::new("MSFT", "Microsoft", "NASDAQ", "EQUITY"),
        ])
        .await
        .unwrap();

    assert_eq!(outcome.inserted_count(), 2);
    assert_eq!(outcome.failed_count(), 1);
    assert_eq!(outcome.failed[0].index, 1);
    assert_eq!(outcome.failed[0].symbol, "BAD");
    assert!(outcome.failed[0].reason.contains("name"));
}

#[tokio::test]
async fn test_write_batch_rejects_nul_byte_and_continues() {
    let engine = engine();

    let outcome = engine
        .write_batch(vec![
            SymbolData::new("A", "A Corp", "NASDAQ", "EQUITY"),
            SymbolData::new("BAD", "Bad\0Corp", "NASDAQ", "EQUITY"),
            SymbolData::new("C", "C Corp", "NASDAQ", "EQUITY"),
        ])
        .await
        .unwrap();

    assert_eq!(outcome.inserted_count(), 2);
    assert_eq!(outcome.failed_count(), 1);
    assert_eq!(outcome.failed[0].index, 1);
    assert_eq!(outcome.failed[0].symbol, "BAD");
    assert_eq!(engine.store().count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_write_batch_store_rejection_is_per_record() {
    let engine = SyncEngine::new(RejectingStore::new("BAD"));

    let outcome = engine
        .write_batch(vec![
            record("A", "A Corp"),
            record("BAD", "Bad Corp"),
            record("C", "C Corp"),
        ])
        .await
        .unwrap();

    let symbols: Vec<&str> = outcome.inserted.iter().map(|s| s.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["A", "C"]);
    assert_eq!(outcome.failed_count(), 1);
    assert_eq!(outcome.failed[0].index, 1);
    assert!(outcome.failed[0].reason.contains("0x00"));
    assert_eq!(engine.store().count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_sync_upsert_store_rejection_is_per_record() {
    let engine = SyncEngine::new(RejectingStore::new("BAD"));

    let outcome = engine
        .sync_upsert(vec![
            record("A", "A Corp"),
            record("BAD", "Bad Corp"),
            record("C", "C Corp"),
        ])
        .await
        .unwrap();

    assert_eq!(outcome.inserted_count(), 2);
    assert_eq!(outcome.failed[0].index, 1);
}

#[tokio::test]
async fn test_write_batch_all_invalid_fails() {
    let engine = engine();

    let err = engine
        .write_batch(vec![
            SymbolData::new("", "No Ticker", "NASDAQ", "EQUITY"),
            SymbolData::new("X", "No Market", "", "EQUITY"),
        ])
        .await
        .unwrap_err();

    let outcome = err.outcome().unwrap();
    assert!(matches!(err, SyncError::BatchFailed { .. }));
    assert_eq!(outcome.failed_count(), 2);
    assert_eq!(engine.store().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_write_batch_empty() {
    let engine = engine();
    let outcome = engine.write_batch(Vec::<SymbolRecord>::new()).await.unwrap();
    assert_eq!(outcome.total(), 0);
}

#[tokio::test]
async fn test_write_batch_aborts_on_connection_loss() {
    let engine = SyncEngine::new(FlakyStore::new(2));

    let err = engine
        .write_batch(vec![
            record("A", "A Corp"),
            record("B", "B Corp"),
            record("C", "C Corp"),
            record("D", "D Corp"),
        ])
        .await
        .unwrap_err();

    match err {
        SyncError::BatchAborted { outcome, source } => {
            assert!(matches!(source, StoreError::Connection(_)));
            assert_eq!(outcome.inserted_count(), 2);

            // 장애가 난 레코드와 시도하지 못한 레코드 모두 인덱스와 함께 남는다.
            let failed: Vec<(usize, &str)> = outcome
                .failed
                .iter()
                .map(|f| (f.index, f.symbol.as_str()))
                .collect();
            assert_eq!(failed, vec![(2, "C"), (3, "D")]);
            assert!(outcome.failed[0].reason.contains("connection reset"));
            assert_eq!(outcome.failed[1].reason, NOT_ATTEMPTED);
            assert_eq!(outcome.total(), 4);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // 중단 전에 저장된 레코드는 남아 있다.
    assert_eq!(engine.store().count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_sync_upsert_refreshes_existing() {
    let engine = engine();
    engine.write_one(record("AAPL", "Apple")).await.unwrap();

    let outcome = engine
        .sync_upsert(vec![
            SymbolData::new("AAPL", "Apple Inc.", "NASDAQ", "EQUITY"),
            SymbolData::new("TSLA", "Tesla, Inc.", "NASDAQ", "EQUITY"),
            SymbolData::new("", "Broken", "NASDAQ", "EQUITY"),
        ])
        .await
        .unwrap();

    assert_eq!(
        outcome.summary(),
        BatchSummary {
            inserted: 1,
            updated: 1,
            duplicate_skipped: 0,
            failed: 1,
        }
    );
    assert_eq!(outcome.updated[0].symbol, "AAPL");
    assert_eq!(outcome.inserted[0].symbol, "TSLA");
    assert_eq!(engine.store().count().await.unwrap(), 2);

    let apple = engine.find_one(&key("AAPL")).await.unwrap().unwrap();
    assert_eq!(apple.name, "Apple Inc.");
}

#[tokio::test]
async fn test_sync_upsert_aborts_on_timeout() {
    let engine = SyncEngine::new(FlakyStore::new(1));

    let err = engine
        .sync_upsert(vec![
            record("A", "A Corp"),
            record("B", "B Corp"),
            record("C", "C Corp"),
        ])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SyncError::BatchAborted { source: StoreError::Timeout(_), .. }
    ));

    let outcome = err.outcome().unwrap();
    assert_eq!(outcome.inserted_count(), 1);
    let failed: Vec<usize> = outcome.failed.iter().map(|f| f.index).collect();
    assert_eq!(failed, vec![1, 2]);
    assert!(outcome.failed[0].reason.contains("timeout"));
    assert_eq!(outcome.failed[1].reason, NOT_ATTEMPTED);
}
