//! 메모리 기반 심볼 저장소.
//!
//! 드라이런 모드와 테스트에서 PostgreSQL 대신 사용합니다. 모든 변경은 하나의
//! write lock 안에서 이루어지므로 같은 키에 대한 동시 upsert도 레코드를 하나만 남깁니다.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use listing_core::{StoredSymbol, SymbolKey, SymbolRecord, UpsertOutcome};
use tokio::sync::RwLock;

use super::SymbolStore;
use crate::error::{Result, StoreError};

/// 메모리 저장소.
#[derive(Debug, Default)]
pub struct MemorySymbolStore {
    records: RwLock<HashMap<SymbolKey, StoredSymbol>>,
}

impl MemorySymbolStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 모든 레코드를 키 순서로 반환합니다.
    pub async fn snapshot(&self) -> Vec<StoredSymbol> {
        let records = self.records.read().await;
        let mut all: Vec<StoredSymbol> = records.values().cloned().collect();
        all.sort_by(|a, b| (&a.market, &a.symbol).cmp(&(&b.market, &b.symbol)));
        all
    }
}

#[async_trait]
impl SymbolStore for MemorySymbolStore {
    async fn insert(&self, record: &SymbolRecord) -> Result<StoredSymbol> {
        let key = record.key();
        let mut records = self.records.write().await;

        if records.contains_key(&key) {
            return Err(StoreError::Duplicate(format!(
                "symbols_symbol_market_key: {}",
                key
            )));
        }

        let stored = StoredSymbol::from_record(record);
        records.insert(key, stored.clone());
        Ok(stored)
    }

    async fn find_one(&self, key: &SymbolKey) -> Result<Option<StoredSymbol>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn find_one_and_replace(
        &self,
        key: &SymbolKey,
        record: &SymbolRecord,
    ) -> Result<UpsertOutcome> {
        let mut records = self.records.write().await;

        let outcome = match records.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().replace_with(record);
                UpsertOutcome::Updated(entry.get().clone())
            }
            Entry::Vacant(entry) => {
                UpsertOutcome::Inserted(entry.insert(StoredSymbol::from_record(record)).clone())
            }
        };

        Ok(outcome)
    }

    async fn find_one_and_delete(&self, key: &SymbolKey) -> Result<Option<StoredSymbol>> {
        Ok(self.records.write().await.remove(key))
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.records.read().await.len() as i64)
    }

    async fn count_by_market(&self) -> Result<Vec<(String, i64)>> {
        let records = self.records.read().await;
        let mut counts: BTreeMap<String, i64> = BTreeMap::new();
        for key in records.keys() {
            *counts.entry(key.market().to_string()).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(symbol: &str, name: &str, market: &str) -> SymbolRecord {
        SymbolRecord::new(symbol, name, market, "EQUITY").unwrap()
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_key() {
        let store = MemorySymbolStore::new();
        store.insert(&record("AAPL", "Apple Inc.", "NASDAQ")).await.unwrap();

        let err = store
            .insert(&record("aapl", "Apple Again", "nasdaq"))
            .await
            .unwrap_err();

        assert!(err.is_duplicate());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_same_symbol_in_other_market_is_distinct() {
        let store = MemorySymbolStore::new();
        store.insert(&record("ABC", "Abc Corp", "NYSE")).await.unwrap();
        store.insert(&record("ABC", "Abc Holdings", "NASDAQ")).await.unwrap();

        assert_eq!(
            store.count_by_market().await.unwrap(),
            vec![("NASDAQ".to_string(), 1), ("NYSE".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn test_replace_keeps_id_and_created_at() {
        let store = MemorySymbolStore::new();
        let first = store.insert(&record("IBM", "IBM", "NYSE")).await.unwrap();

        let key = SymbolKey::new("IBM", "NYSE").unwrap();
        let outcome = store
            .find_one_and_replace(&key, &record("IBM", "International Business Machines", "NYSE"))
            .await
            .unwrap();

        assert!(!outcome.is_inserted());
        let replaced = outcome.into_stored();
        assert_eq!(replaced.id, first.id);
        assert_eq!(replaced.created_at, first.created_at);
        assert_eq!(replaced.name, "International Business Machines");
    }

    #[tokio::test]
    async fn test_replace_missing_key_inserts() {
        let store = MemorySymbolStore::new();
        let key = SymbolKey::new("TSLA", "NASDAQ").unwrap();

        let outcome = store
            .find_one_and_replace(&key, &record("TSLA", "Tesla, Inc.", "NASDAQ"))
            .await
            .unwrap();

        assert!(outcome.is_inserted());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_leave_one_record() {
        let store = Arc::new(MemorySymbolStore::new());
        let key = SymbolKey::new("RACE", "NYSE").unwrap();

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                let key = key.clone();
                tokio::spawn(async move {
                    let record = record("RACE", &format!("Race {i}"), "NYSE");
                    store.find_one_and_replace(&key, &record).await
                })
            })
            .collect();

        let mut inserted = 0;
        for task in tasks {
            if task.await.unwrap().unwrap().is_inserted() {
                inserted += 1;
            }
        }

        assert_eq!(inserted, 1);
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_returns_none() {
        let store = MemorySymbolStore::new();
        let key = SymbolKey::new("NONE", "NYSE").unwrap();
        assert!(store.find_one_and_delete(&key).await.unwrap().is_none());
    }
}
