//! 심볼 저장소 (Persistence Gateway).
//!
//! 동기화 엔진은 [`SymbolStore`] trait만 알고, 실제 저장 방식은 구현체가 결정합니다.
//! - [`postgres::PgSymbolStore`]: PostgreSQL (`symbols` 테이블)
//! - [`memory::MemorySymbolStore`]: 프로세스 메모리 (드라이런/테스트)
//!
//! 어느 구현이든 `(symbol, market)` 고유성을 저장소 차원에서 보장해야 하며,
//! 위반 시 [`StoreError::Duplicate`]를 반환해야 합니다.

pub mod memory;
pub mod postgres;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use listing_core::{StoredSymbol, SymbolKey, SymbolRecord, UpsertOutcome};
use tracing::{debug, warn};

use crate::error::{Result, StoreError};

pub use memory::MemorySymbolStore;
pub use postgres::{Database, DatabaseConfig, PgSymbolStore};

/// `insert_many` 결과.
///
/// 입력의 모든 인덱스는 `attempts`, `aborted`, `not_attempted` 중 정확히 한 곳에 나타납니다.
#[derive(Debug, Default)]
pub struct InsertManyReport {
    /// 시도한 레코드별 결과 (입력 인덱스, 결과). 완료 순서이며 정렬되지 않음
    pub attempts: Vec<(usize, Result<StoredSymbol>)>,
    /// 배치를 중단시킨 연결 장애와 그 레코드의 인덱스
    pub aborted: Option<(usize, StoreError)>,
    /// 중단 이후라 시도하지 않은 레코드 인덱스 (오름차순)
    pub not_attempted: Vec<usize>,
}

impl InsertManyReport {
    fn push(&mut self, index: usize, result: Result<StoredSymbol>) {
        match result {
            Err(e) if e.is_systemic() && self.aborted.is_none() => {
                warn!(index, error = %e, "연결 장애로 삽입 실패");
                self.aborted = Some((index, e));
            }
            result => self.attempts.push((index, result)),
        }
    }
}

/// 레코드별 삽입을 최대 `concurrency`개까지 동시에 실행합니다.
///
/// 연결 장애가 한 번 발생하면 아직 시작하지 않은 레코드는 시도하지 않고
/// `not_attempted`에 남기며, 이미 시작된 삽입은 끝까지 기다립니다.
/// 중단 이후 완료된 다른 연결 장애는 `attempts`에 레코드 실패로 남습니다.
pub async fn insert_buffered<F, Fut>(
    records: &[SymbolRecord],
    concurrency: usize,
    insert: F,
) -> InsertManyReport
where
    F: Fn(SymbolRecord) -> Fut,
    Fut: Future<Output = Result<StoredSymbol>>,
{
    let aborted = Arc::new(AtomicBool::new(false));

    let mut results = stream::iter(records.iter().cloned().enumerate())
        .map(|(index, record)| {
            let aborted = Arc::clone(&aborted);
            // 중단 이후에 시작되는 레코드는 시도하지 않는다.
            let attempt = (!aborted.load(Ordering::Acquire)).then(|| insert(record));
            async move {
                let attempt = match attempt {
                    Some(attempt) if !aborted.load(Ordering::Acquire) => attempt,
                    _ => return (index, None),
                };
                let result = attempt.await;
                if matches!(&result, Err(e) if e.is_systemic()) {
                    aborted.store(true, Ordering::Release);
                }
                (index, Some(result))
            }
        })
        .buffer_unordered(concurrency.max(1));

    let mut report = InsertManyReport::default();

    // 이미 시작된 삽입은 끝까지 기다린다.
    while let Some((index, result)) = results.next().await {
        match result {
            Some(result) => report.push(index, result),
            None => report.not_attempted.push(index),
        }
    }

    report.not_attempted.sort_unstable();
    if !report.not_attempted.is_empty() {
        warn!(
            skipped = report.not_attempted.len(),
            "배치 중단으로 시도하지 않은 레코드"
        );
    }
    debug!(attempted = report.attempts.len(), "insert_many 완료");

    report
}

/// 심볼 저장소 trait.
#[async_trait]
pub trait SymbolStore: Send + Sync {
    /// 새 레코드를 삽입합니다. 키가 이미 있으면 `StoreError::Duplicate`.
    async fn insert(&self, record: &SymbolRecord) -> Result<StoredSymbol>;

    /// 여러 레코드를 서로 독립적으로 삽입합니다 (continue-on-error).
    ///
    /// 레코드 단위 오류는 `attempts`에 기록하고 계속 진행합니다. 연결 장애가
    /// 발생하면 그 레코드는 `aborted`에, 남은 레코드는 `not_attempted`에 남깁니다.
    async fn insert_many(&self, records: &[SymbolRecord]) -> InsertManyReport {
        let mut report = InsertManyReport::default();

        for (index, record) in records.iter().enumerate() {
            if report.aborted.is_some() {
                report.not_attempted.push(index);
                continue;
            }
            let result = self.insert(record).await;
            report.push(index, result);
        }

        report
    }

    /// 키로 레코드를 조회합니다.
    async fn find_one(&self, key: &SymbolKey) -> Result<Option<StoredSymbol>>;

    /// 키에 해당하는 레코드의 가변 필드를 교체하거나, 없으면 삽입합니다.
    ///
    /// 고유성에 대해 원자적이어야 하며, 삽입인지 교체인지와 함께 저장된 레코드를 반환합니다.
    async fn find_one_and_replace(
        &self,
        key: &SymbolKey,
        record: &SymbolRecord,
    ) -> Result<UpsertOutcome>;

    /// 키에 해당하는 레코드를 삭제하고 반환합니다. 없으면 `None`.
    async fn find_one_and_delete(&self, key: &SymbolKey) -> Result<Option<StoredSymbol>>;

    /// 전체 레코드 수.
    async fn count(&self) -> Result<i64>;

    /// 시장별 레코드 수 (시장 이름순).
    async fn count_by_market(&self) -> Result<Vec<(String, i64)>>;
}
