//! 동기화 엔진.
//!
//! 새로 수집한 종목 후보를 저장된 상태와 맞춥니다. 단건 작업은 오류를 그대로
//! 전달하고, 배치 작업은 레코드 단위 실패(검증, 중복, 거부)를 결과에 기록한 채
//! 계속 진행합니다. 연결 장애는 배치를 중단시키며 그때까지의 부분 결과를
//! [`SyncError::BatchAborted`]에 담아 반환합니다. 중단을 일으킨 레코드와 시도하지
//! 못한 레코드도 입력 인덱스와 함께 `failed`에 남습니다.

use listing_core::{
    BatchOutcome, DeleteOutcome, FailedRecord, IntoSymbolRecord, StoredSymbol, SymbolKey,
    SymbolRecord, UpsertOutcome, ValidationError,
};
use tracing::{debug, error, instrument, warn};

use crate::error::{StoreError, SyncError};
use crate::storage::SymbolStore;

/// 연결 장애 이후 시도하지 않은 레코드의 실패 사유.
pub const NOT_ATTEMPTED: &str = "배치 중단으로 시도하지 않음";

/// 배치 내 레코드 하나의 처리 결과.
enum Slot {
    Inserted(StoredSymbol),
    Updated(StoredSymbol),
    Duplicate(SymbolKey),
    Failed(FailedRecord),
}

/// 입력 인덱스 순으로 정렬해 결과를 만든다.
fn assemble(mut slots: Vec<(usize, Slot)>) -> BatchOutcome {
    slots.sort_by_key(|(index, _)| *index);

    let mut outcome = BatchOutcome::new();
    for (_, slot) in slots {
        match slot {
            Slot::Inserted(stored) => outcome.inserted.push(stored),
            Slot::Updated(stored) => outcome.updated.push(stored),
            Slot::Duplicate(key) => outcome.duplicates.push(key),
            Slot::Failed(failed) => outcome.failed.push(failed),
        }
    }
    outcome
}

fn failed(index: usize, symbol: String, market: String, reason: impl ToString) -> Slot {
    Slot::Failed(FailedRecord {
        index,
        symbol,
        market,
        reason: reason.to_string(),
    })
}

fn record_failed(index: usize, record: &SymbolRecord, reason: impl ToString) -> Slot {
    failed(
        index,
        record.symbol().to_string(),
        record.market().to_string(),
        reason,
    )
}

impl From<UpsertOutcome> for Slot {
    fn from(outcome: UpsertOutcome) -> Self {
        match outcome {
            UpsertOutcome::Inserted(stored) => Slot::Inserted(stored),
            UpsertOutcome::Updated(stored) => Slot::Updated(stored),
        }
    }
}

/// 배치 종료 판정: 중단, 전체 실패, 정상.
fn finish(
    operation: &str,
    outcome: BatchOutcome,
    aborted: Option<StoreError>,
) -> Result<BatchOutcome, SyncError> {
    if let Some(source) = aborted {
        error!(
            operation,
            inserted = outcome.inserted_count(),
            updated = outcome.updated_count(),
            duplicate_skipped = outcome.duplicate_count(),
            failed = outcome.failed_count(),
            error = %source,
            "연결 장애로 배치 중단"
        );
        return Err(SyncError::BatchAborted { outcome, source });
    }

    if outcome.all_failed() {
        error!(operation, failed = outcome.failed_count(), "배치의 모든 레코드 실패");
        return Err(SyncError::BatchFailed { outcome });
    }

    outcome.log_summary(operation);
    Ok(outcome)
}

/// 동기화 엔진.
///
/// 저장소 핸들을 명시적으로 받아 소유합니다.
pub struct SyncEngine<S> {
    store: S,
}

impl<S: SymbolStore> SyncEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 레코드 한 건을 새로 저장합니다.
    ///
    /// 키가 이미 있으면 [`SyncError::DuplicateKey`]를 반환하며 기존 레코드는 바뀌지 않습니다.
    #[instrument(skip(self, candidate))]
    pub async fn write_one<C: IntoSymbolRecord>(
        &self,
        candidate: C,
    ) -> Result<StoredSymbol, SyncError> {
        let record = candidate.into_symbol_record()?;

        match self.store.insert(&record).await {
            Ok(stored) => {
                debug!(symbol = %stored.symbol, market = %stored.market, "저장 완료");
                Ok(stored)
            }
            Err(e) if e.is_duplicate() => Err(SyncError::DuplicateKey {
                symbol: record.symbol().to_string(),
                market: record.market().to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// 여러 레코드를 새로 저장합니다 (fail-soft).
    ///
    /// 검증 실패와 저장소 거부는 `failed`에, 이미 있는 키는 `duplicates`에 기록합니다.
    /// 모든 레코드가 중복이 아닌 사유로 실패하면 [`SyncError::BatchFailed`]입니다.
    /// 연결 장애로 중단되면 장애가 난 레코드는 그 오류로, 남은 레코드는
    /// [`NOT_ATTEMPTED`]로 `failed`에 기록됩니다.
    #[instrument(skip(self, candidates))]
    pub async fn write_batch<I, C>(&self, candidates: I) -> Result<BatchOutcome, SyncError>
    where
        I: IntoIterator<Item = C>,
        C: IntoSymbolRecord,
    {
        let mut slots = Vec::new();
        let mut indices = Vec::new();
        let mut records = Vec::new();

        for (index, candidate) in candidates.into_iter().enumerate() {
            let (symbol, market) = candidate.raw_key();
            match candidate.into_symbol_record() {
                Ok(record) => {
                    indices.push(index);
                    records.push(record);
                }
                Err(e) => {
                    warn!(index, symbol = %symbol, error = %e, "검증 실패");
                    slots.push((index, failed(index, symbol, market, e)));
                }
            }
        }

        if slots.is_empty() && records.is_empty() {
            return Ok(BatchOutcome::new());
        }

        let mut aborted = None;

        if !records.is_empty() {
            let report = self.store.insert_many(&records).await;

            for (position, result) in report.attempts {
                let index = indices[position];
                let record = &records[position];

                let slot = match result {
                    Ok(stored) => Slot::Inserted(stored),
                    Err(e) if e.is_duplicate() => {
                        debug!(index, key = %record.key(), "중복 건너뜀");
                        Slot::Duplicate(record.key())
                    }
                    Err(e) => {
                        warn!(index, key = %record.key(), error = %e, "저장소가 레코드 거부");
                        record_failed(index, record, e)
                    }
                };
                slots.push((index, slot));
            }

            if let Some((position, e)) = report.aborted {
                let index = indices[position];
                slots.push((index, record_failed(index, &records[position], &e)));
                aborted = Some(e);
            }

            for position in report.not_attempted {
                let index = indices[position];
                slots.push((index, record_failed(index, &records[position], NOT_ATTEMPTED)));
            }
        }

        finish("write_batch", assemble(slots), aborted)
    }

    /// 키에 해당하는 레코드를 후보로 교체하거나, 없으면 새로 저장합니다.
    ///
    /// 후보의 (symbol, market)은 `key`와 같아야 합니다.
    #[instrument(skip(self, candidate), fields(key = %key))]
    pub async fn upsert<C: IntoSymbolRecord>(
        &self,
        key: &SymbolKey,
        candidate: C,
    ) -> Result<StoredSymbol, SyncError> {
        let record = candidate.into_symbol_record()?;
        ensure_key(key, &record)?;

        let outcome = self.store.find_one_and_replace(key, &record).await?;
        debug!(inserted = outcome.is_inserted(), "upsert 완료");
        Ok(outcome.into_stored())
    }

    /// 키에 해당하는 레코드를 삭제합니다. 대상이 없어도 오류가 아닙니다.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn delete_one(&self, key: &SymbolKey) -> Result<DeleteOutcome, SyncError> {
        let outcome = DeleteOutcome::from(self.store.find_one_and_delete(key).await?);
        if outcome.is_not_found() {
            debug!("삭제 대상 없음");
        }
        Ok(outcome)
    }

    pub async fn find_one(&self, key: &SymbolKey) -> Result<Option<StoredSymbol>, SyncError> {
        Ok(self.store.find_one(key).await?)
    }

    /// 모든 후보를 upsert합니다 (전체 갱신).
    ///
    /// 새 키는 `inserted`에, 기존 키는 `updated`에 기록됩니다. 실패 처리는
    /// [`Self::write_batch`]와 같습니다.
    #[instrument(skip(self, candidates))]
    pub async fn sync_upsert<I, C>(&self, candidates: I) -> Result<BatchOutcome, SyncError>
    where
        I: IntoIterator<Item = C>,
        C: IntoSymbolRecord,
    {
        let mut slots = Vec::new();
        let mut aborted = None;

        for (index, candidate) in candidates.into_iter().enumerate() {
            let (symbol, market) = candidate.raw_key();
            if aborted.is_some() {
                slots.push((index, failed(index, symbol, market, NOT_ATTEMPTED)));
                continue;
            }

            let record = match candidate.into_symbol_record() {
                Ok(record) => record,
                Err(e) => {
                    warn!(index, symbol = %symbol, error = %e, "검증 실패");
                    slots.push((index, failed(index, symbol, market, e)));
                    continue;
                }
            };

            match self.store.find_one_and_replace(&record.key(), &record).await {
                Ok(outcome) => slots.push((index, Slot::from(outcome))),
                Err(e) if e.is_systemic() => {
                    slots.push((index, record_failed(index, &record, &e)));
                    aborted = Some(e);
                }
                Err(e) => {
                    warn!(index, key = %record.key(), error = %e, "저장소가 레코드 거부");
                    slots.push((index, record_failed(index, &record, e)));
                }
            }
        }

        if slots.is_empty() {
            return Ok(BatchOutcome::new());
        }

        finish("sync_upsert", assemble(slots), aborted)
    }
}

fn ensure_key(key: &SymbolKey, record: &SymbolRecord) -> Result<(), ValidationError> {
    let actual = record.key();
    if &actual != key {
        return Err(ValidationError::KeyMismatch {
            expected: key.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}
