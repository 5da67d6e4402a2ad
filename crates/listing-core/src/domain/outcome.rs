//! 쓰기 작업 결과 타입.

use serde::{Deserialize, Serialize};

use super::symbol::{StoredSymbol, SymbolKey};

/// 배치에서 실패한 레코드 한 건.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRecord {
    /// 입력 배치에서의 위치
    pub index: usize,
    /// 입력 그대로의 티커 (검증 실패 시 비어 있을 수 있음)
    pub symbol: String,
    /// 입력 그대로의 시장
    pub market: String,
    /// 실패 사유
    pub reason: String,
}

/// 배치 쓰기 결과.
///
/// 한 번의 호출 동안만 존재하며 저장되지 않습니다. 각 목록은 입력 순서를 따릅니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// 새로 저장된 레코드
    pub inserted: Vec<StoredSymbol>,
    /// upsert로 기존 레코드를 교체한 결과
    pub updated: Vec<StoredSymbol>,
    /// 이미 존재해서 건너뛴 키
    pub duplicates: Vec<SymbolKey>,
    /// 검증 실패, 저장소 거부, 배치 중단으로 시도하지 못한 레코드
    pub failed: Vec<FailedRecord>,
}

/// 건수만 담은 배치 요약.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub inserted: usize,
    pub updated: usize,
    pub duplicate_skipped: usize,
    pub failed: usize,
}

impl BatchOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inserted_count(&self) -> usize {
        self.inserted.len()
    }

    pub fn updated_count(&self) -> usize {
        self.updated.len()
    }

    pub fn duplicate_count(&self) -> usize {
        self.duplicates.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// 처리된 전체 레코드 수.
    pub fn total(&self) -> usize {
        self.inserted_count() + self.updated_count() + self.duplicate_count() + self.failed_count()
    }

    /// 모든 레코드가 중복이 아닌 사유로 실패했는지 확인합니다.
    pub fn all_failed(&self) -> bool {
        !self.failed.is_empty()
            && self.inserted.is_empty()
            && self.updated.is_empty()
            && self.duplicates.is_empty()
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            inserted: self.inserted_count(),
            updated: self.updated_count(),
            duplicate_skipped: self.duplicate_count(),
            failed: self.failed_count(),
        }
    }

    /// 다른 배치 결과를 뒤에 이어 붙입니다.
    pub fn merge(&mut self, other: BatchOutcome) {
        self.inserted.extend(other.inserted);
        self.updated.extend(other.updated);
        self.duplicates.extend(other.duplicates);
        self.failed.extend(other.failed);
    }

    /// 요약 로그 출력.
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total(),
            inserted = self.inserted_count(),
            updated = self.updated_count(),
            duplicate_skipped = self.duplicate_count(),
            failed = self.failed_count(),
            "배치 쓰기 완료"
        );
    }
}

/// upsert 한 건의 결과. 새로 삽입했는지 기존 레코드를 교체했는지 구분합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted(StoredSymbol),
    Updated(StoredSymbol),
}

impl UpsertOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }

    pub fn stored(&self) -> &StoredSymbol {
        match self {
            Self::Inserted(stored) | Self::Updated(stored) => stored,
        }
    }

    pub fn into_stored(self) -> StoredSymbol {
        match self {
            Self::Inserted(stored) | Self::Updated(stored) => stored,
        }
    }
}

/// 삭제 결과. 대상이 없는 것은 에러가 아닙니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// 삭제된 레코드
    Deleted(StoredSymbol),
    /// 일치하는 레코드 없음
    NotFound,
}

impl DeleteOutcome {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// 삭제된 레코드가 있으면 반환합니다.
    pub fn into_deleted(self) -> Option<StoredSymbol> {
        match self {
            Self::Deleted(stored) => Some(stored),
            Self::NotFound => None,
        }
    }
}

impl From<Option<StoredSymbol>> for DeleteOutcome {
    fn from(value: Option<StoredSymbol>) -> Self {
        value.map_or(Self::NotFound, Self::Deleted)
    }
}
