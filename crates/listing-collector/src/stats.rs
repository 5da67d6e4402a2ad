//! 동기화 통계 구조체.

use std::time::Duration;

use listing_core::BatchOutcome;
use serde::{Deserialize, Serialize};

/// 동기화 작업 통계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStats {
    /// 처리한 Provider 수
    pub sources: usize,
    /// 실패한 Provider 수 (조회 실패 또는 배치 전체 실패)
    pub source_errors: usize,
    /// 수집한 후보 수
    pub fetched: usize,
    /// 새로 저장된 레코드 수
    pub inserted: usize,
    /// upsert로 교체된 레코드 수
    pub updated: usize,
    /// 중복으로 건너뛴 레코드 수
    pub duplicate_skipped: usize,
    /// 실패한 레코드 수
    pub failed: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl SyncStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 배치 결과 반영
    pub fn record(&mut self, outcome: &BatchOutcome) {
        self.inserted += outcome.inserted_count();
        self.updated += outcome.updated_count();
        self.duplicate_skipped += outcome.duplicate_count();
        self.failed += outcome.failed_count();
    }

    /// 처리된 레코드 수
    pub fn processed(&self) -> usize {
        self.inserted + self.updated + self.duplicate_skipped + self.failed
    }

    /// 성공률 계산 (%). 중복은 성공으로 봅니다.
    pub fn success_rate(&self) -> f64 {
        let processed = self.processed();
        if processed == 0 {
            0.0
        } else {
            ((self.inserted + self.updated + self.duplicate_skipped) as f64 / processed as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            sources = self.sources,
            source_errors = self.source_errors,
            fetched = self.fetched,
            inserted = self.inserted,
            updated = self.updated,
            duplicate_skipped = self.duplicate_skipped,
            failed = self.failed,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "동기화 완료"
        );
    }
}
