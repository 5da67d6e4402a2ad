//! 종목 동기화 모듈.

use std::time::Instant;

use listing_data::{
    FetchParams, ListingSource, NasdaqListingSource, NyseListingSource, SymbolStore, SyncEngine,
    SyncError,
};

use crate::config::{SourcesConfig, SyncMode};
use crate::{CollectorConfig, Result, SyncStats};

/// 동기화 대상 거래소
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SourceSelection {
    Nasdaq,
    Nyse,
    /// 설정에서 활성화된 모든 거래소
    #[default]
    All,
}

/// 설정과 선택에 맞는 Provider 목록 생성
pub fn build_sources(
    sources: &SourcesConfig,
    selection: SourceSelection,
) -> Vec<Box<dyn ListingSource>> {
    let settings = sources.settings();
    let mut list: Vec<Box<dyn ListingSource>> = Vec::new();

    let want_nasdaq = match selection {
        SourceSelection::Nasdaq => true,
        SourceSelection::Nyse => false,
        SourceSelection::All => sources.enable_nasdaq,
    };
    let want_nyse = match selection {
        SourceSelection::Nasdaq => false,
        SourceSelection::Nyse => true,
        SourceSelection::All => sources.enable_nyse,
    };

    if want_nasdaq {
        let mut source = NasdaqListingSource::new().with_settings(settings.clone());
        if let Some(url) = &sources.nasdaq_base_url {
            source = source.with_base_url(url.clone());
        }
        list.push(Box::new(source));
    }

    if want_nyse {
        let mut source = NyseListingSource::new().with_settings(settings);
        if let Some(url) = &sources.nyse_base_url {
            source = source.with_base_url(url.clone());
        }
        list.push(Box::new(source));
    }

    list
}

/// 설정 기반 종목 동기화
pub async fn sync_symbols<S: SymbolStore>(
    engine: &SyncEngine<S>,
    config: &CollectorConfig,
    selection: SourceSelection,
    mode: SyncMode,
    limit: Option<usize>,
) -> Result<SyncStats> {
    let sources = build_sources(&config.sources, selection);
    let params = config.sources.fetch_params(limit);
    sync_from_sources(engine, &sources, &params, mode).await
}

/// Provider별로 종목을 조회해 저장합니다.
///
/// 한 Provider의 조회 실패나 배치 전체 실패는 기록만 하고 다음 Provider로 넘어갑니다.
/// 연결 장애로 배치가 중단되면 남은 Provider도 실패할 것이므로 즉시 에러를 반환합니다.
pub async fn sync_from_sources<S: SymbolStore>(
    engine: &SyncEngine<S>,
    sources: &[Box<dyn ListingSource>],
    params: &FetchParams,
    mode: SyncMode,
) -> Result<SyncStats> {
    let start = Instant::now();
    let mut stats = SyncStats::new();

    tracing::info!(sources = sources.len(), mode = ?mode, "종목 동기화 시작");

    for source in sources {
        stats.sources += 1;
        tracing::info!(source = source.name(), "종목 조회 시작");

        let candidates = match source.fetch_candidates(params).await {
            Ok(candidates) => candidates,
            Err(e) => {
                stats.source_errors += 1;
                tracing::error!(source = source.name(), error = %e, "종목 조회 실패");
                continue;
            }
        };

        stats.fetched += candidates.len();

        let result = match mode {
            SyncMode::Insert => engine.write_batch(candidates).await,
            SyncMode::Upsert => engine.sync_upsert(candidates).await,
        };

        match result {
            Ok(outcome) => {
                stats.record(&outcome);
                tracing::info!(
                    source = source.name(),
                    inserted = outcome.inserted_count(),
                    updated = outcome.updated_count(),
                    duplicate_skipped = outcome.duplicate_count(),
                    failed = outcome.failed_count(),
                    "종목 저장 완료"
                );
            }
            Err(SyncError::BatchFailed { outcome }) => {
                stats.record(&outcome);
                stats.source_errors += 1;
                tracing::error!(source = source.name(), "모든 종목 저장 실패");
            }
            Err(e) => {
                if let Some(outcome) = e.outcome() {
                    stats.record(outcome);
                }
                stats.elapsed = start.elapsed();
                stats.log_summary("종목 동기화 (중단)");
                return Err(e.into());
            }
        }
    }

    stats.elapsed = start.elapsed();
    Ok(stats)
}
