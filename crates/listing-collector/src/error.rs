//! 에러 타입 정의.

use listing_data::{SourceError, StoreError, SyncError};
use thiserror::Error;

/// Collector 에러 타입
#[derive(Debug, Error)]
pub enum CollectorError {
    /// 설정 에러
    #[error("Configuration error: {0}")]
    Config(String),

    /// 저장소 에러
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// 동기화 에러
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// 데이터 소스 에러 (NASDAQ, NYSE)
    #[error("Data source error: {0}")]
    Source(#[from] SourceError),

    /// 파일 입출력 에러
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 직렬화 에러
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<config::ConfigError> for CollectorError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
