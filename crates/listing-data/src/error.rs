//! 데이터 모듈 오류 타입.

use listing_core::{BatchOutcome, ValidationError};
use thiserror::Error;

/// 저장소(Persistence Gateway) 오류.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 고유 제약 조건 위반 (symbol, market 중복)
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// 레코드 단위로 거부됨 (무결성 제약, 데이터 예외, 인코딩 실패)
    #[error("Record rejected: {0}")]
    Rejected(String),

    /// 레코드를 찾을 수 없음
    #[error("Record not found: {0}")]
    NotFound(String),

    /// 데이터베이스 연결 오류
    #[error("Database connection error: {0}")]
    Connection(String),

    /// 연결 풀 소진
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// 타임아웃 오류
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// 쿼리 실행 오류
    #[error("Query error: {0}")]
    QueryError(String),

    /// 마이그레이션 오류
    #[error("Migration error: {0}")]
    MigrationError(String),
}

impl StoreError {
    /// 연결 단위 장애인지 확인합니다.
    ///
    /// 연결 끊김, 풀 소진, 타임아웃만 해당합니다. 그 밖의 오류는 해당 레코드만 실패로
    /// 기록하고 배치를 계속 진행합니다.
    pub fn is_systemic(&self) -> bool {
        matches!(
            self,
            StoreError::Connection(_) | StoreError::PoolExhausted | StoreError::Timeout(_)
        )
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("Row not found".to_string()),
            sqlx::Error::PoolTimedOut => StoreError::PoolExhausted,
            sqlx::Error::PoolClosed => StoreError::Connection("pool closed".to_string()),
            sqlx::Error::Io(e) => StoreError::Connection(e.to_string()),
            sqlx::Error::Tls(e) => StoreError::Connection(e.to_string()),
            sqlx::Error::Protocol(msg) => StoreError::Connection(msg),
            sqlx::Error::WorkerCrashed => StoreError::Connection("worker crashed".to_string()),
            sqlx::Error::Encode(e) => StoreError::Rejected(e.to_string()),
            sqlx::Error::Decode(e) => StoreError::Rejected(e.to_string()),
            sqlx::Error::ColumnDecode { index, source } => {
                StoreError::Rejected(format!("column {}: {}", index, source))
            }
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().unwrap_or_default();
                let message = db_err.message().to_string();
                match code.get(..2).unwrap_or_default() {
                    // PostgreSQL 고유 제약 조건 위반
                    _ if code == "23505" => StoreError::Duplicate(message),
                    // 23xxx 무결성 제약, 22xxx 데이터 예외 (22021 NUL 바이트 등)
                    "23" | "22" => StoreError::Rejected(message),
                    // 08 연결 예외, 53 자원 부족, 57 운영자 개입 (57014 statement timeout 포함)
                    "08" | "53" | "57" => StoreError::Connection(message),
                    _ => StoreError::QueryError(message),
                }
            }
            sqlx::Error::Migrate(e) => StoreError::MigrationError(e.to_string()),
            _ => StoreError::QueryError(err.to_string()),
        }
    }
}

/// 거래소 어댑터 오류.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP 요청 실패
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// 2xx가 아닌 응답
    #[error("HTTP error {status}: {body}")]
    Status { status: u16, body: String },

    /// 응답 형식 오류
    #[error("Parse error: {0}")]
    Parse(String),

    /// 필수 컬럼 누락
    #[error("Required column not found: {0}")]
    MissingColumn(String),
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(err.to_string())
    }
}

/// 동기화 엔진 오류.
#[derive(Debug, Error)]
pub enum SyncError {
    /// 레코드 검증 실패
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// (symbol, market)이 이미 존재함
    #[error("Duplicate key: {symbol}@{market}")]
    DuplicateKey { symbol: String, market: String },

    /// 저장소/네트워크 오류 (그대로 전달)
    #[error("Store error: {0}")]
    Transport(#[from] StoreError),

    /// 연결 장애로 배치 중단. 이미 저장된 레코드는 롤백되지 않음
    #[error(
        "Batch aborted, {} of {} records failed: {source}",
        .outcome.failed_count(),
        .outcome.total()
    )]
    BatchAborted {
        outcome: BatchOutcome,
        #[source]
        source: StoreError,
    },

    /// 배치의 모든 레코드가 중복이 아닌 사유로 실패
    #[error("All {} records in batch failed", .outcome.failed_count())]
    BatchFailed { outcome: BatchOutcome },
}

impl SyncError {
    /// 배치 오류가 가진 부분 결과를 반환합니다.
    pub fn outcome(&self) -> Option<&BatchOutcome> {
        match self {
            SyncError::BatchAborted { outcome, .. } | SyncError::BatchFailed { outcome } => {
                Some(outcome)
            }
            _ => None,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, SyncError::DuplicateKey { .. })
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
