//! 종목 저장 및 수집.
//!
//! 이 crate는 다음을 제공합니다:
//! - 심볼 저장소 trait과 PostgreSQL/메모리 구현
//! - 거래소별 상장 종목 Provider (NASDAQ, NYSE)
//! - 수집 결과를 저장된 상태와 맞추는 동기화 엔진

pub mod error;
pub mod provider;
pub mod storage;
pub mod sync;

pub use error::{Result, SourceError, StoreError, SyncError};

// 저장소 타입 재내보내기
pub use storage::{
    Database, DatabaseConfig, InsertManyReport, MemorySymbolStore, PgSymbolStore, SymbolStore,
};

// 종목 Provider 재내보내기
pub use provider::{
    FetchParams, ListingSource, NasdaqListingSource, NyseListingSource, SourceSettings,
};

pub use sync::{SyncEngine, NOT_ATTEMPTED};
