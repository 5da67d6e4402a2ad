//! Standalone listing collector.
//!
//! 이 crate는 거래소 상장 종목을 수집해 저장하는 바이너리를 제공합니다:
//! - 종목 동기화 (NASDAQ, NYSE)
//! - JSON 파일 가져오기/내보내기
//! - 주기 실행 데몬

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::{CollectorConfig, SyncMode};
pub use error::{CollectorError, Result};
pub use stats::SyncStats;
