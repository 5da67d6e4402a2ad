//! 거래소 상장 종목 동기화의 핵심 도메인 타입.
//!
//! 이 crate는 다음을 제공합니다:
//! - 심볼 레코드 모델과 `(symbol, market)` 복합 키
//! - 배치/삭제 결과 타입
//! - 레코드 검증 에러
//! - tracing 로깅 초기화

pub mod domain;
pub mod error;
pub mod logging;

pub use domain::*;
pub use error::ValidationError;
