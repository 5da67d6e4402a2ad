//! 레코드 검증 에러.

use thiserror::Error;

/// 심볼 레코드 검증 실패.
///
/// 자동 재시도 대상이 아니며 항상 호출자에게 그대로 전달됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 필수 필드가 없거나 공백뿐임
    #[error("필수 필드가 비어 있습니다: {field}")]
    EmptyField {
        /// 필드 이름 (symbol, name, market, instrument)
        field: &'static str,
    },

    /// NUL 등 제어 문자가 포함됨 (저장소가 TEXT로 받을 수 없음)
    #[error("제어 문자가 포함되어 있습니다: {field}")]
    ControlCharacter {
        /// 필드 이름
        field: &'static str,
    },

    /// upsert 키와 레코드의 (symbol, market)이 다름
    #[error("키 불일치: 기대값 {expected}, 레코드 {actual}")]
    KeyMismatch {
        /// 요청된 키
        expected: String,
        /// 레코드에서 계산된 키
        actual: String,
    },
}

impl ValidationError {
    /// 문제가 된 필드 이름을 반환합니다.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::EmptyField { field } | Self::ControlCharacter { field } => Some(*field),
            Self::KeyMismatch { .. } => None,
        }
    }
}
