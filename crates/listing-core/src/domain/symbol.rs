//! 심볼 레코드 모델.
//!
//! 거래소 어댑터가 만든 후보 레코드와 저장된 레코드의 형태를 정의합니다.
//! 레코드의 정체성은 저장소가 부여한 id가 아니라 `(symbol, market)` 복합 키입니다.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// 검증 전 원시 심볼 데이터.
///
/// JSON 파일이나 외부 피드에서 그대로 역직렬화됩니다. 누락된 필드는 빈
/// 문자열이 되어 파싱이 아닌 검증 단계에서 거부됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolData {
    /// 티커 (예: aapl, IBM)
    #[serde(default)]
    pub symbol: String,
    /// 종목명
    #[serde(default)]
    pub name: String,
    /// 시장 (예: nasdaq, NYSE)
    #[serde(default)]
    pub market: String,
    /// 상품 구분 (예: EQUITY, REIT)
    #[serde(default, alias = "instr")]
    pub instrument: String,
    /// 거래소 시세 페이지 (선택)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl SymbolData {
    pub fn new(
        symbol: impl Into<String>,
        name: impl Into<String>,
        market: impl Into<String>,
        instrument: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            market: market.into(),
            instrument: instrument.into(),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// 정규화·검증이 끝난 심볼 레코드.
///
/// `symbol`과 `market`은 대문자, 필수 필드는 trim된 비어 있지 않은 문자열입니다.
/// 어느 필드에도 제어 문자는 들어갈 수 없습니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "SymbolData", into = "SymbolData")]
pub struct SymbolRecord {
    symbol: String,
    name: String,
    market: String,
    instrument: String,
    url: Option<String>,
}

impl SymbolRecord {
    /// 필드를 검증하고 정규화하여 레코드를 생성합니다.
    pub fn new(
        symbol: &str,
        name: &str,
        market: &str,
        instrument: &str,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            symbol: normalize_upper("symbol", symbol)?,
            name: normalize_trim("name", name)?,
            market: normalize_upper("market", market)?,
            instrument: normalize_trim("instrument", instrument)?,
            url: None,
        })
    }

    /// 시세 페이지 URL을 붙입니다. 공백뿐이면 없는 것으로 봅니다.
    pub fn with_url(mut self, url: &str) -> Result<Self, ValidationError> {
        self.url = match normalize_trim("url", url) {
            Ok(url) => Some(url),
            Err(ValidationError::EmptyField { .. }) => None,
            Err(e) => return Err(e),
        };
        Ok(self)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn market(&self) -> &str {
        &self.market
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// 복합 키 `(symbol, market)`.
    pub fn key(&self) -> SymbolKey {
        SymbolKey {
            symbol: self.symbol.clone(),
            market: self.market.clone(),
        }
    }
}

impl TryFrom<SymbolData> for SymbolRecord {
    type Error = ValidationError;

    fn try_from(data: SymbolData) -> Result<Self, Self::Error> {
        let record = Self::new(&data.symbol, &data.name, &data.market, &data.instrument)?;
        match data.url {
            Some(url) => record.with_url(&url),
            None => Ok(record),
        }
    }
}

impl From<SymbolRecord> for SymbolData {
    fn from(record: SymbolRecord) -> Self {
        Self {
            symbol: record.symbol,
            name: record.name,
            market: record.market,
            instrument: record.instrument,
            url: record.url,
        }
    }
}

impl fmt::Display for SymbolRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({})", self.symbol, self.market, self.name)
    }
}

/// 레코드로 변환 가능한 후보.
///
/// 동기화 엔진은 원시 [`SymbolData`]와 이미 검증된 [`SymbolRecord`]를 모두
/// 받기 때문에 `TryInto` 대신 이 trait으로 변환 에러 타입을 고정합니다.
pub trait IntoSymbolRecord {
    /// 검증 전 입력의 (티커, 시장). 실패 보고에 사용합니다.
    fn raw_key(&self) -> (String, String);

    fn into_symbol_record(self) -> Result<SymbolRecord, ValidationError>;
}

impl IntoSymbolRecord for SymbolRecord {
    fn raw_key(&self) -> (String, String) {
        (self.symbol.clone(), self.market.clone())
    }

    fn into_symbol_record(self) -> Result<SymbolRecord, ValidationError> {
        Ok(self)
    }
}

impl IntoSymbolRecord for SymbolData {
    fn raw_key(&self) -> (String, String) {
        (self.symbol.clone(), self.market.clone())
    }

    fn into_symbol_record(self) -> Result<SymbolRecord, ValidationError> {
        SymbolRecord::try_from(self)
    }
}

/// 레코드 정체성인 복합 키.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolKey {
    symbol: String,
    market: String,
}

impl SymbolKey {
    /// 키를 정규화(trim + 대문자)하여 생성합니다.
    pub fn new(symbol: &str, market: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            symbol: normalize_upper("symbol", symbol)?,
            market: normalize_upper("market", market)?,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn market(&self) -> &str {
        &self.market
    }
}

impl fmt::Display for SymbolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.symbol, self.market)
    }
}

/// 저장된 심볼 레코드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::FromRow))]
pub struct StoredSymbol {
    /// 저장소가 부여한 id (정체성으로 사용하지 않음)
    pub id: Uuid,
    pub symbol: String,
    pub name: String,
    pub market: String,
    pub instrument: String,
    pub url: Option<String>,
    /// 최초 삽입 시각
    pub created_at: DateTime<Utc>,
    /// 마지막 변경 시각
    pub updated_at: DateTime<Utc>,
}

impl StoredSymbol {
    /// 새 레코드를 현재 시각으로 만듭니다. 메모리 저장소에서 사용합니다.
    pub fn from_record(record: &SymbolRecord) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            symbol: record.symbol.clone(),
            name: record.name.clone(),
            market: record.market.clone(),
            instrument: record.instrument.clone(),
            url: record.url.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> SymbolKey {
        SymbolKey {
            symbol: self.symbol.clone(),
            market: self.market.clone(),
        }
    }

    /// 가변 필드(name, instrument, url)를 교체하고 `updated_at`을 갱신합니다.
    pub fn replace_with(&mut self, record: &SymbolRecord) {
        self.name = record.name.clone();
        self.instrument = record.instrument.clone();
        self.url = record.url.clone();
        self.updated_at = Utc::now();
    }

    /// 저장값이 레코드와 같은 내용인지 확인합니다 (id/시각 제외).
    pub fn matches(&self, record: &SymbolRecord) -> bool {
        self.symbol == record.symbol
            && self.name == record.name
            && self.market == record.market
            && self.instrument == record.instrument
            && self.url == record.url
    }
}

fn normalize_trim(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    if trimmed.chars().any(char::is_control) {
        return Err(ValidationError::ControlCharacter { field });
    }
    Ok(trimmed.to_string())
}

fn normalize_upper(field: &'static str, value: &str) -> Result<String, ValidationError> {
    normalize_trim(field, value).map(|v| v.to_uppercase())
}
