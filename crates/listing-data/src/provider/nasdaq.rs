//! NASDAQ 상장 종목 Provider.
//!
//! nasdaqtrader.com의 `nasdaqlisted.txt`를 내려받아 파싱합니다.
//!
//! ```text
//! Symbol|Security Name|Market Category|Test Issue|Financial Status|Round Lot Size|ETF|NextShares
//! AAPL|Apple Inc. - Common Stock|Q|N|N|100|N|N
//! ...
//! File Creation Time: 0101202522:01|||||||
//! ```

use async_trait::async_trait;
use listing_core::SymbolRecord;
use tracing::{debug, info};

use super::{ensure_success, FetchParams, ListingSource, SourceSettings};
use crate::error::SourceError;

const DEFAULT_BASE_URL: &str = "https://www.nasdaqtrader.com";
const LISTED_PATH: &str = "/dynamic/symdir/nasdaqlisted.txt";
const MARKET: &str = "NASDAQ";
const QUOTE_URL: &str = "https://www.nasdaq.com/market-activity/stocks";

/// NASDAQ 종목 Provider.
pub struct NasdaqListingSource {
    base_url: String,
    settings: SourceSettings,
}

impl NasdaqListingSource {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            settings: SourceSettings::default(),
        }
    }

    /// 엔드포인트 호스트를 바꿉니다 (미러, 테스트 서버).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_settings(mut self, settings: SourceSettings) -> Self {
        self.settings = settings;
        self
    }

    /// 원문 텍스트 다운로드.
    async fn download(&self) -> Result<String, SourceError> {
        let client = self.settings.build_client()?;
        let url = format!("{}{}", self.base_url, LISTED_PATH);

        info!(url = %url, "NASDAQ 종목 목록 다운로드");

        let response = client.get(&url).send().await?;
        let response = ensure_success(response).await?;
        Ok(response.text().await?)
    }
}

impl Default for NasdaqListingSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ListingSource for NasdaqListingSource {
    fn name(&self) -> &str {
        "NASDAQ Trader"
    }

    fn market(&self) -> &str {
        MARKET
    }

    async fn fetch_candidates(
        &self,
        params: &FetchParams,
    ) -> Result<Vec<SymbolRecord>, SourceError> {
        let text = self.download().await?;
        let mut records = parse_nasdaq_listed(&text)?;

        if let Some(limit) = params.limit {
            records.truncate(limit);
        }

        info!(count = records.len(), "NASDAQ 종목 수집 완료");
        Ok(records)
    }
}

/// 파이프 구분 NASDAQ 목록 파싱.
///
/// 첫 줄은 헤더, 마지막 `File Creation Time` 줄은 메타데이터입니다.
/// 필드 수가 부족한 줄, 티커/종목명이 빈 줄, 테스트 종목은 건너뜁니다.
/// `ETF` 컬럼이 `Y`이면 상품 구분은 `ETF`, 아니면 `EQUITY`입니다.
/// 각 레코드에는 nasdaq.com 시세 페이지 URL이 붙습니다.
pub fn parse_nasdaq_listed(text: &str) -> Result<Vec<SymbolRecord>, SourceError> {
    let lines: Vec<&str> = text
        .trim()
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .collect();

    if lines.len() < 2 {
        return Err(SourceError::Parse("Invalid data format".to_string()));
    }

    let headers: Vec<&str> = lines[0].split('|').map(str::trim).collect();
    let column = |name: &str| headers.iter().position(|h| *h == name);

    let symbol_idx =
        column("Symbol").ok_or_else(|| SourceError::MissingColumn("Symbol".to_string()))?;
    let name_idx = column("Security Name")
        .ok_or_else(|| SourceError::MissingColumn("Security Name".to_string()))?;
    let etf_idx = column("ETF");
    let test_idx = column("Test Issue");

    let body = match lines.last() {
        Some(last) if last.starts_with("File Creation Time") => &lines[1..lines.len() - 1],
        _ => &lines[1..],
    };

    let mut records = Vec::with_capacity(body.len());
    let mut skipped = 0usize;

    for line in body {
        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() < headers.len() {
            skipped += 1;
            continue;
        }

        if flag(&fields, test_idx) {
            skipped += 1;
            continue;
        }

        let instrument = if flag(&fields, etf_idx) { "ETF" } else { "EQUITY" };

        let symbol = fields[symbol_idx].trim();
        let record = SymbolRecord::new(symbol, fields[name_idx], MARKET, instrument).and_then(
            |record| record.with_url(&format!("{}/{}", QUOTE_URL, symbol.to_lowercase())),
        );

        match record {
            Ok(record) => records.push(record),
            Err(e) => {
                debug!(line = %line, error = %e, "NASDAQ 행 건너뜀");
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        debug!(skipped, "NASDAQ 목록에서 건너뛴 행");
    }

    Ok(records)
}

/// `Y`/`N` 플래그 컬럼 값. 컬럼이 없으면 `false`.
fn flag(fields: &[&str], idx: Option<usize>) -> bool {
    idx.and_then(|i| fields.get(i))
        .map(|v| v.trim().eq_ignore_ascii_case("Y"))
        .unwrap_or(false)
}
