//! NYSE 상장 종목 Provider.
//!
//! nyse.com의 `POST /api/quotes/filter` JSON API를 상품 구분(EQUITY, REIT 등)별로
//! 페이지 단위 조회합니다. 응답 첫 행의 `total`로 전체 건수를 알 수 있습니다.

use async_trait::async_trait;
use listing_core::SymbolRecord;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{ensure_success, FetchParams, ListingSource, SourceSettings};
use crate::error::SourceError;

const DEFAULT_BASE_URL: &str = "https://www.nyse.com";
const FILTER_PATH: &str = "/api/quotes/filter";
const MARKET: &str = "NYSE";
/// 응답의 `total`이 이상할 때를 대비한 페이지 상한.
const MAX_PAGES: u32 = 500;

/// 기본 조회 상품 구분.
pub const DEFAULT_INSTRUMENTS: [&str; 2] = ["EQUITY", "REIT"];

/// quotes filter 요청 본문.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NyseFilterRequest {
    pub instrument_type: String,
    pub page_number: u32,
    pub sort_column: String,
    pub sort_order: String,
    pub max_results_per_page: u32,
    pub filter_token: String,
}

impl NyseFilterRequest {
    pub fn new(instrument_type: &str, page_number: u32, max_results_per_page: u32) -> Self {
        Self {
            instrument_type: instrument_type.to_string(),
            page_number,
            sort_column: "NORMALIZED_TICKER".to_string(),
            sort_order: "ASC".to_string(),
            max_results_per_page,
            filter_token: String::new(),
        }
    }
}

/// quotes filter 응답 행.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NyseQuote {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub normalized_ticker: Option<String>,
    #[serde(default)]
    pub instrument_name: Option<String>,
    #[serde(default)]
    pub symbol_exchange_ticker: Option<String>,
    #[serde(default)]
    pub exchange_id: Option<String>,
    #[serde(default)]
    pub instrument_type: Option<String>,
    #[serde(default)]
    pub symbol_ticker: Option<String>,
    #[serde(default)]
    pub mic_code: Option<String>,
}

impl NyseQuote {
    /// 정규화된 레코드로 변환합니다. 티커는 `normalizedTicker`를 우선 사용합니다.
    pub fn to_record(&self, instrument: &str) -> Option<SymbolRecord> {
        let symbol = self
            .normalized_ticker
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.symbol_exchange_ticker.as_deref())?;
        let name = self.instrument_name.as_deref()?;

        let record = SymbolRecord::new(symbol, name, MARKET, instrument)
            .and_then(|record| record.with_url(self.url.as_deref().unwrap_or_default()));

        match record {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(symbol, error = %e, "NYSE 행 건너뜀");
                None
            }
        }
    }
}

/// NYSE 종목 Provider.
pub struct NyseListingSource {
    base_url: String,
    settings: SourceSettings,
}

impl NyseListingSource {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            settings: SourceSettings::default(),
        }
    }

    /// 엔드포인트 호스트를 바꿉니다 (테스트 서버).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_settings(mut self, settings: SourceSettings) -> Self {
        self.settings = settings;
        self
    }

    /// 한 페이지 조회.
    async fn fetch_page(
        &self,
        client: &reqwest::Client,
        request: &NyseFilterRequest,
    ) -> Result<Vec<NyseQuote>, SourceError> {
        let url = format!("{}{}", self.base_url, FILTER_PATH);

        debug!(
            instrument = %request.instrument_type,
            page = request.page_number,
            "NYSE 페이지 요청"
        );

        let response = client
            .post(&url)
            .header("Accept", "application/json")
            .json(request)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        // 빈 결과는 배열 대신 null로 오는 경우가 있다.
        let body = response.text().await?;
        let quotes: Option<Vec<NyseQuote>> = serde_json::from_str(&body)?;
        Ok(quotes.unwrap_or_default())
    }

    /// 상품 구분 하나의 전체 페이지 조회.
    async fn fetch_instrument(
        &self,
        client: &reqwest::Client,
        instrument: &str,
        params: &FetchParams,
        remaining: Option<usize>,
    ) -> Result<Vec<SymbolRecord>, SourceError> {
        let page_size = params.max_results_per_page.max(1);
        let mut records = Vec::new();
        let mut seen: u64 = 0;

        for page in 1..=MAX_PAGES {
            if page > 1 {
                tokio::time::sleep(self.settings.request_delay).await;
            }

            let request = NyseFilterRequest::new(instrument, page, page_size);
            let quotes = self.fetch_page(client, &request).await?;
            if quotes.is_empty() {
                break;
            }

            let total = quotes.first().and_then(|q| q.total);
            seen += quotes.len() as u64;
            let short_page = quotes.len() < page_size as usize;

            records.extend(quotes.iter().filter_map(|q| q.to_record(instrument)));

            if let Some(limit) = remaining {
                if records.len() >= limit {
                    records.truncate(limit);
                    break;
                }
            }
            if short_page || total.is_some_and(|t| seen >= t) {
                break;
            }
        }

        info!(instrument, count = records.len(), "NYSE 종목 수집");
        Ok(records)
    }
}

impl Default for NyseListingSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ListingSource for NyseListingSource {
    fn name(&self) -> &str {
        "NYSE"
    }

    fn market(&self) -> &str {
        MARKET
    }

    async fn fetch_candidates(
        &self,
        params: &FetchParams,
    ) -> Result<Vec<SymbolRecord>, SourceError> {
        let client = self.settings.build_client()?;
        let instruments: Vec<String> = if params.instruments.is_empty() {
            DEFAULT_INSTRUMENTS.iter().map(|s| s.to_string()).collect()
        } else {
            params.instruments.iter().map(|s| s.trim().to_uppercase()).collect()
        };

        let mut all = Vec::new();

        for (i, instrument) in instruments.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.settings.request_delay).await;
            }

            let remaining = params.limit.map(|l| l.saturating_sub(all.len()));
            if remaining == Some(0) {
                break;
            }

            let records = self
                .fetch_instrument(&client, instrument, params, remaining)
                .await?;
            all.extend(records);
        }

        info!(count = all.len(), "NYSE 종목 수집 완료");
        Ok(all)
    }
}
