//! 거래소 상장 종목 Provider 모듈.
//!
//! 각 거래소의 공개 엔드포인트에서 종목 목록을 받아 정규화된
//! [`SymbolRecord`] 목록으로 변환합니다. 동기화 엔진은 이 결과를 이미 검증된
//! 입력으로 취급하며 원문을 다시 파싱하지 않습니다.
//!
//! ## NASDAQ
//! - `NasdaqListingSource`: nasdaqtrader.com의 파이프(`|`) 구분 텍스트 파일
//!
//! ## NYSE
//! - `NyseListingSource`: nyse.com quotes filter JSON API (페이지 단위)

pub mod nasdaq;
pub mod nyse;

use std::time::Duration;

use async_trait::async_trait;
use listing_core::SymbolRecord;

use crate::error::SourceError;

pub use nasdaq::NasdaqListingSource;
pub use nyse::NyseListingSource;

/// 브라우저와 비슷한 User-Agent. 일부 거래소 API는 기본 UA를 거부한다.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// 종목 조회 파라미터.
#[derive(Debug, Clone)]
pub struct FetchParams {
    /// 조회할 상품 구분 (비어 있으면 Provider 기본값)
    pub instruments: Vec<String>,
    /// 페이지당 최대 결과 수 (페이지 API에만 적용)
    pub max_results_per_page: u32,
    /// 반환할 최대 레코드 수
    pub limit: Option<usize>,
}

impl Default for FetchParams {
    fn default() -> Self {
        Self {
            instruments: Vec::new(),
            max_results_per_page: 1000,
            limit: None,
        }
    }
}

impl FetchParams {
    pub fn with_instruments<I, S>(mut self, instruments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instruments = instruments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// HTTP 요청 설정.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    /// 요청 타임아웃
    pub timeout: Duration,
    /// 연속 요청 사이의 고정 딜레이
    pub request_delay: Duration,
    /// User-Agent 헤더
    pub user_agent: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            request_delay: Duration::from_millis(500),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl SourceSettings {
    pub(crate) fn build_client(&self) -> Result<reqwest::Client, SourceError> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.clone())
            .build()
            .map_err(SourceError::from)
    }
}

/// 거래소 종목 Provider trait.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Provider 이름.
    fn name(&self) -> &str;

    /// 생성하는 레코드의 시장 (예: NASDAQ).
    fn market(&self) -> &str;

    /// 종목 후보 목록 조회.
    async fn fetch_candidates(&self, params: &FetchParams)
        -> Result<Vec<SymbolRecord>, SourceError>;

    /// 티커 또는 종목명으로 검색 (대소문자 무시).
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SymbolRecord>, SourceError> {
        let all = self.fetch_candidates(&FetchParams::default()).await?;
        let query_upper = query.trim().to_uppercase();

        Ok(all
            .into_iter()
            .filter(|r| {
                r.symbol().contains(&query_upper) || r.name().to_uppercase().contains(&query_upper)
            })
            .take(limit)
            .collect())
    }
}

/// 2xx가 아니면 본문을 담아 에러로 변환합니다.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(SourceError::Status {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource(Vec<SymbolRecord>);

    #[async_trait]
    impl ListingSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        fn market(&self) -> &str {
            "NASDAQ"
        }

        async fn fetch_candidates(
            &self,
            _params: &FetchParams,
        ) -> Result<Vec<SymbolRecord>, SourceError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_search_matches_symbol_or_name() {
        let source = FixedSource(vec![
            SymbolRecord::new("AAPL", "Apple Inc.", "NASDAQ", "EQUITY").unwrap(),
            SymbolRecord::new("MSFT", "Microsoft Corporation", "NASDAQ", "EQUITY").unwrap(),
            SymbolRecord::new("APLE", "Apple Hospitality REIT", "NASDAQ", "EQUITY").unwrap(),
        ]);

        let found = source.search("apple", 10).await.unwrap();
        assert_eq!(found.len(), 2);

        let found = source.search("msft", 10).await.unwrap();
        assert_eq!(found[0].symbol(), "MSFT");

        let limited = source.search("A", 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_fetch_params_builder() {
        let params = FetchParams::default()
            .with_instruments(["REIT"])
            .with_limit(5);
        assert_eq!(params.instruments, vec!["REIT".to_string()]);
        assert_eq!(params.limit, Some(5));
        assert_eq!(params.max_results_per_page, 1000);
    }
}
