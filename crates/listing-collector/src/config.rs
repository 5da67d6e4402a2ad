//! 설정 모듈.
//!
//! 두 가지 방식으로 로드할 수 있습니다.
//! - [`CollectorConfig::from_env`]: `.env`와 환경변수 (`DATABASE_URL` 필수)
//! - [`CollectorConfig::load`]: TOML 파일 + `LISTING__*` 환경변수 오버라이드

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use listing_data::{DatabaseConfig, FetchParams, SourceSettings};
use serde::{Deserialize, Serialize};

use crate::error::CollectorError;
use crate::Result;

/// Collector 전체 설정
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// 데이터베이스 설정
    pub database: DatabaseConfig,
    /// 거래소 Provider 설정
    #[serde(default)]
    pub sources: SourcesConfig,
    /// 동기화 설정
    #[serde(default)]
    pub sync: SyncConfig,
    /// 데몬 모드 설정
    #[serde(default)]
    pub daemon: DaemonConfig,
}

/// 거래소 Provider 설정
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// NASDAQ 수집 활성화
    pub enable_nasdaq: bool,
    /// NYSE 수집 활성화
    pub enable_nyse: bool,
    /// 연속 요청 간 딜레이 (밀리초)
    pub request_delay_ms: u64,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// NASDAQ 엔드포인트 호스트 (미지정 시 기본값)
    pub nasdaq_base_url: Option<String>,
    /// NYSE 엔드포인트 호스트 (미지정 시 기본값)
    pub nyse_base_url: Option<String>,
    /// NYSE 조회 상품 구분
    pub nyse_instruments: Vec<String>,
    /// NYSE 페이지 크기
    pub nyse_page_size: u32,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            enable_nasdaq: true,
            enable_nyse: true,
            request_delay_ms: 500,
            timeout_secs: 30,
            nasdaq_base_url: None,
            nyse_base_url: None,
            nyse_instruments: vec!["EQUITY".to_string(), "REIT".to_string()],
            nyse_page_size: 1000,
        }
    }
}

impl SourcesConfig {
    /// HTTP 요청 설정으로 변환
    pub fn settings(&self) -> SourceSettings {
        SourceSettings {
            timeout: Duration::from_secs(self.timeout_secs),
            request_delay: Duration::from_millis(self.request_delay_ms),
            ..Default::default()
        }
    }

    /// 조회 파라미터 생성
    pub fn fetch_params(&self, limit: Option<usize>) -> FetchParams {
        FetchParams {
            instruments: self.nyse_instruments.clone(),
            max_results_per_page: self.nyse_page_size,
            limit,
        }
    }
}

/// 저장 방식
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// 새 종목만 추가 (기존 종목은 중복으로 건너뜀)
    #[default]
    Insert,
    /// 모든 종목을 최신 값으로 교체
    Upsert,
}

impl FromStr for SyncMode {
    type Err = CollectorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "insert" => Ok(Self::Insert),
            "upsert" => Ok(Self::Upsert),
            other => Err(CollectorError::Config(format!("알 수 없는 동기화 모드: {}", other))),
        }
    }
}

/// 동기화 설정
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// 기본 저장 방식
    pub mode: SyncMode,
}

/// 데몬 모드 설정
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// 워크플로우 실행 주기 (분 단위)
    pub interval_minutes: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 1440,
        }
    }
}

impl DaemonConfig {
    /// 워크플로우 실행 주기를 Duration으로 반환
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.max(1) * 60)
    }
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let url = std::env::var("DATABASE_URL").map_err(|_| {
            CollectorError::Config("DATABASE_URL 환경변수가 설정되지 않았습니다".to_string())
        })?;

        let database = DatabaseConfig {
            max_connections: env_var_parse("DB_MAX_CONNECTIONS", 10),
            acquire_timeout_secs: env_var_parse("DB_ACQUIRE_TIMEOUT_SECS", 5),
            statement_timeout_secs: env_var_parse("DB_STATEMENT_TIMEOUT_SECS", 45),
            ..DatabaseConfig::with_url(url)
        };

        let defaults = SourcesConfig::default();
        let sources = SourcesConfig {
            enable_nasdaq: env_var_bool("SOURCE_NASDAQ", defaults.enable_nasdaq),
            enable_nyse: env_var_bool("SOURCE_NYSE", defaults.enable_nyse),
            request_delay_ms: env_var_parse("SOURCE_REQUEST_DELAY_MS", defaults.request_delay_ms),
            timeout_secs: env_var_parse("SOURCE_TIMEOUT_SECS", defaults.timeout_secs),
            nasdaq_base_url: std::env::var("NASDAQ_BASE_URL").ok(),
            nyse_base_url: std::env::var("NYSE_BASE_URL").ok(),
            nyse_instruments: env_var_list("NYSE_INSTRUMENTS").unwrap_or(defaults.nyse_instruments),
            nyse_page_size: env_var_parse("NYSE_PAGE_SIZE", defaults.nyse_page_size),
        };

        let mode = match std::env::var("SYNC_MODE") {
            Ok(value) => value.parse()?,
            Err(_) => SyncMode::default(),
        };

        Ok(Self {
            database,
            sources,
            sync: SyncConfig { mode },
            daemon: DaemonConfig {
                interval_minutes: env_var_parse(
                    "DAEMON_INTERVAL_MINUTES",
                    DaemonConfig::default().interval_minutes,
                ),
            },
        })
    }

    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// `DATABASE_URL`이 설정되어 있으면 `database.url`보다 우선합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder()
            // 파일에서 로드
            .add_source(config::File::from(path.as_ref()))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("LISTING")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("sources.nyse_instruments"),
            );

        if let Ok(url) = std::env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", url)?;
        }

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// 환경변수에서 bool 값 파싱
fn env_var_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

/// 쉼표로 구분된 목록 (비어 있으면 None)
fn env_var_list(key: &str) -> Option<Vec<String>> {
    let items: Vec<String> = std::env::var(key)
        .ok()?
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();

    (!items.is_empty()).then_some(items)
}
