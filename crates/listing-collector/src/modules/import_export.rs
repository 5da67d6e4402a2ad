//! JSON 파일 가져오기/내보내기.
//!
//! 파일 형식은 종목 객체의 배열입니다. 상품 구분은 `instrument` 또는 `instr` 키를 받습니다.
//!
//! ```json
//! [{"symbol": "AAPL", "name": "Apple Inc.", "market": "NASDAQ", "instr": "EQUITY"}]
//! ```

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use listing_core::{BatchOutcome, SymbolData, SymbolRecord};
use listing_data::{FetchParams, ListingSource, SymbolStore, SyncEngine};

use crate::config::SyncMode;
use crate::Result;

/// 파일에서 종목 후보를 읽습니다. 검증은 동기화 엔진이 합니다.
pub fn read_candidates(path: &Path) -> Result<Vec<SymbolData>> {
    let reader = BufReader::new(File::open(path)?);
    let candidates: Vec<SymbolData> = serde_json::from_reader(reader)?;

    tracing::debug!(path = %path.display(), count = candidates.len(), "종목 파일 로드");
    Ok(candidates)
}

/// 종목 레코드를 JSON 배열로 씁니다.
pub fn write_records<W: Write>(writer: W, records: &[SymbolRecord]) -> Result<()> {
    let data: Vec<SymbolData> = records.iter().cloned().map(SymbolData::from).collect();

    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, &data)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// 파일의 종목을 저장합니다.
pub async fn import_file<S: SymbolStore>(
    engine: &SyncEngine<S>,
    path: &Path,
    mode: SyncMode,
) -> Result<BatchOutcome> {
    let candidates = read_candidates(path)?;

    tracing::info!(path = %path.display(), count = candidates.len(), mode = ?mode, "종목 가져오기");

    let outcome = match mode {
        SyncMode::Insert => engine.write_batch(candidates).await?,
        SyncMode::Upsert => engine.sync_upsert(candidates).await?,
    };
    Ok(outcome)
}

/// Provider에서 종목을 조회해 파일(없으면 표준 출력)로 내보냅니다.
///
/// 조회에 실패한 Provider가 있으면 아무것도 쓰지 않고 에러를 반환합니다.
pub async fn export_sources(
    sources: &[Box<dyn ListingSource>],
    params: &FetchParams,
    output: Option<&Path>,
) -> Result<usize> {
    let mut records = Vec::new();
    for source in sources {
        let fetched = source.fetch_candidates(params).await?;
        tracing::info!(source = source.name(), count = fetched.len(), "종목 조회 완료");
        records.extend(fetched);
    }

    match output {
        Some(path) => {
            write_records(File::create(path)?, &records)?;
            tracing::info!(path = %path.display(), count = records.len(), "종목 내보내기 완료");
        }
        None => write_records(io::stdout().lock(), &records)?,
    }

    Ok(records.len())
}
