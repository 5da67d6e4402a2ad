//! 종목 수집 모듈.

pub mod import_export;
pub mod symbol_sync;

pub use import_export::{export_sources, import_file, read_candidates, write_records};
pub use symbol_sync::{build_sources, sync_from_sources, sync_symbols, SourceSelection};
