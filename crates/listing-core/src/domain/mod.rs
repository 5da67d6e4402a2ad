//! 도메인 모델.

mod outcome;
mod symbol;

pub use outcome::{BatchOutcome, BatchSummary, DeleteOutcome, FailedRecord, UpsertOutcome};
pub use symbol::{IntoSymbolRecord, StoredSymbol, SymbolData, SymbolKey, SymbolRecord};
