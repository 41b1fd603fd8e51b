//! Mapping Module
//!
//! 行選択とフィールドマッピングのエンジン。
//! 表をレコード領域に分割し、複合キーで1件のレコードを解決して、
//! 固定フィールドと合わせたプレースホルダーマッピングを生成します。

mod engine;
mod extractor;
mod indexer;
mod projector;
mod splitter;

pub use engine::{FailureReason, Generation, GenerationState, MappingEngine};
pub use extractor::FixedFieldExtractor;
pub use indexer::{KeyCatalog, RecordIndexer};
pub use projector::FieldProjector;
pub use splitter::{RecordRegion, RegionSplitter};

/// レコード領域の1行（整列済み）
///
/// 選択のたびに生成される一時的な値で、キャッシュはしません。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// レコード領域内の位置（0始まり）
    pub index: usize,

    /// キー列が存在したシート上の行番号（0始まり）
    pub source_row: usize,

    /// 階層レベル（セルの値そのまま）
    pub level_hierarchy: String,

    /// 職名（セルの値そのまま）
    pub job_title: String,

    /// 属性列（0 = 階層レベル、1 = 職名、2以降 = データ列）
    pub attributes: Vec<String>,
}

impl Record {
    /// 指定オフセットの属性値（範囲外の場合は空文字列）
    pub fn attribute(&self, offset: usize) -> &str {
        self.attributes
            .get(offset)
            .map(String::as_str)
            .unwrap_or("")
    }
}
