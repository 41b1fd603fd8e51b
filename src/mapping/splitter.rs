//! Region Splitter
//!
//! 表からキー列（階層レベル + 職名の2列）とデータ列を切り出し、
//! 行数の整合性を検証します。

use tracing::{debug, warn};

use crate::config::{RegionLayout, KEY_COLUMN_SPAN};
use crate::error::SheetMergeError;
use crate::mapping::Record;
use crate::types::{CellValue, RawTable};

/// キー列の1行
#[derive(Debug, Clone, PartialEq)]
struct KeyRow {
    source_row: usize,
    level_hierarchy: CellValue,
    job_title: CellValue,
}

/// 整列済みのレコード領域
///
/// 不変条件: キー行数とデータ行数は常に等しい。
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRegion {
    keys: Vec<KeyRow>,
    data: Vec<Vec<CellValue>>,
}

impl RecordRegion {
    /// レコード数
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// レコードが存在しないかどうか
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// 指定位置のレコードを生成
    pub fn record(&self, index: usize) -> Option<Record> {
        let key = self.keys.get(index)?;
        let data = self.data.get(index)?;

        let level_hierarchy = key.level_hierarchy.as_raw_string();
        let job_title = key.job_title.as_raw_string();

        let mut attributes = Vec::with_capacity(KEY_COLUMN_SPAN + data.len());
        attributes.push(level_hierarchy.clone());
        attributes.push(job_title.clone());
        attributes.extend(data.iter().map(CellValue::as_raw_string));

        Some(Record {
            index,
            source_row: key.source_row,
            level_hierarchy,
            job_title,
            attributes,
        })
    }

    /// キー列の値を走査 `(source_row, level_hierarchy, job_title)`
    pub(crate) fn key_cells(&self) -> impl Iterator<Item = (usize, &CellValue, &CellValue)> {
        self.keys
            .iter()
            .map(|k| (k.source_row, &k.level_hierarchy, &k.job_title))
    }
}

/// 表をレコード領域に分割する
#[derive(Debug, Clone, Copy)]
pub struct RegionSplitter {
    layout: RegionLayout,
}

impl RegionSplitter {
    pub fn new(layout: RegionLayout) -> Self {
        Self { layout }
    }

    /// 表を分割してレコード領域を生成する
    ///
    /// 1. 両方の列で空白セル（空文字列・空白のみ）を欠損に正規化
    /// 2. キー列に欠損を含む行をキー列からのみ除去（データ列は除去しない）
    /// 3. キー行数とデータ行数が異なる場合は`SheetMergeError::Alignment`
    ///
    /// # 戻り値
    ///
    /// * `Ok(RecordRegion)` - 行数が一致した場合
    /// * `Err(SheetMergeError::Alignment)` - 行数が一致しない場合（部分的な対応付けは行わない）
    pub fn split(&self, table: &RawTable) -> Result<RecordRegion, SheetMergeError> {
        let layout = &self.layout;

        let mut keys = Vec::new();
        let mut dropped = 0usize;
        for source_row in layout.key_start_row..table.row_count() {
            let level_hierarchy = normalize_blank(table.get(source_row, layout.key_start_col));
            let job_title = normalize_blank(table.get(source_row, layout.key_start_col + 1));

            if level_hierarchy.is_empty() || job_title.is_empty() {
                dropped += 1;
                continue;
            }

            keys.push(KeyRow {
                source_row,
                level_hierarchy,
                job_title,
            });
        }

        let data: Vec<Vec<CellValue>> = (layout.data_start_row..table.row_count())
            .map(|row| {
                table
                    .row(row)
                    .and_then(|cells| cells.get(layout.data_start_col..))
                    .map(|cells| cells.iter().map(|c| normalize_blank(Some(c))).collect())
                    .unwrap_or_default()
            })
            .collect();

        debug!(
            key_rows = keys.len(),
            dropped_key_rows = dropped,
            data_rows = data.len(),
            "Split record region"
        );

        if keys.len() != data.len() {
            warn!(
                key_rows = keys.len(),
                dropped_key_rows = dropped,
                data_rows = data.len(),
                "Key rows and data rows are misaligned"
            );
            return Err(SheetMergeError::Alignment {
                key_rows: keys.len(),
                data_rows: data.len(),
            });
        }

        Ok(RecordRegion { keys, data })
    }
}

/// 空白セルを欠損（`CellValue::Empty`）に正規化
fn normalize_blank(cell: Option<&CellValue>) -> CellValue {
    match cell {
        Some(value) if !value.is_blank() => value.clone(),
        _ => CellValue::Empty,
    }
}
