//! Fixed Field Extractor
//!
//! 表の絶対座標から文書レベルのスカラー値（作成者、版、日付など）を読み取ります。

use tracing::debug;

use crate::config::FieldPosition;
use crate::types::{CellCoord, CellValue, PlaceholderMapping, RawTable};

/// 固定フィールドの抽出
#[derive(Debug, Clone, Copy)]
pub struct FixedFieldExtractor<'a> {
    fields: &'a [FieldPosition],
}

impl<'a> FixedFieldExtractor<'a> {
    pub fn new(fields: &'a [FieldPosition]) -> Self {
        Self { fields }
    }

    /// 設定されたすべての固定フィールドを抽出する
    ///
    /// 範囲外・空セル・エラー値は空文字列になります。
    /// それ以外は文書にそのまま載せる値なので、空白除去や大文字小文字の変換は行いません。
    pub fn extract(&self, table: &RawTable) -> PlaceholderMapping {
        self.fields
            .iter()
            .map(|field| {
                let value = match table.get(field.row, field.col) {
                    None => {
                        let cell = CellCoord::new(field.row as u32, field.col as u32);
                        debug!(
                            field = %field.name,
                            cell = %cell.to_a1_notation(),
                            "Fixed field cell is out of range"
                        );
                        String::new()
                    }
                    Some(CellValue::Empty) | Some(CellValue::Error(_)) => String::new(),
                    Some(cell) => cell.as_raw_string(),
                };
                (field.name.clone(), value)
            })
            .collect()
    }
}
