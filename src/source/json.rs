//! JSON Snapshot Reader
//!
//! スプレッドシートAPIの応答（行のリスト）を保存したJSONを読み込みます。

use std::io::Read;

use serde_json::Value;

use crate::error::SheetMergeError;
use crate::security::SecurityConfig;
use crate::types::{CellValue, RawTable};

/// JSONのリストのリストを表に変換する
///
/// 文字列・数値・論理値はそれぞれ対応するセル値に、`null`は空セルになります。
/// 行がリストでない場合やセルがオブジェクト・配列の場合はエラーです。
pub(crate) fn read_json<R: Read>(
    reader: R,
    security: &SecurityConfig,
) -> Result<RawTable, SheetMergeError> {
    let buffer = security.read_input(reader)?;
    let rows: Vec<Vec<Value>> = serde_json::from_slice(&buffer)?;

    let rows = rows
        .into_iter()
        .enumerate()
        .map(|(r, row)| {
            row.into_iter()
                .enumerate()
                .map(|(c, value)| convert_value(value, r, c))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RawTable::new(rows))
}

fn convert_value(value: Value, row: usize, col: usize) -> Result<CellValue, SheetMergeError> {
    match value {
        Value::Null => Ok(CellValue::Empty),
        Value::String(s) => Ok(CellValue::String(s)),
        Value::Bool(b) => Ok(CellValue::Bool(b)),
        Value::Number(n) => n.as_f64().map(CellValue::Number).ok_or_else(|| {
            SheetMergeError::Config(format!("Unrepresentable number at ({}, {})", row, col))
        }),
        Value::Array(_) | Value::Object(_) => Err(SheetMergeError::Config(format!(
            "Nested value at ({}, {}) is not a cell",
            row, col
        ))),
    }
}
