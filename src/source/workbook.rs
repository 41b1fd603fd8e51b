//! Workbook Reader
//!
//! calamineを使用してスプレッドシートのワークシートを読み込み、
//! 絶対座標を保った`RawTable`に変換します。

use std::io::{Cursor, Read};

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use chrono::NaiveTime;
use tracing::debug;
use zip::ZipArchive;

use crate::api::SheetSelector;
use crate::error::SheetMergeError;
use crate::security::SecurityConfig;
use crate::types::{CellValue, RawTable};

/// ワークブックを読み込み、選択されたワークシートを表に変換する
///
/// # 引数
///
/// * `reader` - スプレッドシートファイル（xlsx, xlsm, xlsb, xls, ods）
/// * `selector` - ワークシートの選択方式
/// * `security` - 入力サイズとZIPアーカイブの制限
///
/// # 戻り値
///
/// * `Ok(RawTable)` - A1を原点とする表（先頭の空行・空列も保持）
/// * `Err(SheetMergeError)` - 読み込み、解析、シート選択のエラー
pub(crate) fn read_workbook<R: Read>(
    reader: R,
    selector: &SheetSelector,
    security: &SecurityConfig,
) -> Result<RawTable, SheetMergeError> {
    let buffer = security.read_input(reader)?;

    // ZIPベースの形式（xlsx, xlsm, ods）は展開前に制限を検証する
    if buffer.starts_with(b"PK") {
        let mut archive = ZipArchive::new(Cursor::new(buffer.as_slice()))?;
        security.check_archive(&mut archive)?;
    }

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(buffer))?;
    let sheet_names = workbook.sheet_names();
    let sheet_name = resolve_sheet(&sheet_names, selector)?;

    let range = workbook.worksheet_range(&sheet_name)?;
    debug!(
        sheet = %sheet_name,
        start = ?range.start(),
        end = ?range.end(),
        "Loaded worksheet range"
    );

    Ok(range_to_table(&range))
}

/// ワークシート名を解決する
fn resolve_sheet(
    sheet_names: &[String],
    selector: &SheetSelector,
) -> Result<String, SheetMergeError> {
    match selector {
        SheetSelector::First => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| SheetMergeError::Config("Workbook has no worksheets".to_string())),

        SheetSelector::Index(index) => sheet_names.get(*index).cloned().ok_or_else(|| {
            SheetMergeError::Config(format!(
                "Sheet index {} is out of range (total: {})",
                index,
                sheet_names.len()
            ))
        }),

        SheetSelector::Name(name) => {
            if !sheet_names.contains(name) {
                return Err(SheetMergeError::Config(format!("Sheet '{}' not found", name)));
            }
            Ok(name.clone())
        }
    }
}

/// calamineの範囲を表に変換する
///
/// calamineの範囲は最初に使われたセルから始まるため、
/// 先頭の空行・空列を補ってA1原点の座標に揃えます。
fn range_to_table(range: &Range<Data>) -> RawTable {
    let (start_row, start_col) = range.start().unwrap_or((0, 0));

    let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; start_col as usize];
        cells.extend(row.iter().map(convert_cell));
        rows.push(cells);
    }

    RawTable::new(rows)
}

/// calamineのセル値を変換する（日付は表示文字列に変換）
fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::String(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) if datetime.time() == NaiveTime::MIN => {
                CellValue::String(datetime.format("%Y-%m-%d").to_string())
            }
            Some(datetime) => CellValue::String(datetime.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::Error(e.to_string()),
        Data::Empty => CellValue::Empty,
    }
}
