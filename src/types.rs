//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use std::collections::btree_map;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// セルの値を表す列挙型
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// 数値（f64）
    Number(f64),

    /// 文字列
    String(String),

    /// 論理値
    Bool(bool),

    /// エラー値（例: #N/A）
    Error(String),

    /// 空セル
    Empty,
}

impl CellValue {
    /// 値が空かどうかを判定
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// 空白セルかどうかを判定
    ///
    /// 空セル、空文字列、空白のみの文字列を空白として扱います。
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// 値を文字列として取得（書式適用前）
    pub fn as_raw_string(&self) -> String {
        match self {
            CellValue::Number(n) => n.to_string(),
            CellValue::String(s) => s.clone(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Error(e) => e.clone(),
            CellValue::Empty => String::new(),
        }
    }

    /// 検索キーとして正規化した文字列を取得
    ///
    /// 前後の空白を除去して小文字化します。空セルとエラー値は空文字列になります。
    pub fn as_key(&self) -> String {
        match self {
            CellValue::Empty | CellValue::Error(_) => String::new(),
            other => normalize_key(&other.as_raw_string()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

/// 検索キーの正規化（前後の空白除去 + 小文字化）
pub(crate) fn normalize_key(s: &str) -> String {
    s.trim().to_lowercase()
}

/// セル座標（0始まり）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellCoord {
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    /// 新しい座標を生成
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// A1形式の文字列に変換（例: (0, 0) -> "A1"）
    #[allow(clippy::wrong_self_convention)]
    pub fn to_a1_notation(&self) -> String {
        let col_str = Self::col_index_to_letter(self.col);
        format!("{}{}", col_str, self.row + 1)
    }

    /// 列インデックスを文字列に変換（0 -> "A", 25 -> "Z", 26 -> "AA"）
    fn col_index_to_letter(mut col: u32) -> String {
        let mut result = String::new();
        loop {
            let remainder = col % 26;
            result.insert(0, (b'A' + remainder as u8) as char);
            if col < 26 {
                break;
            }
            col = col / 26 - 1;
        }
        result
    }
}

/// 取得した表データ（行 × 列）
///
/// 行ごとの列数は揃っている必要はありません。範囲外へのアクセスは
/// パニックせず、欠損として扱われます。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    /// セル値の行リストから表を生成
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    /// 文字列のリストのリストから表を生成
    ///
    /// スプレッドシートAPIが返す形式（各セルが表示文字列）をそのまま受け取ります。
    /// 空文字列は`CellValue::String("")`として保持し、空白判定は後段で行います。
    pub fn from_strings<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| CellValue::String(cell.into()))
                    .collect()
            })
            .collect();
        Self { rows }
    }

    /// 行数
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// 表が空（行なし、またはすべてのセルが空白）かどうか
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.iter().all(CellValue::is_blank))
    }

    /// 指定行のセル（範囲外の場合は`None`）
    pub fn row(&self, row: usize) -> Option<&[CellValue]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    /// 指定座標のセル（範囲外の場合は`None`）
    pub fn get(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// 指定座標のセルの文字列値
    ///
    /// 範囲外または空セルの場合は`None`を返します。
    pub fn text(&self, row: usize, col: usize) -> Option<String> {
        match self.get(row, col) {
            None | Some(CellValue::Empty) => None,
            Some(value) => Some(value.as_raw_string()),
        }
    }
}

/// テンプレートのプレースホルダー名 → 値 のフラットなマッピング
///
/// テンプレートエンジンに渡される唯一の成果物です。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceholderMapping(BTreeMap<String, String>);

impl PlaceholderMapping {
    /// 空のマッピングを生成
    pub fn new() -> Self {
        Self::default()
    }

    /// 値を設定（既存の値は上書き）
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// 値を取得
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// プレースホルダーが存在するかどうか
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// 別のマッピングをマージ（`other`の値が優先）
    pub fn merge(&mut self, other: PlaceholderMapping) {
        self.0.extend(other.0);
    }

    /// エントリ数
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 空かどうか
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 名前順に走査
    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a PlaceholderMapping {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(String, String)> for PlaceholderMapping {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // CellValue のテスト
    #[test]
    fn test_cell_value_is_blank() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::String(String::new()).is_blank());
        assert!(CellValue::String(" ".to_string()).is_blank());
        assert!(CellValue::String("\t ".to_string()).is_blank());
        assert!(!CellValue::String("Lead".to_string()).is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
    }

    #[test]
    fn test_cell_value_as_raw_string() {
        assert_eq!(CellValue::Empty.as_raw_string(), "");
        assert_eq!(CellValue::Number(42.5).as_raw_string(), "42.5");
        assert_eq!(CellValue::Number(3.0).as_raw_string(), "3");
        assert_eq!(
            CellValue::String(" hello ".to_string()).as_raw_string(),
            " hello "
        );
        assert_eq!(CellValue::Bool(true).as_raw_string(), "true");
    }

    #[test]
    fn test_cell_value_as_key() {
        assert_eq!(CellValue::from("  Senior ").as_key(), "senior");
        assert_eq!(CellValue::Empty.as_key(), "");
        assert_eq!(CellValue::Error("#N/A".to_string()).as_key(), "");
        assert_eq!(CellValue::Number(2.0).as_key(), "2");
    }

    // CellCoord のテスト
    #[test]
    fn test_cell_coord_to_a1_notation() {
        assert_eq!(CellCoord::new(0, 0).to_a1_notation(), "A1");
        assert_eq!(CellCoord::new(0, 25).to_a1_notation(), "Z1");
        assert_eq!(CellCoord::new(0, 26).to_a1_notation(), "AA1");
        assert_eq!(CellCoord::new(5, 42).to_a1_notation(), "AQ6");
        assert_eq!(CellCoord::new(99, 701).to_a1_notation(), "ZZ100");
    }

    // RawTable のテスト
    #[test]
    fn test_raw_table_out_of_range_is_missing() {
        let table = RawTable::from_strings(vec![vec!["a", "b"], vec!["c"]]);

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.text(0, 1), Some("b".to_string()));
        assert_eq!(table.text(1, 1), None);
        assert_eq!(table.text(7, 0), None);
        assert!(table.get(1, 5).is_none());
    }

    #[test]
    fn test_raw_table_empty_cell_text_is_none() {
        let table = RawTable::new(vec![vec![CellValue::Empty, CellValue::from("")]]);
        assert_eq!(table.text(0, 0), None);
        assert_eq!(table.text(0, 1), Some(String::new()));
    }

    #[test]
    fn test_raw_table_is_empty() {
        assert!(RawTable::default().is_empty());
        assert!(RawTable::from_strings(vec![vec!["", " "]]).is_empty());
        assert!(!RawTable::from_strings(vec![vec!["", "x"]]).is_empty());
    }

    // PlaceholderMapping のテスト
    #[test]
    fn test_placeholder_mapping_merge_prefers_other() {
        let mut base = PlaceholderMapping::new();
        base.insert("author", "Ana");
        base.insert("puesto", "old");

        let mut projected = PlaceholderMapping::new();
        projected.insert("puesto", "Engineer");

        base.merge(projected);
        assert_eq!(base.get("author"), Some("Ana"));
        assert_eq!(base.get("puesto"), Some("Engineer"));
        assert_eq!(base.len(), 2);
    }

    #[test]
    fn test_placeholder_mapping_serializes_flat() {
        let mut mapping = PlaceholderMapping::new();
        mapping.insert("b", "2");
        mapping.insert("a", "1");

        let json = serde_json::to_string(&mapping).unwrap();
        assert_eq!(json, r#"{"a":"1","b":"2"}"#);
    }
}
