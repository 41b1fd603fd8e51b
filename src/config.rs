//! Layout Configuration Module
//!
//! 固定フィールドの位置テーブル、レコード領域のオフセット、
//! プレースホルダーへの射影テーブルを定義するモジュール。
//! いずれも実行時に導出されない静的な設定データで、JSONから読み込めます。

use std::collections::HashSet;
use std::io::Read;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::SheetMergeError;

/// 固定フィールド（表の絶対座標から読み取る文書レベルのスカラー値）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPosition {
    /// プレースホルダー名
    pub name: String,
    /// 行（0始まり）
    pub row: usize,
    /// 列（0始まり）
    pub col: usize,
}

impl FieldPosition {
    pub fn new(name: impl Into<String>, row: usize, col: usize) -> Self {
        Self {
            name: name.into(),
            row,
            col,
        }
    }
}

/// レコードの属性列へのオフセットで束縛されたプレースホルダー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectedField {
    /// プレースホルダー名
    pub name: String,
    /// 属性列のオフセット（0 = 階層レベル、1 = 職名、2以降 = データ列）
    pub offset: usize,
}

impl ProjectedField {
    pub fn new(name: impl Into<String>, offset: usize) -> Self {
        Self {
            name: name.into(),
            offset,
        }
    }
}

/// レコード領域のオフセット
///
/// キー列（2列: 階層レベル、職名）とデータ列（開始列以降すべて）は
/// それぞれ異なる開始行を持ちます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionLayout {
    /// キー列の開始行
    pub key_start_row: usize,
    /// キー列の開始列（ここから2列）
    pub key_start_col: usize,
    /// データ列の開始行
    pub data_start_row: usize,
    /// データ列の開始列（ここから行末まで）
    pub data_start_col: usize,
}

/// キー列の列数（階層レベル + 職名）
pub const KEY_COLUMN_SPAN: usize = 2;

impl Default for RegionLayout {
    fn default() -> Self {
        Self {
            key_start_row: 10,
            key_start_col: 2,
            data_start_row: 11,
            data_start_col: 4,
        }
    }
}

/// 候補値サンプルのデフォルト上限
pub const DEFAULT_SAMPLE_LIMIT: usize = 10;

/// デフォルトのテンプレートパス
pub const DEFAULT_TEMPLATE_PATH: &str = "templates/default_template.docx";

/// デフォルトの射影テーブル（オフセット順）
const DEFAULT_PROJECTION: [&str; 27] = [
    "n_jerarquico",
    "puesto",
    "a_trabajo",
    "p_participa",
    "jefe_inmediato",
    "supervisa_a",
    "proposito",
    "r_internas",
    "r_externas",
    "responsabilidad_1",
    "responsabilidad_2",
    "responsabilidad_3",
    "responsabilidad_4",
    "responsabilidad_5",
    "autoridad",
    "escolaridad",
    "especialidad",
    "experiencia",
    "formacion",
    "c_tecnicas",
    "c_genericas",
    "habilidades",
    "idiomas",
    "software",
    "c_trabajo",
    "riesgos",
    "epp",
];

/// デフォルトの固定フィールド位置（概要表 + ページヘッダー）
fn default_fixed_fields() -> Vec<FieldPosition> {
    vec![
        FieldPosition::new("code", 2, 42),
        FieldPosition::new("version", 3, 42),
        FieldPosition::new("f_emission", 4, 42),
        FieldPosition::new("author", 5, 42),
        FieldPosition::new("review", 6, 42),
        FieldPosition::new("release", 7, 42),
        FieldPosition::new("state", 8, 42),
        FieldPosition::new("date", 9, 42),
    ]
}

fn default_projection() -> Vec<ProjectedField> {
    DEFAULT_PROJECTION
        .iter()
        .enumerate()
        .map(|(offset, name)| ProjectedField::new(*name, offset))
        .collect()
}

/// マッピング処理全体の設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// レコード領域のオフセット
    pub region: RegionLayout,

    /// 固定フィールドの位置テーブル
    pub fixed_fields: Vec<FieldPosition>,

    /// プレースホルダーへの射影テーブル
    pub projection: Vec<ProjectedField>,

    /// エラーメッセージに含める候補値の上限
    pub sample_limit: usize,

    /// 選択キーがない場合もキー列とデータ列の整合性を検証するか
    pub check_alignment_without_selection: bool,

    /// テンプレートファイルのパス
    pub template_path: PathBuf,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            region: RegionLayout::default(),
            fixed_fields: default_fixed_fields(),
            projection: default_projection(),
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            check_alignment_without_selection: true,
            template_path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
        }
    }
}

impl LayoutConfig {
    /// JSONから設定を読み込む
    ///
    /// 省略された項目にはデフォルト値が使われます。読み込み後に検証を行います。
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, SheetMergeError> {
        let config: LayoutConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// 設定を検証する
    ///
    /// # 発生し得るエラー
    ///
    /// * `SheetMergeError::Config(String)`:
    ///   * プレースホルダー名が空、または識別子として不正
    ///   * 同一テーブル内でプレースホルダー名が重複
    ///   * 候補値の上限が0
    ///   * データ列の開始列がキー列と重なっている
    pub fn validate(&self) -> Result<(), SheetMergeError> {
        validate_names("fixed field", self.fixed_fields.iter().map(|f| f.name.as_str()))?;
        validate_names("projected field", self.projection.iter().map(|f| f.name.as_str()))?;

        if self.sample_limit == 0 {
            return Err(SheetMergeError::Config(
                "Sample limit must be at least 1".to_string(),
            ));
        }

        let region = &self.region;
        let key_end_col = region.key_start_col + KEY_COLUMN_SPAN;
        // データ列は行末まで続くため、キー列より左から始まると重なる
        if region.data_start_col < key_end_col {
            return Err(SheetMergeError::Config(format!(
                "Data columns starting at col {} overlap key columns {}..{}",
                region.data_start_col, region.key_start_col, key_end_col
            )));
        }

        Ok(())
    }
}

fn validate_names<'a>(
    table: &str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), SheetMergeError> {
    let mut seen = HashSet::new();
    for name in names {
        if !is_placeholder_name(name) {
            return Err(SheetMergeError::Config(format!(
                "Invalid {} name: '{}'",
                table, name
            )));
        }
        if !seen.insert(name) {
            return Err(SheetMergeError::Config(format!(
                "Duplicate {} name: '{}'",
                table, name
            )));
        }
    }
    Ok(())
}

/// テンプレートのプレースホルダーとして使用可能な名前かどうか
pub(crate) fn is_placeholder_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
