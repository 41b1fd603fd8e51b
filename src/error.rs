//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use thiserror::Error;

/// sheetmergeクレート全体で使用するエラー型
///
/// 表データの取得、レコードの選択、テンプレートの描画中に発生する
/// すべてのエラーを統一的に扱うために使用されます。
///
/// # エラーの種類
///
/// - `Io` / `Parse` / `Json` / `Zip` / `Xml` / `Utf8`: 入出力・解析エラー（外部コラボレーター由来）
/// - `Config`: 設定テーブルの検証に失敗したエラー（起動時に致命的）
/// - `Alignment`: キー列とデータ列の行数が一致しないエラー
/// - `NotFound` / `AmbiguousMatch`: 選択キーによるレコード解決の失敗
///
/// # 使用例
///
/// ```rust,no_run
/// use sheetmerge::SheetMergeError;
/// use std::fs::File;
///
/// fn read_table_file(path: &str) -> Result<(), SheetMergeError> {
///     let file = File::open(path)?;  // Ioエラーが自動的に変換される
///     // ... 処理 ...
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum SheetMergeError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// スプレッドシートの解析中に発生したエラー（calamine由来）
    #[error("Failed to parse spreadsheet: {0}")]
    Parse(#[from] calamine::Error),

    /// JSON（表スナップショットまたは設定ファイル）の解析エラー
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// UTF-8文字列の変換エラー
    ///
    /// テンプレートXMLのUTF-8変換に失敗した場合に発生します。
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// ZIPアーカイブ（docxテンプレート）の読み書きエラー
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// テンプレートXMLの解析・書き出しエラー
    #[error("XML error: {0}")]
    Xml(String),

    /// プレースホルダー（Jinja構文）の解析・描画エラー
    #[error("Template error: {0}")]
    Template(String),

    /// 設定の検証に失敗したエラー
    ///
    /// `MergerBuilder::build()`時に位置テーブルや射影テーブルを検証し、
    /// 無効な設定が検出された場合に発生します。
    ///
    /// # 例
    ///
    /// ```rust,no_run
    /// use sheetmerge::{MergerBuilder, SheetMergeError};
    ///
    /// let result = MergerBuilder::new()
    ///     .with_sample_limit(0)  // 無効な上限
    ///     .build();
    ///
    /// match result {
    ///     Err(SheetMergeError::Config(msg)) => {
    ///         println!("設定エラー: {}", msg);
    ///     }
    ///     _ => {}
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// キー列とデータ列の行数不一致
    ///
    /// 空白行を除去した後のキー列の行数と、データ列の行数が一致しない場合に
    /// 発生します。部分的な対応付けは行いません。
    #[error(
        "Alignment error: key columns have {key_rows} rows after removing blanks, \
         but data columns have {data_rows} rows"
    )]
    Alignment {
        /// 空白行除去後のキー列の行数
        key_rows: usize,
        /// データ列の行数
        data_rows: usize,
    },

    /// 選択キーに一致するレコードが存在しない
    ///
    /// ユーザーが入力を修正できるよう、各キー列の候補値の一部を含みます。
    #[error(
        "No record found for job title '{job_title}' and level hierarchy '{level_hierarchy}'. \
         Available job titles: [{}]. Available level hierarchies: [{}]",
        .job_titles.join(", "),
        .level_hierarchies.join(", ")
    )]
    NotFound {
        /// 入力された職名
        job_title: String,
        /// 入力された階層レベル
        level_hierarchy: String,
        /// 職名列の候補値（先頭から上限件数まで）
        job_titles: Vec<String>,
        /// 階層レベル列の候補値（先頭から上限件数まで）
        level_hierarchies: Vec<String>,
    },

    /// 選択キーに複数のレコードが一致した
    ///
    /// 先頭のレコードを暗黙に選ぶことはしません。
    #[error(
        "Ambiguous match: {count} records match the selection (sheet rows: {})",
        format_rows(.rows)
    )]
    AmbiguousMatch {
        /// 一致したレコード数
        count: usize,
        /// 一致したレコードのシート上の行番号（0始まり）
        rows: Vec<usize>,
    },

    /// 職名と階層レベルの片方だけが指定された
    #[error("Incomplete selection: {0}")]
    IncompleteSelection(String),

    /// 取得した表にデータが存在しない
    #[error("No data found in the spreadsheet")]
    EmptyTable,

    /// セキュリティ制限に違反したエラー
    ///
    /// 入力ファイルサイズ制限、ZIP bomb、パストラバーサルなどの
    /// セキュリティ制限に違反した場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

fn format_rows(rows: &[usize]) -> String {
    rows.iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<zip::result::ZipError> for SheetMergeError {
    fn from(e: zip::result::ZipError) -> Self {
        SheetMergeError::Zip(e.to_string())
    }
}

impl From<quick_xml::Error> for SheetMergeError {
    fn from(e: quick_xml::Error) -> Self {
        SheetMergeError::Xml(e.to_string())
    }
}

impl From<minijinja::Error> for SheetMergeError {
    fn from(e: minijinja::Error) -> Self {
        SheetMergeError::Template(e.to_string())
    }
}
