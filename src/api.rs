//! Public API Types
//!
//! 公開APIで使用する列挙型と選択キーを定義するモジュール。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SheetMergeError;
use crate::types::normalize_key;

/// 読み込むワークシートの選択方式
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SheetSelector {
    /// 先頭のワークシート（デフォルト）
    #[default]
    First,

    /// インデックス指定（0始まり）
    Index(usize),

    /// シート名指定
    Name(String),
}

/// スプレッドシートの指定方法
///
/// 表データ取得元（`TableSource`）に渡す識別子の種類です。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    /// ファイル名（拡張子なし）で指定
    Name,

    /// キー（ファイル名そのもの）で指定
    Key,

    /// URLで指定
    Url,
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccessKind::Name => "name",
            AccessKind::Key => "key",
            AccessKind::Url => "url",
        };
        f.write_str(s)
    }
}

/// レコード選択キー（職名 + 階層レベル）
///
/// 比較は前後の空白を除去し、大文字小文字を区別せずに行います。
///
/// # 使用例
///
/// ```rust
/// use sheetmerge::SelectionKey;
///
/// let a = SelectionKey::new(" Manager ", "Senior");
/// let b = SelectionKey::new("manager", " senior ");
/// assert_eq!(a.normalized(), b.normalized());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionKey {
    job_title: String,
    level_hierarchy: String,
}

impl SelectionKey {
    /// 入力値をそのまま保持する選択キーを生成
    pub fn new(job_title: impl Into<String>, level_hierarchy: impl Into<String>) -> Self {
        Self {
            job_title: job_title.into(),
            level_hierarchy: level_hierarchy.into(),
        }
    }

    /// ユーザー入力から選択キーを生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Some(SelectionKey))` - 両方が空白でない場合
    /// * `Ok(None)` - 両方とも空白の場合（レコード選択なし）
    /// * `Err(SheetMergeError::IncompleteSelection)` - 片方だけが空白の場合
    pub fn parse(
        job_title: Option<&str>,
        level_hierarchy: Option<&str>,
    ) -> Result<Option<Self>, SheetMergeError> {
        let job = job_title.map(str::trim).filter(|s| !s.is_empty());
        let level = level_hierarchy.map(str::trim).filter(|s| !s.is_empty());

        match (job, level) {
            (Some(job), Some(level)) => Ok(Some(Self::new(job, level))),
            (None, None) => Ok(None),
            (Some(_), None) => Err(SheetMergeError::IncompleteSelection(
                "a level hierarchy is required together with the job title".to_string(),
            )),
            (None, Some(_)) => Err(SheetMergeError::IncompleteSelection(
                "a job title is required together with the level hierarchy".to_string(),
            )),
        }
    }

    /// 入力された職名
    pub fn job_title(&self) -> &str {
        &self.job_title
    }

    /// 入力された階層レベル
    pub fn level_hierarchy(&self) -> &str {
        &self.level_hierarchy
    }

    /// 正規化済みの複合キー `(level_hierarchy, job_title)`
    pub fn normalized(&self) -> (String, String) {
        (
            normalize_key(&self.level_hierarchy),
            normalize_key(&self.job_title),
        )
    }
}
