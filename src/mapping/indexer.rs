//! Record Indexer
//!
//! 階層レベルと職名の複合キー（前後の空白除去 + 小文字化）で索引を構築し、
//! 1件のレコードを曖昧さなく解決します。

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::api::SelectionKey;
use crate::error::SheetMergeError;
use crate::mapping::{Record, RecordRegion};
use crate::types::CellValue;

/// 選択可能なキー値の一覧
///
/// 各列の値を前後の空白を除去して重複を取り除き、出現順に並べたものです。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeyCatalog {
    /// 職名の一覧
    pub job_titles: Vec<String>,
    /// 階層レベルの一覧
    pub level_hierarchies: Vec<String>,
}

/// 複合キー索引
pub struct RecordIndexer<'a> {
    region: &'a RecordRegion,
    /// (階層レベル, 職名) -> レコード位置のリスト
    index: HashMap<(String, String), Vec<usize>>,
}

impl<'a> RecordIndexer<'a> {
    /// レコード領域から索引を構築する
    pub fn new(region: &'a RecordRegion) -> Self {
        let mut index: HashMap<(String, String), Vec<usize>> = HashMap::new();
        for (position, (_, level, job)) in region.key_cells().enumerate() {
            index
                .entry((level.as_key(), job.as_key()))
                .or_default()
                .push(position);
        }

        Self { region, index }
    }

    /// 選択キーに一致するレコードをちょうど1件返す
    ///
    /// # 引数
    ///
    /// * `key` - 選択キー
    /// * `sample_limit` - `NotFound`エラーに含める候補値の上限（列ごと）
    ///
    /// # 戻り値
    ///
    /// * `Ok(Record)` - ちょうど1件一致した場合
    /// * `Err(SheetMergeError::NotFound)` - 一致なし
    /// * `Err(SheetMergeError::AmbiguousMatch)` - 2件以上一致（先頭を暗黙に選ばない）
    pub fn find(&self, key: &SelectionKey, sample_limit: usize) -> Result<Record, SheetMergeError> {
        let positions = self
            .index
            .get(&key.normalized())
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        match positions {
            [] => {
                let catalog = self.catalog();
                debug!(
                    job_title = key.job_title(),
                    level_hierarchy = key.level_hierarchy(),
                    "No record matches the selection"
                );
                Err(SheetMergeError::NotFound {
                    job_title: key.job_title().to_string(),
                    level_hierarchy: key.level_hierarchy().to_string(),
                    job_titles: catalog.job_titles.into_iter().take(sample_limit).collect(),
                    level_hierarchies: catalog
                        .level_hierarchies
                        .into_iter()
                        .take(sample_limit)
                        .collect(),
                })
            }
            [position] => self.region.record(*position).ok_or_else(|| {
                SheetMergeError::Config(format!("Record index {} is out of range", position))
            }),
            many => {
                let rows = many
                    .iter()
                    .filter_map(|&p| self.region.record(p))
                    .map(|r| r.source_row)
                    .collect();
                Err(SheetMergeError::AmbiguousMatch {
                    count: many.len(),
                    rows,
                })
            }
        }
    }

    /// 選択可能なキー値の一覧を返す
    pub fn catalog(&self) -> KeyCatalog {
        let mut job_titles = Distinct::default();
        let mut level_hierarchies = Distinct::default();

        for (_, level, job) in self.region.key_cells() {
            level_hierarchies.push(level);
            job_titles.push(job);
        }

        KeyCatalog {
            job_titles: job_titles.values,
            level_hierarchies: level_hierarchies.values,
        }
    }
}

/// 出現順を保った重複除去
#[derive(Default)]
struct Distinct {
    seen: HashSet<String>,
    values: Vec<String>,
}

impl Distinct {
    fn push(&mut self, cell: &CellValue) {
        if let CellValue::Error(_) = cell {
            return;
        }
        let value = cell.as_raw_string().trim().to_string();
        if value.is_empty() {
            return;
        }
        if self.seen.insert(value.clone()) {
            self.values.push(value);
        }
    }
}
