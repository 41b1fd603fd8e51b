//! Mapping Engine
//!
//! 固定フィールド抽出、領域分割、レコード解決、射影を1回の生成要求として
//! 組み合わせるオーケストレーター。I/Oは行いません。

use std::fmt;

use tracing::{debug, info};

use crate::api::SelectionKey;
use crate::config::LayoutConfig;
use crate::error::SheetMergeError;
use crate::mapping::{FieldProjector, FixedFieldExtractor, RecordIndexer, RegionSplitter};
use crate::types::{PlaceholderMapping, RawTable};

/// 失敗の理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// キー列とデータ列の行数不一致（RegionSplitから）
    Alignment,
    /// 一致するレコードなし（Indexedから）
    NotFound,
    /// 複数のレコードが一致（Indexedから）
    Ambiguous,
}

/// 生成要求の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    Idle,
    RegionSplit,
    Indexed,
    Projected,
    Merged,
    Done,
    Failed(FailureReason),
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationState::Idle => f.write_str("idle"),
            GenerationState::RegionSplit => f.write_str("region-split"),
            GenerationState::Indexed => f.write_str("indexed"),
            GenerationState::Projected => f.write_str("projected"),
            GenerationState::Merged => f.write_str("merged"),
            GenerationState::Done => f.write_str("done"),
            GenerationState::Failed(reason) => write!(f, "failed({:?})", reason),
        }
    }
}

/// 1回の生成要求で通過した状態の記録
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    states: Vec<GenerationState>,
}

impl Generation {
    fn new() -> Self {
        Self {
            states: vec![GenerationState::Idle],
        }
    }

    /// 現在（最終）の状態
    pub fn state(&self) -> GenerationState {
        self.states
            .last()
            .copied()
            .unwrap_or(GenerationState::Idle)
    }

    /// 通過した状態の一覧（Idleから順に）
    pub fn states(&self) -> &[GenerationState] {
        &self.states
    }

    fn advance(&mut self, next: GenerationState) {
        debug!(from = %self.state(), to = %next, "Generation state transition");
        self.states.push(next);
    }

    /// エラーに対応する失敗状態へ遷移してエラーを返す
    fn fail(&mut self, error: SheetMergeError) -> SheetMergeError {
        let reason = match &error {
            SheetMergeError::Alignment { .. } => Some(FailureReason::Alignment),
            SheetMergeError::NotFound { .. } => Some(FailureReason::NotFound),
            SheetMergeError::AmbiguousMatch { .. } => Some(FailureReason::Ambiguous),
            _ => None,
        };
        if let Some(reason) = reason {
            self.advance(GenerationState::Failed(reason));
        }
        error
    }
}

/// プレースホルダーマッピングの生成エンジン
///
/// 呼び出しごとに独立しており、表は毎回引数として受け取ります。
#[derive(Debug, Clone, Copy)]
pub struct MappingEngine<'a> {
    config: &'a LayoutConfig,
}

impl<'a> MappingEngine<'a> {
    pub fn new(config: &'a LayoutConfig) -> Self {
        Self { config }
    }

    /// 表と選択キーからプレースホルダーマッピングを生成する
    ///
    /// # 引数
    ///
    /// * `table` - 取得済みの表
    /// * `selection` - 選択キー（`None`の場合は固定フィールドのみ）
    ///
    /// # 戻り値
    ///
    /// * `Ok(PlaceholderMapping)` - 固定フィールドと射影結果をマージしたマッピング
    /// * `Err(SheetMergeError)` - 整合性エラー、レコード解決エラー（部分的な出力なし）
    pub fn generate(
        &self,
        table: &RawTable,
        selection: Option<&SelectionKey>,
    ) -> Result<PlaceholderMapping, SheetMergeError> {
        self.run(table, selection).1
    }

    /// `generate`と同じ処理を行い、通過した状態の記録も返す
    pub fn run(
        &self,
        table: &RawTable,
        selection: Option<&SelectionKey>,
    ) -> (Generation, Result<PlaceholderMapping, SheetMergeError>) {
        let mut generation = Generation::new();
        let result = self.drive(table, selection, &mut generation);
        (generation, result)
    }

    fn drive(
        &self,
        table: &RawTable,
        selection: Option<&SelectionKey>,
        generation: &mut Generation,
    ) -> Result<PlaceholderMapping, SheetMergeError> {
        // 1. 固定フィールド（選択とは独立）
        let mut mapping = FixedFieldExtractor::new(&self.config.fixed_fields).extract(table);

        // 2. 領域分割
        let needs_region = selection.is_some() || self.config.check_alignment_without_selection;
        let region = if needs_region {
            let region = RegionSplitter::new(self.config.region)
                .split(table)
                .map_err(|e| generation.fail(e))?;
            generation.advance(GenerationState::RegionSplit);
            Some(region)
        } else {
            None
        };

        // 3. レコード解決と射影（射影結果が名前の衝突で優先）
        if let (Some(key), Some(region)) = (selection, region.as_ref()) {
            let indexer = RecordIndexer::new(region);
            generation.advance(GenerationState::Indexed);

            let record = indexer
                .find(key, self.config.sample_limit)
                .map_err(|e| generation.fail(e))?;

            let projected = FieldProjector::new(&self.config.projection).project(&record);
            generation.advance(GenerationState::Projected);

            info!(
                source_row = record.source_row,
                job_title = %record.job_title,
                level_hierarchy = %record.level_hierarchy,
                "Resolved record"
            );
            mapping.merge(projected);
        }

        generation.advance(GenerationState::Merged);
        generation.advance(GenerationState::Done);
        Ok(mapping)
    }
}
