//! Builder Module
//!
//! Fluent Builder APIを提供し、`Merger`インスタンスを段階的に構築する。

use std::collections::BTreeSet;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::api::{SelectionKey, SheetSelector};
use crate::config::{FieldPosition, LayoutConfig, ProjectedField, RegionLayout};
use crate::error::SheetMergeError;
use crate::mapping::{Generation, KeyCatalog, MappingEngine, RecordIndexer, RegionSplitter};
use crate::security::SecurityConfig;
use crate::source::{read_workbook, LocalSource};
use crate::template::{DocxTemplate, TemplateEngine};
use crate::types::{PlaceholderMapping, RawTable};

/// Fluent Builder APIを提供する構造体
///
/// `Merger`インスタンスを段階的に構築するためのビルダーです。
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use sheetmerge::{MergerBuilder, SheetSelector};
///
/// # fn main() -> Result<(), sheetmerge::SheetMergeError> {
/// let merger = MergerBuilder::new()
///     .with_sheet_selector(SheetSelector::Index(0))
///     .with_sample_limit(5)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MergerBuilder {
    /// レイアウト設定（構築中）
    config: LayoutConfig,

    /// シート選択方式
    sheet_selector: SheetSelector,

    /// セキュリティ設定
    security: SecurityConfig,
}

impl MergerBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - キー列: 行10・列2から2列、データ列: 行11・列4から行末まで
    /// - 固定フィールド: 列42の行2〜9（code, version, f_emission, author, review, release, state, date）
    /// - 射影テーブル: 27項目（n_jerarquico 〜 epp）
    /// - 候補値サンプルの上限: 10
    /// - シート選択: 先頭のワークシート
    pub fn new() -> Self {
        Self::default()
    }

    /// レイアウト設定全体を置き換える（JSON設定ファイルの読み込み結果など）
    pub fn with_layout(mut self, config: LayoutConfig) -> Self {
        self.config = config;
        self
    }

    /// レコード領域のオフセットを指定する
    pub fn with_region(mut self, region: RegionLayout) -> Self {
        self.config.region = region;
        self
    }

    /// 固定フィールドの位置テーブルを指定する
    pub fn with_fixed_fields(mut self, fields: Vec<FieldPosition>) -> Self {
        self.config.fixed_fields = fields;
        self
    }

    /// 射影テーブルを指定する
    pub fn with_projection(mut self, fields: Vec<ProjectedField>) -> Self {
        self.config.projection = fields;
        self
    }

    /// エラーメッセージに含める候補値の上限を指定する
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use sheetmerge::MergerBuilder;
    ///
    /// let builder = MergerBuilder::new().with_sample_limit(3);
    /// ```
    pub fn with_sample_limit(mut self, limit: usize) -> Self {
        self.config.sample_limit = limit;
        self
    }

    /// 選択キーがない場合にもキー列とデータ列の整合性を検証するかを指定する
    pub fn check_alignment_without_selection(mut self, check: bool) -> Self {
        self.config.check_alignment_without_selection = check;
        self
    }

    /// デフォルトのテンプレートパスを指定する
    pub fn with_template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.template_path = path.into();
        self
    }

    /// 読み込むワークシートを選択する
    pub fn with_sheet_selector(mut self, selector: SheetSelector) -> Self {
        self.sheet_selector = selector;
        self
    }

    /// 入力ファイルとテンプレートのセキュリティ制限を指定する
    pub fn with_security(mut self, security: SecurityConfig) -> Self {
        self.security = security;
        self
    }

    /// 設定を検証し、`Merger`インスタンスを生成する
    ///
    /// # 発生し得るエラー
    ///
    /// * `SheetMergeError::Config(String)`: 設定の検証に失敗した場合
    ///   * プレースホルダー名が不正、または同一テーブル内で重複
    ///   * 候補値の上限が0
    ///   * データ列がキー列と重なっている
    pub fn build(self) -> Result<Merger, SheetMergeError> {
        self.config.validate()?;

        let template = DocxTemplate::new()?.with_security(self.security.clone());
        Ok(Merger {
            config: self.config,
            sheet_selector: self.sheet_selector,
            security: self.security,
            template,
        })
    }
}

/// 差し込み処理のファサード
///
/// 表からプレースホルダーマッピングを生成し、docxテンプレートに差し込みます。
/// 表は呼び出しごとに引数で受け取り、内部にキャッシュしません。
///
/// # 使用例
///
/// ```rust,no_run
/// use std::fs::File;
/// use std::path::Path;
/// use sheetmerge::{MergerBuilder, SelectionKey};
///
/// # fn main() -> Result<(), sheetmerge::SheetMergeError> {
/// let merger = MergerBuilder::new().build()?;
/// let table = merger.read_workbook(File::open("perfiles.xlsx")?)?;
/// let key = SelectionKey::new("Engineer", "Lead");
/// merger.generate_document(&table, Some(&key), Path::new("perfil.docx"))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Merger {
    config: LayoutConfig,
    sheet_selector: SheetSelector,
    security: SecurityConfig,
    template: DocxTemplate,
}

impl Merger {
    /// 検証済みのレイアウト設定
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// 同じシート選択・セキュリティ設定を持つローカルの取得元を生成する
    pub fn source(&self, root: impl Into<PathBuf>) -> LocalSource {
        LocalSource::new(root)
            .with_sheet_selector(self.sheet_selector.clone())
            .with_security(self.security.clone())
    }

    /// スプレッドシートを読み込む
    ///
    /// # 戻り値
    ///
    /// * `Ok(RawTable)` - A1を原点とする表
    /// * `Err(SheetMergeError::EmptyTable)` - ワークシートにデータがない場合
    pub fn read_workbook<R: Read>(&self, input: R) -> Result<RawTable, SheetMergeError> {
        let table = read_workbook(input, &self.sheet_selector, &self.security)?;
        if table.is_empty() {
            return Err(SheetMergeError::EmptyTable);
        }
        Ok(table)
    }

    /// 選択可能な職名と階層レベルの一覧
    pub fn key_catalog(&self, table: &RawTable) -> Result<KeyCatalog, SheetMergeError> {
        let region = RegionSplitter::new(self.config.region).split(table)?;
        Ok(RecordIndexer::new(&region).catalog())
    }

    /// プレースホルダーマッピングを生成する
    ///
    /// `selection`が`None`の場合は固定フィールドのみを返します。
    pub fn mapping(
        &self,
        table: &RawTable,
        selection: Option<&SelectionKey>,
    ) -> Result<PlaceholderMapping, SheetMergeError> {
        MappingEngine::new(&self.config).generate(table, selection)
    }

    /// `mapping`と同じ処理を行い、通過した状態の記録も返す
    pub fn run(
        &self,
        table: &RawTable,
        selection: Option<&SelectionKey>,
    ) -> (Generation, Result<PlaceholderMapping, SheetMergeError>) {
        MappingEngine::new(&self.config).run(table, selection)
    }

    /// マッピングをテンプレートに差し込んで`output`に書き出す
    ///
    /// # 戻り値
    ///
    /// * `Ok(BTreeSet<String>)` - 空文字列で描画された（マッピングにない）プレースホルダー名
    pub fn render<R, W>(
        &self,
        template: R,
        mapping: &PlaceholderMapping,
        output: W,
    ) -> Result<BTreeSet<String>, SheetMergeError>
    where
        R: Read + Seek,
        W: Write + Seek,
    {
        self.template.render(template, mapping, output)
    }

    /// 設定のテンプレートを使用して文書を生成する
    pub fn generate_document(
        &self,
        table: &RawTable,
        selection: Option<&SelectionKey>,
        output: &Path,
    ) -> Result<PlaceholderMapping, SheetMergeError> {
        self.generate_document_with_template(table, selection, &self.config.template_path, output)
    }

    /// テンプレートを指定して文書を生成する
    ///
    /// マッピングの生成に失敗した場合、出力ファイルは作成されません。
    ///
    /// # 戻り値
    ///
    /// * `Ok(PlaceholderMapping)` - 差し込みに使用したマッピング
    pub fn generate_document_with_template(
        &self,
        table: &RawTable,
        selection: Option<&SelectionKey>,
        template: &Path,
        output: &Path,
    ) -> Result<PlaceholderMapping, SheetMergeError> {
        let mapping = self.mapping(table, selection)?;
        self.template.render_and_save(template, &mapping, output)?;

        info!(
            output = %output.display(),
            selected = selection.is_some(),
            "Generated document"
        );
        Ok(mapping)
    }
}
