//! Table Source Module
//!
//! 表データの取得元を抽象化するモジュール。
//! ローカルのスプレッドシートファイルとJSONスナップショットを読み込む
//! `LocalSource`を提供します。

mod json;
mod workbook;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use crate::api::{AccessKind, SheetSelector};
use crate::error::SheetMergeError;
use crate::security::SecurityConfig;
use crate::types::RawTable;

pub(crate) use json::read_json;
pub(crate) use workbook::read_workbook;

/// 名前指定で探索する拡張子（優先順）
const NAME_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xls", "ods", "json"];

/// 表データの取得元
///
/// 取得した表は行 × 列のセル値で、行ごとの列数は揃っていなくても構いません。
pub trait TableSource {
    /// 識別子で指定された表を取得する
    fn fetch(&self, access: AccessKind, identifier: &str) -> Result<RawTable, SheetMergeError>;
}

/// 読み込み形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceFormat {
    Workbook,
    Json,
}

impl SourceFormat {
    fn from_path(path: &Path) -> Result<Self, SheetMergeError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => Ok(SourceFormat::Workbook),
            Some("json") => Ok(SourceFormat::Json),
            _ => Err(SheetMergeError::Config(format!(
                "Unsupported table file: {}",
                path.display()
            ))),
        }
    }
}

/// ローカルディレクトリから表を読み込む取得元
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
    sheet_selector: SheetSelector,
    security: SecurityConfig,
}

impl LocalSource {
    /// ルートディレクトリを指定して生成
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sheet_selector: SheetSelector::default(),
            security: SecurityConfig::default(),
        }
    }

    /// 読み込むワークシートを設定
    pub fn with_sheet_selector(mut self, selector: SheetSelector) -> Self {
        self.sheet_selector = selector;
        self
    }

    /// セキュリティ設定を変更
    pub fn with_security(mut self, security: SecurityConfig) -> Self {
        self.security = security;
        self
    }

    /// 識別子をファイルパスに解決する
    pub fn resolve(
        &self,
        access: AccessKind,
        identifier: &str,
    ) -> Result<PathBuf, SheetMergeError> {
        let identifier = identifier.trim();
        match access {
            AccessKind::Name => {
                check_relative(identifier)?;
                NAME_EXTENSIONS
                    .iter()
                    .map(|ext| self.root.join(format!("{}.{}", identifier, ext)))
                    .find(|candidate| candidate.is_file())
                    .ok_or_else(|| {
                        SheetMergeError::Io(std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            format!(
                                "No spreadsheet named '{}' in {}",
                                identifier,
                                self.root.display()
                            ),
                        ))
                    })
            }
            AccessKind::Key => {
                check_relative(identifier)?;
                Ok(self.root.join(identifier))
            }
            AccessKind::Url => match identifier.strip_prefix("file://") {
                Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
                _ => Err(SheetMergeError::Config(format!(
                    "Only file:// URLs are supported: '{}'",
                    identifier
                ))),
            },
        }
    }

    /// パスを指定して表を読み込む
    pub fn read_path(&self, path: &Path) -> Result<RawTable, SheetMergeError> {
        let format = SourceFormat::from_path(path)?;
        let file = File::open(path)?;
        self.read(BufReader::new(file), format)
    }

    fn read<R: Read>(&self, reader: R, format: SourceFormat) -> Result<RawTable, SheetMergeError> {
        debug!(?format, "Reading table");
        let table = match format {
            SourceFormat::Workbook => read_workbook(reader, &self.sheet_selector, &self.security)?,
            SourceFormat::Json => read_json(reader, &self.security)?,
        };

        if table.is_empty() {
            return Err(SheetMergeError::EmptyTable);
        }
        Ok(table)
    }
}

impl TableSource for LocalSource {
    fn fetch(&self, access: AccessKind, identifier: &str) -> Result<RawTable, SheetMergeError> {
        let path = self.resolve(access, identifier)?;
        let table = self.read_path(&path)?;
        info!(
            %access,
            path = %path.display(),
            rows = table.row_count(),
            "Loaded table"
        );
        Ok(table)
    }
}

/// ルートの外を指す識別子を拒否する
fn check_relative(identifier: &str) -> Result<(), SheetMergeError> {
    if identifier.is_empty() {
        return Err(SheetMergeError::Config("Empty identifier".to_string()));
    }
    let escapes = Path::new(identifier)
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(SheetMergeError::SecurityViolation(format!(
            "Identifier must be a plain relative path: '{}'",
            identifier
        )));
    }
    Ok(())
}
