//! Template Module
//!
//! プレースホルダーマッピングを文書テンプレートに差し込むエンジン。

mod docx;
mod placeholder;

use std::path::Path;

use crate::error::SheetMergeError;
use crate::types::PlaceholderMapping;

pub use docx::DocxTemplate;

/// テンプレートエンジン
///
/// マッピングの各名前をテンプレート中の同名のプレースホルダーに置換し、
/// 結果を`output`に保存します。
pub trait TemplateEngine {
    fn render_and_save(
        &self,
        template: &Path,
        mapping: &PlaceholderMapping,
        output: &Path,
    ) -> Result<(), SheetMergeError>;
}
