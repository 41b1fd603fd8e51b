//! sheetmerge - Spreadsheet-driven document generation
//!
//! This crate selects one record from a spreadsheet laid out as a job-profile
//! catalogue, maps its columns and a handful of fixed cells to template
//! placeholder names, and renders a Word (docx) template with the result.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::fs::File;
//! use std::path::Path;
//! use sheetmerge::{MergerBuilder, SelectionKey};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create a merger with the default layout
//!     let merger = MergerBuilder::new().build()?;
//!
//!     // Load the first worksheet
//!     let table = merger.read_workbook(File::open("perfiles.xlsx")?)?;
//!
//!     // Select a record by job title and level hierarchy (case-insensitive)
//!     let key = SelectionKey::new("Engineer", "Lead");
//!
//!     // Render the default template into a new document
//!     merger.generate_document(&table, Some(&key), Path::new("perfil.docx"))?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Inspecting the Mapping
//!
//! ```rust,no_run
//! use sheetmerge::{MergerBuilder, RawTable, SelectionKey};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let merger = MergerBuilder::new().build()?;
//! let table = RawTable::from_strings(vec![vec!["..."]]); // rows fetched elsewhere
//!
//! let mapping = merger.mapping(&table, Some(&SelectionKey::new("Engineer", "Lead")))?;
//! println!("{}", serde_json::to_string_pretty(&mapping)?);
//! # Ok(())
//! # }
//! ```
//!
//! # Custom Layout
//!
//! ```rust,no_run
//! use sheetmerge::{MergerBuilder, RegionLayout, SheetMergeError, SheetSelector};
//!
//! fn main() -> Result<(), SheetMergeError> {
//!     let merger = MergerBuilder::new()
//!         .with_sheet_selector(SheetSelector::Name("Perfiles".to_string()))
//!         .with_region(RegionLayout {
//!             key_start_row: 1,
//!             key_start_col: 0,
//!             data_start_row: 1,
//!             data_start_col: 2,
//!         })
//!         .with_sample_limit(5)
//!         .build()?;
//!
//!     let source = merger.source("./data");
//!     # let _ = source;
//!     Ok(())
//! }
//! ```

mod api;
mod builder;
mod config;
mod error;
mod mapping;
mod security;
mod source;
mod template;
mod types;

// 公開API
pub use api::{AccessKind, SelectionKey, SheetSelector};
pub use builder::{Merger, MergerBuilder};
pub use config::{
    FieldPosition, LayoutConfig, ProjectedField, RegionLayout, DEFAULT_SAMPLE_LIMIT,
    DEFAULT_TEMPLATE_PATH, KEY_COLUMN_SPAN,
};
pub use error::SheetMergeError;
pub use mapping::{
    FailureReason, FieldProjector, FixedFieldExtractor, Generation, GenerationState, KeyCatalog,
    MappingEngine, Record, RecordIndexer, RecordRegion, RegionSplitter,
};
pub use security::SecurityConfig;
pub use source::{LocalSource, TableSource};
pub use template::{DocxTemplate, TemplateEngine};
pub use types::{CellCoord, CellValue, PlaceholderMapping, RawTable};
