//! Integration Tests for sheetmerge
//!
//! スプレッドシートの読み込みからマッピング生成、docxテンプレートへの
//! 差し込みまでを通しで検証します。

use std::fs;
use std::io::{Cursor, Read, Write};

use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, XlsxError};
use sheetmerge::{
    AccessKind, GenerationState, MergerBuilder, SelectionKey, SheetMergeError, SheetSelector,
    TableSource,
};
use zip::write::{FileOptions, ZipWriter};
use zip::{CompressionMethod, ZipArchive};

// Helper module for generating test fixtures
mod fixtures {
    use super::*;

    /// 1件分のレコード: (階層レベル, 職名, データ列)
    pub type Row<'a> = (&'a str, &'a str, &'a [&'a str]);

    /// 固定フィールド（列42の行2〜9）の値
    pub const FIXED: [&str; 8] = [
        "DP-001",
        "3",
        "2024-01-15",
        "Ana López",
        "Luis Pérez",
        "Marta Ruiz",
        "Vigente",
        "2025-03-01",
    ];

    /// 職務記述書の一覧表を生成する
    ///
    /// 行10はキー列が空白の見出し行、行11以降がレコード。
    pub fn profile_workbook(rows: &[Row<'_>]) -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Perfiles")?;

        for (i, value) in FIXED.iter().enumerate() {
            worksheet.write_string(2 + i as u32, 42, *value)?;
        }

        worksheet.write_string(10, 4, "Área de trabajo")?;
        worksheet.write_string(10, 5, "Procesos")?;

        for (i, (level, job, data)) in rows.iter().enumerate() {
            let row = 11 + i as u32;
            worksheet.write_string(row, 2, *level)?;
            worksheet.write_string(row, 3, *job)?;
            for (j, value) in data.iter().enumerate() {
                if !value.is_empty() {
                    worksheet.write_string(row, 4 + j as u16, *value)?;
                }
            }
        }

        Ok(workbook.save_to_buffer()?)
    }

    /// 標準的な3件のレコード
    pub fn standard_workbook() -> Result<Vec<u8>, XlsxError> {
        profile_workbook(&[
            ("Lead", "Engineer", &["Ingeniería", "ProcA", "Director"]),
            ("Junior", "Analyst", &["Finanzas", "ProcB"]),
            ("Senior", "Manager", &["Operaciones", "ProcC", "CEO", "Analyst"]),
        ])
    }

    /// 2枚目のシートにレコードを置いたワークブック
    pub fn two_sheet_workbook() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let cover = workbook.add_worksheet();
        cover.set_name("Portada")?;
        cover.write_string(0, 0, "Catálogo de puestos")?;

        let sheet = workbook.add_worksheet();
        sheet.set_name("Perfiles")?;
        sheet.write_string(11, 2, "Lead")?;
        sheet.write_string(11, 3, "Engineer")?;
        sheet.write_string(11, 4, "Ingeniería")?;

        Ok(workbook.save_to_buffer()?)
    }

    /// 日付・数値の固定フィールドを持つワークブック
    pub fn typed_fixed_fields() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();

        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        let date = ExcelDateTime::from_ymd(2025, 3, 1)?;

        worksheet.write_string(2, 42, "DP-002")?;
        worksheet.write_number(3, 42, 3)?;
        worksheet.write_datetime_with_format(9, 42, &date, &date_format)?;
        worksheet.write_string(11, 2, "Lead")?;
        worksheet.write_string(11, 3, "Engineer")?;

        Ok(workbook.save_to_buffer()?)
    }

    /// docxテンプレート（最小構成のZIP）を生成する
    pub fn docx_template(document: &str, header: &str) -> Vec<u8> {
        let mut zip_data = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut zip_data));
            let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

            let parts = [
                ("[Content_Types].xml", CONTENT_TYPES.to_string()),
                ("word/document.xml", wrap_document(document)),
                ("word/header1.xml", wrap_header(header)),
                ("word/styles.xml", STYLES.to_string()),
            ];
            for (name, content) in parts {
                zip.start_file(name, options).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        zip_data
    }

    /// 出力文書から指定パートを読み出す
    pub fn read_part(docx: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(docx)).unwrap();
        let mut content = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        content
    }

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults>{{ puesto }}</w:docDefaults></w:styles>"#;

    fn wrap_document(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        )
    }

    fn wrap_header(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:hdr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">{}</w:hdr>"#,
            body
        )
    }
}

#[test]
fn test_mapping_from_workbook() {
    let merger = MergerBuilder::new().build().unwrap();
    let table = merger
        .read_workbook(Cursor::new(fixtures::standard_workbook().unwrap()))
        .unwrap();

    let key = SelectionKey::new(" engineer ", "LEAD");
    let mapping = merger.mapping(&table, Some(&key)).unwrap();

    assert_eq!(mapping.get("n_jerarquico"), Some("Lead"));
    assert_eq!(mapping.get("puesto"), Some("Engineer"));
    assert_eq!(mapping.get("a_trabajo"), Some("Ingeniería"));
    assert_eq!(mapping.get("p_participa"), Some("ProcA"));
    assert_eq!(mapping.get("jefe_inmediato"), Some("Director"));
    assert_eq!(mapping.get("supervisa_a"), Some(""));
    assert_eq!(mapping.get("epp"), Some(""));

    assert_eq!(mapping.get("code"), Some("DP-001"));
    assert_eq!(mapping.get("author"), Some("Ana López"));
    assert_eq!(mapping.get("date"), Some("2025-03-01"));
    assert_eq!(mapping.len(), 27 + 8);
}

#[test]
fn test_run_records_state_trace() {
    let merger = MergerBuilder::new().build().unwrap();
    let table = merger
        .read_workbook(Cursor::new(fixtures::standard_workbook().unwrap()))
        .unwrap();

    let (generation, result) = merger.run(&table, Some(&SelectionKey::new("Manager", "Senior")));
    assert_eq!(result.unwrap().get("supervisa_a"), Some("Analyst"));
    assert_eq!(generation.state(), GenerationState::Done);
}

#[test]
fn test_typed_fixed_fields_are_display_strings() {
    let merger = MergerBuilder::new().build().unwrap();
    let table = merger
        .read_workbook(Cursor::new(fixtures::typed_fixed_fields().unwrap()))
        .unwrap();

    let mapping = merger.mapping(&table, None).unwrap();
    assert_eq!(mapping.get("code"), Some("DP-002"));
    assert_eq!(mapping.get("version"), Some("3"));
    assert_eq!(mapping.get("date"), Some("2025-03-01"));
    assert_eq!(mapping.get("author"), Some(""));
}

#[test]
fn test_not_found_lists_candidates() {
    let merger = MergerBuilder::new().with_sample_limit(2).build().unwrap();
    let table = merger
        .read_workbook(Cursor::new(fixtures::standard_workbook().unwrap()))
        .unwrap();

    let key = SelectionKey::new("Pilot", "Lead");
    match merger.mapping(&table, Some(&key)) {
        Err(SheetMergeError::NotFound {
            job_titles,
            level_hierarchies,
            ..
        }) => {
            assert_eq!(job_titles, vec!["Engineer", "Analyst"]);
            assert_eq!(level_hierarchies, vec!["Lead", "Junior"]);
        }
        other => panic!("Expected NotFound, got {:?}", other),
    }
}

#[test]
fn test_duplicate_records_are_ambiguous() {
    let data = fixtures::profile_workbook(&[
        ("Lead", "Engineer", &["Ingeniería"]),
        ("Junior", "Analyst", &["Finanzas"]),
        (" lead ", "ENGINEER", &["Planta"]),
    ])
    .unwrap();
    let merger = MergerBuilder::new().build().unwrap();
    let table = merger.read_workbook(Cursor::new(data)).unwrap();

    match merger.mapping(&table, Some(&SelectionKey::new("Engineer", "Lead"))) {
        Err(SheetMergeError::AmbiguousMatch { count, rows }) => {
            assert_eq!(count, 2);
            assert_eq!(rows, vec![11, 13]);
        }
        other => panic!("Expected AmbiguousMatch, got {:?}", other),
    }
}

#[test]
fn test_blank_key_row_with_data_is_misaligned() {
    let data = fixtures::profile_workbook(&[
        ("Lead", "Engineer", &["Ingeniería"]),
        (" ", " ", &["Stray"]),
    ])
    .unwrap();
    let merger = MergerBuilder::new().build().unwrap();
    let table = merger.read_workbook(Cursor::new(data)).unwrap();

    match merger.mapping(&table, Some(&SelectionKey::new("Engineer", "Lead"))) {
        Err(SheetMergeError::Alignment {
            key_rows,
            data_rows,
        }) => assert_eq!((key_rows, data_rows), (1, 2)),
        other => panic!("Expected Alignment, got {:?}", other),
    }
}

#[test]
fn test_key_catalog() {
    let merger = MergerBuilder::new().build().unwrap();
    let table = merger
        .read_workbook(Cursor::new(fixtures::standard_workbook().unwrap()))
        .unwrap();

    let catalog = merger.key_catalog(&table).unwrap();
    assert_eq!(catalog.job_titles, vec!["Engineer", "Analyst", "Manager"]);
    assert_eq!(catalog.level_hierarchies, vec!["Lead", "Junior", "Senior"]);
}

#[test]
fn test_sheet_selection_by_name() {
    let merger = MergerBuilder::new()
        .with_sheet_selector(SheetSelector::Name("Perfiles".to_string()))
        .build()
        .unwrap();
    let table = merger
        .read_workbook(Cursor::new(fixtures::two_sheet_workbook().unwrap()))
        .unwrap();

    let mapping = merger
        .mapping(&table, Some(&SelectionKey::new("Engineer", "Lead")))
        .unwrap();
    assert_eq!(mapping.get("a_trabajo"), Some("Ingeniería"));
}

#[test]
fn test_first_sheet_is_default() {
    let merger = MergerBuilder::new().build().unwrap();
    let table = merger
        .read_workbook(Cursor::new(fixtures::two_sheet_workbook().unwrap()))
        .unwrap();

    assert_eq!(table.text(0, 0), Some("Catálogo de puestos".to_string()));
}

#[test]
fn test_nonexistent_sheet() {
    let merger = MergerBuilder::new()
        .with_sheet_selector(SheetSelector::Name("Otra".to_string()))
        .build()
        .unwrap();
    let result = merger.read_workbook(Cursor::new(fixtures::two_sheet_workbook().unwrap()));

    match result {
        Err(SheetMergeError::Config(msg)) => assert!(msg.contains("Otra")),
        other => panic!("Expected Config error, got {:?}", other),
    }
}

#[test]
fn test_empty_sheet_is_rejected() {
    let mut workbook = Workbook::new();
    workbook.add_worksheet();
    let data = workbook.save_to_buffer().unwrap();

    let merger = MergerBuilder::new().build().unwrap();
    assert!(matches!(
        merger.read_workbook(Cursor::new(data)),
        Err(SheetMergeError::EmptyTable)
    ));
}

#[test]
fn test_local_source_fetch_by_name() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("perfiles.xlsx"),
        fixtures::standard_workbook().unwrap(),
    )
    .unwrap();

    let merger = MergerBuilder::new().build().unwrap();
    let source = merger.source(dir.path());

    let by_name = source.fetch(AccessKind::Name, "perfiles").unwrap();
    let by_key = source.fetch(AccessKind::Key, "perfiles.xlsx").unwrap();
    assert_eq!(by_name, by_key);

    let url = format!("file://{}", dir.path().join("perfiles.xlsx").display());
    let by_url = source.fetch(AccessKind::Url, &url).unwrap();
    assert_eq!(by_name, by_url);
}

#[test]
fn test_generate_document_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let template_path = dir.path().join("plantilla.docx");
    let output_path = dir.path().join("perfil.docx");

    let template = fixtures::docx_template(
        concat!(
            "<w:p><w:r><w:t>Puesto: {{ pue</w:t></w:r><w:r><w:t>sto }}</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>Área: {{a_trabajo}}</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>Sin cambios</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>[{{ desconocido }}]</w:t></w:r></w:p>",
        ),
        "<w:p><w:r><w:t>{{code}} v{{version}}</w:t></w:r></w:p>",
    );
    fs::write(&template_path, template).unwrap();

    let merger = MergerBuilder::new().build().unwrap();
    let table = merger
        .read_workbook(Cursor::new(fixtures::standard_workbook().unwrap()))
        .unwrap();

    let key = SelectionKey::new("Engineer", "Lead");
    let mapping = merger
        .generate_document_with_template(&table, Some(&key), &template_path, &output_path)
        .unwrap();
    assert_eq!(mapping.get("puesto"), Some("Engineer"));

    let output = fs::read(&output_path).unwrap();
    let document = fixtures::read_part(&output, "word/document.xml");
    assert!(document.contains(">Puesto: Engineer</w:t>"), "{}", document);
    assert!(document.contains(">Área: Ingeniería</w:t>"), "{}", document);
    assert!(document.contains("<w:t>Sin cambios</w:t>"), "{}", document);
    assert!(document.contains(">[]</w:t>"), "{}", document);
    assert!(!document.contains("{{"), "{}", document);

    let header = fixtures::read_part(&output, "word/header1.xml");
    assert!(header.contains(">DP-001 v3</w:t>"), "{}", header);

    // 本文・ヘッダー・フッター以外のパートはそのままコピーされる
    let styles = fixtures::read_part(&output, "word/styles.xml");
    assert!(styles.contains("{{ puesto }}"));
}

#[test]
fn test_generate_without_selection_renders_fixed_fields_only() {
    let template = fixtures::docx_template(
        "<w:p><w:r><w:t>{{author}}|{{puesto}}</w:t></w:r></w:p>",
        "<w:p><w:r><w:t>{{state}}</w:t></w:r></w:p>",
    );

    let merger = MergerBuilder::new().build().unwrap();
    let table = merger
        .read_workbook(Cursor::new(fixtures::standard_workbook().unwrap()))
        .unwrap();
    let mapping = merger.mapping(&table, None).unwrap();

    let mut output = Cursor::new(Vec::new());
    let missing = merger
        .render(Cursor::new(template), &mapping, &mut output)
        .unwrap();
    assert!(missing.contains("puesto"));

    let output = output.into_inner();
    let document = fixtures::read_part(&output, "word/document.xml");
    assert!(document.contains(">Ana López|</w:t>"), "{}", document);
    let header = fixtures::read_part(&output, "word/header1.xml");
    assert!(header.contains(">Vigente</w:t>"), "{}", header);
}

#[test]
fn test_failed_selection_writes_no_document() {
    let dir = tempfile::tempdir().unwrap();
    let template_path = dir.path().join("plantilla.docx");
    let output_path = dir.path().join("perfil.docx");
    fs::write(
        &template_path,
        fixtures::docx_template("<w:p><w:r><w:t>{{puesto}}</w:t></w:r></w:p>", ""),
    )
    .unwrap();

    let merger = MergerBuilder::new().build().unwrap();
    let table = merger
        .read_workbook(Cursor::new(fixtures::standard_workbook().unwrap()))
        .unwrap();

    let result = merger.generate_document_with_template(
        &table,
        Some(&SelectionKey::new("Pilot", "Lead")),
        &template_path,
        &output_path,
    );
    assert!(matches!(result, Err(SheetMergeError::NotFound { .. })));
    assert!(!output_path.exists());
}
