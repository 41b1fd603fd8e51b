//! DOCX Template
//!
//! Word文書（ZIPアーカイブ）の本文・ヘッダー・フッターにある
//! Jinjaタグ（`{{ name }}`など）を描画して新しい文書を書き出します。

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::ops::Range;
use std::path::Path;

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::{debug, info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::placeholder::PlaceholderRenderer;
use super::TemplateEngine;
use crate::error::SheetMergeError;
use crate::security::SecurityConfig;
use crate::types::PlaceholderMapping;

const PARAGRAPH: &[u8] = b"w:p";
const TEXT: &[u8] = b"w:t";

/// docxテンプレートエンジン
#[derive(Debug, Clone)]
pub struct DocxTemplate {
    renderer: PlaceholderRenderer,
    security: SecurityConfig,
}

impl DocxTemplate {
    pub fn new() -> Result<Self, SheetMergeError> {
        Ok(Self {
            renderer: PlaceholderRenderer::new()?,
            security: SecurityConfig::default(),
        })
    }

    /// セキュリティ設定を変更
    pub fn with_security(mut self, security: SecurityConfig) -> Self {
        self.security = security;
        self
    }

    /// テンプレートを描画して`output`に書き出す
    ///
    /// 置換対象外のエントリはそのままコピーされます。
    ///
    /// # 戻り値
    ///
    /// * `Ok(BTreeSet<String>)` - マッピングに存在しなかったプレースホルダー名
    /// * `Err(SheetMergeError)` - ZIP/XMLの読み書きエラー、セキュリティ制限違反
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
        let mut archive = ZipArchive::new(template)?;
        self.security.check_archive(&mut archive)?;

        let mut writer = ZipWriter::new(output);
        let mut missing = BTreeSet::new();

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            let method = match entry.compression() {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let options = FileOptions::default().compression_method(method);

            if entry.is_dir() {
                writer.add_directory(name, options)?;
                continue;
            }

            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;

            if is_template_part(&name) {
                let xml = std::str::from_utf8(&data)?;
                let rendered = self.render_part(xml, mapping, &mut missing)?;
                debug!(part = %name, "Rendered template part");
                data = rendered.into_bytes();
            }

            writer.start_file(name, options)?;
            writer.write_all(&data)?;
        }
        writer.finish()?;

        if !missing.is_empty() {
            warn!(
                placeholders = ?missing,
                "Template placeholders without a value were rendered empty"
            );
        }
        Ok(missing)
    }

    /// XMLパートのプレースホルダーを段落単位で置換する
    ///
    /// テキストボックス内の段落は外側の段落とは別に描画されます。
    fn render_part(
        &self,
        xml: &str,
        mapping: &PlaceholderMapping,
        missing: &mut BTreeSet<String>,
    ) -> Result<String, SheetMergeError> {
        let mut reader = Reader::from_str(xml);
        let mut writer = Writer::new(Vec::new());
        let mut open: Vec<Vec<Event<'static>>> = Vec::new();

        loop {
            let event = reader.read_event()?;
            match classify(&event) {
                Tag::Eof => break,
                Tag::ParagraphStart => open.push(vec![event.into_owned()]),
                Tag::ParagraphEnd => match open.pop() {
                    Some(mut events) => {
                        events.push(event.into_owned());
                        let rendered = self.render_paragraph(events, mapping, missing)?;
                        match open.last_mut() {
                            Some(parent) => parent.extend(rendered),
                            None => {
                                for event in rendered {
                                    writer.write_event(event)?;
                                }
                            }
                        }
                    }
                    None => writer.write_event(event)?,
                },
                Tag::Other => match open.last_mut() {
                    Some(paragraph) => paragraph.push(event.into_owned()),
                    None => writer.write_event(event)?,
                },
            }
        }

        // 閉じられていない段落はそのまま出力
        for event in open.into_iter().flatten() {
            writer.write_event(event)?;
        }

        String::from_utf8(writer.into_inner()).map_err(|e| SheetMergeError::Utf8(e.utf8_error()))
    }

    /// 1段落分のイベントを置換する
    ///
    /// Wordは1つのプレースホルダーを複数の`w:t`に分割することがあるため、
    /// 段落内のテキストを連結してタグを探します。描画結果はタグが始まる
    /// `w:t`に入り、タグがまたがる後続の`w:t`からはタグ部分だけが除かれます。
    /// タグを含まない`w:t`、タブ、改行はそのまま残ります。
    fn render_paragraph(
        &self,
        events: Vec<Event<'static>>,
        mapping: &PlaceholderMapping,
        missing: &mut BTreeSet<String>,
    ) -> Result<Vec<Event<'static>>, SheetMergeError> {
        let runs = text_runs(&events)?;
        let combined: String = runs.iter().map(|run| run.text.as_str()).collect();

        let spans = self.renderer.spans(&combined);
        if spans.is_empty() {
            return Ok(events);
        }

        let starts: Vec<usize> = runs
            .iter()
            .scan(0, |offset, run| {
                let start = *offset;
                *offset += run.text.len();
                Some(start)
            })
            .collect();

        let mut texts = vec![String::new(); runs.len()];
        let mut pos = 0;
        for span in spans {
            copy_plain(&combined, &starts, pos..span.start, &mut texts);
            let rendered = self.renderer.render(&combined[span.clone()], mapping, missing)?;
            let owner = starts.partition_point(|&start| start <= span.start) - 1;
            texts[owner].push_str(&rendered);
            pos = span.end;
        }
        copy_plain(&combined, &starts, pos..combined.len(), &mut texts);

        let mut replaced: HashMap<usize, String> = HashMap::new();
        let mut dropped: HashSet<usize> = HashSet::new();
        for (run, text) in runs.into_iter().zip(texts) {
            if run.text != text {
                dropped.extend(run.texts);
                replaced.insert(run.start, text);
            }
        }

        let mut output = Vec::with_capacity(events.len());
        for (i, event) in events.into_iter().enumerate() {
            match (replaced.remove(&i), event) {
                (Some(text), Event::Start(start)) => {
                    output.push(Event::Start(preserve_space(&start)));
                    if !text.is_empty() {
                        output.push(Event::Text(BytesText::new(&text).into_owned()));
                    }
                }
                (_, event) if !dropped.contains(&i) => output.push(event),
                _ => {}
            }
        }

        Ok(output)
    }
}

/// 段落直下の`w:t`要素1つ分のテキスト
#[derive(Debug)]
struct TextRun {
    /// `w:t`開始タグのイベント位置
    start: usize,
    /// テキストイベントの位置
    texts: Vec<usize>,
    text: String,
}

/// 段落直下の`w:t`を順に集める（入れ子の段落は除く）
fn text_runs(events: &[Event<'static>]) -> Result<Vec<TextRun>, SheetMergeError> {
    let mut runs: Vec<TextRun> = Vec::new();
    let mut depth = 0usize;
    let mut in_text = false;

    for (i, event) in events.iter().enumerate() {
        match event {
            Event::Start(e) if e.name().as_ref() == PARAGRAPH => depth += 1,
            Event::End(e) if e.name().as_ref() == PARAGRAPH => depth = depth.saturating_sub(1),
            Event::Start(e) if depth == 1 && e.name().as_ref() == TEXT => {
                in_text = true;
                runs.push(TextRun {
                    start: i,
                    texts: Vec::new(),
                    text: String::new(),
                });
            }
            Event::End(e) if e.name().as_ref() == TEXT => in_text = false,
            Event::Text(t) if in_text => {
                if let Some(run) = runs.last_mut() {
                    run.text.push_str(&t.unescape()?);
                    run.texts.push(i);
                }
            }
            _ => {}
        }
    }

    Ok(runs)
}

/// `combined[range]`を各`w:t`の持ち分に振り分けて追記する
fn copy_plain(combined: &str, starts: &[usize], range: Range<usize>, texts: &mut [String]) {
    for (i, text) in texts.iter_mut().enumerate() {
        let run_end = starts.get(i + 1).copied().unwrap_or(combined.len());
        let from = range.start.max(starts[i]);
        let to = range.end.min(run_end);
        if from < to {
            text.push_str(&combined[from..to]);
        }
    }
}

impl TemplateEngine for DocxTemplate {
    fn render_and_save(
        &self,
        template: &Path,
        mapping: &PlaceholderMapping,
        output: &Path,
    ) -> Result<(), SheetMergeError> {
        let file = File::open(template)?;
        let metadata = file.metadata()?;
        if metadata.len() > self.security.max_input_file_size {
            return Err(SheetMergeError::SecurityViolation(format!(
                "Template size exceeds maximum: {} bytes (max: {} bytes)",
                metadata.len(),
                self.security.max_input_file_size
            )));
        }

        // 途中で失敗した場合に出力ファイルを残さないよう、メモリ上で描画してから書き込む
        let mut buffer = Cursor::new(Vec::new());
        let missing = self.render(BufReader::new(file), mapping, &mut buffer)?;
        fs::write(output, buffer.into_inner())?;

        info!(
            template = %template.display(),
            output = %output.display(),
            placeholders = mapping.len(),
            missing = missing.len(),
            "Document saved"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    ParagraphStart,
    ParagraphEnd,
    Eof,
    Other,
}

fn classify(event: &Event<'_>) -> Tag {
    match event {
        Event::Start(e) if e.name().as_ref() == PARAGRAPH => Tag::ParagraphStart,
        Event::End(e) if e.name().as_ref() == PARAGRAPH => Tag::ParagraphEnd,
        Event::Eof => Tag::Eof,
        _ => Tag::Other,
    }
}

/// 置換後のテキストの前後の空白が保持されるよう`xml:space="preserve"`を付与する
fn preserve_space(start: &BytesStart<'_>) -> BytesStart<'static> {
    let has_space = start
        .attributes()
        .flatten()
        .any(|attr| attr.key.as_ref() == b"xml:space");

    let mut owned = start.clone().into_owned();
    if !has_space {
        owned.push_attribute(("xml:space", "preserve"));
    }
    owned
}

/// 置換対象のXMLパート（本文、ヘッダー、フッター）かどうか
fn is_template_part(name: &str) -> bool {
    let Some(file) = name.strip_prefix("word/") else {
        return false;
    };
    file == "document.xml"
        || (file.ends_with(".xml") && (file.starts_with("header") || file.starts_with("footer")))
}
