//! Placeholder rendering
//!
//! 段落テキスト中のJinjaタグ（`{{ ... }}`、`{% ... %}`、`{# ... #}`）を
//! 検出し、`minijinja`で描画します。

use std::collections::BTreeSet;
use std::ops::Range;

use minijinja::{Environment, UndefinedBehavior};
use regex::Regex;

use crate::error::SheetMergeError;
use crate::types::PlaceholderMapping;

/// 式・文・コメントのタグ
const TAG_PATTERN: &str = r"(?s)\{\{.*?\}\}|\{%.*?%\}|\{#.*?#\}";

/// テキスト中のプレースホルダーを値に置換する
#[derive(Debug, Clone)]
pub(crate) struct PlaceholderRenderer {
    tag: Regex,
    env: Environment<'static>,
}

impl PlaceholderRenderer {
    pub(crate) fn new() -> Result<Self, SheetMergeError> {
        let tag = Regex::new(TAG_PATTERN)
            .map_err(|e| SheetMergeError::Config(format!("Invalid placeholder pattern: {}", e)))?;

        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Lenient);

        Ok(Self { tag, env })
    }

    /// 描画対象となる範囲（バイトオフセット）を返す
    ///
    /// 式タグはそれぞれ独立した範囲になります。文タグ（`{% if %}`など）を
    /// 含む場合は、最初のタグから最後のタグまでを1つの範囲として扱います。
    pub(crate) fn spans(&self, text: &str) -> Vec<Range<usize>> {
        let tags: Vec<Range<usize>> = self.tag.find_iter(text).map(|m| m.range()).collect();
        let has_statement = tags.iter().any(|tag| text[tag.clone()].starts_with("{%"));

        match (tags.first(), tags.last()) {
            (Some(first), Some(last)) if has_statement => vec![first.start..last.end],
            _ => tags,
        }
    }

    /// `source`を描画した結果を返す
    ///
    /// マッピングにない名前は空文字列として描画し、`missing`に記録します。
    pub(crate) fn render(
        &self,
        source: &str,
        mapping: &PlaceholderMapping,
        missing: &mut BTreeSet<String>,
    ) -> Result<String, SheetMergeError> {
        let template = self.env.template_from_str(source)?;
        for name in template.undeclared_variables(false) {
            if !mapping.contains(&name) {
                missing.insert(name);
            }
        }
        Ok(template.render(mapping)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> PlaceholderMapping {
        let mut mapping = PlaceholderMapping::new();
        mapping.insert("puesto", "Engineer");
        mapping.insert("author", "Ana");
        mapping
    }

    fn render_all(text: &str, missing: &mut BTreeSet<String>) -> String {
        let renderer = PlaceholderRenderer::new().unwrap();
        let mut output = String::new();
        let mut pos = 0;
        for span in renderer.spans(text) {
            output.push_str(&text[pos..span.start]);
            output.push_str(&renderer.render(&text[span.clone()], &mapping(), missing).unwrap());
            pos = span.end;
        }
        output.push_str(&text[pos..]);
        output
    }

    #[test]
    fn test_render_replaces_known_names() {
        let mut missing = BTreeSet::new();

        let text = render_all("Puesto: {{puesto}} / {{ author }}", &mut missing);
        assert_eq!(text, "Puesto: Engineer / Ana");
        assert!(missing.is_empty());
    }

    #[test]
    fn test_render_unknown_names_are_empty() {
        let mut missing = BTreeSet::new();

        let text = render_all("[{{ epp }}]", &mut missing);
        assert_eq!(text, "[]");
        assert!(missing.contains("epp"));
    }

    #[test]
    fn test_render_filters_and_conditions() {
        let mut missing = BTreeSet::new();

        let text = render_all(
            "{{ author|upper }}: {% if state %}vigente{% else %}borrador{% endif %}",
            &mut missing,
        );
        assert_eq!(text, "ANA: borrador");
        assert_eq!(missing.into_iter().collect::<Vec<_>>(), vec!["state"]);
    }

    #[test]
    fn test_spans_per_expression() {
        let renderer = PlaceholderRenderer::new().unwrap();
        assert_eq!(renderer.spans("a {{ x }} b {{y}}"), vec![2..9, 12..17]);
        assert!(renderer.spans("{ single } and {{ unclosed").is_empty());
    }

    #[test]
    fn test_spans_statement_covers_block() {
        let renderer = PlaceholderRenderer::new().unwrap();
        let text = "a {% if x %}{{ y }}{% endif %} b";
        assert_eq!(renderer.spans(text), vec![2..30]);
    }

    #[test]
    fn test_render_invalid_syntax_is_error() {
        let renderer = PlaceholderRenderer::new().unwrap();
        let mut missing = BTreeSet::new();

        assert!(matches!(
            renderer.render("{{ puesto | }}", &mapping(), &mut missing),
            Err(SheetMergeError::Template(_))
        ));
    }
}
