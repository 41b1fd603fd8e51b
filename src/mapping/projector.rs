//! Field Projector
//!
//! 解決済みレコードの属性列を、固定オフセットでプレースホルダー名に対応付けます。

use crate::config::ProjectedField;
use crate::mapping::Record;
use crate::types::PlaceholderMapping;

/// レコード → プレースホルダーマッピングの射影
#[derive(Debug, Clone, Copy)]
pub struct FieldProjector<'a> {
    fields: &'a [ProjectedField],
}

impl<'a> FieldProjector<'a> {
    pub fn new(fields: &'a [ProjectedField]) -> Self {
        Self { fields }
    }

    /// レコードを射影する
    ///
    /// 末尾の列が省略された行でも失敗せず、範囲外のオフセットは空文字列になります。
    /// 射影テーブルのすべての名前が結果に含まれます。
    pub fn project(&self, record: &Record) -> PlaceholderMapping {
        self.fields
            .iter()
            .map(|field| (field.name.clone(), record.attribute(field.offset).to_string()))
            .collect()
    }
}
