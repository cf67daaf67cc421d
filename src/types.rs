// Wire shapes returned by the meme service. Field sets follow the
// service's JSON; everything optional defaults so an older or newer
// server does not break decoding.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Free-form render options passed through to the service as-is.
pub type MemeOptions = Map<String, Value>;

/// Ordering accepted by the key/info listing endpoints.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    Key,
    Keywords,
    KeywordsPinyin,
    DateCreated,
    DateModified,
}

impl SortBy {
    pub const ALL: [SortBy; 5] = [
        SortBy::Key,
        SortBy::Keywords,
        SortBy::KeywordsPinyin,
        SortBy::DateCreated,
        SortBy::DateModified,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortBy::Key => "key",
            SortBy::Keywords => "keywords",
            SortBy::KeywordsPinyin => "keywords_pinyin",
            SortBy::DateCreated => "date_created",
            SortBy::DateModified => "date_modified",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One template as described by `/memes/{key}/info`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MemeInfo {
    pub key: String,
    pub params: MemeParams,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub shortcuts: Vec<MemeShortcut>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub date_created: Option<String>,
    #[serde(default)]
    pub date_modified: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct MemeParams {
    #[serde(default)]
    pub min_images: u32,
    #[serde(default)]
    pub max_images: u32,
    #[serde(default)]
    pub min_texts: u32,
    #[serde(default)]
    pub max_texts: u32,
    #[serde(default)]
    pub default_texts: Vec<String>,
    #[serde(default)]
    pub options: Vec<MemeOption>,
}

/// Option schema; `kind` is the service's `type` tag (boolean, string,
/// integer, float). Kind-specific constraints are kept verbatim.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MemeOption {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub default: Value,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub choices: Option<Vec<String>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MemeShortcut {
    pub pattern: String,
    #[serde(default)]
    pub humanized: Option<String>,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub texts: Vec<String>,
    #[serde(default)]
    pub options: MemeOptions,
}

/// Result of a preview or generate call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ImageResponse {
    pub image_id: String,
}

/// Result of a multipart upload; the id is reused in generate calls.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UploadImageResponse {
    pub image_id: String,
}

/// Named image reference inside a generate request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ImageRef {
    pub name: String,
    pub id: String,
}

#[derive(Serialize, Debug)]
pub(crate) struct GenerateRequest<'a> {
    pub images: &'a [ImageRef],
    pub texts: &'a [String],
    pub options: &'a MemeOptions,
}

#[derive(Serialize, Debug)]
pub(crate) struct PreviewRequest<'a> {
    pub options: &'a MemeOptions,
}

#[derive(Serialize, Debug, Default)]
pub(crate) struct ListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
    #[serde(skip_serializing_if = "is_false")]
    pub sort_reverse: bool,
}

#[derive(Serialize, Debug)]
pub(crate) struct SearchQuery<'a> {
    pub query: &'a str,
    #[serde(skip_serializing_if = "is_false")]
    pub include_tags: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn meme_info_decodes_with_sparse_fields() {
        let raw = json!({
            "key": "petpet",
            "params": {
                "min_images": 1,
                "max_images": 1,
                "options": [
                    {"type": "boolean", "name": "circle", "default": false, "description": "round avatar"}
                ]
            },
            "keywords": ["pet"],
            "tags": ["animal"]
        });
        let info: MemeInfo = serde_json::from_value(raw).unwrap();
        assert_eq!(info.key, "petpet");
        assert_eq!(info.params.max_images, 1);
        assert_eq!(info.params.options[0].kind, "boolean");
        assert!(info.shortcuts.is_empty());
        assert!(info.date_created.is_none());
    }

    #[test]
    fn sort_by_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(SortBy::KeywordsPinyin).unwrap(),
            json!("keywords_pinyin")
        );
        assert_eq!(SortBy::DateModified.to_string(), "date_modified");
    }
}
