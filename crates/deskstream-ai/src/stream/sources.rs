//! Evidence normalization.
//!
//! Retrieval and web-search evidence arrives in several shapes: a standard
//! document-reference list, a `rag_result` that may be an object with a
//! nested `chunkList`, a bare list, or a single object, and a `web_result`
//! that may be an object or a list. All of them flatten into one list of
//! tagged records with a canonical title and url so the client renders a
//! single source panel.

use serde::Serialize;
use serde_json::{Map, Value};

const RAG_TITLE_PLACEHOLDER: &str = "knowledge-base document";
const WEB_TITLE_PLACEHOLDER: &str = "web search result";
const URL_PLACEHOLDER: &str = "#";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Rag,
    Web,
}

/// One normalized evidence item. Original fields are preserved verbatim;
/// the canonical `type`/`title`/`url` replace any same-named originals.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRecord {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub title: String,
    pub url: String,
}

impl SourceRecord {
    fn from_object(item: &Map<String, Value>, kind: SourceKind, title: String, url: String) -> Self {
        let mut fields = item.clone();
        // canonical fields win over same-named originals
        fields.remove("type");
        fields.remove("title");
        fields.remove("url");
        Self {
            fields,
            kind,
            title,
            url,
        }
    }

    /// Wrapper for non-object chunk entries so nothing is dropped.
    fn from_raw(raw: &Value, kind: SourceKind, title: String, url: String) -> Self {
        let mut fields = Map::new();
        fields.insert("raw".to_string(), raw.clone());
        Self {
            fields,
            kind,
            title,
            url,
        }
    }
}

/// Non-empty string field lookup. Empty strings fall through to the next
/// candidate, matching how the vendor pads absent fields.
fn text_field(item: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        item.get(*key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

fn rag_record(item: &Map<String, Value>, title_keys: &[&str], url_keys: &[&str]) -> SourceRecord {
    let title =
        text_field(item, title_keys).unwrap_or_else(|| RAG_TITLE_PLACEHOLDER.to_string());
    let url = text_field(item, url_keys).unwrap_or_else(|| URL_PLACEHOLDER.to_string());
    SourceRecord::from_object(item, SourceKind::Rag, title, url)
}

/// Flatten all evidence observed so far into one normalized list.
pub fn collect_sources(
    doc_references: Option<&[Value]>,
    rag_result: Option<&Value>,
    web_result: Option<&Value>,
) -> Vec<SourceRecord> {
    let mut sources = Vec::new();

    if let Some(refs) = doc_references {
        for item in refs {
            if let Value::Object(map) = item {
                sources.push(rag_record(
                    map,
                    &["title", "documentName"],
                    &["docUrl", "url"],
                ));
            }
        }
    }

    if let Some(rag) = rag_result {
        append_rag_sources(&mut sources, rag);
    }

    if let Some(web) = web_result {
        append_web_sources(&mut sources, web);
    }

    sources
}

fn append_rag_sources(sources: &mut Vec<SourceRecord>, rag: &Value) {
    match rag {
        Value::Object(map) if map.contains_key("chunkList") => {
            let Some(Value::Array(chunks)) = map.get("chunkList") else {
                return;
            };
            for item in chunks {
                match item {
                    Value::Object(chunk) => sources.push(rag_record(
                        chunk,
                        &["title", "documentName"],
                        &["docUrl", "url"],
                    )),
                    other => sources.push(SourceRecord::from_raw(
                        other,
                        SourceKind::Rag,
                        RAG_TITLE_PLACEHOLDER.to_string(),
                        URL_PLACEHOLDER.to_string(),
                    )),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                if let Value::Object(map) = item {
                    sources.push(rag_record(
                        map,
                        &["title", "doc_name"],
                        &["url", "docUrl", "doc_id"],
                    ));
                }
            }
        }
        Value::Object(map) => {
            sources.push(rag_record(
                map,
                &["title", "documentName"],
                &["docUrl", "url"],
            ));
        }
        _ => {}
    }
}

fn append_web_sources(sources: &mut Vec<SourceRecord>, web: &Value) {
    let items: Vec<&Value> = match web {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    for item in items {
        if let Value::Object(map) = item {
            let title = text_field(map, &["title"])
                .unwrap_or_else(|| WEB_TITLE_PLACEHOLDER.to_string());
            let url = text_field(map, &["link", "url"])
                .unwrap_or_else(|| URL_PLACEHOLDER.to_string());
            sources.push(SourceRecord::from_object(map, SourceKind::Web, title, url));
        }
    }
}
