//! Incremental JSON field extraction.
//!
//! Workflow applications stream their answer as a growing prefix of a JSON
//! envelope: `{"llm_result": "...", "rag_result": {...}, ...}`. At any
//! point the buffer may end mid-string or mid-object, so full-document
//! parsing only works on the last frame. These scanners recover the fields
//! from whatever prefix has arrived: quoted-string scanning for the answer
//! text, balanced-bracket scanning for the evidence objects.
//!
//! Nothing here errors on malformed input; a field that cannot be
//! recovered yet is simply absent.

use regex::Regex;
use serde_json::Value;

/// Fields recovered from one parse source snapshot.
#[derive(Debug, Clone, Default)]
pub struct ExtractedFields {
    pub answer: Option<String>,
    pub rag_result: Option<Value>,
    pub web_result: Option<Value>,
    /// True when the source was a complete JSON envelope with an answer.
    pub fully_parsed: bool,
}

/// Recover `llm_result` / `rag_result` / `web_result` from a complete or
/// still-growing JSON envelope. Plain text with no envelope markers is
/// treated as the answer itself (plain-chat mode).
pub fn extract_fields(source: &str) -> ExtractedFields {
    let mut fields = ExtractedFields::default();

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(source) {
        fields.rag_result = map.get("rag_result").filter(|v| !v.is_null()).cloned();
        fields.web_result = map.get("web_result").filter(|v| !v.is_null()).cloned();
        if let Some(text) = map.get("llm_result").and_then(Value::as_str)
            && !text.is_empty()
        {
            fields.answer = Some(text.to_string());
            fields.fully_parsed = true;
        }
    }

    if !fields.fully_parsed
        && let Some(partial) = extract_string_field(source, "llm_result")
    {
        fields.answer = Some(partial);
    }

    if fields.answer.as_deref().unwrap_or("").is_empty()
        && !fields.fully_parsed
        && !looks_structured(source)
    {
        fields.answer = Some(source.to_string());
    }

    if !fields.fully_parsed {
        if fields.rag_result.is_none() {
            fields.rag_result = extract_balanced_field(source, "rag_result");
        }
        if fields.web_result.is_none() {
            fields.web_result = extract_balanced_field(source, "web_result");
        }
    }

    fields
}

/// True when the text is a structured envelope rather than a bare answer.
fn looks_structured(source: &str) -> bool {
    source.trim_start().starts_with('{')
        && (source.contains("\"llm_result\"") || source.contains("\"rag_result\""))
}

/// Scan the string value of `key`, tolerating a missing closing quote.
///
/// Escape pairs are copied verbatim and decoded afterwards: strict JSON
/// string decoding first, manual unescaping of `\n`/`\t`/`\"` as the
/// fallback when the captured fragment is not a valid JSON string.
pub fn extract_string_field(source: &str, key: &str) -> Option<String> {
    let needle = format!("\"{}\"", key);
    let key_start = source.find(&needle)?;
    let after_key = key_start + needle.len();
    let quote_rel = source[after_key..].find('"')?;
    let value_start = after_key + quote_rel + 1;

    let mut raw = String::new();
    let mut chars = source[value_start..].chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => {
                    raw.push('\\');
                    raw.push(escaped);
                }
                None => break,
            },
            '"' => break,
            _ => raw.push(c),
        }
    }

    match serde_json::from_str::<String>(&format!("\"{}\"", raw)) {
        Ok(decoded) => Some(decoded),
        Err(_) => Some(
            raw.replace("\\n", "\n")
                .replace("\\t", "\t")
                .replace("\\\"", "\""),
        ),
    }
}

/// Extract the balanced `{...}`/`[...]` value of `key` and parse it.
///
/// Braces and brackets inside quoted strings are ignored, as are escaped
/// quotes inside them. Returns None while the span is still unbalanced
/// (document incomplete) or when the parsed span is not valid JSON.
pub fn extract_balanced_field(source: &str, key: &str) -> Option<Value> {
    let pattern = Regex::new(&format!(r#""{}"\s*:\s*"#, regex::escape(key)))
        .expect("static field pattern");
    let found = pattern.find(source)?;
    let start = found.end();

    let mut chars = source[start..].char_indices();
    let (_, open) = chars.next()?;
    if open != '{' && open != '[' {
        // null, string or number value; evidence fields are objects or lists
        return None;
    }

    let mut stack = vec![open];
    let mut in_quote = false;
    let mut escape = false;
    let mut end = None;

    for (offset, c) in chars {
        if in_quote {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_quote = false;
            }
        } else {
            match c {
                '"' => in_quote = true,
                '{' | '[' => stack.push(c),
                '}' | ']' => {
                    if matches!(
                        (stack.last(), c),
                        (Some('{'), '}') | (Some('['), ']')
                    ) {
                        stack.pop();
                    }
                }
                _ => {}
            }
        }

        if stack.is_empty() {
            end = Some(start + offset + c.len_utf8());
            break;
        }
    }

    serde_json::from_str(&source[start..end?]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_parse_reads_all_fields() {
        let source = r#"{"llm_result": "done", "rag_result": {"chunkList": []}, "web_result": null}"#;
        let fields = extract_fields(source);
        assert!(fields.fully_parsed);
        assert_eq!(fields.answer.as_deref(), Some("done"));
        assert_eq!(fields.rag_result, Some(json!({"chunkList": []})));
        assert!(fields.web_result.is_none());
    }

    #[test]
    fn unterminated_string_yields_partial_answer() {
        let fields = extract_fields(r#"{"llm_result": "Hel"#);
        assert!(!fields.fully_parsed);
        assert_eq!(fields.answer.as_deref(), Some("Hel"));
    }

    #[test]
    fn partial_answer_decodes_escapes() {
        let fields = extract_fields(r#"{"llm_result": "line\nnext \"quoted\" tab\t"#);
        assert_eq!(
            fields.answer.as_deref(),
            Some("line\nnext \"quoted\" tab\t")
        );
    }

    #[test]
    fn trailing_lone_backslash_is_dropped() {
        let fields = extract_fields(r#"{"llm_result": "Hel\"#);
        assert_eq!(fields.answer.as_deref(), Some("Hel"));
    }

    #[test]
    fn plain_text_is_the_answer() {
        let fields = extract_fields("Just a plain reply.");
        assert!(!fields.fully_parsed);
        assert_eq!(fields.answer.as_deref(), Some("Just a plain reply."));
    }

    #[test]
    fn incomplete_envelope_without_answer_stays_empty() {
        // Workflow streaming internal state before any LLM text
        let fields = extract_fields(r#"{"rag_result": {"chunkList": [{"ti"#);
        assert!(fields.answer.is_none() || fields.answer.as_deref() == Some(""));
        assert!(fields.rag_result.is_none());
    }

    #[test]
    fn balanced_extraction_ignores_trailing_content() {
        let source = r#"{"llm_result": "x", "rag_result": {"chunkList":[{"title":"A"}]}, "other":1}"#;
        let value = extract_balanced_field(source, "rag_result").unwrap();
        assert_eq!(value, json!({"chunkList": [{"title": "A"}]}));
    }

    #[test]
    fn balanced_extraction_skips_brackets_inside_quotes() {
        let source = r#""web_result": [{"title": "a } b ] c", "link": "u"}] tail"#;
        let value = extract_balanced_field(source, "web_result").unwrap();
        assert_eq!(value, json!([{"title": "a } b ] c", "link": "u"}]));
    }

    #[test]
    fn balanced_extraction_handles_escaped_quotes() {
        let source = r#""rag_result": {"title": "say \"hi\""} rest"#;
        let value = extract_balanced_field(source, "rag_result").unwrap();
        assert_eq!(value, json!({"title": "say \"hi\""}));
    }

    #[test]
    fn unbalanced_span_is_not_yet_available() {
        let source = r#""rag_result": {"chunkList": [{"title": "A"}"#;
        assert!(extract_balanced_field(source, "rag_result").is_none());
    }

    #[test]
    fn non_container_value_is_ignored() {
        assert!(extract_balanced_field(r#""rag_result": null"#, "rag_result").is_none());
        assert!(extract_balanced_field(r#""rag_result": "str""#, "rag_result").is_none());
    }

    #[test]
    fn missing_key_returns_none() {
        assert!(extract_string_field("{}", "llm_result").is_none());
        assert!(extract_balanced_field("{}", "rag_result").is_none());
    }

    #[test]
    fn growing_prefix_answers_are_monotonic() {
        let full = r#"{"llm_result": "Hello world", "rag_result": {"chunkList": []}}"#;
        let mut last_len = 0;
        for cut in 0..full.len() {
            if !full.is_char_boundary(cut) {
                continue;
            }
            let fields = extract_fields(&full[..cut]);
            if let Some(answer) = fields.answer
                && full[..cut].contains("\"llm_result\"")
            {
                assert!(answer.chars().count() >= last_len);
                last_len = answer.chars().count();
            }
        }
    }
}
