//! Structured-response extraction from raw model text.
//!
//! Models wrap their JSON in code fences, lead with prose, or append
//! commentary after the structure closes. `extract_structured` tries a fixed
//! sequence of recovery strategies and returns `None` when none of them
//! yields parseable JSON. `None` means "no data", never an error; callers
//! must not treat it as a failure of the call itself.

use serde_json::Value;
use tracing::debug;

/// Recover a JSON object or array from raw model output.
///
/// Strategies, in order:
/// 1. parse the trimmed text directly;
/// 2. strip a triple-backtick code fence (with or without a language tag)
///    and parse the fenced body;
/// 3. scan for the first balanced `{...}` or `[...]` span and parse that,
///    ignoring anything before or after it.
///
/// `debug` enables per-strategy trace logging and changes nothing else.
pub fn extract_structured(raw: &str, debug: bool) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_object() || value.is_array() {
            if debug {
                debug!(strategy = "direct", "structured extraction succeeded");
            }
            return Some(value);
        }
    }

    if let Some(fenced) = strip_code_fence(trimmed) {
        if let Some(value) = parse_balanced(fenced) {
            if debug {
                debug!(strategy = "code_fence", "structured extraction succeeded");
            }
            return Some(value);
        }
        if debug {
            debug!(strategy = "code_fence", "fence found but body did not parse");
        }
    }

    if let Some(value) = parse_balanced(trimmed) {
        if debug {
            debug!(strategy = "balanced_scan", "structured extraction succeeded");
        }
        return Some(value);
    }

    if debug {
        debug!("no parseable structure found in response");
    }
    None
}

/// Return the body of the first triple-backtick fence, tolerating an optional
/// language tag on the opening line.
fn strip_code_fence(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_ticks = &text[open + 3..];
    // Skip the language tag (e.g. "json") through the end of the opening line.
    let body_start = after_ticks.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_ticks[body_start..];
    let close = body.find("```").unwrap_or(body.len());
    Some(body[..close].trim())
}

/// Find the first balanced `{...}` or `[...]` span and parse it.
///
/// Depth counting is string-aware so braces inside quoted values do not
/// terminate the span early.
fn parse_balanced(text: &str) -> Option<Value> {
    let start = text.find(['{', '['])?;
    let candidate = &text[start..];
    let bytes = candidate.as_bytes();

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth -= 1;
                if depth == 0 {
                    let span = &candidate[..=i];
                    return serde_json::from_str::<Value>(span)
                        .ok()
                        .filter(|v| v.is_object() || v.is_array());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_raw_json() {
        let v = extract_structured(r#"{"score": 42}"#, false).unwrap();
        assert_eq!(v, json!({"score": 42}));
    }

    #[test]
    fn extracts_raw_array() {
        let v = extract_structured(r#"[1, 2, 3]"#, false).unwrap();
        assert_eq!(v, json!([1, 2, 3]));
    }

    #[test]
    fn extracts_from_code_fence_with_tag() {
        let raw = "```json\n{\"score\": 42}\n```";
        let v = extract_structured(raw, false).unwrap();
        assert_eq!(v, json!({"score": 42}));
    }

    #[test]
    fn extracts_from_code_fence_without_tag() {
        let raw = "```\n{\"score\": 42}\n```";
        let v = extract_structured(raw, false).unwrap();
        assert_eq!(v, json!({"score": 42}));
    }

    #[test]
    fn extracts_with_leading_prose() {
        let raw = "Here is my analysis of the article:\n{\"score\": 42}";
        let v = extract_structured(raw, false).unwrap();
        assert_eq!(v, json!({"score": 42}));
    }

    #[test]
    fn extracts_with_trailing_commentary() {
        let raw = "{\"score\": 42}\nLet me know if you need more detail.";
        let v = extract_structured(raw, false).unwrap();
        assert_eq!(v, json!({"score": 42}));
    }

    #[test]
    fn equivalent_content_extracts_identically() {
        let content = json!({"findings": [{"quote": "x", "severity": "high"}]});
        let plain = content.to_string();
        let fenced = format!("```json\n{plain}\n```");
        let prosed = format!("Sure, here you go:\n{plain}\nHope that helps!");

        assert_eq!(extract_structured(&plain, false).unwrap(), content);
        assert_eq!(extract_structured(&fenced, false).unwrap(), content);
        assert_eq!(extract_structured(&prosed, false).unwrap(), content);
    }

    #[test]
    fn braces_inside_strings_do_not_truncate() {
        let raw = r#"Note: {"quote": "use {x} carefully", "ok": true} done"#;
        let v = extract_structured(raw, false).unwrap();
        assert_eq!(v["quote"], "use {x} carefully");
    }

    #[test]
    fn returns_none_on_garbage() {
        assert!(extract_structured("no structure here at all", false).is_none());
        assert!(extract_structured("", false).is_none());
        assert!(extract_structured("{truncated", false).is_none());
    }

    #[test]
    fn bare_scalar_is_not_a_structure() {
        assert!(extract_structured("42", false).is_none());
    }

    #[test]
    fn debug_flag_does_not_change_output() {
        let raw = "```json\n[{\"a\": 1}]\n```";
        assert_eq!(
            extract_structured(raw, true),
            extract_structured(raw, false)
        );
    }
}
