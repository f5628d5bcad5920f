//! Masking of credentials in request/response bodies before they are logged.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;

const MASK_CHAR: char = '*';

struct MaskRule {
    key: &'static str,
    visible_start: usize,
    visible_end: usize,
}

const RULES: &[MaskRule] = &[
    MaskRule { key: "gamekey", visible_start: 4, visible_end: 3 },
    MaskRule { key: "apikey", visible_start: 4, visible_end: 3 },
    MaskRule { key: "domainkey", visible_start: 3, visible_end: 3 },
    MaskRule { key: "sessiontoken", visible_start: 3, visible_end: 3 },
    MaskRule { key: "refreshtoken", visible_start: 3, visible_end: 3 },
    MaskRule { key: "token", visible_start: 3, visible_end: 3 },
    MaskRule { key: "xsessiontoken", visible_start: 3, visible_end: 3 },
    MaskRule { key: "xauthtoken", visible_start: 3, visible_end: 3 },
    MaskRule { key: "email", visible_start: 3, visible_end: 4 },
    MaskRule { key: "password", visible_start: 0, visible_end: 0 },
    MaskRule { key: "secret", visible_start: 0, visible_end: 0 },
];

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn rule_for(key: &str) -> Option<&'static MaskRule> {
    let normalized = normalize_key(key);
    RULES.iter().find(|rule| rule.key == normalized)
}

/// Keep the configured head and tail, star out the rest. Short values are hidden entirely.
fn mask(value: &str, rule: &MaskRule) -> String {
    let len = value.chars().count();
    let visible = rule.visible_start + rule.visible_end;
    if visible == 0 || len <= visible * 2 {
        return MASK_CHAR.to_string().repeat(len.max(1));
    }
    value
        .chars()
        .enumerate()
        .map(|(idx, ch)| {
            if idx < rule.visible_start || idx >= len - rule.visible_end {
                ch
            } else {
                MASK_CHAR
            }
        })
        .collect()
}

fn inline_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r#"(?ix)
                    (?P<prefix>
                        \b(?P<key>game_key|api_key|domain_key|session_token|refresh_token|token
                              |x-session-token|x-auth-token|email|password|secret)\b
                        \\?"?\s*[:=]\s*\\?"?
                    )
                    (?P<value>[^"'\\,\s}&]+)
                "#,
            )
            .ok()
        })
        .as_ref()
}

fn obfuscate_text(input: &str) -> String {
    let Some(pattern) = inline_pattern() else {
        return input.to_string();
    };
    pattern
        .replace_all(input, |caps: &Captures<'_>| {
            let value = &caps["value"];
            let masked = rule_for(&caps["key"])
                .map(|rule| mask(value, rule))
                .unwrap_or_else(|| value.to_string());
            format!("{}{}", &caps["prefix"], masked)
        })
        .into_owned()
}

fn obfuscate_value(value: &mut Value, key: Option<&str>) {
    let rule = key.and_then(rule_for);
    match value {
        Value::Object(map) => {
            for (child_key, child) in map {
                obfuscate_value(child, Some(child_key));
            }
        }
        Value::Array(items) => {
            for item in items {
                obfuscate_value(item, None);
            }
        }
        Value::String(text) => {
            if let Some(rule) = rule {
                *text = mask(text, rule);
            } else if let Ok(mut nested) = serde_json::from_str::<Value>(text)
                && nested.is_object()
            {
                obfuscate_value(&mut nested, None);
                if let Ok(serialized) = serde_json::to_string(&nested) {
                    *text = serialized;
                }
            }
        }
        _ => {}
    }
}

/// Mask credentials in a body for logging.
///
/// JSON bodies are masked by key; anything else goes through an inline
/// `key=value` / `"key":"value"` matcher. Never fails.
pub fn obfuscate_for_logging(body: &str) -> String {
    if body.is_empty() {
        return String::new();
    }
    if let Ok(mut structured) = serde_json::from_str::<Value>(body)
        && (structured.is_object() || structured.is_array())
    {
        obfuscate_value(&mut structured, None);
        if let Ok(serialized) = serde_json::to_string(&structured) {
            return serialized;
        }
    }
    obfuscate_text(body)
}
