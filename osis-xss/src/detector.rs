// XSS pattern detection

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

static SCRIPT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<\s*/?\s*script\b").unwrap());

// `on*=` inside an opening tag, not inside a quoted attribute value
static EVENT_HANDLER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<\s*[a-z](?:"[^"]*"|'[^']*'|[^<>"'])*?\bon[a-z]+\s*="#).unwrap()
});

static JAVASCRIPT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)javascript\s*:").unwrap());

static VBSCRIPT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)vbscript\s*:").unwrap());

static DATA_URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)data\s*:\s*text/html").unwrap());

static IFRAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<\s*/?\s*iframe\b").unwrap());

static OBJECT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<\s*/?\s*(object|embed)\b").unwrap());

/// Kind of injection found in a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackType {
    /// `<script>` elements or tags
    ScriptInjection,
    /// Inline `on*=` handlers
    EventHandler,
    /// `javascript:` URIs
    JavaScriptProtocol,
    /// `vbscript:` URIs
    VbScriptProtocol,
    /// `data:text/html` URIs
    DataUrl,
    /// `<iframe>` elements or tags
    IframeInjection,
    /// `<object>` or `<embed>` tags
    ObjectEmbed,
}

impl AttackType {
    /// Short human-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScriptInjection => "Script injection",
            Self::EventHandler => "Event handler injection",
            Self::JavaScriptProtocol => "JavaScript protocol",
            Self::VbScriptProtocol => "VBScript protocol",
            Self::DataUrl => "Data URL injection",
            Self::IframeInjection => "Iframe injection",
            Self::ObjectEmbed => "Object/embed injection",
        }
    }
}

impl fmt::Display for AttackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A suspicious string found while scanning a JSON document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XssFinding {
    /// Dotted path to the string, e.g. `divisi[1]`
    pub path: String,
    /// First attack type that matched
    pub attack: AttackType,
}

/// XSS pattern detector
pub struct XssDetector;

impl XssDetector {
    /// Check if text contains a potential XSS payload
    pub fn contains_xss(text: &str) -> bool {
        Self::detect_attack_type(text).is_some()
    }

    /// Detect the first matching attack type
    pub fn detect_attack_type(text: &str) -> Option<AttackType> {
        if SCRIPT_PATTERN.is_match(text) {
            return Some(AttackType::ScriptInjection);
        }
        if IFRAME_PATTERN.is_match(text) {
            return Some(AttackType::IframeInjection);
        }
        if OBJECT_PATTERN.is_match(text) {
            return Some(AttackType::ObjectEmbed);
        }
        if EVENT_HANDLER_PATTERN.is_match(text) {
            return Some(AttackType::EventHandler);
        }
        if JAVASCRIPT_PATTERN.is_match(text) {
            return Some(AttackType::JavaScriptProtocol);
        }
        if VBSCRIPT_PATTERN.is_match(text) {
            return Some(AttackType::VbScriptProtocol);
        }
        if DATA_URL_PATTERN.is_match(text) {
            return Some(AttackType::DataUrl);
        }
        None
    }

    /// Walk a JSON document and report every suspicious string leaf
    pub fn scan_json(value: &Value) -> Vec<XssFinding> {
        let mut findings = Vec::new();
        scan(value, String::new(), &mut findings);
        findings
    }
}

fn scan(value: &Value, path: String, findings: &mut Vec<XssFinding>) {
    match value {
        Value::String(s) => {
            if let Some(attack) = XssDetector::detect_attack_type(s) {
                findings.push(XssFinding { path, attack });
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                scan(item, format!("{}[{}]", path, i), findings);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                scan(item, child, findings);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_script_injection() {
        assert_eq!(
            XssDetector::detect_attack_type("<script>alert('XSS')</script>"),
            Some(AttackType::ScriptInjection)
        );
        assert_eq!(
            XssDetector::detect_attack_type("< SCRIPT src=x>"),
            Some(AttackType::ScriptInjection)
        );
    }

    #[test]
    fn test_event_handler_injection() {
        let xss = r#"<img src="x" onerror="alert('XSS')">"#;
        assert_eq!(
            XssDetector::detect_attack_type(xss),
            Some(AttackType::EventHandler)
        );
        assert!(XssDetector::contains_xss("<a onclick=go()>x</a>"));
        assert!(!XssDetector::contains_xss("mode online=aktif"));
    }

    #[test]
    fn test_protocols() {
        assert_eq!(
            XssDetector::detect_attack_type(r#"<a href="javascript:void(0)">Link</a>"#),
            Some(AttackType::JavaScriptProtocol)
        );
        assert_eq!(
            XssDetector::detect_attack_type("vbscript:msgbox(1)"),
            Some(AttackType::VbScriptProtocol)
        );
        assert_eq!(
            XssDetector::detect_attack_type("data:text/html;base64,PHNjcmlwdD4="),
            Some(AttackType::DataUrl)
        );
    }

    #[test]
    fn test_tags() {
        assert_eq!(
            XssDetector::detect_attack_type(r#"<iframe src="x"></iframe>"#),
            Some(AttackType::IframeInjection)
        );
        assert_eq!(
            XssDetector::detect_attack_type(r#"<embed src="x.swf">"#),
            Some(AttackType::ObjectEmbed)
        );
    }

    #[test]
    fn test_safe_content() {
        for safe in [
            "Budi Santoso",
            "Jl. Merdeka No. 10, Bandung",
            "Saya ingin belajar berorganisasi <3",
            "Ikut lomba online tingkat nasional",
        ] {
            assert!(!XssDetector::contains_xss(safe), "{} flagged", safe);
        }
    }

    #[test]
    fn test_scan_json_paths() {
        let doc = json!({
            "nama_lengkap": "Budi",
            "divisi": ["Seni", "<script>x</script>"],
            "meta": { "motto": "<img onerror=alert(1)>" },
            "umur": 16
        });
        let findings = XssDetector::scan_json(&doc);
        assert_eq!(findings.len(), 2);
        assert!(findings.contains(&XssFinding {
            path: "divisi[1]".to_string(),
            attack: AttackType::ScriptInjection,
        }));
        assert!(findings.contains(&XssFinding {
            path: "meta.motto".to_string(),
            attack: AttackType::EventHandler,
        }));
    }
}
