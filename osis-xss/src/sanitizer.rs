// Input sanitization

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::borrow::Cow;
use tracing::{debug, trace};

static SCRIPT_ELEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<\s*script\b[^>]*>.*?<\s*/\s*script\s*>").unwrap());

static IFRAME_ELEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<\s*iframe\b[^>]*>.*?<\s*/\s*iframe\s*>").unwrap());

// Unpaired opening or closing tags, including ones cut off before `>`
static DANGEROUS_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<\s*/?\s*(script|iframe|object|embed)\b[^>]*>?").unwrap()
});

// An opening tag, possibly cut off before `>`; quoted values may hold `>`
static OPEN_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<\s*[a-z](?:"[^"]*"|'[^']*'|[^<>"'])*>?"#).unwrap()
});

// Only applied inside an `OPEN_TAG` match
static EVENT_HANDLER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bon[a-z]+\s*=\s*("[^"]*"|'[^']*'|[^\s>]*)"#).unwrap()
});

static SCRIPT_PROTOCOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(javascript|vbscript)\s*:").unwrap());

static DATA_HTML: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)data\s*:\s*text/html").unwrap());

/// Strips script-capable markup from user input
///
/// Sanitization is pure: the input is never modified and a fresh value is
/// returned. Markup that is not dangerous is left alone, so clean input comes
/// back byte-identical.
#[derive(Debug, Clone, Copy, Default)]
pub struct XssSanitizer;

impl XssSanitizer {
    /// Create a new sanitizer
    pub fn new() -> Self {
        Self
    }

    /// Remove dangerous substrings from a string.
    ///
    /// Passes repeat until nothing changes, so payloads assembled from the
    /// remains of a stripped tag (`<scr<script></script>ipt>`) are removed
    /// as well.
    pub fn clean(input: &str) -> String {
        let mut current = Cow::Borrowed(input);
        let mut passes = 0usize;

        loop {
            let next = strip_once(&current);
            if next == current {
                break;
            }
            passes += 1;
            current = Cow::Owned(next.into_owned());
        }

        if passes > 0 {
            trace!(passes, "Stripped dangerous content");
        }
        current.into_owned()
    }

    /// Sanitize every string leaf of a JSON object.
    ///
    /// Objects and arrays are walked recursively; numbers, booleans and null
    /// pass through. A non-object top-level value is returned unchanged.
    pub fn sanitize_json(value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(sanitize_map(map)),
            other => {
                debug!("Skipping sanitization of non-object body");
                other.clone()
            }
        }
    }

    /// Sanitize a single value of any shape
    pub fn sanitize_value(value: &Value) -> Value {
        match value {
            Value::String(s) => Value::String(Self::clean(s)),
            Value::Array(items) => Value::Array(items.iter().map(Self::sanitize_value).collect()),
            Value::Object(map) => Value::Object(sanitize_map(map)),
            other => other.clone(),
        }
    }
}

fn sanitize_map(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| (key.clone(), XssSanitizer::sanitize_value(value)))
        .collect()
}

fn strip_once(input: &str) -> Cow<'_, str> {
    let mut out = Cow::Borrowed(input);
    for pattern in [&*SCRIPT_ELEMENT, &*IFRAME_ELEMENT, &*DANGEROUS_TAG] {
        if pattern.is_match(&out) {
            out = Cow::Owned(pattern.replace_all(&out, "").into_owned());
        }
    }
    if let Cow::Owned(stripped) = strip_event_handlers(&out) {
        out = Cow::Owned(stripped);
    }
    for pattern in [&*SCRIPT_PROTOCOL, &*DATA_HTML] {
        if pattern.is_match(&out) {
            out = Cow::Owned(pattern.replace_all(&out, "").into_owned());
        }
    }
    out
}

/// Remove `on*=` attributes from tags, leaving text outside tags alone
fn strip_event_handlers(input: &str) -> Cow<'_, str> {
    if !EVENT_HANDLER.is_match(input) {
        return Cow::Borrowed(input);
    }
    OPEN_TAG.replace_all(input, |caps: &regex::Captures<'_>| {
        EVENT_HANDLER.replace_all(&caps[0], "").into_owned()
    })
}
