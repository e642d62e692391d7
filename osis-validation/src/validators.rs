// Built-in validators

use crate::Validator;
use chrono::{Local, Months, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

// Common regex patterns
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$").unwrap()
});

static URL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").unwrap());

static NUMERIC_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").unwrap());

static INTEGER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?[0-9]+$").unwrap());

/// Inclusive bounds on the trimmed value's character count
#[derive(Debug, Clone, Copy)]
pub struct Length {
    pub min: usize,
    pub max: usize,
}

impl Length {
    pub fn between(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn max(max: usize) -> Self {
        Self { min: 0, max }
    }
}

impl Validator for Length {
    fn validate(&self, value: &str, label: &str) -> Result<(), String> {
        let len = value.trim().chars().count();
        if len < self.min {
            Err(format!("{} minimal {} karakter", label, self.min))
        } else if len > self.max {
            Err(format!("{} maksimal {} karakter", label, self.max))
        } else {
            Ok(())
        }
    }

    fn name(&self) -> &'static str {
        "length"
    }
}

/// Custom regex validator
#[derive(Debug, Clone)]
pub struct Matches {
    regex: Regex,
    message: String,
}

impl Matches {
    /// Compile a pattern with the failure message to report
    pub fn new(pattern: &str, message: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            message: message.into(),
        })
    }

    /// Wrap an already compiled regex
    pub fn regex(regex: Regex, message: impl Into<String>) -> Self {
        Self {
            regex,
            message: message.into(),
        }
    }
}

impl Validator for Matches {
    fn validate(&self, value: &str, label: &str) -> Result<(), String> {
        if self.regex.is_match(value.trim()) {
            Ok(())
        } else {
            Err(self.message.replace("{label}", label))
        }
    }

    fn name(&self) -> &'static str {
        "matches"
    }
}

/// Membership in a fixed set of allowed literals
#[derive(Debug, Clone, Copy)]
pub struct OneOf(pub &'static [&'static str]);

impl Validator for OneOf {
    fn validate(&self, value: &str, label: &str) -> Result<(), String> {
        if self.0.contains(&value.trim()) {
            Ok(())
        } else {
            Err(format!("{} tidak valid", label))
        }
    }

    fn name(&self) -> &'static str {
        "oneOf"
    }
}

type PredicateFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Arbitrary predicate with a fixed failure message
#[derive(Clone)]
pub struct Predicate {
    check: PredicateFn,
    message: String,
}

impl Predicate {
    /// `message` may contain `{label}`, replaced with the field label
    pub fn new<F>(message: impl Into<String>, check: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            check: Arc::new(check),
            message: message.into(),
        }
    }
}

impl Validator for Predicate {
    fn validate(&self, value: &str, label: &str) -> Result<(), String> {
        if (self.check)(value) {
            Ok(())
        } else {
            Err(self.message.replace("{label}", label))
        }
    }

    fn name(&self) -> &'static str {
        "predicate"
    }
}

/// Validates email format
#[derive(Debug, Clone, Copy)]
pub struct IsEmail;

impl Validator for IsEmail {
    fn validate(&self, value: &str, label: &str) -> Result<(), String> {
        if EMAIL_REGEX.is_match(value.trim()) {
            Ok(())
        } else {
            Err(format!("Format {} tidak valid", label.to_lowercase()))
        }
    }

    fn name(&self) -> &'static str {
        "isEmail"
    }
}

/// Validates URL format
#[derive(Debug, Clone, Copy)]
pub struct IsUrl;

impl Validator for IsUrl {
    fn validate(&self, value: &str, label: &str) -> Result<(), String> {
        if URL_REGEX.is_match(value.trim()) {
            Ok(())
        } else {
            Err(format!("{} harus berupa URL yang valid", label))
        }
    }

    fn name(&self) -> &'static str {
        "isUrl"
    }
}

/// Validates numeric characters only
#[derive(Debug, Clone, Copy)]
pub struct IsNumeric;

impl Validator for IsNumeric {
    fn validate(&self, value: &str, label: &str) -> Result<(), String> {
        if NUMERIC_REGEX.is_match(value.trim()) {
            Ok(())
        } else {
            Err(format!("{} hanya boleh berisi angka", label))
        }
    }

    fn name(&self) -> &'static str {
        "isNumeric"
    }
}

/// Integer within inclusive bounds
#[derive(Debug, Clone, Copy)]
pub struct IsInteger {
    pub min: i64,
    pub max: i64,
}

impl Validator for IsInteger {
    fn validate(&self, value: &str, label: &str) -> Result<(), String> {
        let value = value.trim();
        let parsed = if INTEGER_REGEX.is_match(value) {
            value.parse::<i64>().ok()
        } else {
            None
        };
        match parsed {
            Some(n) if n >= self.min && n <= self.max => Ok(()),
            _ => Err(format!(
                "{} harus berupa angka antara {} dan {}",
                label, self.min, self.max
            )),
        }
    }

    fn name(&self) -> &'static str {
        "isInt"
    }
}

/// Boolean literal (`true`/`false`, `1`/`0`)
#[derive(Debug, Clone, Copy)]
pub struct IsBoolean;

impl IsBoolean {
    /// Parse an accepted boolean literal
    pub fn parse(value: &str) -> Option<bool> {
        match value.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }
}

impl Validator for IsBoolean {
    fn validate(&self, value: &str, label: &str) -> Result<(), String> {
        match Self::parse(value) {
            Some(_) => Ok(()),
            None => Err(format!("{} harus berupa boolean", label)),
        }
    }

    fn name(&self) -> &'static str {
        "isBoolean"
    }
}

/// Indonesian phone number shape check.
///
/// Non-digits are stripped first; the cleaned number must start with one of
/// the national prefixes and have between `min_digits` and `max_digits`
/// digits inclusive.
#[derive(Debug, Clone)]
pub struct PhoneNumber {
    pub prefixes: Vec<String>,
    pub min_digits: usize,
    pub max_digits: usize,
}

impl PhoneNumber {
    /// Strip everything but ASCII digits
    pub fn clean(value: &str) -> String {
        value.chars().filter(char::is_ascii_digit).collect()
    }

    /// Override the accepted prefixes
    pub fn with_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for PhoneNumber {
    fn default() -> Self {
        Self {
            prefixes: vec!["08".to_string(), "628".to_string()],
            min_digits: 10,
            max_digits: 15,
        }
    }
}

impl Validator for PhoneNumber {
    fn validate(&self, value: &str, label: &str) -> Result<(), String> {
        let cleaned = Self::clean(value);
        let prefix_ok = self.prefixes.iter().any(|p| cleaned.starts_with(p.as_str()));
        let len_ok = (self.min_digits..=self.max_digits).contains(&cleaned.len());
        if prefix_ok && len_ok {
            Ok(())
        } else {
            Err(format!(
                "Format {} tidak valid (contoh: 08123456789)",
                label.to_lowercase()
            ))
        }
    }

    fn name(&self) -> &'static str {
        "isPhone"
    }
}

/// Age derived from an ISO-8601 birth date must fall within inclusive bounds.
///
/// Uses calendar month arithmetic: the date is valid when
/// `today - max_years <= birth <= today - min_years`.
#[derive(Debug, Clone, Copy)]
pub struct AgeRange {
    pub min_years: u32,
    pub max_years: u32,
    today: Option<NaiveDate>,
}

impl AgeRange {
    pub fn new(min_years: u32, max_years: u32) -> Self {
        Self {
            min_years,
            max_years,
            today: None,
        }
    }

    /// Pin the reference date instead of reading the local clock
    pub fn as_of(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());
        let earliest = today.checked_sub_months(Months::new(self.max_years * 12))?;
        let latest = today.checked_sub_months(Months::new(self.min_years * 12))?;
        Some((earliest, latest))
    }
}

impl Validator for AgeRange {
    fn validate(&self, value: &str, label: &str) -> Result<(), String> {
        let birth = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
            .map_err(|_| format!("{} harus berformat YYYY-MM-DD", label))?;
        let (earliest, latest) = self
            .bounds()
            .ok_or_else(|| format!("{} tidak valid", label))?;

        if birth < earliest || birth > latest {
            Err(format!(
                "Usia harus antara {} dan {} tahun",
                self.min_years, self.max_years
            ))
        } else {
            Ok(())
        }
    }

    fn name(&self) -> &'static str {
        "ageRange"
    }
}
