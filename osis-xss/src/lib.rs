//! # OSIS XSS Protection
//!
//! Strips script-capable markup from registration input before it is
//! validated or stored.
//!
//! ## Features
//!
//! - **String cleaning** - removes `<script>`/`<iframe>` elements, stray
//!   script/iframe/object/embed tags, `javascript:`/`vbscript:`/`data:text/html`
//!   URIs and inline `on*=` handlers, repeating until nothing changes
//! - **JSON sanitization** - applies the string rule to every leaf of a
//!   request body
//! - **Detection** - names the attack type so callers can log what was found
//!
//! ## Quick Start
//!
//! ```rust
//! use osis_xss::{XssDetector, XssSanitizer, AttackType};
//! use serde_json::json;
//!
//! assert_eq!(XssSanitizer::clean("<script>alert(1)</script>Hello"), "Hello");
//!
//! let body = json!({ "motto": "<img src=x onerror=alert(1)>Semangat" });
//! let findings = XssDetector::scan_json(&body);
//! assert_eq!(findings[0].attack, AttackType::EventHandler);
//!
//! let clean = XssSanitizer::sanitize_json(&body);
//! assert_eq!(clean["motto"], "<img src=x >Semangat");
//! ```

mod detector;
mod sanitizer;

pub use detector::{AttackType, XssDetector, XssFinding};
pub use sanitizer::XssSanitizer;
