//! Validation rule engine for the OSIS registration portal
//!
//! Field checks compose into [`FieldRule`]s, and a [`RuleSet`] evaluates a
//! declarative table of rules against a [`ValidationRequest`] in one pass,
//! activating conditional rules from the content of other fields.
//!
//! # Examples
//!
//! ## Conditional rules
//!
//! ```
//! use osis_validation::{Activation, FieldRule, Length, OneOf, RuleSet, ValidationRequest};
//!
//! let rules = RuleSet::new()
//!     .rule(
//!         FieldRule::required("divisi", "Divisi")
//!             .list(1, 2)
//!             .check(OneOf(&["Seni", "Olahraga"])),
//!     )
//!     .rule(
//!         FieldRule::required("alasan_Seni", "Alasan memilih divisi Seni")
//!             .check(Length::between(10, 500))
//!             .active_when(Activation::contains("divisi", "Seni")),
//!     );
//!
//! let request = ValidationRequest::new().with("divisi", vec!["Olahraga"]);
//! assert!(rules.validate(&request).is_valid());
//!
//! let request = ValidationRequest::new().with("divisi", "Seni");
//! let report = rules.validate(&request);
//! assert_eq!(report.error_count, 1);
//! assert!(report.has_field("alasan_Seni"));
//! ```
//!
//! ## Single checks
//!
//! ```
//! use osis_validation::{PhoneNumber, Validator};
//!
//! assert!(PhoneNumber::default().validate("0812-3456-7890", "Nomor telepon").is_ok());
//! assert!(PhoneNumber::default().validate("12345", "Nomor telepon").is_err());
//! ```

mod errors;
pub mod registration;
mod rules;
mod traits;
mod validators;
mod value;

pub use errors::*;
pub use rules::*;
pub use traits::*;
pub use validators::*;
pub use value::*;
