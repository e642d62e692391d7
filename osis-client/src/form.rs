//! Registration form as the applicant fills it in

use crate::compress::Attachment;
use crate::error::{ClientError, Result};
use bytes::Bytes;
use osis_validation::{
    FieldValue, RuleSet, ValidationReport, ValidationRequest, registration::registration_rules,
};

/// Text fields and attachments of one registration.
///
/// Text fields keep their order; a name given more than once (`divisi`,
/// `organisasi_nama`, ...) is sent as a repeated multipart part and
/// validated as a list.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    fields: Vec<(String, String)>,
    attachments: Vec<Attachment>,
}

impl RegistrationForm {
    /// Create an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text value.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Add a file, guessing its content type from the file name.
    pub fn file(
        self,
        field: impl Into<String>,
        file_name: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        self.attach(Attachment::new(field, file_name, data))
    }

    /// Add a prepared attachment.
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Text fields in insertion order.
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Attached files.
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub(crate) fn into_parts(self) -> (Vec<(String, String)>, Vec<Attachment>) {
        (self.fields, self.attachments)
    }

    /// Group the text fields into a [`ValidationRequest`].
    pub fn to_request(&self) -> ValidationRequest {
        let mut grouped: Vec<(&str, Vec<String>)> = Vec::new();
        for (name, value) in &self.fields {
            let name = name.strip_suffix("[]").unwrap_or(name);
            match grouped.iter_mut().find(|(n, _)| *n == name) {
                Some((_, values)) => values.push(value.clone()),
                None => grouped.push((name, vec![value.clone()])),
            }
        }

        grouped
            .into_iter()
            .map(|(name, mut values)| {
                let value = if values.len() == 1 {
                    FieldValue::Text(values.remove(0))
                } else {
                    FieldValue::List(values)
                };
                (name, value)
            })
            .collect()
    }

    /// Check against the portal's registration rules.
    pub fn validate(&self) -> Result<()> {
        self.validate_with(&registration_rules())
    }

    /// Check against a custom rule table.
    pub fn validate_with(&self, rules: &RuleSet) -> Result<()> {
        let report = rules.validate(&self.to_request());
        report_result(report)
    }
}

fn report_result(report: ValidationReport) -> Result<()> {
    if report.is_valid() {
        Ok(())
    } else {
        Err(ClientError::Validation(report))
    }
}
