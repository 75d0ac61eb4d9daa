//! Form input, client-side validation and request payloads.
//!
//! Validation mirrors the server's rules so obviously bad submissions never
//! leave the client.

use std::collections::BTreeMap;

use bytes::Bytes;
use reqwest::multipart;
use serde_json::{Map, Value};

use crate::errors::{FieldError, SyncError, SyncResult};

/// A file picked for upload.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Multipart field name, e.g. `images`
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl Attachment {
    pub fn new(
        field: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }
}

/// Field values and attachments entered into a form.
#[derive(Debug, Clone, Default)]
pub struct FormFields {
    pub values: Map<String, Value>,
    pub attachments: Vec<Attachment>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn attachment_count(&self, field: &str) -> usize {
        self.attachments.iter().filter(|a| a.field == field).count()
    }

    /// JSON when there is nothing to upload, multipart otherwise.
    pub fn to_payload(&self) -> Payload {
        if self.attachments.is_empty() {
            Payload::Json(Value::Object(self.values.clone()))
        } else {
            Payload::Multipart {
                fields: self
                    .values
                    .iter()
                    .map(|(k, v)| (k.clone(), multipart_text(v)))
                    .collect(),
                files: self.attachments.clone(),
            }
        }
    }
}

fn multipart_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

/// Request body for a create or update.
#[derive(Debug, Clone)]
pub enum Payload {
    Json(Value),
    Multipart {
        fields: BTreeMap<String, String>,
        files: Vec<Attachment>,
    },
}

impl Payload {
    pub fn is_multipart(&self) -> bool {
        matches!(self, Payload::Multipart { .. })
    }

    /// Build the reqwest multipart form.
    pub fn into_form(
        fields: BTreeMap<String, String>,
        files: Vec<Attachment>,
    ) -> SyncResult<multipart::Form> {
        let mut form = multipart::Form::new();
        for (name, value) in fields {
            form = form.text(name, value);
        }
        for file in files {
            let part = multipart::Part::bytes(file.bytes.to_vec())
                .file_name(file.file_name)
                .mime_str(&file.content_type)
                .map_err(|e| {
                    SyncError::Validation(vec![FieldError::new(
                        file.field.clone(),
                        format!("Unsupported file type: {}", e),
                    )])
                })?;
            form = form.part(file.field, part);
        }
        Ok(form)
    }
}

/// One validation rule.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Non-empty value
    Required { field: &'static str, label: &'static str },
    /// At least `min` files on this multipart field
    MinAttachments {
        field: &'static str,
        min: usize,
        message: &'static str,
    },
    /// `#RGB` or `#RRGGBB` when present
    HexColor { field: &'static str },
    /// Something shaped like an e-mail address when present
    Email { field: &'static str },
    /// Integer year within bounds when present
    Year { field: &'static str },
}

impl Rule {
    fn field(&self) -> &'static str {
        match self {
            Rule::Required { field, .. }
            | Rule::MinAttachments { field, .. }
            | Rule::HexColor { field }
            | Rule::Email { field }
            | Rule::Year { field } => *field,
        }
    }

    fn check(&self, fields: &FormFields) -> Option<FieldError> {
        match self {
            Rule::Required { field, label } => is_blank(fields.get(field))
                .then(|| FieldError::new(*field, format!("{} is required", label))),
            Rule::MinAttachments {
                field,
                min,
                message,
            } => (fields.attachment_count(field) < *min)
                .then(|| FieldError::new(*field, *message)),
            Rule::HexColor { field } => match fields.get(field) {
                Some(Value::String(s)) if !s.trim().is_empty() && !is_hex_color(s.trim()) => Some(
                    FieldError::new(*field, "Color must be a hex value like #1A2B3C"),
                ),
                _ => None,
            },
            Rule::Email { field } => match fields.get(field) {
                Some(Value::String(s)) if !s.trim().is_empty() && !is_email(s.trim()) => {
                    Some(FieldError::new(*field, "Please enter a valid email address"))
                }
                _ => None,
            },
            Rule::Year { field } => {
                let value = fields.get(field)?;
                if is_blank(Some(value)) {
                    return None;
                }
                let year = match value {
                    Value::Number(n) => n.as_i64(),
                    Value::String(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                };
                match year {
                    Some(y) if (1900..=2100).contains(&y) => None,
                    _ => Some(FieldError::new(*field, "Year must be between 1900 and 2100")),
                }
            }
        }
    }
}

pub fn is_hex_color(value: &str) -> bool {
    let Some(hex) = value.strip_prefix('#') else {
        return false;
    };
    matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Validation rules for one content type.
#[derive(Debug, Clone, Default)]
pub struct FormSchema {
    rules: Vec<Rule>,
}

impl FormSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, field: &'static str, label: &'static str) -> Self {
        self.rules.push(Rule::Required { field, label });
        self
    }

    pub fn min_attachments(mut self, field: &'static str, min: usize, message: &'static str) -> Self {
        self.rules.push(Rule::MinAttachments {
            field,
            min,
            message,
        });
        self
    }

    pub fn hex_color(mut self, field: &'static str) -> Self {
        self.rules.push(Rule::HexColor { field });
        self
    }

    pub fn email(mut self, field: &'static str) -> Self {
        self.rules.push(Rule::Email { field });
        self
    }

    pub fn year(mut self, field: &'static str) -> Self {
        self.rules.push(Rule::Year { field });
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Check every rule, in declaration order.
    pub fn check(&self, fields: &FormFields) -> Vec<FieldError> {
        self.rules.iter().filter_map(|rule| rule.check(fields)).collect()
    }

    /// Check only the rules for fields present in a partial update.
    ///
    /// Attachment minimums are skipped: existing files stay on the record.
    pub fn check_partial(&self, fields: &FormFields) -> Vec<FieldError> {
        self.rules
            .iter()
            .filter(|rule| !matches!(rule, Rule::MinAttachments { .. }))
            .filter(|rule| fields.values.contains_key(rule.field()))
            .filter_map(|rule| rule.check(fields))
            .collect()
    }

    pub fn validate(&self, fields: &FormFields) -> SyncResult<()> {
        into_result(self.check(fields))
    }

    pub fn validate_partial(&self, fields: &FormFields) -> SyncResult<()> {
        into_result(self.check_partial(fields))
    }
}

fn into_result(errors: Vec<FieldError>) -> SyncResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(SyncError::Validation(errors))
    }
}

/// An open create/edit dialog.
///
/// The dialog closes only after a confirmed save; on failure the input stays.
#[derive(Debug, Clone, Default)]
pub struct FormSession {
    pub fields: FormFields,
    /// Record being edited, `None` for create
    pub editing: Option<String>,
    pub open: bool,
    pub submitting: bool,
    pub errors: Vec<FieldError>,
}

impl FormSession {
    pub fn create(fields: FormFields) -> Self {
        Self {
            fields,
            open: true,
            ..Self::default()
        }
    }

    pub fn edit(id: impl Into<String>, fields: FormFields) -> Self {
        Self {
            fields,
            editing: Some(id.into()),
            open: true,
            ..Self::default()
        }
    }

    pub(crate) fn begin(&mut self) {
        self.submitting = true;
        self.errors.clear();
    }

    pub(crate) fn finish<T>(&mut self, result: &SyncResult<T>) {
        self.submitting = false;
        match result {
            Ok(_) => {
                self.open = false;
                self.fields = FormFields::default();
                self.editing = None;
            }
            Err(err) => self.errors = err.field_errors().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn story_schema() -> FormSchema {
        FormSchema::new()
            .required("title", "Title")
            .required("content", "Content")
            .min_attachments("images", 1, "At least one image is required")
    }

    #[test]
    fn test_required_and_attachment_rules() {
        let fields = FormFields::new().set("title", "  ").set("content", "Body");
        let errors = story_schema().check(&fields);
        assert_eq!(
            errors,
            vec![
                FieldError::new("title", "Title is required"),
                FieldError::new("images", "At least one image is required"),
            ]
        );

        let fields = fields
            .set("title", "Harvest")
            .attach(Attachment::new("images", "a.png", "image/png", vec![1u8, 2, 3]));
        assert!(story_schema().validate(&fields).is_ok());
    }

    #[test]
    fn test_partial_only_checks_present_fields() {
        let fields = FormFields::new().set("content", "");
        let errors = story_schema().check_partial(&fields);
        assert_eq!(errors, vec![FieldError::new("content", "Content is required")]);

        let toggle = FormFields::new().set("featured", true);
        assert!(story_schema().validate_partial(&toggle).is_ok());
    }

    #[test]
    fn test_hex_color() {
        assert!(is_hex_color("#fff"));
        assert!(is_hex_color("#1A2b3C"));
        assert!(!is_hex_color("1A2B3C"));
        assert!(!is_hex_color("#12345"));
        assert!(!is_hex_color("#ggg"));

        let schema = FormSchema::new().hex_color("color");
        assert!(schema.validate(&FormFields::new().set("color", "green")).is_err());
        assert!(schema.validate(&FormFields::new()).is_ok());
    }

    #[test]
    fn test_email_and_year() {
        let schema = FormSchema::new().email("email").year("year");
        assert!(schema
            .validate(&FormFields::new().set("email", "a@b.co").set("year", 2021))
            .is_ok());
        assert_eq!(
            schema
                .check(&FormFields::new().set("email", "nope").set("year", "1850"))
                .len(),
            2
        );
    }

    #[test]
    fn test_payload_kind() {
        let fields = FormFields::new().set("title", "T").set("tags", json!(["a", "b"]));
        assert!(!fields.to_payload().is_multipart());

        let fields = fields.attach(Attachment::new("images", "a.png", "image/png", vec![0u8]));
        match fields.to_payload() {
            Payload::Multipart { fields, files } => {
                assert_eq!(fields["title"], "T");
                assert_eq!(fields["tags"], r#"["a","b"]"#);
                assert_eq!(files.len(), 1);
            }
            Payload::Json(_) => panic!("expected multipart"),
        }
    }

    #[test]
    fn test_session_keeps_input_on_failure() {
        let mut session = FormSession::create(FormFields::new().set("title", "Draft"));
        session.begin();
        let failed: SyncResult<()> = Err(SyncError::Server {
            status: Some(400),
            message: Some("Title already exists".into()),
        });
        session.finish(&failed);
        assert!(session.open);
        assert!(!session.submitting);
        assert_eq!(session.fields.get("title"), Some(&json!("Draft")));

        session.begin();
        session.finish(&Ok(()));
        assert!(!session.open);
        assert!(session.fields.values.is_empty());
    }
}
