use std::fmt;

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

/// One violation found while validating a request segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Part of the request a schema applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Body,
    Query,
    Params,
}

impl Segment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Body => "body",
            Segment::Query => "query",
            Segment::Params => "params",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The first request segment that failed, with all of its issues.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Validation failed for request {segment}")]
pub struct ValidationFailure {
    pub segment: Segment,
    pub issues: Vec<ValidationIssue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Email,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Integer,
    Boolean,
    Object(ObjectSchema),
}

impl FieldType {
    fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Object(_) => "object",
        }
    }
}

/// Declarative constraints for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    name: String,
    kind: FieldType,
    required: bool,
    coerce: bool,
    default: Option<Value>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    minimum: Option<i64>,
    maximum: Option<i64>,
    format: Option<Format>,
}

impl FieldRule {
    fn new(name: impl Into<String>, kind: FieldType) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            coerce: false,
            default: None,
            min_length: None,
            max_length: None,
            minimum: None,
            maximum: None,
            format: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn object(name: impl Into<String>, schema: ObjectSchema) -> Self {
        Self::new(name, FieldType::Object(schema))
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Accept string input for non-string types (and scalars for strings).
    pub fn coerce(mut self) -> Self {
        self.coerce = true;
        self
    }

    /// Value used when the field is absent. Implies optional.
    pub fn default_value(mut self, value: Value) -> Self {
        self.required = false;
        self.default = Some(value);
        self
    }

    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn minimum(mut self, min: i64) -> Self {
        self.minimum = Some(min);
        self
    }

    pub fn maximum(mut self, max: i64) -> Self {
        self.maximum = Some(max);
        self
    }

    pub fn email(mut self) -> Self {
        self.format = Some(Format::Email);
        self
    }

    fn check(&self, value: &Value, path: &str, issues: &mut Vec<ValidationIssue>) -> Option<Value> {
        let value = if self.coerce {
            coerce(&self.kind, value)
        } else {
            value.clone()
        };

        match (&self.kind, &value) {
            (FieldType::String, Value::String(s)) => {
                let length = s.chars().count();
                let before = issues.len();
                if let Some(min) = self.min_length.filter(|min| length < *min) {
                    issues.push(ValidationIssue::new(
                        path,
                        format!("String must contain at least {} character(s)", min),
                    ));
                }
                if let Some(max) = self.max_length.filter(|max| length > *max) {
                    issues.push(ValidationIssue::new(
                        path,
                        format!("String must contain at most {} character(s)", max),
                    ));
                }
                if self.format == Some(Format::Email) && !email_address::EmailAddress::is_valid(s)
                {
                    issues.push(ValidationIssue::new(path, "Invalid email"));
                }
                (issues.len() == before).then_some(value)
            }
            (FieldType::Integer, Value::Number(n)) => {
                let Some(n) = n.as_i64() else {
                    issues.push(ValidationIssue::new(
                        path,
                        "Expected integer, received float",
                    ));
                    return None;
                };
                let before = issues.len();
                if let Some(min) = self.minimum.filter(|min| n < *min) {
                    issues.push(ValidationIssue::new(
                        path,
                        format!("Number must be greater than or equal to {}", min),
                    ));
                }
                if let Some(max) = self.maximum.filter(|max| n > *max) {
                    issues.push(ValidationIssue::new(
                        path,
                        format!("Number must be less than or equal to {}", max),
                    ));
                }
                (issues.len() == before).then_some(value)
            }
            (FieldType::Boolean, Value::Bool(_)) => Some(value),
            (FieldType::Object(schema), Value::Object(_)) => schema.check(&value, path, issues),
            (kind, other) => {
                issues.push(ValidationIssue::new(
                    path,
                    format!("Expected {}, received {}", kind.name(), type_name(other)),
                ));
                None
            }
        }
    }
}

fn coerce(kind: &FieldType, value: &Value) -> Value {
    match (kind, value) {
        (FieldType::String, Value::Number(n)) => Value::String(n.to_string()),
        (FieldType::String, Value::Bool(b)) => Value::String(b.to_string()),
        (FieldType::Integer, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| value.clone()),
        (FieldType::Boolean, Value::String(s)) => match s.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => value.clone(),
        },
        _ => value.clone(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

/// Schema for a JSON object.
///
/// Fields are checked in declaration order. The normalized output only
/// carries declared fields; a strict schema reports unknown keys instead of
/// dropping them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    fields: Vec<FieldRule>,
    strict: bool,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, rule: FieldRule) -> Self {
        self.fields.push(rule);
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Validate `value`, returning its normalized form or every issue found.
    pub fn validate(&self, value: &Value) -> Result<Value, Vec<ValidationIssue>> {
        let mut issues = Vec::new();
        match self.check(value, "", &mut issues) {
            Some(normalized) if issues.is_empty() => Ok(normalized),
            _ => Err(issues),
        }
    }

    fn check(&self, value: &Value, path: &str, issues: &mut Vec<ValidationIssue>) -> Option<Value> {
        let Value::Object(input) = value else {
            issues.push(ValidationIssue::new(
                path,
                format!("Expected object, received {}", type_name(value)),
            ));
            return None;
        };

        let before = issues.len();
        let mut output = Map::new();

        for rule in &self.fields {
            let field_path = join(path, &rule.name);
            match input.get(&rule.name) {
                Some(raw) => {
                    if let Some(normalized) = rule.check(raw, &field_path, issues) {
                        output.insert(rule.name.clone(), normalized);
                    }
                }
                None => match &rule.default {
                    Some(default) => {
                        output.insert(rule.name.clone(), default.clone());
                    }
                    None if rule.required => {
                        issues.push(ValidationIssue::new(field_path, "Required"));
                    }
                    None => {}
                },
            }
        }

        if self.strict {
            for key in input.keys() {
                if !self.fields.iter().any(|rule| &rule.name == key) {
                    issues.push(ValidationIssue::new(join(path, key), "Unrecognized key"));
                }
            }
        }

        (issues.len() == before).then_some(Value::Object(output))
    }
}

/// Raw or normalized request segments.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestParts {
    pub body: Value,
    pub query: Value,
    pub params: Value,
}

impl Default for RequestParts {
    fn default() -> Self {
        Self {
            body: Value::Null,
            query: Value::Object(Map::new()),
            params: Value::Object(Map::new()),
        }
    }
}

/// Per-route schemas for body, query and path parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestSchema {
    body: Option<ObjectSchema>,
    query: Option<ObjectSchema>,
    params: Option<ObjectSchema>,
}

impl RequestSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(mut self, schema: ObjectSchema) -> Self {
        self.body = Some(schema);
        self
    }

    pub fn query(mut self, schema: ObjectSchema) -> Self {
        self.query = Some(schema);
        self
    }

    pub fn params(mut self, schema: ObjectSchema) -> Self {
        self.params = Some(schema);
        self
    }

    /// Validate body, then query, then params.
    ///
    /// The first failing segment stops validation; its issues are the only
    /// ones reported. Segments without a schema pass through untouched.
    ///
    /// # Errors
    /// * `ValidationFailure` - A segment violated its schema
    pub fn validate(&self, parts: RequestParts) -> Result<RequestParts, ValidationFailure> {
        let RequestParts {
            body,
            query,
            params,
        } = parts;

        Ok(RequestParts {
            body: Self::check_segment(Segment::Body, self.body.as_ref(), body)?,
            query: Self::check_segment(Segment::Query, self.query.as_ref(), query)?,
            params: Self::check_segment(Segment::Params, self.params.as_ref(), params)?,
        })
    }

    fn check_segment(
        segment: Segment,
        schema: Option<&ObjectSchema>,
        value: Value,
    ) -> Result<Value, ValidationFailure> {
        let Some(schema) = schema else {
            return Ok(value);
        };

        schema.validate(&value).map_err(|issues| ValidationFailure {
            segment,
            issues: issues
                .into_iter()
                .map(|issue| {
                    if issue.field.is_empty() {
                        ValidationIssue::new(segment.as_str(), issue.message)
                    } else {
                        issue
                    }
                })
                .collect(),
        })
    }
}
