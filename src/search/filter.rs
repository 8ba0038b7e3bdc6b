//! Structured filter descriptions and their compilation into Meilisearch
//! filter expressions.
//!
//! Loosely-typed input (a JSON object such as
//! `{"category": ["Box", "Carton"], "quantity": {"gte": 1000}}`) is parsed
//! once into [`FilterDescription`]; [`FilterCompiler`] then renders it into the
//! backend's textual syntax:
//!
//! ```text
//! category IN ["Box", "Carton"] AND quantity >= 1000
//! ```

use crate::error::{AppError, Result};
use crate::search::literal;
use serde_json::{Map, Number, Value};
use std::collections::HashSet;
use std::fmt;

/// Characters that would break out of a field position in the filter grammar
const FORBIDDEN_FIELD_CHARS: &[char] = &['"', '\'', '=', '!', '<', '>', '(', ')', '[', ']', ','];

/// Keywords of the filter grammar; matched case-insensitively
const RESERVED_FIELD_NAMES: &[&str] = &["AND", "OR", "NOT", "IN", "TO", "EXISTS"];

/// Relational operator tokens accepted inside an operator mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum RelationalOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl RelationalOp {
    /// Symbol used in the backend syntax
    pub fn symbol(self) -> &'static str {
        match self {
            RelationalOp::Eq => "=",
            RelationalOp::Ne => "!=",
            RelationalOp::Gt => ">",
            RelationalOp::Gte => ">=",
            RelationalOp::Lt => "<",
            RelationalOp::Lte => "<=",
        }
    }
}

/// A single filter value
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Number(Number),
    Bool(bool),
}

impl Scalar {
    fn from_value(field: &str, value: &Value, position: &str) -> Result<Self> {
        match value {
            Value::String(s) => Ok(Scalar::String(s.clone())),
            Value::Number(n) => Ok(Scalar::Number(n.clone())),
            Value::Bool(b) => Ok(Scalar::Bool(*b)),
            other => Err(invalid(
                field,
                format!("{} must be a string, number or boolean, got {}", position, json_type(other)),
            )),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Number(Number::from(value))
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// The condition a single field must satisfy
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `field = value`
    Equality(Scalar),
    /// `field IN [values]`; an empty list matches nothing
    Membership(Vec<Scalar>),
    /// One clause per operator, AND-combined, in submission order
    Relational(Vec<(RelationalOp, Scalar)>),
}

impl Condition {
    /// Parse one loosely-typed condition. `Ok(None)` means the value was `null`.
    fn from_value(field: &str, value: &Value) -> Result<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| Scalar::from_value(field, item, "membership element"))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Some(Condition::Membership(values)))
            }
            Value::Object(operators) => {
                if operators.is_empty() {
                    return Err(invalid(field, "operator mapping must contain at least one operator"));
                }
                let mut clauses = Vec::with_capacity(operators.len());
                for (token, operand) in operators {
                    let op = token.parse::<RelationalOp>().map_err(|_| {
                        invalid(
                            field,
                            format!(
                                "unknown operator '{}' (expected one of eq, ne, gt, gte, lt, lte)",
                                token
                            ),
                        )
                    })?;
                    let scalar = Scalar::from_value(field, operand, &format!("operand of '{}'", token))?;
                    clauses.push((op, scalar));
                }
                Ok(Some(Condition::Relational(clauses)))
            }
            scalar => Ok(Some(Condition::Equality(Scalar::from_value(field, scalar, "value")?))),
        }
    }
}

/// Ordered field → condition mapping; fields are AND-combined
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterDescription {
    conditions: Vec<(String, Condition)>,
}

impl FilterDescription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the loosely-typed form accepted at the tool boundary.
    ///
    /// `null` yields an empty description; anything other than an object is rejected.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Object(map) => Self::from_map(map),
            other => Err(invalid(
                "",
                format!("filter conditions must be an object, got {}", json_type(other)),
            )),
        }
    }

    /// Parse an object whose keys are field names
    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let mut description = Self::new();
        for (field, value) in map {
            validate_field_name(field)?;
            if let Some(condition) = Condition::from_value(field, value)? {
                description.conditions.push((field.clone(), condition));
            }
        }
        Ok(description)
    }

    /// Set the condition for a field, replacing any previous one in place
    pub fn with_condition(mut self, field: impl Into<String>, condition: Condition) -> Self {
        let field = field.into();
        match self.conditions.iter_mut().find(|(name, _)| *name == field) {
            Some(entry) => entry.1 = condition,
            None => self.conditions.push((field, condition)),
        }
        self
    }

    pub fn equals(self, field: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.with_condition(field, Condition::Equality(value.into()))
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.conditions.iter().map(|(field, condition)| (field.as_str(), condition))
    }
}

/// Backend filter expression. Empty means "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledFilter(String);

impl CompiledFilter {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CompiledFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compiles [`FilterDescription`]s into Meilisearch filter expressions
#[derive(Debug, Clone, Default)]
pub struct FilterCompiler {
    time_fields: HashSet<String>,
}

impl FilterCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fields whose numeric values are UNIX timestamps (seconds) to be sent as RFC 3339 strings
    pub fn with_time_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.time_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn compile(&self, filter: &FilterDescription) -> Result<CompiledFilter> {
        let mut clauses = Vec::with_capacity(filter.len());
        for (field, condition) in filter.iter() {
            validate_field_name(field)?;
            clauses.push(self.compile_condition(field, condition)?);
        }
        Ok(CompiledFilter(clauses.join(" AND ")))
    }

    fn compile_condition(&self, field: &str, condition: &Condition) -> Result<String> {
        match condition {
            Condition::Equality(value) => Ok(format!("{} = {}", field, self.render(field, value)?)),
            Condition::Membership(values) => {
                let rendered = values
                    .iter()
                    .map(|value| self.render(field, value))
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("{} IN [{}]", field, rendered.join(", ")))
            }
            Condition::Relational(clauses) => {
                if clauses.is_empty() {
                    return Err(invalid(field, "operator mapping must contain at least one operator"));
                }
                let rendered = clauses
                    .iter()
                    .map(|(op, value)| -> Result<String> {
                        Ok(format!("{} {} {}", field, op.symbol(), self.render(field, value)?))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(rendered.join(" AND "))
            }
        }
    }

    fn render(&self, field: &str, value: &Scalar) -> Result<String> {
        match value {
            Scalar::String(s) => literal::render_string(field, s),
            Scalar::Number(n) if self.time_fields.contains(field) => {
                match literal::epoch_seconds_to_rfc3339(n) {
                    Some(timestamp) => literal::render_string(field, &timestamp),
                    None => Ok(literal::render_number(n)),
                }
            }
            Scalar::Number(n) => Ok(literal::render_number(n)),
            Scalar::Bool(b) => Ok(literal::render_bool(*b)),
        }
    }
}

/// Compile with default settings (no time fields)
pub fn compile_filter(filter: &FilterDescription) -> Result<CompiledFilter> {
    FilterCompiler::default().compile(filter)
}

fn validate_field_name(field: &str) -> Result<()> {
    if field.is_empty() {
        return Err(invalid(field, "field name must not be empty"));
    }
    if field
        .chars()
        .any(|c| c.is_whitespace() || FORBIDDEN_FIELD_CHARS.contains(&c))
    {
        return Err(invalid(
            field,
            "field name contains whitespace or filter syntax characters",
        ));
    }
    if RESERVED_FIELD_NAMES
        .iter()
        .any(|keyword| field.eq_ignore_ascii_case(keyword))
    {
        return Err(invalid(field, "field name is a reserved filter keyword"));
    }
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> AppError {
    AppError::InvalidFilter {
        field: field.to_string(),
        message: message.into(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
