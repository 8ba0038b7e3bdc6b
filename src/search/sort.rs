//! Sort token validation

use crate::error::{AppError, Result};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// A parsed `field:direction` token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    /// Attribute that must be sortable for this key; geo sorts rely on `_geo`
    pub fn sortable_attribute(&self) -> &str {
        if self.field.starts_with("_geoPoint(") {
            "_geo"
        } else {
            &self.field
        }
    }
}

impl FromStr for SortKey {
    type Err = AppError;

    fn from_str(token: &str) -> Result<Self> {
        let (field, direction) = token
            .rsplit_once(':')
            .ok_or_else(|| invalid(token, "expected the form <field>:<asc|desc>"))?;

        if field.is_empty() || field.chars().any(char::is_whitespace) {
            return Err(invalid(token, "field must be non-empty and contain no whitespace"));
        }

        let direction = direction
            .parse::<SortDirection>()
            .map_err(|_| invalid(token, format!("direction '{}' must be 'asc' or 'desc'", direction)))?;

        Ok(SortKey {
            field: field.to_string(),
            direction,
        })
    }
}

/// Validate sort tokens, returning them unchanged and in order.
///
/// When `allowed_fields` is given, every field must be a member; otherwise only
/// the token shape is checked and the backend decides on field legality.
/// Duplicates are passed through.
pub fn validate_sort(tokens: &[String], allowed_fields: Option<&BTreeSet<String>>) -> Result<Vec<String>> {
    for token in tokens {
        let key = token.parse::<SortKey>()?;
        if let Some(allowed) = allowed_fields {
            if !allowed.contains(key.sortable_attribute()) {
                return Err(invalid(
                    token,
                    format!("'{}' is not a sortable attribute of this index", key.sortable_attribute()),
                ));
            }
        }
    }
    Ok(tokens.to_vec())
}

fn invalid(token: &str, message: impl Into<String>) -> AppError {
    AppError::InvalidSort {
        token: token.to_string(),
        message: message.into(),
    }
}
