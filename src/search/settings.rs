//! Declarative index settings and their application

use crate::backend::SearchBackend;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use strum::IntoEnumIterator;

/// A settings category the backend can reject individually
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum SettingsCategory {
    SearchableAttributes,
    FilterableAttributes,
    SortableAttributes,
    DisplayedAttributes,
    Synonyms,
}

impl SettingsCategory {
    /// Map a Meilisearch `invalid_settings_<category>` error code to its category
    pub fn from_error_code(code: &str) -> Option<Self> {
        match code.strip_prefix("invalid_settings_")? {
            "searchable_attributes" => Some(SettingsCategory::SearchableAttributes),
            "filterable_attributes" => Some(SettingsCategory::FilterableAttributes),
            "sortable_attributes" => Some(SettingsCategory::SortableAttributes),
            "displayed_attributes" => Some(SettingsCategory::DisplayedAttributes),
            "synonyms" => Some(SettingsCategory::Synonyms),
            _ => None,
        }
    }
}

/// Full settings document for one index.
///
/// Applied wholesale: every category replaces what the backend had.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSettings {
    /// Fields matched by keyword search, in ranking priority order
    #[serde(alias = "searchable_attributes")]
    pub searchable_attributes: Vec<String>,

    #[serde(alias = "filterable_attributes")]
    pub filterable_attributes: BTreeSet<String>,

    #[serde(alias = "sortable_attributes")]
    pub sortable_attributes: BTreeSet<String>,

    /// Fields returned in hits, in display order
    #[serde(alias = "displayed_attributes")]
    pub displayed_attributes: Vec<String>,

    /// Term → equivalent terms
    pub synonyms: BTreeMap<String, BTreeSet<String>>,
}

impl IndexSettings {
    /// Reject empty attribute names and synonym terms before any backend call
    pub fn validate(&self) -> Result<()> {
        let attribute_lists: [(SettingsCategory, Vec<&String>); 4] = [
            (
                SettingsCategory::SearchableAttributes,
                self.searchable_attributes.iter().collect(),
            ),
            (
                SettingsCategory::FilterableAttributes,
                self.filterable_attributes.iter().collect(),
            ),
            (
                SettingsCategory::SortableAttributes,
                self.sortable_attributes.iter().collect(),
            ),
            (
                SettingsCategory::DisplayedAttributes,
                self.displayed_attributes.iter().collect(),
            ),
        ];

        for (category, attributes) in attribute_lists {
            if attributes.iter().any(|name| name.trim().is_empty()) {
                return Err(AppError::Validation(format!(
                    "{} contains an empty attribute name",
                    category
                )));
            }
        }

        for (term, equivalents) in &self.synonyms {
            if term.trim().is_empty() || equivalents.iter().any(|e| e.trim().is_empty()) {
                return Err(AppError::Validation(format!(
                    "{} contains an empty term",
                    SettingsCategory::Synonyms
                )));
            }
        }

        Ok(())
    }
}

/// Outcome of a successful settings application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResult {
    pub index: String,

    pub applied_categories: Vec<SettingsCategory>,

    /// Backend task that carried the update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_uid: Option<u64>,
}

/// Apply a settings document to an index, replacing every category.
///
/// Applying the same document twice leaves the backend in the same state.
pub async fn apply_index_settings(
    index: &str,
    settings: &IndexSettings,
    backend: &dyn SearchBackend,
) -> Result<ApplyResult> {
    if index.trim().is_empty() {
        return Err(AppError::Validation("index must not be empty".to_string()));
    }
    settings.validate()?;

    let ack = backend.apply_settings(index, settings).await.map_err(|source| {
        let category = SettingsCategory::from_error_code(source.code());
        tracing::warn!(
            index = %index,
            error_code = %source.code(),
            category = ?category,
            "Index settings rejected"
        );
        AppError::IndexConfiguration {
            index: index.to_string(),
            category,
            source,
        }
    })?;

    tracing::info!(index = %index, task_uid = ?ack.task_uid, "Index settings applied");

    Ok(ApplyResult {
        index: index.to_string(),
        applied_categories: SettingsCategory::iter().collect(),
        task_uid: ack.task_uid,
    })
}
