//! Field projection for Drive requests.
//!
//! The upload path needs the created object's `id` to resolve its content
//! link, so every projection built here includes it.

/// Projection that asks Drive for every field.
pub const ALL_FIELDS: &str = "*";

/// A caller-supplied field filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldFilter {
    /// A single field name or a comma-joined list, e.g. `"name,size"`.
    Fields(String),
    /// An ordered list of field names.
    List(Vec<String>),
}

impl From<&str> for FieldFilter {
    fn from(fields: &str) -> Self {
        Self::Fields(fields.to_string())
    }
}

impl From<String> for FieldFilter {
    fn from(fields: String) -> Self {
        Self::Fields(fields)
    }
}

impl From<Vec<String>> for FieldFilter {
    fn from(fields: Vec<String>) -> Self {
        Self::List(fields)
    }
}

impl From<Vec<&str>> for FieldFilter {
    fn from(fields: Vec<&str>) -> Self {
        Self::List(fields.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for FieldFilter {
    fn from(fields: &[&str]) -> Self {
        Self::List(fields.iter().map(|f| f.to_string()).collect())
    }
}

/// Compute the `fields` parameter for a create request.
pub fn project(filter: Option<&FieldFilter>) -> String {
    let joined = match filter {
        None => return ALL_FIELDS.to_string(),
        Some(FieldFilter::Fields(fields)) => fields.clone(),
        Some(FieldFilter::List(fields)) => fields
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .collect::<Vec<_>>()
            .join(","),
    };

    if joined.trim().is_empty() {
        return ALL_FIELDS.to_string();
    }
    if joined.trim() == ALL_FIELDS || has_id(&joined) {
        return joined;
    }
    format!("id,{}", joined)
}

/// Whether `id` appears as one of the comma-separated tokens.
fn has_id(fields: &str) -> bool {
    fields.split(',').any(|token| token.trim() == "id")
}
