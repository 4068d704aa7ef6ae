use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_ID_FIELD: &str = "id";

/// Identifier of a single record. Backends emit it either as a JSON string
/// or a JSON number; both end up as the same textual id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) if !text.is_empty() => Some(Self(text.clone())),
            Value::Number(number) => Some(Self(number.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        RecordId::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid record id: {value}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    pub fn as_param(self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// One row of the managed resource: field name to JSON value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub BTreeMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn id(&self, id_field: &str) -> Option<RecordId> {
        self.0.get(id_field).and_then(RecordId::from_value)
    }

    /// Cell text for `field`; missing fields and nulls render empty.
    pub fn display(&self, field: &str) -> String {
        match self.0.get(field) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

/// Pagination, sort and search state of the list view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub page_index: u32,
    pub search_text: Option<String>,
    pub sort_column: Option<String>,
    pub sort_direction: SortDirection,
}

impl ListQuery {
    /// Query-string pairs for a list request. `page` is always present,
    /// `search` only when non-empty, `sort`/`order` only with a column.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("page", self.page_index.to_string())];
        if let Some(text) = self.search_text.as_deref().filter(|text| !text.is_empty()) {
            params.push(("search", text.to_string()));
        }
        if let Some(column) = &self.sort_column {
            params.push(("sort", column.clone()));
            params.push(("order", self.sort_direction.as_param().to_string()));
        }
        params
    }

    pub fn set_search(&mut self, text: Option<String>) {
        self.search_text = text.filter(|text| !text.is_empty());
        self.page_index = 0;
    }

    /// Same column flips direction; a new column starts ascending.
    pub fn sort_by(&mut self, column: &str) {
        if self.sort_column.as_deref() == Some(column) {
            self.sort_direction = self.sort_direction.toggled();
        } else {
            self.sort_column = Some(column.to_string());
            self.sort_direction = SortDirection::Ascending;
        }
        self.page_index = 0;
    }
}

/// A page of records plus pagination metadata, identifier column removed
/// from `columns`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
    pub current_page_index: u32,
    pub total_page_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditSession {
    pub target_id: Option<RecordId>,
}

impl EditSession {
    pub fn create() -> Self {
        Self { target_id: None }
    }

    pub fn edit(id: RecordId) -> Self {
        Self {
            target_id: Some(id),
        }
    }
}
