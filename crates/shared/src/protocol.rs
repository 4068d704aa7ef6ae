use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{Record, RecordSet};

/// Deserializes `null` as an empty vector. Backends encode an empty result
/// page as `records: null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body of `GET /api/records?page=..`. Both `columns` and `records` must be
/// present; a body missing either is not a records page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsPageResponse {
    pub columns: Vec<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub records: Vec<Record>,
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub total_pages: u32,
}

impl RecordsPageResponse {
    /// Drops the identifier column from the display columns. Rows keep the
    /// identifier so actions can address them.
    pub fn into_record_set(self, id_field: &str) -> RecordSet {
        RecordSet {
            columns: self
                .columns
                .into_iter()
                .filter(|column| column != id_field)
                .collect(),
            rows: self.records,
            current_page_index: self.current_page,
            total_page_count: self.total_pages,
        }
    }
}

/// Body of `GET /api/records?id=..`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordLookupResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub records: Vec<Record>,
}

impl RecordLookupResponse {
    pub fn into_first(self) -> Option<Record> {
        self.records.into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_response_strips_identifier_column() {
        let body = r#"{
            "columns": ["id", "name", "email"],
            "records": [{"id": "1", "name": "Ann", "email": null}],
            "currentPage": 2,
            "totalPages": 5
        }"#;
        let response: RecordsPageResponse = serde_json::from_str(body).expect("decode");
        let set = response.into_record_set("id");
        assert_eq!(set.columns, vec!["name".to_string(), "email".to_string()]);
        assert_eq!(set.rows.len(), 1);
        assert_eq!(set.rows[0].display("id"), "1");
        assert_eq!(set.current_page_index, 2);
        assert_eq!(set.total_page_count, 5);
    }

    #[test]
    fn null_record_list_is_an_empty_page() {
        let body = r#"{"columns": ["id", "name"], "records": null, "currentPage": 0, "totalPages": 0}"#;
        let response: RecordsPageResponse = serde_json::from_str(body).expect("decode");
        assert!(response.records.is_empty());
    }

    #[test]
    fn body_without_columns_or_records_is_rejected() {
        assert!(serde_json::from_str::<RecordsPageResponse>(r#"{"error": "nope"}"#).is_err());
        assert!(serde_json::from_str::<RecordsPageResponse>(
            r#"{"records": [], "currentPage": 0, "totalPages": 1}"#
        )
        .is_err());
        assert!(serde_json::from_str::<RecordsPageResponse>(
            r#"{"columns": ["id"], "currentPage": 0, "totalPages": 1}"#
        )
        .is_err());
    }

    #[test]
    fn lookup_without_rows_yields_none() {
        let response: RecordLookupResponse =
            serde_json::from_str(r#"{"records": null, "totalPages": 0}"#).expect("decode");
        assert!(response.into_first().is_none());
    }
}
