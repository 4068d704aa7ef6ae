//! View models handed to a [`GridRenderer`]. Every successful refresh
//! rebuilds the whole table view; nothing is patched row by row.

use shared::domain::{ListQuery, Record, RecordId, RecordSet, SortDirection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortIndicator {
    Unsorted,
    Ascending,
    Descending,
}

impl SortIndicator {
    pub fn glyph(self) -> &'static str {
        match self {
            SortIndicator::Unsorted => "↕",
            SortIndicator::Ascending => "▲",
            SortIndicator::Descending => "▼",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    pub column: String,
    pub label: String,
    pub sort: SortIndicator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    /// `None` when the backend row carried no usable identifier; such rows
    /// are shown but offer no actions.
    pub id: Option<RecordId>,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    pub headers: Vec<HeaderCell>,
    pub rows: Vec<RowView>,
    pub page_index: u32,
    pub total_pages: u32,
}

impl TableView {
    pub fn build(set: &RecordSet, query: &ListQuery, id_field: &str) -> Self {
        let headers = set
            .columns
            .iter()
            .map(|column| {
                let sort = match (&query.sort_column, query.sort_direction) {
                    (Some(active), SortDirection::Ascending) if active == column => {
                        SortIndicator::Ascending
                    }
                    (Some(active), SortDirection::Descending) if active == column => {
                        SortIndicator::Descending
                    }
                    _ => SortIndicator::Unsorted,
                };
                HeaderCell {
                    column: column.clone(),
                    label: header_label(column),
                    sort,
                }
            })
            .collect();

        let rows = set
            .rows
            .iter()
            .map(|record| RowView {
                id: record.id(id_field),
                cells: set.columns.iter().map(|c| record.display(c)).collect(),
            })
            .collect();

        Self {
            headers,
            rows,
            page_index: set.current_page_index,
            total_pages: set.total_page_count,
        }
    }

    pub fn pager_label(&self) -> String {
        format!("{} / {}", self.page_index.saturating_add(1), self.total_pages)
    }
}

/// `user_name` -> `User name`.
pub fn header_label(column: &str) -> String {
    let spaced = column.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(RecordId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub value: String,
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormView {
    pub mode: FormMode,
    pub fields: Vec<FormField>,
}

impl FormView {
    pub fn blank(columns: &[String]) -> Self {
        Self {
            mode: FormMode::Create,
            fields: columns
                .iter()
                .map(|name| FormField {
                    name: name.clone(),
                    label: header_label(name),
                    value: String::new(),
                    read_only: false,
                })
                .collect(),
        }
    }

    /// Identifier first and read-only, then known columns in display order,
    /// then whatever else the record carries.
    pub fn populated(id: RecordId, record: &Record, id_field: &str, columns: &[String]) -> Self {
        let mut names: Vec<&str> = Vec::new();
        if record.get(id_field).is_some() {
            names.push(id_field);
        }
        names.extend(
            columns
                .iter()
                .map(String::as_str)
                .filter(|name| *name != id_field),
        );
        for (name, _) in record.fields() {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }

        let fields = names
            .into_iter()
            .map(|name| FormField {
                name: name.to_string(),
                label: header_label(name),
                value: record.display(name),
                read_only: name == id_field,
            })
            .collect();

        Self {
            mode: FormMode::Edit(id),
            fields,
        }
    }
}

/// Record details shown before a delete is confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfirmation {
    pub id: RecordId,
    pub lines: Vec<(String, String)>,
}

impl DeleteConfirmation {
    pub fn new(id: RecordId, record: &Record) -> Self {
        let lines = record
            .fields()
            .map(|(name, _)| (header_label(name), record.display(name)))
            .collect();
        Self { id, lines }
    }
}

pub trait GridRenderer: Send + Sync {
    fn render_table(&self, view: &TableView);
    fn clear_table(&self);
    fn open_form(&self, form: &FormView);
    fn close_form(&self);
}
