pub mod controller;
pub mod transport;
pub mod view;

pub use controller::{ControllerOptions, ControllerSnapshot, FetchFailurePolicy, ListController};
pub use transport::{BackendError, HttpRecordsBackend, RecordsBackend, DEFAULT_RECORDS_PATH};
pub use view::{
    header_label, DeleteConfirmation, FormField, FormMode, FormView, GridRenderer, HeaderCell,
    RowView, SortIndicator, TableView,
};

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
