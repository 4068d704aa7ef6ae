use std::{
    io::{Cursor, Write},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use client_core::{BackendError, ControllerOptions, RecordsBackend};
use shared::{domain::ListQuery, protocol::RecordsPageResponse};

use super::*;

#[derive(Default)]
struct Calls {
    lists: Vec<ListQuery>,
    created: Vec<Record>,
    updated: Vec<(RecordId, Record)>,
    deleted: Vec<RecordId>,
}

#[derive(Default)]
struct MemoryBackend {
    calls: Mutex<Calls>,
}

fn ann() -> Record {
    Record::new()
        .with_field("id", "1")
        .with_field("name", "ann")
        .with_field("email", "ann@example.com")
}

#[async_trait]
impl RecordsBackend for MemoryBackend {
    async fn list(&self, query: &ListQuery) -> Result<RecordsPageResponse, BackendError> {
        self.calls.lock().expect("calls").lists.push(query.clone());
        Ok(RecordsPageResponse {
            columns: vec!["id".into(), "name".into(), "email".into()],
            records: vec![ann()],
            current_page: query.page_index,
            total_pages: 3,
        })
    }

    async fn fetch(&self, id: &RecordId) -> Result<Record, BackendError> {
        if id.as_str() == "1" {
            Ok(ann())
        } else {
            Err(BackendError::RecordNotFound(id.clone()))
        }
    }

    async fn create(&self, record: &Record) -> Result<(), BackendError> {
        self.calls.lock().expect("calls").created.push(record.clone());
        Ok(())
    }

    async fn update(&self, id: &RecordId, record: &Record) -> Result<(), BackendError> {
        self.calls
            .lock()
            .expect("calls")
            .updated
            .push((id.clone(), record.clone()));
        Ok(())
    }

    async fn delete(&self, id: &RecordId) -> Result<(), BackendError> {
        self.calls.lock().expect("calls").deleted.push(id.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("buffer")).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

async fn run_script(script: &str) -> (Arc<MemoryBackend>, String) {
    let backend = Arc::new(MemoryBackend::default());
    let output = SharedBuffer::default();
    let renderer = Arc::new(TerminalRenderer::new(Box::new(output.clone())));
    let controller =
        ListController::with_options(backend.clone(), renderer.clone(), ControllerOptions::default());

    controller.refresh().await.expect("initial refresh");
    let mut input = Cursor::new(script.as_bytes().to_vec());
    run(&controller, &renderer, &mut input)
        .await
        .expect("session");
    (backend, output.text())
}

#[test]
fn parses_commands_and_arguments() {
    assert_eq!("next".parse::<Command>(), Ok(Command::NextPage));
    assert_eq!("  P ".parse::<Command>(), Ok(Command::PreviousPage));
    assert_eq!(
        "search  ann smith ".parse::<Command>(),
        Ok(Command::Search("ann smith".into()))
    );
    assert_eq!(
        "edit 42".parse::<Command>(),
        Ok(Command::Edit(RecordId::new("42")))
    );
    assert_eq!("".parse::<Command>(), Err(CommandError::Empty));
    assert_eq!(
        "sort".parse::<Command>(),
        Err(CommandError::MissingArgument {
            command: "sort",
            argument: "a column name"
        })
    );
    assert!(matches!(
        "frobnicate".parse::<Command>(),
        Err(CommandError::Unknown(word)) if word == "frobnicate"
    ));
}

#[test]
fn prompt_shows_page_search_and_sort() {
    let mut query = ListQuery::default();
    query.set_search(Some("ann".into()));
    query.sort_by("name");
    query.sort_by("name");
    let snapshot = ControllerSnapshot {
        query,
        total_pages: 3,
        columns: Vec::new(),
        edit_session: None,
    };
    assert_eq!(
        prompt_label(&snapshot),
        "[page 1/3 search 'ann' sort name ▼]> "
    );
}

#[test]
fn sort_argument_matches_key_or_header_label() {
    let columns = vec!["user_name".to_string(), "email".to_string()];
    assert_eq!(
        resolve_sort_column(&columns, "user_name").as_deref(),
        Some("user_name")
    );
    assert_eq!(
        resolve_sort_column(&columns, "User name").as_deref(),
        Some("user_name")
    );
    assert_eq!(resolve_sort_column(&columns, "EMAIL").as_deref(), Some("email"));
    assert_eq!(resolve_sort_column(&columns, "user"), None);
    assert_eq!(resolve_sort_column(&[], "email"), None);
}

#[tokio::test]
async fn sort_accepts_header_labels_and_rejects_unknown_columns() {
    let (backend, output) = run_script("sort Name
sort user
quit
").await;

    let calls = backend.calls.lock().expect("calls");
    assert_eq!(calls.lists.len(), 2);
    assert_eq!(calls.lists[1].sort_column.as_deref(), Some("name"));
    assert!(output.contains("unknown column 'user' (columns: name, email)"));
}

#[test]
fn prompt_survives_out_of_range_page() {
    let snapshot = ControllerSnapshot {
        query: ListQuery {
            page_index: u32::MAX,
            ..ListQuery::default()
        },
        total_pages: u32::MAX,
        columns: Vec::new(),
        edit_session: None,
    };
    assert!(prompt_label(&snapshot).starts_with(&format!("[page {0}/{0}", u32::MAX)));
}

#[tokio::test]
async fn paging_and_sorting_commands_reach_the_backend() {
    let (backend, output) = run_script("next\nsort name\nsort name\nbogus\nquit\n").await;

    let calls = backend.calls.lock().expect("calls");
    let pages: Vec<_> = calls.lists.iter().map(|q| q.page_index).collect();
    assert_eq!(pages, vec![0, 1, 0, 0]);
    let last = calls.lists.last().expect("list");
    assert_eq!(last.sort_direction, SortDirection::Descending);
    assert!(output.contains("unknown command 'bogus'"));
}

#[tokio::test]
async fn add_submits_a_create_with_entered_values() {
    let (backend, _output) = run_script("add\nzed\nzed@example.com\n\nquit\n").await;

    let calls = backend.calls.lock().expect("calls");
    assert!(calls.updated.is_empty());
    assert_eq!(calls.created.len(), 1);
    assert_eq!(calls.created[0].display("name"), "zed");
    assert_eq!(calls.created[0].display("email"), "zed@example.com");
    assert_eq!(calls.lists.len(), 2);
}

#[tokio::test]
async fn edit_keeps_blank_answers_and_updates() {
    let (backend, output) = run_script("edit 1\n\nnew@example.com\ny\nquit\n").await;

    assert!(output.contains("Id: 1 (read-only)"));
    let calls = backend.calls.lock().expect("calls");
    assert!(calls.created.is_empty());
    assert_eq!(calls.updated.len(), 1);
    let (id, body) = &calls.updated[0];
    assert_eq!(id.as_str(), "1");
    assert_eq!(body.display("name"), "ann");
    assert_eq!(body.display("email"), "new@example.com");
    assert!(body.get("id").is_none());
}

#[tokio::test]
async fn declining_save_sends_nothing() {
    let (backend, _output) = run_script("add\nzed\nz@x\nn\nquit\n").await;

    let calls = backend.calls.lock().expect("calls");
    assert!(calls.created.is_empty());
    assert_eq!(calls.lists.len(), 1);
}

#[tokio::test]
async fn delete_requires_explicit_yes() {
    let (backend, output) = run_script("delete 1\n\ndelete 1\ny\nquit\n").await;

    assert!(output.contains("Delete record 1?"));
    assert!(output.contains("Name: ann"));
    let calls = backend.calls.lock().expect("calls");
    assert_eq!(calls.deleted, vec![RecordId::new("1")]);
    assert_eq!(calls.lists.len(), 2);
}

#[tokio::test]
async fn end_of_input_ends_the_session() {
    let (backend, _output) = run_script("next\n").await;
    assert_eq!(backend.calls.lock().expect("calls").lists.len(), 2);
}
