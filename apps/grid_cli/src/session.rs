//! Line-oriented command loop driving a [`ListController`].

use std::{io::BufRead, str::FromStr};

use anyhow::Result;
use client_core::{header_label, ControllerSnapshot, ListController, SortIndicator};
use shared::domain::{Record, RecordId, SortDirection};
use thiserror::Error;
use tracing::debug;

use crate::render::TerminalRenderer;

pub const HELP: &str = "\
commands:
  refresh           reload the current page
  search <text>     filter records
  clear             drop the search filter
  next | prev       move between pages
  sort <column>     sort by column key or header (again to flip direction)
  add               create a record
  edit <id>         edit a record
  delete <id>       delete a record
  help              show this text
  quit              leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Refresh,
    Search(String),
    ClearSearch,
    NextPage,
    PreviousPage,
    Sort(String),
    Add,
    Edit(RecordId),
    Delete(RecordId),
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("'{command}' needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let required = |command: &'static str, argument: &'static str| {
            if rest.is_empty() {
                Err(CommandError::MissingArgument { command, argument })
            } else {
                Ok(rest.to_string())
            }
        };

        match word.to_ascii_lowercase().as_str() {
            "" => Err(CommandError::Empty),
            "refresh" | "r" => Ok(Command::Refresh),
            "search" | "/" => required("search", "a search text").map(Command::Search),
            "clear" => Ok(Command::ClearSearch),
            "next" | "n" => Ok(Command::NextPage),
            "prev" | "p" => Ok(Command::PreviousPage),
            "sort" => required("sort", "a column name").map(Command::Sort),
            "add" | "new" => Ok(Command::Add),
            "edit" => required("edit", "a record id").map(|id| Command::Edit(RecordId::new(id))),
            "delete" | "rm" => {
                required("delete", "a record id").map(|id| Command::Delete(RecordId::new(id)))
            }
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

pub fn prompt_label(snapshot: &ControllerSnapshot) -> String {
    let mut label = format!(
        "[page {}/{}",
        snapshot.query.page_index.saturating_add(1),
        snapshot.total_pages
    );
    if let Some(text) = &snapshot.query.search_text {
        label.push_str(&format!(" search '{text}'"));
    }
    if let Some(column) = &snapshot.query.sort_column {
        let indicator = match snapshot.query.sort_direction {
            SortDirection::Ascending => SortIndicator::Ascending,
            SortDirection::Descending => SortIndicator::Descending,
        };
        label.push_str(&format!(" sort {column} {}", indicator.glyph()));
    }
    label.push_str("]> ");
    label
}

/// Maps what the user typed onto a display column: the raw key first, then
/// a case-insensitive match on the key or the header label.
pub fn resolve_sort_column(columns: &[String], input: &str) -> Option<String> {
    let input = input.trim();
    if let Some(exact) = columns.iter().find(|column| column.as_str() == input) {
        return Some(exact.clone());
    }
    columns
        .iter()
        .find(|column| {
            column.eq_ignore_ascii_case(input) || header_label(column).eq_ignore_ascii_case(input)
        })
        .cloned()
}

fn unknown_column_message(columns: &[String], input: &str) -> String {
    if columns.is_empty() {
        return "no columns known yet; run 'refresh' first".to_string();
    }
    format!("unknown column '{input}' (columns: {})", columns.join(", "))
}

fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Failures are already logged by the controller; the loop only keeps a
/// debug trail and moves on.
fn note_failure<T>(command: &str, outcome: Result<T>) {
    if let Err(err) = outcome {
        debug!(command, error = %format!("{err:#}"), "grid: command failed");
    }
}

pub async fn run<R>(
    controller: &ListController,
    renderer: &TerminalRenderer,
    input: &mut R,
) -> Result<()>
where
    R: BufRead + Send,
{
    loop {
        renderer.prompt(&prompt_label(&controller.snapshot().await));
        let Some(line) = read_line(input)? else {
            break;
        };

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(CommandError::Empty) => continue,
            Err(err) => {
                renderer.write_line(&err.to_string());
                continue;
            }
        };

        if !dispatch(controller, renderer, input, command).await? {
            break;
        }
    }
    Ok(())
}

/// Returns `false` when the loop should stop.
async fn dispatch<R>(
    controller: &ListController,
    renderer: &TerminalRenderer,
    input: &mut R,
    command: Command,
) -> Result<bool>
where
    R: BufRead + Send,
{
    match command {
        Command::Refresh => note_failure("refresh", controller.refresh().await),
        Command::Search(text) => note_failure("search", controller.search(&text).await),
        Command::ClearSearch => note_failure("clear", controller.clear_search().await),
        Command::NextPage => note_failure("next", controller.go_to_next_page().await),
        Command::PreviousPage => note_failure("prev", controller.go_to_previous_page().await),
        Command::Sort(input) => {
            let snapshot = controller.snapshot().await;
            match resolve_sort_column(&snapshot.columns, &input) {
                Some(column) => note_failure("sort", controller.sort_by(&column).await),
                None => renderer.write_line(&unknown_column_message(&snapshot.columns, &input)),
            }
        }
        Command::Add => {
            controller.begin_create().await;
            fill_and_submit(controller, renderer, input).await?;
        }
        Command::Edit(id) => {
            let opened = controller.begin_edit(&id).await;
            if opened.is_ok() {
                fill_and_submit(controller, renderer, input).await?;
            }
            note_failure("edit", opened);
        }
        Command::Delete(id) => {
            let outcome = controller
                .confirm_delete(&id, |details| {
                    renderer.show_delete_details(details);
                    renderer.prompt("Delete this record? [y/N]: ");
                    matches!(read_line(input), Ok(Some(answer)) if is_yes(&answer))
                })
                .await;
            note_failure("delete", outcome);
        }
        Command::Help => renderer.write_line(HELP),
        Command::Quit => return Ok(false),
    }
    Ok(true)
}

/// Prompts for every editable field of the open form. An empty answer keeps
/// the shown value. Read-only fields are not submitted.
async fn fill_and_submit<R>(
    controller: &ListController,
    renderer: &TerminalRenderer,
    input: &mut R,
) -> Result<()>
where
    R: BufRead + Send,
{
    let Some(form) = renderer.current_form() else {
        return Ok(());
    };
    if form.fields.iter().all(|field| field.read_only) {
        renderer.write_line("no editable columns known yet; run 'refresh' first");
        controller.cancel_form().await;
        return Ok(());
    }

    let mut record = Record::new();
    for field in form.fields.iter().filter(|field| !field.read_only) {
        renderer.prompt(&format!("{} [{}]: ", field.label, field.value));
        let Some(answer) = read_line(input)? else {
            controller.cancel_form().await;
            return Ok(());
        };
        let value = if answer.is_empty() {
            field.value.clone()
        } else {
            answer
        };
        record.insert(field.name.clone(), value);
    }

    renderer.prompt("Save? [Y/n]: ");
    let answer = read_line(input)?.unwrap_or_default();
    if !answer.trim().is_empty() && !is_yes(&answer) {
        controller.cancel_form().await;
        return Ok(());
    }

    let submitted = controller.submit_form(record).await;
    if submitted.is_err() && renderer.current_form().is_some() {
        // The mutation failed and the form is still open; drop it so the
        // prompt returns to the list.
        controller.cancel_form().await;
    }
    note_failure("submit", submitted);
    Ok(())
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
