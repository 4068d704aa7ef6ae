//! Terminal rendering of the records grid.

use std::{
    io::{self, Write},
    sync::Mutex,
};

use client_core::{DeleteConfirmation, FormMode, FormView, GridRenderer, TableView};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use tracing::warn;

pub struct TerminalRenderer {
    out: Mutex<Box<dyn Write + Send>>,
    open_form: Mutex<Option<FormView>>,
}

impl TerminalRenderer {
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            open_form: Mutex::new(None),
        }
    }

    pub fn write_line(&self, text: &str) {
        self.emit(&format!("{text}\n"));
    }

    /// Writes without a trailing newline and flushes.
    pub fn prompt(&self, text: &str) {
        self.emit(text);
    }

    /// The form opened by the last `begin_create`/`begin_edit`, if still
    /// open.
    pub fn current_form(&self) -> Option<FormView> {
        match self.open_form.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn show_delete_details(&self, details: &DeleteConfirmation) {
        let mut text = format!("Delete record {}?\n", details.id);
        for (label, value) in &details.lines {
            text.push_str(&format!("  {label}: {value}\n"));
        }
        self.emit(&text);
    }

    fn emit(&self, text: &str) {
        let mut out = match self.out.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(err) = out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
            warn!(error = %err, "grid: failed to write to terminal");
        }
    }

    fn set_form(&self, form: Option<FormView>) {
        match self.open_form.lock() {
            Ok(mut guard) => *guard = form,
            Err(poisoned) => *poisoned.into_inner() = form,
        }
    }
}

pub fn table_to_string(view: &TableView) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let mut header: Vec<Cell> = view
        .headers
        .iter()
        .map(|h| {
            Cell::new(format!("{} {}", h.label, h.sort.glyph())).add_attribute(Attribute::Bold)
        })
        .collect();
    header.push(Cell::new("Actions").add_attribute(Attribute::Bold));
    table.set_header(header);

    for row in &view.rows {
        let mut cells: Vec<Cell> = row.cells.iter().map(Cell::new).collect();
        let actions = match &row.id {
            Some(id) => Cell::new(format!("edit {id} | delete {id}")).fg(Color::DarkGrey),
            None => Cell::new("-").fg(Color::DarkGrey),
        };
        cells.push(actions);
        table.add_row(cells);
    }

    let mut text = table.to_string();
    if view.rows.is_empty() {
        text.push_str("\n(no records)");
    }
    text.push_str(&format!("\nPage {}", view.pager_label()));
    text
}

pub fn form_to_string(form: &FormView) -> String {
    let title = match &form.mode {
        FormMode::Create => "New record".to_string(),
        FormMode::Edit(id) => format!("Edit record {id}"),
    };
    let mut text = format!("{title}\n");
    for field in &form.fields {
        let marker = if field.read_only { " (read-only)" } else { "" };
        text.push_str(&format!("  {}: {}{marker}\n", field.label, field.value));
    }
    text
}

impl GridRenderer for TerminalRenderer {
    fn render_table(&self, view: &TableView) {
        self.write_line(&table_to_string(view));
    }

    fn clear_table(&self) {
        self.write_line("(table cleared)");
    }

    fn open_form(&self, form: &FormView) {
        self.emit(&form_to_string(form));
        self.set_form(Some(form.clone()));
    }

    fn close_form(&self) {
        self.set_form(None);
    }
}
