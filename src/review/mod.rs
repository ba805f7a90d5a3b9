//! The review/edit surface for an extracted [`CheckRecord`].
//!
//! The surface is either [`Mode::Viewing`] or [`Mode::Editing`]. Leaving
//! editing through [`ReviewSurface::toggle_edit`] always commits whatever is in
//! the draft, with no validation. [`ReviewSurface::discard_edits`] is the only
//! way to throw a draft away.

use std::fmt::Write as _;

use thiserror::Error;

use crate::{
    prelude::*,
    record::{CheckField, CheckRecord},
};

use self::clipboard::{Clipboard, ClipboardError};

pub mod clipboard;
pub mod session;

/// Number of label/value pairs per table row.
pub const FIELDS_PER_ROW: usize = 3;

/// What we show for an empty value.
pub const EMPTY_PLACEHOLDER: &str = "-";

/// Errors from review actions. None of these change the record.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Fields can only be changed while editing.
    #[error("Start editing before changing fields")]
    NotEditing,

    /// Copying is disabled while editing.
    #[error("Save or discard your changes before copying")]
    CopyWhileEditing,

    /// The clipboard write failed.
    #[error("Could not copy data to clipboard: {0}")]
    Clipboard(#[from] ClipboardError),
}

/// Is the surface read-only or editable?
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Viewing,
    Editing,
}

/// One label/value cell in the table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    pub field: CheckField,
    pub value: String,
}

/// A table row. Short rows are padded with `None`.
pub type Row = [Option<Cell>; FIELDS_PER_ROW];

/// Editable state for one extracted record.
#[derive(Clone, Debug)]
pub struct ReviewSurface {
    /// The last committed record.
    committed: CheckRecord,

    /// The record being edited. Equal to `committed` while viewing.
    draft: CheckRecord,

    /// Current mode.
    mode: Mode,
}

impl ReviewSurface {
    /// Start reviewing `record`.
    pub fn new(record: CheckRecord) -> Self {
        Self {
            draft: record.clone(),
            committed: record,
            mode: Mode::Viewing,
        }
    }

    /// The current mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The last committed record.
    pub fn record(&self) -> &CheckRecord {
        &self.committed
    }

    /// The record as currently shown: the draft while editing, otherwise the
    /// committed record.
    pub fn displayed(&self) -> &CheckRecord {
        match self.mode {
            Mode::Viewing => &self.committed,
            Mode::Editing => &self.draft,
        }
    }

    /// Switch between viewing and editing.
    ///
    /// Entering edit mode has no side effects and returns `None`. Leaving it
    /// commits the draft as-is and returns the newly committed record.
    pub fn toggle_edit(&mut self) -> Option<CheckRecord> {
        match self.mode {
            Mode::Viewing => {
                self.draft = self.committed.clone();
                self.mode = Mode::Editing;
                None
            }
            Mode::Editing => {
                self.committed = self.draft.clone();
                self.mode = Mode::Viewing;
                debug!("Committed edited check data");
                Some(self.committed.clone())
            }
        }
    }

    /// Leave edit mode without committing, restoring the last committed
    /// record. Does nothing while viewing.
    pub fn discard_edits(&mut self) {
        self.draft = self.committed.clone();
        self.mode = Mode::Viewing;
    }

    /// Change a field in the draft.
    pub fn set_field(
        &mut self,
        field: CheckField,
        value: impl Into<String>,
    ) -> Result<(), ReviewError> {
        if self.mode != Mode::Editing {
            return Err(ReviewError::NotEditing);
        }
        self.draft.set(field, value);
        Ok(())
    }

    /// The displayed fields, grouped into rows of [`FIELDS_PER_ROW`].
    ///
    /// Empty values are shown as [`EMPTY_PLACEHOLDER`] while viewing, and
    /// as-is while editing.
    pub fn rows(&self) -> Vec<Row> {
        let record = self.displayed();
        CheckField::ALL
            .chunks(FIELDS_PER_ROW)
            .map(|chunk| {
                let mut row: Row = Default::default();
                for (slot, &field) in row.iter_mut().zip(chunk) {
                    let value = record.get(field);
                    let value = if value.is_empty() && self.mode == Mode::Viewing {
                        EMPTY_PLACEHOLDER.to_owned()
                    } else {
                        value.to_owned()
                    };
                    *slot = Some(Cell {
                        field,
                        value,
                    });
                }
                row
            })
            .collect()
    }

    /// Render the table as text, with three `Field | Value` column pairs.
    pub fn render_table(&self) -> String {
        let rows = self.rows();
        let mut label_width = [0; FIELDS_PER_ROW];
        let mut value_width = [0; FIELDS_PER_ROW];
        for row in &rows {
            for (col, cell) in row.iter().enumerate() {
                if let Some(cell) = cell {
                    label_width[col] = label_width[col].max(cell.field.label().chars().count());
                    value_width[col] = value_width[col].max(cell.value.chars().count());
                }
            }
        }
        for col in 0..FIELDS_PER_ROW {
            label_width[col] = label_width[col].max("Field".len());
            value_width[col] = value_width[col].max("Value".len());
        }

        let mut out = String::new();
        let mut push_line = |cells: Vec<(String, String)>| {
            let line = cells
                .iter()
                .enumerate()
                .map(|(col, (label, value))| {
                    format!(
                        "{:lw$} | {:vw$}",
                        label,
                        value,
                        lw = label_width[col],
                        vw = value_width[col],
                    )
                })
                .collect::<Vec<_>>()
                .join(" | ");
            // Writing to a `String` can't fail.
            let _ = writeln!(out, "{}", line.trim_end());
        };

        push_line(vec![("Field".to_owned(), "Value".to_owned()); FIELDS_PER_ROW]);
        push_line(
            (0..FIELDS_PER_ROW)
                .map(|col| ("-".repeat(label_width[col]), "-".repeat(value_width[col])))
                .collect(),
        );
        for row in rows {
            push_line(
                row.into_iter()
                    .map(|cell| match cell {
                        Some(cell) => (cell.field.label().to_owned(), cell.value),
                        None => (String::new(), String::new()),
                    })
                    .collect(),
            );
        }
        out
    }

    /// The committed record as `Label: value` lines.
    pub fn copy_text(&self) -> String {
        self.committed.to_labeled_text()
    }

    /// Copy [`Self::copy_text`] to `clipboard`.
    pub fn copy_to(&self, clipboard: &mut dyn Clipboard) -> Result<(), ReviewError> {
        if self.mode == Mode::Editing {
            return Err(ReviewError::CopyWhileEditing);
        }
        clipboard.set_text(self.copy_text())?;
        info!("Copied check data to clipboard");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{clipboard::MemoryClipboard, *};

    fn john_doe() -> CheckRecord {
        CheckRecord {
            payee: "John Doe".to_owned(),
            amount_numerical: "500.00".to_owned(),
            amount_words: "Five Hundred Only".to_owned(),
            date: "01/02/2024".to_owned(),
            bank_name: "State Bank of India".to_owned(),
            ifsc_code: "SBIN0001234".to_owned(),
            account_number: "12345678901".to_owned(),
            check_number: "000123".to_owned(),
            issuer_name: "Acme Traders".to_owned(),
        }
    }

    #[test]
    fn test_starts_viewing() {
        let surface = ReviewSurface::new(john_doe());
        assert_eq!(surface.mode(), Mode::Viewing);
        assert_eq!(surface.record(), &john_doe());
    }

    #[test]
    fn test_rows_have_nine_labeled_fields() {
        let surface = ReviewSurface::new(john_doe());
        let rows = surface.rows();
        assert_eq!(rows.len(), 3);
        let cells = rows.iter().flatten().flatten().collect::<Vec<_>>();
        assert_eq!(cells.len(), 9);
        let labels = cells.iter().map(|c| c.field.label()).collect::<Vec<_>>();
        assert_eq!(
            labels,
            [
                "Payee",
                "Amount Numerical",
                "Amount Words",
                "Date",
                "Bank Name",
                "IFSC Code",
                "Account Number",
                "Cheque Number",
                "Issuer Name",
            ]
        );
        assert_eq!(cells[0].value, "John Doe");
    }

    #[test]
    fn test_empty_values_show_placeholder() {
        let mut record = john_doe();
        record.bank_name.clear();
        let surface = ReviewSurface::new(record);
        let cells = surface.rows().into_iter().flatten().flatten().collect::<Vec<_>>();
        let bank = cells.iter().find(|c| c.field == CheckField::BankName).unwrap();
        assert_eq!(bank.value, EMPTY_PLACEHOLDER);
    }

    #[test]
    fn test_edit_and_save_commits_draft() {
        let mut surface = ReviewSurface::new(john_doe());
        assert_eq!(surface.toggle_edit(), None);
        assert_eq!(surface.mode(), Mode::Editing);
        surface.set_field(CheckField::Payee, "Jane Doe").unwrap();

        // Not committed yet.
        assert_eq!(surface.record().payee, "John Doe");
        assert_eq!(surface.displayed().payee, "Jane Doe");

        let committed = surface.toggle_edit().unwrap();
        assert_eq!(surface.mode(), Mode::Viewing);
        assert_eq!(committed.payee, "Jane Doe");
        let mut expected = john_doe();
        expected.payee = "Jane Doe".to_owned();
        assert_eq!(committed, expected);
        assert_eq!(surface.record(), &expected);
    }

    #[test]
    fn test_save_commits_partial_and_empty_values() {
        let mut surface = ReviewSurface::new(john_doe());
        surface.toggle_edit();
        surface.set_field(CheckField::Date, "01/0").unwrap();
        surface.set_field(CheckField::IfscCode, "").unwrap();
        let committed = surface.toggle_edit().unwrap();
        assert_eq!(committed.date, "01/0");
        assert_eq!(committed.ifsc_code, "");
    }

    #[test]
    fn test_set_field_requires_editing() {
        let mut surface = ReviewSurface::new(john_doe());
        let err = surface.set_field(CheckField::Payee, "Jane Doe").unwrap_err();
        assert!(matches!(err, ReviewError::NotEditing));
        assert_eq!(surface.record(), &john_doe());
    }

    #[test]
    fn test_discard_restores_snapshot() {
        let mut surface = ReviewSurface::new(john_doe());
        surface.toggle_edit();
        surface.set_field(CheckField::Payee, "Jane Doe").unwrap();
        surface.discard_edits();
        assert_eq!(surface.mode(), Mode::Viewing);
        assert_eq!(surface.record(), &john_doe());

        // A later edit starts from the committed record, not the old draft.
        surface.toggle_edit();
        assert_eq!(surface.displayed().payee, "John Doe");
    }

    #[test]
    fn test_render_table() {
        let surface = ReviewSurface::new(john_doe());
        let table = surface.render_table();
        let lines = table.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("Field"));
        assert!(lines[2].starts_with("Payee"));
        assert!(lines[2].contains("| John Doe"));
        assert!(lines[4].contains("Issuer Name"));
    }

    #[test]
    fn test_copy_to_clipboard() {
        let surface = ReviewSurface::new(john_doe());
        let mut clipboard = MemoryClipboard::default();
        surface.copy_to(&mut clipboard).unwrap();
        assert_eq!(clipboard.text.as_deref(), Some(john_doe().to_labeled_text().as_str()));
    }

    #[test]
    fn test_copy_refused_while_editing() {
        let mut surface = ReviewSurface::new(john_doe());
        surface.toggle_edit();
        let mut clipboard = MemoryClipboard::default();
        let err = surface.copy_to(&mut clipboard).unwrap_err();
        assert!(matches!(err, ReviewError::CopyWhileEditing));
        assert!(clipboard.text.is_none());
    }

    #[test]
    fn test_clipboard_failure_leaves_record_alone() {
        let surface = ReviewSurface::new(john_doe());
        let mut clipboard = MemoryClipboard::unavailable();
        let err = surface.copy_to(&mut clipboard).unwrap_err();
        assert!(matches!(err, ReviewError::Clipboard(_)));
        assert!(err.to_string().starts_with("Could not copy data to clipboard"));
        assert_eq!(surface.record(), &john_doe());
        assert_eq!(surface.mode(), Mode::Viewing);
    }
}
