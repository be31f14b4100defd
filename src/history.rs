//! Undo/redo history.
//!
//! Each entry is a [`Mutation`]: a snapshot of one cell property (or a batch
//! of them) that can be written back. Applying a mutation returns its inverse,
//! the snapshot of what it just overwrote, which is what lands on the
//! opposite stack.

use crate::cell::Property;
use crate::error::{EngineError, Result};
use crate::spreadsheet::Spreadsheet;

/// A reversible change: restore a captured property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Text {
        col: usize,
        row: usize,
        text: String,
    },
    Color {
        col: usize,
        row: usize,
        color: u32,
    },
    /// Several mutations recorded as one user action. `property` is the
    /// property of the first member.
    Batch {
        property: Property,
        members: Vec<Mutation>,
    },
}

impl Mutation {
    /// Snapshot the current `property` of the cell at (`col`, `row`).
    pub fn capture(sheet: &Spreadsheet, col: usize, row: usize, property: Property) -> Result<Self> {
        let cell = sheet.get_cell(col, row).ok_or(EngineError::OutOfRange {
            col,
            row,
            columns: sheet.column_count(),
            rows: sheet.row_count(),
        })?;
        match property {
            Property::Text => Ok(Mutation::Text {
                col,
                row,
                text: cell.text().to_string(),
            }),
            Property::BgColor => Ok(Mutation::Color {
                col,
                row,
                color: cell.bg_color(),
            }),
            Property::Value => Err(EngineError::NotRestorable(property)),
        }
    }

    pub fn property(&self) -> Property {
        match self {
            Mutation::Text { .. } => Property::Text,
            Mutation::Color { .. } => Property::BgColor,
            Mutation::Batch { property, .. } => *property,
        }
    }

    /// Write the snapshot back and return the mutation that undoes this one.
    /// Batch members are applied last-recorded first.
    pub fn apply(self, sheet: &mut Spreadsheet) -> Result<Mutation> {
        match self {
            Mutation::Text { col, row, text } => {
                let inverse = Mutation::capture(sheet, col, row, Property::Text)?;
                sheet.set_text(col, row, &text)?;
                Ok(inverse)
            }
            Mutation::Color { col, row, color } => {
                let inverse = Mutation::capture(sheet, col, row, Property::BgColor)?;
                sheet.set_bg_color(col, row, color)?;
                Ok(inverse)
            }
            Mutation::Batch { property, members } => {
                let members = members
                    .into_iter()
                    .rev()
                    .map(|member| member.apply(sheet))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Mutation::Batch { property, members })
            }
        }
    }
}

/// Two stacks of mutations. Recording a new edit invalidates redo.
#[derive(Debug, Default)]
pub struct History {
    undo: Vec<Mutation>,
    redo: Vec<Mutation>,
}

impl History {
    pub fn reset(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    /// Record a fresh user edit.
    pub fn push_undo(&mut self, mutation: Mutation) {
        self.redo.clear();
        self.undo.push(mutation);
    }

    /// Put back the inverse produced by a redo, keeping the rest of redo.
    pub(crate) fn push_undo_keep_redo(&mut self, mutation: Mutation) {
        self.undo.push(mutation);
    }

    pub(crate) fn push_redo(&mut self, mutation: Mutation) {
        self.redo.push(mutation);
    }

    pub(crate) fn pop_undo(&mut self) -> Option<Mutation> {
        self.undo.pop()
    }

    pub(crate) fn pop_redo(&mut self) -> Option<Mutation> {
        self.redo.pop()
    }

    pub fn peek_undo(&self) -> Option<Property> {
        self.undo.last().map(Mutation::property)
    }

    pub fn peek_redo(&self) -> Option<Property> {
        self.redo.last().map(Mutation::property)
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::DEFAULT_BG_COLOR;
    use assert_matches::assert_matches;

    fn text_of(sheet: &Spreadsheet, col: usize, row: usize) -> String {
        sheet.get_cell(col, row).unwrap().text().to_string()
    }

    #[test]
    fn undo_and_redo_restore_text() {
        let mut sheet = Spreadsheet::new(4, 4);
        sheet.set_text(0, 0, "hello").unwrap();

        sheet.push_undo(0, 0, Property::Text).unwrap();
        sheet.set_text(0, 0, "world").unwrap();

        sheet.undo().unwrap();
        assert_eq!(text_of(&sheet, 0, 0), "hello");
        assert_eq!(sheet.get_cell(0, 0).unwrap().value(), "hello");
        assert_eq!(sheet.undo_len(), 0);
        assert_eq!(sheet.redo_len(), 1);

        sheet.redo().unwrap();
        assert_eq!(text_of(&sheet, 0, 0), "world");
        assert_eq!(sheet.undo_len(), 1);
        assert_eq!(sheet.redo_len(), 0);
    }

    #[test]
    fn undo_recomputes_dependents() {
        let mut sheet = Spreadsheet::new(4, 4);
        sheet.set_text(1, 0, "2").unwrap();
        sheet.set_text(0, 0, "=B1*10").unwrap();

        sheet.push_undo(1, 0, Property::Text).unwrap();
        sheet.set_text(1, 0, "3").unwrap();
        assert_eq!(sheet.get_cell(0, 0).unwrap().value(), "30");

        sheet.undo().unwrap();
        assert_eq!(sheet.get_cell(0, 0).unwrap().value(), "20");
    }

    #[test]
    fn new_edit_clears_redo() {
        let mut sheet = Spreadsheet::new(4, 4);
        sheet.push_undo(0, 0, Property::Text).unwrap();
        sheet.set_text(0, 0, "one").unwrap();
        sheet.undo().unwrap();
        assert_eq!(sheet.redo_len(), 1);

        sheet.push_undo(0, 0, Property::Text).unwrap();
        assert_eq!(sheet.redo_len(), 0);
        assert_matches!(sheet.redo(), Err(EngineError::RedoEmpty));
    }

    #[test]
    fn empty_stacks_underflow() {
        let mut sheet = Spreadsheet::new(2, 2);
        assert_matches!(sheet.undo(), Err(EngineError::UndoEmpty));
        assert_matches!(sheet.redo(), Err(EngineError::RedoEmpty));
        assert_eq!(sheet.peek_undo(), None);
        assert_eq!(sheet.peek_redo(), None);
    }

    #[test]
    fn batch_colour_change_is_one_step() {
        let mut sheet = Spreadsheet::new(4, 4);
        let selection = [(0, 0), (1, 0), (2, 1)];
        sheet.set_bg_color(1, 0, 0xFF11_1111).unwrap();

        sheet.push_undo_cells(&selection, Property::BgColor).unwrap();
        for &(col, row) in &selection {
            sheet.set_bg_color(col, row, 0xFFFF_0000).unwrap();
        }
        assert_eq!(sheet.peek_undo(), Some(Property::BgColor));

        sheet.undo().unwrap();
        assert_eq!(sheet.get_cell(0, 0).unwrap().bg_color(), DEFAULT_BG_COLOR);
        assert_eq!(sheet.get_cell(1, 0).unwrap().bg_color(), 0xFF11_1111);
        assert_eq!(sheet.get_cell(2, 1).unwrap().bg_color(), DEFAULT_BG_COLOR);
        assert_eq!(sheet.peek_redo(), Some(Property::BgColor));

        sheet.redo().unwrap();
        for &(col, row) in &selection {
            assert_eq!(sheet.get_cell(col, row).unwrap().bg_color(), 0xFFFF_0000);
        }
    }

    #[test]
    fn batch_applies_members_in_reverse() {
        let mut sheet = Spreadsheet::new(2, 2);
        sheet.set_text(0, 0, "old").unwrap();
        let batch = Mutation::Batch {
            property: Property::Text,
            members: vec![
                Mutation::Text { col: 0, row: 0, text: "first".into() },
                Mutation::Text { col: 0, row: 0, text: "second".into() },
            ],
        };

        let inverse = batch.apply(&mut sheet).unwrap();
        // "second" is written first, then overwritten by "first"
        assert_eq!(text_of(&sheet, 0, 0), "first");
        assert_eq!(
            inverse,
            Mutation::Batch {
                property: Property::Text,
                members: vec![
                    Mutation::Text { col: 0, row: 0, text: "old".into() },
                    Mutation::Text { col: 0, row: 0, text: "second".into() },
                ],
            }
        );

        inverse.apply(&mut sheet).unwrap();
        assert_eq!(text_of(&sheet, 0, 0), "old");
    }

    #[test]
    fn value_is_not_restorable() {
        let mut sheet = Spreadsheet::new(2, 2);
        assert_matches!(
            sheet.push_undo(0, 0, Property::Value),
            Err(EngineError::NotRestorable(Property::Value))
        );
        assert_matches!(
            sheet.push_undo(3, 0, Property::Text),
            Err(EngineError::OutOfRange { .. })
        );
        assert_eq!(sheet.undo_len(), 0);
    }

    #[test]
    fn empty_batch_records_nothing() {
        let mut sheet = Spreadsheet::new(2, 2);
        sheet.push_undo_cells(&[], Property::BgColor).unwrap();
        assert_eq!(sheet.undo_len(), 0);
    }
}
