//! The grid orchestrator: cells, dependency graph, edit history and change
//! notifications behind one mutation surface.

use std::io::{self, Write};

use log::debug;

use crate::cell::{Cell, CellEvent, Property, DEFAULT_BG_COLOR};
use crate::dependencies::DependencyGraph;
use crate::error::{EngineError, Result};
use crate::function;
use crate::history::{History, Mutation};

/// Callback receiving every cell change notification.
pub type EventCallback = Box<dyn FnMut(&CellEvent)>;

/// The grid of cells together with its dependency graph and edit history.
///
/// All mutation goes through this type: it owns the recalculation cascade and
/// calls subscribers explicitly for every cell the cascade touches.
pub struct Spreadsheet {
    columns: usize,
    rows: usize,
    pub(crate) cells: Vec<Cell>,
    pub(crate) graph: DependencyGraph,
    history: History,
    listeners: Vec<EventCallback>,
}

impl Spreadsheet {
    /// Create a spreadsheet with a flat vector of cells, all default.
    pub fn new(columns: usize, rows: usize) -> Self {
        let mut cells = Vec::with_capacity(columns * rows);
        for row in 0..rows {
            for col in 0..columns {
                cells.push(Cell::new(col, row));
            }
        }
        Self {
            columns,
            rows,
            cells,
            graph: DependencyGraph::new(columns * rows),
            history: History::default(),
            listeners: Vec::new(),
        }
    }

    pub fn column_count(&self) -> usize {
        self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Flat index of an in-range coordinate.
    pub(crate) fn index(&self, col: usize, row: usize) -> Option<usize> {
        if col < self.columns && row < self.rows {
            Some(row * self.columns + col)
        } else {
            None
        }
    }

    fn checked_index(&self, col: usize, row: usize) -> Result<usize> {
        self.index(col, row).ok_or(EngineError::OutOfRange {
            col,
            row,
            columns: self.columns,
            rows: self.rows,
        })
    }

    /// Flat index of the cell a reference name such as `"B3"` points at.
    pub(crate) fn resolve(&self, name: &str) -> Option<usize> {
        let (col, row) = parse_cell_name(name)?;
        self.index(col, row)
    }

    /// Get a cell, or `None` outside the grid.
    pub fn get_cell(&self, col: usize, row: usize) -> Option<&Cell> {
        self.index(col, row).and_then(|idx| self.cells.get(idx))
    }

    pub fn cell_by_name(&self, name: &str) -> Option<&Cell> {
        self.resolve(name).and_then(|idx| self.cells.get(idx))
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells.iter()
    }

    /// Register a callback for `Text`, `Value` and `BGColor` notifications.
    pub fn subscribe(&mut self, callback: impl FnMut(&CellEvent) + 'static) {
        self.listeners.push(Box::new(callback));
    }

    pub(crate) fn notify(&mut self, idx: usize, property: Property) {
        let event = match self.cells.get(idx) {
            Some(cell) => CellEvent {
                col: cell.column(),
                row: cell.row(),
                property,
            },
            None => return,
        };
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    /// Replace a cell's text and recompute it and everything depending on it.
    /// Setting the current text again does nothing.
    pub fn set_text(&mut self, col: usize, row: usize, text: &str) -> Result<()> {
        let idx = self.checked_index(col, row)?;
        if !self.cells[idx].set_text(text) {
            return Ok(());
        }
        debug!("{} text set to {:?}", self.cells[idx].name(), text);
        self.notify(idx, Property::Text);
        function::update_cell(self, idx);
        Ok(())
    }

    /// Replace a cell's background colour (ARGB). Setting the current colour
    /// again does nothing.
    pub fn set_bg_color(&mut self, col: usize, row: usize, color: u32) -> Result<()> {
        let idx = self.checked_index(col, row)?;
        if self.cells[idx].set_bg_color(color) {
            self.notify(idx, Property::BgColor);
        }
        Ok(())
    }

    /// Record the current state of one cell's property so the next change can
    /// be undone. Clears the redo history.
    pub fn push_undo(&mut self, col: usize, row: usize, property: Property) -> Result<()> {
        let mutation = Mutation::capture(self, col, row, property)?;
        self.history.push_undo(mutation);
        Ok(())
    }

    /// Record one property of several cells as a single undo step.
    /// An empty list records nothing.
    pub fn push_undo_cells(&mut self, cells: &[(usize, usize)], property: Property) -> Result<()> {
        if cells.is_empty() {
            return Ok(());
        }
        let members = cells
            .iter()
            .map(|&(col, row)| Mutation::capture(self, col, row, property))
            .collect::<Result<Vec<_>>>()?;
        self.history.push_undo(Mutation::Batch { property, members });
        Ok(())
    }

    pub fn undo(&mut self) -> Result<()> {
        let mutation = self.history.pop_undo().ok_or(EngineError::UndoEmpty)?;
        debug!("undo {}", mutation.property());
        let inverse = mutation.apply(self)?;
        self.history.push_redo(inverse);
        Ok(())
    }

    pub fn redo(&mut self) -> Result<()> {
        let mutation = self.history.pop_redo().ok_or(EngineError::RedoEmpty)?;
        debug!("redo {}", mutation.property());
        let inverse = mutation.apply(self)?;
        self.history.push_undo_keep_redo(inverse);
        Ok(())
    }

    /// Property restored by the next undo, if any.
    pub fn peek_undo(&self) -> Option<Property> {
        self.history.peek_undo()
    }

    /// Property restored by the next redo, if any.
    pub fn peek_redo(&self) -> Option<Property> {
        self.history.peek_redo()
    }

    pub fn undo_len(&self) -> usize {
        self.history.undo_len()
    }

    pub fn redo_len(&self) -> usize {
        self.history.redo_len()
    }

    pub(crate) fn reset_history(&mut self) {
        self.history.reset();
    }

    /// Return every cell to empty text and the default colour, through the
    /// normal mutation path.
    pub fn clear(&mut self) {
        for idx in 0..self.cells.len() {
            let (col, row) = (self.cells[idx].column(), self.cells[idx].row());
            // Coordinates come from the grid itself.
            let _ = self.set_text(col, row, "");
            let _ = self.set_bg_color(col, row, DEFAULT_BG_COLOR);
        }
        // Plain text can leave edges the per-edit diff never retracts; with
        // every cell empty the graph has no legitimate edges left.
        self.graph = DependencyGraph::new(self.cells.len());
    }

    /// Write part of the spreadsheet as a text table.
    pub fn display<W: Write>(
        &self,
        out: &mut W,
        start_row: usize,
        start_col: usize,
        max_rows: usize,
        max_cols: usize,
    ) -> io::Result<()> {
        let end_col = (start_col + max_cols).min(self.columns);
        let end_row = (start_row + max_rows).min(self.rows);

        write!(out, "    ")?;
        for c in start_col..end_col {
            write!(out, "{:>12}", col_to_letter(c))?;
        }
        writeln!(out)?;

        for r in start_row..end_row {
            write!(out, "{:3} ", r + 1)?;
            for c in start_col..end_col {
                let value = self.get_cell(c, r).map(Cell::value).unwrap_or_default();
                let shown: String = value.chars().take(12).collect();
                write!(out, "{:>12}", shown)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

/// Convert a zero–based column index to its letter label (e.g., 0 → "A", 26 → "AA").
pub fn col_to_letter(mut col: usize) -> String {
    let mut letters = Vec::new();
    col += 1; // shift to one–based index
    while col > 0 {
        col -= 1;
        letters.push((b'A' + (col % 26) as u8) as char);
        col /= 26;
    }
    letters.iter().rev().collect()
}

/// Parse a cell name (e.g., "A1" or "ab12") into (col, row) with zero–based indices.
pub fn parse_cell_name(cell_name: &str) -> Option<(usize, usize)> {
    let mut chars = cell_name.chars().peekable();
    let mut col: usize = 0;
    let mut col_found = false;
    while let Some(&ch) = chars.peek() {
        if ch.is_ascii_alphabetic() {
            col_found = true;
            let digit = (ch.to_ascii_uppercase() as u8 - b'A') as usize + 1;
            col = col.checked_mul(26)?.checked_add(digit)?;
            chars.next();
        } else {
            break;
        }
    }
    if !col_found {
        return None;
    }
    col -= 1; // zero–based

    let row_str: String = chars.collect();
    if row_str.is_empty() || !row_str.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match row_str.parse::<usize>() {
        Ok(row) if row > 0 => Some((col, row - 1)),
        _ => None,
    }
}
