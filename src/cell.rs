use std::collections::BTreeSet;
use std::fmt;

use crate::parser::ExprTree;
use crate::spreadsheet::col_to_letter;

/// Background colour of a cell nobody has painted (opaque white, all bits set).
pub const DEFAULT_BG_COLOR: u32 = 0xFFFF_FFFF;

/// Observable cell properties, used to tag change notifications and undo entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Text,
    Value,
    BgColor,
}

impl Property {
    pub fn as_str(self) -> &'static str {
        match self {
            Property::Text => "Text",
            Property::Value => "Value",
            Property::BgColor => "BGColor",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification that one property of the cell at (`col`, `row`) changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellEvent {
    pub col: usize,
    pub row: usize,
    pub property: Property,
}

/// One addressable cell of the grid.
///
/// Coordinates are fixed at construction. `text` and `bg_color` are changed
/// through [`crate::spreadsheet::Spreadsheet`] so that the dependency graph and
/// subscribers stay in step; `value` is written only by the recalculation
/// engine.
#[derive(Debug, Clone)]
pub struct Cell {
    col: usize,
    row: usize,
    text: String,
    value: String,
    bg_color: u32,
    tree: Option<ExprTree>,
    /// Names this cell's formula registered in the dependency graph, kept even
    /// when the formula fails to compile so the next edit can retract them.
    formula_refs: BTreeSet<String>,
}

impl Cell {
    pub fn new(col: usize, row: usize) -> Self {
        Self {
            col,
            row,
            text: String::new(),
            value: String::new(),
            bg_color: DEFAULT_BG_COLOR,
            tree: None,
            formula_refs: BTreeSet::new(),
        }
    }

    pub fn column(&self) -> usize {
        self.col
    }

    pub fn row(&self) -> usize {
        self.row
    }

    /// Raw user input.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Derived display value: a number, the verbatim text, or an error sentinel.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn bg_color(&self) -> u32 {
        self.bg_color
    }

    /// Compiled formula, present only while the text is a formula.
    pub fn tree(&self) -> Option<&ExprTree> {
        self.tree.as_ref()
    }

    /// Reference name of this cell, e.g. `"B3"`.
    pub fn name(&self) -> String {
        format!("{}{}", col_to_letter(self.col), self.row + 1)
    }

    /// Empty text and no colour: such cells are left out of saved documents.
    pub fn is_default(&self) -> bool {
        self.text.is_empty() && self.bg_color == DEFAULT_BG_COLOR
    }

    /// Returns `false` (and changes nothing) when `text` equals the current text.
    pub(crate) fn set_text(&mut self, text: &str) -> bool {
        if self.text == text {
            return false;
        }
        self.text = text.to_string();
        true
    }

    /// Returns `false` (and changes nothing) when `color` equals the current colour.
    pub(crate) fn set_bg_color(&mut self, color: u32) -> bool {
        if self.bg_color == color {
            return false;
        }
        self.bg_color = color;
        true
    }

    pub(crate) fn set_value(&mut self, value: String) {
        self.value = value;
    }

    pub(crate) fn set_tree(&mut self, tree: Option<ExprTree>) {
        self.tree = tree;
    }

    pub(crate) fn take_formula_refs(&mut self) -> BTreeSet<String> {
        std::mem::take(&mut self.formula_refs)
    }

    pub(crate) fn set_formula_refs(&mut self, refs: BTreeSet<String>) {
        self.formula_refs = refs;
    }
}
