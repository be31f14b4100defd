//! Calculation engine for a fixed grid of cells.
//!
//! Cells hold raw text, either a literal or a formula such as `=(A1+B2)*3`,
//! and a derived value kept consistent with every cell the formula
//! references. [`spreadsheet::Spreadsheet`] is the entry point; it owns the
//! cells, the dependency graph and the undo/redo history.

pub mod cell;
pub mod commands;
pub mod dependencies;
pub mod error;
pub mod function;
pub mod history;
pub mod parser;
pub mod persist;
pub mod spreadsheet;

pub use cell::{Cell, CellEvent, Property, DEFAULT_BG_COLOR};
pub use error::{EngineError, Result};
pub use persist::Format;
pub use spreadsheet::Spreadsheet;
