//! Error types for the spreadsheet engine.
//!
//! Formula problems never show up here: they are stored in the cell as
//! display sentinels (see [`crate::function`]). This enum covers the
//! operational failures a caller has to handle.

use crate::cell::Property;

/// All errors surfaced by the orchestrator, the history and the codec.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Coordinate outside the grid.
    #[error("cell ({col}, {row}) is outside the {columns}x{rows} grid")]
    OutOfRange {
        col: usize,
        row: usize,
        columns: usize,
        rows: usize,
    },

    /// Undo requested with an empty undo stack.
    #[error("nothing to undo")]
    UndoEmpty,

    /// Redo requested with an empty redo stack.
    #[error("nothing to redo")]
    RedoEmpty,

    /// The property is derived and has no snapshot to restore.
    #[error("property {0} cannot be restored")]
    NotRestorable(Property),

    /// I/O error while reading or writing a document.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML document could not be written or parsed.
    #[error("XML document: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Well-formed document that does not follow the spreadsheet schema.
    #[error("malformed document: {0}")]
    Malformed(String),

    /// JSON document could not be encoded or decoded.
    #[error("JSON document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
