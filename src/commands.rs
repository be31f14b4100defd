//! Line-oriented front-end driving a [`Spreadsheet`].
//!
//! Commands:
//!
//! | input | effect |
//! |---|---|
//! | `A1 = <text>` | set text (`A1 = =B1+2` stores a formula) |
//! | `color A1 FF00FF00` / `color A1:C3 FF00FF00` | set ARGB background |
//! | `undo`, `redo` | walk the history |
//! | `save <path>`, `load <path>` | XML, or JSON for `.json` paths |
//! | `w` `a` `s` `d`, `scroll_to A1` | move the viewport |
//! | `disable_output`, `enable_output`, `q` | |

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use log::{info, warn};

use crate::cell::Property;
use crate::error::Result;
use crate::parser::Parser;
use crate::persist::Format;
use crate::spreadsheet::{parse_cell_name, Spreadsheet};

const VIEW_ROWS: usize = 10;
const VIEW_COLS: usize = 10;

/// Outcome of the previous command, shown in the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    InvalidCell,
    InvalidRange,
    InvalidColor,
    Unrecognized,
    NothingToUndo,
    NothingToRedo,
    FileError,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::InvalidCell => "Invalid cell",
            Status::InvalidRange => "Invalid range",
            Status::InvalidColor => "Invalid color",
            Status::Unrecognized => "unrecognized cmd",
            Status::NothingToUndo => "nothing to undo",
            Status::NothingToRedo => "nothing to redo",
            Status::FileError => "file error",
        }
    }
}

/// Viewport position and output switch of one session.
struct Session {
    viewport_row: usize,
    viewport_col: usize,
    output_enabled: bool,
}

/// Read commands from `input` until `q` or end of input, echoing the prompt
/// and the visible part of the grid to `output`.
pub fn handle_commands<R: BufRead, W: Write>(
    sheet: &mut Spreadsheet,
    mut input: R,
    output: &mut W,
) -> io::Result<()> {
    let mut session = Session {
        viewport_row: 0,
        viewport_col: 0,
        output_enabled: true,
    };
    let mut status = Status::Ok;
    let mut line = String::new();
    let mut last_instant = Instant::now();

    sheet.display(output, 0, 0, VIEW_ROWS, VIEW_COLS)?;
    loop {
        let elapsed = last_instant.elapsed().as_secs_f64();
        write!(output, "[{:.1}] ({}) > ", elapsed, status.as_str())?;
        output.flush()?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        last_instant = Instant::now();
        let command = line.trim();
        if command == "q" {
            break;
        }
        status = execute(sheet, &mut session, command);
        if session.output_enabled {
            sheet.display(
                output,
                session.viewport_row,
                session.viewport_col,
                VIEW_ROWS,
                VIEW_COLS,
            )?;
        }
    }
    Ok(())
}

fn execute(sheet: &mut Spreadsheet, session: &mut Session, command: &str) -> Status {
    let mut words = command.split_whitespace();
    match words.next() {
        Some("disable_output") => {
            session.output_enabled = false;
            Status::Ok
        }
        Some("enable_output") => {
            session.output_enabled = true;
            Status::Ok
        }
        Some("w") => {
            session.viewport_row = session.viewport_row.saturating_sub(VIEW_ROWS);
            Status::Ok
        }
        Some("s") => {
            session.viewport_row = scroll_forward(session.viewport_row, sheet.row_count(), VIEW_ROWS);
            Status::Ok
        }
        Some("a") => {
            session.viewport_col = session.viewport_col.saturating_sub(VIEW_COLS);
            Status::Ok
        }
        Some("d") => {
            session.viewport_col =
                scroll_forward(session.viewport_col, sheet.column_count(), VIEW_COLS);
            Status::Ok
        }
        Some("scroll_to") => match words.next().and_then(parse_cell_name) {
            Some((col, row)) if sheet.get_cell(col, row).is_some() => {
                session.viewport_col = col;
                session.viewport_row = row;
                Status::Ok
            }
            _ => Status::InvalidCell,
        },
        Some("undo") => match sheet.undo() {
            Ok(()) => Status::Ok,
            Err(_) => Status::NothingToUndo,
        },
        Some("redo") => match sheet.redo() {
            Ok(()) => Status::Ok,
            Err(_) => Status::NothingToRedo,
        },
        Some("color") => match (words.next(), words.next()) {
            (Some(range), Some(color)) => set_color(sheet, range, color),
            _ => Status::Unrecognized,
        },
        Some("save") => match words.next() {
            Some(path) => file_status(save_file(sheet, Path::new(path))),
            None => Status::Unrecognized,
        },
        Some("load") => match words.next() {
            Some(path) => file_status(load_file(sheet, Path::new(path))),
            None => Status::Unrecognized,
        },
        _ => match command.split_once('=') {
            Some((cell_str, text)) => set_text(sheet, cell_str.trim(), text.trim()),
            None => Status::Unrecognized,
        },
    }
}

/// Viewport start after scrolling one page towards the end.
fn scroll_forward(start: usize, extent: usize, page: usize) -> usize {
    if extent <= page {
        0
    } else if start + 2 * page < extent {
        start + page
    } else {
        extent - page
    }
}

fn set_text(sheet: &mut Spreadsheet, cell_str: &str, text: &str) -> Status {
    let Some((col, row)) = parse_cell_name(cell_str) else {
        return Status::InvalidCell;
    };
    match sheet.get_cell(col, row) {
        None => return Status::InvalidCell,
        Some(cell) if cell.text() == text => return Status::Ok,
        Some(_) => {}
    }
    if sheet.push_undo(col, row, Property::Text).is_err() {
        return Status::InvalidCell;
    }
    match sheet.set_text(col, row, text) {
        Ok(()) => Status::Ok,
        Err(_) => Status::InvalidCell,
    }
}

fn set_color(sheet: &mut Spreadsheet, range: &str, color: &str) -> Status {
    let Some(((c1, r1), (c2, r2))) = Parser::parse_range(range) else {
        return Status::InvalidRange;
    };
    if sheet.get_cell(c2, r2).is_none() {
        return Status::InvalidRange;
    }
    let Some(color) = parse_color(color) else {
        return Status::InvalidColor;
    };

    let selection: Vec<(usize, usize)> = (r1..=r2)
        .flat_map(|row| (c1..=c2).map(move |col| (col, row)))
        .collect();
    let recorded = match selection.as_slice() {
        [(col, row)] => sheet.push_undo(*col, *row, Property::BgColor),
        cells => sheet.push_undo_cells(cells, Property::BgColor),
    };
    if recorded.is_err() {
        return Status::InvalidRange;
    }
    for (col, row) in selection {
        if sheet.set_bg_color(col, row, color).is_err() {
            return Status::InvalidRange;
        }
    }
    Status::Ok
}

/// Hex ARGB such as `FF00FF00` or `#FF00FF00`; six digits get an opaque alpha.
fn parse_color(text: &str) -> Option<u32> {
    let hex = text.trim_start_matches('#').trim_start_matches("0x");
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let value = u32::from_str_radix(hex, 16).ok()?;
    match hex.len() {
        6 => Some(0xFF00_0000 | value),
        8 => Some(value),
        _ => None,
    }
}

fn file_status(result: Result<()>) -> Status {
    match result {
        Ok(()) => Status::Ok,
        Err(err) => {
            warn!("{}", err);
            Status::FileError
        }
    }
}

/// Save to `path`, choosing the encoding from its extension.
pub fn save_file(sheet: &Spreadsheet, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    sheet.save_to(BufWriter::new(file), Format::from_path(path))?;
    info!("saved {}", path.display());
    Ok(())
}

/// Load from `path`, choosing the encoding from its extension.
pub fn load_file(sheet: &mut Spreadsheet, path: &Path) -> Result<()> {
    let file = File::open(path)?;
    sheet.load_from(BufReader::new(file), Format::from_path(path))?;
    info!("loaded {}", path.display());
    Ok(())
}
