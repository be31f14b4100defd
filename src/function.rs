//! Recalculation engine.
//!
//! A text edit first brings the dependency graph in line with the new text and
//! then runs one recalculation pass: the edited cell is recomputed, followed
//! by every cell that transitively depends on it. A cell reached a second time
//! within one pass is treated as part of a cycle and receives the
//! circular-reference sentinel.

use std::collections::HashSet;

use log::{debug, trace};

use crate::cell::Property;
use crate::parser::{ExprTree, Parser};
use crate::spreadsheet::{parse_cell_name, Spreadsheet};

pub const CIRCULAR_REFERENCE: &str = "!(circular-reference)";
pub const SELF_REFERENCE: &str = "!(self-reference)";
/// A formula operand is neither a cell reference nor a number.
pub const NAME_ERROR: &str = "!(name)";
/// A formula references a cell outside the grid.
pub const BOUNDS_ERROR: &str = "!(bounds)";
/// A formula references a cell whose value is not a number.
pub const VALUE_ERROR: &str = "!(value)";

/// Text of the form `=<body>` with a non-empty body.
pub fn is_formula(text: &str) -> bool {
    text.len() > 1 && text.starts_with('=')
}

/// Handle a changed text: update the graph, then recompute the cell and its
/// dependents.
pub(crate) fn update_cell(sheet: &mut Spreadsheet, idx: usize) {
    let text = sheet.cells[idx].text();
    let new_refs = Parser::find_refs(text);
    let formula = is_formula(text);
    let old_refs = sheet.cells[idx].take_formula_refs();

    let (columns, rows) = (sheet.column_count(), sheet.row_count());
    let resolve = |name: &str| {
        let (col, row) = parse_cell_name(name)?;
        (col < columns && row < rows).then_some(row * columns + col)
    };
    sheet.graph.update(idx, &old_refs, &new_refs, resolve);
    // Plain text registers edges too, but only a formula's are retracted later.
    if formula {
        sheet.cells[idx].set_formula_refs(new_refs);
    }

    recalculate(sheet, idx);
}

/// One recalculation pass rooted at `root`.
///
/// Runs on an explicit work list that visits cells in the same pre-order a
/// recursive descent would, so long dependency chains do not grow the stack.
/// `visited` lives for the whole pass: any cell met a second time, whether
/// through a cycle or through two paths from the root, gets the
/// circular-reference sentinel.
fn recalculate(sheet: &mut Spreadsheet, root: usize) {
    let mut visited = HashSet::new();
    let mut pending = vec![root];
    let mut recomputed = 0usize;

    while let Some(idx) = pending.pop() {
        if !visited.insert(idx) {
            trace!("{} revisited, cycle", sheet.cells[idx].name());
            sheet.cells[idx].set_value(CIRCULAR_REFERENCE.to_string());
            sheet.notify(idx, Property::Value);
            continue;
        }

        let (value, tree) = compute(sheet, idx);
        trace!("{} = {:?}", sheet.cells[idx].name(), value);
        let halt = value == CIRCULAR_REFERENCE || value == SELF_REFERENCE;
        let cell = &mut sheet.cells[idx];
        cell.set_tree(tree);
        cell.set_value(value);
        sheet.notify(idx, Property::Value);
        recomputed += 1;

        if !halt {
            pending.extend(sheet.graph.dependents(idx).rev());
        }
    }

    debug!(
        "recalculated {} cell(s) from {}",
        recomputed,
        sheet.cells[root].name()
    );
}

/// New value and compiled tree for one cell, from its text and the current
/// values of the cells it references.
fn compute(sheet: &Spreadsheet, idx: usize) -> (String, Option<ExprTree>) {
    let cell = &sheet.cells[idx];
    let text = cell.text();
    if !is_formula(text) {
        return (text.to_string(), None);
    }

    let body = text[1..].to_uppercase();
    // Compiled ahead of the checks so the tree's variables are kept even when
    // the formula evaluates to an error.
    let mut tree = match ExprTree::compile(&body) {
        Ok(tree) => tree,
        Err(err) => {
            debug!("{}: {}", cell.name(), err);
            return (NAME_ERROR.to_string(), None);
        }
    };

    let Some(refs) = Parser::check_refs(&body) else {
        return (NAME_ERROR.to_string(), Some(tree));
    };

    if refs.iter().any(|name| sheet.resolve(name) == Some(idx)) {
        return (SELF_REFERENCE.to_string(), Some(tree));
    }

    for name in &refs {
        let Some(target) = sheet.resolve(name) else {
            return (BOUNDS_ERROR.to_string(), Some(tree));
        };
        let value = sheet.cells[target].value();
        let number = if value.is_empty() {
            0.0
        } else {
            match value.trim().parse::<f64>() {
                Ok(number) => number,
                Err(_) => return (VALUE_ERROR.to_string(), Some(tree)),
            }
        };
        tree.set_var(name, number);
    }

    let result = tree.eval();
    (result.to_string(), Some(tree))
}
