//! End-to-end behaviour of the engine through its public surface.

use std::cell::RefCell;
use std::io::Cursor;
use std::rc::Rc;

use assert_matches::assert_matches;
use spreadsheet_engine::function::{BOUNDS_ERROR, CIRCULAR_REFERENCE, NAME_ERROR, SELF_REFERENCE};
use spreadsheet_engine::spreadsheet::parse_cell_name;
use spreadsheet_engine::{CellEvent, EngineError, Format, Property, Spreadsheet, DEFAULT_BG_COLOR};
use test_case::test_case;

fn set(sheet: &mut Spreadsheet, name: &str, text: &str) {
    let (col, row) = parse_cell_name(name).unwrap();
    sheet.set_text(col, row, text).unwrap();
}

fn value<'a>(sheet: &'a Spreadsheet, name: &str) -> &'a str {
    sheet.cell_by_name(name).unwrap().value()
}

#[test_case("=1+2*3", "7")]
#[test_case("=(1+2)*3", "9")]
#[test_case("=10-2-3", "5")]
#[test_case("=8/2/2", "2")]
fn precedence_and_associativity(formula: &str, expected: &str) {
    let mut sheet = Spreadsheet::new(26, 50);
    set(&mut sheet, "A1", formula);
    assert_eq!(value(&sheet, "A1"), expected);
}

#[test]
fn self_reference() {
    let mut sheet = Spreadsheet::new(26, 50);
    set(&mut sheet, "A1", "=A1");
    assert_eq!(value(&sheet, "A1"), SELF_REFERENCE);
}

#[test]
fn circular_reference() {
    let mut sheet = Spreadsheet::new(26, 50);
    set(&mut sheet, "A1", "=B1");
    set(&mut sheet, "B1", "=A1");
    assert_eq!(value(&sheet, "B1"), CIRCULAR_REFERENCE);
}

#[test]
fn breaking_a_cycle_recovers() {
    let mut sheet = Spreadsheet::new(26, 50);
    set(&mut sheet, "A1", "=B1");
    set(&mut sheet, "B1", "=A1");
    set(&mut sheet, "B1", "7");
    assert_eq!(value(&sheet, "B1"), "7");
    assert_eq!(value(&sheet, "A1"), "7");
}

#[test]
fn second_arrival_in_one_pass_is_circular() {
    let mut sheet = Spreadsheet::new(26, 50);
    set(&mut sheet, "B1", "=A1*2");
    set(&mut sheet, "C1", "=A1*3");
    set(&mut sheet, "D1", "=B1+C1");
    set(&mut sheet, "A1", "1");
    assert_eq!(value(&sheet, "D1"), CIRCULAR_REFERENCE);
}

#[test]
fn failed_formula_leaves_no_stale_dependency() {
    let mut sheet = Spreadsheet::new(26, 50);
    set(&mut sheet, "A1", "=B1*-2");
    assert_eq!(value(&sheet, "A1"), NAME_ERROR);
    set(&mut sheet, "A1", "=C1");
    set(&mut sheet, "B1", "=A1");
    assert_eq!(value(&sheet, "B1"), "0");
}

#[test]
fn out_of_bounds_reference() {
    let mut sheet = Spreadsheet::new(26, 50);
    set(&mut sheet, "A1", "=AB3");
    assert_eq!(value(&sheet, "A1"), BOUNDS_ERROR);
}

#[test]
fn dependent_propagation() {
    let mut sheet = Spreadsheet::new(26, 50);
    set(&mut sheet, "B1", "5");
    set(&mut sheet, "A1", "=B1+3");
    assert_eq!(value(&sheet, "A1"), "8");
    set(&mut sheet, "B1", "10");
    assert_eq!(value(&sheet, "A1"), "13");
}

#[test]
fn dependency_retraction() {
    let mut sheet = Spreadsheet::new(26, 50);
    set(&mut sheet, "A1", "=B1");
    set(&mut sheet, "B1", "1");
    assert_eq!(value(&sheet, "A1"), "1");

    set(&mut sheet, "A1", "42");
    set(&mut sheet, "B1", "2");
    set(&mut sheet, "B1", "3");
    assert_eq!(value(&sheet, "A1"), "42");
}

#[test]
fn undo_redo_round_trip() {
    let mut sheet = Spreadsheet::new(26, 50);
    set(&mut sheet, "A1", "hello");
    sheet.push_undo(0, 0, Property::Text).unwrap();
    set(&mut sheet, "A1", "world");
    assert_eq!(sheet.peek_undo(), Some(Property::Text));

    sheet.undo().unwrap();
    assert_eq!(sheet.get_cell(0, 0).unwrap().text(), "hello");
    assert_eq!(value(&sheet, "A1"), "hello");

    sheet.redo().unwrap();
    assert_eq!(sheet.get_cell(0, 0).unwrap().text(), "world");
    assert_eq!(value(&sheet, "A1"), "world");

    sheet.redo().unwrap_err();
    assert_matches!(sheet.redo(), Err(EngineError::RedoEmpty));
}

#[test]
fn persistence_round_trip() {
    let color = 0xFF33_66CC;
    let mut sheet = Spreadsheet::new(26, 50);
    set(&mut sheet, "A1", "foo");
    sheet.set_bg_color(0, 0, color).unwrap();

    let mut bytes = Vec::new();
    sheet.save_to(&mut bytes, Format::Xml).unwrap();

    let mut reloaded = Spreadsheet::new(26, 50);
    reloaded.load_from(Cursor::new(bytes), Format::Xml).unwrap();

    let a1 = reloaded.get_cell(0, 0).unwrap();
    assert_eq!(a1.text(), "foo");
    assert_eq!(a1.bg_color(), color);
    for cell in reloaded.cells().filter(|c| (c.column(), c.row()) != (0, 0)) {
        assert!(cell.is_default(), "{} should be default", cell.name());
        assert_eq!(cell.bg_color(), DEFAULT_BG_COLOR);
    }
}

#[test_case(Format::Xml ; "xml")]
#[test_case(Format::Json ; "json")]
fn persistence_keeps_surrounding_whitespace(format: Format) {
    let mut sheet = Spreadsheet::new(26, 50);
    set(&mut sheet, "A1", "  padded ");
    set(&mut sheet, "A2", " ");

    let mut bytes = Vec::new();
    sheet.save_to(&mut bytes, format).unwrap();
    let mut reloaded = Spreadsheet::new(26, 50);
    reloaded.load_from(Cursor::new(bytes), format).unwrap();

    assert_eq!(reloaded.get_cell(0, 0).unwrap().text(), "  padded ");
    assert_eq!(reloaded.get_cell(0, 1).unwrap().text(), " ");
    assert!(!reloaded.get_cell(0, 1).unwrap().is_default());
}

#[test]
fn subscribers_see_text_then_values() {
    let mut sheet = Spreadsheet::new(26, 50);
    set(&mut sheet, "B1", "=A1*2");
    set(&mut sheet, "C1", "=B1+1");

    let events: Rc<RefCell<Vec<CellEvent>>> = Rc::default();
    let sink = Rc::clone(&events);
    sheet.subscribe(move |event| sink.borrow_mut().push(*event));

    set(&mut sheet, "A1", "4");
    assert_eq!(value(&sheet, "C1"), "9");

    let seen: Vec<_> = events
        .borrow()
        .iter()
        .map(|e| (e.col, e.property))
        .collect();
    assert_eq!(
        seen,
        vec![
            (0, Property::Text),
            (0, Property::Value),
            (1, Property::Value),
            (2, Property::Value),
        ]
    );
}
