use rust_xlsxwriter::{Workbook, Worksheet};
use serde_json::json;
use sheetview::loader::parse_workbook;
use sheetview::{Cell, Row};

/// Build an xlsx file whose first sheet is filled in by `fill`
fn workbook_bytes(fill: impl FnOnce(&mut Worksheet)) -> Vec<u8> {
    let mut workbook = Workbook::new();
    fill(workbook.add_worksheet());
    workbook.save_to_buffer().unwrap()
}

#[test]
fn header_row_becomes_keys() {
    let bytes = workbook_bytes(|sheet| {
        sheet.write_string(0, 0, "Name").unwrap();
        sheet.write_string(0, 1, "Amount").unwrap();
        sheet.write_string(1, 0, "Widget").unwrap();
        sheet.write_string(1, 1, "1,234").unwrap();
    });

    let dataset = parse_workbook("widgets.xlsx", &bytes).unwrap();

    assert_eq!(dataset.file_name(), "widgets.xlsx");
    assert_eq!(dataset.headers(), ["Name", "Amount"]);
    assert_eq!(
        serde_json::to_value(dataset.objects(dataset.rows())).unwrap(),
        json!([{ "Name": "Widget", "Amount": "1,234" }])
    );
}

#[test]
fn numbers_stay_numeric() {
    let bytes = workbook_bytes(|sheet| {
        sheet.write_string(0, 0, "Item").unwrap();
        sheet.write_string(0, 1, "Price").unwrap();
        sheet.write_string(1, 0, "Bolt").unwrap();
        sheet.write_number(1, 1, 1234.0).unwrap();
        sheet.write_string(2, 0, "Nut").unwrap();
        sheet.write_number(2, 1, 0.25).unwrap();
    });

    let dataset = parse_workbook("parts.xlsx", &bytes).unwrap();

    assert_eq!(
        dataset.rows(),
        [
            Row::new(vec![Some(Cell::Text("Bolt".into())), Some(Cell::Number(1234.0))]),
            Row::new(vec![Some(Cell::Text("Nut".into())), Some(Cell::Number(0.25))]),
        ]
    );
    assert_eq!(
        serde_json::to_value(dataset.objects(dataset.rows())).unwrap(),
        json!([{ "Item": "Bolt", "Price": 1234 }, { "Item": "Nut", "Price": 0.25 }])
    );
}

#[test]
fn empty_cells_are_omitted_and_blank_rows_skipped() {
    let bytes = workbook_bytes(|sheet| {
        sheet.write_string(0, 0, "A").unwrap();
        sheet.write_string(0, 1, "B").unwrap();
        sheet.write_string(1, 0, "first").unwrap();
        // row 2 left empty
        sheet.write_number(3, 1, 7.0).unwrap();
    });

    let dataset = parse_workbook("gaps.xlsx", &bytes).unwrap();

    assert_eq!(dataset.len(), 2);
    assert_eq!(
        serde_json::to_value(dataset.objects(dataset.rows())).unwrap(),
        json!([{ "A": "first" }, { "B": 7 }])
    );
}

#[test]
fn blank_and_duplicate_headers_are_renamed() {
    let bytes = workbook_bytes(|sheet| {
        sheet.write_string(0, 0, "Qty").unwrap();
        sheet.write_string(0, 2, "Qty").unwrap();
        sheet.write_number(1, 0, 1.0).unwrap();
        sheet.write_number(1, 1, 2.0).unwrap();
        sheet.write_number(1, 2, 3.0).unwrap();
    });

    let dataset = parse_workbook("dupes.xlsx", &bytes).unwrap();

    assert_eq!(dataset.headers(), ["Qty", "__EMPTY", "Qty_1"]);
    assert_eq!(
        serde_json::to_value(dataset.objects(dataset.rows())).unwrap(),
        json!([{ "Qty": 1, "__EMPTY": 2, "Qty_1": 3 }])
    );
}

#[test]
fn only_the_first_sheet_is_read() {
    let mut workbook = Workbook::new();
    let first = workbook.add_worksheet();
    first.write_string(0, 0, "First").unwrap();
    first.write_string(1, 0, "one").unwrap();
    let second = workbook.add_worksheet();
    second.write_string(0, 0, "Second").unwrap();
    second.write_string(1, 0, "two").unwrap();
    let bytes = workbook.save_to_buffer().unwrap();

    let dataset = parse_workbook("two-sheets.xlsx", &bytes).unwrap();
    assert_eq!(dataset.headers(), ["First"]);
}

#[test]
fn header_only_sheet_has_no_rows() {
    let bytes = workbook_bytes(|sheet| {
        sheet.write_string(0, 0, "Name").unwrap();
        sheet.write_string(0, 1, "Amount").unwrap();
    });

    let dataset = parse_workbook("empty.xlsx", &bytes).unwrap();
    assert!(dataset.is_empty());
}

#[test]
fn empty_sheet_has_no_rows() {
    let bytes = workbook_bytes(|_| {});
    let dataset = parse_workbook("blank.xlsx", &bytes).unwrap();
    assert!(dataset.is_empty());
    assert!(dataset.headers().is_empty());
}

#[test]
fn non_workbook_content_is_an_error() {
    assert!(parse_workbook("notes.xlsx", b"this is not a spreadsheet").is_err());
}
