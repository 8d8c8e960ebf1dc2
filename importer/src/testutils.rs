use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};

/// Builds an xlsx whose first row is `headers`, plus one data row.
pub fn workbook_with_headers(headers: &[&str]) -> Vec<u8> {
    workbook_with_row(|sheet| {
        for (col, header) in headers.iter().enumerate() {
            sheet.write_string(0, col as u16, *header)?;
            sheet.write_string(1, col as u16, "value")?;
        }
        Ok(())
    })
}

/// Builds an xlsx with a single sheet filled in by `fill`.
pub fn workbook_with_row<F>(fill: F) -> Vec<u8>
where
    F: FnOnce(&mut Worksheet) -> Result<(), XlsxError>,
{
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    fill(sheet).expect("fill worksheet");
    workbook.save_to_buffer().expect("serialize workbook")
}
