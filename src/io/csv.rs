use csv::{ReaderBuilder, Writer};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::dataset::RawTable;
use crate::error::Result;

/// Read a raw table from a CSV file with a header row
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<RawTable> {
    let file = File::open(path.as_ref())?;
    read_csv_from_reader(file)
}

/// Read a raw table from any reader (file upload buffers included)
pub fn read_csv_from_reader<R: Read>(reader: R) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    let width = headers.len();
    let mut table = RawTable::new(headers);

    for result in rdr.records() {
        let record = result?;
        // Pad short rows with empty cells so every row matches the header
        let mut row: Vec<String> = record.iter().take(width).map(|c| c.to_string()).collect();
        row.resize(width, String::new());
        table.push_row(row)?;
    }

    Ok(table)
}

/// Write a raw table to a CSV file, overwriting any previous artifact
pub fn write_csv<P: AsRef<Path>>(table: &RawTable, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    write_csv_to_writer(table, file)
}

/// Write a raw table to any writer
pub fn write_csv_to_writer<W: Write>(table: &RawTable, writer: W) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(table.column_names())?;
    for row in table.rows() {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}
