use std::{
    io::{self, Write},
    path::PathBuf,
};

use fs_err::File;
use log::debug;
use thiserror::Error;

use crate::schema::{Record, Schema};

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("A {found} record cannot be written to a {expected} table")]
    SchemaMismatch { expected: Schema, found: Schema },
}

/// Append-only CSV table.
///
/// Every call to [`OutputTable::write_rows`] is flushed and synced before it
/// returns. When the mirror is enabled, rows enter it only after they reached
/// the file, so both always hold the same rows in the same order.
pub struct OutputTable {
    schema: Schema,
    file: File,
    mirror: Option<Vec<Record>>,
}

impl OutputTable {
    /// Creates the file and writes the header row.
    pub fn create(
        path: impl Into<PathBuf>,
        schema: Schema,
        mirror: bool,
    ) -> Result<Self, WriteError> {
        let path = path.into();
        let mut header = csv_buffer();
        header.write_record(schema.header())?;
        let mut table = Self {
            schema,
            file: File::create(&path)?,
            mirror: mirror.then(Vec::new),
        };
        table.append(&into_bytes(header)?)?;
        debug!("Created {schema} table at {path:?}");
        Ok(table)
    }

    /// Rows written so far, if the mirror is enabled.
    pub fn rows(&self) -> Option<&[Record]> {
        self.mirror.as_deref()
    }

    pub fn into_rows(self) -> Option<Vec<Record>> {
        self.mirror
    }

    /// Appends the non-empty rows in order and returns how many were written.
    ///
    /// The batch is encoded in memory first and handed to the file in a single
    /// write, so an encoding failure leaves the file untouched. Only an I/O
    /// failure in the middle of that write can leave a truncated last line,
    /// and that error ends the run.
    pub fn write_rows(
        &mut self,
        rows: impl IntoIterator<Item = Record>,
    ) -> Result<usize, WriteError> {
        let rows: Vec<_> = rows.into_iter().filter(|row| !row.is_empty()).collect();
        if let Some(row) = rows.iter().find(|row| row.schema() != self.schema) {
            return Err(WriteError::SchemaMismatch {
                expected: self.schema,
                found: row.schema(),
            });
        }
        self.append(&encode_rows(&rows)?)?;

        let written = rows.len();
        if let Some(mirror) = &mut self.mirror {
            mirror.extend(rows);
        }
        Ok(written)
    }

    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.file.write_all(bytes)?;
        self.file.flush()?;
        self.file.sync_data()
    }
}

fn csv_buffer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(vec![])
}

fn into_bytes(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, WriteError> {
    writer
        .into_inner()
        .map_err(|e| WriteError::Io(e.into_error()))
}

fn encode_rows(rows: &[Record]) -> Result<Vec<u8>, WriteError> {
    let mut writer = csv_buffer();
    for row in rows {
        writer.serialize(row)?;
    }
    into_bytes(writer)
}
