// Row-oriented table reader/writer
//
// Two encodings of the same rectangular data: tab-separated text (no
// escaping at all, so cells must not contain tab/CR/LF) and quoted CSV.
// The CSV reader is deliberately tolerant: quoted cells may embed commas,
// doubled quotes and line breaks, unquoted cells are accepted, and both
// LF and CRLF line endings work.

use super::omi::write_atomically;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// One table row: an ordered sequence of string cells.
pub type Row = Vec<String>;

/// Command tags occupying the first cell of a row.
pub mod tags {
    pub const COMMENT: &str = "comment";
    pub const WELCOME: &str = "welcome message";
    pub const CHANNEL: &str = "channel";
    pub const KEY: &str = "key";
    pub const SETTING: &str = "setting";
}

#[derive(Error, Debug)]
pub enum TableError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: unterminated quoted field")]
    UnterminatedQuote { line: usize },

    #[error("cell contains a character the text format cannot carry: {0:?}")]
    UnwritableCell(char),
}

pub type Result<T> = std::result::Result<T, TableError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// Tab-separated, one record per line.
    Text,
    /// Quoted CSV, RFC-4180-like.
    Csv,
}

pub fn read_rows(path: &Path, format: TableFormat) -> Result<Vec<Row>> {
    let contents = fs::read_to_string(path)?;
    match format {
        TableFormat::Text => Ok(parse_text(&contents)),
        TableFormat::Csv => parse_csv(&contents),
    }
}

pub fn write_rows(path: &Path, format: TableFormat, rows: &[Row]) -> Result<()> {
    let mut out = String::new();
    for row in rows {
        let line = match format {
            TableFormat::Text => text_line(row)?,
            TableFormat::Csv => csv_line(row),
        };
        out.push_str(&line);
        out.push('\n');
    }
    write_atomically(path, out.as_bytes())?;
    Ok(())
}

fn parse_text(contents: &str) -> Vec<Row> {
    contents
        .lines()
        .map(|line| {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() {
                Vec::new()
            } else {
                line.split('\t').map(str::to_string).collect()
            }
        })
        .collect()
}

fn text_line(row: &[String]) -> Result<String> {
    for cell in row {
        if let Some(ch) = cell.chars().find(|c| matches!(c, '\t' | '\r' | '\n')) {
            return Err(TableError::UnwritableCell(ch));
        }
    }
    Ok(row.join("\t"))
}

fn csv_line(row: &[String]) -> String {
    let mut line = String::new();
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        line.push('"');
        for ch in cell.chars() {
            if ch == '"' {
                line.push('"');
            }
            line.push(ch);
        }
        line.push('"');
    }
    line
}

fn parse_csv(contents: &str) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    let mut row: Row = Vec::new();
    let mut cell = String::new();
    // A row with a single empty unquoted cell is a blank row.
    let mut row_has_data = false;
    let mut line = 1;

    let mut chars = contents.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                row_has_data = true;
                loop {
                    match chars.next() {
                        Some('"') => {
                            if chars.peek() == Some(&'"') {
                                chars.next();
                                cell.push('"');
                            } else {
                                break;
                            }
                        }
                        Some('\n') => {
                            line += 1;
                            cell.push('\n');
                        }
                        Some(c) => cell.push(c),
                        None => return Err(TableError::UnterminatedQuote { line }),
                    }
                }
            }
            ',' => {
                row_has_data = true;
                row.push(std::mem::take(&mut cell));
            }
            '\r' => {
                // Swallowed; the following '\n' ends the record.
            }
            '\n' => {
                line += 1;
                if row_has_data || !cell.is_empty() {
                    row.push(std::mem::take(&mut cell));
                }
                rows.push(std::mem::take(&mut row));
                row_has_data = false;
            }
            c => {
                row_has_data = true;
                cell.push(c);
            }
        }
    }

    // Final record without a trailing newline.
    if row_has_data || !cell.is_empty() {
        row.push(cell);
        rows.push(row);
    }

    Ok(rows)
}
