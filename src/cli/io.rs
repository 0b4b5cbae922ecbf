//! JSON-lines I/O for the CLI
//!
//! - Input: one JSON object per line
//! - Output: one JSON object per line
//! - UTF-8 only

use std::io::{BufRead, Write};

use serde_json::{json, Value};

use super::errors::{CliError, CliResult};
use crate::policy::ErrorEntry;

/// Reads JSON requests line by line; blank lines are skipped
pub fn read_requests<R: BufRead>(reader: R) -> impl Iterator<Item = CliResult<Value>> {
    reader.lines().filter_map(|line| match line {
        Ok(line) if line.trim().is_empty() => None,
        Ok(line) => Some(serde_json::from_str(&line).map_err(CliError::from)),
        Err(e) => Some(Err(CliError::from(e))),
    })
}

fn write_line<W: Write>(out: &mut W, response: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *out, response)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Writes a success response
pub fn write_response<W: Write>(out: &mut W, data: Value) -> CliResult<()> {
    write_line(out, &json!({"status": "ok", "data": data}))
}

/// Writes a rejected write with its ordered error entries
pub fn write_rejection<W: Write>(out: &mut W, code: &str, errors: &[ErrorEntry]) -> CliResult<()> {
    write_line(out, &json!({"status": "error", "code": code, "errors": errors}))
}

/// Writes an error response without entries
pub fn write_error<W: Write>(out: &mut W, code: &str, message: &str) -> CliResult<()> {
    write_line(out, &json!({"status": "error", "code": code, "message": message}))
}
