//! JSON I/O handling for CLI
//!
//! - Input: one JSON value read from stdin (may span lines)
//! - Output: one JSON object per line on stdout
//! - UTF-8 only

use std::io::{BufRead, Write};

use serde_json::{json, Value};

use super::errors::{CliError, CliResult};

/// Read a JSON request
pub fn read_request<R: BufRead>(mut reader: R) -> CliResult<Value> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;

    if text.trim().is_empty() {
        return Err(CliError::io_error("Empty input"));
    }

    let value: Value = serde_json::from_str(&text)?;
    Ok(value)
}

/// Write a success response
pub fn write_response<W: Write>(out: &mut W, data: Value) -> CliResult<()> {
    let response = json!({
        "status": "ok",
        "data": data
    });
    write_line(out, &response)
}

/// Write an error response, listing validation issues when there are any
pub fn write_error<W: Write>(out: &mut W, err: &CliError) -> CliResult<()> {
    let response = json!({
        "status": "error",
        "code": err.code_str(),
        "message": err.message(),
        "issues": err.issues(),
    });
    write_line(out, &response)
}

fn write_line<W: Write>(out: &mut W, response: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *out, response)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{FieldIssue, FieldPath, ValidationError};

    #[test]
    fn test_read_multiline_request() {
        let input = "{\n  \"name\": \"ada\"\n}\n";
        let value = read_request(input.as_bytes()).unwrap();
        assert_eq!(value, json!({"name": "ada"}));
    }

    #[test]
    fn test_read_empty_request() {
        let err = read_request("  \n".as_bytes()).unwrap_err();
        assert_eq!(err.code_str(), "AERO_CLI_IO_ERROR");
    }

    #[test]
    fn test_write_error_includes_issues() {
        let err = CliError::validation_failed(ValidationError::new(
            "User",
            vec![FieldIssue::missing(FieldPath::field("name"))],
        ));
        let mut out = Vec::new();
        write_error(&mut out, &err).unwrap();

        let line: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(line["status"], "error");
        assert_eq!(line["code"], "AERO_CLI_VALIDATION_FAILED");
        assert_eq!(line["issues"][0]["path"], "name");
        assert_eq!(line["issues"][0]["kind"], "missing");
    }

    #[test]
    fn test_write_response_is_one_line() {
        let mut out = Vec::new();
        write_response(&mut out, json!({"a": 1})).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "{\"status\":\"ok\",\"data\":{\"a\":1}}\n");
    }
}
