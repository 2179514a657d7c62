//! CLI utilities for keylink.
//!
//! The utilities present in this module are used by the interactive client to read
//! commands from a user and print replies.
use std::io::{BufRead, Write};

use crate::codec::resp::{RespCommand, RespValue};

/// Possible inputs from a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    /// Exit command `.exit`, or end of input.
    Exit,
    /// Blank line.
    Empty,
    /// Command to send to the server.
    Command(RespCommand),
}

/// Prompt user for one line and turn it into an [`Input`].
///
/// Arguments are separated by whitespace; no quoting is supported.
pub fn prompt<R, W>(mut reader: R, mut writer: W) -> Result<Input, String>
where
    R: BufRead,
    W: Write,
{
    let mut s = String::default();
    write!(&mut writer, "> ").map_err(|e| e.to_string())?;
    writer.flush().map_err(|e| e.to_string())?;

    if reader.read_line(&mut s).map_err(|e| e.to_string())? == 0 {
        return Ok(Input::Exit);
    }

    match s.trim() {
        ".exit" => Ok(Input::Exit),
        "" => Ok(Input::Empty),
        s if s.starts_with('.') => Err(format!("unrecognized command '{}'", s)),
        s => Ok(Input::Command(s.split_whitespace().collect())),
    }
}

/// Renders a reply the way redis-cli does.
pub fn render(value: &RespValue) -> String {
    let mut out = String::new();
    render_into(value, 0, &mut out);
    out
}

fn render_into(value: &RespValue, indent: usize, out: &mut String) {
    match value {
        RespValue::Simple(text) => out.push_str(&String::from_utf8_lossy(text)),
        RespValue::Error(text) => {
            out.push_str("(error) ");
            out.push_str(&String::from_utf8_lossy(text));
        }
        RespValue::Integer(n) => out.push_str(&format!("(integer) {n}")),
        RespValue::Bulk(None) => out.push_str("(nil)"),
        RespValue::Bulk(Some(data)) => out.push_str(&format!("\"{}\"", data.escape_ascii())),
        RespValue::Array(items) if items.is_empty() => out.push_str("(empty array)"),
        RespValue::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push('\n');
                    out.push_str(&" ".repeat(indent));
                }
                let label = format!("{}) ", i + 1);
                out.push_str(&label);
                render_into(item, indent + label.len(), out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_prints_correctly() {
        let input = b".exit\n";
        let mut output = Vec::new();

        prompt(&input[..], &mut output).unwrap();

        let output = String::from_utf8(output).expect("not valid UTF-8");
        assert_eq!("> ", output);
    }

    #[test]
    fn prompt_splits_command_arguments() {
        let input = b"set  key value\n";
        let mut output = Vec::new();

        let res = prompt(&input[..], &mut output).unwrap();
        assert_eq!(
            res,
            Input::Command(RespCommand::new("set").arg("key").arg("value"))
        );
    }

    #[test]
    fn prompt_handles_blank_and_eof() {
        assert_eq!(prompt(&b"\n"[..], Vec::new()).unwrap(), Input::Empty);
        assert_eq!(prompt(&b""[..], Vec::new()).unwrap(), Input::Exit);
    }

    #[test]
    fn prompt_unrecognized_command() {
        let err = prompt(&b".something_wrong\n"[..], Vec::new()).unwrap_err();
        assert_eq!(err, "unrecognized command '.something_wrong'");
    }

    #[test]
    fn renders_replies() {
        assert_eq!(render(&RespValue::Simple(b"OK".to_vec())), "OK");
        assert_eq!(render(&RespValue::Bulk(None)), "(nil)");
        assert_eq!(render(&RespValue::Integer(3)), "(integer) 3");
        assert_eq!(
            render(&RespValue::Array(vec![
                RespValue::Bulk(Some(b"a".to_vec())),
                RespValue::Array(vec![RespValue::Integer(1), RespValue::Integer(2)]),
            ])),
            "1) \"a\"\n2) 1) (integer) 1\n   2) (integer) 2"
        );
    }
}
