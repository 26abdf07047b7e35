//! CLI utilities for minidb.
//!
//! The utilities present in this module can be used to build an interactive
//! shell on top of [`Database`](crate::Database).
use std::io::{BufRead, Write};

/// Prompt printed before every line of input.
pub const PROMPT: &str = "SQL> ";

/// Summary of the supported statements, shown for `help`.
pub const HELP: &str = "\
Supported statements (keywords are case-insensitive, trailing ';' optional):

  CREATE TABLE name (col TYPE [NOT NULL] [PRIMARY KEY], ... [, PRIMARY KEY (a, b)])
      types: INT, DOUBLE, DATE, VARCHAR(n), CHAR(n), TEXT[(n)]
  INSERT INTO name VALUES (v1, v2, ...)
  SELECT * | col, COUNT(*), SUM(col), AVG(col), MIN(col), MAX(col) FROM name
      [WHERE col op value] [GROUP BY col, ...] [HAVING expr op expr]
  UPDATE name SET col = value | col = col + value | col += value, ... [WHERE col op value]
  DELETE FROM name [WHERE col op value]

  Comparison operators: =, !=, >, <, >=, <=
  Text and dates must be quoted: 'Alice', '2025-01-31'

Commands:
  help, ?      show this message
  exit, quit   leave the shell";

/// Possible commands from a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `exit`, `quit`, or end of input
    Exit,
    /// `help` or `?`
    Help,
    /// Statement text, possibly empty
    Statement(String),
}

/// Prompt the user for one line of input.
pub fn prompt<R, W>(mut reader: R, mut writer: W) -> Result<Command, String>
where
    R: BufRead,
    W: Write,
{
    let mut s = String::default();
    write!(&mut writer, "{PROMPT}").map_err(|e| format!("failed to write prompt: {e}"))?;
    writer
        .flush()
        .map_err(|e| format!("failed to write prompt: {e}"))?;

    let read = reader
        .read_line(&mut s)
        .map_err(|e| format!("failed to read input: {e}"))?;
    if read == 0 {
        return Ok(Command::Exit);
    }

    let line = s.trim();
    match line.to_lowercase().as_str() {
        "exit" | "quit" => Ok(Command::Exit),
        "help" | "?" => Ok(Command::Help),
        _ => Ok(Command::Statement(line.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_prints_correctly() {
        let input = b"exit\n";
        let mut output = Vec::new();

        prompt(&input[..], &mut output).unwrap();

        let output = String::from_utf8(output).expect("not valid UTF-8");
        assert_eq!("SQL> ", output);
    }

    #[test]
    fn prompt_handles_commands() {
        let inputs = vec![
            (&b"QUIT\n"[..], Command::Exit),
            (&b""[..], Command::Exit),
            (&b"  Help \n"[..], Command::Help),
            (&b"?\n"[..], Command::Help),
        ];

        for (input, expected) in inputs {
            let mut output = Vec::new();
            assert_eq!(prompt(input, &mut output).unwrap(), expected);
        }
    }

    #[test]
    fn prompt_handles_statements() {
        let input = b"  SELECT * FROM t;  \n";
        let mut output = Vec::new();

        let res = prompt(&input[..], &mut output).unwrap();
        assert_eq!(Command::Statement("SELECT * FROM t;".into()), res);

        let res = prompt(&b"\n"[..], &mut output).unwrap();
        assert_eq!(Command::Statement(String::default()), res);
    }
}
