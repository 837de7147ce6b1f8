use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Scan(String),
    Quantity { qty: u32, confirm_override: bool },
    /// Zero-based index into the offered lots.
    Lot(usize),
    Short(u32),
    Cancel,
    Retry,
    Prompt,
    Quit,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command :{0}")]
    Unknown(String),

    #[error(":{command} needs a number, got '{value}'")]
    BadNumber { command: &'static str, value: String },
}

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    ///
    /// `:qty 4` enters a quantity, `:qty 4!` confirms a deviation from the expected one.
    /// `:lot N` picks the N-th offered lot, counting from 1.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some(rest) = line.strip_prefix(':') else {
            return Ok(Some(Command::Scan(line.to_string())));
        };

        let (name, arg) = rest
            .split_once(char::is_whitespace)
            .map(|(n, a)| (n, a.trim()))
            .unwrap_or((rest, ""));

        let command = match name.to_ascii_lowercase().as_str() {
            "qty" | "q" => {
                let (digits, confirm_override) = match arg.strip_suffix('!') {
                    Some(d) => (d, true),
                    None => (arg, false),
                };
                Command::Quantity {
                    qty: number("qty", digits)?,
                    confirm_override,
                }
            }
            "lot" => {
                let n: u32 = number("lot", arg)?;
                let index = n.checked_sub(1).ok_or_else(|| CommandError::BadNumber {
                    command: "lot",
                    value: arg.to_string(),
                })?;
                Command::Lot(index as usize)
            }
            "short" => Command::Short(number("short", arg)?),
            "cancel" | "c" => Command::Cancel,
            "retry" | "r" => Command::Retry,
            "prompt" | "p" => Command::Prompt,
            "quit" | "exit" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

fn number(command: &'static str, value: &str) -> Result<u32, CommandError> {
    value.trim().parse().map_err(|_| CommandError::BadNumber {
        command,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_are_scans() {
        assert_eq!(
            Command::parse("  SKU1|L7 ").unwrap(),
            Some(Command::Scan("SKU1|L7".into()))
        );
        assert_eq!(Command::parse("   ").unwrap(), None);
    }

    #[test]
    fn quantity_with_and_without_override() {
        assert_eq!(
            Command::parse(":qty 4").unwrap(),
            Some(Command::Quantity { qty: 4, confirm_override: false })
        );
        assert_eq!(
            Command::parse(":q 6!").unwrap(),
            Some(Command::Quantity { qty: 6, confirm_override: true })
        );
    }

    #[test]
    fn lots_count_from_one() {
        assert_eq!(Command::parse(":lot 2").unwrap(), Some(Command::Lot(1)));
        match Command::parse(":lot 0") {
            Err(CommandError::BadNumber { command: "lot", .. }) => {}
            other => panic!("Expected BadNumber, got {other:?}"),
        }
    }

    #[test]
    fn unknown_commands_are_errors() {
        match Command::parse(":dance") {
            Err(CommandError::Unknown(name)) if name == "dance" => {}
            other => panic!("Expected Unknown, got {other:?}"),
        }
    }
}
