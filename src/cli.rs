//! Parsing of the interactive commands typed during a match.

use std::fmt;

/// One line of interactive input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Select(u32),
    Rotate,
    Place { row: usize, col: usize },
    Fire { row: usize, col: usize },
    Refresh,
    Show,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ParseError {}

impl From<String> for ParseError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

pub const HELP: &str = "\
Commands:
  select T    pick vessel type T to place
  rotate      toggle the selected vessel's orientation
  place A5    place the selected vessel with its anchor at A5
  fire B7     fire at B7 on the opponent's board
  refresh     reload the match from the server
  show        print both boards
  help        this text
  quit        leave the match";

/// Parse `A5`-style coordinates into `(row, col)` for a board of `size`.
pub fn parse_coord(input: &str, size: usize) -> Result<(usize, usize), String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("Empty input".to_string());
    }
    if input.len() < 2 {
        return Err("Too short - need column letter and row number (e.g., A5)".to_string());
    }
    let last_col = char::from(b'A' + u8::try_from(size.clamp(1, 26) - 1).unwrap_or(25));
    let mut chars = input.chars();
    let col_ch = chars
        .next()
        .ok_or("No column letter")?
        .to_ascii_uppercase();
    if !col_ch.is_ascii_alphabetic() {
        return Err(format!("Invalid column '{}' - must be a letter A-{}", col_ch, last_col));
    }
    let col = usize::from(col_ch as u8 - b'A');
    if col >= size {
        return Err(format!("Column '{}' out of bounds - must be A-{}", col_ch, last_col));
    }
    let row_str: String = chars.collect();
    let row: usize = row_str
        .parse()
        .map_err(|_| format!("Invalid row '{}' - must be a number 1-{}", row_str, size))?;
    if row == 0 {
        return Err(format!("Row cannot be 0 - must be 1-{}", size));
    }
    if row > size {
        return Err(format!("Row {} out of bounds - must be 1-{}", row, size));
    }
    Ok((row - 1, col))
}

impl Command {
    /// Parse one input line against a board of `size`.
    pub fn parse(line: &str, size: usize) -> Result<Self, ParseError> {
        let mut words = line.split_whitespace();
        let verb = words
            .next()
            .ok_or_else(|| ParseError("Empty input".to_string()))?
            .to_ascii_lowercase();
        let arg = words.next();
        if words.next().is_some() {
            return Err(ParseError(format!("Too many arguments for '{}'", verb)));
        }
        let coord = |arg: Option<&str>| -> Result<(usize, usize), ParseError> {
            let arg = arg.ok_or_else(|| ParseError(format!("'{}' needs a coordinate", verb)))?;
            Ok(parse_coord(arg, size)?)
        };

        match verb.as_str() {
            "select" | "s" => {
                let arg = arg.ok_or_else(|| ParseError("'select' needs a vessel type".to_string()))?;
                let vessel_type = arg
                    .parse()
                    .map_err(|_| ParseError(format!("Invalid vessel type '{}'", arg)))?;
                Ok(Command::Select(vessel_type))
            }
            "rotate" | "r" => Ok(Command::Rotate),
            "place" | "p" => coord(arg).map(|(row, col)| Command::Place { row, col }),
            "fire" | "f" => coord(arg).map(|(row, col)| Command::Fire { row, col }),
            "refresh" => Ok(Command::Refresh),
            "show" => Ok(Command::Show),
            "help" | "?" => Ok(Command::Help),
            "quit" | "q" | "exit" => Ok(Command::Quit),
            other => Err(ParseError(format!("Unknown command '{}' (try 'help')", other))),
        }
    }
}
