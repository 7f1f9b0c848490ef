//! Edge-list text input
//!
//! One link per line as two whitespace-separated non-negative integers,
//! `source target`. Blank lines and lines starting with `#` or `%` are
//! skipped. Anything else is malformed.

use crate::graph::{GraphError, GraphResult};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Streaming parser yielding `(source, target)` pairs
pub struct EdgeListReader<R> {
    reader: R,
    line: u64,
    buf: Vec<u8>,
    failed: bool,
}

impl EdgeListReader<BufReader<File>> {
    pub fn open(path: &Path) -> GraphResult<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> EdgeListReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: Vec::new(),
            failed: false,
        }
    }

    /// Number of lines consumed so far
    pub fn line(&self) -> u64 {
        self.line
    }

    fn read_pair(&mut self) -> GraphResult<Option<(u32, u32)>> {
        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;

            let text = std::str::from_utf8(&self.buf)
                .map_err(|err| GraphError::malformed(self.line, format!("invalid UTF-8: {}", err)))?
                .trim();
            if text.is_empty() || text.starts_with('#') || text.starts_with('%') {
                continue;
            }
            return parse_line(text, self.line).map(Some);
        }
    }
}

impl<R: BufRead> Iterator for EdgeListReader<R> {
    type Item = GraphResult<(u32, u32)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_pair() {
            Ok(pair) => pair.map(Ok),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

fn parse_line(text: &str, line: u64) -> GraphResult<(u32, u32)> {
    let mut tokens = text.split_whitespace();
    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(source), Some(target), None) => {
            Ok((parse_index(source, line)?, parse_index(target, line)?))
        }
        _ => Err(GraphError::malformed(
            line,
            format!("expected two integers, found `{}`", text),
        )),
    }
}

/// Node indices must leave the node count itself within 32 bits.
fn parse_index(token: &str, line: u64) -> GraphResult<u32> {
    let value: u64 = token
        .parse()
        .map_err(|_| GraphError::malformed(line, format!("`{}` is not a node index", token)))?;
    match u32::try_from(value) {
        Ok(index) if index < u32::MAX => Ok(index),
        _ => Err(GraphError::malformed(
            line,
            format!("node index {} does not fit in 32 bits", value),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(input: &str) -> GraphResult<Vec<(u32, u32)>> {
        EdgeListReader::new(Cursor::new(input)).collect()
    }

    #[test]
    fn test_skips_comments_and_blanks() {
        let pairs = parse("# header\n% matrix market style\n\n0 1\n  2\t3  \n").unwrap();
        assert_eq!(pairs, vec![(0, 1), (2, 3)]);
    }

    #[test]
    fn test_missing_trailing_newline() {
        assert_eq!(parse("4 5").unwrap(), vec![(4, 5)]);
    }

    #[test]
    fn test_wrong_token_count() {
        let err = parse("0 1\n1 2 3\n").unwrap_err();
        assert!(matches!(err, GraphError::MalformedInput(ref msg) if msg.starts_with("line 2:")));
        assert!(parse("7\n").is_err());
    }

    #[test]
    fn test_rejects_negative_and_oversized() {
        assert!(matches!(parse("-1 0"), Err(GraphError::MalformedInput(_))));
        assert!(matches!(parse("0 4294967296"), Err(GraphError::MalformedInput(_))));
        assert!(matches!(parse("0 4294967295"), Err(GraphError::MalformedInput(_))));
        assert_eq!(parse("0 4294967294").unwrap(), vec![(0, u32::MAX - 1)]);
    }

    #[test]
    fn test_stops_after_error() {
        let mut reader = EdgeListReader::new(Cursor::new("x y\n0 1\n"));
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());
        assert_eq!(reader.line(), 1);
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let input: &[u8] = b"0 1\n1 \xff\n";
        let err = EdgeListReader::new(input).collect::<GraphResult<Vec<_>>>().unwrap_err();
        assert!(matches!(err, GraphError::MalformedInput(ref msg) if msg.starts_with("line 2:")));
    }
}
