use std::io::{BufRead, BufReader, Lines, Read};

use serde_json::Value;

use crate::FetchError;

/// Blocking iterator over newline-delimited JSON documents on a long-lived
/// response body. There is no timeout or cancellation machinery: the caller
/// bounds consumption by counting items and then closes (or drops) the
/// stream, which hangs up the connection.
pub struct JsonLineStream<R: Read> {
    lines: Lines<BufReader<R>>,
}

impl<R: Read> JsonLineStream<R> {
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
        }
    }

    /// Explicit hang-up; dropping the stream does the same.
    pub fn close(self) {}
}

impl<R: Read> Iterator for JsonLineStream<R> {
    type Item = Result<Value, FetchError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => return Some(Err(FetchError::Io(err))),
            };

            // Keep-alive blank lines are not documents.
            if line.trim().is_empty() {
                continue;
            }

            return Some(serde_json::from_str(&line).map_err(FetchError::Json));
        }
    }
}
