//! Bounded command line reading
//!
//! POP3 commands are single CRLF-terminated lines. A line that does not fit
//! the configured limit, that carries a NUL byte, or that is blank is not a
//! recoverable syntax error: the connection is closed after one reply.

use crate::error::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Why an inbound line was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFault {
    /// No line terminator within the length limit
    TooLong,
    /// Peer closed the connection in the middle of a line
    Unterminated,
    /// Embedded NUL byte
    NullByte,
    /// Nothing but whitespace
    Blank,
}

impl LineFault {
    /// Final reply sent before closing the connection
    pub fn reply(&self) -> &'static str {
        match self {
            LineFault::Blank => "Syntax error, blank command unrecognized",
            _ => "Syntax error, command unrecognized",
        }
    }
}

/// Result of reading one line from the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundLine {
    /// A command with trailing whitespace and the terminator stripped
    Command(String),
    /// Clean end of stream between commands
    Closed,
    Fault(LineFault),
}

pub struct LineReader<R> {
    inner: R,
    max_line_length: usize,
    buf: Vec<u8>,
}

impl<R> LineReader<R>
where
    R: AsyncBufRead + Unpin,
{
    /// `max_line_length` bounds a line including its terminator
    pub fn new(inner: R, max_line_length: usize) -> Self {
        Self {
            inner,
            max_line_length,
            buf: Vec::with_capacity(max_line_length),
        }
    }

    pub async fn next_line(&mut self) -> Result<InboundLine> {
        self.buf.clear();

        let n = (&mut self.inner)
            .take(self.max_line_length as u64)
            .read_until(b'\n', &mut self.buf)
            .await?;

        if n == 0 {
            return Ok(InboundLine::Closed);
        }

        if self.buf.last() != Some(&b'\n') {
            let fault = if n >= self.max_line_length {
                LineFault::TooLong
            } else {
                LineFault::Unterminated
            };
            return Ok(InboundLine::Fault(fault));
        }

        if self.buf.contains(&0) {
            return Ok(InboundLine::Fault(LineFault::NullByte));
        }

        let text = String::from_utf8_lossy(&self.buf);
        let command = text.trim_end();
        if command.is_empty() {
            return Ok(InboundLine::Fault(LineFault::Blank));
        }

        Ok(InboundLine::Command(command.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(input: &[u8], max: usize) -> LineReader<Cursor<Vec<u8>>> {
        LineReader::new(Cursor::new(input.to_vec()), max)
    }

    #[tokio::test]
    async fn test_reads_successive_lines() {
        let mut lines = reader(b"USER alice\r\nPASS secret \r\n", 1024);

        assert_eq!(
            lines.next_line().await.unwrap(),
            InboundLine::Command("USER alice".to_string())
        );
        assert_eq!(
            lines.next_line().await.unwrap(),
            InboundLine::Command("PASS secret".to_string())
        );
        assert_eq!(lines.next_line().await.unwrap(), InboundLine::Closed);
    }

    #[tokio::test]
    async fn test_bare_lf_accepted() {
        let mut lines = reader(b"NOOP\n", 1024);
        assert_eq!(
            lines.next_line().await.unwrap(),
            InboundLine::Command("NOOP".to_string())
        );
    }

    #[tokio::test]
    async fn test_line_at_limit_accepted() {
        // 9 bytes including CRLF
        let mut lines = reader(b"LIST 12\r\n", 9);
        assert_eq!(
            lines.next_line().await.unwrap(),
            InboundLine::Command("LIST 12".to_string())
        );
    }

    #[tokio::test]
    async fn test_line_over_limit_is_fault() {
        let mut lines = reader(b"LIST 123\r\n", 9);
        assert_eq!(
            lines.next_line().await.unwrap(),
            InboundLine::Fault(LineFault::TooLong)
        );
    }

    #[tokio::test]
    async fn test_unterminated_line_is_fault() {
        let mut lines = reader(b"QUIT", 1024);
        assert_eq!(
            lines.next_line().await.unwrap(),
            InboundLine::Fault(LineFault::Unterminated)
        );
    }

    #[tokio::test]
    async fn test_null_byte_is_fault() {
        let mut lines = reader(b"USER al\0ice\r\n", 1024);
        assert_eq!(
            lines.next_line().await.unwrap(),
            InboundLine::Fault(LineFault::NullByte)
        );
    }

    #[tokio::test]
    async fn test_blank_line_is_fault() {
        let mut lines = reader(b"  \r\n", 1024);
        let line = lines.next_line().await.unwrap();
        assert_eq!(line, InboundLine::Fault(LineFault::Blank));
        assert_eq!(
            LineFault::Blank.reply(),
            "Syntax error, blank command unrecognized"
        );
    }
}
