//! POP3 response writing
//!
//! Every reply is a `+OK` or `-ERR` status line. Multi-line replies (LIST
//! without argument, RETR) follow the status line with data lines and end
//! with a line holding a single `.`.

use crate::error::Result;
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub const USER_VALID: &str = "User is valid, proceed with password";
pub const PASSWORD_VALID: &str = "Password is valid, mail loaded";
pub const INVALID_PASSWORD: &str = "Invalid password";
pub const AUTH_UNAVAILABLE: &str = "Authentication service unavailable";
pub const MAILDROP_UNAVAILABLE: &str = "Unable to open maildrop";
pub const BAD_SEQUENCE: &str = "Bad sequence of commands";
pub const SYNTAX_ERROR: &str = "Syntax error in parameters or arguments";
pub const UNRECOGNIZED: &str = "Syntax error, command unrecognized";
pub const NOT_IMPLEMENTED: &str = "Command not implemented";
pub const NO_SUCH_MESSAGE: &str = "no such message";
pub const MESSAGE_FOLLOWS: &str = "Message follows";
pub const MESSAGE_UNREADABLE: &str = "Unable to read message";
pub const MESSAGE_DELETED: &str = "Message deleted";
pub const NOOP: &str = "(noop)";
pub const CLOSING: &str = "Service closing transmission channel";
pub const COMMIT_FAILED: &str = "Some deleted messages not removed";

/// Multi-line response terminator
pub const TERMINATOR: &[u8] = b".\r\n";

pub fn greeting(hostname: &str) -> String {
    format!("+OK POP3 Server on {} ready\r\n", hostname)
}

pub async fn ok<W>(out: &mut W, text: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(format!("+OK {}\r\n", text).as_bytes()).await?;
    Ok(())
}

pub async fn err<W>(out: &mut W, text: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(format!("-ERR {}\r\n", text).as_bytes()).await?;
    Ok(())
}

/// Write one data line of a multi-line response
pub async fn data_line<W>(out: &mut W, text: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(format!("{}\r\n", text).as_bytes()).await?;
    Ok(())
}

pub async fn terminator<W>(out: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(TERMINATOR).await?;
    Ok(())
}

/// Frame one raw line of message content for transmission
///
/// The stored terminator (LF or CRLF, or none on a final line) is replaced
/// with CRLF, and a leading `.` is doubled so the line cannot be mistaken
/// for the end of the response.
pub fn stuff_line(line: &[u8]) -> Vec<u8> {
    let content = line
        .strip_suffix(b"\n")
        .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
        .unwrap_or(line);

    let mut framed = Vec::with_capacity(content.len() + 3);
    if content.first() == Some(&b'.') {
        framed.push(b'.');
    }
    framed.extend_from_slice(content);
    framed.extend_from_slice(b"\r\n");
    framed
}
