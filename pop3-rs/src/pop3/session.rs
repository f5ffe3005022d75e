//! POP3 session management
//!
//! Handles the RFC 1939 state machine for one connection:
//! AUTHORIZATION (USER/PASS) → TRANSACTION (STAT, LIST, RETR, DELE, RSET,
//! NOOP) → UPDATE (entered by QUIT, where deletions are committed).
//!
//! Command failures are answered with `-ERR` and the session carries on.
//! Failures of the connection itself end the session without a reply and
//! without committing anything.

use crate::error::{Pop3Error, Result};
use crate::pop3::commands::{parse_ordinal, CommandLine, Pop3Command};
use crate::pop3::line::{InboundLine, LineReader};
use crate::pop3::response;
use crate::security::UserDirectory;
use crate::storage::{Mailbox, MailboxStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter,
};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Maximum command line length, including CRLF
pub const MAX_LINE_LENGTH: usize = 1024;

/// Idle time allowed between commands (RFC 1939 autologout timer)
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(600);

/// POP3 session states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Greeting sent, no USER yet
    Undefined,
    /// USER accepted, waiting for PASS
    Authorization,
    /// Authenticated with the maildrop loaded
    Transaction,
    /// QUIT received; terminal
    Update,
}

/// What a command handler did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// `+OK` sent
    Success,
    /// `-ERR` sent, session continues
    Rejected,
    /// Session is over and the connection must close
    Quit,
}

/// Whether the read loop keeps going after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Terminate,
}

/// POP3 session
pub struct Pop3Session {
    state: SessionState,
    /// Name offered by the last USER, valid or not
    username: Option<String>,
    /// Present only in TRANSACTION
    mailbox: Option<Mailbox>,
    hostname: String,
    directory: Arc<dyn UserDirectory>,
    store: Arc<dyn MailboxStore>,
    max_line_length: usize,
    command_timeout: Duration,
}

impl Pop3Session {
    pub fn new(
        hostname: String,
        directory: Arc<dyn UserDirectory>,
        store: Arc<dyn MailboxStore>,
    ) -> Self {
        Self {
            state: SessionState::Undefined,
            username: None,
            mailbox: None,
            hostname,
            directory,
            store,
            max_line_length: MAX_LINE_LENGTH,
            command_timeout: COMMAND_TIMEOUT,
        }
    }

    pub fn with_limits(mut self, max_line_length: usize, command_timeout: Duration) -> Self {
        self.max_line_length = max_line_length;
        self.command_timeout = command_timeout;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn mailbox(&self) -> Option<&Mailbox> {
        self.mailbox.as_ref()
    }

    /// Run the session on a connected stream until QUIT or disconnect
    pub async fn handle<S>(mut self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let result = self.serve(stream).await;

        // Anything still loaded was never committed
        if let Some(mailbox) = self.mailbox.take() {
            let pending = mailbox.deleted_items().count();
            if pending > 0 {
                info!(
                    "Discarding {} pending deletions for {} (no QUIT)",
                    pending,
                    mailbox.owner()
                );
            }
        }

        result
    }

    async fn serve<S>(&mut self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (reader, writer) = tokio::io::split(stream);
        let mut lines = LineReader::new(BufReader::new(reader), self.max_line_length);
        let mut out = BufWriter::new(writer);

        out.write_all(response::greeting(&self.hostname).as_bytes())
            .await?;
        out.flush().await?;

        loop {
            let line = match timeout(self.command_timeout, lines.next_line()).await {
                Ok(line) => line?,
                Err(_) => {
                    warn!("Command timeout, disconnecting");
                    return Err(Pop3Error::Timeout);
                }
            };

            let line = match line {
                InboundLine::Command(line) => line,
                InboundLine::Closed => {
                    debug!("Client disconnected");
                    return Ok(());
                }
                InboundLine::Fault(fault) => {
                    warn!("Malformed command line ({:?}), closing connection", fault);
                    response::err(&mut out, fault.reply()).await?;
                    out.flush().await?;
                    return Ok(());
                }
            };

            if self.dispatch(&line, &mut out).await? == Flow::Terminate {
                return Ok(());
            }
        }
    }

    /// Route one command line to its handler and flush the reply
    ///
    /// `Err` means the output channel failed; the caller must stop.
    pub async fn dispatch<W>(&mut self, line: &str, out: &mut W) -> Result<Flow>
    where
        W: AsyncWrite + Unpin,
    {
        let Some(CommandLine { command, args }) = CommandLine::parse(line) else {
            response::err(out, response::UNRECOGNIZED).await?;
            out.flush().await?;
            return Ok(Flow::Continue);
        };

        if command == Pop3Command::Pass {
            debug!("Received: PASS ****");
        } else {
            debug!("Received: {}", line);
        }
        debug!("Handling POP3 command {:?} in state {:?}", command, self.state);

        let outcome = match command {
            Pop3Command::Quit => self.handle_quit(out).await?,
            Pop3Command::User => self.handle_user(&args, out).await?,
            Pop3Command::Pass => self.handle_pass(&args, out).await?,
            Pop3Command::Stat => self.handle_stat(out).await?,
            Pop3Command::List => self.handle_list(&args, out).await?,
            Pop3Command::Retr => self.handle_retr(&args, out).await?,
            Pop3Command::Rset => self.handle_rset(out).await?,
            Pop3Command::Noop => self.handle_noop(out).await?,
            Pop3Command::Dele => self.handle_dele(&args, out).await?,
            Pop3Command::Top | Pop3Command::Uidl | Pop3Command::Apop => {
                debug!("Command not implemented: {}", line);
                reject(out, response::NOT_IMPLEMENTED).await?
            }
            Pop3Command::Unknown(verb) => {
                debug!("Unknown command: {}", verb);
                reject(out, response::UNRECOGNIZED).await?
            }
        };

        out.flush().await?;

        Ok(match outcome {
            CommandOutcome::Quit => Flow::Terminate,
            CommandOutcome::Success | CommandOutcome::Rejected => Flow::Continue,
        })
    }

    /// The loaded maildrop, if the session is in TRANSACTION
    fn transaction_mailbox(&self) -> Option<&Mailbox> {
        match self.state {
            SessionState::Transaction => self.mailbox.as_ref(),
            _ => None,
        }
    }

    fn transaction_mailbox_mut(&mut self) -> Option<&mut Mailbox> {
        match self.state {
            SessionState::Transaction => self.mailbox.as_mut(),
            _ => None,
        }
    }

    /// Handle QUIT: enter UPDATE, commit deletions, close
    async fn handle_quit<W>(&mut self, out: &mut W) -> Result<CommandOutcome>
    where
        W: AsyncWrite + Unpin,
    {
        info!("QUIT in state {:?}", self.state);
        self.state = SessionState::Update;

        let committed = match self.mailbox.take() {
            Some(mailbox) => match self.store.commit(&mailbox).await {
                Ok(removed) => {
                    info!("Committed {} deletions for {}", removed, mailbox.owner());
                    true
                }
                Err(e) => {
                    error!("Failed to commit deletions for {}: {}", mailbox.owner(), e);
                    false
                }
            },
            None => true,
        };

        if committed {
            response::ok(out, response::CLOSING).await?;
        } else {
            response::err(out, response::COMMIT_FAILED).await?;
        }

        Ok(CommandOutcome::Quit)
    }

    /// Handle USER: record the offered name and report whether it exists
    async fn handle_user<W>(&mut self, args: &[String], out: &mut W) -> Result<CommandOutcome>
    where
        W: AsyncWrite + Unpin,
    {
        if !matches!(
            self.state,
            SessionState::Undefined | SessionState::Authorization
        ) {
            return reject(out, response::BAD_SEQUENCE).await;
        }

        let [username] = args else {
            return reject(out, response::SYNTAX_ERROR).await;
        };

        self.state = SessionState::Authorization;
        self.username = Some(username.clone());

        match self.directory.has_user(username).await {
            Ok(true) => {
                info!("USER {} accepted", username);
                accept(out, response::USER_VALID).await
            }
            Ok(false) => {
                warn!("USER {} has no maildrop", username);
                reject(out, &format!("sorry, no mailbox for {} here", username)).await
            }
            Err(e) => {
                error!("User lookup failed for {}: {}", username, e);
                reject(out, response::AUTH_UNAVAILABLE).await
            }
        }
    }

    /// Handle PASS: verify credentials and load the maildrop
    async fn handle_pass<W>(&mut self, args: &[String], out: &mut W) -> Result<CommandOutcome>
    where
        W: AsyncWrite + Unpin,
    {
        if self.state != SessionState::Authorization {
            return reject(out, response::BAD_SEQUENCE).await;
        }

        let [password] = args else {
            return reject(out, response::SYNTAX_ERROR).await;
        };

        let Some(username) = self.username.clone() else {
            return reject(out, response::BAD_SEQUENCE).await;
        };

        match self.directory.verify(&username, password).await {
            Ok(true) => {}
            Ok(false) => {
                warn!("PASS failed for {} (invalid credentials)", username);
                return reject(out, response::INVALID_PASSWORD).await;
            }
            Err(e) => {
                error!("Credential check failed for {}: {}", username, e);
                return reject(out, response::AUTH_UNAVAILABLE).await;
            }
        }

        match self.store.load(&username).await {
            Ok(mailbox) => {
                info!(
                    "PASS successful for {}: {} messages, {} octets",
                    username,
                    mailbox.len(false),
                    mailbox.size(false)
                );
                self.mailbox = Some(mailbox);
                self.state = SessionState::Transaction;
                accept(out, response::PASSWORD_VALID).await
            }
            Err(e) => {
                error!("Failed to load maildrop for {}: {}", username, e);
                reject(out, response::MAILDROP_UNAVAILABLE).await
            }
        }
    }

    /// Handle STAT: count and size of messages not marked deleted
    async fn handle_stat<W>(&mut self, out: &mut W) -> Result<CommandOutcome>
    where
        W: AsyncWrite + Unpin,
    {
        let Some(mailbox) = self.transaction_mailbox() else {
            return reject(out, response::BAD_SEQUENCE).await;
        };

        let status = format!("{} {}", mailbox.len(false), mailbox.size(false));
        accept(out, &status).await
    }

    /// Handle LIST, with or without a message number
    async fn handle_list<W>(&mut self, args: &[String], out: &mut W) -> Result<CommandOutcome>
    where
        W: AsyncWrite + Unpin,
    {
        let Some(mailbox) = self.transaction_mailbox() else {
            return reject(out, response::BAD_SEQUENCE).await;
        };

        let total = mailbox.len(true);
        let live = mailbox.len(false);

        match args {
            [] => {
                response::ok(out, &format!("{} messages", live)).await?;
                for (ordinal, item) in mailbox.live_items() {
                    response::data_line(out, &format!("{} {}", ordinal, item.size())).await?;
                }
                response::terminator(out).await?;
                Ok(CommandOutcome::Success)
            }
            [arg] => {
                let ordinal = parse_ordinal(arg);
                if ordinal == 0 || ordinal > total {
                    let reason = format!(
                        "{}, only {} messages in maildrop",
                        response::NO_SUCH_MESSAGE,
                        live
                    );
                    return reject(out, &reason).await;
                }

                match mailbox.item(ordinal) {
                    Some(item) if !item.is_deleted() => {
                        accept(out, &format!("{} {}", ordinal, item.size())).await
                    }
                    _ => reject(out, response::NO_SUCH_MESSAGE).await,
                }
            }
            _ => reject(out, response::SYNTAX_ERROR).await,
        }
    }

    /// Handle RETR: stream one message, dot-stuffed
    async fn handle_retr<W>(&mut self, args: &[String], out: &mut W) -> Result<CommandOutcome>
    where
        W: AsyncWrite + Unpin,
    {
        let Some(mailbox) = self.transaction_mailbox() else {
            return reject(out, response::BAD_SEQUENCE).await;
        };

        let [arg] = args else {
            return reject(out, response::SYNTAX_ERROR).await;
        };

        let ordinal = parse_ordinal(arg);
        let item = match mailbox.item(ordinal) {
            Some(item) if !item.is_deleted() => item,
            _ => return reject(out, response::NO_SUCH_MESSAGE).await,
        };

        let mut content = match self.store.open(mailbox, item).await {
            Ok(content) => content,
            Err(e) => {
                error!("Failed to open message {} for {}: {}", ordinal, mailbox.owner(), e);
                return reject(out, response::MESSAGE_UNREADABLE).await;
            }
        };

        debug!("Sending message {} ({} octets)", ordinal, item.size());
        response::ok(out, response::MESSAGE_FOLLOWS).await?;

        let mut line = Vec::new();
        loop {
            line.clear();
            // The status line is already out, so a read failure cannot be
            // reported to the client any more
            let n = content.read_until(b'\n', &mut line).await.map_err(|e| {
                Pop3Error::Storage(format!("Failed reading message {}: {}", ordinal, e))
            })?;
            if n == 0 {
                break;
            }
            out.write_all(&response::stuff_line(&line)).await?;
        }

        response::terminator(out).await?;
        Ok(CommandOutcome::Success)
    }

    /// Handle DELE: mark one message deleted
    async fn handle_dele<W>(&mut self, args: &[String], out: &mut W) -> Result<CommandOutcome>
    where
        W: AsyncWrite + Unpin,
    {
        let Some(mailbox) = self.transaction_mailbox_mut() else {
            return reject(out, response::BAD_SEQUENCE).await;
        };

        let [arg] = args else {
            return reject(out, response::SYNTAX_ERROR).await;
        };

        let ordinal = parse_ordinal(arg);
        if mailbox.delete(ordinal) {
            debug!("Message {} marked deleted", ordinal);
            accept(out, response::MESSAGE_DELETED).await
        } else {
            // Out of range and already deleted are reported alike
            reject(out, response::NO_SUCH_MESSAGE).await
        }
    }

    /// Handle RSET: clear every deletion mark
    async fn handle_rset<W>(&mut self, out: &mut W) -> Result<CommandOutcome>
    where
        W: AsyncWrite + Unpin,
    {
        let Some(mailbox) = self.transaction_mailbox_mut() else {
            return reject(out, response::BAD_SEQUENCE).await;
        };

        let restored = mailbox.undelete_all();
        accept(out, &format!("{} message(s) restored", restored)).await
    }

    /// Handle NOOP
    async fn handle_noop<W>(&mut self, out: &mut W) -> Result<CommandOutcome>
    where
        W: AsyncWrite + Unpin,
    {
        if self.transaction_mailbox().is_none() {
            return reject(out, response::BAD_SEQUENCE).await;
        }

        accept(out, response::NOOP).await
    }
}

async fn accept<W>(out: &mut W, text: &str) -> Result<CommandOutcome>
where
    W: AsyncWrite + Unpin,
{
    response::ok(out, text).await?;
    Ok(CommandOutcome::Success)
}

async fn reject<W>(out: &mut W, reason: &str) -> Result<CommandOutcome>
where
    W: AsyncWrite + Unpin,
{
    response::err(out, reason).await?;
    Ok(CommandOutcome::Rejected)
}
