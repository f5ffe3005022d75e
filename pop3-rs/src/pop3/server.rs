//! POP3 server implementation
//!
//! Accepts TCP connections and runs one independent session per connection

use crate::config::Config;
use crate::error::Result;
use crate::pop3::Pop3Session;
use crate::security::UserDirectory;
use crate::storage::MailboxStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

/// POP3 server
pub struct Pop3Server {
    config: Arc<Config>,
    hostname: String,
    directory: Arc<dyn UserDirectory>,
    store: Arc<dyn MailboxStore>,
}

impl Pop3Server {
    /// Create a new POP3 server
    pub fn new(
        config: Arc<Config>,
        directory: Arc<dyn UserDirectory>,
        store: Arc<dyn MailboxStore>,
    ) -> Self {
        let hostname = config.hostname();
        Self {
            config,
            hostname,
            directory,
            store,
        }
    }

    /// Bind the configured address and serve forever
    pub async fn run(&self) -> Result<()> {
        let addr = &self.config.pop3.listen_addr;
        let listener = TcpListener::bind(addr).await?;

        info!("POP3 server listening on {}", addr);
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    info!("New POP3 connection from {}", peer_addr);
                    let session = self.new_session();

                    tokio::spawn(async move {
                        handle_connection(session, stream, peer_addr).await;
                    });
                }
                Err(e) => {
                    error!("Failed to accept POP3 connection: {}", e);
                }
            }
        }
    }

    fn new_session(&self) -> Pop3Session {
        Pop3Session::new(
            self.hostname.clone(),
            Arc::clone(&self.directory),
            Arc::clone(&self.store),
        )
        .with_limits(self.config.pop3.max_line_length, self.config.command_timeout())
    }
}

/// Handle a single POP3 connection
async fn handle_connection(session: Pop3Session, stream: TcpStream, peer_addr: SocketAddr) {
    match session.handle(stream).await {
        Ok(()) => {}
        Err(e) if e.is_transport() => {
            warn!("POP3 connection from {} dropped: {}", peer_addr, e);
        }
        Err(e) => {
            error!("Error handling POP3 connection from {}: {}", peer_addr, e);
        }
    }

    info!("POP3 connection from {} closed", peer_addr);
}
