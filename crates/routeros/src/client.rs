//! TCP connection to a router's API service.

use std::collections::HashMap;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time;
use tracing::debug;

use crate::codec;
use crate::command::Command;
use crate::error::{Error, Result};
use crate::reply::{self, Reply, Response};

/// An authenticated-capable connection to the RouterOS API service,
/// which listens on TCP port 8728 by default.
///
/// Commands run one at a time; this client does not tag sentences for
/// interleaved commands. Every read and write is bounded by the timeout
/// given to [`Connection::connect`].
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    timeout: Duration,
    peer: String,
}

impl Connection {
    /// Open a TCP connection to `host:port`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the dial exceeds `timeout` and
    /// [`Error::Connect`] if the dial itself fails, for example when the
    /// API service is disabled on the router.
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let addr = format!("{host}:{port}");
        debug!(%addr, "connecting to RouterOS API");
        let stream = time::timeout(timeout, TcpStream::connect(addr.as_str()))
            .await
            .map_err(|_| Error::timeout("connect"))?
            .map_err(|source| Error::Connect {
                addr: addr.clone(),
                source,
            })?;
        Ok(Self {
            stream,
            timeout,
            peer: addr,
        })
    }

    /// The `host:port` this connection was dialed against.
    #[must_use]
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Authenticate with the plaintext login used since RouterOS 6.43.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LoginRejected`] when the router refuses the
    /// credentials and [`Error::LegacyLogin`] when it answers with a
    /// pre-6.43 MD5 challenge instead of accepting them.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        let command = Command::new("/login")
            .attr("name", username)
            .attr("password", password);
        let response = match self.send(&command).await {
            Ok(response) => response,
            Err(Error::Trap { message, .. }) => return Err(Error::LoginRejected { message }),
            Err(e) => return Err(e),
        };
        if response.ret().is_some() {
            return Err(Error::LegacyLogin);
        }
        debug!(peer = %self.peer, user = username, "authenticated");
        Ok(())
    }

    /// Send one command and collect every reply up to its `!done`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Trap`] if the router rejects the command,
    /// [`Error::Fatal`] if it terminates the connection, and transport
    /// errors for timeouts and broken streams.
    pub async fn send(&mut self, command: &Command) -> Result<Response> {
        debug!(peer = %self.peer, command = %command, "sending command");
        let frame = codec::encode_sentence(command.words())?;
        self.write_frame(&frame).await?;

        let mut response = Response::default();
        let mut trap: Option<Error> = None;
        loop {
            let words = match self.read_reply_sentence().await {
                Ok(words) => words,
                // Some releases drop the connection right after a trap
                // instead of finishing the exchange with !done.
                Err(Error::Io(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof && trap.is_some() =>
                {
                    break;
                }
                Err(e) => return Err(e),
            };
            if words.is_empty() {
                continue;
            }
            match reply::parse_reply(&words)? {
                Reply::Row(attrs) => response.rows.push(attrs),
                Reply::Done(attrs) => {
                    response.done = attrs;
                    break;
                }
                Reply::Trap { category, message } => {
                    trap = Some(Error::Trap { category, message });
                }
                Reply::Fatal(reason) => return Err(Error::Fatal(reason)),
            }
        }
        if let Some(trap) = trap {
            return Err(trap);
        }
        Ok(response)
    }

    /// Fetch the router's log as raw attribute maps via `/log/print`.
    ///
    /// Requires an account with `read` policy; routers answer with a
    /// permissions trap otherwise.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Connection::send`].
    pub async fn fetch_log(&mut self) -> Result<Vec<HashMap<String, String>>> {
        let response = self.send(&Command::new("/log/print")).await?;
        debug!(peer = %self.peer, rows = response.rows.len(), "fetched log");
        Ok(response.rows)
    }

    /// Shut the connection down cleanly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the shutdown handshake fails.
    pub async fn close(mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }

    async fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        time::timeout(self.timeout, self.stream.write_all(frame))
            .await
            .map_err(|_| Error::timeout("send command"))??;
        Ok(())
    }

    async fn read_reply_sentence(&mut self) -> Result<Vec<String>> {
        match time::timeout(self.timeout, codec::read_sentence(&mut self.stream)).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout("read reply")),
        }
    }
}
