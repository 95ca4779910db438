use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task;
use tracing::{info, warn};

use crate::executor::{CommandExecutor, SessionId};
use crate::protocol::parse_command;

/// One read is one command and one write is one reply; anything larger than
/// this silently truncates. There is no framing on the wire.
pub const BUFFER_SIZE: usize = 2048;

/// The connection multiplexer.
///
/// Runs on a current-thread runtime inside a `LocalSet`: every connection and
/// every store mutation happens on the same thread, so the executor needs no
/// locking. Each accepted connection gets the next session id and its own
/// task; a shared `watch` flag wakes everything for cooperative shutdown.
pub struct Server {
    host: String,
    port: u16,
    executor: Rc<RefCell<CommandExecutor>>,
}

impl Server {
    pub fn new(host: impl Into<String>, port: u16, executor: Rc<RefCell<CommandExecutor>>) -> Self {
        Self {
            host: host.into(),
            port,
            executor,
        }
    }

    /// Accepts connections until the shutdown flag flips. In-flight
    /// connections are not drained; their tasks observe the same flag and
    /// stop after their current command.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> io::Result<()> {
        let listener = TcpListener::bind((self.host.as_str(), self.port)).await?;
        info!("listening on {}:{}", self.host, self.port);

        let mut next_session: SessionId = 0;

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let session = next_session;
                            next_session += 1;
                            info!(session, %peer, "client connected");

                            let executor = Rc::clone(&self.executor);
                            let shutdown = shutdown.clone();
                            task::spawn_local(handle_client(stream, session, executor, shutdown));
                        }
                        Err(err) => warn!("accept failed: {err}"),
                    }
                }
            }
        }

        info!("server stopped");
        Ok(())
    }
}

/// Serves one connection until EOF, an I/O error, or shutdown. A failure here
/// is fatal to this connection only; the session's login state is dropped
/// with it.
async fn handle_client(
    mut stream: TcpStream,
    session: SessionId,
    executor: Rc<RefCell<CommandExecutor>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut buffer = [0u8; BUFFER_SIZE];

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            read = stream.read(&mut buffer) => {
                let received = match read {
                    Ok(0) => break,
                    Ok(received) => received,
                    Err(err) => {
                        warn!(session, "read failed: {err}");
                        break;
                    }
                };

                let input = String::from_utf8_lossy(&buffer[..received]);
                let input = input.trim();
                if input.is_empty() {
                    continue;
                }

                // execute never awaits, so the borrow is released before the
                // reply is written back.
                let reply = {
                    let mut executor = executor.borrow_mut();
                    executor.execute(session, &parse_command(input))
                };

                let bytes = reply.as_bytes();
                let len = bytes.len().min(BUFFER_SIZE);
                if let Err(err) = stream.write_all(&bytes[..len]).await {
                    warn!(session, "write failed: {err}");
                    break;
                }
            }
        }
    }

    executor.borrow_mut().drop_session(session);
    info!(session, "client disconnected");
}
