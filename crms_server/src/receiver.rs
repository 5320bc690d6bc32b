use crms_common::codec::{WireCodec, try_read_frame, write_frame};
use crms_common::{Envelope, GatewayError, Reply, Result};
use crossbeam_channel::{Receiver, Sender, bounded, select};
use log::{debug, error, info, warn};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::handler::Dispatcher;
use crate::model::fixture::FixtureBook;
use crate::model::ledger::StoreLedger;

/// How long the accept loop waits for a stop signal between accept attempts.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Default time a connection may stay silent before it is closed.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// TCP gateway that accepts client connections and answers their envelopes.
///
/// Each accepted connection gets its own thread that reads frames one by one,
/// hands the decoded `Envelope` to the shared `Dispatcher` and writes the
/// `Reply` back using the codec the request arrived in.
pub struct GatewayServer {
    /// The underlying TCP listening socket.
    pub(crate) socket: TcpListener,
    dispatcher: Dispatcher,
    idle_timeout: Duration,
}

impl GatewayServer {
    /// Bind a new gateway to `bind_addr` (e.g., `0.0.0.0:7878`, or port 0 for an ephemeral port).
    pub fn bind(bind_addr: &str, book: FixtureBook) -> Result<Self> {
        let socket = TcpListener::bind(bind_addr)?;
        let dispatcher = Dispatcher::new(
            Arc::new(book),
            Arc::new(Mutex::new(StoreLedger::default())),
        );
        Ok(Self {
            socket,
            dispatcher,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        })
    }

    /// Close connections that stay silent for longer than `timeout`.
    ///
    /// `Duration::ZERO` disables the idle timeout.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Address the gateway listens on.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Ledger of accepted store commands.
    pub fn ledger(&self) -> Arc<Mutex<StoreLedger>> {
        self.dispatcher.ledger()
    }

    /// Run the accept loop on a background thread.
    pub fn spawn(self) -> Result<ServerHandle> {
        let local_addr = self.local_addr()?;
        let ledger = self.ledger();
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let join = thread::spawn(move || {
            if let Err(e) = self.accept_loop(stop_rx) {
                error!("Accept loop failed: {}", e);
            }
        });
        Ok(ServerHandle {
            local_addr,
            ledger,
            stop_tx,
            join: Some(join),
        })
    }

    /// Blocking loop that accepts TCP connections until a stop signal arrives.
    ///
    /// Failures of a single connection are logged and never stop the loop.
    pub fn accept_loop(self, stop_rx: Receiver<()>) -> Result<()> {
        self.socket.set_nonblocking(true)?;
        info!("Gateway is listening on {}", self.socket.local_addr()?);

        loop {
            match self.socket.accept() {
                Ok((stream, peer)) => {
                    debug!("client_tcp_addr: {:?}", &peer);
                    let dispatcher = self.dispatcher.clone();
                    let idle_timeout = self.idle_timeout;
                    thread::spawn(move || {
                        if let Err(e) = handle_connection(stream, peer, dispatcher, idle_timeout) {
                            error!("Connection {} ended with error: {}", peer, e);
                        }
                    });
                    continue;
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {}
                Err(e) => error!("TCP connection error: {}", e),
            }

            select! {
                recv(stop_rx) -> _ => break,
                default(ACCEPT_POLL_INTERVAL) => {}
            }
        }
        info!("Gateway on {} stopped accepting connections", self.socket.local_addr()?);
        Ok(())
    }
}

/// Serve one client connection until it closes or goes idle.
pub fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    dispatcher: Dispatcher,
    idle_timeout: Duration,
) -> Result<()> {
    stream.set_nonblocking(false)?;
    // A zero timeout is rejected by the socket; treat it as "never idle out".
    stream.set_read_timeout((!idle_timeout.is_zero()).then_some(idle_timeout))?;
    stream.set_nodelay(true)?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = BufWriter::new(stream);

    loop {
        let frame = match try_read_frame::<_, Envelope>(&mut reader) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!("Client {} closed the connection", peer);
                return Ok(());
            }
            Err(GatewayError::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                info!("Client {} idle, closing connection", peer);
                return Ok(());
            }
            Err(e @ (GatewayError::SerdeJson(_)
            | GatewayError::BincodeDecode(_)
            | GatewayError::Protocol(_)
            | GatewayError::FrameTooLarge { .. })) => {
                warn!("Undecodable request from {}: {}", peer, e);
                let reply = Reply::Rejected {
                    reason: e.to_string(),
                };
                write_frame(&mut writer, WireCodec::Json, &reply)?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let (codec, envelope) = frame;
        info!("Received {} from {}", envelope.request.kind(), peer);
        let reply = dispatcher.handle(envelope)?;
        write_frame(&mut writer, codec, &reply)?;
    }
}

/// Running gateway started by [`GatewayServer::spawn`].
pub struct ServerHandle {
    local_addr: SocketAddr,
    ledger: Arc<Mutex<StoreLedger>>,
    stop_tx: Sender<()>,
    join: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// Address the gateway listens on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Ledger of accepted store commands.
    pub fn ledger(&self) -> Arc<Mutex<StoreLedger>> {
        Arc::clone(&self.ledger)
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    ///
    /// Connections already being served finish on their own.
    pub fn shutdown(mut self) {
        self.stop();
    }

    /// Sender that stops the accept loop, for use from signal handlers.
    pub fn stop_signal(&self) -> Sender<()> {
        self.stop_tx.clone()
    }

    /// Block until the accept loop exits.
    pub fn wait(mut self) {
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                error!("Accept loop thread panicked");
            }
        }
    }

    fn stop(&mut self) {
        let _ = self.stop_tx.try_send(());
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                error!("Accept loop thread panicked");
            }
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
