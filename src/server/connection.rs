//! Connection Handler
//!
//! Runs the per-connection pipeline: framer, codec, dispatch.
//!
//! - Reads with a timeout equal to the read-idle interval; a timeout means
//!   the peer stopped sending (heartbeats included) and the connection is
//!   closed.
//! - Heartbeats are consumed here and never dispatched.
//! - Requests run on the dispatch pool; replies go through a shared,
//!   mutex-guarded writer, so they may leave out of order.
//! - Every reply write is bounded by the write timeout. A write that times
//!   out or fails shuts the socket down, so a peer that stops reading costs
//!   at most one timeout per worker and never stalls other connections.
//! - Any decode failure closes the connection.

use std::io::{BufWriter, ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{Result, RpcError};
use crate::pool::WorkerPool;
use crate::protocol::{
    decode, encode_response, FrameBuffer, Message, Request, Response, ResponseBody, Status,
};

use super::dispatch::{error_response, Dispatcher};

/// Read buffer size
const READ_CHUNK: usize = 8 * 1024;

/// Serializes replies onto one socket
#[derive(Clone)]
pub struct ResponseWriter {
    inner: Arc<Mutex<BufWriter<TcpStream>>>,
    peer_addr: Arc<str>,
}

impl ResponseWriter {
    fn new(stream: TcpStream, peer_addr: &str) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BufWriter::new(stream))),
            peer_addr: Arc::from(peer_addr),
        }
    }

    /// Encode and write a response
    ///
    /// A body that can't be encoded is replaced by a BAD_RESPONSE carrying
    /// the encoder's error.
    pub fn send(&self, response: &Response) -> Result<()> {
        let frame = match encode_response(response) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("Cannot encode response {}: {}", response.id(), e);
                let fallback = Response::new(
                    response.header.with_status(Status::BadResponse),
                    ResponseBody::error(e.to_string(), None),
                );
                encode_response(&fallback)?
            }
        };

        let mut writer = self.inner.lock();
        if let Err(e) = writer.write_all(&frame).and_then(|_| writer.flush()) {
            // Part of a frame may be on the wire; the stream can't be resynced
            let _ = writer.get_ref().shutdown(Shutdown::Both);
            return Err(e.into());
        }
        Ok(())
    }

    /// Send and log failures; used where nobody can act on the error
    fn send_logged(&self, response: &Response) {
        if let Err(e) = self.send(response) {
            match e {
                RpcError::Io(ref io)
                    if matches!(
                        io.kind(),
                        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
                    ) =>
                {
                    tracing::debug!(
                        "Client {} disconnected before response {} could be sent",
                        self.peer_addr,
                        response.id()
                    );
                }
                RpcError::Io(ref io)
                    if matches!(io.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    tracing::warn!(
                        "Client {} stopped reading, dropped response {} and closed",
                        self.peer_addr,
                        response.id()
                    );
                }
                e => tracing::warn!("Error writing to {}: {}", self.peer_addr, e),
            }
        }
    }
}

/// Handles a single client connection
pub struct Connection {
    stream: TcpStream,
    writer: ResponseWriter,
    framer: FrameBuffer,
    dispatcher: Arc<Dispatcher>,
    dispatch_pool: Arc<WorkerPool>,
    read_idle: Duration,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(
        stream: TcpStream,
        dispatcher: Arc<Dispatcher>,
        dispatch_pool: Arc<WorkerPool>,
        read_idle: Duration,
        write_timeout: Duration,
        max_frame_length: usize,
    ) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(read_idle))?;
        stream.set_write_timeout(Some(write_timeout))?;

        let writer = ResponseWriter::new(stream.try_clone()?, &peer_addr);

        Ok(Self {
            stream,
            writer,
            framer: FrameBuffer::new(max_frame_length),
            dispatcher,
            dispatch_pool,
            read_idle,
            peer_addr,
        })
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Returns `Ok` when the peer disconnects or goes idle, `Err` when the
    /// stream carried something that isn't a valid frame.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);
        let result = self.read_loop();
        let _ = self.stream.shutdown(Shutdown::Both);

        match &result {
            Ok(()) => tracing::debug!("Connection from {} closed", self.peer_addr),
            Err(e) if e.is_frame_fatal() => {
                tracing::warn!("Closing {} after bad frame: {}", self.peer_addr, e)
            }
            Err(e) => tracing::warn!("Connection from {} failed: {}", self.peer_addr, e),
        }
        result
    }

    fn read_loop(&mut self) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            let n = match self.stream.read(&mut chunk) {
                Ok(0) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Ok(n) => n,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(ref e)
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    // WouldBlock on Unix, TimedOut on Windows
                    tracing::info!(
                        "No heartbeat from {} for {:?}, closing",
                        self.peer_addr,
                        self.read_idle
                    );
                    return Ok(());
                }
                Err(ref e)
                    if matches!(
                        e.kind(),
                        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
                    ) =>
                {
                    tracing::debug!("Connection reset by client {}", self.peer_addr);
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            for frame in self.framer.push(&chunk[..n])? {
                match decode(&frame)? {
                    Message::Request(request) if request.is_heartbeat() => {
                        tracing::trace!("Heartbeat {} from {}", request.id(), self.peer_addr);
                    }
                    Message::Request(request) => self.dispatch(request),
                    Message::Response(response) => {
                        tracing::warn!(
                            "Ignoring response {} sent by client {}",
                            response.id(),
                            self.peer_addr
                        );
                    }
                }
            }
        }
    }

    fn dispatch(&self, request: Request) {
        tracing::trace!(
            "Request {} from {}: {}.{}",
            request.id(),
            self.peer_addr,
            request.body.interface_name,
            request.body.method_name
        );

        let header = request.header;
        let dispatcher = Arc::clone(&self.dispatcher);
        let writer = self.writer.clone();

        let submitted = self.dispatch_pool.try_submit(move || {
            if let Some(response) = dispatcher.handle(request) {
                writer.send_logged(&response);
            }
        });

        if let Err(e) = submitted {
            tracing::warn!("Rejecting {} from {}: {}", header.id(), self.peer_addr, e);
            if header.response_required() {
                let status = match e {
                    RpcError::PoolExhausted(_) => Status::ServerThreadpoolExhausted,
                    _ => Status::ServerError,
                };
                // Written inline; the socket write timeout bounds the wait
                let response = error_response(&header, status, e.to_string());
                self.writer.send_logged(&response);
            }
        }
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
