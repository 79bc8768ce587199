//! Client runtime
//!
//! Owns one TCP connection to a server.
//!
//! ## Threads
//! - reader: framer + codec, hands each response to the resolve pool
//! - writer: drains the outbound queue; after `write_idle` with nothing to
//!   send it writes a heartbeat
//! - resolve pool: settles correlation table entries off the I/O thread
//!
//! When the connection dies the reader first closes the outbound queue, then
//! wakes every pending call with VOID. A request either made it into the
//! queue before the sweep (and is woken by it) or fails to enqueue and is
//! abandoned by its sender, so no caller is left waiting.

use std::io::{BufWriter, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::Bytes;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::config::ClientConfig;
use crate::error::{Result, RpcError};
use crate::pool::WorkerPool;
use crate::protocol::{decode, encode_request, FrameBuffer, Message, ObjectId, Request};
use crate::serialize::Serialization;
use crate::service::heartbeat_request;

use super::correlation::{CorrelationTable, PendingHandle};

/// Jobs queued on the resolve pool before the reader blocks
const RESOLVE_QUEUE_CAPACITY: usize = 1024;

/// Read buffer size
const READ_CHUNK: usize = 8 * 1024;

/// Longest the reader waits for queued resolves before failing leftovers
const RESOLVE_DRAIN_LIMIT: Duration = Duration::from_millis(500);

/// A connection to one server
pub struct RpcClient {
    config: ClientConfig,
    peer: SocketAddr,

    /// Kept for shutting the socket down from `close`
    stream: TcpStream,

    table: Arc<CorrelationTable>,

    /// Outbound frame queue; `None` once closed or lost
    outbound: Arc<Mutex<Option<Sender<Bytes>>>>,

    active: Arc<AtomicBool>,
    closed: AtomicBool,
    heartbeats_sent: Arc<AtomicU64>,

    pool: Arc<WorkerPool>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl RpcClient {
    /// Connect to the server named in `config` and start the I/O threads
    pub fn connect(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let peer = config.resolve()?;

        let stream = TcpStream::connect_timeout(&peer, config.connect_timeout())?;
        stream.set_nodelay(true)?;

        tracing::debug!("Connected to {}", peer);

        let table = Arc::new(CorrelationTable::new());
        let active = Arc::new(AtomicBool::new(true));
        let heartbeats_sent = Arc::new(AtomicU64::new(0));
        let pool = Arc::new(WorkerPool::new(
            "netrpc-resolve",
            config.worker_threads,
            RESOLVE_QUEUE_CAPACITY,
        )?);
        let (sender, receiver) = channel::unbounded::<Bytes>();
        let outbound = Arc::new(Mutex::new(Some(sender)));

        let reader = {
            let stream = stream.try_clone()?;
            let table = Arc::clone(&table);
            let pool = Arc::clone(&pool);
            let outbound = Arc::clone(&outbound);
            let active = Arc::clone(&active);
            let max_frame_length = config.max_frame_length;
            thread::Builder::new()
                .name("netrpc-client-reader".into())
                .spawn(move || {
                    read_loop(stream, max_frame_length, table, pool, outbound, active, peer)
                })?
        };

        let writer = {
            let stream = stream.try_clone()?;
            let active = Arc::clone(&active);
            let heartbeats_sent = Arc::clone(&heartbeats_sent);
            let idle = config.write_idle();
            let serialization = config.serialization;
            thread::Builder::new()
                .name("netrpc-client-writer".into())
                .spawn(move || {
                    write_loop(stream, receiver, idle, serialization, active, heartbeats_sent, peer)
                })?
        };

        Ok(Self {
            config,
            peer,
            stream,
            table,
            outbound,
            active,
            closed: AtomicBool::new(false),
            heartbeats_sent,
            pool,
            threads: Mutex::new(vec![reader, writer]),
        })
    }

    /// Send a request and register a handle for its response
    ///
    /// Fails without registering anything if the channel is inactive.
    pub fn send_request(&self, request: Request) -> Result<Arc<PendingHandle>> {
        self.ensure_active()?;
        let id = request.id();
        let frame = encode_request(&request)?;

        let handle = self.table.register(id)?;
        if let Err(e) = self.enqueue(frame) {
            self.table.abandon(&id);
            self.table.release(&id);
            return Err(e);
        }

        tracing::trace!(
            "Sent request {} {}.{}",
            id,
            request.body.interface_name,
            request.body.method_name
        );
        Ok(handle)
    }

    /// Send a request that expects no reply
    pub fn send_oneway(&self, request: Request) -> Result<()> {
        self.ensure_active()?;
        let frame = encode_request(&request)?;
        self.enqueue(frame)
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(RpcError::ChannelInactive(self.peer.to_string()))
        }
    }

    fn enqueue(&self, frame: Bytes) -> Result<()> {
        let outbound = self.outbound.lock();
        let sender = outbound
            .as_ref()
            .ok_or_else(|| RpcError::ChannelInactive(self.peer.to_string()))?;
        sender
            .send(frame)
            .map_err(|_| RpcError::ChannelInactive(self.peer.to_string()))
    }

    /// Stop waiting for `id`
    pub fn abandon(&self, id: &ObjectId) {
        self.table.abandon(id);
    }

    /// Drop the table entry for `id` after its result was consumed
    pub fn release(&self, id: &ObjectId) {
        self.table.release(id);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Calls still waiting for a response
    pub fn pending_count(&self) -> usize {
        self.table.len()
    }

    pub fn heartbeats_sent(&self) -> u64 {
        self.heartbeats_sent.load(Ordering::Relaxed)
    }

    /// Close the socket and stop the runtime
    ///
    /// Shutdown problems are logged, not returned. Calling this twice is a
    /// no-op.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!("Closing connection to {}", self.peer);

        self.active.store(false, Ordering::Release);
        drop(self.outbound.lock().take());
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            if e.kind() != ErrorKind::NotConnected {
                tracing::warn!("Error shutting down socket to {}: {}", self.peer, e);
            }
        }

        for handle in self.threads.lock().drain(..) {
            if handle.join().is_err() {
                tracing::warn!("Client I/O thread for {} panicked", self.peer);
            }
        }

        if let Err(e) = self.pool.shutdown(self.config.shutdown_timeout()) {
            tracing::warn!("Client shutdown for {}: {}", self.peer, e);
        }
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        self.close();
    }
}

// =============================================================================
// I/O loops
// =============================================================================

fn read_loop(
    mut stream: TcpStream,
    max_frame_length: usize,
    table: Arc<CorrelationTable>,
    pool: Arc<WorkerPool>,
    outbound: Arc<Mutex<Option<Sender<Bytes>>>>,
    active: Arc<AtomicBool>,
    peer: SocketAddr,
) {
    let mut framer = FrameBuffer::new(max_frame_length);
    let mut chunk = [0u8; READ_CHUNK];
    let in_flight = Arc::new(AtomicUsize::new(0));

    'read: loop {
        let n = match stream.read(&mut chunk) {
            Ok(0) => {
                tracing::debug!("Server {} closed the connection", peer);
                break;
            }
            Ok(n) => n,
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::debug!("Read from {} failed: {}", peer, e);
                break;
            }
        };

        let frames = match framer.push(&chunk[..n]) {
            Ok(frames) => frames,
            Err(e) => {
                tracing::warn!("Dropping connection to {}: {}", peer, e);
                break;
            }
        };

        for frame in frames {
            match decode(&frame) {
                Ok(Message::Response(response)) => {
                    let table = Arc::clone(&table);
                    let counter = Arc::clone(&in_flight);
                    counter.fetch_add(1, Ordering::AcqRel);
                    let submitted = pool.submit(move || {
                        table.resolve(response);
                        counter.fetch_sub(1, Ordering::AcqRel);
                    });
                    if let Err(e) = submitted {
                        in_flight.fetch_sub(1, Ordering::AcqRel);
                        tracing::warn!("Cannot resolve response from {}: {}", peer, e);
                    }
                }
                Ok(Message::Request(request)) => {
                    tracing::warn!("Ignoring request {} sent by server {}", request.id(), peer);
                }
                Err(e) => {
                    tracing::warn!("Dropping connection to {}: {}", peer, e);
                    break 'read;
                }
            }
        }
    }

    active.store(false, Ordering::Release);
    // Requests registered after this point fail to enqueue
    drop(outbound.lock().take());
    let _ = stream.shutdown(Shutdown::Both);

    // Let responses already read settle their calls first
    let deadline = Instant::now() + RESOLVE_DRAIN_LIMIT;
    while in_flight.load(Ordering::Acquire) > 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }

    let woken = table.abandon_all();
    if woken > 0 {
        tracing::warn!("Connection to {} lost with {} calls pending", peer, woken);
    }
}

fn write_loop(
    stream: TcpStream,
    outbound: Receiver<Bytes>,
    write_idle: Duration,
    serialization: Serialization,
    active: Arc<AtomicBool>,
    heartbeats_sent: Arc<AtomicU64>,
    peer: SocketAddr,
) {
    let mut writer = BufWriter::new(stream);

    loop {
        let frame = match outbound.recv_timeout(write_idle) {
            Ok(frame) => frame,
            Err(RecvTimeoutError::Timeout) => {
                let heartbeat = heartbeat_request(serialization);
                match encode_request(&heartbeat) {
                    Ok(frame) => {
                        tracing::debug!("Write idle on {}, sending heartbeat {}", peer, heartbeat.id());
                        heartbeats_sent.fetch_add(1, Ordering::Relaxed);
                        frame
                    }
                    Err(e) => {
                        tracing::warn!("Cannot encode heartbeat for {}: {}", peer, e);
                        continue;
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        };

        if let Err(e) = writer.write_all(&frame).and_then(|_| writer.flush()) {
            tracing::warn!("Write to {} failed: {}", peer, e);
            break;
        }
    }

    active.store(false, Ordering::Release);
    let _ = writer.get_ref().shutdown(Shutdown::Both);
}
