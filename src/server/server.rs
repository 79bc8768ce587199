//! TCP Server
//!
//! Accepts connections and runs each on its own thread. Requests from all
//! connections share two bounded pools: dispatch (waits under the timeout
//! policy) and invoke (runs business code).

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::pool::WorkerPool;

use super::connection::Connection;
use super::dispatch::Dispatcher;
use super::registry::ServiceRegistry;

/// How often the accept loop checks for shutdown
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// TCP server for netrpc
pub struct Server {
    config: ServerConfig,
    listener: TcpListener,
    registry: Arc<ServiceRegistry>,
    dispatcher: Arc<Dispatcher>,
    dispatch_pool: Arc<WorkerPool>,
    invoke_pool: Arc<WorkerPool>,
    shutdown: AtomicBool,

    /// Open connections, kept so shutdown can close them
    connections: Arc<Mutex<HashMap<u64, TcpStream>>>,
    next_connection_id: AtomicU64,
    active_connections: Arc<AtomicUsize>,
}

impl Server {
    /// Validate `config`, bind the listener and start the worker pools
    pub fn bind(config: ServerConfig, registry: Arc<ServiceRegistry>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;

        let dispatch_pool = Arc::new(WorkerPool::new(
            "netrpc-dispatch",
            config.worker_threads,
            config.worker_queue_capacity,
        )?);
        let invoke_pool = Arc::new(WorkerPool::new(
            "netrpc-invoke",
            config.worker_threads,
            config.worker_queue_capacity,
        )?);
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&invoke_pool),
            config.timeout_ms,
        ));

        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            config,
            listener,
            registry,
            dispatcher,
            dispatch_pool,
            invoke_pool,
            shutdown: AtomicBool::new(false),
            connections: Arc::new(Mutex::new(HashMap::new())),
            next_connection_id: AtomicU64::new(0),
            active_connections: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Address the listener is bound to (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Acquire)
    }

    /// Accept connections until `shutdown` is called (blocking)
    pub fn run(&self) -> Result<()> {
        while !self.shutdown.load(Ordering::Acquire) {
            match self.listener.accept() {
                Ok((stream, addr)) => self.accept(stream, addr),
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        tracing::info!("Shutting down server");
        for (_, stream) in self.connections.lock().drain() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        let grace = self.config.shutdown_timeout();
        for pool in [&self.dispatch_pool, &self.invoke_pool] {
            if let Err(e) = pool.shutdown(grace) {
                tracing::warn!("Server shutdown: {}", e);
            }
        }
        Ok(())
    }

    /// Signal the accept loop to stop
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    fn accept(&self, stream: TcpStream, addr: SocketAddr) {
        let open = self.active_connections.load(Ordering::Acquire);
        if open >= self.config.max_connections {
            tracing::warn!(
                "Refusing {}: {} connections open (max {})",
                addr,
                open,
                self.config.max_connections
            );
            let _ = stream.shutdown(Shutdown::Both);
            return;
        }

        if let Err(e) = self.spawn_connection(stream, addr) {
            tracing::warn!("Cannot serve {}: {}", addr, e);
        }
    }

    fn spawn_connection(&self, stream: TcpStream, addr: SocketAddr) -> Result<()> {
        // Accepted sockets may inherit the listener's non-blocking mode
        stream.set_nonblocking(false)?;

        let mut connection = Connection::new(
            stream.try_clone()?,
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.dispatch_pool),
            self.config.read_idle(),
            self.config.write_timeout(),
            self.config.max_frame_length,
        )?;

        let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        self.connections.lock().insert(id, stream);
        self.active_connections.fetch_add(1, Ordering::AcqRel);

        let connections = Arc::clone(&self.connections);
        let active = Arc::clone(&self.active_connections);
        let spawned = thread::Builder::new()
            .name(format!("netrpc-conn-{}", id))
            .spawn(move || {
                let _ = connection.handle();
                connections.lock().remove(&id);
                active.fetch_sub(1, Ordering::AcqRel);
            });

        if let Err(e) = spawned {
            self.connections.lock().remove(&id);
            self.active_connections.fetch_sub(1, Ordering::AcqRel);
            return Err(e.into());
        }

        tracing::debug!("Accepted {} as connection {}", addr, id);
        Ok(())
    }
}
