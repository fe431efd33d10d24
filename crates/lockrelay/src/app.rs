//! The `App`: server context and the single-writer control loop.
//!
//! One `App` owns the whole server: the world (sessions + rooms), the
//! dispatcher, and the transport. The transport reader task only
//! enqueues datagrams onto a channel; every piece of mutable state is
//! touched by the control loop alone, so there is no locking anywhere
//! in the message path.
//!
//! One loop iteration, in order: reclaim ended rooms, wake on inbound
//! traffic / the eviction timer / the fixed step, run the variable-rate
//! update, flush the outbound queue to the transport, observe the
//! shutdown flag.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lockrelay_protocol::{HeartbeatAck, Opcode, Packet};
use lockrelay_room::{RoomConfig, RoomLogic};
use lockrelay_session::SessionConfig;
use lockrelay_transport::{Datagram, Transport, UdpTransport};
use tokio::sync::{mpsc, watch};

use crate::handlers;
use crate::{
    Dispatcher, FixedStep, FixedStepConfig, HandlerId, LockrelayError, World,
};

// ---------------------------------------------------------------------------
// Configuration and builder
// ---------------------------------------------------------------------------

/// Top-level server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the UDP transport binds to.
    pub bind_addr: String,
    /// Lockstep tick interval. Default: 100 ms.
    pub fixed_delta: Duration,
    /// First-tick jitter passed to the scheduler.
    pub initial_jitter_us: u64,
    /// How often the coarse session-eviction sweep runs. Default: 60 s.
    pub eviction_interval: Duration,
    /// Session liveness settings.
    pub session: SessionConfig,
    /// Template for every room.
    pub room: RoomConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9000".to_string(),
            fixed_delta: Duration::from_millis(100),
            initial_jitter_us: 2_000,
            eviction_interval: Duration::from_secs(60),
            session: SessionConfig::default(),
            room: RoomConfig::default(),
        }
    }
}

/// Builder for configuring and starting an [`App`].
///
/// # Example
///
/// ```rust,ignore
/// let app = AppBuilder::new()
///     .bind("0.0.0.0:9000")
///     .fixed_delta(Duration::from_millis(100))
///     .startup::<LockstepLogic>()
///     .await?;
/// app.run().await
/// ```
pub struct AppBuilder {
    config: AppConfig,
}

impl AppBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the lockstep tick interval.
    pub fn fixed_delta(mut self, delta: Duration) -> Self {
        self.config.fixed_delta = delta;
        self
    }

    /// Sets the session-eviction sweep interval.
    pub fn eviction_interval(mut self, interval: Duration) -> Self {
        self.config.eviction_interval = interval;
        self
    }

    /// Sets the session liveness configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    /// Sets the room template configuration.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    /// Binds the UDP transport and assembles the server.
    pub async fn startup<L: RoomLogic>(
        self,
    ) -> Result<App<L, UdpTransport>, LockrelayError> {
        let transport = UdpTransport::bind(&self.config.bind_addr).await?;
        Ok(self.with_transport(transport))
    }

    /// Assembles the server on an already-built transport. Used by
    /// tests to run the full stack over the loopback transport.
    ///
    /// Must be called inside a tokio runtime; the transport reader task
    /// is spawned here.
    pub fn with_transport<L: RoomLogic, T: Transport>(self, transport: T) -> App<L, T> {
        let transport = Arc::new(transport);
        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        let (outbound_tx, outbound) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shutdown_tx = Arc::new(shutdown_tx);

        let mut world = World::new(self.config.session.clone(), self.config.room.clone());
        world.sessions.set_outbound(outbound_tx);

        let mut dispatcher = Dispatcher::new();
        handlers::register_builtin(&mut dispatcher);

        spawn_reader(Arc::clone(&transport), inbound_tx, shutdown_tx.subscribe());

        App {
            config: self.config,
            world,
            dispatcher,
            transport,
            inbound,
            outbound,
            shutdown_tx,
            shutdown_rx,
        }
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The reader task: moves datagrams from the transport onto the
/// inbound channel and nothing else.
fn spawn_reader<T: Transport>(
    transport: Arc<T>,
    inbound: mpsc::UnboundedSender<Datagram>,
    mut shutdown: watch::Receiver<bool>,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
                result = transport.recv_from() => match result {
                    Ok(datagram) => {
                        if inbound.send(datagram).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "transport receive failed, reader stopping");
                        break;
                    }
                },
            }
        }
        tracing::debug!("transport reader stopped");
    });
}

// ---------------------------------------------------------------------------
// Shutdown
// ---------------------------------------------------------------------------

/// Requests a cooperative shutdown of a running [`App`].
///
/// Cheap to clone and safe to trigger from any task or signal handler;
/// the control loop observes the flag within one iteration.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Flags the server to stop.
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// A fully assembled server, ready to [`run`](Self::run).
pub struct App<L: RoomLogic, T: Transport> {
    config: AppConfig,
    world: World<L>,
    dispatcher: Dispatcher<L>,
    transport: Arc<T>,
    inbound: mpsc::UnboundedReceiver<Datagram>,
    outbound: mpsc::UnboundedReceiver<(SocketAddr, Vec<u8>)>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl<L: RoomLogic, T: Transport> App<L, T> {
    /// Creates a new builder.
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    /// The server's state, for handler setup and tests.
    pub fn world(&self) -> &World<L> {
        &self.world
    }

    /// Mutable variant of [`world`](Self::world).
    pub fn world_mut(&mut self) -> &mut World<L> {
        &mut self.world
    }

    /// Subscribes an extra handler alongside the built-in ones.
    pub fn subscribe<F>(&mut self, opcode: Opcode, handler: F) -> HandlerId
    where
        F: FnMut(&mut World<L>, lockrelay_session::SessionId, &Packet) + Send + 'static,
    {
        self.dispatcher.subscribe(opcode, handler)
    }

    /// Removes a previously subscribed handler.
    pub fn unsubscribe(&mut self, id: HandlerId) -> bool {
        self.dispatcher.unsubscribe(id)
    }

    /// A handle that stops the server from anywhere.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
        }
    }

    /// Runs the control loop until shutdown is requested.
    pub async fn run(mut self) -> Result<(), LockrelayError> {
        tracing::info!(
            fixed_delta_ms = self.config.fixed_delta.as_millis() as u64,
            "server running"
        );
        let mut step = FixedStep::new(FixedStepConfig {
            fixed_delta: self.config.fixed_delta,
            initial_jitter_us: self.config.initial_jitter_us,
        });
        let mut eviction = tokio::time::interval_at(
            tokio::time::Instant::now() + self.config.eviction_interval,
            self.config.eviction_interval,
        );
        let mut last_update = Instant::now();

        loop {
            // Rooms that ended last iteration were observable through
            // it; now their slots go back to the pool.
            self.world.rooms.reap();

            tokio::select! {
                biased;
                _ = self.shutdown_rx.changed() => {}
                maybe = self.inbound.recv() => {
                    match maybe {
                        Some(datagram) => {
                            self.handle_datagram(datagram);
                            // Drain whatever else arrived, non-blocking.
                            while let Ok(d) = self.inbound.try_recv() {
                                self.handle_datagram(d);
                            }
                        }
                        None => break,
                    }
                }
                _ = eviction.tick() => self.evict(),
                _ = step.wait() => {
                    self.world.rooms.fixed_update_all(&mut self.world.sessions);
                }
            }

            let now = Instant::now();
            self.world
                .rooms
                .update_all(&mut self.world.sessions, now - last_update);
            last_update = now;

            self.flush_outbound().await;

            if *self.shutdown_rx.borrow() {
                break;
            }
        }

        self.drain_shutdown().await;
        Ok(())
    }

    /// Decodes one datagram and routes it.
    ///
    /// Heartbeats are answered here, before dispatch: liveness must
    /// keep working no matter what handlers are subscribed.
    fn handle_datagram(&mut self, datagram: Datagram) {
        let session_id = self.world.sessions.resolve(datagram.peer);
        let packet = match Packet::decode(&datagram.bytes) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::warn!(
                    peer = %datagram.peer,
                    error = %e,
                    "undecodable datagram dropped"
                );
                return;
            }
        };

        if packet.opcode == Opcode::Heartbeat {
            let window = self.world.sessions.config().heartbeat_window;
            if let Some(session) = self.world.sessions.get_mut(session_id) {
                session.refresh_heartbeat(window);
                session.send(Packet::message(&HeartbeatAck).encode());
            }
            return;
        }

        self.dispatcher.dispatch(&mut self.world, session_id, &packet);
    }

    /// One eviction sweep: timed-out sessions leave their rooms through
    /// the normal flow, then disappear.
    fn evict(&mut self) {
        let now = Instant::now();
        for id in self.world.sessions.scan_timeouts(now) {
            let room_id = self.world.sessions.get(id).and_then(|s| s.room);
            if let Some(room_id) = room_id {
                if let Some(room) = self.world.rooms.get_mut(room_id) {
                    let _ = room.leave(&mut self.world.sessions, id);
                }
            }
            self.world.sessions.remove(id);
        }
    }

    /// Pushes everything queued this iteration to the transport, in
    /// queue order.
    async fn flush_outbound(&mut self) {
        while let Ok((peer, bytes)) = self.outbound.try_recv() {
            if let Err(e) = self.transport.send_to(peer, &bytes).await {
                tracing::warn!(%peer, error = %e, "outbound send failed");
            }
        }
    }

    /// Deterministic teardown: queued messages out, then rooms,
    /// sessions, and subscriptions dropped, then the reader released.
    async fn drain_shutdown(mut self) {
        tracing::info!(
            sessions = self.world.sessions.len(),
            rooms = self.world.rooms.len(),
            "shutting down"
        );
        self.flush_outbound().await;
        self.world.rooms.clear();
        self.world.sessions.clear();
        self.dispatcher.clear();
        // Wake the reader task so it can observe the flag and exit.
        let _ = self.shutdown_tx.send(true);
    }
}
