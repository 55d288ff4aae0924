//! Server network layer: the listener worker and the session multiplexer.
//!
//! The listener runs on its own task so a blocking accept never stalls
//! in-flight traffic. The slot pool is the one piece of state shared
//! between the listener and the dispatcher loop, guarded by a single lock;
//! everything else crosses threads as messages on the session queues.

use crate::pool::SlotPool;
use log::{info, warn};
use shared::message::BROADCAST;
use shared::payload;
use shared::session::POLL_INTERVAL;
use shared::{Command, Message, Session};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Accepts connections into the slot pool and multiplexes messages over
/// every claimed session.
pub struct NetServer {
    pool: Arc<RwLock<SlotPool>>,
    listener: Option<TcpListener>,
    listener_task: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    local_addr: SocketAddr,
}

impl NetServer {
    /// Binds the listening socket. This is the only fatal startup error:
    /// a server that cannot bind has nothing to serve.
    pub async fn bind(addr: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("server listening on {}", local_addr);

        Ok(Self {
            pool: Arc::new(RwLock::new(SlotPool::new())),
            listener: Some(listener),
            listener_task: None,
            running: Arc::new(AtomicBool::new(false)),
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Spawns the accept worker. Idempotent.
    pub fn start(&mut self) {
        let listener = match self.listener.take() {
            Some(listener) => listener,
            None => return,
        };

        self.running.store(true, Ordering::SeqCst);
        self.listener_task = Some(tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.pool),
            Arc::clone(&self.running),
        )));
    }

    /// Routes one message: broadcast when addressed to [`BROADCAST`],
    /// otherwise unicast to the destination slot (no-op on a FREE slot).
    pub async fn send(&self, message: Message) {
        let pool = self.pool.read().await;
        if message.destination == BROADCAST {
            for id in pool.claimed_ids() {
                if let Some(session) = pool.get(id) {
                    session.write(message.clone());
                }
            }
        } else if let Some(session) = pool.get(message.destination) {
            session.write(message);
        } else {
            warn!(
                "no session at slot {}, dropping {:?}",
                message.destination, message.command
            );
        }
    }

    /// Broadcast that skips one slot, used to relay a client's message to
    /// everyone but its origin.
    pub async fn send_to_all_but(&self, message: Message, excluded: u8) {
        let pool = self.pool.read().await;
        for id in pool.claimed_ids() {
            if id == excluded {
                continue;
            }
            if let Some(session) = pool.get(id) {
                session.write(message.clone());
            }
        }
    }

    /// Drains every claimed session's inbound queue, in slot order. FIFO
    /// holds within one session; ordering across sessions is arbitrary.
    pub async fn receive_all(&self) -> Vec<Message> {
        let mut pool = self.pool.write().await;
        let mut messages = Vec::new();
        for id in pool.claimed_ids() {
            if let Some(session) = pool.get_mut(id) {
                messages.append(&mut session.drain());
            }
        }
        messages
    }

    /// Reclaims slots whose sessions died from the socket side (peer
    /// vanished without a close message). Returns the freed ids so the
    /// dispatcher can treat them as implicit closes. Call after
    /// [`receive_all`](Self::receive_all) so queued messages are not lost.
    pub async fn sweep_dead(&self) -> Vec<u8> {
        let mut pool = self.pool.write().await;
        let dead: Vec<u8> = pool
            .claimed_ids()
            .into_iter()
            .filter(|id| pool.get(*id).is_some_and(|session| !session.is_running()))
            .collect();

        let mut freed = Vec::new();
        for id in dead {
            if let Some(mut session) = pool.release(id) {
                session.stop().await;
                info!("client {} connection lost, slot reclaimed", id);
                freed.push(id);
            }
        }
        freed
    }

    /// Stops one session and frees its slot for reuse.
    pub async fn close_session(&self, id: u8) {
        let released = self.pool.write().await.release(id);
        if let Some(mut session) = released {
            session.stop().await;
            info!("client {} disconnected, slot freed", id);
        }
    }

    pub async fn connected_ids(&self) -> Vec<u8> {
        self.pool.read().await.claimed_ids()
    }

    /// Stops the listener, then every live session.
    pub async fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(task) = self.listener_task.take() {
            let _ = task.await;
        }

        let sessions = self.pool.write().await.drain_all();
        for (id, mut session) in sessions {
            session.stop().await;
            info!("client {} disconnected on shutdown", id);
        }
        info!("server stopped");
    }
}

/// Accept worker: claims a slot per connection and tells the new client
/// its id, or refuses when the pool is full.
async fn accept_loop(
    listener: TcpListener,
    pool: Arc<RwLock<SlotPool>>,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::SeqCst) {
        match timeout(POLL_INTERVAL, listener.accept()).await {
            Err(_) => continue, // poll timeout, re-check the running flag
            Ok(Ok((stream, peer))) => {
                let mut pool = pool.write().await;
                if pool.is_full() {
                    // Dropping the socket is the refusal: the client never
                    // receives a session id.
                    warn!("refusing connection from {}: no free slot", peer);
                    continue;
                }

                let mut session = Session::new(stream);
                session.start();
                match pool.claim(session) {
                    Ok(id) => {
                        info!("client {} connected from {}", id, peer);
                        if let Some(session) = pool.get(id) {
                            session.write(Message::from_server(
                                Command::SessionId,
                                id,
                                payload::encode_slot_id(id),
                            ));
                        }
                    }
                    Err(e) => warn!("refusing connection from {}: {}", peer, e),
                }
            }
            Ok(Err(e)) => warn!("accept failed: {}", e),
        }
    }
}
