//! One TCP connection turned into a bidirectional message channel.
//!
//! A session pairs a receive worker and a transmit worker over two bounded
//! queues. Both workers block only on timeout-bounded operations so a stop
//! request is observed within one poll interval, and both clear the shared
//! running flag on any exit path so the owner can observe a dead session.

use crate::codec::{self, Decoded};
use crate::error::NetError;
use crate::message::Message;
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Capacity of the inbound and outbound queues. Overflow on either side
/// drops the newest message instead of blocking the producer.
pub const QUEUE_SIZE: usize = 10;

/// How long a worker blocks before re-checking the running flag.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

const READ_BUFFER_SIZE: usize = 4096;

/// A live connection: socket halves, paired workers and their queues.
///
/// [`Session::new`] only wires the queues; [`Session::start`] spawns the
/// workers. Messages written before `start` sit in the outbound queue and
/// flush once the transmit worker runs.
pub struct Session {
    reader: Option<OwnedReadHalf>,
    writer: Option<OwnedWriteHalf>,
    inbound: mpsc::Receiver<Message>,
    inbound_tx: Option<mpsc::Sender<Message>>,
    outbound: mpsc::Sender<Message>,
    outbound_rx: Option<mpsc::Receiver<Message>>,
    running: Arc<AtomicBool>,
    rx_task: Option<JoinHandle<()>>,
    tx_task: Option<JoinHandle<()>>,
}

impl Session {
    pub fn new(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        let (inbound_tx, inbound) = mpsc::channel(QUEUE_SIZE);
        let (outbound, outbound_rx) = mpsc::channel(QUEUE_SIZE);

        Self {
            reader: Some(reader),
            writer: Some(writer),
            inbound,
            inbound_tx: Some(inbound_tx),
            outbound,
            outbound_rx: Some(outbound_rx),
            running: Arc::new(AtomicBool::new(false)),
            rx_task: None,
            tx_task: None,
        }
    }

    /// Spawns the receive and transmit workers. Idempotent: a second call
    /// is a no-op.
    pub fn start(&mut self) {
        let (reader, writer) = match (self.reader.take(), self.writer.take()) {
            (Some(reader), Some(writer)) => (reader, writer),
            _ => return,
        };
        let inbound_tx = match self.inbound_tx.take() {
            Some(sender) => sender,
            None => return,
        };
        let outbound_rx = match self.outbound_rx.take() {
            Some(receiver) => receiver,
            None => return,
        };

        self.running.store(true, Ordering::SeqCst);
        self.rx_task = Some(tokio::spawn(receive_worker(
            reader,
            inbound_tx,
            Arc::clone(&self.running),
        )));
        self.tx_task = Some(tokio::spawn(transmit_worker(
            writer,
            outbound_rx,
            Arc::clone(&self.running),
        )));
    }

    /// Non-blocking enqueue onto the outbound queue. A full queue drops the
    /// message: lossy delivery is the overload policy, a slow consumer must
    /// never stall the producer.
    pub fn write(&self, message: Message) {
        match self.outbound.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(message)) => {
                debug!("outbound queue full, dropping {:?}", message.command);
            }
            Err(TrySendError::Closed(_)) => {
                debug!("write on a stopped session ignored");
            }
        }
    }

    /// Non-blocking dequeue from the inbound queue; `None` when empty.
    pub fn read(&mut self) -> Option<Message> {
        self.inbound.try_recv().ok()
    }

    /// Empties the inbound queue, preserving arrival order.
    pub fn drain(&mut self) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Some(message) = self.read() {
            messages.push(message);
        }
        messages
    }

    /// False once either worker has exited (stop, peer close or I/O error).
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Cooperative shutdown: clears the running flag and joins both
    /// workers. Each worker observes the flag within one poll interval, so
    /// no worker touches the socket after this returns.
    pub async fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(task) = self.rx_task.take() {
            let _ = task.await;
        }
        if let Some(task) = self.tx_task.take() {
            let _ = task.await;
        }
    }
}

/// Reads socket bytes, reassembles frames and queues decoded messages.
///
/// A corrupt header discards the whole reassembly buffer but keeps the
/// connection: one bad frame costs whatever undecoded bytes followed it.
async fn receive_worker(
    mut reader: OwnedReadHalf,
    inbound: mpsc::Sender<Message>,
    running: Arc<AtomicBool>,
) {
    let mut assembly: Vec<u8> = Vec::new();
    let mut chunk = [0u8; READ_BUFFER_SIZE];

    while running.load(Ordering::SeqCst) {
        match timeout(POLL_INTERVAL, reader.read(&mut chunk)).await {
            Err(_) => continue, // poll timeout, re-check the running flag
            Ok(Ok(0)) => {
                debug!("peer closed the connection");
                break;
            }
            Ok(Ok(n)) => {
                assembly.extend_from_slice(&chunk[..n]);
                if !drain_frames(&mut assembly, &inbound) {
                    mark_stopped(&running);
                    return;
                }
            }
            Ok(Err(e)) => {
                warn!("{}", NetError::ConnectionLost(e));
                break;
            }
        }
    }

    mark_stopped(&running);
}

/// Decodes every complete frame in `assembly` into the inbound queue.
/// Returns false when the queue's receiver is gone.
fn drain_frames(assembly: &mut Vec<u8>, inbound: &mpsc::Sender<Message>) -> bool {
    while !assembly.is_empty() {
        match codec::decode(assembly) {
            Decoded::Frame { message, consumed } => {
                assembly.drain(..consumed);
                match inbound.try_send(message) {
                    Ok(()) => {}
                    Err(TrySendError::Full(message)) => {
                        debug!("inbound queue full, dropping {:?}", message.command);
                    }
                    Err(TrySendError::Closed(_)) => return false,
                }
            }
            Decoded::Incomplete => break,
            Decoded::Corrupt(reason) => {
                let error = NetError::ProtocolCorruption(reason);
                warn!("{}, discarding {} buffered bytes", error, assembly.len());
                assembly.clear();
            }
        }
    }
    true
}

/// Dequeues outbound messages, encodes and writes them to the socket.
/// A write failure ends the worker without requeueing: at-most-once
/// delivery per message.
async fn transmit_worker(
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<Message>,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::SeqCst) {
        match timeout(POLL_INTERVAL, outbound.recv()).await {
            Err(_) => continue,
            Ok(None) => break, // session dropped
            Ok(Some(message)) => {
                let frame = codec::encode(&message);
                if let Err(e) = writer.write_all(frame.as_bytes()).await {
                    warn!("{} while transmitting", NetError::ConnectionLost(e));
                    break;
                }
            }
        }
    }

    mark_stopped(&running);
}

fn mark_stopped(running: &AtomicBool) {
    running.store(false, Ordering::SeqCst);
}
