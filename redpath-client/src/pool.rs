//! Per-destination connection pool: up to four weakly held connections
//! fed through one bounded channel, with a FIFO overflow deque that
//! serializes channel pushes.

use crate::connection::Connection;
use crate::request::PendingRequest;
use async_channel::{Receiver, Sender};
use redpath_core::ConnectPolicy;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

/// Parallel connections a single management endpoint is assumed to
/// handle.
pub const MAX_POOL_SIZE: usize = 4;
/// Overflow requests held while a channel push is in flight; arrivals
/// beyond this are dropped (documented policy, logged at warn).
pub const MAX_REQUEST_QUEUE: usize = 50;
/// Pool → connection hand-off channel capacity.
pub const CHANNEL_CAPACITY: usize = 128;

pub struct ConnectionPool {
    host: String,
    port: u16,
    policy: Rc<ConnectPolicy>,
    connections: [Weak<Connection>; MAX_POOL_SIZE],
    overflow: VecDeque<PendingRequest>,
    push_in_progress: bool,
    sender: Sender<PendingRequest>,
    receiver: Receiver<PendingRequest>,
    next_conn_id: u32,
}

impl ConnectionPool {
    pub(crate) fn new(host: String, port: u16, policy: Rc<ConnectPolicy>) -> Rc<RefCell<Self>> {
        let (sender, receiver) = async_channel::bounded(CHANNEL_CAPACITY);
        Rc::new(RefCell::new(Self {
            host,
            port,
            policy,
            connections: std::array::from_fn(|_| Weak::new()),
            overflow: VecDeque::new(),
            push_in_progress: false,
            sender,
            receiver,
            next_conn_id: 0,
        }))
    }

    /// Submit a request. At most one channel send is outstanding at a
    /// time; surplus arrivals wait in the overflow deque (FIFO, capped)
    /// and are drained one by one as each send completes.
    pub(crate) fn queue_pending(pool: &Rc<RefCell<Self>>, pending: PendingRequest) {
        let mut inner = pool.borrow_mut();
        if inner.push_in_progress {
            if inner.overflow.len() >= MAX_REQUEST_QUEUE {
                tracing::warn!(host = %inner.host, port = inner.port, "Request queue full, dropping request");
                return;
            }
            inner.overflow.push_back(pending);
            return;
        }

        inner.ensure_connection();
        inner.push_in_progress = true;
        let sender = inner.sender.clone();
        drop(inner);

        let pool = Rc::clone(pool);
        monoio::spawn(async move {
            let mut next = Some(pending);
            while let Some(item) = next {
                if sender.send(item).await.is_err() {
                    // Channel cancelled by pool shutdown; this request
                    // and everything still queued are abandoned without
                    // a callback.
                    pool.borrow_mut().push_in_progress = false;
                    return;
                }
                next = pool.borrow_mut().take_next();
            }
        });
    }

    fn take_next(&mut self) -> Option<PendingRequest> {
        let item = self.overflow.pop_front();
        if item.is_none() {
            self.push_in_progress = false;
        }
        item
    }

    /// Fill the first expired slot with a fresh connection. One new
    /// connection per queued request keeps creation lazy under the cap:
    /// a busy pool grows only as fast as demand arrives.
    fn ensure_connection(&mut self) {
        for slot in &mut self.connections {
            if slot.strong_count() != 0 {
                continue;
            }
            self.next_conn_id += 1;
            let conn = Connection::new(
                self.host.clone(),
                self.port,
                self.next_conn_id,
                Rc::clone(&self.policy),
                self.receiver.clone(),
            );
            *slot = Rc::downgrade(&conn);
            tracing::debug!(host = %self.host, conn = self.next_conn_id, "Starting pool connection");
            monoio::spawn(conn.run());
            break;
        }
    }

    /// Connections whose tasks are still alive.
    pub fn live_connections(&self) -> usize {
        self.connections
            .iter()
            .filter(|slot| slot.strong_count() != 0)
            .count()
    }

    /// Requests currently parked in the overflow deque.
    pub fn queued(&self) -> usize {
        self.overflow.len()
    }

    /// Cancel the channel; idle connections wake with an error and shut
    /// their sockets down. Queued sends fail and are abandoned.
    pub fn shutdown(&self) {
        self.sender.close();
    }
}

impl Drop for ConnectionPool {
    fn drop(&mut self) {
        self.sender.close();
    }
}
