//! Client façade: one lazily created pool per `scheme+host:port`
//! destination, sharing a single connect policy.

use crate::pool::ConnectionPool;
use crate::request::{HttpRequest, PendingRequest, Response};
use http::Method;
use redpath_core::ConnectPolicy;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub struct Client {
    pools: RefCell<HashMap<String, Rc<RefCell<ConnectionPool>>>>,
    policy: Rc<ConnectPolicy>,
}

impl Client {
    pub fn new(policy: ConnectPolicy) -> Rc<Self> {
        Rc::new(Self {
            pools: RefCell::new(HashMap::new()),
            policy: Rc::new(policy),
        })
    }

    pub fn policy(&self) -> &ConnectPolicy {
        &self.policy
    }

    /// Build and submit a request. The callback fires exactly once with
    /// the response — or with an empty `Response` if transport fails —
    /// for every request a connection takes off the channel.
    pub fn send_data(
        &self,
        data: String,
        host: &str,
        port: u16,
        uri: &str,
        headers: &[(String, String)],
        verb: Method,
        callback: impl FnOnce(Response) + 'static,
    ) {
        let mut all_headers = Vec::with_capacity(headers.len() + 2);
        all_headers.push(("host".to_string(), host.to_string()));
        all_headers.push(("connection".to_string(), "keep-alive".to_string()));
        all_headers.extend(headers.iter().cloned());

        let req = HttpRequest {
            method: verb,
            uri: uri.to_string(),
            headers: all_headers,
            body: data,
        };

        let pool = {
            let mut pools = self.pools.borrow_mut();
            let key = self.pool_key(host, port);
            Rc::clone(pools.entry(key).or_insert_with(|| {
                ConnectionPool::new(host.to_string(), port, Rc::clone(&self.policy))
            }))
        };
        ConnectionPool::queue_pending(
            &pool,
            PendingRequest {
                req,
                callback: Box::new(callback),
            },
        );
    }

    /// The pool serving a destination, if one exists yet.
    pub fn pool(&self, host: &str, port: u16) -> Option<Rc<RefCell<ConnectionPool>>> {
        self.pools.borrow().get(&self.pool_key(host, port)).cloned()
    }

    pub fn pool_count(&self) -> usize {
        self.pools.borrow().len()
    }

    fn pool_key(&self, host: &str, port: u16) -> String {
        format!("{}{}:{}", self.policy.scheme(), host, port)
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        // Cancel every channel first so connections and queued sends
        // wake; the pools themselves then drop as their tasks finish.
        for pool in self.pools.borrow().values() {
            pool.borrow().shutdown();
        }
    }
}
