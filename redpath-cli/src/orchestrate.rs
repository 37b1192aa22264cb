//! Orchestration glue: seed a GET of the service root with every
//! requested path, walk each JSON response through the matcher, and fan
//! wildcard hits out into follow-up fetches of the resolved collection
//! URIs. Plain scalar hits print as `path=value` on stdout.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use redpath_client::Client;
use redpath_core::{ConnectPolicy, Path, PathComponent, PropertyMatcher};
use std::cell::Cell;
use std::rc::Rc;

/// Destination and credentials for one Redfish endpoint.
pub struct HostConnect {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

/// Counts in-flight requests so the event loop runs to quiescence.
/// Every submitted request signals completion exactly once — its
/// callback fires whether transport succeeded or not.
struct Tracker {
    inflight: Cell<usize>,
    done_tx: async_channel::Sender<()>,
    done_rx: async_channel::Receiver<()>,
}

impl Tracker {
    fn new() -> Rc<Self> {
        let (done_tx, done_rx) = async_channel::unbounded();
        Rc::new(Self {
            inflight: Cell::new(0),
            done_tx,
            done_rx,
        })
    }

    fn begin(&self) {
        self.inflight.set(self.inflight.get() + 1);
    }

    fn finish(&self) {
        let _ = self.done_tx.try_send(());
    }

    async fn wait_idle(&self) {
        while self.inflight.get() > 0 {
            if self.done_rx.recv().await.is_err() {
                return;
            }
            self.inflight.set(self.inflight.get() - 1);
        }
    }
}

pub async fn run_get(policy: ConnectPolicy, host: HostConnect, paths: Vec<Path>) {
    let client = Client::new(policy);
    let host = Rc::new(host);
    let tracker = Tracker::new();

    fetch_paths(&client, &host, &tracker, "/redfish/v1", paths);
    tracker.wait_idle().await;
}

/// GET `uri` and hand the body to the matcher when it comes back.
fn fetch_paths(
    client: &Rc<Client>,
    host: &Rc<HostConnect>,
    tracker: &Rc<Tracker>,
    uri: &str,
    paths: Vec<Path>,
) {
    tracker.begin();
    let headers = auth_headers(&host.username, &host.password);
    let cb_client = Rc::clone(client);
    let cb_host = Rc::clone(host);
    let cb_tracker = Rc::clone(tracker);
    client.send_data(
        String::new(),
        &host.host,
        host.port,
        uri,
        &headers,
        http::Method::GET,
        move |response| {
            handle_response(&cb_client, &cb_host, &cb_tracker, paths, response);
            cb_tracker.finish();
        },
    );
}

fn handle_response(
    client: &Rc<Client>,
    host: &Rc<HostConnect>,
    tracker: &Rc<Tracker>,
    paths: Vec<Path>,
    response: redpath_client::Response,
) {
    tracing::debug!(
        status = response.status,
        bytes = response.body.len(),
        "Got response"
    );
    let content_type = response.header("content-type").unwrap_or("");
    if content_type != "application/json" && content_type != "application/json; charset=utf-8" {
        tracing::debug!(content_type, "Skipping non-JSON response");
        return;
    }

    let mut matcher = PropertyMatcher::new(paths);
    if let Err(e) = matcher.write(&response.body) {
        tracing::debug!(error = %e, "Matcher stopped early");
    }

    for matched in matcher.release() {
        match &matched.path.first {
            PathComponent::Filter(filter) if filter.key.is_empty() => {}
            PathComponent::Filter(filter) if filter.filter == '*' => {
                match matched.path.strip_parent() {
                    Some(parent) if !matched.value.is_empty() => {
                        tracing::debug!(next = %parent, uri = %matched.value, "Resolving collection");
                        fetch_paths(client, host, tracker, &matched.value, vec![parent]);
                    }
                    Some(_) => {
                        tracing::debug!(path = %matched.path, "Collection URI not found in response");
                    }
                    None => {
                        tracing::debug!(path = %matched.path, "Couldn't resolve parent");
                    }
                }
            }
            PathComponent::Filter(_) => {}
            PathComponent::Name(_) if !matched.value.is_empty() => {
                println!("{}={}", matched.path, matched.value);
            }
            PathComponent::Name(_) => {}
        }
    }
}

fn auth_headers(username: &str, password: &str) -> Vec<(String, String)> {
    if username.is_empty() {
        return Vec::new();
    }
    let credentials = BASE64.encode(format!("{username}:{password}"));
    vec![("authorization".to_string(), format!("Basic {credentials}"))]
}
