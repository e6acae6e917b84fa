// HTTP polling of the board state endpoint
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use protocol::{ProtocolError, Snapshot};
use thiserror::Error;
use tracing::{debug, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::Response;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("No window")]
    NoWindow,

    #[error("Request failed: {0}")]
    Js(String),

    #[error("Server answered {0}")]
    Status(u16),

    #[error("Response body is not text")]
    NotText,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl From<JsValue> for FetchError {
    fn from(value: JsValue) -> Self {
        FetchError::Js(format!("{:?}", value))
    }
}

/// Shared flags deciding whether a fetch may be issued. `server_closed`
/// latches: once set it is never cleared.
#[derive(Debug, Default)]
pub struct PollGate {
    ready: Cell<bool>,
    server_closed: Cell<bool>,
}

impl PollGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.set(ready);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.get()
    }

    pub fn close(&self) {
        self.server_closed.set(true);
    }

    pub fn is_closed(&self) -> bool {
        self.server_closed.get()
    }

    /// Manual steps only need an open server.
    pub fn allows_manual(&self) -> bool {
        !self.is_closed()
    }

    /// The continuous timer also needs the ready flag.
    pub fn allows_continuous(&self) -> bool {
        self.is_ready() && !self.is_closed()
    }
}

/// Issues fetches and hands the decoded snapshots to the frame loop through
/// `inbox`. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Poller {
    url: Rc<str>,
    interval_ms: i32,
    gate: Rc<PollGate>,
    inbox: Rc<RefCell<Vec<Snapshot>>>,
    interval: Rc<Cell<Option<i32>>>,
}

impl Poller {
    pub fn new(url: &str, interval_ms: i32) -> Self {
        Self {
            url: Rc::from(url),
            interval_ms,
            gate: Rc::new(PollGate::new()),
            inbox: Rc::new(RefCell::new(Vec::new())),
            interval: Rc::new(Cell::new(None)),
        }
    }

    pub fn gate(&self) -> &PollGate {
        &self.gate
    }

    /// Snapshots received since the last drain, in arrival order.
    pub fn drain(&self) -> Vec<Snapshot> {
        self.inbox.borrow_mut().drain(..).collect()
    }

    /// Start one asynchronous fetch. Returns false when the server is closed.
    pub fn fetch(&self) -> bool {
        if !self.gate.allows_manual() {
            return false;
        }
        let url = self.url.clone();
        let gate = self.gate.clone();
        let inbox = self.inbox.clone();
        wasm_bindgen_futures::spawn_local(async move {
            match fetch_snapshot(&url).await {
                Ok(snapshot) => {
                    debug!(droplets = snapshot.len(), "snapshot received");
                    inbox.borrow_mut().push(snapshot);
                }
                Err(e) => {
                    if !gate.is_closed() {
                        warn!("server closed: {}", e);
                    }
                    gate.close();
                }
            }
        });
        true
    }

    /// Toggle continuous mode. Turning it on starts a fixed-period timer
    /// that fetches until the mode is turned off or the server closes, at
    /// which point the timer clears itself.
    pub fn set_ready(&self, ready: bool) -> Result<(), JsValue> {
        self.gate.set_ready(ready);
        if ready {
            self.run_continuous()?;
        }
        Ok(())
    }

    fn run_continuous(&self) -> Result<(), JsValue> {
        if self.interval.get().is_some() || !self.gate.allows_continuous() {
            return Ok(());
        }
        let window = web_sys::window().ok_or("No window")?;

        let poller = self.clone();
        let closure = Closure::wrap(Box::new(move || {
            if !poller.gate.allows_continuous() {
                if let (Some(handle), Some(window)) = (poller.interval.take(), web_sys::window()) {
                    window.clear_interval_with_handle(handle);
                    info!("continuous polling stopped");
                }
                return;
            }
            poller.fetch();
        }) as Box<dyn FnMut()>);

        let handle = window.set_interval_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            self.interval_ms,
        )?;
        closure.forget();
        self.interval.set(Some(handle));
        info!(interval_ms = self.interval_ms, "continuous polling started");
        Ok(())
    }
}

/// GET the state endpoint and decode the body.
pub async fn fetch_snapshot(url: &str) -> Result<Snapshot, FetchError> {
    let window = web_sys::window().ok_or(FetchError::NoWindow)?;
    let response: Response = JsFuture::from(window.fetch_with_str(url)).await?.dyn_into()?;
    if !response.ok() {
        return Err(FetchError::Status(response.status()));
    }
    let text = JsFuture::from(response.text()?).await?;
    let body = text.as_string().ok_or(FetchError::NotText)?;
    Ok(Snapshot::from_json(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_defaults() {
        let gate = PollGate::new();
        assert!(gate.allows_manual());
        assert!(!gate.allows_continuous());
        gate.set_ready(true);
        assert!(gate.allows_continuous());
    }

    #[test]
    fn test_closed_latches_for_every_path() {
        let gate = PollGate::new();
        gate.set_ready(true);
        gate.close();
        assert!(!gate.allows_manual());
        assert!(!gate.allows_continuous());

        gate.set_ready(false);
        gate.set_ready(true);
        assert!(gate.is_closed());
        assert!(!gate.allows_continuous());
    }

    #[test]
    fn test_fetch_is_noop_once_closed() {
        let poller = Poller::new("/state", 500);
        poller.gate().close();
        assert!(!poller.fetch());
        assert!(poller.drain().is_empty());
    }

    #[test]
    fn test_status_error_message() {
        assert_eq!(FetchError::Status(410).to_string(), "Server answered 410");
    }
}
