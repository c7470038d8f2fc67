//! Monitor translating PC/SC status changes into lifecycle events
//!
//! One background thread watches the PC/SC stack with
//! `get_status_change` and feeds the single ordered event queue:
//! reader arrivals and departures become attach/detach events, card
//! presence flips become card-state events. De-duplication against
//! the last seen state keeps wakeups without a real change silent.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use pcsc::{Context, ReaderState, Scope, State};
use tapcard_core::event::{CardState, DeviceId, Event, EventSender};
use tracing::{debug, warn};

use crate::error::PcscError;

/// Poll timeout for one status-change wait
const STATUS_TIMEOUT: Duration = Duration::from_secs(1);

/// Map a reported reader state onto the card presence model
fn presence_from(event_state: State) -> CardState {
    if event_state.contains(State::PRESENT) {
        CardState::Present
    } else if event_state.contains(State::EMPTY) {
        CardState::Absent
    } else {
        CardState::Unknown
    }
}

/// Monitor for reader and card events
pub struct PcscMonitor {
    /// PC/SC context
    context: Context,
    /// Whether the monitor thread should keep running
    running: Arc<AtomicBool>,
}

impl fmt::Debug for PcscMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscMonitor")
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl PcscMonitor {
    /// Create a monitor with a dedicated context
    pub fn create() -> Result<Self, PcscError> {
        let context = Context::establish(Scope::User)?;
        Ok(Self {
            context,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Start watching, sending events onto the given queue
    ///
    /// Returns immediately; the watch runs on a background thread
    /// until [`stop`](Self::stop) is called or every receiver of the
    /// queue is gone.
    pub fn watch(&self, events: EventSender) {
        let context = self.context.clone();
        let running = Arc::clone(&self.running);
        running.store(true, Ordering::SeqCst);

        thread::spawn(move || {
            // Last seen card state per reader name.
            let mut known: HashMap<String, CardState> = HashMap::new();
            // Wait list handed to get_status_change. Kept across
            // iterations so the current state reflects the last
            // observed state and the wait actually blocks until a
            // change or the timeout; rebuilding it unaware every pass
            // would make the wait return immediately.
            let mut reader_states: Vec<ReaderState> = Vec::new();
            let mut watched: Vec<String> = Vec::new();
            let pnp_name = pcsc::PNP_NOTIFICATION().to_string_lossy().into_owned();

            while running.load(Ordering::SeqCst) {
                let current_names: Vec<String> = match context.list_readers_owned() {
                    Ok(readers) => readers
                        .iter()
                        .map(|r| r.to_string_lossy().into_owned())
                        .collect(),
                    Err(pcsc::Error::NoReadersAvailable) => Vec::new(),
                    Err(e) => {
                        warn!(error = %e, "listing readers failed");
                        thread::sleep(STATUS_TIMEOUT);
                        continue;
                    }
                };

                // Reader arrivals and departures.
                for name in &current_names {
                    if !known.contains_key(name) {
                        known.insert(name.clone(), CardState::Unknown);
                        if events.send(Event::Attached(DeviceId::new(name.clone()))).is_err() {
                            return;
                        }
                    }
                }
                let departed: Vec<String> = known
                    .keys()
                    .filter(|name| !current_names.contains(name))
                    .cloned()
                    .collect();
                for name in departed {
                    known.remove(&name);
                    if events.send(Event::Detached(DeviceId::new(name))).is_err() {
                        return;
                    }
                }

                if current_names.is_empty() {
                    watched.clear();
                    reader_states.clear();
                    thread::sleep(STATUS_TIMEOUT);
                    continue;
                }

                // Rebuild the wait list only when the reader set
                // changed. Fresh entries start unaware, so the next
                // wait reports their actual state right away.
                if current_names != watched {
                    reader_states =
                        vec![ReaderState::new(pcsc::PNP_NOTIFICATION(), State::UNAWARE)];
                    for name in &current_names {
                        match std::ffi::CString::new(name.clone()) {
                            Ok(cname) => {
                                reader_states.push(ReaderState::new(cname, State::UNAWARE));
                            }
                            Err(_) => continue,
                        }
                    }
                    watched = current_names;
                }

                match context.get_status_change(Some(STATUS_TIMEOUT), &mut reader_states) {
                    Ok(()) => {}
                    Err(pcsc::Error::Timeout) => continue,
                    Err(e) => {
                        warn!(error = %e, "status wait failed");
                        thread::sleep(STATUS_TIMEOUT);
                        continue;
                    }
                }

                for rs in &mut reader_states {
                    let name = rs.name().to_string_lossy().into_owned();
                    if name != pnp_name {
                        let current = presence_from(rs.event_state());
                        let previous = known.get(&name).copied().unwrap_or(CardState::Unknown);
                        if previous != current {
                            debug!(reader = %name, %previous, %current, "card state changed");
                            known.insert(name, current);
                            if events.send(Event::CardState { previous, current }).is_err() {
                                return;
                            }
                        }
                    }
                    // Acknowledge the reported state so the next wait
                    // blocks until something really changes.
                    rs.sync_current_state();
                }
            }
            debug!("monitor thread stopped");
        });
    }

    /// Stop the watch thread
    ///
    /// The thread notices within one poll interval.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}
