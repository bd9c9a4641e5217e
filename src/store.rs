use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;

use crate::error::FetchError;
use crate::models::{Device, LogEntry};

/// Outcome of the most recent completed fetch for one collection
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Pending,
    Ok,
    Failed(String),
}

impl FetchStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, FetchStatus::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Devices,
    Logs,
}

/// Issued when a fetch starts; carries the sequence number it completes under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub collection: Collection,
    pub seq: u64,
}

/// What happened to a completed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Collection replaced
    Replaced,
    /// Failure recorded, collection kept
    Failed,
    /// A newer response was already applied
    Stale,
    /// Store torn down, nothing written
    Discarded,
}

/// Everything the presentation layer reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub devices: Vec<Device>,
    pub logs: Vec<LogEntry>,
    pub selected_device: Option<Device>,
    pub loading: bool,
    pub devices_status: FetchStatus,
    pub logs_status: FetchStatus,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            logs: Vec::new(),
            selected_device: None,
            loading: true,
            devices_status: FetchStatus::Pending,
            logs_status: FetchStatus::Pending,
        }
    }
}

impl ViewState {
    /// Replaces the roster and re-resolves the selection against it.
    /// A selected device missing from the new roster is deselected.
    pub fn set_devices(&mut self, devices: Vec<Device>) {
        self.devices = devices;

        if let Some(selected) = self.selected_device.take() {
            self.selected_device = self
                .devices
                .iter()
                .find(|d| d.device_id == selected.device_id)
                .cloned();

            if self.selected_device.is_none() {
                log::info!("Selected device {} left the roster", selected.device_id);
            }
        }
    }

    pub fn set_logs(&mut self, logs: Vec<LogEntry>) {
        self.logs = logs;
    }

    /// Not validated against the current roster
    pub fn select_device(&mut self, device: Device) {
        self.selected_device = Some(device);
    }

    pub fn clear_selection(&mut self) {
        self.selected_device = None;
    }
}

#[derive(Debug, Default)]
struct Sequence {
    issued: u64,
    applied: u64,
}

#[derive(Debug)]
struct Shared {
    view: ViewState,
    devices_seq: Sequence,
    logs_seq: Sequence,
    active: bool,
}

impl Shared {
    fn sequence(&mut self, collection: Collection) -> &mut Sequence {
        match collection {
            Collection::Devices => &mut self.devices_seq,
            Collection::Logs => &mut self.logs_seq,
        }
    }
}

/// Cloneable handle to the view state shared by the poller and the renderer
#[derive(Clone, Debug)]
pub struct Store {
    shared: Arc<RwLock<Shared>>,
    revision: Arc<watch::Sender<u64>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            shared: Arc::new(RwLock::new(Shared {
                view: ViewState::default(),
                devices_seq: Sequence::default(),
                logs_seq: Sequence::default(),
                active: true,
            })),
            revision: Arc::new(revision),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Shared> {
        self.shared.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Shared> {
        self.shared.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    /// Receiver that changes every time the view state does
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn snapshot(&self) -> ViewState {
        self.read().view.clone()
    }

    pub fn is_active(&self) -> bool {
        self.read().active
    }

    /// Stops all further writes. In-flight fetches completing afterwards are discarded.
    pub fn teardown(&self) {
        let mut shared = self.write();
        if shared.active {
            shared.active = false;
            log::info!("View state torn down");
        }
    }

    /// Tag a fetch that is about to be issued. `None` once torn down.
    pub fn begin(&self, collection: Collection) -> Option<Ticket> {
        let mut shared = self.write();
        if !shared.active {
            return None;
        }
        let seq = shared.sequence(collection);
        seq.issued += 1;
        Some(Ticket {
            collection,
            seq: seq.issued,
        })
    }

    pub fn apply_devices(&self, ticket: Ticket, result: Result<Vec<Device>, FetchError>) -> Applied {
        let applied = {
            let mut shared = self.write();
            if !shared.active {
                log::debug!("Discarding devices response #{} after teardown", ticket.seq);
                return Applied::Discarded;
            }
            debug_assert_eq!(ticket.collection, Collection::Devices);

            // any device response ends the initial loading state
            shared.view.loading = false;
            let newer = ticket.seq > shared.devices_seq.applied;

            match result {
                Ok(devices) if newer => {
                    shared.devices_seq.applied = ticket.seq;
                    shared.view.set_devices(devices);
                    shared.view.devices_status = FetchStatus::Ok;
                    Applied::Replaced
                }
                Ok(_) => {
                    log::debug!(
                        "Discarding stale devices response #{} (have #{})",
                        ticket.seq,
                        shared.devices_seq.applied
                    );
                    Applied::Stale
                }
                Err(e) => {
                    if newer {
                        shared.view.devices_status = FetchStatus::Failed(e.to_string());
                    }
                    Applied::Failed
                }
            }
        };
        self.bump();
        applied
    }

    pub fn apply_logs(&self, ticket: Ticket, result: Result<Vec<LogEntry>, FetchError>) -> Applied {
        let applied = {
            let mut shared = self.write();
            if !shared.active {
                log::debug!("Discarding logs response #{} after teardown", ticket.seq);
                return Applied::Discarded;
            }
            debug_assert_eq!(ticket.collection, Collection::Logs);

            let newer = ticket.seq > shared.logs_seq.applied;

            match result {
                Ok(logs) if newer => {
                    shared.logs_seq.applied = ticket.seq;
                    shared.view.set_logs(logs);
                    shared.view.logs_status = FetchStatus::Ok;
                    Applied::Replaced
                }
                Ok(_) => {
                    log::debug!(
                        "Discarding stale logs response #{} (have #{})",
                        ticket.seq,
                        shared.logs_seq.applied
                    );
                    Applied::Stale
                }
                Err(e) => {
                    if newer {
                        shared.view.logs_status = FetchStatus::Failed(e.to_string());
                    }
                    Applied::Failed
                }
            }
        };
        self.bump();
        applied
    }

    pub fn select_device(&self, device: Device) {
        {
            let mut shared = self.write();
            if !shared.active {
                return;
            }
            shared.view.select_device(device);
        }
        self.bump();
    }

    /// Selects the roster entry with this id. Returns false if it is not in the roster.
    pub fn select_by_id(&self, device_id: &str) -> bool {
        let device = self
            .read()
            .view
            .devices
            .iter()
            .find(|d| d.device_id == device_id)
            .cloned();

        match device {
            Some(device) => {
                self.select_device(device);
                true
            }
            None => false,
        }
    }

    pub fn clear_selection(&self) {
        {
            let mut shared = self.write();
            if !shared.active {
                return;
            }
            shared.view.clear_selection();
        }
        self.bump();
    }
}
