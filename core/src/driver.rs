//! In-process executor for store loads.
//!
//! `StoreDriver` pairs a `PictureStore` with a `Transport` and runs each
//! ticket on its own worker thread, so commands return immediately and the
//! outcome reaches observers when the request finishes. In-flight loads are
//! never cancelled; the store's sequence check drops any that finish late.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::client::ApodClient;
use crate::config::ApodConfig;
use crate::date::{CalendarDate, SystemClock};
use crate::error::SelectError;
use crate::store::{LoadTicket, PictureStore};
use crate::transport::{Transport, UreqTransport};

#[derive(Clone)]
pub struct StoreDriver {
    store: Arc<PictureStore>,
    transport: Arc<dyn Transport>,
}

impl StoreDriver {
    /// Wrap `store` and immediately start loading today's picture.
    pub fn start(
        store: Arc<PictureStore>,
        transport: Arc<dyn Transport>,
    ) -> (Self, JoinHandle<()>) {
        let driver = Self { store, transport };
        let initial = driver.load_today();
        (driver, initial)
    }

    /// Live store on the system clock talking to the configured endpoint.
    pub fn from_config(config: &ApodConfig) -> (Self, JoinHandle<()>) {
        let store = PictureStore::new(ApodClient::from_config(config), Arc::new(SystemClock));
        Self::start(Arc::new(store), Arc::new(UreqTransport::new()))
    }

    pub fn store(&self) -> &Arc<PictureStore> {
        &self.store
    }

    pub fn load_today(&self) -> JoinHandle<()> {
        let ticket = self.store.begin_load_today();
        self.run(ticket)
    }

    pub fn retry(&self) -> JoinHandle<()> {
        let ticket = self.store.begin_retry();
        self.run(ticket)
    }

    /// `Ok(None)` when `date` is already selected and nothing was started.
    pub fn select_date(&self, date: CalendarDate) -> Result<Option<JoinHandle<()>>, SelectError> {
        Ok(self.store.begin_select_date(date)?.map(|ticket| self.run(ticket)))
    }

    fn run(&self, ticket: LoadTicket) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let transport = Arc::clone(&self.transport);
        thread::spawn(move || {
            let outcome = transport.execute(ticket.request());
            store.complete_load(ticket, outcome);
        })
    }
}
