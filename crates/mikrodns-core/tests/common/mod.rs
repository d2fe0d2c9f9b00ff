//! Test doubles for reconciliation contract tests.
//!
//! `MockRouterSession` keeps the static DNS table in memory and counts calls
//! so tests can assert both the end state and the exact operations issued.

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use mikrodns_core::error::{Error, Result};
use mikrodns_core::record::{DnsRecord, StaticDnsEntry};
use mikrodns_core::traits::RouterSession;

/// In-memory stand-in for the router's static DNS table
pub struct MockRouterSession {
    table: Arc<Mutex<Vec<StaticDnsEntry>>>,
    next_id: Arc<AtomicUsize>,
    lookup_calls: Arc<AtomicUsize>,
    add_calls: Arc<AtomicUsize>,
    set_calls: Arc<AtomicUsize>,
    remove_calls: Arc<AtomicUsize>,
    close_calls: Arc<AtomicUsize>,
    /// When set, the next mutating call fails with this error
    fail_next: Arc<Mutex<Option<Error>>>,
}

impl MockRouterSession {
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicUsize::new(1)),
            lookup_calls: Arc::new(AtomicUsize::new(0)),
            add_calls: Arc::new(AtomicUsize::new(0)),
            set_calls: Arc::new(AtomicUsize::new(0)),
            remove_calls: Arc::new(AtomicUsize::new(0)),
            close_calls: Arc::new(AtomicUsize::new(0)),
            fail_next: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a session sharing table and counters with an existing one,
    /// so the test keeps a handle after moving the original into the
    /// reconciler.
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            table: Arc::clone(&other.table),
            next_id: Arc::clone(&other.next_id),
            lookup_calls: Arc::clone(&other.lookup_calls),
            add_calls: Arc::clone(&other.add_calls),
            set_calls: Arc::clone(&other.set_calls),
            remove_calls: Arc::clone(&other.remove_calls),
            close_calls: Arc::clone(&other.close_calls),
            fail_next: Arc::clone(&other.fail_next),
        }
    }

    /// Seed the table with an entry, returning its id
    pub fn seed(&self, name: &str, address: &str) -> String {
        let id = format!("*{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.table.lock().unwrap().push(StaticDnsEntry {
            id: id.clone(),
            name: name.to_string(),
            address: address.to_string(),
        });
        id
    }

    /// Make the next mutating call fail with `error`
    pub fn fail_next(&self, error: Error) {
        *self.fail_next.lock().unwrap() = Some(error);
    }

    pub fn entries(&self) -> Vec<StaticDnsEntry> {
        self.table.lock().unwrap().clone()
    }

    pub fn entries_named(&self, name: &str) -> Vec<StaticDnsEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.name == name)
            .collect()
    }

    pub fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }

    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    pub fn remove_calls(&self) -> usize {
        self.remove_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> Option<Error> {
        self.fail_next.lock().unwrap().take()
    }
}

#[async_trait]
impl RouterSession for MockRouterSession {
    async fn lookup(&mut self, fqdn: &str) -> Result<Option<StaticDnsEntry>> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .table
            .lock()
            .unwrap()
            .iter()
            .find(|entry| entry.name == fqdn)
            .cloned())
    }

    async fn add(&mut self, record: &DnsRecord) -> Result<()> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        self.seed(&record.fqdn, &record.address.to_string());
        Ok(())
    }

    async fn set_address(&mut self, id: &str, address: IpAddr) -> Result<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        let mut table = self.table.lock().unwrap();
        match table.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.address = address.to_string();
                Ok(())
            }
            None => Err(Error::upstream("set", format!("no such item {id}"))),
        }
    }

    async fn remove(&mut self, id: &str) -> Result<()> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        let mut table = self.table.lock().unwrap();
        let before = table.len();
        table.retain(|entry| entry.id != id);
        if table.len() == before {
            return Err(Error::upstream("remove", format!("no such item {id}")));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
