//! Record reconciliation against the router's static DNS table.
//!
//! One HTTP request maps to exactly one of the operations below; every
//! operation is a round trip (or two) into the router, which is the sole
//! persistent store. The reconciler holds the shared session behind a mutex
//! and keeps the lock for the whole lookup-then-mutate span, so concurrent
//! requests cannot interleave on one protocol connection.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::Result;
use crate::record::{DnsRecord, RecordChange};
use crate::traits::RouterSession;

/// Applies desired record state to the router's static DNS table.
///
/// Constructed once at startup with a connected session and handed to the
/// HTTP layer; cloning shares the same session.
#[derive(Clone)]
pub struct Reconciler {
    session: Arc<Mutex<Box<dyn RouterSession>>>,
}

impl Reconciler {
    /// Wrap a connected session
    pub fn new(session: Box<dyn RouterSession>) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
        }
    }

    /// Dispatch a validated change to the matching operation
    pub async fn apply(&self, change: RecordChange) -> Result<()> {
        match change {
            RecordChange::Create(record) => self.add_record(&record).await,
            RecordChange::Update(record) => self.update_record(&record).await,
            RecordChange::Delete { fqdn } => self.delete_record(&fqdn).await,
        }
    }

    /// Insert a new entry for the record.
    ///
    /// No existence check is performed: calling this for a name that already
    /// has an entry produces a duplicate. Use [`update_record`] for upsert
    /// semantics.
    ///
    /// [`update_record`]: Self::update_record
    pub async fn add_record(&self, record: &DnsRecord) -> Result<()> {
        let mut session = self.session.lock().await;
        session.add(record).await?;
        info!("added static DNS entry: {record}");
        Ok(())
    }

    /// Upsert: if an entry with the record's name exists, replace the first
    /// match's address in place (same item id); otherwise create one.
    pub async fn update_record(&self, record: &DnsRecord) -> Result<()> {
        let mut session = self.session.lock().await;
        match session.lookup(&record.fqdn).await? {
            Some(entry) => {
                session.set_address(&entry.id, record.address).await?;
                info!("updated static DNS entry {}: {record}", entry.id);
            }
            None => {
                session.add(record).await?;
                info!("created static DNS entry: {record}");
            }
        }
        Ok(())
    }

    /// Remove the first entry matching `fqdn`. Removing a name with no entry
    /// is a successful no-op.
    pub async fn delete_record(&self, fqdn: &str) -> Result<()> {
        let mut session = self.session.lock().await;
        match session.lookup(fqdn).await? {
            Some(entry) => {
                session.remove(&entry.id).await?;
                info!("deleted static DNS entry {}: {fqdn}", entry.id);
            }
            None => {
                debug!("no static DNS entry for {fqdn}, nothing to delete");
            }
        }
        Ok(())
    }

    /// Release the underlying session, called on daemon shutdown
    pub async fn close(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        session.close().await
    }
}
