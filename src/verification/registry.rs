use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    FlowSnapshot, ProcessingStage, ProgressSink, RunTicket, SelectedFile, SelectionError,
    UploadCandidate, VerificationBackend, VerificationFlow,
};

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("verification flow not found")]
    NotFound,
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

struct FlowEntry {
    owner: Uuid,
    flow: VerificationFlow,
    touched_at: DateTime<Utc>,
}

type FlowMap = Arc<RwLock<HashMap<Uuid, FlowEntry>>>;

/// Live flows one user may hold. Opening another evicts their least recently used.
pub const MAX_FLOWS_PER_OWNER: usize = 8;

/// Live verification flows, one per open verify page, each owned by the user who
/// opened it. Runs are driven on spawned tasks.
#[derive(Clone)]
pub struct FlowRegistry {
    flows: FlowMap,
    backend: Arc<dyn VerificationBackend>,
    storage_root: PathBuf,
}

impl FlowRegistry {
    pub fn new(backend: Arc<dyn VerificationBackend>, storage_root: impl Into<PathBuf>) -> Self {
        Self {
            flows: Arc::new(RwLock::new(HashMap::new())),
            backend,
            storage_root: storage_root.into(),
        }
    }

    /// Directory holding the uploads of one flow.
    pub fn flow_dir(&self, id: Uuid) -> PathBuf {
        self.storage_root.join(id.to_string())
    }

    pub async fn create(&self, owner: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        let evicted = {
            let mut flows = self.flows.write().await;
            let mut owned: Vec<(Uuid, DateTime<Utc>)> = flows
                .iter()
                .filter(|(_, entry)| entry.owner == owner)
                .map(|(id, entry)| (*id, entry.touched_at))
                .collect();

            let mut evicted = Vec::new();
            if owned.len() >= MAX_FLOWS_PER_OWNER {
                owned.sort_by_key(|(_, touched_at)| *touched_at);
                let excess = owned.len() + 1 - MAX_FLOWS_PER_OWNER;
                for (old, _) in owned.into_iter().take(excess) {
                    flows.remove(&old);
                    evicted.push(old);
                }
            }

            flows.insert(
                id,
                FlowEntry {
                    owner,
                    flow: VerificationFlow::new(),
                    touched_at: Utc::now(),
                },
            );
            evicted
        };

        if !evicted.is_empty() {
            info!(%owner, evicted = evicted.len(), "evicted least recently used verification flows");
        }
        for old in &evicted {
            remove_dir_quietly(&self.flow_dir(*old)).await;
        }
        id
    }

    pub async fn snapshot(&self, id: Uuid, owner: Uuid) -> Result<FlowSnapshot, FlowError> {
        let flows = self.flows.read().await;
        match flows.get(&id) {
            Some(entry) if entry.owner == owner => Ok(entry.flow.snapshot(id)),
            _ => Err(FlowError::NotFound),
        }
    }

    pub async fn ensure_owned(&self, id: Uuid, owner: Uuid) -> Result<(), FlowError> {
        self.snapshot(id, owner).await.map(|_| ())
    }

    /// Offers an uploaded file to the flow. A rejected file is deleted from disk, as is
    /// the candidate an accepted file replaces.
    pub async fn select_file(
        &self,
        id: Uuid,
        owner: Uuid,
        file: SelectedFile,
    ) -> Result<FlowSnapshot, FlowError> {
        let stored_path = file.stored_path.clone();
        let selection = {
            let mut flows = self.flows.write().await;
            match flows.get_mut(&id) {
                Some(entry) if entry.owner == owner => {
                    entry.touched_at = Utc::now();
                    entry
                        .flow
                        .select_file(file)
                        .map(|previous| (previous, entry.flow.snapshot(id)))
                        .map_err(FlowError::from)
                }
                _ => Err(FlowError::NotFound),
            }
        };

        match selection {
            Ok((previous, snapshot)) => {
                if let Some(previous) = previous.filter(|prev| prev.stored_path != stored_path) {
                    remove_file_quietly(&previous.stored_path).await;
                }
                Ok(snapshot)
            }
            Err(err) => {
                remove_file_quietly(&stored_path).await;
                Err(err)
            }
        }
    }

    /// Starts a run. Without a candidate, or while a run is going, this only returns the
    /// current snapshot.
    pub async fn start(&self, id: Uuid, owner: Uuid) -> Result<FlowSnapshot, FlowError> {
        let (snapshot, run) = {
            let mut flows = self.flows.write().await;
            let entry = match flows.get_mut(&id) {
                Some(entry) if entry.owner == owner => entry,
                _ => return Err(FlowError::NotFound),
            };
            entry.touched_at = Utc::now();
            let run = entry.flow.begin();
            (entry.flow.snapshot(id), run)
        };

        if let Some((ticket, candidate)) = run {
            info!(flow_id = %id, file = %candidate.name, "verification started");
            let registry = self.clone();
            tokio::spawn(async move {
                registry.drive(id, ticket, candidate).await;
            });
        }

        Ok(snapshot)
    }

    async fn drive(&self, id: Uuid, ticket: RunTicket, candidate: UploadCandidate) {
        let sink = FlowProgress {
            flows: self.flows.clone(),
            id,
            ticket,
        };
        let outcome = self.backend.verify(&candidate, &sink).await;

        let mut flows = self.flows.write().await;
        let Some(entry) = flows.get_mut(&id) else {
            return;
        };
        if entry.flow.finish(ticket, outcome) {
            entry.touched_at = Utc::now();
            info!(flow_id = %id, status = ?entry.flow.status(), "verification finished");
        }
    }

    /// Drops the flow and everything it stored.
    pub async fn discard(&self, id: Uuid, owner: Uuid) -> Result<(), FlowError> {
        {
            let mut flows = self.flows.write().await;
            match flows.get(&id) {
                Some(entry) if entry.owner == owner => {
                    flows.remove(&id);
                }
                _ => return Err(FlowError::NotFound),
            }
        }
        remove_dir_quietly(&self.flow_dir(id)).await;
        Ok(())
    }

    /// Removes flows untouched since `cutoff` that are not mid-run.
    pub async fn purge_idle(&self, cutoff: DateTime<Utc>) -> usize {
        let stale: Vec<Uuid> = {
            let mut flows = self.flows.write().await;
            let stale: Vec<Uuid> = flows
                .iter()
                .filter(|(_, entry)| entry.touched_at < cutoff && !entry.flow.is_in_flight())
                .map(|(id, _)| *id)
                .collect();
            for id in &stale {
                flows.remove(id);
            }
            stale
        };

        for id in &stale {
            remove_dir_quietly(&self.flow_dir(*id)).await;
        }
        stale.len()
    }

    pub async fn len(&self) -> usize {
        self.flows.read().await.len()
    }
}

struct FlowProgress {
    flows: FlowMap,
    id: Uuid,
    ticket: RunTicket,
}

#[async_trait]
impl ProgressSink for FlowProgress {
    async fn report(&self, stage: ProcessingStage) {
        let mut flows = self.flows.write().await;
        if let Some(entry) = flows.get_mut(&self.id) {
            if entry.flow.advance(self.ticket, stage) {
                entry.touched_at = Utc::now();
            }
        }
    }
}

async fn remove_file_quietly(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await {
        if err.kind() != ErrorKind::NotFound {
            warn!(?err, path = %path.display(), "failed to remove stored upload");
        }
    }
}

async fn remove_dir_quietly(path: &Path) {
    if let Err(err) = tokio::fs::remove_dir_all(path).await {
        if err.kind() != ErrorKind::NotFound {
            warn!(?err, path = %path.display(), "failed to remove flow storage");
        }
    }
}
