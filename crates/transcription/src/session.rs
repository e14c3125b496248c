use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tempfile::TempDir;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::SpeakerTurn;
use crate::diarization::distinct_speakers;

/// Cached diarization result awaiting its transcription pass.
///
/// Owns the scratch directory holding the uploaded media; the directory is
/// removed when the last handle to the session is dropped.
#[derive(Debug)]
pub struct DiarizationSession {
    id: Uuid,
    pub filename: String,
    pub speakers: Vec<String>,
    pub turns: Vec<SpeakerTurn>,
    pub created_at: DateTime<Utc>,
    media_path: PathBuf,
    created: Instant,
    workspace: TempDir,
}

impl DiarizationSession {
    pub fn new(
        filename: impl Into<String>,
        turns: Vec<SpeakerTurn>,
        media_path: PathBuf,
        workspace: TempDir,
    ) -> Self {
        Self {
            id: Uuid::nil(),
            filename: filename.into(),
            speakers: distinct_speakers(&turns),
            turns,
            created_at: Utc::now(),
            media_path,
            created: Instant::now(),
            workspace,
        }
    }

    /// Identifier assigned by [`SessionStore::put`]; nil before that.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn media_path(&self) -> &Path {
        &self.media_path
    }

    pub fn workspace_path(&self) -> &Path {
        self.workspace.path()
    }

    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created) > ttl
    }
}

/// Time-boxed, in-memory cache of diarization sessions.
///
/// A single lock serialises every operation on the key space, so a lookup
/// can never interleave with the release of the same entry.
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Arc<DiarizationSession>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stores `session` under a freshly allocated identifier.
    pub fn put(&self, mut session: DiarizationSession) -> Uuid {
        let id = Uuid::new_v4();
        session.id = id;
        let speakers = session.speakers.len();
        self.sessions.lock().insert(id, Arc::new(session));
        info!(%id, speakers, "Diarization session stored");
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<DiarizationSession>> {
        self.sessions.lock().get(id).cloned()
    }

    /// Removes the session under the lock and hands it to the caller, who
    /// becomes its only consumer. Pair with [`SessionStore::release`].
    pub fn take(&self, id: &Uuid) -> Option<Arc<DiarizationSession>> {
        let taken = self.sessions.lock().remove(id);
        if taken.is_some() {
            debug!(%id, "Diarization session taken");
        }
        taken
    }

    /// Releases a session obtained from [`SessionStore::take`].
    pub fn release(&self, session: Arc<DiarizationSession>) {
        release(session);
    }

    /// Evicts the session and releases its scratch directory. Returns false
    /// when the session was already gone.
    pub fn consume_and_release(&self, id: &Uuid) -> bool {
        let removed = self.sessions.lock().remove(id);
        match removed {
            Some(session) => {
                debug!(%id, "Diarization session consumed");
                release(session);
                true
            }
            None => false,
        }
    }

    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    /// Evicts every session older than the TTL as of `now`.
    pub fn sweep_expired_at(&self, now: Instant) -> usize {
        let expired: Vec<Arc<DiarizationSession>> = {
            let mut sessions = self.sessions.lock();
            let ids: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, s)| s.is_expired(now, self.ttl))
                .map(|(id, _)| *id)
                .collect();
            ids.iter().filter_map(|id| sessions.remove(id)).collect()
        };

        let count = expired.len();
        for session in expired {
            info!(id = %session.id, "Diarization session expired");
            release(session);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Releases every session. Used on shutdown.
    pub fn clear(&self) -> usize {
        let drained: Vec<Arc<DiarizationSession>> =
            self.sessions.lock().drain().map(|(_, s)| s).collect();
        let count = drained.len();
        drained.into_iter().for_each(release);
        count
    }
}

/// Removes the scratch directory now if nobody else holds the session,
/// otherwise when the last holder drops it.
fn release(session: Arc<DiarizationSession>) {
    match Arc::try_unwrap(session) {
        Ok(session) => {
            let id = session.id;
            if let Err(e) = session.workspace.close() {
                warn!(%id, %e, "Failed to remove session workspace");
            }
        }
        Err(shared) => {
            debug!(id = %shared.id, "Session still in use, workspace released on last drop");
        }
    }
}
