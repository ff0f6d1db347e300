//! Per-session stream accumulators
//!
//! Each logical audio stream (one microphone, one client) owns its own
//! [`StreamAccumulator`], looked up by a caller-chosen session id. The
//! registry handles:
//!
//! - Creation on first use
//! - Explicit reset (clear audio, keep the session) and removal
//! - Eviction of sessions idle longer than the configured timeout
//! - An optional cap on live sessions
//!
//! The map lock is held only for lookups. Each accumulator sits behind its
//! own mutex, so pushes to one session are serialized while different
//! sessions proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::{SessionConfig, StreamConfig};
use crate::error::GenreError;

use super::accumulator::StreamAccumulator;

/// Shared handle to one session's accumulator
pub type SessionHandle = Arc<Mutex<StreamAccumulator>>;

#[derive(Debug)]
struct SessionEntry {
    accumulator: SessionHandle,
    last_seen: Instant,
}

/// Map from session id to its stream accumulator
#[derive(Debug)]
pub struct SessionRegistry {
    stream_config: StreamConfig,
    session_config: SessionConfig,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionRegistry {
    /// Create an empty registry
    ///
    /// # Errors
    ///
    /// Returns `GenreError::InvalidInput` if either configuration is invalid.
    pub fn new(
        stream_config: StreamConfig,
        session_config: SessionConfig,
    ) -> Result<Self, GenreError> {
        stream_config.validate()?;
        session_config.validate()?;
        Ok(Self {
            stream_config,
            session_config,
            sessions: Mutex::new(HashMap::new()),
        })
    }

    /// Stream configuration given to every new accumulator
    pub fn stream_config(&self) -> &StreamConfig {
        &self.stream_config
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// True when no session is live
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// True if `id` is live
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.lock().contains_key(id)
    }

    /// Get the accumulator for `id`, creating it if needed
    ///
    /// Marks the session as active. Idle sessions are evicted first.
    ///
    /// # Errors
    ///
    /// Returns `GenreError::SessionLimit` if `id` is new and the registry is
    /// at `max_sessions` after eviction.
    pub fn get_or_create(&self, id: &str) -> Result<SessionHandle, GenreError> {
        self.get_or_create_at(id, Instant::now())
    }

    /// [`get_or_create`](Self::get_or_create) with an explicit clock reading
    pub fn get_or_create_at(&self, id: &str, now: Instant) -> Result<SessionHandle, GenreError> {
        let mut sessions = self.sessions.lock();
        Self::evict_idle_locked(&mut sessions, now, self.session_config.idle_timeout());

        if let Some(entry) = sessions.get_mut(id) {
            entry.last_seen = now;
            return Ok(Arc::clone(&entry.accumulator));
        }

        if let Some(max) = self.session_config.max_sessions {
            if sessions.len() >= max {
                log::warn!("Rejecting session '{}': {} sessions live", id, sessions.len());
                return Err(GenreError::SessionLimit(format!(
                    "{} of {} sessions in use",
                    sessions.len(),
                    max
                )));
            }
        }

        let accumulator = Arc::new(Mutex::new(StreamAccumulator::new(self.stream_config)?));
        sessions.insert(
            id.to_string(),
            SessionEntry {
                accumulator: Arc::clone(&accumulator),
                last_seen: now,
            },
        );

        log::info!("Created stream session '{}' ({} live)", id, sessions.len());
        Ok(accumulator)
    }

    /// Clear the buffered audio of `id`, keeping the session
    ///
    /// Returns `false` if the session does not exist.
    pub fn reset(&self, id: &str) -> bool {
        let handle = self
            .sessions
            .lock()
            .get(id)
            .map(|entry| Arc::clone(&entry.accumulator));

        match handle {
            Some(accumulator) => {
                accumulator.lock().reset();
                true
            }
            None => false,
        }
    }

    /// Remove `id` and drop its buffer
    ///
    /// Returns `false` if the session does not exist. Handles already given
    /// out stay valid but are no longer reachable through the registry.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.lock().remove(id).is_some();
        if removed {
            log::info!("Removed stream session '{}'", id);
        }
        removed
    }

    /// Evict every session idle longer than the configured timeout
    ///
    /// Returns the number of sessions evicted.
    pub fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now())
    }

    /// [`evict_idle`](Self::evict_idle) with an explicit clock reading
    pub fn evict_idle_at(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.lock();
        Self::evict_idle_locked(&mut sessions, now, self.session_config.idle_timeout())
    }

    fn evict_idle_locked(
        sessions: &mut HashMap<String, SessionEntry>,
        now: Instant,
        timeout: Duration,
    ) -> usize {
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let idle = now.saturating_duration_since(entry.last_seen);
            let keep = idle <= timeout;
            if !keep {
                log::info!("Evicting stream session '{}' (idle {:.1}s)", id, idle.as_secs_f32());
            }
            keep
        });
        before - sessions.len()
    }
}
