// src/editor/registry.rs

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{interval, Instant},
};
use uuid::Uuid;

use super::{session::QuoteEditor, EditError};

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);
pub const MAX_SESSIONS_PER_OWNER: usize = 10;

struct Entry {
    editor: QuoteEditor,
    last_access: Instant,
}

impl Entry {
    // Sessão com operação em andamento nunca é descartada
    fn evictable(&self, now: Instant, idle_timeout: Duration) -> bool {
        self.editor.pending().is_none() && now.duration_since(self.last_access) >= idle_timeout
    }
}

/// Sessões de edição abertas, em memória. O lock nunca é mantido durante
/// chamadas externas: as operações assíncronas usam `begin_*`/`complete_*`.
///
/// Um cliente que sai da tela não avisa: sessões paradas por mais de
/// `idle_timeout` são descartadas, e cada usuário mantém no máximo
/// `max_per_owner` sessões (a menos usada recentemente sai primeiro).
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<Uuid, Entry>>>,
    idle_timeout: Duration,
    max_per_owner: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_limits(DEFAULT_IDLE_TIMEOUT, MAX_SESSIONS_PER_OWNER)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle_timeout: Duration, max_per_owner: usize) -> Self {
        Self {
            sessions: Arc::default(),
            idle_timeout,
            max_per_owner: max_per_owner.max(1),
        }
    }

    pub async fn insert(&self, editor: QuoteEditor) -> Uuid {
        let id = editor.id();
        let owner = editor.owner();
        let now = Instant::now();

        let mut sessions = self.sessions.lock().await;
        let evicted = Self::evict_idle_locked(&mut sessions, now, self.idle_timeout);
        if evicted > 0 {
            tracing::info!("🧹 {} sessão(ões) ociosa(s) descartada(s)", evicted);
        }

        // Abre espaço para a nova sessão do mesmo usuário
        let mut owned: Vec<(Uuid, Instant)> = sessions
            .iter()
            .filter(|(_, entry)| entry.editor.owner() == owner && entry.editor.pending().is_none())
            .map(|(sid, entry)| (*sid, entry.last_access))
            .collect();
        let open_for_owner = sessions.values().filter(|entry| entry.editor.owner() == owner).count();
        if open_for_owner >= self.max_per_owner {
            owned.sort_by_key(|(_, last_access)| *last_access);
            for (sid, _) in owned.into_iter().take(open_for_owner + 1 - self.max_per_owner) {
                sessions.remove(&sid);
                tracing::debug!("📝 Sessão de edição {} descartada (limite por usuário)", sid);
            }
        }

        sessions.insert(id, Entry { editor, last_access: now });
        tracing::debug!("📝 Sessão de edição {} aberta", id);
        id
    }

    /// Executa `f` sobre a sessão, se ela existir e pertencer a `owner`.
    pub async fn with_editor<R, F>(&self, owner: Uuid, session_id: Uuid, f: F) -> Result<R, EditError>
    where
        F: FnOnce(&mut QuoteEditor) -> R,
    {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions
            .get_mut(&session_id)
            .filter(|entry| entry.editor.owner() == owner)
            .ok_or(EditError::SessionNotFound)?;
        entry.last_access = Instant::now();
        Ok(f(&mut entry.editor))
    }

    pub async fn close(&self, owner: Uuid, session_id: Uuid) -> Result<(), EditError> {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(&session_id) {
            Some(entry) if entry.editor.owner() == owner => {
                sessions.remove(&session_id);
                tracing::debug!("📝 Sessão de edição {} encerrada", session_id);
                Ok(())
            }
            _ => Err(EditError::SessionNotFound),
        }
    }

    fn evict_idle_locked(sessions: &mut HashMap<Uuid, Entry>, now: Instant, idle_timeout: Duration) -> usize {
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.evictable(now, idle_timeout));
        before - sessions.len()
    }

    /// Descarta as sessões ociosas. Devolve quantas saíram.
    pub async fn evict_idle(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        Self::evict_idle_locked(&mut sessions, Instant::now(), self.idle_timeout)
    }

    /// Varredura periódica das sessões ociosas.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(every);
            tracing::info!("🧹 Limpeza de sessões ociosas a cada {}s", every.as_secs());
            loop {
                ticker.tick().await;
                let evicted = registry.evict_idle().await;
                if evicted > 0 {
                    tracing::info!("🧹 {} sessão(ões) ociosa(s) descartada(s)", evicted);
                }
            }
        })
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        editor::edits::{EditMode, QuoteEdit},
        engine::QuoteRules,
        models::quote::Quote,
    };

    fn editor(owner: Uuid) -> QuoteEditor {
        QuoteEditor::open(owner, Quote::new("Festa", 30), QuoteRules::default())
    }

    #[tokio::test]
    async fn sessions_are_private_to_their_owner() {
        let registry = SessionRegistry::new();
        let owner = Uuid::new_v4();
        let id = registry.insert(editor(owner)).await;

        let stranger = registry.with_editor(Uuid::new_v4(), id, |_| ()).await;
        assert_eq!(stranger, Err(EditError::SessionNotFound));

        let applied = registry
            .with_editor(owner, id, |editor| editor.apply(&QuoteEdit::AddLabor, EditMode::Commit))
            .await;
        assert_eq!(applied, Ok(Ok(())));
    }

    #[tokio::test]
    async fn closed_sessions_are_gone() {
        let registry = SessionRegistry::new();
        let owner = Uuid::new_v4();
        let id = registry.insert(editor(owner)).await;

        assert_eq!(registry.close(Uuid::new_v4(), id).await, Err(EditError::SessionNotFound));
        assert_eq!(registry.close(owner, id).await, Ok(()));
        assert_eq!(registry.len().await, 0);
        assert_eq!(registry.close(owner, id).await, Err(EditError::SessionNotFound));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_are_evicted() {
        let registry = SessionRegistry::with_limits(Duration::from_secs(60), 10);
        let owner = Uuid::new_v4();
        let idle = registry.insert(editor(owner)).await;
        let active = registry.insert(editor(owner)).await;

        tokio::time::advance(Duration::from_secs(45)).await;
        registry.with_editor(owner, active, |_| ()).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(registry.evict_idle().await, 1);
        assert_eq!(registry.with_editor(owner, idle, |_| ()).await, Err(EditError::SessionNotFound));
        assert_eq!(registry.with_editor(owner, active, |_| ()).await, Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_runs_on_its_own() {
        let registry = SessionRegistry::with_limits(Duration::from_secs(60), 10);
        registry.insert(editor(Uuid::new_v4())).await;
        let sweeper = registry.spawn_sweeper(Duration::from_secs(30));

        // Com o tempo pausado, o runtime avança o relógio sozinho quando ocioso
        tokio::time::sleep(Duration::from_secs(95)).await;

        assert_eq!(registry.len().await, 0);
        sweeper.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn sessions_with_work_in_flight_are_kept() {
        let registry = SessionRegistry::with_limits(Duration::from_secs(60), 10);
        let owner = Uuid::new_v4();
        let id = registry.insert(editor(owner)).await;
        registry.with_editor(owner, id, |e| e.begin_save()).await.unwrap().unwrap();

        tokio::time::advance(Duration::from_secs(120)).await;

        assert_eq!(registry.evict_idle().await, 0);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn owner_cap_drops_the_least_recently_used() {
        let registry = SessionRegistry::with_limits(Duration::from_secs(3600), 2);
        let owner = Uuid::new_v4();
        let oldest = registry.insert(editor(owner)).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        let recent = registry.insert(editor(owner)).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        let other_owner = Uuid::new_v4();
        let other = registry.insert(editor(other_owner)).await;

        let newest = registry.insert(editor(owner)).await;

        assert_eq!(registry.len().await, 3);
        assert_eq!(registry.with_editor(owner, oldest, |_| ()).await, Err(EditError::SessionNotFound));
        assert!(registry.with_editor(owner, recent, |_| ()).await.is_ok());
        assert!(registry.with_editor(owner, newest, |_| ()).await.is_ok());
        assert!(registry.with_editor(other_owner, other, |_| ()).await.is_ok());
    }
}
