// src/services/quote_service.rs

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    editor::{
        edits::{EditMode, QuoteEdit},
        registry::SessionRegistry,
        session::{QuoteEditor, QuoteSnapshot, QuoteSummary},
    },
    engine::QuoteRules,
    models::quote::{CostHint, MenuSection, Quote, QuotePatch},
    services::{ai::QuoteGenerator, plan_service::QueryGate},
};

/// Persistência dos orçamentos de um usuário.
#[async_trait]
pub trait QuoteStore: Send + Sync {
    /// Mais recentes primeiro.
    async fn list(&self, owner: Uuid) -> Result<Vec<Quote>, AppError>;

    async fn find(&self, owner: Uuid, id: Uuid) -> Result<Option<Quote>, AppError>;

    /// Atribui id durável e data de criação.
    async fn create(&self, owner: Uuid, quote: &Quote) -> Result<Quote, AppError>;

    async fn update(&self, owner: Uuid, quote: &Quote) -> Result<Quote, AppError>;

    async fn patch(&self, owner: Uuid, id: Uuid, patch: &QuotePatch) -> Result<Option<Quote>, AppError>;
}

#[derive(Clone)]
pub struct QuoteService {
    store: Arc<dyn QuoteStore>,
    generator: Arc<dyn QuoteGenerator>,
    gate: Arc<dyn QueryGate>,
    sessions: SessionRegistry,
    rules: QuoteRules,
}

impl QuoteService {
    pub fn new(
        store: Arc<dyn QuoteStore>,
        generator: Arc<dyn QuoteGenerator>,
        gate: Arc<dyn QueryGate>,
        sessions: SessionRegistry,
        rules: QuoteRules,
    ) -> Self {
        Self {
            store,
            generator,
            gate,
            sessions,
            rules,
        }
    }

    async fn open_session(&self, owner: Uuid, quote: Quote) -> Result<QuoteSummary, AppError> {
        let editor = QuoteEditor::open(owner, quote, self.rules.clone());
        let summary = editor.summary();
        self.sessions.insert(editor).await;
        Ok(summary)
    }

    /// Portão do plano → IA → nova sessão com o rascunho.
    pub async fn generate(&self, owner: Uuid, description: &str, cost_hints: &[CostHint]) -> Result<QuoteSummary, AppError> {
        self.gate.authorize_query(owner).await?;
        let draft = self.generator.generate_quote(description, cost_hints).await?;
        self.open_session(owner, draft).await
    }

    pub async fn edit_persisted(&self, owner: Uuid, quote_id: Uuid) -> Result<QuoteSummary, AppError> {
        let quote = self
            .store
            .find(owner, quote_id)
            .await?
            .ok_or(AppError::QuoteNotFound)?;
        self.open_session(owner, quote).await
    }

    pub async fn summary(&self, owner: Uuid, session_id: Uuid) -> Result<QuoteSummary, AppError> {
        Ok(self.sessions.with_editor(owner, session_id, |e| e.summary()).await?)
    }

    pub async fn apply_edit(
        &self,
        owner: Uuid,
        session_id: Uuid,
        edit: &QuoteEdit,
        mode: EditMode,
    ) -> Result<QuoteSummary, AppError> {
        let summary = self
            .sessions
            .with_editor(owner, session_id, |e| e.apply(edit, mode).map(|_| e.summary()))
            .await??;
        Ok(summary)
    }

    pub async fn commit(&self, owner: Uuid, session_id: Uuid) -> Result<QuoteSummary, AppError> {
        let summary = self
            .sessions
            .with_editor(owner, session_id, |e| {
                e.commit_staged();
                e.summary()
            })
            .await?;
        Ok(summary)
    }

    pub async fn undo(&self, owner: Uuid, session_id: Uuid) -> Result<QuoteSummary, AppError> {
        let summary = self
            .sessions
            .with_editor(owner, session_id, |e| e.undo().map(|_| e.summary()))
            .await??;
        Ok(summary)
    }

    pub async fn redo(&self, owner: Uuid, session_id: Uuid) -> Result<QuoteSummary, AppError> {
        let summary = self
            .sessions
            .with_editor(owner, session_id, |e| e.redo().map(|_| e.summary()))
            .await??;
        Ok(summary)
    }

    pub async fn set_margin(&self, owner: Uuid, session_id: Uuid, margin_percent: Decimal) -> Result<QuoteSummary, AppError> {
        let summary = self
            .sessions
            .with_editor(owner, session_id, |e| {
                e.set_margin(margin_percent);
                e.summary()
            })
            .await?;
        Ok(summary)
    }

    /// Gera uma seção pela IA e a acrescenta ao orçamento. A sessão não fica
    /// travada durante a chamada; outra operação assíncrona é recusada.
    pub async fn add_section(&self, owner: Uuid, session_id: Uuid, name: &str) -> Result<QuoteSummary, AppError> {
        let service = self.clone();
        let name = name.to_string();
        // Roda em uma task própria: se o cliente desconectar, a operação ainda termina
        tokio::spawn(async move { service.run_add_section(owner, session_id, &name).await })
            .await
            .map_err(|e| AppError::InternalServerError(e.into()))?
    }

    async fn run_add_section(&self, owner: Uuid, session_id: Uuid, name: &str) -> Result<QuoteSummary, AppError> {
        let guest_count = self
            .sessions
            .with_editor(owner, session_id, |e| e.begin_add_section())
            .await??;

        let result: Result<MenuSection, AppError> = async {
            self.gate.authorize_query(owner).await?;
            Ok(self.generator.generate_section(name, guest_count).await?)
        }
        .await;

        let summary = self
            .sessions
            .with_editor(owner, session_id, |e| e.complete_add_section(result).map(|_| e.summary()))
            .await??;

        tracing::info!("🍽️ Seção '{}' adicionada ao orçamento da sessão {}", name, session_id);
        Ok(summary)
    }

    /// Cria na primeira vez, atualiza depois. O resultado vira o presente da sessão.
    pub async fn save(&self, owner: Uuid, session_id: Uuid) -> Result<QuoteSummary, AppError> {
        let service = self.clone();
        tokio::spawn(async move { service.run_save(owner, session_id).await })
            .await
            .map_err(|e| AppError::InternalServerError(e.into()))?
    }

    async fn run_save(&self, owner: Uuid, session_id: Uuid) -> Result<QuoteSummary, AppError> {
        let quote = self
            .sessions
            .with_editor(owner, session_id, |e| e.begin_save())
            .await??;

        let result = if quote.is_persisted() {
            self.store.update(owner, &quote).await
        } else {
            self.store.create(owner, &quote).await
        };

        let summary = self
            .sessions
            .with_editor(owner, session_id, |e| e.complete_save(result).map(|_| e.summary()))
            .await??;

        tracing::info!("💾 Orçamento {:?} salvo", summary.quote.id);
        Ok(summary)
    }

    pub async fn snapshot(&self, owner: Uuid, session_id: Uuid) -> Result<QuoteSnapshot, AppError> {
        Ok(self.sessions.with_editor(owner, session_id, |e| e.snapshot()).await?)
    }

    pub async fn close(&self, owner: Uuid, session_id: Uuid) -> Result<(), AppError> {
        Ok(self.sessions.close(owner, session_id).await?)
    }

    pub async fn list(&self, owner: Uuid) -> Result<Vec<Quote>, AppError> {
        self.store.list(owner).await
    }

    pub async fn patch(&self, owner: Uuid, quote_id: Uuid, patch: &QuotePatch) -> Result<Quote, AppError> {
        self.store
            .patch(owner, quote_id, patch)
            .await?
            .ok_or(AppError::QuoteNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        editor::{edits::IngredientField, EditError, PendingOperation},
        models::{profile::PlanError, quote::Ingredient},
        services::ai::AiError,
    };
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{Mutex, Notify};

    fn dec(n: i64, scale: u32) -> Decimal {
        Decimal::new(n, scale)
    }

    #[derive(Default)]
    struct MemoryStore {
        quotes: Mutex<Vec<(Uuid, Quote)>>,
        fail: bool,
    }

    #[async_trait]
    impl QuoteStore for MemoryStore {
        async fn list(&self, owner: Uuid) -> Result<Vec<Quote>, AppError> {
            let quotes = self.quotes.lock().await;
            Ok(quotes.iter().rev().filter(|(o, _)| *o == owner).map(|(_, q)| q.clone()).collect())
        }

        async fn find(&self, owner: Uuid, id: Uuid) -> Result<Option<Quote>, AppError> {
            let quotes = self.quotes.lock().await;
            Ok(quotes.iter().find(|(o, q)| *o == owner && q.id == Some(id)).map(|(_, q)| q.clone()))
        }

        async fn create(&self, owner: Uuid, quote: &Quote) -> Result<Quote, AppError> {
            if self.fail {
                return Err(AppError::InternalServerError(anyhow::anyhow!("banco fora do ar")));
            }
            let mut saved = quote.clone();
            saved.id = Some(Uuid::new_v4());
            saved.created_at = Utc::now();
            self.quotes.lock().await.push((owner, saved.clone()));
            Ok(saved)
        }

        async fn update(&self, owner: Uuid, quote: &Quote) -> Result<Quote, AppError> {
            let mut quotes = self.quotes.lock().await;
            let slot = quotes
                .iter_mut()
                .find(|(o, q)| *o == owner && q.id == quote.id)
                .ok_or(AppError::QuoteNotFound)?;
            slot.1 = quote.clone();
            Ok(quote.clone())
        }

        async fn patch(&self, owner: Uuid, id: Uuid, patch: &QuotePatch) -> Result<Option<Quote>, AppError> {
            let mut quotes = self.quotes.lock().await;
            Ok(quotes.iter_mut().find(|(o, q)| *o == owner && q.id == Some(id)).map(|(_, q)| {
                if let Some(status) = patch.status {
                    q.status = status;
                }
                q.clone()
            }))
        }
    }

    /// Responde com um rascunho fixo; a geração de seção pode ser segurada
    /// até `release` para simular uma chamada lenta.
    #[derive(Default)]
    struct ScriptedGenerator {
        fail: bool,
        hold: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl QuoteGenerator for ScriptedGenerator {
        async fn generate_quote(&self, _description: &str, _hints: &[CostHint]) -> Result<Quote, AiError> {
            if self.fail {
                return Err(AiError::QuoteGenerationFailed);
            }
            let mut quote = Quote::new("Casamento", 100);
            quote.menu_sections = Arc::new(vec![MenuSection::new(
                "Churrasco",
                vec![Ingredient::new("Picanha", dec(2, 0), "kg", dec(10, 0))],
            )]);
            Ok(quote)
        }

        async fn generate_section(&self, name: &str, guest_count: i32) -> Result<MenuSection, AiError> {
            if let Some(hold) = &self.hold {
                hold.notified().await;
            }
            if self.fail {
                return Err(AiError::SectionGenerationFailed);
            }
            Ok(MenuSection::new(
                name,
                vec![Ingredient::new("Pudim", Decimal::from(guest_count), "unidade", dec(1, 0))],
            ))
        }
    }

    struct CountingGate {
        limit: usize,
        used: AtomicUsize,
    }

    impl CountingGate {
        fn new(limit: usize) -> Self {
            Self { limit, used: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl QueryGate for CountingGate {
        async fn authorize_query(&self, _user_id: Uuid) -> Result<(), AppError> {
            if self.used.load(Ordering::SeqCst) >= self.limit {
                return Err(PlanError::QueryLimitReached.into());
            }
            self.used.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn service(store: MemoryStore, generator: ScriptedGenerator, gate: CountingGate) -> QuoteService {
        QuoteService::new(
            Arc::new(store),
            Arc::new(generator),
            Arc::new(gate),
            SessionRegistry::new(),
            QuoteRules::default(),
        )
    }

    #[tokio::test]
    async fn generated_draft_opens_a_session_with_totals() {
        let svc = service(MemoryStore::default(), ScriptedGenerator::default(), CountingGate::new(3));
        let owner = Uuid::new_v4();

        let summary = svc.generate(owner, "Casamento para 100", &[]).await.unwrap();

        assert_eq!(summary.quote.id, None);
        assert_eq!(summary.totals.total_cost, dec(216, 1));
        assert_eq!(summary.pricing.suggested_price, dec(3024, 2));
        assert!(!summary.can_undo);
    }

    #[tokio::test]
    async fn closed_gate_blocks_generation() {
        let svc = service(MemoryStore::default(), ScriptedGenerator::default(), CountingGate::new(0));

        let err = svc.generate(Uuid::new_v4(), "Festa", &[]).await.unwrap_err();

        assert!(matches!(err, AppError::Plan(PlanError::QueryLimitReached)));
    }

    #[tokio::test]
    async fn generator_failure_is_surfaced() {
        let generator = ScriptedGenerator { fail: true, ..Default::default() };
        let svc = service(MemoryStore::default(), generator, CountingGate::new(3));

        let err = svc.generate(Uuid::new_v4(), "Festa", &[]).await.unwrap_err();

        assert_eq!(err.to_string(), AiError::QuoteGenerationFailed.to_string());
    }

    #[tokio::test]
    async fn save_creates_once_then_updates() {
        let svc = service(MemoryStore::default(), ScriptedGenerator::default(), CountingGate::new(3));
        let owner = Uuid::new_v4();
        let sid = svc.generate(owner, "Casamento", &[]).await.unwrap().session_id;

        let first = svc.save(owner, sid).await.unwrap();
        let id = first.quote.id.unwrap();

        let edit = QuoteEdit::UpdateIngredient { section: 0, item: 0, field: IngredientField::Quantity, value: "3".into() };
        svc.apply_edit(owner, sid, &edit, EditMode::Commit).await.unwrap();
        svc.undo(owner, sid).await.unwrap();
        let second = svc.save(owner, sid).await.unwrap();

        assert_eq!(second.quote.id, Some(id));
        assert_eq!(svc.list(owner).await.unwrap().len(), 1);
        assert_eq!(svc.list(owner).await.unwrap()[0].suggested_price, dec(3024, 2));
    }

    #[tokio::test]
    async fn failed_save_leaves_the_session_editable() {
        let store = MemoryStore { fail: true, ..Default::default() };
        let svc = service(store, ScriptedGenerator::default(), CountingGate::new(3));
        let owner = Uuid::new_v4();
        let before = svc.generate(owner, "Casamento", &[]).await.unwrap();

        assert!(svc.save(owner, before.session_id).await.is_err());

        let after = svc.summary(owner, before.session_id).await.unwrap();
        assert_eq!(after.quote, before.quote);
        assert_eq!(after.pending, None);
        assert!(svc.apply_edit(owner, before.session_id, &QuoteEdit::AddLabor, EditMode::Commit).await.is_ok());
    }

    #[tokio::test]
    async fn section_generation_is_single_flight() {
        let hold = Arc::new(Notify::new());
        let generator = ScriptedGenerator { hold: Some(Arc::clone(&hold)), ..Default::default() };
        let svc = service(MemoryStore::default(), generator, CountingGate::new(5));
        let owner = Uuid::new_v4();
        let sid = svc.generate(owner, "Casamento", &[]).await.unwrap().session_id;

        let running = {
            let svc = svc.clone();
            tokio::spawn(async move { svc.add_section(owner, sid, "Sobremesas").await })
        };
        while svc.summary(owner, sid).await.unwrap().pending.is_none() {
            tokio::task::yield_now().await;
        }

        let second = svc.add_section(owner, sid, "Entradas").await.unwrap_err();
        assert!(matches!(second, AppError::Edit(EditError::OperationInFlight(PendingOperation::AddSection))));

        hold.notify_one();
        let summary = running.await.unwrap().unwrap();
        assert_eq!(summary.quote.menu_sections.len(), 2);
        assert_eq!(summary.quote.menu_sections[1].ingredients[0].quantity, dec(100, 0));
        assert!(summary.can_undo);
    }

    #[tokio::test]
    async fn failed_section_keeps_the_quote() {
        let generator = ScriptedGenerator { fail: true, ..Default::default() };
        let svc = service(MemoryStore::default(), generator, CountingGate::new(5));
        let owner = Uuid::new_v4();
        let mut store_quote = Quote::new("Festa", 20);
        store_quote.id = Some(Uuid::new_v4());
        let sid = svc.open_session(owner, store_quote).await.unwrap().session_id;

        let err = svc.add_section(owner, sid, "Sobremesas").await.unwrap_err();

        assert!(matches!(err, AppError::Ai(AiError::SectionGenerationFailed)));
        let summary = svc.summary(owner, sid).await.unwrap();
        assert!(summary.quote.menu_sections.is_empty());
        assert_eq!(summary.pending, None);
    }

    #[tokio::test]
    async fn other_users_cannot_reach_a_session() {
        let svc = service(MemoryStore::default(), ScriptedGenerator::default(), CountingGate::new(3));
        let sid = svc.generate(Uuid::new_v4(), "Casamento", &[]).await.unwrap().session_id;

        let err = svc.summary(Uuid::new_v4(), sid).await.unwrap_err();

        assert!(matches!(err, AppError::Edit(EditError::SessionNotFound)));
    }

    #[tokio::test]
    async fn persisted_quotes_can_be_reopened() {
        let svc = service(MemoryStore::default(), ScriptedGenerator::default(), CountingGate::new(3));
        let owner = Uuid::new_v4();
        let sid = svc.generate(owner, "Casamento", &[]).await.unwrap().session_id;
        let id = svc.save(owner, sid).await.unwrap().quote.id.unwrap();
        svc.close(owner, sid).await.unwrap();

        let reopened = svc.edit_persisted(owner, id).await.unwrap();

        assert_eq!(reopened.quote.id, Some(id));
        assert!(matches!(svc.edit_persisted(owner, Uuid::new_v4()).await, Err(AppError::QuoteNotFound)));
    }
}
