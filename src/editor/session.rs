// src/editor/session.rs

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    edits::{append_section, apply_edit, EditMode, QuoteEdit},
    history::History,
    EditError, PendingOperation,
};
use crate::{
    engine::{
        recalc::{kitchen_staff_cost, refresh_totals, simulate_price, PriceSimulation},
        QuoteRules,
    },
    models::{
        premise::ConsumptionPremise,
        quote::{MenuSection, Quote, Totals},
    },
};

/// Estado exibido pela tela de edição.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummary {
    pub session_id: Uuid,
    pub quote: Quote,
    pub totals: Totals,
    pub pricing: PriceSimulation,
    #[schema(value_type = f64)]
    pub kitchen_staff_cost: Decimal,
    pub premises: Vec<ConsumptionPremise>,
    pub can_undo: bool,
    pub can_redo: bool,
    pub pending: Option<PendingOperation>,
}

/// Cópia somente leitura para exportação (PDF/CSV).
#[derive(Debug, Clone)]
pub struct QuoteSnapshot {
    pub quote: Quote,
    pub totals: Totals,
    pub pricing: PriceSimulation,
}

/// Uma sessão de edição: um único escritor por orçamento.
///
/// Operações assíncronas (seção gerada pela IA, salvamento) são feitas em duas
/// etapas, `begin_*` e `complete_*`, para que a sessão não fique travada
/// durante a chamada externa. Só uma pode estar em andamento; a segunda é
/// recusada. Uma falha deixa o orçamento exatamente como estava.
pub struct QuoteEditor {
    id: Uuid,
    owner: Uuid,
    history: History<Quote>,
    margin_percent: Decimal,
    durable_id: Option<Uuid>,
    in_flight: Option<PendingOperation>,
    rules: QuoteRules,
}

impl QuoteEditor {
    pub fn open(owner: Uuid, mut quote: Quote, rules: QuoteRules) -> Self {
        quote.sync_premises();
        refresh_totals(&mut quote, rules.classifier.as_ref());
        Self {
            id: Uuid::new_v4(),
            owner,
            margin_percent: quote.margin_percent,
            durable_id: quote.id,
            history: History::new(quote),
            in_flight: None,
            rules,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn owner(&self) -> Uuid {
        self.owner
    }

    pub fn durable_id(&self) -> Option<Uuid> {
        self.durable_id
    }

    pub fn margin_percent(&self) -> Decimal {
        self.margin_percent
    }

    pub fn pending(&self) -> Option<PendingOperation> {
        self.in_flight
    }

    pub fn present(&self) -> &Arc<Quote> {
        self.history.present()
    }

    // Durante um salvamento o presente não pode mudar: o resultado vai substituí-lo.
    fn ensure_not_saving(&self) -> Result<(), EditError> {
        match self.in_flight {
            Some(PendingOperation::Save) => Err(EditError::OperationInFlight(PendingOperation::Save)),
            _ => Ok(()),
        }
    }

    pub fn apply(&mut self, edit: &QuoteEdit, mode: EditMode) -> Result<(), EditError> {
        self.ensure_not_saving()?;

        let next = Arc::new(apply_edit(self.history.present(), edit, &self.rules)?);
        if mode == EditMode::Commit || edit.is_structural() {
            self.history.commit_edit(next);
        } else {
            self.history.stage_edit(next);
        }
        Ok(())
    }

    pub fn commit_staged(&mut self) {
        self.history.commit_staged();
    }

    pub fn undo(&mut self) -> Result<(), EditError> {
        self.ensure_not_saving()?;
        self.history.undo();
        Ok(())
    }

    pub fn redo(&mut self) -> Result<(), EditError> {
        self.ensure_not_saving()?;
        self.history.redo();
        Ok(())
    }

    /// A margem é um controle ao vivo: não entra no histórico.
    pub fn set_margin(&mut self, margin_percent: Decimal) {
        self.margin_percent = margin_percent;
    }

    /// O presente com o id durável e o preço sugerido carimbados.
    pub fn current(&self) -> Quote {
        let mut quote = Quote::clone(self.history.present());
        quote.id = self.durable_id;
        quote.margin_percent = self.margin_percent;
        quote.suggested_price = self.pricing().suggested_price;
        quote
    }

    pub fn pricing(&self) -> PriceSimulation {
        simulate_price(&self.history.present().totals, self.margin_percent)
    }

    pub fn summary(&self) -> QuoteSummary {
        let quote = self.current();
        QuoteSummary {
            session_id: self.id,
            totals: quote.totals,
            pricing: self.pricing(),
            kitchen_staff_cost: kitchen_staff_cost(self.rules.classifier.as_ref(), &quote.labor_lines),
            premises: quote.premises.to_vec(),
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
            pending: self.in_flight,
            quote,
        }
    }

    pub fn snapshot(&self) -> QuoteSnapshot {
        let quote = self.current();
        QuoteSnapshot {
            totals: quote.totals,
            pricing: self.pricing(),
            quote,
        }
    }

    fn begin(&mut self, operation: PendingOperation) -> Result<(), EditError> {
        if let Some(running) = self.in_flight {
            return Err(EditError::OperationInFlight(running));
        }
        self.in_flight = Some(operation);
        Ok(())
    }

    /// Devolve o número de convidados para a geração da seção.
    pub fn begin_add_section(&mut self) -> Result<i32, EditError> {
        self.begin(PendingOperation::AddSection)?;
        Ok(self.history.present().guest_count)
    }

    /// A seção é acrescentada ao presente do momento em que a resposta chega.
    pub fn complete_add_section<E>(&mut self, result: Result<MenuSection, E>) -> Result<(), E> {
        self.in_flight = None;
        let section = result?;
        let next = append_section(self.history.present(), section, self.rules.classifier.as_ref());
        self.history.commit_edit(Arc::new(next));
        Ok(())
    }

    /// Confirma edições pendentes e devolve o orçamento a persistir.
    pub fn begin_save(&mut self) -> Result<Quote, EditError> {
        self.begin(PendingOperation::Save)?;
        self.history.commit_staged();
        Ok(self.current())
    }

    /// O orçamento salvo vira o presente, sem entrada nova no histórico.
    pub fn complete_save<E>(&mut self, result: Result<Quote, E>) -> Result<(), E> {
        self.in_flight = None;
        let mut saved = result?;
        // O banco só guarda as strings; mantém a forma estruturada em edição
        if saved.consumption_premises == self.history.present().consumption_premises {
            saved.premises = Arc::clone(&self.history.present().premises);
        }
        saved.sync_premises();
        refresh_totals(&mut saved, self.rules.classifier.as_ref());
        self.durable_id = saved.id.or(self.durable_id);
        self.margin_percent = saved.margin_percent;
        self.history.replace_present(Arc::new(saved));
        Ok(())
    }
}
