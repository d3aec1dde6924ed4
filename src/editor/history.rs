// src/editor/history.rs

use std::{collections::VecDeque, sync::Arc};

pub const MAX_HISTORY_SIZE: usize = 50;

/// Histórico linear de estados imutáveis (passado, presente, futuro).
///
/// Os estados são guardados como `Arc`, então cada entrada compartilha com as
/// vizinhas tudo o que não mudou. Edições contínuas (digitação) entram com
/// `stage_edit` e viram uma única entrada no `commit_edit`/`commit_staged`;
/// edições estruturais vão direto por `commit_edit`.
#[derive(Debug)]
pub struct History<T> {
    past: VecDeque<Arc<T>>,
    present: Arc<T>,
    future: VecDeque<Arc<T>>,
    // Presente de antes da primeira edição ainda não confirmada
    staged_from: Option<Arc<T>>,
}

impl<T> History<T> {
    pub fn new(initial: T) -> Self {
        Self::from_arc(Arc::new(initial))
    }

    pub fn from_arc(initial: Arc<T>) -> Self {
        Self {
            past: VecDeque::new(),
            present: initial,
            future: VecDeque::new(),
            staged_from: None,
        }
    }

    pub fn present(&self) -> &Arc<T> {
        &self.present
    }

    /// `add_to_history = false` troca o presente sem mexer no passado nem no
    /// futuro; `true` confirma como uma nova entrada.
    pub fn set(&mut self, next: Arc<T>, add_to_history: bool) {
        if add_to_history {
            self.commit_edit(next);
        } else {
            self.stage_edit(next);
        }
    }

    pub fn stage_edit(&mut self, next: Arc<T>) {
        if self.staged_from.is_none() {
            self.staged_from = Some(Arc::clone(&self.present));
        }
        self.present = next;
    }

    /// Confirma `next` como novo presente. O estado empilhado é o de antes da
    /// edição em andamento, se houver. Não faz nada quando `next` é o próprio
    /// presente e nada foi preparado.
    pub fn commit_edit(&mut self, next: Arc<T>) {
        let base = self
            .staged_from
            .take()
            .unwrap_or_else(|| Arc::clone(&self.present));

        if Arc::ptr_eq(&base, &next) {
            self.present = next;
            return;
        }

        self.push_past(base);
        self.present = next;
        self.future.clear();
    }

    /// Confirma o que foi preparado com `stage_edit` (o "blur" do campo).
    pub fn commit_staged(&mut self) {
        if self.staged_from.is_some() {
            let present = Arc::clone(&self.present);
            self.commit_edit(present);
        }
    }

    pub fn undo(&mut self) {
        self.commit_staged();
        if let Some(previous) = self.past.pop_back() {
            let current = std::mem::replace(&mut self.present, previous);
            self.future.push_front(current);
        }
    }

    pub fn redo(&mut self) {
        self.commit_staged();
        if let Some(next) = self.future.pop_front() {
            let current = std::mem::replace(&mut self.present, next);
            self.push_past(current);
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty() || self.is_staging()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty() && !self.is_staging()
    }

    pub fn is_staging(&self) -> bool {
        self.staged_from.is_some()
    }

    /// Troca o presente fora do histórico (resultado de um salvamento).
    pub fn replace_present(&mut self, next: Arc<T>) {
        self.staged_from = None;
        self.present = next;
    }

    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    fn push_past(&mut self, state: Arc<T>) {
        self.past.push_back(state);
        while self.past.len() > MAX_HISTORY_SIZE {
            self.past.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn value(history: &History<i32>) -> i32 {
        **history.present()
    }

    #[test]
    fn undo_then_redo_restores_both_states() {
        let mut history = History::new(0);
        history.set(Arc::new(1), true);
        history.set(Arc::new(2), true);

        history.undo();
        assert_eq!(value(&history), 1);
        assert!(history.can_redo());
        assert_eq!(history.future_len(), 1);

        history.redo();
        assert_eq!(value(&history), 2);
        assert!(!history.can_redo());
        assert_eq!(history.future_len(), 0);
        assert!(history.can_undo());
    }

    #[test]
    fn new_commit_after_undo_clears_future() {
        let mut history = History::new(0);
        history.set(Arc::new(1), true);
        history.set(Arc::new(2), true);
        history.undo();

        history.set(Arc::new(3), true);

        assert!(!history.can_redo());
        assert_eq!(history.future_len(), 0);
        history.undo();
        assert_eq!(value(&history), 1);
    }

    #[test]
    fn committing_the_present_is_a_noop() {
        let mut history = History::new(0);
        history.set(Arc::new(1), true);
        let present = Arc::clone(history.present());

        history.set(present, true);

        assert_eq!(history.past_len(), 1);
    }

    #[test]
    fn staging_leaves_past_and_future_alone() {
        let mut history = History::new(0);
        history.set(Arc::new(1), true);
        history.set(Arc::new(2), true);
        history.undo();

        history.set(Arc::new(10), false);

        assert_eq!(value(&history), 10);
        assert_eq!(history.past_len(), 1);
        assert_eq!(history.future_len(), 1);
    }

    #[test]
    fn keystrokes_collapse_into_one_entry() {
        let mut history = History::new(0);
        for keystroke in [1, 12, 123] {
            history.stage_edit(Arc::new(keystroke));
        }
        history.commit_staged();

        assert_eq!(value(&history), 123);
        assert_eq!(history.past_len(), 1);

        history.undo();
        assert_eq!(value(&history), 0);
    }

    #[test]
    fn undo_flushes_a_pending_stage_first() {
        let mut history = History::new(0);
        history.set(Arc::new(1), true);
        history.stage_edit(Arc::new(5));

        history.undo();

        assert_eq!(value(&history), 1);
        history.redo();
        assert_eq!(value(&history), 5);
    }

    #[test]
    fn undo_and_redo_on_empty_stacks_do_nothing() {
        let mut history = History::new(7);

        history.undo();
        history.redo();

        assert_eq!(value(&history), 7);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn past_is_capped_dropping_the_oldest() {
        let mut history = History::new(0);
        for n in 1..=60 {
            history.set(Arc::new(n), true);
        }

        assert_eq!(history.past_len(), MAX_HISTORY_SIZE);
        for _ in 0..MAX_HISTORY_SIZE {
            history.undo();
        }
        assert_eq!(value(&history), 10);
        assert!(!history.can_undo());
    }

    #[test]
    fn replace_present_keeps_the_stacks() {
        let mut history = History::new(0);
        history.set(Arc::new(1), true);

        history.replace_present(Arc::new(100));

        assert_eq!(value(&history), 100);
        history.undo();
        assert_eq!(value(&history), 0);
    }

    proptest! {
        #[test]
        fn undo_redo_round_trips(values in prop::collection::vec(any::<i32>(), 1..80)) {
            let mut history = History::new(0);
            for v in &values {
                history.set(Arc::new(*v), true);
            }
            let last = value(&history);
            let depth = history.past_len();

            for _ in 0..depth {
                history.undo();
            }
            for _ in 0..depth {
                history.redo();
            }

            prop_assert_eq!(value(&history), last);
            prop_assert!(history.past_len() <= MAX_HISTORY_SIZE);
        }
    }
}
