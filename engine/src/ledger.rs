//! In-memory mirror of the prize ledger.

use gala_types::{Prize, PrizeError, PrizeId, WinnerCommit};

/// Prizes in presentation order.
#[derive(Debug, Clone, Default)]
pub struct PrizeLedger {
    prizes: Vec<Prize>,
}

impl PrizeLedger {
    #[must_use]
    pub fn new(mut prizes: Vec<Prize>) -> Self {
        prizes.sort_by_key(|p| p.order);
        Self { prizes }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.prizes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prizes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Prize> {
        self.prizes.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Prize] {
        &self.prizes
    }

    #[must_use]
    pub fn get(&self, id: &PrizeId) -> Option<&Prize> {
        self.prizes.iter().find(|p| &p.id == id)
    }

    #[must_use]
    pub fn get_index(&self, index: usize) -> Option<&Prize> {
        self.prizes.get(index)
    }

    #[must_use]
    pub fn position(&self, id: &PrizeId) -> Option<usize> {
        self.prizes.iter().position(|p| &p.id == id)
    }

    /// Prizes whose quota is filled.
    pub fn completed(&self) -> impl Iterator<Item = &Prize> {
        self.prizes.iter().filter(|p| p.is_complete())
    }

    /// Prizes with quota left.
    pub fn pending(&self) -> impl Iterator<Item = &Prize> {
        self.prizes.iter().filter(|p| !p.is_complete())
    }

    #[must_use]
    pub fn order(&self) -> Vec<PrizeId> {
        self.prizes.iter().map(|p| p.id.clone()).collect()
    }

    /// Every prize with its recorded winners emptied.
    #[must_use]
    pub fn cleared(&self) -> Vec<Prize> {
        self.prizes
            .iter()
            .map(|p| {
                let mut prize = p.clone();
                prize.clear_winners();
                prize
            })
            .collect()
    }

    pub(crate) fn apply_commit(&mut self, commit: &WinnerCommit) -> Result<(), PrizeError> {
        match self.prizes.iter_mut().find(|p| p.id == commit.prize_id) {
            Some(prize) => prize.record_winners(&commit.winners),
            None => Ok(()),
        }
    }

    pub(crate) fn push(&mut self, prize: Prize) {
        self.prizes.push(prize);
        self.renumber();
    }

    pub(crate) fn remove(&mut self, id: &PrizeId) -> Option<Prize> {
        let index = self.position(id)?;
        let removed = self.prizes.remove(index);
        self.renumber();
        Some(removed)
    }

    /// Move the prize at `from` to `to`. Returns `false` when either is out of range.
    pub(crate) fn move_prize(&mut self, from: usize, to: usize) -> bool {
        if from >= self.prizes.len() || to >= self.prizes.len() {
            return false;
        }
        let prize = self.prizes.remove(from);
        self.prizes.insert(to, prize);
        self.renumber();
        true
    }

    pub(crate) fn reset_all(&mut self) {
        for prize in &mut self.prizes {
            prize.clear_winners();
        }
    }

    fn renumber(&mut self) {
        for (order, prize) in (0u32..).zip(self.prizes.iter_mut()) {
            prize.order = order;
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use gala_types::{NonEmptyString, ParticipantId, Quota};

    use super::*;

    fn prize(id: &str, quota: u32, order: u32) -> Prize {
        Prize::new(
            PrizeId::new(id),
            NonEmptyString::new(id.to_uppercase()).unwrap(),
            Quota::new(quota).unwrap(),
        )
        .with_order(order)
    }

    #[test]
    fn new_sorts_by_order() {
        let ledger = PrizeLedger::new(vec![prize("b", 1, 2), prize("a", 1, 0), prize("c", 1, 1)]);
        let ids: Vec<_> = ledger.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn move_and_remove_renumber() {
        let mut ledger =
            PrizeLedger::new(vec![prize("a", 1, 0), prize("b", 1, 1), prize("c", 1, 2)]);
        assert!(ledger.move_prize(2, 0));
        let ids: Vec<_> = ledger.iter().map(|p| (p.id.as_str(), p.order)).collect();
        assert_eq!(ids, vec![("c", 0), ("a", 1), ("b", 2)]);

        ledger.remove(&PrizeId::new("a")).unwrap();
        let ids: Vec<_> = ledger.iter().map(|p| (p.id.as_str(), p.order)).collect();
        assert_eq!(ids, vec![("c", 0), ("b", 1)]);

        assert!(!ledger.move_prize(0, 5));
    }

    #[test]
    fn completed_and_pending_split() {
        let mut ledger = PrizeLedger::new(vec![prize("a", 1, 0), prize("b", 2, 1)]);
        ledger
            .apply_commit(&WinnerCommit {
                prize_id: PrizeId::new("a"),
                winners: vec![ParticipantId::new("x")],
                won_at: Utc::now(),
            })
            .unwrap();

        let completed: Vec<_> = ledger.completed().map(|p| p.id.as_str()).collect();
        let pending: Vec<_> = ledger.pending().map(|p| p.id.as_str()).collect();
        assert_eq!(completed, vec!["a"]);
        assert_eq!(pending, vec!["b"]);
    }

    #[test]
    fn apply_commit_respects_quota() {
        let mut ledger = PrizeLedger::new(vec![prize("a", 1, 0)]);
        let err = ledger
            .apply_commit(&WinnerCommit {
                prize_id: PrizeId::new("a"),
                winners: vec![ParticipantId::new("x"), ParticipantId::new("y")],
                won_at: Utc::now(),
            })
            .unwrap_err();
        assert!(matches!(err, PrizeError::QuotaExceeded { .. }));
        assert!(ledger.get(&PrizeId::new("a")).unwrap().winners().is_empty());
    }
}
