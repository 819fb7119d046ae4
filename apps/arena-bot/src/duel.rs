/// A challenge waiting to be judged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDuel {
    pub due_index: u64,
    pub conversation_id: String,
    pub challenger: String,
    pub opponent: String,
    pub challenger_user_id: String,
    pub opponent_user_id: String,
}

#[derive(Debug, Default)]
pub struct DuelSchedule {
    pending: Vec<PendingDuel>,
}

impl DuelSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, duel: PendingDuel) {
        self.pending.push(duel);
    }

    /// Removes and returns every duel due at `update_index`, in scheduling order.
    pub fn take_due(&mut self, update_index: u64) -> Vec<PendingDuel> {
        let (due, waiting): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|d| update_index >= d.due_index);
        self.pending = waiting;
        due
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
