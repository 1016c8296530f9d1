//! Pending transaction pool
//!
//! Ordered, append-only between blocks. Emptied when its contents are
//! mined or when a peer signals the pending work is stale.

use crate::core::Transaction;

/// Transactions admitted but not yet mined, in admission order
#[derive(Debug, Clone, Default)]
pub struct Mempool {
    transactions: Vec<Transaction>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transaction
    pub fn push(&mut self, tx: Transaction) {
        self.transactions.push(tx);
    }

    /// Pending transactions in admission order
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Copy of the pool for a proof-of-work search
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.transactions.clone()
    }

    /// Remove transactions that were confirmed in a block.
    ///
    /// Transactions admitted after the snapshot was taken stay pending.
    pub fn remove_mined(&mut self, mined: &[Transaction]) {
        if self.transactions.starts_with(mined) {
            self.transactions.drain(..mined.len());
            return;
        }

        // The pool was truncated while mining ran
        for tx in mined {
            if let Some(pos) = self.transactions.iter().position(|pending| pending == tx) {
                self.transactions.remove(pos);
            }
        }
    }

    /// Drop every pending transaction, returning how many were discarded
    pub fn truncate(&mut self) -> usize {
        let count = self.transactions.len();
        self.transactions.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(value: f64) -> Transaction {
        Transaction::new("alice", "bob", value)
    }

    #[test]
    fn test_push_preserves_order() {
        let mut pool = Mempool::new();
        pool.push(tx(1.0));
        pool.push(tx(2.0));

        assert_eq!(pool.len(), 2);
        assert_eq!(pool.transactions()[0].value, 1.0);
        assert_eq!(pool.transactions()[1].value, 2.0);
    }

    #[test]
    fn test_remove_mined_keeps_later_admissions() {
        let mut pool = Mempool::new();
        pool.push(tx(1.0));
        pool.push(tx(2.0));
        let snapshot = pool.snapshot();
        pool.push(tx(3.0));

        pool.remove_mined(&snapshot);

        assert_eq!(pool.transactions(), &[tx(3.0)]);
    }

    #[test]
    fn test_remove_mined_after_truncate() {
        let mut pool = Mempool::new();
        pool.push(tx(1.0));
        let snapshot = pool.snapshot();
        pool.truncate();
        pool.push(tx(5.0));

        pool.remove_mined(&snapshot);

        assert_eq!(pool.transactions(), &[tx(5.0)]);
    }

    #[test]
    fn test_truncate_returns_count() {
        let mut pool = Mempool::new();
        pool.push(tx(1.0));
        pool.push(tx(2.0));

        assert_eq!(pool.truncate(), 2);
        assert!(pool.is_empty());
        assert_eq!(pool.truncate(), 0);
    }
}
