//! Per-level budget
//!
//! The balance is unsigned and only ever decremented after the affordability
//! check, so it cannot go negative.

use serde::{Deserialize, Serialize};

/// Spendable resource pool for the current level
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetLedger {
    balance: u32,
    /// Spent since the last `init` and not yet refunded
    outstanding: u32,
}

impl BudgetLedger {
    pub fn new(amount: u32) -> Self {
        Self {
            balance: amount,
            outstanding: 0,
        }
    }

    /// Reset the pool at the start of a level
    pub fn init(&mut self, amount: u32) {
        self.balance = amount;
        self.outstanding = 0;
    }

    /// Spend `amount` if it's affordable. A rejected spend changes nothing.
    pub fn try_spend(&mut self, amount: u32) -> bool {
        if amount > self.balance {
            return false;
        }
        self.balance -= amount;
        self.outstanding = self.outstanding.saturating_add(amount);
        true
    }

    /// Give `amount` back. Always honored.
    pub fn refund(&mut self, amount: u32) {
        if amount > self.outstanding {
            log::warn!(
                "Refund of {} exceeds the {} spent since level start",
                amount,
                self.outstanding
            );
        }
        self.outstanding = self.outstanding.saturating_sub(amount);
        self.balance = self.balance.saturating_add(amount);
    }

    pub fn balance(&self) -> u32 {
        self.balance
    }

    pub fn can_afford(&self, amount: u32) -> bool {
        amount <= self.balance
    }

    pub fn outstanding(&self) -> u32 {
        self.outstanding
    }
}
