//! Career-mode expense ledger.
//!
//! Every karma purchase is recorded with enough information to undo it.

use core::fmt;

/// Ledger-scoped entry identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExpenseId(pub u32);

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expense#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(ascii_case_insensitive)]
pub enum ExpenseKind {
    #[default]
    Karma,
    Nuyen,
}

/// How to reverse an entry.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExpenseUndo {
    /// Lower the attribute with this abbreviation by one point.
    ImproveAttribute(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExpenseEntry {
    pub id: ExpenseId,
    /// Signed amount; purchases are negative.
    pub amount: i32,
    pub reason: String,
    pub kind: ExpenseKind,
    pub undo: Option<ExpenseUndo>,
}

#[derive(Clone, Debug, Default)]
pub struct ExpenseLedger {
    entries: Vec<ExpenseEntry>,
    next_id: u32,
}

impl ExpenseLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores persisted entries; new ids continue after the highest one.
    pub fn from_entries(entries: Vec<ExpenseEntry>) -> Self {
        let next_id = entries.iter().map(|entry| entry.id.0).max().unwrap_or(0);
        Self { entries, next_id }
    }

    pub fn record(
        &mut self,
        amount: i32,
        reason: impl Into<String>,
        kind: ExpenseKind,
        undo: Option<ExpenseUndo>,
    ) -> ExpenseId {
        self.next_id += 1;
        let id = ExpenseId(self.next_id);
        self.entries.push(ExpenseEntry {
            id,
            amount,
            reason: reason.into(),
            kind,
            undo,
        });
        id
    }

    pub fn get(&self, id: ExpenseId) -> Option<&ExpenseEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn remove(&mut self, id: ExpenseId) -> Option<ExpenseEntry> {
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.remove(index))
    }

    pub fn entries(&self) -> &[ExpenseEntry] {
        &self.entries
    }

    /// Net change of `kind` across all entries.
    pub fn total(&self, kind: ExpenseKind) -> i32 {
        self.entries
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| entry.amount)
            .sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_totals_by_kind() {
        let mut ledger = ExpenseLedger::new();
        let first = ledger.record(
            -20,
            "STR 3 -> 4",
            ExpenseKind::Karma,
            Some(ExpenseUndo::ImproveAttribute("STR".into())),
        );
        ledger.record(-500, "Ares Predator", ExpenseKind::Nuyen, None);

        assert_eq!(ledger.total(ExpenseKind::Karma), -20);
        assert_eq!(ledger.total(ExpenseKind::Nuyen), -500);
        assert_eq!(ledger.remove(first).map(|e| e.amount), Some(-20));
        assert_eq!(ledger.len(), 1);
        assert!(ledger.get(first).is_none());
    }
}
