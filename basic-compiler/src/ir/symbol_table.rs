use crate::ir::Reg;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// Introduced by `DIM`.
    Variable,
    /// Introduced by a `FOR` whose variable had no slot yet.
    LoopVariable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    pub kind: SymbolKind,
    /// Register holding the address of the variable's stack slot.
    pub slot: Reg,
}

/// Flat name -> slot map for one compilation. There is a single scope, and
/// declaring a name again replaces the earlier entry.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, SymbolInfo>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, returning the entry it replaced.
    pub fn declare(&mut self, name: String, info: SymbolInfo) -> Option<SymbolInfo> {
        self.symbols.insert(name, info)
    }

    pub fn lookup(&self, name: &str) -> Option<&SymbolInfo> {
        self.symbols.get(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(name: &str) -> SymbolInfo {
        SymbolInfo {
            kind: SymbolKind::Variable,
            slot: Reg(name.to_string()),
        }
    }

    #[test]
    fn redeclaring_replaces_the_slot() {
        let mut table = SymbolTable::new();
        assert!(table.declare("X".into(), slot("X.addr")).is_none());
        let previous = table.declare("X".into(), slot("X.addr1"));

        assert_eq!(previous, Some(slot("X.addr")));
        assert_eq!(table.lookup("X"), Some(&slot("X.addr1")));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn lookup_of_unknown_name_is_none() {
        let table = SymbolTable::new();
        assert!(table.lookup("Y").is_none());
        assert!(table.is_empty());
    }
}
