//! Static instrument catalog
//!
//! Built once at engine start and never mutated; instruments are shared as
//! `Arc<Instrument>` so snapshots can reference them without copying.

use crate::core::{EngineError, Instrument};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct InstrumentRegistry {
    instruments: Vec<Arc<Instrument>>,
    index: HashMap<String, usize>,
}

impl InstrumentRegistry {
    /// Register `instruments` in order, rejecting empty catalogs, duplicate
    /// symbols and non-positive baseline prices
    pub fn new(instruments: Vec<Instrument>) -> Result<Self, EngineError> {
        if instruments.is_empty() {
            return Err(EngineError::invalid(
                "instruments",
                "at least one instrument is required",
            ));
        }

        let mut index = HashMap::with_capacity(instruments.len());
        let mut registered = Vec::with_capacity(instruments.len());

        for inst in instruments {
            if !inst.baseline_price.is_finite() || inst.baseline_price <= 0.0 {
                return Err(EngineError::invalid(
                    "instruments",
                    format!("{} baseline price must be positive, got {}", inst.symbol, inst.baseline_price),
                ));
            }
            if index.contains_key(&inst.symbol) {
                return Err(EngineError::DuplicateSymbol(inst.symbol));
            }
            index.insert(inst.symbol.clone(), registered.len());
            registered.push(Arc::new(inst));
        }

        Ok(Self {
            instruments: registered,
            index,
        })
    }

    pub fn get(&self, symbol: &str) -> Option<&Arc<Instrument>> {
        self.index.get(symbol).map(|&i| &self.instruments[i])
    }

    /// Registration index of `symbol`
    pub fn position(&self, symbol: &str) -> Option<usize> {
        self.index.get(symbol).copied()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.index.contains_key(symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Instrument>> {
        self.instruments.iter()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.instruments.iter().map(|i| i.symbol.as_str())
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Instrument> {
        vec![
            Instrument::new("AAPL", "Apple Inc.", "Technology", 189.84),
            Instrument::new("BTC-USD", "Bitcoin", "Crypto", 67_432.18),
        ]
    }

    #[test]
    fn test_registry_preserves_order() {
        let registry = InstrumentRegistry::new(catalog()).unwrap();
        let symbols: Vec<_> = registry.symbols().collect();
        assert_eq!(symbols, vec!["AAPL", "BTC-USD"]);
        assert_eq!(registry.position("BTC-USD"), Some(1));
        assert_eq!(registry.get("AAPL").unwrap().sector, "Technology");
        assert!(registry.get("MSFT").is_none());
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let mut instruments = catalog();
        instruments.push(Instrument::new("AAPL", "Again", "Technology", 1.0));
        assert_eq!(
            InstrumentRegistry::new(instruments).unwrap_err(),
            EngineError::DuplicateSymbol("AAPL".to_string())
        );
    }

    #[test]
    fn test_registry_rejects_empty_and_bad_prices() {
        assert!(InstrumentRegistry::new(Vec::new()).is_err());
        let bad = vec![Instrument::new("ZERO", "Zero", "None", 0.0)];
        assert!(InstrumentRegistry::new(bad).is_err());
    }
}
