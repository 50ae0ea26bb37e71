//! Identifier registry port trait: currencies and pairs.

use crate::domain::currency::{Currency, ForexPair};
use crate::domain::error::LedgerError;
use crate::domain::ids::{CurrencyId, PairId};

pub trait CurrencyRegistry {
    /// Fails with `DuplicateKey` if the code is already registered.
    fn register_currency(&self, code: &str, name: &str) -> Result<CurrencyId, LedgerError>;

    /// Fails with `InvalidPair` if `base == quote`, `NotFound` if either currency
    /// is absent, `DuplicateKey` if the symbol is taken.
    fn register_pair(
        &self,
        base: CurrencyId,
        quote: CurrencyId,
        symbol: &str,
    ) -> Result<PairId, LedgerError>;

    fn currency(&self, id: CurrencyId) -> Result<Option<Currency>, LedgerError>;

    fn currency_by_code(&self, code: &str) -> Result<Option<Currency>, LedgerError>;

    fn pair(&self, id: PairId) -> Result<Option<ForexPair>, LedgerError>;

    fn pair_by_symbol(&self, symbol: &str) -> Result<Option<ForexPair>, LedgerError>;

    /// Ordered by code.
    fn list_currencies(&self) -> Result<Vec<Currency>, LedgerError>;

    /// Ordered by symbol.
    fn list_pairs(&self) -> Result<Vec<ForexPair>, LedgerError>;
}
