//! # Fungible Token Interface
//!
//! The coordinator moves collateral and settlement tokens through
//! [`TokenLedger`]. Semantics follow the usual fungible-token contract:
//! `transfer` moves the caller's own balance, `transfer_from` spends an
//! allowance the owner granted beforehand.
//!
//! [`InMemoryTokenLedger`] is a complete in-process implementation used by
//! the CLI simulator and the test suites. It is a cloneable handle: clones
//! share one book, so a test can keep a handle while the coordinator owns
//! another.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use ccl_core::{Address, Amount};

use crate::transactional::{SnapshotStack, Transactional};

/// Failure reported by a token ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The token is not known to the ledger.
    #[error("unknown token {0}")]
    UnknownToken(Address),

    /// Holder balance too small.
    #[error("{holder} holds {available} of {token}, needs {needed}")]
    InsufficientBalance {
        /// Token.
        token: Address,
        /// Account debited.
        holder: Address,
        /// Amount required.
        needed: Amount,
        /// Current balance.
        available: Amount,
    },

    /// Spender allowance too small.
    #[error("{spender} may spend {available} of {owner}'s {token}, needs {needed}")]
    InsufficientAllowance {
        /// Token.
        token: Address,
        /// Account debited.
        owner: Address,
        /// Account spending.
        spender: Address,
        /// Amount required.
        needed: Amount,
        /// Current allowance.
        available: Amount,
    },

    /// A credit would overflow the recipient balance.
    #[error("balance overflow crediting {holder} with {token}")]
    Overflow {
        /// Token.
        token: Address,
        /// Account credited.
        holder: Address,
    },

    /// The token contract refused the call.
    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Fungible-token operations the coordinator depends on.
pub trait TokenLedger: Transactional + Send {
    /// Decimal places of `token`.
    fn decimals(&self, token: &Address) -> Result<u8, TokenError>;

    /// Balance of `holder` in `token`.
    fn balance_of(&self, token: &Address, holder: &Address) -> Amount;

    /// Move `amount` of `from`'s own balance to `to`.
    fn transfer(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError>;

    /// Move `amount` from `owner` to `to`, spending `spender`'s allowance.
    fn transfer_from(
        &mut self,
        token: &Address,
        spender: &Address,
        owner: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError>;
}

// ─── In-Memory Ledger ────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
struct Book {
    decimals: HashMap<Address, u8>,
    balances: HashMap<(Address, Address), Amount>,
    allowances: HashMap<(Address, Address, Address), Amount>,
}

impl Book {
    fn ensure_known(&self, token: &Address) -> Result<(), TokenError> {
        if self.decimals.contains_key(token) {
            Ok(())
        } else {
            Err(TokenError::UnknownToken(*token))
        }
    }

    fn balance(&self, token: &Address, holder: &Address) -> Amount {
        self.balances.get(&(*token, *holder)).copied().unwrap_or(0)
    }

    fn credit(&mut self, token: &Address, holder: &Address, amount: Amount) -> Result<(), TokenError> {
        let next = self
            .balance(token, holder)
            .checked_add(amount)
            .ok_or(TokenError::Overflow {
                token: *token,
                holder: *holder,
            })?;
        self.balances.insert((*token, *holder), next);
        Ok(())
    }

    fn debit(&mut self, token: &Address, holder: &Address, amount: Amount) -> Result<(), TokenError> {
        let available = self.balance(token, holder);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                token: *token,
                holder: *holder,
                needed: amount,
                available,
            });
        }
        self.balances.insert((*token, *holder), available - amount);
        Ok(())
    }

    fn move_balance(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        self.ensure_known(token)?;
        // Validate both legs before touching either balance.
        let available = self.balance(token, from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                token: *token,
                holder: *from,
                needed: amount,
                available,
            });
        }
        if from != to && self.balance(token, to).checked_add(amount).is_none() {
            return Err(TokenError::Overflow {
                token: *token,
                holder: *to,
            });
        }
        self.debit(token, from, amount)?;
        self.credit(token, to, amount)
    }
}

#[derive(Debug, Default)]
struct Inner {
    book: Book,
    undo: SnapshotStack<Book>,
}

/// Shared in-process token ledger.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTokenLedger {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryTokenLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token with its decimals. Re-registering overwrites decimals.
    pub fn register(&self, token: Address, decimals: u8) {
        self.inner.lock().book.decimals.insert(token, decimals);
    }

    /// Create `amount` of `token` in `to`'s balance.
    pub fn mint(&self, token: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        let mut inner = self.inner.lock();
        inner.book.ensure_known(token)?;
        inner.book.credit(token, to, amount)
    }

    /// Set `spender`'s allowance over `owner`'s `token`.
    pub fn approve(
        &self,
        token: &Address,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let mut inner = self.inner.lock();
        inner.book.ensure_known(token)?;
        inner.book.allowances.insert((*token, *owner, *spender), amount);
        Ok(())
    }

    /// Current allowance of `spender` over `owner`'s `token`.
    pub fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> Amount {
        self.inner
            .lock()
            .book
            .allowances
            .get(&(*token, *owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    /// Balance lookup without going through the trait.
    pub fn balance(&self, token: &Address, holder: &Address) -> Amount {
        self.inner.lock().book.balance(token, holder)
    }
}

impl Transactional for InMemoryTokenLedger {
    fn checkpoint(&mut self) {
        let mut inner = self.inner.lock();
        let Inner { book, undo } = &mut *inner;
        undo.push(book);
    }

    fn commit(&mut self) {
        self.inner.lock().undo.discard();
    }

    fn rollback(&mut self) {
        let mut inner = self.inner.lock();
        let Inner { book, undo } = &mut *inner;
        undo.restore(book);
    }
}

impl TokenLedger for InMemoryTokenLedger {
    fn decimals(&self, token: &Address) -> Result<u8, TokenError> {
        self.inner
            .lock()
            .book
            .decimals
            .get(token)
            .copied()
            .ok_or(TokenError::UnknownToken(*token))
    }

    fn balance_of(&self, token: &Address, holder: &Address) -> Amount {
        self.balance(token, holder)
    }

    fn transfer(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        self.inner.lock().book.move_balance(token, from, to, amount)
    }

    fn transfer_from(
        &mut self,
        token: &Address,
        spender: &Address,
        owner: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let mut inner = self.inner.lock();
        let book = &mut inner.book;
        book.ensure_known(token)?;
        let key = (*token, *owner, *spender);
        let allowed = book.allowances.get(&key).copied().unwrap_or(0);
        if allowed < amount {
            return Err(TokenError::InsufficientAllowance {
                token: *token,
                owner: *owner,
                spender: *spender,
                needed: amount,
                available: allowed,
            });
        }
        book.move_balance(token, owner, to, amount)?;
        book.allowances.insert(key, allowed - amount);
        Ok(())
    }
}
