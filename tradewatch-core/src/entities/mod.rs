pub mod dead_letter;
pub mod ledger;
pub mod trade;

pub use dead_letter::{DeadLetterEntry, DeadLetterState, DeadLetterStore, ReplayError};
pub use ledger::{Acceptance, LedgerEntry, LedgerStore, WebhookRecord};
pub use trade::{Applied, JsonTradeRepository, MarkFailedError, Trade, TradeRepository};
