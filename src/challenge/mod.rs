pub mod events;
pub mod ledger;
pub mod lifecycle;
pub mod progress;

pub use events::{EventBus, LedgerEvent};
pub use ledger::{ChallengeLedger, JsonLedgerFile, LedgerEntries, LedgerStore, SqliteLedgerStore};
pub use lifecycle::{ChallengeOptions, current_challenge, end_challenge, start_challenge};
