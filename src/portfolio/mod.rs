pub mod account;
pub mod position;

pub use account::{Account, AccountState};
pub use position::Position;
