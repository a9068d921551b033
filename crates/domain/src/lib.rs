pub mod collaboration;
pub mod engagement;
pub mod error;
pub mod ideas;
pub mod identity;
pub mod matching;
pub mod policy;
pub mod ports;
pub mod users;
pub mod util;

pub type DomainResult<T> = Result<T, error::DomainError>;
