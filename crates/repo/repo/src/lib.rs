pub mod error;
pub mod transaction;

pub use error::RepoError;
pub use transaction::{RepoFactory, RepoTransaction};
