pub mod config;
pub mod domain;
pub mod errors;
pub mod store;

pub use domain::todo::{TaskId, Todo, TodoCommand, TodoStatus};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use store::{StoreError, TodoStore};
