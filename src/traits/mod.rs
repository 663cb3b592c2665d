//! Trait definitions for Basecamp operations.
//!
//! Each entity type implements the traits it supports, encapsulating
//! endpoint differences in the implementations.

mod create;
mod get;
mod list;
mod update;

pub use create::Create;
pub use get::Get;
pub use list::List;
pub use update::Update;
