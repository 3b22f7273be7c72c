//! Row types and the `kanau` query objects that read and write them.
//!
//! Queries go through runtime `sqlx::query_as` with `FromRow` rows rather
//! than the `query_as!` macros, so the crate builds without a live database
//! or checked-in `.sqlx` offline data. The cost is that column names and
//! types are only checked when a query runs. The `#[sqlx::test]` cases of
//! the Postgres store run these statements against the migrated schema.

pub mod district;
pub mod participant;
pub mod region;
pub mod winner;
