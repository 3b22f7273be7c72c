//! Backing stores implementing [`EligibilityRepository`], [`ResultRecorder`]
//! and [`WinnerQueries`].
//!
//! [`EligibilityRepository`]: crate::eligibility::EligibilityRepository
//! [`ResultRecorder`]: crate::recorder::ResultRecorder
//! [`WinnerQueries`]: crate::recorder::WinnerQueries

mod memory;
mod postgres;

pub use memory::MemoryDrawStore;
pub use postgres::PgDrawStore;
