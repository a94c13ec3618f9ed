//! Library desk for tracking books, students and loans.
//!
//! This crate provides the lending engine (lend, return, late fines and bulk
//! clears), its flat-file record store and the interactive admin console
//! that drives it.

pub mod book;
pub mod clock;
pub mod config;
pub mod console;
pub mod events;
pub mod fine;
pub mod observers;
pub mod persistence;
pub mod report;
pub mod student;
pub mod system;

pub use book::{Book, BookId, Loan};
pub use clock::{Clock, FixedClock, SystemClock};
pub use console::Console;
pub use events::LoanEvent;
pub use fine::{Fine, FinePolicy};
pub use persistence::{FileStore, RecordStore};
pub use report::LibraryReport;
pub use student::{Student, StudentId};
pub use system::{Library, LibraryError};
