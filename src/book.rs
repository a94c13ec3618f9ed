use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::student::StudentId;

/// Identifier of a book in the catalogue
pub type BookId = u32;

/// An outstanding loan on a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Loan {
    /// Student holding the book
    pub borrower: StudentId,
    /// When the book has to be back
    pub due: DateTime<Utc>,
}

/// A book in the library catalogue
///
/// A book without a [`Loan`] is available. Holding the loan as an `Option`
/// keeps the borrower and the due date present or absent together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Book {
    /// Catalogue id
    pub id: BookId,
    /// Title as entered at the desk
    pub title: String,
    /// Author as entered at the desk
    pub author: String,
    /// Current loan, if the book is checked out
    pub loan: Option<Loan>,
}

impl Book {
    /// Create an available book
    #[must_use]
    pub fn new(id: BookId, title: impl Into<String>, author: impl Into<String>) -> Self {
        Self { id, title: title.into(), author: author.into(), loan: None }
    }

    /// Whether the book can be lent out
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.loan.is_none()
    }

    /// Student currently holding the book
    #[must_use]
    pub fn borrower(&self) -> Option<StudentId> {
        self.loan.map(|loan| loan.borrower)
    }

    /// Due date of the current loan
    #[must_use]
    pub fn due(&self) -> Option<DateTime<Utc>> {
        self.loan.map(|loan| loan.due)
    }

    /// Get a human-readable description of the loan state
    #[must_use]
    pub fn get_description(&self) -> String {
        match self.loan {
            None => format!("\"{}\" is available for checkout", self.title),
            Some(Loan { borrower, due }) => format!(
                "\"{}\" is checked out by student {borrower} until {}",
                self.title,
                due.format("%Y-%m-%d %H:%M")
            ),
        }
    }
}
