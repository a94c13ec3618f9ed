use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{book::BookId, fine::Fine, student::StudentId};

/// Changes the lending engine makes to the catalogue and registry
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum LoanEvent {
    /// A book was added to the catalogue
    BookAdded(BookId),
    /// A student was registered
    StudentAdded(StudentId),
    /// A book was lent out
    Lent {
        /// The book now on loan
        book: BookId,
        /// Who borrowed it
        student: StudentId,
        /// When it has to be back
        due: DateTime<Utc>,
    },
    /// A book came back to the desk
    Returned {
        /// The returned book
        book: BookId,
        /// Who had it
        student: StudentId,
        /// Fine reported at the desk, if the book was late
        fine: Option<Fine>,
    },
    /// Every student was removed and every outstanding loan cancelled
    StudentsCleared {
        /// Number of student records dropped
        students_removed: usize,
        /// Number of books force-returned without a fine
        loans_cancelled: usize,
    },
    /// Every book was removed from the catalogue
    BooksCleared {
        /// Number of book records dropped
        books_removed: usize,
    },
}
