use crate::events::LoanEvent;

/// Trait for loan event observation
pub trait LoanObserver {
    /// Called after the library applied a change
    fn on_event(&self, event: &LoanEvent);
}

/// Writes every change to the log
#[derive(Debug)]
pub struct LoanLogger;

impl LoanObserver for LoanLogger {
    fn on_event(&self, event: &LoanEvent) {
        match event {
            LoanEvent::BookAdded(book) => tracing::info!(book, "book added"),
            LoanEvent::StudentAdded(student) => tracing::info!(student, "student added"),
            LoanEvent::Lent { book, student, due } => {
                tracing::info!(book, student, due = %due, "book lent");
            }
            LoanEvent::Returned { book, student, fine } => {
                tracing::info!(book, student, late = fine.is_some(), "book returned");
            }
            LoanEvent::StudentsCleared { students_removed, loans_cancelled } => {
                tracing::info!(students_removed, loans_cancelled, "student data cleared");
            }
            LoanEvent::BooksCleared { books_removed } => {
                tracing::info!(books_removed, "book data cleared");
            }
        }
    }
}

/// Flags returns that came back late
#[derive(Debug)]
pub struct LateReturnNotifier;

impl LoanObserver for LateReturnNotifier {
    fn on_event(&self, event: &LoanEvent) {
        if let LoanEvent::Returned { book, student, fine: Some(fine) } = event {
            tracing::warn!(
                book,
                student,
                days_late = fine.days_late,
                amount = fine.amount,
                "late return, fine reported"
            );
        }
    }
}
