use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use chrono::{DateTime, Utc};

use crate::{
    book::{Book, BookId, Loan},
    clock::{Clock, SystemClock},
    events::LoanEvent,
    fine::{Fine, FinePolicy},
    observers::LoanObserver,
    persistence::Snapshot,
    student::{Student, StudentId},
};

/// Broad classes of lending failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No record with the given id
    NotFound,
    /// The book is in the wrong state (already lent, or already returned)
    Unavailable,
}

/// Custom error type for lending operations
///
/// Every failure leaves the library untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryError {
    /// No book with this id
    BookNotFound(BookId),
    /// No student with this id
    StudentNotFound(StudentId),
    /// The book is already lent out
    BookOnLoan {
        /// The requested book
        book: BookId,
        /// Who currently holds it
        borrower: StudentId,
    },
    /// The book is not lent out, so it cannot be returned
    BookNotOnLoan(BookId),
}

impl LibraryError {
    /// Classify the failure
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BookNotFound(_) | Self::StudentNotFound(_) => ErrorKind::NotFound,
            Self::BookOnLoan { .. } | Self::BookNotOnLoan(_) => ErrorKind::Unavailable,
        }
    }
}

impl std::error::Error for LibraryError {}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BookNotFound(book) => write!(f, "Book {book} not found"),
            Self::StudentNotFound(student) => write!(f, "Student {student} not found"),
            Self::BookOnLoan { book, borrower } => {
                write!(f, "Book {book} is already lent to student {borrower}")
            }
            Self::BookNotOnLoan(book) => write!(f, "Book {book} is not on loan"),
        }
    }
}

/// Outcome of a successful lend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lending {
    /// The book now on loan
    pub book: BookId,
    /// The borrower
    pub student: StudentId,
    /// Borrower's name, for the desk confirmation
    pub student_name: String,
    /// When the book has to be back
    pub due: DateTime<Utc>,
}

/// Outcome of a successful return
#[derive(Debug, Clone, PartialEq)]
pub struct Deposit {
    /// The returned book
    pub book: BookId,
    /// Who had it
    pub student: StudentId,
    /// Fine to report, if the book came back late
    pub fine: Option<Fine>,
}

/// In-memory book catalogue and student registry with the lending rules
///
/// Owned by the application and handed to each operation; there is no
/// process-wide state.
pub struct Library {
    /// Catalogue, in insertion order
    books: Vec<Book>,
    /// Registry keyed by id
    students: BTreeMap<StudentId, Student>,
    /// Loan period and fine rate
    policy: FinePolicy,
    /// Source of "now" for due dates and fines
    clock: Box<dyn Clock>,
    /// Registered change observers
    observers: Vec<Box<dyn LoanObserver>>,
}

// Manual implementation of Debug for Library
impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Library")
            .field("books", &self.books)
            .field("students", &self.students)
            .field("policy", &self.policy)
            .field("observers_count", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Default for Library {
    fn default() -> Self {
        Self::new()
    }
}

impl Library {
    /// Create an empty library on the wall clock with the standard policy
    #[must_use]
    pub fn new() -> Self {
        Self {
            books: Vec::new(),
            students: BTreeMap::new(),
            policy: FinePolicy::default(),
            clock: Box::new(SystemClock),
            observers: Vec::new(),
        }
    }

    /// Create a library holding previously stored records
    ///
    /// Later students with a duplicate id replace earlier ones.
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut library = Self::new();
        library.books = snapshot.books;
        library.students =
            snapshot.students.into_iter().map(|student| (student.id, student)).collect();
        library
    }

    /// Replace the time source
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replace the loan period and fine rate
    #[must_use]
    pub fn with_policy(mut self, policy: FinePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Register an observer to be notified of changes
    pub fn register_observer(&mut self, observer: Box<dyn LoanObserver>) {
        self.observers.push(observer);
    }

    /// Notify every observer
    fn notify(&self, event: &LoanEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }

    /// The current time according to the library clock
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Loan period and fine rate in force
    #[must_use]
    pub fn policy(&self) -> &FinePolicy {
        &self.policy
    }

    /// All books in catalogue order
    #[must_use]
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    /// All students in id order
    pub fn students(&self) -> impl Iterator<Item = &Student> {
        self.students.values()
    }

    /// Look up a book
    #[must_use]
    pub fn book(&self, id: BookId) -> Option<&Book> {
        self.books.iter().find(|book| book.id == id)
    }

    /// Look up a student
    #[must_use]
    pub fn student(&self, id: StudentId) -> Option<&Student> {
        self.students.get(&id)
    }

    /// Books currently held by a student
    pub fn books_borrowed_by(&self, student: StudentId) -> impl Iterator<Item = &Book> {
        self.books.iter().filter(move |book| book.borrower() == Some(student))
    }

    /// Next free book id: one past the highest in use, or 1 for an empty catalogue
    ///
    /// When the highest id is `BookId::MAX` the lowest unused id is taken instead.
    #[must_use]
    pub fn next_book_id(&self) -> BookId {
        self.books.iter().map(|book| book.id).max().map_or(1, |max| {
            max.checked_add(1).unwrap_or_else(|| {
                let used: BTreeSet<BookId> = self.books.iter().map(|book| book.id).collect();
                lowest_unused(used.into_iter())
            })
        })
    }

    /// Next free student id: one past the highest in use, or 1 for an empty registry
    ///
    /// When the highest id is `StudentId::MAX` the lowest unused id is taken instead.
    #[must_use]
    pub fn next_student_id(&self) -> StudentId {
        self.students.keys().next_back().map_or(1, |max| {
            max.checked_add(1).unwrap_or_else(|| lowest_unused(self.students.keys().copied()))
        })
    }

    /// Add an available book and return its id
    pub fn add_book(&mut self, title: impl Into<String>, author: impl Into<String>) -> BookId {
        let id = self.next_book_id();
        self.books.push(Book::new(id, title, author));
        self.notify(&LoanEvent::BookAdded(id));
        id
    }

    /// Register a student and return their id
    pub fn add_student(&mut self, name: impl Into<String>) -> StudentId {
        let id = self.next_student_id();
        self.students.insert(id, Student::new(id, name));
        self.notify(&LoanEvent::StudentAdded(id));
        id
    }

    /// Lend an available book to a registered student
    ///
    /// The book becomes due one loan period from now. When several catalogue
    /// entries share the id, an available one is lent.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::BookNotFound` or `LibraryError::StudentNotFound`
    /// for unknown ids, and `LibraryError::BookOnLoan` if the book is already
    /// lent out. Nothing is changed on failure.
    pub fn lend_book(
        &mut self,
        book_id: BookId,
        student_id: StudentId,
    ) -> Result<Lending, LibraryError> {
        let due = self.policy.due_date(self.clock.now());

        let book = self
            .books
            .iter_mut()
            .filter(|book| book.id == book_id)
            .min_by_key(|book| book.loan.is_some())
            .ok_or(LibraryError::BookNotFound(book_id))?;

        if let Some(loan) = book.loan {
            return Err(LibraryError::BookOnLoan { book: book_id, borrower: loan.borrower });
        }

        let student_name = self
            .students
            .get(&student_id)
            .map(|student| student.name.clone())
            .ok_or(LibraryError::StudentNotFound(student_id))?;

        book.loan = Some(Loan { borrower: student_id, due });
        self.notify(&LoanEvent::Lent { book: book_id, student: student_id, due });

        Ok(Lending { book: book_id, student: student_id, student_name, due })
    }

    /// Take a lent book back, reporting a fine if it is late
    ///
    /// The book is available again whether or not it was late. When several
    /// catalogue entries share the id, one that is on loan is taken back.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::BookNotFound` for an unknown id and
    /// `LibraryError::BookNotOnLoan` if the book is not lent out. Nothing is
    /// changed on failure.
    pub fn return_book(&mut self, book_id: BookId) -> Result<Deposit, LibraryError> {
        let now = self.clock.now();
        let policy = self.policy;

        let book = self
            .books
            .iter_mut()
            .filter(|book| book.id == book_id)
            .min_by_key(|book| book.loan.is_none())
            .ok_or(LibraryError::BookNotFound(book_id))?;

        let loan = book.loan.take().ok_or(LibraryError::BookNotOnLoan(book_id))?;
        let fine = policy.fine_for(loan.due, now);

        self.notify(&LoanEvent::Returned { book: book_id, student: loan.borrower, fine });

        Ok(Deposit { book: book_id, student: loan.borrower, fine })
    }

    /// Remove every student and force-return every book
    ///
    /// No fines are computed for the cancelled loans. Returns the number of
    /// loans that were cancelled.
    pub fn clear_students(&mut self) -> usize {
        let students_removed = self.students.len();
        self.students.clear();

        let loans_cancelled =
            self.books.iter_mut().filter_map(|book| book.loan.take()).count();

        self.notify(&LoanEvent::StudentsCleared { students_removed, loans_cancelled });
        loans_cancelled
    }

    /// Remove every book from the catalogue
    ///
    /// Students are left as they are. Returns the number of books removed.
    pub fn clear_books(&mut self) -> usize {
        let books_removed = self.books.len();
        self.books.clear();

        self.notify(&LoanEvent::BooksCleared { books_removed });
        books_removed
    }
}

/// Smallest id from 1 upwards missing from `used`, which must be ascending
/// and free of duplicates
///
/// Only saturates if every id is taken, which no in-memory collection can hold.
fn lowest_unused(used: impl Iterator<Item = u32>) -> u32 {
    let mut candidate: u32 = 1;
    for id in used.skip_while(|id| *id == 0) {
        if id != candidate {
            break;
        }
        match candidate.checked_add(1) {
            Some(next) => candidate = next,
            None => break,
        }
    }
    candidate
}

// Implementing display for nicer output
impl fmt::Display for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let on_loan = self.books.iter().filter(|book| !book.is_available()).count();
        write!(
            f,
            "{} books ({on_loan} on loan), {} students",
            self.books.len(),
            self.students.len()
        )
    }
}

// Include tests module
#[cfg(test)]
mod tests;
