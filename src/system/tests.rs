#![allow(clippy::arithmetic_side_effects, clippy::expect_used)]

use std::{cell::RefCell, rc::Rc};

use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use crate::{
    book::Loan,
    clock::FixedClock,
    events::LoanEvent,
    fine::FinePolicy,
    observers::LoanObserver,
    persistence::Snapshot,
    student::Student,
    system::{ErrorKind, Library, LibraryError},
};

/// Records every event it sees
#[derive(Debug, Clone, Default)]
struct EventRecorder {
    /// Events in arrival order
    events: Rc<RefCell<Vec<LoanEvent>>>,
}

impl LoanObserver for EventRecorder {
    fn on_event(&self, event: &LoanEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Fixed start instant for every test
fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).single().expect("valid date")
}

/// Helper function to set up a library with books 1..=3 and students 1..=7
fn setup_test_library() -> (Library, FixedClock, EventRecorder) {
    let clock = FixedClock::new(start());
    let recorder = EventRecorder::default();
    let mut library = Library::new().with_clock(clock.clone());
    library.register_observer(Box::new(recorder.clone()));

    for title in ["Dune", "Emma", "Ulysses"] {
        library.add_book(title, "Someone");
    }
    for name in ["Ann", "Bob", "Cat", "Dan", "Eve", "Fay", "Gus"] {
        library.add_student(name);
    }
    recorder.events.borrow_mut().clear();

    (library, clock, recorder)
}

/// Every book satisfies: on loan exactly when it has a borrower and a due date
fn assert_loan_state_consistent(library: &Library) {
    for book in library.books() {
        assert_eq!(book.is_available(), book.borrower().is_none());
        assert_eq!(book.is_available(), book.due().is_none());
    }
}

#[test]
fn test_ids_start_at_one() {
    let library = Library::new();
    assert_eq!(library.next_book_id(), 1);
    assert_eq!(library.next_student_id(), 1);
}

#[test]
fn test_ids_follow_highest_existing() {
    let mut library = Library::from_snapshot(Snapshot {
        books: vec![crate::book::Book::new(4, "A", "B"), crate::book::Book::new(2, "C", "D")],
        students: vec![Student::new(9, "Zed"), Student::new(3, "Kim")],
    });
    assert_eq!(library.next_book_id(), 5);
    assert_eq!(library.next_student_id(), 10);

    let book = library.add_book("New", "Author");
    let student = library.add_student("New Student");
    assert_eq!((book, student), (5, 10));
    assert_eq!(library.next_book_id(), 6);
}

#[test]
fn test_lend_and_return_scenario() {
    let (mut library, clock, recorder) = setup_test_library();

    let lending = library.lend_book(3, 7).expect("lend");
    assert_eq!(lending.student_name, "Gus");
    assert_eq!(lending.due, start() + TimeDelta::days(15));

    let book = library.book(3).expect("book 3");
    assert!(!book.is_available());
    assert!(book.get_description().contains("checked out by student 7"));
    assert_eq!(book.loan, Some(Loan { borrower: 7, due: start() + TimeDelta::days(15) }));

    clock.advance(TimeDelta::days(20));
    let deposit = library.return_book(3).expect("return");
    let fine = deposit.fine.expect("late return");
    assert!((fine.days_late - 5.0).abs() < 1e-9);
    assert!((fine.amount - 5.0).abs() < 1e-9);
    assert_eq!(deposit.student, 7);

    let book = library.book(3).expect("book 3");
    assert!(book.is_available());
    assert_eq!(book.loan, None);

    assert_eq!(
        *recorder.events.borrow(),
        vec![
            LoanEvent::Lent { book: 3, student: 7, due: start() + TimeDelta::days(15) },
            LoanEvent::Returned { book: 3, student: 7, fine: Some(fine) },
        ]
    );
}

#[test]
fn test_on_time_return_has_no_fine() {
    let (mut library, clock, _) = setup_test_library();
    library.lend_book(1, 1).expect("lend");

    clock.advance(TimeDelta::days(15));
    let deposit = library.return_book(1).expect("return");
    assert_eq!(deposit.fine, None);
    assert!(library.book(1).is_some_and(crate::book::Book::is_available));
}

#[test]
fn test_custom_policy() {
    let clock = FixedClock::new(start());
    let policy = FinePolicy { loan_period: TimeDelta::days(7), fine_per_day: 0.25 };
    let mut library = Library::new().with_clock(clock.clone()).with_policy(policy);
    let book = library.add_book("Short Loan", "Someone");
    let student = library.add_student("Ann");

    let lending = library.lend_book(book, student).expect("lend");
    assert_eq!(lending.due, start() + TimeDelta::days(7));

    clock.advance(TimeDelta::days(11));
    let fine = library.return_book(book).expect("return").fine.expect("late");
    assert!((fine.amount - 1.0).abs() < 1e-9);
    assert!(library.book(book).is_some_and(|b| b.get_description().contains("available")));
}

#[test]
fn test_lending_a_lent_book_fails_unchanged() {
    let (mut library, clock, recorder) = setup_test_library();
    library.lend_book(2, 1).expect("lend");
    let before = library.book(2).cloned();
    recorder.events.borrow_mut().clear();

    clock.advance(TimeDelta::days(3));
    let result = library.lend_book(2, 5);
    assert_eq!(result, Err(LibraryError::BookOnLoan { book: 2, borrower: 1 }));
    assert_eq!(result.map_err(|err| err.kind()), Err(ErrorKind::Unavailable));

    assert_eq!(library.book(2).cloned(), before);
    assert!(recorder.events.borrow().is_empty());
}

#[test]
fn test_lend_unknown_ids() {
    let (mut library, _, recorder) = setup_test_library();

    let missing_book = library.lend_book(42, 1);
    assert_eq!(missing_book, Err(LibraryError::BookNotFound(42)));

    let missing_student = library.lend_book(1, 42);
    assert_eq!(missing_student, Err(LibraryError::StudentNotFound(42)));
    assert_eq!(missing_student.map_err(|err| err.kind()), Err(ErrorKind::NotFound));

    assert!(library.books().iter().all(crate::book::Book::is_available));
    assert!(recorder.events.borrow().is_empty());
}

#[test]
fn test_returning_an_available_book_fails() {
    let (mut library, _, recorder) = setup_test_library();

    assert_eq!(library.return_book(1), Err(LibraryError::BookNotOnLoan(1)));
    assert_eq!(library.return_book(99), Err(LibraryError::BookNotFound(99)));
    assert!(library.book(1).is_some_and(crate::book::Book::is_available));
    assert!(recorder.events.borrow().is_empty());
}

#[test]
fn test_second_return_fails() {
    let (mut library, _, _) = setup_test_library();
    library.lend_book(1, 2).expect("lend");
    library.return_book(1).expect("first return");
    assert_eq!(library.return_book(1).map_err(|err| err.kind()), Err(ErrorKind::Unavailable));
}

#[test]
fn test_clear_students_force_returns_without_fines() {
    let (mut library, clock, recorder) = setup_test_library();
    library.lend_book(1, 1).expect("lend");
    library.lend_book(2, 2).expect("lend");
    recorder.events.borrow_mut().clear();

    // Well past due: a regular return would carry a fine
    clock.advance(TimeDelta::days(60));
    assert_eq!(library.clear_students(), 2);

    assert_eq!(library.students().count(), 0);
    assert!(library.books().iter().all(crate::book::Book::is_available));
    assert_loan_state_consistent(&library);
    assert_eq!(
        *recorder.events.borrow(),
        vec![LoanEvent::StudentsCleared { students_removed: 7, loans_cancelled: 2 }]
    );

    // Allocation restarts from scratch
    assert_eq!(library.next_student_id(), 1);
}

#[test]
fn test_clear_books_leaves_students() {
    let (mut library, _, recorder) = setup_test_library();
    library.lend_book(1, 1).expect("lend");

    assert_eq!(library.clear_books(), 3);
    assert!(library.books().is_empty());
    assert_eq!(library.students().count(), 7);
    assert_eq!(library.student(1).map(|s| s.name.as_str()), Some("Ann"));
    assert_eq!(library.next_book_id(), 1);
    assert_eq!(
        recorder.events.borrow().last(),
        Some(&LoanEvent::BooksCleared { books_removed: 3 })
    );
}

#[test]
fn test_books_borrowed_by() {
    let (mut library, _, _) = setup_test_library();
    library.lend_book(1, 4).expect("lend");
    library.lend_book(3, 4).expect("lend");

    let held: Vec<_> = library.books_borrowed_by(4).map(|book| book.id).collect();
    assert_eq!(held, vec![1, 3]);
    assert_eq!(library.books_borrowed_by(5).count(), 0);
}

#[test]
fn test_loan_state_stays_consistent() {
    let (mut library, clock, _) = setup_test_library();

    for step in 0..30_u32 {
        let book = step % 3 + 1;
        let student = step % 7 + 1;
        if step % 2 == 0 {
            drop(library.lend_book(book, student));
        } else {
            drop(library.return_book(book));
        }
        clock.advance(TimeDelta::hours(13));
        assert_loan_state_consistent(&library);
    }
}

#[test]
fn test_add_events() {
    let mut library = Library::new();
    let recorder = EventRecorder::default();
    library.register_observer(Box::new(recorder.clone()));

    let book = library.add_book("Dune", "Frank Herbert");
    let student = library.add_student("Ann");

    assert_eq!(
        *recorder.events.borrow(),
        vec![LoanEvent::BookAdded(book), LoanEvent::StudentAdded(student)]
    );
    assert_eq!(library.to_string(), "1 books (0 on loan), 1 students");
}

#[test]
fn test_ids_never_collide_at_the_top_of_the_range() {
    let mut library = Library::from_snapshot(Snapshot {
        books: vec![
            crate::book::Book::new(u32::MAX, "Last", "X"),
            crate::book::Book::new(1, "A", "B"),
        ],
        students: vec![Student::new(u32::MAX, "Original"), Student::new(1, "Ann")],
    });

    let book = library.add_book("New", "Author");
    let student = library.add_student("Newcomer");
    assert_eq!((book, student), (2, 2));

    assert_eq!(library.books().iter().filter(|b| b.id == u32::MAX).count(), 1);
    assert_eq!(library.student(u32::MAX).map(|s| s.name.as_str()), Some("Original"));
    assert_eq!(library.students().count(), 3);
    assert_eq!(library.next_book_id(), 3);
}

#[test]
fn test_ids_fill_the_lowest_gap_after_the_maximum() {
    let library = Library::from_snapshot(Snapshot {
        books: vec![crate::book::Book::new(u32::MAX, "Last", "X")],
        students: vec![Student::new(u32::MAX, "Last"), Student::new(0, "Zero")],
    });
    assert_eq!(library.next_book_id(), 1);
    assert_eq!(library.next_student_id(), 1);
}

#[test]
fn test_every_copy_of_a_shared_book_id_is_reachable() {
    let mut library = Library::from_snapshot(Snapshot {
        books: vec![crate::book::Book::new(5, "Dune", "F"), crate::book::Book::new(5, "Dune", "F")],
        students: vec![Student::new(1, "Ann"), Student::new(2, "Bob")],
    })
    .with_clock(FixedClock::new(start()));

    library.lend_book(5, 1).expect("first copy");
    library.lend_book(5, 2).expect("second copy");
    assert!(library.books().iter().all(|b| !b.is_available()));
    assert_eq!(library.lend_book(5, 1), Err(LibraryError::BookOnLoan { book: 5, borrower: 1 }));

    assert_eq!(library.return_book(5).map(|d| d.student), Ok(1));
    assert_eq!(library.return_book(5).map(|d| d.student), Ok(2));
    assert_eq!(library.return_book(5), Err(LibraryError::BookNotOnLoan(5)));
    assert_loan_state_consistent(&library);
}
