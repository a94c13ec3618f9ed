use std::io::{self, Write};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    book::BookId,
    student::StudentId,
    system::Library,
};

/// Width of the book table rule
const BOOK_RULE_WIDTH: usize = 100;

/// Width of the student table rule
const STUDENT_RULE_WIDTH: usize = 94;

/// One line of the book listing, computed against the live clock
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookRow {
    /// Catalogue id
    pub id: BookId,
    /// Title
    pub title: String,
    /// Author
    pub author: String,
    /// Whether the book is on the shelf
    pub available: bool,
    /// Who holds it
    pub borrower: Option<StudentId>,
    /// When it is due back
    pub due: Option<DateTime<Utc>>,
    /// Days past due; zero while on loan but not late, absent when on the shelf
    pub days_late: Option<f64>,
    /// Fine owed so far, present only when the book is late
    pub fine: Option<f64>,
}

/// A book held by a student
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeldBook {
    /// Catalogue id
    pub id: BookId,
    /// Title
    pub title: String,
}

/// One student of the student listing with the books they hold
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentRow {
    /// Registration id
    pub id: StudentId,
    /// Name
    pub name: String,
    /// Books currently lent to this student
    pub books: Vec<HeldBook>,
}

/// Read-only views over a [`Library`]
#[derive(Debug)]
pub struct LibraryReport;

impl LibraryReport {
    /// Every book with its lateness and fine as of now
    ///
    /// Nothing here is stored: an unreturned late book shows a bigger fine
    /// every time the report is taken.
    #[must_use]
    pub fn books(library: &Library) -> Vec<BookRow> {
        let now = library.now();
        let policy = library.policy();

        library
            .books()
            .iter()
            .map(|book| {
                let fine = book.due().and_then(|due| policy.fine_for(due, now));
                BookRow {
                    id: book.id,
                    title: book.title.clone(),
                    author: book.author.clone(),
                    available: book.is_available(),
                    borrower: book.borrower(),
                    due: book.due(),
                    days_late: book.due().map(|_| fine.map_or(0.0, |fine| fine.days_late)),
                    fine: fine.map(|fine| fine.amount),
                }
            })
            .collect()
    }

    /// Every student with the books lent to them
    #[must_use]
    pub fn students(library: &Library) -> Vec<StudentRow> {
        library
            .students()
            .map(|student| StudentRow {
                id: student.id,
                name: student.name.clone(),
                books: library
                    .books_borrowed_by(student.id)
                    .map(|book| HeldBook { id: book.id, title: book.title.clone() })
                    .collect(),
            })
            .collect()
    }

    /// Print the book listing as a table
    ///
    /// # Errors
    ///
    /// Returns any error raised by the writer.
    pub fn write_books_table(rows: &[BookRow], out: &mut impl Write) -> io::Result<()> {
        let rule = "=".repeat(BOOK_RULE_WIDTH);
        writeln!(out, "Library Books")?;
        writeln!(out, "{rule}")?;
        writeln!(
            out,
            "{:>10}{:>30}{:>25}{:>15}{:>20}{:>15}{:>15}",
            "ID", "Title", "Author", "Available", "Student ID", "Days Late", "Fine"
        )?;
        writeln!(out, "{rule}")?;
        for row in rows {
            let borrower = row.borrower.map(|id| id.to_string()).unwrap_or_default();
            let (days_late, fine) = match (row.days_late, row.fine) {
                (Some(days_late), Some(fine)) => (format!("{days_late:.2}"), format!("${fine:.2}")),
                (Some(_), None) => ("0".to_string(), "-".to_string()),
                (None, _) => ("-".to_string(), "-".to_string()),
            };
            writeln!(
                out,
                "{:>10}{:>30}{:>25}{:>15}{borrower:>20}{days_late:>15}{fine:>15}",
                row.id,
                row.title,
                row.author,
                if row.available { "Yes" } else { "No" },
            )?;
        }
        writeln!(out, "{rule}")
    }

    /// Print the student listing as a table
    ///
    /// Students without books get a single "No Books" line.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the writer.
    pub fn write_students_table(rows: &[StudentRow], out: &mut impl Write) -> io::Result<()> {
        let rule = "=".repeat(STUDENT_RULE_WIDTH);
        writeln!(out, "Students and Their Books")?;
        writeln!(out, "{rule}")?;
        writeln!(
            out,
            "{:>15}{:>30}{:>15}{:>30}",
            "Student ID", "Student Name", "Book ID", "Book Title"
        )?;
        writeln!(out, "{rule}")?;
        for row in rows {
            if row.books.is_empty() {
                writeln!(out, "{:>15}{:>30}{:>15}{:>30}", row.id, row.name, "-", "No Books")?;
            }
            for book in &row.books {
                writeln!(out, "{:>15}{:>30}{:>15}{:>30}", row.id, row.name, book.id, book.title)?;
            }
        }
        writeln!(out, "{rule}")
    }

    /// Serialize report rows as pretty JSON
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` if the rows cannot be serialized.
    pub fn to_json<T: Serialize>(rows: &[T]) -> serde_json::Result<String> {
        serde_json::to_string_pretty(rows)
    }
}
