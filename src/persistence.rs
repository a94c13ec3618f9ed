//! Line-oriented text storage for the catalogue and the student registry.
//!
//! A book takes three lines: `id available dueEpochSeconds borrowerId`, then
//! the title, then the author. `available` is written as `1` or `0`; an
//! available book carries due date `0` and borrower `-1`. A student takes two
//! lines: the id, then the name.

use std::{
    borrow::Borrow,
    error::Error,
    fmt, fs, io,
    path::{Path, PathBuf},
};

use chrono::DateTime;

use crate::{
    book::{Book, BookId, Loan},
    student::{Student, StudentId},
    system::Library,
};

/// Default location of the book file, relative to the working directory
pub const DEFAULT_BOOKS_FILE: &str = "library_data.txt";

/// Default location of the student file, relative to the working directory
pub const DEFAULT_STUDENTS_FILE: &str = "students_data.txt";

/// Stored borrower id of an available book
const NO_BORROWER: i64 = -1;

/// Stored due date of an available book
const NO_DUE_DATE: i64 = 0;

/// Errors raised while reading or writing the data files
#[derive(Debug)]
pub enum StoreError {
    /// A data file could not be read
    Unreadable {
        /// The file in question
        path: PathBuf,
        /// Underlying I/O failure
        source: io::Error,
    },
    /// A data file could not be written
    Unwritable {
        /// The file in question
        path: PathBuf,
        /// Underlying I/O failure
        source: io::Error,
    },
    /// A record does not follow the file format
    Malformed {
        /// 1-based line where the bad record starts
        line: usize,
        /// What is wrong with it
        reason: String,
    },
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unreadable { source, .. } | Self::Unwritable { source, .. } => Some(source),
            Self::Malformed { .. } => None,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable { path, source } => {
                write!(f, "Could not read {}: {source}", path.display())
            }
            Self::Unwritable { path, source } => {
                write!(f, "Could not write {}: {source}", path.display())
            }
            Self::Malformed { line, reason } => {
                write!(f, "Malformed record at line {line}: {reason}")
            }
        }
    }
}

/// Build a `StoreError::Malformed`
fn malformed(line: usize, reason: impl Into<String>) -> StoreError {
    StoreError::Malformed { line, reason: reason.into() }
}

/// Records read back from storage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Catalogue in file order
    pub books: Vec<Book>,
    /// Registry in file order
    pub students: Vec<Student>,
}

/// Result of decoding a data file
///
/// Decoding stops at the first malformed record; everything before it is kept.
#[derive(Debug)]
pub struct Decoded<T> {
    /// Records decoded before the end of input or the first bad record
    pub records: Vec<T>,
    /// Why decoding stopped early, if it did
    pub malformed: Option<StoreError>,
}

impl<T> Decoded<T> {
    /// Collect records from a decoder until it runs dry or fails
    fn collect(mut next: impl FnMut() -> Option<Result<T, StoreError>>) -> Self {
        let mut records = Vec::new();
        while let Some(result) = next() {
            match result {
                Ok(record) => records.push(record),
                Err(err) => return Self { records, malformed: Some(err) },
            }
        }
        Self { records, malformed: None }
    }
}

/// Numbered lines of a data file
struct NumberedLines<'a> {
    /// Remaining lines
    lines: std::str::Lines<'a>,
    /// Number of the line most recently returned
    line: usize,
}

impl<'a> NumberedLines<'a> {
    /// Start at the top of `text`
    fn new(text: &'a str) -> Self {
        Self { lines: text.lines(), line: 0 }
    }

    /// The next line, verbatim
    fn next_line(&mut self) -> Option<&'a str> {
        let next = self.lines.next()?;
        self.line = self.line.saturating_add(1);
        Some(next)
    }

    /// The next non-blank line, which starts a record
    fn next_record(&mut self) -> Option<&'a str> {
        loop {
            let next = self.next_line()?;
            if !next.trim().is_empty() {
                return Some(next);
            }
        }
    }

    /// The next line, which must exist
    fn require(&mut self, record_line: usize, what: &str) -> Result<&'a str, StoreError> {
        self.next_line().ok_or_else(|| malformed(record_line, format!("missing {what} line")))
    }
}

/// Decode the book file
#[must_use]
pub fn decode_books(text: &str) -> Decoded<Book> {
    let mut lines = NumberedLines::new(text);
    Decoded::collect(|| {
        let header = lines.next_record()?;
        Some(decode_book(&mut lines, header))
    })
}

/// Decode one book whose header line was just read
fn decode_book(lines: &mut NumberedLines<'_>, header: &str) -> Result<Book, StoreError> {
    let line = lines.line;
    let fields: Vec<&str> = header.split_whitespace().collect();
    let [id, available, due, borrower] = fields.as_slice() else {
        return Err(malformed(
            line,
            format!("expected `id available due borrower`, found {header:?}"),
        ));
    };

    let id: BookId =
        id.parse().map_err(|err| malformed(line, format!("invalid book id {id:?}: {err}")))?;
    let available = match *available {
        "1" => true,
        "0" => false,
        other => {
            return Err(malformed(line, format!("availability must be 0 or 1, found {other:?}")));
        }
    };
    let due: i64 =
        due.parse().map_err(|err| malformed(line, format!("invalid due date {due:?}: {err}")))?;
    let borrower: i64 = borrower
        .parse()
        .map_err(|err| malformed(line, format!("invalid borrower id {borrower:?}: {err}")))?;

    let loan = if available {
        if due != NO_DUE_DATE || borrower != NO_BORROWER {
            return Err(malformed(line, "available book with a due date or borrower"));
        }
        None
    } else {
        let borrower = StudentId::try_from(borrower)
            .map_err(|_| malformed(line, format!("lent book with borrower {borrower}")))?;
        let due = DateTime::from_timestamp(due, 0)
            .filter(|_| due != NO_DUE_DATE)
            .ok_or_else(|| malformed(line, format!("lent book with due date {due}")))?;
        Some(Loan { borrower, due })
    };

    let title = lines.require(line, "title")?;
    let author = lines.require(line, "author")?;

    Ok(Book { id, title: title.to_owned(), author: author.to_owned(), loan })
}

/// Decode the student file
#[must_use]
pub fn decode_students(text: &str) -> Decoded<Student> {
    let mut lines = NumberedLines::new(text);
    Decoded::collect(|| {
        let header = lines.next_record()?;
        let line = lines.line;
        Some(
            header
                .trim()
                .parse::<StudentId>()
                .map_err(|err| malformed(line, format!("invalid student id {header:?}: {err}")))
                .and_then(|id| {
                    let name = lines.require(line, "name")?;
                    Ok(Student::new(id, name))
                }),
        )
    })
}

/// Flatten a field onto one line so it cannot break the record layout
fn single_line(field: &str) -> String {
    field.replace(['\r', '\n'], " ")
}

/// Encode the book file
#[must_use]
pub fn encode_books<B: Borrow<Book>>(books: impl IntoIterator<Item = B>) -> String {
    books
        .into_iter()
        .map(|book| {
            let book = book.borrow();
            let (available, due, borrower) = match book.loan {
                None => (1, NO_DUE_DATE, NO_BORROWER),
                Some(Loan { borrower, due }) => (0, due.timestamp(), i64::from(borrower)),
            };
            format!(
                "{} {available} {due} {borrower}\n{}\n{}\n",
                book.id,
                single_line(&book.title),
                single_line(&book.author)
            )
        })
        .collect()
}

/// Encode the student file
#[must_use]
pub fn encode_students<S: Borrow<Student>>(students: impl IntoIterator<Item = S>) -> String {
    students
        .into_iter()
        .map(|student| {
            let student = student.borrow();
            format!("{}\n{}\n", student.id, single_line(&student.name))
        })
        .collect()
}

/// Somewhere the library's records live between runs
pub trait RecordStore {
    /// Read every record that can be read
    ///
    /// Never fails: unreadable files and malformed records are logged and
    /// leave the affected collection empty or partial.
    fn load(&self) -> Snapshot;

    /// Overwrite storage with the library's current records
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unwritable` if a data file cannot be written.
    fn save(&self, library: &Library) -> Result<(), StoreError>;
}

/// The two flat data files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStore {
    /// Book file
    books_path: PathBuf,
    /// Student file
    students_path: PathBuf,
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new(DEFAULT_BOOKS_FILE, DEFAULT_STUDENTS_FILE)
    }
}

impl FileStore {
    /// Store records in the given files
    #[must_use]
    pub fn new(books_path: impl Into<PathBuf>, students_path: impl Into<PathBuf>) -> Self {
        Self { books_path: books_path.into(), students_path: students_path.into() }
    }

    /// Path of the book file
    #[must_use]
    pub fn books_path(&self) -> &Path {
        &self.books_path
    }

    /// Path of the student file
    #[must_use]
    pub fn students_path(&self) -> &Path {
        &self.students_path
    }

    /// Read and decode one data file, logging whatever goes wrong
    fn load_file<T>(path: &Path, decode: fn(&str) -> Decoded<T>) -> Vec<T> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no data file yet, starting empty");
                return Vec::new();
            }
            Err(source) => {
                let err = StoreError::Unreadable { path: path.to_path_buf(), source };
                tracing::warn!(%err, "data file skipped");
                return Vec::new();
            }
        };

        let decoded = decode(&text);
        if let Some(err) = decoded.malformed {
            tracing::warn!(
                path = %path.display(),
                kept = decoded.records.len(),
                %err,
                "stopped reading data file"
            );
        }
        tracing::debug!(path = %path.display(), records = decoded.records.len(), "loaded");
        decoded.records
    }

    /// Write one data file
    fn write_file(path: &Path, contents: &str) -> Result<(), StoreError> {
        fs::write(path, contents)
            .map_err(|source| StoreError::Unwritable { path: path.to_path_buf(), source })
    }
}

impl RecordStore for FileStore {
    fn load(&self) -> Snapshot {
        Snapshot {
            books: Self::load_file(&self.books_path, decode_books),
            students: Self::load_file(&self.students_path, decode_students),
        }
    }

    fn save(&self, library: &Library) -> Result<(), StoreError> {
        Self::write_file(&self.books_path, &encode_books(library.books()))?;
        Self::write_file(&self.students_path, &encode_students(library.students()))?;
        tracing::debug!(
            books = %self.books_path.display(),
            students = %self.students_path.display(),
            "saved"
        );
        Ok(())
    }
}
