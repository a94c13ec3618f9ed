//! Interactive admin menu.
//!
//! Generic over its input, output and record store so that whole sessions
//! can be scripted in tests.

use std::{
    fmt,
    io::{self, BufRead, Write},
};

use colored::Colorize;

use crate::{
    persistence::RecordStore,
    report::LibraryReport,
    system::Library,
};

/// Built-in admin user name
pub const ADMIN_USERNAME: &str = "admin";

/// Built-in admin password
pub const ADMIN_PASSWORD: &str = "pass";

/// Horizontal rule under menu titles
const RULE: &str = "=============================";

/// Placeholder credential check in front of the admin menu
///
/// Compares plaintext; this is not authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminGate {
    /// Expected user name
    username: String,
    /// Expected password
    password: String,
}

impl Default for AdminGate {
    fn default() -> Self {
        Self::new(ADMIN_USERNAME, ADMIN_PASSWORD)
    }
}

impl AdminGate {
    /// Gate with the given credential
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }

    /// Whether the pair matches
    #[must_use]
    pub fn admits(&self, username: &str, password: &str) -> bool {
        username == self.username && password == self.password
    }
}

/// What the menu loop does after an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    /// Show the current menu again
    Stay,
    /// Leave the current menu
    Back,
    /// Input is exhausted; shut down
    Quit,
}

/// The desk session: menus over a library and its store
pub struct Console<R, W, S> {
    /// Operator input
    input: R,
    /// Operator output
    output: W,
    /// Where every change is written through to
    store: S,
    /// Records being worked on
    library: Library,
    /// Admin credential check
    gate: AdminGate,
}

// Manual implementation of Debug for Console
impl<R, W, S> fmt::Debug for Console<R, W, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console")
            .field("library", &self.library)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl<R: BufRead, W: Write, S: RecordStore> Console<R, W, S> {
    /// Create a session with the default admin gate
    pub fn new(library: Library, store: S, input: R, output: W) -> Self {
        Self { input, output, store, library, gate: AdminGate::default() }
    }

    /// Replace the admin gate
    #[must_use]
    pub fn with_gate(mut self, gate: AdminGate) -> Self {
        self.gate = gate;
        self
    }

    /// Records as they stand
    #[must_use]
    pub fn library(&self) -> &Library {
        &self.library
    }

    /// Run the top-level menu until the operator exits or input ends
    ///
    /// Records are saved on the way out.
    ///
    /// # Errors
    ///
    /// Returns an error only if the console itself cannot be read or written.
    /// Storage failures are reported to the operator and logged.
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            writeln!(self.output)?;
            writeln!(self.output, "{}", "Library Management System".green().bold())?;
            writeln!(self.output, "{RULE}")?;
            writeln!(self.output, "1. Admin")?;
            writeln!(self.output, "2. Exit")?;

            let flow = match self.prompt("Enter your choice: ")?.as_deref() {
                None | Some("2") => Flow::Quit,
                Some("1") => self.admin()?,
                Some(_) => self.invalid_choice()?,
            };
            if flow == Flow::Quit {
                break;
            }
        }

        self.persist()?;
        writeln!(self.output, "\nExiting. Goodbye!")
    }

    /// Log in and run the admin menu
    fn admin(&mut self) -> io::Result<Flow> {
        writeln!(self.output, "\n{}", "Admin Login".bold())?;
        writeln!(self.output, "{RULE}")?;
        let Some(username) = self.prompt("Username: ")? else { return Ok(Flow::Quit) };
        let Some(password) = self.prompt("Password: ")? else { return Ok(Flow::Quit) };

        if !self.gate.admits(&username, &password) {
            tracing::warn!(username = %username, "admin login refused");
            writeln!(self.output, "{}", "Login failed. Access denied.".red())?;
            return Ok(Flow::Stay);
        }

        loop {
            writeln!(self.output, "\n{}", "Admin Menu".bold())?;
            writeln!(self.output, "{RULE}")?;
            writeln!(self.output, "1. Add Book")?;
            writeln!(self.output, "2. List Books")?;
            writeln!(self.output, "3. List Students and Their Books")?;
            writeln!(self.output, "4. Add Student")?;
            writeln!(self.output, "5. Lend Book")?;
            writeln!(self.output, "6. Deposit Book")?;
            writeln!(self.output, "7. Clear Student Data")?;
            writeln!(self.output, "8. Clear Book Data")?;
            writeln!(self.output, "9. Exit")?;

            let flow = match self.prompt("Enter your choice: ")?.as_deref() {
                None => Flow::Quit,
                Some("1") => self.add_books()?,
                Some("2") => self.list_books()?,
                Some("3") => self.list_students()?,
                Some("4") => self.add_student()?,
                Some("5") => self.lend_book()?,
                Some("6") => self.deposit_book()?,
                Some("7") => self.clear_students()?,
                Some("8") => self.clear_books()?,
                Some("9") => {
                    self.persist()?;
                    Flow::Back
                }
                Some(_) => self.invalid_choice()?,
            };

            match flow {
                Flow::Stay => {}
                Flow::Back => return Ok(Flow::Stay),
                Flow::Quit => return Ok(Flow::Quit),
            }
        }
    }

    /// Add books until the operator declines
    fn add_books(&mut self) -> io::Result<Flow> {
        loop {
            writeln!(self.output, "\n{}", "Add New Book".bold())?;
            writeln!(self.output, "{RULE}")?;
            let Some(title) = self.prompt("Enter book title: ")? else { return Ok(Flow::Quit) };
            let Some(author) = self.prompt("Enter author name: ")? else { return Ok(Flow::Quit) };

            let id = self.library.add_book(title, author);
            self.persist()?;
            writeln!(self.output, "{}", format!("Book added successfully. ID: {id}").green())?;

            match self.prompt("Do you want to add more books? (y/n): ")?.as_deref() {
                None => return Ok(Flow::Quit),
                Some("y" | "Y") => {}
                Some(_) => return Ok(Flow::Stay),
            }
        }
    }

    /// Print the book table
    fn list_books(&mut self) -> io::Result<Flow> {
        let rows = LibraryReport::books(&self.library);
        writeln!(self.output)?;
        LibraryReport::write_books_table(&rows, &mut self.output)?;
        Ok(Flow::Stay)
    }

    /// Print the student table
    fn list_students(&mut self) -> io::Result<Flow> {
        let rows = LibraryReport::students(&self.library);
        writeln!(self.output)?;
        LibraryReport::write_students_table(&rows, &mut self.output)?;
        Ok(Flow::Stay)
    }

    /// Register one student
    fn add_student(&mut self) -> io::Result<Flow> {
        writeln!(self.output, "\n{}", "Add New Student".bold())?;
        writeln!(self.output, "{RULE}")?;
        let Some(name) = self.prompt("Enter student name: ")? else { return Ok(Flow::Quit) };

        let id = self.library.add_student(name);
        self.persist()?;
        writeln!(self.output, "{}", format!("Student added successfully. ID: {id}").green())?;
        Ok(Flow::Stay)
    }

    /// Lend a book to a student
    fn lend_book(&mut self) -> io::Result<Flow> {
        writeln!(self.output, "\n{}", "Lend Book".bold())?;
        writeln!(self.output, "{RULE}")?;
        let Some(book) = self.prompt("Enter book ID: ")? else { return Ok(Flow::Quit) };
        let Some(student) = self.prompt("Enter student ID: ")? else { return Ok(Flow::Quit) };
        let (Some(book), Some(student)) = (self.parse_id(&book)?, self.parse_id(&student)?) else {
            return Ok(Flow::Stay);
        };

        match self.library.lend_book(book, student) {
            Ok(lending) => {
                self.persist()?;
                let message =
                    format!("Book lent successfully to student: {}", lending.student_name);
                writeln!(self.output, "{}", message.green())?;
                writeln!(self.output, "Due back by {}", lending.due.format("%Y-%m-%d %H:%M UTC"))?;
            }
            Err(err) => {
                tracing::debug!(%err, "lend refused");
                writeln!(
                    self.output,
                    "{}",
                    format!("Book or student not found or book already lent. ({err})").red()
                )?;
            }
        }
        Ok(Flow::Stay)
    }

    /// Take a book back and report any fine
    fn deposit_book(&mut self) -> io::Result<Flow> {
        writeln!(self.output, "\n{}", "Deposit Book".bold())?;
        writeln!(self.output, "{RULE}")?;
        let Some(book) = self.prompt("Enter book ID: ")? else { return Ok(Flow::Quit) };
        let Some(book) = self.parse_id(&book)? else { return Ok(Flow::Stay) };

        match self.library.return_book(book) {
            Ok(deposit) => {
                if let Some(fine) = deposit.fine {
                    writeln!(self.output, "Book is {:.2} days late.", fine.days_late)?;
                    writeln!(self.output, "{}", format!("Fine: ${:.2}", fine.amount).yellow())?;
                }
                self.persist()?;
                writeln!(self.output, "{}", "Book deposited successfully.".green())?;
            }
            Err(err) => {
                tracing::debug!(%err, "deposit refused");
                writeln!(
                    self.output,
                    "{}",
                    format!("Book not found or already deposited. ({err})").red()
                )?;
            }
        }
        Ok(Flow::Stay)
    }

    /// Drop every student and reset every loan
    fn clear_students(&mut self) -> io::Result<Flow> {
        self.library.clear_students();
        self.persist()?;
        writeln!(self.output, "All student data cleared and borrowed book records reset.")?;
        Ok(Flow::Stay)
    }

    /// Drop every book
    fn clear_books(&mut self) -> io::Result<Flow> {
        self.library.clear_books();
        self.persist()?;
        writeln!(self.output, "All book data cleared.")?;
        Ok(Flow::Stay)
    }

    /// Complain about an unknown menu choice
    fn invalid_choice(&mut self) -> io::Result<Flow> {
        writeln!(self.output, "{}", "Invalid choice. Please try again.".red())?;
        Ok(Flow::Stay)
    }

    /// Parse an id typed by the operator, complaining if it is not one
    fn parse_id(&mut self, text: &str) -> io::Result<Option<u32>> {
        if let Ok(id) = text.parse() {
            return Ok(Some(id));
        }
        writeln!(self.output, "{}", format!("Invalid id: {text:?}").red())?;
        Ok(None)
    }

    /// Show a prompt and read one trimmed line; `None` at end of input
    fn prompt(&mut self, label: &str) -> io::Result<Option<String>> {
        write!(self.output, "{label}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Write the records through to the store
    ///
    /// A failed save is reported but does not end the session.
    fn persist(&mut self) -> io::Result<()> {
        if let Err(err) = self.store.save(&self.library) {
            tracing::error!(%err, "save failed");
            writeln!(self.output, "{}", format!("Warning: changes not saved: {err}").yellow())?;
        }
        Ok(())
    }
}
