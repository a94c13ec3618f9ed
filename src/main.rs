use std::{
    error::Error,
    io::{self, Write},
};

use clap::Parser;
use library_lending::{
    Console, Library, LibraryReport, RecordStore,
    config::{Args, Command, Settings},
    observers::{LateReturnNotifier, LoanLogger},
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    let settings = Settings::resolve(Args::parse(), std::env::var("RUST_LOG").ok());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&settings.log_filter)?)
        .with_writer(io::stderr)
        .init();

    let mut library = Library::from_snapshot(settings.store.load());
    library.register_observer(Box::new(LoanLogger));
    library.register_observer(Box::new(LateReturnNotifier));
    tracing::info!(%library, "records loaded");

    let mut stdout = io::stdout().lock();
    match settings.command {
        Command::Menu => {
            let stdin = io::stdin().lock();
            Console::new(library, settings.store, stdin, stdout).run()?;
        }
        Command::Books { json } => {
            let rows = LibraryReport::books(&library);
            if json {
                writeln!(stdout, "{}", LibraryReport::to_json(&rows)?)?;
            } else {
                LibraryReport::write_books_table(&rows, &mut stdout)?;
            }
        }
        Command::Students { json } => {
            let rows = LibraryReport::students(&library);
            if json {
                writeln!(stdout, "{}", LibraryReport::to_json(&rows)?)?;
            } else {
                LibraryReport::write_students_table(&rows, &mut stdout)?;
            }
        }
    }

    Ok(())
}
