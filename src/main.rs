//! Command line driver: validates the program file, hands the byte stream
//! and word count to the machine, and maps the outcome to the process
//! exit status. A graceful halt (or running off the end of the program)
//! exits 0; any fault exits 1.

use std::env;
use std::error::Error;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::process;

use um32::{Machine, Word};

fn main() {
  let mut arguments = env::args();
  let program_name = arguments.next().unwrap_or_else(|| "um32".to_string());
  let path = match (arguments.next(), arguments.next()) {
    (Some(path), None) => path,
    _ => {
      eprintln!("Usage: {} <program.um>", program_name);
      process::exit(1);
    }
  };

  if let Err(error) = run_file(&path) {
    eprintln!("um32: {}", error);
    process::exit(1);
  }
}

fn run_file(path: &str) -> Result<(), Box<dyn Error>> {
  let size = fs::metadata(path)?.len();
  // A program file is a whole number of 4 byte words; anything else is
  // a loader-level validation error, not a machine fault.
  if size % 4 != 0 {
    return Err(format!("{}: length {} is not a multiple of 4 bytes", path, size).into());
  }
  if size / 4 > u64::from(Word::max_value()) {
    return Err(format!("{}: program does not fit in a segment", path).into());
  }
  let word_count = (size / 4) as Word;

  let file = BufReader::new(File::open(path)?);
  let stdin = io::stdin();
  let stdout = io::stdout();
  let mut machine = Machine::new(stdin.lock(), stdout.lock());
  machine.load(file, word_count)?;
  machine.run()?;
  Ok(())
}
