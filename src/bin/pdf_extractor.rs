//! Dump the text of a statement PDF as the importers see it.
//!
//! Useful when writing the patterns of a new importer: the output keeps the
//! `pdftotext -layout` columns the importers rely on.
//!
//! Usage: pdf_extractor <path_to_pdf>
//! Output: Extracted text on stdout, errors on stderr
//! Exit codes:
//!   0 - Success
//!   1 - Invalid arguments
//!   2 - PDF read error
//!   3 - PDF extraction error
//!   4 - PDF validation failed

use releve_import::pdf::{extract_text, is_text_too_short, validate_pdf};
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

/// Below this many characters the PDF is most likely a scan
const MIN_TEXT_CHARS: usize = 50;

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: pdf_extractor <path_to_pdf>");
        return ExitCode::from(1);
    }

    let pdf_path = Path::new(&args[1]);

    let bytes = match fs::read(pdf_path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("READ_ERROR:{}", e);
            return ExitCode::from(2);
        }
    };

    if let Err(e) = validate_pdf(&bytes) {
        eprintln!("VALIDATE_ERROR:{}", e);
        return ExitCode::from(4);
    }

    match extract_text(pdf_path) {
        Ok(text) => {
            if is_text_too_short(&text, MIN_TEXT_CHARS) {
                log::warn!("{}: almost no text, scanned document?", pdf_path.display());
            }
            let mut handle = io::stdout().lock();
            if let Err(e) = handle.write_all(text.as_bytes()) {
                eprintln!("WRITE_ERROR:{}", e);
                return ExitCode::from(3);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("EXTRACT_ERROR:{}", e);
            ExitCode::from(3)
        }
    }
}
