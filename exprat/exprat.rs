//! Expansion checker for ∀Exp+RES style QBF expansions

use clap::{Arg, ArgMatches};
use exprat_common::{
    check::check,
    config, die,
    output::{
        install_signal_handler, print_error, print_key_value, print_solution, Timer,
        EXIT_NOT_VERIFIED, EXIT_PARSING_FAILURE, EXIT_VERIFIED,
    },
    parser::{parse_expansion, parse_qbf, read_compressed_file_or_stdin},
    write_to_stdout,
};
use std::io;

/// Run `exprat`.
fn main() {
    std::process::exit(run_frontend());
}

/// Run `exprat`, returning its exit code.
///
/// This is a separate function because `std::process::exit` does not
/// call destructors.
fn run_frontend() -> i32 {
    install_signal_handler();
    let mut app = clap::App::new("exprat")
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .after_help(
            "Input files may be compressed - supported file extensions are: zst, gz, bz2, xz and lz4.
Use \"-\" for an input file to read it from standard input.",
        )
        .arg(
            Arg::with_name("QBF")
                .required(true)
                .help("QBF file in QDIMACS format"),
        )
        .arg(
            Arg::with_name("EXPANSION")
                .required(true)
                .help("expansion file in DIMACS format with mapping comments"),
        );

    if config::ENABLE_LOGGING {
        app = app.arg(
            Arg::with_name("v")
                .short("v")
                .help("Verbose output. Print the parsed QBF and expansion."),
        );
    }

    let flags = Flags::new(app.get_matches());
    let timer = Timer::name("total time");

    let mut qbf = {
        let _timer = Timer::name("parsing QBF time");
        let stdin = io::stdin();
        let mut input = read_compressed_file_or_stdin(&flags.qbf_filename, stdin.lock());
        match parse_qbf(&mut input) {
            Ok(qbf) => qbf,
            Err(error) => {
                print_error(format!("failed to parse QBF: {}", error));
                return EXIT_PARSING_FAILURE;
            }
        }
    };
    qbf.sort_matrix_by_prefix();

    let mut expansion = {
        let _timer = Timer::name("parsing expansion time");
        let stdin = io::stdin();
        let mut input = read_compressed_file_or_stdin(&flags.expansion_filename, stdin.lock());
        match parse_expansion(&mut input) {
            Ok(expansion) => expansion,
            Err(error) => {
                print_error(format!("failed to parse expansion: {}", error));
                return EXIT_PARSING_FAILURE;
            }
        }
    };

    if flags.verbose {
        qbf.dump();
        expansion.dump();
    }

    let result = {
        let _timer = Timer::name("checking time");
        match check(&mut qbf, &mut expansion) {
            Ok(result) => result,
            Err(error) => {
                print_error(error);
                return EXIT_PARSING_FAILURE;
            }
        }
    };

    print_key_value("prefix blocks", qbf.prefix.len());
    print_key_value("QBF clauses", qbf.matrix.len());
    print_key_value("expansion clauses", expansion.clauses.len());
    drop(timer);

    if result.is_verified() {
        print_solution("VERIFIED");
        EXIT_VERIFIED
    } else {
        result.print();
        print_solution("NOT VERIFIED");
        EXIT_NOT_VERIFIED
    }
}

/// Parsed arguments. See `exprat --help`.
#[derive(Debug)]
pub struct Flags {
    pub verbose: bool,
    /// Input QBF
    pub qbf_filename: String,
    /// Input expansion
    pub expansion_filename: String,
}

impl Flags {
    /// Create a flags instance from commandline arguments.
    pub fn new(matches: ArgMatches) -> Flags {
        let qbf_filename = matches.value_of("QBF").unwrap().to_string();
        let expansion_filename = matches.value_of("EXPANSION").unwrap().to_string();
        if qbf_filename == "-" && expansion_filename == "-" {
            die!("at most one input file can be read from standard input");
        }
        Flags {
            verbose: matches.is_present("v"),
            qbf_filename,
            expansion_filename,
        }
    }
}
