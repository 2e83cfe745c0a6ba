use std::time::Duration;

use clap::{App, Arg, ArgMatches};
use slog::{o, Discard, Drain, Logger};
use slog_term::{FullFormat, TermDecorator};

use lmc::{
    compiler::{assemble_with_logger, AssemblerOptions},
    error::AssemblyError,
    machine::{Machine, MachineError, StdInput, StdOutput},
    symbolic,
};

enum Error {
    Assembly(AssemblyError),
    Execution {
        error: MachineError,
        /// Source line of the failing instruction, if it came from the program.
        line: Option<usize>,
    },
    Argument(String),
    Timeout,
    IO(std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::IO(e)
    }
}

impl From<AssemblyError> for Error {
    fn from(e: AssemblyError) -> Error {
        Error::Assembly(e)
    }
}

impl From<MachineError> for Error {
    fn from(error: MachineError) -> Error {
        Error::Execution { error, line: None }
    }
}

fn parse_arguments() -> ArgMatches<'static> {
    App::new("lmcrun")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Mitja Karhusaari <mitja@karhusaari.me>")
        .about("Utility for assembling and executing Little Man Computer programs")
        .arg(Arg::with_name("source")
             .help("File containing assembly source")
             .value_name("SOURCE")
             .required(true)
             .index(1))
        .arg(Arg::with_name("verbose")
             .help("Enables verbose logging")
             .long("verbose")
             .short("v"))
        .arg(Arg::with_name("pretty")
             .help("Prints the source in a normalized layout instead of running it")
             .long("pretty"))
        .arg(Arg::with_name("dump")
             .help("Prints the assembled words instead of running them")
             .long("dump"))
        .arg(Arg::with_name("strict-labels")
             .help("Rejects labels that are defined more than once")
             .long("strict-labels"))
        .arg(Arg::with_name("address")
             .help("Mailbox the program is loaded at")
             .long("address")
             .value_name("ADDRESS")
             .takes_value(true))
        .arg(Arg::with_name("max-cycles")
             .help("Stops the program after this many instructions")
             .long("max-cycles")
             .value_name("CYCLES")
             .takes_value(true))
        .arg(Arg::with_name("timeout")
             .help("Stops the program after this many milliseconds")
             .long("timeout")
             .value_name("MILLISECONDS")
             .takes_value(true))
        .get_matches()
}

fn main() {
    let args = parse_arguments();

    let logger = if args.is_present("verbose") {
        let decorator = TermDecorator::new().build();
        let drain = FullFormat::new(decorator).build().fuse();
        let drain = slog_async::Async::new(drain).build().fuse();
        Logger::root(drain, o!())
    } else {
        Logger::root(Discard, o!())
    };

    let file_path = args.value_of("source").unwrap_or_default();

    let source = match std::fs::read_to_string(file_path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("IO error: {}", e);
            std::process::exit(2);
        },
    };

    match run(&args, &source, logger) {
        Ok(()) => (),
        Err(Error::IO(io)) => eprintln!("IO error: {}", io),
        Err(Error::Assembly(e)) => eprintln!("Assembly error {}", e.verbose(&source)),
        Err(Error::Execution { error, line: Some(line) }) => {
            eprintln!("Execution error: {} (line {})", error, line)
        },
        Err(Error::Execution { error, line: None }) => eprintln!("Execution error: {}", error),
        Err(Error::Argument(e)) => eprintln!("Invalid argument: {}", e),
        Err(Error::Timeout) => eprintln!("Execution stopped before the program halted"),
    }
}

fn parse_number<T: std::str::FromStr>(args: &ArgMatches, name: &str) -> Result<Option<T>, Error> {
    match args.value_of(name) {
        Some(value) => value.parse()
            .map(Some)
            .map_err(|_| Error::Argument(format!("{} is not a valid value for --{}", value, name))),
        None => Ok(None),
    }
}

fn run(args: &ArgMatches, source: &str, logger: Logger) -> Result<(), Error> {
    let address = parse_number(args, "address")?.unwrap_or(0);
    let max_cycles = parse_number::<usize>(args, "max-cycles")?;
    let timeout = parse_number::<u64>(args, "timeout")?;

    if args.is_present("pretty") {
        let symprog = symbolic::Program::parse(source)?;
        print!("{}", symprog.pretty());
        return Ok(());
    }

    let mut options = AssemblerOptions::default();

    if args.is_present("strict-labels") {
        options = options.reject_duplicate_labels();
    }

    let program = assemble_with_logger(source, &options, logger.clone())?;

    if args.is_present("dump") {
        print!("{}", program);
        return Ok(());
    }

    let mut machine = Machine::with_logger(StdInput, StdOutput, logger);
    machine.load_program_at(&program, address)?;
    machine.context.instruction_pointer = address;

    let source_map = program.source_map
        .relocate(address)
        .into_line_based(source);

    let halted = match (max_cycles, timeout) {
        (Some(cycles), _) => machine.run_cycles(cycles),
        (None, Some(millis)) => machine.run_for(Duration::from_millis(millis)),
        (None, None) => machine.run().map(|()| true),
    };

    let halted = halted.map_err(|error| Error::Execution {
        line: source_map.line_of(error.address),
        error,
    });

    if !machine.context.output.is_empty() {
        println!();
    }

    if !halted? {
        return Err(Error::Timeout);
    }

    Ok(())
}
