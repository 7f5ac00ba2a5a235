//! `groupjoin`: benchmark runs and synthetic data generation for the group-join workspace.

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use gjoin_error::GroupJoinError;
use gjoin_harness::{GenerateConfig, KeyDistribution, RunConfig, RunMode, execute, write_generated};
use gjoin_types::SchemaPreset;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "groupjoin=info,gjoin=info";
const VERBOSE_FILTER: &str = "groupjoin=debug,gjoin=debug";

/// Exit status for usage and configuration errors.
const EXIT_USAGE: u8 = 2;

#[derive(Debug, PartialEq)]
enum Command {
    Run { config: RunConfig, verbose: bool },
    Generate { config: GenerateConfig, verbose: bool },
    Help,
}

fn print_help() {
    let help = "\
groupjoin: equi-join + group-by-sum, hash join vs. pre-aggregation

USAGE:
    groupjoin run [OPTIONS]
    groupjoin generate [OPTIONS]

RUN OPTIONS:
    --a <PATH>              Relation A file (default A.txt)
    --b <PATH>              Relation B file (default B.txt)
    --mode <MODE>           compare|hash-join|pre-aggregate (default compare)
    --schema <PRESET>       narrow|wide|wide-shifted (default narrow)
    --b-key-position <N>    Override the key position of relation B
    --delimiter <CHAR>      Field delimiter (default ,; `tab` or \\t for tab)
    --skip-header           Ignore the first line of each input
    --out-hash <PATH>       Hash-join result in compare mode (default As.txt)
    --out-pre <PATH>        Pre-aggregate result in compare mode (default Bs.txt)
    --out <PATH>            Result of a single-strategy run (default results.txt)
    --report <PATH>         Write a JSON run report
    --display               Render result tables on stdout
    --config <PATH>         Load run configuration JSON; flags override it
    -v, --verbose           Debug logging

GENERATE OPTIONS:
    --rows-a <N>            Rows in relation A (default 10000)
    --rows-b <N>            Rows in relation B (default 10000)
    --distribution <KIND>   pooled|random|uniqueness (default pooled)
    --uniqueness <F>        Distinct-key ratio in [0, 1] (default 0.9)
    --seed <N>              RNG seed (default 0)
    --a <PATH>              Relation A output (default A.txt)
    --b <PATH>              Relation B output (default B.txt)
    --delimiter <CHAR>      Field delimiter for A (default ,)
    -v, --verbose           Debug logging

    -h, --help              Show this help

EXIT STATUS:
    0 success, 1 data error, 2 usage or configuration error, 3 strategy mismatch
";
    println!("{help}");
}

fn take_value<'a>(args: &'a [String], index: &mut usize, flag: &str) -> Result<&'a str, String> {
    *index += 1;
    args.get(*index)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn parse_number<T: std::str::FromStr>(value: &str, flag: &str) -> Result<T, String> {
    value
        .parse::<T>()
        .map_err(|_| format!("invalid {flag} value: {value}"))
}

fn parse_delimiter(value: &str) -> Result<char, String> {
    if matches!(value, "tab" | "\\t") {
        return Ok('\t');
    }
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!("--delimiter must be a single character, got `{value}`")),
    }
}

/// Flags given for `run`. Applied on top of the defaults or a `--config` file.
#[derive(Debug, Default)]
struct RunOverrides {
    config_path: Option<PathBuf>,
    a_path: Option<PathBuf>,
    b_path: Option<PathBuf>,
    mode: Option<RunMode>,
    schema: Option<SchemaPreset>,
    b_key_position: Option<usize>,
    delimiter: Option<char>,
    skip_header: bool,
    out_hash: Option<PathBuf>,
    out_pre: Option<PathBuf>,
    out: Option<PathBuf>,
    report: Option<PathBuf>,
    display: bool,
}

impl RunOverrides {
    fn resolve(self) -> Result<RunConfig, String> {
        let mut config = match &self.config_path {
            Some(path) => RunConfig::load(path).map_err(|error| error.to_string())?,
            None => RunConfig::default(),
        };
        if let Some(path) = self.a_path {
            config.a_path = path;
        }
        if let Some(path) = self.b_path {
            config.b_path = path;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(schema) = self.schema {
            config.schema = schema;
        }
        if self.b_key_position.is_some() {
            config.b_key_position = self.b_key_position;
        }
        if let Some(delimiter) = self.delimiter {
            config.delimiter = delimiter;
        }
        config.skip_header |= self.skip_header;
        if let Some(path) = self.out_hash {
            config.out_hash = path;
        }
        if let Some(path) = self.out_pre {
            config.out_pre = path;
        }
        if let Some(path) = self.out {
            config.out = path;
        }
        if self.report.is_some() {
            config.report = self.report;
        }
        config.display |= self.display;
        config.validate().map_err(|error| error.to_string())?;
        Ok(config)
    }
}

fn parse_run_args(args: &[String]) -> Result<Command, String> {
    let mut overrides = RunOverrides::default();
    let mut verbose = false;

    let mut index = 0;
    while index < args.len() {
        let flag = args[index].as_str();
        match flag {
            "--a" => overrides.a_path = Some(PathBuf::from(take_value(args, &mut index, flag)?)),
            "--b" => overrides.b_path = Some(PathBuf::from(take_value(args, &mut index, flag)?)),
            "--mode" => {
                let value = take_value(args, &mut index, flag)?;
                overrides.mode = Some(value.parse().map_err(|e: GroupJoinError| e.to_string())?);
            }
            "--schema" => {
                let value = take_value(args, &mut index, flag)?;
                overrides.schema = Some(value.parse().map_err(|e: GroupJoinError| e.to_string())?);
            }
            "--b-key-position" => {
                let value = take_value(args, &mut index, flag)?;
                overrides.b_key_position = Some(parse_number(value, flag)?);
            }
            "--delimiter" => {
                overrides.delimiter = Some(parse_delimiter(take_value(args, &mut index, flag)?)?);
            }
            "--skip-header" => overrides.skip_header = true,
            "--out-hash" => {
                overrides.out_hash = Some(PathBuf::from(take_value(args, &mut index, flag)?));
            }
            "--out-pre" => {
                overrides.out_pre = Some(PathBuf::from(take_value(args, &mut index, flag)?));
            }
            "--out" => overrides.out = Some(PathBuf::from(take_value(args, &mut index, flag)?)),
            "--report" => {
                overrides.report = Some(PathBuf::from(take_value(args, &mut index, flag)?));
            }
            "--display" => overrides.display = true,
            "--config" => {
                overrides.config_path = Some(PathBuf::from(take_value(args, &mut index, flag)?));
            }
            "-v" | "--verbose" => verbose = true,
            "-h" | "--help" => return Ok(Command::Help),
            unknown => return Err(format!("unknown run option: {unknown}")),
        }
        index += 1;
    }

    Ok(Command::Run {
        config: overrides.resolve()?,
        verbose,
    })
}

fn parse_generate_args(args: &[String]) -> Result<Command, String> {
    let mut config = GenerateConfig::default();
    let mut distribution = "pooled".to_owned();
    let mut uniqueness = 0.9_f64;
    let mut verbose = false;

    let mut index = 0;
    while index < args.len() {
        let flag = args[index].as_str();
        match flag {
            "--rows-a" => config.rows_a = parse_number(take_value(args, &mut index, flag)?, flag)?,
            "--rows-b" => config.rows_b = parse_number(take_value(args, &mut index, flag)?, flag)?,
            "--distribution" => {
                distribution = take_value(args, &mut index, flag)?.to_ascii_lowercase();
            }
            "--uniqueness" => uniqueness = parse_number(take_value(args, &mut index, flag)?, flag)?,
            "--seed" => config.seed = parse_number(take_value(args, &mut index, flag)?, flag)?,
            "--a" => config.a_path = PathBuf::from(take_value(args, &mut index, flag)?),
            "--b" => config.b_path = PathBuf::from(take_value(args, &mut index, flag)?),
            "--delimiter" => {
                let delimiter = parse_delimiter(take_value(args, &mut index, flag)?)?;
                config.delimiter = u8::try_from(u32::from(delimiter))
                    .map_err(|_| format!("--delimiter must be ASCII, got {delimiter:?}"))?;
            }
            "-v" | "--verbose" => verbose = true,
            "-h" | "--help" => return Ok(Command::Help),
            unknown => return Err(format!("unknown generate option: {unknown}")),
        }
        index += 1;
    }

    config.distribution = match distribution.as_str() {
        "pooled" | "simple" => KeyDistribution::Pooled,
        "random" => KeyDistribution::Random,
        "uniqueness" => KeyDistribution::Uniqueness(uniqueness),
        other => {
            return Err(format!(
                "invalid --distribution value: {other} (expected pooled|random|uniqueness)"
            ));
        }
    };
    config.distribution.validate().map_err(|error| error.to_string())?;
    Ok(Command::Generate { config, verbose })
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    match args.first().map(String::as_str) {
        None | Some("-h" | "--help" | "help") => Ok(Command::Help),
        Some("run") => parse_run_args(&args[1..]),
        Some("generate") => parse_generate_args(&args[1..]),
        Some(other) => Err(format!("unknown command: {other} (expected run|generate)")),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };
    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn exit_for(error: &GroupJoinError) -> ExitCode {
    if error.is_fatal() {
        error!(error = %error, "run failed");
    } else {
        warn!(error = %error, "run stopped on a recoverable error");
    }
    eprintln!("ERROR groupjoin: {error}");
    ExitCode::from(error.exit_code())
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("ERROR groupjoin: {message}");
            eprintln!("run `groupjoin --help` for usage");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    match command {
        Command::Help => {
            print_help();
            ExitCode::SUCCESS
        }
        Command::Run { config, verbose } => {
            init_tracing(verbose);
            let stdout = io::stdout();
            let mut status = stdout.lock();
            let outcome = execute(&config, &mut status);
            let _ = status.flush();
            match outcome {
                Ok(outcome) => {
                    info!(mode = config.mode.as_str(), "run finished");
                    ExitCode::from(outcome.exit_code())
                }
                Err(error) => exit_for(&error),
            }
        }
        Command::Generate { config, verbose } => {
            init_tracing(verbose);
            match write_generated(&config) {
                Ok(generated) => {
                    println!(
                        "Generated {} rows in {} and {} rows in {}",
                        generated.a.len(),
                        config.a_path.display(),
                        generated.b.len(),
                        config.b_path.display()
                    );
                    ExitCode::SUCCESS
                }
                Err(error) => exit_for(&error),
            }
        }
    }
}
