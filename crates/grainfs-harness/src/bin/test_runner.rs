//! Invocation surface of the grainfs test harness.
//!
//! Selection, window, and operation options resolve to one traversal over
//! the built-in corpus. All fatal errors terminate with a diagnostic and a
//! non-zero status; dynamic-filter skips are ordinary operator output.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use grainfs_emubd::TraceTarget;
use grainfs_error::{HarnessError, Result};
use grainfs_harness::corpus;
use grainfs_harness::executor::{self, EmuBackend, RunOptions};
use grainfs_harness::report;
use grainfs_harness::resolver::Override;
use grainfs_harness::scheduler::StepWindow;
use grainfs_harness::selector::Selection;
use grainfs_types::{DefineValue, TestKinds};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Operation {
    #[default]
    Run,
    Summary,
    ListSuites,
    ListCases,
    ListPaths,
    ListDefines,
    ListGeometries,
    ListDefaults,
}

#[derive(Debug, Default)]
struct CliConfig {
    op: Operation,
    selection: Selection,
    window: StepWindow,
    overrides: Vec<Override>,
    persist: Option<PathBuf>,
    trace: Option<TraceTarget>,
}

fn print_help() {
    let help = "\
test_runner - parameterized test runner for the grainfs storage engine

USAGE:
    test_runner [OPTIONS] [test_id]

The positional test_id selects suite[#case[#perm]]; a leading path and a
.toml suffix are stripped from the suite component.

OPTIONS:
    -Y, --summary              Show a quick summary
    -l, --list-suites          List test suites
    -L, --list-cases           List test cases
    --list-paths               List the catalog path for each test case
    --list-defines             List the defines for each test permutation
    --list-geometries          List the disk geometries used for testing
    --list-defaults            List the built-in default defines
    -D, --define NAME=VALUE    Override a test define (-DGEOMETRY=<name>
                               filters by geometry instead)
    -G, --geometry <NAME>      Filter by geometry
    -n, --normal               Filter for normal tests; can be combined
    -r, --reentrant            Filter for reentrant tests; can be combined
    -V, --valgrind             Filter for Valgrind tests; can be combined
    --skip <N>                 Skip the first n tests
    --count <N>                Stop after n tests
    --every <N>                Only run every n tests, after --skip
    -p, --persist <PATH>       Persist the disk image to this file
    -t, --trace <PATH|->       Redirect device trace output
    -h, --help                 Show this help
";
    println!("{help}");
}

fn parse_value(text: &str) -> Option<DefineValue> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let magnitude = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16)
    } else if let Some(oct) = digits.strip_prefix("0o") {
        i64::from_str_radix(oct, 8)
    } else if let Some(bin) = digits.strip_prefix("0b") {
        i64::from_str_radix(bin, 2)
    } else {
        digits.parse::<i64>()
    }
    .ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn parse_count(option: &'static str, text: &str) -> Result<u64> {
    match parse_value(text) {
        Some(value) if value >= 0 => Ok(value as u64),
        _ => Err(HarnessError::InvalidNumber {
            option,
            value: text.to_owned(),
        }),
    }
}

fn parse_override(
    arg: &str,
    selection: &mut Selection,
    overrides: &mut Vec<Override>,
) -> Result<()> {
    // Reserved name: -DGEOMETRY=<name> routes to the geometry filter.
    if let Some(name) = arg.strip_prefix("GEOMETRY=") {
        selection.geometry = Some(name.to_owned());
        return Ok(());
    }

    let Some((name, value)) = arg.split_once('=') else {
        return Err(HarnessError::InvalidOverride(arg.to_owned()));
    };
    let value = parse_value(value).ok_or_else(|| HarnessError::InvalidOverride(arg.to_owned()))?;
    overrides.push(Override {
        name: name.to_owned(),
        value,
    });
    Ok(())
}

fn parse_test_identifier(arg: &str, selection: &mut Selection) -> Result<()> {
    let mut suite = arg;
    if let Some((head, rest)) = arg.split_once('#') {
        suite = head;
        if let Some((case, perm)) = rest.split_once('#') {
            let parsed: u64 = perm
                .parse()
                .map_err(|_| HarnessError::InvalidTestIdentifier)?;
            selection.perm = Some(parsed);
            selection.case = Some(case.to_owned());
        } else {
            selection.case = Some(rest.to_owned());
        }
    }

    // Strip an optional path prefix and catalog-file suffix.
    let mut suite = suite.rsplit('/').next().unwrap_or(suite);
    if let Some(stem) = suite.strip_suffix(".toml") {
        if !stem.is_empty() {
            suite = stem;
        }
    }
    selection.suite = Some(suite.to_owned());
    Ok(())
}

fn open_trace(text: &str) -> Result<TraceTarget> {
    if text == "-" {
        return Ok(TraceTarget::Stdout);
    }
    let path = PathBuf::from(text);
    // Truncate up front; provisioned devices append to the same stream.
    fs::File::create(&path)
        .map_err(|err| HarnessError::TraceOpen(-err.raw_os_error().unwrap_or(5)))?;
    Ok(TraceTarget::File(path))
}

fn parse_args(args: &[String]) -> Result<Option<CliConfig>> {
    let mut config = CliConfig::default();
    let mut positional: Option<&str> = None;

    let mut index = 0;
    while index < args.len() {
        let arg = args[index].as_str();

        // Long options may carry their value after '='; short value
        // options may carry it attached, getopt-style (-DNAME=1).
        let (mut opt, mut attached) = match arg.split_once('=') {
            Some((head, tail)) if arg.starts_with("--") => (head, Some(tail.to_owned())),
            _ => (arg, None),
        };
        if attached.is_none() {
            if let (Some(prefix), Some(rest)) = (arg.get(..2), arg.get(2..)) {
                if !rest.is_empty() && ["-D", "-G", "-p", "-t"].contains(&prefix) {
                    opt = prefix;
                    attached = Some(rest.to_owned());
                }
            }
        }

        let mut value = |option: &'static str| -> Result<String> {
            if let Some(text) = attached.take() {
                return Ok(text);
            }
            index += 1;
            args.get(index)
                .cloned()
                .ok_or(HarnessError::MissingValue(option))
        };

        match opt {
            "-h" | "--help" => {
                print_help();
                return Ok(None);
            }
            "-Y" | "--summary" => config.op = Operation::Summary,
            "-l" | "--list-suites" => config.op = Operation::ListSuites,
            "-L" | "--list-cases" => config.op = Operation::ListCases,
            "--list-paths" => config.op = Operation::ListPaths,
            "--list-defines" => config.op = Operation::ListDefines,
            "--list-geometries" => config.op = Operation::ListGeometries,
            "--list-defaults" => config.op = Operation::ListDefaults,
            "-D" | "--define" => {
                let text = value("--define")?;
                parse_override(&text, &mut config.selection, &mut config.overrides)?;
            }
            "-G" | "--geometry" => {
                config.selection.geometry = Some(value("--geometry")?);
            }
            "-n" | "--normal" => config.selection.kinds |= TestKinds::NORMAL,
            "-r" | "--reentrant" => config.selection.kinds |= TestKinds::REENTRANT,
            "-V" | "--valgrind" => config.selection.kinds |= TestKinds::VALGRIND,
            "--skip" => config.window.skip = parse_count("skip", &value("--skip")?)?,
            "--count" => config.window.count = parse_count("count", &value("--count")?)?,
            "--every" => {
                let every = parse_count("every", &value("--every")?)?;
                if every == 0 {
                    return Err(HarnessError::InvalidNumber {
                        option: "every",
                        value: "0".to_owned(),
                    });
                }
                config.window.every = every;
            }
            "-p" | "--persist" => config.persist = Some(PathBuf::from(value("--persist")?)),
            "-t" | "--trace" => config.trace = Some(open_trace(&value("--trace")?)?),
            other if other.starts_with('-') && other.len() > 1 => {
                return Err(HarnessError::UnknownOption(other.to_owned()));
            }
            _ => {
                if positional.is_some() {
                    return Err(HarnessError::ExtraTestIdentifier);
                }
                positional = Some(arg);
            }
        }
        index += 1;
    }

    if let Some(identifier) = positional {
        parse_test_identifier(identifier, &mut config.selection)?;
    }
    Ok(Some(config))
}

fn run(args: &[String]) -> Result<()> {
    let Some(config) = parse_args(args)? else {
        return Ok(());
    };

    let catalog = corpus::catalog();
    match config.op {
        Operation::Run => {
            let opts = RunOptions {
                persist: config.persist,
                trace: config.trace,
            };
            let mut backend = EmuBackend;
            executor::run(
                catalog,
                &config.overrides,
                &config.selection,
                config.window,
                &mut backend,
                &opts,
            )?;
        }
        Operation::Summary => {
            println!(
                "{}",
                report::render_summary(catalog, &config.overrides, &config.selection)
            );
        }
        Operation::ListSuites => {
            println!(
                "{}",
                report::render_suites(catalog, &config.overrides, &config.selection)
            );
        }
        Operation::ListCases => {
            println!(
                "{}",
                report::render_cases(catalog, &config.overrides, &config.selection)
            );
        }
        Operation::ListPaths => {
            println!("{}", report::render_paths(catalog, &config.selection));
        }
        Operation::ListDefines => {
            println!(
                "{}",
                report::render_defines(catalog, &config.overrides, &config.selection)?
            );
        }
        Operation::ListGeometries => {
            println!(
                "{}",
                report::render_geometries(catalog, &config.overrides, &config.selection)?
            );
        }
        Operation::ListDefaults => {
            println!("{}", report::render_defaults(&config.overrides)?);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
