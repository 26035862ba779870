mod output;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Arg, ArgAction, ArgMatches, Command};
use reform_core::ir::interp::Scenario;
use reform_core::policy::{self, SpecRevision};
use reform_core::{EnterCancellation, ReformConfig, ReformErrorExt, Script, generate_error_report};

use output::{OutputError, OutputHandler};

fn main() -> ExitCode {
    let cli = Command::new("reform")
        .version("0.1.0")
        .about("Lower resource-management blocks into primitive IR");

    let cli = setup_cli(cli);
    let matches = cli.get_matches();
    let mut out = OutputHandler::new(std::io::stdout());
    match dispatch_commands(&matches, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let mut err_out = OutputHandler::new(std::io::stderr());
            let _ = err_out.error(&generate_error_report(err.as_ref()));
            ExitCode::FAILURE
        }
    }
}

fn revision_arg() -> Arg {
    Arg::new("revision")
        .help("Protocol revision to lower for, e.g. 3.8")
        .short('r')
        .long("revision")
        .value_parser(clap::value_parser!(String))
        .value_name("REVISION")
}

fn lowering_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("file")
            .help("The fixture script to lower")
            .required(true)
            .index(1),
    )
    .arg(revision_arg())
    .arg(
        Arg::new("strict-legacy")
            .help("Keep construct positions for exit-related nodes below 3.8")
            .long("strict-legacy")
            .action(ArgAction::SetTrue),
    )
    .arg(
        Arg::new("cancel-enter")
            .help("Behaviour when an async enter is cancelled: propagate or attempt-exit")
            .long("cancel-enter")
            .value_parser(["propagate", "attempt-exit"])
            .value_name("MODE"),
    )
    .arg(
        Arg::new("config")
            .help("JSON configuration file; flags override its values")
            .short('c')
            .long("config")
            .value_parser(clap::value_parser!(String))
            .value_name("FILE"),
    )
}

/// Sets up the CLI with subcommands and arguments.
fn setup_cli(cli: Command) -> Command {
    cli.subcommand_required(true)
        .subcommand(
            lowering_args(Command::new("lower").about("Lower a script and print the produced IR"))
                .arg(
                    Arg::new("format")
                        .help("Output format")
                        .short('f')
                        .long("format")
                        .value_parser(["tree", "json"])
                        .default_value("tree")
                        .value_name("FORMAT"),
                )
                .arg(
                    Arg::new("output")
                        .help("Write the IR to this file instead of stdout")
                        .short('o')
                        .long("output")
                        .value_parser(clap::value_parser!(String))
                        .value_name("FILE"),
                ),
        )
        .subcommand(
            Command::new("policy")
                .about("Show the resolved protocol policy")
                .arg(revision_arg())
                .arg(
                    Arg::new("async")
                        .help("Resolve for an async construct")
                        .long("async")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("strict-legacy")
                        .help("Resolve with strict legacy diagnostics")
                        .long("strict-legacy")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            lowering_args(Command::new("trace").about("Lower a script and simulate it"))
                .arg(
                    Arg::new("raise")
                        .help("Calling NAME raises")
                        .long("raise")
                        .action(ArgAction::Append)
                        .value_name("NAME"),
                )
                .arg(
                    Arg::new("suppress")
                        .help("The exit hook of manager NAME suppresses exceptions")
                        .long("suppress")
                        .action(ArgAction::Append)
                        .value_name("NAME"),
                )
                .arg(
                    Arg::new("exit-raises")
                        .help("The exit hook of manager NAME raises")
                        .long("exit-raises")
                        .action(ArgAction::Append)
                        .value_name("NAME"),
                )
                .arg(
                    Arg::new("enter-raises")
                        .help("The enter hook of manager NAME raises")
                        .long("enter-raises")
                        .action(ArgAction::Append)
                        .value_name("NAME"),
                )
                .arg(
                    Arg::new("cancel")
                        .help("Cancel the task while suspended on the enter of manager NAME")
                        .long("cancel")
                        .action(ArgAction::Append)
                        .value_name("NAME"),
                ),
        )
}

fn io_error(err: std::io::Error) -> Box<dyn ReformErrorExt> {
    OutputError::from(err).into()
}

fn parse_revision(text: &str) -> Result<SpecRevision, Box<dyn ReformErrorExt>> {
    text.parse::<SpecRevision>().map_err(|e| e.into())
}

/// Build the config from `--config` and then apply flag overrides.
fn config_from_matches(sub_m: &ArgMatches) -> Result<ReformConfig, Box<dyn ReformErrorExt>> {
    let mut config = match sub_m.get_one::<String>("config") {
        Some(path) => ReformConfig::load_from_file(path)?,
        None => ReformConfig::default(),
    };
    if let Some(revision) = sub_m.get_one::<String>("revision") {
        config.revision = parse_revision(revision)?;
    }
    if sub_m.get_flag("strict-legacy") {
        config.strict_legacy_diagnostics = true;
    }
    if let Some(mode) = sub_m.get_one::<String>("cancel-enter") {
        // clap only lets the listed modes through
        config.enter_cancellation = mode
            .parse::<EnterCancellation>()
            .map_err(|message| reform_core::ContractViolation::new(message, "reform.cli", None))?;
    }
    log::debug!("effective configuration: {:?}", config);
    Ok(config)
}

fn load_script(sub_m: &ArgMatches) -> Result<Script, Box<dyn ReformErrorExt>> {
    let file = sub_m.get_one::<String>("file").map(String::as_str).unwrap_or_default();
    Script::new(PathBuf::from(file))
}

fn names(sub_m: &ArgMatches, id: &str) -> Vec<String> {
    sub_m
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

/// Dispatches the command based on the parsed arguments.
fn dispatch_commands<W: std::io::Write>(
    matches: &ArgMatches,
    out: &mut OutputHandler<W>,
) -> Result<(), Box<dyn ReformErrorExt>> {
    match matches.subcommand() {
        Some(("lower", sub_m)) => {
            let config = config_from_matches(sub_m)?;
            let script = load_script(sub_m)?;
            let module = reform_core::reformulate_source(&script, config)?;

            let rendered = match sub_m.get_one::<String>("format").map(String::as_str) {
                Some("json") => serde_json::to_string_pretty(&module)
                    .map_err(|e| OutputError::new(format!("failed to serialize IR: {}", e)))?,
                _ => module.to_string(),
            };

            match sub_m.get_one::<String>("output") {
                Some(path) => {
                    fs::write(path, rendered).map_err(io_error)?;
                    out.success(&format!("wrote IR for {} to {}", script.name, path))
                        .map_err(io_error)?;
                }
                None => out.raw(&rendered).map_err(io_error)?,
            }
            Ok(())
        }
        Some(("policy", sub_m)) => {
            let strict = sub_m.get_flag("strict-legacy");
            match sub_m.get_one::<String>("revision") {
                Some(revision) => {
                    let revision = parse_revision(revision)?;
                    let is_async = sub_m.get_flag("async");
                    let resolved = policy::resolve(revision, is_async, strict)?;
                    let table = output::policy_table(&[(revision, is_async, resolved)]);
                    out.raw(&table.to_string()).map_err(io_error)?;
                }
                None => {
                    out.title("policy matrix").map_err(io_error)?;
                    let table = output::policy_table(&policy::policy_matrix(strict));
                    out.raw(&table.to_string()).map_err(io_error)?;
                }
            }
            Ok(())
        }
        Some(("trace", sub_m)) => {
            let config = config_from_matches(sub_m)?;
            let script = load_script(sub_m)?;
            let module = reform_core::reformulate_source(&script, config)?;

            let mut scenario = Scenario::new();
            for name in names(sub_m, "raise") {
                scenario = scenario.raising(&name);
            }
            for name in names(sub_m, "suppress") {
                scenario = scenario.suppressing(&name);
            }
            for name in names(sub_m, "exit-raises") {
                scenario = scenario.exit_raising(&name);
            }
            for name in names(sub_m, "enter-raises") {
                scenario = scenario.enter_raising(&name);
            }
            for name in names(sub_m, "cancel") {
                scenario = scenario.cancel_enter(&name);
            }

            let trace = reform_core::simulate_all(module.get_body(), &scenario)?;
            out.title(&format!("trace of {} (revision {})", script.name, module.revision))
                .map_err(io_error)?;
            out.raw(&trace.to_string()).map_err(io_error)?;
            match trace.raised() {
                Some(exc) => out.warning(&format!("escaped: {}", exc)).map_err(io_error)?,
                None => out.info("completed normally").map_err(io_error)?,
            }
            Ok(())
        }
        _ => {
            out.message("No valid subcommand was used. Use --help for more information.")
                .map_err(io_error)?;
            Ok(())
        }
    }
}
