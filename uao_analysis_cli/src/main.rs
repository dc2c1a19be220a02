use clap::{Arg, ArgAction, ArgMatches, Command};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use libuao_analysis::config::{Config, Side};
use libuao_analysis::error::ConfigError;
use libuao_analysis::log_source::LogDirectory;
use libuao_analysis::process::process;

fn make_template_config(path: &Path) -> Result<(), ConfigError> {
    let config = Config::default();
    let yaml_str = serde_yaml::to_string(&config)?;
    let mut file = File::create(path)?;
    file.write_all(yaml_str.as_bytes())?;
    Ok(())
}

fn cli() -> Command {
    Command::new("uao_analysis")
        .about("Command statistics for the AO system of one telescope side over one day")
        .arg_required_else_help(true)
        .args_conflicts_with_subcommands(true)
        .subcommand(
            Command::new("new")
                .about("Make a template configuration yaml file")
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .required(true)
                        .help("Path to the file"),
                ),
        )
        .arg(
            Arg::new("day")
                .required_unless_present("config")
                .help("Day to analyse (YYYYMMDD)"),
        )
        .arg(
            Arg::new("side")
                .required_unless_present("config")
                .value_parser(["R", "L"])
                .help("Telescope side"),
        )
        .arg(
            Arg::new("logdir")
                .required_unless_present("config")
                .help("Root of the log tree"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .conflicts_with_all(["day", "side", "logdir"])
                .help("Read the configuration from a yaml file"),
        )
        .arg(
            Arg::new("html")
                .long("html")
                .action(ArgAction::SetTrue)
                .help("Write the report as HTML"),
        )
        .arg(
            Arg::new("outdir")
                .long("outdir")
                .default_value(".")
                .help("Directory holding the csv tables"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Print debug messages"),
        )
}

/// Build the Config from either the yaml file or the positional arguments.
/// Flags given on the command line take precedence over the file.
fn make_config(matches: &ArgMatches) -> Result<Config, ConfigError> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::read_config_file(Path::new(path))?,
        None => Config {
            day: matches.get_one::<String>("day").cloned().unwrap_or_default(),
            side: matches
                .get_one::<String>("side")
                .map(|s| s.parse::<Side>())
                .transpose()?
                .unwrap_or_default(),
            log_path: matches
                .get_one::<String>("logdir")
                .map(PathBuf::from)
                .unwrap_or_default(),
            ..Default::default()
        },
    };

    if matches.get_flag("html") {
        config.html = true;
    }
    if matches.get_flag("verbose") {
        config.verbose = true;
    }
    if matches.value_source("outdir") == Some(clap::parser::ValueSource::CommandLine)
        || matches.get_one::<String>("config").is_none()
    {
        if let Some(outdir) = matches.get_one::<String>("outdir") {
            config.output_path = PathBuf::from(outdir);
        }
    }

    config.validate()?;
    Ok(config)
}

fn init_logger(verbose: bool) {
    let level = if verbose {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };
    // stdout carries the report
    if let Err(e) = simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    ) {
        eprintln!("Could not create logging: {e}");
    }
}

fn main() {
    let matches = cli().get_matches();

    if let Some(("new", sub)) = matches.subcommand() {
        init_logger(false);
        let config_path = sub
            .get_one::<String>("config")
            .map(PathBuf::from)
            .unwrap_or_default();
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        if let Err(e) = make_template_config(&config_path) {
            log::error!("{e}");
            std::process::exit(1);
        }
        log::info!("Done.");
        return;
    }

    let config = match make_config(&matches) {
        Ok(c) => c,
        Err(e) => {
            init_logger(matches.get_flag("verbose"));
            log::error!("{e}");
            std::process::exit(1);
        }
    };
    init_logger(config.verbose);

    log::info!("Day: {} Side: {}", config.day, config.side);
    log::info!("Log Path: {}", config.log_path.to_string_lossy());
    log::info!("Output Path: {}", config.output_path.to_string_lossy());

    let source = LogDirectory::new(&config);
    let out = BufWriter::new(std::io::stdout().lock());
    if let Err(e) = process(&config, &source, out) {
        log::error!("Analysis failed with error: {e}");
        std::process::exit(1);
    }
    log::info!("Done.");
}
