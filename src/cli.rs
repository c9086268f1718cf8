use anyhow::{bail, Context, Result};
use std::path::PathBuf;

/// Longest accepted `--hours` window, ten years.
pub const MAX_HOURS: i64 = 24 * 365 * 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollArgs {
    pub hours: i64,
    pub batch_size: Option<usize>,
    pub config_path: Option<PathBuf>,
    pub help: bool,
}

impl Default for PollArgs {
    fn default() -> Self {
        Self {
            hours: 24,
            batch_size: None,
            config_path: None,
            help: false,
        }
    }
}

/// Parse `freshdesk-poll` arguments.
///
/// Supported forms:
///   freshdesk-poll
///   freshdesk-poll --hours 6
///   freshdesk-poll -b 50 --config ./freshdesk.toml
pub fn parse_args(args: &[String]) -> Result<PollArgs> {
    let mut parsed = PollArgs::default();
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => parsed.help = true,
            "--hours" => {
                let value = flag_value(args, &mut i, "--hours")?;
                parsed.hours = value
                    .parse()
                    .with_context(|| format!("Invalid value for --hours: {value}"))?;
                if parsed.hours <= 0 {
                    bail!("--hours must be positive");
                }
                if parsed.hours > MAX_HOURS {
                    bail!("--hours must be at most {MAX_HOURS}");
                }
            }
            "-b" | "--batch-size" => {
                let value = flag_value(args, &mut i, "--batch-size")?;
                let size: usize = value
                    .parse()
                    .with_context(|| format!("Invalid value for --batch-size: {value}"))?;
                if size == 0 {
                    bail!("--batch-size must be at least 1");
                }
                parsed.batch_size = Some(size);
            }
            "-c" | "--config" => {
                let value = flag_value(args, &mut i, "--config")?;
                parsed.config_path = Some(PathBuf::from(value));
            }
            other => bail!("Unknown argument: {other}"),
        }
        i += 1;
    }

    Ok(parsed)
}

fn flag_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    match args.get(*i) {
        Some(value) => Ok(value.as_str()),
        None => bail!("Missing value for {flag} flag"),
    }
}

pub fn print_help() {
    println!("freshdesk-poll — pull Freshdesk tickets as indexable documents\n");
    println!("USAGE:");
    println!("  freshdesk-poll [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  --hours <n>            Window length ending now (default 24)");
    println!("  -b, --batch-size <n>   Documents per batch");
    println!("  -c, --config <path>    Config file (default ~/.freshdesk-connector/config.toml)");
    println!("  -h, --help             Show this help");
    println!();
    println!("ENVIRONMENT:");
    println!("  FD_DOMAIN, FD_API_KEY  Override credentials from the config file");
    println!("  RUST_LOG               Log filter (default info), logs go to stderr");
}
