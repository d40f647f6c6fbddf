//! Command line arguments for the `chanlog` binary

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chanlog::{Category, Level};

pub const USAGE: &str = "\
Usage: chanlog [OPTIONS]

Reads lines from stdin and writes each one as a log record.

Options:
  -c, --config <PATH>      Config file (default: ~/.chanlog/config.toml)
  -C, --category <NAME>    Category for every line (default: runtime)
  -l, --level <NAME>       Level for every line (default: verbose)
  -d, --logs-dir <PATH>    Override the logs directory
  -e, --echo               Mirror written records to stdout
  -v, --verbose            Print pipeline diagnostics to stderr
  -h, --help               Show this help";

/// Parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub config: Option<PathBuf>,
    pub category: Category,
    pub level: Level,
    pub logs_dir: Option<PathBuf>,
    pub echo: bool,
    pub verbose: bool,
    pub help: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            config: None,
            category: Category::Runtime,
            level: Level::Verbose,
            logs_dir: None,
            echo: false,
            verbose: false,
            help: false,
        }
    }
}

impl Args {
    /// Parse arguments, excluding the program name
    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parsed = Args::default();
        let mut iter = args.into_iter().map(Into::into);

        while let Some(arg) = iter.next() {
            let mut value = |name: &str| {
                iter.next()
                    .with_context(|| format!("Missing value for {}", name))
            };
            match arg.as_str() {
                "-c" | "--config" => parsed.config = Some(PathBuf::from(value(&arg)?)),
                "-C" | "--category" => {
                    parsed.category = value(&arg)?.parse().map_err(anyhow::Error::msg)?
                }
                "-l" | "--level" => parsed.level = value(&arg)?.parse().map_err(anyhow::Error::msg)?,
                "-d" | "--logs-dir" => parsed.logs_dir = Some(PathBuf::from(value(&arg)?)),
                "-e" | "--echo" => parsed.echo = true,
                "-v" | "--verbose" => parsed.verbose = true,
                "-h" | "--help" => parsed.help = true,
                other => bail!("Unknown argument '{}'\n\n{}", other, USAGE),
            }
        }

        Ok(parsed)
    }
}
