use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use crate::direction::Direction;

pub(crate) const APP_VERSION: &str = "0.1.0";
pub(crate) const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000/translate";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

pub(crate) const USAGE: &str = "\
usage: roletalk [--endpoint <url>] [--direction <pm_to_dev|dev_to_pm>] [--log-dir <path>]

  --endpoint <url>       translate endpoint (ROLETALK_ENDPOINT)
  --direction <dir>      initial agent (ROLETALK_DIRECTION)
  --log-dir <path>       log directory (ROLETALK_LOG_DIR)
  -v, --version          print version
  -h, --help             print this help

ROLETALK_CONNECT_TIMEOUT_SECS sets the connect timeout, ROLETALK_LOG the log filter.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Config {
    pub(crate) endpoint: String,
    pub(crate) direction: Direction,
    pub(crate) log_dir: PathBuf,
    pub(crate) connect_timeout: Duration,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum CliAction {
    Run(Config),
    Version,
    Help,
}

/// Resolve flags, then `ROLETALK_*` variables, then defaults. `args`
/// excludes the program name.
pub(crate) fn from_args<F>(args: &[String], env: F) -> Result<CliAction>
where
    F: Fn(&str) -> Option<String>,
{
    let mut endpoint = None;
    let mut direction = None;
    let mut log_dir = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--version" | "-v" => return Ok(CliAction::Version),
            "--help" | "-h" => return Ok(CliAction::Help),
            "--endpoint" => endpoint = Some(flag_value(&mut iter, arg)?),
            "--direction" => direction = Some(flag_value(&mut iter, arg)?),
            "--log-dir" => log_dir = Some(flag_value(&mut iter, arg)?),
            unknown => bail!("unknown argument: {}", unknown),
        }
    }

    let endpoint = endpoint
        .or_else(|| non_blank(env("ROLETALK_ENDPOINT")))
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

    let direction = match direction.or_else(|| non_blank(env("ROLETALK_DIRECTION"))) {
        Some(raw) => Direction::parse(raw.trim())
            .ok_or_else(|| anyhow!("invalid direction: {} (expected pm_to_dev or dev_to_pm)", raw))?,
        None => Direction::default(),
    };

    let log_dir = log_dir
        .or_else(|| non_blank(env("ROLETALK_LOG_DIR")))
        .map(PathBuf::from)
        .unwrap_or_else(|| default_log_dir(env("HOME")));

    let connect_timeout = match non_blank(env("ROLETALK_CONNECT_TIMEOUT_SECS")) {
        Some(raw) => {
            let secs = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("invalid ROLETALK_CONNECT_TIMEOUT_SECS: {raw}"))?;
            Duration::from_secs(secs.max(1))
        }
        None => Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
    };

    Ok(CliAction::Run(Config {
        endpoint,
        direction,
        log_dir,
        connect_timeout,
    }))
}

fn flag_value<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str) -> Result<String> {
    iter.next()
        .cloned()
        .ok_or_else(|| anyhow!("missing value for {}", flag))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn default_log_dir(home: Option<String>) -> PathBuf {
    match home {
        Some(home) => PathBuf::from(home).join(".roletalk").join("logs"),
        None => PathBuf::from(".roletalk").join("logs"),
    }
}
