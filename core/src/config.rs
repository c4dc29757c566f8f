/// Configuration management
use crate::error::{Result, SiteError};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 5000;
const CONTACTS_FILE: &str = "contacts.json";

/// Site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Listening address
    pub listen_addr: SocketAddr,

    /// Directory holding `contacts.json` (created on demand)
    pub data_dir: PathBuf,

    /// Directory with the page templates
    pub templates_dir: PathBuf,

    /// Directory served under `/static/`
    pub static_dir: PathBuf,

    /// Return raw internal error text to API clients
    pub expose_errors: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            data_dir: PathBuf::from("data"),
            templates_dir: PathBuf::from("templates"),
            static_dir: PathBuf::from("static"),
            expose_errors: true,
        }
    }
}

impl Config {
    /// Create config from command line arguments and the process environment
    pub fn from_args(args: &[String]) -> Result<Self> {
        Self::from_args_with_env(args, |key| std::env::var(key).ok())
    }

    /// Same as `from_args`, reading environment overrides through `env`
    pub fn from_args_with_env<E>(args: &[String], env: E) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let mut port: Option<u16> = None;
        let mut bind: Option<IpAddr> = None;
        let mut data_dir: Option<PathBuf> = None;
        let mut templates_dir: Option<PathBuf> = None;
        let mut static_dir: Option<PathBuf> = None;
        let mut expose_errors = true;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--bind" => {
                    let ip = flag_value(args, i, "--bind", "an address")?;
                    bind = Some(ip.parse::<IpAddr>().map_err(|_| {
                        SiteError::Config(format!("--bind must be an IP address, got '{}'", ip))
                    })?);
                    i += 2;
                }
                "--data-dir" => {
                    data_dir = Some(PathBuf::from(flag_value(args, i, "--data-dir", "a path")?));
                    i += 2;
                }
                "--templates" => {
                    templates_dir = Some(PathBuf::from(flag_value(args, i, "--templates", "a path")?));
                    i += 2;
                }
                "--static" => {
                    static_dir = Some(PathBuf::from(flag_value(args, i, "--static", "a path")?));
                    i += 2;
                }
                "--hide-errors" => {
                    expose_errors = false;
                    i += 1;
                }
                other if other.starts_with("--") => {
                    return Err(SiteError::Config(format!(
                        "Unknown flag '{}'\n{}",
                        other,
                        usage(args)
                    )));
                }
                other => {
                    if port.is_some() {
                        return Err(SiteError::Config(format!(
                            "Unexpected argument '{}'\n{}",
                            other,
                            usage(args)
                        )));
                    }
                    port = Some(parse_port(other)?);
                    i += 1;
                }
            }
        }

        // Env overrides (handy for containers)
        if let Some(p) = env("EVENTSITE_PORT") {
            port = Some(parse_port(&p)?);
        }
        if let Some(dir) = env("EVENTSITE_DATA_DIR") {
            data_dir = Some(PathBuf::from(dir));
        }
        if let Some(hide) = env("EVENTSITE_HIDE_ERRORS") {
            expose_errors = !parse_flag("EVENTSITE_HIDE_ERRORS", &hide)?;
        }

        let defaults = Self::default();
        let listen_addr = SocketAddr::new(
            bind.unwrap_or_else(|| defaults.listen_addr.ip()),
            port.unwrap_or(DEFAULT_PORT),
        );

        Ok(Self {
            listen_addr,
            data_dir: data_dir.unwrap_or(defaults.data_dir),
            templates_dir: templates_dir.unwrap_or(defaults.templates_dir),
            static_dir: static_dir.unwrap_or(defaults.static_dir),
            expose_errors,
        })
    }

    /// Path of the persisted contact collection
    pub fn contacts_path(&self) -> PathBuf {
        self.data_dir.join(CONTACTS_FILE)
    }
}

fn flag_value<'a>(args: &'a [String], i: usize, flag: &str, what: &str) -> Result<&'a str> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| SiteError::Config(format!("{} requires {} argument", flag, what)))
}

fn parse_port(raw: &str) -> Result<u16> {
    raw.parse::<u16>()
        .map_err(|_| SiteError::Config("Port must be a valid number (0-65535)".to_string()))
}

fn parse_flag(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(SiteError::Config(format!(
            "{} must be a boolean (1/0, true/false, yes/no, on/off), got '{}'",
            name, other
        ))),
    }
}

fn usage(args: &[String]) -> String {
    format!(
        "Usage: {} [port] [--bind <ip>] [--data-dir <path>] [--templates <path>] [--static <path>] [--hide-errors]",
        args.first().map(String::as_str).unwrap_or("eventsite")
    )
}
