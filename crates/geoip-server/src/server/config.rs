use anyhow::bail;
use clap::{Parser, ValueEnum};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_DB_PATH: &str = "./GeoLite2-Country.mmdb";

/// Runtime configuration for the `geoip-server` binary.
///
/// Every setting is read from its environment variable (a `.env` file in the
/// working directory is loaded first) and can be overridden by the matching
/// long flag. A variable that is set but empty counts as unset.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "geoip-server",
    version,
    about = "Country allow-list checks for IP addresses over HTTP and gRPC"
)]
pub struct CliArgs {
    /// Port of the HTTP/JSON API.
    ///
    /// Environment variable: `PORT`
    #[arg(
        long,
        env = "PORT",
        default_value_t = 8080,
        value_parser = or_default(8080u16)
    )]
    pub port: u16,

    /// Port of the gRPC API.
    ///
    /// Environment variable: `GRPC_PORT`
    #[arg(
        long,
        env = "GRPC_PORT",
        default_value_t = 9090,
        value_parser = or_default(9090u16)
    )]
    pub grpc_port: u16,

    /// Path to a MaxMind DB file with country data (e.g. GeoLite2-Country).
    ///
    /// The file is read once at startup; the server refuses to start if it
    /// cannot be opened.
    ///
    /// Environment variable: `GEOIP_DB_PATH`
    #[arg(
        long,
        env = "GEOIP_DB_PATH",
        default_value = DEFAULT_DB_PATH,
        value_parser = or_default(PathBuf::from(DEFAULT_DB_PATH))
    )]
    pub db_path: PathBuf,

    /// Minimum level of emitted log events (debug, info, warn, error; any
    /// case). `RUST_LOG`, when set, takes precedence and accepts full filter
    /// directives.
    ///
    /// Environment variable: `LOG_LEVEL`
    #[arg(
        long,
        env = "LOG_LEVEL",
        default_value_t = LogLevel::Info,
        value_parser = or_default(LogLevel::Info)
    )]
    pub log_level: LogLevel,

    /// Address both listeners bind to.
    ///
    /// Environment variable: `BIND_ADDR`
    #[arg(
        long,
        env = "BIND_ADDR",
        default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        value_parser = or_default(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    )]
    pub bind_addr: IpAddr,

    /// Grace period for in-flight requests once a termination signal arrives.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT_SECS`
    #[arg(
        long,
        env = "SHUTDOWN_TIMEOUT_SECS",
        default_value_t = 30,
        value_parser = or_default(30u64)
    )]
    pub shutdown_timeout_secs: u64,

    /// Upper bound on the handling time of a single HTTP request.
    ///
    /// Environment variable: `REQUEST_TIMEOUT_SECS`
    #[arg(
        long,
        env = "REQUEST_TIMEOUT_SECS",
        default_value_t = 30,
        value_parser = or_default(30u64)
    )]
    pub request_timeout_secs: u64,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s.trim(), true)
    }
}

/// Value parser that reads an empty value as `default`, so `PORT=` in the
/// environment behaves like an unset `PORT`.
fn or_default<T>(
    default: T,
) -> impl Fn(&str) -> Result<T, String> + Clone + Send + Sync + 'static
where
    T: FromStr + Clone + Send + Sync + 'static,
    T::Err: fmt::Display,
{
    move |value: &str| match value.trim() {
        "" => Ok(default.clone()),
        value => value.parse().map_err(|e: T::Err| e.to_string()),
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_addr: SocketAddr,
    pub grpc_addr: SocketAddr,
    pub db_path: PathBuf,
    pub log_level: LogLevel,
    pub shutdown_timeout: Duration,
    pub request_timeout: Duration,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.port == 0 || args.grpc_port == 0 {
            bail!("PORT and GRPC_PORT must be greater than 0");
        }

        if args.port == args.grpc_port {
            bail!("PORT and GRPC_PORT must differ (both are {})", args.port);
        }

        if args.shutdown_timeout_secs == 0 {
            bail!("SHUTDOWN_TIMEOUT_SECS must be greater than 0");
        }

        if args.request_timeout_secs == 0 {
            bail!("REQUEST_TIMEOUT_SECS must be greater than 0");
        }

        if args.db_path.as_os_str().is_empty() {
            bail!("GEOIP_DB_PATH must not be empty");
        }

        Ok(Self {
            http_addr: SocketAddr::new(args.bind_addr, args.port),
            grpc_addr: SocketAddr::new(args.bind_addr, args.grpc_port),
            db_path: args.db_path,
            log_level: args.log_level,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout_secs),
            request_timeout: Duration::from_secs(args.request_timeout_secs),
        })
    }
}
