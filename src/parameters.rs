//! Connection parameters.
//!
//! This module defines [`ConnectionParameters`], the validated and immutable description
//! of how to reach a server, and [`RawParameters`], its unchecked counterpart.
//!
//! Validation runs once, at construction, and only checks what the link needs to
//! exist at all: the scheme must be `tcp` or `unix`, and a `unix` link must name a
//! socket path. Every other value is carried as-is and interpreted by the transport
//! factories.
//!
//! # Example
//! ```rust
//! use keylink::{ConnectionParameters, Scheme};
//!
//! let params: ConnectionParameters = "tcp://cache.local:6380?database=2".parse().unwrap();
//! assert_eq!(params.scheme(), Scheme::Tcp);
//! assert_eq!(params.identifier(), "cache.local:6380");
//! assert_eq!(params.database(), Some(2));
//! ```
use std::{fmt, str::FromStr, time::Duration};

use bincode::{Decode, Encode};
use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::ConfigurationError;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 6379;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport scheme of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub enum Scheme {
    Tcp,
    Unix,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Tcp => "tcp",
            Scheme::Unix => "unix",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Scheme::Tcp),
            "unix" => Ok(Scheme::Unix),
            other => Err(ConfigurationError::UnsupportedScheme(other.to_string())),
        }
    }
}

/// Unchecked parameters, as handed over by a caller or a config layer.
///
/// Missing values fall back to defaults during [`ConnectionParameters::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParameters {
    /// `tcp` (default) or `unix`.
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Socket path, required for `unix`.
    pub path: Option<String>,
    /// Connect timeout.
    pub timeout: Option<Duration>,
    /// Socket read and write timeout. Zero means none.
    pub read_write_timeout: Option<Duration>,
    pub tcp_nodelay: Option<bool>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<u32>,
}

/// Validated, immutable connection parameters.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ConnectionParameters {
    scheme: Scheme,
    host: String,
    port: u16,
    path: Option<String>,
    timeout: Duration,
    read_write_timeout: Option<Duration>,
    tcp_nodelay: bool,
    username: Option<String>,
    password: Option<String>,
    database: Option<u32>,
}

impl ConnectionParameters {
    /// Checks raw parameters and fills in defaults.
    ///
    /// # Errors
    /// - [`ConfigurationError::UnsupportedScheme`] for any scheme but `tcp`/`unix`.
    /// - [`ConfigurationError::MissingPath`] for `unix` without a non-empty path.
    pub fn validate(raw: RawParameters) -> Result<Self, ConfigurationError> {
        let scheme = match raw.scheme.as_deref() {
            Some(scheme) => scheme.parse()?,
            None => Scheme::Tcp,
        };

        let path = raw.path.filter(|p| !p.is_empty());
        if scheme == Scheme::Unix && path.is_none() {
            return Err(ConfigurationError::MissingPath);
        }

        Ok(Self {
            scheme,
            host: raw
                .host
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: raw.port.unwrap_or(DEFAULT_PORT),
            path,
            timeout: raw.timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            read_write_timeout: raw.read_write_timeout.filter(|t| !t.is_zero()),
            tcp_nodelay: raw.tcp_nodelay.unwrap_or(true),
            username: raw.username,
            password: raw.password,
            database: raw.database,
        })
    }

    /// Parses `tcp://[user:pass@]host[:port][?opts]` or `unix:///path[?opts]`.
    ///
    /// Recognized options are `timeout`, `read_write_timeout` (seconds),
    /// `tcp_nodelay`, `database`, `username` and `password`. Other options are ignored.
    /// The user info and the socket path are percent-decoded.
    pub fn parse(uri: &str) -> Result<Self, ConfigurationError> {
        let url = Url::parse(uri).map_err(|e| ConfigurationError::InvalidUri {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;

        let mut raw = RawParameters {
            scheme: Some(url.scheme().to_string()),
            ..Default::default()
        };

        let decode = |value: &str| {
            percent_decode_str(value)
                .decode_utf8()
                .map(|v| v.into_owned())
                .map_err(|e| ConfigurationError::InvalidUri {
                    uri: uri.to_string(),
                    reason: e.to_string(),
                })
        };

        if url.scheme() == Scheme::Unix.as_str() {
            raw.path = Some(decode(url.path())?);
        } else {
            raw.host = url.host_str().map(str::to_string);
            raw.port = url.port();
        }

        if !url.username().is_empty() {
            raw.username = Some(decode(url.username())?);
        }
        raw.password = url.password().map(decode).transpose()?;

        for (name, value) in url.query_pairs() {
            apply_option(&mut raw, &name, &value)?;
        }

        Self::validate(raw)
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn read_write_timeout(&self) -> Option<Duration> {
        self.read_write_timeout
    }

    pub fn tcp_nodelay(&self) -> bool {
        self.tcp_nodelay
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn database(&self) -> Option<u32> {
        self.database
    }

    /// Socket path for `unix`, `host:port` otherwise.
    pub fn identifier(&self) -> String {
        match (self.scheme, &self.path) {
            (Scheme::Unix, Some(path)) => path.clone(),
            _ => format!("{}:{}", self.host, self.port),
        }
    }
}

impl TryFrom<RawParameters> for ConnectionParameters {
    type Error = ConfigurationError;

    fn try_from(value: RawParameters) -> Result<Self, Self::Error> {
        Self::validate(value)
    }
}

impl From<ConnectionParameters> for RawParameters {
    fn from(value: ConnectionParameters) -> Self {
        RawParameters {
            scheme: Some(value.scheme.as_str().to_string()),
            host: Some(value.host),
            port: Some(value.port),
            path: value.path,
            timeout: Some(value.timeout),
            read_write_timeout: value.read_write_timeout,
            tcp_nodelay: Some(value.tcp_nodelay),
            username: value.username,
            password: value.password,
            database: value.database,
        }
    }
}

impl FromStr for ConnectionParameters {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Renders `<scheme>://<identifier>`.
impl fmt::Display for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.identifier())
    }
}

fn apply_option(
    raw: &mut RawParameters,
    name: &str,
    value: &str,
) -> Result<(), ConfigurationError> {
    let invalid = || ConfigurationError::InvalidOption {
        name: name.to_string(),
        value: value.to_string(),
    };

    match name {
        "timeout" => raw.timeout = Some(parse_seconds(value).ok_or_else(invalid)?),
        "read_write_timeout" => {
            raw.read_write_timeout = Some(parse_seconds(value).ok_or_else(invalid)?)
        }
        "tcp_nodelay" => raw.tcp_nodelay = Some(parse_flag(value).ok_or_else(invalid)?),
        "database" => raw.database = Some(value.parse().map_err(|_| invalid())?),
        "username" => raw.username = Some(value.to_string()),
        "password" => raw.password = Some(value.to_string()),
        _ => {}
    }
    Ok(())
}

fn parse_seconds(value: &str) -> Option<Duration> {
    let seconds: f64 = value.parse().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}

fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "1" | "true" | "on" => Some(true),
        "0" | "false" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(scheme: &str) -> RawParameters {
        RawParameters {
            scheme: Some(scheme.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn rejects_unknown_scheme() {
        let err = ConnectionParameters::validate(raw("ftp")).unwrap_err();
        assert_eq!(err, ConfigurationError::UnsupportedScheme("ftp".into()));
    }

    #[test]
    fn rejects_unix_without_path() {
        let err = ConnectionParameters::validate(raw("unix")).unwrap_err();
        assert_eq!(err, ConfigurationError::MissingPath);

        let mut empty = raw("unix");
        empty.path = Some(String::new());
        assert_eq!(
            ConnectionParameters::validate(empty).unwrap_err(),
            ConfigurationError::MissingPath
        );
    }

    #[test]
    fn tcp_identifier() {
        let mut params = raw("tcp");
        params.host = Some("h".into());
        params.port = Some(6379);

        let params = ConnectionParameters::validate(params).unwrap();
        assert_eq!(params.identifier(), "h:6379");
        assert_eq!(params.to_string(), "tcp://h:6379");
    }

    #[test]
    fn unix_identifier() {
        let mut params = raw("unix");
        params.path = Some("/tmp/s.sock".into());

        let params = ConnectionParameters::validate(params).unwrap();
        assert_eq!(params.identifier(), "/tmp/s.sock");
        assert_eq!(params.to_string(), "unix:///tmp/s.sock");
    }

    #[test]
    fn defaults_applied() {
        let params = ConnectionParameters::validate(RawParameters::default()).unwrap();
        assert_eq!(params.scheme(), Scheme::Tcp);
        assert_eq!(params.identifier(), "127.0.0.1:6379");
        assert_eq!(params.timeout(), DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(params.read_write_timeout(), None);
        assert!(params.tcp_nodelay());
    }

    #[test]
    fn parses_tcp_uri_with_options() {
        let params = ConnectionParameters::parse(
            "tcp://:secret@10.0.0.5:7000?database=3&read_write_timeout=0.5&tcp_nodelay=0&unknown=x",
        )
        .unwrap();

        assert_eq!(params.identifier(), "10.0.0.5:7000");
        assert_eq!(params.password(), Some("secret"));
        assert_eq!(params.username(), None);
        assert_eq!(params.database(), Some(3));
        assert_eq!(params.read_write_timeout(), Some(Duration::from_millis(500)));
        assert!(!params.tcp_nodelay());
    }

    #[test]
    fn parses_unix_uri() {
        let params: ConnectionParameters = "unix:///var/run/kv.sock".parse().unwrap();
        assert_eq!(params.scheme(), Scheme::Unix);
        assert_eq!(params.identifier(), "/var/run/kv.sock");
    }

    #[test]
    fn parse_decodes_user_info_and_path() {
        let params = ConnectionParameters::parse("tcp://us%3Aer:p%40ss%2Fw@h:1").unwrap();
        assert_eq!(params.username(), Some("us:er"));
        assert_eq!(params.password(), Some("p@ss/w"));

        let params = ConnectionParameters::parse("unix:///tmp/my%20dir/kv.sock").unwrap();
        assert_eq!(params.path(), Some("/tmp/my dir/kv.sock"));
        assert_eq!(params.identifier(), "/tmp/my dir/kv.sock");

        assert!(matches!(
            ConnectionParameters::parse("tcp://:%FF@h:1"),
            Err(ConfigurationError::InvalidUri { .. })
        ));
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(matches!(
            ConnectionParameters::parse("ftp://h:21"),
            Err(ConfigurationError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            ConnectionParameters::parse("not a uri"),
            Err(ConfigurationError::InvalidUri { .. })
        ));
        assert_eq!(
            ConnectionParameters::parse("tcp://h?database=abc").unwrap_err(),
            ConfigurationError::InvalidOption {
                name: "database".into(),
                value: "abc".into()
            }
        );
    }
}
