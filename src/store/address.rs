use std::fmt;

use percent_encoding::percent_decode_str;
use url::{Host, ParseError, Url};

const DEFAULT_PORT: u16 = 6379;
const LOCAL_HOST: &str = "127.0.0.1";

/// A parsed store address.
///
/// Accepts `host:port`, `user:password@host:port` and `:password@host:port`,
/// each with an optional `redis://` scheme and an ignored `/db` suffix.
/// The password may be percent-encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreAddress {
    pub host: String,
    pub port: u16,
    /// Only set when the userinfo carried a non-empty password.
    pub password: Option<String>,
}

impl StoreAddress {
    pub fn parse(address: &str) -> Result<Self, String> {
        let with_scheme = if address.contains("://") {
            address.to_string()
        } else {
            format!("redis://{address}")
        };

        let url = match Url::parse(&with_scheme) {
            Err(ParseError::EmptyHost) => Url::parse(&with_local_host(&with_scheme)),
            parsed => parsed,
        }
        .map_err(|e| e.to_string())?;

        if url.scheme() != "redis" {
            return Err(format!("unsupported scheme '{}'", url.scheme()));
        }

        let host = match url.host() {
            Some(Host::Domain("")) | None => LOCAL_HOST.to_string(),
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
        };

        let password = url
            .password()
            .map(|p| {
                percent_decode_str(p)
                    .decode_utf8()
                    .map(|p| p.into_owned())
                    .map_err(|e| format!("password is not valid UTF-8: {e}"))
            })
            .transpose()?
            .filter(|p| !p.is_empty());

        Ok(Self {
            host,
            port: url.port().unwrap_or(DEFAULT_PORT),
            password,
        })
    }

    /// `address` with any userinfo masked, for error messages.
    pub fn redact(address: &str) -> String {
        let (scheme, rest) = match address.split_once("://") {
            Some((scheme, rest)) => (format!("{scheme}://"), rest),
            None => (String::new(), address),
        };
        match rest.rsplit_once('@') {
            Some((_, host_port)) => format!("{scheme}***@{host_port}"),
            None => address.to_string(),
        }
    }

    /// `redis://host:port/` form without credentials, as the `redis` crate expects.
    pub fn connection_url(&self) -> String {
        if self.host.contains(':') {
            format!("redis://[{}]:{}/", self.host, self.port)
        } else {
            format!("redis://{}:{}/", self.host, self.port)
        }
    }
}

// `url` rejects an authority with a port but no host, e.g. `redis://:6379`.
fn with_local_host(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let (authority, path) = rest.split_at(rest.find('/').unwrap_or(rest.len()));
    match authority.rsplit_once('@') {
        Some((userinfo, port)) => format!("{scheme}://{userinfo}@{LOCAL_HOST}{port}{path}"),
        None => format!("{scheme}://{LOCAL_HOST}{authority}{path}"),
    }
}

impl fmt::Display for StoreAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

// Keeps the password out of logs.
impl fmt::Debug for StoreAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreAddress")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}
