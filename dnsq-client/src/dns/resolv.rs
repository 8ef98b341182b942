use crate::core::DnsqError;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

const DEFAULT_PORT: u16 = 53;
const MAX_NAMESERVERS: usize = 3;
const MAX_TIMEOUT_SECS: u64 = 30;
const MAX_ATTEMPTS: u8 = 5;

/// Settings for a DNS client parsed from a resolv.conf file.
///
/// Only `nameserver` lines and the `timeout`, `attempts`, `rotate`, `use-vc`, and
/// `edns0` options are understood, everything else is skipped.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct ResolvConf {
    pub nameservers: Vec<SocketAddr>,
    pub options: ResolvConfOptions,
}

impl ResolvConf {
    fn apply(&mut self, directive: Directive) {
        match directive {
            // Resolvers only ever use the first three listed
            Directive::Nameserver(addr) if self.nameservers.len() < MAX_NAMESERVERS => self.nameservers.push(addr),
            Directive::Nameserver(addr) => {
                tracing::debug!(message = "ignoring nameserver past limit", addr = %addr, limit = MAX_NAMESERVERS);
            }
            Directive::Options(opts) => opts.into_iter().for_each(|o| self.options.apply(o)),
        }
    }
}

/// Values from the `options` lines of a resolv.conf file. `None` means the option was
/// not present and the client default should be used.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct ResolvConfOptions {
    pub timeout: Option<Duration>,
    pub attempts: Option<u8>,
    pub rotate: Option<bool>,
    pub use_vc: Option<bool>,
    pub edns0: Option<bool>,
}

impl ResolvConfOptions {
    fn apply(&mut self, opt: ResolvOption) {
        match opt {
            ResolvOption::Timeout(t) => self.timeout = Some(t),
            ResolvOption::Attempts(n) => self.attempts = Some(n),
            ResolvOption::Rotate => self.rotate = Some(true),
            ResolvOption::UseVc => self.use_vc = Some(true),
            ResolvOption::Edns0 => self.edns0 = Some(true),
        }
    }
}

/// Read settings for a DNS client from a resolv.conf configuration file.
///
/// Malformed `nameserver` lines are errors. Unknown settings and unknown or malformed
/// options are logged and skipped, the same as the system resolver.
pub async fn config<R>(read: R) -> Result<ResolvConf, DnsqError>
where
    R: AsyncRead + Send + Sync + Unpin + 'static,
{
    let mut lines = BufReader::new(read).lines();
    let mut conf = ResolvConf::default();
    let mut num = 0;

    while let Some(line) = lines.next_line().await? {
        num += 1;
        if let Some(directive) = Directive::parse(num, &line)? {
            conf.apply(directive);
        }
    }

    Ok(conf)
}

/// A single supported line of a resolv.conf file.
#[derive(Debug, Clone, Eq, PartialEq)]
enum Directive {
    Nameserver(SocketAddr),
    Options(Vec<ResolvOption>),
}

impl Directive {
    /// Parse line `num`, returning `None` for blank lines, comments, and unsupported settings.
    fn parse(num: usize, line: &str) -> Result<Option<Self>, DnsqError> {
        let content = line.split(['#', ';']).next().unwrap_or("");
        let mut words = content.split_whitespace();

        match words.next() {
            None => Ok(None),
            Some("nameserver") => {
                let addr = words.next().ok_or_else(|| {
                    DnsqError::configuration(format!("line {}: nameserver is missing an address", num))
                })?;

                addr.parse::<IpAddr>()
                    .map(|ip| Some(Directive::Nameserver(SocketAddr::new(ip, DEFAULT_PORT))))
                    .map_err(|e| {
                        DnsqError::configuration_cause(format!("line {}: malformed nameserver '{}'", num, addr), e)
                    })
            }
            Some("options") => Ok(Some(Directive::Options(
                words
                    .filter_map(|w| match w.parse() {
                        Ok(o) => Some(o),
                        Err(e) => {
                            tracing::debug!(message = "skipping resolv.conf option", line = num, option = w, err = %e);
                            None
                        }
                    })
                    .collect(),
            ))),
            Some(other) => {
                tracing::debug!(message = "skipping resolv.conf setting", line = num, setting = other);
                Ok(None)
            }
        }
    }
}

/// Option from an `options` line. Numeric values are capped the same way glibc caps them.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum ResolvOption {
    Timeout(Duration),
    Attempts(u8),
    Rotate,
    UseVc,
    Edns0,
}

impl FromStr for ResolvOption {
    type Err = DnsqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = match s.split_once(':') {
            Some((n, v)) => (n, Some(v)),
            None => (s, None),
        };

        match (name, value) {
            ("rotate", None) => Ok(Self::Rotate),
            ("use-vc" | "usevc" | "tcp", None) => Ok(Self::UseVc),
            ("edns0", None) => Ok(Self::Edns0),
            ("timeout", Some(v)) => {
                let secs: u64 = parse_number(s, v)?;
                Ok(Self::Timeout(Duration::from_secs(secs.min(MAX_TIMEOUT_SECS))))
            }
            ("attempts", Some(v)) => {
                let n: u8 = parse_number(s, v)?;
                Ok(Self::Attempts(n.min(MAX_ATTEMPTS)))
            }
            _ => Err(DnsqError::configuration(format!("unsupported option '{}'", s))),
        }
    }
}

fn parse_number<T>(opt: &str, val: &str) -> Result<T, DnsqError>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    val.parse()
        .map_err(|e| DnsqError::configuration_cause(format!("invalid value for option '{}'", opt), e))
}
