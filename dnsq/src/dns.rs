use dnsq_client::dns::{
    ConnectionOptions, DefaultConnectionFactory, DnsClient, DnsClientConfig, DohEndpoint, DohMethod, Nameserver,
    ResolvConf, DEFAULT_EDNS_PAYLOAD_SIZE,
};
use dnsq_client::DnsqError;
use http::Uri;
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;

const DEFAULT_DOH_PORT: u16 = 443;
const DEFAULT_DOH_PATH: &str = "/dns-query";

/// Settings given on the command line that take precedence over resolv.conf.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub nameserver: Option<SocketAddr>,
    pub timeout: Option<Duration>,
    pub tcp: bool,
    pub doh_url: Option<String>,
    pub doh_method: DohMethod,
    pub edns_payload_size: Option<u16>,
    pub dnssec_ok: bool,
}

/// Load configuration from the provided resolv.conf file and create a new DnsClient
/// based on it and any overrides. If the resolv.conf file cannot be opened or is
/// malformed, default configuration values will be used. See `man 5 resolv.conf`
/// for more information.
pub async fn new_client<P>(resolv: P, overrides: &Overrides) -> Result<DnsClient, DnsqError>
where
    P: AsRef<Path> + fmt::Debug,
{
    let conf = match load_config(&resolv).await {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!(message = "unable to load resolv.conf", path = ?resolv, err = %e);
            ResolvConf::default()
        }
    };

    let (config, options) = client_config(conf, overrides)?;
    let factory = DefaultConnectionFactory::new(&config, options).await?;
    Ok(DnsClient::new(config, factory))
}

async fn load_config<P>(resolv: P) -> Result<ResolvConf, DnsqError>
where
    P: AsRef<Path> + fmt::Debug,
{
    let handle = File::open(&resolv)
        .await
        .map_err(|e| DnsqError::configuration_cause(format!("unable to open {:?}", resolv), e))?;
    dnsq_client::dns::config(handle).await
}

/// Combine parsed resolv.conf settings with command line overrides.
pub fn client_config(
    conf: ResolvConf,
    overrides: &Overrides,
) -> Result<(DnsClientConfig, ConnectionOptions), DnsqError> {
    let mut config = DnsClientConfig::from(conf);
    let mut options = ConnectionOptions::default();

    if let Some(addr) = overrides.nameserver {
        config.nameservers = vec![Nameserver::new(addr)];
    }

    if let Some(t) = overrides.timeout {
        config.timeout = t;
    }

    if overrides.tcp {
        config.force_tcp = true;
    }

    if let Some(size) = overrides.edns_payload_size {
        config.edns_payload_size = Some(size);
    }

    // The DO bit is carried by the OPT record so asking for DNSSEC implies EDNS
    if overrides.dnssec_ok {
        config.dnssec_ok = true;
        config.edns_payload_size = config.edns_payload_size.or(Some(DEFAULT_EDNS_PAYLOAD_SIZE));
    }

    if let Some(url) = &overrides.doh_url {
        let (endpoint, path) = parse_doh_url(url)?;
        options.doh_path = path;
        options.doh_method = overrides.doh_method;
        config.prefer_doh = true;

        if let Some(first) = config.nameservers.first_mut() {
            first.doh = Some(endpoint);
        }
    }

    Ok((config, options))
}

fn parse_doh_url(url: &str) -> Result<(DohEndpoint, String), DnsqError> {
    let uri: Uri = url
        .parse()
        .map_err(|e| DnsqError::configuration_cause(format!("invalid DoH URL '{}'", url), e))?;

    if uri.scheme_str() != Some("https") {
        return Err(DnsqError::configuration(format!("DoH URL '{}' must use https", url)));
    }

    let host = uri
        .host()
        .map(|h| h.trim_start_matches('[').trim_end_matches(']'))
        .ok_or_else(|| DnsqError::configuration(format!("DoH URL '{}' is missing a host", url)))?;
    let port = uri.port_u16().unwrap_or(DEFAULT_DOH_PORT);
    let path = match uri.path() {
        "" | "/" => DEFAULT_DOH_PATH,
        p => p,
    };

    Ok((DohEndpoint::new(host, port), path.to_owned()))
}
