use clap::{Args, Parser, Subcommand, ValueHint};
use dnsq::dns::Overrides;
use dnsq_client::dns::{
    DohMethod, Flags, Message, MessageId, Name, Question, QueryLog, Record, RecordClass, RecordType,
};
use std::fmt::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{Instrument, Level};

const DEFAULT_LOG_LEVEL: Level = Level::INFO;
const DEFAULT_RECORD_TYPE: RecordType = RecordType::A;
const DEFAULT_RECORD_CLASS: RecordClass = RecordClass::INET;

/// dnsq: Make DNS queries over UDP, TCP, or HTTPS and read/write binary format DNS messages
#[derive(Debug, Parser)]
#[command(name = "dnsq", version = clap::crate_version!())]
struct DnsqConfig {
    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case-insensitive).
    #[arg(long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,

    #[command(subcommand)]
    mode: Action,
}

#[derive(Debug, Subcommand)]
enum Action {
    Query(QueryCommand),
    Read(ReadCommand),
    Write(WriteCommand),
}

/// Perform a DNS query and display the result as dig-like text output.
#[derive(Debug, Args)]
struct QueryCommand {
    /// Path to resolv.conf file for loading DNS configuration information. If this file
    /// can't be loaded, default values for DNS configuration are used instead.
    #[arg(long, default_value = default_resolv_conf().into_os_string(), value_hint = ValueHint::FilePath)]
    resolv_conf: PathBuf,

    /// Nameserver to use for DNS queries, overriding whatever nameservers are configured
    /// in resolv.conf.
    #[arg(long, value_hint = ValueHint::Hostname)]
    nameserver: Option<SocketAddr>,

    /// Timeout for each DNS query attempt in seconds, overriding whatever timeout is
    /// configured in resolv.conf.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Always use TCP for queries instead of starting with UDP.
    #[arg(long, default_value_t = false)]
    tcp: bool,

    /// DNS-over-HTTPS URL to try before UDP or TCP for the first nameserver. For example
    /// 'https://dns.example/dns-query'.
    #[arg(long, value_hint = ValueHint::Url)]
    doh_url: Option<String>,

    /// HTTP method to use for DNS-over-HTTPS queries. Allowed values are 'get' and 'post'
    /// (case-insensitive).
    #[arg(long, default_value = "post")]
    doh_method: DohMethod,

    /// Advertise this UDP payload size using an EDNS(0) OPT record.
    #[arg(long)]
    edns_size: Option<u16>,

    /// Request DNSSEC records by setting the DO bit. Implies EDNS(0).
    #[arg(long, default_value_t = false)]
    dnssec: bool,

    /// Output query results in raw binary format instead of human-readable
    /// text. NOTE, this may break your terminal and so should probably be piped
    /// to a file.
    #[arg(long, default_value_t = false)]
    raw: bool,

    /// Type of record to request. Supported: A, NS, CNAME, SOA, PTR, MX, TXT, AAAA, SRV, AXFR, ANY.
    #[arg(long, default_value_t = DEFAULT_RECORD_TYPE)]
    rtype: RecordType,

    /// Class of record to request. Supported: INET, CHAOS, HESIOD, NONE, ANY.
    #[arg(long, default_value_t = DEFAULT_RECORD_CLASS)]
    rclass: RecordClass,

    /// Domain name to lookup.
    #[arg(required = true)]
    name: Name,
}

fn default_resolv_conf() -> PathBuf {
    PathBuf::from("/etc/resolv.conf")
}

/// Read a binary format DNS message from standard input and display it as dig-like text output.
#[derive(Debug, Args)]
struct ReadCommand {}

/// Write a binary format DNS message to standard output.
#[derive(Debug, Args)]
struct WriteCommand {
    /// Type of record to request. Supported: A, NS, CNAME, SOA, PTR, MX, TXT, AAAA, SRV, AXFR, ANY.
    #[arg(long, default_value_t = DEFAULT_RECORD_TYPE)]
    rtype: RecordType,

    /// Class of record to request. Supported: INET, CHAOS, HESIOD, NONE, ANY.
    #[arg(long, default_value_t = DEFAULT_RECORD_CLASS)]
    rclass: RecordClass,

    /// Domain name to lookup.
    #[arg(required = true)]
    name: Name,
}

#[tokio::main]
async fn main() -> ExitCode {
    let opts = DnsqConfig::parse();

    let console_subscriber =
        dnsq::tracing::console_subscriber(opts.log_level).expect("failed to setup console logging");
    tracing::subscriber::set_global_default(console_subscriber).expect("failed to initialize console logging");

    match &opts.mode {
        Action::Query(cmd) => run_query(cmd).await,
        Action::Read(cmd) => run_read(cmd).await,
        Action::Write(cmd) => run_write(cmd).await,
    }
}

async fn run_query(cmd: &QueryCommand) -> ExitCode {
    let overrides = Overrides {
        nameserver: cmd.nameserver,
        timeout: cmd.timeout_secs.map(Duration::from_secs),
        tcp: cmd.tcp,
        doh_url: cmd.doh_url.clone(),
        doh_method: cmd.doh_method,
        edns_payload_size: cmd.edns_size,
        dnssec_ok: cmd.dnssec,
    };

    let client = match dnsq::dns::new_client(&cmd.resolv_conf, &overrides)
        .instrument(tracing::span!(Level::INFO, "dns.new_client"))
        .await
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(message = "unable to create DNS client", err = %e);
            return ExitCode::FAILURE;
        }
    };

    let msg = new_query(cmd.name.clone(), cmd.rtype, cmd.rclass);
    let (res, log) = client
        .exchange_logged(&msg)
        .instrument(tracing::span!(Level::INFO, "client.exchange"))
        .await;
    log_attempts(&log);

    let response = match res {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(message = "unable to perform DNS query", name = %cmd.name, err = %e);
            return ExitCode::FAILURE;
        }
    };

    if cmd.raw {
        write_binary_message(&response).await
    } else {
        write_text_message(&response).await
    }
}

fn log_attempts(log: &QueryLog) {
    for attempt in log.attempts() {
        match attempt.error() {
            Some(err) => tracing::warn!(message = "query attempt failed", endpoint = %attempt.endpoint(), err = %err),
            None => tracing::debug!(message = "query attempt succeeded", endpoint = %attempt.endpoint()),
        }
    }
}

async fn run_read(_: &ReadCommand) -> ExitCode {
    let mut buf = Vec::new();
    let mut input = tokio::io::stdin();

    if let Err(e) = input.read_to_end(&mut buf).await {
        tracing::error!(message = "unable to read message from stdin", err = %e);
        return ExitCode::FAILURE;
    }

    let msg = match Message::from_bytes(&buf) {
        Ok(m) => m,
        Err(e) => {
            tracing::error!(message = "malformed message", err = %e);
            return ExitCode::FAILURE;
        }
    };

    write_text_message(&msg).await
}

async fn run_write(cmd: &WriteCommand) -> ExitCode {
    let msg = new_query(cmd.name.clone(), cmd.rtype, cmd.rclass);
    write_binary_message(&msg).await
}

fn new_query(name: Name, rtype: RecordType, rclass: RecordClass) -> Message {
    Message::new(MessageId::random(), Flags::default().set_query().set_recursion_desired())
        .add_question(Question::new(name, rtype).set_qclass(rclass))
}

async fn write_binary_message(msg: &Message) -> ExitCode {
    let buf = match msg.to_bytes() {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(message = "unable to encode message to wire format", err = %e);
            return ExitCode::FAILURE;
        }
    };

    let mut out = tokio::io::stdout();
    if let Err(e) = out.write_all(&buf).await {
        tracing::error!(message = "unable to write wire encoded message to stdout", err = %e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn write_text_message(msg: &Message) -> ExitCode {
    let mut buf = String::new();
    format_header(&mut buf, msg);
    format_opt(&mut buf, msg.opt());
    format_question(&mut buf, msg.questions());
    format_answer(&mut buf, msg.answers());
    format_authority(&mut buf, msg.authority());
    format_extra(&mut buf, msg.extra());

    let mut out = tokio::io::stdout();
    if let Err(e) = out.write_all(buf.as_bytes()).await {
        tracing::error!(message = "unable to write human readable message to stdout", err = %e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn format_header(buf: &mut String, msg: &Message) {
    let _ = writeln!(
        buf,
        ";; >>HEADER<< opcode: {:?}, status: {:?}, id: {}",
        msg.flags().get_op_code(),
        msg.flags().get_response_code(),
        msg.id()
    );
    let _ = writeln!(buf, ";; flags: {:?}", msg.flags());
}

fn format_opt(buf: &mut String, opt: Option<&Record>) {
    if let Some(r) = opt {
        let _ = writeln!(buf, ";; OPT PSEUDOSECTION:");
        let _ = writeln!(
            buf,
            "; EDNS: udp: {}, do: {}",
            r.udp_payload_size().unwrap_or_default(),
            r.dnssec_ok()
        );
    }
}

fn format_question(buf: &mut String, questions: &[Question]) {
    let _ = writeln!(buf, ";; QUESTION SECTION:");
    for q in questions {
        let _ = writeln!(buf, "; {}\t\t\t{}\t{}", q.name(), q.qclass(), q.qtype());
    }
}

fn format_authority(buf: &mut String, records: &[Record]) {
    let _ = writeln!(buf, ";; AUTHORITY SECTION:");
    format_records(buf, records);
}

fn format_answer(buf: &mut String, records: &[Record]) {
    let _ = writeln!(buf, ";; ANSWER SECTION:");
    format_records(buf, records);
}

fn format_extra(buf: &mut String, records: &[Record]) {
    let _ = writeln!(buf, ";; ADDITIONAL SECTION:");
    format_records(buf, records.iter().filter(|r| r.rtype() != RecordType::OPT));
}

fn format_records<'a>(buf: &mut String, records: impl IntoIterator<Item = &'a Record>) {
    for r in records {
        let _ = writeln!(
            buf,
            "{}\t\t{}\t{}\t{}\t{}",
            r.name(),
            r.ttl(),
            r.rclass(),
            r.rtype(),
            r.rdata()
        );
    }
}
