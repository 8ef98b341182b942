#![no_main]

use dnsq_client::DnsqError;
use dnsq_client::dns::{ByteCursor, ByteWriter, Name};
use libfuzzer_sys::{Corpus, fuzz_target};
use std::str::FromStr;

fuzz_target!(|data: &[u8]| -> Corpus {
    // Try parsing the bytes as a binary DNS name
    let mut cur = ByteCursor::new(data);
    if let Ok(n) = Name::read_network_bytes(&mut cur) {
        let _ = n.to_string();
        let mut buf = ByteWriter::compressed();
        n.write_network_bytes(&mut buf).unwrap();
        return Corpus::Keep;
    }

    // Try parsing the bytes as a text representation of the name
    if let Ok(n) = str::from_utf8(data)
        .map_err(|e| DnsqError::invalid_data_cause("utf-8", e))
        .and_then(Name::from_str)
    {
        let _ = n.to_string();
        let mut buf = ByteWriter::new();
        n.write_network_bytes(&mut buf).unwrap();
        return Corpus::Keep;
    }

    Corpus::Reject
});
