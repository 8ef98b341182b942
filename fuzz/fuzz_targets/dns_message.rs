#![no_main]

use dnsq_client::dns::Message;
use libfuzzer_sys::{Corpus, fuzz_target};

fuzz_target!(|data: &[u8]| -> Corpus {
    if let Ok(m) = Message::from_bytes(data) {
        let bytes = m.to_bytes().unwrap();
        Message::from_bytes(&bytes).unwrap();
        Corpus::Keep
    } else {
        Corpus::Reject
    }
});
