//! Fuzz target for STUN message decoding
//!
//! The decoder must return Ok or Err for any input, never panic. Anything it
//! accepts must re-encode to a message that decodes to the same header.

#![no_main]

use libfuzzer_sys::fuzz_target;
use natprobe_stun::StunMessage;

fuzz_target!(|data: &[u8]| {
    if let Ok(message) = StunMessage::decode(data) {
        let reencoded = StunMessage::decode(&message.encode())
            .expect("re-encoded message should decode");
        assert_eq!(reencoded.message_type, message.message_type);
        assert_eq!(reencoded.transaction_id, message.transaction_id);
    }
});
