//! Order codes look like `W-7QK2ZP-160626`: the channel prefix, six random characters and the UTC date (`ddmmyy`).
//!
//! The random part comes from the thread-local CSPRNG, since the code is all a buyer needs to look an order up.
use chrono::{DateTime, Utc};
use rand::Rng;

use crate::db_types::{Channel, OrderCode};

pub const ORDER_CODE_RANDOM_LEN: usize = 6;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub fn generate_order_code(channel: Channel, now: DateTime<Utc>) -> OrderCode {
    let mut rng = rand::thread_rng();
    let random = (0..ORDER_CODE_RANDOM_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect::<String>();
    OrderCode(format!("{}-{random}-{}", channel.code_prefix(), now.format("%d%m%y")))
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn code_format() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 23, 59, 0).unwrap();
        let code = generate_order_code(Channel::Web, now);
        let parts = code.as_str().split('-').collect::<Vec<_>>();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "W");
        assert_eq!(parts[1].len(), ORDER_CODE_RANDOM_LEN);
        assert!(parts[1].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert_eq!(parts[2], "010624");

        let code = generate_order_code(Channel::Bot, now);
        assert!(code.as_str().starts_with("B-"));
    }

    #[test]
    fn codes_are_random() {
        let now = Utc::now();
        let a = generate_order_code(Channel::Web, now);
        let b = generate_order_code(Channel::Web, now);
        // 36^6 possibilities. A collision here means the generator is broken.
        assert_ne!(a, b);
    }
}
