// web-server/src/chain/events.rs
//! Decoding of `PaymentDone(address indexed payer, uint256 amount)` logs.

use alloy_primitives::{keccak256, B256, U256};

use super::{decode_hex, Log};

pub const PAYMENT_DONE_SIGNATURE: &str = "PaymentDone(address,uint256)";

/// topic0 of the payment event
pub fn payment_done_topic() -> B256 {
    keccak256(PAYMENT_DONE_SIGNATURE.as_bytes())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEvent {
    /// Lower-cased payer address
    pub payer: String,
    pub amount: U256,
}

/// Outcome of searching a receipt for the payment event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDecode {
    Decoded(PaymentEvent),
    Failure(String),
}

/// Find the first well-formed payment event emitted by `contract`
pub fn find_payment_event(logs: &[Log], contract: &str) -> EventDecode {
    let topic = format!("0x{}", hex::encode(payment_done_topic()));
    let mut failure = None;

    for log in logs {
        if !log.address.eq_ignore_ascii_case(contract) {
            continue;
        }
        match log.topics.first() {
            Some(topic0) if topic0.eq_ignore_ascii_case(&topic) => {}
            _ => continue,
        }

        match decode_payment_log(log) {
            Ok(event) => return EventDecode::Decoded(event),
            Err(reason) => failure = Some(reason),
        }
    }

    EventDecode::Failure(failure.unwrap_or_else(|| "no PaymentDone event in receipt logs".to_string()))
}

fn decode_payment_log(log: &Log) -> Result<PaymentEvent, String> {
    if log.topics.len() != 2 {
        return Err(format!("expected 2 topics, got {}", log.topics.len()));
    }

    let payer_word = decode_hex(&log.topics[1])?;
    if payer_word.len() != 32 || payer_word[..12].iter().any(|b| *b != 0) {
        return Err("payer topic is not an abi-encoded address".to_string());
    }

    let data = decode_hex(&log.data)?;
    if data.len() != 32 {
        return Err(format!("expected 32 bytes of data, got {}", data.len()));
    }
    let amount = U256::try_from_be_slice(&data).ok_or("amount does not fit in uint256")?;

    Ok(PaymentEvent {
        payer: format!("0x{}", hex::encode(&payer_word[12..])),
        amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::payment_done_log;

    const CONTRACT: &str = "0x02278441aa8acf07e9c1aea074d3a36e1dd4f4fd";
    const PAYER: &str = "0x71c7656ec7ab88b098defb751b7401b5f6d8976f";

    #[test]
    fn test_topic_hash() {
        assert_eq!(payment_done_topic(), keccak256(b"PaymentDone(address,uint256)"));
        assert_eq!(hex::encode(payment_done_topic()).len(), 64);
    }

    #[test]
    fn test_decodes_event() {
        let logs = vec![payment_done_log(CONTRACT, PAYER, U256::from(1_000u64))];

        assert_eq!(
            find_payment_event(&logs, CONTRACT),
            EventDecode::Decoded(PaymentEvent {
                payer: PAYER.to_string(),
                amount: U256::from(1_000u64),
            })
        );
    }

    #[test]
    fn test_contract_address_compared_case_insensitively() {
        let logs = vec![payment_done_log(CONTRACT, PAYER, U256::from(5u64))];
        assert!(matches!(
            find_payment_event(&logs, &CONTRACT.to_uppercase().replacen("0X", "0x", 1)),
            EventDecode::Decoded(_)
        ));
    }

    #[test]
    fn test_ignores_other_emitters_and_topics() {
        let foreign = payment_done_log("0x0000000000000000000000000000000000000001", PAYER, U256::from(1u64));
        let mut unrelated = payment_done_log(CONTRACT, PAYER, U256::from(1u64));
        unrelated.topics[0] = format!("0x{}", "00".repeat(32));

        assert!(matches!(
            find_payment_event(&[foreign, unrelated], CONTRACT),
            EventDecode::Failure(_)
        ));
    }

    #[test]
    fn test_malformed_event_reported() {
        let mut log = payment_done_log(CONTRACT, PAYER, U256::from(1u64));
        log.data = "0x01".to_string();

        match find_payment_event(&[log], CONTRACT) {
            EventDecode::Failure(reason) => assert!(reason.contains("32 bytes")),
            other => panic!("unexpected decode: {:?}", other),
        }
    }

    #[test]
    fn test_skips_malformed_and_uses_next() {
        let mut broken = payment_done_log(CONTRACT, PAYER, U256::from(1u64));
        broken.topics.pop();
        let good = payment_done_log(CONTRACT, PAYER, U256::from(7u64));

        match find_payment_event(&[broken, good], CONTRACT) {
            EventDecode::Decoded(event) => assert_eq!(event.amount, U256::from(7u64)),
            other => panic!("unexpected decode: {:?}", other),
        }
    }

    #[test]
    fn test_empty_logs() {
        assert_eq!(
            find_payment_event(&[], CONTRACT),
            EventDecode::Failure("no PaymentDone event in receipt logs".to_string())
        );
    }
}
