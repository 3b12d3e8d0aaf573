//! Backend payload codecs
//!
//! Fresh deployment (packed, 144-byte fixed prefix):
//!
//! ```text
//! to(20) | fallback_handler(20) | payment_token(20) | payment_receiver(20)
//!   | payment(32) | nonce(32) | setup_data(..)
//! ```
//!
//! Same-address verification:
//!
//! ```text
//! multisig(20)
//! ```

use quorum_types::words::{self, WORD};
use quorum_types::{Address, Amount};

use crate::error::{MultisigError, Result};

/// Optional setup instructions for a freshly deployed wallet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FreshDeployPayload {
    pub to: Address,
    pub fallback_handler: Address,
    pub payment_token: Address,
    pub payment_receiver: Address,
    pub payment: Amount,
    pub nonce: u128,
    pub setup_data: Vec<u8>,
}

impl FreshDeployPayload {
    /// Length of the fixed fields.
    pub const MIN_LEN: usize = 4 * Address::LEN + 2 * WORD;

    /// Decode a payload. An empty payload means "no setup".
    pub fn decode(data: &[u8]) -> Result<Option<Self>> {
        if data.is_empty() {
            return Ok(None);
        }
        if data.len() < Self::MIN_LEN {
            return Err(MultisigError::IncorrectDataLength {
                provided: data.len(),
                expected: Self::MIN_LEN,
            });
        }

        Ok(Some(Self {
            to: words::read_packed_address(data, 0)?,
            fallback_handler: words::read_packed_address(data, 20)?,
            payment_token: words::read_packed_address(data, 40)?,
            payment_receiver: words::read_packed_address(data, 60)?,
            payment: words::read_u128(data, 80)?,
            nonce: words::read_u128(data, 112)?,
            setup_data: data[Self::MIN_LEN..].to_vec(),
        }))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::MIN_LEN + self.setup_data.len());
        words::push_packed_address(&mut buf, &self.to);
        words::push_packed_address(&mut buf, &self.fallback_handler);
        words::push_packed_address(&mut buf, &self.payment_token);
        words::push_packed_address(&mut buf, &self.payment_receiver);
        words::push_u128(&mut buf, self.payment);
        words::push_u128(&mut buf, self.nonce);
        buf.extend_from_slice(&self.setup_data);
        buf
    }
}

/// Existing wallet to re-verify.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SameAddressPayload {
    pub multisig: Address,
}

impl SameAddressPayload {
    pub const LEN: usize = Address::LEN;

    /// Decode a payload of exactly one packed address.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() != Self::LEN {
            return Err(MultisigError::IncorrectDataLength {
                provided: data.len(),
                expected: Self::LEN,
            });
        }
        Ok(Self {
            multisig: words::read_packed_address(data, 0)?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::LEN);
        words::push_packed_address(&mut buf, &self.multisig);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> FreshDeployPayload {
        FreshDeployPayload {
            to: Address::from_label("to"),
            fallback_handler: Address::from_label("fallback"),
            payment_token: Address::ZERO,
            payment_receiver: Address::ZERO,
            payment: 0,
            nonce: 42,
            setup_data: vec![0xde, 0xad],
        }
    }

    #[test]
    fn fresh_prefix_is_144_bytes() {
        assert_eq!(FreshDeployPayload::MIN_LEN, 144);
        assert_eq!(fresh().encode().len(), 146);
    }

    #[test]
    fn fresh_decodes_fields() {
        let decoded = FreshDeployPayload::decode(&fresh().encode()).unwrap();
        assert_eq!(decoded, Some(fresh()));
    }

    #[test]
    fn empty_fresh_payload_is_none() {
        assert_eq!(FreshDeployPayload::decode(&[]).unwrap(), None);
    }

    #[test]
    fn short_fresh_payload_is_rejected() {
        assert_eq!(
            FreshDeployPayload::decode(&[0u8; 143]),
            Err(MultisigError::IncorrectDataLength {
                provided: 143,
                expected: 144
            })
        );
    }

    #[test]
    fn same_address_is_a_single_address() {
        let payload = SameAddressPayload {
            multisig: Address::from_label("wallet"),
        };
        let encoded = payload.encode();
        assert_eq!(encoded.len(), 20);
        assert_eq!(SameAddressPayload::decode(&encoded).unwrap(), payload);
    }

    #[test]
    fn same_address_rejects_other_lengths() {
        assert_eq!(
            SameAddressPayload::decode(&[0u8; 19]),
            Err(MultisigError::IncorrectDataLength {
                provided: 19,
                expected: 20
            })
        );

        let mut encoded = SameAddressPayload {
            multisig: Address::from_label("wallet"),
        }
        .encode();
        encoded.extend_from_slice(&[0u8; 64]);
        assert_eq!(
            SameAddressPayload::decode(&encoded),
            Err(MultisigError::IncorrectDataLength {
                provided: 84,
                expected: 20
            })
        );
    }
}
