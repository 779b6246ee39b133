use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tel_block::{BlockBuilder, BlockTypeSequence};
use tel_types::hex_bytes;

use crate::error::PolicyError;

/// The only policy payload version understood so far.
pub const POLICY_VERSION_1: u64 = 1;

/// Per-ledger ruleset carried by the genesis block.
///
/// Version 1 payloads are JSON objects with hex-encoded byte fields. Every
/// field is required and unknown fields are rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Policy {
    #[serde(with = "hex_bytes")]
    pub ledger_public_key: Vec<u8>,
    pub max_block_size: u64,
    pub hashing_algorithm: String,
    pub signing_algorithm: String,
    /// Raw block type sequences, one per allowed nesting shape.
    #[serde(with = "hex_bytes::list")]
    pub allowed_blocks: Vec<Vec<u8>>,
    #[serde(with = "hex_bytes::list")]
    pub author_keys: Vec<Vec<u8>>,
    /// Opaque to the ledger; interpreted by applications.
    pub application_data: serde_json::Value,
}

impl Policy {
    /// Parse and validate a policy payload of the given version.
    pub fn parse(version: u64, payload: &[u8]) -> Result<Self, PolicyError> {
        match version {
            POLICY_VERSION_1 => Self::parse_v1(payload),
            other => Err(PolicyError::UnsupportedVersion(other)),
        }
    }

    fn parse_v1(payload: &[u8]) -> Result<Self, PolicyError> {
        let policy: Self =
            serde_json::from_slice(payload).map_err(|e| PolicyError::Json(e.to_string()))?;
        policy.validate()?;
        Ok(policy)
    }

    /// Checks that the JSON schema alone cannot express.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.max_block_size == 0 {
            return Err(PolicyError::ZeroMaxBlockSize);
        }
        if self.application_data.is_null() {
            return Err(PolicyError::MissingApplicationData);
        }
        self.allowed_sequences().map(|_| ())
    }

    /// Parsed allowed shapes; duplicates are an error.
    pub fn allowed_sequences(&self) -> Result<HashSet<BlockTypeSequence>, PolicyError> {
        let mut allowed = HashSet::with_capacity(self.allowed_blocks.len());
        for (index, raw) in self.allowed_blocks.iter().enumerate() {
            let sequence = BlockTypeSequence::from_raw_bytes(raw)
                .map_err(|source| PolicyError::InvalidAllowedBlock { index, source })?;
            let display = sequence.to_string();
            if !allowed.insert(sequence) {
                return Err(PolicyError::DuplicateAllowedBlock(display));
            }
        }
        Ok(allowed)
    }

    /// Serialize as a version 1 payload.
    pub fn to_payload(&self) -> Result<Vec<u8>, PolicyError> {
        serde_json::to_vec(self).map_err(|e| PolicyError::Json(e.to_string()))
    }

    /// Genesis block carrying this policy.
    pub fn to_block(&self) -> Result<BlockBuilder, PolicyError> {
        Ok(BlockBuilder::policy(POLICY_VERSION_1, self.to_payload()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tel_types::BlockType;

    fn sample() -> Policy {
        Policy {
            ledger_public_key: b"ledger key".to_vec(),
            max_block_size: 10 * 1024,
            hashing_algorithm: "blake3(ledgerId)".into(),
            signing_algorithm: "ed25519".into(),
            allowed_blocks: vec![b"D".to_vec(), b"SUD".to_vec()],
            author_keys: vec![vec![7; 32]],
            application_data: json!({ "version": "1.0.0" }),
        }
    }

    #[test]
    fn payload_round_trips() {
        let policy = sample();
        let payload = policy.to_payload().unwrap();
        assert_eq!(Policy::parse(1, &payload).unwrap(), policy);
    }

    #[test]
    fn byte_fields_are_hex() {
        let value: serde_json::Value = serde_json::from_slice(&sample().to_payload().unwrap()).unwrap();
        assert_eq!(value["ledger_public_key"], json!(hex::encode(b"ledger key")));
        assert_eq!(value["allowed_blocks"], json!(["44", "535544"]));
    }

    #[test]
    fn allowed_sequences_parse() {
        let allowed = sample().allowed_sequences().unwrap();
        assert!(allowed.contains(&BlockTypeSequence::from_types([
            BlockType::AuthorSignature,
            BlockType::UpdateContext,
            BlockType::Data
        ])));
        assert_eq!(allowed.len(), 2);
    }

    #[test]
    fn unsupported_version() {
        assert_eq!(
            Policy::parse(0, b"reserved version"),
            Err(PolicyError::UnsupportedVersion(0))
        );
    }

    #[test]
    fn malformed_documents() {
        let cases: [&[u8]; 5] = [
            b"null",
            br#"{"ledger_public_key":"00","signing_algorithm":"x","hashing_algorithm":"x","allowed_blocks":[],"author_keys":[],"application_data":{}}"#,
            br#"{"ledger_public_key":"00","max_block_size":true,"signing_algorithm":"x","hashing_algorithm":"x","allowed_blocks":[],"author_keys":[],"application_data":{}}"#,
            br#"{"unexpected":true,"ledger_public_key":"00","max_block_size":1,"signing_algorithm":"x","hashing_algorithm":"x","allowed_blocks":[],"author_keys":[],"application_data":{}}"#,
            br#"{"ledger_public_key":"zz","max_block_size":1,"signing_algorithm":"x","hashing_algorithm":"x","allowed_blocks":[],"author_keys":[],"application_data":{}}"#,
        ];
        for case in cases {
            assert!(
                matches!(Policy::parse(1, case), Err(PolicyError::Json(_))),
                "{}",
                String::from_utf8_lossy(case)
            );
        }
    }

    #[test]
    fn semantic_violations() {
        let mut policy = sample();
        policy.max_block_size = 0;
        assert_eq!(policy.validate(), Err(PolicyError::ZeroMaxBlockSize));

        let mut policy = sample();
        policy.allowed_blocks = vec![b"D".to_vec(), b"D".to_vec()];
        assert!(matches!(
            policy.validate(),
            Err(PolicyError::DuplicateAllowedBlock(_))
        ));

        let mut policy = sample();
        policy.allowed_blocks = vec![b"-".to_vec()];
        assert!(matches!(
            policy.validate(),
            Err(PolicyError::InvalidAllowedBlock { index: 0, .. })
        ));

        let mut policy = sample();
        policy.allowed_blocks = vec![vec![0x80]];
        assert!(policy.validate().is_err());

        let mut policy = sample();
        policy.application_data = serde_json::Value::Null;
        assert_eq!(policy.validate(), Err(PolicyError::MissingApplicationData));
    }

    #[test]
    fn genesis_block_carries_version_one() {
        let block = sample().to_block().unwrap().build().unwrap();
        match block.body() {
            tel_block::BlockBody::Policy { version, policy } => {
                assert_eq!(*version, 1);
                assert_eq!(Policy::parse(1, policy).unwrap(), sample());
            }
            other => panic!("unexpected body {other:?}"),
        }
    }
}
