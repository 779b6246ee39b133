use crate::provider::{algorithms, HashAlgorithm};

/// Plain BLAKE3.
#[derive(Clone, Copy, Debug, Default)]
pub struct Blake3;

impl HashAlgorithm for Blake3 {
    fn name(&self) -> &str {
        algorithms::BLAKE3
    }

    fn output_len(&self) -> usize {
        blake3::OUT_LEN
    }

    fn hash(&self, data: &[u8]) -> Vec<u8> {
        blake3::hash(data).as_bytes().to_vec()
    }

    fn hash_parts(&self, parts: &[&[u8]]) -> Vec<u8> {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(part);
        }
        hasher.finalize().as_bytes().to_vec()
    }
}

/// BLAKE3 in keyed mode.
///
/// Two ledgers hashing identical bytes produce unrelated digests, so hashes
/// (and therefore link hashes and author ids) never collide across ledgers.
#[derive(Clone)]
pub struct Blake3Keyed {
    key: [u8; 32],
}

impl Blake3Keyed {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }
}

impl HashAlgorithm for Blake3Keyed {
    fn name(&self) -> &str {
        algorithms::BLAKE3_LEDGER_KEYED
    }

    fn output_len(&self) -> usize {
        blake3::OUT_LEN
    }

    fn hash(&self, data: &[u8]) -> Vec<u8> {
        blake3::keyed_hash(&self.key, data).as_bytes().to_vec()
    }

    fn hash_parts(&self, parts: &[&[u8]]) -> Vec<u8> {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        for part in parts {
            hasher.update(part);
        }
        hasher.finalize().as_bytes().to_vec()
    }
}

impl std::fmt::Debug for Blake3Keyed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Blake3Keyed(<redacted>)")
    }
}
