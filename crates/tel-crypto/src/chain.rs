use crate::provider::HashAlgorithm;

/// Compute the link hash for a block.
///
/// `link = H(block_hash ++ previous_link)`; the genesis block has no previous
/// link, so its link hash is `H(block_hash)`.
pub fn link_hash(
    hasher: &dyn HashAlgorithm,
    block_hash: &[u8],
    previous_link_hash: Option<&[u8]>,
) -> Vec<u8> {
    match previous_link_hash {
        Some(previous) => hasher.hash_parts(&[block_hash, previous]),
        None => hasher.hash(block_hash),
    }
}

/// Block hash and link hash of one position in the chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainLink {
    pub block_hash: Vec<u8>,
    pub link_hash: Vec<u8>,
}

/// Replays raw blocks into link hashes.
///
/// The chain commits to the raw bytes only, so anyone holding the blocks can
/// reproduce every link hash without evaluating a single block.
pub struct LinkChainVerifier;

impl LinkChainVerifier {
    /// Compute the chain links for `blocks`, genesis first.
    pub fn replay<'a>(
        hasher: &dyn HashAlgorithm,
        blocks: impl IntoIterator<Item = &'a [u8]>,
    ) -> Vec<ChainLink> {
        let mut links: Vec<ChainLink> = Vec::new();
        for raw in blocks {
            let block_hash = hasher.hash(raw);
            let previous = links.last().map(|l| l.link_hash.as_slice());
            let link_hash = link_hash(hasher, &block_hash, previous);
            links.push(ChainLink {
                block_hash,
                link_hash,
            });
        }
        links
    }

    /// Check that `blocks` reproduce the claimed head link hash.
    pub fn verify_head<'a>(
        hasher: &dyn HashAlgorithm,
        blocks: impl IntoIterator<Item = &'a [u8]>,
        expected_head: &[u8],
    ) -> Result<(), ChainError> {
        let links = Self::replay(hasher, blocks);
        match links.last() {
            None => Err(ChainError::EmptyChain),
            Some(head) if head.link_hash == expected_head => Ok(()),
            Some(_) => Err(ChainError::HeadMismatch {
                block_count: links.len() as u64,
            }),
        }
    }

    /// Check a recorded list of link hashes against the blocks they claim
    /// to link.
    pub fn verify_links<'a>(
        hasher: &dyn HashAlgorithm,
        blocks: impl IntoIterator<Item = &'a [u8]>,
        recorded: &[Vec<u8>],
    ) -> Result<(), ChainError> {
        let links = Self::replay(hasher, blocks);
        if links.len() != recorded.len() {
            return Err(ChainError::LengthMismatch {
                blocks: links.len(),
                links: recorded.len(),
            });
        }
        for (index, (link, claimed)) in links.iter().zip(recorded).enumerate() {
            if link.link_hash != *claimed {
                return Err(ChainError::LinkMismatch {
                    index: index as u64,
                });
            }
        }
        Ok(())
    }
}

/// Errors from chain verification.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("no blocks to replay")]
    EmptyChain,

    #[error("head link hash mismatch after {block_count} blocks")]
    HeadMismatch { block_count: u64 },

    #[error("link hash mismatch at index {index}")]
    LinkMismatch { index: u64 },

    #[error("{blocks} blocks but {links} recorded link hashes")]
    LengthMismatch { blocks: usize, links: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::Blake3Keyed;

    fn blocks(count: usize) -> Vec<Vec<u8>> {
        (0..count).map(|i| format!("Dblock-{i}").into_bytes()).collect()
    }

    fn hasher() -> Blake3Keyed {
        Blake3Keyed::new([5; 32])
    }

    #[test]
    fn genesis_link_is_hash_of_block_hash() {
        let h = hasher();
        let links = LinkChainVerifier::replay(&h, [b"Gpolicy".as_slice()]);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].block_hash, h.hash(b"Gpolicy"));
        assert_eq!(links[0].link_hash, h.hash(&links[0].block_hash));
    }

    #[test]
    fn links_fold_previous_link() {
        let h = hasher();
        let raw = blocks(3);
        let links = LinkChainVerifier::replay(&h, raw.iter().map(Vec::as_slice));
        let mut expected = links[1].block_hash.clone();
        expected.extend_from_slice(&links[0].link_hash);
        assert_eq!(links[1].link_hash, h.hash(&expected));
    }

    #[test]
    fn verify_head_accepts_matching_chain() {
        let h = hasher();
        let raw = blocks(10);
        let links = LinkChainVerifier::replay(&h, raw.iter().map(Vec::as_slice));
        let head = links.last().unwrap().link_hash.clone();
        assert!(LinkChainVerifier::verify_head(&h, raw.iter().map(Vec::as_slice), &head).is_ok());
    }

    #[test]
    fn empty_chain_rejected() {
        let err = LinkChainVerifier::verify_head(&hasher(), std::iter::empty(), &[0; 32]);
        assert_eq!(err, Err(ChainError::EmptyChain));
    }

    #[test]
    fn tampered_block_detected() {
        let h = hasher();
        let mut raw = blocks(4);
        let recorded: Vec<Vec<u8>> = LinkChainVerifier::replay(&h, raw.iter().map(Vec::as_slice))
            .into_iter()
            .map(|l| l.link_hash)
            .collect();

        raw[2] = b"Dtampered".to_vec();
        assert_eq!(
            LinkChainVerifier::verify_links(&h, raw.iter().map(Vec::as_slice), &recorded),
            Err(ChainError::LinkMismatch { index: 2 })
        );
        assert_eq!(
            LinkChainVerifier::verify_head(&h, raw.iter().map(Vec::as_slice), &recorded[3]),
            Err(ChainError::HeadMismatch { block_count: 4 })
        );
    }

    #[test]
    fn length_mismatch_detected() {
        let h = hasher();
        let raw = blocks(2);
        assert_eq!(
            LinkChainVerifier::verify_links(&h, raw.iter().map(Vec::as_slice), &[]),
            Err(ChainError::LengthMismatch { blocks: 2, links: 0 })
        );
    }
}
