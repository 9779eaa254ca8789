//! Radix-indexed companion file: a character trie over lower-cased feature
//! identifiers, pointing into gene subtree records.
//!
//! Layout: header, trie nodes starting at the fixed root offset, encoded
//! gene subtrees, then the flat all-records list referenced from the
//! header. Node layout: child count (u8), count pairs of (character byte,
//! child address), matched-gene count (u32), count gene addresses.
//! Identifiers are stored byte-wise, so multi-byte UTF-8 characters become
//! chains of single-byte edges.

use std::collections::BTreeMap;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::Error;
use crate::feature::{FeatureType, GenomicFeature};
use crate::store::binary_io::{BinaryRead, BinaryWrite};
use crate::store::entity_tree::EntityTreeCodec;
use crate::store::header::{RadixHeader, RADIX_ROOT_OFFSET};
use crate::store::string_pool::checked_address;

/// Property keys whose values are indexed by default.
pub const DEFAULT_IDENTIFIER_KEYS: &[&str] = &["gene_name", "gene_id"];

/// True when any property value equals `text` case-insensitively.
///
/// Used for exact-match filtering after a prefix walk.
#[must_use]
pub fn matches_text(feature: &GenomicFeature, text: &str) -> bool {
    feature
        .properties()
        .values()
        .any(|value| value.eq_ignore_ascii_case(text))
}

/// Build-side trie node; children keyed by byte, matches are gene ordinals.
#[derive(Default)]
struct BuildNode {
    children: BTreeMap<u8, usize>,
    matches: Vec<usize>,
}

/// Writes a radix-indexed file for one assembly.
pub struct RadixIndexWriter;

impl RadixIndexWriter {
    /// Write a complete radix file indexing `genes` under the values of
    /// `identifier_keys` (lower-cased).
    pub fn write<W: Write + Seek>(
        writer: &mut W,
        genes: &[GenomicFeature],
        identifier_keys: &[&str],
    ) -> Result<(), Error> {
        let mut nodes: Vec<BuildNode> = vec![BuildNode::default()];
        for (ordinal, gene) in genes.iter().enumerate() {
            for key in identifier_keys {
                if let Some(identifier) = gene.property(key) {
                    insert(&mut nodes, &identifier.to_lowercase(), ordinal);
                }
            }
        }

        // Pre-order offset assignment; the root lands at the fixed offset.
        let order = preorder(&nodes);
        let mut offsets = vec![0u32; nodes.len()];
        let mut next = RADIX_ROOT_OFFSET;
        for &index in &order {
            offsets[index] = next;
            next = next
                .checked_add(node_size(&nodes[index]))
                .ok_or_else(|| {
                    Error::Validation("radix tree exceeds u32 address space".to_string())
                })?;
        }

        // Gene subtrees follow the trie nodes.
        writer.seek(SeekFrom::Start(u64::from(next)))?;
        let mut gene_addresses = Vec::with_capacity(genes.len());
        for gene in genes {
            gene_addresses.push(EntityTreeCodec::encode(writer, gene)?);
        }

        let all_records_address = checked_address(writer.stream_position()?)?;
        writer.write_u32(u32::try_from(gene_addresses.len()).map_err(|_| {
            Error::Validation("record count exceeds u32::MAX".to_string())
        })?)?;
        for &address in &gene_addresses {
            writer.write_u32(address)?;
        }
        let file_end = writer.stream_position()?;

        writer.seek(SeekFrom::Start(0))?;
        RadixHeader {
            all_records_address,
        }
        .write(writer)?;

        for &index in &order {
            let node = &nodes[index];
            writer.write_u8(u8::try_from(node.children.len()).map_err(|_| {
                Error::Validation(format!(
                    "trie node child count {} exceeds u8 range",
                    node.children.len()
                ))
            })?)?;
            for (&byte, &child) in &node.children {
                writer.write_u8(byte)?;
                writer.write_u32(offsets[child])?;
            }
            writer.write_u32(u32::try_from(node.matches.len()).map_err(|_| {
                Error::Validation("trie match count exceeds u32::MAX".to_string())
            })?)?;
            for &ordinal in &node.matches {
                writer.write_u32(gene_addresses[ordinal])?;
            }
        }

        writer.seek(SeekFrom::Start(file_end))?;
        Ok(())
    }
}

fn insert(nodes: &mut Vec<BuildNode>, identifier: &str, ordinal: usize) {
    let mut current = 0usize;
    for byte in identifier.bytes() {
        current = match nodes[current].children.get(&byte).copied() {
            Some(child) => child,
            None => {
                let child = nodes.len();
                nodes.push(BuildNode::default());
                nodes[current].children.insert(byte, child);
                child
            }
        };
    }
    if !nodes[current].matches.contains(&ordinal) {
        nodes[current].matches.push(ordinal);
    }
}

fn preorder(nodes: &[BuildNode]) -> Vec<usize> {
    let mut order = Vec::with_capacity(nodes.len());
    let mut stack = vec![0usize];
    while let Some(index) = stack.pop() {
        order.push(index);
        // Reverse so the lexicographically first child is visited first.
        for &child in nodes[index].children.values().rev() {
            stack.push(child);
        }
    }
    order
}

fn node_size(node: &BuildNode) -> u32 {
    1 + 5 * node.children.len() as u32 + 4 + 4 * node.matches.len() as u32
}

/// One decoded trie node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrieNode {
    /// Ordered (character byte, child address) edges.
    pub children: Vec<(u8, u32)>,
    /// Gene addresses whose identifier ends at this node.
    pub matches: Vec<u32>,
}

/// Reader over a radix-indexed file.
pub struct RadixIndex<R> {
    handle: R,
    all_records_address: u32,
}

impl<R: Read + Seek> RadixIndex<R> {
    /// Open a radix file, validating its header.
    pub fn open(mut handle: R) -> Result<Self, Error> {
        handle.seek(SeekFrom::Start(0))?;
        let header = RadixHeader::read(&mut handle)?;
        Ok(Self {
            handle,
            all_records_address: header.all_records_address,
        })
    }

    fn read_node(&mut self, address: u32) -> Result<TrieNode, Error> {
        self.handle.seek(SeekFrom::Start(u64::from(address)))?;
        let child_count = self.handle.read_u8()?;
        let mut children = Vec::with_capacity(child_count as usize);
        for _ in 0..child_count {
            let byte = self.handle.read_u8()?;
            let child_address = self.handle.read_u32()?;
            children.push((byte, child_address));
        }
        let match_count = self.handle.read_u32()?;
        let mut matches = Vec::with_capacity(match_count as usize);
        for _ in 0..match_count {
            matches.push(self.handle.read_u32()?);
        }
        Ok(TrieNode { children, matches })
    }

    /// Gene addresses whose indexed identifier starts with `prefix`
    /// (case-insensitive). A character with no matching edge yields an
    /// empty result, not an error.
    pub fn search(&mut self, prefix: &str) -> Result<Vec<u32>, Error> {
        let mut node = self.read_node(RADIX_ROOT_OFFSET)?;
        for byte in prefix.to_lowercase().bytes() {
            let edge = node
                .children
                .iter()
                .find(|&&(c, _)| c == byte)
                .map(|&(_, child_address)| child_address);
            match edge {
                Some(child_address) => node = self.read_node(child_address)?,
                None => return Ok(Vec::new()),
            }
        }
        self.collect_matches(node)
    }

    // Prefix semantics: the matched node's own addresses plus every
    // descendant's, depth-first.
    fn collect_matches(&mut self, node: TrieNode) -> Result<Vec<u32>, Error> {
        let mut addresses = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            addresses.extend(current.matches);
            for &(_, child_address) in current.children.iter().rev() {
                stack.push(self.read_node(child_address)?);
            }
        }
        Ok(addresses)
    }

    /// Addresses of every record in the store, from the flat list.
    pub fn all_addresses(&mut self) -> Result<Vec<u32>, Error> {
        self.handle
            .seek(SeekFrom::Start(u64::from(self.all_records_address)))?;
        let count = self.handle.read_u32()?;
        let mut addresses = Vec::with_capacity(count as usize);
        for _ in 0..count {
            addresses.push(self.handle.read_u32()?);
        }
        Ok(addresses)
    }

    /// Decode the gene subtree at `address` at the requested granularity.
    pub fn decode_at(
        &mut self,
        address: u32,
        granularity: FeatureType,
    ) -> Result<Vec<GenomicFeature>, Error> {
        self.handle.seek(SeekFrom::Start(u64::from(address)))?;
        EntityTreeCodec::decode(&mut self.handle, granularity)
    }
}
