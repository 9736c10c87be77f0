// CLASSIFICATION: COMMUNITY
// Filename: gpt.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! GUID partition table reader.
//!
//! Reads the primary GPT header and partition-entry array from a raw block
//! device. All reads are issued in 4 KiB aligned chunks into an aligned
//! buffer so the reader works on handles opened with `O_DIRECT`.

use std::cmp::min;
use std::fmt;
use std::io::{self, SeekFrom};
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use super::BlockDevice;

/// `EFI PART` header signature.
pub const SIGNATURE: &[u8; 8] = b"EFI PART";

const CHUNK: usize = 4096;
const MIN_HEADER_SIZE: u32 = 92;
const MIN_ENTRY_SIZE: u32 = 128;
const MAX_ENTRY_ARRAY: u64 = 1 << 20;

/// Errors produced while reading a partition table.
#[derive(Debug, Error)]
pub enum GptError {
    #[error("reading partition table: {0}")]
    Io(#[from] io::Error),
    #[error("no GPT signature at LBA 1")]
    MissingSignature,
    #[error("unsupported GPT header size {0}")]
    HeaderSize(u32),
    #[error("GPT header checksum mismatch (stored {stored:#010x}, computed {computed:#010x})")]
    HeaderChecksum { stored: u32, computed: u32 },
    #[error("partition entry checksum mismatch (stored {stored:#010x}, computed {computed:#010x})")]
    EntriesChecksum { stored: u32, computed: u32 },
    #[error("unsupported partition entry layout: {count} entries of {size} bytes")]
    EntryLayout { count: u32, size: u32 },
    #[error("invalid GUID `{0}`")]
    InvalidGuid(String),
}

/// A GUID kept in its on-disk (mixed-endian) byte order.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Guid([u8; 16]);

impl Guid {
    /// The all-zero GUID, used by GPT for unused entries.
    pub const ZERO: Guid = Guid([0; 16]);

    /// Wrap 16 bytes exactly as they appear on disk.
    pub fn from_disk_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_disk_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 16]
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{}-{}",
            u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            u16::from_le_bytes([b[4], b[5]]),
            u16::from_le_bytes([b[6], b[7]]),
            hex::encode(&b[8..10]),
            hex::encode(&b[10..16]),
        )
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({self})")
    }
}

impl FromStr for Guid {
    type Err = GptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GptError::InvalidGuid(s.to_string());
        let groups: Vec<&str> = s.trim().split('-').collect();
        if groups.len() != 5 {
            return Err(invalid());
        }
        let mut fields = Vec::with_capacity(5);
        for (group, len) in groups.iter().zip([8usize, 4, 4, 4, 12]) {
            if group.len() != len {
                return Err(invalid());
            }
            fields.push(hex::decode(group).map_err(|_| invalid())?);
        }
        // The first three fields are stored little-endian.
        let mut out = [0u8; 16];
        let mut pos = 0;
        for (i, field) in fields.iter().enumerate() {
            let bytes: Vec<u8> = if i < 3 {
                field.iter().rev().copied().collect()
            } else {
                field.clone()
            };
            out[pos..pos + bytes.len()].copy_from_slice(&bytes);
            pos += bytes.len();
        }
        Ok(Guid(out))
    }
}

impl TryFrom<String> for Guid {
    type Error = GptError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One slot of the partition-entry array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionEntry {
    pub type_id: Guid,
    pub partition_id: Guid,
    pub first_lba: u64,
    pub last_lba: u64,
    pub attributes: u64,
    pub name: String,
}

impl PartitionEntry {
    /// Unused slots carry an all-zero type GUID.
    pub fn is_used(&self) -> bool {
        !self.type_id.is_zero()
    }

    /// `last_lba - first_lba`, in logical blocks.
    pub fn lba_span(&self) -> u64 {
        self.last_lba.saturating_sub(self.first_lba)
    }
}

/// A parsed primary GPT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionTable {
    pub disk_id: Guid,
    pub block_size: u64,
    /// Every slot of the entry array, in table order.
    pub partitions: Vec<PartitionEntry>,
}

/// Partition-table collaborator consumed by the matcher.
pub trait PartitionTableReader {
    fn read_table(&self, dev: &mut dyn BlockDevice) -> Result<PartitionTable, GptError>;
}

/// Reads the primary GPT header and entry array.
#[derive(Debug, Default, Clone, Copy)]
pub struct GptReader;

impl PartitionTableReader for GptReader {
    fn read_table(&self, dev: &mut dyn BlockDevice) -> Result<PartitionTable, GptError> {
        let head = read_region(dev, 0, 2 * CHUNK)?;
        let block_size = [512usize, 4096]
            .into_iter()
            .find(|&bs| head.get(bs..bs + SIGNATURE.len()) == Some(SIGNATURE.as_slice()))
            .ok_or(GptError::MissingSignature)?;
        let header = &head[block_size..block_size * 2];

        let header_size = le_u32(header, 12);
        if header_size < MIN_HEADER_SIZE || header_size as usize > block_size {
            return Err(GptError::HeaderSize(header_size));
        }
        let stored = le_u32(header, 16);
        let mut scratch = header[..header_size as usize].to_vec();
        scratch[16..20].fill(0);
        let computed = crc32fast::hash(&scratch);
        if stored != computed {
            return Err(GptError::HeaderChecksum { stored, computed });
        }

        let disk_id = guid_at(header, 56);
        let entries_lba = le_u64(header, 72);
        let count = le_u32(header, 80);
        let size = le_u32(header, 84);
        let entries_crc = le_u32(header, 88);
        let array_len = u64::from(count) * u64::from(size);
        if size < MIN_ENTRY_SIZE || size % 8 != 0 || array_len > MAX_ENTRY_ARRAY {
            return Err(GptError::EntryLayout { count, size });
        }

        // The array plus one chunk of read-ahead must stay addressable.
        let offset = entries_lba
            .checked_mul(block_size as u64)
            .filter(|off| off.checked_add(array_len + CHUNK as u64).is_some())
            .ok_or(GptError::EntryLayout { count, size })?;
        let array = read_region(dev, offset, array_len as usize)?;
        let computed = crc32fast::hash(&array);
        if entries_crc != computed {
            return Err(GptError::EntriesChecksum {
                stored: entries_crc,
                computed,
            });
        }

        let partitions = array
            .chunks_exact(size as usize)
            .map(parse_entry)
            .collect();
        Ok(PartitionTable {
            disk_id,
            block_size: block_size as u64,
            partitions,
        })
    }
}

#[repr(C, align(4096))]
struct AlignedChunk([u8; CHUNK]);

/// Read `len` bytes at `offset` using whole, aligned chunks only.
fn read_region(dev: &mut dyn BlockDevice, offset: u64, len: usize) -> io::Result<Vec<u8>> {
    let chunk = CHUNK as u64;
    let end = offset
        .checked_add(len as u64)
        .filter(|end| end.checked_add(chunk).is_some())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "region past end of address space"))?;
    let mut pos = offset - offset % chunk;
    let mut buf = Box::new(AlignedChunk([0; CHUNK]));
    let mut out = Vec::with_capacity(len);
    dev.seek(SeekFrom::Start(pos))?;
    while pos < end {
        dev.read_exact(&mut buf.0)?;
        let lo = offset.saturating_sub(pos) as usize;
        let hi = min(chunk, end - pos) as usize;
        out.extend_from_slice(&buf.0[lo..hi]);
        pos += chunk;
    }
    Ok(out)
}

fn parse_entry(raw: &[u8]) -> PartitionEntry {
    let units: Vec<u16> = raw[56..128]
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0)
        .collect();
    PartitionEntry {
        type_id: guid_at(raw, 0),
        partition_id: guid_at(raw, 16),
        first_lba: le_u64(raw, 32),
        last_lba: le_u64(raw, 40),
        attributes: le_u64(raw, 48),
        name: String::from_utf16_lossy(&units),
    }
}

fn guid_at(buf: &[u8], at: usize) -> Guid {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&buf[at..at + 16]);
    Guid(bytes)
}

fn le_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn le_u64(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}
