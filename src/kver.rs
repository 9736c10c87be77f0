// CLASSIFICATION: COMMUNITY
// Filename: kver.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Version string embedded in an x86 bzImage header.
//!
//! Layout (boot protocol): `0x55AA` at 510, `HdrS` at 514, and at 526 a
//! little-endian offset which, plus 0x200, locates the NUL-terminated
//! version string.

use std::io::{self, Read, Seek, SeekFrom};
use std::str::FromStr;

use chrono::NaiveDateTime;
use thiserror::Error;

/// Longest version string we are willing to read.
pub const KVER_MAX: u64 = 1024;

const HEADER_LEN: usize = 530;
const BUILD_TIME_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

#[derive(Debug, Error)]
pub enum KverError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("missing 0x55AA boot sig")]
    BootSignature,
    #[error("missing kernel header sig")]
    HeaderSignature,
    #[error("null version string offset")]
    NullOffset,
    #[error("parse error: {desc}: {reason}")]
    Parse { desc: String, reason: String },
}

fn parse_err(desc: &str, reason: impl Into<String>) -> KverError {
    KverError::Parse {
        desc: desc.to_string(),
        reason: reason.into(),
    }
}

/// Read the raw version description from a bzImage.
pub fn read_version<R: Read + Seek>(image: &mut R) -> Result<String, KverError> {
    let mut hdr = [0u8; HEADER_LEN];
    image.seek(SeekFrom::Start(0))?;
    image.read_exact(&mut hdr)?;
    if hdr[510..512] != [0x55, 0xaa] {
        return Err(KverError::BootSignature);
    }
    if &hdr[514..518] != b"HdrS" {
        return Err(KverError::HeaderSignature);
    }
    if hdr[526..530] == [0, 0, 0, 0] {
        return Err(KverError::NullOffset);
    }
    let off = u64::from(u16::from_le_bytes([hdr[526], hdr[527]])) + 0x200;
    image.seek(SeekFrom::Start(off))?;

    let mut buf = Vec::with_capacity(KVER_MAX as usize);
    image.take(KVER_MAX).read_to_end(&mut buf)?;
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}

/// Parse the embedded version of an already-open image, then rewind it.
pub fn probe<R: Read + Seek>(image: &mut R) -> Result<KernelInfo, KverError> {
    let desc = read_version(image);
    image.rewind()?;
    desc?.parse()
}

/// Fields of a description such as
/// `4.19.16-norm_boot (user@host) #300 SMP Fri Jan 25 16:32:19 UTC 2019`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelInfo {
    /// `uname -r`
    pub release: String,
    /// `uname -v`, starting at `#`
    pub version: String,
    /// `user@host`, when present
    pub builder: String,
    pub build_num: u64,
    /// Wall-clock build time; the zone abbreviation is kept only in `version`.
    pub build_time: NaiveDateTime,
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub local_version: String,
}

impl KernelInfo {
    pub fn parse(desc: &str) -> Result<Self, KverError> {
        let (head, tail) = match desc.split('#').collect::<Vec<_>>()[..] {
            [head, tail] => (head, tail),
            _ => return Err(parse_err(desc, "wrong number of '#' chars")),
        };
        let version = format!("#{tail}");

        let (release, builder) = match head.split_once(' ') {
            Some((r, b)) => (r, b.trim_matches(&[' ', '(', ')'][..])),
            None => (head, ""),
        };

        let (num, rest) = tail
            .split_once(' ')
            .ok_or_else(|| parse_err(desc, "wrong number of spaces in build/version"))?;
        let build_num = parse_uint(desc, num)?;
        let stamp = rest.trim().trim_start_matches("SMP").trim();
        let build_time = parse_build_time(stamp)
            .ok_or_else(|| parse_err(desc, format!("bad time {stamp}")))?;

        let parts: Vec<&str> = release.split('.').collect();
        if parts.len() < 3 {
            return Err(parse_err(
                desc,
                format!("wrong number of dots in release {release}"),
            ));
        }
        let major = parse_uint(desc, parts[0])?;
        let minor = parse_uint(desc, parts[1])?;
        let patch_str = parts[2].split('-').next().unwrap_or(parts[2]);
        let patch = parse_uint(desc, patch_str)?;
        let local_version = parts[parts.len() - 1]
            .split_once('-')
            .map(|(_, l)| l.to_string())
            .unwrap_or_default();

        Ok(Self {
            release: release.to_string(),
            version,
            builder: builder.to_string(),
            build_num,
            build_time,
            major,
            minor,
            patch,
            local_version,
        })
    }
}

impl FromStr for KernelInfo {
    type Err = KverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_uint(desc: &str, s: &str) -> Result<u64, KverError> {
    s.parse()
        .map_err(|e| parse_err(desc, format!("bad uint {s}: {e}")))
}

// `Mon Jan 2 15:04:05 MST 2006`; the zone token is dropped.
fn parse_build_time(stamp: &str) -> Option<NaiveDateTime> {
    let fields: Vec<&str> = stamp.split_whitespace().collect();
    if fields.len() != 6 {
        return None;
    }
    let without_zone = [fields[0], fields[1], fields[2], fields[3], fields[5]].join(" ");
    NaiveDateTime::parse_from_str(&without_zone, BUILD_TIME_FORMAT).ok()
}
