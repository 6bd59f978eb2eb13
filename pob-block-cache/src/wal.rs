// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Write-ahead log of linked blocks.
//!
//! The log is a directory of segment files, each an append-only sequence of
//! length-prefixed serialized blocks in link order. A fresh segment is
//! started on every open and after every `segment_entries` appends, so that
//! LIB advancement can truncate history by deleting whole files. A replay
//! that hits a malformed record moves the whole directory aside and restarts
//! empty.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::ops::Bound::Included;
use std::path::{Path, PathBuf};

use pob_models::block::{Block, BlockDeserializer, BlockSerializer};
use pob_serialization::{
    DeserializeError, Deserializer, Serializer, U32VarIntDeserializer, U32VarIntSerializer,
};
use tracing::{debug, warn};

use crate::error::BlockCacheError;

const SEGMENT_PREFIX: &str = "wal-";
const SEGMENT_SUFFIX: &str = ".bin";
/// Upper bound on one serialized block record in the log
const MAX_RECORD_LEN: u32 = 64 * 1024 * 1024;

struct Segment {
    path: PathBuf,
    max_number: u64,
}

/// Append-only segmented log of serialized blocks
pub struct Wal {
    dir: PathBuf,
    segment_entries: u64,
    next_seq: u64,
    current: Option<(u64, File)>,
    entries_in_current: u64,
    segments: BTreeMap<u64, Segment>,
    block_serializer: BlockSerializer,
    len_serializer: U32VarIntSerializer,
}

fn segment_path(dir: &Path, seq: u64) -> PathBuf {
    dir.join(format!("{}{:010}{}", SEGMENT_PREFIX, seq, SEGMENT_SUFFIX))
}

fn segment_seq(path: &Path) -> Option<u64> {
    let name = path.file_name()?.to_str()?;
    let stripped = name.strip_prefix(SEGMENT_PREFIX)?.strip_suffix(SEGMENT_SUFFIX)?;
    stripped.parse().ok()
}

fn parse_segment(bytes: &[u8], out: &mut Vec<Block>) -> Result<u64, BlockCacheError> {
    let len_deserializer = U32VarIntDeserializer::new(Included(0), Included(MAX_RECORD_LEN));
    let block_deserializer = BlockDeserializer::new();
    let mut rest = bytes;
    let mut max_number = 0;
    while !rest.is_empty() {
        let (after_len, len) = len_deserializer
            .deserialize::<DeserializeError>(rest)
            .map_err(|err| BlockCacheError::WalCorrupt(format!("bad record length: {}", err)))?;
        let len = len as usize;
        if after_len.len() < len {
            return Err(BlockCacheError::WalCorrupt(
                "truncated trailing record".to_string(),
            ));
        }
        let record = &after_len[..len];
        let (leftover, block) = block_deserializer
            .deserialize::<DeserializeError>(record)
            .map_err(|err| BlockCacheError::WalCorrupt(format!("bad block record: {}", err)))?;
        if !leftover.is_empty() {
            return Err(BlockCacheError::WalCorrupt(
                "record longer than its block".to_string(),
            ));
        }
        max_number = max_number.max(block.number());
        out.push(block);
        rest = &after_len[len..];
    }
    Ok(max_number)
}

impl Wal {
    /// Opens the log, replaying every record in order.
    ///
    /// Returns the log handle and the replayed blocks. A malformed record
    /// surfaces as `WalCorrupt`; callers rotate with
    /// [`Wal::rotate_corrupted`] and reopen.
    pub fn open(dir: &Path, segment_entries: u64) -> Result<(Wal, Vec<Block>), BlockCacheError> {
        std::fs::create_dir_all(dir)?;

        let mut seqs: Vec<u64> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| segment_seq(&entry.path()))
            .collect();
        seqs.sort_unstable();

        let mut blocks = Vec::new();
        let mut segments = BTreeMap::new();
        for seq in &seqs {
            let path = segment_path(dir, *seq);
            let mut bytes = Vec::new();
            File::open(&path)?.read_to_end(&mut bytes)?;
            let max_number = parse_segment(&bytes, &mut blocks)?;
            segments.insert(
                *seq,
                Segment {
                    path,
                    max_number,
                },
            );
        }

        let next_seq = seqs.last().map(|seq| seq + 1).unwrap_or(0);
        debug!(
            "opened block cache WAL at {:?}: {} segments, {} blocks",
            dir,
            segments.len(),
            blocks.len()
        );
        Ok((
            Wal {
                dir: dir.to_path_buf(),
                segment_entries,
                next_seq,
                current: None,
                entries_in_current: 0,
                segments,
                block_serializer: BlockSerializer::new(),
                len_serializer: U32VarIntSerializer::new(),
            },
            blocks,
        ))
    }

    /// Moves a corrupted log directory aside so that a fresh one can start.
    pub fn rotate_corrupted(dir: &Path) -> Result<(), BlockCacheError> {
        if dir.exists() {
            let mut target = dir.with_extension("corrupted");
            let mut index = 0;
            while target.exists() {
                index += 1;
                target = dir.with_extension(format!("corrupted.{}", index));
            }
            warn!("moving corrupted WAL {:?} to {:?}", dir, target);
            std::fs::rename(dir, &target)?;
        }
        std::fs::create_dir_all(dir)?;
        Ok(())
    }

    /// Appends a block record, rolling to a new segment when the current one
    /// is full.
    pub fn append(&mut self, block: &Block) -> Result<(), BlockCacheError> {
        if self.current.is_none() || self.entries_in_current >= self.segment_entries {
            let seq = self.next_seq;
            self.next_seq += 1;
            let path = segment_path(&self.dir, seq);
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            self.segments.insert(
                seq,
                Segment {
                    path,
                    max_number: 0,
                },
            );
            self.current = Some((seq, file));
            self.entries_in_current = 0;
        }

        let mut record = Vec::new();
        self.block_serializer.serialize(block, &mut record)?;
        let mut framed = Vec::with_capacity(record.len() + 5);
        let len: u32 = record
            .len()
            .try_into()
            .map_err(|_| BlockCacheError::WalCorrupt("record too long".to_string()))?;
        self.len_serializer.serialize(&len, &mut framed)?;
        framed.extend_from_slice(&record);

        let (seq, file) = self.current.as_mut().expect("current WAL segment absent");
        file.write_all(&framed)?;
        self.entries_in_current += 1;
        if let Some(segment) = self.segments.get_mut(seq) {
            segment.max_number = segment.max_number.max(block.number());
        }
        Ok(())
    }

    /// Deletes whole segments whose blocks are all below the given height.
    pub fn prune(&mut self, lib_number: u64) -> Result<(), BlockCacheError> {
        let current_seq = self.current.as_ref().map(|(seq, _)| *seq);
        let stale: Vec<u64> = self
            .segments
            .iter()
            .filter(|(seq, segment)| {
                Some(**seq) != current_seq && segment.max_number < lib_number
            })
            .map(|(seq, _)| *seq)
            .collect();
        for seq in stale {
            if let Some(segment) = self.segments.remove(&seq) {
                if let Err(err) = std::fs::remove_file(&segment.path) {
                    warn!("failed to remove WAL segment {:?}: {}", segment.path, err);
                }
            }
        }
        Ok(())
    }

    /// Number of live segments, for inspection
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }
}
