// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::path::PathBuf;
use std::sync::Arc;

use pob_models::block::Block;
use pob_models::block_id::BlockId;
use pob_models::prehash::{PreHashMap, PreHashSet};
use pob_models::timeslots::same_production_window;
use pob_signature::PublicKey;
use pob_time::PobTime;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::BlockCacheError;
use crate::wal::Wal;

/// Configuration of the block cache
#[derive(Debug, Clone, Deserialize)]
pub struct BlockCacheConfig {
    /// directory of the write-ahead log
    pub wal_path: PathBuf,
    /// appends per WAL segment before rolling to a new file
    pub wal_segment_entries: u64,
}

/// Whether a cached block is attached to the confirmed history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// parent absent or itself Single; the block waits unexecuted
    Single,
    /// executed and reachable from the linked root
    Linked,
}

/// A node of the fork tree
pub struct CacheNode {
    /// the block itself
    pub block: Arc<Block>,
    /// parent id; `None` only for the linked root
    pub parent: Option<BlockId>,
    /// ids of the children present in the cache
    pub children: PreHashSet<BlockId>,
    /// Single or Linked
    pub kind: NodeKind,
    /// count of consecutive blocks by the same witness in the same slot
    pub serial_num: u64,
    /// active witness list used to verify this node's children
    pub witness_list: Arc<Vec<PublicKey>>,
    /// whether the node is on the finalized path
    pub confirmed: bool,
}

impl CacheNode {
    /// Height of the node's block
    pub fn number(&self) -> u64 {
        self.block.number()
    }

    /// Production time of the node's block
    pub fn time(&self) -> PobTime {
        self.block.time()
    }
}

/// In-memory fork tree of recently seen blocks.
///
/// The tree is an arena keyed by block id; parent/child edges are id
/// references resolved through the arena, which keeps the parent<->children
/// cycle ownership-free. The caller wraps the whole structure in one
/// `RwLock` (see [`SharedBlockCache`]).
pub struct BlockCache {
    nodes: PreHashMap<BlockId, CacheNode>,
    /// children seen before their parent, keyed by the missing parent id
    orphans: PreHashMap<BlockId, PreHashSet<BlockId>>,
    linked_root: BlockId,
    head: BlockId,
    chain: Box<dyn pob_storage::ChainStore>,
    wal: Wal,
}

/// The shared form every component holds
pub type SharedBlockCache = Arc<parking_lot::RwLock<BlockCache>>;

impl BlockCache {
    /// Opens the cache rooted at the last irreversible block.
    ///
    /// Returns the cache and the WAL blocks to replay through the verify
    /// path. A corrupted WAL is rotated aside and replay starts empty; the
    /// synchronizer refills the lost range from peers.
    pub fn open(
        config: BlockCacheConfig,
        chain: Box<dyn pob_storage::ChainStore>,
        root_block: Arc<Block>,
        root_witnesses: Vec<PublicKey>,
    ) -> Result<(Self, Vec<Block>), BlockCacheError> {
        let (wal, replay) = match Wal::open(&config.wal_path, config.wal_segment_entries) {
            Ok(opened) => opened,
            Err(BlockCacheError::WalCorrupt(reason)) => {
                warn!("block cache WAL corrupted ({}), starting empty", reason);
                Wal::rotate_corrupted(&config.wal_path)?;
                Wal::open(&config.wal_path, config.wal_segment_entries)?
            }
            Err(err) => return Err(err),
        };

        let root_id = root_block.id();
        let mut nodes = PreHashMap::default();
        nodes.insert(
            root_id,
            CacheNode {
                block: root_block,
                parent: None,
                children: PreHashSet::default(),
                kind: NodeKind::Linked,
                serial_num: 0,
                witness_list: Arc::new(root_witnesses),
                confirmed: true,
            },
        );

        Ok((
            BlockCache {
                nodes,
                orphans: PreHashMap::default(),
                linked_root: root_id,
                head: root_id,
                chain,
                wal,
            },
            replay,
        ))
    }

    /// Rotates the WAL aside and starts a fresh one; used when replay
    /// through the verify path fails midway.
    pub fn new_wal(&mut self, config: &BlockCacheConfig) -> Result<(), BlockCacheError> {
        Wal::rotate_corrupted(&config.wal_path)?;
        let (wal, _) = Wal::open(&config.wal_path, config.wal_segment_entries)?;
        self.wal = wal;
        Ok(())
    }

    /// A node by block id
    pub fn find(&self, id: &BlockId) -> Option<&CacheNode> {
        self.nodes.get(id)
    }

    /// Whether the block is in the cache
    pub fn contains(&self, id: &BlockId) -> bool {
        self.nodes.contains_key(id)
    }

    /// A block by id, consulting the finalized store for confirmed history
    pub fn get_block_by_hash(&self, id: &BlockId) -> Option<Arc<Block>> {
        self.nodes
            .get(id)
            .map(|node| node.block.clone())
            .or_else(|| self.chain.get_block(id))
    }

    /// A block by height on the canonical branch, consulting the finalized
    /// store below the root
    pub fn get_block_by_number(&self, number: u64) -> Option<Arc<Block>> {
        if number > self.node(&self.linked_root).number() {
            // walk the canonical branch down from the head
            let mut cursor = self.head;
            loop {
                let node = self.nodes.get(&cursor)?;
                if node.number() == number {
                    return Some(node.block.clone());
                }
                if node.number() < number {
                    return None;
                }
                cursor = node.parent?;
            }
        }
        self.chain.get_block_by_number(number)
    }

    fn node(&self, id: &BlockId) -> &CacheNode {
        self.nodes.get(id).expect("block cache arena inconsistency")
    }

    /// The best linked tip
    pub fn head(&self) -> &CacheNode {
        self.node(&self.head)
    }

    /// Id of the best linked tip
    pub fn head_id(&self) -> BlockId {
        self.head
    }

    /// The last irreversible node
    pub fn linked_root(&self) -> &CacheNode {
        self.node(&self.linked_root)
    }

    /// Id of the last irreversible node
    pub fn linked_root_id(&self) -> BlockId {
        self.linked_root
    }

    /// Number of nodes in the cache, for inspection
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the cache holds only its root
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Inserts a block as a Single node and splices parent/child edges.
    pub fn add(&mut self, block: Arc<Block>) -> Result<(), BlockCacheError> {
        let id = block.id();
        if self.nodes.contains_key(&id) {
            return Err(BlockCacheError::Duplicate(id));
        }
        let parent = block.parent();

        let mut children = PreHashSet::default();
        if let Some(waiting) = self.orphans.remove(&id) {
            children.extend(waiting);
        }
        for child in &children {
            if let Some(child_node) = self.nodes.get_mut(child) {
                child_node.parent = Some(id);
            }
        }

        match self.nodes.get_mut(&parent) {
            Some(parent_node) => {
                parent_node.children.insert(id);
            }
            None => {
                self.orphans.entry(parent).or_default().insert(id);
            }
        }

        self.nodes.insert(
            id,
            CacheNode {
                block,
                parent: Some(parent),
                children,
                kind: NodeKind::Single,
                serial_num: 0,
                witness_list: Arc::new(Vec::new()),
                confirmed: false,
            },
        );
        Ok(())
    }

    /// Serial number a block would get if linked now: consecutive blocks by
    /// the same witness within the same slot count up, anything else resets.
    pub fn serial_num_for(&self, block: &Block) -> Result<u64, BlockCacheError> {
        let parent = self
            .nodes
            .get(&block.parent())
            .ok_or(BlockCacheError::NotFound(block.parent()))?;
        if parent.block.witness() != block.witness()
            || !same_production_window(parent.time(), block.time())
        {
            Ok(0)
        } else {
            Ok(parent.serial_num + 1)
        }
    }

    /// Marks a node Linked, records it in the WAL (unless replaying) and
    /// updates the head.
    ///
    /// Returns the ids of the node's children so the caller can attempt to
    /// link them in turn; children may themselves have become linkable.
    pub fn link(
        &mut self,
        id: &BlockId,
        serial_num: u64,
        witness_list: Option<Vec<PublicKey>>,
        replay: bool,
    ) -> Result<Vec<BlockId>, BlockCacheError> {
        let parent_id = {
            let node = self.nodes.get(id).ok_or(BlockCacheError::NotFound(*id))?;
            node.parent.ok_or_else(|| {
                BlockCacheError::InvalidLink(*id, "cannot relink the root".to_string())
            })?
        };
        let parent_list = match self.nodes.get(&parent_id) {
            Some(parent) if parent.kind == NodeKind::Linked => parent.witness_list.clone(),
            _ => {
                return Err(BlockCacheError::InvalidLink(
                    *id,
                    "parent is not linked".to_string(),
                ))
            }
        };

        let (block, children, number, time) = {
            let node = self.nodes.get_mut(id).expect("node vanished during link");
            node.kind = NodeKind::Linked;
            node.serial_num = serial_num;
            node.witness_list = match witness_list {
                Some(list) => Arc::new(list),
                None => parent_list,
            };
            (
                node.block.clone(),
                node.children.iter().copied().collect::<Vec<_>>(),
                node.number(),
                node.time(),
            )
        };

        if !replay {
            self.wal.append(&block)?;
        }

        // head selection: greatest number, earliest time, greatest id
        let head = self.node(&self.head);
        let better = number > head.number()
            || (number == head.number() && time < head.time())
            || (number == head.number()
                && time == head.time()
                && id.to_bytes() > self.head.to_bytes());
        if better {
            self.head = *id;
        }

        debug!("linked block {} at height {}", id, number);
        Ok(children)
    }

    /// Advances the last irreversible block if the branch ending at the head
    /// now confirms a higher node, pruning abandoned branches and persisting
    /// the newly finalized span.
    ///
    /// A node is confirmed when at least two thirds of its active witness
    /// set produced a linked block on `[node..head]`.
    pub fn update_lib(&mut self) -> Result<Option<BlockId>, BlockCacheError> {
        // path from head down to the current root, head first
        let mut path = Vec::new();
        let mut cursor = self.head;
        while cursor != self.linked_root {
            path.push(cursor);
            cursor = match self.node(&cursor).parent {
                Some(parent) => parent,
                None => break,
            };
        }

        let mut seen: std::collections::HashSet<PublicKey> = Default::default();
        let mut new_lib = None;
        for id in &path {
            let node = self.node(id);
            seen.insert(*node.block.witness());
            let threshold = node.witness_list.len() as u64 * 2 / 3 + 1;
            if seen.len() as u64 >= threshold {
                new_lib = Some(*id);
                break;
            }
        }

        let new_lib = match new_lib {
            Some(id) if id != self.linked_root => id,
            _ => return Ok(None),
        };

        // collect the finalized span old root (exclusive) -> new lib (inclusive)
        let mut span = Vec::new();
        let mut cursor = new_lib;
        while cursor != self.linked_root {
            span.push(cursor);
            cursor = self
                .node(&cursor)
                .parent
                .expect("finalized span detached from the root");
        }
        span.reverse();

        let blocks: Vec<Arc<Block>> = span.iter().map(|id| self.node(id).block.clone()).collect();
        self.chain.push_finalized(blocks)?;
        for id in &span {
            if let Some(node) = self.nodes.get_mut(id) {
                node.confirmed = true;
            }
        }

        // keep only the subtree rooted at the new lib
        let mut keep = PreHashSet::default();
        let mut stack = vec![new_lib];
        while let Some(id) = stack.pop() {
            if keep.insert(id) {
                stack.extend(self.node(&id).children.iter().copied());
            }
        }
        let lib_number = self.node(&new_lib).number();
        self.nodes.retain(|id, _| keep.contains(id));
        if let Some(root_node) = self.nodes.get_mut(&new_lib) {
            root_node.parent = None;
        }

        // rebuild the orphan index from what survived
        self.orphans.clear();
        let mut reattach: Vec<(BlockId, BlockId)> = Vec::new();
        for (id, node) in &self.nodes {
            if let Some(parent) = node.parent {
                if !self.nodes.contains_key(&parent) {
                    reattach.push((parent, *id));
                }
            }
        }
        for (parent, child) in reattach {
            self.orphans.entry(parent).or_default().insert(child);
        }

        self.linked_root = new_lib;
        self.wal.prune(lib_number)?;
        info!("advanced last irreversible block to height {}", lib_number);
        Ok(Some(new_lib))
    }

    /// Removes a Single subtree, used when verification fails.
    pub fn del(&mut self, id: &BlockId) -> Result<(), BlockCacheError> {
        if *id == self.linked_root || *id == self.head {
            return Err(BlockCacheError::InvalidLink(
                *id,
                "cannot delete the root or the head".to_string(),
            ));
        }
        let parent = match self.nodes.get(id) {
            Some(node) => node.parent,
            None => return Err(BlockCacheError::NotFound(*id)),
        };
        if let Some(parent) = parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                parent_node.children.remove(id);
            }
            if let Some(waiting) = self.orphans.get_mut(&parent) {
                waiting.remove(id);
                if waiting.is_empty() {
                    self.orphans.remove(&parent);
                }
            }
        }
        let mut stack = vec![*id];
        while let Some(cursor) = stack.pop() {
            if let Some(node) = self.nodes.remove(&cursor) {
                stack.extend(node.children.iter().copied());
            }
            self.orphans.remove(&cursor);
        }
        Ok(())
    }
}
