use ahash::AHashMap;
use rayon::prelude::*;
use tracing::info;

use super::kmer::{Kmer, KmerIter};
use crate::error::{DbgError, Result};
use crate::graph::{DbGraph, NodeId};

/// k-mer 在图中的位置：节点（带方向）与该方向下的偏移
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NodePosPair {
    pub node_id: NodeId,
    pub position: u32,
}

impl NodePosPair {
    pub const INVALID: Self = Self { node_id: 0, position: 0 };

    pub fn new(node_id: NodeId, position: u32) -> Self {
        Self { node_id, position }
    }

    pub fn is_valid(&self) -> bool {
        self.node_id != 0
    }
}

/// 规范 k-mer → NPP 的查找表
pub struct KmerNppTable {
    k: usize,
    table: AHashMap<u64, NodePosPair>,
    /// 按物理槽位记录的节点长度快照，用于翻转 NPP
    node_lengths: Vec<u32>,
}

impl KmerNppTable {
    /// 并行扫描所有有效节点，每个节点的 k-mer 先写入私有向量，再按节点顺序合并；
    /// 同一 k-mer 出现多次时保留第一次插入的位置。
    pub fn build(graph: &DbGraph) -> Self {
        let k = graph.kmer_size();
        let ids: Vec<NodeId> = graph.valid_ids().collect();

        let per_node: Vec<Vec<(u64, NodePosPair)>> = ids
            .par_iter()
            .map(|&id| {
                let node = graph.node(id);
                let seq = node.sequence();
                let len = node.len();
                KmerIter::new(&seq, k)
                    .map(|(pos, kmer)| {
                        let (canon, forward) = kmer.canonical();
                        let npp = if forward {
                            NodePosPair::new(id, pos as u32)
                        } else {
                            NodePosPair::new(-id, (len - k - pos) as u32)
                        };
                        (canon.bits(), npp)
                    })
                    .collect()
            })
            .collect();

        let total: usize = per_node.iter().map(Vec::len).sum();
        let mut table = AHashMap::with_capacity(total);
        for entries in per_node {
            for (key, npp) in entries {
                table.entry(key).or_insert(npp);
            }
        }

        let mut node_lengths = vec![0u32; graph.num_nodes() + 1];
        for id in graph.valid_ids() {
            node_lengths[id as usize] = graph.node(id).len() as u32;
        }

        info!(kmers = table.len(), nodes = ids.len(), "built k-mer lookup table");
        Self { k, table, node_lengths }
    }

    pub fn kmer_size(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn check_kmer_size(&self, k: usize) -> Result<()> {
        if self.k != k {
            return Err(DbgError::KmerSizeMismatch { expected: k, found: self.k });
        }
        Ok(())
    }

    fn flip(&self, npp: NodePosPair) -> NodePosPair {
        let len = self.node_lengths[npp.node_id.unsigned_abs() as usize] as usize;
        NodePosPair::new(-npp.node_id, (len - self.k - npp.position as usize) as u32)
    }

    /// 查询 k-mer 的位置；查询链为非规范链时返回翻转后的 NPP，未命中返回 `INVALID`
    pub fn find_npp(&self, kmer: &Kmer) -> NodePosPair {
        let (canon, forward) = kmer.canonical();
        match self.table.get(&canon.bits()) {
            Some(&npp) if forward => npp,
            Some(&npp) => self.flip(npp),
            None => NodePosPair::INVALID,
        }
    }

    pub fn find_npp_seq(&self, seq: &[u8]) -> NodePosPair {
        match Kmer::from_slice(seq) {
            Some(kmer) => self.find_npp(&kmer),
            None => NodePosPair::INVALID,
        }
    }

    /// 为 read 的每个 k-mer 窗口给出 NPP（长度 `len - k + 1`）。
    ///
    /// 一旦某个窗口命中，就沿 read 与节点同时向右走，碱基一致时直接给出后续窗口的位置，
    /// 不再查表。
    pub fn anchor_read(&self, graph: &DbGraph, read: &[u8]) -> Vec<NodePosPair> {
        let k = self.k;
        if read.len() < k {
            return Vec::new();
        }
        let mut out = vec![NodePosPair::INVALID; read.len() - k + 1];
        let mut filled_to = 0usize;
        for (offset, kmer) in KmerIter::new(read, k) {
            if offset < filled_to {
                continue;
            }
            let npp = self.find_npp(&kmer);
            out[offset] = npp;
            filled_to = offset + 1;
            if !npp.is_valid() || !graph.node(npp.node_id).is_valid() {
                continue;
            }

            let node = graph.node(npp.node_id);
            let mut read_pos = offset + k;
            let mut node_pos = npp.position as usize + k;
            while read_pos < read.len() && node_pos < node.len() {
                let b = read[read_pos];
                if b == b'N' || b != node.base(node_pos) {
                    break;
                }
                out[read_pos + 1 - k] = NodePosPair::new(npp.node_id, (node_pos + 1 - k) as u32);
                read_pos += 1;
                node_pos += 1;
            }
            filled_to = read_pos + 1 - k;
        }
        out
    }
}
