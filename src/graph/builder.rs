use std::io::BufRead;

use ahash::{AHashMap, AHashSet};

use super::{Arc, ArcSpan, DbGraph, GraphMeta, Node, NodeId};
use crate::error::{DbgError, Result};
use crate::io::fasta::FastaReader;
use crate::util::dna;

struct PendingNode {
    sequence: Vec<u8>,
    kmer_cov: u64,
    read_start_cov: u64,
}

/// 从节点序列与弧构造 `DbGraph`。
///
/// 弧可以显式给出，也可以由 `infer_arcs` 按 (k-1) 重叠推断；
/// `A -> B` 与 `-B -> -A` 视为同一条弧，只记录一次。
pub struct GraphBuilder {
    k: usize,
    nodes: Vec<PendingNode>,
    arcs: Vec<(NodeId, NodeId, u32)>,
    arc_keys: AHashSet<(NodeId, NodeId)>,
    meta: GraphMeta,
}

fn canonical_arc(from: NodeId, to: NodeId) -> (NodeId, NodeId) {
    (from, to).min((-to, -from))
}

impl GraphBuilder {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            nodes: Vec::new(),
            arcs: Vec::new(),
            arc_keys: AHashSet::new(),
            meta: GraphMeta::default(),
        }
    }

    pub fn with_meta(mut self, meta: GraphMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// 添加节点，返回其正向 id（从 1 开始连续编号）
    pub fn add_node(&mut self, seq: &[u8], kmer_cov: u64, read_start_cov: u64) -> NodeId {
        self.nodes.push(PendingNode { sequence: dna::normalize_seq(seq), kmer_cov, read_start_cov });
        self.nodes.len() as NodeId
    }

    /// 添加弧 `from -> to`；重复弧（含其反向互补形式）返回 false
    pub fn add_arc(&mut self, from: NodeId, to: NodeId, coverage: u32) -> bool {
        if !self.arc_keys.insert(canonical_arc(from, to)) {
            return false;
        }
        self.arcs.push((from, to, coverage));
        true
    }

    fn oriented(&self, id: NodeId) -> Vec<u8> {
        let seq = &self.nodes[id.unsigned_abs() as usize - 1].sequence;
        if id > 0 {
            seq.clone()
        } else {
            dna::revcomp(seq)
        }
    }

    fn avg_cov(&self, id: NodeId) -> f64 {
        let n = &self.nodes[id.unsigned_abs() as usize - 1];
        let marg = (n.sequence.len() + 1).saturating_sub(self.k).max(1);
        n.kmer_cov as f64 / marg as f64
    }

    /// 对所有方向的节点按 (k-1) 后缀/前缀完全匹配补齐弧，返回新增弧数。
    ///
    /// 推断出的弧覆盖度取两端平均 k-mer 覆盖度的较小值。
    pub fn infer_arcs(&mut self) -> usize {
        let overlap = self.k - 1;
        let mut by_prefix: AHashMap<Vec<u8>, Vec<NodeId>> = AHashMap::new();
        for i in 1..=self.nodes.len() as NodeId {
            for id in [i, -i] {
                let seq = self.oriented(id);
                if seq.len() >= overlap {
                    by_prefix.entry(seq[..overlap].to_vec()).or_default().push(id);
                }
            }
        }

        let mut added = 0usize;
        for i in 1..=self.nodes.len() as NodeId {
            for id in [i, -i] {
                let seq = self.oriented(id);
                if seq.len() < overlap {
                    continue;
                }
                let suffix = &seq[seq.len() - overlap..];
                let Some(targets) = by_prefix.get(suffix) else { continue };
                for &t in targets.clone().iter() {
                    let cov = self.avg_cov(id).min(self.avg_cov(t)).round() as u32;
                    if self.add_arc(id, t, cov) {
                        added += 1;
                    }
                }
            }
        }
        added
    }

    /// 读取 FASTA 节点；描述中的 `KC:i:<n>` / `RC:i:<n>` 标签给出 k-mer 覆盖度与 read-start 覆盖度
    pub fn read_fasta<R: BufRead>(&mut self, reader: R) -> Result<usize> {
        let mut fr = FastaReader::new(reader);
        let mut count = 0usize;
        while let Some(rec) = fr.next_record()? {
            let mut kmer_cov = 0u64;
            let mut read_start_cov = 0u64;
            if let Some(desc) = rec.desc.as_deref() {
                for tag in desc.split_whitespace() {
                    if let Some(v) = tag.strip_prefix("KC:i:") {
                        kmer_cov = v
                            .parse()
                            .map_err(|_| DbgError::Parse(format!("record {}: bad tag {}", rec.id, tag)))?;
                    } else if let Some(v) = tag.strip_prefix("RC:i:") {
                        read_start_cov = v
                            .parse()
                            .map_err(|_| DbgError::Parse(format!("record {}: bad tag {}", rec.id, tag)))?;
                    }
                }
            }
            self.add_node(&rec.seq, kmer_cov, read_start_cov);
            count += 1;
        }
        Ok(count)
    }

    /// 读取弧表：每行 `from<TAB>to<TAB>coverage`，允许 `.arcs` 导出文件的表头行与 `#` 注释
    pub fn read_arcs<R: BufRead>(&mut self, reader: R) -> Result<usize> {
        let mut added = 0usize;
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("Source") {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            let parsed = match fields.as_slice() {
                [from, to, cov] => from
                    .parse::<NodeId>()
                    .ok()
                    .zip(to.parse::<NodeId>().ok())
                    .zip(cov.parse::<u32>().ok()),
                _ => None,
            };
            let Some(((from, to), cov)) = parsed else {
                return Err(DbgError::Parse(format!(
                    "arc line {}: expected '<from> <to> <coverage>'",
                    lineno + 1
                )));
            };
            if self.add_arc(from, to, cov) {
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn build(self) -> Result<DbGraph> {
        let n = self.nodes.len();
        if n == 0 {
            return Err(DbgError::EmptyGraph);
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if node.sequence.len() < self.k {
                return Err(DbgError::Parse(format!(
                    "node {} is shorter ({}) than the k-mer size {}",
                    i + 1,
                    node.sequence.len(),
                    self.k
                )));
            }
        }

        // 物理左右弧表，下标为物理槽位
        let mut lefts: Vec<Vec<Arc>> = vec![Vec::new(); n + 1];
        let mut rights: Vec<Vec<Arc>> = vec![Vec::new(); n + 1];
        for &(from, to, coverage) in &self.arcs {
            for id in [from, to] {
                if id == 0 || id.unsigned_abs() as usize > n {
                    return Err(DbgError::Parse(format!("arc {} -> {} references unknown node", from, to)));
                }
            }
            let f = from.unsigned_abs() as usize;
            if from > 0 {
                rights[f].push(Arc { node_id: to, coverage });
            } else {
                lefts[f].push(Arc { node_id: -to, coverage });
            }
            // 发夹弧只存一份
            if to == -from {
                continue;
            }
            let t = to.unsigned_abs() as usize;
            if to > 0 {
                lefts[t].push(Arc { node_id: from, coverage });
            } else {
                rights[t].push(Arc { node_id: -from, coverage });
            }
        }

        let mut nodes = Vec::with_capacity(n + 1);
        nodes.push(Node::placeholder());
        let mut arcs = Vec::with_capacity(self.arcs.len() * 2);
        for (i, pending) in self.nodes.into_iter().enumerate() {
            let slot = i + 1;
            let left = ArcSpan { first: arcs.len() as u32, len: lefts[slot].len() as u32 };
            arcs.extend_from_slice(&lefts[slot]);
            let right = ArcSpan { first: arcs.len() as u32, len: rights[slot].len() as u32 };
            arcs.extend_from_slice(&rights[slot]);
            nodes.push(Node {
                sequence: pending.sequence,
                kmer_cov: pending.kmer_cov,
                read_start_cov: pending.read_start_cov,
                left,
                right,
                valid: true,
            });
        }

        Ok(DbGraph { k: self.k, nodes, arcs, meta: self.meta })
    }
}
