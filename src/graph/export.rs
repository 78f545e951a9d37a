use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};
use std::fs::File;
use std::io::{BufWriter, Write};

use tracing::warn;

use super::{DbGraph, NodeId};
use crate::error::Result;

const FASTA_LINE_WIDTH: usize = 60;

impl DbGraph {
    /// 写出 Cytoscape 可读的 `<prefix>.arcs` 与 `<prefix>.nodes` 两个 TSV 文件。
    ///
    /// 从 `seeds` 出发按深度优先级遍历，深度超过 `max_depth` 的节点只记录不展开；
    /// `seeds` 为空时导出整张图。返回写出的节点数。
    pub fn write_cytoscape(&self, prefix: &str, seeds: &[NodeId], max_depth: usize) -> Result<usize> {
        let mut queue: BinaryHeap<Reverse<(usize, NodeId)>> = BinaryHeap::new();
        let (seeds, max_depth): (Vec<NodeId>, usize) = if seeds.is_empty() {
            (self.valid_ids().collect(), usize::MAX)
        } else {
            (seeds.to_vec(), max_depth)
        };
        for &id in &seeds {
            if !self.contains(id) || !self.node(id).is_valid() {
                warn!(node = id, "invalid cytoscape seed node, nothing written");
                return Ok(0);
            }
            queue.push(Reverse((0, id)));
        }

        let mut handled: BTreeSet<NodeId> = BTreeSet::new();
        let mut arcs_out = BufWriter::new(File::create(format!("{}.arcs", prefix))?);
        writeln!(arcs_out, "Source node\tTarget node\tArc coverage")?;

        while let Some(Reverse((depth, id))) = queue.pop() {
            if handled.contains(&id) {
                continue;
            }
            if depth > max_depth {
                handled.insert(id);
                continue;
            }
            let node = self.node(id);
            for arc in node.right_arcs() {
                if !self.node(arc.node_id).is_valid() || handled.contains(&arc.node_id) {
                    continue;
                }
                writeln!(arcs_out, "{}\t{}\t{}", id, arc.node_id, arc.coverage)?;
                queue.push(Reverse((depth + 1, arc.node_id)));
            }
            for arc in node.left_arcs() {
                if !self.node(arc.node_id).is_valid() || handled.contains(&arc.node_id) {
                    continue;
                }
                // 自环已在右弧中写出
                if arc.node_id != id {
                    writeln!(arcs_out, "{}\t{}\t{}", arc.node_id, id, arc.coverage)?;
                }
                queue.push(Reverse((depth + 1, arc.node_id)));
            }
            handled.insert(id);
        }
        arcs_out.flush()?;

        let mut nodes_out = BufWriter::new(File::create(format!("{}.nodes", prefix))?);
        writeln!(
            nodes_out,
            "Node ID\tMarginal length\tNum left arcs\tNum right arcs\tTrue multiplicity\t\
             Estimated multiplicity\tKmer coverage\tRead start coverage\tSequence\tinPath\tpos"
        )?;
        for &id in &handled {
            let node = self.node(id);
            let pos = seeds.iter().position(|&s| s == id);
            let marg = node.marginal_length().max(1);
            writeln!(
                nodes_out,
                "{}\t{}\t{}\t{}\t0\t0\t{:.2}\t{:.2}\t{}\t{}\t{}",
                id,
                node.marginal_length(),
                node.num_left_arcs(),
                node.num_right_arcs(),
                node.avg_kmer_cov(),
                node.read_start_cov() as f64 / marg as f64,
                String::from_utf8_lossy(&node.sequence()),
                u8::from(pos.is_some()),
                pos.map_or(-1, |p| p as i64),
            )?;
        }
        nodes_out.flush()?;
        Ok(handled.len())
    }

    /// 以 FASTA 写出所有有效节点，描述中带覆盖度标签，可由 `GraphBuilder::read_fasta` 读回
    pub fn write_fasta<W: Write>(&self, out: &mut W) -> Result<usize> {
        let mut n = 0usize;
        for id in self.valid_ids() {
            let node = self.node(id);
            writeln!(out, ">{} KC:i:{} RC:i:{}", id, node.kmer_cov(), node.read_start_cov())?;
            for chunk in node.sequence().chunks(FASTA_LINE_WIDTH) {
                out.write_all(chunk)?;
                out.write_all(b"\n")?;
            }
            n += 1;
        }
        Ok(n)
    }
}
