#![allow(dead_code)]

use dbg_repair::util::dna;

/// 确定性的伪随机基因组（线性同余生成器）
pub fn make_genome(len: usize, seed: u32) -> Vec<u8> {
    let bases = [b'A', b'C', b'G', b'T'];
    let mut seq = Vec::with_capacity(len);
    let mut x = seed;
    for _ in 0..len {
        x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        seq.push(bases[(x >> 16) as usize % 4]);
    }
    seq
}

/// 把 `pos` 处的碱基替换成另一个碱基
pub fn substitute(seq: &mut [u8], pos: usize) {
    seq[pos] = if seq[pos] == b'A' { b'C' } else { b'A' };
}

/// 由 `count` 对相同 mate 组成的交错 FASTQ 文本；mate2 取反向互补
pub fn interleaved_fastq(mate1: &[u8], mate2_forward: &[u8], count: usize) -> String {
    let m1 = String::from_utf8_lossy(mate1).into_owned();
    let m2 = String::from_utf8_lossy(&dna::revcomp(mate2_forward)).into_owned();
    let mut out = String::new();
    for i in 0..count {
        out.push_str(&format!("@pair{}/1\n{}\n+\n{}\n", i, m1, "I".repeat(m1.len())));
        out.push_str(&format!("@pair{}/2\n{}\n+\n{}\n", i, m2, "I".repeat(m2.len())));
    }
    out
}

/// 平均 k-mer 覆盖度为 `avg` 时的 k-mer 覆盖度总量
pub fn kmer_cov(len: usize, k: usize, avg: u64) -> u64 {
    (len - k + 1) as u64 * avg
}
