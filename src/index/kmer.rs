use std::fmt;

use crate::util::dna;

/// 2-bit 压缩的 k-mer（k ≤ 32），首碱基位于最高位
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Kmer {
    bits: u64,
    k: u8,
}

#[inline]
fn mask(k: usize) -> u64 {
    if k >= 32 {
        u64::MAX
    } else {
        (1u64 << (2 * k)) - 1
    }
}

impl Kmer {
    /// 由长度恰为 k 的序列构造；含非 ACGT 碱基时返回 None
    pub fn from_slice(seq: &[u8]) -> Option<Self> {
        debug_assert!(!seq.is_empty() && seq.len() <= 32);
        let mut bits = 0u64;
        for &b in seq {
            bits = (bits << 2) | dna::base_code(b)?;
        }
        Some(Self { bits, k: seq.len() as u8 })
    }

    pub fn bits(&self) -> u64 {
        self.bits
    }

    pub fn k(&self) -> usize {
        self.k as usize
    }

    pub fn revcomp(&self) -> Self {
        let k = self.k();
        let mut x = !self.bits & mask(k);
        let mut out = 0u64;
        for _ in 0..k {
            out = (out << 2) | (x & 3);
            x >>= 2;
        }
        Self { bits: out, k: self.k }
    }

    /// 规范形式（正反链中较小者）；第二项为 true 表示自身即规范形式
    pub fn canonical(&self) -> (Self, bool) {
        let rc = self.revcomp();
        if self.bits <= rc.bits {
            (*self, true)
        } else {
            (rc, false)
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let k = self.k();
        (0..k).map(|i| dna::code_base(self.bits >> (2 * (k - 1 - i)))).collect()
    }
}

impl fmt::Debug for Kmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kmer({})", String::from_utf8_lossy(&self.to_bytes()))
    }
}

/// 滚动遍历序列中所有 k-mer 窗口，产出 `(offset, kmer)`；含 N 的窗口被跳过
pub struct KmerIter<'a> {
    seq: &'a [u8],
    k: usize,
    pos: usize,
    bits: u64,
    /// 当前连续有效碱基数
    run: usize,
}

impl<'a> KmerIter<'a> {
    pub fn new(seq: &'a [u8], k: usize) -> Self {
        debug_assert!(k > 0 && k <= 32);
        Self { seq, k, pos: 0, bits: 0, run: 0 }
    }
}

impl Iterator for KmerIter<'_> {
    type Item = (usize, Kmer);

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.seq.len() {
            let b = self.seq[self.pos];
            self.pos += 1;
            match dna::base_code(b) {
                Some(c) => {
                    self.bits = ((self.bits << 2) | c) & mask(self.k);
                    self.run += 1;
                }
                None => {
                    self.run = 0;
                    self.bits = 0;
                    continue;
                }
            }
            if self.run >= self.k {
                return Some((self.pos - self.k, Kmer { bits: self.bits, k: self.k as u8 }));
            }
        }
        None
    }
}
