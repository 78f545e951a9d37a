const NEG_INF: i32 = i32::MIN / 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScoreParams {
    pub match_score: i32,
    pub mismatch_penalty: i32,
    pub gap_open: i32,
    pub gap_extend: i32,
    pub band_width: usize,
}

impl Default for ScoreParams {
    fn default() -> Self {
        Self {
            match_score: 1,
            mismatch_penalty: 1,
            gap_open: 2,
            gap_extend: 1,
            band_width: 2,
        }
    }
}

/// 比对打分器：返回两条序列的全局比对得分
pub trait AlignmentScorer {
    fn align(&mut self, a: &[u8], b: &[u8]) -> i32;
}

/// DP 工作缓冲区，可跨调用复用
#[derive(Default)]
pub struct DpBuffer {
    h: Vec<i32>,
    e: Vec<i32>,
    f: Vec<i32>,
}

impl DpBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self, size: usize) {
        for v in [&mut self.h, &mut self.e, &mut self.f] {
            v.clear();
            v.resize(size, NEG_INF);
        }
    }
}

/// 带状仿射间隙全局比对得分。
///
/// 带宽不足以覆盖两条序列的长度差时自动放宽到长度差。
pub fn banded_global_score(a: &[u8], b: &[u8], p: ScoreParams, buf: &mut DpBuffer) -> i32 {
    let m = a.len();
    let n = b.len();
    let gap = |len: usize| -(p.gap_open + p.gap_extend * len as i32);
    if m == 0 && n == 0 {
        return 0;
    }
    if m == 0 || n == 0 {
        return gap(m + n);
    }

    let band = p.band_width.max(m.abs_diff(n));
    let cols = n + 1;
    buf.reset((m + 1) * cols);
    let h = &mut buf.h;
    let e = &mut buf.e;
    let f = &mut buf.f;

    h[0] = 0;
    for j in 1..=n.min(band) {
        h[j] = gap(j);
        f[j] = h[j];
    }
    for i in 1..=m.min(band) {
        h[i * cols] = gap(i);
        e[i * cols] = h[i * cols];
    }

    for i in 1..=m {
        let j_start = i.saturating_sub(band).max(1);
        let j_end = (i + band).min(n);
        for j in j_start..=j_end {
            let idx = i * cols + j;
            let up = (i - 1) * cols + j;
            let left = idx - 1;
            let diag = up - 1;

            e[idx] = (h[up] - p.gap_open - p.gap_extend).max(e[up] - p.gap_extend);
            f[idx] = (h[left] - p.gap_open - p.gap_extend).max(f[left] - p.gap_extend);

            let subst = if a[i - 1] == b[j - 1] { p.match_score } else { -p.mismatch_penalty };
            h[idx] = (h[diag] + subst).max(e[idx]).max(f[idx]);
        }
    }
    h[m * cols + n]
}

/// 默认打分器：带状全局比对，缓冲区在多次调用间复用
pub struct BandedAligner {
    params: ScoreParams,
    buf: DpBuffer,
}

impl BandedAligner {
    pub fn new(params: ScoreParams) -> Self {
        Self { params, buf: DpBuffer::new() }
    }

    pub fn params(&self) -> ScoreParams {
        self.params
    }
}

impl Default for BandedAligner {
    fn default() -> Self {
        Self::new(ScoreParams::default())
    }
}

impl AlignmentScorer for BandedAligner {
    fn align(&mut self, a: &[u8], b: &[u8]) -> i32 {
        banded_global_score(a, b, self.params, &mut self.buf)
    }
}
