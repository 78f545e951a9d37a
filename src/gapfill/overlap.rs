/// 两个 tip 之间的重叠区域。
///
/// `first_read = first[first_start..first_end]`，`second_read = second[second_start..second_end]`；
/// 两段分别从最长公共子串向两侧延伸到较短一方的边界。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Overlap {
    pub first_start: usize,
    pub first_end: usize,
    pub second_start: usize,
    pub second_end: usize,
    pub first_read: Vec<u8>,
    pub second_read: Vec<u8>,
}

impl Overlap {
    /// 重叠覆盖到 first 的末端与 second 的起点
    pub fn reaches_ends(&self, first_len: usize) -> bool {
        self.first_end == first_len && self.second_start == 0
    }
}

/// 最长公共子串，返回 `(start_a, start_b, len)`；长度相同时取按行优先最先出现的一个
pub fn longest_common_substring(a: &[u8], b: &[u8]) -> (usize, usize, usize) {
    let n = b.len();
    let mut prev = vec![0usize; n + 1];
    let mut cur = vec![0usize; n + 1];
    let (mut best, mut end_a, mut end_b) = (0usize, 0usize, 0usize);
    for i in 1..=a.len() {
        for j in 1..=n {
            cur[j] = if a[i - 1] == b[j - 1] { prev[j - 1] + 1 } else { 0 };
            if cur[j] > best {
                best = cur[j];
                end_a = i;
                end_b = j;
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    (end_a - best, end_b - best, best)
}

/// 在 `first` 的末尾窗口与 `second` 的起始窗口（各至多 `max_search_size`）之间寻找重叠。
///
/// 最长公共子串短于 `min_exact_match_size` 时返回 None。
pub fn extend_read(
    first: &[u8],
    second: &[u8],
    max_search_size: usize,
    min_exact_match_size: usize,
) -> Option<Overlap> {
    let (len1, len2) = (first.len(), second.len());
    let w1 = len1.min(max_search_size);
    let w2 = len2.min(max_search_size);
    let (s1, s2, len) = longest_common_substring(&first[len1 - w1..], &second[..w2]);
    if len < min_exact_match_size {
        return None;
    }

    let mut first_start = s1 + len1 - w1;
    let mut second_start = s2;
    let mut first_end = first_start + len;
    let mut second_end = second_start + len;

    // 向左延伸到先到达起点的一方
    if first_start < second_start {
        second_start -= first_start;
        first_start = 0;
    } else {
        first_start -= second_start;
        second_start = 0;
    }
    // 向右延伸到先到达终点的一方
    if len1 - first_end < len2 - second_end {
        second_end += len1 - first_end;
        first_end = len1;
    } else {
        first_end += len2 - second_end;
        second_end = len2;
    }

    Some(Overlap {
        first_start,
        first_end,
        second_start,
        second_end,
        first_read: first[first_start..first_end].to_vec(),
        second_read: second[second_start..second_end].to_vec(),
    })
}
