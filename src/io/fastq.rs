use std::io::BufRead;

use crate::error::{DbgError, Result};
use crate::util::dna;

#[derive(Debug, Clone)]
pub struct FastqRecord {
    pub id: String,
    pub seq: Vec<u8>,
    pub qual: Vec<u8>,
}

/// 四行一条记录的 FASTQ 读取器（不支持折行序列）
pub struct FastqReader<R: BufRead> {
    reader: R,
    buf: String,
    done: bool,
    line_no: usize,
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            done: false,
            line_no: 0,
        }
    }

    fn read_line(&mut self) -> Result<bool> {
        self.buf.clear();
        let n = self.reader.read_line(&mut self.buf)?;
        self.line_no += 1;
        Ok(n > 0)
    }

    fn err(&self, msg: &str) -> DbgError {
        DbgError::Parse(format!("FASTQ line {}: {}", self.line_no, msg))
    }

    pub fn next_record(&mut self) -> Result<Option<FastqRecord>> {
        if self.done {
            return Ok(None);
        }

        // 跳过空行，找到 '@' 开头的 header
        loop {
            if !self.read_line()? {
                self.done = true;
                return Ok(None);
            }
            if !self.buf.trim().is_empty() {
                break;
            }
        }
        let Some(header) = self.buf.strip_prefix('@') else {
            return Err(self.err("header not starting with '@'"));
        };
        let id = header.split_whitespace().next().unwrap_or("").to_string();

        if !self.read_line()? {
            return Err(self.err("unexpected EOF after header"));
        }
        let seq = dna::normalize_seq(self.buf.trim_end().as_bytes());

        if !self.read_line()? || !self.buf.starts_with('+') {
            return Err(self.err("missing '+' line"));
        }

        if !self.read_line()? {
            return Err(self.err("missing quality line"));
        }
        let qual = self.buf.trim_end().as_bytes().to_vec();
        if qual.len() != seq.len() {
            return Err(self.err("seq/qual length mismatch"));
        }

        Ok(Some(FastqRecord { id, seq, qual }))
    }
}

/// 交错排列的双端 FASTQ：每 8 行为一对 (mate1, mate2)
pub struct PairedFastqReader<R: BufRead> {
    inner: FastqReader<R>,
}

impl<R: BufRead> PairedFastqReader<R> {
    pub fn new(reader: R) -> Self {
        Self { inner: FastqReader::new(reader) }
    }

    pub fn next_pair(&mut self) -> Result<Option<(FastqRecord, FastqRecord)>> {
        let Some(first) = self.inner.next_record()? else {
            return Ok(None);
        };
        match self.inner.next_record()? {
            Some(second) => Ok(Some((first, second))),
            None => Err(DbgError::Parse(format!("read {} has no mate", first.id))),
        }
    }
}

impl<R: BufRead> Iterator for PairedFastqReader<R> {
    type Item = Result<(FastqRecord, FastqRecord)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_pair().transpose()
    }
}
