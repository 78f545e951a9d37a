use std::io::BufRead;

use crate::error::Result;
use crate::util::dna;

#[derive(Debug, Clone)]
pub struct FastaRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
}

/// 多行 FASTA 读取器；序列统一转为大写 ACGTN
pub struct FastaReader<R: BufRead> {
    reader: R,
    buf: String,
    done: bool,
    peek_header: Option<String>,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            done: false,
            peek_header: None,
        }
    }

    fn read_header(&mut self) -> Result<Option<String>> {
        if let Some(h) = self.peek_header.take() {
            return Ok(Some(h));
        }
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                self.done = true;
                return Ok(None);
            }
            if let Some(rest) = self.buf.strip_prefix('>') {
                return Ok(Some(rest.trim().to_string()));
            }
        }
    }

    pub fn next_record(&mut self) -> Result<Option<FastaRecord>> {
        if self.done {
            return Ok(None);
        }
        let Some(header) = self.read_header()? else {
            return Ok(None);
        };

        let mut parts = header.splitn(2, char::is_whitespace);
        let id = parts.next().unwrap_or("").to_string();
        let desc = parts.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let mut raw: Vec<u8> = Vec::new();
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                self.done = true;
                break;
            }
            if let Some(rest) = self.buf.strip_prefix('>') {
                self.peek_header = Some(rest.trim().to_string());
                break;
            }
            raw.extend(self.buf.bytes().filter(|b| !b.is_ascii_whitespace()));
        }

        Ok(Some(FastaRecord { id, desc, seq: dna::normalize_seq(&raw) }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_multi_record_fasta() {
        let data = b">node1 KC:i:10\nACgTNN\nAC\n>node2\nAAA\n";
        let mut r = FastaReader::new(Cursor::new(&data[..]));

        let r1 = r.next_record().unwrap().unwrap();
        assert_eq!(r1.id, "node1");
        assert_eq!(r1.desc.as_deref(), Some("KC:i:10"));
        assert_eq!(r1.seq, b"ACGTNNAC");

        let r2 = r.next_record().unwrap().unwrap();
        assert_eq!(r2.id, "node2");
        assert_eq!(r2.desc, None);
        assert_eq!(r2.seq, b"AAA");

        assert!(r.next_record().unwrap().is_none());
    }

    #[test]
    fn parse_fasta_with_crlf_and_blank_lines() {
        let data = b"\n\n>n1 desc\r\nAC g t x\r\n acgt\r\n";
        let mut r = FastaReader::new(Cursor::new(&data[..]));
        let r1 = r.next_record().unwrap().unwrap();
        assert_eq!(r1.id, "n1");
        assert_eq!(r1.seq, b"ACGTNACGT");
        assert!(r.next_record().unwrap().is_none());
    }
}
