//! Physical line sources feeding the CSV reader.
//!
//! Bytes are decoded exactly once, here, with a single caller-chosen
//! encoding. The reader only ever sees text.

use std::io::{ErrorKind, Read};

use encoding_rs::{Decoder, DecoderResult, Encoding, UTF_8};
use log::debug;

use crate::error::CsvError;

const CHUNK_SIZE: usize = 8 * 1024;

/// Returns the end (exclusive, terminator included) of the first physical
/// line in `text`. A trailing lone `\r` is only a line end once `eof` is
/// known, since the next chunk may start with `\n`.
fn line_end(text: &str, eof: bool) -> Option<usize> {
    let bytes = text.as_bytes();
    let index = bytes.iter().position(|&b| b == b'\n' || b == b'\r')?;

    if bytes[index] == b'\n' {
        return Some(index + 1);
    }
    match bytes.get(index + 1) {
        Some(b'\n') => Some(index + 2),
        Some(_) => Some(index + 1),
        None if eof => Some(index + 1),
        None => None,
    }
}

/// Lines of an in-memory string, terminators included.
///
/// Splits on `\n`, `\r\n` and lone `\r`.
#[derive(Debug, Clone)]
pub struct StrLines<'a> {
    text: &'a str,
}

impl<'a> StrLines<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text }
    }
}

impl Iterator for StrLines<'_> {
    type Item = Result<String, CsvError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.text.is_empty() {
            return None;
        }
        let end = line_end(self.text, true).unwrap_or(self.text.len());
        let (line, rest) = self.text.split_at(end);
        self.text = rest;
        Some(Ok(line.to_string()))
    }
}

/// Caller-supplied lines, with or without terminators.
#[derive(Debug, Clone)]
pub struct TextLines<I> {
    inner: I,
}

impl<I> TextLines<I> {
    pub fn new(inner: I) -> Self {
        Self { inner }
    }
}

impl<I, S> Iterator for TextLines<I>
where
    I: Iterator<Item = S>,
    S: Into<String>,
{
    type Item = Result<String, CsvError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|line| Ok(line.into()))
    }
}

/// Lines decoded from a byte stream with one fixed encoding.
///
/// No byte order mark is sniffed or stripped and malformed input is never
/// replaced: the first invalid sequence yields [`CsvError::Decoding`] with its
/// absolute byte offset, after which the source is exhausted.
pub struct DecodedLines<R> {
    source: R,
    encoding: &'static Encoding,
    decoder: Decoder,
    chunk: Box<[u8]>,
    /// Decoded text; lines before `start` were already handed out.
    text: String,
    start: usize,
    /// `text[start..scanned]` holds no line terminator.
    scanned: usize,
    /// Bytes accepted by the decoder so far.
    offset: u64,
    eof: bool,
    failed: bool,
}

impl<R: Read> DecodedLines<R> {
    pub fn new(source: R, encoding: &'static Encoding) -> Self {
        Self {
            source,
            encoding,
            decoder: encoding.new_decoder_without_bom_handling(),
            chunk: vec![0; CHUNK_SIZE].into_boxed_slice(),
            text: String::new(),
            start: 0,
            scanned: 0,
            offset: 0,
            eof: false,
            failed: false,
        }
    }

    /// UTF-8 decoded lines.
    pub fn utf8(source: R) -> Self {
        Self::new(source, UTF_8)
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Hands back the byte source.
    pub fn into_inner(self) -> R {
        self.source
    }

    fn read_chunk(&mut self) -> Result<usize, CsvError> {
        loop {
            match self.source.read(&mut self.chunk) {
                Ok(read) => return Ok(read),
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => return Err(CsvError::Io(error)),
            }
        }
    }

    /// Reads one chunk of bytes and appends its decoded text.
    fn fill(&mut self) -> Result<(), CsvError> {
        let read = self.read_chunk()?;
        let last = read == 0;
        let mut input = &self.chunk[..read];

        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length_without_replacement(input.len())
                .unwrap_or(input.len() * 3 + 16);
            self.text.reserve(needed);

            let (result, consumed) =
                self.decoder
                    .decode_to_string_without_replacement(input, &mut self.text, last);
            match result {
                DecoderResult::InputEmpty => {
                    self.offset += consumed as u64;
                    break;
                }
                DecoderResult::OutputFull => {
                    self.offset += consumed as u64;
                    input = &input[consumed..];
                }
                DecoderResult::Malformed(bad, extra) => {
                    let end = self.offset + consumed as u64;
                    let offset = end.saturating_sub(u64::from(bad) + u64::from(extra));
                    debug!(
                        "Invalid {} sequence of {bad} byte(s) at offset {offset}",
                        self.encoding.name()
                    );
                    return Err(CsvError::Decoding {
                        encoding: self.encoding.name(),
                        offset,
                    });
                }
            }
        }

        if last {
            self.eof = true;
        }
        Ok(())
    }
}

impl<R: Read> Iterator for DecodedLines<R> {
    type Item = Result<String, CsvError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(end) = line_end(&self.text[self.scanned..], self.eof) {
                let end = self.scanned + end;
                let line = self.text[self.start..end].to_string();
                self.start = end;
                self.scanned = end;
                return Some(Ok(line));
            }
            if self.eof {
                let line = self.text.split_off(self.start);
                self.text.clear();
                self.start = 0;
                self.scanned = 0;
                if line.is_empty() {
                    return None;
                }
                return Some(Ok(line));
            }

            // a trailing '\r' may still pair with a '\n' from the next chunk
            self.scanned = (self.text.len() - usize::from(self.text.ends_with('\r'))).max(self.start);
            self.text.drain(..self.start);
            self.scanned -= self.start;
            self.start = 0;

            if let Err(error) = self.fill() {
                self.failed = true;
                self.text.clear();
                self.start = 0;
                self.scanned = 0;
                return Some(Err(error));
            }
        }
    }
}
