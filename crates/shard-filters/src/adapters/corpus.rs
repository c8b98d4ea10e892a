//! Corpus input
//!
//! A corpus file holds one digest per line. Trailing whitespace (including
//! the CR of CRLF files) is trimmed and blank lines are skipped; any other
//! line must be a valid digest or the pass fails.

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};

use tracing::error;

use crate::domain::Digest;
use crate::error::FilterError;
use crate::ports::{CorpusSource, DigestStream};

const READ_BUFFER: usize = 1 << 16;

/// Corpus stored in a newline-delimited file
#[derive(Clone, Debug)]
pub struct CorpusFile {
    path: PathBuf,
}

impl CorpusFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CorpusSource for CorpusFile {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn digests(&self) -> Result<DigestStream<'_>, FilterError> {
        let file = File::open(&self.path).map_err(|e| FilterError::io(&self.path, e))?;
        let reader = BufReader::with_capacity(READ_BUFFER, file);
        Ok(Box::new(DigestLines::new(reader, self.path.clone())))
    }
}

/// Corpus held as text, one digest per line
#[derive(Clone, Debug)]
pub struct InMemoryCorpus {
    name: String,
    text: String,
}

impl InMemoryCorpus {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Corpus of the given digests
    pub fn from_digests<'a>(
        name: impl Into<String>,
        digests: impl IntoIterator<Item = &'a Digest>,
    ) -> Self {
        let text = digests
            .into_iter()
            .map(|d| format!("{}\n", d))
            .collect::<String>();
        Self::new(name, text)
    }
}

impl CorpusSource for InMemoryCorpus {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn digests(&self) -> Result<DigestStream<'_>, FilterError> {
        let reader = Cursor::new(self.text.as_bytes());
        Ok(Box::new(DigestLines::new(reader, PathBuf::from(&self.name))))
    }
}

/// Line parser shared by every corpus source
struct DigestLines<R> {
    reader: R,
    origin: PathBuf,
    line_no: u64,
    buf: String,
    failed: bool,
}

impl<R: BufRead> DigestLines<R> {
    fn new(reader: R, origin: PathBuf) -> Self {
        Self {
            reader,
            origin,
            line_no: 0,
            buf: String::with_capacity(64),
            failed: false,
        }
    }
}

impl<R: BufRead> Iterator for DigestLines<R> {
    type Item = Result<Digest, FilterError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line_no += 1;
                    let line = self.buf.trim_end();
                    if line.is_empty() {
                        continue;
                    }
                    let parsed = Digest::parse(line);
                    if let Err(e) = &parsed {
                        error!(
                            "corpus {} line {}: {}",
                            self.origin.display(),
                            self.line_no,
                            e
                        );
                        self.failed = true;
                    }
                    return Some(parsed);
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(FilterError::io(&self.origin, e)));
                }
            }
        }
    }
}
