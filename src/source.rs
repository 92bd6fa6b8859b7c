//! Random-access byte sources and bounded readers over them

use std::cell::RefCell;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Positioned read access to the bytes of a document
pub trait RandomAccessSource {
    /// Current length in bytes
    fn length(&self) -> io::Result<u64>;

    /// Read at `position` into `buf`, returning the number of bytes read
    ///
    /// Returns 0 at or past the end.
    fn read_at(&self, position: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Read the whole source
    fn read_all(&self) -> io::Result<Vec<u8>> {
        let length = usize::try_from(self.length()?)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "source too large"))?;
        let mut data = vec![0u8; length];
        let mut filled = 0;
        while filled < length {
            let read = self.read_at(filled as u64, &mut data[filled..])?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        data.truncate(filled);
        Ok(data)
    }
}

impl RandomAccessSource for Vec<u8> {
    fn length(&self) -> io::Result<u64> {
        Ok(self.len() as u64)
    }

    fn read_at(&self, position: u64, buf: &mut [u8]) -> io::Result<usize> {
        let start = match usize::try_from(position) {
            Ok(start) if start < self.len() => start,
            _ => return Ok(0),
        };
        let count = buf.len().min(self.len() - start);
        buf[..count].copy_from_slice(&self[start..start + count]);
        Ok(count)
    }
}

/// File-backed source; the length is read from the file metadata on each call
#[derive(Debug)]
pub struct FileSource {
    file: RefCell<File>,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::from_file(File::open(path)?))
    }

    pub fn from_file(file: File) -> Self {
        Self {
            file: RefCell::new(file),
        }
    }
}

impl RandomAccessSource for FileSource {
    fn length(&self) -> io::Result<u64> {
        Ok(self.file.borrow().metadata()?.len())
    }

    fn read_at(&self, position: u64, buf: &mut [u8]) -> io::Result<usize> {
        let mut file = self.file.borrow_mut();
        file.seek(SeekFrom::Start(position))?;
        file.read(buf)
    }
}

/// Reader over `length` bytes of a source starting at `offset`
pub struct WindowReader<'a> {
    source: &'a dyn RandomAccessSource,
    position: u64,
    end: u64,
}

impl<'a> WindowReader<'a> {
    pub fn new(source: &'a dyn RandomAccessSource, offset: u64, length: u64) -> Self {
        Self {
            source,
            position: offset,
            end: offset.saturating_add(length),
        }
    }

    /// Bytes left in the window
    pub fn remaining(&self) -> u64 {
        self.end - self.position
    }
}

impl Read for WindowReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let wanted = buf.len().min(usize::try_from(self.remaining()).unwrap_or(usize::MAX));
        if wanted == 0 {
            return Ok(0);
        }
        let read = self.source.read_at(self.position, &mut buf[..wanted])?;
        self.position += read as u64;
        Ok(read)
    }
}

/// Reader concatenating several `(offset, length)` ranges of a source
pub struct RangedReader<'a> {
    source: &'a dyn RandomAccessSource,
    ranges: Vec<(u64, u64)>,
    current: Option<WindowReader<'a>>,
    next_range: usize,
}

impl<'a> RangedReader<'a> {
    pub fn new(source: &'a dyn RandomAccessSource, ranges: Vec<(u64, u64)>) -> Self {
        Self {
            source,
            ranges,
            current: None,
            next_range: 0,
        }
    }

    /// Total number of bytes covered by the ranges
    pub fn total_length(&self) -> u64 {
        self.ranges.iter().map(|&(_, length)| length).sum()
    }
}

impl Read for RangedReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if let Some(window) = self.current.as_mut() {
                let read = window.read(buf)?;
                if read > 0 {
                    return Ok(read);
                }
                self.current = None;
            }
            let Some(&(offset, length)) = self.ranges.get(self.next_range) else {
                return Ok(0);
            };
            self.next_range += 1;
            self.current = Some(WindowReader::new(self.source, offset, length));
        }
    }
}
