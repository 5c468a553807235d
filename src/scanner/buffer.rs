//! The page-aligned scan buffer: spec.md §3 "Scan buffer" and §4.3's
//! `fillbuf` refill loop, generalizing `grep.c`'s global `bufalloc`/
//! `bufbeg`/`buflim`/`bufdesc` state into an owned, per-file value.

use std::io::{self, Read, Seek, SeekFrom};

/// Initial capacity, matching `grep.c`'s `INITIAL_BUFSIZE` heuristic: one
/// page plus a generous head start so small files need only one read.
const PAGESIZE: usize = 4096;
const INITIAL: usize = 32 * 1024;
const WORD_SCRATCH: usize = 8;

pub struct ScanBuffer {
    data: Vec<u8>,
    /// Offset of the sentinel byte; `bufbeg` is `sentinel + 1`.
    sentinel: usize,
    buflim: usize,
    eol: u8,
}

impl ScanBuffer {
    #[must_use]
    pub fn new(eol: u8) -> Self {
        let mut data = vec![0u8; 1 + INITIAL + WORD_SCRATCH];
        data[0] = eol;
        Self { data, sentinel: 0, buflim: 1, eol }
    }

    #[must_use]
    pub fn bufbeg(&self) -> usize {
        self.sentinel + 1
    }

    #[must_use]
    pub fn buflim(&self) -> usize {
        self.buflim
    }

    /// The live region `[bufbeg, buflim)`.
    #[must_use]
    pub fn live(&self) -> &[u8] {
        &self.data[self.bufbeg()..self.buflim]
    }

    /// Refills the buffer, preserving the last `save` bytes of the current
    /// live region at the front (spec.md §4.3: "preserves the last `save`
    /// bytes of the live region"). Returns the number of new bytes read, or
    /// `0` at end of file.
    pub fn fillbuf(&mut self, save: usize, reader: &mut impl Read) -> io::Result<usize> {
        let cursor = self.prepare_fill(save);
        let n = self.read_chunk(reader, cursor)?;
        self.finish_fill(cursor + n);
        Ok(n)
    }

    /// Like `fillbuf`, but when `skip_nuls` is set and a freshly read chunk
    /// turns out to be entirely NUL bytes, jumps past the hole with
    /// `lseek(SEEK_DATA)` and retries rather than handing the zeros to the
    /// scanner (spec.md §4.3's "NUL handling in 'skip NULs' mode"). Returns
    /// `(bytes_read, nul_lines_to_credit)`: the latter must be added to
    /// `totalnl` by the caller, since each skipped zero byte would
    /// otherwise have become a zero-width "line" of its own.
    ///
    /// `seek_data_failed` latches permanently once a seek attempt fails or
    /// the platform doesn't support `SEEK_DATA`, so later calls degrade to
    /// plain reads instead of retrying a seek that can't succeed (mirrors
    /// `grep.c`'s static `seek_data_failed`).
    pub fn fillbuf_seek_skip(
        &mut self,
        save: usize,
        file: &mut std::fs::File,
        skip_nuls: bool,
        seek_data_failed: &mut bool,
    ) -> io::Result<(usize, u64)> {
        let cursor = self.prepare_fill(save);
        let mut credited_lines: u64 = 0;

        loop {
            let n = self.read_chunk(file, cursor)?;
            if n == 0 || !skip_nuls || !self.is_all_zeros(cursor, cursor + n) {
                self.finish_fill(cursor + n);
                return Ok((n, credited_lines));
            }

            if *seek_data_failed {
                // Degraded mode: hand the zero bytes back as ordinary data
                // so the caller's usual per-line counting credits them
                // instead (spec.md §4.3: "If SEEK_DATA is unsupported, the
                // mode silently degrades").
                self.finish_fill(cursor + n);
                return Ok((n, credited_lines));
            }

            let Ok(bufoffset) = file.stream_position() else {
                *seek_data_failed = true;
                self.finish_fill(cursor + n);
                return Ok((n, credited_lines));
            };
            match seek_data(file, bufoffset) {
                Some(data_start) if data_start >= bufoffset => {
                    // The seek succeeded: these `n` zero bytes plus
                    // whatever hole lies beyond them are fully discarded,
                    // never handed to the caller, so both spans are
                    // credited here instead of via per-line counting.
                    // Retry the read at the same buffer position now that
                    // the descriptor points past the hole.
                    credited_lines += n as u64 + (data_start - bufoffset);
                }
                _ => {
                    *seek_data_failed = true;
                    self.finish_fill(cursor + n);
                    return Ok((n, credited_lines));
                }
            }
        }
    }

    /// Shifts the last `save` bytes of the live region to the front and
    /// returns the buffer offset a fresh read should start at.
    fn prepare_fill(&mut self, save: usize) -> usize {
        let live_len = self.buflim - self.bufbeg();
        debug_assert!(save <= live_len);

        let save_start = self.buflim - save;
        self.ensure_capacity(save);

        let sentinel_val = self.data[self.sentinel];
        self.data.copy_within(save_start..self.buflim, self.bufbeg());
        self.data[self.sentinel] = sentinel_val;

        self.bufbeg() + save
    }

    /// Reads one page-aligned chunk into `self.data[cursor..]`, looping
    /// until the target size is hit or the reader is exhausted.
    fn read_chunk(&mut self, reader: &mut impl Read, cursor: usize) -> io::Result<usize> {
        let read_capacity = self.data.len() - WORD_SCRATCH - cursor;
        let aligned = (read_capacity / PAGESIZE) * PAGESIZE;
        let read_target = aligned.max(PAGESIZE).min(read_capacity);
        let end = cursor + read_target;

        let mut pos = cursor;
        let mut total_read = 0;
        loop {
            let n = reader.read(&mut self.data[pos..end])?;
            if n == 0 {
                break;
            }
            pos += n;
            total_read += n;
            if total_read >= read_target {
                break;
            }
        }
        Ok(total_read)
    }

    /// Commits a completed read: sets `buflim` and clears the word-sized
    /// scratch region after it so fixed-width reads past the live region
    /// stay defined.
    fn finish_fill(&mut self, new_buflim: usize) {
        self.buflim = new_buflim;
        for b in &mut self.data[self.buflim..self.buflim + WORD_SCRATCH] {
            *b = 0;
        }
    }

    /// Grows the buffer so at least `extra` more bytes of headroom exist
    /// beyond `save`. Doubling, per spec.md §3/§4.3 ("resized upward for
    /// long lines but never shrunk").
    fn ensure_capacity(&mut self, save: usize) {
        let needed = self.bufbeg() + save + PAGESIZE + WORD_SCRATCH;
        if needed <= self.data.len() {
            return;
        }
        let mut new_len = self.data.len();
        while new_len < needed {
            new_len *= 2;
        }
        self.data.resize(new_len, 0);
    }

    /// Zaps every NUL byte in `[start, end)` to the EOL byte, so a long run
    /// of NULs does not present as one unreasonably long line (spec.md
    /// §4.3 main loop step 2).
    pub fn zap_nuls(&mut self, start: usize, end: usize) {
        for b in &mut self.data[start..end] {
            if *b == 0 {
                *b = self.eol;
            }
        }
    }

    #[must_use]
    pub fn is_all_zeros(&self, start: usize, end: usize) -> bool {
        self.data[start..end].iter().all(|&b| b == 0)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

/// Attempts `lseek(SEEK_DATA)` to jump past a sparse hole. Returns the new
/// offset, or the end-of-file offset if `SEEK_DATA` reports `ENXIO` (no
/// more data). Returns `None` if the platform doesn't support `SEEK_DATA`
/// at all, signalling the scanner to silently fall back to reading zeros
/// (spec.md §4.3: "If SEEK_DATA is unsupported, the mode silently
/// degrades").
#[cfg(unix)]
pub fn seek_data(file: &mut std::fs::File, from: u64) -> Option<u64> {
    use std::os::unix::io::AsRawFd;

    let fd = file.as_raw_fd();
    // SEEK_DATA is not in libc's `Seek` enum; use raw lseek.
    let result = unsafe { libc::lseek(fd, from as libc::off_t, libc::SEEK_DATA) };
    if result >= 0 {
        return Some(result as u64);
    }
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(libc::ENXIO) => file.seek(SeekFrom::End(0)).ok(),
        Some(libc::EINVAL) => None,
        _ => None,
    }
}

#[cfg(not(unix))]
pub fn seek_data(_file: &mut std::fs::File, _from: u64) -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn fillbuf_reads_small_input_in_one_call() {
        let mut buf = ScanBuffer::new(b'\n');
        let mut reader = Cursor::new(b"alpha\nbeta\n".to_vec());
        let n = buf.fillbuf(0, &mut reader).unwrap();
        assert_eq!(n, 11);
        assert_eq!(buf.live(), b"alpha\nbeta\n");
    }

    #[test]
    fn sentinel_byte_is_always_eol() {
        let buf = ScanBuffer::new(b'\n');
        assert_eq!(buf.as_slice()[buf.sentinel], b'\n');
    }

    #[test]
    fn zap_nuls_replaces_with_eol() {
        let mut buf = ScanBuffer::new(b'\n');
        let mut reader = Cursor::new(vec![0u8, 0u8, b'x']);
        buf.fillbuf(0, &mut reader).unwrap();
        let bufbeg = buf.bufbeg();
        buf.zap_nuls(bufbeg, bufbeg + 2);
        assert_eq!(buf.live(), b"\n\nx");
    }

    #[test]
    fn fillbuf_seek_skip_credits_a_nul_run_and_reaches_eof() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zeros.bin");
        std::fs::write(&path, vec![0u8; 4096]).unwrap();
        let mut file = std::fs::File::options().read(true).write(true).open(&path).unwrap();
        file.flush().ok();

        let mut buf = ScanBuffer::new(b'\n');
        let mut seek_failed = false;
        let mut total_credited = 0u64;

        loop {
            let (n, credited) = buf.fillbuf_seek_skip(0, &mut file, true, &mut seek_failed).unwrap();
            total_credited += credited;
            if n == 0 {
                break;
            }
            // Any bytes handed back to the caller (SEEK_DATA unsupported on
            // this filesystem) are still all zero, never silently dropped.
            assert!(buf.is_all_zeros(buf.bufbeg(), buf.bufbeg() + n));
        }

        assert_eq!(total_credited, 4096);
    }

    #[test]
    fn fillbuf_seek_skip_disabled_returns_zeros_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zeros.bin");
        std::fs::write(&path, vec![0u8; 16]).unwrap();
        let mut file = std::fs::File::open(&path).unwrap();

        let mut buf = ScanBuffer::new(b'\n');
        let mut seek_failed = false;
        let (n, credited) = buf.fillbuf_seek_skip(0, &mut file, false, &mut seek_failed).unwrap();
        assert_eq!(n, 16);
        assert_eq!(credited, 0);
    }
}
