//! Accumulator that reduces a byte stream to its last N lines.

use tracing::debug;

/// Line delimiter used for trimming.
const NEWLINE: u8 = b'\n';

/// Collects bytes for one read session, keeping only the trailing `lines`
/// lines of everything pushed so far.
///
/// After every push the buffer is compacted to the start of the last
/// `lines` lines, looking back at most `search_limit` bytes for the
/// boundaries. When that window holds too few delimiters the buffer stops
/// trimming and reports itself degraded; the reader then ends the session
/// and passes the retained bytes through untouched. With a line limit of
/// zero nothing is retained at all, the bytes are only counted.
#[derive(Debug)]
pub struct TailBuffer {
    lines: usize,
    search_limit: usize,
    data: Vec<u8>,
    degraded: bool,
    bytes_seen: u64,
    lines_seen: u64,
}

impl TailBuffer {
    pub fn new(lines: usize, search_limit: usize) -> Self {
        Self {
            lines,
            search_limit,
            data: Vec::new(),
            degraded: false,
            bytes_seen: 0,
            lines_seen: 0,
        }
    }

    /// Append a chunk in the order the source produced it and drop whatever
    /// no longer belongs to the tail.
    pub fn push(&mut self, chunk: &[u8]) {
        self.bytes_seen += chunk.len() as u64;
        self.lines_seen += chunk.iter().filter(|&&b| b == NEWLINE).count() as u64;

        if self.lines == 0 {
            return;
        }
        self.data.extend_from_slice(chunk);
        if self.degraded {
            return;
        }

        match tail_start(&self.data, self.lines, self.search_limit) {
            Some(0) => {}
            Some(start) => {
                self.data.drain(..start);
            }
            None => {
                debug!(
                    retained = self.data.len(),
                    search_limit = self.search_limit,
                    "search limit reached before line boundary, passing buffer through"
                );
                self.degraded = true;
            }
        }
    }

    /// True once the search limit was scanned without finding enough line
    /// boundaries. The retained bytes are no longer trimmed.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Bytes currently held.
    pub fn retained(&self) -> usize {
        self.data.len()
    }

    /// Total bytes pushed, including any that were not retained.
    pub fn bytes_seen(&self) -> u64 {
        self.bytes_seen
    }

    /// Number of delimiters pushed so far.
    pub fn lines_seen(&self) -> u64 {
        self.lines_seen
    }

    /// Consume the buffer and return the trailing lines, or everything
    /// retained when degraded.
    pub fn finish(self) -> Vec<u8> {
        if self.lines == 0 {
            return Vec::new();
        }
        self.data
    }
}

/// Offset of the first byte of the last `lines` lines in `data`.
///
/// Returns `None` when `search_limit` bytes were scanned without finding the
/// boundary. A trailing delimiter terminates the final line instead of
/// opening an empty one, and an undelimited fragment at the end counts as a
/// line of its own.
fn tail_start(data: &[u8], lines: usize, search_limit: usize) -> Option<usize> {
    let end = match data.last() {
        Some(&NEWLINE) => data.len() - 1,
        _ => data.len(),
    };

    let mut found = 0;
    for (scanned, i) in (0..end).rev().enumerate() {
        if scanned >= search_limit {
            return None;
        }
        if data[i] == NEWLINE {
            found += 1;
            if found == lines {
                return Some(i + 1);
            }
        }
    }

    Some(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: &str = "hello\nworld\nthis\nis\na\ntest";

    fn tail(input: &str, lines: usize, search_limit: usize) -> String {
        let mut buffer = TailBuffer::new(lines, search_limit);
        buffer.push(input.as_bytes());
        String::from_utf8(buffer.finish()).unwrap()
    }

    fn numbered_lines(count: usize) -> String {
        (1..=count).map(|i| format!("line{i:04}\n")).collect()
    }

    #[test]
    fn test_keeps_everything_when_under_line_limit() {
        assert_eq!(tail(HELLO, 6, 1000), HELLO);
        assert_eq!(tail(HELLO, 60, 1000), HELLO);
    }

    #[test]
    fn test_trims_to_last_lines() {
        assert_eq!(tail(HELLO, 5, 1000), "world\nthis\nis\na\ntest");
        assert_eq!(tail(HELLO, 1, 1000), "test");
    }

    #[test]
    fn test_zero_lines_is_empty() {
        assert_eq!(tail(HELLO, 0, 1000), "");
    }

    #[test]
    fn test_zero_lines_retains_nothing() {
        let mut buffer = TailBuffer::new(0, 4);
        buffer.push(HELLO.as_bytes());
        buffer.push(HELLO.as_bytes());
        assert!(!buffer.is_degraded());
        assert_eq!(buffer.retained(), 0);
        assert_eq!(buffer.bytes_seen(), 2 * HELLO.len() as u64);
        assert_eq!(buffer.lines_seen(), 10);
        assert!(buffer.finish().is_empty());
    }

    #[test]
    fn test_search_limit_passes_everything_through() {
        assert_eq!(tail(HELLO, 6, 1), HELLO);
        assert_eq!(tail(HELLO, 2, 3), HELLO);
        assert_eq!(tail(HELLO, 2, 0), HELLO);
    }

    #[test]
    fn test_no_delimiters() {
        let no_lines = "jskdfhjasdhfjkajkldsfdlsjkahfkjdsafa";
        assert_eq!(tail(no_lines, 10, 1000), no_lines);
        assert_eq!(tail(no_lines, 10, 2), no_lines);
    }

    #[test]
    fn test_trailing_delimiter_closes_last_line() {
        assert_eq!(tail("a\nb\nc\n", 1, 1000), "c\n");
        assert_eq!(tail("a\nb\nc\n", 2, 1000), "b\nc\n");
        assert_eq!(tail("a\nb\nc\n", 3, 1000), "a\nb\nc\n");
    }

    #[test]
    fn test_blank_lines_count() {
        assert_eq!(tail("a\n\n\nb", 2, 1000), "\nb");
        assert_eq!(tail("\n", 1, 1000), "\n");
    }

    #[test]
    fn test_chunks_are_joined_in_order() {
        let mut buffer = TailBuffer::new(2, 1000);
        for chunk in ["hel", "lo\nwor", "ld\nthis", "\nis"] {
            buffer.push(chunk.as_bytes());
        }
        assert_eq!(buffer.finish(), b"this\nis");
    }

    #[test]
    fn test_compacts_long_input_to_tail() {
        let input = numbered_lines(2000);
        let mut buffer = TailBuffer::new(2, 240);
        for chunk in input.as_bytes().chunks(8 * 1024) {
            buffer.push(chunk);
            assert!(buffer.retained() <= 8 * 1024 + 18);
        }
        assert!(!buffer.is_degraded());
        assert_eq!(buffer.finish(), b"line1999\nline2000\n");
    }

    #[test]
    fn test_chunking_does_not_change_tail() {
        let input = numbered_lines(10);

        let mut whole = TailBuffer::new(2, 30);
        whole.push(input.as_bytes());

        let mut bytewise = TailBuffer::new(2, 30);
        for byte in input.as_bytes() {
            bytewise.push(std::slice::from_ref(byte));
        }

        assert_eq!(whole.finish(), b"line0009\nline0010\n");
        assert_eq!(bytewise.finish(), b"line0009\nline0010\n");
    }

    #[test]
    fn test_degrades_when_window_lacks_boundaries() {
        let mut buffer = TailBuffer::new(3, 8);
        buffer.push(b"abcd");
        assert!(!buffer.is_degraded());
        buffer.push(b"efgh");
        assert!(!buffer.is_degraded());
        buffer.push(b"i");
        assert!(buffer.is_degraded());

        // Degraded buffers keep everything pushed afterwards untrimmed.
        buffer.push(b"\nj\nk\n");
        assert_eq!(buffer.finish(), b"abcdefghi\nj\nk\n");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(tail("", 3, 1000), "");
    }
}
