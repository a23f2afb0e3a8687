//! Newline framing: reassembles command lines from arbitrarily chunked reads.
//!
//! # Why a framer? (for beginners)
//!
//! TCP is a *byte stream*, not a message stream.  A client that writes
//! `"ping\n"` once may see it arrive as `"pi"` followed by `"ng\n"`, or
//! glued together with the next command as `"ping\nstatus\n"`.  The framer
//! accumulates bytes until it sees a newline and only then hands out a
//! complete line, so the rest of the server never has to think about how
//! the bytes were split.
//!
//! # Memory bound
//!
//! A misbehaving client could send megabytes without ever sending a newline.
//! The framer therefore keeps at most `max_line_len + 1` bytes (the extra
//! byte is room for a `\r` before the `\n`).  When a line grows past the
//! bound the framer switches to *discarding* mode: it drops everything up to
//! the next newline and then emits exactly one
//! [`Frame::Rejected`] with [`ProtocolError::Oversized`].  The connection
//! keeps working and the next line is framed normally.

use std::collections::VecDeque;

use tracing::debug;

use super::ProtocolError;

/// Default upper bound for a single command line, in bytes.
pub const DEFAULT_MAX_LINE_LEN: usize = 1024;

/// How a line was terminated; replies are terminated the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// One framed unit of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete, UTF-8 decoded line without its terminator.
    Line { text: String, ending: LineEnding },
    /// A line that was consumed but cannot be processed.
    Rejected {
        error: ProtocolError,
        ending: LineEnding,
    },
}

impl Frame {
    /// Terminator of the framed line.
    pub fn ending(&self) -> LineEnding {
        match self {
            Frame::Line { ending, .. } | Frame::Rejected { ending, .. } => *ending,
        }
    }
}

/// Incremental newline framer with a bounded accumulation buffer.
///
/// Feed bytes with [`push`](Self::push) as they arrive, then drain complete
/// frames with [`next_frame`](Self::next_frame).  At end of stream call
/// [`finish`](Self::finish) to flush a final line that had no terminator.
#[derive(Debug)]
pub struct LineFramer {
    buf: Vec<u8>,
    ready: VecDeque<Frame>,
    max_line_len: usize,
    discarding: bool,
    /// Last discarded byte was `\r`; decides the ending of the rejection.
    discard_tail_cr: bool,
}

impl LineFramer {
    /// Creates a framer that rejects lines longer than `max_line_len` bytes.
    pub fn new(max_line_len: usize) -> Self {
        Self {
            buf: Vec::with_capacity(max_line_len.min(DEFAULT_MAX_LINE_LEN) + 1),
            ready: VecDeque::new(),
            max_line_len,
            discarding: false,
            discard_tail_cr: false,
        }
    }

    pub fn max_line_len(&self) -> usize {
        self.max_line_len
    }

    /// Number of bytes of the current partial line held in memory.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Appends freshly read bytes, completing as many lines as they contain.
    pub fn push(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            match bytes.iter().position(|&b| b == b'\n') {
                Some(newline) => {
                    self.absorb(&bytes[..newline]);
                    self.complete_line();
                    bytes = &bytes[newline + 1..];
                }
                None => {
                    self.absorb(bytes);
                    break;
                }
            }
        }
    }

    /// Pops the oldest complete frame, if any.
    pub fn next_frame(&mut self) -> Option<Frame> {
        self.ready.pop_front()
    }

    /// Flushes the trailing unterminated line at end of stream.
    ///
    /// Returns `None` when nothing but whitespace was pending.  Frames still
    /// queued from earlier pushes must be drained with `next_frame` first.
    pub fn finish(&mut self) -> Option<Frame> {
        if self.discarding {
            self.discarding = false;
            self.discard_tail_cr = false;
            return Some(Frame::Rejected {
                error: ProtocolError::Oversized {
                    max: self.max_line_len,
                },
                ending: LineEnding::Lf,
            });
        }
        if self.buf.iter().all(u8::is_ascii_whitespace) {
            self.buf.clear();
            return None;
        }
        let line = std::mem::take(&mut self.buf);
        Some(self.decode(line, LineEnding::Lf))
    }

    fn absorb(&mut self, chunk: &[u8]) {
        if self.discarding {
            if let Some(&last) = chunk.last() {
                self.discard_tail_cr = last == b'\r';
            }
            return;
        }
        // One spare byte leaves room for the `\r` of a CRLF terminator.
        if self.buf.len() + chunk.len() > self.max_line_len + 1 {
            debug!(
                max = self.max_line_len,
                "line exceeds limit, discarding until newline"
            );
            self.discard_tail_cr = chunk.last() == Some(&b'\r');
            self.discarding = true;
            self.buf.clear();
            return;
        }
        self.buf.extend_from_slice(chunk);
    }

    fn complete_line(&mut self) {
        if self.discarding {
            let ending = if self.discard_tail_cr {
                LineEnding::CrLf
            } else {
                LineEnding::Lf
            };
            self.discarding = false;
            self.discard_tail_cr = false;
            self.ready.push_back(Frame::Rejected {
                error: ProtocolError::Oversized {
                    max: self.max_line_len,
                },
                ending,
            });
            return;
        }

        let mut line = std::mem::take(&mut self.buf);
        let ending = if line.last() == Some(&b'\r') {
            line.pop();
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        };
        let frame = self.decode(line, ending);
        self.ready.push_back(frame);
    }

    fn decode(&self, line: Vec<u8>, ending: LineEnding) -> Frame {
        if line.len() > self.max_line_len {
            return Frame::Rejected {
                error: ProtocolError::Oversized {
                    max: self.max_line_len,
                },
                ending,
            };
        }
        match String::from_utf8(line) {
            Ok(text) => Frame::Line { text, ending },
            Err(_) => Frame::Rejected {
                error: ProtocolError::InvalidUtf8,
                ending,
            },
        }
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LEN)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> Frame {
        Frame::Line {
            text: text.to_string(),
            ending: LineEnding::Lf,
        }
    }

    fn drain(framer: &mut LineFramer) -> Vec<Frame> {
        std::iter::from_fn(|| framer.next_frame()).collect()
    }

    #[test]
    fn test_single_line_in_one_chunk() {
        let mut framer = LineFramer::default();
        framer.push(b"ping\n");
        assert_eq!(drain(&mut framer), vec![line("ping")]);
    }

    #[test]
    fn test_line_split_across_two_pushes_parses_identically() {
        // Arrange
        let mut whole = LineFramer::default();
        let mut split = LineFramer::default();

        // Act
        whole.push(b"ping\n");
        split.push(b"pi");
        let after_first = split.next_frame();
        split.push(b"ng\n");

        // Assert
        assert_eq!(after_first, None, "no frame before the newline arrives");
        assert_eq!(drain(&mut split), drain(&mut whole));
    }

    #[test]
    fn test_byte_at_a_time_delivery() {
        let mut framer = LineFramer::default();
        for b in b"volume up\nstatus\n" {
            framer.push(std::slice::from_ref(b));
        }
        assert_eq!(drain(&mut framer), vec![line("volume up"), line("status")]);
    }

    #[test]
    fn test_multiple_lines_in_one_chunk_keep_order() {
        let mut framer = LineFramer::default();
        framer.push(b"ping\nstatus\nup\n");
        assert_eq!(
            drain(&mut framer),
            vec![line("ping"), line("status"), line("up")]
        );
    }

    #[test]
    fn test_crlf_is_stripped_and_reported() {
        let mut framer = LineFramer::default();
        framer.push(b"ping\r\n");
        assert_eq!(
            framer.next_frame(),
            Some(Frame::Line {
                text: "ping".to_string(),
                ending: LineEnding::CrLf
            })
        );
    }

    #[test]
    fn test_multibyte_utf8_split_across_pushes() {
        // "ñ" is 0xC3 0xB1; split it between two reads.
        let mut framer = LineFramer::default();
        framer.push(b"say ma\xC3");
        framer.push(b"\xB1ana\n");
        assert_eq!(framer.next_frame(), Some(line("say mañana")));
    }

    #[test]
    fn test_invalid_utf8_is_rejected_and_next_line_still_frames() {
        let mut framer = LineFramer::default();
        framer.push(b"\xFF\xFE\nping\n");
        assert_eq!(
            drain(&mut framer),
            vec![
                Frame::Rejected {
                    error: ProtocolError::InvalidUtf8,
                    ending: LineEnding::Lf
                },
                line("ping"),
            ]
        );
    }

    #[test]
    fn test_line_exactly_at_bound_is_accepted() {
        let mut framer = LineFramer::new(8);
        framer.push(b"12345678\n");
        assert_eq!(framer.next_frame(), Some(line("12345678")));
    }

    #[test]
    fn test_line_at_bound_with_crlf_is_accepted() {
        let mut framer = LineFramer::new(8);
        framer.push(b"12345678\r\n");
        assert_eq!(
            framer.next_frame().map(|f| f.ending()),
            Some(LineEnding::CrLf)
        );
    }

    #[test]
    fn test_oversized_line_yields_one_rejection_then_recovers() {
        // Arrange
        let mut framer = LineFramer::new(8);

        // Act
        framer.push(b"0123456789abcdef");
        framer.push(b"more garbage");
        framer.push(b"\nping\n");

        // Assert
        assert_eq!(
            drain(&mut framer),
            vec![
                Frame::Rejected {
                    error: ProtocolError::Oversized { max: 8 },
                    ending: LineEnding::Lf
                },
                line("ping"),
            ]
        );
    }

    #[test]
    fn test_oversized_line_never_grows_the_buffer_past_the_bound() {
        let mut framer = LineFramer::new(16);
        for _ in 0..1000 {
            framer.push(b"xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx");
            assert!(framer.buffered_len() <= 17);
        }
    }

    #[test]
    fn test_oversized_crlf_line_reports_crlf() {
        let mut framer = LineFramer::new(4);
        framer.push(b"toolongline\r");
        framer.push(b"\n");
        assert_eq!(
            framer.next_frame(),
            Some(Frame::Rejected {
                error: ProtocolError::Oversized { max: 4 },
                ending: LineEnding::CrLf
            })
        );
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut framer = LineFramer::default();
        framer.push(b"status");
        assert_eq!(framer.next_frame(), None);
        assert_eq!(framer.finish(), Some(line("status")));
        assert_eq!(framer.finish(), None);
    }

    #[test]
    fn test_finish_ignores_whitespace_only_tail() {
        let mut framer = LineFramer::default();
        framer.push(b"  \r");
        assert_eq!(framer.finish(), None);
    }

    #[test]
    fn test_finish_while_discarding_reports_oversized() {
        let mut framer = LineFramer::new(4);
        framer.push(b"abcdefgh");
        assert!(matches!(
            framer.finish(),
            Some(Frame::Rejected {
                error: ProtocolError::Oversized { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_empty_lines_are_framed_as_empty_text() {
        let mut framer = LineFramer::default();
        framer.push(b"\n\r\n");
        let frames = drain(&mut framer);
        assert_eq!(frames.len(), 2);
        assert!(frames
            .iter()
            .all(|f| matches!(f, Frame::Line { text, .. } if text.is_empty())));
    }
}
