use crate::{END, ESC, ESC_END, ESC_ESC};

/// Incremental frame decoder for one serial line.
///
/// The line guarantees only chunk boundaries, never frame boundaries: a
/// frame may span several chunks and one chunk may carry several frames.
/// The decoder therefore buffers the residue of an unfinished frame between
/// calls to [`Decoder::feed`]. Between calls the buffer holds at most one
/// partial frame and never a complete one.
#[derive(Debug)]
pub struct Decoder {
    residual: Vec<u8>,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    /// Creates a decoder with an empty residual buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            residual: Vec::new(),
        }
    }

    /// Decodes the next chunk of raw bytes from the line.
    ///
    /// Returns the datagrams of every frame completed by this chunk, in the
    /// order their frames appear in the byte stream. Empty frames are
    /// discarded: back-to-back delimiters, as produced by one frame's
    /// trailing delimiter followed by the next frame's leading one, yield
    /// nothing. A chunk without any delimiter only grows the residual
    /// buffer and returns an empty vector.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        let mut window = std::mem::take(&mut self.residual);
        window.extend_from_slice(chunk);

        let mut datagrams = Vec::new();
        let mut segments = window.split(|&byte| byte == END).peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                // No terminating delimiter yet, keep for the next chunk.
                self.residual = segment.to_vec();
            } else if !segment.is_empty() {
                datagrams.push(unescape(segment));
            }
        }
        datagrams
    }

    /// The buffered bytes of the partial frame received so far.
    #[must_use]
    pub fn residual(&self) -> &[u8] {
        &self.residual
    }
}

/// Reverses the escaping of one complete frame body.
///
/// The two substitutions are undone in the strict inverse order of
/// encoding: `ESC ESC_END` back to the delimiter before `ESC ESC_ESC` back
/// to the escape byte. An escape byte followed by anything else is left in
/// the output unchanged; framing is lenient and never rejects a body.
fn unescape(body: &[u8]) -> Vec<u8> {
    let mut datagram = Vec::with_capacity(body.len());
    let mut index = 0;
    while index < body.len() {
        if body[index] == ESC && index + 1 < body.len() {
            match body[index + 1] {
                ESC_END => {
                    datagram.push(END);
                    index += 2;
                    continue;
                }
                ESC_ESC => {
                    datagram.push(ESC);
                    index += 2;
                    continue;
                }
                _ => {}
            }
        }
        datagram.push(body[index]);
        index += 1;
    }
    datagram
}
