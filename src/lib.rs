//! SLIP framing and per-peer link multiplexing for serial lines
//!
//! This crate turns an unreliable, delimiter-free byte stream into a sequence
//! of discrete datagrams and back, following the framing rules of
//! [RFC 1055](https://datatracker.ietf.org/doc/html/rfc1055)
//! (serial line ip, commonly known as slip). It sits directly above a raw
//! byte transport and directly below a network layer: it frames, escapes and
//! resolves a next-hop address to a physical link. It adds no reliability,
//! no ordering across links and no integrity checking.
//!
//! ## Framing
//!
//! Every frame is `0xC0 <escaped body> 0xC0`. Inside the body, `0xDB` is
//! transmitted as `0xDB 0xDD` and `0xC0` as `0xDB 0xDC`, in that order of
//! substitution. There is no length field and no checksum; the delimiter
//! byte alone bounds a frame.
//!
//! ## Examples
//!
//! Encoding is a single stateless pass:
//!
//! ```
//! use sliplink::encode;
//!
//! assert_eq!(encode(b"hi"), [0xC0, b'h', b'i', 0xC0]);
//! assert_eq!(encode(&[0x01, 0xC0, 0x02]), [0xC0, 0x01, 0xDB, 0xDC, 0x02, 0xC0]);
//! ```
//!
//! Decoding is incremental. The serial line only guarantees chunk
//! boundaries, never frame boundaries, so the [`Decoder`] keeps the residue
//! of an unfinished frame between calls and can be fed arbitrarily split
//! input:
//!
//! ```
//! use sliplink::Decoder;
//!
//! let mut decoder = Decoder::new();
//! assert!(decoder.feed(&[0xC0, b'h']).is_empty());
//! let datagrams = decoder.feed(&[b'i', 0xC0]);
//! assert_eq!(datagrams, [b"hi".to_vec()]);
//! ```
//!
//! A full link layer binds one [`Link`] per peer address and routes by
//! `next_hop`:
//!
//! ```
//! use std::collections::HashMap;
//! use std::net::Ipv4Addr;
//! use sliplink::{LinkLayer, SerialLine, SinkError};
//!
//! struct Discard;
//! impl SerialLine for Discard {
//!     fn send(&mut self, _frame: &[u8]) -> std::io::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! let peer: Ipv4Addr = "10.0.0.2".parse().unwrap();
//! let mut layer = LinkLayer::new(HashMap::from([(peer, Discard)]));
//! layer.register_receiver(|datagram: Vec<u8>| -> Result<(), SinkError> {
//!     println!("datagram of {} bytes arrived", datagram.len());
//!     Ok(())
//! });
//! layer.send(b"ping", peer).unwrap();
//! layer.feed(peer, &[0xC0, b'p', b'o', b'n', b'g', 0xC0]).unwrap();
//! ```

use std::io;
use std::net::Ipv4Addr;

mod aggregator;
mod decoder;
mod encode;
mod link;

pub use aggregator::LinkLayer;
pub use decoder::Decoder;
pub use encode::encode;
pub use link::Link;

/// Frame delimiter, opens and closes every frame
pub(crate) const END: u8 = 0xC0;

/// Escape byte, introduces a two-byte sequence inside a frame body
pub(crate) const ESC: u8 = 0xDB;

/// Transposed frame delimiter, second byte of an escaped `END`
pub(crate) const ESC_END: u8 = 0xDC;

/// Transposed escape, second byte of an escaped `ESC`
pub(crate) const ESC_ESC: u8 = 0xDD;

/// Errors reported by the link layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No link is configured for the requested peer address.
    #[error("no link configured for peer {0}")]
    NoRoute(Ipv4Addr),
    /// The underlying serial line failed to accept an outgoing frame.
    #[error("serial line failure")]
    Transport(#[from] io::Error),
}

/// Error raised by a datagram consumer while handling a delivery.
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Consumer of decoded datagrams.
///
/// A [`Link`] invokes the registered sink once per decoded datagram,
/// synchronously and in stream order. Returning an error does not stop the
/// link: the error is handed to the link's [`FaultHandler`] and decoding
/// continues with the next frame.
///
/// Any `FnMut(Vec<u8>) -> Result<(), SinkError>` closure is a sink.
pub trait DatagramSink: Send {
    /// Handles one decoded datagram.
    ///
    /// # Errors
    ///
    /// Implementations may fail for any consumer-side reason; the failure is
    /// diagnostic only and never aborts the stream.
    fn deliver(&mut self, datagram: Vec<u8>) -> Result<(), SinkError>;
}

impl<F> DatagramSink for F
where
    F: FnMut(Vec<u8>) -> Result<(), SinkError> + Send,
{
    fn deliver(&mut self, datagram: Vec<u8>) -> Result<(), SinkError> {
        self(datagram)
    }
}

/// Diagnostics hook for consumer delivery failures.
///
/// Injected into each [`Link`]; the default is [`LogFaults`].
pub trait FaultHandler: Send {
    /// Records one failed delivery.
    fn on_sink_error(&mut self, error: SinkError);
}

/// Default [`FaultHandler`] reporting through the [`log`] facade.
#[derive(Debug, Default)]
pub struct LogFaults;

impl FaultHandler for LogFaults {
    fn on_sink_error(&mut self, error: SinkError) {
        log::warn!("datagram consumer failed: {error}");
    }
}

/// One raw serial byte transport.
///
/// This is the seam towards the physical layer. Outgoing frames are pushed
/// through [`SerialLine::send`]; incoming bytes are pushed by the host into
/// [`Link::feed`] in whatever chunks the line produces.
pub trait SerialLine {
    /// Emits one framed byte sequence on the line.
    ///
    /// # Errors
    ///
    /// Transport failures propagate unchanged to the sender.
    fn send(&mut self, frame: &[u8]) -> io::Result<()>;
}
