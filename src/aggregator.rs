use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};

use crate::link::Link;
use crate::{DatagramSink, Error, SerialLine, SinkError};

/// Slot holding the single consumer shared by all links of a layer.
type ConsumerSlot = Arc<Mutex<Option<Box<dyn DatagramSink>>>>;

/// The link aggregator: one [`Link`] per peer address.
///
/// Outgoing datagrams fan out to the link configured for `next_hop`;
/// incoming datagrams from any link fan in to a single registered consumer,
/// which never learns which physical link a datagram arrived on. The
/// address table is built once at construction and read-only afterwards.
pub struct LinkLayer<T> {
    links: HashMap<Ipv4Addr, Link<T>>,
    consumer: ConsumerSlot,
}

impl<T: SerialLine> LinkLayer<T> {
    /// Builds one link per `{peer address, serial line}` entry.
    ///
    /// Each link gets the layer's internal relay registered as its sink, so
    /// everything any line decodes ends up at the consumer registered via
    /// [`LinkLayer::register_receiver`].
    #[must_use]
    pub fn new(lines: HashMap<Ipv4Addr, T>) -> Self {
        let consumer: ConsumerSlot = Arc::new(Mutex::new(None));
        let links = lines
            .into_iter()
            .map(|(peer, line)| {
                let mut link = Link::new(line);
                link.register_receiver(Relay {
                    consumer: Arc::clone(&consumer),
                });
                (peer, link)
            })
            .collect();
        Self { links, consumer }
    }

    /// Registers the consumer for datagrams decoded on any link.
    ///
    /// Registering again replaces the previous consumer. While no consumer
    /// is registered, decoded datagrams are dropped, not queued.
    pub fn register_receiver<S: DatagramSink + 'static>(&self, sink: S) {
        *self.consumer.lock().expect("consumer slot poisoned") = Some(Box::new(sink));
    }

    /// Sends one datagram towards `next_hop` over the link bound to it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRoute`] when no link is configured for
    /// `next_hop`; a miss here is a routing misconfiguration by the caller,
    /// not a droppable event. Transport failures propagate as
    /// [`Error::Transport`].
    pub fn send(&mut self, datagram: &[u8], next_hop: Ipv4Addr) -> Result<(), Error> {
        self.links
            .get_mut(&next_hop)
            .ok_or(Error::NoRoute(next_hop))?
            .send(datagram)
    }

    /// Pushes raw bytes received on the serial line bound to `peer`.
    ///
    /// Every frame the chunk completes is decoded and relayed to the
    /// registered consumer before the call returns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRoute`] when no link is configured for `peer`.
    pub fn feed(&mut self, peer: Ipv4Addr, chunk: &[u8]) -> Result<(), Error> {
        self.links
            .get_mut(&peer)
            .ok_or(Error::NoRoute(peer))?
            .feed(chunk);
        Ok(())
    }

    /// The configured peer addresses.
    pub fn peers(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        self.links.keys().copied()
    }
}

/// Per-link sink forwarding into the layer's shared consumer slot.
struct Relay {
    consumer: ConsumerSlot,
}

impl DatagramSink for Relay {
    fn deliver(&mut self, datagram: Vec<u8>) -> Result<(), SinkError> {
        match self.consumer.lock().expect("consumer slot poisoned").as_mut() {
            Some(consumer) => consumer.deliver(datagram),
            None => {
                log::debug!("no consumer registered yet, dropping datagram");
                Ok(())
            }
        }
    }
}
