use crate::decoder::Decoder;
use crate::encode::encode;
use crate::{DatagramSink, Error, FaultHandler, LogFaults, SerialLine};

/// One link: a raw serial line plus its framing state.
///
/// A link owns exactly one [`SerialLine`] and the [`Decoder`] for the bytes
/// arriving on it. Decoded datagrams go to the registered [`DatagramSink`];
/// consumer failures go to the injected [`FaultHandler`] and never
/// interrupt the stream.
pub struct Link<T> {
    line: T,
    decoder: Decoder,
    sink: Option<Box<dyn DatagramSink>>,
    faults: Box<dyn FaultHandler>,
}

impl<T: SerialLine> Link<T> {
    /// Wraps one serial line into a link.
    ///
    /// No sink is registered yet; datagrams decoded before registration are
    /// dropped. Fault reporting defaults to [`LogFaults`].
    pub fn new(line: T) -> Self {
        Self {
            line,
            decoder: Decoder::new(),
            sink: None,
            faults: Box::new(LogFaults),
        }
    }

    /// Registers the consumer for decoded datagrams.
    ///
    /// There is a single subscriber per link; registering again replaces
    /// the previous sink.
    pub fn register_receiver<S: DatagramSink + 'static>(&mut self, sink: S) {
        self.sink = Some(Box::new(sink));
    }

    /// Injects the diagnostics hook for consumer delivery failures.
    pub fn set_fault_handler<H: FaultHandler + 'static>(&mut self, handler: H) {
        self.faults = Box::new(handler);
    }

    /// Encodes one datagram and emits the frame on the serial line.
    ///
    /// Framing state is untouched; only incoming bytes affect the residual
    /// buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] when the serial line rejects the frame.
    pub fn send(&mut self, datagram: &[u8]) -> Result<(), Error> {
        self.line.send(&encode(datagram))?;
        Ok(())
    }

    /// Pushes one chunk of raw bytes received on the serial line.
    ///
    /// Every frame completed by this chunk is decoded and delivered to the
    /// registered sink before the call returns, in stream order. A sink
    /// error is recorded through the fault handler and delivery continues
    /// with the next datagram; an unregistered sink drops them.
    pub fn feed(&mut self, chunk: &[u8]) {
        for datagram in self.decoder.feed(chunk) {
            match self.sink.as_mut() {
                Some(sink) => {
                    if let Err(error) = sink.deliver(datagram) {
                        self.faults.on_sink_error(error);
                    }
                }
                None => log::debug!("no receiver registered, dropping datagram"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{END, ESC, ESC_ESC, SinkError};
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Serial line capturing every frame handed to it.
    #[derive(Clone, Default)]
    struct RecordingLine {
        frames: Arc<Mutex<Vec<Vec<u8>>>>,
        fail: bool,
    }

    impl SerialLine for RecordingLine {
        fn send(&mut self, frame: &[u8]) -> io::Result<()> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "line down"));
            }
            self.frames.lock().unwrap().push(frame.to_vec());
            Ok(())
        }
    }

    fn recording_sink() -> (Arc<Mutex<Vec<Vec<u8>>>>, impl DatagramSink + 'static) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let handle = Arc::clone(&received);
        let sink = move |datagram: Vec<u8>| -> Result<(), SinkError> {
            handle.lock().unwrap().push(datagram);
            Ok(())
        };
        (received, sink)
    }

    struct CountingFaults(Arc<Mutex<Vec<String>>>);

    impl FaultHandler for CountingFaults {
        fn on_sink_error(&mut self, error: SinkError) {
            self.0.lock().unwrap().push(error.to_string());
        }
    }

    #[test]
    fn send_frames_the_datagram() {
        let line = RecordingLine::default();
        let frames = Arc::clone(&line.frames);
        let mut link = Link::new(line);
        link.send(&[0x01, ESC]).unwrap();
        assert_eq!(
            *frames.lock().unwrap(),
            [vec![END, 0x01, ESC, ESC_ESC, END]]
        );
    }

    #[test]
    fn send_propagates_transport_failure() {
        let line = RecordingLine {
            fail: true,
            ..RecordingLine::default()
        };
        let mut link = Link::new(line);
        assert!(matches!(link.send(b"x"), Err(Error::Transport(_))));
    }

    #[test]
    fn feed_delivers_to_registered_sink() {
        let mut link = Link::new(RecordingLine::default());
        let (received, sink) = recording_sink();
        link.register_receiver(sink);
        link.feed(&[END, 0x01, END, 0x02, END]);
        assert_eq!(*received.lock().unwrap(), [vec![0x01], vec![0x02]]);
    }

    #[test]
    fn feed_without_sink_drops_datagrams() {
        let mut link = Link::new(RecordingLine::default());
        link.feed(&[END, 0x01, END]);
        let (received, sink) = recording_sink();
        link.register_receiver(sink);
        link.feed(&[END, 0x02, END]);
        assert_eq!(*received.lock().unwrap(), [vec![0x02]]);
    }

    #[test]
    fn reregistration_replaces_the_sink() {
        let mut link = Link::new(RecordingLine::default());
        let (first, first_sink) = recording_sink();
        let (second, second_sink) = recording_sink();
        link.register_receiver(first_sink);
        link.register_receiver(second_sink);
        link.feed(&[END, 0x01, END]);
        assert!(first.lock().unwrap().is_empty());
        assert_eq!(*second.lock().unwrap(), [vec![0x01]]);
    }

    #[test]
    fn sink_error_does_not_stop_the_stream() {
        let mut link = Link::new(RecordingLine::default());
        let errors = Arc::new(Mutex::new(Vec::new()));
        link.set_fault_handler(CountingFaults(Arc::clone(&errors)));

        let received = Arc::new(Mutex::new(Vec::new()));
        let handle = Arc::clone(&received);
        let mut first = true;
        link.register_receiver(move |datagram: Vec<u8>| -> Result<(), SinkError> {
            if std::mem::take(&mut first) {
                return Err("consumer rejected datagram".into());
            }
            handle.lock().unwrap().push(datagram);
            Ok(())
        });

        // Two complete frames and a trailing partial one in a single chunk.
        link.feed(&[END, 0x01, END, 0x02, END, 0x03]);
        assert_eq!(*received.lock().unwrap(), [vec![0x02]]);
        assert_eq!(errors.lock().unwrap().len(), 1);

        // The failure corrupted neither the residual buffer nor the link.
        link.feed(&[END]);
        assert_eq!(*received.lock().unwrap(), [vec![0x02], vec![0x03]]);
    }
}
