use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

use bytes::{Buf, Bytes, BytesMut};
use nsqwire_protocol::{Command, Frame, MAGIC_V2};
use tracing::{debug, trace, warn};

use crate::config::ConnConfig;
use crate::error::{Result, TransportError};

/// Size of the big-endian length prefix in front of every server frame.
pub const SIZE_PREFIX_LEN: usize = 4;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Lifecycle of a [`Connection`].
///
/// A connection starts `Connected` (construction performs the handshake) and
/// moves to `Closed` once the peer goes away or the stream desynchronizes.
/// There is no way back; a closed connection must be replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Connected,
    Closed,
}

/// A blocking NSQ connection over any `Read + Write` stream.
///
/// Handles partial reads internally; callers always get complete frames.
/// Not internally synchronized; every operation takes `&mut self`.
pub struct Connection<S = TcpStream> {
    stream: S,
    buf: BytesMut,
    config: ConnConfig,
    state: ConnState,
}

impl Connection<TcpStream> {
    /// Connect to `host:port` with default configuration.
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        Self::connect_with_config(host, port, ConnConfig::default())
    }

    /// Connect to `host:port`, apply the configured timeout to the socket and
    /// send the protocol magic.
    pub fn connect_with_config(host: &str, port: u16, config: ConnConfig) -> Result<Self> {
        let addr = format!("{host}:{port}");
        let candidates = (host, port)
            .to_socket_addrs()
            .map_err(|source| TransportError::Connect {
                addr: addr.clone(),
                source,
            })?;

        let mut last_err = None;
        for candidate in candidates {
            let attempt = match config.timeout {
                Some(timeout) => TcpStream::connect_timeout(&candidate, timeout),
                None => TcpStream::connect(candidate),
            };
            match attempt {
                Ok(stream) => {
                    stream.set_read_timeout(config.timeout)?;
                    stream.set_write_timeout(config.timeout)?;
                    debug!(%candidate, "connected to nsqd");
                    return Self::handshake(stream, config);
                }
                Err(err) => {
                    debug!(%candidate, error = %err, "connect attempt failed");
                    last_err = Some(err);
                }
            }
        }

        Err(TransportError::Connect {
            addr,
            source: last_err.unwrap_or_else(|| {
                std::io::Error::new(ErrorKind::AddrNotAvailable, "no addresses resolved")
            }),
        })
    }

    /// Address of the connected daemon.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        Ok(self.stream.peer_addr()?)
    }
}

impl<S: Read + Write> Connection<S> {
    /// Take ownership of an established stream and send the protocol magic.
    ///
    /// Timeouts in `config` are not applied here; configure them on the stream.
    pub fn handshake(stream: S, config: ConnConfig) -> Result<Self> {
        let mut conn = Self {
            stream,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            state: ConnState::Connected,
        };
        conn.write_all(MAGIC_V2)?;
        debug!("sent protocol magic");
        Ok(conn)
    }

    /// Write `data` to the stream in full and flush.
    pub fn send(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_open()?;
        self.write_all(data)?;
        trace!(len = data.len(), "sent bytes");
        Ok(())
    }

    /// Encode and send a command.
    pub fn send_command(&mut self, command: &Command) -> Result<()> {
        trace!(%command, "sending command");
        self.send(&command.to_bytes())
    }

    /// Read the next complete frame (blocking), without its size prefix.
    ///
    /// The size prefix is consumed only once the whole frame is buffered, so
    /// a timeout leaves the accumulator intact and the call can be retried.
    pub fn read_response(&mut self) -> Result<Bytes> {
        self.ensure_open()?;
        self.fill(SIZE_PREFIX_LEN)?;

        let declared = (&self.buf[..SIZE_PREFIX_LEN]).get_i32();
        let size = match usize::try_from(declared) {
            Ok(size) => size,
            Err(_) => return Err(self.desync(TransportError::InvalidFrameSize(declared))),
        };
        if size > self.config.max_frame_size {
            return Err(self.desync(TransportError::FrameTooLarge {
                size,
                max: self.config.max_frame_size,
            }));
        }

        let mut frame = self.read_n(SIZE_PREFIX_LEN + size)?;
        frame.advance(SIZE_PREFIX_LEN);
        trace!(size, buffered = self.buf.len(), "read frame");
        Ok(frame)
    }

    /// Read and decode the next frame.
    pub fn read_frame(&mut self) -> Result<Frame> {
        let data = self.read_response()?;
        Ok(Frame::decode(data)?)
    }

    /// Flush and drop the connection, closing the stream.
    pub fn close(mut self) -> Result<()> {
        if self.state == ConnState::Connected {
            self.flush()?;
        }
        self.state = ConnState::Closed;
        debug!(discarded = self.buf.len(), "connection closed");
        Ok(())
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    /// Number of received bytes held beyond the frames already returned.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Current connection configuration.
    pub fn config(&self) -> &ConnConfig {
        &self.config
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Consume the connection and return the inner stream.
    ///
    /// Any buffered bytes are discarded.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Return exactly `size` bytes, keeping any surplus for the next call.
    fn read_n(&mut self, size: usize) -> Result<Bytes> {
        self.fill(size)?;
        Ok(self.buf.split_to(size).freeze())
    }

    /// Read from the stream until at least `size` bytes are buffered.
    fn fill(&mut self, size: usize) -> Result<()> {
        let chunk = self.config.read_chunk_size.max(1);
        while self.buf.len() < size {
            let start = self.buf.len();
            self.buf.resize(start + chunk, 0);
            let read = match self.stream.read(&mut self.buf[start..]) {
                Ok(n) => n,
                Err(err) => {
                    self.buf.truncate(start);
                    if err.kind() == ErrorKind::Interrupted {
                        continue;
                    }
                    return Err(TransportError::Io(err));
                }
            };
            self.buf.truncate(start + read);

            if read == 0 {
                warn!(needed = size, buffered = start, "peer closed connection");
                self.state = ConnState::Closed;
                return Err(TransportError::ConnectionClosed {
                    needed: size,
                    buffered: start,
                });
            }
        }
        Ok(())
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < data.len() {
            match self.stream.write(&data[offset..]) {
                Ok(0) => {
                    return Err(TransportError::Io(std::io::Error::from(
                        ErrorKind::WriteZero,
                    )))
                }
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        self.flush()
    }

    fn flush(&mut self) -> Result<()> {
        loop {
            match self.stream.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            ConnState::Connected => Ok(()),
            ConnState::Closed => Err(TransportError::Closed),
        }
    }

    fn desync(&mut self, err: TransportError) -> TransportError {
        warn!(error = %err, "rejecting frame; closing connection");
        self.state = ConnState::Closed;
        err
    }
}

impl<S> std::fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state)
            .field("buffered", &self.buf.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    use bytes::BufMut;
    use nsqwire_protocol::{nop, publish, FrameType, ProtocolError};
    use proptest::prelude::*;

    use super::*;

    /// In-memory stream handing out at most `chunk` bytes per read.
    #[derive(Debug)]
    struct ChunkedStream {
        input: Vec<u8>,
        pos: usize,
        chunk: usize,
        written: Vec<u8>,
    }

    impl ChunkedStream {
        fn new(input: Vec<u8>, chunk: usize) -> Self {
            Self {
                input,
                pos: 0,
                chunk,
                written: Vec::new(),
            }
        }
    }

    impl Read for ChunkedStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = (self.input.len() - self.pos).min(buf.len()).min(self.chunk);
            buf[..n].copy_from_slice(&self.input[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    impl Write for ChunkedStream {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn wire_frame(frame_type: i32, payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_i32((payload.len() + 4) as i32);
        buf.put_i32(frame_type);
        buf.put_slice(payload);
        buf.to_vec()
    }

    fn conn_over(input: Vec<u8>, chunk: usize) -> Connection<ChunkedStream> {
        Connection::handshake(ChunkedStream::new(input, chunk), ConnConfig::default()).unwrap()
    }

    #[test]
    fn handshake_writes_magic_first() {
        let conn = conn_over(Vec::new(), 64);
        assert_eq!(conn.get_ref().written, MAGIC_V2);
        assert_eq!(conn.state(), ConnState::Connected);
    }

    #[test]
    fn read_single_response() {
        let mut conn = conn_over(wire_frame(0, b"OK"), 4096);
        let data = conn.read_response().unwrap();
        assert_eq!(data.as_ref(), &[0, 0, 0, 0, b'O', b'K']);
        assert_eq!(conn.buffered(), 0);
    }

    #[test]
    fn read_frames_in_order_from_one_chunk() {
        let mut wire = wire_frame(0, b"OK");
        wire.extend(wire_frame(1, b"E_INVALID"));
        wire.extend(wire_frame(0, b"_heartbeat_"));

        let mut conn = conn_over(wire, 4096);
        assert!(conn.read_frame().unwrap().is_ok());
        assert_eq!(
            conn.read_frame().unwrap().error_code().as_deref(),
            Some("E_INVALID")
        );
        assert!(conn.read_frame().unwrap().is_heartbeat());
    }

    #[test]
    fn surplus_is_kept_between_calls() {
        let mut wire = wire_frame(0, b"first");
        wire.extend(wire_frame(0, b"second"));
        let second_len = wire_frame(0, b"second").len();

        let mut conn = conn_over(wire, 4096);
        conn.read_response().unwrap();
        assert_eq!(conn.buffered(), second_len);
        let data = conn.read_response().unwrap();
        assert_eq!(&data[4..], b"second");
    }

    #[test]
    fn byte_by_byte_stream() {
        let mut conn = conn_over(wire_frame(0, b"slow"), 1);
        let data = conn.read_response().unwrap();
        assert_eq!(&data[4..], b"slow");
    }

    #[test]
    fn empty_frame_is_delivered() {
        let mut conn = conn_over(vec![0, 0, 0, 0], 4096);
        assert!(conn.read_response().unwrap().is_empty());
    }

    #[test]
    fn read_message_frame() {
        let mut payload = BytesMut::new();
        payload.put_i64(1_234);
        payload.put_u16(2);
        payload.put_slice(b"0123456789abcdef");
        payload.put_slice(b"msg\nbody");

        let mut conn = conn_over(wire_frame(2, &payload), 7);
        let frame = conn.read_frame().unwrap();
        assert_eq!(frame.frame_type(), FrameType::Message);
        let message = frame.into_message().unwrap();
        assert_eq!(message.attempts(), 2);
        assert_eq!(message.body().as_ref(), b"msg\nbody");
    }

    #[test]
    fn undecodable_frame_surfaces_protocol_error() {
        let mut conn = conn_over(wire_frame(7, b""), 4096);
        let err = conn.read_frame().unwrap_err();
        assert!(matches!(
            err,
            TransportError::Protocol(ProtocolError::UnknownFrameType(7))
        ));
        assert_eq!(conn.state(), ConnState::Connected);
    }

    #[test]
    fn closed_before_any_bytes() {
        let mut conn = conn_over(Vec::new(), 4096);
        let err = conn.read_response().unwrap_err();
        assert!(matches!(
            err,
            TransportError::ConnectionClosed {
                needed: 4,
                buffered: 0
            }
        ));
        assert_eq!(conn.state(), ConnState::Closed);
    }

    #[test]
    fn closed_mid_frame() {
        let mut wire = wire_frame(0, b"complete");
        let partial = wire_frame(0, b"only-part-of-this");
        wire.extend_from_slice(&partial[..10]);

        let mut conn = conn_over(wire, 4096);
        let data = conn.read_response().unwrap();
        assert_eq!(&data[4..], b"complete");

        let err = conn.read_response().unwrap_err();
        assert!(matches!(
            err,
            TransportError::ConnectionClosed { buffered: 10, .. }
        ));
        assert_eq!(conn.buffered(), 10);

        let err = conn.read_response().unwrap_err();
        assert!(matches!(err, TransportError::Closed));
        assert!(matches!(conn.send(b"NOP\n"), Err(TransportError::Closed)));
    }

    #[test]
    fn frames_buffered_before_close_are_delivered() {
        let mut wire = wire_frame(0, b"a");
        wire.extend(wire_frame(0, b"b"));
        let mut conn = conn_over(wire, 4096);

        assert_eq!(&conn.read_response().unwrap()[4..], b"a");
        assert_eq!(&conn.read_response().unwrap()[4..], b"b");
        assert!(matches!(
            conn.read_response(),
            Err(TransportError::ConnectionClosed { .. })
        ));
    }

    #[test]
    fn negative_size_is_rejected() {
        let mut conn = conn_over(vec![0xFF, 0xFF, 0xFF, 0xFE, 0, 0], 4096);
        let err = conn.read_response().unwrap_err();
        assert!(matches!(err, TransportError::InvalidFrameSize(-2)));
        assert_eq!(conn.state(), ConnState::Closed);
    }

    #[test]
    fn oversized_frame_is_rejected_before_payload() {
        let mut wire = BytesMut::new();
        wire.put_i32(1024);
        let config = ConnConfig {
            max_frame_size: 16,
            ..ConnConfig::default()
        };
        let mut conn =
            Connection::handshake(ChunkedStream::new(wire.to_vec(), 4096), config).unwrap();

        let err = conn.read_response().unwrap_err();
        assert!(matches!(
            err,
            TransportError::FrameTooLarge { size: 1024, max: 16 }
        ));
        assert_eq!(conn.buffered(), SIZE_PREFIX_LEN);
    }

    #[test]
    fn send_writes_exact_bytes() {
        let mut conn = conn_over(Vec::new(), 4096);
        conn.send_command(&publish("t", b"hello").unwrap()).unwrap();
        conn.send_command(&nop()).unwrap();

        let mut expected = MAGIC_V2.to_vec();
        expected.extend_from_slice(b"PUB t\n\x00\x00\x00\x05hello");
        expected.extend_from_slice(b"NOP\n");
        assert_eq!(conn.into_inner().written, expected);
    }

    #[test]
    fn close_consumes_connection() {
        let conn = conn_over(Vec::new(), 4096);
        conn.close().unwrap();
    }

    #[test]
    fn interrupted_read_retries() {
        let mut conn = Connection::handshake(
            FlakyStream::new(wire_frame(0, b"OK"), ErrorKind::Interrupted),
            ConnConfig::default(),
        )
        .unwrap();
        assert!(conn.read_frame().unwrap().is_ok());
    }

    #[test]
    fn timeout_keeps_partial_frame() {
        let mut conn = Connection::handshake(
            FlakyStream::new(wire_frame(0, b"patience"), ErrorKind::WouldBlock),
            ConnConfig::default(),
        )
        .unwrap();

        let err = conn.read_response().unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(conn.state(), ConnState::Connected);
        assert_eq!(conn.buffered(), 3);

        let data = conn.read_response().unwrap();
        assert_eq!(&data[4..], b"patience");
    }

    #[test]
    fn interrupted_write_retries() {
        let stream = InterruptedWriter {
            interrupted: false,
            written: Vec::new(),
        };
        let conn = Connection::handshake(stream, ConnConfig::default()).unwrap();
        assert_eq!(conn.into_inner().written, MAGIC_V2);
    }

    #[test]
    fn zero_write_is_an_error() {
        let err = Connection::handshake(ZeroWriter, ConnConfig::default()).unwrap_err();
        assert!(matches!(err, TransportError::Io(e) if e.kind() == ErrorKind::WriteZero));
    }

    /// Returns three bytes, then one `kind` error, then the rest.
    struct FlakyStream {
        input: Vec<u8>,
        pos: usize,
        kind: ErrorKind,
        failed: bool,
    }

    impl FlakyStream {
        fn new(input: Vec<u8>, kind: ErrorKind) -> Self {
            Self {
                input,
                pos: 0,
                kind,
                failed: false,
            }
        }
    }

    impl Read for FlakyStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos == 3 && !self.failed {
                self.failed = true;
                return Err(std::io::Error::from(self.kind));
            }
            let limit = if self.pos < 3 { 3 } else { self.input.len() };
            let n = (limit - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.input[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    impl Write for FlakyStream {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct InterruptedWriter {
        interrupted: bool,
        written: Vec<u8>,
    }

    impl Read for InterruptedWriter {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Ok(0)
        }
    }

    impl Write for InterruptedWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Read for ZeroWriter {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Ok(0)
        }
    }

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn read_all(conn: &mut Connection<ChunkedStream>, count: usize) -> Vec<Bytes> {
        (0..count).map(|_| conn.read_response().unwrap()).collect()
    }

    proptest! {
        #[test]
        fn prop_chunk_boundaries_do_not_matter(
            payloads in proptest::collection::vec(
                proptest::collection::vec(any::<u8>(), 0..64),
                1..8,
            ),
            chunk in 1usize..17,
        ) {
            let wire: Vec<u8> = payloads.iter().flat_map(|p| wire_frame(2, p)).collect();

            let mut whole = conn_over(wire.clone(), wire.len());
            let mut chunked = conn_over(wire, chunk);

            let expected = read_all(&mut whole, payloads.len());
            let actual = read_all(&mut chunked, payloads.len());
            prop_assert_eq!(&expected, &actual);
            for (frame, payload) in actual.iter().zip(&payloads) {
                prop_assert_eq!(&frame[4..], payload.as_slice());
            }
        }
    }

    #[test]
    fn tcp_publish_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut magic = [0u8; 4];
            socket.read_exact(&mut magic).unwrap();
            assert_eq!(&magic, MAGIC_V2);

            let mut command = [0u8; 15];
            socket.read_exact(&mut command).unwrap();
            assert_eq!(&command, b"PUB t\n\x00\x00\x00\x05hello");

            socket.write_all(&wire_frame(0, b"OK")).unwrap();
        });

        let mut conn = Connection::connect("127.0.0.1", port).unwrap();
        assert!(conn.peer_addr().unwrap().ip().is_loopback());
        conn.send_command(&publish("t", b"hello").unwrap()).unwrap();
        assert!(conn.read_frame().unwrap().is_ok());

        server.join().unwrap();
        conn.close().unwrap();
    }

    #[test]
    fn tcp_read_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (done_tx, done_rx) = std::sync::mpsc::channel::<()>();

        let server = thread::spawn(move || {
            let (_socket, _) = listener.accept().unwrap();
            let _ = done_rx.recv_timeout(Duration::from_secs(5));
        });

        let config = ConnConfig {
            timeout: Some(Duration::from_millis(50)),
            ..ConnConfig::default()
        };
        let mut conn = Connection::connect_with_config("127.0.0.1", port, config).unwrap();
        let err = conn.read_response().unwrap_err();
        assert!(err.is_timeout(), "unexpected error: {err}");
        assert_eq!(conn.state(), ConnState::Connected);

        done_tx.send(()).unwrap();
        server.join().unwrap();
    }

    #[test]
    fn tcp_connect_refused() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let err = Connection::connect("127.0.0.1", port).unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
    }
}
