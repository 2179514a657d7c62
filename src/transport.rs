//! Transport resources.
//!
//! A [`TransportFactory`] turns validated [`ConnectionParameters`] into a connected
//! byte stream. The link wraps that stream in a [`Transport`], the handle it holds
//! while connected, and replays its init commands on it before handing it out.
//!
//! # Key Components
//!
//! - [`TcpFactory`]: TCP streams, with connect timeout, read/write timeout and `TCP_NODELAY`.
//! - [`UnixFactory`]: Unix-domain streams (unix targets only).
//! - [`SchemeFactory`]: picks one of the above from the parameters' scheme.
//! - [`Transport`]: buffered reads, direct writes.
use std::{
    io::{self, BufReader, Read, Write},
    net::{TcpStream, ToSocketAddrs},
};

#[cfg(unix)]
use std::os::unix::net::UnixStream;

use log::trace;

use crate::parameters::{ConnectionParameters, Scheme};

/// Creates connected streams for a link.
pub trait TransportFactory {
    type Stream: Read + Write;

    fn open(&self, parameters: &ConnectionParameters) -> io::Result<Self::Stream>;
}

/// Handle held by a connected link.
///
/// Reads go through a buffer that survives between replies; writes go straight
/// to the stream.
pub struct Transport<S: Read + Write> {
    reader: BufReader<S>,
}

impl<S: Read + Write> Transport<S> {
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::new(stream),
        }
    }

    pub fn reader(&mut self) -> &mut BufReader<S> {
        &mut self.reader
    }

    pub fn writer(&mut self) -> &mut S {
        self.reader.get_mut()
    }

    pub fn stream(&self) -> &S {
        self.reader.get_ref()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TcpFactory;

impl TransportFactory for TcpFactory {
    type Stream = TcpStream;

    fn open(&self, parameters: &ConnectionParameters) -> io::Result<TcpStream> {
        let host = parameters.host().trim_start_matches('[').trim_end_matches(']');
        let timeout = parameters.timeout();

        let mut last_err = None;
        for addr in (host, parameters.port()).to_socket_addrs()? {
            trace!("connecting to {addr}");
            let attempt = if timeout.is_zero() {
                TcpStream::connect(addr)
            } else {
                TcpStream::connect_timeout(&addr, timeout)
            };

            match attempt {
                Ok(stream) => {
                    stream.set_read_timeout(parameters.read_write_timeout())?;
                    stream.set_write_timeout(parameters.read_write_timeout())?;
                    stream.set_nodelay(parameters.tcp_nodelay())?;
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no address found for '{}'", parameters.host()),
            )
        }))
    }
}

#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct UnixFactory;

#[cfg(unix)]
impl TransportFactory for UnixFactory {
    type Stream = UnixStream;

    fn open(&self, parameters: &ConnectionParameters) -> io::Result<UnixStream> {
        let path = parameters
            .path()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "missing socket path"))?;

        trace!("connecting to {path}");
        let stream = UnixStream::connect(path)?;
        stream.set_read_timeout(parameters.read_write_timeout())?;
        stream.set_write_timeout(parameters.read_write_timeout())?;
        Ok(stream)
    }
}

/// Stream produced by [`SchemeFactory`].
#[derive(Debug)]
pub enum SchemeStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Read for SchemeStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            SchemeStream::Tcp(s) => s.read(buf),
            #[cfg(unix)]
            SchemeStream::Unix(s) => s.read(buf),
        }
    }
}

impl Write for SchemeStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            SchemeStream::Tcp(s) => s.write(buf),
            #[cfg(unix)]
            SchemeStream::Unix(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            SchemeStream::Tcp(s) => s.flush(),
            #[cfg(unix)]
            SchemeStream::Unix(s) => s.flush(),
        }
    }
}

/// Chooses the transport from the parameters' scheme.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemeFactory;

impl TransportFactory for SchemeFactory {
    type Stream = SchemeStream;

    fn open(&self, parameters: &ConnectionParameters) -> io::Result<SchemeStream> {
        match parameters.scheme() {
            Scheme::Tcp => TcpFactory.open(parameters).map(SchemeStream::Tcp),
            #[cfg(unix)]
            Scheme::Unix => UnixFactory.open(parameters).map(SchemeStream::Unix),
            #[cfg(not(unix))]
            Scheme::Unix => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "unix sockets are not supported on this platform",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{io::BufRead, net::TcpListener, time::Duration};

    use crate::parameters::RawParameters;

    use super::*;

    fn tcp_params(port: u16) -> ConnectionParameters {
        ConnectionParameters::validate(RawParameters {
            port: Some(port),
            read_write_timeout: Some(Duration::from_secs(1)),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn tcp_factory_applies_socket_options() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let stream = TcpFactory.open(&tcp_params(port)).unwrap();
        assert!(stream.nodelay().unwrap());
        assert_eq!(stream.read_timeout().unwrap(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn tcp_factory_reports_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        assert!(TcpFactory.open(&tcp_params(port)).is_err());
    }

    #[test]
    fn transport_buffers_reads_and_writes_directly() {
        let mut transport = Transport::new(io::Cursor::new(b"line one\nline two\n".to_vec()));

        let mut line = String::new();
        transport.reader().read_line(&mut line).unwrap();
        assert_eq!(line, "line one\n");
        // The reader pulled the whole input into its buffer.
        assert_eq!(transport.stream().position(), 18);

        transport.writer().write_all(b"PING\n").unwrap();
        assert_eq!(transport.stream().get_ref(), b"line one\nline two\nPING\n");

        line.clear();
        transport.reader().read_line(&mut line).unwrap();
        assert_eq!(line, "line two\n");
    }
}
