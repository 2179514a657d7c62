//! In-memory transport and codec doubles for unit tests.
use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    io::{self, BufRead, Cursor, Read, Write},
    rc::Rc,
};

use crate::{
    codec::{Codec, CodecError},
    parameters::ConnectionParameters,
    transport::TransportFactory,
};

/// Hands out one scripted stream per `open`; refuses once the scripts run out.
#[derive(Clone, Default)]
pub(crate) struct ScriptedFactory {
    scripts: Rc<RefCell<VecDeque<Vec<u8>>>>,
    written: Rc<RefCell<Vec<u8>>>,
    opened: Rc<Cell<usize>>,
    alive: Rc<Cell<usize>>,
}

impl ScriptedFactory {
    /// Queues the bytes the next opened stream will read.
    pub(crate) fn push_reply(&self, bytes: &[u8]) {
        self.scripts.borrow_mut().push_back(bytes.to_vec());
    }

    /// Everything written on any stream so far.
    pub(crate) fn written(&self) -> Vec<u8> {
        self.written.borrow().clone()
    }

    pub(crate) fn opened(&self) -> usize {
        self.opened.get()
    }

    /// Streams not yet dropped.
    pub(crate) fn alive(&self) -> usize {
        self.alive.get()
    }
}

impl TransportFactory for ScriptedFactory {
    type Stream = ScriptedStream;

    fn open(&self, _parameters: &ConnectionParameters) -> io::Result<ScriptedStream> {
        self.opened.set(self.opened.get() + 1);
        let input = self.scripts.borrow_mut().pop_front().ok_or_else(|| {
            io::Error::new(io::ErrorKind::ConnectionRefused, "Connection refused")
        })?;

        self.alive.set(self.alive.get() + 1);
        Ok(ScriptedStream {
            input: Cursor::new(input),
            written: Rc::clone(&self.written),
            alive: Rc::clone(&self.alive),
        })
    }
}

pub(crate) struct ScriptedStream {
    input: Cursor<Vec<u8>>,
    written: Rc<RefCell<Vec<u8>>>,
    alive: Rc<Cell<usize>>,
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ScriptedStream {
    fn drop(&mut self) {
        self.alive.set(self.alive.get() - 1);
    }
}

/// Codec that logs `<cmd>-write` / `<cmd>-read` and exchanges one byte per reply.
///
/// A reply byte of `!` counts as a rejection.
#[derive(Clone, Default)]
pub(crate) struct RecordingCodec {
    log: Rc<RefCell<Vec<String>>>,
}

impl RecordingCodec {
    pub(crate) fn log(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

impl Codec for RecordingCodec {
    type Command = &'static str;
    type Response = u8;

    fn encode<W: Write>(&mut self, command: &&'static str, out: &mut W) -> Result<(), CodecError> {
        out.write_all(command.as_bytes())?;
        self.log.borrow_mut().push(format!("{command}-write"));
        Ok(())
    }

    fn decode<R: BufRead>(
        &mut self,
        command: &&'static str,
        input: &mut R,
    ) -> Result<u8, CodecError> {
        let mut byte = [0u8; 1];
        input.read_exact(&mut byte)?;
        self.log.borrow_mut().push(format!("{command}-read"));
        Ok(byte[0])
    }

    fn command_name(&self, command: &&'static str) -> String {
        command.to_uppercase()
    }

    fn rejection(&self, response: &u8) -> Option<String> {
        (*response == b'!').then(|| "rejected".to_string())
    }
}
