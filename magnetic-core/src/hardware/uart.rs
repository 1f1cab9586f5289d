use crate::{
    hardware::{frame::FrameDecoder, Message, Reading},
    utils::block_on,
};
use core::{fmt, sync::atomic::Ordering};
use embassy_futures::select::{select, Either};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel, signal::Signal};
use embassy_time::{with_timeout, Duration};
use log::{debug, info, warn};
use portable_atomic::AtomicBool;
use std::{
    io::{self, ErrorKind, Read},
    sync::Arc,
    thread::{self, JoinHandle},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("byte source closed")]
    Closed,
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ReceiveError {
    /// Nothing arrived in time. Try again on the next tick.
    #[error("no reading available")]
    NoData,
    /// The byte source failed and the acquisition thread has exited.
    #[error("acquisition transport failed")]
    Transport,
}

#[derive(Error)]
pub enum StopError<S> {
    /// The thread did not finish in time. The handle is handed back for another attempt.
    #[error("acquisition thread did not stop in time")]
    Timeout(Acquisition<S>),
    #[error("acquisition thread panicked")]
    Panicked,
}

impl<S> fmt::Debug for StopError<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Timeout(_) => f.write_str("Timeout(..)"),
            Self::Panicked => f.write_str("Panicked"),
        }
    }
}

/// Blocking byte stream with a read timeout.
pub trait ByteSource: Send {
    /// Next byte, or `None` when the read timed out without data.
    fn read_byte(&mut self) -> Result<Option<u8>, TransportError>;
}

/// Adapts any [`Read`] into a [`ByteSource`]. End of stream counts as a failure.
///
/// The stop flag is only checked between reads, so a reader that can block
/// indefinitely (an idle serial device opened without a read timeout) makes
/// [`Acquisition::stop`] run into its timeout. Give such readers a timeout
/// that surfaces as [`ErrorKind::TimedOut`] or [`ErrorKind::WouldBlock`].
#[derive(Debug)]
pub struct ReadSource<R> {
    reader: R,
}

impl<R> ReadSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read + Send> ByteSource for ReadSource<R> {
    fn read_byte(&mut self) -> Result<Option<u8>, TransportError> {
        let mut byte = [0];

        match self.reader.read(&mut byte) {
            Ok(0) => Err(TransportError::Closed),
            Ok(_) => Ok(Some(byte[0])),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}

struct Shared {
    channel: Channel<CriticalSectionRawMutex, Message, 1>,
    running: AtomicBool,
    failed: AtomicBool,
    stop: Signal<CriticalSectionRawMutex, ()>,
    finished: Signal<CriticalSectionRawMutex, ()>,
}

impl Shared {
    fn new() -> Self {
        Self {
            channel: Channel::new(),
            running: AtomicBool::new(true),
            failed: AtomicBool::new(false),
            stop: Signal::new(),
            finished: Signal::new(),
        }
    }

    fn halt(&self) {
        self.running.store(false, Ordering::Release);
        self.stop.signal(());
    }

    /// Waits for a free slot. Returns false if stopped first.
    fn publish(&self, message: Message) -> bool {
        match block_on(select(self.channel.send(message), self.stop.wait())) {
            Either::First(()) => true,
            Either::Second(()) => false,
        }
    }
}

struct Halt(Arc<Shared>);

impl Drop for Halt {
    fn drop(&mut self) {
        self.0.halt();
    }
}

struct Finished<'a>(&'a Shared);

impl Drop for Finished<'_> {
    fn drop(&mut self) {
        self.0.finished.signal(());
    }
}

fn acquisition_task<S: ByteSource>(mut source: S, shared: &Shared) -> S {
    let _finished = Finished(shared);
    let mut decoder = FrameDecoder::new();

    while shared.running.load(Ordering::Acquire) {
        match source.read_byte() {
            Ok(Some(byte)) => {
                if let Some(reading) = decoder.decode(byte) {
                    if !shared.publish(Message::Reading(reading)) {
                        break;
                    }
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!("Acquisition transport failed: {}", err);
                shared.failed.store(true, Ordering::Release);
                shared.publish(Message::TransportFailed);
                break;
            }
        }
    }

    debug!("Acquisition thread exiting");
    source
}

/// Owns the reader thread and the capacity-1 channel it fills.
///
/// Dropping the handle without [`stop`](Self::stop) asks the thread to exit but
/// does not wait for it.
pub struct Acquisition<S> {
    handle: JoinHandle<S>,
    halt: Halt,
}

impl<S: ByteSource + 'static> Acquisition<S> {
    pub fn start(source: S) -> io::Result<Self> {
        let shared = Arc::new(Shared::new());
        let handle = thread::Builder::new().name("acquisition".into()).spawn({
            let shared = shared.clone();
            move || acquisition_task(source, &shared)
        })?;

        info!("Acquisition started");

        Ok(Self {
            handle,
            halt: Halt(shared),
        })
    }
}

impl<S> Acquisition<S> {
    pub fn receiver(&self) -> Receiver {
        Receiver {
            shared: self.halt.0.clone(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stops the thread and hands the byte source back once it has exited.
    pub fn stop(self, timeout: Duration) -> Result<S, StopError<S>> {
        let shared = &self.halt.0;
        shared.halt();

        if block_on(with_timeout(timeout, shared.finished.wait())).is_err() {
            warn!("Acquisition did not stop within {}ms", timeout.as_millis());
            return Err(StopError::Timeout(self));
        }

        let source = self.handle.join().map_err(|_| StopError::Panicked)?;
        info!("Acquisition stopped");
        Ok(source)
    }
}

/// Consumer end of the acquisition channel.
#[derive(Clone)]
pub struct Receiver {
    shared: Arc<Shared>,
}

impl Receiver {
    /// Waits up to `timeout` for the next reading.
    pub fn receive(&self, timeout: Duration) -> Result<Reading, ReceiveError> {
        if self.shared.failed.load(Ordering::Acquire) {
            return self.try_receive();
        }

        match block_on(with_timeout(timeout, self.shared.channel.receive())) {
            Ok(message) => unpack(message),
            Err(_) => Err(ReceiveError::NoData),
        }
    }

    pub fn try_receive(&self) -> Result<Reading, ReceiveError> {
        match self.shared.channel.try_receive() {
            Ok(message) => unpack(message),
            Err(_) if self.shared.failed.load(Ordering::Acquire) => Err(ReceiveError::Transport),
            Err(_) => Err(ReceiveError::NoData),
        }
    }
}

fn unpack(message: Message) -> Result<Reading, ReceiveError> {
    match message {
        Message::Reading(reading) => Ok(reading),
        Message::TransportFailed => Err(ReceiveError::Transport),
    }
}
