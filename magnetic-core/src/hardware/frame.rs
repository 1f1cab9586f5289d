use crate::{
    constants::{FRAME_SIZE, MAX_PAYLOAD, REPORT_ID, REPORT_SIZE, SYNC_1, SYNC_2, SYNC_3},
    hardware::Reading,
};
use heapless::Vec;
use log::trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    SeekSync1,
    SeekSync2,
    SeekSync3,
    ReadId,
    ReadSize,
    ReadPayload,
}

/// Byte-at-a-time decoder for `0d 0a 7e <id> <size> <payload>` frames.
///
/// Noise is never an error: any unexpected byte while searching for the sync
/// sequence starts the search over, and frames with an unknown id or an
/// unexpected payload size are dropped.
#[derive(Clone, Debug)]
pub struct FrameDecoder {
    state: State,
    id: u8,
    size: usize,
    payload: Vec<u8, MAX_PAYLOAD>,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            state: State::SeekSync1,
            id: 0,
            size: 0,
            payload: Vec::new(),
        }
    }

    pub fn decode(&mut self, byte: u8) -> Option<Reading> {
        match self.state {
            State::SeekSync1 | State::SeekSync2 | State::SeekSync3 => {
                self.state = self.seek(byte);
                None
            }
            State::ReadId => {
                self.id = byte;
                self.state = State::ReadSize;
                None
            }
            State::ReadSize => {
                self.size = byte as usize;
                self.payload.clear();
                if self.size == 0 {
                    return self.finish();
                }
                self.state = State::ReadPayload;
                None
            }
            State::ReadPayload => {
                // size is a single byte so the buffer never fills up
                let _ = self.payload.push(byte);
                if self.payload.len() < self.size {
                    return None;
                }
                self.finish()
            }
        }
    }

    pub fn decode_slice(&mut self, bytes: &[u8]) -> std::vec::Vec<Reading> {
        bytes.iter().filter_map(|&byte| self.decode(byte)).collect()
    }

    fn seek(&self, byte: u8) -> State {
        match (self.state, byte) {
            (State::SeekSync1, SYNC_1) => State::SeekSync2,
            (State::SeekSync2, SYNC_2) => State::SeekSync3,
            (State::SeekSync3, SYNC_3) => State::ReadId,
            // a mismatch may itself start the next sync sequence
            (_, SYNC_1) => State::SeekSync2,
            _ => State::SeekSync1,
        }
    }

    fn finish(&mut self) -> Option<Reading> {
        self.state = State::SeekSync1;

        if self.id != REPORT_ID {
            trace!("Dropping frame with id {:#x} ({} bytes)", self.id, self.size);
            return None;
        }

        match <&[u8; REPORT_SIZE]>::try_from(self.payload.as_slice()) {
            Ok(payload) => Some(Reading::from_payload(payload)),
            Err(_) => {
                trace!("Dropping report with {} byte payload", self.size);
                None
            }
        }
    }
}

pub fn encode_frame(reading: &Reading) -> [u8; FRAME_SIZE] {
    let mut frame = [0; FRAME_SIZE];

    frame[..5].copy_from_slice(&[SYNC_1, SYNC_2, SYNC_3, REPORT_ID, REPORT_SIZE as u8]);
    frame[5..].copy_from_slice(&reading.to_payload());
    frame
}
