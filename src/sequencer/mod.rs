// Sequencer module
// Playback clock and transport

pub mod clock;
pub mod transport;

pub use clock::{CancelToken, IntervalClock};
pub use transport::{Transport, TransportState};
