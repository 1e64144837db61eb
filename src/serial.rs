//! Byte source adapter (SPEC_FULL.md section 4.A).
//!
//! This is the seam between the driver and whatever actually owns the UART: a real
//! serial port, a mock for tests, or an MSP/virtual transport. The driver never
//! blocks on it.

/// Non-blocking byte transport the driver reads from and writes to.
///
/// A failed `set_baud` or a port that never becomes ready is not this trait's
/// problem to report loudly: the task driver's contract is that an unusable port
/// just yields no bytes and an unsatisfied `tx_buffer_empty`, which leaves the
/// configurator parked rather than panicking.
pub trait GpsPort {
    /// Returns the next buffered byte, if any. Never blocks.
    fn read_byte(&mut self) -> Option<u8>;

    /// Number of bytes currently buffered and ready to read.
    fn bytes_waiting(&self) -> usize;

    /// Enqueues bytes for transmission. May be called while the port is mid baud
    /// change; the bytes are expected to be flushed before the change completes.
    fn write_all(&mut self, bytes: &[u8]);

    /// Synchronously reconfigures the baud rate. Callers must first confirm
    /// `tx_buffer_empty()`.
    fn set_baud(&mut self, baud: u32);

    /// True once every previously-written byte has left the transmit buffer.
    fn tx_buffer_empty(&self) -> bool;
}

/// In-memory [`GpsPort`] used by tests and by the configurator's own unit tests:
/// a FIFO of inbound bytes and a record of everything written out.
#[derive(Debug, Default)]
pub struct LoopbackPort {
    inbound: std::collections::VecDeque<u8>,
    pub outbound: Vec<u8>,
    pub current_baud: u32,
    tx_empty: bool,
}

impl LoopbackPort {
    pub fn new(baud: u32) -> Self {
        Self {
            inbound: std::collections::VecDeque::new(),
            outbound: Vec::new(),
            current_baud: baud,
            tx_empty: true,
        }
    }

    /// Queues bytes as if they had arrived from the GPS module.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes.iter().copied());
    }

    /// Drains and returns everything written since the last call.
    pub fn take_outbound(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outbound)
    }
}

impl GpsPort for LoopbackPort {
    fn read_byte(&mut self) -> Option<u8> {
        self.inbound.pop_front()
    }

    fn bytes_waiting(&self) -> usize {
        self.inbound.len()
    }

    fn write_all(&mut self, bytes: &[u8]) {
        self.outbound.extend_from_slice(bytes);
        self.tx_empty = true;
    }

    fn set_baud(&mut self, baud: u32) {
        self.current_baud = baud;
    }

    fn tx_buffer_empty(&self) -> bool {
        self.tx_empty
    }
}
