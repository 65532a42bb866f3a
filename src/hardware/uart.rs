//! Low-level driver routines for a 16550a UART.
//!
//! Output-only: this crate's console exists to carry the `print!`/
//! `println!` logging macros (SPEC_FULL.md §2), not to implement a
//! getty. Polls the line-status register rather than taking transmit
//! interrupts, the way a kernel's boot-time console usually starts out.
#![allow(non_upper_case_globals)]

use crate::trap::InterruptBlocker;

// The UART control registers.
// Some have different meanings for read vs write.
// See http://byterunner.com/16550.html

const FCR_FIFO_ENABLE: u8 = 1 << 0;
/// Clear the content of the two FIFOs.
const FCR_FIFO_CLEAR: u8 = 3 << 1;
const LCR_EIGHT_BITS: u8 = 3;
/// Special mode to set baud rate
const LCR_BAUD_LATCH: u8 = 1 << 7;
/// THR can accept another character to send
const LSR_TX_IDLE: u8 = 1 << 5;
const IER_TX_ENABLE: u8 = 1 << 1;

enum Register {
    TransmitHolding,
    InterruptEnable,
    FIFOControl,
    LineControl,
    LineStatus,
}
impl Register {
    pub fn as_offset(&self) -> usize {
        match self {
            Register::TransmitHolding => 0,
            Register::InterruptEnable => 1,
            Register::FIFOControl => 2,
            Register::LineControl => 2,
            Register::LineStatus => 5,
        }
    }
    pub fn as_ptr(&self, base_address: usize) -> *mut u8 {
        (base_address + self.as_offset()) as *mut u8
    }
    pub fn read(&self, base_address: usize) -> u8 {
        unsafe { self.as_ptr(base_address).read_volatile() }
    }
    pub fn write(&self, base_address: usize, value: u8) {
        unsafe { self.as_ptr(base_address).write_volatile(value) }
    }
}

pub struct Uart {
    pub base_address: usize,
}
impl Uart {
    pub const fn new(base_address: usize) -> Uart {
        Uart { base_address }
    }
    /// Initialize the UART for 8N1 at 38.4K baud.
    pub unsafe fn initialize(&self) {
        Register::InterruptEnable.write(self.base_address, 0x00);
        Register::LineControl.write(self.base_address, LCR_BAUD_LATCH);
        *(self.base_address as *mut u8) = 0x03;
        *((self.base_address + 1) as *mut u8) = 0x00;
        Register::LineControl.write(self.base_address, LCR_EIGHT_BITS);
        Register::FIFOControl.write(self.base_address, FCR_FIFO_ENABLE | FCR_FIFO_CLEAR);
        Register::InterruptEnable.write(self.base_address, IER_TX_ENABLE);
    }
    fn can_write_byte(&self) -> bool {
        Register::LineStatus.read(self.base_address) & LSR_TX_IDLE != 0
    }
    /// Write one byte, spinning until the transmit holding register has
    /// room. Masks interrupts for the duration to avoid a nested print
    /// from another context interleaving its bytes.
    pub fn write_byte(&self, byte: u8) {
        let _guard = InterruptBlocker::new();
        while !self.can_write_byte() {
            core::hint::spin_loop();
        }
        Register::TransmitHolding.write(self.base_address, byte);
    }
    pub fn write_slice(&self, bytes: &[u8]) {
        for b in bytes {
            self.write_byte(*b);
        }
    }
    pub fn writer(&self) -> UartWriter<'_> {
        UartWriter(self)
    }
}

#[derive(Copy, Clone)]
pub struct UartWriter<'u>(&'u Uart);
impl<'u> core::fmt::Write for UartWriter<'u> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.0.write_slice(s.as_bytes());
        core::fmt::Result::Ok(())
    }
}
