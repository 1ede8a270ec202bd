//! Host console contract.
//!
//! The shell drains one byte per hook call from a non-blocking input source
//! and writes prompts, echoes and program output through a blocking string
//! sink. On a microcontroller this is the serial port; tests use an
//! in-memory double.

pub trait Console {
    /// Is a byte waiting?
    fn available(&self) -> bool;

    /// Take the next byte. Only called after `available` returned true.
    fn read_byte(&mut self) -> u8;

    fn write_str(&mut self, s: &str);
}
