//! The line-oriented shell.
//!
//! The host calls [`Shell::hook`] from its idle loop. Each call prints the
//! prompt if none is outstanding, then drains at most one input byte:
//! printable characters are echoed and collected, delete rubs out the last
//! character, and carriage return hands the finished line to the engine and
//! flushes whatever it printed.

use crate::core::VM;
use crate::io::Console;

/// Longest accepted line, terminator included. Further printable input on
/// an overlong line is dropped.
pub const LINE_BUFFER_SIZE: usize = 1000;

const PROMPT: &str = "SForth> ";

pub struct Shell {
    line: String,
    prompted: bool,
}

impl Shell {
    pub fn new() -> Shell {
        Shell {
            line: String::with_capacity(LINE_BUFFER_SIZE),
            prompted: false,
        }
    }

    pub fn hook<C: Console>(&mut self, vm: &mut VM, con: &mut C) {
        if !self.prompted {
            con.write_str(PROMPT);
            self.prompted = true;
        }
        if !con.available() {
            return;
        }
        match con.read_byte() {
            0x7F => {
                // delete key: rub out the echoed character
                if !self.line.is_empty() {
                    con.write_str("\x08 \x08");
                    self.line.pop();
                }
            }
            0x0D => {
                con.write_str("\r\n");
                vm.evaluate(&self.line);
                con.write_str(&vm.take_output());
                self.line.clear();
                self.prompted = false;
            }
            c if (0x20..=0x7E).contains(&c) => {
                if self.line.len() < LINE_BUFFER_SIZE - 1 {
                    self.line.push(c as char);
                    con.write_str((c as char).encode_utf8(&mut [0; 4]));
                }
            }
            _ => {}
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new()
    }
}
