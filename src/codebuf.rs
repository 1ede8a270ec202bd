//! The transient compilation buffer.
//!
//! Owned by the compiler for the duration of one colon definition. Code is
//! laid down as Thumb-2 half-words; 32-bit immediates and call targets go
//! into literal pools reached PC-relative, because Thumb-2 has no single
//! instruction that loads an arbitrary 32-bit value into a register. Each
//! call block keeps the write position on the same 4-byte phase, so the
//! PC-relative offsets below hold for every block in a body.

use crate::exception::{Error, Exception, Result};
use crate::Cell;

/// Growth quantum, in half-words.
pub const BLOCK_FACTOR_HALF_WORDS: usize = 256;

pub struct CompileBuffer {
    code: Vec<u16>,
    cap: usize,
}

impl CompileBuffer {
    pub fn new() -> CompileBuffer {
        CompileBuffer {
            code: Vec::new(),
            cap: 0,
        }
    }

    /// Discard prior content and lay down the function prologue.
    pub fn begin(&mut self) -> Result<()> {
        self.free();
        self.code
            .try_reserve_exact(BLOCK_FACTOR_HALF_WORDS)
            .map_err(|_| {
                Error::new(
                    Exception::OutOfMemory,
                    "can't allocate temp space for compilation",
                )
            })?;
        self.cap = BLOCK_FACTOR_HALF_WORDS;
        self.code.push(0xB508); // push {r3, lr}
        Ok(())
    }

    /// Ensure room for `half_words` more, extending by whole quanta.
    /// Already written code is preserved.
    fn reserve(&mut self, half_words: usize) -> Result<()> {
        while self.code.len() + half_words > self.cap {
            self.code
                .try_reserve_exact(self.cap + BLOCK_FACTOR_HALF_WORDS - self.code.len())
                .map_err(|_| {
                    Error::new(Exception::OutOfMemory, "unable to extend compilation buffer")
                })?;
            self.cap += BLOCK_FACTOR_HALF_WORDS;
        }
        Ok(())
    }

    /// Call `target` with `imm` in r0: the run-time shape of a literal or a
    /// variable reference.
    pub fn emit_call_with_immediate(&mut self, target: Cell, imm: Cell) -> Result<()> {
        self.reserve(10)?;
        self.code.push(0x4802); // ldr r0, [pc, #8]
        self.code.push(0x4B02); // ldr r3, [pc, #8]
        self.code.push(0x4798); // blx r3
        self.code.push(0xBF00); // nop, literals must sit on a 4-byte boundary
        self.code.push(0xE002); // b over the literal pool
        self.code.push(imm as u16);
        self.code.push((imm >> 16) as u16);
        self.code.push(target as u16);
        self.code.push((target >> 16) as u16);
        self.code.push(0xBF00); // keep the next instruction 4-aligned
        Ok(())
    }

    /// Plain call to `target`: the run-time shape of a word reference.
    pub fn emit_call(&mut self, target: Cell) -> Result<()> {
        self.reserve(6)?;
        self.code.push(0x4B01); // ldr r3, [pc, #4]
        self.code.push(0x4798); // blx r3
        self.code.push(0xE001); // b over the literal
        self.code.push(target as u16);
        self.code.push((target >> 16) as u16);
        self.code.push(0xBF00); // alignment
        Ok(())
    }

    /// Lay down the epilogue; the buffer is then ready to install.
    pub fn end(&mut self) -> Result<()> {
        self.reserve(2)?;
        self.code.push(0xBD08); // pop {r3, pc}
        self.code.push(0xBF00);
        Ok(())
    }

    pub fn half_word_count(&self) -> usize {
        self.code.len()
    }

    pub fn as_half_words(&self) -> &[u16] {
        &self.code
    }

    /// The emitted code, little-endian on the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.code.len() * 2);
        for hw in &self.code {
            bytes.extend_from_slice(&hw.to_le_bytes());
        }
        bytes
    }

    pub fn free(&mut self) {
        self.code = Vec::new();
        self.cap = 0;
    }
}

impl Default for CompileBuffer {
    fn default() -> Self {
        CompileBuffer::new()
    }
}
