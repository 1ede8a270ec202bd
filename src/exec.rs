//! Launching compiled words.
//!
//! On the ARM target a compiled body is entered by a plain branch with the
//! Thumb bit set; that transmute is the one place control crosses from
//! Rust into emitted code. Everywhere else the emitted Thumb-2 cannot
//! execute natively, so a small interpreter walks the half-words the
//! compiler lays down (prologue, call blocks with PC-relative literal
//! loads, epilogue) and performs each `blx` against the same absolute
//! addresses the silicon would use. It exercises the real encodings,
//! including the literal-pool offset arithmetic, which keeps the encoder
//! honest on a development host.

#[cfg(not(target_arch = "arm"))]
use crate::core::{push_cell, push_cell_handle};
use crate::core::VM;
#[cfg(not(target_arch = "arm"))]
use crate::exception::{Error, Exception};
use crate::exception::Result;
use crate::Cell;

/// Branch to a compiled body. `addr` may carry the Thumb bit.
#[cfg(target_arch = "arm")]
pub fn invoke(_vm: &mut VM, addr: Cell) -> Result<()> {
    let f: extern "C" fn() = unsafe { std::mem::transmute((addr as usize) | 1) };
    f();
    Ok(())
}

/// Branch to a compiled body. `addr` may carry the Thumb bit.
#[cfg(not(target_arch = "arm"))]
pub fn invoke(vm: &mut VM, addr: Cell) -> Result<()> {
    interpret(vm, (addr as usize) & !1)
}

// Bound on call blocks per body, a backstop against walking a corrupted
// buffer forever.
#[cfg(not(target_arch = "arm"))]
const MAX_STEPS: usize = 1_000_000;

#[cfg(not(target_arch = "arm"))]
fn interpret(vm: &mut VM, entry: usize) -> Result<()> {
    let mut pc = entry;
    for _ in 0..MAX_STEPS {
        match read_u16(vm, pc)? {
            0xB508 | 0xBF00 => pc += 2, // push {r3, lr} / nop
            0xBD08 => return Ok(()),    // pop {r3, pc}
            0x4802 => {
                // ldr r0, [pc, #8]; ldr r3, [pc, #8]; blx r3
                expect(vm, pc + 2, 0x4B02)?;
                expect(vm, pc + 4, 0x4798)?;
                let imm = read_u32(vm, ldr_literal(pc, 0x4802))?;
                let target = read_u32(vm, ldr_literal(pc + 2, 0x4B02))?;
                call(vm, target, imm)?;
                pc += 20;
            }
            0x4B01 => {
                // ldr r3, [pc, #4]; blx r3
                expect(vm, pc + 2, 0x4798)?;
                let target = read_u32(vm, ldr_literal(pc, 0x4B01))?;
                call(vm, target, 0)?;
                pc += 12;
            }
            _ => {
                return Err(Error::new(
                    Exception::InternalError,
                    "undecodable instruction in compiled word",
                ));
            }
        }
    }
    Err(Error::new(Exception::InternalError, "runaway compiled word"))
}

/// Where a Thumb `ldr rX, [pc, #imm8]` reads from: the word-aligned PC
/// plus four times the encoded offset.
#[cfg(not(target_arch = "arm"))]
fn ldr_literal(pc: usize, instr: u16) -> usize {
    ((pc + 4) & !3) + ((instr & 0xFF) as usize) * 4
}

#[cfg(not(target_arch = "arm"))]
fn call(vm: &mut VM, target: Cell, r0: Cell) -> Result<()> {
    if target == push_cell_handle() {
        push_cell(r0);
        return Ok(());
    }
    if let Some(action) = vm.find_primitive_by_handle(target) {
        action();
        return Ok(());
    }
    let body = (target as usize) & !1;
    if vm.code_space().contains(body) {
        return interpret(vm, body);
    }
    Err(Error::new(
        Exception::InternalError,
        "call target is not a known word",
    ))
}

#[cfg(not(target_arch = "arm"))]
fn read_u16(vm: &VM, addr: usize) -> Result<u16> {
    if vm.code_space().contains(addr) && vm.code_space().contains(addr + 1) {
        Ok(unsafe { *(addr as *const u16) })
    } else {
        Err(Error::new(
            Exception::InternalError,
            "branch out of compiled code",
        ))
    }
}

#[cfg(not(target_arch = "arm"))]
fn read_u32(vm: &VM, addr: usize) -> Result<Cell> {
    if vm.code_space().contains(addr) && vm.code_space().contains(addr + 3) {
        Ok(unsafe { *(addr as *const Cell) })
    } else {
        Err(Error::new(
            Exception::InternalError,
            "literal out of compiled code",
        ))
    }
}

#[cfg(not(target_arch = "arm"))]
fn expect(vm: &VM, addr: usize, want: u16) -> Result<()> {
    if read_u16(vm, addr)? == want {
        Ok(())
    } else {
        Err(Error::new(
            Exception::InternalError,
            "undecodable instruction in compiled word",
        ))
    }
}
