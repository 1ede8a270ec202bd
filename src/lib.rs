//! SForth is an interactive Forth-like language for ARM Cortex-M targets.
//!
//! Lines of source text are split into whitespace-delimited tokens. Numbers
//! push cells onto the data stack and known words execute at once. A colon
//! definition (`: name ... ;`) instead compiles its body to native Thumb-2
//! machine code: each token becomes a call into the run-time support or into
//! an earlier word, with 32-bit immediates and call targets embedded in
//! literal pools. The finished body is copied into executable memory,
//! installed in the dictionary, and from then on invoked by direct branch.
//!
//! On architectures other than ARM the emitted code cannot be branched to,
//! so compiled words run on a small Thumb-2 subset interpreter instead (see
//! [`exec`]). Everything else behaves identically, which is what makes the
//! crate testable on a development host.

/// The machine word of the language: every stack slot, variable slot,
/// embedded immediate and exposed address is one of these.
pub type Cell = u32;

/// Defines a primitive word with the C calling convention expected by
/// compiled code. The body runs against the engine currently evaluating
/// (see [`core::current_vm`]) and is skipped entirely once an error is
/// pending, so a failing word poisons the rest of its call chain instead
/// of cascading.
#[macro_export]
macro_rules! primitive {
    ($(#[$attr:meta])* fn $name:ident($vm:ident: &mut VM) $body:block) => {
        $(#[$attr])*
        pub extern "C" fn $name() {
            let $vm: &mut $crate::core::VM = match unsafe { $crate::core::current_vm() } {
                Some(vm) => vm,
                None => return,
            };
            if $vm.failed() {
                return;
            }
            let result: $crate::exception::Result<()> = (|| $body)();
            if let Err(e) = result {
                $vm.set_error(e);
            }
        }
    };
}

pub mod codebuf;
pub mod core;
pub mod exception;
pub mod exec;
pub mod gpio;
pub mod io;
pub mod memory;
pub mod output;
pub mod parser;
pub mod shell;
pub mod stack;

pub use crate::core::VM;
