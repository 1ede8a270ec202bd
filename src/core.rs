//! The engine: dictionary, tokenizer, interpreter and the colon compiler.

use std::cell::Cell as StdCell;
use std::ptr;

use tracing::debug;

use crate::codebuf::CompileBuffer;
use crate::exception::{Error, Exception, Result};
use crate::exec;
use crate::gpio::{p_digital_write, p_pin_mode, Gpio, NullGpio};
use crate::memory::{CodeSpace, DataSpace};
use crate::output::{p_dot, p_dot_s, p_dot_x};
use crate::parser;
use crate::stack::DataStack;
use crate::Cell;

/// Tokens and names are cut off beyond this many characters.
pub const MAX_TOKEN_LEN: usize = 32;

/// A host function callable both from the interpreter and from compiled
/// code. Primitives take no context argument; they reach the engine through
/// [`current_vm`].
pub type Code = extern "C" fn();

/// What a dictionary entry stands for. The embedded address of a variable
/// cell or a compiled body never changes once defined; compiled code
/// depends on that.
#[derive(Clone, Copy)]
pub enum Payload {
    /// One cell in the data space; the address is the exposed handle.
    Variable { addr: Cell },
    /// A host function.
    Primitive { action: Code },
    /// An emitted Thumb-2 function body in the code space.
    Compiled { addr: Cell, len: Cell },
}

pub struct Entry {
    name: String,
    payload: Payload,
}

impl Entry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> Payload {
        self.payload
    }
}

thread_local! {
    static CURRENT_VM: StdCell<*mut VM> = StdCell::new(ptr::null_mut());
}

/// The engine the current line is executing on, installed for the duration
/// of every public entry point.
///
/// # Safety
///
/// The caller must be running under an entry point of the returned engine
/// (a primitive dispatched by the interpreter or called from a compiled
/// body) and must not keep the reference across a call back into the
/// engine.
pub unsafe fn current_vm<'a>() -> Option<&'a mut VM> {
    let p = CURRENT_VM.with(|c| c.get());
    if p.is_null() {
        None
    } else {
        Some(&mut *p)
    }
}

pub(crate) struct CurrentGuard {
    prev: *mut VM,
}

impl Drop for CurrentGuard {
    fn drop(&mut self) {
        let prev = self.prev;
        CURRENT_VM.with(|c| c.set(prev));
    }
}

/// Run-time support behind every compiled literal and variable reference:
/// pushes the embedded immediate onto the data stack.
pub extern "C" fn push_cell(v: Cell) {
    if let Some(vm) = unsafe { current_vm() } {
        if vm.failed() {
            return;
        }
        vm.push(v);
    }
}

/// A host function address as it is embedded in emitted code. On the ARM
/// target this is the exact (Thumb) address; elsewhere the low 32 bits
/// identify the function to the hosted executor.
pub(crate) fn code_handle(addr: usize) -> Cell {
    addr as Cell
}

pub(crate) fn push_cell_handle() -> Cell {
    code_handle(push_cell as extern "C" fn(Cell) as usize)
}

/// The engine object. One per console; single-threaded.
pub struct VM {
    dict: Vec<Entry>,
    d_stack: DataStack,
    data_space: DataSpace,
    code_space: CodeSpace,
    code_buf: CompileBuffer,
    inbuf: String,
    source_idx: usize,
    tkn: String,
    outbuf: String,
    last_error: Option<Error>,
    gpio: Box<dyn Gpio>,
}

impl VM {
    /// Create an engine with data and code space sized in pages.
    pub fn new(data_pages: usize, code_pages: usize) -> VM {
        VM {
            dict: vec![],
            d_stack: DataStack::new(),
            data_space: DataSpace::new(data_pages),
            code_space: CodeSpace::new(code_pages),
            code_buf: CompileBuffer::new(),
            inbuf: String::with_capacity(128),
            source_idx: 0,
            tkn: String::with_capacity(MAX_TOKEN_LEN + 1),
            outbuf: String::with_capacity(128),
            last_error: None,
            gpio: Box::new(NullGpio),
        }
    }

    /// One-time initialisation: reset the dictionary, install the built-in
    /// words and announce readiness on the output buffer.
    pub fn begin(&mut self) {
        self.dict.clear();
        self.data_space.reset();
        self.code_space.reset();
        self.add_core();
        debug!("dictionary initialised with {} words", self.dict.len());
        self.outbuf.push_str("SForth is up and running!\n");
    }

    fn add_core(&mut self) {
        self.define_primitive("+", p_add);
        self.define_primitive("-", p_sub);
        self.define_primitive("<<", p_lshift);
        self.define_primitive(">>", p_rshift);
        self.define_primitive("!", p_store);
        self.define_primitive("@", p_fetch);
        self.define_primitive("pinMode", p_pin_mode);
        self.define_primitive("digitalWrite", p_digital_write);
        self.define_primitive(".", p_dot);
        self.define_primitive(".s", p_dot_s);
        self.define_primitive(".x", p_dot_x);
        self.define_primitive("dup", p_dup);
        self.define_primitive("swap", p_swap);
        self.define_primitive("variable", p_variable);
        self.define_primitive(":", p_colon);
    }

    /// Run the interpreter over one NUL-free source line. A failure prints
    /// one `Error: <kind>, <message>` diagnostic on the output buffer and
    /// leaves the engine ready for the next line; only a stack underflow
    /// resets the stack.
    pub fn evaluate(&mut self, line: &str) {
        use std::fmt::Write;

        self.last_error = None;
        self.set_source(line);
        let _current = self.make_current();
        if let Err(e) = self.run_line() {
            self.code_buf.free();
            debug!("evaluation failed: {}", e);
            writeln!(self.outbuf, "Error: {}", e).unwrap();
            self.last_error = Some(e);
        }
    }

    fn run_line(&mut self) -> Result<()> {
        loop {
            self.next_token();
            if self.tkn.is_empty() {
                return Ok(());
            }
            if parser::is_number(&self.tkn) {
                let v = parser::parse_number(&self.tkn);
                self.d_stack.push(v);
            } else {
                match self.find(&self.tkn) {
                    Some(idx) => self.execute_entry(idx)?,
                    None => {
                        return Err(Error::new(Exception::UndefinedWord, self.tkn.clone()));
                    }
                }
            }
        }
    }

    fn execute_entry(&mut self, idx: usize) -> Result<()> {
        let payload = self.dict[idx].payload;
        match payload {
            Payload::Variable { addr } => {
                self.d_stack.push(addr);
                Ok(())
            }
            Payload::Primitive { action } => {
                action();
                self.take_pending()
            }
            Payload::Compiled { addr, .. } => {
                exec::invoke(self, addr | 1)?;
                self.take_pending()
            }
        }
    }

    /// An error a primitive recorded while control was on the far side of
    /// the C calling convention.
    fn take_pending(&mut self) -> Result<()> {
        match self.last_error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // Tokenizer

    pub fn set_source(&mut self, s: &str) {
        self.inbuf.clear();
        self.inbuf.push_str(s);
        self.source_idx = 0;
    }

    /// Advance past leading whitespace and copy the next token into the
    /// token buffer, keeping at most [`MAX_TOKEN_LEN`] characters; the
    /// excess is scanned but ignored. An empty token means end of input.
    pub fn next_token(&mut self) {
        self.tkn.clear();
        let bytes = self.inbuf.as_bytes();
        let mut i = self.source_idx;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let mut kept = 0;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
            if kept < MAX_TOKEN_LEN {
                self.tkn.push(bytes[i] as char);
                kept += 1;
            }
            i += 1;
        }
        self.source_idx = i;
    }

    pub fn last_token(&self) -> &str {
        &self.tkn
    }

    // Dictionary

    /// Newest-first search; a redefined name shadows the older entry.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.dict
            .iter()
            .enumerate()
            .rev()
            .find(|(_, e)| e.name == name)
            .map(|(i, _)| i)
    }

    pub fn entry(&self, idx: usize) -> &Entry {
        &self.dict[idx]
    }

    pub fn words(&self) -> usize {
        self.dict.len()
    }

    pub fn define_variable(&mut self, name: &str) -> Result<()> {
        let addr = self.data_space.compile_cell(0)?;
        debug!("defining a variable {} at {:#010x}", name, addr);
        self.dict.push(Entry {
            name: name.to_string(),
            payload: Payload::Variable { addr },
        });
        Ok(())
    }

    pub fn define_primitive(&mut self, name: &str, action: Code) {
        self.dict.push(Entry {
            name: name.to_string(),
            payload: Payload::Primitive { action },
        });
    }

    pub fn define_compiled(&mut self, name: &str, code: &[u8]) -> Result<()> {
        self.code_space.align();
        let addr = self.code_space.compile_bytes(code)?;
        self.code_space.flush_icache(addr as usize, code.len());
        debug!(
            "defining a function {}: {} bytes at {:#010x}",
            name,
            code.len(),
            addr
        );
        self.dict.push(Entry {
            name: name.to_string(),
            payload: Payload::Compiled {
                addr,
                len: code.len() as Cell,
            },
        });
        Ok(())
    }

    pub(crate) fn find_primitive_by_handle(&self, handle: Cell) -> Option<Code> {
        self.dict.iter().rev().find_map(|e| match e.payload {
            Payload::Primitive { action }
                if code_handle(action as usize) == handle =>
            {
                Some(action)
            }
            _ => None,
        })
    }

    // Compiler

    /// `: name body... ;` compiles a native function body reproducing the
    /// interpreter's effect for each body token, then installs it. End of
    /// input finalises like `;`. Any failure releases the buffer and
    /// leaves the dictionary unchanged.
    pub(crate) fn colon(&mut self) -> Result<()> {
        self.code_buf.begin()?;
        self.next_token();
        if !parser::is_name(&self.tkn) {
            return Err(Error::new(
                Exception::NotAWord,
                "non-existent or numeric token for definition",
            ));
        }
        let name = self.tkn.clone();
        debug!("compiling a definition of {}", name);
        loop {
            self.next_token();
            if self.tkn.is_empty() || self.tkn.starts_with(';') {
                break;
            }
            if parser::is_number(&self.tkn) {
                let n = parser::parse_number(&self.tkn);
                self.code_buf.emit_call_with_immediate(push_cell_handle(), n)?;
            } else {
                let idx = match self.find(&self.tkn) {
                    Some(idx) => idx,
                    None => {
                        return Err(Error::new(Exception::UndefinedWord, self.tkn.clone()));
                    }
                };
                let payload = self.dict[idx].payload;
                match payload {
                    Payload::Variable { addr } => {
                        self.code_buf.emit_call_with_immediate(push_cell_handle(), addr)?;
                    }
                    Payload::Primitive { action } => {
                        self.code_buf.emit_call(code_handle(action as usize))?;
                    }
                    Payload::Compiled { addr, .. } => {
                        // the Thumb bit keeps blx in Thumb state
                        self.code_buf.emit_call(addr | 1)?;
                    }
                }
            }
        }
        self.code_buf.end()?;
        let code = self.code_buf.to_bytes();
        self.define_compiled(&name, &code)?;
        self.code_buf.free();
        Ok(())
    }

    /// `variable name` defines a fresh zero-initialised variable.
    pub(crate) fn variable(&mut self) -> Result<()> {
        self.next_token();
        if parser::is_name(&self.tkn) {
            let name = self.tkn.clone();
            self.define_variable(&name)
        } else {
            Err(Error::new(
                Exception::NotAWord,
                "non-existent or numeric token for variable",
            ))
        }
    }

    // Stack and state access

    pub fn push(&mut self, v: Cell) {
        self.d_stack.push(v);
    }

    pub fn pop(&mut self) -> Result<Cell> {
        self.d_stack.pop()
    }

    pub fn stack(&self) -> &DataStack {
        &self.d_stack
    }

    pub fn failed(&self) -> bool {
        self.last_error.is_some()
    }

    pub fn set_error(&mut self, e: Error) {
        self.last_error = Some(e);
    }

    /// Outcome of the last `evaluate`, for hosts and tests.
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    pub fn output(&mut self) -> &mut String {
        &mut self.outbuf
    }

    pub fn output_buffer(&self) -> &str {
        &self.outbuf
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.outbuf)
    }

    /// Write any pending output to stdout.
    pub fn flush(&mut self) {
        use std::io::Write;

        if !self.outbuf.is_empty() {
            print!("{}", self.outbuf);
            std::io::stdout().flush().ok();
            self.outbuf.clear();
        }
    }

    pub fn set_gpio(&mut self, gpio: Box<dyn Gpio>) {
        self.gpio = gpio;
    }

    pub(crate) fn gpio(&mut self) -> &mut dyn Gpio {
        &mut *self.gpio
    }

    pub(crate) fn code_space(&self) -> &CodeSpace {
        &self.code_space
    }

    pub(crate) fn make_current(&mut self) -> CurrentGuard {
        let prev = CURRENT_VM.with(|c| c.replace(self as *mut VM));
        CurrentGuard { prev }
    }
}

// Core primitives. Binary operations pop the right operand first: for the
// source text `b a -` the result is b - a.

primitive! {
    /// Run-time: ( a b -- a+b )
    fn p_add(vm: &mut VM) {
        let a = vm.pop()?;
        let b = vm.pop()?;
        vm.push(a.wrapping_add(b));
        Ok(())
    }
}

primitive! {
    /// Run-time: ( b a -- b-a )
    fn p_sub(vm: &mut VM) {
        let a = vm.pop()?;
        let b = vm.pop()?;
        vm.push(b.wrapping_sub(a));
        Ok(())
    }
}

primitive! {
    /// Run-time: ( b a -- b<<a ), count taken mod 32
    fn p_lshift(vm: &mut VM) {
        let a = vm.pop()?;
        let b = vm.pop()?;
        vm.push(b.wrapping_shl(a));
        Ok(())
    }
}

primitive! {
    /// Run-time: ( b a -- b>>a ), logical shift
    fn p_rshift(vm: &mut VM) {
        let a = vm.pop()?;
        let b = vm.pop()?;
        vm.push(b.wrapping_shr(a));
        Ok(())
    }
}

primitive! {
    /// Run-time: ( v addr -- )
    fn p_store(vm: &mut VM) {
        let addr = vm.pop()?;
        let v = vm.pop()?;
        unsafe {
            *(addr as usize as *mut Cell) = v;
        }
        Ok(())
    }
}

primitive! {
    /// Run-time: ( addr -- v )
    fn p_fetch(vm: &mut VM) {
        let addr = vm.pop()?;
        let v = unsafe { *(addr as usize as *const Cell) };
        vm.push(v);
        Ok(())
    }
}

primitive! {
    /// Run-time: ( a -- a a )
    fn p_dup(vm: &mut VM) {
        let a = vm.pop()?;
        vm.push(a);
        vm.push(a);
        Ok(())
    }
}

primitive! {
    /// Run-time: ( a b -- b a )
    fn p_swap(vm: &mut VM) {
        let a = vm.pop()?;
        let b = vm.pop()?;
        vm.push(a);
        vm.push(b);
        Ok(())
    }
}

primitive! {
    /// Run-time: ( "name" -- )
    fn p_variable(vm: &mut VM) {
        vm.variable()
    }
}

primitive! {
    /// Run-time: ( "name body... ;" -- )
    fn p_colon(vm: &mut VM) {
        vm.colon()
    }
}
