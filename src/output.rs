//! Printing words. Output goes to the engine's output buffer; the shell or
//! REPL flushes it to the console once the line is done.

use std::fmt::Write;

use crate::core::VM;

primitive! {
    /// Run-time: ( a -- ), print unsigned decimal
    fn p_dot(vm: &mut VM) {
        let v = vm.pop()?;
        writeln!(vm.output(), "{}", v).unwrap();
        Ok(())
    }
}

primitive! {
    /// Run-time: ( a -- ), print signed decimal
    fn p_dot_s(vm: &mut VM) {
        let v = vm.pop()? as i32;
        writeln!(vm.output(), "{}", v).unwrap();
        Ok(())
    }
}

primitive! {
    /// Run-time: ( a -- ), print 0x%08x
    fn p_dot_x(vm: &mut VM) {
        let v = vm.pop()?;
        writeln!(vm.output(), "0x{:08x}", v).unwrap();
        Ok(())
    }
}
