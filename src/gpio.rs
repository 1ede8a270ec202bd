//! Peripheral words. The engine delegates `pinMode` and `digitalWrite` to a
//! host-supplied backend; the default backend ignores them, which is what a
//! development host wants.

use crate::core::VM;
use crate::Cell;

pub trait Gpio {
    fn pin_mode(&mut self, pin: Cell, mode: Cell);
    fn digital_write(&mut self, pin: Cell, value: Cell);
}

/// Backend for targets without board support.
pub struct NullGpio;

impl Gpio for NullGpio {
    fn pin_mode(&mut self, _pin: Cell, _mode: Cell) {}

    fn digital_write(&mut self, _pin: Cell, _value: Cell) {}
}

primitive! {
    /// Run-time: ( pin mode -- )
    fn p_pin_mode(vm: &mut VM) {
        let a = vm.pop()?;
        let b = vm.pop()?;
        vm.gpio().pin_mode(b, a);
        Ok(())
    }
}

primitive! {
    /// Run-time: ( pin val -- )
    fn p_digital_write(vm: &mut VM) {
        let a = vm.pop()?;
        let b = vm.pop()?;
        vm.gpio().digital_write(b, a);
        Ok(())
    }
}
