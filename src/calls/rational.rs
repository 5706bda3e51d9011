//! Rational routines: `lcm` and `gcd`.

use std::sync::Arc;

use crate::array::ForeignArray;
use crate::calls::CallSite;
use crate::error::BridgeResult;
use crate::interpreter::Interpreter;
use crate::marshal::{Arg, HostValue};

pub const LCM: CallSite = CallSite::new("lcm", &["x1", "x2"]);
pub const GCD: CallSite = CallSite::new("gcd", &["x1", "x2"]);

pub fn lcm(interpreter: &Interpreter, x1: i64, x2: i64) -> BridgeResult<i64> {
    interpreter.call(&LCM.spec([Arg::of(x1), Arg::of(x2)]))
}

pub fn gcd(interpreter: &Interpreter, x1: i64, x2: i64) -> BridgeResult<i64> {
    interpreter.call(&GCD.spec([Arg::of(x1), Arg::of(x2)]))
}

/// Elementwise `lcm` with broadcasting.
pub fn lcm_array(
    interpreter: &Arc<Interpreter>,
    x1: impl Into<HostValue>,
    x2: impl Into<HostValue>,
) -> BridgeResult<ForeignArray<i64>> {
    interpreter.call_as(&LCM.spec([Arg::of(x1), Arg::of(x2)]))
}

/// Elementwise `gcd` with broadcasting.
pub fn gcd_array(
    interpreter: &Arc<Interpreter>,
    x1: impl Into<HostValue>,
    x2: impl Into<HostValue>,
) -> BridgeResult<ForeignArray<i64>> {
    interpreter.call_as(&GCD.spec([Arg::of(x1), Arg::of(x2)]))
}
