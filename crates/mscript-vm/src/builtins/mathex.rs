//! Numeric helpers that call back into script functions
//!
//! Both run as tasks: every sample of the user function is a call that
//! leaves its result on the calc stack for the next step.

use super::number_arg;
use crate::error::VmError;
use crate::function::{define_simple_fn, is_function};
use crate::vm::{AbstractTask, VirtualMachine};
use mscript_types::Value;

fn require_function(f: &Value) -> Result<(), VmError> {
    if is_function(f) {
        Ok(())
    } else {
        Err(VmError::ArgumentIsNotFunction(f.clone()))
    }
}

/// Samples `fun` at `count` evenly spaced points of `[a, b]`
struct SampleTask {
    fun: Value,
    a: f64,
    b: f64,
    count: usize,
    samples: Vec<f64>,
    reversed: bool,
    started: bool,
}

impl SampleTask {
    fn request(&self, vm: &mut VirtualMachine) -> Result<(), VmError> {
        let k = self.samples.len() as f64;
        let x = self.a + (self.b - self.a) * k / (self.count - 1) as f64;
        vm.call_function(&self.fun, &Value::Undefined, vec![Value::float(x)])
    }
}

impl AbstractTask for SampleTask {
    fn run(&mut self, vm: &mut VirtualMachine) -> Result<bool, VmError> {
        if !self.started {
            self.started = true;
            self.request(vm)?;
            return Ok(true);
        }
        self.samples.push(vm.pop_value().get_number());
        if self.samples.len() < self.count {
            self.request(vm)?;
            return Ok(true);
        }
        let table = integrate(self.a, self.b, &self.samples, self.reversed);
        vm.push_value(interpolator(table))?;
        Ok(false)
    }

    fn name(&self) -> &'static str {
        "Math.integral"
    }
}

/// Running integral over the sampled interval, using Simpson's 3/8 rule
/// on consecutive triples of sub-intervals
fn integrate(a: f64, b: f64, y: &[f64], reversed: bool) -> Vec<(f64, f64)> {
    let total = (y.len() + 2) / 3;
    let h = b - a;
    let n = (y.len() - 1) as f64;
    let mut table = Vec::with_capacity(total);
    table.push((a, 0.0));
    for i in 1..total {
        let j = i * 3;
        let x0 = a + (j - 3) as f64 * h / n;
        let x3 = a + j as f64 * h / n;
        let s = (x3 - x0) * (y[j - 3] + 3.0 * y[j - 2] + 3.0 * y[j - 1] + y[j]) / 8.0;
        table.push((x3, s));
    }

    // Prefix sums along a binary tree, so rounding error grows with the
    // depth instead of the length.
    let len = table.len();
    let mut k = 1;
    while k < len {
        let mut l = k;
        while l < len {
            let base = table[l - 1].1;
            for m in 0..k {
                if let Some(entry) = table.get_mut(l + m) {
                    entry.1 += base;
                }
            }
            l += 2 * k;
        }
        k *= 2;
    }

    if reversed {
        let last = table.last().map(|e| e.1).unwrap_or(0.0);
        for entry in &mut table {
            entry.1 -= last;
        }
    }
    table
}

/// Cubic Lagrange interpolation through the four table points around `x`
fn interpolate(table: &[(f64, f64)], x: f64) -> f64 {
    let len = table.len();
    if len < 4 {
        return table.last().map(|e| e.1).unwrap_or(0.0);
    }
    let pos = table.partition_point(|e| e.0 < x).clamp(2, len - 2);
    let pts = [table[pos - 2], table[pos - 1], table[pos], table[pos + 1]];
    let mut result = 0.0;
    for (i, (xi, yi)) in pts.iter().enumerate() {
        let mut num = 1.0;
        let mut den = 1.0;
        for (j, (xj, _)) in pts.iter().enumerate() {
            if i != j {
                num *= x - xj;
                den *= xi - xj;
            }
        }
        result += num * yi / den;
    }
    result
}

fn interpolator(table: Vec<(f64, f64)>) -> Value {
    define_simple_fn(move |args| Ok(Value::float(interpolate(&table, number_arg(args, 0)))))
}

/// `Math.integral(fn, a, b, [steps])` returns the function `x => ∫ fn` from
/// `a` to `x`
pub fn integral(vm: &mut VirtualMachine, params: Vec<Value>) -> Result<(), VmError> {
    let fun = params.first().cloned().unwrap_or_default();
    require_function(&fun)?;
    let mut a = number_arg(&params, 1);
    let mut b = number_arg(&params, 2);
    let reversed = b < a;
    if reversed {
        std::mem::swap(&mut a, &mut b);
    }
    let steps = params
        .get(3)
        .filter(|v| v.is_number())
        .map(|v| v.get_int())
        .unwrap_or(10)
        .clamp(2, 17);
    let count = (1usize << steps) * 3 - 2;
    vm.push_task(Box::new(SampleTask {
        fun,
        a,
        b,
        count,
        samples: Vec::with_capacity(count),
        reversed,
        started: false,
    }))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RootStep {
    Start,
    From,
    To,
    Middle,
}

/// Bisection search for a zero of `fun` in `[from, to]`
struct RootTask {
    fun: Value,
    from: f64,
    to: f64,
    middle: f64,
    from_val: f64,
    to_val: f64,
    remaining: usize,
    step: RootStep,
}

impl RootTask {
    fn probe(&mut self, vm: &mut VirtualMachine, x: f64, next: RootStep) -> Result<bool, VmError> {
        self.step = next;
        vm.call_function(&self.fun, &Value::Undefined, vec![Value::float(x)])?;
        Ok(true)
    }

    fn finish(vm: &mut VirtualMachine, result: Value) -> Result<bool, VmError> {
        vm.push_value(result)?;
        Ok(false)
    }

    fn sample(vm: &mut VirtualMachine) -> Option<f64> {
        vm.pop_value().as_number().map(|n| n.as_f64())
    }
}

impl AbstractTask for RootTask {
    fn run(&mut self, vm: &mut VirtualMachine) -> Result<bool, VmError> {
        match self.step {
            RootStep::Start => self.probe(vm, self.from, RootStep::From),
            RootStep::From => match Self::sample(vm) {
                Some(v) if v == 0.0 => Self::finish(vm, Value::float(self.from)),
                Some(v) if !v.is_nan() => {
                    self.from_val = v;
                    self.probe(vm, self.to, RootStep::To)
                }
                _ => Self::finish(vm, Value::Null),
            },
            RootStep::To => match Self::sample(vm) {
                Some(v) if v == 0.0 => Self::finish(vm, Value::float(self.to)),
                Some(v) if !v.is_nan() && v.is_sign_negative() != self.from_val.is_sign_negative() => {
                    self.to_val = v;
                    self.middle = (self.from + self.to) * 0.5;
                    self.probe(vm, self.middle, RootStep::Middle)
                }
                _ => Self::finish(vm, Value::Null),
            },
            RootStep::Middle => {
                let Some(m) = Self::sample(vm) else {
                    return Self::finish(vm, Value::Null);
                };
                if m.is_nan() || m == 0.0 {
                    return Self::finish(vm, Value::float(self.middle));
                }
                self.remaining = self.remaining.saturating_sub(1);
                if m.is_sign_negative() == self.from_val.is_sign_negative() {
                    self.from = self.middle;
                    self.from_val = m;
                } else if m.is_sign_negative() == self.to_val.is_sign_negative() {
                    self.to = self.middle;
                    self.to_val = m;
                } else {
                    return Self::finish(vm, Value::Null);
                }
                self.middle = (self.from + self.to) * 0.5;
                if self.remaining == 0 {
                    return Self::finish(vm, Value::float(self.middle));
                }
                self.probe(vm, self.middle, RootStep::Middle)
            }
        }
    }

    fn name(&self) -> &'static str {
        "Math.root"
    }
}

/// `Math.root(fn, a, b, [iterations])`; `null` when `fn` does not change
/// sign on the interval
pub fn root(vm: &mut VirtualMachine, params: Vec<Value>) -> Result<(), VmError> {
    let fun = params.first().cloned().unwrap_or_default();
    require_function(&fun)?;
    let remaining = params
        .get(3)
        .filter(|v| v.is_number())
        .map(|v| v.get_int().max(1) as usize)
        .unwrap_or(30);
    vm.push_task(Box::new(RootTask {
        fun,
        from: number_arg(&params, 1),
        to: number_arg(&params, 2),
        middle: 0.0,
        from_val: 0.0,
        to_val: 0.0,
        remaining,
        step: RootStep::Start,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::define_simple_fn;

    fn square() -> Value {
        define_simple_fn(|args| {
            let x = number_arg(args, 0);
            Ok(Value::float(x * x))
        })
    }

    #[test]
    fn test_integral_of_square() {
        let mut vm = VirtualMachine::new();
        integral(
            &mut vm,
            vec![square(), Value::int(0), Value::int(3), Value::int(4)],
        )
        .unwrap();
        let f = vm.exec().unwrap();

        vm.call_function(&f, &Value::Undefined, vec![Value::int(3)])
            .unwrap();
        let at3 = vm.exec().unwrap().get_number();
        assert!((at3 - 9.0).abs() < 1e-6, "got {}", at3);

        vm.call_function(&f, &Value::Undefined, vec![Value::float(1.5)])
            .unwrap();
        let at15 = vm.exec().unwrap().get_number();
        assert!((at15 - 1.125).abs() < 1e-3, "got {}", at15);
    }

    #[test]
    fn test_root_bisection() {
        let shifted = define_simple_fn(|args| Ok(Value::float(number_arg(args, 0) - 2.0)));
        let mut vm = VirtualMachine::new();
        root(&mut vm, vec![shifted, Value::int(0), Value::int(5)]).unwrap();
        let r = vm.exec().unwrap().get_number();
        assert!((r - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_root_without_sign_change() {
        let mut vm = VirtualMachine::new();
        root(&mut vm, vec![square(), Value::int(1), Value::int(5)]).unwrap();
        assert_eq!(vm.exec().unwrap(), Value::Null);
    }
}
