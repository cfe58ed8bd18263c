//! `Math` table
//!
//! Constants, the usual real functions and the numeric helpers from
//! `mathex` (`integral`, `root`).

use super::registry::ModuleBuilder;
use super::{int_or_float, mathex, number_arg};
use crate::error::VmError;
use crate::function::{define_async_fn, define_function, define_simple_fn};
use mscript_types::Value;
use rand::Rng;

/// Function of the first argument's numeric value
macro_rules! unary_math_fn {
    ($f:expr) => {
        define_simple_fn(|args: &[Value]| -> Result<Value, VmError> {
            let f: fn(f64) -> f64 = $f;
            Ok(Value::float(f(number_arg(args, 0))))
        })
    };
}

/// Like `unary_math_fn`, but integral results stay integers
macro_rules! rounding_fn {
    ($f:expr) => {
        define_simple_fn(|args: &[Value]| -> Result<Value, VmError> {
            let f: fn(f64) -> f64 = $f;
            Ok(int_or_float(f(number_arg(args, 0))))
        })
    };
}

macro_rules! binary_math_fn {
    ($f:expr) => {
        define_simple_fn(|args: &[Value]| -> Result<Value, VmError> {
            let f: fn(f64, f64) -> f64 = $f;
            Ok(Value::float(f(number_arg(args, 0), number_arg(args, 1))))
        })
    };
}

pub fn create_module() -> Value {
    let mut m = ModuleBuilder::new("Math");

    m.constant("E", std::f64::consts::E)
        .constant("LN10", std::f64::consts::LN_10)
        .constant("LN2", std::f64::consts::LN_2)
        .constant("LOG2E", std::f64::consts::LOG2_E)
        .constant("LOG10E", std::f64::consts::LOG10_E)
        .constant("PI", std::f64::consts::PI)
        .constant("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2)
        .constant("SQRT2", std::f64::consts::SQRT_2);

    m.register("abs", define_simple_fn(vm_abs))
        .register("acos", unary_math_fn!(f64::acos))
        .register("acosh", unary_math_fn!(f64::acosh))
        .register("asin", unary_math_fn!(f64::asin))
        .register("asinh", unary_math_fn!(f64::asinh))
        .register("atan", unary_math_fn!(f64::atan))
        .register("atanh", unary_math_fn!(f64::atanh))
        .register("atan2", binary_math_fn!(f64::atan2))
        .register("cbrt", unary_math_fn!(f64::cbrt))
        .register("ceil", rounding_fn!(f64::ceil))
        .register("cos", unary_math_fn!(f64::cos))
        .register("cosh", unary_math_fn!(f64::cosh))
        .register("exp", unary_math_fn!(f64::exp))
        .register("expm1", unary_math_fn!(f64::exp_m1))
        .register("floor", rounding_fn!(f64::floor))
        .register("fround", rounding_fn!(f64::round))
        .register("hypot", define_simple_fn(vm_hypot))
        .register("log", unary_math_fn!(f64::ln))
        .register("log1p", unary_math_fn!(f64::ln_1p))
        .register("log10", unary_math_fn!(f64::log10))
        .register("log2", unary_math_fn!(f64::log2))
        .register("max", define_simple_fn(vm_max))
        .register("min", define_simple_fn(vm_min))
        .register("pow", binary_math_fn!(f64::powf))
        .register("random", define_function(vm_random))
        .register("round", rounding_fn!(f64::round))
        .register("sign", rounding_fn!(sign))
        .register("sin", unary_math_fn!(f64::sin))
        .register("sinh", unary_math_fn!(f64::sinh))
        .register("sqrt", unary_math_fn!(f64::sqrt))
        .register("tan", unary_math_fn!(f64::tan))
        .register("trunc", rounding_fn!(f64::trunc));

    m.register("integral", define_async_fn(mathex::integral))
        .register("root", define_async_fn(mathex::root));

    m.build()
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn vm_abs(args: &[Value]) -> Result<Value, VmError> {
    match args.first().and_then(Value::as_number) {
        Some(mscript_types::Number::Int(i)) => Ok(i
            .checked_abs()
            .map(Value::int)
            .unwrap_or_else(|| Value::float((i as f64).abs()))),
        _ => Ok(Value::float(number_arg(args, 0).abs())),
    }
}

fn vm_hypot(args: &[Value]) -> Result<Value, VmError> {
    let sum: f64 = args.iter().map(|a| a.get_number().powi(2)).sum();
    Ok(Value::float(sum.sqrt()))
}

/// Largest argument, keeping its original representation
fn vm_max(args: &[Value]) -> Result<Value, VmError> {
    Ok(args
        .iter()
        .fold(None::<&Value>, |best, a| match best {
            Some(b) if b.get_number() >= a.get_number() => Some(b),
            _ => Some(a),
        })
        .cloned()
        .unwrap_or(Value::Undefined))
}

fn vm_min(args: &[Value]) -> Result<Value, VmError> {
    Ok(args
        .iter()
        .fold(None::<&Value>, |best, a| match best {
            Some(b) if b.get_number() <= a.get_number() => Some(b),
            _ => Some(a),
        })
        .cloned()
        .unwrap_or(Value::Undefined))
}

/// A random result must never be folded into the compiled code
fn vm_random(
    vm: &mut crate::vm::VirtualMachine,
    _object: &Value,
    _closure: &Value,
) -> Result<(), VmError> {
    if vm.is_compile_time() {
        return Err(VmError::Runtime(
            "Math.random cannot run at compile time".into(),
        ));
    }
    vm.pop_params();
    let x: f64 = rand::thread_rng().gen();
    vm.push_value(Value::float(x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::VirtualMachine;

    fn call(table: &Value, name: &str, args: Vec<Value>) -> Result<Value, VmError> {
        let mut vm = VirtualMachine::new();
        vm.call_function(&table.member(name), &Value::Undefined, args)?;
        vm.exec()
    }

    #[test]
    fn test_constants() {
        let math = create_module();
        assert_eq!(math.member("PI"), Value::float(std::f64::consts::PI));
        assert_eq!(math.member("SQRT2").get_number(), 2f64.sqrt());
    }

    #[test]
    fn test_rounding_keeps_integers() {
        let math = create_module();
        assert_eq!(call(&math, "floor", vec![Value::float(2.7)]).unwrap(), Value::int(2));
        assert_eq!(call(&math, "sign", vec![Value::float(-0.5)]).unwrap(), Value::int(-1));
        assert_eq!(call(&math, "sqrt", vec![Value::int(9)]).unwrap(), Value::float(3.0));
    }

    #[test]
    fn test_min_max() {
        let math = create_module();
        let args = vec![Value::int(3), Value::float(7.5), Value::int(-1)];
        assert_eq!(call(&math, "max", args.clone()).unwrap(), Value::float(7.5));
        assert_eq!(call(&math, "min", args).unwrap(), Value::int(-1));
    }

    #[test]
    fn test_random_refuses_compile_time() {
        let math = create_module();
        let mut vm = VirtualMachine::new();
        vm.set_compile_time(true);
        let r = vm.call_function(&math.member("random"), &Value::Undefined, vec![]);
        assert!(matches!(r, Err(VmError::Runtime(_))));

        let x = call(&math, "random", vec![]).unwrap().get_number();
        assert!((0.0..1.0).contains(&x));
    }
}
