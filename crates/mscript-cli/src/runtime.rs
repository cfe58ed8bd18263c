//! Globals, limits and error text shared by the commands

use anyhow::{bail, Context};
use mscript_types::Value;
use mscript_vm::function::define_function;
use mscript_vm::{
    compile_source, create_runtime, extend_globals, CodeLocation, VirtualMachine, VmConfig,
    VmError,
};
use std::fmt::Display;
use std::fs;
use std::io::Write;
use std::path::Path;

/// What every command needs to compile and run a script
pub struct Settings {
    pub config: VmConfig,
    pub globals: Value,
}

impl Settings {
    pub fn load(
        config: Option<&Path>,
        max_time_secs: Option<u64>,
        globals: Option<&Path>,
    ) -> anyhow::Result<Self> {
        let mut vm_config = match config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => VmConfig::default(),
        };
        if let Some(secs) = max_time_secs {
            vm_config.max_execution_time_ms = Some(secs.saturating_mul(1000));
        }

        let mut all = extend_globals(&create_runtime(), &console_functions());
        if let Some(path) = globals {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading globals {}", path.display()))?;
            let json: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("parsing globals {}", path.display()))?;
            if !json.is_object() {
                bail!("{} must contain a JSON object", path.display());
            }
            all = extend_globals(&all, &Value::from(json));
        }
        tracing::debug!(config = ?vm_config, "settings loaded");

        Ok(Settings {
            config: vm_config,
            globals: all,
        })
    }

    /// Compiles `source` against the globals
    pub fn compile(&self, name: &str, source: &str) -> anyhow::Result<Value> {
        compile_source(
            source,
            CodeLocation::new(name, 1),
            self.globals.clone(),
            self.config.clone(),
        )
        .map_err(script_error)
    }

    /// Fresh VM with the globals installed and the time limit armed
    pub fn machine(&self) -> VirtualMachine {
        let mut vm = VirtualMachine::with_config(self.config.clone());
        vm.set_global_scope(self.globals.clone());
        vm.set_max_execution_time(self.config.max_execution_time());
        vm
    }
}

/// Script errors hold `Rc` values, so only their text crosses into anyhow
pub fn script_error(err: impl Display) -> anyhow::Error {
    anyhow::anyhow!("{}", err)
}

/// Uncaught exception with the code locations it unwound through
pub fn exception_error(vm: &VirtualMachine, err: &VmError) -> anyhow::Error {
    let mut text = err.to_string();
    for location in vm.get_exception_code_location() {
        text.push_str(&format!("\n    at {}", location));
    }
    anyhow::anyhow!(text)
}

/// `print` and `printnl`. Output is a side effect, so both refuse to run
/// while the compiler folds constants.
fn console_functions() -> Value {
    let pairs = [("print", false), ("printnl", true)]
        .into_iter()
        .map(|(name, newline)| (std::rc::Rc::from(name), print_fn(name, newline)));
    Value::Object(mscript_types::Object::from_pairs(pairs))
}

fn print_fn(name: &'static str, newline: bool) -> Value {
    define_function(move |vm, _object, _closure| {
        if vm.is_compile_time() {
            return Err(VmError::Runtime(format!(
                "{} is not available at compile time",
                name
            )));
        }
        let params = vm.pop_params();
        let mut out = std::io::stdout().lock();
        let written = params
            .iter()
            .try_for_each(|v| write!(out, "{}", v))
            .and_then(|_| if newline { writeln!(out) } else { out.flush() });
        written.map_err(|e| VmError::Runtime(e.to_string()))?;
        vm.push_value(Value::Null)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::load(None, Some(30), None).unwrap();
        assert_eq!(settings.config.max_execution_time_ms, Some(30_000));
        assert!(settings.globals.has_member("Math"));
        assert!(settings.globals.has_member("printnl"));
    }

    #[test]
    fn test_print_is_not_folded() {
        let settings = Settings::load(None, None, None).unwrap();
        let block = settings.compile("<test>", "printnl(\"hi\")\n5").unwrap();
        let listing = mscript_vm::block::get_block(&block)
            .map(|b| mscript_vm::format_listing(&b))
            .unwrap();
        assert!(listing.contains("\"printnl\""), "{}", listing);
        let mut vm = settings.machine();
        assert_eq!(vm.exec_block(&block).unwrap(), Value::int(5));
    }
}
