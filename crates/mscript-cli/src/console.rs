//! Interactive console
//!
//! Each line is compiled with every binding kept, run in its own scope,
//! and the scope's bindings are merged into the session. Later lines see
//! them as globals, so names can be rebound from one line to the next.

use crate::repl_helper::ReplHelper;
use crate::runtime::Settings;
use mscript_parser::parse_script;
use mscript_types::{Object, Value};
use mscript_vm::{BlockExecution, CodeLocation, Compiler, Error, VirtualMachine, VmConfig};
use nu_ansi_term::Color;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::path::PathBuf;

const HISTORY_FILE: &str = ".mscript_history";

/// Bindings accumulated over the console lines
pub struct Session {
    runtime: Value,
    bindings: Object,
    config: VmConfig,
    line: usize,
}

impl Session {
    pub fn new(runtime: Value, config: VmConfig) -> Self {
        Session {
            runtime,
            bindings: Object::new(),
            config,
            line: 1,
        }
    }

    fn globals(&self) -> Value {
        mscript_vm::extend_globals(&self.runtime, &Value::Object(self.bindings.clone()))
    }

    /// Compiles and runs one line, keeping its bindings on success
    pub fn eval(&mut self, source: &str) -> Result<Value, Error> {
        let globals = self.globals();
        let location = CodeLocation::new("console", self.line);
        self.line += 1;

        let elements = parse_script(source)?;
        let block = Compiler::new(elements, location)
            .with_global(globals.clone())
            .with_config(self.config.clone())
            .keep_bindings(true)
            .compile()?;

        let mut vm = VirtualMachine::with_config(self.config.clone());
        vm.set_global_scope(globals);
        vm.set_max_execution_time(self.config.max_execution_time());
        vm.push_scope(Value::Undefined)?;
        if let Err(err) = vm.push_task(Box::new(BlockExecution::new(&block)?)) {
            vm.raise(err);
        }
        let result = vm.exec()?;
        if let Some(scope) = vm.top_scope() {
            self.bindings = self.bindings.merge(&scope.locals_object());
        }
        Ok(result)
    }

    pub fn reset(&mut self) {
        self.bindings = Object::new();
    }

    pub fn bindings(&self) -> &Object {
        &self.bindings
    }

    /// Names offered for completion
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .runtime
            .as_object()
            .into_iter()
            .flat_map(|o| o.keys())
            .chain(self.bindings.keys())
            .map(|k| k.to_string())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

fn history_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(HISTORY_FILE))
}

pub fn run(settings: &Settings) -> anyhow::Result<()> {
    let mut session = Session::new(settings.globals.clone(), settings.config.clone());
    let mut editor: Editor<ReplHelper, DefaultHistory> = Editor::new()?;
    editor.set_helper(Some(ReplHelper::new(session.names())));

    let history = history_path();
    if let Some(path) = &history {
        // A missing history file is normal on first start
        let _ = editor.load_history(path);
    }

    println!("mscript console. `!` clears bindings, `@` lists them, Ctrl-D exits.");
    loop {
        let line = match editor.readline(">> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(trimmed);

        match trimmed {
            "!" => {
                session.reset();
                println!("Bindings cleared");
            }
            "@" => {
                for (name, value) in session.bindings().iter() {
                    println!("{} = {}", name, value.stringify_short(80));
                }
            }
            _ => match session.eval(trimmed) {
                Ok(value) => println!("{}", value.stringify()),
                Err(err) => eprintln!("{}", Color::Red.paint(err.to_string())),
            },
        }
        if let Some(helper) = editor.helper_mut() {
            helper.set_names(session.names());
        }
    }

    if let Some(path) = &history {
        if let Err(err) = editor.save_history(path) {
            tracing::warn!(error = %err, "could not save console history");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mscript_vm::VmError;

    fn session() -> Session {
        Session::new(mscript_vm::create_runtime(), VmConfig::default())
    }

    #[test]
    fn test_bindings_persist() {
        let mut s = session();
        s.eval("x = 20").unwrap();
        s.eval("f = (a) => a + x").unwrap();
        assert_eq!(s.eval("f(1)").unwrap(), Value::int(21));
        assert_eq!(s.bindings().len(), 2);
    }

    #[test]
    fn test_rebinding_across_lines() {
        let mut s = session();
        s.eval("x = 1").unwrap();
        s.eval("x = 2").unwrap();
        assert_eq!(s.eval("x").unwrap(), Value::int(2));
    }

    #[test]
    fn test_reset() {
        let mut s = session();
        s.eval("x = 1").unwrap();
        s.reset();
        assert!(matches!(
            s.eval("x"),
            Err(Error::Vm(VmError::VariableNotFound(_)))
        ));
    }

    #[test]
    fn test_error_keeps_session() {
        let mut s = session();
        s.eval("y = 3").unwrap();
        assert!(s.eval("raise \"bad\"").is_err());
        assert_eq!(s.eval("y * 2").unwrap(), Value::int(6));
    }
}
