use std::path::PathBuf;

use rustpython_vm::{
    AsObject, PyObjectRef, PyResult, VirtualMachine, builtins::PyBaseExceptionRef,
    compiler::Mode, scope::Scope,
};

use crate::{
    core::{
        domain::ScriptError,
        errors::{InitError, StreamRedirectionError},
        literal::Literal,
        pipeline::capture::CaptureSinks,
        traits::interpreter::{Interpreter, Invocation, RuntimeFactory},
    },
    python::{convert::to_python, sinks},
};

const SOURCE_PATH: &str = "<exec>";

/// The original `sys.stdout` and `sys.stderr` captured by one `install_sinks`.
struct SavedStreams {
    stdout: PyObjectRef,
    stderr: PyObjectRef,
}

/// A RustPython interpreter with one `__main__` scope that lives as long as it does.
pub struct PythonRuntime {
    scope: Scope,
    saved: Vec<SavedStreams>,
    // Declared last so Python objects above are released first.
    vm: rustpython_vm::Interpreter,
}

impl PythonRuntime {
    #[tracing::instrument(skip_all, fields(paths = stdlib_paths.len()))]
    pub fn new(stdlib_paths: &[PathBuf]) -> Result<Self, InitError> {
        let mut settings = rustpython_vm::Settings::default();
        for path in stdlib_paths {
            settings.path_list.push(path.to_string_lossy().into_owned());
        }

        let vm = rustpython_vm::Interpreter::with_init(settings, |vm| {
            vm.add_native_modules(rustpython_stdlib::get_module_inits());
        });

        let scope = vm
            .enter(|vm| -> Result<Scope, String> {
                let scope = vm.new_scope_with_builtins();
                scope
                    .globals
                    .set_item("__name__", vm.ctx.new_str("__main__").into(), vm)
                    .map_err(|exc| exception_message(vm, &exc))?;
                Ok(scope)
            })
            .map_err(|msg| InitError::new(format!("failed to prepare __main__ scope: {msg}")))?;

        tracing::debug!("python runtime constructed");
        Ok(Self {
            scope,
            saved: Vec::new(),
            vm,
        })
    }
}

impl Interpreter for PythonRuntime {
    fn install_sinks(&mut self, capture: &CaptureSinks) -> Result<(), StreamRedirectionError> {
        let saved = self
            .vm
            .enter(|vm| -> Result<SavedStreams, String> {
                let describe = |exc: PyBaseExceptionRef| exception_message(vm, &exc);
                let stdout = vm.sys_module.get_attr("stdout", vm).map_err(describe)?;
                let stderr = vm.sys_module.get_attr("stderr", vm).map_err(describe)?;

                let out_writer = sinks::writer(vm, capture.stdout.clone()).map_err(describe)?;
                let err_writer = sinks::writer(vm, capture.stderr.clone()).map_err(describe)?;
                vm.sys_module
                    .set_attr("stdout", out_writer, vm)
                    .map_err(describe)?;
                if let Err(exc) = vm.sys_module.set_attr("stderr", err_writer, vm) {
                    let _ = vm.sys_module.set_attr("stdout", stdout.clone(), vm);
                    return Err(describe(exc));
                }

                Ok(SavedStreams { stdout, stderr })
            })
            .map_err(|msg| StreamRedirectionError::Install { msg })?;

        self.saved.push(saved);
        Ok(())
    }

    fn restore_streams(&mut self) -> Result<(), StreamRedirectionError> {
        let saved = self
            .saved
            .pop()
            .ok_or(StreamRedirectionError::NothingToRestore)?;

        self.vm
            .enter(|vm| -> Result<(), String> {
                let describe = |exc: PyBaseExceptionRef| exception_message(vm, &exc);
                vm.sys_module
                    .set_attr("stdout", saved.stdout, vm)
                    .map_err(describe)?;
                vm.sys_module
                    .set_attr("stderr", saved.stderr, vm)
                    .map_err(describe)
            })
            .map_err(|msg| StreamRedirectionError::Restore { msg })
    }

    fn run_source(&mut self, source: &str) -> Result<(), ScriptError> {
        let scope = self.scope.clone();
        self.vm.enter(|vm| {
            let code = vm
                .compile(source, Mode::Exec, SOURCE_PATH.to_owned())
                .map_err(|err| {
                    let msg = format!("SyntaxError: {err}");
                    ScriptError::new(msg.clone(), msg)
                })?;
            vm.run_code_obj(code, scope)
                .map(|_| ())
                .map_err(|exc| script_error(vm, &exc))
        })
    }

    fn invoke(&mut self, entry_point: &str, argument: &Literal) -> Invocation {
        let scope = self.scope.clone();
        self.vm.enter(|vm| {
            let function = match lookup_callable(vm, &scope, entry_point) {
                Ok(Some(function)) => function,
                Ok(None) => return Invocation::Missing,
                Err(exc) => return Invocation::Raised(script_error(vm, &exc)),
            };

            let returned = to_python(vm, argument)
                .and_then(|argument| function.call((argument,), vm))
                .and_then(|value| Ok(value.str(vm)?.as_str().to_owned()));

            match returned {
                Ok(text) => Invocation::Returned(text),
                Err(exc) => Invocation::Raised(script_error(vm, &exc)),
            }
        })
    }
}

/// The object bound to `name` in the top-level scope, if there is one and it is callable.
fn lookup_callable(
    vm: &VirtualMachine,
    scope: &Scope,
    name: &str,
) -> PyResult<Option<PyObjectRef>> {
    let Some(candidate) = scope.globals.get_item_opt(name, vm)? else {
        return Ok(None);
    };
    let callable = vm
        .builtins
        .get_attr("callable", vm)?
        .call((candidate.clone(),), vm)?
        .try_to_bool(vm)?;
    Ok(callable.then_some(candidate))
}

fn script_error(vm: &VirtualMachine, exc: &PyBaseExceptionRef) -> ScriptError {
    let mut traceback = String::new();
    if vm.write_exception(&mut traceback, exc).is_ok() && !traceback.trim().is_empty() {
        return ScriptError::from_traceback(&traceback);
    }
    let msg = exception_message(vm, exc);
    ScriptError::new(msg.clone(), msg)
}

fn exception_message(vm: &VirtualMachine, exc: &PyBaseExceptionRef) -> String {
    exc.as_object()
        .str(vm)
        .map(|s| s.as_str().to_owned())
        .unwrap_or_else(|_| "unprintable exception".to_owned())
}

/// Builds `PythonRuntime`s with the native stdlib modules and the given search paths.
#[derive(Debug, Clone, Default)]
pub struct PythonRuntimeFactory {
    stdlib_paths: Vec<PathBuf>,
}

impl PythonRuntimeFactory {
    pub fn new(stdlib_paths: Vec<PathBuf>) -> Self {
        Self { stdlib_paths }
    }
}

impl RuntimeFactory for PythonRuntimeFactory {
    fn build(&self) -> Result<Box<dyn Interpreter>, InitError> {
        Ok(Box::new(PythonRuntime::new(&self.stdlib_paths)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> PythonRuntime {
        PythonRuntime::new(&[]).unwrap()
    }

    #[test]
    fn test_streams_are_captured_and_restored() {
        let mut runtime = runtime();
        let capture = CaptureSinks::default();

        runtime.install_sinks(&capture).unwrap();
        runtime
            .run_source("import sys\nprint('out')\nsys.stderr.write('err')")
            .unwrap();
        runtime.restore_streams().unwrap();
        runtime.run_source("print('not captured')").unwrap();

        assert_eq!(capture.stdout.contents(), "out\n");
        assert_eq!(capture.stderr.contents(), "err");
        assert_eq!(
            runtime.restore_streams(),
            Err(StreamRedirectionError::NothingToRestore)
        );
    }

    #[test]
    fn test_closed_sink_rejects_writes() {
        let mut runtime = runtime();
        let capture = CaptureSinks::default();

        runtime.install_sinks(&capture).unwrap();
        runtime.run_source("print('kept')").unwrap();
        capture.close();
        let err = runtime
            .run_source("while True:\n    print('x' * 100)")
            .unwrap_err();
        runtime.restore_streams().unwrap();

        assert_eq!(err.summary, "ValueError: I/O operation on closed file");
        assert_eq!(capture.stdout.contents(), "kept\n");
    }

    #[test]
    fn test_nested_capture_windows_unwind_in_order() {
        let mut runtime = runtime();
        let outer = CaptureSinks::default();
        let inner = CaptureSinks::default();

        runtime.install_sinks(&outer).unwrap();
        runtime.install_sinks(&inner).unwrap();
        runtime.run_source("print('inner')").unwrap();
        runtime.restore_streams().unwrap();
        runtime.run_source("print('outer')").unwrap();
        runtime.restore_streams().unwrap();

        assert_eq!(inner.stdout.contents(), "inner\n");
        assert_eq!(outer.stdout.contents(), "outer\n");
    }

    #[test]
    fn test_syntax_and_runtime_errors() {
        let mut runtime = runtime();

        let syntax = runtime.run_source("def broken(:").unwrap_err();
        assert!(syntax.summary.starts_with("SyntaxError"));

        let runtime_err = runtime.run_source("1 / 0").unwrap_err();
        assert_eq!(runtime_err.summary, "ZeroDivisionError: division by zero");
        assert!(runtime_err.details.starts_with("Traceback"));
    }

    #[test]
    fn test_invoke_resolves_only_callables() {
        let mut runtime = runtime();
        runtime
            .run_source("solution = 5\ndef double(x):\n    return x * 2")
            .unwrap();

        assert_eq!(
            runtime.invoke("solution", &Literal::Int(1)),
            Invocation::Missing
        );
        assert_eq!(runtime.invoke("absent", &Literal::Int(1)), Invocation::Missing);
        assert_eq!(
            runtime.invoke("double", &Literal::Int(21)),
            Invocation::Returned("42".to_string())
        );
    }

    #[test]
    fn test_invoke_converts_literals() {
        let mut runtime = runtime();
        runtime
            .run_source("def describe(x):\n    return type(x).__name__ + ':' + str(x)")
            .unwrap();

        let cases = [
            ("None", "NoneType:None"),
            ("True", "bool:True"),
            ("2.5", "float:2.5"),
            ("'hi'", "str:hi"),
            ("[1, 'a']", "list:[1, 'a']"),
            ("(1,)", "tuple:(1,)"),
            ("{'k': [1]}", "dict:{'k': [1]}"),
            ("{3}", "set:{3}"),
            ("123456789012345678901234567890", "int:123456789012345678901234567890"),
            ("0xFFFFFFFFFFFFFFFFFF", "int:4722366482869645213695"),
            ("-0o7777777777777777777777", "int:-73786976294838206463"),
        ];
        for (input, expected) in cases {
            let argument = crate::core::literal::parse_literal(input);
            assert_eq!(
                runtime.invoke("describe", &argument),
                Invocation::Returned(expected.to_string()),
                "input: {input}"
            );
        }
    }

    #[test]
    fn test_invoke_reports_raised_errors() {
        let mut runtime = runtime();
        runtime
            .run_source("def solution(x):\n    return x / 0")
            .unwrap();

        match runtime.invoke("solution", &Literal::Int(1)) {
            Invocation::Raised(err) => {
                assert!(err.summary.contains("division by zero"), "{}", err.summary)
            }
            other => panic!("expected a raised error, got {other:?}"),
        }
    }
}
