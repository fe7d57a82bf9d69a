use rustpython_vm::{PyObjectRef, PyResult, VirtualMachine, function::FuncArgs};

use crate::core::pipeline::capture::CaptureBuffer;

/// Builds a file-like object whose `write` appends to `buffer`.
///
/// Writing to a closed buffer raises `ValueError`, which ends a job whose
/// caller has given up on it.
///
/// A module object serves as the namespace because it accepts arbitrary
/// attributes. `print` only needs `write`; `flush`, `closed` and `encoding`
/// are there for code that inspects the stream.
pub fn writer(vm: &VirtualMachine, buffer: CaptureBuffer) -> PyResult<PyObjectRef> {
    let write = vm.new_function(
        "write",
        move |args: FuncArgs, vm: &VirtualMachine| -> PyResult<PyObjectRef> {
            if buffer.is_closed() {
                return Err(vm.new_value_error("I/O operation on closed file".to_owned()));
            }
            let text = match args.args.first() {
                Some(obj) => obj.str(vm)?.as_str().to_owned(),
                None => String::new(),
            };
            buffer.push_str(&text);
            Ok(vm.ctx.new_int(text.chars().count()).into())
        },
    );
    let flush = vm.new_function(
        "flush",
        |_args: FuncArgs, vm: &VirtualMachine| -> PyResult<PyObjectRef> { Ok(vm.ctx.none()) },
    );

    let namespace = vm.new_module("<capture>", vm.ctx.new_dict(), None);
    namespace.set_attr("write", write, vm)?;
    namespace.set_attr("flush", flush, vm)?;
    namespace.set_attr("closed", vm.ctx.new_bool(false), vm)?;
    namespace.set_attr("encoding", vm.ctx.new_str("utf-8"), vm)?;
    Ok(namespace.into())
}
