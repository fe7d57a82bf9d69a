use rustpython_vm::{PyObjectRef, PyResult, VirtualMachine};

use crate::core::literal::Literal;

/// Materializes a parsed test input as a Python object.
pub fn to_python(vm: &VirtualMachine, literal: &Literal) -> PyResult<PyObjectRef> {
    let obj = match literal {
        Literal::None => vm.ctx.none(),
        Literal::Bool(value) => vm.ctx.new_bool(*value).into(),
        Literal::Int(value) => vm.ctx.new_int(*value).into(),
        Literal::BigInt(text) => {
            // Base 0 honours the radix prefix the parser kept.
            let text: PyObjectRef = vm.ctx.new_str(text.as_str()).into();
            let base: PyObjectRef = vm.ctx.new_int(0).into();
            vm.builtins.get_attr("int", vm)?.call((text, base), vm)?
        }
        Literal::Float(value) => vm.ctx.new_float(*value).into(),
        Literal::Str(value) => vm.ctx.new_str(value.as_str()).into(),
        Literal::List(items) => vm.ctx.new_list(to_python_all(vm, items)?).into(),
        Literal::Tuple(items) => vm.ctx.new_tuple(to_python_all(vm, items)?).into(),
        Literal::Set(items) => {
            let members: PyObjectRef = vm.ctx.new_list(to_python_all(vm, items)?).into();
            vm.builtins.get_attr("set", vm)?.call((members,), vm)?
        }
        Literal::Dict(entries) => {
            let dict = vm.ctx.new_dict();
            for (key, value) in entries {
                let key = to_python(vm, key)?;
                let value = to_python(vm, value)?;
                dict.set_item(&*key, value, vm)?;
            }
            dict.into()
        }
    };
    Ok(obj)
}

fn to_python_all(vm: &VirtualMachine, items: &[Literal]) -> PyResult<Vec<PyObjectRef>> {
    items.iter().map(|item| to_python(vm, item)).collect()
}
