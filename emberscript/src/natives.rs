//! Implementations of the native methods declared by the reference library
//! catalog. Linked to call sites by symbol when an image is loaded.

use emberscript_analysis::ir::Value;

use crate::{error::InvokeError, invoke::NativeImpl};

pub(crate) fn resolve(symbol: &str) -> Option<NativeImpl> {
    Some(match symbol {
        "ember:lang/System.Math.abs" => math_abs,
        "ember:lang/System.Math.min" => math_min,
        "ember:lang/System.Math.max" => math_max,
        "ember:lang/System.Convert.toString" => convert_to_string,
        "ember:console/System.Console.write" => console_write,
        "ember:console/System.Console.writeLine" => console_write_line,
        _ => return None,
    })
}

fn int_arg(args: &[Value], index: usize) -> Result<i32, InvokeError> {
    match args.get(index) {
        Some(Value::Int(x)) => Ok(*x),
        Some(other) => Err(InvokeError::Mismatch {
            expected: "int",
            found: other.type_name(),
        }),
        None => Err(InvokeError::ArityMismatch {
            expected: index + 1,
            got: args.len(),
        }),
    }
}

fn string_arg(args: &[Value], index: usize) -> Result<&str, InvokeError> {
    match args.get(index) {
        Some(Value::String(x)) => Ok(x),
        Some(other) => Err(InvokeError::Mismatch {
            expected: "string",
            found: other.type_name(),
        }),
        None => Err(InvokeError::ArityMismatch {
            expected: index + 1,
            got: args.len(),
        }),
    }
}

fn math_abs(args: &[Value]) -> Result<Value, InvokeError> {
    int_arg(args, 0)?
        .checked_abs()
        .map(Value::Int)
        .ok_or(InvokeError::Overflow)
}

fn math_min(args: &[Value]) -> Result<Value, InvokeError> {
    Ok(Value::Int(int_arg(args, 0)?.min(int_arg(args, 1)?)))
}

fn math_max(args: &[Value]) -> Result<Value, InvokeError> {
    Ok(Value::Int(int_arg(args, 0)?.max(int_arg(args, 1)?)))
}

fn convert_to_string(args: &[Value]) -> Result<Value, InvokeError> {
    Ok(Value::String(int_arg(args, 0)?.to_string()))
}

fn console_write(args: &[Value]) -> Result<Value, InvokeError> {
    print!("{}", string_arg(args, 0)?);
    Ok(Value::Void)
}

fn console_write_line(args: &[Value]) -> Result<Value, InvokeError> {
    println!("{}", string_arg(args, 0)?);
    Ok(Value::Void)
}
