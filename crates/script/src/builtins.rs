//! Built-in commands: variables, procedures, arrays and introspection.

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::error::{ScriptError, ScriptResult};
use crate::interp::{split_element, CommandHandler, Interpreter};
use crate::parser::{quote_element, split_list};
use crate::value::Procedure;

type BuiltinFn = fn(&mut Interpreter, &[String]) -> ScriptResult;

/// Adapter turning a plain function into a command handler.
struct Builtin(BuiltinFn);

#[async_trait]
impl CommandHandler for Builtin {
    async fn call(&self, interp: &mut Interpreter, argv: &[String]) -> ScriptResult {
        (self.0)(interp, argv)
    }
}

pub(crate) fn register(interp: &mut Interpreter) {
    let table: [(&str, BuiltinFn); 9] = [
        ("set", set),
        ("unset", unset),
        ("incr", incr),
        ("append", append),
        ("puts", puts),
        ("proc", proc_),
        ("global", global),
        ("array", array),
        ("info", info),
    ];
    for (name, f) in table {
        interp.register(name, Builtin(f));
    }
}

fn wrong_args(usage: &str) -> ScriptError {
    ScriptError::WrongArgs(usage.to_string())
}

fn bool_result(value: bool) -> ScriptResult {
    Ok(if value { "1" } else { "0" }.to_string())
}

fn to_list<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    items
        .into_iter()
        .map(quote_element)
        .collect::<Vec<_>>()
        .join(" ")
}

fn set(interp: &mut Interpreter, argv: &[String]) -> ScriptResult {
    match argv {
        [_, name] => {
            let (name, key) = split_element(name);
            interp.read_var(name, key)
        }
        [_, name, value] => {
            let (name, key) = split_element(name);
            interp.write_var(name, key, value.clone())
        }
        _ => Err(wrong_args("set varName ?newValue?")),
    }
}

fn unset(interp: &mut Interpreter, argv: &[String]) -> ScriptResult {
    let (nocomplain, names) = match argv.get(1).map(String::as_str) {
        Some("-nocomplain") => (true, &argv[2..]),
        _ => (false, &argv[1..]),
    };
    for full in names {
        let (name, key) = split_element(full);
        if !interp.remove_var(name, key) && !nocomplain {
            return Err(ScriptError::failed(format!(
                "can't unset \"{full}\": no such variable"
            )));
        }
    }
    Ok(String::new())
}

fn incr(interp: &mut Interpreter, argv: &[String]) -> ScriptResult {
    let (full, amount) = match argv {
        [_, name] => (name, 1),
        [_, name, amount] => (name, parse_int(amount)?),
        _ => return Err(wrong_args("incr varName ?increment?")),
    };
    let (name, key) = split_element(full);
    let current = if interp.var_exists(name, key) {
        parse_int(&interp.read_var(name, key)?)?
    } else {
        0
    };
    let next = current
        .checked_add(amount)
        .ok_or_else(|| ScriptError::failed("integer overflow"))?;
    interp.write_var(name, key, next.to_string())
}

fn parse_int(text: &str) -> ScriptResult<i64> {
    text.trim().parse().map_err(|_| {
        ScriptError::failed(format!("expected integer but got \"{text}\""))
    })
}

fn append(interp: &mut Interpreter, argv: &[String]) -> ScriptResult {
    let Some(full) = argv.get(1) else {
        return Err(wrong_args("append varName ?value value ...?"));
    };
    let (name, key) = split_element(full);
    let mut value = if interp.var_exists(name, key) {
        interp.read_var(name, key)?
    } else {
        String::new()
    };
    for piece in &argv[2..] {
        value.push_str(piece);
    }
    interp.write_var(name, key, value)
}

fn puts(interp: &mut Interpreter, argv: &[String]) -> ScriptResult {
    let mut args: Vec<&str> = argv[1..].iter().map(String::as_str).collect();
    if args.first() == Some(&"-nonewline") {
        args.remove(0);
    }
    let text = match args.as_slice() {
        [text] | ["stdout" | "stderr", text] => *text,
        _ => return Err(wrong_args("puts ?-nonewline? ?channelId? string")),
    };
    interp.write_line(text);
    Ok(String::new())
}

fn proc_(interp: &mut Interpreter, argv: &[String]) -> ScriptResult {
    let [_, name, params, body] = argv else {
        return Err(wrong_args("proc name args body"));
    };
    interp.define_proc(Procedure {
        name: name.clone(),
        params: split_list(params)?,
        body: body.clone(),
    });
    Ok(String::new())
}

fn global(interp: &mut Interpreter, argv: &[String]) -> ScriptResult {
    if argv.len() < 2 {
        return Err(wrong_args("global varName ?varName ...?"));
    }
    if interp.in_proc() {
        for name in &argv[1..] {
            interp.link_global(name);
        }
    }
    Ok(String::new())
}

fn array(interp: &mut Interpreter, argv: &[String]) -> ScriptResult {
    let (Some(option), Some(name)) = (argv.get(1), argv.get(2)) else {
        return Err(wrong_args("array option arrayName ?arg ...?"));
    };
    match (option.as_str(), &argv[3..]) {
        ("set", [list]) => {
            let items = split_list(list)?;
            if items.len() % 2 != 0 {
                return Err(ScriptError::failed("list must have an even number of elements"));
            }
            let target = interp.array_mut(name)?;
            for pair in items.chunks_exact(2) {
                target.insert(pair[0].clone(), pair[1].clone());
            }
            Ok(String::new())
        }
        ("get", []) => Ok(interp.array(name).map_or_else(String::new, |map| {
            to_list(map.iter().flat_map(|(k, v)| [k.as_str(), v.as_str()]))
        })),
        ("exists", []) => bool_result(interp.array(name).is_some()),
        ("names", []) => Ok(interp
            .array(name)
            .map_or_else(String::new, |map| to_list(map.keys().map(String::as_str)))),
        ("size", []) => Ok(interp.array(name).map_or(0, IndexMap::len).to_string()),
        ("set" | "get" | "exists" | "names" | "size", _) => Err(wrong_args(&format!(
            "array {option} arrayName{}",
            if option == "set" { " list" } else { "" }
        ))),
        _ => Err(ScriptError::failed(format!(
            "bad option \"{option}\": must be exists, get, names, set, or size"
        ))),
    }
}

fn info(interp: &mut Interpreter, argv: &[String]) -> ScriptResult {
    let Some(option) = argv.get(1) else {
        return Err(wrong_args("info subcommand ?arg ...?"));
    };
    match (option.as_str(), &argv[2..]) {
        ("exists", [full]) => {
            let (name, key) = split_element(full);
            bool_result(interp.var_exists(name, key))
        }
        ("procs", []) => Ok(to_list(interp.procedures().map(|p| p.name.as_str()))),
        ("globals", []) => {
            let names = interp.global_names();
            Ok(to_list(names.iter().map(String::as_str)))
        }
        ("commands", []) => Ok(to_list(interp.command_names())),
        ("args", [proc_name]) => lookup_proc(interp, proc_name).map(|p| p.params.join(" ")),
        ("body", [proc_name]) => lookup_proc(interp, proc_name).map(|p| p.body.clone()),
        _ => Err(ScriptError::failed(format!(
            "bad option \"{option}\": must be args, body, commands, exists, globals, or procs"
        ))),
    }
}

fn lookup_proc<'a>(interp: &'a Interpreter, name: &str) -> ScriptResult<&'a Procedure> {
    interp
        .procedure(name)
        .ok_or_else(|| ScriptError::failed(format!("\"{name}\" isn't a procedure")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
