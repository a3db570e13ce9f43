use std::sync::OnceLock;

use dc_core::{DialogueError, Value};
use regex::Regex;
use rhai::{Dynamic, Engine, EvalAltResult, ImmutableString, Position, Scope, FLOAT, INT};

use crate::functions::{FunctionImpl, FunctionRegistry};
use crate::variables::VariableStorage;

const VARIABLE_PREFIX: &str = "__dc_var_";

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").expect("variable regex must compile")
    })
}

fn interpolation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([^{}]+)\}").expect("interpolation regex must compile"))
}

pub(crate) fn value_to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Bool(value) => Dynamic::from_bool(*value),
        Value::Number(value) => Dynamic::from_float(*value as FLOAT),
        Value::String(value) => Dynamic::from(value.clone()),
    }
}

pub(crate) fn dynamic_to_value(value: Dynamic) -> Result<Value, DialogueError> {
    if value.is::<bool>() {
        return Ok(Value::Bool(value.cast::<bool>()));
    }
    if value.is::<INT>() {
        return Ok(Value::Number(value.cast::<INT>() as f64));
    }
    if value.is::<FLOAT>() {
        return Ok(Value::Number(value.cast::<FLOAT>()));
    }
    if value.is::<ImmutableString>() {
        return Ok(Value::String(value.cast::<ImmutableString>().to_string()));
    }
    Err(DialogueError::new(
        "EXPR_VALUE_UNSUPPORTED",
        format!("Expression produced unsupported value type \"{}\".", value.type_name()),
    ))
}

fn to_rhai_error(error: DialogueError) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(
        Dynamic::from(error.to_string()),
        Position::NONE,
    ))
}

fn call_host(
    implementation: &FunctionImpl,
    args: Vec<Dynamic>,
) -> Result<Dynamic, Box<EvalAltResult>> {
    let values = args
        .into_iter()
        .map(dynamic_to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(to_rhai_error)?;
    let result = implementation(&values).map_err(to_rhai_error)?;
    Ok(value_to_dynamic(&result))
}

fn register_host_functions(engine: &mut Engine, functions: &FunctionRegistry) {
    for descriptor in functions.descriptors() {
        let name = descriptor.name().to_string();
        let f = descriptor.implementation().clone();
        match descriptor.arity() {
            0 => {
                engine.register_fn(name, move || call_host(&f, Vec::new()));
            }
            1 => {
                engine.register_fn(name, move |a: Dynamic| call_host(&f, vec![a]));
            }
            2 => {
                engine.register_fn(name, move |a: Dynamic, b: Dynamic| {
                    call_host(&f, vec![a, b])
                });
            }
            3 => {
                engine.register_fn(name, move |a: Dynamic, b: Dynamic, c: Dynamic| {
                    call_host(&f, vec![a, b, c])
                });
            }
            _ => {
                engine.register_fn(
                    name,
                    move |a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic| {
                        call_host(&f, vec![a, b, c, d])
                    },
                );
            }
        }
    }
}

fn push_rewritten(output: &mut String, code: &str) {
    output.push_str(&variable_pattern().replace_all(code, format!("{}${{1}}", VARIABLE_PREFIX)));
}

/// Maps `$name` to its scope name outside of `"..."` and `'...'` literals.
fn rewrite_variables(expr: &str) -> String {
    let mut output = String::with_capacity(expr.len());
    let mut code_start = 0usize;
    let mut chars = expr.char_indices();
    while let Some((start, c)) = chars.next() {
        if c != '"' && c != '\'' {
            continue;
        }
        push_rewritten(&mut output, &expr[code_start..start]);
        let mut end = expr.len();
        let mut escaped = false;
        for (index, next) in chars.by_ref() {
            if escaped {
                escaped = false;
            } else if next == '\\' {
                escaped = true;
            } else if next == c {
                end = index + next.len_utf8();
                break;
            }
        }
        output.push_str(&expr[start..end]);
        code_start = end;
    }
    push_rewritten(&mut output, &expr[code_start..]);
    output
}

/// Evaluates an expression with registered functions callable by name and
/// `$variables` readable.
pub fn evaluate_expression(
    expr: &str,
    functions: &FunctionRegistry,
    variables: &VariableStorage,
) -> Result<Value, DialogueError> {
    let mut engine = Engine::new();
    engine.set_strict_variables(true);
    register_host_functions(&mut engine, functions);

    let mut scope = Scope::new();
    for (name, value) in variables.iter() {
        let bare = name.trim_start_matches('$');
        scope.push_dynamic(format!("{}{}", VARIABLE_PREFIX, bare), value_to_dynamic(value));
    }

    let rewritten = rewrite_variables(expr);
    let result = engine
        .eval_expression_with_scope::<Dynamic>(&mut scope, &rewritten)
        .map_err(|error| {
            DialogueError::new(
                "EXPR_EVAL",
                format!("Expression \"{}\" failed: {}", expr, error),
            )
        })?;
    dynamic_to_value(result)
}

/// Replaces every `{expr}` segment of a line with its evaluated value.
pub fn render_text(
    template: &str,
    functions: &FunctionRegistry,
    variables: &VariableStorage,
) -> Result<String, DialogueError> {
    let mut output = String::new();
    let mut last_index = 0usize;
    for captures in interpolation_pattern().captures_iter(template) {
        let (Some(full), Some(expr)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        output.push_str(&template[last_index..full.start()]);
        let value = evaluate_expression(expr.as_str(), functions, variables)?;
        output.push_str(&value.to_string());
        last_index = full.end();
    }
    output.push_str(&template[last_index..]);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn functions() -> FunctionRegistry {
        let mut functions = FunctionRegistry::new();
        functions
            .register_function("double", 1, |args: &[Value]| {
                let value = args[0].as_number().ok_or_else(|| {
                    DialogueError::new("TEST_TYPE", "double expects a number")
                })?;
                Ok(Value::Number(value * 2.0))
            })
            .expect("register double");
        functions
            .register_function("greeting", 0, |_args: &[Value]| Ok(Value::from("hello")))
            .expect("register greeting");
        functions
    }

    #[test]
    fn evaluates_functions_and_variables() {
        let mut variables = VariableStorage::new();
        variables.set_value("$gold", 4.0).expect("set gold");
        let value = evaluate_expression("double($gold) + 1", &functions(), &variables)
            .expect("evaluate");
        assert_eq!(value, Value::Number(9.0));

        let value = evaluate_expression("greeting()", &functions(), &variables)
            .expect("evaluate greeting");
        assert_eq!(value, Value::from("hello"));
    }

    #[test]
    fn integer_literals_become_numbers() {
        let value = evaluate_expression("1 + 2", &FunctionRegistry::new(), &VariableStorage::new())
            .expect("evaluate");
        assert_eq!(value, Value::Number(3.0));
    }

    #[test]
    fn function_errors_surface_as_eval_errors() {
        let error = evaluate_expression(
            "double(\"x\")",
            &functions(),
            &VariableStorage::new(),
        )
        .expect_err("type error");
        assert_eq!(error.code, "EXPR_EVAL");
        assert!(error.message.contains("double expects a number"));
    }

    #[test]
    fn unknown_variables_are_errors() {
        let error = evaluate_expression("$missing", &functions(), &VariableStorage::new())
            .expect_err("strict variables");
        assert_eq!(error.code, "EXPR_EVAL");
    }

    #[test]
    fn dollar_signs_inside_string_literals_stay_literal() {
        let mut variables = VariableStorage::new();
        variables.set_value("$gold", 4.0).expect("set gold");
        let value = evaluate_expression("\"you owe $gold\"", &functions(), &variables)
            .expect("evaluate literal");
        assert_eq!(value, Value::from("you owe $gold"));

        let value = evaluate_expression(
            "\"price: $cost, \\\"$gold\\\" \" + greeting()",
            &functions(),
            &variables,
        )
        .expect("unset names inside literals are not looked up");
        assert_eq!(value, Value::from("price: $cost, \"$gold\" hello"));

        let line = render_text("{\"$\"}{double($gold)}", &functions(), &variables)
            .expect("render");
        assert_eq!(line, "$8");
    }

    #[test]
    fn rewrite_skips_quoted_spans() {
        assert_eq!(
            rewrite_variables("$a + \"$b\" + '$' + $c"),
            "__dc_var_a + \"$b\" + '$' + __dc_var_c"
        );
        assert_eq!(rewrite_variables("\"open $x"), "\"open $x");
    }

    #[test]
    fn render_text_interpolates_segments() {
        let mut variables = VariableStorage::new();
        variables.set_value("$name", "Ada").expect("set name");
        variables.set_value("$gold", 2.0).expect("set gold");
        let line = render_text(
            "{greeting()}, {$name}! You have {double($gold)} gold.",
            &functions(),
            &variables,
        )
        .expect("render");
        assert_eq!(line, "hello, Ada! You have 4 gold.");
        assert_eq!(
            render_text("no braces", &functions(), &variables).expect("plain"),
            "no braces"
        );
    }
}
