use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use dc_core::{ArgValue, CommandSignature, DialogueError, DispatchStatus, NodeHandle, ParamKind};

use crate::{
    await_completion, pending_operation, CommandInvocation, CommandRegistry, CommandReturn,
    Completer, Dispatcher, EmptyScene, Resolution, SceneGraph,
};

type Calls = Arc<Mutex<Vec<CommandInvocation>>>;

fn recording_registry() -> (CommandRegistry, Calls) {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let mut registry = CommandRegistry::new();

    let recorded = Arc::clone(&calls);
    registry
        .register_command(
            "walk_to_point",
            CommandSignature::sync()
                .required("x", ParamKind::Number)
                .required("y", ParamKind::Number)
                .optional("speed", ParamKind::Number),
            move |invocation| {
                recorded.lock().expect("calls lock").push(invocation);
                Ok(CommandReturn::Done)
            },
        )
        .expect("register walk_to_point");

    let recorded = Arc::clone(&calls);
    registry
        .register_command(
            "set_flag",
            CommandSignature::sync().required("visible", ParamKind::Boolean),
            move |invocation| {
                recorded.lock().expect("calls lock").push(invocation);
                Ok(CommandReturn::Done)
            },
        )
        .expect("register set_flag");

    let recorded = Arc::clone(&calls);
    registry
        .register_command(
            "say",
            CommandSignature::sync()
                .required("speaker", ParamKind::String)
                .required("line", ParamKind::String),
            move |invocation| {
                recorded.lock().expect("calls lock").push(invocation);
                Ok(CommandReturn::Done)
            },
        )
        .expect("register say");

    (registry, calls)
}

fn call_count(calls: &Calls) -> usize {
    calls.lock().expect("calls lock").len()
}

#[test]
fn arity_bounds_are_inclusive() {
    let (registry, calls) = recording_registry();
    let dispatcher = Dispatcher::new(&registry, &EmptyScene);

    let result = dispatcher.dispatch("walk_to_point 3").expect("dispatch");
    assert_eq!(result.status, DispatchStatus::InvalidParameterCount);
    assert_eq!(
        result.message.as_deref(),
        Some("walk_to_point requires between 2 and 3 parameters, but 1 was provided.")
    );

    let result = dispatcher.dispatch("walk_to_point 3 4").expect("dispatch");
    assert_eq!(result.status, DispatchStatus::SucceededSync);
    assert!(result.pending.is_none());

    let result = dispatcher.dispatch("walk_to_point 3 4 2.5").expect("dispatch");
    assert_eq!(result.status, DispatchStatus::SucceededSync);

    let result = dispatcher.dispatch("walk_to_point 3 4 2.5 9").expect("dispatch");
    assert_eq!(result.status, DispatchStatus::InvalidParameterCount);
    assert_eq!(
        result.message.as_deref(),
        Some("walk_to_point requires between 2 and 3 parameters, but 4 were provided.")
    );

    let calls = calls.lock().expect("calls lock");
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[0].args.values(),
        &[ArgValue::Number(3.0), ArgValue::Number(4.0), ArgValue::Default]
    );
    assert_eq!(
        calls[1].args.values(),
        &[ArgValue::Number(3.0), ArgValue::Number(4.0), ArgValue::Number(2.5)]
    );
    assert_eq!(calls[0].receiver, None);
}

#[test]
fn unknown_commands_have_no_side_effects() {
    let (registry, calls) = recording_registry();
    let dispatcher = Dispatcher::new(&registry, &EmptyScene);
    let result = dispatcher.dispatch("nosuchcommand x y").expect("dispatch");
    assert_eq!(result.status, DispatchStatus::CommandUnknown);
    assert!(result.message.is_some());
    assert_eq!(call_count(&calls), 0);

    let empty = CommandRegistry::new();
    let result = Dispatcher::new(&empty, &EmptyScene)
        .dispatch("walk_to_point 1 2")
        .expect("dispatch");
    assert_eq!(result.status, DispatchStatus::CommandUnknown);
}

#[test]
fn blank_text_is_unknown() {
    let (registry, _calls) = recording_registry();
    let dispatcher = Dispatcher::new(&registry, &EmptyScene);
    for text in ["", "   ", "\t"] {
        let result = dispatcher.dispatch(text).expect("dispatch");
        assert_eq!(result.status, DispatchStatus::CommandUnknown);
    }
}

#[test]
fn lookup_is_case_sensitive_on_first_token() {
    let (registry, calls) = recording_registry();
    let dispatcher = Dispatcher::new(&registry, &EmptyScene);
    let result = dispatcher.dispatch("Walk_To_Point 1 2").expect("dispatch");
    assert_eq!(result.status, DispatchStatus::CommandUnknown);
    let result = dispatcher.dispatch("\"walk_to_point\" 1 2").expect("dispatch");
    assert_eq!(result.status, DispatchStatus::SucceededSync);
    assert_eq!(call_count(&calls), 1);
}

#[test]
fn boolean_parameter_name_means_true() {
    let (registry, calls) = recording_registry();
    let dispatcher = Dispatcher::new(&registry, &EmptyScene);

    let result = dispatcher.dispatch("set_flag visible").expect("dispatch");
    assert_eq!(result.status, DispatchStatus::SucceededSync);
    let result = dispatcher.dispatch("set_flag false").expect("dispatch");
    assert_eq!(result.status, DispatchStatus::SucceededSync);
    let result = dispatcher.dispatch("set_flag maybe").expect("dispatch");
    assert_eq!(result.status, DispatchStatus::InvalidParameterCount);
    let message = result.message.expect("conversion message");
    assert!(message.starts_with("Can't convert parameter 0 to bool: "));

    let calls = calls.lock().expect("calls lock");
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].args.boolean(0), Ok(true));
    assert_eq!(calls[1].args.boolean(0), Ok(false));
}

#[test]
fn conversion_failure_aborts_the_whole_dispatch() {
    let (registry, calls) = recording_registry();
    let dispatcher = Dispatcher::new(&registry, &EmptyScene);
    let result = dispatcher.dispatch("walk_to_point 3 north").expect("dispatch");
    assert_eq!(result.status, DispatchStatus::InvalidParameterCount);
    assert_eq!(
        result.message.as_deref(),
        Some("Can't convert parameter 1 to float: invalid float literal")
    );
    assert_eq!(call_count(&calls), 0);
}

#[test]
fn arity_is_checked_before_conversion() {
    let (registry, _calls) = recording_registry();
    let dispatcher = Dispatcher::new(&registry, &EmptyScene);
    let result = dispatcher.dispatch("walk_to_point north").expect("dispatch");
    assert_eq!(result.status, DispatchStatus::InvalidParameterCount);
    assert!(result
        .message
        .expect("arity message")
        .contains("but 1 was provided"));
}

#[test]
fn quoted_arguments_reach_string_parameters() {
    let (registry, calls) = recording_registry();
    let dispatcher = Dispatcher::new(&registry, &EmptyScene);
    let result = dispatcher
        .dispatch(r#"say guard "Halt! Who \"goes\" there?""#)
        .expect("dispatch");
    assert_eq!(result.status, DispatchStatus::SucceededSync);
    let calls = calls.lock().expect("calls lock");
    assert_eq!(calls[0].args.string(1), Ok("Halt! Who \"goes\" there?"));
}

#[test]
fn handler_errors_propagate() {
    let mut registry = CommandRegistry::new();
    registry
        .register_command("explode", CommandSignature::sync(), |_invocation| {
            Err(DialogueError::new("GAME_BUG", "boom"))
        })
        .expect("register explode");
    let error = Dispatcher::new(&registry, &EmptyScene)
        .dispatch("explode")
        .expect_err("handler error escapes");
    assert_eq!(error, DialogueError::new("GAME_BUG", "boom"));
}

#[test]
fn commands_and_functions_use_separate_namespaces() {
    let (registry, calls) = recording_registry();
    let mut functions = crate::FunctionRegistry::new();
    functions
        .register_function("say", 0, |_args: &[dc_core::Value]| {
            Ok(dc_core::Value::Bool(true))
        })
        .expect("function named like a command");
    let result = Dispatcher::new(&registry, &EmptyScene)
        .dispatch("say a b")
        .expect("dispatch");
    assert_eq!(result.status, DispatchStatus::SucceededSync);
    assert_eq!(call_count(&calls), 1);
}

fn component_scene() -> SceneGraph {
    let mut scene = SceneGraph::new();
    scene.add_node("/root/player", ["Walker"]);
    scene.add_node("/root/statue", ["Sprite"]);
    scene
}

fn component_registry(calls: Calls) -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry
        .register_component_command(
            "walk",
            "Walker",
            CommandSignature::sync()
                .required("x", ParamKind::Number)
                .optional("target", ParamKind::Node),
            move |invocation| {
                calls.lock().expect("calls lock").push(invocation);
                Ok(CommandReturn::Done)
            },
        )
        .expect("register walk");
    registry
}

#[test]
fn component_commands_resolve_their_target() {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let registry = component_registry(Arc::clone(&calls));
    let scene = component_scene();
    let dispatcher = Dispatcher::new(&registry, &scene);

    let result = dispatcher.dispatch("walk player 2 statue").expect("dispatch");
    assert_eq!(result.status, DispatchStatus::SucceededSync);

    let result = dispatcher.dispatch("walk ghost 2").expect("dispatch");
    assert_eq!(result.status, DispatchStatus::NoTargetFound);

    let result = dispatcher.dispatch("walk statue 2").expect("dispatch");
    assert_eq!(result.status, DispatchStatus::TargetMissingComponent);
    assert!(result.message.expect("message").contains("Walker"));

    let result = dispatcher.dispatch("walk ghost").expect("dispatch");
    assert_eq!(result.status, DispatchStatus::InvalidParameterCount);

    let calls = calls.lock().expect("calls lock");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].receiver, Some(NodeHandle(0)));
    assert_eq!(calls[0].args.node(1), Ok(Some(NodeHandle(1))));
}

#[test]
fn missing_node_argument_is_not_an_error() {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let registry = component_registry(Arc::clone(&calls));
    let scene = component_scene();
    let result = Dispatcher::new(&registry, &scene)
        .dispatch("walk player 1 nowhere")
        .expect("dispatch");
    assert_eq!(result.status, DispatchStatus::SucceededSync);
    assert_eq!(
        calls.lock().expect("calls lock")[0].args.node(1),
        Ok(None)
    );
}

#[test]
fn bound_methods_receive_their_node() {
    let mut scene = SceneGraph::new();
    let camera = scene.add_node("/root/camera", ["Camera"]);
    let seen = Arc::new(Mutex::new(None));
    let captured = Arc::clone(&seen);
    let mut registry = CommandRegistry::new();
    registry
        .register_method(
            "shake",
            "/root/camera",
            &scene,
            CommandSignature::sync(),
            move |invocation| {
                *captured.lock().expect("seen lock") = invocation.receiver;
                Ok(CommandReturn::Done)
            },
        )
        .expect("register shake");

    Dispatcher::new(&registry, &scene)
        .dispatch("shake")
        .expect("dispatch");
    assert_eq!(*seen.lock().expect("seen lock"), Some(camera));
}

#[test]
fn async_continuation_waits_for_completion() {
    let completers: Arc<Mutex<Vec<Completer>>> = Arc::new(Mutex::new(Vec::new()));
    let stash = Arc::clone(&completers);
    let mut registry = CommandRegistry::new();
    registry
        .register_command("pan_camera", CommandSignature::asynchronous(), move |_invocation| {
            let (operation, completer) = pending_operation();
            stash.lock().expect("completers lock").push(completer);
            Ok(CommandReturn::Pending(operation))
        })
        .expect("register pan_camera");

    let result = Dispatcher::new(&registry, &EmptyScene)
        .dispatch("pan_camera")
        .expect("dispatch");
    let (status, message, pending) = result.into_parts();
    assert_eq!(status, DispatchStatus::SucceededAsync);
    assert!(message.is_none());
    let pending = pending.expect("pending operation");

    let order = Arc::new(Mutex::new(Vec::new()));
    let continued = Arc::new(AtomicUsize::new(0));
    let continued_flag = Arc::clone(&continued);
    let continuation_order = Arc::clone(&order);
    assert!(await_completion(Some(&pending), move || {
        continued_flag.fetch_add(1, Ordering::SeqCst);
        continuation_order.lock().expect("order lock").push("continue");
    }));
    assert_eq!(continued.load(Ordering::SeqCst), 0);

    order.lock().expect("order lock").push("side effect done");
    let completer = completers
        .lock()
        .expect("completers lock")
        .pop()
        .expect("completer stashed");
    assert!(completer.complete());

    assert_eq!(continued.load(Ordering::SeqCst), 1);
    assert_eq!(pending.resolution(), Resolution::Completed);
    assert_eq!(
        *order.lock().expect("order lock"),
        vec!["side effect done", "continue"]
    );
}

#[test]
fn sync_command_returning_pending_fails_fast() {
    let mut registry = CommandRegistry::new();
    registry
        .register_command("blink", CommandSignature::sync(), |_invocation| {
            Ok(CommandReturn::Pending(crate::PendingOperation::completed()))
        })
        .expect("register blink");
    let error = Dispatcher::new(&registry, &EmptyScene)
        .dispatch("blink")
        .expect_err("shape mismatch");
    assert_eq!(error.code, "DISPATCH_RETURN_MISMATCH");
    assert!(error.message.contains("blink"));
}

#[test]
fn async_command_returning_done_fails_fast() {
    let mut registry = CommandRegistry::new();
    registry
        .register_command("fade_out", CommandSignature::asynchronous(), |_invocation| {
            Ok(CommandReturn::Done)
        })
        .expect("register fade_out");
    let error = Dispatcher::new(&registry, &EmptyScene)
        .dispatch("fade_out")
        .expect_err("shape mismatch");
    assert_eq!(error.code, "DISPATCH_RETURN_MISMATCH");
}
