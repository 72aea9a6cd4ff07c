// tau-embed - Integration tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use tau_embed::{Engine, EngineConfig, EngineError, Value};

// =============================================================================
// Basic Evaluation Tests
// =============================================================================

#[test]
fn test_eval_simple() {
    let mut engine = Engine::new();
    assert_eq!(engine.eval("1 + 2").unwrap(), Value::Int(3));
}

#[test]
fn test_eval_continues_the_same_unit() {
    let mut engine = Engine::new();
    engine.eval("x = 40").unwrap();
    engine.eval("inc = fn(n) { n + 1 }").unwrap();
    assert_eq!(engine.eval("inc(inc(x))").unwrap(), Value::Int(42));
}

#[test]
fn test_eval_string_display() {
    let mut engine = Engine::new();
    let result = engine.eval("\"a\" + \"b\"").unwrap();
    assert_eq!(result.to_string(), "ab");
    let list = engine.eval("[1, \"two\", 3.0, null]").unwrap();
    assert_eq!(list.to_string(), "[1, \"two\", 3.0, null]");
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_parse_error() {
    let mut engine = Engine::new();
    let err = engine.eval("x = )").unwrap_err();
    assert!(matches!(err, EngineError::Parse(_)), "{:?}", err);
    assert!(err.to_string().contains("unexpected )"));
}

#[test]
fn test_compile_error() {
    let mut engine = Engine::new();
    let err = engine.eval("missing + 1").unwrap_err();
    assert!(matches!(err, EngineError::Compile(_)), "{:?}", err);
    assert!(err.to_string().ends_with("undefined variable missing"));
}

#[test]
fn test_runtime_error() {
    let mut engine = Engine::new();
    let err = engine.eval("a = [1]\na + 1").unwrap_err();
    match &err {
        EngineError::Runtime(e) => assert!(matches!(
            e.root(),
            tau_embed::RuntimeError::UnsupportedOperator { .. }
        )),
        other => panic!("expected runtime error, got {:?}", other),
    }
    assert!(err.to_string().contains("at line 2"));
}

#[test]
fn test_engine_recovers_after_errors() {
    let mut engine = Engine::new();
    engine.eval("x = 1").unwrap();
    assert!(engine.eval("x % 0").is_err());
    assert!(engine.eval("y = ").is_err());
    assert_eq!(engine.eval("x + 1").unwrap(), Value::Int(2));
}

// =============================================================================
// Globals and Conversion
// =============================================================================

#[test]
fn test_get_and_set() {
    let mut engine = Engine::new();
    engine.set("limit", 10i64);
    engine.set("name", "tau");
    engine.eval("doubled = limit * 2").unwrap();
    assert_eq!(engine.get_as::<i64>("doubled"), Some(20));
    assert_eq!(engine.get_as::<String>("name"), Some("tau".to_string()));
    assert_eq!(engine.get("nothing"), None);
}

#[test]
fn test_set_overwrites() {
    let mut engine = Engine::new();
    engine.set("x", 1i64);
    engine.set("x", 2i64);
    assert_eq!(engine.eval("x").unwrap(), Value::Int(2));
}

#[test]
fn test_try_get_as() {
    let mut engine = Engine::new();
    engine.eval("x = \"text\"").unwrap();
    assert!(engine.try_get_as::<i64>("missing").unwrap().is_none());
    assert!(matches!(
        engine.try_get_as::<i64>("x"),
        Err(EngineError::Conversion { expected: "int", got: "string" })
    ));
}

#[test]
fn test_collections_round_trip_through_code() {
    let mut engine = Engine::new();
    let mut scores = BTreeMap::new();
    scores.insert("ada".to_string(), 3i64);
    scores.insert("grace".to_string(), 5i64);
    engine.set("scores", scores);
    engine.eval("scores[\"alan\"] = 4").unwrap();
    let back: BTreeMap<String, i64> = engine.get_as("scores").unwrap();
    assert_eq!(back.len(), 3);
    assert_eq!(back["alan"], 4);
}

// =============================================================================
// Calls
// =============================================================================

#[test]
fn test_call_function() {
    let mut engine = Engine::new();
    engine
        .eval("greeting = \"hello\"\ngreet = fn(name) { greeting + \" \" + name }")
        .unwrap();
    let result = engine.call("greet", &[Value::string("tau")]).unwrap();
    assert_eq!(result, Value::string("hello tau"));
}

#[test]
fn test_call_with_arguments() {
    let mut engine = Engine::new();
    engine.eval("mul = fn(a, b) { a * b }").unwrap();
    assert_eq!(
        engine.call("mul", &[Value::Int(6), Value::Int(7)]).unwrap(),
        Value::Int(42)
    );
}

#[test]
fn test_call_builtin_value() {
    let mut engine = Engine::new();
    let len = engine.eval("len").unwrap();
    let result = engine
        .call_value(&len, &[Value::string("four")])
        .unwrap();
    assert_eq!(result, Value::Int(4));
}

#[test]
fn test_call_errors() {
    let mut engine = Engine::new();
    assert!(matches!(engine.call("nope", &[]), Err(EngineError::Undefined(_))));
    engine.eval("f = fn(a) { a }").unwrap();
    assert!(matches!(engine.call("f", &[]), Err(EngineError::Runtime(_))));
    engine.eval("n = 1").unwrap();
    assert!(engine.call("n", &[]).is_err());
}

// =============================================================================
// Files
// =============================================================================

#[test]
fn test_eval_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prog.tau");
    fs::write(&path, "a = 2\nb = 3\na * b\n").unwrap();
    let mut engine = Engine::new();
    assert_eq!(engine.eval_file(&path).unwrap(), Value::Int(6));
}

#[test]
fn test_eval_file_missing() {
    let mut engine = Engine::new();
    let err = engine.eval_file("/definitely/not/here.tau").unwrap_err();
    assert!(matches!(err, EngineError::Io { .. }));
    assert!(err.to_string().starts_with("/definitely/not/here.tau"));
}

#[test]
fn test_compile_then_run_bytecode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prog.tau");
    fs::write(
        &path,
        "sq = fn(n) { n * n }\ntotal = 0\nfor i = 1; i <= 3; ++i { total += sq(i) }\ntotal\n",
    )
    .unwrap();

    let mut engine = Engine::new();
    let out = engine.compile_file(&path).unwrap();
    assert_eq!(out, dir.path().join("prog.tauc"));

    engine.eval("unrelated = [1, 2, 3]").unwrap();
    assert_eq!(engine.run_file(&out).unwrap(), Value::Int(14));
    assert_eq!(engine.eval("len(unrelated)").unwrap(), Value::Int(3));
}

#[test]
fn test_compiled_runtime_errors_keep_their_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.tau");
    fs::write(&path, "zero = 0\n\n1 % zero\n").unwrap();

    let mut engine = Engine::new();
    let out = engine.compile_file(&path).unwrap();
    let err = engine.run_file(&out).unwrap_err().to_string();
    assert!(err.contains("at line 3"), "{}", err);
    assert!(err.contains("1 % zero"), "{}", err);
}

#[test]
fn test_run_corrupt_bytecode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("junk.tauc");
    fs::write(&path, [0u8, 0, 0, 9, 1]).unwrap();
    let mut engine = Engine::new();
    assert!(matches!(engine.run_file(&path), Err(EngineError::Decode(_))));
}

#[test]
fn test_compile_file_reports_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.tau");
    fs::write(&path, "y = nope\n").unwrap();
    let engine = Engine::new();
    assert!(matches!(engine.compile_file(&path), Err(EngineError::Compile(_))));
    assert!(!dir.path().join("bad.tauc").exists());
}

#[test]
fn test_configured_lib_paths() {
    let lib = tempfile::tempdir().unwrap();
    fs::write(lib.path().join("greeting.tau"), "Hello = fn(n) { \"hi \" + n }\n").unwrap();
    let config = EngineConfig::default().with_lib_path(lib.path());
    assert_eq!(config.lib_paths[0], lib.path());

    let mut engine = Engine::with_config(config);
    let result = engine.eval("import(\"greeting\").Hello(\"tau\")").unwrap();
    assert_eq!(result, Value::string("hi tau"));
}

#[test]
fn test_path_list_is_searched_first() {
    let joined = std::env::join_paths(["/a", "/b"]).unwrap();
    let config = EngineConfig::default().with_path_list(joined.to_str().unwrap());
    let mut expected = vec![PathBuf::from("/a"), PathBuf::from("/b")];
    expected.extend(EngineConfig::default().lib_paths);
    assert_eq!(config.lib_paths, expected);

    assert_eq!(EngineConfig::default().with_path_list(""), EngineConfig::default());
}

#[test]
fn test_config_from_env_keeps_default_roots() {
    let config = EngineConfig::from_env();
    assert!(config.lib_paths.ends_with(&EngineConfig::default().lib_paths));
}

#[test]
fn test_disassemble_source_and_bytecode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inc.tau");
    fs::write(&path, "inc = fn(a) { a + 1 }\ninc(2)\n").unwrap();

    let engine = Engine::new();
    let listing = engine.disassemble_file(&path).unwrap();
    assert!(listing.contains("OpClosure"), "{}", listing);
    assert!(listing.contains("(function, 1 params, 1 locals)"), "{}", listing);
    assert!(listing.contains("OpReturnValue"), "{}", listing);

    let out = engine.compile_file(&path).unwrap();
    assert_eq!(engine.disassemble_file(&out).unwrap(), listing);
    assert!(engine.get("inc").is_none());
}
