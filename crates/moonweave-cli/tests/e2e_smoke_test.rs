use std::fs;

use tempfile::tempdir;

use moonweave_cli::{Args, run};

fn args(name: &str, path: &std::path::Path, output: Option<&std::path::Path>) -> Args {
    Args {
        name: name.to_string(),
        path: Some(path.to_string_lossy().to_string()),
        output: output.map(|p| p.to_string_lossy().to_string()),
        trace: None,
        config: None,
        log_level: "off".to_string(),
    }
}

#[test]
fn e2e_flattens_nested_fragments() {
    let scripts = tempdir().expect("Failed to create temp directory");
    let out_dir = tempdir().expect("Failed to create temp directory");

    fs::create_dir_all(scripts.path().join("lib")).unwrap();
    fs::write(
        scripts.path().join("main.lua"),
        "%key bucket\n%arg limit integer\n%include \"lib/check\"\nreturn allowed\n",
    )
    .unwrap();
    fs::write(
        scripts.path().join("lib/check.lua"),
        "local allowed = tonumber(redis.call('GET', bucket) or '0') < limit\n",
    )
    .unwrap();

    let output_path = out_dir.path().join("main.flat.lua");
    run(&args("main", scripts.path(), Some(&output_path))).expect("run failed");

    let program = fs::read_to_string(&output_path).unwrap();
    assert_eq!(
        program,
        "local bucket = KEYS[1]\n\
         local limit = tonumber(ARGV[1])\n\
         local allowed = tonumber(redis.call('GET', bucket) or '0') < limit\n\
         return allowed\n"
    );
}

#[test]
fn e2e_trace_resolves_lines() {
    let scripts = tempdir().expect("Failed to create temp directory");

    fs::write(scripts.path().join("main.lua"), "%include \"inner\"\ndone\n").unwrap();
    fs::write(scripts.path().join("inner.lua"), "one\ntwo\n").unwrap();

    let mut trace_args = args("main", scripts.path(), None);
    trace_args.trace = Some(2);

    run(&trace_args).expect("trace run failed");
}

#[test]
fn e2e_missing_fragment_fails() {
    let scripts = tempdir().expect("Failed to create temp directory");

    assert!(run(&args("missing", scripts.path(), None)).is_err());
}

#[test]
fn e2e_cyclic_fragments_fail() {
    let scripts = tempdir().expect("Failed to create temp directory");

    fs::write(scripts.path().join("a.lua"), "%include \"b\"\n").unwrap();
    fs::write(scripts.path().join("b.lua"), "%include \"a\"\n").unwrap();

    let err = run(&args("a", scripts.path(), None)).unwrap_err();
    assert!(err.to_string().contains("a -> b -> a"));
}

#[test]
fn e2e_malformed_directive_fails() {
    let scripts = tempdir().expect("Failed to create temp directory");

    fs::write(scripts.path().join("bad.lua"), "%arg x float\n").unwrap();

    assert!(run(&args("bad", scripts.path(), None)).is_err());
}
