use callgraph_studio::commands::{execute_analyze, validate_dump_file, AnalyzeArgs};
use callgraph_studio::flamegraph::FlamegraphConfig;
use callgraph_studio::model::Identifier;
use callgraph_studio::output::read_report;
use callgraph_studio::parser::{parse_trace_dump, read_trace_dump};
use callgraph_studio::utils::config::{NestingPolicy, SCHEMA_VERSION};
use pretty_assertions::assert_eq;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

#[test]
fn test_fixture_parses() {
    let dump = read_trace_dump(fixture("two_threads.json")).unwrap();
    assert_eq!(dump.threads.len(), 2);
    assert_eq!(dump.threads[1].process_id, 5);
    assert_eq!(dump.threads[1].name, None);
    assert_eq!(dump.interval_count(), 14);
    assert!(validate_dump_file(&fixture("two_threads.json")).is_ok());
}

#[test]
fn test_analyze_writes_all_outputs() {
    let out = tempfile::tempdir().unwrap();
    let report_path = out.path().join("report.json");
    let svg_path = out.path().join("graph.svg");
    let folded_path = out.path().join("stacks.folded");

    let args = AnalyzeArgs {
        input: fixture("two_threads.json"),
        output_json: report_path.clone(),
        output_svg: Some(svg_path.clone()),
        output_collapsed: Some(folded_path.clone()),
        per_thread_roots: true,
        flamegraph_config: Some(FlamegraphConfig::new().with_title("fixture")),
        ..Default::default()
    };
    execute_analyze(args).unwrap();

    let report = read_report(&report_path).unwrap();
    assert_eq!(report.version, SCHEMA_VERSION);
    assert!(report.failures.is_empty());
    assert_eq!(report.threads.len(), 2);

    let main = &report.threads[0];
    assert_eq!((main.process_id, main.thread_id), (1, 2));
    assert_eq!(main.name.as_deref(), Some("main"));
    assert_eq!(main.total_duration, 17);
    let roots: Vec<(&str, i64)> = main
        .roots
        .iter()
        .map(|r| (r.function.as_str(), r.self_time))
        .collect();
    assert_eq!(roots, vec![("op1", 5), ("op4", 8)]);

    let worker = &report.threads[1];
    let op2 = &worker.roots[0].children[0];
    assert_eq!(op2.identifier, Identifier::symbol("op2"));
    assert_eq!((op2.calls, op2.total_duration, op2.self_time), (3, 12, 11));

    assert_eq!(report.hot_functions[0].function, "op2");
    assert_eq!(report.hot_functions[0].self_time, 14);

    let folded = std::fs::read_to_string(&folded_path).unwrap();
    let lines: Vec<&str> = folded.lines().collect();
    assert_eq!(lines[0], "thread-7;op5;op2 11");
    assert!(lines.contains(&"main-2;op1;op2;op3 1"));

    let svg = std::fs::read_to_string(&svg_path).unwrap();
    assert!(svg.contains("fixture"));
}

#[test]
fn test_analyze_reject_policy_reports_failure() {
    let out = tempfile::tempdir().unwrap();
    let input = out.path().join("dump.json");
    std::fs::write(
        &input,
        r#"[ { "thread_id": 3, "depths": {
                "1": [ { "start": 0, "end": 10, "value": "main" } ],
                "2": [ { "start": 5, "end": 15, "value": "escapes" } ] } },
             { "thread_id": 4, "depths": {
                "1": [ { "start": 0, "end": 10, "value": 4096 } ] } } ]"#,
    )
    .unwrap();
    let report_path = out.path().join("report.json");

    let args = AnalyzeArgs {
        input,
        output_json: report_path.clone(),
        nesting: NestingPolicy::Reject,
        ..Default::default()
    };
    execute_analyze(args).unwrap();

    let report = read_report(&report_path).unwrap();
    assert_eq!(report.threads.len(), 1);
    assert_eq!(report.threads[0].roots[0].function, "0x1000");
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].thread_id, 3);
    assert!(report.failures[0].error.contains("Malformed nesting"));
}

#[test]
fn test_analyze_missing_input_fails() {
    let out = tempfile::tempdir().unwrap();
    let args = AnalyzeArgs {
        input: out.path().join("absent.json"),
        output_json: out.path().join("report.json"),
        ..Default::default()
    };
    assert!(execute_analyze(args).is_err());
}

#[test]
fn test_unsorted_dump_is_invalid() {
    let json = r#"{ "threads": [ { "thread_id": 1, "depths": {
        "1": [ { "start": 5, "end": 6, "value": "b" }, { "start": 0, "end": 1, "value": "a" } ] } } ] }"#;
    assert!(parse_trace_dump(json).is_err());
}
