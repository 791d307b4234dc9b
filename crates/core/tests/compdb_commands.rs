use indexpack_core::compdb::{
    dedupe_entries, entry_to_invocation, extract_output_key, load_compdb, split_command,
    strip_warning_switches, trim_to_compiler, CommandStyle, CompDbEntry, InvocationOptions,
};
use tempfile::tempdir;

const CC_COMPILE_COMMAND: &str = r#"clang++ -fsyntax-only -DFOO=\"foo\ bar\" -std=c++11 -Wno-c++11-narrowing  -Wall -c test.cc -o test.o"#;
const CC_COMPILE_COMMAND_WIN: &str = "clang-cl.exe --driver-mode=cl /c test.cc /Fotest.obj";

fn cc_entry() -> CompDbEntry {
    CompDbEntry {
        directory: "/build/src/out/Debug".to_string(),
        command: Some(CC_COMPILE_COMMAND.to_string()),
        arguments: vec![],
        file: "../../test.cc".to_string(),
        output: None,
    }
}

#[test]
fn posix_split_honors_escapes_and_quotes() {
    let tokens = split_command(CC_COMPILE_COMMAND, CommandStyle::Posix);
    assert_eq!(tokens[0], "clang++");
    assert_eq!(tokens[2], "-DFOO=\"foo bar\"");
    assert_eq!(tokens.last().map(String::as_str), Some("test.o"));

    let quoted = split_command("cc '-DA=a b' \"-DB=\\\"x\\\"\" done", CommandStyle::Posix);
    assert_eq!(quoted, vec!["cc", "-DA=a b", "-DB=\"x\"", "done"]);
}

#[test]
fn windows_split_keeps_backslashes_literal() {
    let tokens = split_command(
        r#"clang-cl.exe /c ..\..\test.cc "/Fo.\obj dir\test.obj""#,
        CommandStyle::Windows,
    );
    assert_eq!(tokens, vec!["clang-cl.exe", "/c", r"..\..\test.cc", r"/Fo.\obj dir\test.obj"]);
}

#[test]
fn warning_switches_are_stripped_but_lone_w_survives() {
    let tokens: Vec<String> = ["clang++", "-Wno-narrowing", "-Wall", "/W3", "/wd4244", "-w", "-c"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let stripped = strip_warning_switches(tokens);
    assert_eq!(stripped, vec!["clang++", "-w", "-c"]);
}

#[test]
fn wrapper_executables_are_trimmed_to_the_compiler() {
    let tokens: Vec<String> = ["gomacc", "/usr/bin/clang++", "-c", "test.cc"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let trimmed = trim_to_compiler(tokens.clone(), "clang");
    assert_eq!(trimmed, vec!["/usr/bin/clang++", "-c", "test.cc"]);

    // No marker: argument list passes through unchanged.
    let no_marker = trim_to_compiler(tokens, "rustc");
    assert_eq!(no_marker[0], "gomacc");
}

#[test]
fn output_key_extraction_handles_both_flavors() {
    let posix: Vec<String> = ["-c", "test.cc", "-o", "obj/test.o"].iter().map(|s| s.to_string()).collect();
    assert_eq!(extract_output_key(&posix).as_deref(), Some("obj/test.o"));

    let windows: Vec<String> = ["/c", "test.cc", "/Fotest.obj"].iter().map(|s| s.to_string()).collect();
    assert_eq!(extract_output_key(&windows).as_deref(), Some("test.obj"));

    let none: Vec<String> = ["-c", "test.cc"].iter().map(|s| s.to_string()).collect();
    assert_eq!(extract_output_key(&none), None);
}

#[test]
fn entry_conversion_matches_expected_invocation() {
    let invocation = entry_to_invocation(&cc_entry(), &InvocationOptions::default());

    let expected: Vec<String> = [
        "clang++",
        "-fsyntax-only",
        "-DFOO=\"foo bar\"",
        "-std=c++11",
        "-c",
        "test.cc",
        "-o",
        "test.o",
        "-w",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    assert_eq!(invocation.arguments, expected);
    assert_eq!(invocation.output_key, "test.o");
    assert_eq!(invocation.source_file, "../../test.cc");
    assert_eq!(invocation.language, "c++");
    assert_eq!(invocation.working_directory.to_string_lossy(), "/build/src/out/Debug");
}

#[test]
fn entry_conversion_handles_windows_commands() {
    let entry = CompDbEntry {
        command: Some(CC_COMPILE_COMMAND_WIN.to_string()),
        ..cc_entry()
    };
    let options = InvocationOptions {
        command_style: CommandStyle::Windows,
        ..InvocationOptions::default()
    };
    let invocation = entry_to_invocation(&entry, &options);

    assert_eq!(invocation.output_key, "test.obj");
    assert_eq!(
        invocation.arguments,
        vec!["clang-cl.exe", "--driver-mode=cl", "/c", "test.cc", "/Fotest.obj", "-w"]
    );
}

#[test]
fn entry_conversion_prefers_presplit_argv() {
    let entry = CompDbEntry {
        command: None,
        arguments: ["clang", "-Wall", "-c", "x.cc", "-o", "x.o"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        ..cc_entry()
    };
    let invocation = entry_to_invocation(&entry, &InvocationOptions::default());
    assert_eq!(invocation.arguments, vec!["clang", "-c", "x.cc", "-o", "x.o", "-w"]);
}

#[test]
fn explicit_output_field_wins_over_extraction() {
    let entry = CompDbEntry { output: Some("obj/explicit.o".to_string()), ..cc_entry() };
    let invocation = entry_to_invocation(&entry, &InvocationOptions::default());
    assert_eq!(invocation.output_key, "obj/explicit.o");
}

#[test]
fn repeated_entries_are_deduplicated() {
    let entries = vec![cc_entry(), cc_entry(), CompDbEntry { file: "../../other.cc".to_string(), ..cc_entry() }];
    let deduped = dedupe_entries(entries);
    assert_eq!(deduped.len(), 2);
    assert_eq!(deduped[0].file, "../../test.cc");
    assert_eq!(deduped[1].file, "../../other.cc");
}

#[test]
fn compdb_loads_from_disk_and_rejects_garbage() {
    let dir = tempdir().expect("tempdir");
    let good = dir.path().join("compdb.json");
    std::fs::write(
        &good,
        r#"[{"directory": "/b", "command": "clang -c a.cc", "file": "a.cc"}]"#,
    )
    .expect("write compdb");
    let entries = load_compdb(&good).expect("load compdb");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].file, "a.cc");

    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, "not json").expect("write bad");
    let err = load_compdb(&bad).unwrap_err();
    assert!(err.to_string().contains("Failed to parse"));

    let missing = dir.path().join("missing.json");
    let err = load_compdb(&missing).unwrap_err();
    assert!(err.to_string().contains("Failed to read"));
}
