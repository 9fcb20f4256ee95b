use blocktext_core::bundle::{CompileOptions, ProjectBundle};
use blocktext_core::cli::Args;
use blocktext_core::{compile_ast_json_to_sb3_bytes, run_cli};
use std::fs;
use tempfile::tempdir;

const SAY_HELLO: &str = r#"{
    "type": "Program",
    "body": [
        {"type": "VariableDeclaration", "name": "greeting", "is_const": true,
         "value": {"type": "String", "value": "hello"}},
        {"type": "FunctionDeclaration", "name": "shout", "args": ["what"], "body": [
            {"type": "FunctionCall", "name": "looks_say", "args": [
                {"type": "Identifier", "name": "what"}
            ]}
        ]},
        {"type": "FunctionCall", "name": "shout", "args": [
            {"type": "Identifier", "name": "greeting"}
        ]}
    ]
}"#;

fn args(input: &std::path::Path) -> Args {
    Args {
        input: input.to_path_buf(),
        output: None,
        template: None,
        sprite: None,
        emit_json: None,
        quiet: true,
    }
}

#[test]
fn cli_writes_a_readable_sb3() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("prog.json");
    let output = dir.path().join("out").join("prog.sb3");
    let emitted = dir.path().join("project.json");
    fs::write(&input, SAY_HELLO).unwrap();

    let mut cli = args(&input);
    cli.output = Some(output.clone());
    cli.emit_json = Some(emitted.clone());
    run_cli(&cli).unwrap();

    let bundle = ProjectBundle::read_sb3(&output).unwrap();
    let blocks = bundle.blocks(&CompileOptions::default()).unwrap();
    assert!(blocks
        .values()
        .any(|b| b["opcode"] == "procedures_definition"));
    assert_eq!(bundle.variables().unwrap().len(), 1);

    let text = fs::read_to_string(&emitted).unwrap();
    let on_disk: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(&on_disk, bundle.project_json());
}

#[test]
fn cli_reports_compile_errors() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("bad.json");
    let output = dir.path().join("bad.sb3");
    fs::write(
        &input,
        r#"{"type":"Program","body":[{"type":"FunctionCall","name":"foo","args":[]}]}"#,
    )
    .unwrap();

    let mut cli = args(&input);
    cli.output = Some(output.clone());
    let err = run_cli(&cli).unwrap_err();
    assert!(err.to_string().contains("UndeclaredFunction"));
    assert!(!output.exists());
}

#[test]
fn cli_rejects_missing_and_malformed_input() {
    let dir = tempdir().unwrap();
    assert!(run_cli(&args(&dir.path().join("missing.json"))).is_err());

    let input = dir.path().join("broken.json");
    fs::write(&input, r#"{"type":"Spaceship"}"#).unwrap();
    assert!(run_cli(&args(&input)).is_err());
}

#[test]
fn template_projects_receive_scripts_on_the_named_sprite() {
    let dir = tempdir().unwrap();
    let template_path = dir.path().join("base.sb3");
    let mut project = ProjectBundle::template().project_json().clone();
    let mut second = project["targets"][1].clone();
    second["name"] = serde_json::json!("Cat");
    second["layerOrder"] = serde_json::json!(2);
    project["targets"].as_array_mut().unwrap().push(second);
    ProjectBundle::from_project_json(project)
        .unwrap()
        .write_sb3(&template_path)
        .unwrap();

    let input = dir.path().join("prog.json");
    let output = dir.path().join("prog.sb3");
    fs::write(&input, SAY_HELLO).unwrap();
    let mut cli = args(&input);
    cli.template = Some(template_path);
    cli.sprite = Some("Cat".to_string());
    cli.output = Some(output.clone());
    run_cli(&cli).unwrap();

    let bundle = ProjectBundle::read_sb3(&output).unwrap();
    let cat = CompileOptions {
        sprite: Some("Cat".to_string()),
    };
    assert!(!bundle.blocks(&cat).unwrap().is_empty());
    assert!(bundle.blocks(&CompileOptions::default()).unwrap().is_empty());
}

#[test]
fn in_memory_compile_is_deterministic() {
    let options = CompileOptions::default();
    let first = compile_ast_json_to_sb3_bytes(SAY_HELLO, &options).unwrap();
    let second = compile_ast_json_to_sb3_bytes(SAY_HELLO, &options).unwrap();
    let a = ProjectBundle::read_sb3_bytes(&first).unwrap();
    let b = ProjectBundle::read_sb3_bytes(&second).unwrap();
    assert_eq!(a.project_json(), b.project_json());
}
