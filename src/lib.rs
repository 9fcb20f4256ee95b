pub mod ast;
pub mod block;
pub mod builtins;
pub mod bundle;
pub mod error;
pub mod ident;
pub mod scope;
pub mod translate;
pub mod value;

#[cfg(not(target_arch = "wasm32"))]
pub mod cli;

#[cfg(all(target_arch = "wasm32", feature = "wasm-bindings"))]
pub mod wasm;

use anyhow::{Context, Result};
use ast::Node;
use bundle::{CompileOptions, ProjectBundle};
use std::path::{Path, PathBuf};

pub use error::{CompileError, ErrorKind};
pub use translate::compile;

#[cfg(not(target_arch = "wasm32"))]
pub fn run_cli(args: &cli::Args) -> Result<()> {
    let total_stages = 4
        + usize::from(args.emit_json.is_some())
        + usize::from(args.output.is_some());
    let progress = CliProgress::new("Compile", total_stages, args.quiet);
    let mut stage = 0usize;

    stage += 1;
    progress.emit(stage, "Reading AST");
    let input = canonicalize_file(&args.input)?;
    let program = parse_ast_file(&input)?;

    stage += 1;
    progress.emit(stage, "Loading project template");
    let mut bundle = match &args.template {
        Some(path) => ProjectBundle::read_sb3(&canonicalize_file(path)?)?,
        None => ProjectBundle::template(),
    };

    stage += 1;
    progress.emit(stage, "Translating to blocks");
    let graph = compile(&program)
        .map_err(|e| anyhow::anyhow!("Compile error in '{}': {}", pretty_path(&input), e))?;

    stage += 1;
    progress.emit(stage, "Committing blocks to project");
    let options = CompileOptions {
        sprite: args.sprite.clone(),
    };
    bundle.commit(&graph, &options)?;

    if let Some(emit_path) = &args.emit_json {
        stage += 1;
        progress.emit(stage, "Writing project.json");
        bundle.write_project_json(emit_path)?;
    }

    if let Some(output) = &args.output {
        stage += 1;
        progress.emit(stage, "Building .sb3");
        bundle.write_sb3(output)?;
        log::info!("wrote {}", pretty_path(output));
    }

    Ok(())
}

pub fn parse_ast_file(path: &Path) -> Result<Node> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'.", pretty_path(path)))?;
    Node::from_json_str(&text)
        .with_context(|| format!("'{}' is not a valid AST document.", pretty_path(path)))
}

/// Translate `program` and merge it into `bundle`. The bundle is untouched on error.
pub fn compile_into_bundle(
    program: &Node,
    bundle: &mut ProjectBundle,
    options: &CompileOptions,
) -> Result<()> {
    let graph = compile(program)?;
    bundle.commit(&graph, options)
}

pub fn compile_ast_json_to_sb3_bytes(source: &str, options: &CompileOptions) -> Result<Vec<u8>> {
    let program = Node::from_json_str(source).context("Invalid AST document.")?;
    let mut bundle = ProjectBundle::template();
    compile_into_bundle(&program, &mut bundle, options)?;
    bundle.build_sb3_bytes()
}

pub fn canonicalize_file(path: &Path) -> Result<PathBuf> {
    if !path.exists() || !path.is_file() {
        return Err(anyhow::anyhow!("Input file not found: '{}'.", path.display()));
    }
    Ok(path.canonicalize()?)
}

fn pretty_path(path: &Path) -> String {
    let raw = path.display().to_string();
    if let Some(stripped) = raw.strip_prefix(r"\\?\") {
        stripped.to_string()
    } else {
        raw
    }
}

#[cfg(not(target_arch = "wasm32"))]
struct CliProgress {
    prefix: &'static str,
    total: usize,
    quiet: bool,
}

#[cfg(not(target_arch = "wasm32"))]
impl CliProgress {
    fn new(prefix: &'static str, total: usize, quiet: bool) -> Self {
        Self {
            prefix,
            total: total.max(1),
            quiet,
        }
    }

    fn emit(&self, step: usize, label: &str) {
        if self.quiet {
            return;
        }
        let step = step.clamp(1, self.total);
        let bar = render_progress_bar(step, self.total, 14);
        eprintln!(
            "[{}] {}... ({}/{}) {}",
            self.prefix, label, step, self.total, bar
        );
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn render_progress_bar(step: usize, total: usize, width: usize) -> String {
    let width = width.max(1);
    let filled = ((step * width) + (total / 2)) / total;
    let mut s = String::with_capacity(width + 2);
    s.push('[');
    for i in 0..width {
        s.push(if i < filled { '=' } else { '-' });
    }
    s.push(']');
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_bar_fills_proportionally() {
        assert_eq!(render_progress_bar(1, 4, 8), "[==------]");
        assert_eq!(render_progress_bar(4, 4, 8), "[========]");
    }

    #[test]
    fn failed_compilation_leaves_bundle_untouched() {
        let program = Node::from_json_str(
            r#"{"type":"Program","body":[{"type":"FunctionCall","name":"foo","args":[]}]}"#,
        )
        .unwrap();
        let mut bundle = ProjectBundle::template();
        let before = bundle.project_json().clone();
        let err =
            compile_into_bundle(&program, &mut bundle, &CompileOptions::default()).unwrap_err();
        let compile_err = err.downcast_ref::<CompileError>().unwrap();
        assert_eq!(compile_err.kind, ErrorKind::UndeclaredFunction);
        assert_eq!(bundle.project_json(), &before);
    }
}
