use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "blocktext",
    about = "Compile a JSON program AST into Scratch 3 blocks (.sb3)."
)]
pub struct Args {
    #[arg(value_name = "INPUT", help = "Program AST as JSON.")]
    pub input: PathBuf,

    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        help = "Existing .sb3 project that receives the scripts (default: empty stage and sprite)."
    )]
    pub template: Option<PathBuf>,

    #[arg(long, help = "Sprite that receives the compiled scripts (default: first sprite).")]
    pub sprite: Option<String>,

    #[arg(long, help = "Write the resulting project.json to this path.")]
    pub emit_json: Option<PathBuf>,

    #[arg(long, short, help = "Do not print progress to stderr.")]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_flags() {
        let args = Args::try_parse_from([
            "blocktext",
            "prog.json",
            "out.sb3",
            "--template",
            "base.sb3",
            "--sprite",
            "Cat",
            "--emit-json",
            "project.json",
            "-q",
        ])
        .unwrap();
        assert_eq!(args.input, PathBuf::from("prog.json"));
        assert_eq!(args.output, Some(PathBuf::from("out.sb3")));
        assert_eq!(args.sprite.as_deref(), Some("Cat"));
        assert!(args.quiet);
    }

    #[test]
    fn output_is_optional() {
        let args = Args::try_parse_from(["blocktext", "prog.json"]).unwrap();
        assert!(args.output.is_none());
        assert!(args.template.is_none());
        assert!(!args.quiet);
    }
}
