//! Squeegee - a template-aware CSS minifier
//!
//! Usage: squeegee [OPTIONS] [FILE]

use std::env;
use std::fs;
use std::io::Read;
use std::process::ExitCode;

use squeegee_css::{compress, CompressOptions, TemplateConfig, TemplateKind};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let args: Vec<String> = env::args().collect();

    let mut options = CompressOptions::default();
    let mut template_kind: Option<TemplateKind> = None;
    let mut left_delimiters: Vec<String> = Vec::new();
    let mut right_delimiters: Vec<String> = Vec::new();
    let mut input: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage(&args[0]);
                return ExitCode::SUCCESS;
            }
            "--version" | "-V" => {
                println!("Squeegee {}", VERSION);
                return ExitCode::SUCCESS;
            }
            "--keep-comments" => options.remove_comment = false,
            "--keep-semicolons" => options.remove_last_semicolon = false,
            "--no-sort" => {
                options.sort_selector = false;
                options.sort_property = false;
            }
            "--no-merge" => {
                options.merge_selector = false;
                options.merge_property = false;
            }
            "--template" => {
                i += 1;
                let kind = match args.get(i).map(|s| s.as_str()) {
                    Some("default") => TemplateKind::Generic,
                    Some("php") => TemplateKind::PhpLike,
                    Some("smarty") => TemplateKind::SmartyLike,
                    other => {
                        eprintln!("Error: unknown template kind {:?}", other.unwrap_or(""));
                        return ExitCode::FAILURE;
                    }
                };
                template_kind = Some(kind);
            }
            "--ld" => {
                i += 1;
                match args.get(i) {
                    Some(delimiter) => left_delimiters.push(delimiter.clone()),
                    None => {
                        eprintln!("Error: --ld needs a delimiter");
                        return ExitCode::FAILURE;
                    }
                }
            }
            "--rd" => {
                i += 1;
                match args.get(i) {
                    Some(delimiter) => right_delimiters.push(delimiter.clone()),
                    None => {
                        eprintln!("Error: --rd needs a delimiter");
                        return ExitCode::FAILURE;
                    }
                }
            }
            path => {
                input = Some(path.to_string());
            }
        }
        i += 1;
    }

    if let Some(kind) = template_kind {
        match TemplateConfig::new(kind, left_delimiters, right_delimiters) {
            Ok(template) => options.template = Some(template),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else if !left_delimiters.is_empty() || !right_delimiters.is_empty() {
        eprintln!("Error: --ld/--rd need --template");
        return ExitCode::FAILURE;
    }

    let text = match read_input(input.as_deref()) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    log::debug!("compressing {} bytes", text.len());
    match compress(&text, options) {
        Ok(out) => {
            println!("{}", out);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Read the input file, or stdin when no file (or `-`) is given
fn read_input(path: Option<&str>) -> Result<String, String> {
    match path {
        Some("-") | None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| format!("failed to read stdin: {}", e))?;
            Ok(text)
        }
        Some(path) => {
            fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path, e))
        }
    }
}

fn print_usage(program: &str) {
    println!(
        r#"Squeegee {} - a template-aware CSS minifier

USAGE:
    {} [OPTIONS] [FILE]

Reads FILE (or stdin) and writes minified CSS to stdout.

OPTIONS:
    -h, --help           Print this help message
    -V, --version        Print version information
    --keep-comments      Keep all comments, not only /*! ... */
    --keep-semicolons    Keep the semicolon after the last declaration
    --no-sort            Do not reorder rules or declarations
    --no-merge           Do not merge rules or shorthand children
    --template <KIND>    Template syntax: default, php or smarty
    --ld <DELIM>         Left placeholder delimiter (repeatable)
    --rd <DELIM>         Right placeholder delimiter (repeatable)

EXAMPLES:
    {} style.css
    cat style.css | {}
    {} --template default --ld '{{%' --rd '%}}' template.css
"#,
        VERSION, program, program, program, program
    );
}
