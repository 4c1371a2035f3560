use clap::{Args, Parser, Subcommand};
use htmlfmt::Formatter;
use std::path::Path;

#[derive(Parser)]
#[command(name = "htmlfmt")]
#[command(about = "htmlfmt: indent HTML without touching what's inside the tags")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Format an HTML file and print the result
    Format {
        /// Input HTML file
        path: String,

        /// Rewrite the file in place instead of printing
        #[arg(short, long)]
        write: bool,

        #[command(flatten)]
        layout: LayoutArgs,
    },

    /// Exit with status 1 if an HTML file is not already formatted
    Check {
        /// Input HTML file
        path: String,

        #[command(flatten)]
        layout: LayoutArgs,
    },
}

#[derive(Args, Debug, Clone, PartialEq)]
struct LayoutArgs {
    /// Spaces per indentation level
    #[arg(long, default_value_t = 2, conflicts_with = "tabs")]
    indent: usize,

    /// Indent with tabs
    #[arg(long)]
    tabs: bool,

    /// Attribute marking void elements that stand for a bare line break
    #[arg(long, value_name = "ATTR")]
    newline_placeholder: Option<String>,
}

impl LayoutArgs {
    fn formatter(&self) -> Formatter {
        let mut formatter = if self.tabs {
            Formatter::new().with_tab()
        } else {
            Formatter::new().with_indent(" ".repeat(self.indent))
        };
        if let Some(attribute) = &self.newline_placeholder {
            formatter = formatter.with_newline_placeholder(attribute.as_str());
        }
        formatter
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Format {
            path,
            write,
            layout,
        } => cmd_format(&path, write, &layout),
        Command::Check { path, layout } => cmd_check(&path, &layout),
    }
}

fn read_source(path: &str) -> String {
    let p = Path::new(path);
    if !p.exists() {
        eprintln!("Error: file not found: {path}");
        std::process::exit(1);
    }
    match std::fs::read_to_string(p) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading {path}: {e}");
            std::process::exit(1);
        }
    }
}

fn format_source(path: &str, source: &str, layout: &LayoutArgs) -> String {
    match layout.formatter().format_str(source) {
        Ok(formatted) => formatted,
        Err(e) => {
            eprintln!("Error formatting {path}: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_format(path: &str, write: bool, layout: &LayoutArgs) {
    let source = read_source(path);
    let formatted = format_source(path, &source, layout);

    if !write {
        print!("{formatted}");
        return;
    }

    if formatted == source {
        tracing::debug!(path, "already formatted, not rewriting");
        return;
    }
    if let Err(e) = std::fs::write(path, &formatted) {
        eprintln!("Error writing {path}: {e}");
        std::process::exit(1);
    }
    eprintln!("Formatted: {path}");
}

fn cmd_check(path: &str, layout: &LayoutArgs) {
    let source = read_source(path);
    let formatted = format_source(path, &source, layout);

    if formatted != source {
        eprintln!("Not formatted: {path}");
        std::process::exit(1);
    }

    eprintln!("OK: {path}");
}
