use clap::{Parser as ClapParser, Subcommand};
use safe_expression::cli::{self, CheckOptions, CheckResult, CliError};
use std::io::{self, Read};
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "safexpr")]
#[command(about = "safexpr - Compile and evaluate safe expressions against JSON data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an expression and evaluate it against a JSON scope
    Check {
        /// The expression to evaluate
        expression: String,

        /// JSON scope (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// JSON locals, shadowing the scope
        #[arg(short, long)]
        locals: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Only validate syntax, don't evaluate
        #[arg(long)]
        syntax_only: bool,
    },

    /// Show what the compiler knows about an expression
    Inspect {
        /// The expression to inspect
        expression: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check {
            expression,
            input,
            locals,
            pretty,
            syntax_only,
        } => run_check(CheckOptions {
            expression,
            input,
            locals,
            pretty,
            syntax_only,
        }),
        Commands::Inspect { expression } => cli::inspect(&expression).map(|inspection| {
            println!("{inspection}");
        }),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_check(mut options: CheckOptions) -> Result<(), CliError> {
    if options.input.is_none() && !options.syntax_only && !atty::is(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        options.input = Some(buffer);
    }

    match cli::execute_check(&options)? {
        CheckResult::SyntaxValid => println!("Syntax is valid"),
        CheckResult::Success(output) => {
            let json = if options.pretty {
                serde_json::to_string_pretty(&output)
            } else {
                serde_json::to_string(&output)
            }?;
            println!("{}", json);
        }
    }
    Ok(())
}
