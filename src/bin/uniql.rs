use clap::Parser;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use uniql::{
    config,
    core::{Result, UniqlError},
    drivers::{self, Registry},
    env,
    handler::{Handler, Invocation, Settings},
    terminal::ConsoleTerminal,
};

#[derive(Parser, Debug)]
#[command(name = "uniql")]
#[command(author, version, about = "A universal command-line interface for SQL databases", long_about = None)]
struct Args {
    /// Connection string, e.g. sqlite3:///tmp/app.db
    dsn: Option<String>,

    /// Run only the given command (SQL or meta command); may be repeated
    #[arg(short = 'c', long = "command", value_name = "COMMAND")]
    commands: Vec<String>,

    /// Execute commands from file, then exit
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    file: Option<PathBuf>,

    /// Send query results to file
    #[arg(short = 'o', long = "out", value_name = "FILE")]
    out: Option<PathBuf>,

    /// Set variable NAME to VALUE, or unset it when no value is given
    #[arg(short = 'v', long = "set", value_name = "NAME[=VALUE]")]
    variables: Vec<String>,

    /// Database user name
    #[arg(short = 'U', long = "username")]
    username: Option<String>,

    /// Never prompt for a password
    #[arg(short = 'w', long = "no-password", conflicts_with = "force_password")]
    no_password: bool,

    /// Force a password prompt before connecting
    #[arg(short = 'W', long = "password")]
    force_password: bool,

    /// Execute as a single transaction (non-interactive only)
    #[arg(short = '1', long = "single-transaction")]
    single_transaction: bool,

    /// Do not read the rc file
    #[arg(short = 'X', long = "no-rc")]
    no_rc: bool,
}

/// Answers `uniql --has-<name>-support`, accepting either a driver name or
/// its build tag.
fn has_support(argv: &[String]) -> Option<bool> {
    if argv.len() != 2 {
        return None;
    }
    let name = argv[1]
        .strip_prefix("--has-")?
        .strip_suffix("-support")?;
    let tags = drivers::known_build_tags();
    let name = tags.get(name).copied().unwrap_or(name);
    Some(Registry::builtin().is_available(name))
}

fn run(args: Args) -> Result<()> {
    let user = match args.username.clone() {
        Some(user) => user,
        None => env::current_user()?,
    };
    let config = config::load_or_default(config::default_path().as_deref())?;
    let settings = Settings::from_config(&config);
    debug!("settings: {:?}", settings);

    let registry = Registry::builtin();
    let mut handler = Handler::new(&registry, Box::new(ConsoleTerminal), settings);
    if let Some(path) = &args.out {
        handler = handler.with_output(Box::new(File::create(path)?));
    }

    let invocation = Invocation {
        dsn: args.dsn,
        user,
        commands: args.commands,
        file: args.file,
        variables: args.variables,
        no_password: args.no_password,
        force_password: args.force_password,
        single_transaction: args.single_transaction,
        no_rc: args.no_rc,
    };
    handler.run(&invocation)
}

fn main() -> ExitCode {
    let argv: Vec<String> = std::env::args().collect();
    if let Some(supported) = has_support(&argv) {
        print!("{}", u8::from(supported));
        return match std::io::stdout().flush() {
            Ok(()) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        };
    }

    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting uniql...");

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            if let UniqlError::DriverNotAvailable(name) = &err {
                eprintln!(
                    "hint: rebuild uniql with the '{}' driver enabled",
                    drivers::build_tag_for(name)
                );
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_has_support_query() {
        assert_eq!(has_support(&argv(&["uniql", "--has-clickhouse-support"])), Some(false));
        assert_eq!(has_support(&argv(&["uniql", "--has-sapase-support"])), Some(false));
        assert_eq!(has_support(&argv(&["uniql", "sqlite3://"])), None);
        assert_eq!(
            has_support(&argv(&["uniql", "--has-sqlite3-support", "-c", "x"])),
            None
        );
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::parse_from([
            "uniql", "-1", "-c", "select 1", "-c", "select 2", "-v", "a=1", "-X", "mock://x",
        ]);
        assert!(args.single_transaction);
        assert!(args.no_rc);
        assert_eq!(args.commands.len(), 2);
        assert_eq!(args.variables, vec!["a=1".to_string()]);
        assert_eq!(args.dsn.as_deref(), Some("mock://x"));
    }

    #[test]
    fn test_password_flags_conflict() {
        assert!(Args::try_parse_from(["uniql", "-w", "-W", "mock://x"]).is_err());
    }
}
