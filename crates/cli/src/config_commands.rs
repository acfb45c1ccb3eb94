use {
    anyhow::Result,
    clap::Subcommand,
    fimoney_config::{
        FiMoneyConfig,
        validate::{self, Severity},
    },
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Print the effective configuration (file, env overrides, CLI flags).
    Show,
}

pub fn handle_config(
    action: ConfigAction,
    config_dir: Option<&std::path::Path>,
    effective: &FiMoneyConfig,
) -> Result<()> {
    match action {
        ConfigAction::Check { verbose } => check(config_dir, verbose),
        ConfigAction::Show => {
            println!("{}", toml::to_string_pretty(effective)?);
            Ok(())
        },
    }
}

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(config_dir: Option<&std::path::Path>, verbose: bool) -> Result<()> {
    let path = fimoney_config::find_config_file(config_dir);
    let result = validate::validate(path.as_deref());

    match &result.config_path {
        Some(path) => eprintln!("Checking {}\n", path.display()),
        None => eprintln!("No config file found; checking defaults.\n"),
    }

    let mut shown = 0;
    for d in result
        .diagnostics
        .iter()
        .filter(|d| verbose || d.severity != Severity::Info)
    {
        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
            Severity::Info => CYAN,
        };
        if d.path.is_empty() {
            eprintln!("  {BOLD}{color}{}{RESET} {}", d.severity, d.message);
        } else {
            eprintln!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message);
        }
        shown += 1;
    }
    if shown > 0 {
        eprintln!();
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);
    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        anyhow::bail!("configuration has {errors} error(s)");
    }
    Ok(())
}
