use std::path::PathBuf;

use thiserror::Error;

pub const USAGE: &str = "\
Usage: portal_watch [COMMAND] [--config <path>]

Commands:
  check   run one poll cycle and deliver new notifications (default)
  watch   poll repeatedly at the configured interval
  stats   print what the seen state currently holds
  reset   delete the seen state so the next cycle starts fresh";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Check,
    Watch,
    Stats,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    pub command: Command,
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CliError {
    #[error("help requested")]
    HelpRequested,
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("{0} needs a value")]
    MissingValue(&'static str),
    #[error("unexpected argument {0:?}")]
    UnexpectedArgument(String),
}

pub fn parse<I>(args: I) -> Result<Cli, CliError>
where
    I: IntoIterator<Item = String>,
{
    let mut command = None;
    let mut config = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" | "help" => return Err(CliError::HelpRequested),
            "-c" | "--config" => {
                let value = args.next().ok_or(CliError::MissingValue("--config"))?;
                config = Some(PathBuf::from(value));
            }
            other if other.starts_with("--config=") => {
                config = Some(PathBuf::from(&other["--config=".len()..]));
            }
            other if other.starts_with('-') => {
                return Err(CliError::UnexpectedArgument(other.to_string()));
            }
            other => {
                if command.is_some() {
                    return Err(CliError::UnexpectedArgument(other.to_string()));
                }
                command = Some(match other {
                    "check" => Command::Check,
                    "watch" => Command::Watch,
                    "stats" => Command::Stats,
                    "reset" => Command::Reset,
                    unknown => return Err(CliError::UnknownCommand(unknown.to_string())),
                });
            }
        }
    }

    Ok(Cli {
        command: command.unwrap_or(Command::Check),
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_arguments_means_single_check() {
        assert_eq!(
            parse(args(&[])).unwrap(),
            Cli {
                command: Command::Check,
                config: None
            }
        );
    }

    #[test]
    fn command_and_config_in_any_order() {
        let cli = parse(args(&["--config", "watch.ron", "watch"])).unwrap();
        assert_eq!(cli.command, Command::Watch);
        assert_eq!(cli.config, Some(PathBuf::from("watch.ron")));

        let cli = parse(args(&["stats", "--config=other.ron"])).unwrap();
        assert_eq!(cli.command, Command::Stats);
        assert_eq!(cli.config, Some(PathBuf::from("other.ron")));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            parse(args(&["purge"])),
            Err(CliError::UnknownCommand("purge".into()))
        );
        assert_eq!(
            parse(args(&["--config"])),
            Err(CliError::MissingValue("--config"))
        );
        assert_eq!(
            parse(args(&["check", "reset"])),
            Err(CliError::UnexpectedArgument("reset".into()))
        );
        assert_eq!(
            parse(args(&["--verbose"])),
            Err(CliError::UnexpectedArgument("--verbose".into()))
        );
        assert_eq!(parse(args(&["-h"])), Err(CliError::HelpRequested));
    }
}
