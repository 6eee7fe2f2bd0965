use std::path::PathBuf;

use prompt_input_protocol::error::PromptInputError;
use prompt_input_protocol::state::ShellType;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliFlags {
    pub config_path: Option<PathBuf>,
    pub shell: Option<ShellType>,
    pub session_id: Option<String>,
    /// Recording to replay; `None` reads stdin.
    pub recording: Option<PathBuf>,
    pub help: bool,
}

pub fn parse_cli_flags(
    args: impl IntoIterator<Item = String>,
) -> Result<CliFlags, PromptInputError> {
    let mut flags = CliFlags::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = read_cli_value(&arg, args.next())?;
                flags.config_path = Some(PathBuf::from(value));
            }
            "--shell" => {
                let value = read_cli_value(&arg, args.next())?;
                let shell = ShellType::parse(&value).ok_or_else(|| {
                    PromptInputError::Configuration(format!(
                        "Unknown shell '{value}'. Expected one of: {}.",
                        ShellType::ALL.map(ShellType::as_str).join(", ")
                    ))
                })?;
                flags.shell = Some(shell);
            }
            "--session" => {
                flags.session_id = Some(read_cli_value(&arg, args.next())?);
            }
            "--help" | "-h" => flags.help = true,
            "-" => set_recording(&mut flags, None)?,
            value if value.starts_with("--") => {
                return Err(PromptInputError::Configuration(format!(
                    "Unknown flag '{value}'. Run with --help for valid flags."
                )));
            }
            path => set_recording(&mut flags, Some(PathBuf::from(path)))?,
        }
    }

    Ok(flags)
}

pub fn print_cli_help() {
    println!("Usage: prompt-input-replay [--config <path>] [--shell <name>] [--session <id>] [<recording.jsonl>|-]");
    println!();
    println!("  --config <path>    Read configuration from <path> instead of the default location");
    println!("  --shell <name>     Override the configured shell type");
    println!("  --session <id>     Session id attached to printed events");
    println!("  --help             Show this help message");
    println!();
    println!("Reads the recording from stdin when no file is given.");
}

fn read_cli_value(flag: &str, value: Option<String>) -> Result<String, PromptInputError> {
    let value = value.map(|value| value.trim().to_owned()).unwrap_or_default();
    if value.is_empty() {
        return Err(PromptInputError::Configuration(format!(
            "Flag '{flag}' requires a non-empty value."
        )));
    }
    Ok(value)
}

fn set_recording(flags: &mut CliFlags, path: Option<PathBuf>) -> Result<(), PromptInputError> {
    if flags.recording.is_some() {
        return Err(PromptInputError::Configuration(
            "Only one recording can be replayed at a time.".to_owned(),
        ));
    }
    flags.recording = path;
    Ok(())
}
