use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PromptInputState {
    #[default]
    Unknown,
    Input,
    Execute,
}

impl PromptInputState {
    pub fn is_input(self) -> bool {
        matches!(self, Self::Input)
    }
}

/// Shell families the reconciliation heuristics know about.
///
/// Only `Fish` currently changes behaviour: it renders multi-line input
/// without a continuation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellType {
    Bash,
    Csh,
    Fish,
    Ksh,
    Sh,
    Zsh,
    #[serde(rename = "pwsh")]
    PowerShell,
    #[serde(rename = "cmd")]
    CommandPrompt,
    #[serde(rename = "gitbash")]
    GitBash,
    Wsl,
    Python,
    Julia,
    #[serde(rename = "nu")]
    NuShell,
    Node,
    Xonsh,
}

impl ShellType {
    pub const ALL: [ShellType; 15] = [
        Self::Bash,
        Self::Csh,
        Self::Fish,
        Self::Ksh,
        Self::Sh,
        Self::Zsh,
        Self::PowerShell,
        Self::CommandPrompt,
        Self::GitBash,
        Self::Wsl,
        Self::Python,
        Self::Julia,
        Self::NuShell,
        Self::Node,
        Self::Xonsh,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bash => "bash",
            Self::Csh => "csh",
            Self::Fish => "fish",
            Self::Ksh => "ksh",
            Self::Sh => "sh",
            Self::Zsh => "zsh",
            Self::PowerShell => "pwsh",
            Self::CommandPrompt => "cmd",
            Self::GitBash => "gitbash",
            Self::Wsl => "wsl",
            Self::Python => "python",
            Self::Julia => "julia",
            Self::NuShell => "nu",
            Self::Node => "node",
            Self::Xonsh => "xonsh",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|shell| shell.as_str() == normalized)
    }
}

impl std::fmt::Display for ShellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
