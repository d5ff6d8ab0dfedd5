//! # Command Definitions
//!
//! The text commands understood by the terminal host, with their help text.

/// One entry in the command reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    /// Primary keyword
    pub name: &'static str,
    /// Accepted shorthands
    pub aliases: &'static [&'static str],
    pub usage: &'static str,
    pub summary: &'static str,
}

impl Command {
    /// Whether `word` names this command.
    pub fn matches(&self, word: &str) -> bool {
        self.name.eq_ignore_ascii_case(word)
            || self.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(word))
    }
}

pub const COMMANDS: &[Command] = &[
    Command {
        name: "swap",
        aliases: &["s"],
        usage: "swap <row> <col> <row> <col> | swap <row> <col> <n|s|e|w>",
        summary: "Swap two adjacent tiles",
    },
    Command {
        name: "hint",
        aliases: &["h"],
        usage: "hint",
        summary: "Play the first legal swap",
    },
    Command {
        name: "start",
        aliases: &["fight"],
        usage: "start",
        summary: "Start (or retry) the current level",
    },
    Command {
        name: "next",
        aliases: &["n"],
        usage: "next",
        summary: "Advance to the next level after a victory",
    },
    Command {
        name: "menu",
        aliases: &["flee"],
        usage: "menu",
        summary: "Abandon the encounter",
    },
    Command {
        name: "shop",
        aliases: &[],
        usage: "shop",
        summary: "List upgrades and their prices",
    },
    Command {
        name: "buy",
        aliases: &[],
        usage: "buy <upgrade>",
        summary: "Buy an upgrade outside combat",
    },
    Command {
        name: "equip",
        aliases: &[],
        usage: "equip <weapon>",
        summary: "Equip an owned weapon outside combat",
    },
    Command {
        name: "status",
        aliases: &["st"],
        usage: "status",
        summary: "Show the board and both combatants",
    },
    Command {
        name: "save",
        aliases: &[],
        usage: "save",
        summary: "Queue a save of your progress",
    },
    Command {
        name: "help",
        aliases: &["?"],
        usage: "help",
        summary: "Show this reference",
    },
    Command {
        name: "quit",
        aliases: &["q", "exit"],
        usage: "quit",
        summary: "Save and exit",
    },
];

/// Looks a command up by name or alias.
pub fn find_command(word: &str) -> Option<&'static Command> {
    COMMANDS.iter().find(|command| command.matches(word))
}

/// Renders the command reference.
pub fn help_text() -> String {
    let width = COMMANDS.iter().map(|c| c.usage.len()).max().unwrap_or(0);
    COMMANDS
        .iter()
        .map(|c| format!("  {:width$}  {}", c.usage, c.summary, width = width))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_resolve() {
        assert_eq!(find_command("Q").map(|c| c.name), Some("quit"));
        assert_eq!(find_command("s").map(|c| c.name), Some("swap"));
        assert!(find_command("dance").is_none());
    }

    #[test]
    fn test_help_lists_every_command() {
        let help = help_text();
        for command in COMMANDS {
            assert!(help.contains(command.summary));
        }
    }
}
