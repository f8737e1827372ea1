//! Help text rendering.
//!
//! Both renderers are pure functions of the frozen schema, so the same
//! parser always produces byte-identical help.

use crate::parser::Parser;
use crate::types::CommandSchema;

impl CommandSchema {
    /// Renders this command's help block.
    ///
    /// # Examples
    ///
    /// ```
    /// use command_dispatch_core::{CommandSchema, FlagSchema};
    ///
    /// let scan = CommandSchema::builder("scan")
    ///     .with_description("Scan a host")
    ///     .with_expected_args(1)
    ///     .with_arg_description("The host to scan.")
    ///     .with_flag(FlagSchema::new("--deep").with_description("Probe every address").required(true))
    ///     .handler(|_, _| Ok(None))
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(
    ///     scan.help(),
    ///     "\nName: scan\nDescription: Scan a host\nExpected args: 1\n\
    ///      \nPositional args:\n0 - The host to scan.\n\
    ///      \nFlags:\n--deep - Probe every address (required)\n"
    /// );
    /// ```
    pub fn help(&self) -> String {
        let mut text = format!(
            "\nName: {}\nDescription: {}\nExpected args: {}\n",
            self.name(),
            self.description(),
            self.expected_args()
        );

        if !self.arg_descriptions().is_empty() {
            text.push_str("\nPositional args:\n");
            for (idx, description) in self.arg_descriptions().iter().enumerate() {
                text.push_str(&format!("{idx} - {description}\n"));
            }
        }

        if !self.flags().is_empty() {
            text.push_str("\nFlags:\n");
            for flag in self.flags() {
                let suffix = if flag.is_required() { " (required)" } else { "" };
                text.push_str(&format!(
                    "{} - {}{suffix}\n",
                    flag.name(),
                    flag.description()
                ));
            }
        }

        text
    }
}

impl Parser {
    /// Renders the parser-level help: a banner with name and version, then
    /// one `<name> - <description>` line per command in registration order.
    pub fn help(&self) -> String {
        let mut text = format!("\n{} {}\n\nCommands:\n", self.name(), self.version_string());
        for command in self.commands() {
            text.push_str(&format!("{} - {}\n", command.name(), command.description()));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::Parser;
    use crate::types::{CommandSchema, FlagSchema};

    fn scan() -> CommandSchema {
        CommandSchema::builder("scan")
            .with_description("Scan a host")
            .with_expected_args(1)
            .handler(|_, _| Ok(None))
            .build()
            .unwrap()
    }

    #[test]
    fn test_command_help_without_args_or_flags() {
        assert_eq!(
            scan().help(),
            "\nName: scan\nDescription: Scan a host\nExpected args: 1\n"
        );
    }

    #[test]
    fn test_command_help_lists_flags_in_declaration_order() {
        let command = CommandSchema::builder("gather-info")
            .with_description("Gather info on a given host")
            .with_expected_args(2)
            .with_arg_description("Label for the report.")
            .with_arg_description("Number of probe attempts.")
            .with_flag(
                FlagSchema::new("--port")
                    .with_description("The port to probe")
                    .required(true),
            )
            .with_flag(FlagSchema::new("--verbose").with_description("Log every attempt"))
            .handler(|_, _| Ok(None))
            .build()
            .unwrap();

        let help = command.help();
        assert!(help.contains("\nPositional args:\n0 - Label for the report.\n1 - Number of probe attempts.\n"));
        assert!(help.ends_with("\nFlags:\n--port - The port to probe (required)\n--verbose - Log every attempt\n"));
    }

    #[test]
    fn test_help_is_deterministic() {
        let command = scan();
        assert_eq!(command.help(), command.help());

        let parser = Parser::builder("dispatch")
            .command(CommandSchema::builder("ping").handler(|_, _| Ok(None)))
            .build()
            .unwrap();
        assert_eq!(parser.help(), parser.help());
        assert_eq!(parser.to_string(), parser.to_string());
    }
}
