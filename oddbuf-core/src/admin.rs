//! Line-oriented administrative commands.
//!
//! ```text
//! oddbuf enable-disable <interface-name> [disable]
//! oddbuf enable-disable sw_if_index <n> [disable]
//! oddbuf configure [n_to_copy <n>] [offset <n>] [first_offset <n>]
//! oddbuf show
//! ```

use std::fmt::Write as _;

use thiserror::Error;

use crate::{ConfigUpdate, GraphEngine, InterfaceHandle, Oddbuf, ToggleError};

pub const ENABLE_DISABLE_HELP: &str = "oddbuf enable-disable <interface-name> [disable]";
pub const CONFIGURE_HELP: &str = "oddbuf configure n_to_copy <nn> offset <nn> first_offset <nn>";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdminError {
    #[error("Please specify an interface...")]
    MissingInterface,
    #[error("Unknown interface: {0}")]
    UnknownInterface(String),
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    #[error("Unexpected input: {0}")]
    UnexpectedInput(String),
    #[error("Expected a non-negative integer after '{keyword}', got {}", render_value(.value))]
    InvalidValue { keyword: String, value: Option<String> },
    #[error("{}", render_toggle_error(.0))]
    Toggle(ToggleError),
}

impl AdminError {
    /// Returns the status code of a failed toggle, if that is what this error is.
    pub const fn code(&self) -> Option<i32> {
        match self {
            Self::Toggle(e) => Some(e.code()),
            _ => None,
        }
    }
}

impl From<ToggleError> for AdminError {
    fn from(e: ToggleError) -> Self {
        Self::Toggle(e)
    }
}

fn render_value(value: &Option<String>) -> String {
    match value {
        Some(value) => format!("'{value}'"),
        None => "nothing".to_string(),
    }
}

fn render_toggle_error(e: &ToggleError) -> String {
    match e {
        ToggleError::InvalidInterface(_) => {
            "Invalid interface, only works on physical ports".to_string()
        }
        ToggleError::Unimplemented => "Device driver doesn't support redirection".to_string(),
        ToggleError::Internal(_) => format!("oddbuf_enable_disable returned {}", e.code()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceTarget {
    Name(String),
    Index(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    EnableDisable { target: InterfaceTarget, enable: bool },
    Configure(ConfigUpdate),
    Show,
}

impl AdminCommand {
    /// Parses a full command line, `oddbuf` prefix included.
    pub fn parse(line: &str) -> Result<Self, AdminError> {
        let mut tokens = line.split_whitespace();

        match (tokens.next(), tokens.next()) {
            (Some("oddbuf"), Some("enable-disable")) => parse_enable_disable(tokens),
            (Some("oddbuf"), Some("configure")) => parse_configure(tokens),
            (Some("oddbuf"), Some("show")) => match tokens.next() {
                None => Ok(Self::Show),
                Some(extra) => Err(AdminError::UnexpectedInput(extra.to_string())),
            },
            _ => Err(AdminError::UnknownCommand(line.trim().to_string())),
        }
    }
}

fn parse_enable_disable<'a>(
    mut tokens: impl Iterator<Item = &'a str>,
) -> Result<AdminCommand, AdminError> {
    let mut target = None;
    let mut enable = true;

    while let Some(token) = tokens.next() {
        match token {
            "disable" => enable = false,
            "sw_if_index" => {
                let index = parse_value(token, tokens.next())?;
                target = Some(InterfaceTarget::Index(index));
            }
            name if target.is_none() => target = Some(InterfaceTarget::Name(name.to_string())),
            other => return Err(AdminError::UnexpectedInput(other.to_string())),
        }
    }

    let target = target.ok_or(AdminError::MissingInterface)?;
    Ok(AdminCommand::EnableDisable { target, enable })
}

fn parse_configure<'a>(mut tokens: impl Iterator<Item = &'a str>) -> Result<AdminCommand, AdminError> {
    let mut update = ConfigUpdate::default();

    while let Some(keyword) = tokens.next() {
        let value = parse_value(keyword, tokens.next());
        match keyword {
            "n_to_copy" => update.copy_count = Some(value?),
            "offset" => update.second_chunk_offset = Some(value?),
            "first_offset" => update.first_chunk_offset = Some(value?),
            other => return Err(AdminError::UnexpectedInput(other.to_string())),
        }
    }

    Ok(AdminCommand::Configure(update))
}

fn parse_value(keyword: &str, value: Option<&str>) -> Result<u32, AdminError> {
    value.and_then(|v| v.parse().ok()).ok_or_else(|| AdminError::InvalidValue {
        keyword: keyword.to_string(),
        value: value.map(str::to_string),
    })
}

impl<G: GraphEngine> Oddbuf<G> {
    /// Parses and runs an administrative command line. Returns the text to show the operator,
    /// which is empty for commands that only have side effects.
    pub fn run_command(&self, line: &str) -> Result<String, AdminError> {
        let command = AdminCommand::parse(line)?;
        self.execute(command)
    }

    pub fn execute(&self, command: AdminCommand) -> Result<String, AdminError> {
        match command {
            AdminCommand::EnableDisable { target, enable } => {
                let handle = match target {
                    InterfaceTarget::Index(index) => InterfaceHandle::new(index),
                    InterfaceTarget::Name(name) => self
                        .graph()
                        .interface_by_name(&name)
                        .ok_or(AdminError::UnknownInterface(name))?,
                };

                self.set_feature(handle, enable)?;
                Ok(String::new())
            }
            AdminCommand::Configure(update) => {
                self.configure(update);
                Ok(String::new())
            }
            AdminCommand::Show => Ok(self.render_show()),
        }
    }

    fn render_show(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "oddbuf: {}", self.config());

        let feature = self.toggle().feature();
        let _ = writeln!(
            out,
            "feature: {} on {}, runs before {}, {} by default",
            feature.node_name,
            feature.arc_name,
            feature.runs_before.join(", "),
            if feature.default_disabled { "disabled" } else { "enabled" },
        );

        let periodic = self.periodic();
        match periodic.node() {
            Some(node) => {
                let _ = writeln!(
                    out,
                    "periodic process: node {node}, timeouts {}, {} wakeups, {} timeouts fired",
                    if periodic.stats().timer_enabled() { "enabled" } else { "disabled" },
                    periodic.stats().wakeups(),
                    periodic.stats().timeouts(),
                );
            }
            None => {
                let _ = writeln!(out, "periodic process: not created");
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InterfaceTable, RuntimeConfig, ODDBUF_FEATURE};

    fn oddbuf() -> Oddbuf<InterfaceTable> {
        let table = InterfaceTable::new();
        table.add_hardware_port("GigabitEthernet0/8/0").unwrap();
        table.add_virtual("loop0").unwrap();
        Oddbuf::new(table)
    }

    fn enabled(oddbuf: &Oddbuf<InterfaceTable>, name: &str) -> bool {
        let handle = oddbuf.graph().interface_by_name(name).unwrap();
        oddbuf.graph().is_stage_enabled(handle, ODDBUF_FEATURE.arc_name, ODDBUF_FEATURE.node_name)
    }

    #[test]
    fn parse_enable_disable() {
        assert_eq!(
            AdminCommand::parse("oddbuf enable-disable GigabitEthernet0/8/0").unwrap(),
            AdminCommand::EnableDisable {
                target: InterfaceTarget::Name("GigabitEthernet0/8/0".to_string()),
                enable: true,
            }
        );
        assert_eq!(
            AdminCommand::parse("oddbuf enable-disable disable sw_if_index 4").unwrap(),
            AdminCommand::EnableDisable { target: InterfaceTarget::Index(4), enable: false }
        );
        assert_eq!(
            AdminCommand::parse("oddbuf enable-disable disable"),
            Err(AdminError::MissingInterface)
        );
    }

    #[test]
    fn parse_configure_rejects_malformed_input() {
        assert!(matches!(
            AdminCommand::parse("oddbuf configure n_to_copy"),
            Err(AdminError::InvalidValue { value: None, .. })
        ));
        assert!(matches!(
            AdminCommand::parse("oddbuf configure offset -3"),
            Err(AdminError::InvalidValue { .. })
        ));
        assert_eq!(
            AdminCommand::parse("oddbuf configure bogus 1"),
            Err(AdminError::UnexpectedInput("bogus".to_string()))
        );
        assert!(matches!(AdminCommand::parse("oddbuf frobnicate"), Err(AdminError::UnknownCommand(_))));
    }

    #[test]
    fn invalid_values_render_for_operators() {
        let err = AdminCommand::parse("oddbuf configure offset x").unwrap_err();
        assert_eq!(err.to_string(), "Expected a non-negative integer after 'offset', got 'x'");

        let err = AdminCommand::parse("oddbuf configure n_to_copy").unwrap_err();
        assert_eq!(err.to_string(), "Expected a non-negative integer after 'n_to_copy', got nothing");
    }

    #[test]
    fn enable_then_disable_by_name() {
        let oddbuf = oddbuf();

        oddbuf.run_command("oddbuf enable-disable GigabitEthernet0/8/0").unwrap();
        assert!(enabled(&oddbuf, "GigabitEthernet0/8/0"));

        oddbuf.run_command("oddbuf enable-disable GigabitEthernet0/8/0 disable").unwrap();
        assert!(!enabled(&oddbuf, "GigabitEthernet0/8/0"));
    }

    #[test]
    fn renders_a_message_per_code() {
        let oddbuf = oddbuf();

        let err = oddbuf.run_command("oddbuf enable-disable loop0").unwrap_err();
        assert_eq!(err.to_string(), "Invalid interface, only works on physical ports");
        assert_eq!(err.code(), Some(-2));

        let err = oddbuf.run_command("oddbuf enable-disable sw_if_index 999").unwrap_err();
        assert_eq!(err.to_string(), "Invalid interface, only works on physical ports");

        let port = oddbuf.graph().interface_by_name("GigabitEthernet0/8/0").unwrap();
        oddbuf.graph().set_redirect_supported(port, false);
        let err = oddbuf.run_command("oddbuf enable-disable GigabitEthernet0/8/0").unwrap_err();
        assert_eq!(err.to_string(), "Device driver doesn't support redirection");

        oddbuf.graph().set_redirect_supported(port, true);
        oddbuf.graph().inject_failure(port, Some("boom".to_string()));
        let err = oddbuf.run_command("oddbuf enable-disable GigabitEthernet0/8/0").unwrap_err();
        assert_eq!(err.to_string(), "oddbuf_enable_disable returned -1");

        let err = oddbuf.run_command("oddbuf enable-disable eth9").unwrap_err();
        assert_eq!(err, AdminError::UnknownInterface("eth9".to_string()));
        assert_eq!(err.code(), None);
    }

    #[test]
    fn configure_overwrites_only_supplied_fields() {
        let oddbuf = oddbuf();

        oddbuf.run_command("oddbuf configure offset 4").unwrap();
        assert_eq!(
            oddbuf.config(),
            RuntimeConfig { copy_count: 1, first_chunk_offset: 0, second_chunk_offset: 4 }
        );

        oddbuf.run_command("oddbuf configure n_to_copy 5 first_offset 2").unwrap();
        assert_eq!(
            oddbuf.config(),
            RuntimeConfig { copy_count: 5, first_chunk_offset: 2, second_chunk_offset: 4 }
        );

        // A bad line writes nothing.
        assert!(oddbuf.run_command("oddbuf configure n_to_copy 9 offset x").is_err());
        assert_eq!(oddbuf.config().copy_count, 5);
    }

    #[test]
    fn show_renders_state() {
        let oddbuf = oddbuf();
        let out = oddbuf.run_command("oddbuf show").unwrap();

        assert!(out.contains("n_to_copy 1 first_offset 0 offset 1"));
        assert!(out.contains(
            "feature: oddbuf on device-input, runs before ethernet-input, disabled by default"
        ));
        assert!(out.contains("periodic process: not created"));
    }
}
