use super::bridge::BridgeError;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use strum_macros::{Display, EnumString};

/// Every command the bridge can execute.
#[derive(Debug, Clone, PartialEq)]
pub enum AutopilotCommand {
    Arm,
    Disarm,
    SetMode(String),
    Takeoff { altitude: f64 },
    Goto { latitude: f64, longitude: f64, altitude: f64 },
    Land,
    ReturnToLaunch,
}

/// Wire tags of [`AutopilotCommand`].
#[derive(Debug, Display, EnumString, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandTag {
    Arm,
    Disarm,
    SetMode,
    Takeoff,
    Goto,
    Land,
    Rtl,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Number(f64),
    Text(String),
}

/// String-tagged command as it arrives from outside the process.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawCommand {
    pub command_type: String,
    #[serde(default)]
    pub parameters: HashMap<String, ParameterValue>,
    #[serde(default = "RawCommand::default_target")]
    pub target_system: u32,
    #[serde(default = "RawCommand::default_target")]
    pub target_component: u32,
}

impl RawCommand {
    fn default_target() -> u32 { 1 }

    pub fn new(command_type: &str) -> Self {
        Self {
            command_type: command_type.to_string(),
            parameters: HashMap::new(),
            target_system: 1,
            target_component: 1,
        }
    }

    pub fn with_number(mut self, key: &str, value: f64) -> Self {
        self.parameters.insert(key.to_string(), ParameterValue::Number(value));
        self
    }

    pub fn with_text(mut self, key: &str, value: &str) -> Self {
        self.parameters.insert(key.to_string(), ParameterValue::Text(value.to_string()));
        self
    }

    fn number(&self, tag: CommandTag, key: &'static str) -> Result<f64, BridgeError> {
        match self.parameters.get(key) {
            Some(ParameterValue::Number(n)) => Ok(*n),
            Some(ParameterValue::Text(t)) => t.trim().parse().map_err(|_| self.missing(tag, key)),
            None => Err(self.missing(tag, key)),
        }
    }

    fn text(&self, tag: CommandTag, key: &'static str) -> Result<String, BridgeError> {
        match self.parameters.get(key) {
            Some(ParameterValue::Text(t)) if !t.trim().is_empty() => Ok(t.trim().to_string()),
            _ => Err(self.missing(tag, key)),
        }
    }

    fn missing(&self, tag: CommandTag, parameter: &'static str) -> BridgeError {
        BridgeError::MissingParameter { command: tag.to_string(), parameter }
    }
}

impl TryFrom<&RawCommand> for AutopilotCommand {
    type Error = BridgeError;

    fn try_from(raw: &RawCommand) -> Result<Self, Self::Error> {
        let tag = CommandTag::from_str(raw.command_type.trim())
            .map_err(|_| BridgeError::UnknownCommand(raw.command_type.clone()))?;
        Ok(match tag {
            CommandTag::Arm => AutopilotCommand::Arm,
            CommandTag::Disarm => AutopilotCommand::Disarm,
            CommandTag::SetMode => AutopilotCommand::SetMode(raw.text(tag, "mode")?),
            CommandTag::Takeoff => AutopilotCommand::Takeoff { altitude: raw.number(tag, "altitude")? },
            CommandTag::Goto => AutopilotCommand::Goto {
                latitude: raw.number(tag, "latitude")?,
                longitude: raw.number(tag, "longitude")?,
                altitude: raw.number(tag, "altitude")?,
            },
            CommandTag::Land => AutopilotCommand::Land,
            CommandTag::Rtl => AutopilotCommand::ReturnToLaunch,
        })
    }
}

impl TryFrom<RawCommand> for AutopilotCommand {
    type Error = BridgeError;

    fn try_from(raw: RawCommand) -> Result<Self, Self::Error> { Self::try_from(&raw) }
}
