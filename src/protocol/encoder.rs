//! # Command Encoder
//!
//! Encodes host-to-device command lines.

use super::*;

/// Encode a vibration command line
///
/// # Arguments
///
/// * `command` - Validated vibration command
///
/// # Returns
///
/// * `String` - `V,<intensity>,<durationMs>\n`
///
/// # Examples
///
/// ```
/// use airmouse_bridge::protocol::VibrationCommand;
/// use airmouse_bridge::protocol::encoder::encode_vibration_command;
///
/// let cmd = VibrationCommand::new(300, 100).unwrap();
/// assert_eq!(encode_vibration_command(&cmd), "V,255,100\n");
/// ```
pub fn encode_vibration_command(command: &VibrationCommand) -> String {
    format!(
        "{}{}{}{}{}\n",
        VIBRATION_COMMAND_TAG,
        FIELD_SEPARATOR,
        command.intensity(),
        FIELD_SEPARATOR,
        command.duration_ms()
    )
}
