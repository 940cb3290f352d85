//! PLC flight recorder: polls input and output relays and publishes every
//! state, while accepting single-discrete commands on the side.

pub mod config;
pub mod poll;
pub mod publish;

pub use config::{Overrides, RecorderConfig};
pub use poll::{CycleReport, Poller, apply_command_line, handle_commands, parse_command};
pub use publish::{Bank, JsonLinesPublisher, PayloadFormat, Publisher, state_payload, state_topic};
