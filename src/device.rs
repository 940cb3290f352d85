//! Discrete (bit) devices and the commands that read and drive them.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, instrument};

use crate::protocol::{CommandCode, Error, Request, Result, Station};
use crate::transport::{Link, SharedStream};

/// Largest discrete number that fits the four-digit wire field.
pub const MAX_DISCRETE_INDEX: u16 = 9999;

/// Discrete device families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscreteKind {
    /// Input relay
    X,
    /// Output relay
    Y,
    /// Internal relay
    M,
    /// Step relay
    S,
    /// Timer contact
    T,
    /// Counter contact
    C,
}

impl DiscreteKind {
    const fn as_char(self) -> char {
        match self {
            Self::X => 'X',
            Self::Y => 'Y',
            Self::M => 'M',
            Self::S => 'S',
            Self::T => 'T',
            Self::C => 'C',
        }
    }

    const fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'X' => Some(Self::X),
            'Y' => Some(Self::Y),
            'M' => Some(Self::M),
            'S' => Some(Self::S),
            'T' => Some(Self::T),
            'C' => Some(Self::C),
            _ => None,
        }
    }
}

/// A single discrete such as `X0` or `Y12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Discrete {
    kind: DiscreteKind,
    index: u16,
}

impl Discrete {
    /// Create a discrete, checking the index range.
    pub fn new(kind: DiscreteKind, index: u16) -> Result<Self> {
        if index > MAX_DISCRETE_INDEX {
            return Err(Error::invalid("discrete", format!("{}{index}", kind.as_char())));
        }
        Ok(Self { kind, index })
    }

    /// Device family
    #[must_use]
    pub const fn kind(&self) -> DiscreteKind {
        self.kind
    }

    /// Device number
    #[must_use]
    pub const fn index(&self) -> u16 {
        self.index
    }

    /// Wire form with a four-digit number, e.g. `X0000`.
    #[must_use]
    pub fn wire(&self) -> String {
        format!("{}{:04}", self.kind.as_char(), self.index)
    }

    /// The discrete `offset` positions further on.
    pub fn offset(&self, offset: u16) -> Result<Self> {
        let index = self
            .index
            .checked_add(offset)
            .ok_or_else(|| Error::invalid("discrete", self.to_string()))?;
        Self::new(self.kind, index)
    }
}

/// Short label, e.g. `X0`.
impl fmt::Display for Discrete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.as_char(), self.index)
    }
}

impl FromStr for Discrete {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.trim().chars();
        let kind = chars
            .next()
            .and_then(DiscreteKind::from_char)
            .ok_or_else(|| Error::invalid("discrete", s))?;
        let digits = chars.as_str();
        if digits.is_empty() || digits.len() > 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid("discrete", s));
        }
        let index = digits.parse().map_err(|_| Error::invalid("discrete", s))?;
        Self::new(kind, index)
    }
}

/// Operations accepted by the discrete control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscreteAction {
    /// Let the program drive the discrete again
    Disable = 1,
    /// Freeze the discrete at its current state
    Enable = 2,
    /// Turn on
    Set = 3,
    /// Turn off
    Reset = 4,
}

impl DiscreteAction {
    /// Running code sent on the wire
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl FromStr for DiscreteAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disable" => Ok(Self::Disable),
            "enable" => Ok(Self::Enable),
            "set" | "on" | "1" => Ok(Self::Set),
            "reset" | "off" | "0" => Ok(Self::Reset),
            _ => Err(Error::invalid("action", s)),
        }
    }
}

/// Read `count` consecutive discretes starting at `start`.
///
/// Returns each discrete with its on/off state, in order.
#[instrument(level = "debug", skip(stream), fields(start = %start))]
pub fn read_discrete_states<L: Link>(
    stream: &SharedStream<L>,
    station: Station,
    start: Discrete,
    count: u8,
) -> Result<Vec<(Discrete, bool)>> {
    if count == 0 {
        return Err(Error::invalid("count", "0"));
    }
    let last = start.offset(u16::from(count) - 1)?;

    let data = format!("{count:02X}{}", start.wire());
    let request = Request::new(station, CommandCode::READ_DISCRETE_STATUS, &data)?;
    let response = stream.transact(&request)?;

    let states = response.data().as_bytes();
    if states.len() < usize::from(count) {
        return Err(Error::malformed("fewer states than requested", states));
    }

    let mut result = Vec::with_capacity(usize::from(count));
    for (i, state) in states.iter().take(usize::from(count)).enumerate() {
        let on = match state {
            b'0' => false,
            b'1' => true,
            _ => return Err(Error::malformed("state is not 0 or 1", states)),
        };
        // `i` is below `count`, so the offset was range-checked above
        result.push((start.offset(i as u16)?, on));
    }
    debug!(through = %last, "discrete states read");
    Ok(result)
}

/// Set, reset, enable or disable one discrete.
#[instrument(level = "debug", skip(stream), fields(discrete = %discrete))]
pub fn control_discrete<L: Link>(
    stream: &SharedStream<L>,
    station: Station,
    discrete: Discrete,
    action: DiscreteAction,
) -> Result<()> {
    let data = format!("{}{}", action.code(), discrete.wire());
    let request = Request::new(station, CommandCode::DISCRETE_CONTROL, &data)?;
    stream.transact(&request)?;
    debug!(?action, "discrete control accepted");
    Ok(())
}
