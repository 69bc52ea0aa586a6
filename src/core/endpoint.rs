use std::fmt;

/// Logical search target an inbound call is addressed to.
///
/// Computed once from the call's object path and passed explicitly to
/// every later stage. There is no registered object per channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// The unscoped endpoint at the provider's base path
    Default,
    /// An endpoint bound to one content channel
    Channel(String),
}

impl Endpoint {
    pub fn channel_id(&self) -> Option<&str> {
        match self {
            Endpoint::Default => None,
            Endpoint::Channel(id) => Some(id.as_str()),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Default => write!(f, "default"),
            Endpoint::Channel(id) => write!(f, "channel {id}"),
        }
    }
}
