use std::fmt;

use serde::{Deserialize, Serialize};

/// An operation a storage provider may support.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Save,
    Resave,
    Export,
    Load,
    List,
    Remove,
    Rename,
    Close,
}

impl Capability {
    pub const ALL: [Capability; 8] = [
        Self::Save,
        Self::Resave,
        Self::Export,
        Self::Load,
        Self::List,
        Self::Remove,
        Self::Rename,
        Self::Close,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Save => "save",
            Self::Resave => "resave",
            Self::Export => "export",
            Self::Load => "load",
            Self::List => "list",
            Self::Remove => "remove",
            Self::Rename => "rename",
            Self::Close => "close",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of which operations a provider supports.
///
/// Pure metadata: a host reads it to decide which affordances to offer.
/// Invoking an unsupported operation is a caller bug, not a runtime error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capabilities {
    pub save: bool,
    pub resave: bool,
    pub export: bool,
    pub load: bool,
    pub list: bool,
    pub remove: bool,
    pub rename: bool,
    pub close: bool,
}

impl Capabilities {
    /// Capabilities of a provider that persists through the host's
    /// interactive-state channel: it saves and loads but cannot browse.
    pub const fn interactive_state() -> Self {
        Self {
            save: true,
            resave: true,
            export: false,
            load: true,
            list: false,
            remove: false,
            rename: false,
            close: false,
        }
    }

    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Save => self.save,
            Capability::Resave => self.resave,
            Capability::Export => self.export,
            Capability::Load => self.load,
            Capability::List => self.list,
            Capability::Remove => self.remove,
            Capability::Rename => self.rename,
            Capability::Close => self.close,
        }
    }

    /// Supported capabilities in declaration order.
    pub fn enabled(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| self.supports(*c))
            .collect()
    }
}
