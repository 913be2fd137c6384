//! Arena indices. Every entity is addressed by a dense index into its own table.

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            pub(crate) fn new(index: usize) -> Self {
                Self(index as u32)
            }

            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

entity_id!(AssetId);
entity_id!(ThreatId);
entity_id!(
    /// Misbehaviour set
    MsId
);
entity_id!(
    /// Trustworthiness attribute set
    TwasId
);
entity_id!(
    /// Control set
    CsId
);
entity_id!(
    /// Control strategy
    CsgId
);

/// A node of the causation graph proper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeRef {
    Threat(ThreatId),
    Misbehaviour(MsId),
    Trustworthiness(TwasId),
}

impl NodeRef {
    pub fn is_threat(self) -> bool {
        matches!(self, NodeRef::Threat(_))
    }
}

/// Anything addressable by URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Asset(AssetId),
    Node(NodeRef),
    Control(CsId),
    Strategy(CsgId),
}

impl EntityRef {
    pub fn kind(self) -> &'static str {
        match self {
            EntityRef::Asset(_) => "asset",
            EntityRef::Node(NodeRef::Threat(_)) => "threat",
            EntityRef::Node(NodeRef::Misbehaviour(_)) => "misbehaviour set",
            EntityRef::Node(NodeRef::Trustworthiness(_)) => "trustworthiness attribute set",
            EntityRef::Control(_) => "control set",
            EntityRef::Strategy(_) => "control strategy",
        }
    }
}
