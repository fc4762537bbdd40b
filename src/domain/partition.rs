use std::fmt;

/// Default name of the private data collection.
pub const DEFAULT_PRIVATE_COLLECTION: &str = "CollectionOne";

/// One of the independent key spaces an asset can live in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Partition {
    /// Ordinary world state, readable by every ledger participant
    Public,
    /// Private data collection, fed from transient input only
    Private { collection: String },
}

impl Partition {
    pub fn private(collection: impl Into<String>) -> Self {
        Partition::Private {
            collection: collection.into(),
        }
    }

    /// Store namespace backing this partition.
    pub fn namespace(&self) -> String {
        match self {
            Partition::Public => "public".to_string(),
            Partition::Private { collection } => format!("private:{}", collection),
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.namespace())
    }
}
