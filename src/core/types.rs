//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`ObjectId`] - Opaque identifier of a project object
//! - [`ObjectClass`] - The XML `class` of an object
//! - [`ManagedKind`] - The four creatable, hierarchical object namespaces
//! - [`AssetPath`] - Normalized `/`-delimited asset folder path
//! - [`SerializationModel`] - The `Studio.M.m.p` document version tag
//! - [`UtcTimestamp`] - RFC3339 timestamp
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use eventforge::core::types::{AssetPath, ObjectId, SerializationModel};
//!
//! let id = ObjectId::new("{0d4c1a3e-7e0b-4a53-a5a4-2f0d1f3d3b10}").unwrap();
//! let path = AssetPath::new("Characters/Boss").unwrap();
//! assert_eq!(path.as_str(), "Characters/Boss/");
//!
//! assert!(ObjectId::new("has space").is_err());
//! assert!(SerializationModel::new("Studio.2.x.0").is_err());
//! # let _ = id;
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid object id: {0}")]
    InvalidObjectId(String),

    #[error("invalid asset path: {0}")]
    InvalidAssetPath(String),

    #[error("invalid serialization model: {0}")]
    InvalidSerializationModel(String),

    #[error("unknown object kind: {0}")]
    UnknownKind(String),
}

/// An opaque, immutable object identifier.
///
/// The host application uses braced UUIDs, but any token that is safe to
/// use both as XML text and as a file stem is accepted:
/// - Cannot be empty
/// - Cannot contain whitespace or control characters
/// - Cannot contain `<`, `>`, `&`, `"`, `/` or `\`
///
/// # Example
///
/// ```
/// use eventforge::core::types::ObjectId;
///
/// let id = ObjectId::new("{5e2a6c1d-0000-4000-8000-000000000001}").unwrap();
/// assert_eq!(id.file_name(), "{5e2a6c1d-0000-4000-8000-000000000001}.xml");
///
/// assert!(ObjectId::new("").is_err());
/// assert!(ObjectId::new("a/b").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidObjectId` if the token is empty or contains
    /// characters that are unsafe in XML text or file names.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    fn validate(id: &str) -> Result<(), TypeError> {
        if id.is_empty() {
            return Err(TypeError::InvalidObjectId("id cannot be empty".into()));
        }
        const INVALID_CHARS: [char; 6] = ['<', '>', '&', '"', '/', '\\'];
        for c in id.chars() {
            if c.is_whitespace() || c.is_control() {
                return Err(TypeError::InvalidObjectId(format!(
                    "id cannot contain whitespace: {id:?}"
                )));
            }
            if INVALID_CHARS.contains(&c) {
                return Err(TypeError::InvalidObjectId(format!(
                    "id cannot contain '{c}': {id:?}"
                )));
            }
        }
        Ok(())
    }

    /// Create the braced form of a UUID (`{xxxxxxxx-...}`).
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        // Safe because a hyphenated uuid contains only hex digits and '-'
        Self(format!("{{{}}}", uuid.hyphenated()))
    }

    /// The file name used for a document keyed by this id (`<id>.xml`).
    pub fn file_name(&self) -> String {
        format!("{}.xml", self.0)
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ObjectId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The `class` attribute of an object element.
///
/// Classes the core reasons about have their own variant; everything else
/// round-trips untouched through [`ObjectClass::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectClass {
    Workspace,
    EventFolder,
    MasterEventFolder,
    Event,
    Bank,
    BankFolder,
    MasterBankFolder,
    MixerGroup,
    MixerMaster,
    AssetFolder,
    MasterAssetFolder,
    AudioFile,
    SingleSound,
    MultiSound,
    GroupTrack,
    MasterTrack,
    Timeline,
    EventMixer,
    EventMixerGroup,
    EventMixerMaster,
    MixerInput,
    MixerBusEffectChain,
    MixerBusPanner,
    MixerBusFader,
    Other(String),
}

impl ObjectClass {
    const KNOWN: [ObjectClass; 24] = [
        ObjectClass::Workspace,
        ObjectClass::EventFolder,
        ObjectClass::MasterEventFolder,
        ObjectClass::Event,
        ObjectClass::Bank,
        ObjectClass::BankFolder,
        ObjectClass::MasterBankFolder,
        ObjectClass::MixerGroup,
        ObjectClass::MixerMaster,
        ObjectClass::AssetFolder,
        ObjectClass::MasterAssetFolder,
        ObjectClass::AudioFile,
        ObjectClass::SingleSound,
        ObjectClass::MultiSound,
        ObjectClass::GroupTrack,
        ObjectClass::MasterTrack,
        ObjectClass::Timeline,
        ObjectClass::EventMixer,
        ObjectClass::EventMixerGroup,
        ObjectClass::EventMixerMaster,
        ObjectClass::MixerInput,
        ObjectClass::MixerBusEffectChain,
        ObjectClass::MixerBusPanner,
        ObjectClass::MixerBusFader,
    ];

    /// Parse a class attribute value. Never fails.
    pub fn parse(class: &str) -> Self {
        Self::KNOWN
            .iter()
            .find(|known| known.as_str() == class)
            .cloned()
            .unwrap_or_else(|| ObjectClass::Other(class.to_string()))
    }

    /// The class attribute value.
    pub fn as_str(&self) -> &str {
        match self {
            ObjectClass::Workspace => "Workspace",
            ObjectClass::EventFolder => "EventFolder",
            ObjectClass::MasterEventFolder => "MasterEventFolder",
            ObjectClass::Event => "Event",
            ObjectClass::Bank => "Bank",
            ObjectClass::BankFolder => "BankFolder",
            ObjectClass::MasterBankFolder => "MasterBankFolder",
            ObjectClass::MixerGroup => "MixerGroup",
            ObjectClass::MixerMaster => "MixerMaster",
            ObjectClass::AssetFolder => "AssetFolder",
            ObjectClass::MasterAssetFolder => "MasterAssetFolder",
            ObjectClass::AudioFile => "AudioFile",
            ObjectClass::SingleSound => "SingleSound",
            ObjectClass::MultiSound => "MultiSound",
            ObjectClass::GroupTrack => "GroupTrack",
            ObjectClass::MasterTrack => "MasterTrack",
            ObjectClass::Timeline => "Timeline",
            ObjectClass::EventMixer => "EventMixer",
            ObjectClass::EventMixerGroup => "EventMixerGroup",
            ObjectClass::EventMixerMaster => "EventMixerMaster",
            ObjectClass::MixerInput => "MixerInput",
            ObjectClass::MixerBusEffectChain => "MixerBusEffectChain",
            ObjectClass::MixerBusPanner => "MixerBusPanner",
            ObjectClass::MixerBusFader => "MixerBusFader",
            ObjectClass::Other(class) => class,
        }
    }

    /// The managed namespace this class is indexed under, if any.
    pub fn managed_kind(&self) -> Option<ManagedKind> {
        match self {
            ObjectClass::EventFolder => Some(ManagedKind::EventFolder),
            ObjectClass::AssetFolder => Some(ManagedKind::AssetFolder),
            ObjectClass::Bank | ObjectClass::BankFolder => Some(ManagedKind::Bank),
            ObjectClass::MixerGroup | ObjectClass::MixerMaster => Some(ManagedKind::Bus),
            _ => None,
        }
    }

    /// The `Metadata/` subdirectory holding standalone documents of this class.
    pub fn directory(&self) -> Option<&'static str> {
        match self {
            ObjectClass::EventFolder => Some("EventFolder"),
            ObjectClass::Event => Some("Event"),
            ObjectClass::Bank => Some("Bank"),
            ObjectClass::BankFolder => Some("BankFolder"),
            ObjectClass::MixerGroup => Some("Group"),
            ObjectClass::AssetFolder => Some("Asset"),
            ObjectClass::AudioFile => Some("AudioFile"),
            _ => None,
        }
    }
}

impl std::fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The four creatable object namespaces.
///
/// Each has its own index in the store and its own staging table. The
/// declaration order is the commit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ManagedKind {
    EventFolder,
    AssetFolder,
    Bank,
    Bus,
}

impl ManagedKind {
    /// All kinds, in commit order.
    pub const ALL: [ManagedKind; 4] = [
        ManagedKind::EventFolder,
        ManagedKind::AssetFolder,
        ManagedKind::Bank,
        ManagedKind::Bus,
    ];

    /// The edge that points at an object's parent, for parent-pointer kinds.
    ///
    /// Asset folders are positioned by path and have no parent edge.
    pub fn parent_edge(&self) -> Option<&'static str> {
        match self {
            ManagedKind::EventFolder | ManagedKind::Bank => Some("folder"),
            ManagedKind::Bus => Some("output"),
            ManagedKind::AssetFolder => None,
        }
    }

    /// Whether an object of `class` belongs in this kind's namespace.
    pub fn accepts(&self, class: &ObjectClass) -> bool {
        class.managed_kind() == Some(*self)
    }

    /// Directories scanned to build this kind's index.
    pub fn directories(&self) -> &'static [&'static str] {
        match self {
            ManagedKind::EventFolder => &["EventFolder"],
            ManagedKind::AssetFolder => &["Asset"],
            ManagedKind::Bank => &["BankFolder", "Bank"],
            ManagedKind::Bus => &["Group"],
        }
    }

    /// Stable kebab-case name (used by the CLI and in journals).
    pub fn as_str(&self) -> &'static str {
        match self {
            ManagedKind::EventFolder => "event-folder",
            ManagedKind::AssetFolder => "asset-folder",
            ManagedKind::Bank => "bank",
            ManagedKind::Bus => "bus",
        }
    }
}

impl std::str::FromStr for ManagedKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ManagedKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| TypeError::UnknownKind(s.to_string()))
    }
}

impl std::fmt::Display for ManagedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A normalized asset folder path.
///
/// Paths are stored in trailing-slash form (`Characters/Boss/`); the empty
/// path is the master asset folder. Ancestry is purely textual: a folder is
/// an ancestor of another when its path is a proper prefix on a component
/// boundary.
///
/// # Example
///
/// ```
/// use eventforge::core::types::AssetPath;
///
/// let boss = AssetPath::new("Characters/Boss/").unwrap();
/// let chars = AssetPath::new("Characters").unwrap();
/// assert!(chars.is_ancestor_of(&boss));
/// assert_eq!(boss.parent(), Some(chars));
/// assert_eq!(boss.name(), "Boss");
///
/// assert!(AssetPath::new("a//b").is_err());
/// assert!(AssetPath::new("../escape").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetPath(String);

impl AssetPath {
    /// Create a new normalized asset path.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidAssetPath` for empty components, `.`/`..`
    /// components, backslashes, or a leading `/`.
    pub fn new(path: impl Into<String>) -> Result<Self, TypeError> {
        let path = path.into();
        if path.is_empty() {
            return Ok(Self::root());
        }
        if path.starts_with('/') {
            return Err(TypeError::InvalidAssetPath(format!(
                "asset path must be relative: {path:?}"
            )));
        }
        if path.contains('\\') {
            return Err(TypeError::InvalidAssetPath(format!(
                "asset path must use '/': {path:?}"
            )));
        }
        let trimmed = path.strip_suffix('/').unwrap_or(&path);
        for component in trimmed.split('/') {
            if component.is_empty() {
                return Err(TypeError::InvalidAssetPath(format!(
                    "asset path has an empty component: {path:?}"
                )));
            }
            if component == "." || component == ".." {
                return Err(TypeError::InvalidAssetPath(format!(
                    "asset path cannot contain '{component}': {path:?}"
                )));
            }
            if component.chars().any(|c| c.is_control()) {
                return Err(TypeError::InvalidAssetPath(
                    "asset path cannot contain control characters".into(),
                ));
            }
        }
        Ok(Self(format!("{trimmed}/")))
    }

    /// The master asset folder path (empty).
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Path one component shorter; `None` for the root.
    pub fn parent(&self) -> Option<AssetPath> {
        if self.is_root() {
            return None;
        }
        let trimmed = &self.0[..self.0.len() - 1];
        match trimmed.rfind('/') {
            Some(idx) => Some(Self(trimmed[..=idx].to_string())),
            None => Some(Self::root()),
        }
    }

    /// Last component (the folder's display name).
    pub fn name(&self) -> &str {
        let trimmed = self.0.strip_suffix('/').unwrap_or(&self.0);
        trimmed.rsplit('/').next().unwrap_or("")
    }

    /// Number of components.
    pub fn depth(&self) -> usize {
        self.0.matches('/').count()
    }

    /// Whether `self` is a proper ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &AssetPath) -> bool {
        other.0.len() > self.0.len() && other.0.starts_with(&self.0)
    }

    /// Append a file name, producing an asset-relative file path.
    pub fn join_file(&self, file_name: &str) -> String {
        format!("{}{}", self.0, file_name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AssetPath {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<AssetPath> for String {
    fn from(path: AssetPath) -> Self {
        path.0
    }
}

impl std::fmt::Display for AssetPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_root() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// The `serializationModel` attribute (`Studio.<major>.<minor>.<patch>`).
///
/// The exact text is preserved, including zero padding, so documents written
/// by the core carry the same tag the producing application used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SerializationModel(String);

impl SerializationModel {
    const PREFIX: &'static str = "Studio.";

    pub fn new(model: impl Into<String>) -> Result<Self, TypeError> {
        let model = model.into();
        let parts = model
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| TypeError::InvalidSerializationModel(model.clone()))?;
        let numbers: Vec<&str> = parts.split('.').collect();
        let numeric = numbers
            .iter()
            .all(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()));
        if numbers.len() != 3 || !numeric {
            return Err(TypeError::InvalidSerializationModel(model));
        }
        Ok(Self(model))
    }

    /// `(major, minor, patch)` as numbers.
    pub fn version(&self) -> (u32, u32, u32) {
        let mut parts = self.0[Self::PREFIX.len()..]
            .split('.')
            .map(|n| n.parse::<u32>().unwrap_or(0));
        (
            parts.next().unwrap_or(0),
            parts.next().unwrap_or(0),
            parts.next().unwrap_or(0),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SerializationModel {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<SerializationModel> for String {
    fn from(model: SerializationModel) -> Self {
        model.0
    }
}

impl std::fmt::Display for SerializationModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A UTC timestamp, serialized as RFC3339.
///
/// # Example
///
/// ```
/// use eventforge::core::types::UtcTimestamp;
///
/// let now = UtcTimestamp::now();
/// println!("Current time: {}", now);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UtcTimestamp(chrono::DateTime<chrono::Utc>);

impl UtcTimestamp {
    /// Create a timestamp for the current moment.
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    pub fn as_datetime(&self) -> &chrono::DateTime<chrono::Utc> {
        &self.0
    }
}

impl std::fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
