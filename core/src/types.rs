//! Domain types for the Pickup meetup core.
//!
//! Value objects, identifiers and the `Event` entity. The lifecycle state
//! machine over [`EventStatus`] lives in [`crate::lifecycle::engine`]; this
//! module only defines the data it operates on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to a sport managed by the (external) sports catalogue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SportId(Uuid);

impl SportId {
    /// Creates a new random `SportId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `SportId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SportId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Value Objects
// ============================================================================

/// A longitude/latitude pair in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Longitude in degrees, positive east
    pub lon: f64,
    /// Latitude in degrees, positive north
    pub lat: f64,
}

/// Mean Earth radius used for the haversine distance.
const EARTH_RADIUS_KM: f64 = 6371.0;

impl GeoPoint {
    /// Creates a new `GeoPoint`
    #[must_use]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Great-circle distance to `other` in kilometres (haversine).
    #[must_use]
    pub fn distance_km(&self, other: &Self) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lon, self.lat)
    }
}

/// A fee amount in minor currency units (cents), non-negative by construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from minor units
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in minor units
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero (a free event)
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// An ISO-4217 currency code ("EUR", "USD", ...).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Creates a `CurrencyCode`, upper-casing the input.
    ///
    /// # Errors
    ///
    /// Returns a message when the code is not three ASCII letters.
    pub fn new(code: &str) -> Result<Self, String> {
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(format!(
                "currency code must be three ASCII letters, got {code:?}"
            ));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    /// Returns the code as a string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How physically demanding an event is expected to be.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Intensity {
    /// Casual pace
    Low,
    /// Regular exercise
    Medium,
    /// Competitive pace
    High,
}

// ============================================================================
// Event Status
// ============================================================================

/// Event lifecycle status.
///
/// The `Waiting` ↔ `Full` edges are driven by membership changes; every
/// other edge is driven by a fired trigger (see
/// [`crate::lifecycle::engine`]). `Canceled` and `Finished` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventStatus {
    /// Open for players, below capacity
    Waiting,
    /// At capacity, awaiting the confirm check
    Full,
    /// Confirmed at the pre-start cutoff; roster locked
    Confirmed,
    /// Canceled at the pre-start cutoff for lack of players (terminal)
    Canceled,
    /// Started; conduct disputes and ratings may be raised
    Disputing,
    /// Ended (terminal)
    Finished,
}

impl EventStatus {
    /// Whether no further transitions can leave this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Canceled | Self::Finished)
    }

    /// Whether new players may join.
    #[must_use]
    pub const fn accepts_players(self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// Whether the event is still in the `Waiting`/`Full` sub-lifecycle
    /// where membership may change.
    #[must_use]
    pub const fn in_capacity_phase(self) -> bool {
        matches!(self, Self::Waiting | Self::Full)
    }

    /// Stable uppercase name, usable as a metrics label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "WAITING",
            Self::Full => "FULL",
            Self::Confirmed => "CONFIRMED",
            Self::Canceled => "CANCELED",
            Self::Disputing => "DISPUTING",
            Self::Finished => "FINISHED",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Versioning
// ============================================================================

/// Monotonically increasing version of a stored event record.
///
/// Every mutation is conditional on the version the writer last read, so
/// concurrent writers cannot overwrite each other's changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    /// Version assigned to a freshly inserted record.
    pub const FIRST: Self = Self(1);

    /// Creates a `Version`
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the inner value
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The version after one successful conditional write.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Event Entity
// ============================================================================

/// A scheduled sporting activity coordinated through the system.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier
    pub id: EventId,
    /// Event name (e.g., "Tuesday five-a-side")
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Where the event takes place
    pub location: GeoPoint,
    /// Sport being played
    pub sport: SportId,
    /// When the event starts
    pub start_at: DateTime<Utc>,
    /// When the event ends
    pub end_at: DateTime<Utc>,
    /// Expected intensity
    pub intensity: Intensity,
    /// Maximum number of players, at least 2
    pub max_players: u32,
    /// Participation fee per player
    pub fee: Money,
    /// Currency of the fee
    pub currency: CurrencyCode,
    /// Current lifecycle status
    pub status: EventStatus,
    /// User who created the event; authorization for update/remove keys
    /// off this field, independent of membership
    pub host: UserId,
    /// Joined players, host included at creation; order carries no meaning
    pub players: Vec<UserId>,
    /// When the event was created
    pub created_at: DateTime<Utc>,
    /// When the event was last modified
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Whether `user_id` is currently a player.
    #[must_use]
    pub fn is_player(&self, user_id: UserId) -> bool {
        self.players.contains(&user_id)
    }

    /// Current number of players.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Whether the player list has reached `max_players`.
    #[must_use]
    pub fn at_capacity(&self) -> bool {
        self.players.len() >= self.max_players as usize
    }

    /// Whether the only remaining player is the host.
    ///
    /// This is the precondition for editing or removing an event: nobody
    /// else has committed to it yet.
    #[must_use]
    pub fn sole_player_is_host(&self) -> bool {
        self.players.len() == 1 && self.players[0] == self.host
    }
}

/// An event record together with the version it was read at.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VersionedEvent {
    /// The event document
    pub event: Event,
    /// Version of the stored record
    pub version: Version,
}
