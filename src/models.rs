//! Domain enums shared by the entities and the business logic.
//!
//! Entities store these as text columns; the `as_str` values are the stored form.

use crate::errors::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Implements `Display` and `FromStr` on top of an `as_str`/`all` pair.
macro_rules! text_enum {
    ($ty:ident, $label:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_lowercase();
                Self::all()
                    .iter()
                    .copied()
                    .find(|value| value.as_str() == wanted)
                    .ok_or_else(|| Error::validation(format!("Unknown {}: {s}", $label)))
            }
        }
    };
}

/// Review state of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    /// Submitted, awaiting review
    Pending,
    /// Accepted into the program
    Approved,
    /// Refused
    Rejected,
    /// Sent back to the student for corrections
    NeedsRevision,
}

impl RegistrationStatus {
    /// Returns the string representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::NeedsRevision => "needs_revision",
        }
    }

    /// All statuses, in review order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Pending,
            Self::Approved,
            Self::Rejected,
            Self::NeedsRevision,
        ]
    }
}

text_enum!(RegistrationStatus, "registration status");

/// Lifecycle of a posto. Status only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostoStatus {
    /// Being staffed
    Draft,
    /// In the field
    Active,
    /// Finished
    Completed,
}

impl PostoStatus {
    /// Returns the string representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    /// All statuses, in lifecycle order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Draft, Self::Active, Self::Completed]
    }

    /// Check if transition to target state is valid.
    #[must_use]
    pub const fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Draft, Self::Active) | (Self::Active, Self::Completed)
        )
    }
}

text_enum!(PostoStatus, "posto status");

/// Position held by a member inside a posto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberPosition {
    /// Village coordinator
    Kordes,
    /// Secretary
    Sekretaris,
    /// Treasurer
    Bendahara,
    /// Public relations
    Humas,
    /// Publications
    Publikasi,
    /// Regular member
    Anggota,
}

impl MemberPosition {
    /// Returns the string representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Kordes => "kordes",
            Self::Sekretaris => "sekretaris",
            Self::Bendahara => "bendahara",
            Self::Humas => "humas",
            Self::Publikasi => "publikasi",
            Self::Anggota => "anggota",
        }
    }

    /// All positions.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Kordes,
            Self::Sekretaris,
            Self::Bendahara,
            Self::Humas,
            Self::Publikasi,
            Self::Anggota,
        ]
    }

    /// The leadership positions that must all be filled before a posto can go active.
    #[must_use]
    pub const fn leadership() -> &'static [Self] {
        &[Self::Kordes, Self::Sekretaris, Self::Bendahara]
    }

    /// Maximum members per posto holding this position, `None` when unbounded.
    #[must_use]
    pub const fn limit(&self) -> Option<u64> {
        match self {
            Self::Kordes | Self::Sekretaris | Self::Bendahara => Some(1),
            Self::Humas | Self::Publikasi => Some(2),
            Self::Anggota => None,
        }
    }
}

text_enum!(MemberPosition, "member position");

/// Participation state of a posto member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    /// Taking part
    Active,
    /// Temporarily not taking part
    Inactive,
    /// Left the unit
    Withdrawn,
}

impl MemberStatus {
    /// Returns the string representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Withdrawn => "withdrawn",
        }
    }

    /// All member statuses.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Active, Self::Inactive, Self::Withdrawn]
    }
}

text_enum!(MemberStatus, "member status");

/// Role supplied by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Program participant
    Student,
    /// Faculty member, eligible to supervise as DPL
    Lecturer,
    /// Program administrator
    Admin,
    /// Administrative staff
    Staff,
}

impl Role {
    /// Returns the string representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Lecturer => "lecturer",
            Self::Admin => "admin",
            Self::Staff => "staff",
        }
    }

    /// All roles.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Student, Self::Lecturer, Self::Admin, Self::Staff]
    }

    /// Admin and staff share the administrative surface.
    #[must_use]
    pub const fn is_administrative(&self) -> bool {
        matches!(self, Self::Admin | Self::Staff)
    }
}

text_enum!(Role, "role");

/// Level of an administrative region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionLevel {
    /// Provinsi
    Province,
    /// Kabupaten/kota
    City,
    /// Kecamatan
    District,
    /// Desa/kelurahan
    Village,
}

impl RegionLevel {
    /// Returns the string representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Province => "province",
            Self::City => "city",
            Self::District => "district",
            Self::Village => "village",
        }
    }

    /// All levels, top-down.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Province, Self::City, Self::District, Self::Village]
    }

    /// The level a region of this level must hang under.
    #[must_use]
    pub const fn parent_level(&self) -> Option<Self> {
        match self {
            Self::Province => None,
            Self::City => Some(Self::Province),
            Self::District => Some(Self::City),
            Self::Village => Some(Self::District),
        }
    }
}

text_enum!(RegionLevel, "region level");
