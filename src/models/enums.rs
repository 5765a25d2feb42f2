use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The serde representation is the same string stored in the database.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(PatientStatus {
    Active => "active",
    Inactive => "inactive",
    Discharged => "discharged",
});

str_enum!(FocusTime {
    Under5Min => "under_5min",
    From5To15Min => "5_to_15min",
    From15To30Min => "15_to_30min",
    Over30Min => "over_30min",
});

str_enum!(SocialPreference {
    Alone => "alone",
    WithFamily => "with_family",
    SmallGroup => "small_group",
    LargeGroup => "large_group",
});

str_enum!(AssessmentStatus {
    Submitted => "submitted",
    Processing => "processing",
    Completed => "completed",
    Failed => "failed",
});

str_enum!(RecommendationStatus {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
});

str_enum!(GoalType {
    SixMonth => "six_month",
    Monthly => "monthly",
    Weekly => "weekly",
});

str_enum!(GoalStatus {
    Pending => "pending",
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl RecommendationStatus {
    /// Whether the external job has finished with this recommendation.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}
