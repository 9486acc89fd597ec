use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Road,
    Lighting,
    Trash,
    Graffiti,
    Vegetation,
    Water,
    Noise,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Road,
        Category::Lighting,
        Category::Trash,
        Category::Graffiti,
        Category::Vegetation,
        Category::Water,
        Category::Noise,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Road => "road",
            Category::Lighting => "lighting",
            Category::Trash => "trash",
            Category::Graffiti => "graffiti",
            Category::Vegetation => "vegetation",
            Category::Water => "water",
            Category::Noise => "noise",
            Category::Other => "other",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Road => "Problema vial",
            Category::Lighting => "Falta de iluminación",
            Category::Trash => "Basura",
            Category::Graffiti => "Grafiti",
            Category::Vegetation => "Vegetación",
            Category::Water => "Agua",
            Category::Noise => "Ruido",
            Category::Other => "Otro",
        }
    }

    pub fn badge_class(self) -> &'static str {
        match self {
            Category::Road => "bg-orange-100 text-orange-800",
            Category::Lighting => "bg-yellow-100 text-yellow-800",
            Category::Trash => "bg-red-100 text-red-800",
            Category::Graffiti => "bg-purple-100 text-purple-800",
            Category::Vegetation => "bg-green-100 text-green-800",
            Category::Water => "bg-blue-100 text-blue-800",
            Category::Noise => "bg-indigo-100 text-indigo-800",
            Category::Other => "bg-gray-100 text-gray-800",
        }
    }

    /// Strict parse, used for user-supplied filter values.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_lowercase();
        Self::ALL.into_iter().find(|c| c.as_str() == raw)
    }

    /// Lenient parse for upstream records. Missing or unknown values become `Other`.
    pub fn from_wire(raw: Option<&str>) -> Self {
        raw.and_then(Self::parse).unwrap_or(Category::Other)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Active,
    InProgress,
    Resolved,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Active, Status::InProgress, Status::Resolved];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::InProgress => "in_progress",
            Status::Resolved => "resolved",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Active => "Activo",
            Status::InProgress => "En progreso",
            Status::Resolved => "Resuelto",
        }
    }

    pub fn badge_class(self) -> &'static str {
        match self {
            Status::Active => "bg-red-100 text-red-800",
            Status::InProgress => "bg-blue-100 text-blue-800",
            Status::Resolved => "bg-green-100 text-green-800",
        }
    }

    /// CSS class of the map marker icon.
    pub fn marker_class(self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::InProgress => "in-progress",
            Status::Resolved => "resolved",
        }
    }

    pub fn marker_color(self) -> &'static str {
        match self {
            Status::Active => "#FF453A",
            Status::InProgress => "#0A84FF",
            Status::Resolved => "#30D158",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_lowercase();
        Self::ALL.into_iter().find(|s| s.as_str() == raw)
    }

    /// Lenient parse for upstream records. Missing or unknown values become `Active`.
    pub fn from_wire(raw: Option<&str>) -> Self {
        raw.and_then(Self::parse).unwrap_or(Status::Active)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
