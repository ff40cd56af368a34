//! Coordinate Reference System handling
//!
//! Besides carrying the identifier of a CRS, this module answers the one
//! question the corridor pipeline needs before it builds any geometry: are
//! the coordinates linear (projected) or angular (geographic)?

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad family of a coordinate reference system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrsKind {
    /// Linear units (meters, feet): distances and areas are meaningful
    Projected,
    /// Angular units (degrees)
    Geographic,
    /// Not enough information to decide
    Unknown,
}

/// EPSG codes outside the 4000-4999 block that are geographic 2D/3D systems
const GEOGRAPHIC_EPSG_EXTRA: [u32; 4] = [6318, 6319, 7843, 7844];

/// Projected systems living inside the 4000-4999 block
const PROJECTED_EPSG_IN_GEOGRAPHIC_BLOCK: [(u32, u32); 2] = [(4087, 4088), (4390, 4463)];

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation (primary)
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
    /// PROJ string if available
    proj: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
            proj: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
            proj: None,
        }
    }

    /// Create a CRS from a PROJ string
    pub fn from_proj(proj: impl Into<String>) -> Self {
        Self {
            wkt: None,
            epsg: None,
            proj: Some(proj.into()),
        }
    }

    /// Parse a user or file supplied CRS name.
    ///
    /// Accepts `EPSG:26910`, `urn:ogc:def:crs:EPSG::26910`, a bare code,
    /// the OGC `CRS84` names, PROJ strings and WKT.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let upper = name.to_ascii_uppercase();
        if upper.ends_with("CRS84") || upper.ends_with("CRS:84") {
            return Some(Self::wgs84());
        }
        if name.starts_with("+proj") {
            return Some(Self::from_proj(name));
        }
        if upper.starts_with("PROJCS")
            || upper.starts_with("PROJCRS")
            || upper.starts_with("GEOGCS")
            || upper.starts_with("GEOGCRS")
        {
            return Some(Self::from_wkt(name));
        }

        let code = match upper.rfind("EPSG") {
            Some(pos) => upper[pos + 4..].rsplit(':').next().unwrap_or_default().trim(),
            None => upper.as_str(),
        };
        code.parse::<u32>().ok().map(Self::from_epsg)
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Web Mercator (EPSG:3857)
    pub fn web_mercator() -> Self {
        Self::from_epsg(3857)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Get PROJ string
    pub fn proj(&self) -> Option<&str> {
        self.proj.as_deref()
    }

    /// Classify this CRS as projected or geographic.
    pub fn kind(&self) -> CrsKind {
        if let Some(code) = self.epsg {
            return epsg_kind(code);
        }
        if let Some(wkt) = &self.wkt {
            let upper = wkt.trim_start().to_ascii_uppercase();
            if upper.starts_with("PROJCS") || upper.starts_with("PROJCRS") {
                return CrsKind::Projected;
            }
            if upper.starts_with("GEOGCS") || upper.starts_with("GEOGCRS") {
                return CrsKind::Geographic;
            }
        }
        if let Some(proj) = &self.proj {
            if proj.contains("+proj=longlat") || proj.contains("+proj=latlong") {
                return CrsKind::Geographic;
            }
            if proj.contains("+proj=") {
                return CrsKind::Projected;
            }
        }
        CrsKind::Unknown
    }

    /// Whether coordinates are in linear units
    pub fn is_projected(&self) -> bool {
        self.kind() == CrsKind::Projected
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }

        // Textual comparison is imperfect but catches identical definitions
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }

        if let (Some(a), Some(b)) = (&self.proj, &other.proj) {
            return a == b;
        }

        false
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(proj) = &self.proj {
            return proj.clone();
        }
        if let Some(wkt) = &self.wkt {
            return format!("WKT:{}", &wkt[..wkt.len().min(50)]);
        }
        "Unknown".to_string()
    }
}

fn epsg_kind(code: u32) -> CrsKind {
    if GEOGRAPHIC_EPSG_EXTRA.contains(&code) {
        return CrsKind::Geographic;
    }
    if (4000..5000).contains(&code) {
        let projected = PROJECTED_EPSG_IN_GEOGRAPHIC_BLOCK
            .iter()
            .any(|&(lo, hi)| (lo..=hi).contains(&code));
        return if projected {
            CrsKind::Projected
        } else {
            CrsKind::Geographic
        };
    }
    if (2000..=32767).contains(&code) || (102000..=104999).contains(&code) {
        return CrsKind::Projected;
    }
    CrsKind::Unknown
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}
