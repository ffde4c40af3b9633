use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::errors::{RasterError, Result};

const WGS84_PROJ4: &str = "+proj=longlat +datum=WGS84 +no_defs";
const WEB_MERCATOR_PROJ4: &str = "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +nadgrids=@null +wktext +no_defs";

/// A coordinate reference system.
///
/// Two `SpatialRef`s compare equal when their normalized definitions match, so
/// `EPSG:4326`, `+init=epsg:4326` and `+proj=longlat +datum=WGS84 +no_defs` are
/// all the same system.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpatialRef {
    normalized: String,
}

impl SpatialRef {
    /// Parse a user supplied definition: `EPSG:n`, an OGC URN, a PROJ string or WKT.
    pub fn from_definition(definition: &str) -> Result<SpatialRef> {
        let def = definition.trim();
        if def.is_empty() {
            return Err(RasterError::BadArgument(
                "Empty spatial reference definition".to_string(),
            ));
        }
        if def.starts_with('+') {
            return Self::from_proj4(def);
        }
        if let Some(code) = parse_authority_code(def) {
            return Self::from_epsg(code);
        }
        match def.to_ascii_uppercase().as_str() {
            "WGS84" | "CRS84" | "OGC:CRS84" => return Self::from_epsg(4326),
            _ => {}
        }
        let upper = def.to_ascii_uppercase();
        if ["GEOGCS[", "PROJCS[", "GEOGCRS[", "PROJCRS[", "GEODCRS["]
            .iter()
            .any(|p| upper.starts_with(p))
        {
            return Self::from_wkt(def);
        }
        Err(RasterError::BadArgument(format!(
            "Unrecognized spatial reference definition: '{def}'"
        )))
    }

    /// WKT is reduced to its outermost `AUTHORITY["EPSG", n]` (or `ID["EPSG", n]`) when present.
    pub fn from_wkt(wkt: &str) -> Result<SpatialRef> {
        let wkt = wkt.trim();
        if !wkt.ends_with(']') {
            return Err(RasterError::BadArgument(format!(
                "Malformed WKT: '{wkt}'"
            )));
        }
        match outer_wkt_authority(wkt) {
            Some(code) => Self::from_epsg(code),
            None => Ok(SpatialRef {
                normalized: wkt.split_whitespace().collect::<Vec<_>>().join(" "),
            }),
        }
    }

    pub fn from_epsg(epsg_code: u32) -> Result<SpatialRef> {
        if epsg_code == 0 {
            return Err(RasterError::BadArgument(
                "EPSG code must be positive".to_string(),
            ));
        }
        Ok(SpatialRef {
            normalized: format!("EPSG:{epsg_code}"),
        })
    }

    pub fn from_proj4(proj4_string: &str) -> Result<SpatialRef> {
        let mut params: Vec<String> = Vec::new();
        for token in proj4_string.split_whitespace() {
            let Some(param) = token.strip_prefix('+') else {
                return Err(RasterError::BadArgument(format!(
                    "Malformed PROJ string token '{token}' in '{proj4_string}'"
                )));
            };
            let param = param.to_ascii_lowercase();
            if let Some(init) = param.strip_prefix("init=") {
                if let Some(code) = parse_authority_code(init) {
                    return Self::from_epsg(code);
                }
            }
            if matches!(param.as_str(), "no_defs" | "type=crs" | "wktext") {
                continue;
            }
            params.push(param);
        }
        if params.is_empty() {
            return Err(RasterError::BadArgument(format!(
                "Empty PROJ string '{proj4_string}'"
            )));
        }
        params.sort();
        params.dedup();

        for (code, known) in [(4326, WGS84_PROJ4), (3857, WEB_MERCATOR_PROJ4)] {
            if params == canonical_params(known) {
                return Self::from_epsg(code);
            }
        }
        Ok(SpatialRef {
            normalized: params
                .iter()
                .map(|p| format!("+{p}"))
                .collect::<Vec<_>>()
                .join(" "),
        })
    }

    /// The normalized definition used for comparison.
    pub fn definition(&self) -> &str {
        &self.normalized
    }

    pub fn to_proj4(&self) -> Result<String> {
        match self.auth_code() {
            Ok(4326) => Ok(WGS84_PROJ4.to_string()),
            Ok(3857) => Ok(WEB_MERCATOR_PROJ4.to_string()),
            _ if self.normalized.starts_with('+') => Ok(format!("{} +no_defs", self.normalized)),
            _ => Err(RasterError::BadArgument(format!(
                "No PROJ string known for {}",
                self.normalized
            ))),
        }
    }

    pub fn auth_name(&self) -> Result<String> {
        self.auth_code().map(|_| "EPSG".to_string())
    }

    pub fn auth_code(&self) -> Result<i32> {
        self.normalized
            .strip_prefix("EPSG:")
            .and_then(|code| code.parse::<i32>().ok())
            .ok_or_else(|| {
                RasterError::BadArgument(format!("{} has no authority code", self.normalized))
            })
    }

    pub fn authority(&self) -> Result<String> {
        self.auth_code().map(|code| format!("EPSG:{code}"))
    }
}

impl Display for SpatialRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.normalized)
    }
}

impl FromStr for SpatialRef {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self> {
        SpatialRef::from_definition(s)
    }
}

fn canonical_params(proj4: &str) -> Vec<String> {
    let mut params: Vec<String> = proj4
        .split_whitespace()
        .filter_map(|t| t.strip_prefix('+'))
        .filter(|p| !matches!(*p, "no_defs" | "type=crs" | "wktext"))
        .map(str::to_ascii_lowercase)
        .collect();
    params.sort();
    params
}

/// `EPSG:4326`, `epsg:4326` or `urn:ogc:def:crs:EPSG::4326`.
fn parse_authority_code(def: &str) -> Option<u32> {
    let upper = def.to_ascii_uppercase();
    let rest = upper
        .strip_prefix("EPSG:")
        .or_else(|| upper.strip_prefix("URN:OGC:DEF:CRS:EPSG:"))?;
    rest.trim_start_matches(':').parse().ok()
}

/// The last top level authority of a WKT string, which names the whole system.
fn outer_wkt_authority(wkt: &str) -> Option<u32> {
    let open = wkt.find('[')?;
    let body = &wkt[open + 1..wkt.len() - 1];
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut last = None;
    for (i, c) in body.char_indices() {
        match c {
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                last = authority_node(&body[start..i]).or(last);
                start = i + 1;
            }
            _ => {}
        }
    }
    authority_node(&body[start..]).or(last)
}

fn authority_node(node: &str) -> Option<u32> {
    let node = node.trim();
    let upper = node.to_ascii_uppercase();
    let args = upper
        .strip_prefix("AUTHORITY[")
        .or_else(|| upper.strip_prefix("ID["))?
        .strip_suffix(']')?;
    let mut parts = args.split(',').map(|p| p.trim().trim_matches('"'));
    if parts.next()? != "EPSG" {
        return None;
    }
    parts.next()?.parse().ok()
}
