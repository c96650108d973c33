//! GeoJSON-style wire geometry and serde adapters for `geo` types.
//!
//! Datasets and exported layers use the familiar `{"type": ..., "coordinates": ...}`
//! shape with `[lon, lat]` positions. Internally everything is `geo` geometry
//! with `x = lon`, `y = lat`.

use geo::{Coord, Geometry, LineString, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};

/// A `[lon, lat]` position.
pub type Position = [f64; 2];

/// The subset of GeoJSON geometry the campaign data uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum WireGeometry {
    Point(Position),
    LineString(Vec<Position>),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

pub fn to_position(coord: Coord<f64>) -> Position {
    [coord.x, coord.y]
}

pub fn to_coord(position: Position) -> Coord<f64> {
    Coord {
        x: position[0],
        y: position[1],
    }
}

fn ring_positions(ring: &LineString<f64>) -> Vec<Position> {
    ring.coords().map(|c| to_position(*c)).collect()
}

fn ring_from(positions: Vec<Position>) -> LineString<f64> {
    LineString::new(positions.into_iter().map(to_coord).collect())
}

fn polygon_rings(polygon: &Polygon<f64>) -> Vec<Vec<Position>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(ring_positions)
        .collect()
}

fn polygon_from(rings: Vec<Vec<Position>>) -> Polygon<f64> {
    let mut rings = rings.into_iter().map(ring_from);
    let exterior = rings.next().unwrap_or_else(|| LineString::new(Vec::new()));
    Polygon::new(exterior, rings.collect())
}

impl WireGeometry {
    /// Converts a `geo` geometry. Kinds outside the wire subset return `None`.
    pub fn from_geometry(geometry: &Geometry<f64>) -> Option<Self> {
        match geometry {
            Geometry::Point(p) => Some(Self::Point(to_position(p.0))),
            Geometry::LineString(line) => Some(Self::LineString(ring_positions(line))),
            Geometry::Polygon(polygon) => Some(Self::Polygon(polygon_rings(polygon))),
            Geometry::MultiPolygon(multi) => Some(Self::MultiPolygon(
                multi.iter().map(polygon_rings).collect(),
            )),
            _ => None,
        }
    }

    pub fn into_geometry(self) -> Geometry<f64> {
        match self {
            Self::Point(p) => Geometry::Point(Point(to_coord(p))),
            Self::LineString(coords) => Geometry::LineString(ring_from(coords)),
            Self::Polygon(rings) => Geometry::Polygon(polygon_from(rings)),
            Self::MultiPolygon(polygons) => Geometry::MultiPolygon(MultiPolygon::new(
                polygons.into_iter().map(polygon_from).collect(),
            )),
        }
    }
}

/// `Coord` as a bare `[lon, lat]` array.
pub mod as_coord {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(coord: &Coord<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        to_position(*coord).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Coord<f64>, D::Error> {
        Position::deserialize(deserializer).map(to_coord)
    }
}

/// `Option<Coord>` as an optional `[lon, lat]` array.
pub mod as_option_coord {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        coord: &Option<Coord<f64>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        coord.map(to_position).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Coord<f64>>, D::Error> {
        Ok(Option::<Position>::deserialize(deserializer)?.map(to_coord))
    }
}

/// `LineString` as a GeoJSON `LineString` object.
pub mod as_line_string {
    use super::*;
    use serde::de::Error as _;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        line: &LineString<f64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        WireGeometry::LineString(ring_positions(line)).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<LineString<f64>, D::Error> {
        match WireGeometry::deserialize(deserializer)? {
            WireGeometry::LineString(coords) => Ok(ring_from(coords)),
            other => Err(D::Error::custom(format!(
                "expected LineString geometry, found {}",
                kind_name(&other)
            ))),
        }
    }
}

/// Any supported `Geometry` as a GeoJSON geometry object.
pub mod as_geometry {
    use super::*;
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        geometry: &Geometry<f64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        WireGeometry::from_geometry(geometry)
            .ok_or_else(|| S::Error::custom("geometry kind has no wire representation"))?
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Geometry<f64>, D::Error> {
        let wire = WireGeometry::deserialize(deserializer)?;
        if matches!(wire, WireGeometry::Polygon(ref rings) if rings.is_empty()) {
            return Err(D::Error::custom("polygon without rings"));
        }
        Ok(wire.into_geometry())
    }
}

fn kind_name(wire: &WireGeometry) -> &'static str {
    match wire {
        WireGeometry::Point(_) => "Point",
        WireGeometry::LineString(_) => "LineString",
        WireGeometry::Polygon(_) => "Polygon",
        WireGeometry::MultiPolygon(_) => "MultiPolygon",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape_matches_geojson() {
        let wire = WireGeometry::LineString(vec![[22.5, 40.7], [26.4, 40.2]]);
        let value = serde_json::to_value(&wire).unwrap();
        assert_eq!(
            value,
            json!({"type": "LineString", "coordinates": [[22.5, 40.7], [26.4, 40.2]]})
        );
    }

    #[test]
    fn test_polygon_ring_is_closed() {
        let wire: WireGeometry = serde_json::from_value(json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]]
        }))
        .unwrap();

        let Geometry::Polygon(polygon) = wire.into_geometry() else {
            panic!("expected polygon");
        };
        let ring = polygon.exterior();
        assert_eq!(ring.0.first(), ring.0.last());
        assert_eq!(ring.0.len(), 4);
    }

    #[test]
    fn test_line_string_rejects_other_kinds() {
        #[derive(Deserialize)]
        struct Holder {
            #[serde(with = "as_line_string")]
            #[allow(dead_code)]
            geometry: LineString<f64>,
        }

        let result: Result<Holder, _> = serde_json::from_value(json!({
            "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}
        }));
        assert!(result.is_err());
    }
}
