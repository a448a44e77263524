use std::fmt::Write as _;
use std::str::FromStr;

use poi_core::{Category, GeoPoint};
use thiserror::Error;

/// Server-side evaluation limit written into every query header.
pub const QUERY_TIMEOUT_SECS: u32 = 25;

/// Bounding box in Overpass order: south, west, north, east.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryArea {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid bounding box `{input}`: {reason}")]
pub struct InvalidArea {
    pub input: String,
    pub reason: &'static str,
}

impl QueryArea {
    /// Kolkata and its immediate surroundings.
    pub const DEFAULT: QueryArea = QueryArea {
        south: 22.45,
        west: 88.25,
        north: 22.65,
        east: 88.45,
    };

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new((self.west + self.east) / 2.0, (self.south + self.north) / 2.0)
    }
}

impl Default for QueryArea {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FromStr for QueryArea {
    type Err = InvalidArea;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| InvalidArea {
            input: s.to_string(),
            reason,
        };
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid("expected four comma-separated numbers"))?;
        let [south, west, north, east] = parts[..] else {
            return Err(invalid("expected four comma-separated numbers"));
        };
        if !(-90.0..=90.0).contains(&south) || !(-90.0..=90.0).contains(&north) {
            return Err(invalid("latitude out of range"));
        }
        if !(-180.0..=180.0).contains(&west) || !(-180.0..=180.0).contains(&east) {
            return Err(invalid("longitude out of range"));
        }
        if south >= north || west >= east {
            return Err(invalid("south/west must be below north/east"));
        }
        Ok(Self {
            south,
            west,
            north,
            east,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFilter {
    Equals(&'static str, &'static str),
    Exists(&'static str),
}

impl TagFilter {
    fn selector(&self) -> String {
        match self {
            TagFilter::Equals(key, value) => format!("[\"{key}\"=\"{value}\"]"),
            TagFilter::Exists(key) => format!("[\"{key}\"]"),
        }
    }
}

const LODGING_FILTERS: &[TagFilter] = &[
    TagFilter::Equals("tourism", "hotel"),
    TagFilter::Equals("tourism", "guest_house"),
    TagFilter::Equals("tourism", "hostel"),
];

const DINING_FILTERS: &[TagFilter] = &[
    TagFilter::Equals("amenity", "restaurant"),
    TagFilter::Equals("amenity", "cafe"),
    TagFilter::Equals("amenity", "fast_food"),
];

const ATTRACTION_FILTERS: &[TagFilter] = &[
    TagFilter::Equals("tourism", "attraction"),
    TagFilter::Equals("tourism", "museum"),
    TagFilter::Equals("tourism", "gallery"),
    TagFilter::Equals("tourism", "viewpoint"),
    TagFilter::Exists("historic"),
    TagFilter::Equals("amenity", "place_of_worship"),
    TagFilter::Equals("leisure", "park"),
];

const SPORTS_FILTERS: &[TagFilter] = &[
    TagFilter::Equals("leisure", "sports_centre"),
    TagFilter::Equals("leisure", "stadium"),
    TagFilter::Equals("leisure", "pitch"),
    TagFilter::Equals("leisure", "fitness_centre"),
    TagFilter::Equals("leisure", "swimming_pool"),
];

/// Tag filters fetched for a sourced category; empty for synthetic ones.
pub fn filters_for(category: Category) -> &'static [TagFilter] {
    match category {
        Category::Lodging => LODGING_FILTERS,
        Category::Dining => DINING_FILTERS,
        Category::Attractions => ATTRACTION_FILTERS,
        Category::Sports => SPORTS_FILTERS,
        Category::Events | Category::Promotions => &[],
    }
}

/// Overpass QL for `category` within `area`, or `None` when the category is not sourced.
pub fn build_query(category: Category, area: &QueryArea) -> Option<String> {
    let filters = filters_for(category);
    if filters.is_empty() {
        return None;
    }
    let bbox = format!("({},{},{},{})", area.south, area.west, area.north, area.east);
    let mut query = format!("[out:json][timeout:{QUERY_TIMEOUT_SECS}];\n(\n");
    for filter in filters {
        let selector = filter.selector();
        for element in ["node", "way"] {
            // Writing into a String cannot fail.
            let _ = writeln!(query, "  {element}{selector}{bbox};");
        }
    }
    query.push_str(");\nout center;\n");
    Some(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lodging_query_matches_overpass_grammar() {
        let area = QueryArea {
            south: 22.5,
            west: 88.3,
            north: 23.0,
            east: 88.4,
        };
        let expected = concat!(
            "[out:json][timeout:25];\n",
            "(\n",
            "  node[\"tourism\"=\"hotel\"](22.5,88.3,23,88.4);\n",
            "  way[\"tourism\"=\"hotel\"](22.5,88.3,23,88.4);\n",
            "  node[\"tourism\"=\"guest_house\"](22.5,88.3,23,88.4);\n",
            "  way[\"tourism\"=\"guest_house\"](22.5,88.3,23,88.4);\n",
            "  node[\"tourism\"=\"hostel\"](22.5,88.3,23,88.4);\n",
            "  way[\"tourism\"=\"hostel\"](22.5,88.3,23,88.4);\n",
            ");\n",
            "out center;\n",
        );
        assert_eq!(build_query(Category::Lodging, &area).as_deref(), Some(expected));
    }

    #[test]
    fn presence_filters_have_no_value() {
        let query = build_query(Category::Attractions, &QueryArea::DEFAULT).unwrap();
        assert!(query.contains("  node[\"historic\"](22.45,88.25,22.65,88.45);\n"));
        assert!(query.contains("way[\"amenity\"=\"place_of_worship\"]"));
        assert_eq!(query.matches("node[").count(), ATTRACTION_FILTERS.len());
    }

    #[test]
    fn synthetic_categories_have_no_query() {
        assert!(build_query(Category::Events, &QueryArea::DEFAULT).is_none());
        assert!(build_query(Category::Promotions, &QueryArea::DEFAULT).is_none());
    }

    #[test]
    fn area_parses_from_env_style_string() {
        let area: QueryArea = " 22.45, 88.25 ,22.65,88.45".parse().unwrap();
        assert_eq!(area, QueryArea::DEFAULT);
        assert!("1,2,3".parse::<QueryArea>().is_err());
        assert!("22.65,88.25,22.45,88.45".parse::<QueryArea>().is_err());
        assert!("a,b,c,d".parse::<QueryArea>().is_err());
    }
}
