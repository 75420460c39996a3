//! Folding ordered result rows into coverage output.
//!
//! Rows arrive sorted by location, parameter and time. The mapper walks them
//! once, starting a new location whenever the location id changes.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, warn};

use edr_protocol::{
    CovJsonParameter, CoverageCollection, CoverageJson, Domain, Feature, FeatureCollection,
    Geometry, LocationProperties, Parameter, QueryGeometry, Unit,
};

use crate::builder::{
    COL_GEOMETRY, COL_LOCATION_ID, COL_PARAMETER_ID, COL_PARAMETER_NAME, COL_PARAMETER_UNIT,
    COL_ROW_ID, COL_TIME, COL_TIME_MAX, COL_TIME_MIN, COL_VALUE,
};
use crate::error::{ProviderError, ProviderResult};
use crate::executor::{Row, SqlValue};

fn column<'r>(row: &'r Row, name: &str) -> ProviderResult<&'r SqlValue> {
    row.get(name).ok_or_else(|| {
        ProviderError::QueryExecution(format!("Result row is missing column '{}'", name))
    })
}

fn required_text(row: &Row, name: &str) -> ProviderResult<String> {
    column(row, name)?.as_text().ok_or_else(|| {
        ProviderError::QueryExecution(format!("Result row has null '{}'", name))
    })
}

/// One observation row, read by projection column name.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub row_id: Option<String>,
    pub location_id: String,
    pub geometry: Option<String>,
    pub time: Option<NaiveDateTime>,
    pub parameter_id: String,
    pub parameter_name: Option<String>,
    pub parameter_unit: Option<String>,
    pub value: Option<f64>,
}

impl ResultRow {
    pub fn from_row(row: &Row) -> ProviderResult<Self> {
        Ok(Self {
            row_id: column(row, COL_ROW_ID)?.as_text(),
            location_id: required_text(row, COL_LOCATION_ID)?,
            geometry: column(row, COL_GEOMETRY)?.as_text(),
            time: column(row, COL_TIME)?.as_timestamp(),
            parameter_id: required_text(row, COL_PARAMETER_ID)?,
            parameter_name: column(row, COL_PARAMETER_NAME)?.as_text(),
            parameter_unit: column(row, COL_PARAMETER_UNIT)?.as_text(),
            value: column(row, COL_VALUE)?.as_f64(),
        })
    }
}

/// A single `{time, value}` sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedValue {
    pub time: Option<NaiveDateTime>,
    pub value: Option<f64>,
}

/// Values of one parameter at one location, in time order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSeries {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub values: Vec<TimedValue>,
}

impl ParameterSeries {
    /// The values alone, in time order.
    pub fn numbers(&self) -> Vec<Option<f64>> {
        self.values.iter().map(|v| v.value).collect()
    }
}

/// Everything observed at one location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationCoverage {
    pub id: String,
    /// WKT as returned by the database.
    pub geometry: Option<String>,
    pub parameters: BTreeMap<String, ParameterSeries>,
}

impl LocationCoverage {
    fn start(row: &ResultRow) -> Self {
        Self {
            id: row.location_id.clone(),
            geometry: row.geometry.clone(),
            parameters: BTreeMap::new(),
        }
    }

    fn push(&mut self, row: ResultRow) {
        if self.geometry.is_none() {
            self.geometry = row.geometry;
        }
        let series = self
            .parameters
            .entry(row.parameter_id)
            .or_insert_with(|| ParameterSeries {
                name: row.parameter_name,
                unit: row.parameter_unit,
                values: Vec::new(),
            });
        series.values.push(TimedValue {
            time: row.time,
            value: row.value,
        });
    }

    /// Distinct non-null times across all parameters, ascending.
    pub fn times(&self) -> Vec<NaiveDateTime> {
        self.parameters
            .values()
            .flat_map(|s| s.values.iter().filter_map(|v| v.time))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// The result of one EDR query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverageOutput {
    pub locations: Vec<LocationCoverage>,
}

impl CoverageOutput {
    /// Fold rows sorted by location, parameter and time.
    pub fn from_rows<I>(rows: I) -> ProviderResult<Self>
    where
        I: IntoIterator<Item = Row>,
    {
        let mut locations = Vec::new();
        let mut current: Option<LocationCoverage> = None;
        let mut count = 0usize;

        for row in rows {
            let row = ResultRow::from_row(&row)?;
            count += 1;

            let boundary = current
                .as_ref()
                .map_or(true, |location| location.id != row.location_id);
            if boundary {
                if let Some(done) = current.replace(LocationCoverage::start(&row)) {
                    locations.push(done);
                }
            }
            if let Some(location) = current.as_mut() {
                location.push(row);
            }
        }
        locations.extend(current);

        debug!(rows = count, locations = locations.len(), "Mapped result rows");
        Ok(Self { locations })
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn location(&self, id: &str) -> Option<&LocationCoverage> {
        self.locations.iter().find(|l| l.id == id)
    }

    /// Render as CoverageJSON: a Coverage for one location, otherwise a
    /// CoverageCollection.
    ///
    /// Every location needs a geometry for its spatial domain; a location
    /// returned without one is an execution error rather than a gap in the
    /// output.
    pub fn to_coverage_json(&self) -> ProviderResult<CoverageDocument> {
        let mut coverages = self
            .locations
            .iter()
            .map(location_coverage)
            .collect::<ProviderResult<Vec<CoverageJson>>>()?;

        if coverages.len() == 1 {
            if let Some(coverage) = coverages.pop() {
                return Ok(CoverageDocument::Coverage(coverage));
            }
        }
        Ok(CoverageDocument::Collection(CoverageCollection::new(coverages)))
    }

    /// Render as a GeoJSON FeatureCollection, one feature per location.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        let mut parameters = BTreeMap::new();
        let features = self
            .locations
            .iter()
            .map(|location| {
                for (id, series) in &location.parameters {
                    parameters
                        .entry(id.clone())
                        .or_insert_with(|| edr_parameter(id, series));
                }

                let times = location.times();
                location_feature(
                    &location.id,
                    location.geometry.as_deref(),
                    times.first().zip(times.last()),
                    location.parameters.keys().cloned().collect(),
                )
            })
            .collect();

        FeatureCollection::new(features, parameters)
    }
}

/// A CoverageJSON response document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CoverageDocument {
    Coverage(CoverageJson),
    Collection(CoverageCollection),
}

fn location_feature(
    id: &str,
    wkt: Option<&str>,
    span: Option<(&NaiveDateTime, &NaiveDateTime)>,
    parameter_names: Vec<String>,
) -> Feature {
    let geometry = wkt.and_then(|wkt| {
        Geometry::from_wkt(wkt)
            .map_err(|e| warn!(location = %id, error = %e, "Unreadable location geometry"))
            .ok()
    });
    let datetime = span.map(|(first, last)| format!("{}/{}", iso_time(first), iso_time(last)));

    Feature::new(id.to_string(), geometry).with_properties(LocationProperties {
        datetime,
        parameter_names,
    })
}

fn iso_time(time: &NaiveDateTime) -> String {
    time.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn edr_parameter(id: &str, series: &ParameterSeries) -> Parameter {
    let name = series.name.as_deref().unwrap_or(id);
    let param = Parameter::new(id, name);
    match series.unit.as_deref() {
        Some(unit) => param.with_unit(Unit::ucum(name, unit)),
        None => param,
    }
}

fn location_coverage(location: &LocationCoverage) -> ProviderResult<CoverageJson> {
    let wkt = location.geometry.as_deref().ok_or_else(|| {
        ProviderError::QueryExecution(format!(
            "Location '{}' has rows but no geometry",
            location.id
        ))
    })?;

    let times = location.times();
    let t_axis: Vec<String> = times.iter().map(iso_time).collect();
    let point = QueryGeometry::parse_wkt(wkt)
        .ok()
        .and_then(|geometry| geometry.as_point());
    let domain = match point {
        Some((x, y)) => Domain::point_series(x, y, t_axis),
        None => Domain::composite(wkt, t_axis),
    };

    let coverage = location
        .parameters
        .iter()
        .fold(CoverageJson::new(domain), |coverage, (id, series)| {
            let by_time: HashMap<NaiveDateTime, Option<f64>> = series
                .values
                .iter()
                .filter_map(|v| v.time.map(|t| (t, v.value)))
                .collect();
            let values = times
                .iter()
                .map(|t| by_time.get(t).copied().flatten())
                .collect();
            coverage.with_time_series(
                id,
                CovJsonParameter::from_parameter(&edr_parameter(id, series)),
                values,
            )
        });

    Ok(coverage)
}

/// One entry of the parameter catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterInfo {
    pub id: String,
    pub name: Option<String>,
    pub unit: Option<String>,
}

impl ParameterInfo {
    pub fn from_row(row: &Row) -> ProviderResult<Self> {
        Ok(Self {
            id: required_text(row, COL_PARAMETER_ID)?,
            name: column(row, COL_PARAMETER_NAME)?.as_text(),
            unit: column(row, COL_PARAMETER_UNIT)?.as_text(),
        })
    }

    /// EDR parameter metadata for this entry.
    pub fn to_parameter(&self) -> Parameter {
        edr_parameter(
            &self.id,
            &ParameterSeries {
                name: self.name.clone(),
                unit: self.unit.clone(),
                values: Vec::new(),
            },
        )
    }
}

/// A location in the listing with the parameters observed there.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListedLocation {
    pub id: String,
    pub geometry: Option<String>,
    pub first: Option<NaiveDateTime>,
    pub last: Option<NaiveDateTime>,
    pub parameters: Vec<ParameterInfo>,
}

impl ListedLocation {
    fn widen(&mut self, first: Option<NaiveDateTime>, last: Option<NaiveDateTime>) {
        self.first = match (self.first, first) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.last = match (self.last, last) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }
}

/// Distinct locations, folded from listing rows sorted by location and
/// parameter. Each row carries the first and last time of one parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocationListing {
    pub locations: Vec<ListedLocation>,
}

impl LocationListing {
    pub fn from_rows<I>(rows: I) -> ProviderResult<Self>
    where
        I: IntoIterator<Item = Row>,
    {
        let mut locations: Vec<ListedLocation> = Vec::new();

        for row in rows {
            let id = required_text(&row, COL_LOCATION_ID)?;
            let geometry = column(&row, COL_GEOMETRY)?.as_text();
            let first = column(&row, COL_TIME_MIN)?.as_timestamp();
            let last = column(&row, COL_TIME_MAX)?.as_timestamp();
            let parameter = ParameterInfo::from_row(&row)?;

            match locations.last_mut() {
                Some(location) if location.id == id => {
                    if location.geometry.is_none() {
                        location.geometry = geometry;
                    }
                    location.widen(first, last);
                    location.parameters.push(parameter);
                }
                _ => locations.push(ListedLocation {
                    id,
                    geometry,
                    first,
                    last,
                    parameters: vec![parameter],
                }),
            }
        }

        debug!(locations = locations.len(), "Mapped locations listing");
        Ok(Self { locations })
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Render as a GeoJSON FeatureCollection, one feature per location.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        let mut parameters = BTreeMap::new();
        let features = self
            .locations
            .iter()
            .map(|location| {
                for info in &location.parameters {
                    parameters
                        .entry(info.id.clone())
                        .or_insert_with(|| info.to_parameter());
                }
                location_feature(
                    &location.id,
                    location.geometry.as_deref(),
                    location.first.as_ref().zip(location.last.as_ref()),
                    location.parameters.iter().map(|p| p.id.clone()).collect(),
                )
            })
            .collect();

        FeatureCollection::new(features, parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn row(location: &str, wkt: &str, d: u32, parameter: &str, value: f64) -> Row {
        Row::new()
            .with(COL_ROW_ID, format!("{}-{}-{}", location, parameter, d))
            .with(COL_LOCATION_ID, location)
            .with(COL_GEOMETRY, wkt)
            .with(COL_TIME, day(d))
            .with(COL_PARAMETER_ID, parameter)
            .with(COL_PARAMETER_NAME, "Landings")
            .with(COL_PARAMETER_UNIT, "{count}")
            .with(COL_VALUE, value)
    }

    const DCA: &str = "POINT(-77.0377 38.8512)";
    const IAD: &str = "POINT(-77.4558 38.9531)";

    #[test]
    fn test_groups_by_location_then_parameter() {
        let rows = vec![
            row("DCA", DCA, 1, "landings", 90.0),
            row("DCA", DCA, 2, "landings", 85.0),
            row("DCA", DCA, 1, "takeoffs", 70.0),
            row("IAD", IAD, 1, "landings", 200.0),
        ];

        let output = CoverageOutput::from_rows(rows).unwrap();

        assert_eq!(output.locations.len(), 2);
        let dca = output.location("DCA").unwrap();
        assert_eq!(dca.parameters.len(), 2);
        assert_eq!(dca.parameters["landings"].numbers(), vec![Some(90.0), Some(85.0)]);
        assert_eq!(dca.parameters["takeoffs"].numbers(), vec![Some(70.0)]);
        assert_eq!(
            output.location("IAD").unwrap().parameters["landings"].numbers(),
            vec![Some(200.0)]
        );
    }

    #[test]
    fn test_empty_rows_give_empty_output() {
        let output = CoverageOutput::from_rows(Vec::new()).unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_values_pass_through_with_units() {
        let output = CoverageOutput::from_rows(vec![row("DCA", DCA, 1, "landings", 89.5)]).unwrap();
        let series = &output.locations[0].parameters["landings"];
        assert_eq!(series.unit.as_deref(), Some("{count}"));
        assert_eq!(series.values[0].value, Some(89.5));
        assert_eq!(series.values[0].time, Some(day(1)));
    }

    #[test]
    fn test_missing_column_is_execution_error() {
        let row = Row::new().with(COL_LOCATION_ID, "DCA");
        let err = CoverageOutput::from_rows(vec![row]).unwrap_err();
        assert!(err.is_query_execution());
    }

    #[test]
    fn test_null_location_is_execution_error() {
        let mut bad = Row::new();
        for (name, value) in row("DCA", DCA, 1, "landings", 1.0).iter() {
            if name == COL_LOCATION_ID {
                bad.push(name, SqlValue::Null);
            } else {
                bad.push(name, value.clone());
            }
        }

        let err = ResultRow::from_row(&bad).unwrap_err();
        assert!(err.to_string().contains("null 'location_id'"));
    }

    #[test]
    fn test_single_location_renders_point_series() {
        let output = CoverageOutput::from_rows(vec![
            row("DCA", DCA, 1, "landings", 90.0),
            row("DCA", DCA, 2, "landings", 85.0),
        ])
        .unwrap();

        let json = serde_json::to_value(output.to_coverage_json().unwrap()).unwrap();
        assert_eq!(json["type"], "Coverage");
        assert_eq!(json["domain"]["domainType"], "PointSeries");
        assert_eq!(json["domain"]["axes"]["x"]["values"][0], -77.0377);
        assert_eq!(json["domain"]["axes"]["t"]["values"][1], "2025-05-02T00:00:00Z");
        assert_eq!(json["ranges"]["landings"]["values"][1], 85.0);
        assert_eq!(
            json["parameters"]["landings"]["unit"]["symbol"]["value"],
            "{count}"
        );
    }

    #[test]
    fn test_time_axis_aligns_parameters() {
        let output = CoverageOutput::from_rows(vec![
            row("DCA", DCA, 1, "landings", 90.0),
            row("DCA", DCA, 2, "landings", 85.0),
            row("DCA", DCA, 2, "takeoffs", 70.0),
        ])
        .unwrap();

        match output.to_coverage_json().unwrap() {
            CoverageDocument::Coverage(coverage) => {
                assert_eq!(coverage.ranges["takeoffs"].values, vec![None, Some(70.0)]);
            }
            other => panic!("expected single coverage, got {:?}", other),
        }
    }

    #[test]
    fn test_several_locations_render_collection() {
        let output = CoverageOutput::from_rows(vec![
            row("DCA", DCA, 1, "landings", 90.0),
            row("IAD", IAD, 1, "landings", 200.0),
        ])
        .unwrap();

        match output.to_coverage_json().unwrap() {
            CoverageDocument::Collection(collection) => {
                assert_eq!(collection.coverages.len(), 2);
                assert!(collection.parameters.contains_key("landings"));
            }
            other => panic!("expected collection, got {:?}", other),
        }
    }

    #[test]
    fn test_location_without_geometry_fails_coverage() {
        let mut no_geometry = Row::new();
        for (name, value) in row("IAD", IAD, 1, "landings", 200.0).iter() {
            if name == COL_GEOMETRY {
                no_geometry.push(name, None::<String>);
            } else {
                no_geometry.push(name, value.clone());
            }
        }
        let output =
            CoverageOutput::from_rows(vec![row("DCA", DCA, 1, "landings", 90.0), no_geometry])
                .unwrap();

        let err = output.to_coverage_json().unwrap_err();
        assert!(err.is_query_execution());
        assert!(err.to_string().contains("'IAD'"));

        // The listing keeps the location with a null geometry.
        let fc = output.to_feature_collection();
        assert_eq!(fc.number_returned, 2);
        assert!(fc.features[1].geometry.is_none());
    }

    #[test]
    fn test_feature_collection() {
        let output = CoverageOutput::from_rows(vec![
            row("DCA", DCA, 1, "landings", 90.0),
            row("DCA", DCA, 3, "landings", 87.0),
            row("IAD", IAD, 2, "landings", 50.0),
        ])
        .unwrap();

        let fc = output.to_feature_collection();
        assert_eq!(fc.number_returned, 2);
        assert_eq!(fc.features[0].id, "DCA");
        assert_eq!(fc.features[0].geometry, Some(Geometry::point(-77.0377, 38.8512)));
        assert_eq!(
            fc.features[0].properties.datetime.as_deref(),
            Some("2025-05-01T00:00:00Z/2025-05-03T00:00:00Z")
        );
        assert_eq!(fc.features[0].properties.parameter_names, vec!["landings"]);
        assert!(fc.parameters.contains_key("landings"));
    }

    #[test]
    fn test_parameter_info() {
        let row = Row::new()
            .with(COL_PARAMETER_ID, "landings")
            .with(COL_PARAMETER_NAME, "Landings")
            .with(COL_PARAMETER_UNIT, None::<String>);

        let info = ParameterInfo::from_row(&row).unwrap();
        assert_eq!(info.id, "landings");
        assert!(info.unit.is_none());
        assert!(info.to_parameter().unit.is_none());
        assert_eq!(info.to_parameter().name.as_deref(), Some("Landings"));
    }

    fn listing_row(location: &str, wkt: Option<&str>, parameter: &str, first: u32, last: u32) -> Row {
        Row::new()
            .with(COL_LOCATION_ID, location)
            .with(COL_GEOMETRY, wkt)
            .with(COL_PARAMETER_ID, parameter)
            .with(COL_PARAMETER_NAME, None::<String>)
            .with(COL_PARAMETER_UNIT, "{count}")
            .with(COL_TIME_MIN, day(first))
            .with(COL_TIME_MAX, day(last))
    }

    #[test]
    fn test_listing_one_feature_per_location() {
        let listing = LocationListing::from_rows(vec![
            listing_row("DCA", Some(DCA), "landings", 2, 4),
            listing_row("DCA", Some(DCA), "takeoffs", 1, 3),
            listing_row("IAD", None, "landings", 1, 1),
        ])
        .unwrap();

        assert_eq!(listing.len(), 2);
        let dca = &listing.locations[0];
        assert_eq!(dca.first, Some(day(1)));
        assert_eq!(dca.last, Some(day(4)));

        let fc = listing.to_feature_collection();
        assert_eq!(fc.number_returned, 2);
        assert_eq!(
            fc.features[0].properties.parameter_names,
            vec!["landings", "takeoffs"]
        );
        assert_eq!(
            fc.features[0].properties.datetime.as_deref(),
            Some("2025-05-01T00:00:00Z/2025-05-04T00:00:00Z")
        );
        assert!(fc.features[1].geometry.is_none());
        assert_eq!(fc.parameters.len(), 2);
    }

    #[test]
    fn test_listing_without_times_has_no_datetime() {
        let row = Row::new()
            .with(COL_LOCATION_ID, "BWI")
            .with(COL_GEOMETRY, "POINT(-76.6684 39.1774)")
            .with(COL_PARAMETER_ID, "landings")
            .with(COL_PARAMETER_NAME, "Landings")
            .with(COL_PARAMETER_UNIT, None::<String>)
            .with(COL_TIME_MIN, None::<NaiveDateTime>)
            .with(COL_TIME_MAX, None::<NaiveDateTime>);

        let fc = LocationListing::from_rows(vec![row]).unwrap().to_feature_collection();
        assert!(fc.features[0].properties.datetime.is_none());
    }

    #[test]
    fn test_listing_row_missing_span_is_execution_error() {
        let row = Row::new()
            .with(COL_LOCATION_ID, "DCA")
            .with(COL_GEOMETRY, DCA)
            .with(COL_PARAMETER_ID, "landings");
        let err = LocationListing::from_rows(vec![row]).unwrap_err();
        assert!(err.is_query_execution());
    }
}
