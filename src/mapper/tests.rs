use std::fmt;
use std::str::FromStr;

use crate::builder::DataframeMapperBuilder;
use crate::error::MarshalError;
use crate::handler::{ColumnsHandler, NativeHandler, Series};
use crate::mapper::{AttributeFilter, DataframeMapper};
use crate::source::{InMemoryDataframe, UpdatingDataframe};

//==================================================================================
// I. Fixtures
//==================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Red,
    Green,
    Blue,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Color::Red => "RED",
            Color::Green => "GREEN",
            Color::Blue => "BLUE",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Color {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RED" => Ok(Color::Red),
            "GREEN" => Ok(Color::Green),
            "BLUE" => Ok(Color::Blue),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Element {
    id: String,
    group: i32,
    name: String,
    count: i32,
    rating: Option<i32>,
    power: f64,
    active: bool,
    color: Color,
}

struct Grid {
    elements: Vec<Element>,
}

fn element(id: &str, group: i32) -> Element {
    Element {
        id: id.to_string(),
        group,
        name: format!("{id}-name"),
        count: group * 10,
        rating: None,
        power: 0.0,
        active: false,
        color: Color::Red,
    }
}

fn sample_grid() -> Grid {
    Grid {
        elements: vec![
            Element {
                id: "el1".to_string(),
                group: 0,
                name: "alpha".to_string(),
                count: 3,
                rating: Some(42),
                power: 101.5,
                active: true,
                color: Color::Red,
            },
            Element {
                id: "el2".to_string(),
                group: 0,
                name: "beta".to_string(),
                count: -7,
                rating: None,
                power: -0.25,
                active: false,
                color: Color::Green,
            },
            Element {
                id: "el3".to_string(),
                group: 1,
                name: "gamma".to_string(),
                count: 0,
                rating: Some(0),
                power: 7.75,
                active: true,
                color: Color::Blue,
            },
        ],
    }
}

fn all_elements<'a>(grid: &'a Grid, _ctx: &()) -> Vec<&'a Element> {
    grid.elements.iter().collect()
}

fn by_id<'a>(grid: &'a mut Grid, id: &str) -> Option<&'a mut Element> {
    grid.elements.iter_mut().find(|e| e.id == id)
}

fn by_id_and_group<'a>(
    grid: &'a mut Grid,
    source: &dyn UpdatingDataframe,
    row: usize,
) -> Option<&'a mut Element> {
    let id = source.get_string_value("id", row)?.to_string();
    let group = source.get_int_value("group", row)?;
    grid.elements
        .iter_mut()
        .find(|e| e.id == id && e.group == group)
}

/// The reference mapper: columns `id*(index), str, int, double(non-default),
/// color`, plus the optional-int and boolean extras as non-default columns.
fn grid_mapper() -> DataframeMapper<Grid, Element, ()> {
    DataframeMapperBuilder::new()
        .items_provider(all_elements)
        .item_getter(by_id)
        .strings_index("id", |e: &Element, _: &()| e.id.clone())
        .strings_mut(
            "str",
            |e: &Element, _: &()| e.name.clone(),
            |e: &mut Element, v: &str, _: &()| e.name = v.to_string(),
        )
        .ints_mut(
            "int",
            |e: &Element, _: &()| e.count,
            |e: &mut Element, v: i32, _: &()| e.count = v,
        )
        .doubles_mut(
            "double",
            |e: &Element, _: &()| e.power,
            |e: &mut Element, v: f64, _: &()| e.power = v,
        )
        .non_default()
        .enums_mut(
            "color",
            |e: &Element, _: &()| e.color,
            |e: &mut Element, v: Color, _: &()| e.color = v,
        )
        .optional_ints_mut(
            "rating",
            |e: &Element, _: &()| e.rating,
            |e: &mut Element, v: i32, _: &()| e.rating = Some(v),
        )
        .non_default()
        .booleans_mut(
            "active",
            |e: &Element, _: &()| e.active,
            |e: &mut Element, v: bool, _: &()| e.active = v,
        )
        .non_default()
        .build()
        .unwrap()
}

fn create_series(
    mapper: &DataframeMapper<Grid, Element, ()>,
    grid: &Grid,
    filter: &AttributeFilter,
) -> Vec<Series> {
    let mut handler = ColumnsHandler::new();
    mapper.create_dataframe(grid, &mut handler, filter, &()).unwrap();
    handler.into_series()
}

fn names(series: &[Series]) -> Vec<&str> {
    series.iter().map(|s| s.name.as_str()).collect()
}

fn by_name<'a>(series: &'a [Series], name: &str) -> &'a Series {
    series
        .iter()
        .find(|s| s.name == name)
        .unwrap_or_else(|| panic!("series '{name}' missing"))
}

//==================================================================================
// II. Filtering & Ordering
//==================================================================================

#[test]
fn default_filter_selects_default_and_index_series() {
    let series = create_series(&grid_mapper(), &sample_grid(), &AttributeFilter::Default);
    assert_eq!(names(&series), vec!["id", "str", "int", "color"]);
    assert!(series[0].is_index);
    assert!(!series[1].is_index);
}

#[test]
fn input_filter_always_includes_index_series() {
    let filter = AttributeFilter::input(["str", "color"]);
    let series = create_series(&grid_mapper(), &sample_grid(), &filter);
    assert_eq!(names(&series), vec!["id", "str", "color"]);
}

#[test]
fn input_filter_silently_excludes_unknown_names() {
    let filter = AttributeFilter::input(["str", "color", "doesNotExist"]);
    let series = create_series(&grid_mapper(), &sample_grid(), &filter);
    assert_eq!(names(&series), vec!["id", "str", "color"]);
}

#[test]
fn all_filter_preserves_registration_order() {
    let series = create_series(&grid_mapper(), &sample_grid(), &AttributeFilter::All);
    assert_eq!(
        names(&series),
        vec!["id", "str", "int", "double", "color", "rating", "active"]
    );
}

//==================================================================================
// III. Creation Values
//==================================================================================

#[test]
fn extracted_columns_match_item_values() {
    let series = create_series(&grid_mapper(), &sample_grid(), &AttributeFilter::All);
    assert_eq!(by_name(&series, "id").strings().unwrap(), &["el1", "el2", "el3"]);
    assert_eq!(by_name(&series, "int").ints().unwrap(), &[3, -7, 0]);
    assert_eq!(
        by_name(&series, "double").doubles().unwrap(),
        &[101.5, -0.25, 7.75]
    );
    assert_eq!(
        by_name(&series, "color").strings().unwrap(),
        &["RED", "GREEN", "BLUE"]
    );
    assert_eq!(
        by_name(&series, "rating").optional_ints().unwrap(),
        &[Some(42), None, Some(0)]
    );
    assert_eq!(
        by_name(&series, "active").booleans().unwrap(),
        &[true, false, true]
    );
}

#[test]
fn create_into_native_buffer_end_to_end() {
    let mapper = grid_mapper();
    let grid = sample_grid();
    let mut handler = NativeHandler::new();
    mapper
        .create_dataframe(&grid, &mut handler, &AttributeFilter::Default, &())
        .unwrap();
    let frame = handler.into_buffer().unwrap();
    unsafe {
        let series = frame.series();
        assert_eq!(series.len(), 4);
        assert_eq!(series[0].name_str(), "id");
        assert!(series[0].is_index);
        assert_eq!(series[0].data_type, 0);
        assert_eq!(series[2].name_str(), "int");
        assert_eq!(series[2].data_type, 2);
        let counts = std::slice::from_raw_parts(series[2].data.ptr as *const i32, 3);
        assert_eq!(counts, &[3, -7, 0]);
        frame.free();
    }
}

//==================================================================================
// IV. Round Trip & Updates
//==================================================================================

#[test]
fn create_then_update_round_trips_values() {
    let mapper = grid_mapper();
    let original = sample_grid();
    let reference = create_series(&mapper, &original, &AttributeFilter::All);

    // A second grid with the same identities but scrambled values.
    let mut scrambled = sample_grid();
    for e in &mut scrambled.elements {
        e.name = "???".to_string();
        e.count = 999;
        e.power = f64::NAN;
        e.active = !e.active;
        e.color = Color::Blue;
    }

    let active_ints: Vec<i32> = by_name(&reference, "active")
        .booleans()
        .unwrap()
        .iter()
        .map(|&b| b as i32)
        .collect();
    let source = InMemoryDataframe::new(3)
        .add_string_column("id", by_name(&reference, "id").strings().unwrap().to_vec())
        .unwrap()
        .add_string_column("str", by_name(&reference, "str").strings().unwrap().to_vec())
        .unwrap()
        .add_int_column("int", by_name(&reference, "int").ints().unwrap().to_vec())
        .unwrap()
        .add_double_column(
            "double",
            by_name(&reference, "double").doubles().unwrap().to_vec(),
        )
        .unwrap()
        .add_string_column(
            "color",
            by_name(&reference, "color").strings().unwrap().to_vec(),
        )
        .unwrap()
        .add_int_column("active", active_ints)
        .unwrap();

    mapper.update_series(&mut scrambled, &source, &()).unwrap();

    let restored = create_series(&mapper, &scrambled, &AttributeFilter::All);
    for name in ["str", "int", "double", "color", "active"] {
        assert_eq!(
            by_name(&restored, name),
            by_name(&reference, name),
            "column '{name}' did not round-trip"
        );
    }
}

#[test]
fn multi_index_update_targets_the_exact_matching_item() {
    let mapper: DataframeMapper<Grid, Element, ()> = DataframeMapperBuilder::new()
        .items_provider(all_elements)
        .item_multi_index_getter(by_id_and_group)
        .strings_index("id", |e: &Element, _: &()| e.id.clone())
        .ints_index("group", |e: &Element, _: &()| e.group)
        .doubles_mut(
            "double",
            |e: &Element, _: &()| e.power,
            |e: &mut Element, v: f64, _: &()| e.power = v,
        )
        .build()
        .unwrap();

    let mut grid = Grid {
        elements: vec![element("el1", 0), element("el1", 1)],
    };

    // Rows deliberately in reverse item order: each row must hit its own
    // composite match, never the other.
    let source = InMemoryDataframe::new(2)
        .add_string_column("id", vec!["el1".to_string(), "el1".to_string()])
        .unwrap()
        .add_int_column("group", vec![1, 0])
        .unwrap()
        .add_double_column("double", vec![20.0, 10.0])
        .unwrap();

    mapper.update_series(&mut grid, &source, &()).unwrap();
    assert_eq!(grid.elements[0].power, 10.0);
    assert_eq!(grid.elements[1].power, 20.0);
}

#[test]
fn optional_int_updates_write_present_values() {
    let mapper = grid_mapper();
    let mut grid = sample_grid();
    let source = InMemoryDataframe::new(3)
        .add_string_column(
            "id",
            vec!["el1".to_string(), "el2".to_string(), "el3".to_string()],
        )
        .unwrap()
        .add_int_column("rating", vec![1, 2, 3])
        .unwrap();
    mapper.update_series(&mut grid, &source, &()).unwrap();
    assert_eq!(grid.elements[1].rating, Some(2));
}

#[test]
fn failed_row_leaves_previous_mutations_in_place() {
    let mapper = grid_mapper();
    let mut grid = sample_grid();
    let source = InMemoryDataframe::new(2)
        .add_string_column("id", vec!["el1".to_string(), "nope".to_string()])
        .unwrap()
        .add_int_column("int", vec![100, 200])
        .unwrap();

    let err = mapper.update_series(&mut grid, &source, &()).unwrap_err();
    assert!(matches!(err, MarshalError::ItemNotFound(_)));
    // Row 0 was applied before row 1 failed; there is no rollback.
    assert_eq!(grid.elements[0].count, 100);
    assert_eq!(grid.elements[1].count, -7);
}

//==================================================================================
// V. Failure Modes
//==================================================================================

#[test]
fn unknown_series_metadata_lookup_fails() {
    let mapper = grid_mapper();
    let err = mapper.get_series_metadata("doesNotExist").unwrap_err();
    assert!(matches!(err, MarshalError::ColumnNotFound(_)));
    assert_eq!(mapper.get_series_metadata("double").unwrap().name, "double");
}

#[test]
fn boolean_and_optional_int_series_never_register_as_indexes() {
    // The sink protocol has no index form for these kinds, so the builder
    // must only ever hand them to the mapper as attributes.
    let mapper = grid_mapper();
    assert!(!mapper.get_series_metadata("active").unwrap().is_index);
    assert!(!mapper.get_series_metadata("rating").unwrap().is_index);
}

#[test]
fn enum_update_with_unknown_case_fails_without_mutating() {
    let mapper = grid_mapper();
    let mut grid = sample_grid();
    let source = InMemoryDataframe::new(1)
        .add_string_column("id", vec!["el1".to_string()])
        .unwrap()
        .add_string_column("color", vec!["MAGENTA".to_string()])
        .unwrap();

    let err = mapper.update_series(&mut grid, &source, &()).unwrap_err();
    assert!(matches!(err, MarshalError::InvalidEnumValue { .. }));
    assert_eq!(grid.elements[0].color, Color::Red);
}

#[test]
fn duplicate_series_name_fails_at_build() {
    let err = DataframeMapperBuilder::<Grid, Element, ()>::new()
        .items_provider(all_elements)
        .doubles("p", |e: &Element, _: &()| e.power)
        .doubles("p", |e: &Element, _: &()| e.power)
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, MarshalError::DuplicateKey(name) if name == "p"));
}

#[test]
fn missing_identity_column_is_a_caller_error() {
    let mapper = grid_mapper();
    let mut grid = sample_grid();
    let source = InMemoryDataframe::new(3)
        .add_int_column("int", vec![1, 2, 3])
        .unwrap();
    let err = mapper.update_series(&mut grid, &source, &()).unwrap_err();
    assert!(matches!(err, MarshalError::ColumnNotFound(name) if name == "id"));
}

#[test]
fn unknown_update_column_is_skipped() {
    let mapper = grid_mapper();
    let mut grid = sample_grid();
    let source = InMemoryDataframe::new(3)
        .add_string_column(
            "id",
            vec!["el1".to_string(), "el2".to_string(), "el3".to_string()],
        )
        .unwrap()
        .add_int_column("bogus", vec![0, 0, 0])
        .unwrap()
        .add_int_column("int", vec![11, 22, 33])
        .unwrap();
    mapper.update_series(&mut grid, &source, &()).unwrap();
    assert_eq!(grid.elements[2].count, 33);
}

#[test]
fn read_only_series_rejects_updates() {
    let mapper: DataframeMapper<Grid, Element, ()> = DataframeMapperBuilder::new()
        .items_provider(all_elements)
        .item_getter(by_id)
        .strings_index("id", |e: &Element, _: &()| e.id.clone())
        .doubles("double", |e: &Element, _: &()| e.power)
        .build()
        .unwrap();
    let mut grid = sample_grid();
    let source = InMemoryDataframe::new(1)
        .add_string_column("id", vec!["el1".to_string()])
        .unwrap()
        .add_double_column("double", vec![5.0])
        .unwrap();
    let err = mapper.update_series(&mut grid, &source, &()).unwrap_err();
    assert!(matches!(err, MarshalError::UnsupportedSeriesType(_)));
    assert_eq!(grid.elements[0].power, 101.5);
}

#[test]
fn declared_type_mismatch_fails_before_any_row() {
    let mapper = grid_mapper();
    let mut grid = sample_grid();
    let source = InMemoryDataframe::new(3)
        .add_string_column(
            "id",
            vec!["el1".to_string(), "el2".to_string(), "el3".to_string()],
        )
        .unwrap()
        .add_double_column("int", vec![1.0, 2.0, 3.0])
        .unwrap();
    let err = mapper.update_series(&mut grid, &source, &()).unwrap_err();
    assert!(matches!(err, MarshalError::TypeMismatch(_)));
    assert_eq!(grid.elements[0].count, 3);
}

//==================================================================================
// VI. Context, Schema & Sharing
//==================================================================================

#[test]
fn context_is_threaded_through_extract_and_update() {
    // Per-call unit conversion: extraction scales by the context factor,
    // updates divide it back out.
    fn all_elements_scaled<'a>(grid: &'a Grid, _scale: &f64) -> Vec<&'a Element> {
        grid.elements.iter().collect()
    }
    let mapper: DataframeMapper<Grid, Element, f64> = DataframeMapperBuilder::new()
        .items_provider(all_elements_scaled)
        .item_getter(by_id)
        .strings_index("id", |e: &Element, _: &f64| e.id.clone())
        .doubles_mut(
            "double",
            |e: &Element, scale: &f64| e.power * scale,
            |e: &mut Element, v: f64, scale: &f64| e.power = v / scale,
        )
        .build()
        .unwrap();

    let grid = sample_grid();
    let mut handler = ColumnsHandler::new();
    mapper
        .create_dataframe(&grid, &mut handler, &AttributeFilter::All, &1000.0)
        .unwrap();
    let series = handler.into_series();
    assert_eq!(by_name(&series, "double").doubles().unwrap()[0], 101_500.0);

    let mut grid = sample_grid();
    let source = InMemoryDataframe::new(1)
        .add_string_column("id", vec!["el1".to_string()])
        .unwrap()
        .add_double_column("double", vec![2000.0])
        .unwrap();
    mapper.update_series(&mut grid, &source, &1000.0).unwrap();
    assert_eq!(grid.elements[0].power, 2.0);
}

#[test]
fn schema_json_lists_registered_series() {
    let json = grid_mapper().schema_json().unwrap();
    assert!(json.contains("\"name\":\"id\""));
    assert!(json.contains("\"data_type\":\"double\""));
    assert!(json.contains("\"is_index\":true"));
}

#[test]
fn built_mapper_is_shareable_across_threads() {
    fn assert_send_sync<X: Send + Sync>() {}
    assert_send_sync::<DataframeMapper<Grid, Element, ()>>();
}
