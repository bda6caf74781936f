// In: src/mapper/mod.rs

// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Dataframe Mapper
// ====================================================================================
//
// The mapper is the orchestrator of the engine. It owns the ordered series
// table built by the builder and exposes the two directions of the marshaling
// contract:
//
// Data Flow (Creation):
//
//   1. [items_provider]  -> resolves the ordered item list
//         |
//   2. [AttributeFilter] -> selects series, preserving registration order
//         |                 (index series are always selected)
//   3. [Handler]         -> allocate(n), then per series one typed writer,
//                           filled with extract(item, ctx) per row
//
// Data Flow (Update):
//
//   1. [UpdatingDataframe] -> columns resolved by name ONCE into typed
//         |                   column updaters (unknown columns skipped,
//         |                   index columns skipped)
//   2. [ItemResolver]      -> per row, locate the target item by single key
//         |                   or composite multi-index match
//   3. [column updaters]   -> mutate the located item, one per bound column
//
// A built mapper is immutable and holds no per-call state; it may be shared
// across threads against independent collections, sinks, and sources.
// Failure mid-update leaves previously applied row mutations in place.
//
// ====================================================================================

#[cfg(test)]
mod tests;

use hashbrown::{HashMap, HashSet};
use log::{debug, trace};

use crate::error::MarshalError;
use crate::handler::DataframeHandler;
use crate::series::{
    BoolUpdateFn, DoubleUpdateFn, IntUpdateFn, SeriesKind, SeriesMapper, StringUpdateFn,
};
use crate::source::UpdatingDataframe;
use crate::types::{SeriesDataType, SeriesMetadata};

//==================================================================================
// I. Collaborator Closure Types
//==================================================================================

/// Resolves a collection into its ordered item list, optionally using the
/// caller-supplied context.
pub type ItemsProvider<T, U, C> =
    Box<dyn for<'a> Fn(&'a T, &C) -> Vec<&'a U> + Send + Sync>;

/// Locates an item by its single string key.
pub type ItemGetter<T, U> =
    Box<dyn for<'a> Fn(&'a mut T, &str) -> Option<&'a mut U> + Send + Sync>;

/// Locates an item for one row of an updating dataframe, scanning for the
/// composite key match itself.
pub type MultiIndexGetter<T, U> = Box<
    dyn for<'a> Fn(&'a mut T, &dyn UpdatingDataframe, usize) -> Option<&'a mut U> + Send + Sync,
>;

/// The one item-resolution strategy a mapper carries for its update path.
pub enum ItemResolver<T, U> {
    SingleIndex(ItemGetter<T, U>),
    MultiIndex(MultiIndexGetter<T, U>),
}

//==================================================================================
// II. Attribute Filter
//==================================================================================

/// Selection policy over non-index columns. Index columns are always
/// included regardless of the policy; requesting an unknown name is not an
/// error, the name is silently excluded.
#[derive(Debug, Clone)]
pub enum AttributeFilter {
    /// Columns marked default (plus index columns).
    Default,
    /// An explicit set of requested names (plus index columns).
    Input(HashSet<String>),
    /// Every column.
    All,
}

impl AttributeFilter {
    /// Builds an `Input` filter from any iterable of names.
    pub fn input<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Input(names.into_iter().map(Into::into).collect())
    }

    fn selects(&self, meta: &SeriesMetadata) -> bool {
        if meta.is_index {
            return true;
        }
        match self {
            Self::Default => meta.is_default,
            Self::Input(requested) => requested.contains(&meta.name),
            Self::All => true,
        }
    }
}

//==================================================================================
// III. The Mapper
//==================================================================================

/// The two-directional mapper over items of type `U` in collections of type
/// `T`, with opaque per-call context `C`. Built once via
/// [`crate::builder::DataframeMapperBuilder`], then reused read-only.
pub struct DataframeMapper<T, U, C> {
    pub(crate) series: Vec<SeriesMapper<U, C>>,
    pub(crate) slot_by_name: HashMap<String, usize>,
    pub(crate) items_provider: ItemsProvider<T, U, C>,
    pub(crate) resolver: Option<ItemResolver<T, U>>,
}

impl<T, U, C> DataframeMapper<T, U, C> {
    //------------------------------------------------------------------------------
    // Metadata surface
    //------------------------------------------------------------------------------

    /// Every registered series descriptor, in registration order.
    pub fn series_metadata(&self) -> Vec<&SeriesMetadata> {
        self.series.iter().map(|s| s.metadata()).collect()
    }

    /// The descriptor of one series by name.
    pub fn get_series_metadata(&self, name: &str) -> Result<&SeriesMetadata, MarshalError> {
        self.slot_by_name
            .get(name)
            .map(|&slot| self.series[slot].metadata())
            .ok_or_else(|| MarshalError::ColumnNotFound(name.to_string()))
    }

    /// The registered column descriptors serialized as JSON, for diagnostics
    /// and host-side schema discovery.
    pub fn schema_json(&self) -> Result<String, MarshalError> {
        let metadata: Vec<&SeriesMetadata> = self.series_metadata();
        Ok(serde_json::to_string(&metadata)?)
    }

    //------------------------------------------------------------------------------
    // Creation path
    //------------------------------------------------------------------------------

    /// Marshals the collection into columns on the given handler.
    ///
    /// Selection preserves registration order; the handler is driven through
    /// its single-pass write protocol (`allocate`, then one typed writer per
    /// selected series, filled row by row).
    pub fn create_dataframe(
        &self,
        items: &T,
        handler: &mut dyn DataframeHandler,
        filter: &AttributeFilter,
        ctx: &C,
    ) -> Result<(), MarshalError> {
        let rows = (self.items_provider)(items, ctx);
        let selected: Vec<&SeriesMapper<U, C>> = self
            .series
            .iter()
            .filter(|s| filter.selects(s.metadata()))
            .collect();
        debug!(
            "creating dataframe: {}/{} series selected, {} rows",
            selected.len(),
            self.series.len(),
            rows.len()
        );

        handler.allocate(selected.len());
        let n = rows.len();
        for series in selected {
            let meta = series.metadata();
            trace!("writing series '{}' ({})", meta.name, meta.data_type);
            match &series.kind {
                SeriesKind::String { extract, .. } => {
                    let mut writer = if meta.is_index {
                        handler.new_string_index(&meta.name, n)?
                    } else {
                        handler.new_string_series(&meta.name, n)?
                    };
                    for (row, item) in rows.iter().copied().enumerate() {
                        writer.set(row, extract(item, ctx))?;
                    }
                }
                SeriesKind::Int { extract, .. } => {
                    let mut writer = if meta.is_index {
                        handler.new_int_index(&meta.name, n)?
                    } else {
                        handler.new_int_series(&meta.name, n)?
                    };
                    for (row, item) in rows.iter().copied().enumerate() {
                        writer.set(row, extract(item, ctx))?;
                    }
                }
                SeriesKind::OptionalInt { extract, .. } => {
                    // The sink protocol has no optional-int index form; the
                    // builder never registers one.
                    debug_assert!(!meta.is_index, "optional-int series cannot be an index");
                    let mut writer = handler.new_optional_int_series(&meta.name, n)?;
                    for (row, item) in rows.iter().copied().enumerate() {
                        writer.set(row, extract(item, ctx))?;
                    }
                }
                SeriesKind::Double { extract, .. } => {
                    let mut writer = if meta.is_index {
                        handler.new_double_index(&meta.name, n)?
                    } else {
                        handler.new_double_series(&meta.name, n)?
                    };
                    for (row, item) in rows.iter().copied().enumerate() {
                        writer.set(row, extract(item, ctx))?;
                    }
                }
                SeriesKind::Boolean { extract, .. } => {
                    debug_assert!(!meta.is_index, "boolean series cannot be an index");
                    let mut writer = handler.new_boolean_series(&meta.name, n)?;
                    for (row, item) in rows.iter().copied().enumerate() {
                        writer.set(row, extract(item, ctx))?;
                    }
                }
            }
        }
        Ok(())
    }

    //------------------------------------------------------------------------------
    // Update path
    //------------------------------------------------------------------------------

    /// Applies an updating dataframe to the collection, row by row.
    ///
    /// Column updaters are bound once per call, not once per row. A column
    /// the mapper does not know is skipped; a mismatch between a known
    /// column's declared type and its series fails before any row is
    /// touched. Row mutations applied before a failure stand.
    pub fn update_series(
        &self,
        items: &mut T,
        source: &dyn UpdatingDataframe,
        ctx: &C,
    ) -> Result<(), MarshalError> {
        let resolver = self.resolver.as_ref().ok_or_else(|| {
            MarshalError::InternalError("no item resolver was registered for updates".to_string())
        })?;
        let row_count = source.row_count();
        let updaters = self.bind_column_updaters(source)?;
        debug!(
            "updating series: {} bound columns, {} rows",
            updaters.len(),
            row_count
        );

        match resolver {
            ItemResolver::SingleIndex(getter) => {
                let identity = self
                    .series
                    .iter()
                    .map(|s| s.metadata())
                    .find(|m| m.is_index)
                    .ok_or_else(|| {
                        MarshalError::InternalError(
                            "single-key updates require an index series".to_string(),
                        )
                    })?;
                // The identity column is mandatory: without it no row can
                // name its target item.
                let keys = source
                    .get_strings(&identity.name)
                    .ok_or_else(|| MarshalError::ColumnNotFound(identity.name.clone()))?;
                if keys.len() != row_count {
                    return Err(MarshalError::LengthMismatch(row_count, keys.len()));
                }
                for row in 0..row_count {
                    let key = &keys[row];
                    let item = getter(&mut *items, key)
                        .ok_or_else(|| MarshalError::ItemNotFound(key.clone()))?;
                    for updater in &updaters {
                        updater.apply(item, row, ctx)?;
                    }
                }
            }
            ItemResolver::MultiIndex(getter) => {
                for row in 0..row_count {
                    let item = getter(&mut *items, source, row).ok_or_else(|| {
                        MarshalError::ItemNotFound(format!(
                            "no item matches the multi-index key at row {row}"
                        ))
                    })?;
                    for updater in &updaters {
                        updater.apply(item, row, ctx)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Resolves every non-index source column against the series table,
    /// producing one typed updater per column. Performed once per update
    /// call so the per-row loop does no name lookups.
    fn bind_column_updaters<'a>(
        &'a self,
        source: &'a dyn UpdatingDataframe,
    ) -> Result<Vec<ColumnUpdater<'a, U, C>>, MarshalError> {
        let row_count = source.row_count();
        let mut updaters = Vec::new();
        for col in source.series_metadata() {
            let Some(&slot) = self.slot_by_name.get(col.name.as_str()) else {
                trace!("skipping unknown update column '{}'", col.name);
                continue;
            };
            let series = &self.series[slot];
            if series.metadata().is_index {
                continue;
            }

            let read_only = || {
                MarshalError::UnsupportedSeriesType(format!("series '{}' is read-only", col.name))
            };
            match col.data_type {
                SeriesDataType::String => {
                    let cells = source.get_strings(&col.name).ok_or_else(|| {
                        MarshalError::TypeMismatch(format!(
                            "update column '{}' is declared string but supplies no string data",
                            col.name
                        ))
                    })?;
                    if cells.len() != row_count {
                        return Err(MarshalError::LengthMismatch(row_count, cells.len()));
                    }
                    match &series.kind {
                        SeriesKind::String {
                            update: Some(update),
                            ..
                        } => updaters.push(ColumnUpdater::Strings { cells, update }),
                        SeriesKind::String { update: None, .. } => return Err(read_only()),
                        _ => {
                            return Err(MarshalError::TypeMismatch(format!(
                                "series '{}' is {}, not string",
                                col.name,
                                series.metadata().data_type
                            )))
                        }
                    }
                }
                SeriesDataType::Int => {
                    let cells = source.get_ints(&col.name).ok_or_else(|| {
                        MarshalError::TypeMismatch(format!(
                            "update column '{}' is declared int but supplies no int data",
                            col.name
                        ))
                    })?;
                    if cells.len() != row_count {
                        return Err(MarshalError::LengthMismatch(row_count, cells.len()));
                    }
                    match &series.kind {
                        SeriesKind::Int {
                            update: Some(update),
                            ..
                        }
                        | SeriesKind::OptionalInt {
                            update: Some(update),
                            ..
                        } => updaters.push(ColumnUpdater::Ints { cells, update }),
                        // Boolean series accept int updates, nonzero = true.
                        SeriesKind::Boolean {
                            update: Some(update),
                            ..
                        } => updaters.push(ColumnUpdater::Booleans { cells, update }),
                        SeriesKind::Int { update: None, .. }
                        | SeriesKind::OptionalInt { update: None, .. }
                        | SeriesKind::Boolean { update: None, .. } => return Err(read_only()),
                        _ => {
                            return Err(MarshalError::TypeMismatch(format!(
                                "series '{}' is {}, not int",
                                col.name,
                                series.metadata().data_type
                            )))
                        }
                    }
                }
                SeriesDataType::Double => {
                    let cells = source.get_doubles(&col.name).ok_or_else(|| {
                        MarshalError::TypeMismatch(format!(
                            "update column '{}' is declared double but supplies no double data",
                            col.name
                        ))
                    })?;
                    if cells.len() != row_count {
                        return Err(MarshalError::LengthMismatch(row_count, cells.len()));
                    }
                    match &series.kind {
                        SeriesKind::Double {
                            update: Some(update),
                            ..
                        } => updaters.push(ColumnUpdater::Doubles { cells, update }),
                        SeriesKind::Double { update: None, .. } => return Err(read_only()),
                        _ => {
                            return Err(MarshalError::TypeMismatch(format!(
                                "series '{}' is {}, not double",
                                col.name,
                                series.metadata().data_type
                            )))
                        }
                    }
                }
                SeriesDataType::Boolean => {
                    return Err(MarshalError::UnsupportedSeriesType(format!(
                        "update column '{}': boolean input columns are not supported, \
                         supply boolean updates as an int column",
                        col.name
                    )))
                }
            }
        }
        Ok(updaters)
    }
}

//==================================================================================
// IV. Bound Column Updaters
//==================================================================================

/// One source column bound to its series' update closure for one call.
/// Matched exhaustively once at binding time; `apply` does no dispatch
/// beyond this closed set.
enum ColumnUpdater<'a, U, C> {
    Strings {
        cells: &'a [String],
        update: &'a StringUpdateFn<U, C>,
    },
    Ints {
        cells: &'a [i32],
        update: &'a IntUpdateFn<U, C>,
    },
    Doubles {
        cells: &'a [f64],
        update: &'a DoubleUpdateFn<U, C>,
    },
    Booleans {
        cells: &'a [i32],
        update: &'a BoolUpdateFn<U, C>,
    },
}

impl<U, C> ColumnUpdater<'_, U, C> {
    fn apply(&self, item: &mut U, row: usize, ctx: &C) -> Result<(), MarshalError> {
        match self {
            Self::Strings { cells, update } => update(item, &cells[row], ctx),
            Self::Ints { cells, update } => update(item, cells[row], ctx),
            Self::Doubles { cells, update } => update(item, cells[row], ctx),
            Self::Booleans { cells, update } => update(item, cells[row] != 0, ctx),
        }
    }
}
