// In: src/builder.rs

//! Declarative, fluent registration of series mappers. A builder is a plain
//! data object consumed by every registration call; `build()` validates name
//! uniqueness and freezes the table into an immutable
//! [`DataframeMapper`](crate::mapper::DataframeMapper).
//!
//! Each scalar type gets three registration forms: read-only (`doubles`),
//! read/write (`doubles_mut`), and index (`doubles_index`). Enum-valued
//! columns marshal through the case name: `ToString` on extraction,
//! `FromStr` on update, with a failed parse surfacing `InvalidEnumValue`.

use std::str::FromStr;

use hashbrown::HashMap;

use crate::error::MarshalError;
use crate::mapper::{DataframeMapper, ItemResolver, ItemsProvider};
use crate::series::{SeriesKind, SeriesMapper};
use crate::source::UpdatingDataframe;

pub struct DataframeMapperBuilder<T, U, C> {
    series: Vec<SeriesMapper<U, C>>,
    items_provider: Option<ItemsProvider<T, U, C>>,
    resolver: Option<ItemResolver<T, U>>,
}

impl<T, U, C> Default for DataframeMapperBuilder<T, U, C> {
    fn default() -> Self {
        Self {
            series: Vec::new(),
            items_provider: None,
            resolver: None,
        }
    }
}

impl<T, U, C> DataframeMapperBuilder<T, U, C> {
    pub fn new() -> Self {
        Self::default()
    }

    //------------------------------------------------------------------------------
    // Collaborators
    //------------------------------------------------------------------------------

    /// Registers the collection-to-item-list resolver used by the creation
    /// path.
    pub fn items_provider<F>(mut self, provider: F) -> Self
    where
        F: for<'a> Fn(&'a T, &C) -> Vec<&'a U> + Send + Sync + 'static,
    {
        self.items_provider = Some(Box::new(provider));
        self
    }

    /// Registers the single-key item resolver: updates locate each row's
    /// item by the string value of the first index column.
    pub fn item_getter<F>(mut self, getter: F) -> Self
    where
        F: for<'a> Fn(&'a mut T, &str) -> Option<&'a mut U> + Send + Sync + 'static,
    {
        self.resolver = Some(ItemResolver::SingleIndex(Box::new(getter)));
        self
    }

    /// Registers the composite-key item resolver. The closure receives the
    /// whole updating dataframe plus the row index and scans for the match
    /// itself; with a naive scan this is O(items x rows), so callers with
    /// large collections should index inside their own closure.
    pub fn item_multi_index_getter<F>(mut self, getter: F) -> Self
    where
        F: for<'a> Fn(&'a mut T, &dyn UpdatingDataframe, usize) -> Option<&'a mut U>
            + Send
            + Sync
            + 'static,
    {
        self.resolver = Some(ItemResolver::MultiIndex(Box::new(getter)));
        self
    }

    //------------------------------------------------------------------------------
    // Series registration
    //------------------------------------------------------------------------------

    fn add(mut self, name: &str, is_index: bool, kind: SeriesKind<U, C>) -> Self {
        self.series.push(SeriesMapper::new(name, is_index, true, kind));
        self
    }

    /// Demotes the most recently registered series to a non-default
    /// attribute, so it only appears under an explicit or all-columns
    /// filter. No effect on index series.
    pub fn non_default(mut self) -> Self {
        if let Some(last) = self.series.last_mut() {
            last.mark_non_default();
        }
        self
    }

    pub fn strings<Ex>(self, name: &str, extract: Ex) -> Self
    where
        Ex: Fn(&U, &C) -> String + Send + Sync + 'static,
    {
        self.add(
            name,
            false,
            SeriesKind::String {
                extract: Box::new(extract),
                update: None,
            },
        )
    }

    pub fn strings_mut<Ex, Up>(self, name: &str, extract: Ex, update: Up) -> Self
    where
        Ex: Fn(&U, &C) -> String + Send + Sync + 'static,
        Up: Fn(&mut U, &str, &C) + Send + Sync + 'static,
    {
        self.add(
            name,
            false,
            SeriesKind::String {
                extract: Box::new(extract),
                update: Some(Box::new(move |item: &mut U, value: &str, ctx: &C| {
                    update(item, value, ctx);
                    Ok(())
                })),
            },
        )
    }

    pub fn strings_index<Ex>(self, name: &str, extract: Ex) -> Self
    where
        Ex: Fn(&U, &C) -> String + Send + Sync + 'static,
    {
        self.add(
            name,
            true,
            SeriesKind::String {
                extract: Box::new(extract),
                update: None,
            },
        )
    }

    pub fn ints<Ex>(self, name: &str, extract: Ex) -> Self
    where
        Ex: Fn(&U, &C) -> i32 + Send + Sync + 'static,
    {
        self.add(
            name,
            false,
            SeriesKind::Int {
                extract: Box::new(extract),
                update: None,
            },
        )
    }

    pub fn ints_mut<Ex, Up>(self, name: &str, extract: Ex, update: Up) -> Self
    where
        Ex: Fn(&U, &C) -> i32 + Send + Sync + 'static,
        Up: Fn(&mut U, i32, &C) + Send + Sync + 'static,
    {
        self.add(
            name,
            false,
            SeriesKind::Int {
                extract: Box::new(extract),
                update: Some(Box::new(move |item: &mut U, value: i32, ctx: &C| {
                    update(item, value, ctx);
                    Ok(())
                })),
            },
        )
    }

    pub fn ints_index<Ex>(self, name: &str, extract: Ex) -> Self
    where
        Ex: Fn(&U, &C) -> i32 + Send + Sync + 'static,
    {
        self.add(
            name,
            true,
            SeriesKind::Int {
                extract: Box::new(extract),
                update: None,
            },
        )
    }

    pub fn optional_ints<Ex>(self, name: &str, extract: Ex) -> Self
    where
        Ex: Fn(&U, &C) -> Option<i32> + Send + Sync + 'static,
    {
        self.add(
            name,
            false,
            SeriesKind::OptionalInt {
                extract: Box::new(extract),
                update: None,
            },
        )
    }

    pub fn optional_ints_mut<Ex, Up>(self, name: &str, extract: Ex, update: Up) -> Self
    where
        Ex: Fn(&U, &C) -> Option<i32> + Send + Sync + 'static,
        Up: Fn(&mut U, i32, &C) + Send + Sync + 'static,
    {
        self.add(
            name,
            false,
            SeriesKind::OptionalInt {
                extract: Box::new(extract),
                update: Some(Box::new(move |item: &mut U, value: i32, ctx: &C| {
                    update(item, value, ctx);
                    Ok(())
                })),
            },
        )
    }

    pub fn doubles<Ex>(self, name: &str, extract: Ex) -> Self
    where
        Ex: Fn(&U, &C) -> f64 + Send + Sync + 'static,
    {
        self.add(
            name,
            false,
            SeriesKind::Double {
                extract: Box::new(extract),
                update: None,
            },
        )
    }

    pub fn doubles_mut<Ex, Up>(self, name: &str, extract: Ex, update: Up) -> Self
    where
        Ex: Fn(&U, &C) -> f64 + Send + Sync + 'static,
        Up: Fn(&mut U, f64, &C) + Send + Sync + 'static,
    {
        self.add(
            name,
            false,
            SeriesKind::Double {
                extract: Box::new(extract),
                update: Some(Box::new(move |item: &mut U, value: f64, ctx: &C| {
                    update(item, value, ctx);
                    Ok(())
                })),
            },
        )
    }

    pub fn doubles_index<Ex>(self, name: &str, extract: Ex) -> Self
    where
        Ex: Fn(&U, &C) -> f64 + Send + Sync + 'static,
    {
        self.add(
            name,
            true,
            SeriesKind::Double {
                extract: Box::new(extract),
                update: None,
            },
        )
    }

    pub fn booleans<Ex>(self, name: &str, extract: Ex) -> Self
    where
        Ex: Fn(&U, &C) -> bool + Send + Sync + 'static,
    {
        self.add(
            name,
            false,
            SeriesKind::Boolean {
                extract: Box::new(extract),
                update: None,
            },
        )
    }

    pub fn booleans_mut<Ex, Up>(self, name: &str, extract: Ex, update: Up) -> Self
    where
        Ex: Fn(&U, &C) -> bool + Send + Sync + 'static,
        Up: Fn(&mut U, bool, &C) + Send + Sync + 'static,
    {
        self.add(
            name,
            false,
            SeriesKind::Boolean {
                extract: Box::new(extract),
                update: Some(Box::new(move |item: &mut U, value: bool, ctx: &C| {
                    update(item, value, ctx);
                    Ok(())
                })),
            },
        )
    }

    /// Registers a read-only enum-valued column marshaled as the case name.
    pub fn enums<E, Ex>(self, name: &str, extract: Ex) -> Self
    where
        E: ToString + 'static,
        Ex: Fn(&U, &C) -> E + Send + Sync + 'static,
    {
        self.add(
            name,
            false,
            SeriesKind::String {
                extract: Box::new(move |item: &U, ctx: &C| extract(item, ctx).to_string()),
                update: None,
            },
        )
    }

    /// Registers a read/write enum-valued column. An update string matching
    /// no case fails with `InvalidEnumValue` and leaves the item untouched.
    pub fn enums_mut<E, Ex, Up>(self, name: &str, extract: Ex, update: Up) -> Self
    where
        E: ToString + FromStr + 'static,
        Ex: Fn(&U, &C) -> E + Send + Sync + 'static,
        Up: Fn(&mut U, E, &C) + Send + Sync + 'static,
    {
        let series_name = name.to_string();
        self.add(
            name,
            false,
            SeriesKind::String {
                extract: Box::new(move |item: &U, ctx: &C| extract(item, ctx).to_string()),
                update: Some(Box::new(move |item: &mut U, raw: &str, ctx: &C| {
                    match raw.parse::<E>() {
                        Ok(value) => {
                            update(item, value, ctx);
                            Ok(())
                        }
                        Err(_) => Err(MarshalError::InvalidEnumValue {
                            series: series_name.clone(),
                            value: raw.to_string(),
                        }),
                    }
                })),
            },
        )
    }

    //------------------------------------------------------------------------------
    // Build
    //------------------------------------------------------------------------------

    /// Freezes the registered series into an immutable mapper. Fails with
    /// `DuplicateKey` if two series share a name.
    pub fn build(self) -> Result<DataframeMapper<T, U, C>, MarshalError> {
        let Self {
            series,
            items_provider,
            resolver,
        } = self;

        let mut slot_by_name = HashMap::with_capacity(series.len());
        for (slot, mapper) in series.iter().enumerate() {
            let name = &mapper.metadata().name;
            if slot_by_name.insert(name.clone(), slot).is_some() {
                return Err(MarshalError::DuplicateKey(name.clone()));
            }
        }

        let items_provider = items_provider.ok_or_else(|| {
            MarshalError::InternalError(
                "a dataframe mapper requires an items provider".to_string(),
            )
        })?;

        Ok(DataframeMapper {
            series,
            slot_by_name,
            items_provider,
            resolver,
        })
    }
}
