// In: src/handler/native.rs

//! The native flat-buffer sink: allocates the cross-boundary column layout
//! directly, column by column, behind the same writer protocol as the
//! in-process sink.
//!
//! Layout contract (bit-exact with the host runtime): an array of
//! [`NativeSeries`] descriptors, each `{ name: char*, type: int32,
//! isIndex: bool, data: { ptr: void*, length: int32 }, mask: int32*|null }`.
//! Type tags come from [`SeriesDataType::to_tag`] and are stable. String
//! cells are pointers to independently allocated, null-terminated buffers.
//! Boolean cells are one byte each, 0 or 1. The presence mask, when
//! non-null, is a parallel int32 array where 1 means "value absent".
//!
//! Ownership: everything behind a [`NativeDataframe`] is allocated here and
//! never freed by this crate implicitly. The boundary layer receiving the
//! buffer must call [`NativeDataframe::free`] (or the exported
//! `columnar_marshal_free_dataframe`) exactly once.

use std::ffi::{c_char, c_void, CStr, CString};
use std::ptr;

use log::trace;

use crate::error::MarshalError;
use crate::types::SeriesDataType;

use super::{DataframeHandler, SeriesWriter};

//==================================================================================
// I. The Boundary Layout
//==================================================================================

/// A raw pointer plus element count, as seen by the host runtime.
#[repr(C)]
#[derive(Debug)]
pub struct NativeSlice {
    pub ptr: *mut c_void,
    pub length: i32,
}

/// One column descriptor of the flat buffer.
#[repr(C)]
#[derive(Debug)]
pub struct NativeSeries {
    pub name: *mut c_char,
    pub data_type: i32,
    pub is_index: bool,
    pub data: NativeSlice,
    pub mask: *mut i32,
}

impl NativeSeries {
    /// The descriptor's name as UTF-8, for diagnostics and tests.
    ///
    /// # Safety
    /// `name` must still be owned by this buffer (not freed).
    pub unsafe fn name_str(&self) -> &str {
        CStr::from_ptr(self.name).to_str().unwrap_or("<invalid utf-8>")
    }
}

/// An owned handle to a finished flat buffer. Dropping the handle does NOT
/// release the allocations; call [`NativeDataframe::free`] exactly once.
#[repr(C)]
#[derive(Debug)]
pub struct NativeDataframe {
    pub series: *mut NativeSeries,
    pub series_count: i32,
}

impl NativeDataframe {
    /// Views the descriptor array.
    ///
    /// # Safety
    /// The buffer must not have been freed.
    pub unsafe fn series(&self) -> &[NativeSeries] {
        if self.series.is_null() {
            return &[];
        }
        std::slice::from_raw_parts(self.series, self.series_count as usize)
    }

    /// Releases every allocation owned by the buffer: the descriptor array,
    /// every name, every data array, every string cell, and every mask.
    ///
    /// # Safety
    /// The buffer must have been produced by [`NativeHandler::into_buffer`]
    /// and must not have been freed or partially freed already.
    pub unsafe fn free(self) {
        if self.series.is_null() {
            return;
        }
        let descriptors = Box::from_raw(std::slice::from_raw_parts_mut(
            self.series,
            self.series_count as usize,
        ) as *mut [NativeSeries]);
        for d in descriptors.iter() {
            if !d.name.is_null() {
                drop(CString::from_raw(d.name));
            }
            if d.data.ptr.is_null() {
                continue;
            }
            let len = d.data.length as usize;
            match SeriesDataType::from_tag(d.data_type) {
                Ok(SeriesDataType::String) => {
                    let cells = Box::from_raw(std::slice::from_raw_parts_mut(
                        d.data.ptr as *mut *mut c_char,
                        len,
                    ) as *mut [*mut c_char]);
                    for &cell in cells.iter() {
                        if !cell.is_null() {
                            drop(CString::from_raw(cell));
                        }
                    }
                }
                Ok(SeriesDataType::Double) => {
                    drop(Box::from_raw(std::slice::from_raw_parts_mut(
                        d.data.ptr as *mut f64,
                        len,
                    ) as *mut [f64]));
                }
                Ok(SeriesDataType::Int) => {
                    drop(Box::from_raw(std::slice::from_raw_parts_mut(
                        d.data.ptr as *mut i32,
                        len,
                    ) as *mut [i32]));
                    if !d.mask.is_null() {
                        drop(Box::from_raw(
                            std::slice::from_raw_parts_mut(d.mask, len) as *mut [i32]
                        ));
                    }
                }
                Ok(SeriesDataType::Boolean) => {
                    drop(Box::from_raw(std::slice::from_raw_parts_mut(
                        d.data.ptr as *mut u8,
                        len,
                    ) as *mut [u8]));
                }
                Err(_) => debug_assert!(false, "unknown type tag in owned buffer"),
            }
        }
    }
}

/// C entry point for the boundary layer's paired free.
///
/// # Safety
/// Same contract as [`NativeDataframe::free`].
#[no_mangle]
pub unsafe extern "C" fn columnar_marshal_free_dataframe(frame: NativeDataframe) {
    frame.free();
}

//==================================================================================
// II. The Sink
//==================================================================================

/// In-flight storage for one column. Allocations stay Rust-owned until
/// `into_buffer` transfers them, so an abandoned handler leaks nothing.
enum NativePayload {
    Doubles(Box<[f64]>),
    Ints(Box<[i32]>),
    Booleans(Box<[u8]>),
    Strings(Box<[Option<CString>]>),
    OptionalInts {
        cells: Box<[i32]>,
        mask: Box<[i32]>,
    },
}

struct NativeColumn {
    name: String,
    data_type: SeriesDataType,
    is_index: bool,
    payload: NativePayload,
}

/// Flat-buffer [`DataframeHandler`]. Must be driven `allocate` first, then
/// exactly the announced number of series factories; any other order fails.
#[derive(Default)]
pub struct NativeHandler {
    expected: Option<usize>,
    columns: Vec<NativeColumn>,
}

impl NativeHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks the write protocol before a new column begins.
    fn check_cursor(&self, name: &str) -> Result<(), MarshalError> {
        let Some(expected) = self.expected else {
            return Err(MarshalError::InternalError(format!(
                "native sink received series '{name}' before allocate()"
            )));
        };
        if self.columns.len() >= expected {
            return Err(MarshalError::InternalError(format!(
                "native sink received series '{name}' past the allocated count of {expected}"
            )));
        }
        trace!(
            "native sink: series '{}' at cursor {}/{}",
            name,
            self.columns.len(),
            expected
        );
        Ok(())
    }

    fn push_column(
        &mut self,
        name: &str,
        data_type: SeriesDataType,
        is_index: bool,
        payload: NativePayload,
    ) -> Result<&mut NativeColumn, MarshalError> {
        self.check_cursor(name)?;
        self.columns.push(NativeColumn {
            name: name.to_string(),
            data_type,
            is_index,
            payload,
        });
        match self.columns.last_mut() {
            Some(col) => Ok(col),
            None => Err(MarshalError::InternalError(
                "freshly pushed native column is missing".to_string(),
            )),
        }
    }

    /// Finishes the buffer and transfers ownership of every allocation to
    /// the caller. The returned handle must eventually be freed exactly once
    /// by the boundary layer.
    pub fn into_buffer(self) -> Result<NativeDataframe, MarshalError> {
        if let Some(expected) = self.expected {
            if self.columns.len() != expected {
                return Err(MarshalError::InternalError(format!(
                    "native sink finished after {} of {} announced series",
                    self.columns.len(),
                    expected
                )));
            }
        }

        // Convert all names first: a NUL failure here must not half-leak.
        let mut names = Vec::with_capacity(self.columns.len());
        for col in &self.columns {
            names.push(CString::new(col.name.as_str())?);
        }

        let mut descriptors = Vec::with_capacity(self.columns.len());
        for (col, name) in self.columns.into_iter().zip(names) {
            let (data_ptr, length, mask) = match col.payload {
                NativePayload::Doubles(cells) => {
                    let length = cells.len() as i32;
                    (
                        Box::leak(cells).as_mut_ptr() as *mut c_void,
                        length,
                        ptr::null_mut(),
                    )
                }
                NativePayload::Ints(cells) => {
                    let length = cells.len() as i32;
                    (
                        Box::leak(cells).as_mut_ptr() as *mut c_void,
                        length,
                        ptr::null_mut(),
                    )
                }
                NativePayload::Booleans(cells) => {
                    let length = cells.len() as i32;
                    (
                        Box::leak(cells).as_mut_ptr() as *mut c_void,
                        length,
                        ptr::null_mut(),
                    )
                }
                NativePayload::Strings(cells) => {
                    let length = cells.len() as i32;
                    let raw: Vec<*mut c_char> = cells
                        .into_vec()
                        .into_iter()
                        .map(|cell| cell.map_or(ptr::null_mut(), CString::into_raw))
                        .collect();
                    (
                        Box::leak(raw.into_boxed_slice()).as_mut_ptr() as *mut c_void,
                        length,
                        ptr::null_mut(),
                    )
                }
                NativePayload::OptionalInts { cells, mask } => {
                    let length = cells.len() as i32;
                    (
                        Box::leak(cells).as_mut_ptr() as *mut c_void,
                        length,
                        Box::leak(mask).as_mut_ptr(),
                    )
                }
            };
            descriptors.push(NativeSeries {
                name: name.into_raw(),
                data_type: col.data_type.to_tag(),
                is_index: col.is_index,
                data: NativeSlice {
                    ptr: data_ptr,
                    length,
                },
                mask,
            });
        }

        let series_count = descriptors.len() as i32;
        let series = Box::leak(descriptors.into_boxed_slice()).as_mut_ptr();
        Ok(NativeDataframe {
            series,
            series_count,
        })
    }
}

//==================================================================================
// III. Writers
//==================================================================================

struct SliceWriter<'a, V: Copy> {
    name: &'a str,
    cells: &'a mut [V],
}

impl<V: Copy> SliceWriter<'_, V> {
    fn slot(&mut self, row: usize) -> Result<&mut V, MarshalError> {
        let size = self.cells.len();
        self.cells.get_mut(row).ok_or_else(|| {
            MarshalError::InternalError(format!(
                "write at row {row} past the end of series '{}' ({size} rows)",
                self.name
            ))
        })
    }
}

impl SeriesWriter<f64> for SliceWriter<'_, f64> {
    fn set(&mut self, row: usize, value: f64) -> Result<(), MarshalError> {
        *self.slot(row)? = value;
        Ok(())
    }
}

impl SeriesWriter<i32> for SliceWriter<'_, i32> {
    fn set(&mut self, row: usize, value: i32) -> Result<(), MarshalError> {
        *self.slot(row)? = value;
        Ok(())
    }
}

impl SeriesWriter<bool> for SliceWriter<'_, u8> {
    fn set(&mut self, row: usize, value: bool) -> Result<(), MarshalError> {
        *self.slot(row)? = value as u8;
        Ok(())
    }
}

struct NativeStringWriter<'a> {
    name: &'a str,
    cells: &'a mut [Option<CString>],
}

impl SeriesWriter<String> for NativeStringWriter<'_> {
    fn set(&mut self, row: usize, value: String) -> Result<(), MarshalError> {
        let size = self.cells.len();
        let slot = self.cells.get_mut(row).ok_or_else(|| {
            MarshalError::InternalError(format!(
                "write at row {row} past the end of series '{}' ({size} rows)",
                self.name
            ))
        })?;
        *slot = Some(CString::new(value)?);
        Ok(())
    }
}

struct MaskedIntWriter<'a> {
    name: &'a str,
    cells: &'a mut [i32],
    mask: &'a mut [i32],
}

impl SeriesWriter<Option<i32>> for MaskedIntWriter<'_> {
    fn set(&mut self, row: usize, value: Option<i32>) -> Result<(), MarshalError> {
        if row >= self.cells.len() {
            return Err(MarshalError::InternalError(format!(
                "write at row {row} past the end of series '{}' ({} rows)",
                self.name,
                self.cells.len()
            )));
        }
        match value {
            Some(v) => {
                self.cells[row] = v;
                self.mask[row] = 0;
            }
            None => {
                // Absent cells keep a fixed sentinel in the data array.
                self.cells[row] = 0;
                self.mask[row] = 1;
            }
        }
        Ok(())
    }
}

//==================================================================================
// IV. DataframeHandler Implementation
//==================================================================================

impl DataframeHandler for NativeHandler {
    fn allocate(&mut self, series_count: usize) {
        self.expected = Some(series_count);
        self.columns.reserve(series_count);
    }

    fn new_string_series(
        &mut self,
        name: &str,
        size: usize,
    ) -> Result<Box<dyn SeriesWriter<String> + '_>, MarshalError> {
        let payload = NativePayload::Strings(vec![None; size].into_boxed_slice());
        let col = self.push_column(name, SeriesDataType::String, false, payload)?;
        let NativePayload::Strings(cells) = &mut col.payload else {
            return Err(MarshalError::InternalError("payload variant changed".into()));
        };
        Ok(Box::new(NativeStringWriter {
            name: &col.name,
            cells,
        }))
    }

    fn new_string_index(
        &mut self,
        name: &str,
        size: usize,
    ) -> Result<Box<dyn SeriesWriter<String> + '_>, MarshalError> {
        let payload = NativePayload::Strings(vec![None; size].into_boxed_slice());
        let col = self.push_column(name, SeriesDataType::String, true, payload)?;
        let NativePayload::Strings(cells) = &mut col.payload else {
            return Err(MarshalError::InternalError("payload variant changed".into()));
        };
        Ok(Box::new(NativeStringWriter {
            name: &col.name,
            cells,
        }))
    }

    fn new_int_series(
        &mut self,
        name: &str,
        size: usize,
    ) -> Result<Box<dyn SeriesWriter<i32> + '_>, MarshalError> {
        let payload = NativePayload::Ints(vec![0; size].into_boxed_slice());
        let col = self.push_column(name, SeriesDataType::Int, false, payload)?;
        let NativePayload::Ints(cells) = &mut col.payload else {
            return Err(MarshalError::InternalError("payload variant changed".into()));
        };
        Ok(Box::new(SliceWriter {
            name: &col.name,
            cells,
        }))
    }

    fn new_int_index(
        &mut self,
        name: &str,
        size: usize,
    ) -> Result<Box<dyn SeriesWriter<i32> + '_>, MarshalError> {
        let payload = NativePayload::Ints(vec![0; size].into_boxed_slice());
        let col = self.push_column(name, SeriesDataType::Int, true, payload)?;
        let NativePayload::Ints(cells) = &mut col.payload else {
            return Err(MarshalError::InternalError("payload variant changed".into()));
        };
        Ok(Box::new(SliceWriter {
            name: &col.name,
            cells,
        }))
    }

    fn new_double_series(
        &mut self,
        name: &str,
        size: usize,
    ) -> Result<Box<dyn SeriesWriter<f64> + '_>, MarshalError> {
        let payload = NativePayload::Doubles(vec![0.0; size].into_boxed_slice());
        let col = self.push_column(name, SeriesDataType::Double, false, payload)?;
        let NativePayload::Doubles(cells) = &mut col.payload else {
            return Err(MarshalError::InternalError("payload variant changed".into()));
        };
        Ok(Box::new(SliceWriter {
            name: &col.name,
            cells,
        }))
    }

    fn new_double_index(
        &mut self,
        name: &str,
        size: usize,
    ) -> Result<Box<dyn SeriesWriter<f64> + '_>, MarshalError> {
        let payload = NativePayload::Doubles(vec![0.0; size].into_boxed_slice());
        let col = self.push_column(name, SeriesDataType::Double, true, payload)?;
        let NativePayload::Doubles(cells) = &mut col.payload else {
            return Err(MarshalError::InternalError("payload variant changed".into()));
        };
        Ok(Box::new(SliceWriter {
            name: &col.name,
            cells,
        }))
    }

    fn new_boolean_series(
        &mut self,
        name: &str,
        size: usize,
    ) -> Result<Box<dyn SeriesWriter<bool> + '_>, MarshalError> {
        let payload = NativePayload::Booleans(vec![0u8; size].into_boxed_slice());
        let col = self.push_column(name, SeriesDataType::Boolean, false, payload)?;
        let NativePayload::Booleans(cells) = &mut col.payload else {
            return Err(MarshalError::InternalError("payload variant changed".into()));
        };
        Ok(Box::new(SliceWriter {
            name: &col.name,
            cells,
        }))
    }

    fn new_optional_int_series(
        &mut self,
        name: &str,
        size: usize,
    ) -> Result<Box<dyn SeriesWriter<Option<i32>> + '_>, MarshalError> {
        let payload = NativePayload::OptionalInts {
            cells: vec![0; size].into_boxed_slice(),
            mask: vec![0; size].into_boxed_slice(),
        };
        let col = self.push_column(name, SeriesDataType::Int, false, payload)?;
        let NativePayload::OptionalInts { cells, mask } = &mut col.payload else {
            return Err(MarshalError::InternalError("payload variant changed".into()));
        };
        Ok(Box::new(MaskedIntWriter {
            name: &col.name,
            cells,
            mask,
        }))
    }
}
