//! Type-erased columns for archetype tables.
//!
//! A column holds the values of one component type for every row of its
//! archetype, packed back to back. The safe methods check bounds and
//! component types; only the raw accessors leave that to the caller.

use std::{alloc::Layout, ptr::NonNull};

use crate::component::ComponentInfo;

/// Values of one component type, one per archetype row.
///
/// Values enter and leave by bitwise copy.
pub struct Column {
    data: NonNull<u8>,
    len: usize,
    /// In values, not bytes. `usize::MAX` for zero-sized types.
    capacity: usize,
    info: ComponentInfo,
}

// SAFETY: Column owns its allocation and only ever stores `Component` values,
// which are Send + Sync.
unsafe impl Send for Column {}
unsafe impl Sync for Column {}

impl Column {
    #[must_use]
    pub fn new(info: ComponentInfo) -> Self {
        Self {
            data: Self::dangling(&info),
            len: 0,
            capacity: 0,
            info,
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub const fn info(&self) -> &ComponentInfo {
        &self.info
    }

    /// Append the value behind `value`, taking ownership of it.
    ///
    /// # Safety
    ///
    /// `value` must point to an initialized value of this column's type,
    /// outside this column, and the caller must forget that value afterwards.
    pub unsafe fn push_raw(&mut self, value: *const u8) {
        self.reserve(1);

        // SAFETY: reserve(1) made room at index len; the regions are disjoint
        unsafe {
            let slot = self.get_unchecked_raw(self.len);
            std::ptr::copy_nonoverlapping(value, slot, self.info.size());
        }
        self.len += 1;
    }

    /// Append `value`.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not this column's component type.
    pub fn push<T: 'static>(&mut self, value: T) {
        assert!(
            self.info.is::<T>(),
            "pushed `{}` into a `{}` column",
            std::any::type_name::<T>(),
            self.info.name()
        );

        let value = std::mem::ManuallyDrop::new(value);
        // SAFETY: type matches, and ManuallyDrop hands ownership to the column
        unsafe {
            self.push_raw(std::ptr::from_ref(&*value).cast());
        }
    }

    /// Exchange the values at `a` and `b`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn swap(&mut self, a: usize, b: usize) {
        assert!(
            a < self.len && b < self.len,
            "swap({a}, {b}) out of bounds for column of length {}",
            self.len
        );
        if a == b {
            return;
        }

        // SAFETY: both indices are in bounds and distinct, so the slots are disjoint
        unsafe {
            std::ptr::swap_nonoverlapping(
                self.get_unchecked_raw(a),
                self.get_unchecked_raw(b),
                self.info.size(),
            );
        }
    }

    /// Hand the last value over to `dst` without dropping it.
    ///
    /// # Panics
    ///
    /// Panics if this column is empty or `dst` stores another type.
    pub fn move_last_into(&mut self, dst: &mut Self) {
        assert!(self.len > 0, "move_last_into on an empty `{}` column", self.info.name());
        assert_eq!(
            self.info.id(),
            dst.info.id(),
            "move_last_into from a `{}` column into a `{}` column",
            self.info.name(),
            dst.info.name()
        );

        self.len -= 1;
        // SAFETY: the slot at the old last index still holds an initialized
        // value whose ownership now passes to dst; self no longer counts it.
        unsafe {
            let src = self.get_unchecked_raw(self.len);
            dst.push_raw(src);
        }
    }

    /// Drop the last value.
    ///
    /// # Panics
    ///
    /// Panics if the column is empty.
    pub fn pop_drop(&mut self) {
        assert!(self.len > 0, "pop_drop on an empty `{}` column", self.info.name());

        self.len -= 1;
        // SAFETY: the slot at the old last index holds an initialized value
        unsafe {
            let ptr = self.get_unchecked_raw(self.len);
            self.info.drop_in_place(ptr);
        }
    }

    /// Address of slot `index`.
    ///
    /// # Safety
    ///
    /// `index` must be below `len`, or equal to it while spare capacity remains.
    #[must_use]
    pub unsafe fn get_unchecked_raw(&self, index: usize) -> *mut u8 {
        debug_assert!(index < self.len || (index == self.len && self.len < self.capacity));
        // SAFETY: index lies inside the allocation
        unsafe { self.data.as_ptr().add(index * self.info.size()) }
    }

    /// # Safety
    ///
    /// `index < len` and `T` is this column's type.
    #[must_use]
    pub unsafe fn get_unchecked<T: 'static>(&self, index: usize) -> &T {
        debug_assert!(self.info.is::<T>());
        // SAFETY: upheld by the caller
        unsafe { &*self.get_unchecked_raw(index).cast::<T>() }
    }

    /// # Safety
    ///
    /// `index < len` and `T` is this column's type.
    #[must_use]
    pub unsafe fn get_unchecked_mut<T: 'static>(&mut self, index: usize) -> &mut T {
        debug_assert!(self.info.is::<T>());
        // SAFETY: upheld by the caller; &mut self excludes aliases
        unsafe { &mut *self.get_unchecked_raw(index).cast::<T>() }
    }

    /// Checked typed access.
    #[must_use]
    pub fn get<T: 'static>(&self, index: usize) -> Option<&T> {
        if !self.info.is::<T>() || index >= self.len {
            return None;
        }
        // SAFETY: type and bounds checked above
        Some(unsafe { self.get_unchecked(index) })
    }

    /// Checked typed mutable access.
    #[must_use]
    pub fn get_mut<T: 'static>(&mut self, index: usize) -> Option<&mut T> {
        if !self.info.is::<T>() || index >= self.len {
            return None;
        }
        // SAFETY: type and bounds checked above
        Some(unsafe { self.get_unchecked_mut(index) })
    }

    /// View the whole column as a typed slice.
    #[must_use]
    pub fn as_slice<T: 'static>(&self) -> Option<&[T]> {
        if !self.info.is::<T>() {
            return None;
        }
        // SAFETY: type checked, data is aligned for T and holds len initialized values
        Some(unsafe { std::slice::from_raw_parts(self.data.as_ptr().cast::<T>(), self.len) })
    }

    /// Make room for `additional` more values.
    ///
    /// # Panics
    ///
    /// Panics if the new length overflows `usize`.
    pub fn reserve(&mut self, additional: usize) {
        let wanted = self
            .len
            .checked_add(additional)
            .unwrap_or_else(|| panic!("`{}` column length overflow", self.info.name()));
        if wanted > self.capacity {
            self.grow_to(wanted);
        }
    }

    fn grow_to(&mut self, wanted: usize) {
        if self.info.size() == 0 {
            self.capacity = usize::MAX;
            return;
        }

        let capacity = self.capacity.saturating_mul(2).max(wanted).max(4);
        let layout = Self::array_layout(&self.info, capacity);

        // SAFETY: layout is non-empty; a non-zero capacity means data came
        // from an allocation with array_layout(capacity)
        let data = unsafe {
            if self.capacity == 0 {
                std::alloc::alloc(layout)
            } else {
                let current = Self::array_layout(&self.info, self.capacity);
                std::alloc::realloc(self.data.as_ptr(), current, layout.size())
            }
        };

        self.data = NonNull::new(data).unwrap_or_else(|| std::alloc::handle_alloc_error(layout));
        self.capacity = capacity;
    }

    /// Drop every value, keeping the allocation.
    pub fn clear(&mut self) {
        let len = std::mem::take(&mut self.len);
        if !self.info.needs_drop() {
            return;
        }
        for index in 0..len {
            // SAFETY: index is below the old length, so the slot is initialized
            unsafe { self.info.drop_in_place(self.data.as_ptr().add(index * self.info.size())) };
        }
    }

    fn array_layout(info: &ComponentInfo, count: usize) -> Layout {
        info.size()
            .checked_mul(count)
            .and_then(|bytes| Layout::from_size_align(bytes, info.align()).ok())
            .unwrap_or_else(|| panic!("`{}` column of {count} values is too large", info.name()))
    }

    /// Well-aligned placeholder pointer for an empty or zero-sized column.
    fn dangling(info: &ComponentInfo) -> NonNull<u8> {
        NonNull::new(std::ptr::without_provenance_mut(info.align())).unwrap_or(NonNull::dangling())
    }
}

impl Drop for Column {
    fn drop(&mut self) {
        self.clear();

        if self.capacity > 0 && self.info.size() > 0 {
            // SAFETY: data was allocated with array_layout(capacity)
            unsafe { std::alloc::dealloc(self.data.as_ptr(), Self::array_layout(&self.info, self.capacity)) };
        }
    }
}

impl std::fmt::Debug for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("component", &self.info.name())
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .finish()
    }
}
