//! Build-time float storage shared by every prob/backoff representation.

use super::ProbBackoffPair;
use crate::error::{Error, Result};
use crate::types::Offset;

#[derive(Debug, Clone, Default)]
struct RawOrder {
    probs: Vec<f32>,
    /// Empty for the highest order, which has no backoff.
    backoffs: Vec<f32>,
    released: bool,
}

/// Per-order `f32` arrays indexed by offset.
///
/// Unwritten slots read as `ProbBackoffPair::default()` (both fields 0.0).
#[derive(Debug, Clone, Default)]
pub(crate) struct RawProbBackoff {
    orders: Vec<RawOrder>,
    sizes: Vec<u64>,
}

fn try_grow(vec: &mut Vec<f32>, size: usize, order: usize) -> Result<()> {
    if size > vec.len() {
        vec.try_reserve(size - vec.len())
            .map_err(|_| Error::ResourceExhausted {
                order,
                requested: size as u64,
            })?;
        vec.resize(size, 0.0);
    }
    Ok(())
}

impl RawProbBackoff {
    pub(crate) fn new(num_orders: usize) -> Self {
        Self {
            orders: vec![RawOrder::default(); num_orders],
            sizes: vec![0; num_orders],
        }
    }

    pub(crate) fn num_orders(&self) -> usize {
        self.orders.len()
    }

    pub(crate) fn resize_orders(&mut self, num_orders: usize) {
        self.orders.resize_with(num_orders, RawOrder::default);
        self.sizes.resize(num_orders, 0);
    }

    pub(crate) fn has_backoff(&self, order: usize) -> bool {
        order + 1 < self.orders.len()
    }

    pub(crate) fn size(&self, order: usize) -> u64 {
        self.sizes.get(order).copied().unwrap_or(0)
    }

    pub(crate) fn is_released(&self, order: usize) -> bool {
        self.orders[order].released
    }

    pub(crate) fn ensure_size(&mut self, order: usize, size: u64) -> Result<()> {
        if self.orders[order].released {
            return Err(Error::AlreadyFinalized(order));
        }
        if size <= self.sizes[order] {
            return Ok(());
        }
        let has_backoff = self.has_backoff(order);
        let slots = usize::try_from(size).map_err(|_| Error::ResourceExhausted {
            order,
            requested: size,
        })?;
        let raw = &mut self.orders[order];
        try_grow(&mut raw.probs, slots, order)?;
        if has_backoff {
            try_grow(&mut raw.backoffs, slots, order)?;
        }
        self.sizes[order] = size;
        Ok(())
    }

    pub(crate) fn set(&mut self, order: usize, offset: Offset, value: &ProbBackoffPair) {
        let raw = &mut self.orders[order];
        raw.probs[offset.index()] = value.prob;
        if let Some(backoff) = raw.backoffs.get_mut(offset.index()) {
            *backoff = value.backoff;
        }
    }

    pub(crate) fn get(&self, order: usize, offset: Offset) -> ProbBackoffPair {
        let raw = &self.orders[order];
        assert!(
            !raw.released,
            "raw storage of order {order} was released after compression"
        );
        ProbBackoffPair {
            prob: raw.probs[offset.index()],
            backoff: raw.backoffs.get(offset.index()).copied().unwrap_or(0.0),
        }
    }

    pub(crate) fn swap(&mut self, order: usize, a: Offset, b: Offset) {
        let raw = &mut self.orders[order];
        raw.probs.swap(a.index(), b.index());
        if !raw.backoffs.is_empty() {
            raw.backoffs.swap(a.index(), b.index());
        }
    }

    pub(crate) fn truncate(&mut self, order: usize, size: u64) {
        let raw = &mut self.orders[order];
        raw.probs.truncate(size as usize);
        raw.probs.shrink_to_fit();
        raw.backoffs.truncate(size as usize);
        raw.backoffs.shrink_to_fit();
        self.sizes[order] = self.sizes[order].min(size);
    }

    /// Drops the arrays of `order`; its size is kept.
    pub(crate) fn release(&mut self, order: usize) {
        let raw = &mut self.orders[order];
        raw.probs = Vec::new();
        raw.backoffs = Vec::new();
        raw.released = true;
    }

    pub(crate) fn shrink(&mut self) {
        for raw in &mut self.orders {
            raw.probs.shrink_to_fit();
            raw.backoffs.shrink_to_fit();
        }
    }

    /// Marks `order` as holding `size` values that live elsewhere (loaded blobs).
    pub(crate) fn adopt_released(&mut self, order: usize, size: u64) {
        self.sizes[order] = size;
        self.release(order);
    }

    pub(crate) fn probs(&self, order: usize) -> &[f32] {
        &self.orders[order].probs
    }

    pub(crate) fn backoffs(&self, order: usize) -> &[f32] {
        &self.orders[order].backoffs
    }
}
