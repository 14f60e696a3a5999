//! Per-order suffix links shared by the prob/backoff containers.
//!
//! While an order is being built its links live in a `Vec<u64>`; when the
//! order is trimmed they are re-packed at the smallest fixed width that holds
//! the largest link.

use crate::bits::BitList;
use crate::error::{Error, Result};
use crate::types::Offset;

#[derive(Debug, Clone)]
enum LinkStore {
    Building(Vec<u64>),
    Packed { bits: BitList, width: u32, len: u64 },
}

impl Default for LinkStore {
    fn default() -> Self {
        Self::Building(Vec::new())
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SuffixLinks {
    enabled: bool,
    orders: Vec<LinkStore>,
}

impl SuffixLinks {
    pub(crate) fn new(num_orders: usize, enabled: bool) -> Self {
        Self {
            enabled,
            orders: vec![LinkStore::default(); num_orders],
        }
    }

    pub(crate) fn enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn resize_orders(&mut self, num_orders: usize) {
        self.orders.resize_with(num_orders, LinkStore::default);
    }

    pub(crate) fn ensure_size(&mut self, order: usize, size: u64) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        match &mut self.orders[order] {
            LinkStore::Building(links) => {
                let size = size as usize;
                if size > links.len() {
                    links
                        .try_reserve(size - links.len())
                        .map_err(|_| Error::ResourceExhausted {
                            order,
                            requested: size as u64,
                        })?;
                    links.resize(size, 0);
                }
                Ok(())
            }
            LinkStore::Packed { .. } => Err(Error::AlreadyFinalized(order)),
        }
    }

    pub(crate) fn set(&mut self, order: usize, offset: Offset, link: u64) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        match &mut self.orders[order] {
            LinkStore::Building(links) => {
                links[offset.index()] = link;
                Ok(())
            }
            LinkStore::Packed { .. } => Err(Error::AlreadyFinalized(order)),
        }
    }

    pub(crate) fn get(&self, order: usize, offset: Offset) -> Offset {
        assert!(self.enabled, "suffix links are not stored by this container");
        match &self.orders[order] {
            LinkStore::Building(links) => {
                assert!(
                    offset.index() < links.len(),
                    "offset {offset} not populated at order {order}"
                );
                Offset(links[offset.index()])
            }
            LinkStore::Packed { bits, width, len } => {
                assert!(
                    offset.get() < *len,
                    "offset {offset} not populated at order {order}"
                );
                Offset(bits.get_bits(offset.get() * u64::from(*width), *width))
            }
        }
    }

    pub(crate) fn swap(&mut self, order: usize, a: Offset, b: Offset) {
        if !self.enabled {
            return;
        }
        match &mut self.orders[order] {
            LinkStore::Building(links) => links.swap(a.index(), b.index()),
            LinkStore::Packed { bits, width, .. } => {
                let width = *width;
                let pa = a.get() * u64::from(width);
                let pb = b.get() * u64::from(width);
                let va = bits.get_bits(pa, width);
                let vb = bits.get_bits(pb, width);
                bits.set_bits(pa, vb, width);
                bits.set_bits(pb, va, width);
            }
        }
    }

    /// Truncates the order to `size` links and packs them.
    pub(crate) fn pack(&mut self, order: usize, size: u64) {
        if !self.enabled {
            return;
        }
        let packed = match &mut self.orders[order] {
            LinkStore::Building(links) => {
                links.truncate(size as usize);
                let max = links.iter().copied().max().unwrap_or(0);
                let width = u64::BITS - max.leading_zeros();
                let mut bits = BitList::with_capacity(links.len() as u64 * u64::from(width));
                for &link in links.iter() {
                    bits.write_bits(link, width);
                }
                bits.shrink_to_fit();
                Some(LinkStore::Packed {
                    bits,
                    width,
                    len: links.len() as u64,
                })
            }
            LinkStore::Packed { .. } => None,
        };
        if let Some(packed) = packed {
            self.orders[order] = packed;
        }
    }

    pub(crate) fn shrink(&mut self) {
        for store in &mut self.orders {
            if let LinkStore::Building(links) = store {
                links.shrink_to_fit();
            }
        }
    }

    /// Links of `order` as plain integers, for persistence.
    pub(crate) fn export(&self, order: usize) -> Option<Vec<u64>> {
        if !self.enabled {
            return None;
        }
        let len = match &self.orders[order] {
            LinkStore::Building(links) => links.len() as u64,
            LinkStore::Packed { len, .. } => *len,
        };
        Some((0..len).map(|o| self.get(order, Offset(o)).get()).collect())
    }

    /// Restores a packed order from persisted links.
    pub(crate) fn import(&mut self, order: usize, links: Vec<u64>) {
        let size = links.len() as u64;
        self.enabled = true;
        self.orders[order] = LinkStore::Building(links);
        self.pack(order, size);
    }
}
