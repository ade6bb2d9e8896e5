//! Laptop catalog store.

use std::collections::HashMap;
use std::sync::RwLock;

use pcbook_proto::v1::{Filter, Laptop, Memory, memory};

use super::StoreError;
use crate::context::CallContext;

/// Catalog of laptops keyed by id.
pub trait LaptopStore: Send + Sync {
    /// Insert a copy of `laptop`; fails with `AlreadyExists` on a duplicate id.
    fn save(&self, laptop: &Laptop) -> Result<(), StoreError>;

    /// Copy of the laptop with `id`, or `None` if absent.
    fn find(&self, id: &str) -> Result<Option<Laptop>, StoreError>;

    /// Hand a copy of every laptop matching `filter` to `found`.
    ///
    /// `ctx` is checked before each record; the scan stops with
    /// `StoreError::Interrupted` when it fires, and stops with whatever
    /// error `found` returns.
    fn search(
        &self,
        ctx: &CallContext,
        filter: &Filter,
        found: &mut dyn FnMut(Laptop) -> Result<(), StoreError>,
    ) -> Result<(), StoreError>;
}

/// Reference [`LaptopStore`] holding everything in a `HashMap`.
///
/// A scan holds the read lock for its whole duration, so a concurrent
/// `save` waits until the scan completes.
#[derive(Debug, Default)]
pub struct InMemoryLaptopStore {
    data: RwLock<HashMap<String, Laptop>>,
}

impl InMemoryLaptopStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LaptopStore for InMemoryLaptopStore {
    fn save(&self, laptop: &Laptop) -> Result<(), StoreError> {
        let mut data = self.data.write()?;
        if data.contains_key(&laptop.id) {
            return Err(StoreError::AlreadyExists(laptop.id.clone()));
        }
        data.insert(laptop.id.clone(), laptop.clone());
        Ok(())
    }

    fn find(&self, id: &str) -> Result<Option<Laptop>, StoreError> {
        Ok(self.data.read()?.get(id).cloned())
    }

    fn search(
        &self,
        ctx: &CallContext,
        filter: &Filter,
        found: &mut dyn FnMut(Laptop) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let data = self.data.read()?;
        for laptop in data.values() {
            ctx.check()?;
            if is_qualified(filter, laptop) {
                found(laptop.clone())?;
            }
        }
        Ok(())
    }
}

/// Whether `laptop` satisfies every bound in `filter`.
///
/// Price is an upper bound; cores, minimum clock and RAM are lower bounds.
/// Absent sub-messages count as zero.
pub fn is_qualified(filter: &Filter, laptop: &Laptop) -> bool {
    if laptop.price_usd > filter.max_price_usd {
        return false;
    }
    let (cores, ghz) = laptop
        .cpu
        .as_ref()
        .map_or((0, 0.0), |cpu| (cpu.number_cores, cpu.min_ghz));
    if cores < filter.min_cpu_cores || ghz < filter.min_cpu_ghz {
        return false;
    }
    bits_of(laptop.ram.as_ref()) >= bits_of(filter.min_ram.as_ref())
}

fn bits_of(memory: Option<&Memory>) -> u64 {
    memory.map_or(0, memory_in_bits)
}

/// Normalise a memory size to bits (binary multiples: 1 KB = 1024 bytes).
///
/// Unknown units count as zero; results saturate at `u64::MAX`.
pub fn memory_in_bits(memory: &Memory) -> u64 {
    let shift = match memory.unit() {
        memory::Unit::Bit => 0,
        memory::Unit::Byte => 3,
        memory::Unit::Kilobyte => 13,
        memory::Unit::Megabyte => 23,
        memory::Unit::Gigabyte => 33,
        memory::Unit::Terabyte => 43,
        memory::Unit::Unknown => return 0,
    };
    memory.value.saturating_mul(1 << shift)
}
