//! Shared fixtures for store and service tests.

use std::sync::Arc;

use pcbook_proto::prost_types::Timestamp;
use pcbook_proto::v1::{
    Cpu, Gpu, Keyboard, Laptop, Memory, Screen, Storage, keyboard, laptop, memory, screen,
    storage,
};

use crate::server::LaptopServiceImpl;
use crate::storage::{
    DiskImageStore, ImageStore, InMemoryLaptopStore, InMemoryRatingStore, LaptopStore,
    RatingStore,
};

pub fn memory(value: u64, unit: memory::Unit) -> Memory {
    Memory {
        value,
        unit: unit.into(),
    }
}

pub fn gigabytes(value: u64) -> Memory {
    memory(value, memory::Unit::Gigabyte)
}

/// A fully populated laptop with a fresh v4 id.
pub fn sample_laptop() -> Laptop {
    Laptop {
        id: uuid::Uuid::new_v4().to_string(),
        brand: "Lenovo".into(),
        name: "Thinkpad X1".into(),
        cpu: Some(Cpu {
            brand: "Intel".into(),
            name: "Core i7-1185G7".into(),
            number_cores: 4,
            number_threads: 8,
            min_ghz: 3.0,
            max_ghz: 4.8,
        }),
        ram: Some(gigabytes(16)),
        gpus: vec![Gpu {
            brand: "NVIDIA".into(),
            name: "RTX 3050".into(),
            min_ghz: 1.2,
            max_ghz: 1.7,
            memory: Some(gigabytes(4)),
        }],
        storages: vec![
            Storage {
                driver: storage::Driver::Ssd.into(),
                memory: Some(memory(512, memory::Unit::Gigabyte)),
            },
            Storage {
                driver: storage::Driver::Hdd.into(),
                memory: Some(memory(1, memory::Unit::Terabyte)),
            },
        ],
        screen: Some(Screen {
            size_inch: 14.0,
            resolution: Some(screen::Resolution {
                width: 1920,
                height: 1080,
            }),
            panel: screen::Panel::Ips.into(),
            multitouch: false,
        }),
        keyboard: Some(Keyboard {
            layout: keyboard::Layout::Qwerty.into(),
            backlit: true,
        }),
        weight: Some(laptop::Weight::WeightKg(1.2)),
        price_usd: 1800.0,
        release_year: 2021,
        updated_at: Some(Timestamp {
            seconds: 1_700_000_000,
            nanos: 0,
        }),
    }
}

/// A sample laptop with the four fields the search filter looks at overridden.
pub fn laptop_with(price_usd: f64, cores: u32, min_ghz: f64, ram: Memory) -> Laptop {
    let mut laptop = sample_laptop();
    laptop.price_usd = price_usd;
    if let Some(cpu) = laptop.cpu.as_mut() {
        cpu.number_cores = cores;
        cpu.min_ghz = min_ghz;
    }
    laptop.ram = Some(ram);
    laptop
}

/// Stores and service wired together for handler tests.
pub struct ServiceFixture {
    pub laptops: Arc<InMemoryLaptopStore>,
    pub ratings: Arc<InMemoryRatingStore>,
    pub images: Arc<DiskImageStore>,
    pub service: LaptopServiceImpl,
    pub image_dir: tempfile::TempDir,
}

#[allow(clippy::unwrap_used)]
pub fn service_fixture() -> ServiceFixture {
    let image_dir = tempfile::tempdir().unwrap();
    let laptops = Arc::new(InMemoryLaptopStore::new());
    let ratings = Arc::new(InMemoryRatingStore::new());
    let images = Arc::new(DiskImageStore::open(image_dir.path()).unwrap());
    let service = LaptopServiceImpl::new(
        Arc::clone(&laptops) as Arc<dyn LaptopStore>,
        Arc::clone(&images) as Arc<dyn ImageStore>,
        Arc::clone(&ratings) as Arc<dyn RatingStore>,
    );
    ServiceFixture {
        laptops,
        ratings,
        images,
        service,
        image_dir,
    }
}
