//! End-to-end engine tests over an in-memory raster transport.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use geoworld_core::{
    BiomeCaches, BiomeOptions, BiomeResult, BiomeType, CacheHandle, DungeonBiomeResolver,
    ElevationOptions, Geohash, GradingEntry, LandGrading, LocationType, MemoryCache,
    RasterFetcher, TopologyCaches, WorldEngine, WorldError, WorldSeed,
};

fn constant_png(width: u32, height: u32, intensity: u8) -> Vec<u8> {
    let image = image::GrayImage::from_pixel(width, height, image::Luma([intensity]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

struct CountingFetcher {
    payload: Vec<u8>,
    calls: AtomicUsize,
}

impl CountingFetcher {
    fn new(payload: Vec<u8>) -> Self {
        Self {
            payload,
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RasterFetcher for CountingFetcher {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>, WorldError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.payload.clone())
    }
}

fn engine_with(fetcher: Arc<CountingFetcher>) -> WorldEngine {
    WorldEngine::builder()
        .topology_base_url("mem://topology")
        .fetcher(fetcher)
        .build()
}

fn gh(address: &str) -> Geohash {
    Geohash::new(address).unwrap()
}

#[tokio::test]
async fn constant_raster_elevation() {
    let engine = engine_with(Arc::new(CountingFetcher::new(constant_png(16, 8, 128))));
    let elevation = engine
        .elevation_at(&gh("w21z3t"), LocationType::Geohash, &Default::default())
        .await
        .unwrap();
    assert_eq!(elevation, 128);
}

#[tokio::test]
async fn land_grading_overrides_raster() {
    let engine = engine_with(Arc::new(CountingFetcher::new(constant_png(16, 8, 128))));
    let mut grading = LandGrading::new();
    grading.set(
        LocationType::Geohash,
        "w21z3t",
        GradingEntry {
            elevation: Some(7),
            decorations: None,
        },
    );
    let options = ElevationOptions {
        land_grading: Some(Arc::new(grading)),
        ..Default::default()
    };

    let graded = engine
        .elevation_at(&gh("w21z3t"), LocationType::Geohash, &options)
        .await
        .unwrap();
    assert_eq!(graded, 7);

    // Neighbors are untouched by the override.
    let neighbor = engine
        .elevation_at(&gh("w21z3u"), LocationType::Geohash, &options)
        .await
        .unwrap();
    assert_eq!(neighbor, 128);
}

#[tokio::test]
async fn caches_bound_fetches() {
    let fetcher = Arc::new(CountingFetcher::new(constant_png(16, 8, 99)));
    let engine = engine_with(fetcher.clone());
    let buffer: CacheHandle<Arc<geoworld_core::RasterBuffer>> = Arc::new(MemoryCache::new(16));
    let options = ElevationOptions {
        caches: TopologyCaches {
            buffer: Some(buffer),
            ..Default::default()
        },
        ..Default::default()
    };

    // Many addresses in one tile: a single fetch serves them all.
    for address in ["w21z3t", "w21z3u", "w2bpbp", "w2zzzz"] {
        engine
            .elevation_at(&gh(address), LocationType::Geohash, &options)
            .await
            .unwrap();
    }
    assert_eq!(fetcher.call_count(), 1);
}

#[tokio::test]
async fn sea_level_is_aquatic() {
    let engine = engine_with(Arc::new(CountingFetcher::new(constant_png(16, 8, 0))));
    let result = engine
        .biome_at(&gh("w21z3t"), LocationType::Geohash, &Default::default())
        .await
        .unwrap();
    assert_eq!(result, (BiomeType::Aquatic, 1.0));
}

#[tokio::test]
async fn test_region_is_tundra() {
    let engine = engine_with(Arc::new(CountingFetcher::new(constant_png(16, 8, 180))));
    let result = engine
        .biome_at(&gh("h9zzzzzz"), LocationType::Geohash, &Default::default())
        .await
        .unwrap();
    assert_eq!(result, (BiomeType::Tundra, 0.0));
}

#[tokio::test]
async fn injected_dungeon_resolver_is_used() {
    struct FloodedResolver;

    #[async_trait]
    impl DungeonBiomeResolver for FloodedResolver {
        async fn dungeon_biome_at(
            &self,
            _address: &Geohash,
            _location: LocationType,
            _caches: &BiomeCaches,
        ) -> Result<BiomeResult, WorldError> {
            Ok((BiomeType::Aquatic, 0.5))
        }
    }

    let engine = WorldEngine::builder()
        .topology_base_url("mem://topology")
        .fetcher(Arc::new(CountingFetcher::new(constant_png(16, 8, 180))))
        .dungeon_resolver(Arc::new(FloodedResolver))
        .build();

    let result = engine
        .biome_at(&gh("w21z3t"), LocationType::D1, &Default::default())
        .await
        .unwrap();
    assert_eq!(result, (BiomeType::Aquatic, 0.5));

    // The surface path is unaffected by the resolver swap.
    let (surface, _) = engine
        .biome_at(&gh("w21z3t"), LocationType::Geohash, &Default::default())
        .await
        .unwrap();
    assert_ne!(surface, BiomeType::Underground);
}

#[tokio::test]
async fn world_agrees_across_engine_instances() {
    let addresses = ["w21z3t", "w2bpbp", "sk3mqq", "w21z3u"];
    let mut first: Vec<(u8, BiomeResult)> = Vec::new();

    for round in 0..2 {
        // Fresh engine, fresh caches: only the seed may carry state.
        let engine = engine_with(Arc::new(CountingFetcher::new(constant_png(16, 8, 120))));
        for address in addresses {
            let elevation = engine
                .elevation_at(&gh(address), LocationType::Geohash, &Default::default())
                .await
                .unwrap();
            let biome = engine
                .biome_at(&gh(address), LocationType::Geohash, &Default::default())
                .await
                .unwrap();
            if round == 0 {
                first.push((elevation, biome));
            } else {
                assert_eq!((elevation, biome), first.remove(0), "mismatch at {address}");
            }
        }
    }
}

#[tokio::test]
async fn seed_roundtrips_through_json() {
    let seed = WorldSeed::default();
    let restored = WorldSeed::from_json(&seed.to_json()).unwrap();
    let engine = WorldEngine::builder()
        .seed(restored)
        .topology_base_url("mem://topology")
        .fetcher(Arc::new(CountingFetcher::new(constant_png(16, 8, 120))))
        .build();

    let params = engine
        .region_parameters(&gh("w21z3t"), &BiomeOptions::default())
        .await
        .unwrap();
    let total: f64 = params.values().sum();
    assert!((total - 1.0).abs() < 1e-9);
}
