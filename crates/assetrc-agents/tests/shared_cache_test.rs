// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{Context, Result};
use assetrc_agents::CacheGroup;
use assetrc_core::asset::{Asset, AssetHandle, AssetIdentity};
use assetrc_core::{CacheConfig, ProviderId};
use assetrc_data::{RefCountedCache, TypeHandlerRegistry};
use assetrc_telemetry::MetricsRegistry;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering::SeqCst};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::tempdir;

// --- Test Setup: file-backed assets ---
#[derive(Debug)]
struct Texture {
    bytes: Vec<u8>,
}
impl Asset for Texture {}

#[derive(Debug)]
struct Font {
    size: u32,
    atlas: AssetHandle<Texture>,
    atlas_name: String,
}
impl Asset for Font {}

#[derive(Default)]
struct DiskReads {
    textures: AtomicUsize,
    fonts: AtomicUsize,
    texture_unloads: AtomicUsize,
}

/// Reads `identity` relative to the cache's root.
fn read_asset(cache: &RefCountedCache, identity: &AssetIdentity) -> Result<String> {
    let path = cache.config().root_path().join(identity.as_str());
    fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))
}

/// Font files are `<size>\n<atlas texture name>`.
fn register_handlers(handlers: &TypeHandlerRegistry) -> Arc<DiskReads> {
    let reads = Arc::new(DiskReads::default());

    let counter = reads.clone();
    handlers.register_load(
        move |cache: &RefCountedCache, identity: &AssetIdentity| -> Result<Texture> {
            counter.textures.fetch_add(1, SeqCst);
            Ok(Texture {
                bytes: read_asset(cache, identity)?.into_bytes(),
            })
        },
    );
    let counter = reads.clone();
    handlers.register_unload(
        move |_cache: &RefCountedCache, _texture: &Texture, _identity: &AssetIdentity| -> Result<()> {
            counter.texture_unloads.fetch_add(1, SeqCst);
            Ok(())
        },
    );

    let counter = reads.clone();
    handlers.register_load(
        move |cache: &RefCountedCache, identity: &AssetIdentity| -> Result<Font> {
            counter.fonts.fetch_add(1, SeqCst);
            let text = read_asset(cache, identity)?;
            let mut lines = text.lines();
            let size = lines.next().context("missing font size")?.trim().parse()?;
            let atlas_name = lines.next().context("missing atlas name")?.trim().to_string();
            let atlas = cache.load::<Texture>(&atlas_name)?;
            Ok(Font {
                size,
                atlas,
                atlas_name,
            })
        },
    );
    handlers.register_unload(
        |cache: &RefCountedCache, font: &Font, _identity: &AssetIdentity| -> Result<()> {
            cache.unload(&font.atlas_name)?;
            Ok(())
        },
    );

    reads
}

fn write_content(root: &Path) -> Result<()> {
    fs::create_dir_all(root.join("fonts"))?;
    fs::create_dir_all(root.join("textures"))?;
    fs::write(root.join("fonts/title.fnt"), "48\ntextures/title_atlas.png\n")?;
    fs::write(root.join("fonts/body.fnt"), "16\ntextures\\common\\..\\body_atlas.png\n")?;
    fs::write(root.join("textures/title_atlas.png"), "TITLE")?;
    fs::write(root.join("textures/body_atlas.png"), "BODY")?;
    fs::write(root.join("textures/sky.png"), "SKY")?;
    Ok(())
}

#[test]
fn test_two_levels_share_fonts_and_textures() -> Result<()> {
    // --- 1. Setup: content on disk and a RON config pointing at it ---
    let dir = tempdir()?;
    let root = dir.path().join("Content");
    write_content(&root)?;

    let config_path = dir.path().join("cache.ron");
    fs::write(
        &config_path,
        format!("(root: {:?}, provider: \"loose-files\")", root.display().to_string()),
    )?;
    let config = CacheConfig::load(&config_path)?;

    let handlers = Arc::new(TypeHandlerRegistry::new());
    let reads = register_handlers(&handlers);
    let registry = MetricsRegistry::new();
    let group = CacheGroup::new(handlers).with_metrics(registry.clone());

    // --- 2. Two levels load overlapping content ---
    let menu = group.facade(config.clone());
    let title = menu.load::<Font>("fonts/title.fnt")?;
    let sky = menu.load::<Texture>("textures/sky.png")?;

    let level = group.facade(config.clone());
    assert!(menu.shares_cache_with(&level));
    let title_again = level.load::<Font>(r"FONTS\Title.fnt")?;
    let body = level.load::<Font>("fonts/body.fnt")?;

    assert!(AssetHandle::ptr_eq(&title, &title_again));
    assert_eq!(title.size, 48);
    assert_eq!(title.atlas.bytes, b"TITLE");
    assert_eq!(body.atlas.bytes, b"BODY");
    assert_eq!(sky.bytes, b"SKY");
    assert_eq!(reads.fonts.load(SeqCst), 2);
    assert_eq!(reads.textures.load(SeqCst), 3);

    let cache = level.cache();
    assert_eq!(cache.count(), 5);
    assert_eq!(cache.ref_count("fonts/title.fnt"), Some(2));
    assert_eq!(cache.ref_count("textures/title_atlas.png"), Some(1));

    // --- 3. The menu goes away; the level's assets survive ---
    drop(menu);
    assert!(!cache.contains("textures/sky.png"));
    assert_eq!(cache.ref_count("fonts/title.fnt"), Some(1));
    assert!(cache.contains("textures/title_atlas.png"));
    assert_eq!(reads.texture_unloads.load(SeqCst), 1);

    // --- 4. The level releases; the cascade empties the cache ---
    level.release()?;
    assert_eq!(level.cache().count(), 0);
    assert_eq!(reads.texture_unloads.load(SeqCst), 3);

    let metrics = level.cache().metrics().context("metrics were enabled")?;
    assert_eq!(metrics.loaded_total.get()?, 5);
    assert_eq!(metrics.released_total.get()?, 5);
    assert_eq!(metrics.live_entries.get()?, 0.0);

    Ok(())
}

#[test]
fn test_missing_file_surfaces_loader_failure() -> Result<()> {
    let dir = tempdir()?;
    let root = dir.path().join("Content");
    write_content(&root)?;
    fs::write(root.join("fonts/orphan.fnt"), "12\ntextures/missing.png\n")?;

    let handlers = Arc::new(TypeHandlerRegistry::new());
    register_handlers(&handlers);
    let group = CacheGroup::new(handlers);
    let facade = group.facade(CacheConfig::new(&root, ProviderId::new("loose-files"))?);

    let err = facade
        .load::<Font>("fonts/orphan.fnt")
        .expect_err("the atlas does not exist");
    assert!(err.to_string().contains("textures/missing.png"));
    assert_eq!(facade.cache().count(), 0);
    assert!(facade.owned().is_empty());

    Ok(())
}

#[test]
fn test_levels_loading_concurrently_read_each_file_once() -> Result<()> {
    const LEVELS: usize = 6;

    let dir = tempdir()?;
    let root = dir.path().join("Content");
    write_content(&root)?;

    let handlers = Arc::new(TypeHandlerRegistry::new());
    let reads = register_handlers(&handlers);
    let group = CacheGroup::new(handlers);
    let config = CacheConfig::new(&root, ProviderId::new("loose-files"))?;
    let facades: Vec<_> = (0..LEVELS).map(|_| group.facade(config.clone())).collect();
    let barrier = Barrier::new(LEVELS);

    thread::scope(|scope| {
        for facade in &facades {
            let barrier = &barrier;
            scope.spawn(move || {
                barrier.wait();
                facade.load::<Font>("fonts/title.fnt").unwrap();
                facade.load::<Font>("fonts/body.fnt").unwrap();
            });
        }
    });

    assert_eq!(reads.fonts.load(SeqCst), 2);
    assert_eq!(reads.textures.load(SeqCst), 2);
    assert_eq!(facades[0].cache().ref_count("fonts/title.fnt"), Some(LEVELS));

    drop(facades);
    assert_eq!(reads.texture_unloads.load(SeqCst), 2);
    assert_eq!(group.live_caches(), 0);

    Ok(())
}
