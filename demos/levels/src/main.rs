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

//! Two "levels" built from one `CacheGroup`: a menu and a dungeon share the title
//! font, and tearing down the menu leaves the dungeon's assets alive.
//!
//! Usage: `levels [path/to/cache.ron]`. A relative `root` in the config is resolved
//! against the config file's directory.

use anyhow::{Context, Result};
use assetrc_agents::{CacheGroup, SharedCacheFacade};
use assetrc_core::asset::{Asset, AssetHandle, AssetIdentity};
use assetrc_core::{CacheConfig, Stopwatch};
use assetrc_data::{RefCountedCache, TypeHandlerRegistry};
use assetrc_telemetry::logging::init_logger;
use assetrc_telemetry::MetricsRegistry;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug)]
struct Texture {
    text: String,
}
impl Asset for Texture {}

#[derive(Debug)]
struct Font {
    size: u32,
    atlas: AssetHandle<Texture>,
    atlas_name: String,
}
impl Asset for Font {}

fn read(cache: &RefCountedCache, identity: &AssetIdentity) -> Result<String> {
    let path = cache.config().root_path().join(identity.as_str());
    std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))
}

fn register_handlers(handlers: &TypeHandlerRegistry) {
    handlers.register_load(
        |cache: &RefCountedCache, identity: &AssetIdentity| -> Result<Texture> {
            Ok(Texture {
                text: read(cache, identity)?.trim().to_string(),
            })
        },
    );

    handlers.register_load(
        |cache: &RefCountedCache, identity: &AssetIdentity| -> Result<Font> {
            let text = read(cache, identity)?;
            let mut lines = text.lines();
            let size = lines.next().context("font size")?.trim().parse()?;
            let atlas_name = lines.next().context("atlas name")?.trim().to_string();
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
}

fn load_config(path: &Path) -> Result<CacheConfig> {
    let config = CacheConfig::load(path)?;
    if config.root_path().is_absolute() {
        return Ok(config);
    }
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(CacheConfig::new(
        base.join(config.root_path()),
        config.provider().clone(),
    )?)
}

fn report(name: &str, facade: &SharedCacheFacade) {
    let mut owned = facade.owned();
    owned.sort_by(|a, b| a.0.key().cmp(b.0.key()));
    for (identity, count) in owned {
        log::info!("  {name} holds '{identity}' x{count}");
    }
}

fn main() -> Result<()> {
    init_logger("info");
    let started = Stopwatch::new();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("cache.ron"));
    let config = load_config(&config_path)?;
    log::info!("Using asset cache {config}");

    let handlers = Arc::new(TypeHandlerRegistry::new());
    register_handlers(&handlers);
    let registry = MetricsRegistry::new();
    let group = CacheGroup::new(handlers).with_metrics(registry.clone());

    let menu = group.facade(config.clone());
    let title = menu.load::<Font>("fonts/title.fnt")?;
    menu.load::<Texture>("textures/sky.txt")?;
    log::info!(
        "Menu ready: title font {}pt, atlas '{}'",
        title.size,
        title.atlas.text
    );

    let dungeon = group.facade(config);
    let shared_title = dungeon.load::<Font>(r"Fonts\Title.fnt")?;
    dungeon.load::<Font>("fonts/body.fnt")?;
    dungeon.load::<Texture>("textures/rock.txt")?;
    log::info!(
        "Dungeon ready; title font shared with menu: {}",
        AssetHandle::ptr_eq(&title, &shared_title)
    );
    report("menu", &menu);
    report("dungeon", &dungeon);
    log::info!("{} assets cached", dungeon.cache().count());

    drop(menu);
    log::info!("Menu closed, {} assets still cached", dungeon.cache().count());

    dungeon.release()?;
    log::info!("Dungeon released, {} assets cached", dungeon.cache().count());

    for metric in registry.get_namespace_metrics("assets") {
        log::info!("{}: {:?}", metric.id, metric.value);
    }
    log::info!("Done in {:.2} ms", started.elapsed_ms_f64());
    Ok(())
}
