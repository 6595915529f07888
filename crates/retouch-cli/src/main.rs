//! retouch - render layered scenes and export optimizer artifacts.
//!
//! A scene file is a small JSON document describing the layer stack:
//!
//! ```json
//! {
//!   "layers": [
//!     { "name": "bg", "file": "bg.png" },
//!     { "name": "grade", "file": "grade.png", "mode": "multiply",
//!       "opacity": 0.8,
//!       "adjustments": [
//!         { "type": 0, "params": { "hue": 0.6, "sat": 0.5, "light": 0.5 } }
//!       ] }
//!   ]
//! }
//! ```

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};
use retouch_engine::{context_to_vector, key_to_json, AdjustmentType, BlendMode, Compositor};
use retouch_expr::SourceMode;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "retouch")]
#[command(author, version, about = "Layered image compositing engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a scene to a PNG
    Render {
        /// Scene description file
        scene: PathBuf,
        /// Output PNG path
        #[arg(short, long)]
        output: PathBuf,
        /// Render size tag (full, medium, small, thumb)
        #[arg(short, long, default_value = "full")]
        size: String,
    },
    /// Print the scene's parameter key as JSON
    Key {
        /// Scene description file
        scene: PathBuf,
    },
    /// Emit generated cost-function source for one pixel
    Trace {
        /// Scene description file
        scene: PathBuf,
        /// Pixel x coordinate
        #[arg(short)]
        x: u32,
        /// Pixel y coordinate
        #[arg(short)]
        y: u32,
        /// Generated function name
        #[arg(long, default_value = "compositeFunc")]
        fn_name: String,
    },
}

#[derive(Deserialize)]
struct Scene {
    layers: Vec<SceneLayer>,
}

#[derive(Deserialize)]
struct SceneLayer {
    name: String,
    #[serde(default)]
    file: Option<PathBuf>,
    #[serde(default)]
    mode: BlendMode,
    #[serde(default = "default_opacity")]
    opacity: f32,
    #[serde(default = "default_visible")]
    visible: bool,
    #[serde(default)]
    adjustments: Vec<SceneAdjustment>,
}

#[derive(Deserialize)]
struct SceneAdjustment {
    #[serde(rename = "type")]
    ty: i32,
    #[serde(default)]
    params: BTreeMap<String, f32>,
    #[serde(default)]
    selective: Vec<SceneSelective>,
}

#[derive(Deserialize)]
struct SceneSelective {
    channel: String,
    color: String,
    value: f32,
}

fn default_opacity() -> f32 {
    1.0
}

fn default_visible() -> bool {
    true
}

fn load_scene(path: &Path) -> Result<Compositor> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading scene {}", path.display()))?;
    let scene: Scene = serde_json::from_str(&text)
        .with_context(|| format!("parsing scene {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let mut comp = Compositor::new();
    for l in &scene.layers {
        let added = match &l.file {
            Some(file) => {
                let image = retouch_io::load_png(base.join(file))
                    .with_context(|| format!("loading layer image {}", file.display()))?;
                comp.add_layer(&l.name, image)
            }
            None => comp.add_adjustment_layer(&l.name),
        };
        if !added {
            bail!("duplicate layer name '{}' in scene", l.name);
        }

        let layer = comp.layer_mut(&l.name).expect("layer just added");
        layer.mode = l.mode;
        layer.set_opacity(l.opacity);
        layer.visible = l.visible;

        for adj in &l.adjustments {
            let Some(ty) = AdjustmentType::from_value(adj.ty) else {
                bail!("layer '{}': unknown adjustment type {}", l.name, adj.ty);
            };
            if ty == AdjustmentType::SelectiveColor {
                for s in &adj.selective {
                    layer.set_selective_color_channel(s.channel.clone(), s.color.clone(), s.value);
                }
            } else {
                for (name, value) in &adj.params {
                    layer.add_adjustment(ty, name.clone(), *value);
                }
            }
        }
    }
    Ok(comp)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    match cli.command {
        Commands::Render {
            scene,
            output,
            size,
        } => {
            let comp = load_scene(&scene)?;
            let image = comp.render_primary(&size);
            if image.is_empty() {
                bail!("scene rendered an empty image (no image layers?)");
            }
            retouch_io::save_png(&output, &image)
                .with_context(|| format!("writing {}", output.display()))?;
            println!(
                "rendered {}x{} -> {}",
                image.width(),
                image.height(),
                output.display()
            );
        }
        Commands::Key { scene } => {
            let comp = load_scene(&scene)?;
            let (_, key) = context_to_vector(comp.primary_context());
            println!("{}", key_to_json(&key)?);
        }
        Commands::Trace {
            scene,
            x,
            y,
            fn_name,
        } => {
            let comp = load_scene(&scene)?;
            let pt = comp.trace_pixel(comp.primary_context(), x, y)?;
            println!("{}", pt.trace.to_source(&fn_name, SourceMode::Templated));
        }
    }

    Ok(())
}
