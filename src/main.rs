use clap::{Parser, Subcommand};
use responsive_image::access::{Account, PermissionAccess};
use responsive_image::config::{self, ResponsiveConfig};
use responsive_image::delivery::FileDelivery;
use responsive_image::derivative::UrlGenerator;
use responsive_image::file::{FileUri, ImageItem, SourceImage};
use responsive_image::imaging::{RustBackend, get_dimensions};
use responsive_image::mapping::{self, MappingKey, ResponsiveImageMapping};
use responsive_image::output;
use responsive_image::render::{FieldDisplaySettings, ImageLink, ResponsiveImageRenderer};
use responsive_image::storage::{MappingStore, StoreError, TomlMappingStore};
use responsive_image::store::DerivativeStore;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "responsive-image")]
#[command(about = "Resolve responsive image mappings into <picture> markup")]
#[command(long_about = "\
Resolve responsive image mappings into <picture> markup

A mapping ties a breakpoint group to image styles. Rendering an image through
a mapping produces one <source> per breakpoint (narrowest first), a fallback
<img>, and the cache tags of every config the output depends on.

Config directory layout:

  config/
  ├── responsive_image.toml                       # files, styles, breakpoints
  ├── responsive_image.mappings.mapping_one.toml  # one file per mapping
  └── responsive_image.mappings.hero.toml

Files are addressed as public://path or private://path, relative to the
[files] public_path and private_path directories.

Run 'responsive-image gen-config' to generate a documented responsive_image.toml.")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Directory holding responsive_image.toml and mapping files
    #[arg(long, default_value = "config", global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render an image and print its markup and cache tags
    Render {
        /// File URI, e.g. public://photos/dawn.png
        #[arg(long)]
        image: FileUri,
        /// Responsive image mapping id; omit for a plain <img>
        #[arg(long)]
        mapping: Option<String>,
        /// Image style for the fallback <img>; omit to use the original
        #[arg(long)]
        fallback_style: Option<String>,
        /// What the image links to: none, file or content
        #[arg(long, default_value = "none")]
        link: ImageLink,
        /// Canonical URL of the hosting entity (for --link content)
        #[arg(long)]
        entity_url: Option<String>,
        #[arg(long, default_value = "")]
        alt: String,
    },
    /// Add or replace one entry of a mapping, creating the mapping if needed
    Map {
        id: String,
        /// Breakpoint group (required when creating)
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        label: Option<String>,
        /// Fully-qualified breakpoint id, e.g. theme.mobile
        #[arg(long)]
        breakpoint: String,
        #[arg(long, default_value = "1x")]
        multiplier: String,
        /// Image style id; an empty string serves the original
        #[arg(long)]
        style: String,
    },
    /// List stored mappings
    Mappings,
    /// Generate derivatives of an image in parallel
    Derive {
        #[arg(long)]
        image: FileUri,
        /// Style ids; defaults to every configured style
        #[arg(long)]
        style: Vec<String>,
    },
    /// Delete every derivative of a style
    Flush {
        #[arg(long)]
        style: String,
    },
    /// Run a file request, e.g. /system/files/styles/large/private/a.png?itok=…
    Get {
        path: String,
        /// Permission held by the requesting account (repeatable)
        #[arg(long)]
        permission: Vec<String>,
    },
    /// Validate config and lint every stored mapping
    Check,
    /// Print a stock responsive_image.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let load_config = || config::load_config(&cli.config_dir);
    let mappings = TomlMappingStore::new(&cli.config_dir);

    match cli.command {
        Command::Render {
            image,
            mapping,
            fallback_style,
            link,
            entity_url,
            alt,
        } => {
            let config = load_config()?;
            let breakpoints = config.breakpoint_registry()?;
            let urls = url_generator(&config);
            let store = DerivativeStore::from_config(RustBackend::new(), &config);
            let dimensions = get_dimensions(&RustBackend::new(), &store.source_path(&image)).ok();
            let item = ImageItem::new(SourceImage::new(image, dimensions), alt);
            let settings = FieldDisplaySettings {
                responsive_image_mapping: mapping,
                fallback_image_style: fallback_style,
                image_link: link,
            };
            let renderer = ResponsiveImageRenderer::new(&mappings, &breakpoints, &urls);
            match renderer.render_or_empty(&settings, &item, entity_url.as_deref())? {
                Some(result) => output::print_render_output(&result),
                None => println!("(nothing rendered)"),
            }
        }
        Command::Map {
            id,
            group,
            label,
            breakpoint,
            multiplier,
            style,
        } => {
            let builder = match mappings.load(&id) {
                Ok(existing) => {
                    if let Some(group) = &group
                        && group != existing.breakpoint_group()
                    {
                        return Err(format!(
                            "mapping {id} uses breakpoint group {}, not {group}",
                            existing.breakpoint_group()
                        )
                        .into());
                    }
                    existing.to_builder()
                }
                Err(StoreError::NotFound(_)) => {
                    let group = group.ok_or("--group is required when creating a mapping")?;
                    ResponsiveImageMapping::builder(&id, group)
                }
                Err(e) => return Err(e.into()),
            };
            let builder = match label {
                Some(label) => builder.label(label),
                None => builder,
            };
            let key = MappingKey::new(breakpoint, multiplier.parse()?);
            let updated = builder.set_mapping(key, style.into()).build()?;
            mappings.save(&updated)?;
            output::print_mapping_list(std::slice::from_ref(&updated));
        }
        Command::Mappings => {
            let loaded = load_all(&mappings)?;
            output::print_mapping_list(&loaded);
        }
        Command::Derive { image, style } => {
            let config = load_config()?;
            init_thread_pool(&config.processing);
            let store = DerivativeStore::from_config(RustBackend::new(), &config);
            let styles = if style.is_empty() {
                store.styles().iter().map(|s| s.id.clone()).collect()
            } else {
                style
            };
            let jobs: Vec<(String, FileUri)> =
                styles.into_iter().map(|s| (s, image.clone())).collect();
            let results = store.ensure_many(&jobs);
            store.persist()?;
            let outcomes: Vec<output::DeriveOutcome<'_>> = jobs
                .iter()
                .zip(&results)
                .map(|((style, uri), result)| (style.as_str(), uri, result))
                .collect();
            output::print_derive_output(&outcomes, &store.stats());
        }
        Command::Flush { style } => {
            let config = load_config()?;
            let store = DerivativeStore::from_config(RustBackend::new(), &config);
            let removed = store.flush_style(&style)?;
            store.persist()?;
            println!("Flushed {removed} derivative(s) of {style}");
        }
        Command::Get { path, permission } => {
            let config = load_config()?;
            let urls = url_generator(&config);
            let store = DerivativeStore::from_config(RustBackend::new(), &config);
            let access = PermissionAccess::from_config(&config.files);
            let account = if permission.is_empty() {
                Account::anonymous()
            } else {
                Account::new("cli").with_permissions(permission)
            };
            let delivery =
                FileDelivery::new(&urls, &store, &access, config.derivatives.require_token);
            let response = delivery.handle(&path, &account);
            store.persist()?;
            output::print_response(&response);
        }
        Command::Check => {
            let config = load_config()?;
            let breakpoints = config.breakpoint_registry()?;
            let styles = config.style_catalog();
            let reports: Vec<(String, Vec<mapping::MappingIssue>)> = load_all(&mappings)?
                .iter()
                .map(|m| (m.id().to_string(), mapping::lint(m, &breakpoints, &styles)))
                .collect();
            output::print_check_output(&reports);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn url_generator(config: &ResponsiveConfig) -> UrlGenerator {
    UrlGenerator::new(
        config.files.clone(),
        config.derivatives.token_secret.clone(),
        config.style_catalog(),
    )
}

fn load_all(mappings: &TomlMappingStore) -> Result<Vec<ResponsiveImageMapping>, StoreError> {
    mappings.ids()?.iter().map(|id| mappings.load(id)).collect()
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
