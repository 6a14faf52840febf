//! # Responsive Image
//!
//! Resolves responsive image mappings into `<picture>` markup. Given a stored
//! image and a mapping from breakpoints to image styles, the crate decides
//! which derivative to serve at each breakpoint and pixel density, picks a
//! fallback `<img>`, and reports the cache tags the output depends on.
//!
//! # Architecture: Resolve, Render, Deliver
//!
//! ```text
//! FieldDisplaySettings ─► ResponsiveImageRenderer ─► RenderResult ─► markup + X-Cache-Tags
//!                           │        │
//!                 MappingStore   resolver ─► BreakpointCatalog
//!                                    │
//!                            DerivativeService ─► URLs (itok-signed)
//!
//! GET /system/files/styles/large/private/a.png ─► FileDelivery ─► FileAccess
//!                                                       └─► DerivativeStore ─► ImageBackend
//! ```
//!
//! Rendering is pure: it computes URLs and never touches pixels. Derivatives
//! are produced lazily when their URL is requested, behind the same access
//! check as the original file.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`breakpoint`] | Breakpoints, multipliers and the cascade-ordered group catalog |
//! | [`style`] | Image styles, their effects and the stock `thumbnail`/`medium`/`large` |
//! | [`mapping`] | Immutable responsive image mappings, their builder and lint |
//! | [`storage`] | Loading and saving mappings (in memory or TOML files) |
//! | [`file`] | `public://` / `private://` file URIs and image field items |
//! | [`derivative`] | Original and derivative URLs, tokens, size prediction |
//! | [`resolver`] | Mapping + breakpoint group → ordered `<source>` lines |
//! | [`fallback`] | The fallback `<img>` |
//! | [`render`] | Field rendering: markup, links and cache tags |
//! | [`page`] | Entity pages whose headers carry every image's cache tags |
//! | [`access`] | Who may read which file |
//! | [`delivery`] | Serving originals and derivatives with 403/404 semantics |
//! | [`store`] | Idempotent on-disk derivative generation |
//! | [`cache`] | Derivative cache manifest |
//! | [`cache_tags`] | Cache tag names and the tag set |
//! | [`response`] | HTTP-shaped responses |
//! | [`config`] | `responsive_image.toml` loading, merging and validation |
//! | [`imaging`] | Pure-Rust decode/resize/crop/encode behind a backend trait |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Mappings Are Values
//!
//! A [`ResponsiveImageMapping`](mapping::ResponsiveImageMapping) cannot be
//! mutated. Edits go through a builder and produce a new value that is saved
//! whole, so renders running concurrently always see a consistent mapping.
//! Entries are keyed by [`MappingKey`](mapping::MappingKey) and point at a
//! [`StyleRef`](style::StyleRef), where "serve the original" is its own
//! variant rather than an empty style name.
//!
//! ## Tolerant Rendering, Strict Checking
//!
//! A mapping that names an unknown breakpoint group renders as its fallback
//! image only; entries for breakpoints outside the group are skipped. Pages
//! keep rendering when configuration drifts. The `check` command runs
//! [`mapping::lint`] to surface the same problems to whoever maintains the
//! config.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate for decode, resampling and
//! encode. No system libraries, no subprocesses.

pub mod access;
pub mod breakpoint;
pub mod cache;
pub mod cache_tags;
pub mod config;
pub mod delivery;
pub mod derivative;
pub mod fallback;
pub mod file;
pub mod imaging;
pub mod mapping;
pub mod output;
pub mod page;
pub mod render;
pub mod resolver;
pub mod response;
pub mod storage;
pub mod store;
pub mod style;

#[cfg(test)]
pub(crate) mod test_helpers;
